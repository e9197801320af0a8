#![warn(clippy::all)]
#![warn(missing_docs)]
/*!

Utilities for loading [GIMP](https://www.gimp.org/) XCF files. This library
directly reads the binary XCF files ([file format description][spec]) and
does not require you to export your layers to PNG first. You get every layer
as an RGBA image together with its name, position, visibility and opacity, and
can flatten them into a single image.

Only a subset of the format is supported:

- RGB images with RGB or RGBA layers (no grayscale or indexed color),
- RLE compressed tiles (the default; no zlib compression),
- the original `file` version of the format.

Masks, channels, paths, guides, parasites and blend modes are ignored.

[spec]: http://henning.makholm.net/xcftools/xcfspec-saved

# Basic Usage

## Load file

The easiest way is to use [Canvas::read_file] to load a file.

```no_run
use xcfile::Canvas;
# use std::path::Path;
# let path = Path::new("./tests/data/layers.xcf");
let canvas = Canvas::read_file(&path).unwrap();

println!("Size: {}x{}", canvas.width(), canvas.height());
println!("Layers: {}", canvas.num_layers());
```

## Save the flattened image

Usually you just want the final image. [Canvas::composed_image] returns an
`image::RgbaImage` from the [image](https://docs.rs/image) library.

```no_run
# use xcfile::Canvas;
# use std::path::Path;
# let path = Path::new("./tests/data/layers.xcf");
# let canvas = Canvas::read_file(&path).unwrap();
let image = canvas.composed_image();
image.save("composed.png").unwrap();
```

This draws all visible layers bottom to top, scaled by their opacity.

## Layers

Layers are stored top-most first. You can access a [Layer] by index or by
name.

```no_run
# use xcfile::Canvas;
# use std::path::Path;
# let path = Path::new("./tests/data/layers.xcf");
# let canvas = Canvas::read_file(&path).unwrap();
let layer = canvas.layer(0);
println!("Name of the top layer: {}", layer.name());
let layer = canvas.layer_by_name("Background").unwrap();
println!("Background is visible? {}", layer.is_visible());
println!("Background covers {:?}", layer.bounds());
let color = layer.pixel(10, 10);
```

*/

pub(crate) mod blend;
pub(crate) mod canvas;
pub(crate) mod error;
pub(crate) mod hierarchy;
pub(crate) mod layer;
pub(crate) mod options;
pub(crate) mod parse;
pub(crate) mod property;
pub(crate) mod reader;
pub(crate) mod rle;

/// A specialized `Result` type for XCF parsing functions.
pub type Result<T> = std::result::Result<T, XcfParseError>;

pub use canvas::{Canvas, LayersIter};
pub use error::{Stage, XcfParseError};
pub use layer::{Layer, LayerBounds, LayerColorFormat};
pub use options::DecodeOptions;
