use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
    slice,
};

use crate::{blend, error::Stage, parse, DecodeOptions, Layer, Result, XcfParseError};
use image::RgbaImage;

/// A parsed XCF file.
///
/// The canvas is not itself an image. It has a size, its top-left corner is
/// at `(0, 0)`, and the bounds of all layers are relative to it. Layers can
/// extend beyond the canvas.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub(crate) width: u32,
    pub(crate) height: u32,
    // Top-most layer first.
    pub(crate) layers: Vec<Layer>,
}

impl Canvas {
    /// Load an XCF file from disk.
    pub fn read_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| XcfParseError::io(Stage::Open, e))?;
        let reader = BufReader::new(file);
        parse::read_xcf(reader, &DecodeOptions::default())
    }

    /// Load an XCF file from any seekable input, e.g. a
    /// `std::io::Cursor` over an in-memory file.
    ///
    /// The format stores offsets to its parts, so the input must support
    /// seeking.
    pub fn read<R: Read + Seek>(input: R) -> Result<Canvas> {
        parse::read_xcf(input, &DecodeOptions::default())
    }

    /// Like [read](Canvas::read), with non-default [DecodeOptions].
    pub fn read_with_options<R: Read + Seek>(input: R, options: &DecodeOptions) -> Result<Canvas> {
        parse::read_xcf(input, options)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width and height in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of layers.
    pub fn num_layers(&self) -> u32 {
        self.layers.len() as u32
    }

    /// Access a layer by index. Index 0 is the top-most layer.
    ///
    /// # Panics
    ///
    /// Panics if the index is not less than the number of layers.
    pub fn layer(&self, index: u32) -> &Layer {
        assert!(index < self.num_layers());
        &self.layers[index as usize]
    }

    /// Access a layer by name.
    ///
    /// If multiple layers with the same name exist returns the top-most one.
    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    /// An iterator over all layers, top-most first.
    pub fn layers(&self) -> LayersIter<'_> {
        LayersIter {
            inner: self.layers.iter(),
        }
    }

    /// Takes ownership of the layers, top-most first.
    pub fn into_layers(self) -> Vec<Layer> {
        self.layers
    }

    /// Flattens all visible layers into a single image of the canvas size.
    ///
    /// Layers are drawn bottom to top onto a transparent background, each one
    /// scaled by its opacity. Invisible layers are skipped and parts of layers
    /// outside the canvas are cut off.
    pub fn composed_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width, self.height);
        for layer in self.layers().rev() {
            if !layer.is_visible() {
                continue;
            }
            write_layer_to_image(&mut image, layer);
        }
        image
    }
}

/// An iterator over layers. See [Canvas::layers].
#[derive(Debug, Clone)]
pub struct LayersIter<'a> {
    inner: slice::Iter<'a, Layer>,
}

impl<'a> Iterator for LayersIter<'a> {
    type Item = &'a Layer;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> DoubleEndedIterator for LayersIter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<'a> ExactSizeIterator for LayersIter<'a> {}

fn write_layer_to_image(image: &mut RgbaImage, layer: &Layer) {
    let (x0, y0) = layer.offsets();
    let x0 = x0 as i64;
    let y0 = y0 as i64;
    let (img_width, img_height) = image.dimensions();
    let opacity = layer.opacity();
    let pixels = layer.image();

    // Only visit the part of the layer that overlaps the canvas.
    let x_start = x0.max(0);
    let y_start = y0.max(0);
    let x_end = (x0 + layer.width() as i64).min(img_width as i64);
    let y_end = (y0 + layer.height() as i64).min(img_height as i64);

    for y in y_start..y_end {
        for x in x_start..x_end {
            let layer_pixel = *pixels.get_pixel((x - x0) as u32, (y - y0) as u32);
            let src = *image.get_pixel(x as u32, y as u32);
            let new = blend::normal(src, layer_pixel, opacity);
            image.put_pixel(x as u32, y as u32, new);
        }
    }
}
