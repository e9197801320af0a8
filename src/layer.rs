use crate::{
    error::Stage,
    hierarchy,
    property::{Property, PropertyScope},
    reader::XcfReader,
    DecodeOptions, Result, XcfParseError,
};
use image::{Rgba, RgbaImage};
use log::{debug, trace};
use std::io::{Read, Seek};

/// Pixel format of a single layer as stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerColorFormat {
    /// Red, green and blue with 8 bits each.
    Rgb,
    /// Red, green, blue and alpha with 8 bits each.
    Rgba,
    /// 8 bit grayscale. Not supported.
    Grayscale,
    /// 8 bit grayscale and 8 bit alpha. Not supported.
    GrayscaleAlpha,
    /// Palette index. Not supported.
    Indexed,
    /// Palette index and 8 bit alpha. Not supported.
    IndexedAlpha,
}

impl LayerColorFormat {
    /// Number of bytes (and planes) used to store one pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            LayerColorFormat::Rgb => 3,
            LayerColorFormat::Rgba => 4,
            LayerColorFormat::Grayscale | LayerColorFormat::Indexed => 1,
            LayerColorFormat::GrayscaleAlpha | LayerColorFormat::IndexedAlpha => 2,
        }
    }

    /// Whether the stored pixels carry their own alpha channel.
    pub fn has_alpha(&self) -> bool {
        match self {
            LayerColorFormat::Rgba
            | LayerColorFormat::GrayscaleAlpha
            | LayerColorFormat::IndexedAlpha => true,
            LayerColorFormat::Rgb | LayerColorFormat::Grayscale | LayerColorFormat::Indexed => {
                false
            }
        }
    }
}

/// The rectangle covered by a layer, in canvas coordinates. May lie
/// partially or completely outside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerBounds {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl LayerBounds {
    /// Returns `true` if the canvas pixel `(x, y)` is covered by the layer.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.local(x, y).is_some()
    }

    // Canvas coordinates to layer coordinates.
    fn local(&self, x: i32, y: i32) -> Option<(u32, u32)> {
        let local_x = x as i64 - self.x as i64;
        let local_y = y as i64 - self.y as i64;
        let inside = (0..self.width as i64).contains(&local_x)
            && (0..self.height as i64).contains(&local_y);
        if inside {
            Some((local_x as u32, local_y as u32))
        } else {
            None
        }
    }
}

/// A named, positioned rectangle of pixels.
///
/// The pixel data is stored unmodified: visibility and opacity are kept
/// separately and must be applied when drawing the layer onto something else
/// (as [Canvas::composed_image](crate::Canvas::composed_image) does).
#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) name: String,
    pub(crate) visible: bool,
    pub(crate) opacity: u8,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) color_format: LayerColorFormat,
    pub(crate) pixels: RgbaImage,
}

impl Layer {
    /// Name of the layer. May be empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns if the layer is visible (eye icon is enabled).
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Layer opacity (0 = fully transparent, 255 = fully opaque).
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Position of the top-left corner on the canvas.
    pub fn offsets(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// The area covered by this layer in canvas coordinates.
    pub fn bounds(&self) -> LayerBounds {
        LayerBounds {
            x: self.x,
            y: self.y,
            width: self.width(),
            height: self.height(),
        }
    }

    /// The pixel format the layer was stored in.
    pub fn color_format(&self) -> LayerColorFormat {
        self.color_format
    }

    /// Shortcut for `.color_format().has_alpha()`.
    pub fn has_alpha(&self) -> bool {
        self.color_format.has_alpha()
    }

    /// The layer's pixels. Pixel `(0, 0)` of the image is at
    /// [offsets](Layer::offsets) on the canvas. Layers without alpha are
    /// fully opaque.
    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Consumes the layer and returns its pixels.
    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    /// The pixel at canvas position `(x, y)`, or `None` if the position is
    /// outside of the layer.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgba<u8>> {
        self.bounds()
            .local(x, y)
            .map(|(local_x, local_y)| *self.pixels.get_pixel(local_x, local_y))
    }

    /// Like [pixel](Layer::pixel) but returns a fully transparent pixel
    /// outside of the layer.
    pub fn pixel_or_transparent(&self, x: i32, y: i32) -> Rgba<u8> {
        self.pixel(x, y).unwrap_or(Rgba([0, 0, 0, 0]))
    }
}

// Starts out with the values used when a property is missing and is updated
// as properties are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LayerProperties {
    pub visible: bool,
    pub opacity: u8,
    pub x: i32,
    pub y: i32,
}

impl LayerProperties {
    pub(crate) fn new(options: &DecodeOptions) -> Self {
        Self {
            visible: true,
            opacity: options.default_opacity(),
            x: 0,
            y: 0,
        }
    }

    pub(crate) fn apply(&mut self, property: Property) {
        match property {
            Property::Visible(visible) => self.visible = visible,
            Property::Opacity(opacity) => self.opacity = opacity,
            Property::Offsets { x, y } => {
                self.x = x;
                self.y = y;
            }
            other => trace!("Ignoring layer property: {:?}", other),
        }
    }
}

#[derive(Debug)]
struct LayerHeader {
    width: u32,
    height: u32,
    color_format: LayerColorFormat,
}

impl LayerHeader {
    fn parse<R: Read>(reader: &mut XcfReader<R>) -> Result<Self> {
        let width = reader.dword()?;
        let height = reader.dword()?;
        let color_format = parse_layer_color_format(reader.dword()?)?;
        match color_format {
            LayerColorFormat::Rgb | LayerColorFormat::Rgba => Ok(Self {
                width,
                height,
                color_format,
            }),
            _ => Err(XcfParseError::UnsupportedFeature(format!(
                "Unsupported layer color format, must be RGB or RGBA: {:?}",
                color_format
            ))),
        }
    }
}

/// Reads the layer stored at `offset`, including its pixels.
pub(crate) fn parse_layer<R: Read + Seek>(
    reader: &mut XcfReader<R>,
    offset: u32,
    options: &DecodeOptions,
) -> Result<Layer> {
    reader.set_stage(Stage::Layer);
    reader.seek(offset)?;
    let header = LayerHeader::parse(reader)?;
    let name = reader.string()?;

    let mut properties = LayerProperties::new(options);
    loop {
        match Property::read(reader, PropertyScope::Layer)? {
            Property::End => break,
            property => properties.apply(property),
        }
    }

    reader.set_stage(Stage::Layer);
    let pixels_pointer = reader.pointer()?;
    // Masks are not supported, the pointer is only read to keep the cursor in
    // sync.
    let _mask_pointer = reader.pointer()?;

    debug!(
        "Layer '{}': {}x{} {:?} at {},{} visible={} opacity={}",
        name,
        header.width,
        header.height,
        header.color_format,
        properties.x,
        properties.y,
        properties.visible,
        properties.opacity
    );

    let pixels = hierarchy::read_pixels(
        reader,
        header.width,
        header.height,
        header.color_format,
        pixels_pointer,
    )?;

    let LayerProperties {
        visible,
        opacity,
        x,
        y,
    } = properties;
    Ok(Layer {
        name,
        visible,
        opacity,
        x,
        y,
        color_format: header.color_format,
        pixels,
    })
}

fn parse_layer_color_format(id: u32) -> Result<LayerColorFormat> {
    match id {
        0 => Ok(LayerColorFormat::Rgb),
        1 => Ok(LayerColorFormat::Rgba),
        2 => Ok(LayerColorFormat::Grayscale),
        3 => Ok(LayerColorFormat::GrayscaleAlpha),
        4 => Ok(LayerColorFormat::Indexed),
        5 => Ok(LayerColorFormat::IndexedAlpha),
        _ => Err(XcfParseError::InvalidInput(format!(
            "Invalid layer color format: {}",
            id
        ))),
    }
}
