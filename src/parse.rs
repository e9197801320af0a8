use crate::{
    error::Stage,
    hierarchy::check_dimensions,
    layer,
    property::{Compression, Property, PropertyScope},
    reader::XcfReader,
    Canvas, DecodeOptions, Result, XcfParseError,
};
use log::debug;
use std::io::{Read, Seek};

const MAGIC: &[u8; 9] = b"gimp xcf ";
const SUPPORTED_VERSION: &[u8; 4] = b"file";

/// Color mode of the whole image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorMode {
    Rgb,
    Grayscale,
    Indexed,
}

#[derive(Debug)]
struct FileHeader {
    width: u32,
    height: u32,
}

impl FileHeader {
    fn parse<R: Read>(reader: &mut XcfReader<R>) -> Result<Self> {
        reader.set_stage(Stage::Header);

        let mut magic = [0_u8; 9];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(XcfParseError::InvalidInput(format!(
                "Wrong magic ID: {:?}",
                String::from_utf8_lossy(&magic)
            )));
        }

        let mut version = [0_u8; 4];
        reader.read_exact(&mut version)?;
        let _version_terminator = reader.byte()?;
        if &version != SUPPORTED_VERSION {
            return Err(XcfParseError::UnsupportedFeature(format!(
                "Unsupported file version: {:?}",
                String::from_utf8_lossy(&version)
            )));
        }

        let width = reader.dword()?;
        let height = reader.dword()?;
        check_dimensions(width, height)?;
        let color_mode = parse_color_mode(reader.dword()?)?;
        if color_mode != ColorMode::Rgb {
            return Err(XcfParseError::UnsupportedFeature(format!(
                "Unsupported color mode, must be RGB: {:?}",
                color_mode
            )));
        }

        Ok(Self { width, height })
    }
}

// file format docs: http://henning.makholm.net/xcftools/xcfspec-saved
pub(crate) fn read_xcf<R: Read + Seek>(input: R, options: &DecodeOptions) -> Result<Canvas> {
    let mut reader = XcfReader::with(input);
    let FileHeader { width, height } = FileHeader::parse(&mut reader)?;
    debug!("Canvas size: {}x{}", width, height);

    parse_canvas_properties(&mut reader)?;

    reader.set_stage(Stage::LayerDirectory);
    // Top-most layer first.
    let layer_pointers = reader.pointer_list()?;
    debug!("Found {} layers", layer_pointers.len());

    let mut layers = Vec::with_capacity(layer_pointers.len());
    for pointer in layer_pointers {
        layers.push(layer::parse_layer(&mut reader, pointer, options)?);
    }

    Ok(Canvas {
        width,
        height,
        layers,
    })
}

fn parse_canvas_properties<R: Read>(reader: &mut XcfReader<R>) -> Result<()> {
    loop {
        match Property::read(reader, PropertyScope::Canvas)? {
            Property::End => return Ok(()),
            Property::Compression(Compression::Rle) => {}
            Property::Compression(compression) => {
                return Err(XcfParseError::UnsupportedFeature(format!(
                    "Unsupported compression, must be RLE: {:?}",
                    compression
                )));
            }
            Property::Colormap { num_colors } => {
                debug!("Skipped colormap with {} colors", num_colors);
            }
            other => debug!("Ignoring canvas property: {:?}", other),
        }
    }
}

fn parse_color_mode(id: u32) -> Result<ColorMode> {
    match id {
        0 => Ok(ColorMode::Rgb),
        1 => Ok(ColorMode::Grayscale),
        2 => Ok(ColorMode::Indexed),
        _ => Err(XcfParseError::InvalidInput(format!(
            "Unknown color mode: {}",
            id
        ))),
    }
}
