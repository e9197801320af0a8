use crate::{error::Stage, reader::XcfReader, Result, XcfParseError};
use log::debug;
use std::io::Read;

// Property type codes. Only the ones the decoder interprets are listed.
const PROP_END: u32 = 0;
const PROP_COLORMAP: u32 = 1;
const PROP_OPACITY: u32 = 6;
const PROP_VISIBLE: u32 = 8;
const PROP_OFFSETS: u32 = 15;
const PROP_COMPRESSION: u32 = 17;

/// Where a property list is attached. Decides which tags are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropertyScope {
    Canvas,
    Layer,
}

/// Tile compression mode declared by the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Compression {
    None,
    Rle,
    Zlib,
    Fractal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Property {
    End,
    Colormap { num_colors: u32 },
    Compression(Compression),
    Visible(bool),
    Opacity(u8),
    Offsets { x: i32, y: i32 },
    Other { tag: u32, length: u32 },
}

impl Property {
    /// Reads one property record. On return the cursor is positioned after
    /// the record.
    pub(crate) fn read<R: Read>(reader: &mut XcfReader<R>, scope: PropertyScope) -> Result<Self> {
        reader.set_stage(Stage::Property);
        let tag = reader.dword()?;
        let length = reader.dword()?;

        let (property, consumed) = match (scope, tag) {
            (_, PROP_END) => (Property::End, 0),
            (PropertyScope::Canvas, PROP_COLORMAP) => {
                // Some GIMP versions write a wrong length for the colormap.
                // Its size follows from the color count instead.
                let num_colors = reader.dword()?;
                reader.skip(3 * num_colors as u64)?;
                return Ok(Property::Colormap { num_colors });
            }
            (PropertyScope::Canvas, PROP_COMPRESSION) => {
                let compression = parse_compression(reader.byte()?)?;
                (Property::Compression(compression), 1)
            }
            (PropertyScope::Layer, PROP_VISIBLE) => (Property::Visible(reader.dword()? != 0), 4),
            (PropertyScope::Layer, PROP_OPACITY) => {
                // Stored as a 32 bit value in 0..=255.
                (Property::Opacity(reader.dword()? as u8), 4)
            }
            (PropertyScope::Layer, PROP_OFFSETS) => {
                let x = reader.long()?;
                let y = reader.long()?;
                (Property::Offsets { x, y }, 8)
            }
            _ => {
                debug!(
                    "Skipping {:?} property {} ({} bytes)",
                    scope, tag, length
                );
                reader.skip(length as u64)?;
                (Property::Other { tag, length }, length)
            }
        };

        if length > consumed {
            debug!(
                "Property {} declares {} bytes but only {} are used",
                tag, length, consumed
            );
            reader.skip((length - consumed) as u64)?;
        }
        Ok(property)
    }
}

fn parse_compression(id: u8) -> Result<Compression> {
    match id {
        0 => Ok(Compression::None),
        1 => Ok(Compression::Rle),
        2 => Ok(Compression::Zlib),
        3 => Ok(Compression::Fractal),
        _ => Err(XcfParseError::InvalidInput(format!(
            "Unknown compression type: {}",
            id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(data: &[u8], scope: PropertyScope) -> Result<Vec<Property>> {
        let mut reader = XcfReader::new(data);
        let mut properties = Vec::new();
        loop {
            match Property::read(&mut reader, scope)? {
                Property::End => return Ok(properties),
                other => properties.push(other),
            }
        }
    }

    #[test]
    fn layer_properties() {
        let data = [
            0, 0, 0, 15, 0, 0, 0, 8, 0xFF, 0xFF, 0xFF, 0xFB, 0, 0, 0, 3, // offsets
            0, 0, 0, 8, 0, 0, 0, 4, 0, 0, 0, 0, // visible
            0, 0, 0, 6, 0, 0, 0, 4, 0, 0, 0, 0x80, // opacity
            0, 0, 0, 0, 0, 0, 0, 0,
        ];
        assert_eq!(
            read_all(&data, PropertyScope::Layer).unwrap(),
            vec![
                Property::Offsets { x: -5, y: 3 },
                Property::Visible(false),
                Property::Opacity(0x80),
            ]
        );
    }

    #[test]
    fn unknown_properties_are_skipped() {
        let data = [
            0, 0, 0, 19, 0, 0, 0, 3, 1, 2, 3, // resolution with odd length
            0, 0, 0, 8, 0, 0, 0, 4, 0, 0, 0, 1, // visible
            0, 0, 0, 0, 0, 0, 0, 0,
        ];
        assert_eq!(
            read_all(&data, PropertyScope::Layer).unwrap(),
            vec![
                Property::Other { tag: 19, length: 3 },
                Property::Visible(true)
            ]
        );
    }

    #[test]
    fn layer_tags_are_not_interpreted_on_canvas() {
        let data = [0, 0, 0, 6, 0, 0, 0, 4, 0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            read_all(&data, PropertyScope::Canvas).unwrap(),
            vec![Property::Other { tag: 6, length: 4 }]
        );
    }

    #[test]
    fn colormap_length_is_computed_from_count() {
        let data = [
            0, 0, 0, 1, 0, 0, 0, 99, // declared length is wrong
            0, 0, 0, 2, 1, 2, 3, 4, 5, 6, // two colors
            0, 0, 0, 17, 0, 0, 0, 1, 1, // compression
            0, 0, 0, 0, 0, 0, 0, 0,
        ];
        assert_eq!(
            read_all(&data, PropertyScope::Canvas).unwrap(),
            vec![
                Property::Colormap { num_colors: 2 },
                Property::Compression(Compression::Rle),
            ]
        );
    }

    #[test]
    fn oversized_known_property_is_skipped_to_its_end() {
        let data = [
            0, 0, 0, 8, 0, 0, 0, 6, 0, 0, 0, 1, 0xEE, 0xEE, // visible plus padding
            0, 0, 0, 0, 0, 0, 0, 0,
        ];
        assert_eq!(
            read_all(&data, PropertyScope::Layer).unwrap(),
            vec![Property::Visible(true)]
        );
    }

    #[test]
    fn unknown_compression_code() {
        let data = [0, 0, 0, 17, 0, 0, 0, 1, 7];
        assert!(read_all(&data, PropertyScope::Canvas)
            .unwrap_err()
            .is_format_error());
    }

    #[test]
    fn truncated_property_is_io_error() {
        let data = [0, 0, 0, 21, 0, 0, 0, 40, 1, 2];
        match read_all(&data, PropertyScope::Layer) {
            Err(XcfParseError::IoError { stage, .. }) => assert_eq!(stage, Stage::Property),
            other => panic!("Expected I/O error, got {:?}", other),
        }
    }
}
