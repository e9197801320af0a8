use std::{error::Error, fmt, io, string::FromUtf8Error};

/// The part of the file the decoder was working on when an I/O error
/// occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the input file.
    Open,
    /// The fixed-size file header.
    Header,
    /// A canvas or layer property record.
    Property,
    /// The list of layer pointers following the canvas properties.
    LayerDirectory,
    /// A layer header, name or trailing pointers.
    Layer,
    /// The pixel hierarchy, level header or tile pointer table.
    Hierarchy,
    /// Run-length encoded tile data.
    Tile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Open => "opening file",
            Stage::Header => "header",
            Stage::Property => "property",
            Stage::LayerDirectory => "layer directory",
            Stage::Layer => "layer",
            Stage::Hierarchy => "pixel hierarchy",
            Stage::Tile => "RLE tile data",
        };
        f.write_str(name)
    }
}

/// An error occured while reading the XCF file.
#[derive(Debug)]
pub enum XcfParseError {
    /// The input data was malformed. String contains detailed message.
    InvalidInput(String),
    /// The input data was correct, but uses a feature that is not supported by
    /// this version of `xcfile`. String contains detailed message.
    UnsupportedFeature(String),
    /// An IO error occured. Also includes errors where the input was shorter
    /// than expected.
    IoError {
        /// What the decoder was reading when the error occurred.
        stage: Stage,
        /// The underlying error.
        source: io::Error,
    },
}

impl XcfParseError {
    /// Returns `true` if the file structure itself was rejected, as opposed to
    /// the input failing to deliver bytes.
    pub fn is_format_error(&self) -> bool {
        match self {
            XcfParseError::InvalidInput(_) | XcfParseError::UnsupportedFeature(_) => true,
            XcfParseError::IoError { .. } => false,
        }
    }

    pub(crate) fn io(stage: Stage, source: io::Error) -> Self {
        XcfParseError::IoError { stage, source }
    }
}

impl From<FromUtf8Error> for XcfParseError {
    fn from(err: FromUtf8Error) -> Self {
        XcfParseError::InvalidInput(format!("Could not decode utf8: {}", err))
    }
}

impl fmt::Display for XcfParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XcfParseError::InvalidInput(msg) => write!(f, "Invalid XCF input: {}", msg),
            XcfParseError::UnsupportedFeature(msg) => {
                write!(f, "Unsupported XCF feature: {}", msg)
            }
            XcfParseError::IoError { stage, source } => {
                write!(f, "I/O error while reading {}: {}", stage, source)
            }
        }
    }
}

impl Error for XcfParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            XcfParseError::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}
