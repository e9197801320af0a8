/// Settings that change how a file is decoded.
///
/// ```
/// use xcfile::DecodeOptions;
///
/// let options = DecodeOptions::default().with_default_opacity(0);
/// assert_eq!(options.default_opacity(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    default_opacity: u8,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            default_opacity: 255,
        }
    }
}

impl DecodeOptions {
    /// Same as `DecodeOptions::default()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opacity given to layers that have no opacity property. GIMP always
    /// writes one, so this only matters for files from other producers.
    /// Defaults to 255 (fully opaque).
    pub fn with_default_opacity(mut self, opacity: u8) -> Self {
        self.default_opacity = opacity;
        self
    }

    /// Opacity used for layers without an opacity property.
    pub fn default_opacity(&self) -> u8 {
        self.default_opacity
    }
}
