//! Error types for texture operations and option loading

use std::path::PathBuf;

/// Error type for texture operations
///
/// Validation variants are raised before any pixel is touched. Degenerate
/// geometry (singular transforms, rays that miss the ground, empty rects)
/// is never an error.
#[derive(Debug)]
pub enum TextureError {
    /// Width or height was zero
    InvalidSize { width: usize, height: usize },
    /// A color channel outside 0..=255
    InvalidColor { r: i32, g: i32, b: i32, a: i32 },
    /// Tone outside -255..=255 or saturation outside 0..=255
    InvalidTone { red: i32, green: i32, blue: i32, saturation: i32 },
    /// Perspective view angle not in (0, PI)
    InvalidViewAngle(f64),
    /// Dump format contained something other than r, g, b, a
    InvalidFormat(char),
    InvalidDataSize { expected: usize, actual: usize },
    OutOfRange { x: i32, y: i32 },
    /// Direct pixel writes on a paletted texture
    PaletteLocked,
    /// Palette operation on a texture without a palette
    NoPalette,
    Disposed,
    Image(image::ImageError),
    Png(png::DecodingError),
    Io(std::io::Error),
    FontNotFound(PathBuf),
}

impl From<image::ImageError> for TextureError {
    fn from(e: image::ImageError) -> Self {
        TextureError::Image(e)
    }
}

impl From<png::DecodingError> for TextureError {
    fn from(e: png::DecodingError) -> Self {
        TextureError::Png(e)
    }
}

impl From<std::io::Error> for TextureError {
    fn from(e: std::io::Error) -> Self {
        TextureError::Io(e)
    }
}

impl std::fmt::Display for TextureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureError::InvalidSize { width, height } => {
                write!(f, "invalid texture size: {}x{}", width, height)
            }
            TextureError::InvalidColor { r, g, b, a } => {
                write!(f, "invalid color value: (r:{}, g:{}, b:{}, a:{})", r, g, b, a)
            }
            TextureError::InvalidTone { red, green, blue, saturation } => write!(
                f,
                "invalid tone value: (r:{}, g:{}, b:{}, s:{})",
                red, green, blue, saturation
            ),
            TextureError::InvalidViewAngle(angle) => write!(f, "invalid view angle: {}", angle),
            TextureError::InvalidFormat(c) => write!(f, "invalid dump format character: {:?}", c),
            TextureError::InvalidDataSize { expected, actual } => {
                write!(f, "invalid data size: {} expected but was {}", expected, actual)
            }
            TextureError::OutOfRange { x, y } => write!(f, "index out of range: ({}, {})", x, y),
            TextureError::PaletteLocked => write!(f, "can't modify a texture with a palette"),
            TextureError::NoPalette => write!(f, "no palette texture"),
            TextureError::Disposed => write!(f, "can't access a disposed texture"),
            TextureError::Image(e) => write!(f, "Image error: {}", e),
            TextureError::Png(e) => write!(f, "PNG error: {}", e),
            TextureError::Io(e) => write!(f, "IO error: {}", e),
            TextureError::FontNotFound(path) => write!(f, "font not found: {}", path.display()),
        }
    }
}

impl std::error::Error for TextureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TextureError::Image(e) => Some(e),
            TextureError::Png(e) => Some(e),
            TextureError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Error type for loading option files
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    Invalid(TextureError),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(e)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(e: ron::Error) -> Self {
        ConfigError::SerializeError(e)
    }
}

impl From<TextureError> for ConfigError {
    fn from(e: TextureError) -> Self {
        ConfigError::Invalid(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            ConfigError::Invalid(e) => write!(f, "Invalid options: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

pub type Result<T> = std::result::Result<T, TextureError>;
