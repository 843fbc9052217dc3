//! Option loading and saving
//!
//! Uses RON for human-readable option files. Unknown keys are rejected and
//! loaded options are validated before they are returned.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::rasterizer::{PerspectiveOptions, RenderingOptions};

/// Load rendering options from a RON file
pub fn load_rendering_options<P: AsRef<Path>>(path: P) -> Result<RenderingOptions, ConfigError> {
    let contents = fs::read_to_string(path)?;
    rendering_options_from_str(&contents)
}

/// Load rendering options from a RON string
pub fn rendering_options_from_str(s: &str) -> Result<RenderingOptions, ConfigError> {
    let options: RenderingOptions = ron::from_str(s)?;
    options.validate()?;
    Ok(options)
}

/// Save rendering options to a RON file
pub fn save_rendering_options<P: AsRef<Path>>(
    options: &RenderingOptions,
    path: P,
) -> Result<(), ConfigError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(options, config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Load perspective options from a RON file
pub fn load_perspective_options<P: AsRef<Path>>(path: P) -> Result<PerspectiveOptions, ConfigError> {
    let contents = fs::read_to_string(path)?;
    perspective_options_from_str(&contents)
}

/// Load perspective options from a RON string
pub fn perspective_options_from_str(s: &str) -> Result<PerspectiveOptions, ConfigError> {
    let options: PerspectiveOptions = ron::from_str(s)?;
    options.validate()?;
    Ok(options)
}
