//! ufacter-format: renderings of a finished fact namespace

pub mod error;
pub mod format;
pub mod json;
pub mod text;
pub mod yaml;

use std::io::Write;

use tracing::debug;
use ufacter_core::Namespace;

pub use error::FormatError;
pub use format::Format;
pub use json::JsonFormatter;
pub use text::{FlatFormatter, PlaintextFormatter};
pub use yaml::YamlFormatter;

/// Serializes a namespace into a byte sink
pub trait Formatter: Send + Sync {
    /// Write the whole document
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    fn render(&self, namespace: &Namespace, out: &mut dyn Write) -> Result<(), FormatError>;

    /// Render into a string
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    fn render_to_string(&self, namespace: &Namespace) -> Result<String, FormatError> {
        let mut buf = Vec::new();
        self.render(namespace, &mut buf)?;
        String::from_utf8(buf).map_err(|e| FormatError::Serialize(e.to_string()))
    }
}

/// Formatter for the selected output format
#[must_use]
pub fn formatter_for(format: Format) -> Box<dyn Formatter> {
    debug!(%format, "selected output format");
    match format {
        Format::Json => Box::new(JsonFormatter::pretty()),
        Format::Yaml => Box::new(YamlFormatter),
        Format::Flat => Box::new(FlatFormatter),
        Format::Plaintext => Box::new(PlaintextFormatter),
    }
}
