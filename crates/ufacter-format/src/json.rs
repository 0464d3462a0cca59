//! JSON rendering

use std::io::Write;

use ufacter_core::Namespace;

use crate::Formatter;
use crate::error::FormatError;

/// Renders the namespace as one JSON object
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Indented output for terminals
    #[must_use]
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Single-line output
    #[must_use]
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Formatter for JsonFormatter {
    fn render(&self, namespace: &Namespace, out: &mut dyn Write) -> Result<(), FormatError> {
        let result = if self.pretty {
            serde_json::to_writer_pretty(&mut *out, namespace)
        } else {
            serde_json::to_writer(&mut *out, namespace)
        };
        result.map_err(|e| {
            if e.is_io() {
                FormatError::Write(e.to_string())
            } else {
                FormatError::Serialize(e.to_string())
            }
        })?;
        writeln!(out)?;
        Ok(())
    }
}
