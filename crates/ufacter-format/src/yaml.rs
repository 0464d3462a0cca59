//! YAML rendering

use std::io::Write;

use ufacter_core::Namespace;

use crate::Formatter;
use crate::error::FormatError;

/// Renders the namespace as one YAML document
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormatter;

impl Formatter for YamlFormatter {
    fn render(&self, namespace: &Namespace, out: &mut dyn Write) -> Result<(), FormatError> {
        let document =
            serde_yaml::to_string(namespace).map_err(|e| FormatError::Serialize(e.to_string()))?;
        out.write_all(document.as_bytes())?;
        Ok(())
    }
}
