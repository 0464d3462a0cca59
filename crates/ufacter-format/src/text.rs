//! Line-oriented renderings

use std::io::Write;

use tracing::trace;
use ufacter_core::Namespace;

use crate::Formatter;
use crate::error::FormatError;

/// One `dotted.key=value` line per leaf
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatFormatter;

impl Formatter for FlatFormatter {
    fn render(&self, namespace: &Namespace, out: &mut dyn Write) -> Result<(), FormatError> {
        let leaves = namespace.leaves();
        trace!(leaves = leaves.len(), "rendering flat lines");
        for (key, value) in leaves {
            writeln!(out, "{key}={value}")?;
        }
        Ok(())
    }
}

/// `key => value` lines with keys padded to a common width
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextFormatter;

impl Formatter for PlaintextFormatter {
    fn render(&self, namespace: &Namespace, out: &mut dyn Write) -> Result<(), FormatError> {
        let leaves = namespace.leaves();
        trace!(leaves = leaves.len(), "rendering plaintext lines");
        let width = leaves
            .iter()
            .map(|(key, _)| key.chars().count())
            .max()
            .unwrap_or(0);
        for (key, value) in leaves {
            writeln!(out, "{key:<width$} => {value}")?;
        }
        Ok(())
    }
}
