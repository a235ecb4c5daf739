//! JSON output of the collated model.

use std::io::{self, Write};

use super::Formatter;
use crate::collate::ResultsCollater;

/// Pretty-printed [`ResultsCollater`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn print_results(&self, out: &mut dyn Write, results: &ResultsCollater) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, results)?;
        writeln!(out)
    }
}
