//! Test Anything Protocol output.
//!
//! Every message is a test point; INFO messages pass, WARN and STOP fail.
//! Details go into a YAML block under each point.

use std::io::{self, Write};

use super::Formatter;
use crate::collate::ResultsCollater;
use crate::message::{Message, Severity};

/// TAP version 13 formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TapFormatter;

fn description(message: &Message) -> String {
    let text = match (message.file_name(), message.line_number()) {
        (Some(file), Some(line)) => format!("{}:{}", file, line),
        (Some(file), None) => file.to_string(),
        _ => message.body().to_string(),
    };
    if text.is_empty() {
        String::new()
    } else {
        format!(" - {}", text)
    }
}

impl TapFormatter {
    fn write_point(
        &self,
        out: &mut dyn Write,
        number: usize,
        message: &Message,
        plugin: &str,
    ) -> io::Result<()> {
        let status = if message.severity() == Severity::Info {
            "ok"
        } else {
            "not ok"
        };

        writeln!(out, "{} {}{}", status, number, description(message))?;
        writeln!(out, "  ---")?;
        if message.file_name().is_some() {
            writeln!(out, "  message: {}", message.body())?;
        }
        writeln!(out, "  plugin: {}", plugin)?;
        writeln!(out, "  severity: {}", message.severity())?;
        writeln!(out, "  ...")
    }
}

impl Formatter for TapFormatter {
    fn name(&self) -> &'static str {
        "tap"
    }

    fn print_results(&self, out: &mut dyn Write, results: &ResultsCollater) -> io::Result<()> {
        writeln!(out, "TAP version 13")?;
        writeln!(out, "1..{}", results.counts.total())?;

        for (index, message) in results.ordered_messages().enumerate() {
            let plugin = results.plugin_name(message.plugin()).unwrap_or("unknown");
            self.write_point(out, index + 1, message, plugin)?;
        }

        Ok(())
    }
}
