//! Output formatting: present collated results.
//!
//! Formatters only render; every classification decision has already been
//! made by [`ResultsCollater`]. Three formats are available:
//!
//! - **fancy**: symbols and colours for a terminal
//! - **tap**: Test Anything Protocol, version 13
//! - **json**: the collated model itself

pub mod fancy;
pub mod json;
pub mod tap;

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use crate::collate::ResultsCollater;

pub use fancy::FancyFormatter;
pub use json::JsonFormatter;
pub use tap::TapFormatter;

/// Renders a [`ResultsCollater`] to a writer.
pub trait Formatter {
    /// Name used to select this formatter on the command line.
    fn name(&self) -> &'static str;

    fn print_results(&self, out: &mut dyn Write, results: &ResultsCollater) -> io::Result<()>;
}

/// The available formatters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatterKind {
    #[default]
    Fancy,
    Tap,
    Json,
}

impl FormatterKind {
    pub const ALL: [FormatterKind; 3] = [FormatterKind::Fancy, FormatterKind::Tap, FormatterKind::Json];

    pub fn name(self) -> &'static str {
        match self {
            FormatterKind::Fancy => "fancy",
            FormatterKind::Tap => "tap",
            FormatterKind::Json => "json",
        }
    }

    /// Build the formatter; `color` only affects `fancy`.
    pub fn formatter(self, color: bool) -> Box<dyn Formatter> {
        match self {
            FormatterKind::Fancy => Box::new(FancyFormatter::new(color)),
            FormatterKind::Tap => Box::new(TapFormatter),
            FormatterKind::Json => Box::new(JsonFormatter),
        }
    }
}

impl fmt::Display for FormatterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatterKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown format: {}. Use: fancy, tap, json", s))
    }
}

/// Render `results` into a string.
pub fn render_to_string(formatter: &dyn Formatter, results: &ResultsCollater) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = formatter.print_results(&mut buffer, results);
    String::from_utf8_lossy(&buffer).into_owned()
}
