//! Terminal output with symbols and colours.
//!
//! ```text
//! ▾  pep8
//!
//! ⚠  line 3: src/app.py
//!     E501 line too long
//!
//! 👉  Ran 1 plugin
//!     Info 0 Warn 1 Stop 0
//! ```

use std::io::{self, Write};

use console::Style;

use super::Formatter;
use crate::collate::ResultsCollater;
use crate::message::{Message, PluginId, Severity};

const OK_SIGN: &str = "\u{1f44c}";
const ATTENTION: &str = "\u{1f449}";
const EXPLODE: &str = "\u{1f4a5}";
const GROUP: &str = "\u{25be}";

/// Human-oriented formatter.
#[derive(Debug, Clone)]
pub struct FancyFormatter {
    info: Style,
    warn: Style,
    stop: Style,
}

impl FancyFormatter {
    /// `color` switches ANSI styling on or off regardless of the terminal.
    pub fn new(color: bool) -> Self {
        Self {
            info: Style::new().green().bold().force_styling(color),
            warn: Style::new().yellow().bold().force_styling(color),
            stop: Style::new().red().bold().force_styling(color),
        }
    }

    fn style(&self, severity: Severity) -> &Style {
        match severity {
            Severity::Info => &self.info,
            Severity::Warn => &self.warn,
            Severity::Stop => &self.stop,
        }
    }

    fn symbol(&self, severity: Severity) -> String {
        let symbol = match severity {
            Severity::Info => "\u{2713}",
            Severity::Warn => "\u{26a0}",
            Severity::Stop => "\u{2715}",
        };
        self.style(severity).apply_to(symbol).to_string()
    }

    /// A count, highlighted when non-zero.
    fn count(&self, severity: Severity, count: usize) -> String {
        if count == 0 {
            count.to_string()
        } else {
            self.style(severity).apply_to(count).to_string()
        }
    }
}

impl Default for FancyFormatter {
    fn default() -> Self {
        Self::new(false)
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "plugin"
    } else {
        "plugins"
    }
}

/// `line L: FILE`, `FILE`, or nothing for commit-level messages.
fn message_header(message: &Message) -> Option<String> {
    match (message.file_name(), message.line_number()) {
        (Some(file), Some(line)) => Some(format!("line {}: {}", line, file)),
        (Some(file), None) => Some(file.to_string()),
        _ => None,
    }
}

fn format_message(message: &Message) -> String {
    match message_header(message) {
        Some(header) => {
            let body: Vec<String> = message
                .body()
                .lines()
                .map(|line| format!("    {}", line))
                .collect();
            format!("{}\n{}", header, body.join("\n"))
        }
        None => message.body().to_string(),
    }
}

impl Formatter for FancyFormatter {
    fn name(&self) -> &'static str {
        "fancy"
    }

    fn print_results(&self, out: &mut dyn Write, results: &ResultsCollater) -> io::Result<()> {
        let plugin_count = results.plugins.len();

        if results.is_quiet() {
            return writeln!(
                out,
                "{}  Ran {} {}, nothing to report",
                OK_SIGN,
                plugin_count,
                plural(plugin_count)
            );
        }

        let mut last_plugin: Option<PluginId> = None;
        for message in results.ordered_messages() {
            if last_plugin != Some(message.plugin()) {
                let name = results.plugin_name(message.plugin()).unwrap_or("unknown");
                writeln!(out, "{}  {}", GROUP, name)?;
                writeln!(out)?;
                last_plugin = Some(message.plugin());
            }
            writeln!(
                out,
                "{}  {}",
                self.symbol(message.severity()),
                format_message(message)
            )?;
            writeln!(out)?;
        }

        let counts = results.counts;
        let sign = if results.has_stop() { EXPLODE } else { ATTENTION };
        writeln!(out, "{}  Ran {} {}", sign, plugin_count, plural(plugin_count))?;
        writeln!(
            out,
            "    Info {} Warn {} Stop {}",
            self.count(Severity::Info, counts.info),
            self.count(Severity::Warn, counts.warn),
            self.count(Severity::Stop, counts.stop)
        )?;

        let errors = results.errors.len();
        if errors > 0 {
            writeln!(out, "    ({} {} reported errors)", errors, plural(errors))?;
        }

        Ok(())
    }
}
