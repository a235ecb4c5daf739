//! Collation of plugin results into the normalized message model.
//!
//! [`ResultsCollater`] is built once from the ordered results of a run. It
//! normalizes every successful plugin's output (see [`normalize`]), turns
//! every failed plugin into a STOP error, partitions the messages by
//! location and tallies severities. Formatters only read from it.
//!
//! ```rust
//! use preflightlib::{PluginRef, PluginResult, ResultsCollater, Severity};
//! use serde_json::json;
//!
//! let collater = ResultsCollater::new(vec![
//!     (PluginRef::new(0, "spelling"), PluginResult::success(json!("hello"))),
//!     (PluginRef::new(1, "broken"), PluginResult::failure(1, "boom")),
//! ]);
//!
//! assert_eq!(collater.counts.get(Severity::Info), 1);
//! assert_eq!(collater.counts.get(Severity::Stop), 1);
//! assert_eq!(collater.reporters.len(), 2);
//! ```

pub mod normalize;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::message::{Message, PluginId, PluginRef, Severity};

pub use normalize::{normalize, Finding};

/// Body of the error message for a failed plugin that wrote nothing to stderr.
pub const FALLBACK_ERROR_BODY: &str = "Plugin failed without writing an error message";

/// Raw outcome of running one plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginResult {
    pub exit_code: i32,
    pub stdout: Value,
    pub stderr: String,
}

impl PluginResult {
    pub fn new(exit_code: i32, stdout: Value, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout,
            stderr: stderr.into(),
        }
    }

    /// A zero exit with the given output and no error text.
    pub fn success(stdout: Value) -> Self {
        Self::new(0, stdout, "")
    }

    /// A non-zero exit with no output.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::new(exit_code, Value::Null, stderr)
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Messages partitioned by location, each in production order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollatedMessages {
    pub commit: Vec<Message>,
    pub file: Vec<Message>,
    pub line: Vec<Message>,
}

impl CollatedMessages {
    fn push(&mut self, message: Message) {
        match (message.file_name(), message.line_number()) {
            (None, _) => self.commit.push(message),
            (Some(_), None) => self.file.push(message),
            (Some(_), Some(_)) => self.line.push(message),
        }
    }

    pub fn len(&self) -> usize {
        self.commit.len() + self.file.len() + self.line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of messages per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub info: usize,
    pub warn: usize,
    pub stop: usize,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Info => self.info,
            Severity::Warn => self.warn,
            Severity::Stop => self.stop,
        }
    }

    pub fn total(&self) -> usize {
        self.info + self.warn + self.stop
    }

    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Info => self.info += 1,
            Severity::Warn => self.warn += 1,
            Severity::Stop => self.stop += 1,
        }
    }
}

/// The collated view of one run's plugin results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultsCollater {
    /// Every plugin, in input order
    pub plugins: Vec<PluginRef>,
    /// Plugins that produced a message or failed, in input order
    pub reporters: Vec<PluginId>,
    /// One STOP message per failed plugin
    pub errors: Vec<Message>,
    pub messages: CollatedMessages,
    /// Severity tally over all messages and errors
    pub counts: SeverityCounts,
}

impl ResultsCollater {
    /// Collate `results`, preserving their order.
    pub fn new(results: Vec<(PluginRef, PluginResult)>) -> Self {
        let mut collater = Self::default();

        for (plugin, result) in results {
            collater.collate_one(&plugin, result);
            collater.plugins.push(plugin);
        }

        collater
    }

    fn collate_one(&mut self, plugin: &PluginRef, result: PluginResult) {
        if !result.is_success() {
            debug!(
                plugin = %plugin.name,
                exit_code = result.exit_code,
                "plugin failed, ignoring its output"
            );
            let body = if result.stderr.trim().is_empty() {
                FALLBACK_ERROR_BODY.to_string()
            } else {
                result.stderr
            };
            self.counts.record(Severity::Stop);
            self.errors
                .push(Message::commit(plugin.id, Severity::Stop, body));
            self.add_reporter(plugin.id);
            return;
        }

        let findings = normalize(&result.stdout);
        debug!(plugin = %plugin.name, findings = findings.len(), "collated plugin output");
        if findings.is_empty() {
            return;
        }

        for finding in findings {
            let message = finding.into_message(plugin.id);
            self.counts.record(message.severity());
            self.messages.push(message);
        }
        self.add_reporter(plugin.id);
    }

    fn add_reporter(&mut self, id: PluginId) {
        if !self.reporters.contains(&id) {
            self.reporters.push(id);
        }
    }

    /// Every message in presentation order: commit, file, line, then errors.
    pub fn ordered_messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages
            .commit
            .iter()
            .chain(&self.messages.file)
            .chain(&self.messages.line)
            .chain(&self.errors)
    }

    /// Name of the plugin with the given id.
    pub fn plugin_name(&self, id: PluginId) -> Option<&str> {
        self.plugins
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.as_str())
    }

    /// Whether nothing was reported and nothing failed.
    pub fn is_quiet(&self) -> bool {
        self.reporters.is_empty() && self.errors.is_empty()
    }

    /// Whether any message (errors included) asks to stop the commit.
    pub fn has_stop(&self) -> bool {
        self.counts.stop > 0
    }
}
