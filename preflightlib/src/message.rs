//! The normalized finding model shared by the collater and the formatters.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Stop,
}

impl Severity {
    /// All severities, least serious first.
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warn, Severity::Stop];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Stop => "stop",
        }
    }

    /// Parse a severity token as plugins write it.
    ///
    /// Accepts `info`/`i`, `warn`/`w`/`warning` and `stop`/`s`, ignoring case
    /// and surrounding whitespace.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "info" | "i" => Some(Severity::Info),
            "warn" | "w" | "warning" => Some(Severity::Warn),
            "stop" | "s" => Some(Severity::Stop),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of a plugin within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(pub usize);

/// A plugin as seen by the collater and formatters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginRef {
    pub id: PluginId,
    pub name: String,
}

impl PluginRef {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id: PluginId(id),
            name: name.into(),
        }
    }
}

/// Where a finding points.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Location {
    Commit,
    File(String),
    Line(String, NonZeroU32),
}

/// One normalized plugin finding.
///
/// A message is commit-level, file-level or line-level. A line number always
/// comes with a file; the constructors make any other combination
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    plugin: PluginId,
    severity: Severity,
    body: String,
    location: Location,
}

impl Message {
    /// A finding about the change set as a whole.
    pub fn commit(plugin: PluginId, severity: Severity, body: impl Into<String>) -> Self {
        Self::at(plugin, severity, body, Location::Commit)
    }

    /// A finding about one file.
    pub fn file(
        plugin: PluginId,
        severity: Severity,
        body: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self::at(plugin, severity, body, Location::File(file.into()))
    }

    /// A finding about one line of one file.
    pub fn line(
        plugin: PluginId,
        severity: Severity,
        body: impl Into<String>,
        file: impl Into<String>,
        line: NonZeroU32,
    ) -> Self {
        Self::at(plugin, severity, body, Location::Line(file.into(), line))
    }

    fn at(plugin: PluginId, severity: Severity, body: impl Into<String>, location: Location) -> Self {
        Self {
            plugin,
            severity,
            body: body.into(),
            location,
        }
    }

    pub fn plugin(&self) -> PluginId {
        self.plugin
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// File the finding refers to, if any.
    pub fn file_name(&self) -> Option<&str> {
        match &self.location {
            Location::Commit => None,
            Location::File(file) | Location::Line(file, _) => Some(file),
        }
    }

    /// Line the finding refers to, if any.
    pub fn line_number(&self) -> Option<u32> {
        match &self.location {
            Location::Line(_, line) => Some(line.get()),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct MessageRecord<'a> {
    plugin: PluginId,
    #[serde(rename = "type")]
    severity: Severity,
    body: &'a str,
    file: Option<&'a str>,
    line: Option<u32>,
}

impl Serialize for Message {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MessageRecord {
            plugin: self.plugin,
            severity: self.severity,
            body: &self.body,
            file: self.file_name(),
            line: self.line_number(),
        }
        .serialize(serializer)
    }
}
