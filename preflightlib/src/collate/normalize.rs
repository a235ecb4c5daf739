//! Normalization of raw plugin output into findings.
//!
//! Plugins write JSON to stdout. The accepted shapes are:
//!
//! | shape                                   | result                         |
//! |-----------------------------------------|--------------------------------|
//! | `null`, `""`                            | nothing                        |
//! | `"text"`                                | commit-level info              |
//! | `["text", ["warn", "text"], ...]`       | one commit-level finding each  |
//! | `{"file": "text"}`                      | file-level info                |
//! | `{"file": [["text"]]}`                  | file-level info                |
//! | `{"file": [[type, "text"]]}`            | file-level, `null` type = warn |
//! | `{"file": [[line, type, "text"]]}`      | line-level, `null` type = info |
//! | `{"file": [[null, type, "text"]]}`      | file-level, `null` type = info |
//!
//! Entries that fit none of these are dropped one by one; a malformed entry
//! never affects its neighbours.

use std::num::NonZeroU32;

use serde_json::Value;
use tracing::trace;

use crate::message::{Message, PluginId, Severity};

/// A finding extracted from raw plugin output, before it is tied to a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Commit {
        severity: Severity,
        body: String,
    },
    File {
        file: String,
        severity: Severity,
        body: String,
    },
    Line {
        file: String,
        line: NonZeroU32,
        severity: Severity,
        body: String,
    },
}

impl Finding {
    /// Attach the finding to the plugin that produced it.
    pub fn into_message(self, plugin: PluginId) -> Message {
        match self {
            Finding::Commit { severity, body } => Message::commit(plugin, severity, body),
            Finding::File {
                file,
                severity,
                body,
            } => Message::file(plugin, severity, body, file),
            Finding::Line {
                file,
                line,
                severity,
                body,
            } => Message::line(plugin, severity, body, file, line),
        }
    }
}

/// Severity field of an entry.
enum Token {
    /// `null` or blank: the caller picks the default
    Missing,
    Known(Severity),
    Unknown,
}

fn token(value: &Value) -> Token {
    match value {
        Value::Null => Token::Missing,
        Value::String(s) if s.trim().is_empty() => Token::Missing,
        Value::String(s) => Severity::from_token(s).map_or(Token::Unknown, Token::Known),
        _ => Token::Unknown,
    }
}

fn severity_or(value: &Value, default: Severity) -> Option<Severity> {
    match token(value) {
        Token::Missing => Some(default),
        Token::Known(severity) => Some(severity),
        Token::Unknown => None,
    }
}

/// Message text; blank text carries no finding.
fn body(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Normalize one plugin's raw output.
pub fn normalize(raw: &Value) -> Vec<Finding> {
    match raw {
        Value::String(_) => body(raw)
            .map(|body| Finding::Commit {
                severity: Severity::Info,
                body,
            })
            .into_iter()
            .collect(),
        Value::Array(entries) => entries.iter().filter_map(commit_entry).collect(),
        Value::Object(files) => files
            .iter()
            .flat_map(|(file, value)| file_findings(file, value))
            .collect(),
        _ => Vec::new(),
    }
}

/// `"text"` or `[type, "text"]`.
fn commit_entry(entry: &Value) -> Option<Finding> {
    let finding = match entry {
        Value::String(_) => body(entry).map(|body| Finding::Commit {
            severity: Severity::Info,
            body,
        }),
        Value::Array(fields) => match fields.as_slice() {
            [kind, text] => severity_or(kind, Severity::Info)
                .zip(body(text))
                .map(|(severity, body)| Finding::Commit { severity, body }),
            _ => None,
        },
        _ => None,
    };

    if finding.is_none() {
        trace!(?entry, "skipping commit-level entry");
    }
    finding
}

fn file_findings(file: &str, value: &Value) -> Vec<Finding> {
    match value {
        Value::String(_) => body(value)
            .map(|body| Finding::File {
                file: file.to_string(),
                severity: Severity::Info,
                body,
            })
            .into_iter()
            .collect(),
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| file_entry(file, entry))
            .collect(),
        _ => {
            trace!(file, ?value, "skipping file output");
            Vec::new()
        }
    }
}

/// An entry under a file key, interpreted by its arity.
fn file_entry(file: &str, entry: &Value) -> Option<Finding> {
    let Value::Array(fields) = entry else {
        trace!(file, ?entry, "skipping file entry that is not a list");
        return None;
    };

    let file_level = |severity: Severity, body: String| Finding::File {
        file: file.to_string(),
        severity,
        body,
    };

    let finding = match fields.as_slice() {
        [text] => body(text).map(|body| file_level(Severity::Info, body)),
        // A bare null marker flags the whole file as a warning
        [kind, text] => severity_or(kind, Severity::Warn)
            .zip(body(text))
            .map(|(severity, body)| file_level(severity, body)),
        [Value::Null, kind, text] => severity_or(kind, Severity::Info)
            .zip(body(text))
            .map(|(severity, body)| file_level(severity, body)),
        [line, kind, text] => line_number(line)
            .zip(severity_or(kind, Severity::Info))
            .zip(body(text))
            .map(|((line, severity), body)| Finding::Line {
                file: file.to_string(),
                line,
                severity,
                body,
            }),
        _ => None,
    };

    if finding.is_none() {
        trace!(file, ?entry, "skipping file entry");
    }
    finding
}

fn line_number(value: &Value) -> Option<NonZeroU32> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .and_then(NonZeroU32::new)
}
