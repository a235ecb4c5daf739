//! # preflightlib
//!
//! Run external analysis plugins against a git repository's pending changes
//! and normalize what they report.
//!
//! ## Overview
//!
//! A check goes through four stages:
//!
//! 1. **Diff**: the staged changes (or a revision range) become one
//!    [`FileChangeRecord`] per file, with an annotated line diff
//! 2. **Run**: every plugin receives the records as JSON on stdin
//! 3. **Collate**: whatever each plugin wrote to stdout is normalized into
//!    [`Message`]s with a [`Severity`], and failed plugins become errors
//! 4. **Format**: a [`Formatter`] renders the collated results
//!
//! Plugins are loosely typed: a plain string, a list of `[type, body]`
//! pairs, or a mapping of file names to per-file entries are all accepted.
//! See [`collate::normalize`] for the full table.
//!
//! ## Example
//!
//! ```rust
//! use preflightlib::{diff_lines, LineTag};
//!
//! let diff = diff_lines("one\ntwo\n", "one\n2\n");
//! let tags: Vec<_> = diff.iter().map(|r| r.tag).collect();
//! assert_eq!(tags, vec![LineTag::Unchanged, LineTag::Removed, LineTag::Added]);
//! ```
//!
//! Running a check against a repository:
//!
//! ```rust,no_run
//! use preflightlib::{check, FilterConfig, FormatterKind, Plugin, RunOptions};
//!
//! let options = RunOptions::new()
//!     .plugins(Plugin::parse_all(&["lint=./plugins/lint"])?)
//!     .filter(FilterConfig::new().exclude("vendor/**")?);
//!
//! let results = check(".", &options)?;
//! let formatter = FormatterKind::Fancy.formatter(true);
//! formatter.print_results(&mut std::io::stdout(), &results)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod collate;
pub mod diff;
pub mod error;
pub mod filter;
pub mod hook;
pub mod message;
pub mod options;
pub mod output;
pub mod plugin;
pub mod runner;

#[cfg(test)]
mod test_support;

pub use collate::{CollatedMessages, PluginResult, ResultsCollater, SeverityCounts};
pub use diff::{
    diff_lines, BlobSource, ChangeDescriptor, ChangeKind, FileChangeRecord, FileDiffIndex,
    GitRepository, LineRecord, LineTag,
};
pub use error::PreflightError;
pub use filter::FilterConfig;
pub use hook::install_hook;
pub use message::{Message, PluginId, PluginRef, Severity};
pub use options::{ChangeSource, RunOptions};
pub use output::{Formatter, FormatterKind};
pub use plugin::{Plugin, PluginExecutor, ProcessExecutor};
pub use runner::{check, run};

/// Result type for preflightlib operations
pub type Result<T> = std::result::Result<T, PreflightError>;
