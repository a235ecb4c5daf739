//! Line-level diffing between two text buffers.
//!
//! The edit script comes from a Myers diff over the two line sequences and is
//! then coalesced so that every stretch between two unchanged runs is a single
//! `replace`, `delete` or `insert` run. Lines are numbered against the buffer
//! they belong to: removed lines carry their position in the old buffer,
//! unchanged and added lines their position in the new one.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffTag};

/// What happened to a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineTag {
    /// Present in both buffers
    Unchanged,
    /// Only present in the old buffer
    Removed,
    /// Only present in the new buffer
    Added,
}

impl LineTag {
    /// Single character marker used by unified diffs and the plugin payload.
    pub fn marker(self) -> char {
        match self {
            LineTag::Unchanged => ' ',
            LineTag::Removed => '-',
            LineTag::Added => '+',
        }
    }
}

/// One annotated line of a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    /// 1-based line number (old buffer for removed lines, new buffer otherwise)
    pub line_number: usize,
    /// Change applied to the line
    pub tag: LineTag,
    /// Line content without its terminator
    pub content: String,
}

impl LineRecord {
    fn new(line_number: usize, tag: LineTag, content: &str) -> Self {
        Self {
            line_number,
            tag,
            content: content.to_string(),
        }
    }
}

/// Kind of a coalesced run in the edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// A maximal run of the edit script, as index ranges into both buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    pub kind: OpKind,
    pub before: Range<usize>,
    pub after: Range<usize>,
}

/// Compute the coalesced edit script between two line sequences.
pub fn opcodes(before: &[&str], after: &[&str]) -> Vec<Opcode> {
    let mut runs: Vec<Opcode> = Vec::new();
    // Start of the pending non-equal stretch in both buffers
    let mut pending: Option<(usize, usize)> = None;
    let mut cursor = (0, 0);

    for op in capture_diff_slices(Algorithm::Myers, before, after) {
        let (tag, old, new) = op.as_tag_tuple();

        match tag {
            DiffTag::Equal => {
                if old.is_empty() {
                    continue;
                }
                if let Some(start) = pending.take() {
                    runs.push(change_run(start, cursor));
                }
                runs.push(Opcode {
                    kind: OpKind::Equal,
                    before: old.clone(),
                    after: new.clone(),
                });
            }
            DiffTag::Delete | DiffTag::Insert | DiffTag::Replace => {
                if pending.is_none() {
                    pending = Some((old.start, new.start));
                }
            }
        }

        cursor = (old.end, new.end);
    }

    if let Some(start) = pending {
        runs.push(change_run(start, cursor));
    }

    runs
}

fn change_run(start: (usize, usize), end: (usize, usize)) -> Opcode {
    let before = start.0..end.0;
    let after = start.1..end.1;
    let kind = match (before.is_empty(), after.is_empty()) {
        (false, false) => OpKind::Replace,
        (false, true) => OpKind::Delete,
        _ => OpKind::Insert,
    };
    Opcode {
        kind,
        before,
        after,
    }
}

/// Describe the line changes that turn `before` into `after`.
///
/// ```
/// use preflightlib::{diff_lines, LineTag};
///
/// let records = diff_lines("a\nb\nc", "a\nc\nd");
/// let summary: Vec<_> = records
///     .iter()
///     .map(|r| (r.line_number, r.tag.marker(), r.content.as_str()))
///     .collect();
///
/// assert_eq!(
///     summary,
///     vec![(1, ' ', "a"), (2, '-', "b"), (2, ' ', "c"), (3, '+', "d")]
/// );
/// ```
pub fn diff_lines(before: &str, after: &str) -> Vec<LineRecord> {
    let old: Vec<&str> = before.lines().collect();
    let new: Vec<&str> = after.lines().collect();

    let mut records = Vec::with_capacity(old.len().max(new.len()));

    for run in opcodes(&old, &new) {
        if run.kind == OpKind::Equal {
            for idx in run.after.clone() {
                records.push(LineRecord::new(idx + 1, LineTag::Unchanged, new[idx]));
            }
            continue;
        }
        if matches!(run.kind, OpKind::Replace | OpKind::Delete) {
            for idx in run.before.clone() {
                records.push(LineRecord::new(idx + 1, LineTag::Removed, old[idx]));
            }
        }
        if matches!(run.kind, OpKind::Replace | OpKind::Insert) {
            for idx in run.after.clone() {
                records.push(LineRecord::new(idx + 1, LineTag::Added, new[idx]));
            }
        }
    }

    records
}
