//! Line diffs and per-file change records.
//!
//! - [`lines`]: line-level edit script between two texts
//! - [`kind`]: what happened to a file as a whole
//! - [`index`]: lazy per-file records over an injected blob source
//! - [`git`]: change descriptors and blobs from a git repository

pub mod git;
pub mod index;
pub mod kind;
pub mod lines;

pub use git::{GitBlobSource, GitRepository, ObjectId};
pub use index::{BlobSource, ChangeDescriptor, FileChangeRecord, FileDiffIndex};
pub use kind::ChangeKind;
pub use lines::{diff_lines, opcodes, LineRecord, LineTag, OpKind, Opcode};
