//! Per-file diffs for a set of change descriptors.
//!
//! [`FileDiffIndex`] pairs a list of [`ChangeDescriptor`]s with a
//! [`BlobSource`] and yields one [`FileChangeRecord`] per descriptor. Blob
//! content is only read when the iterator returned by
//! [`FileDiffIndex::files`] is advanced, so callers that stop early never
//! touch the remaining blobs.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::kind::ChangeKind;
use super::lines::{diff_lines, LineRecord};
use crate::Result;

/// Something that can hand out the content of a blob by its identity.
pub trait BlobSource {
    /// Identity of a blob (an object id for git).
    type Id: PartialEq + fmt::Debug;

    /// Read the blob as text.
    fn read_blob(&self, id: &Self::Id) -> Result<String>;
}

/// Description of a single changed file, before any content is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescriptor<Id> {
    /// File did not exist before the change
    pub new_file: bool,
    /// File does not exist after the change
    pub deleted_file: bool,
    /// File was moved from another path
    pub renamed: bool,
    /// Blob before the change, if any
    pub before_blob: Option<Id>,
    /// Blob after the change, if any
    pub after_blob: Option<Id>,
    /// Absolute path of the file in the working tree
    pub absolute_path: PathBuf,
    /// Path relative to the repository root
    pub relative_name: String,
}

impl<Id> ChangeDescriptor<Id> {
    /// Descriptor for a file that exists only after the change.
    pub fn added(root: &Path, name: impl Into<String>, after: Id) -> Self {
        Self::new(root, name, None, Some(after)).flags(true, false, false)
    }

    /// Descriptor for a file that exists only before the change.
    pub fn deleted(root: &Path, name: impl Into<String>, before: Id) -> Self {
        Self::new(root, name, Some(before), None).flags(false, true, false)
    }

    /// Descriptor for a file whose content changed in place.
    pub fn modified(root: &Path, name: impl Into<String>, before: Id, after: Id) -> Self {
        Self::new(root, name, Some(before), Some(after))
    }

    /// Descriptor for a file moved to `name`.
    pub fn renamed(root: &Path, name: impl Into<String>, before: Id, after: Id) -> Self {
        Self::new(root, name, Some(before), Some(after)).flags(false, false, true)
    }

    fn new(root: &Path, name: impl Into<String>, before: Option<Id>, after: Option<Id>) -> Self {
        let relative_name = name.into();
        Self {
            new_file: false,
            deleted_file: false,
            renamed: false,
            before_blob: before,
            after_blob: after,
            absolute_path: root.join(&relative_name),
            relative_name,
        }
    }

    fn flags(mut self, new_file: bool, deleted_file: bool, renamed: bool) -> Self {
        self.new_file = new_file;
        self.deleted_file = deleted_file;
        self.renamed = renamed;
        self
    }
}

/// Structured diff information for one changed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChangeRecord {
    /// Absolute path to the file
    pub absolute_path: PathBuf,
    /// Path relative to the repository root
    pub name: String,
    /// Annotated line changes
    pub diff: Vec<LineRecord>,
    /// Overall change applied to the file
    pub kind: ChangeKind,
}

/// Turns change descriptors into per-file diffs.
pub struct FileDiffIndex<'a, S: BlobSource> {
    root: PathBuf,
    source: &'a S,
    descriptors: Vec<ChangeDescriptor<S::Id>>,
}

impl<'a, S: BlobSource> FileDiffIndex<'a, S> {
    /// Create an index over `descriptors` for the repository rooted at `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        source: &'a S,
        descriptors: Vec<ChangeDescriptor<S::Id>>,
    ) -> Self {
        Self {
            root: root.into(),
            source,
            descriptors,
        }
    }

    /// Root of the repository the descriptors belong to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of descriptors in the index.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the index holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Lazily produce one record per descriptor, in descriptor order.
    pub fn files(&self) -> impl Iterator<Item = FileChangeRecord> + '_ {
        self.descriptors.iter().map(move |descriptor| self.record(descriptor))
    }

    fn record(&self, descriptor: &ChangeDescriptor<S::Id>) -> FileChangeRecord {
        let before = self.read_side(descriptor.before_blob.as_ref(), &descriptor.relative_name);
        let after = self.read_side(descriptor.after_blob.as_ref(), &descriptor.relative_name);

        FileChangeRecord {
            absolute_path: descriptor.absolute_path.clone(),
            name: descriptor.relative_name.clone(),
            diff: diff_lines(&before, &after),
            kind: ChangeKind::classify(
                descriptor.new_file,
                descriptor.deleted_file,
                descriptor.renamed,
                descriptor.before_blob.as_ref(),
                descriptor.after_blob.as_ref(),
            ),
        }
    }

    /// Missing or unreadable blobs count as empty content.
    fn read_side(&self, id: Option<&S::Id>, name: &str) -> String {
        let Some(id) = id else {
            return String::new();
        };
        match self.source.read_blob(id) {
            Ok(content) => content,
            Err(e) => {
                debug!(file = name, blob = ?id, error = %e, "treating unreadable blob as empty");
                String::new()
            }
        }
    }
}

impl<S: BlobSource> fmt::Debug for FileDiffIndex<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDiffIndex")
            .field("root", &self.root)
            .field("descriptors", &self.descriptors.len())
            .finish_non_exhaustive()
    }
}
