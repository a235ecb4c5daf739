//! Git-backed change descriptors and blob reads.
//!
//! Two change sets are supported:
//! - the staged changes (HEAD vs index), which is what a pre-commit hook sees
//! - the changes between two commits
//!
//! Staged changes compare the flattened HEAD tree with the index. Ranges
//! walk gix's tree diff and only keep the paths it reports. Either way, a
//! path that disappears on one side while a path with the identical blob
//! appears on the other is reported as a rename.
//!
//! Only regular files and symlinks take part. Submodules (gitlinks) are
//! skipped on both sides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gix::objs::tree::EntryMode;
use tracing::debug;

use super::index::{BlobSource, ChangeDescriptor};
use crate::error::PreflightError;
use crate::Result;

/// Blob identity used for git repositories.
pub type ObjectId = gix::ObjectId;

/// Path → blob id for one side of a comparison.
type Entries = BTreeMap<PathBuf, ObjectId>;

/// An opened repository together with its working tree root.
pub struct GitRepository {
    repo: gix::Repository,
    root: PathBuf,
}

impl GitRepository {
    /// Discover the repository containing `path`.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let not_a_repo = || PreflightError::NotGitRepo(path.to_path_buf());

        // Absolute input keeps the work dir absolute
        let absolute = path.canonicalize().map_err(|_| not_a_repo())?;
        let repo = gix::discover(&absolute).map_err(|e| {
            debug!(path = %path.display(), error = %e, "repository discovery failed");
            not_a_repo()
        })?;

        let root = repo
            .work_dir()
            .ok_or_else(|| PreflightError::GitError("Repository has no work directory".to_string()))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Absolute path of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the repository's git directory (`.git`).
    pub fn git_dir(&self) -> &Path {
        self.repo.git_dir()
    }

    /// Blob source reading from this repository's object database.
    pub fn blobs(&self) -> GitBlobSource<'_> {
        GitBlobSource { repo: &self.repo }
    }

    /// Changes staged in the index relative to HEAD.
    ///
    /// On an unborn branch every staged file is reported as added.
    pub fn staged_changes(&self) -> Result<Vec<ChangeDescriptor<ObjectId>>> {
        let head = self
            .repo
            .head()
            .map_err(|e| PreflightError::GitError(format!("Failed to read HEAD: {}", e)))?;

        let mut head_entries = Entries::new();
        if !head.is_unborn() {
            let head_commit = self
                .repo
                .head_commit()
                .map_err(|e| PreflightError::GitError(format!("Failed to get HEAD commit: {}", e)))?;
            let head_tree = head_commit
                .tree()
                .map_err(|e| PreflightError::GitError(format!("Failed to get HEAD tree: {}", e)))?;
            collect_tree_entries(&self.repo, &head_tree, PathBuf::new(), &mut head_entries)?;
        }

        let index = self
            .repo
            .index_or_empty()
            .map_err(|e| PreflightError::GitError(format!("Failed to read index: {}", e)))?;

        let index_entries: Entries = index
            .entries()
            .iter()
            .filter(|entry| entry.mode.to_tree_entry_mode().is_some_and(is_file_mode))
            .map(|entry| (PathBuf::from(gix::path::from_bstr(entry.path(&index))), entry.id))
            .collect();

        Ok(compare_entries(&self.root, &head_entries, &index_entries))
    }

    /// Changes between two commit references (SHA, branch, tag, `HEAD~n`, ...).
    pub fn range_changes(&self, from: &str, to: &str) -> Result<Vec<ChangeDescriptor<ObjectId>>> {
        let from_tree = self.commit_tree(from)?;
        let to_tree = self.commit_tree(to)?;
        let (before, after) = tree_changes(&from_tree, &to_tree)?;
        Ok(compare_entries(&self.root, &before, &after))
    }

    fn commit_tree(&self, reference: &str) -> Result<gix::Tree<'_>> {
        resolve_commit(&self.repo, reference)?.tree().map_err(|e| {
            PreflightError::GitError(format!("Failed to get tree for '{}': {}", reference, e))
        })
    }
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Reads blob content out of a repository's object database.
pub struct GitBlobSource<'repo> {
    repo: &'repo gix::Repository,
}

impl BlobSource for GitBlobSource<'_> {
    type Id = ObjectId;

    fn read_blob(&self, id: &ObjectId) -> Result<String> {
        read_blob(self.repo, *id)
    }
}

/// Resolve a commit reference to a commit object
fn resolve_commit<'repo>(
    repo: &'repo gix::Repository,
    reference: &str,
) -> Result<gix::Commit<'repo>> {
    let id = repo
        .rev_parse_single(reference.as_bytes())
        .map_err(|e| PreflightError::GitError(format!("Failed to resolve '{}': {}", reference, e)))?
        .detach();

    repo.find_commit(id).map_err(|e| {
        PreflightError::GitError(format!("Failed to find commit '{}': {}", reference, e))
    })
}

/// Regular files (executable or not) and symlinks.
fn is_file_mode(mode: EntryMode) -> bool {
    mode.is_blob_or_symlink()
}

/// Recursively collect all file entries from a tree
fn collect_tree_entries(
    repo: &gix::Repository,
    tree: &gix::Tree<'_>,
    prefix: PathBuf,
    entries: &mut Entries,
) -> Result<()> {
    for entry in tree.iter() {
        let entry = entry
            .map_err(|e| PreflightError::GitError(format!("Failed to read tree entry: {}", e)))?;

        let name = gix::path::from_bstr(entry.filename());
        let path = prefix.join(name);

        if is_file_mode(entry.mode()) {
            entries.insert(path, entry.oid().to_owned());
        } else if entry.mode().is_tree() {
            let subtree = repo
                .find_object(entry.oid())
                .map_err(|e| PreflightError::GitError(format!("Failed to find tree: {}", e)))?
                .try_into_tree()
                .map_err(|_| PreflightError::GitError("Object is not a tree".to_string()))?;
            collect_tree_entries(repo, &subtree, path, entries)?;
        }
    }
    Ok(())
}

/// The paths that differ between two trees, as the before and after sides.
///
/// Unchanged paths appear on neither side, so the result can go straight
/// into [`compare_entries`].
fn tree_changes(from_tree: &gix::Tree<'_>, to_tree: &gix::Tree<'_>) -> Result<(Entries, Entries)> {
    use gix::object::tree::diff::{Action, Change};

    let mut before = Entries::new();
    let mut after = Entries::new();

    from_tree
        .changes()
        .map_err(|e| PreflightError::GitError(format!("Failed to get tree changes: {}", e)))?
        .options(|opts| {
            // Renames are paired by blob identity in compare_entries
            opts.track_path().track_rewrites(None);
        })
        .for_each_to_obtain_tree(to_tree, |change| {
            match change {
                Change::Addition {
                    entry_mode,
                    id,
                    location,
                    ..
                } => {
                    if is_file_mode(entry_mode) {
                        after.insert(PathBuf::from(gix::path::from_bstr(location)), id.detach());
                    }
                }
                Change::Deletion {
                    entry_mode,
                    id,
                    location,
                    ..
                } => {
                    if is_file_mode(entry_mode) {
                        before.insert(PathBuf::from(gix::path::from_bstr(location)), id.detach());
                    }
                }
                Change::Modification {
                    previous_entry_mode,
                    previous_id,
                    entry_mode,
                    id,
                    location,
                    ..
                } => {
                    let path = PathBuf::from(gix::path::from_bstr(location));
                    if is_file_mode(previous_entry_mode) {
                        before.insert(path.clone(), previous_id.detach());
                    }
                    if is_file_mode(entry_mode) {
                        after.insert(path, id.detach());
                    }
                }
                Change::Rewrite { .. } => {}
            }
            Ok::<_, std::convert::Infallible>(Action::Continue)
        })
        .map_err(|e| PreflightError::GitError(format!("Failed to compute tree diff: {}", e)))?;

    Ok((before, after))
}

/// Compare two sides and describe every path that differs, sorted by path.
fn compare_entries(
    root: &Path,
    before: &Entries,
    after: &Entries,
) -> Vec<ChangeDescriptor<ObjectId>> {
    let mut added: Vec<(&PathBuf, ObjectId)> = Vec::new();
    let mut deleted: Vec<(&PathBuf, ObjectId)> = Vec::new();
    let mut changes: Vec<ChangeDescriptor<ObjectId>> = Vec::new();

    for (path, &after_id) in after {
        match before.get(path) {
            Some(&before_id) if before_id != after_id => {
                changes.push(ChangeDescriptor::modified(
                    root,
                    relative_name(path),
                    before_id,
                    after_id,
                ));
            }
            Some(_) => {}
            None => added.push((path, after_id)),
        }
    }

    for (path, &before_id) in before {
        if !after.contains_key(path) {
            deleted.push((path, before_id));
        }
    }

    // Pair identical blobs that moved between paths
    for (path, after_id) in added {
        match deleted.iter().position(|(_, id)| *id == after_id) {
            Some(pos) => {
                deleted.remove(pos);
                changes.push(ChangeDescriptor::renamed(
                    root,
                    relative_name(path),
                    after_id,
                    after_id,
                ));
            }
            None => changes.push(ChangeDescriptor::added(root, relative_name(path), after_id)),
        }
    }

    for (path, before_id) in deleted {
        changes.push(ChangeDescriptor::deleted(root, relative_name(path), before_id));
    }

    changes.sort_by(|a, b| a.relative_name.cmp(&b.relative_name));
    changes
}

fn relative_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Read a blob's content as a UTF-8 string
fn read_blob(repo: &gix::Repository, oid: ObjectId) -> Result<String> {
    let object = repo
        .find_object(oid)
        .map_err(|e| PreflightError::GitError(format!("Failed to find object {}: {}", oid, e)))?;

    let blob = object
        .try_into_blob()
        .map_err(|_| PreflightError::GitError(format!("Object {} is not a blob", oid)))?;

    // Try to decode as UTF-8, falling back to lossy conversion
    String::from_utf8(blob.data.to_vec())
        .or_else(|e| Ok(String::from_utf8_lossy(&e.into_bytes()).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::index::FileDiffIndex;
    use crate::diff::kind::ChangeKind;
    use crate::diff::lines::LineTag;
    use crate::test_support::{commit_all, git, init_repo, write};
    use std::fs;
    use tempfile::TempDir;

    fn oid(hex: &str) -> ObjectId {
        ObjectId::from_hex(hex.as_bytes()).unwrap()
    }

    #[test]
    fn test_compare_entries_classifies_each_path() {
        let a = oid("1111111111111111111111111111111111111111");
        let b = oid("2222222222222222222222222222222222222222");
        let c = oid("3333333333333333333333333333333333333333");
        let d = oid("4444444444444444444444444444444444444444");

        let before: Entries = [
            (PathBuf::from("keep.txt"), a),
            (PathBuf::from("edit.txt"), b),
            (PathBuf::from("gone.txt"), c),
            (PathBuf::from("old/name.txt"), d),
        ]
        .into_iter()
        .collect();
        let after: Entries = [
            (PathBuf::from("keep.txt"), a),
            (PathBuf::from("edit.txt"), c),
            (PathBuf::from("new/name.txt"), d),
            (PathBuf::from("fresh.txt"), b),
        ]
        .into_iter()
        .collect();

        let changes = compare_entries(Path::new("/repo"), &before, &after);
        let summary: Vec<_> = changes
            .iter()
            .map(|c| {
                (
                    c.relative_name.as_str(),
                    c.new_file,
                    c.deleted_file,
                    c.renamed,
                )
            })
            .collect();

        assert_eq!(
            summary,
            vec![
                ("edit.txt", false, false, false),
                ("fresh.txt", true, false, false),
                ("gone.txt", false, true, false),
                ("new/name.txt", false, false, true),
            ]
        );
        assert_eq!(changes[0].absolute_path, PathBuf::from("/repo/edit.txt"));
    }

    #[test]
    fn test_discover_outside_repository() {
        let dir = TempDir::new().unwrap();
        let result = GitRepository::discover(dir.path().join("missing"));
        assert!(matches!(result, Err(PreflightError::NotGitRepo(_))));
    }

    #[test]
    fn test_staged_changes_on_unborn_branch() {
        let dir = init_repo();
        write(dir.path(), "a.txt", "one\ntwo\n");
        git(dir.path(), &["add", "a.txt"]);

        let repo = GitRepository::discover(dir.path()).unwrap();
        let changes = repo.staged_changes().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].relative_name, "a.txt");
        assert!(changes[0].new_file);
    }

    #[test]
    fn test_staged_changes_produce_file_diffs() {
        let dir = init_repo();
        write(dir.path(), "modified.txt", "a\nb\nc\n");
        write(dir.path(), "deleted.txt", "bye\n");
        write(dir.path(), "moved.txt", "same content\n");
        write(dir.path(), "untouched.txt", "quiet\n");
        commit_all(dir.path(), "initial");

        write(dir.path(), "modified.txt", "a\nc\nd\n");
        write(dir.path(), "added.txt", "hello\n");
        fs::remove_file(dir.path().join("deleted.txt")).unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::rename(dir.path().join("moved.txt"), dir.path().join("sub/moved.txt")).unwrap();
        git(dir.path(), &["add", "-A"]);
        // Unstaged edits are not part of the change set
        write(dir.path(), "untouched.txt", "loud\n");

        let repo = GitRepository::discover(dir.path()).unwrap();
        let blobs = repo.blobs();
        let index = FileDiffIndex::new(repo.root(), &blobs, repo.staged_changes().unwrap());

        let files: Vec<_> = index.files().collect();
        let kinds: Vec<_> = files.iter().map(|f| (f.name.as_str(), f.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("added.txt", ChangeKind::Added),
                ("deleted.txt", ChangeKind::Deleted),
                ("modified.txt", ChangeKind::Modified),
                ("sub/moved.txt", ChangeKind::Renamed),
            ]
        );

        let modified = &files[2];
        let markers: Vec<_> = modified
            .diff
            .iter()
            .map(|r| (r.line_number, r.tag.marker(), r.content.as_str()))
            .collect();
        assert_eq!(
            markers,
            vec![(1, ' ', "a"), (2, '-', "b"), (2, ' ', "c"), (3, '+', "d")]
        );

        let deleted = &files[1];
        assert!(deleted.diff.iter().all(|r| r.tag == LineTag::Removed));
        assert!(files[0].absolute_path.ends_with("added.txt"));
    }

    #[test]
    fn test_range_changes() {
        let dir = init_repo();
        write(dir.path(), "file.txt", "one\n");
        commit_all(dir.path(), "first");
        write(dir.path(), "file.txt", "two\n");
        write(dir.path(), "other.txt", "new\n");
        commit_all(dir.path(), "second");

        let repo = GitRepository::discover(dir.path()).unwrap();
        let changes = repo.range_changes("HEAD~1", "HEAD").unwrap();
        let names: Vec<_> = changes.iter().map(|c| c.relative_name.as_str()).collect();
        assert_eq!(names, vec!["file.txt", "other.txt"]);

        assert!(repo.range_changes("HEAD", "HEAD").unwrap().is_empty());
    }

    /// Add a submodule entry pointing at `commit` without cloning anything.
    fn stage_gitlink(dir: &Path, path: &str, commit: &str) {
        let cacheinfo = format!("160000,{},{}", commit, path);
        git(dir, &["update-index", "--add", "--cacheinfo", &cacheinfo]);
    }

    fn summary(changes: &[ChangeDescriptor<ObjectId>]) -> Vec<(&str, bool, bool)> {
        changes
            .iter()
            .map(|c| (c.relative_name.as_str(), c.new_file, c.deleted_file))
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_committed_symlink_is_not_staged() {
        let dir = init_repo();
        write(dir.path(), "target.txt", "one\n");
        std::os::unix::fs::symlink("target.txt", dir.path().join("link")).unwrap();
        commit_all(dir.path(), "initial");

        write(dir.path(), "target.txt", "two\n");
        git(dir.path(), &["add", "target.txt"]);

        let repo = GitRepository::discover(dir.path()).unwrap();
        let changes = repo.staged_changes().unwrap();

        assert_eq!(summary(&changes), vec![("target.txt", false, false)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_staged_symlink_change() {
        let dir = init_repo();
        write(dir.path(), "a.txt", "a\n");
        write(dir.path(), "b.txt", "b\n");
        std::os::unix::fs::symlink("a.txt", dir.path().join("link")).unwrap();
        commit_all(dir.path(), "initial");

        fs::remove_file(dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink("b.txt", dir.path().join("link")).unwrap();
        git(dir.path(), &["add", "link"]);

        let repo = GitRepository::discover(dir.path()).unwrap();
        let blobs = repo.blobs();
        let index = FileDiffIndex::new(repo.root(), &blobs, repo.staged_changes().unwrap());
        let files: Vec<_> = index.files().collect();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "link");
        assert_eq!(files[0].kind, ChangeKind::Modified);
        let markers: Vec<_> = files[0]
            .diff
            .iter()
            .map(|r| (r.tag.marker(), r.content.as_str()))
            .collect();
        assert_eq!(markers, vec![('-', "a.txt"), ('+', "b.txt")]);
    }

    #[test]
    fn test_submodules_are_skipped() {
        let dir = init_repo();
        write(dir.path(), "file.txt", "one\n");
        commit_all(dir.path(), "first");
        let first = git(dir.path(), &["rev-parse", "HEAD"]);

        stage_gitlink(dir.path(), "vendored", &first);
        git(dir.path(), &["commit", "-q", "-m", "add submodule"]);

        write(dir.path(), "file.txt", "two\n");
        git(dir.path(), &["add", "file.txt"]);

        let repo = GitRepository::discover(dir.path()).unwrap();
        assert_eq!(
            summary(&repo.staged_changes().unwrap()),
            vec![("file.txt", false, false)]
        );

        // A newly staged submodule is not a file either
        stage_gitlink(dir.path(), "another", &first);
        let repo = GitRepository::discover(dir.path()).unwrap();
        assert_eq!(
            summary(&repo.staged_changes().unwrap()),
            vec![("file.txt", false, false)]
        );

        assert!(repo.range_changes("HEAD~1", "HEAD").unwrap().is_empty());
    }

    #[test]
    fn test_range_changes_across_directories() {
        let dir = init_repo();
        write(dir.path(), "src/lib.txt", "lib\n");
        write(dir.path(), "src/nested/old.txt", "moving content\n");
        write(dir.path(), "docs/gone.txt", "bye\n");
        write(dir.path(), "stable/keep.txt", "keep\n");
        commit_all(dir.path(), "first");

        write(dir.path(), "src/lib.txt", "lib\nmore\n");
        fs::remove_file(dir.path().join("src/nested/old.txt")).unwrap();
        write(dir.path(), "moved/new.txt", "moving content\n");
        fs::remove_dir_all(dir.path().join("docs")).unwrap();
        write(dir.path(), "fresh/deep/added.txt", "hi\n");
        commit_all(dir.path(), "second");

        let repo = GitRepository::discover(dir.path()).unwrap();
        let changes = repo.range_changes("HEAD~1", "HEAD").unwrap();
        let kinds: Vec<_> = changes
            .iter()
            .map(|c| (c.relative_name.as_str(), c.new_file, c.deleted_file, c.renamed))
            .collect();

        assert_eq!(
            kinds,
            vec![
                ("docs/gone.txt", false, true, false),
                ("fresh/deep/added.txt", true, false, false),
                ("moved/new.txt", false, false, true),
                ("src/lib.txt", false, false, false),
            ]
        );
    }

    #[test]
    fn test_range_changes_invalid_reference() {
        let dir = init_repo();
        write(dir.path(), "file.txt", "one\n");
        commit_all(dir.path(), "first");

        let repo = GitRepository::discover(dir.path()).unwrap();
        let result = repo.range_changes("no_such_ref", "HEAD");
        assert!(matches!(result, Err(PreflightError::GitError(_))));
    }
}
