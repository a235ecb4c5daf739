//! One preflight check, from repository to collated results.
//!
//! The steps are:
//! 1. collect change descriptors from git (staged or a revision range)
//! 2. drop paths the filter rejects
//! 3. diff every remaining file and encode the plugin payload
//! 4. run every plugin, in order, to completion
//! 5. collate the results

use std::path::Path;

use tracing::info;

use crate::collate::ResultsCollater;
use crate::diff::{FileChangeRecord, FileDiffIndex, GitRepository};
use crate::options::{ChangeSource, RunOptions};
use crate::plugin::{encode_payload, run_plugins, PluginExecutor, ProcessExecutor};
use crate::Result;

/// Diff the files selected by `options` in `repo`.
pub fn changed_files(repo: &GitRepository, options: &RunOptions) -> Result<Vec<FileChangeRecord>> {
    let descriptors = match &options.source {
        ChangeSource::Staged => repo.staged_changes()?,
        ChangeSource::Range { from, to } => repo.range_changes(from, to)?,
    };

    let total = descriptors.len();
    let descriptors: Vec<_> = descriptors
        .into_iter()
        .filter(|d| options.filter.matches(&d.relative_name))
        .collect();
    info!(
        changed = total,
        selected = descriptors.len(),
        "collected changed files"
    );

    let blobs = repo.blobs();
    let index = FileDiffIndex::new(repo.root(), &blobs, descriptors);
    Ok(index.files().collect())
}

/// Run the configured plugins against `repo` using `executor`.
pub fn run(
    repo: &GitRepository,
    options: &RunOptions,
    executor: &dyn PluginExecutor,
) -> Result<ResultsCollater> {
    let files = changed_files(repo, options)?;
    let payload = encode_payload(&files)?;

    info!(plugins = options.plugins.len(), files = files.len(), "running plugins");
    let results = run_plugins(&options.plugins, &payload, executor);

    Ok(ResultsCollater::new(results))
}

/// Check the repository containing `path`, running plugins as processes.
pub fn check(path: impl AsRef<Path>, options: &RunOptions) -> Result<ResultsCollater> {
    let repo = GitRepository::discover(path)?;
    let executor = ProcessExecutor::new(repo.root(), options.timeout);
    run(&repo, options, &executor)
}
