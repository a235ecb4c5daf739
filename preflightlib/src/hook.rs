//! Installation of the git `pre-commit` hook.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::diff::GitRepository;
use crate::error::PreflightError;
use crate::Result;

/// Name of the binary the hook calls.
pub const BINARY_NAME: &str = "preflight";

/// Quote `arg` for a POSIX shell.
fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// The hook script forwarding `plugins` to `preflight check`.
pub fn hook_script(plugins: &[String]) -> String {
    let mut command = format!("exec {} check", BINARY_NAME);
    for plugin in plugins {
        command.push_str(" --plugin ");
        command.push_str(&shell_quote(plugin));
    }
    format!(
        "#!/bin/sh\n# Installed by {} init\n{} \"$@\"\n",
        BINARY_NAME, command
    )
}

/// Install the pre-commit hook into the repository containing `path`.
///
/// Refuses to overwrite an existing hook. Returns the path of the new hook.
pub fn install_hook(path: impl AsRef<Path>, plugins: &[String]) -> Result<PathBuf> {
    let repo = GitRepository::discover(path)?;
    let hooks = repo.git_dir().join("hooks");
    let hook = hooks.join("pre-commit");

    if hook.exists() {
        return Err(PreflightError::PreCommitExists(hook));
    }

    fs::create_dir_all(&hooks)?;
    fs::write(&hook, hook_script(plugins))?;
    make_executable(&hook)?;

    info!(hook = %hook.display(), "installed pre-commit hook");
    Ok(hook)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::init_repo;
    use tempfile::TempDir;

    #[test]
    fn test_script_without_plugins() {
        assert_eq!(
            hook_script(&[]),
            "#!/bin/sh\n# Installed by preflight init\nexec preflight check \"$@\"\n"
        );
    }

    #[test]
    fn test_script_quotes_plugins() {
        let script = hook_script(&["lint=./lint --strict".to_string(), "it's".to_string()]);
        assert!(script.contains("--plugin 'lint=./lint --strict'"));
        assert!(script.contains(r"--plugin 'it'\''s'"));
    }

    #[test]
    fn test_fresh_install() {
        let repo = init_repo();

        let hook = install_hook(repo.path(), &["spell".to_string()]).unwrap();

        assert!(hook.ends_with(".git/hooks/pre-commit"));
        let content = fs::read_to_string(&hook).unwrap();
        assert!(content.starts_with("#!/bin/sh\n"));
        assert!(content.contains("--plugin 'spell'"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&hook).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_install_from_subdirectory() {
        let repo = init_repo();
        fs::create_dir_all(repo.path().join("nested/dir")).unwrap();

        let hook = install_hook(repo.path().join("nested/dir"), &[]).unwrap();

        assert!(hook.ends_with(".git/hooks/pre-commit"));
    }

    #[test]
    fn test_refuses_existing_hook() {
        let repo = init_repo();
        let hooks = repo.path().join(".git/hooks");
        fs::create_dir_all(&hooks).unwrap();
        fs::write(hooks.join("pre-commit"), "#!/bin/sh\nexit 0\n").unwrap();

        let result = install_hook(repo.path(), &[]);

        assert!(matches!(result, Err(PreflightError::PreCommitExists(_))));
        assert_eq!(
            fs::read_to_string(hooks.join("pre-commit")).unwrap(),
            "#!/bin/sh\nexit 0\n"
        );
    }

    #[test]
    fn test_not_a_repository() {
        let dir = TempDir::new().unwrap();
        let result = install_hook(dir.path().join("missing"), &[]);
        assert!(matches!(result, Err(PreflightError::NotGitRepo(_))));
    }
}
