//! Plugin definition and execution.
//!
//! A plugin is an external command. It receives the diff payload (see
//! [`payload`]) as JSON on stdin and reports findings as JSON on stdout.
//! Execution goes through the [`PluginExecutor`] trait so the runner can be
//! tested without spawning processes.

pub mod payload;
mod process;

use std::path::Path;

use serde_json::Value;

use crate::collate::PluginResult;
use crate::error::PreflightError;
use crate::message::{PluginId, PluginRef};
use crate::Result;

pub use payload::{build_payload, encode_payload};
pub use process::ProcessExecutor;

/// An external command run against the change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub id: PluginId,
    pub name: String,
    /// Program followed by its arguments; never empty
    pub command: Vec<String>,
}

impl Plugin {
    /// Parse a plugin from `NAME=CMD` or `CMD`.
    ///
    /// The command is split into words the way `sh` would, so quoted
    /// arguments keep their spaces. Without an explicit name the plugin is
    /// named after the program's file name.
    ///
    /// ```rust
    /// use preflightlib::Plugin;
    ///
    /// let named = Plugin::parse("lint=./bin/lint --strict", 0).unwrap();
    /// assert_eq!(named.name, "lint");
    /// assert_eq!(named.command, vec!["./bin/lint", "--strict"]);
    ///
    /// let bare = Plugin::parse("/usr/bin/pyflakes", 1).unwrap();
    /// assert_eq!(bare.name, "pyflakes");
    /// ```
    pub fn parse(arg: &str, id: usize) -> Result<Self> {
        let (name, command) = match arg.split_once('=') {
            Some((name, command)) if is_plugin_name(name) => (Some(name.trim()), command),
            _ => (None, arg),
        };

        let command = shell_words::split(command).map_err(|e| {
            PreflightError::InvalidPlugin(format!("{}: {}", arg, e))
        })?;
        let Some(program) = command.first() else {
            return Err(PreflightError::InvalidPlugin(arg.to_string()));
        };

        let name = match name {
            Some(name) => name.to_string(),
            None => Path::new(program)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| program.clone()),
        };

        Ok(Self {
            id: PluginId(id),
            name,
            command,
        })
    }

    /// Parse several plugins, numbering them in order.
    pub fn parse_all<S: AsRef<str>>(args: &[S]) -> Result<Vec<Self>> {
        args.iter()
            .enumerate()
            .map(|(id, arg)| Self::parse(arg.as_ref(), id))
            .collect()
    }

    pub fn program(&self) -> &str {
        &self.command[0]
    }

    pub fn args(&self) -> &[String] {
        &self.command[1..]
    }

    /// The reference the collater and formatters use.
    pub fn to_ref(&self) -> PluginRef {
        PluginRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// A name prefix is a single unquoted word with no path separators.
fn is_plugin_name(candidate: &str) -> bool {
    let candidate = candidate.trim();
    !candidate.is_empty()
        && !candidate.contains(char::is_whitespace)
        && !candidate.contains(['/', '\\', '\'', '"'])
}

/// Runs one plugin against an encoded payload.
pub trait PluginExecutor {
    /// Execute `plugin` with `payload` on its stdin.
    ///
    /// Failing to start or finish the plugin is reported through the result
    /// (non-zero exit code, explanation in stderr), never as an error.
    fn execute(&self, plugin: &Plugin, payload: &[u8]) -> PluginResult;
}

/// Run every plugin in order and pair each result with its plugin.
pub fn run_plugins(
    plugins: &[Plugin],
    payload: &[u8],
    executor: &dyn PluginExecutor,
) -> Vec<(PluginRef, PluginResult)> {
    plugins
        .iter()
        .map(|plugin| (plugin.to_ref(), executor.execute(plugin, payload)))
        .collect()
}

/// Interpret a plugin's stdout.
///
/// Blank output is `null`, valid JSON is kept as is, and anything else is
/// taken as a plain-text message.
pub fn decode_stdout(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn test_parse_named_plugin() {
        let plugin = Plugin::parse("spell = aspell-check --lang en", 3).unwrap();
        assert_eq!(plugin.id, PluginId(3));
        assert_eq!(plugin.name, "spell");
        assert_eq!(plugin.program(), "aspell-check");
        assert_eq!(plugin.args(), ["--lang", "en"]);
    }

    #[test]
    fn test_parse_unnamed_plugin() {
        let plugin = Plugin::parse("./plugins/woops.sh", 0).unwrap();
        assert_eq!(plugin.name, "woops.sh");
        assert_eq!(plugin.command, vec!["./plugins/woops.sh"]);
    }

    #[test]
    fn test_equals_sign_in_arguments_is_not_a_name() {
        let plugin = Plugin::parse("check --level=3", 0).unwrap();
        assert_eq!(plugin.name, "check");
        assert_eq!(plugin.args(), ["--level=3"]);

        let path = Plugin::parse("./a=b/run", 0).unwrap();
        assert_eq!(path.program(), "./a=b/run");
    }

    #[test]
    fn test_empty_command_is_invalid() {
        for arg in ["", "   ", "name=", "name=  "] {
            assert!(
                matches!(Plugin::parse(arg, 0), Err(PreflightError::InvalidPlugin(_))),
                "{:?} should be rejected",
                arg
            );
        }
    }

    #[test]
    fn test_quoted_words_keep_spaces() {
        let plugin = Plugin::parse("lint='./my plugins/lint.sh' --msg \"two words\"", 0).unwrap();
        assert_eq!(plugin.name, "lint");
        assert_eq!(plugin.command, vec!["./my plugins/lint.sh", "--msg", "two words"]);

        let bare = Plugin::parse("'/opt/my tools/check'", 0).unwrap();
        assert_eq!(bare.name, "check");
        assert_eq!(bare.program(), "/opt/my tools/check");

        let escaped = Plugin::parse("sh ./with\\ space.sh", 0).unwrap();
        assert_eq!(escaped.args(), ["./with space.sh"]);
    }

    #[test]
    fn test_unbalanced_quote_is_invalid() {
        let result = Plugin::parse("lint='./unterminated", 0);
        assert!(matches!(result, Err(PreflightError::InvalidPlugin(_))));
    }

    #[test]
    fn test_parse_all_numbers_in_order() {
        let plugins = Plugin::parse_all(&["a=one", "b=two"]).unwrap();
        let ids: Vec<_> = plugins.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![PluginId(0), PluginId(1)]);
    }

    #[test]
    fn test_decode_stdout() {
        assert_eq!(decode_stdout(""), Value::Null);
        assert_eq!(decode_stdout(" \n"), Value::Null);
        assert_eq!(decode_stdout("null"), Value::Null);
        assert_eq!(decode_stdout("[\"a\"]\n"), json!(["a"]));
        assert_eq!(decode_stdout("{\"a.txt\": \"x\"}"), json!({"a.txt": "x"}));
        assert_eq!(decode_stdout("plain words\n"), json!("plain words"));
    }

    struct Recording {
        seen: RefCell<Vec<(String, Vec<u8>)>>,
    }

    impl PluginExecutor for Recording {
        fn execute(&self, plugin: &Plugin, payload: &[u8]) -> PluginResult {
            self.seen
                .borrow_mut()
                .push((plugin.name.clone(), payload.to_vec()));
            PluginResult::success(json!(plugin.name))
        }
    }

    #[test]
    fn test_run_plugins_in_order() {
        let plugins = Plugin::parse_all(&["first=a", "second=b"]).unwrap();
        let executor = Recording {
            seen: RefCell::new(Vec::new()),
        };

        let results = run_plugins(&plugins, b"{}", &executor);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, PluginRef::new(0, "first"));
        assert_eq!(results[1].1.stdout, json!("second"));

        let seen = executor.seen.borrow();
        assert_eq!(seen[0], ("first".to_string(), b"{}".to_vec()));
        assert_eq!(seen[1].0, "second");
    }
}
