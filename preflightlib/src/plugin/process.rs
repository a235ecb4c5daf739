//! Plugin execution as child processes.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use super::{decode_stdout, Plugin, PluginExecutor};
use crate::collate::PluginResult;

/// Exit code reported for a plugin that could not be started or finished.
pub const FAILED_TO_RUN: i32 = -1;

/// Runs plugins as child processes in the repository root.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    working_dir: PathBuf,
    timeout: Duration,
}

impl ProcessExecutor {
    pub fn new(working_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            working_dir: working_dir.into(),
            timeout,
        }
    }

    fn spawn(&self, plugin: &Plugin) -> io::Result<Child> {
        Command::new(plugin.program())
            .args(plugin.args())
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }
}

impl PluginExecutor for ProcessExecutor {
    fn execute(&self, plugin: &Plugin, payload: &[u8]) -> PluginResult {
        debug!(plugin = %plugin.name, command = ?plugin.command, "running plugin");

        let mut child = match self.spawn(plugin) {
            Ok(child) => child,
            Err(e) => {
                debug!(plugin = %plugin.name, error = %e, "plugin failed to start");
                return failed(format!("failed to run {}: {}", plugin.program(), e));
            }
        };

        let stdout_handle = child.stdout.take().map(spawn_reader);
        let stderr_handle = child.stderr.take().map(spawn_reader);

        // Detached, so the timeout below starts right away
        if let Some(stdin) = child.stdin.take() {
            spawn_writer(stdin, payload.to_vec(), plugin.name.clone());
        }

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                warn!(plugin = %plugin.name, timeout = ?self.timeout, "plugin timed out");
                let _ = child.kill();
                let _ = child.wait();
                return failed(format!(
                    "{} timed out after {}s",
                    plugin.name,
                    self.timeout.as_secs_f64()
                ));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return failed(format!("failed waiting on {}: {}", plugin.name, e));
            }
        };

        let stdout = join_reader(stdout_handle);
        let stderr = join_reader(stderr_handle);

        let exit_code = status.code().unwrap_or(FAILED_TO_RUN);
        debug!(plugin = %plugin.name, exit_code, "plugin finished");

        let stdout = if exit_code == 0 {
            decode_stdout(&stdout)
        } else {
            Value::String(stdout)
        };

        PluginResult::new(exit_code, stdout, stderr)
    }
}

fn failed(stderr: String) -> PluginResult {
    PluginResult::failure(FAILED_TO_RUN, stderr)
}

/// Feed the payload on a separate thread; stdin closes when it is done.
fn spawn_writer<W: Write + Send + 'static>(mut stream: W, payload: Vec<u8>, plugin: String) {
    thread::spawn(move || {
        // A plugin may exit without reading its input
        if let Err(e) = stream.write_all(&payload) {
            if e.kind() != io::ErrorKind::BrokenPipe {
                debug!(plugin = %plugin, error = %e, "failed to write plugin payload");
            }
        }
    });
}

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

/// Collect a reader thread's output; read failures count as no output.
fn join_reader(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> String {
    match handle.map(JoinHandle::join) {
        Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
        _ => String::new(),
    }
}
