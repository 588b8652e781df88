//! Bounded execution of helper programs.
//!
//! Every failure mode is folded into a [`RunOutput`] with a synthetic exit code,
//! so callers in the interactive loop never have to unwind.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use wait_timeout::ChildExt;

pub const EXIT_TIMEOUT: i32 = 124;
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code plus trimmed output of one helper invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    fn synthetic(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// `Ok` on exit 0, otherwise stderr (or `exit N` when stderr is empty).
    pub fn check(&self) -> Result<()> {
        if self.success() {
            return Ok(());
        }
        if self.stderr.is_empty() {
            Err(anyhow!("exit {}", self.code))
        } else {
            Err(anyhow!("{}", self.stderr))
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Runner {
    timeout: Duration,
}

impl Runner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn run(&self, program: &Path, args: &[&str]) -> RunOutput {
        self.run_with_env(program, args, &[])
    }

    /// Runs `program` to completion or until the timeout, with `env` layered
    /// over the inherited environment.
    pub fn run_with_env(&self, program: &Path, args: &[&str], env: &[(&str, &str)]) -> RunOutput {
        let spawned = Command::new(program)
            .args(args)
            .envs(env.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(program = %program.display(), "helper not found");
                return RunOutput::synthetic(EXIT_NOT_FOUND, "not found");
            }
            Err(e) => {
                tracing::warn!(program = %program.display(), error = %e, "failed to spawn helper");
                return RunOutput::synthetic(EXIT_CANNOT_EXECUTE, e.to_string());
            }
        };

        // One deadline covers the wait and the pipe reads: a helper that leaves
        // a background process holding its stdout must not stall the panel.
        let deadline = Instant::now() + self.timeout;
        let stdout_rx = drain(child.stdout.take());
        let stderr_rx = drain(child.stderr.take());

        let out = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => match (
                recv_until(&stdout_rx, deadline),
                recv_until(&stderr_rx, deadline),
            ) {
                (Some(stdout), Some(stderr)) => RunOutput {
                    code: exit_code(status),
                    stdout,
                    stderr,
                },
                _ => {
                    tracing::warn!(
                        program = %program.display(),
                        ?args,
                        "helper output still open at deadline"
                    );
                    RunOutput::synthetic(EXIT_TIMEOUT, "timeout")
                }
            },
            Ok(None) => {
                reap(&mut child);
                tracing::warn!(program = %program.display(), ?args, "helper timed out");
                RunOutput::synthetic(EXIT_TIMEOUT, "timeout")
            }
            Err(e) => {
                reap(&mut child);
                tracing::warn!(program = %program.display(), error = %e, "failed waiting on helper");
                RunOutput::synthetic(1, e.to_string())
            }
        };

        tracing::debug!(program = %program.display(), ?args, code = out.code, "helper finished");
        out
    }

    /// Runs the command and keeps only the success/error outcome.
    pub fn call(&self, program: &Path, args: &[&str]) -> Result<()> {
        self.run(program, args).check()
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Reads a pipe to the end on its own thread. The thread outlives a missed
/// deadline only until whoever holds the write end closes it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    match pipe {
        Some(mut pipe) => {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                let _ = tx.send(String::from_utf8_lossy(&buf).trim().to_string());
            });
        }
        None => {
            let _ = tx.send(String::new());
        }
    }
    rx
}

fn recv_until(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    rx.recv_timeout(deadline.saturating_duration_since(Instant::now())).ok()
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    /// Writes an executable `sh` script into `dir`.
    pub(crate) fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn runner() -> Runner {
        Runner::new(Duration::from_secs(5))
    }

    #[test]
    fn captures_trimmed_output_and_code() {
        let dir = tempfile::tempdir().unwrap();
        let prog = script(dir.path(), "ok.sh", "echo '  conn=DP-1  '\necho ' warn ' >&2\nexit 3");
        let out = runner().run(&prog, &[]);
        assert_eq!(out.code, 3);
        assert_eq!(out.stdout, "conn=DP-1");
        assert_eq!(out.stderr, "warn");
    }

    #[test]
    fn passes_arguments_and_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let prog = script(dir.path(), "args.sh", "echo \"$1 $2 $QS_EXTRA\"");
        let out = runner().run_with_env(&prog, &["set", "40"], &[("QS_EXTRA", "yes")]);
        assert!(out.success());
        assert_eq!(out.stdout, "set 40 yes");
    }

    #[test]
    fn missing_program_maps_to_127() {
        let out = runner().run(Path::new("/nonexistent/helper-xyz"), &["status"]);
        assert_eq!(out, RunOutput::synthetic(EXIT_NOT_FOUND, "not found"));
    }

    #[test]
    fn non_executable_file_maps_to_126() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, "not a program").unwrap();
        let out = runner().run(&path, &[]);
        assert_eq!(out.code, EXIT_CANNOT_EXECUTE);
        assert!(!out.stderr.is_empty());
    }

    #[test]
    fn slow_program_times_out_with_124() {
        let dir = tempfile::tempdir().unwrap();
        let prog = script(dir.path(), "slow.sh", "sleep 5");
        let started = Instant::now();
        let out = Runner::new(Duration::from_millis(200)).run(&prog, &[]);
        assert_eq!(out.code, EXIT_TIMEOUT);
        assert_eq!(out.stderr, "timeout");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn background_child_holding_stdout_cannot_outlast_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let prog = script(dir.path(), "daemon.sh", "sleep 8 &\necho started");
        let started = Instant::now();
        let out = Runner::new(Duration::from_millis(300)).run(&prog, &[]);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(out.code, EXIT_TIMEOUT);
        assert_eq!(out.stderr, "timeout");
    }

    #[test]
    fn check_prefers_stderr_then_exit_code() {
        assert!(RunOutput::synthetic(0, "").check().is_ok());
        let err = RunOutput::synthetic(2, "no display").check().unwrap_err();
        assert_eq!(err.to_string(), "no display");
        let err = RunOutput::synthetic(5, "").check().unwrap_err();
        assert_eq!(err.to_string(), "exit 5");
    }
}
