//! CLI command execution helpers with automatic timing
//!
//! Wraps the `scat` binary: builds arguments, runs it with a deadline and
//! captures its output.

use anyhow::{Context, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// CLI command builder with timing
pub struct ScatCommand {
    working_dir: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    hold_stdout: bool,
}

impl ScatCommand {
    /// Create a new command in the given working directory
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            timeout: Duration::from_secs(30),
            hold_stdout: false,
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set command timeout
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Leave stdout unread until the run exits, so a large output stalls it
    pub fn hold_stdout(&mut self) -> &mut Self {
        self.hold_stdout = true;
        self
    }

    /// Start the binary without waiting for it
    pub fn spawn(&self) -> Result<RunningScat> {
        let mut child = Command::new(env!("CARGO_BIN_EXE_scat"))
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn scat")?;

        let stdout = if self.hold_stdout {
            None
        } else {
            child.stdout.take().map(capture)
        };
        let stderr = child.stderr.take().map(capture);

        Ok(RunningScat {
            child,
            start: Instant::now(),
            timeout: self.timeout,
            stdout,
            stderr,
        })
    }

    /// Execute command and return result with timing
    ///
    /// A run that outlives the timeout is killed and reported as failed.
    pub fn execute(&self) -> Result<CommandResult> {
        self.spawn()?.wait()
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() || result.timed_out {
            anyhow::bail!(
                "Command should have failed but {}:\nArgs: {:?}\nStderr: {}",
                if result.timed_out { "hung" } else { "succeeded" },
                self.args,
                result.stderr
            );
        }

        Ok(result)
    }
}

type Captured = (Arc<Mutex<String>>, JoinHandle<()>);

/// Copy a pipe into a shared buffer as it is written
fn capture(mut pipe: impl Read + Send + 'static) -> Captured {
    let text = Arc::new(Mutex::new(String::new()));
    let sink = text.clone();
    let reader = std::thread::spawn(move || {
        let mut buf = [0u8; 8192];
        while let Ok(n) = pipe.read(&mut buf) {
            if n == 0 {
                break;
            }
            sink.lock().unwrap().push_str(&String::from_utf8_lossy(&buf[..n]));
        }
    });
    (text, reader)
}

fn collect(captured: Option<Captured>) -> String {
    match captured {
        Some((text, reader)) => {
            let _ = reader.join();
            let text = text.lock().unwrap();
            text.clone()
        }
        None => String::new(),
    }
}

/// A `scat` process that is still running
pub struct RunningScat {
    child: Child,
    start: Instant,
    timeout: Duration,
    stdout: Option<Captured>,
    stderr: Option<Captured>,
}

impl RunningScat {
    /// Send SIGINT, as Ctrl-C would
    pub fn interrupt(&self) -> Result<()> {
        kill(Pid::from_raw(self.child.id() as i32), Signal::SIGINT)?;
        Ok(())
    }

    /// Wait until stderr contains `text`
    pub fn wait_for_stderr(&self, text: &str) -> bool {
        Self::wait_for(&self.stderr, text)
    }

    /// Wait until stdout contains `text`
    pub fn wait_for_stdout(&self, text: &str) -> bool {
        Self::wait_for(&self.stdout, text)
    }

    fn wait_for(captured: &Option<Captured>, text: &str) -> bool {
        let Some((buffer, _)) = captured else {
            return false;
        };
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if buffer.lock().unwrap().contains(text) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    /// Wait for exit, killing the run once the timeout has passed
    pub fn wait(mut self) -> Result<CommandResult> {
        let status = loop {
            if let Some(status) = self.child.try_wait()? {
                break Some(status);
            }
            if self.start.elapsed() > self.timeout {
                self.child.kill()?;
                self.child.wait()?;
                break None;
            }
            std::thread::sleep(Duration::from_millis(20));
        };

        let mut stdout = collect(self.stdout.take());
        if let Some(mut held) = self.child.stdout.take() {
            held.read_to_string(&mut stdout)?;
        }

        Ok(CommandResult {
            stdout,
            stderr: collect(self.stderr.take()),
            exit_code: status.and_then(|s| s.code()).unwrap_or(-1),
            timed_out: status.is_none(),
            duration: self.start.elapsed(),
        })
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if stderr contains text
    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// FASTQ text with `count` records named `{prefix}{i}`
pub fn fastq_records(prefix: &str, count: usize) -> String {
    (0..count)
        .map(|i| format!("@{prefix}{i}\nACGTACGT\n+\nIIIIIIII\n"))
        .collect()
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// scat!(dir, "-p", "123", "data").assert_success()?;
/// ```
#[macro_export]
macro_rules! scat {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::ScatCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
