//! External numerical-engine runs.
//!
//! One run at a time: the child process is spawned on the caller's thread,
//! then awaited on a worker thread that polls it until it exits or the
//! timeout passes. A timed-out child is not killed; it is only reported.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, channel};
use std::sync::{Arc, LazyLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use regex::Regex;

use crate::error::{AppError, AppResult};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

static FILES_PROCESSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) files processed").expect("FILES_PROCESSED is a valid static regex pattern")
});

/// Program, arguments and working directory of one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl EngineCommand {
    /// `<exe> -batch "cd('<dir>'); <entry>"`.
    pub fn batch(executable: &str, working_dir: &Path, entry_script: &str) -> Self {
        let dir = working_dir.display().to_string().replace('\\', "/");
        Self {
            program: executable.to_string(),
            args: vec![
                "-batch".to_string(),
                format!("cd('{}'); {}", dir.replace('\'', "''"), entry_script),
            ],
            working_dir: working_dir.to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Failed { exit_code: Option<i32> },
    /// The timeout passed; the process may still be running.
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct EngineReport {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
    pub files_processed: Option<u64>,
    pub elapsed: Duration,
}

impl EngineReport {
    /// Human-readable completion summary.
    pub fn summary(&self) -> String {
        match &self.status {
            RunStatus::Succeeded => format!(
                "Processing completed successfully: {} files processed in {:.1}s",
                self.files_processed.unwrap_or(0),
                self.elapsed.as_secs_f64()
            ),
            RunStatus::Failed { exit_code } => format!(
                "Processing failed with exit code {}\n\nError:\n{}",
                exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()),
                self.stderr.trim_end()
            ),
            RunStatus::TimedOut => format!(
                "Processing timed out after {:.0}s. The engine may still be running in the background.",
                self.elapsed.as_secs_f64()
            ),
        }
    }
}

/// `N` from the first `"N files processed"` line of engine output.
pub fn parse_files_processed(stdout: &str) -> Option<u64> {
    FILES_PROCESSED
        .captures(stdout)
        .and_then(|caps| caps.get(1))
        .and_then(|n| n.as_str().parse().ok())
}

/// A run in flight.
pub struct EngineRun {
    pub report_rx: Receiver<EngineReport>,
    _handle: JoinHandle<()>,
}

impl EngineRun {
    /// Block until the worker reports.
    pub fn wait(self) -> AppResult<EngineReport> {
        self.report_rx
            .recv()
            .map_err(|_| AppError::Engine("engine worker exited without a report".to_string()))
    }
}

/// Starts engine runs and rejects overlapping ones.
#[derive(Debug, Clone, Default)]
pub struct EngineRunner {
    running: Arc<AtomicBool>,
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl EngineRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn start(&self, command: EngineCommand, timeout: Duration) -> AppResult<EngineRun> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::AlreadyRunning);
        }
        let guard = RunningGuard(Arc::clone(&self.running));

        tracing::info!(program = %command.program, args = ?command.args, "starting engine");
        let child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::Engine(format!("Failed to start {}: {}", command.program, e)))?;

        let (tx, rx) = channel();
        let handle = thread::spawn(move || {
            let report = supervise(child, timeout);
            tracing::info!(status = ?report.status, "engine run finished");
            drop(guard);
            let _ = tx.send(report);
        });

        Ok(EngineRun {
            report_rx: rx,
            _handle: handle,
        })
    }
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = pipe.read_to_string(&mut buf);
        buf
    })
}

fn supervise(mut child: Child, timeout: Duration) -> EngineReport {
    let started = Instant::now();
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let exit = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Ok(status),
            Ok(None) if started.elapsed() >= timeout => break Err(None),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => break Err(Some(e)),
        }
    };

    let collect = |handle: Option<JoinHandle<String>>| {
        handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    };

    match exit {
        Ok(status) => {
            let stdout = collect(stdout);
            let stderr = collect(stderr);
            let files_processed = parse_files_processed(&stdout);
            EngineReport {
                status: if status.success() {
                    RunStatus::Succeeded
                } else {
                    RunStatus::Failed {
                        exit_code: status.code(),
                    }
                },
                stdout,
                stderr,
                files_processed,
                elapsed: started.elapsed(),
            }
        }
        Err(None) => {
            tracing::warn!(timeout_s = timeout.as_secs_f64(), "engine run timed out");
            EngineReport {
                status: RunStatus::TimedOut,
                stdout: String::new(),
                stderr: String::new(),
                files_processed: None,
                elapsed: started.elapsed(),
            }
        }
        Err(Some(e)) => EngineReport {
            status: RunStatus::Failed { exit_code: None },
            stdout: String::new(),
            stderr: e.to_string(),
            files_processed: None,
            elapsed: started.elapsed(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_command_shape() {
        let cmd = EngineCommand::batch("matlab", Path::new("C:\\data\\prep"), "preprocessing");
        assert_eq!(cmd.args, vec!["-batch", "cd('C:/data/prep'); preprocessing"]);
    }

    #[test]
    fn parses_processed_count() {
        let out = "Loading...\n12 files processed and stored in workspace variable \"data\"\n";
        assert_eq!(parse_files_processed(out), Some(12));
        assert_eq!(parse_files_processed("nothing here"), None);
    }
}
