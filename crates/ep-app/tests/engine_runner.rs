#![cfg(unix)]

use std::time::Duration;

use ep_app::{AppError, EngineCommand, EngineRunner, RunStatus};

fn shell(dir: &std::path::Path, script: &str) -> EngineCommand {
    EngineCommand {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        working_dir: dir.to_path_buf(),
    }
}

#[test]
fn successful_run_reports_processed_files() {
    let dir = tempfile::tempdir().unwrap();
    let runner = EngineRunner::new();
    let run = runner
        .start(
            shell(dir.path(), "echo '7 files processed and stored in workspace variable \"data\"'"),
            Duration::from_secs(10),
        )
        .unwrap();
    let report = run.wait().unwrap();

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.files_processed, Some(7));
    assert!(report.summary().contains("7 files processed"));
    assert!(!runner.is_running());
}

#[test]
fn failing_run_keeps_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let runner = EngineRunner::new();
    let report = runner
        .start(shell(dir.path(), "echo boom >&2; exit 3"), Duration::from_secs(10))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed { exit_code: Some(3) });
    assert_eq!(report.stderr.trim(), "boom");
}

#[test]
fn second_start_is_rejected_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let runner = EngineRunner::new();
    let run = runner
        .start(shell(dir.path(), "sleep 1"), Duration::from_secs(10))
        .unwrap();

    assert!(runner.is_running());
    assert!(matches!(
        runner.start(shell(dir.path(), "true"), Duration::from_secs(10)),
        Err(AppError::AlreadyRunning)
    ));

    assert_eq!(run.wait().unwrap().status, RunStatus::Succeeded);
    assert!(runner.start(shell(dir.path(), "true"), Duration::from_secs(10)).is_ok());
}

#[test]
fn timeout_is_reported_without_waiting_for_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let runner = EngineRunner::new();
    let report = runner
        .start(shell(dir.path(), "sleep 5"), Duration::from_millis(200))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(report.status, RunStatus::TimedOut);
    assert!(report.elapsed < Duration::from_secs(4));
    assert!(!runner.is_running());
}

#[test]
fn missing_program_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let runner = EngineRunner::new();
    let command = EngineCommand {
        program: "definitely-not-an-engine-binary".to_string(),
        args: Vec::new(),
        working_dir: dir.path().to_path_buf(),
    };
    assert!(matches!(
        runner.start(command, Duration::from_secs(1)),
        Err(AppError::Engine(_))
    ));
    assert!(!runner.is_running());
}
