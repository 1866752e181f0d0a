#![cfg(unix)]

use crate::error::{ExecutableKind, RuntimeError};
use crate::upgrade::{SteamCmdRunner, ToolInvocation, UpdateTool};

use std::path::{Path, PathBuf};
use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::eq;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Run `script` through `/bin/sh` so the test never executes a freshly written file.
fn invocation(dir: &Path, script: &str) -> ToolInvocation {
    let path = dir.join("tool.sh");
    std::fs::write(&path, script).unwrap();
    ToolInvocation {
        program: PathBuf::from("/bin/sh"),
        arguments: format!("\"{}\" +login anonymous", path.display()),
        working_dir: dir.to_path_buf(),
    }
}

#[tokio::test]
async fn given_captured_output_when_tool_runs_then_lines_forwarded() {
    // Given
    let temp = TempDir::new().unwrap();
    let invocation = invocation(
        temp.path(),
        "printf 'Loading Steam API...OK\\r\\n'\necho \"args: $1 $2\"\necho 'Success!'\n",
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    // When
    let result = SteamCmdRunner
        .run(&invocation, Some(tx), &CancellationToken::new())
        .await;

    // Then
    assert_that!(result.unwrap(), eq(true));
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    assert_that!(
        lines,
        eq(&vec![
            String::from("Loading Steam API...OK"),
            String::from("args: +login anonymous"),
            String::from("Success!"),
        ])
    );
}

#[tokio::test]
async fn given_invalid_utf8_output_when_tool_runs_then_later_lines_still_forwarded() {
    // Given
    let temp = TempDir::new().unwrap();
    let invocation = invocation(
        temp.path(),
        "printf ' Update state (0x61) downloading, progress: 10 \\377\\n'\necho 'Success! App fully installed.'\n",
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    // When
    let result = SteamCmdRunner
        .run(&invocation, Some(tx), &CancellationToken::new())
        .await;

    // Then
    assert_that!(result.unwrap(), eq(true));
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    assert_that!(
        lines,
        eq(&vec![
            String::from(" Update state (0x61) downloading, progress: 10 \u{FFFD}"),
            String::from("Success! App fully installed."),
        ])
    );
}

#[tokio::test]
async fn given_failing_tool_when_run_then_reports_failure() {
    // Given
    let temp = TempDir::new().unwrap();
    let invocation = invocation(temp.path(), "exit 7\n");

    // When
    let result = SteamCmdRunner
        .run(&invocation, None, &CancellationToken::new())
        .await;

    // Then
    assert_that!(result.unwrap(), eq(false));
}

#[tokio::test]
async fn given_long_running_tool_when_cancelled_then_cancelled_error() {
    // Given
    let temp = TempDir::new().unwrap();
    let invocation = invocation(temp.path(), "sleep 30\n");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    // When
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        SteamCmdRunner.run(&invocation, None, &cancel),
    )
    .await
    .unwrap();

    // Then
    assert_that!(result.is_err_and(|e| e.is_cancelled()), eq(true));
}

#[tokio::test]
async fn given_missing_program_when_run_then_missing_executable() {
    // Given
    let temp = TempDir::new().unwrap();
    let invocation = ToolInvocation {
        program: temp.path().join("steamcmd.sh"),
        arguments: String::new(),
        working_dir: temp.path().to_path_buf(),
    };

    // When
    let result = SteamCmdRunner
        .run(&invocation, None, &CancellationToken::new())
        .await;

    // Then
    assert!(matches!(
        result,
        Err(RuntimeError::MissingExecutable {
            kind: ExecutableKind::UpdateTool,
            ..
        })
    ));
}
