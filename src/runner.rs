//! External test process runner
//!
//! Spawns the game's test command while the server is listening, so the game
//! under test can connect to it. The command's stdio is inherited.

use std::process::Stdio;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::logging::LogSink;

/// Result of running the test process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Whether the process exited with code 0
    pub success: bool,

    /// Wall time in milliseconds
    pub duration_ms: u64,
}

/// Build the shell command line: `runner test_file`, or `test_file` alone
/// when no runner is given.
pub fn command_line(runner: Option<&str>, test_file: &str) -> String {
    match runner.map(str::trim).filter(|r| !r.is_empty()) {
        Some(runner) => format!("{} {}", runner, test_file),
        None => test_file.to_string(),
    }
}

fn shell(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
}

/// Run the test process to completion.
///
/// A process that cannot be spawned counts as a failed run; it is logged, not
/// returned as an error.
pub async fn run_test(runner: Option<&str>, test_file: &str, log: &dyn LogSink) -> RunResult {
    let start = Instant::now();
    let line = command_line(runner, test_file);
    log.info(&format!("Spawning test process: {}", line));

    let status = shell(&line)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .status()
        .await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match status {
        Ok(status) if status.success() => {
            log.info(&format!("Test process succeeded in {} ms", duration_ms));
            RunResult {
                success: true,
                duration_ms,
            }
        }
        Ok(status) => {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none".to_string());
            log.error(&format!(
                "Test process exited with code {} after {} ms",
                code, duration_ms
            ));
            RunResult {
                success: false,
                duration_ms,
            }
        }
        Err(e) => {
            log.error(&format!("Failed to spawn test process: {}", e));
            RunResult {
                success: false,
                duration_ms,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemorySink};

    #[test]
    fn test_command_line_with_runner() {
        assert_eq!(command_line(Some("node"), "test.js"), "node test.js");
        assert_eq!(command_line(Some("  "), "./test.sh"), "./test.sh");
        assert_eq!(command_line(None, "./test.sh"), "./test.sh");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_process() {
        let log = MemorySink::new();
        let result = run_test(None, "true", log.as_ref()).await;
        assert!(result.success);
        assert!(log.contains("Test process succeeded"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_process() {
        let log = MemorySink::new();
        let result = run_test(Some("sh"), "-c 'exit 3'", log.as_ref()).await;
        assert!(!result.success);
        assert!(log.contains("exited with code 3"));
        assert_eq!(log.messages(LogLevel::Error).len(), 1);
    }
}
