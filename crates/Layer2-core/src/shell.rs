//! Shell 명령 실행
//!
//! 스크립트 addon의 hook/명령어와 툴체인 명령이 공통으로 사용한다.
//! Unix는 `sh -c`, Windows는 `cmd /C` 로 실행한다.

use pawnctl_foundation::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// 명령 실행 결과
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl ShellOutput {
    /// 실패 메시지 (stderr가 비어 있으면 종료 코드)
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("Command failed with exit code: {:?}", self.code)
        } else {
            stderr.to_string()
        }
    }
}

/// Shell 명령 실행 (타임아웃 적용)
pub async fn run_shell(
    command: &str,
    cwd: &Path,
    env: &HashMap<String, String>,
    timeout: Duration,
) -> Result<ShellOutput> {
    let shell = if cfg!(windows) { "cmd" } else { "sh" };
    let shell_arg = if cfg!(windows) { "/C" } else { "-c" };

    debug!("Executing shell command: {}", command);

    let result = tokio::time::timeout(timeout, async {
        Command::new(shell)
            .arg(shell_arg)
            .arg(command)
            .current_dir(cwd)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
    })
    .await;

    match result {
        Ok(Ok(output)) => Ok(ShellOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }),
        Ok(Err(e)) => Err(Error::Io(e)),
        Err(_) => Err(Error::Timeout(format!(
            "'{}' did not finish within {}s",
            command,
            timeout.as_secs()
        ))),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_shell_captures_output_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = HashMap::new();
        env.insert("PAWNCTL_HOOK".to_string(), "preBuild".to_string());

        let output = run_shell(
            "echo \"$PAWNCTL_HOOK\"",
            dir.path(),
            &env,
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert!(output.success);
        assert_eq!(output.stdout.trim(), "preBuild");
    }

    #[tokio::test]
    async fn test_run_shell_failure_message() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_shell(
            "echo broken >&2; exit 3",
            dir.path(),
            &HashMap::new(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(output.failure_message(), "broken");
    }

    #[tokio::test]
    async fn test_run_shell_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_shell(
            "sleep 5",
            dir.path(),
            &HashMap::new(),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Timeout(_)));
    }
}
