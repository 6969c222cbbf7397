//! Retry logic for addon loading

use pawnctl_foundation::{AddonSettings, Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry 설정
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: u32,

    /// 기본 대기 시간 (n번째 시도 후 n × base_delay)
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// 설정에서 생성
    pub fn from_settings(settings: &AddonSettings) -> Self {
        Self {
            max_attempts: settings.max_load_attempts().max(1),
            base_delay: settings.retry_delay(),
        }
    }

    /// 재시도 없음
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// n번째 시도 실패 후 대기 시간 (선형 백오프)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// 재시도 로직으로 함수 실행
///
/// 일시적 에러(`Error::is_transient`)만 재시도하고, 검증 실패 같은
/// 영구 에러는 즉시 반환한다. 시도를 모두 소진하면 마지막 에러를 반환한다.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation_name: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_transient() || attempt >= max_attempts {
                    return Err(e);
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient error"
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// 에러 메시지 패턴별 복구 안내
pub fn recovery_hints(error: &Error) -> Vec<&'static str> {
    let message = error.to_string().to_lowercase();
    let mut hints = Vec::new();

    if message.contains("enoent") || message.contains("not found") || message.contains("no such file") {
        hints.push("Check that the addon directory and its package.json exist");
        hints.push("Reinstall the addon: pawnctl addon install <source> --force");
    }
    if message.contains("eacces") || message.contains("eperm") || message.contains("permission") {
        hints.push("Check read permissions on the addon directory");
    }
    if message.contains("emfile") || message.contains("too many open files") {
        hints.push("Close other programs or raise the open file limit (ulimit -n)");
    }
    if message.contains("timed out") || message.contains("etimedout") || message.contains("timeout") {
        hints.push("The addon took too long to start; check its activate script");
    }
    if message.contains("connection") || message.contains("econnreset") {
        hints.push("Check your network connection and try again");
    }
    if let Error::Validation(_) = error {
        hints.push("Fix the addon's package.json: name, version, description, author and license are required");
    }
    if hints.is_empty() {
        hints.push("Run with RUST_LOG=debug for more details");
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_transient_error_retried_until_exhausted() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<()> = with_retry(&fast(), "load", || {
            let c = counter_clone.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "reset",
                )))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_validation_error_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<()> = with_retry(&fast(), "load", || {
            let c = counter_clone.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(Error::Validation("missing name".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_failure() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast(), "load", || {
            let c = counter_clone.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::Timeout("slow disk".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_recovery_hints() {
        let hints = recovery_hints(&Error::Validation("missing name".into()));
        assert!(hints.iter().any(|h| h.contains("package.json")));

        let hints = recovery_hints(&Error::from("EMFILE: too many open files"));
        assert!(hints.iter().any(|h| h.contains("ulimit")));
    }
}
