//! Error types for pawnctl
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// pawnctl 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // Addon 관련
    // ========================================================================
    /// Addon 구조 검증 실패 (재시도하지 않음)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Addon error: {addon} - {message}")]
    Addon { addon: String, message: String },

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Hook error: {0}")]
    Hook(String),

    #[error("Command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    #[error("Update failed: {addon} - {message}")]
    Update { addon: String, message: String },

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 일시적 오류로 간주하는 메시지 패턴 (소문자 비교)
const TRANSIENT_PATTERNS: &[&str] = &[
    "enoent",
    "eacces",
    "eperm",
    "emfile",
    "enfile",
    "etimedout",
    "econnreset",
    "connection reset",
    "timed out",
    "too many open files",
];

impl Error {
    /// 재시도 가능한 일시적 에러인지 확인
    ///
    /// 파일 없음, 권한 거부, 리소스 고갈, 타임아웃, 연결 리셋 계열만 해당.
    /// 검증 실패는 절대 재시도하지 않는다.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Validation(_) => false,
            Error::Timeout(_) | Error::Http(_) => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::OutOfMemory
            ) || message_is_transient(&e.to_string()),
            Error::Addon { message, .. } | Error::Internal(message) => {
                message_is_transient(message)
            }
            _ => false,
        }
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::AlreadyExists(_)
                | Error::InvalidInput(_)
                | Error::Validation(_)
                | Error::Dependency(_)
        )
    }

    /// Addon 에러 생성 헬퍼
    pub fn addon(addon: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Addon {
            addon: addon.into(),
            message: message.into(),
        }
    }

    /// Command 실행 에러 생성 헬퍼
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Update 에러 생성 헬퍼
    pub fn update(addon: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Update {
            addon: addon.into(),
            message: message.into(),
        }
    }
}

fn message_is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_PATTERNS.iter().any(|p| lower.contains(p))
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_io_kinds() {
        let reset = Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "peer went away",
        ));
        assert!(reset.is_transient());

        let missing = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(missing.is_transient());

        let invalid = Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "garbage",
        ));
        assert!(!invalid.is_transient());
    }

    #[test]
    fn test_transient_messages() {
        assert!(Error::from("read ECONNRESET").is_transient());
        assert!(Error::addon("x", "EMFILE: too many open files").is_transient());
        assert!(!Error::from("unexpected token").is_transient());
        assert!(!Error::Validation("missing name (ENOENT)".into()).is_transient());
    }
}
