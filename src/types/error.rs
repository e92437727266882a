//! Caller-facing failures of registry operations

use thiserror::Error;

/// Every way a registry operation can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Session id unknown to the registry
    #[error("session not found: {id}")]
    NotFound { id: String },
    /// Session exists but has been stopped
    #[error("session is not active: {id}")]
    Inactive { id: String },
    /// Stop requested on a session that is already stopped
    #[error("session already stopped: {id}")]
    AlreadyStopped { id: String },
    /// Bad input at creation time
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl EngineError {
    /// Get the code string (for logging and transport)
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "SESSION_NOT_FOUND",
            Self::Inactive { .. } => "SESSION_INACTIVE",
            Self::AlreadyStopped { .. } => "ALREADY_STOPPED",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
        }
    }

    pub(crate) fn not_found(id: &str) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument { reason: reason.into() }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(EngineError::not_found("x").code(), "SESSION_NOT_FOUND");
        assert_eq!(EngineError::Inactive { id: "x".into() }.code(), "SESSION_INACTIVE");
        assert_eq!(EngineError::AlreadyStopped { id: "x".into() }.code(), "ALREADY_STOPPED");
        assert_eq!(EngineError::invalid("bad").code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_display_names_session() {
        let err = EngineError::not_found("abc");
        assert_eq!(err.to_string(), "session not found: abc");
    }
}
