use thiserror::Error;

/// Coarse classification a caller can branch on (retry, surface, abort).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The call was refused locally before any session or remote call.
    Precondition,
    /// The version context failed to open or close an edit session.
    Session,
    /// The remote service answered but refused the edit.
    Rejected,
    /// Network failure or a response that could not be interpreted.
    Transport,
}

#[derive(Error, Debug, Clone)]
pub enum FabricError {
    #[error("No active record: resolve or set a record before editing")]
    NoActiveRecord,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Record name '{name}' matches {matches} records")]
    AmbiguousRecord { name: String, matches: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to start edit session: {0}")]
    SessionStart(String),

    #[error("Failed to stop edit session: {0}")]
    SessionStop(String),

    #[error("{operation} rejected: {detail}")]
    Rejected { operation: String, detail: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{error} (edit session was not released: {release})")]
    SessionNotReleased {
        error: Box<FabricError>,
        release: Box<FabricError>,
    },
}

impl FabricError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoActiveRecord
            | Self::InvalidInput(_)
            | Self::AmbiguousRecord { .. }
            | Self::Config(_) => ErrorKind::Precondition,
            Self::SessionStart(_) | Self::SessionStop(_) => ErrorKind::Session,
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::Transport(_) | Self::MalformedResponse(_) => ErrorKind::Transport,
            Self::SessionNotReleased { error, .. } => error.kind(),
        }
    }

    /// Whether repeating the same call cannot duplicate remote edits.
    ///
    /// Only failures that happened before a session was opened qualify. None of
    /// the edit operations are idempotent, so anything that may have reached the
    /// remote store after a session was opened must be checked before retrying.
    pub fn is_retry_safe(&self) -> bool {
        matches!(
            self,
            Self::NoActiveRecord
                | Self::InvalidInput(_)
                | Self::Config(_)
                | Self::SessionStart(_)
        )
    }

    pub(crate) fn rejected(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FabricError>;

impl From<serde_json::Error> for FabricError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(FabricError::NoActiveRecord.kind(), ErrorKind::Precondition);
        assert_eq!(
            FabricError::SessionStop("lock held".into()).kind(),
            ErrorKind::Session
        );
        assert_eq!(
            FabricError::rejected("merge", "bad parcels").kind(),
            ErrorKind::Rejected
        );
        assert_eq!(
            FabricError::MalformedResponse("not json".into()).kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn test_unreleased_session_keeps_body_kind() {
        let err = FabricError::SessionNotReleased {
            error: Box::new(FabricError::Transport("connection reset".into())),
            release: Box::new(FabricError::SessionStop("timeout".into())),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("connection reset"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_retry_safety() {
        assert!(FabricError::NoActiveRecord.is_retry_safe());
        assert!(FabricError::SessionStart("busy".into()).is_retry_safe());
        assert!(!FabricError::Transport("reset".into()).is_retry_safe());
        assert!(!FabricError::rejected("build", "no seeds").is_retry_safe());
    }
}
