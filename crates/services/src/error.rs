//! Shared error types for the services crate.

use std::fmt;

use remote::RemoteError;
use thiserror::Error;

use crate::sessions::SessionPhase;

/// Session-level actions that require confirmation and a remote round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Submit,
    Quit,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionAction::Submit => f.write_str("submit"),
            SessionAction::Quit => f.write_str("quit"),
        }
    }
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("course has no playable questions")]
    EmptyContent,
    #[error("session is {phase:?}, not active")]
    NotActive { phase: SessionPhase },
    #[error("{0} needs to be confirmed first")]
    ConfirmationRequired(SessionAction),
    #[error("option {index} does not exist; question has {len} options")]
    InvalidOption { index: usize, len: usize },
    #[error("{action} failed: {source}")]
    SessionAction {
        action: SessionAction,
        #[source]
        source: RemoteError,
    },
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_are_wrapped_unchanged() {
        let err: SessionError = RemoteError::Backend("down".into()).into();
        assert!(matches!(err, SessionError::Remote(RemoteError::Backend(ref m)) if m == "down"));
        assert_eq!(err.to_string(), "backend error: down");
    }

    #[test]
    fn session_action_failure_names_the_action() {
        let err = SessionError::SessionAction {
            action: SessionAction::Quit,
            source: RemoteError::Backend("rejected".into()),
        };
        assert_eq!(err.to_string(), "quit failed: backend error: rejected");
    }
}
