//! Error taxonomy for command handling.
//!
//! Handlers never panic and never let an error escape the dispatch
//! boundary: everything a handler cannot resolve itself is returned as a
//! [`HandlerError`] and the dispatcher turns it into the matching numeric
//! for clients, or a silent drop for servers.

use thiserror::Error;

/// Errors that can surface from a command handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("not registered")]
    NotRegistered,

    #[error("already registered")]
    AlreadyRegistered,

    /// Message silently discarded (wrong direction, stale TS, loop guard).
    /// The handler has already emitted any oper-notice it wanted.
    #[error("dropped: {0}")]
    Dropped(&'static str),
}

impl HandlerError {
    /// Static code string for log labels.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams => "need_more_params",
            Self::NotRegistered => "not_registered",
            Self::AlreadyRegistered => "already_registered",
            Self::Dropped(_) => "dropped",
        }
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(HandlerError::NeedMoreParams.error_code(), "need_more_params");
        assert_eq!(HandlerError::Dropped("loop").error_code(), "dropped");
    }
}
