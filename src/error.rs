//! Shared error taxonomy for every service boundary
//!
//! Domain failures travel as data (`ServiceResult::Failure`) inside response
//! envelopes; only the outermost HTTP boundary translates codes into statuses.

use serde::{Deserialize, Serialize};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Error codes understood by every service in the chain.
///
/// Some codes are reserved for boundaries outside the orchestration core
/// (auth) or superseded by the matching-skip logic (`TournamentFull`,
/// `TournamentNotOpen`, `ConcurrencyConflict`) but stay in the taxonomy so the
/// HTTP translation table covers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    InvalidToken,
    UserNotFound,
    PlayerAlreadyJoined,
    TournamentNotOpen,
    TournamentFull,
    TournamentNotFound,
    PlayerNotInTournament,
    InvalidRequest,
    DependencyTimeout,
    ConcurrencyConflict,
    InternalError,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::PlayerAlreadyJoined => "PLAYER_ALREADY_JOINED",
            ErrorCode::TournamentNotOpen => "TOURNAMENT_NOT_OPEN",
            ErrorCode::TournamentFull => "TOURNAMENT_FULL",
            ErrorCode::TournamentNotFound => "TOURNAMENT_NOT_FOUND",
            ErrorCode::PlayerNotInTournament => "PLAYER_NOT_IN_TOURNAMENT",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::DependencyTimeout => "DEPENDENCY_TIMEOUT",
            ErrorCode::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error carried inside failure responses
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn user_not_found(player_id: &str) -> Self {
        Self::new(
            ErrorCode::UserNotFound,
            format!("User {} was not found", player_id),
        )
    }

    pub fn invalid_request(message: impl Into<String>, issues: Vec<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
            .with_details(serde_json::json!({ "issues": issues }))
    }

    pub fn dependency_timeout(dependency: &str, timeout_ms: u64) -> Self {
        Self::new(
            ErrorCode::DependencyTimeout,
            format!("{} request timed out", dependency),
        )
        .with_details(serde_json::json!({
            "dependency": dependency,
            "timeoutMs": timeout_ms,
        }))
    }

    pub fn dependency_unavailable(dependency: &str) -> Self {
        Self::new(
            ErrorCode::InternalError,
            format!("{} is unavailable", dependency),
        )
        .with_details(serde_json::json!({ "dependency": dependency }))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

/// Tagged success/failure payload of a response envelope.
///
/// Wire shape follows the cross-service contract: `{"ok": true, "data": …}` or
/// `{"ok": false, "error": {…}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceResult<T> {
    Success { ok: bool, data: T },
    Failure { ok: bool, error: ServiceError },
}

impl<T> ServiceResult<T> {
    pub fn ok(data: T) -> Self {
        ServiceResult::Success { ok: true, data }
    }

    pub fn err(error: ServiceError) -> Self {
        ServiceResult::Failure { ok: false, error }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ServiceResult::Success { .. })
    }

    pub fn into_result(self) -> std::result::Result<T, ServiceError> {
        match self {
            ServiceResult::Success { data, .. } => Ok(data),
            ServiceResult::Failure { error, .. } => Err(error),
        }
    }
}
