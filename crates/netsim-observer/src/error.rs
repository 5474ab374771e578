//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.
//! Session errors are sorted into status classes by [`From<SessionError>`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use netsim_core::SessionError;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was well-formed but the session is in the wrong state
    /// for it (game over, mission already active, access revoked).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request carried an invalid value.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for ObserverError {
    fn from(error: SessionError) -> Self {
        let message = error.to_string();
        match error {
            SessionError::MissionNotOffered(_)
            | SessionError::UnknownNetwork(_)
            | SessionError::UnknownDevice(_)
            | SessionError::UnknownFileSystem(_)
            | SessionError::NoFileSystem(_)
            | SessionError::UnknownFile { .. }
            | SessionError::UnknownOperation(_) => Self::NotFound(message),
            SessionError::GameOver(_)
            | SessionError::MissionAlreadyActive(_)
            | SessionError::NoActiveMission
            | SessionError::MissionNotActive(_)
            | SessionError::InsufficientReputation { .. }
            | SessionError::PrerequisiteIncomplete { .. }
            | SessionError::AccessDenied(_)
            | SessionError::NotConnected(_)
            | SessionError::MissingCapability(_) => Self::Conflict(message),
            SessionError::Clock(_)
            | SessionError::Network(_)
            | SessionError::Economy(_)
            | SessionError::MissingDestination => Self::InvalidRequest(message),
            SessionError::Config(_) | SessionError::Save(_) => Self::Internal(message),
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::InvalidRequest(msg) | Self::InvalidUuid(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Serialization(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("JSON error: {e}"))
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use netsim_types::{GameOverReason, NetworkId};

    use super::*;

    fn status_of(error: ObserverError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn unknown_entities_map_to_not_found() {
        let error = ObserverError::from(SessionError::UnknownNetwork(NetworkId::new("nowhere")));
        assert_eq!(status_of(error), StatusCode::NOT_FOUND);
    }

    #[test]
    fn state_errors_map_to_conflict() {
        let error = ObserverError::from(SessionError::GameOver(GameOverReason::Bankruptcy));
        assert_eq!(status_of(error), StatusCode::CONFLICT);
        let error = ObserverError::from(SessionError::NoActiveMission);
        assert_eq!(status_of(error), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_values_map_to_bad_request() {
        assert_eq!(
            status_of(ObserverError::from(SessionError::MissingDestination)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ObserverError::InvalidUuid("x".to_owned())),
            StatusCode::BAD_REQUEST
        );
    }
}
