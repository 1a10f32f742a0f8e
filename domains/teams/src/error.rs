//! Teams domain error taxonomy
//!
//! Every service operation resolves to one of these variants, each of
//! which carries a stable wire code and HTTP status. Repository failures
//! are folded in via [`From<RepositoryError>`]; call sites that know a
//! better domain meaning for `NotFound`/`AlreadyExists` remap before the
//! blanket conversion applies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crewup_common::RepositoryError;
use serde_json::json;

use crate::domain::entities::Position;

pub type Result<T> = std::result::Result<T, TeamsError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TeamsError {
    #[error("User not found")]
    UserNotFound,

    #[error("Team not found")]
    TeamNotFound,

    #[error("Offer not found")]
    OfferNotFound,

    #[error("No team in progress for this user")]
    CurrentTeamNotFound,

    #[error("Request forbidden")]
    RequestForbidden,

    #[error("No open slot for this position")]
    TeamPositionUnavailable,

    #[error("User already belongs to a team in progress")]
    ExistingCurrentTeam,

    #[error("Operation unavailable for the team leader")]
    TeamLeaderUnavailable,

    #[error("Team has no capacity for the leader position")]
    TeamLeaderPositionUnavailable,

    #[error("{0} capacity cannot drop below the current member count")]
    CapacityUpdateUnavailable(Position),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Store(String),
}

impl TeamsError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TeamsError::UserNotFound
            | TeamsError::TeamNotFound
            | TeamsError::OfferNotFound
            | TeamsError::CurrentTeamNotFound => StatusCode::NOT_FOUND,
            TeamsError::RequestForbidden => StatusCode::FORBIDDEN,
            TeamsError::TeamPositionUnavailable
            | TeamsError::ExistingCurrentTeam
            | TeamsError::TeamLeaderUnavailable
            | TeamsError::TeamLeaderPositionUnavailable
            | TeamsError::CapacityUpdateUnavailable(_) => StatusCode::CONFLICT,
            TeamsError::Validation(_) => StatusCode::BAD_REQUEST,
            TeamsError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code carried in API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            TeamsError::UserNotFound => "USER_NOT_FOUND",
            TeamsError::TeamNotFound => "TEAM_NOT_FOUND",
            TeamsError::OfferNotFound => "OFFER_NOT_FOUND",
            TeamsError::CurrentTeamNotFound => "CURRENT_TEAM_NOT_FOUND",
            TeamsError::RequestForbidden => "REQUEST_FORBIDDEN",
            TeamsError::TeamPositionUnavailable => "TEAM_POSITION_UNAVAILABLE",
            TeamsError::ExistingCurrentTeam => "EXISTING_CURRENT_TEAM",
            TeamsError::TeamLeaderUnavailable => "TEAM_LEADER_UNAVAILABLE",
            TeamsError::TeamLeaderPositionUnavailable => "TEAM_LEADER_POSITION_UNAVAILABLE",
            TeamsError::CapacityUpdateUnavailable(position) => match position {
                Position::Designer => "DESIGNER_CNT_UPDATE_UNAVAILABLE",
                Position::Backend => "BACKEND_CNT_UPDATE_UNAVAILABLE",
                Position::Frontend => "FRONTEND_CNT_UPDATE_UNAVAILABLE",
                Position::Manager => "MANAGER_CNT_UPDATE_UNAVAILABLE",
            },
            TeamsError::Validation(_) => "VALIDATION_ERROR",
            TeamsError::Store(_) => "STORE_ERROR",
        }
    }
}

impl From<RepositoryError> for TeamsError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => TeamsError::Store("record not found".to_string()),
            RepositoryError::AlreadyExists => {
                TeamsError::Store("record already exists".to_string())
            }
            RepositoryError::Connection(e) => TeamsError::Store(e.to_string()),
            RepositoryError::InvalidData(msg) => TeamsError::Validation(msg),
        }
    }
}

impl IntoResponse for TeamsError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Internal server error");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(TeamsError::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            TeamsError::CurrentTeamNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TeamsError::RequestForbidden.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            TeamsError::TeamPositionUnavailable.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            TeamsError::Validation("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TeamsError::Store("down".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_capacity_update_codes_name_the_position() {
        assert_eq!(
            TeamsError::CapacityUpdateUnavailable(Position::Designer).error_code(),
            "DESIGNER_CNT_UPDATE_UNAVAILABLE"
        );
        assert_eq!(
            TeamsError::CapacityUpdateUnavailable(Position::Manager).error_code(),
            "MANAGER_CNT_UPDATE_UNAVAILABLE"
        );
    }

    #[test]
    fn test_repository_error_conversion() {
        let err: TeamsError = RepositoryError::InvalidData("bad row".to_string()).into();
        assert!(matches!(err, TeamsError::Validation(_)));

        let err: TeamsError = RepositoryError::NotFound.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
