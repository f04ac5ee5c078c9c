use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coterie_auth::AuthError;
use serde_json::json;
use thiserror::Error;

/// Everything a handler can fail with. Rendered as
/// `{"error": <kind>, "message": <text>}`; internal causes are logged and
/// never leave the process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("upstream service failed: {0}")]
    External(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound(entity)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable tag for the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Authentication(_) => "authentication",
            Self::Authorization(_) => "authorization",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::External(_) => "external",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Expired => Self::Authentication("token expired".to_string()),
            AuthError::Invalid => Self::Authentication("invalid token".to_string()),
            AuthError::WrongKind => Self::Authentication("wrong token type".to_string()),
            AuthError::Hash(_) | AuthError::Encode(_) => Self::Internal(anyhow::Error::new(err)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": self.kind(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_expected_status_codes() {
        let cases = [
            (ApiError::validation("x"), StatusCode::BAD_REQUEST),
            (ApiError::authentication("x"), StatusCode::UNAUTHORIZED),
            (ApiError::authorization("x"), StatusCode::FORBIDDEN),
            (ApiError::not_found("campaign"), StatusCode::NOT_FOUND),
            (ApiError::conflict("x"), StatusCode::CONFLICT),
            (
                ApiError::External("mail".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err.kind());
        }
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(ApiError::not_found("campaign").to_string(), "campaign not found");
    }

    #[test]
    fn token_failures_become_authentication_errors() {
        assert_eq!(
            ApiError::from(AuthError::Expired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::WrongKind).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::Hash("salt".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
