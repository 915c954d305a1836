use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpamError {
    #[error("Model is not trained")]
    ModelNotTrained,

    #[error("Insufficient training data: {0}")]
    InsufficientTrainingData(String),

    #[error("Model artifact is corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SpamError {
    /// HTTP status the API layer answers with for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ModelNotTrained => StatusCode::SERVICE_UNAVAILABLE,
            Self::InsufficientTrainingData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AuthenticationFailed | Self::Token(_) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::ArtifactCorrupt(_)
            | Self::Io(_)
            | Self::Database(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SpamError::ModelNotTrained.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            SpamError::InsufficientTrainingData("one label".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            SpamError::ArtifactCorrupt("shape".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(SpamError::Conflict("email".into()).status_code(), StatusCode::CONFLICT);
    }
}
