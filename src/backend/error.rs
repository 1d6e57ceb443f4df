use reqwest::StatusCode;
use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

/// Failures at the managed-backend boundary.
///
/// Every variant carries a message that can be shown to the user as-is.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl BackendError {
    /// The message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            BackendError::Network(m)
            | BackendError::Validation(m)
            | BackendError::NotFound(m)
            | BackendError::Storage(m)
            | BackendError::Unauthorized(m) => m,
        }
    }

    /// Map a failed HTTP response from the table or auth API
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
            StatusCode::NOT_FOUND => BackendError::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                BackendError::Validation(message)
            }
            _ => BackendError::Network(format!("{} ({})", message, status)),
        }
    }

    /// Map a failed HTTP response from the storage API
    pub fn from_storage_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
            _ => BackendError::Storage(message),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Network(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BackendError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        BackendError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_error_kinds() {
        let msg = || "boom".to_string();
        assert!(matches!(
            BackendError::from_status(StatusCode::UNAUTHORIZED, msg()),
            BackendError::Unauthorized(_)
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::NOT_FOUND, msg()),
            BackendError::NotFound(_)
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::BAD_REQUEST, msg()),
            BackendError::Validation(_)
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::BAD_GATEWAY, msg()),
            BackendError::Network(_)
        ));
        assert!(matches!(
            BackendError::from_storage_status(StatusCode::PAYLOAD_TOO_LARGE, msg()),
            BackendError::Storage(_)
        ));
    }

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = BackendError::Validation("Brand is required".into());
        assert_eq!(err.to_string(), "Brand is required");
    }
}
