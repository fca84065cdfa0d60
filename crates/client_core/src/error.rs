use reqwest::StatusCode;
use shared::error::{ApiErrorBody, FieldError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach the BINET backend: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("authentication required: {reason}")]
    Authentication { status: Option<u16>, reason: String },
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid session token: {0}")]
    Session(String),
    #[error("invalid backend url '{0}'")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// Maps a non-success response onto the error taxonomy.
    pub fn from_status(status: StatusCode, path: &str, body: &str) -> Self {
        let parsed = ApiErrorBody::from_body(body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Authentication {
                status: Some(status.as_u16()),
                reason: parsed.summary().unwrap_or_else(|| {
                    if status == StatusCode::FORBIDDEN {
                        "access denied for this account".to_string()
                    } else {
                        "session missing or expired".to_string()
                    }
                }),
            },
            StatusCode::NOT_FOUND => Self::NotFound(path.to_string()),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let field = parsed.field_error().unwrap_or_else(|| {
                    FieldError::new(
                        "request",
                        parsed
                            .summary()
                            .unwrap_or_else(|| "rejected by the backend".to_string()),
                    )
                });
                field.into()
            }
            _ => Self::Status {
                status: status.as_u16(),
                message: parsed
                    .summary()
                    .or_else(|| status.canonical_reason().map(str::to_string))
                    .unwrap_or_default(),
            },
        }
    }

    pub fn missing_session() -> Self {
        Self::Authentication {
            status: None,
            reason: "not logged in".to_string(),
        }
    }

    /// Transport failures are the only errors worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

impl From<FieldError> for ClientError {
    fn from(value: FieldError) -> Self {
        Self::Validation {
            field: value.field,
            message: value.message,
        }
    }
}
