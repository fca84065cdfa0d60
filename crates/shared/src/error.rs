use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body as the backend sends it. Every field is optional because the
/// backend mixes Spring's default error shape with hand-written `{message}`
/// maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

impl ApiErrorBody {
    /// Parses a raw response body, falling back to treating it as plain text.
    pub fn from_body(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        serde_json::from_str(trimmed).unwrap_or_else(|_| Self {
            message: Some(trimmed.to_string()),
            ..Self::default()
        })
    }

    pub fn summary(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .filter(|message| !message.trim().is_empty())
    }

    /// First field-level error, preferring the explicit `field` key.
    pub fn field_error(&self) -> Option<FieldError> {
        if let Some(field) = &self.field {
            return Some(FieldError::new(
                field.clone(),
                self.summary().unwrap_or_else(|| "is invalid".to_string()),
            ));
        }
        self.errors
            .iter()
            .next()
            .map(|(field, message)| FieldError::new(field.clone(), message.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
