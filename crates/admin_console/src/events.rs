//! Operator-facing notices built from typed errors and bulk reports.

use std::fmt;

use client_core::ClientError;
use shared::domain::UserId;

use crate::{bulk::BulkDeleteReport, error::ConsoleError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeCategory {
    Auth,
    Transport,
    Validation,
    PartialFailure,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeContext {
    Login,
    Load,
    Delete,
    BulkDelete,
    Save,
    Email,
    General,
}

#[derive(Debug, Clone)]
pub struct Notice {
    category: NoticeCategory,
    context: NoticeContext,
    message: String,
    failed_ids: Vec<UserId>,
}

impl Notice {
    pub fn from_client_error(context: NoticeContext, err: &ClientError) -> Self {
        let (category, message) = match err {
            ClientError::Fetch(_) => (
                NoticeCategory::Transport,
                format!("Server unreachable; check the URL or network and retry ({err})."),
            ),
            ClientError::Authentication { .. } | ClientError::Session(_) => (
                NoticeCategory::Auth,
                format!("Please sign in again: {err}."),
            ),
            ClientError::Validation { field, message } => (
                NoticeCategory::Validation,
                format!("Invalid {field}: {message}."),
            ),
            ClientError::InvalidBaseUrl(_) => (NoticeCategory::Validation, err.to_string()),
            ClientError::NotFound(_) | ClientError::Status { .. } | ClientError::Decode(_) => {
                (NoticeCategory::Unknown, err.to_string())
            }
        };
        Self {
            category,
            context,
            message,
            failed_ids: Vec::new(),
        }
    }

    pub fn from_console_error(context: NoticeContext, err: &ConsoleError) -> Self {
        let category = match err {
            ConsoleError::Client(inner) => return Self::from_client_error(context, inner),
            ConsoleError::InvalidPageSize(_)
            | ConsoleError::ConfirmationMismatch { .. }
            | ConsoleError::EmptySelection => NoticeCategory::Validation,
            ConsoleError::BulkState { .. } | ConsoleError::BulkInFlight => NoticeCategory::Unknown,
        };
        Self {
            category,
            context,
            message: err.to_string(),
            failed_ids: Vec::new(),
        }
    }

    /// `None` when every id was deleted. Otherwise the notice lists each
    /// failed id.
    pub fn from_bulk_report(report: &BulkDeleteReport) -> Option<Self> {
        if report.is_success() {
            return None;
        }
        let failed_ids: Vec<UserId> = report.failed.iter().map(|f| f.id.clone()).collect();
        let listed = failed_ids
            .iter()
            .map(UserId::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let category = if report.failed.iter().all(|f| f.requires_reauth) {
            NoticeCategory::Auth
        } else {
            NoticeCategory::PartialFailure
        };
        Some(Self {
            category,
            context: NoticeContext::BulkDelete,
            message: format!("{}; failed: {listed}", report.summary()),
            failed_ids,
        })
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == NoticeCategory::Auth
    }

    pub fn category(&self) -> NoticeCategory {
        self.category
    }

    pub fn context(&self) -> NoticeContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn failed_ids(&self) -> &[UserId] {
        &self.failed_ids
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
