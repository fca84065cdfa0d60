use client_core::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("page size {0} is not one of 5, 10, 25 or 50")]
    InvalidPageSize(usize),
    #[error("cannot {action} while bulk delete is {state}")]
    BulkState {
        action: &'static str,
        state: &'static str,
    },
    #[error("a bulk delete is already in flight")]
    BulkInFlight,
    #[error("confirmation text does not match; type {expected} to confirm")]
    ConfirmationMismatch { expected: &'static str },
    #[error("no users selected")]
    EmptySelection,
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ConsoleError {
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Client(err) if err.requires_reauth())
    }
}
