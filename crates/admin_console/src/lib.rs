//! Client-side user list controller for the BINET admin dashboard.
//!
//! [`UserListController`] owns the loaded user set and derives the visible
//! page from the active filters. It also tracks the page-scoped selection and
//! drives the confirmation-gated bulk delete.

pub mod bulk;
pub mod controller;
pub mod error;
pub mod events;
pub mod filter;
pub mod listing;
pub mod selection;

pub use bulk::{
    BulkDeleteFailure, BulkDeleteFlow, BulkDeleteReport, BulkDeleteState, BulkDeleteTicket,
    InFlightRun, CONFIRMATION_LITERAL,
};
pub use controller::{LoadOutcome, UserListController};
pub use error::ConsoleError;
pub use events::{Notice, NoticeCategory, NoticeContext};
pub use filter::{apply_filters, BalanceRange, FilterState, FilteredStats, VisiblePage};
pub use listing::{ListingState, DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS};
pub use selection::Selection;
