use std::collections::BTreeSet;

use client_core::UserDirectory;
use futures::future::join_all;
use shared::{
    domain::{Role, UserId},
    protocol::User,
};
use tracing::{info, warn};

use crate::{
    bulk::{BulkDeleteFlow, BulkDeleteReport, BulkDeleteState},
    error::ConsoleError,
    filter::{BalanceRange, FilterState, FilteredStats, VisiblePage},
    listing::ListingState,
    selection::Selection,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Fetched { count: usize },
    /// The set was already loaded and not invalidated; nothing was fetched.
    Cached,
}

/// User list over any [`UserDirectory`].
///
/// Page and page-size changes clear the selection. Filter changes keep only
/// the selected users that are still on the visible page. Any change to the
/// selection drops a pending bulk-delete confirmation.
pub struct UserListController<D> {
    directory: D,
    listing: ListingState,
    selection: Selection,
    bulk: BulkDeleteFlow,
}

impl<D: UserDirectory> UserListController<D> {
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            listing: ListingState::default(),
            selection: Selection::default(),
            bulk: BulkDeleteFlow::default(),
        }
    }

    pub fn with_page_size(directory: D, page_size: usize) -> Result<Self, ConsoleError> {
        let mut controller = Self::new(directory);
        controller.listing.set_page_size(page_size)?;
        Ok(controller)
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Fetches the full set unless it is already loaded.
    ///
    /// On failure the previous set is kept as is, so filters keep working
    /// against stale data until a retry succeeds.
    pub async fn load(&mut self) -> Result<LoadOutcome, ConsoleError> {
        if self.listing.is_loaded() {
            return Ok(LoadOutcome::Cached);
        }
        let users = self.directory.list_users().await.map_err(|err| {
            warn!(%err, reauth = err.requires_reauth(), "loading users failed");
            ConsoleError::from(err)
        })?;
        let count = users.len();
        self.listing.replace_users(users);
        self.sync_selection();
        info!(count, "user list loaded");
        Ok(LoadOutcome::Fetched { count })
    }

    pub fn invalidate(&mut self) {
        self.listing.invalidate();
    }

    pub async fn reload(&mut self) -> Result<LoadOutcome, ConsoleError> {
        self.invalidate();
        self.load().await
    }

    pub fn is_loaded(&self) -> bool {
        self.listing.is_loaded()
    }

    pub fn users(&self) -> &[User] {
        self.listing.users()
    }

    pub fn visible_page(&self) -> VisiblePage<'_> {
        self.listing.visible_page()
    }

    pub fn filters(&self) -> &FilterState {
        self.listing.filters()
    }

    pub fn bounds(&self) -> BalanceRange {
        self.listing.bounds()
    }

    pub fn page(&self) -> usize {
        self.listing.page()
    }

    pub fn page_size(&self) -> usize {
        self.listing.page_size()
    }

    pub fn total_pages(&self) -> usize {
        self.listing.total_pages()
    }

    pub fn active_filter_count(&self) -> usize {
        self.listing.active_filter_count()
    }

    pub fn filtered_stats(&self) -> FilteredStats {
        self.listing.filtered_stats()
    }

    /// Returns the page actually shown after clamping.
    pub fn set_page(&mut self, page: usize) -> usize {
        let page = self.listing.set_page(page);
        self.selection.on_page_changed();
        self.drop_pending_confirmation();
        page
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), ConsoleError> {
        self.listing.set_page_size(page_size)?;
        self.selection.on_page_size_changed();
        self.drop_pending_confirmation();
        Ok(())
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.listing.set_search(search);
        self.sync_selection();
    }

    pub fn set_type_filter(&mut self, role: Role, enabled: bool) {
        self.listing.set_type_filter(role, enabled);
        self.sync_selection();
    }

    pub fn set_range(&mut self, lo: f64, hi: f64) {
        self.listing.set_range(lo, hi);
        self.sync_selection();
    }

    pub fn clear_all_filters(&mut self) {
        self.listing.clear_all_filters();
        self.sync_selection();
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn toggle(&mut self, id: &UserId) -> bool {
        let visible = self.visible_page().ids();
        let selected = self.selection.toggle(id, &visible);
        self.drop_pending_confirmation();
        selected
    }

    pub fn select_all(&mut self) {
        let visible = self.visible_page().ids();
        self.selection.select_all(&visible);
        self.drop_pending_confirmation();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.drop_pending_confirmation();
    }

    pub fn bulk_state(&self) -> &BulkDeleteState {
        self.bulk.state()
    }

    /// Opens the confirmation step for the current selection.
    pub fn begin_bulk_delete(&mut self) -> Result<usize, ConsoleError> {
        let count = self.selection.len();
        self.bulk.request(count)?;
        Ok(count)
    }

    pub fn cancel_bulk_delete(&mut self) -> Result<(), ConsoleError> {
        self.bulk.cancel()
    }

    /// Deletes every selected user once `token` matches the confirmation
    /// literal.
    ///
    /// Starts the confirmation step itself when the flow is idle. Deletes run
    /// concurrently and every outcome is collected; users that were deleted
    /// leave both the set and the selection, failed ones stay selected.
    ///
    /// Dropping the returned future mid-run leaves the flow `Failed` and
    /// the set untouched; [`reload`](Self::reload) shows what was removed.
    pub async fn bulk_delete(&mut self, token: &str) -> Result<BulkDeleteReport, ConsoleError> {
        if matches!(self.bulk.state(), BulkDeleteState::Idle) {
            self.begin_bulk_delete()?;
        }
        let ids: Vec<UserId> = self.selection.ids().iter().cloned().collect();
        let run = self.bulk.start(token, ids)?;

        let directory = &self.directory;
        let outcomes = join_all(run.ids().iter().map(|id| async move {
            (id.clone(), directory.delete_user(id).await)
        }))
        .await;

        let report = run.finish(outcomes)?;
        self.listing.remove(&report.deleted_ids());
        self.sync_selection();
        Ok(report)
    }

    pub fn acknowledge_bulk_delete(&mut self) -> Result<(), ConsoleError> {
        self.bulk.acknowledge()
    }

    pub async fn delete_user(&mut self, id: &UserId) -> Result<(), ConsoleError> {
        if let Err(err) = self.directory.delete_user(id).await {
            warn!(user_id = %id, %err, "delete failed");
            return Err(err.into());
        }
        self.listing.remove(&BTreeSet::from([id.clone()]));
        self.sync_selection();
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    fn sync_selection(&mut self) {
        let visible = self.listing.visible_page().ids();
        self.selection.retain_visible(&visible);
        self.drop_pending_confirmation();
    }

    /// A confirmation covers the selection it was opened for and no other.
    fn drop_pending_confirmation(&mut self) {
        if let BulkDeleteState::Confirming { count } = *self.bulk.state() {
            if self.bulk.cancel().is_ok() {
                info!(count, "selection changed, bulk delete confirmation dropped");
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
