use std::collections::BTreeSet;

use shared::{
    domain::{Role, UserId},
    protocol::User,
};

use crate::{
    error::ConsoleError,
    filter::{self, apply_filters, BalanceRange, FilterState, FilteredStats, VisiblePage},
};

pub const PAGE_SIZE_OPTIONS: [usize; 4] = [5, 10, 25, 50];
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// The loaded user set plus filter and pagination state.
///
/// Balance bounds are taken from the set on [`ListingState::replace_users`]
/// and nowhere else.
#[derive(Debug, Clone)]
pub struct ListingState {
    users: Vec<User>,
    filters: FilterState,
    bounds: BalanceRange,
    page: usize,
    page_size: usize,
    loaded: bool,
}

impl Default for ListingState {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            filters: FilterState::default(),
            bounds: BalanceRange::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            loaded: false,
        }
    }
}

impl ListingState {
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn bounds(&self) -> BalanceRange {
        self.bounds
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// False until the first load and again after [`ListingState::invalidate`].
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn invalidate(&mut self) {
        self.loaded = false;
    }

    /// Swaps in a freshly fetched set. Search and type filters survive; the
    /// range is reset to the new bounds. An empty set keeps the previous
    /// bounds.
    pub fn replace_users(&mut self, users: Vec<User>) {
        if let Some(bounds) = BalanceRange::observed(&users) {
            self.bounds = bounds;
            self.filters.range = bounds;
        }
        self.users = users;
        self.loaded = true;
        self.page = self.clamped(self.page);
    }

    /// Drops the given ids from the set and returns how many were present.
    pub fn remove(&mut self, ids: &BTreeSet<UserId>) -> usize {
        let before = self.users.len();
        self.users.retain(|user| !ids.contains(&user.id));
        self.page = self.clamped(self.page);
        before - self.users.len()
    }

    pub fn visible_page(&self) -> VisiblePage<'_> {
        apply_filters(&self.users, &self.filters, self.page, self.page_size)
    }

    pub fn total_pages(&self) -> usize {
        filter::total_pages(
            filter::filtered(&self.users, &self.filters).len(),
            self.page_size,
        )
    }

    /// Out-of-range requests land on the nearest valid page.
    pub fn set_page(&mut self, page: usize) -> usize {
        self.page = self.clamped(page);
        self.page
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), ConsoleError> {
        if !PAGE_SIZE_OPTIONS.contains(&page_size) {
            return Err(ConsoleError::InvalidPageSize(page_size));
        }
        self.page_size = page_size;
        self.page = 1;
        Ok(())
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filters.search = search.into();
        self.page = 1;
    }

    pub fn set_type_filter(&mut self, role: Role, enabled: bool) {
        if enabled {
            self.filters.types.insert(role);
        } else {
            self.filters.types.remove(&role);
        }
        self.page = 1;
    }

    pub fn set_range(&mut self, lo: f64, hi: f64) {
        self.filters.range = BalanceRange::new(lo, hi);
        self.page = 1;
    }

    pub fn clear_all_filters(&mut self) {
        self.filters = FilterState {
            range: self.bounds,
            ..FilterState::default()
        };
        self.page = 1;
    }

    pub fn active_filter_count(&self) -> usize {
        self.filters.active_count(self.bounds)
    }

    pub fn filtered_stats(&self) -> FilteredStats {
        filter::filtered_stats(&self.users, &self.filters)
    }

    fn clamped(&self, page: usize) -> usize {
        filter::clamp_page(page, self.total_pages())
    }
}
