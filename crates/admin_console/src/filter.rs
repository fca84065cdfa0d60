//! Filtering and pagination as pure functions of the loaded set.
//!
//! Nothing here holds state between calls: the same users, filters, page and
//! page size always produce the same [`VisiblePage`].

use std::collections::BTreeSet;

use shared::{
    domain::{Role, UserId},
    protocol::User,
};

/// Inclusive balance interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BalanceRange {
    pub lo: f64,
    pub hi: f64,
}

impl BalanceRange {
    /// Swaps the bounds when they arrive reversed.
    pub fn new(lo: f64, hi: f64) -> Self {
        if lo > hi {
            Self { lo: hi, hi: lo }
        } else {
            Self { lo, hi }
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }

    /// Smallest range covering every balance, or `None` for an empty set.
    pub fn observed<'a>(users: impl IntoIterator<Item = &'a User>) -> Option<Self> {
        users.into_iter().fold(None, |acc, user| {
            let balance = user.balance;
            Some(match acc {
                None => Self {
                    lo: balance,
                    hi: balance,
                },
                Some(range) => Self {
                    lo: range.lo.min(balance),
                    hi: range.hi.max(balance),
                },
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    pub search: String,
    /// Empty means every type passes.
    pub types: BTreeSet<Role>,
    pub range: BalanceRange,
}

impl FilterState {
    pub fn matches(&self, user: &User) -> bool {
        SearchNeedle::new(&self.search).matches(user) && self.matches_rest(user)
    }

    /// Number of filter groups that currently narrow the set.
    pub fn active_count(&self, bounds: BalanceRange) -> usize {
        usize::from(!self.search.is_empty())
            + usize::from(!self.types.is_empty())
            + usize::from(self.range != bounds)
    }

    fn matches_rest(&self, user: &User) -> bool {
        (self.types.is_empty() || user.has_any_role(&self.types))
            && self.range.contains(user.balance)
    }
}

struct SearchNeedle(String);

impl SearchNeedle {
    fn new(search: &str) -> Self {
        Self(search.to_lowercase())
    }

    fn matches(&self, user: &User) -> bool {
        self.0.is_empty()
            || [&user.family_name, &user.given_name, &user.email]
                .iter()
                .any(|field| field.to_lowercase().contains(&self.0))
    }
}

/// One page of the filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct VisiblePage<'a> {
    pub users: Vec<&'a User>,
    pub filtered_count: usize,
    /// Requested page clamped to `1..=max(total_pages, 1)`.
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl VisiblePage<'_> {
    pub fn ids(&self) -> BTreeSet<UserId> {
        self.users.iter().map(|user| user.id.clone()).collect()
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.users.iter().any(|user| &user.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilteredStats {
    pub count: usize,
    pub total_balance: f64,
    pub average_balance: f64,
}

pub fn total_pages(filtered_count: usize, page_size: usize) -> usize {
    filtered_count.div_ceil(page_size.max(1))
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

pub fn filtered<'a>(users: &'a [User], filters: &FilterState) -> Vec<&'a User> {
    let needle = SearchNeedle::new(&filters.search);
    users
        .iter()
        .filter(|user| needle.matches(user) && filters.matches_rest(user))
        .collect()
}

pub fn apply_filters<'a>(
    users: &'a [User],
    filters: &FilterState,
    page: usize,
    page_size: usize,
) -> VisiblePage<'a> {
    let page_size = page_size.max(1);
    let matching = filtered(users, filters);
    let filtered_count = matching.len();
    let total_pages = total_pages(filtered_count, page_size);
    let page = clamp_page(page, total_pages);

    let users = matching
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();
    VisiblePage {
        users,
        filtered_count,
        page,
        page_size,
        total_pages,
    }
}

/// Totals over every page of the filtered set.
pub fn filtered_stats(users: &[User], filters: &FilterState) -> FilteredStats {
    let matching = filtered(users, filters);
    let count = matching.len();
    let total_balance: f64 = matching.iter().map(|user| user.balance).sum();
    FilteredStats {
        count,
        total_balance,
        average_balance: if count > 0 {
            total_balance / count as f64
        } else {
            0.0
        },
    }
}
