//! Page-scoped multi-select.
//!
//! Every mutation takes the ids of the page currently on screen, so the
//! selection can never hold a user the operator cannot see.

use std::collections::BTreeSet;

use shared::domain::UserId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<UserId>,
    all_selected: bool,
}

impl Selection {
    pub fn ids(&self) -> &BTreeSet<UserId> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.ids.contains(id)
    }

    /// True iff every id on a non-empty visible page is selected.
    pub fn is_all_selected(&self) -> bool {
        self.all_selected
    }

    /// Flips `id`. Ids outside the visible page are ignored; returns whether
    /// anything changed.
    pub fn toggle(&mut self, id: &UserId, visible: &BTreeSet<UserId>) -> bool {
        if !visible.contains(id) {
            return false;
        }
        if !self.ids.remove(id) {
            self.ids.insert(id.clone());
        }
        self.refresh(visible);
        true
    }

    pub fn select_all(&mut self, visible: &BTreeSet<UserId>) {
        self.ids = visible.clone();
        self.refresh(visible);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.all_selected = false;
    }

    pub fn on_page_changed(&mut self) {
        self.clear();
    }

    pub fn on_page_size_changed(&mut self) {
        self.clear();
    }

    /// Drops whatever is no longer visible after the page contents changed.
    pub fn retain_visible(&mut self, visible: &BTreeSet<UserId>) {
        self.ids.retain(|id| visible.contains(id));
        self.refresh(visible);
    }

    fn refresh(&mut self, visible: &BTreeSet<UserId>) {
        self.all_selected = !visible.is_empty() && self.ids == *visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ids: &[&str]) -> BTreeSet<UserId> {
        ids.iter().map(|id| UserId::from(*id)).collect()
    }

    #[test]
    fn toggle_ignores_ids_off_page() {
        let visible = page(&["a", "b"]);
        let mut selection = Selection::default();

        assert!(!selection.toggle(&UserId::from("z"), &visible));
        assert!(selection.is_empty());

        assert!(selection.toggle(&UserId::from("a"), &visible));
        assert!(selection.contains(&UserId::from("a")));
        assert!(selection.toggle(&UserId::from("a"), &visible));
        assert!(selection.is_empty());
    }

    #[test]
    fn select_all_flag_tracks_membership() {
        let visible = page(&["a", "b", "c"]);
        let mut selection = Selection::default();

        selection.select_all(&visible);
        assert_eq!(selection.ids(), &visible);
        assert!(selection.is_all_selected());

        selection.toggle(&UserId::from("b"), &visible);
        assert!(!selection.is_all_selected());
        assert_eq!(selection.len(), 2);

        selection.toggle(&UserId::from("b"), &visible);
        assert!(selection.is_all_selected());
    }

    #[test]
    fn empty_page_is_never_all_selected() {
        let mut selection = Selection::default();
        selection.select_all(&BTreeSet::new());
        assert!(!selection.is_all_selected());
    }

    #[test]
    fn page_hooks_clear_selection() {
        let visible = page(&["a", "b"]);
        let mut selection = Selection::default();

        selection.select_all(&visible);
        selection.on_page_changed();
        assert!(selection.is_empty());
        assert!(!selection.is_all_selected());

        selection.toggle(&UserId::from("a"), &visible);
        selection.on_page_size_changed();
        assert!(selection.is_empty());
    }

    #[test]
    fn retain_visible_drops_hidden_ids() {
        let mut selection = Selection::default();
        selection.select_all(&page(&["a", "b", "c"]));

        selection.retain_visible(&page(&["b", "c", "d"]));
        assert_eq!(selection.ids(), &page(&["b", "c"]));
        assert!(!selection.is_all_selected());
    }
}
