use std::collections::BTreeSet;

use super::RowId;

/// Set of selected row ids.
///
/// "Select all" is relative to the rows currently loaded: ids that arrive
/// later through infinite scroll are never selected retroactively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<RowId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: &RowId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RowId> {
        self.ids.iter()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Flip one row. Ids no longer present in `current` are dropped first so
    /// the selection never refers to rows that left the loaded window.
    pub fn toggle(&mut self, id: &RowId, current: &[RowId]) {
        self.retain_loaded(current);
        if !self.ids.remove(id) && current.contains(id) {
            self.ids.insert(id.clone());
        }
    }

    /// Select every currently loaded row, or clear when all already are.
    pub fn toggle_all(&mut self, current: &[RowId]) {
        if self.is_all_selected(current) {
            self.ids.clear();
        } else {
            self.ids = current.iter().cloned().collect();
        }
    }

    /// True when `current` is non-empty and every id in it is selected.
    pub fn is_all_selected(&self, current: &[RowId]) -> bool {
        !current.is_empty() && current.iter().all(|id| self.ids.contains(id))
    }

    /// Drop selected ids that are not in `current`.
    pub fn retain_loaded(&mut self, current: &[RowId]) {
        self.ids.retain(|id| current.contains(id));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<RowId> {
        raw.iter().map(|s| RowId::from(*s)).collect()
    }

    #[test]
    fn test_select_all_is_not_extended_by_new_rows() {
        let mut sel = SelectionSet::new();
        let page1 = ids(&["a", "b"]);
        sel.toggle_all(&page1);
        assert!(sel.is_all_selected(&page1));

        let grown = ids(&["a", "b", "c"]);
        assert!(!sel.is_all_selected(&grown));
        assert!(!sel.is_selected(&RowId::from("c")));
    }

    #[test]
    fn test_toggle_all_twice_clears() {
        let mut sel = SelectionSet::new();
        let page = ids(&["a", "b"]);
        sel.toggle_all(&page);
        sel.toggle_all(&page);
        assert!(sel.is_empty());
    }

    #[test]
    fn test_toggle_ignores_unloaded_ids() {
        let mut sel = SelectionSet::new();
        sel.toggle(&RowId::from("zzz"), &ids(&["a"]));
        assert!(sel.is_empty());
        sel.toggle(&RowId::from("a"), &ids(&["a"]));
        assert_eq!(sel.len(), 1);
    }
}
