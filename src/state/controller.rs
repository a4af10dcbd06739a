//! Table state controller.
//!
//! Owns all cross-cutting UI state for one grid instance. Every mutator is a
//! synchronous state transition; the presentation mutators additionally
//! persist through the [`PresentationStore`]. Persistence is best-effort: a
//! failing store is logged and the in-memory state stays authoritative.

use super::presentation::{normalize_order, ColumnPresentation, TablePresentationState};
use super::store::PresentationStore;
use crate::column::{ColumnSet, EffectiveColumn};
use crate::error::{GridError, Result};
use crate::types::{FilterSpec, QueryParams, RowId, SelectionSet, SortDirection, SortSpec};

/// Cross-cutting table state for one grid.
#[derive(Debug)]
pub struct TableStateController<S: PresentationStore> {
    table: String,
    columns: ColumnSet,
    store: S,
    state: TablePresentationState,
    filters: FilterSpec,
    staged_search: String,
    applied_search: String,
    selection: SelectionSet,
}

impl<S: PresentationStore> TableStateController<S> {
    /// Load presentation state for `table` from `store`, falling back to the
    /// column model's defaults.
    pub fn new(table: impl Into<String>, columns: ColumnSet, store: S) -> Self {
        let table = table.into();
        let state = TablePresentationState::load(&store, &table, &columns);
        Self {
            table,
            columns,
            store,
            state,
            filters: FilterSpec::new(),
            staged_search: String::new(),
            applied_search: String::new(),
            selection: SelectionSet::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn presentation(&self) -> &ColumnPresentation {
        &self.state.columns
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ordered visible columns with overrides applied.
    pub fn effective_columns(&self) -> Vec<EffectiveColumn<'_>> {
        self.state.columns.resolve(&self.columns)
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.state.sort.as_ref()
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn staged_search(&self) -> &str {
        &self.staged_search
    }

    pub fn applied_search(&self) -> &str {
        &self.applied_search
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Parameters for the data layer. Staged search text is not included.
    pub fn query_params(&self) -> QueryParams {
        QueryParams {
            sort: self.state.sort.clone(),
            filters: self.filters.clone(),
            search: self.applied_search.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Column presentation
    // -------------------------------------------------------------------------

    pub fn toggle_column_visibility(&mut self, key: &str) -> Result<()> {
        self.require_column(key)?;
        let visible = self.state.columns.visibility.entry(key.to_string()).or_insert(true);
        *visible = !*visible;
        self.persist();
        Ok(())
    }

    /// Replace the column order. The pinned-prefix invariant is re-applied
    /// before storing, so callers may pass any arrangement.
    pub fn set_column_order(&mut self, new_order: Vec<String>) {
        self.state.columns.order = new_order;
        self.reapply_order_invariant();
        self.persist();
    }

    pub fn toggle_column_pinned(&mut self, key: &str) -> Result<()> {
        self.require_column(key)?;
        let pinned = !self.state.columns.is_pinned(&self.columns, key);
        self.state.columns.pinned.insert(key.to_string(), pinned);
        self.reapply_order_invariant();
        self.persist();
        Ok(())
    }

    /// Store a width override clamped to the column's bounds. Returns the
    /// stored width.
    pub fn resize_column(&mut self, key: &str, new_width: f32) -> Result<f32> {
        let width = self.require_column(key)?.clamp_width(new_width);
        self.state
            .columns
            .width_override
            .insert(key.to_string(), width);
        self.persist();
        Ok(width)
    }

    /// Current width of a column: override, else declared default.
    pub fn column_width(&self, key: &str) -> Option<f32> {
        let column = self.columns.get(key)?;
        Some(
            self.state
                .columns
                .width_override
                .get(key)
                .copied()
                .unwrap_or(column.width),
        )
    }

    /// Move `dragged` to sit immediately before `target`, then re-apply the
    /// pinned-prefix invariant.
    pub fn move_column_before(&mut self, dragged: &str, target: &str) -> Result<()> {
        self.require_column(dragged)?;
        self.require_column(target)?;
        if dragged == target {
            return Ok(());
        }
        let mut order = self.state.columns.order.clone();
        order.retain(|k| k != dragged);
        let at = order.iter().position(|k| k == target).unwrap_or(order.len());
        order.insert(at, dragged.to_string());
        self.set_column_order(order);
        Ok(())
    }

    /// Restore visibility, order and pinning to the declared defaults.
    /// Width overrides and sort are kept.
    pub fn reset_to_defaults(&mut self) {
        let defaults = ColumnPresentation::defaults(&self.columns);
        self.state.columns.visibility = defaults.visibility;
        self.state.columns.order = defaults.order;
        self.state.columns.pinned = defaults.pinned;
        self.reapply_order_invariant();
        self.persist();
    }

    // -------------------------------------------------------------------------
    // Sort / filter / search
    // -------------------------------------------------------------------------

    /// Explicit sort request; repeating the active column+direction clears it.
    pub fn set_sort(&mut self, key: &str, direction: Option<SortDirection>) -> Result<()> {
        self.require_column(key)?;
        self.state.sort = SortSpec::apply(self.state.sort.as_ref(), key, direction);
        self.persist();
        Ok(())
    }

    /// Header-click sort cycle: unsorted -> asc -> desc -> unsorted.
    pub fn cycle_sort(&mut self, key: &str) -> Result<()> {
        self.require_column(key)?;
        self.state.sort = SortSpec::cycle(self.state.sort.as_ref(), key);
        self.persist();
        Ok(())
    }

    /// Replace the allowed value set for `key` wholesale.
    pub fn set_filter<I, V>(&mut self, key: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.require_column(key)?;
        self.filters.set(key, values);
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    /// Stage search text. Never changes [`Self::query_params`].
    pub fn set_search_query(&mut self, text: &str) {
        self.staged_search = text.to_string();
    }

    /// Apply the staged search text. Returns true if the applied query changed.
    pub fn commit_search(&mut self) -> bool {
        let next = self.staged_search.trim().to_string();
        if next == self.applied_search {
            return false;
        }
        self.applied_search = next;
        true
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn toggle_row_selection(&mut self, id: &RowId, current_page_row_ids: &[RowId]) {
        self.selection.toggle(id, current_page_row_ids);
    }

    pub fn toggle_select_all(&mut self, current_page_row_ids: &[RowId]) {
        self.selection.toggle_all(current_page_row_ids);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn require_column(&self, key: &str) -> Result<&crate::column::ColumnDescriptor> {
        self.columns
            .get(key)
            .ok_or_else(|| GridError::UnknownColumn(key.to_string()))
    }

    fn reapply_order_invariant(&mut self) {
        let columns = &self.columns;
        let presentation = &self.state.columns;
        let order = normalize_order(&presentation.order, columns, |key| {
            presentation.is_pinned(columns, key)
        });
        self.state.columns.order = order;
    }

    fn persist(&mut self) {
        if let Err(e) = self.state.save(&mut self.store, &self.table) {
            log::warn!("failed to persist {} presentation state: {e}", self.table);
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::column::presets::lead_columns;
    use crate::column::{ColumnDescriptor, ValueType};
    use crate::state::{MemoryStore, PresentationStore};

    fn abcd() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDescriptor::new("A", "A", ValueType::Text).pinned(),
            ColumnDescriptor::new("B", "B", ValueType::Text),
            ColumnDescriptor::new("C", "C", ValueType::Text).pinned(),
            ColumnDescriptor::new("D", "D", ValueType::Text),
        ])
    }

    fn controller() -> TableStateController<MemoryStore> {
        TableStateController::new("t", abcd(), MemoryStore::new())
    }

    fn assert_pinned_prefix(c: &TableStateController<MemoryStore>) {
        let p = c.presentation();
        let flags: Vec<bool> = p.order.iter().map(|k| p.is_pinned(c.columns(), k)).collect();
        let first_unpinned = flags.iter().position(|f| !f).unwrap_or(flags.len());
        assert!(flags[first_unpinned..].iter().all(|f| !f), "order {:?}", p.order);
    }

    #[test]
    fn test_default_order_has_pinned_prefix() {
        let c = controller();
        assert_eq!(c.presentation().order, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_toggle_pinned_reorders_and_persists() {
        let mut c = controller();
        c.toggle_column_pinned("D").unwrap();
        assert_eq!(c.presentation().order, vec!["A", "C", "D", "B"]);
        assert_pinned_prefix(&c);
        assert_eq!(
            c.store().get("t_column_order").as_deref(),
            Some("[\"A\",\"C\",\"D\",\"B\"]")
        );

        c.toggle_column_pinned("A").unwrap();
        assert_eq!(c.presentation().order, vec!["C", "D", "A", "B"]);
        assert_pinned_prefix(&c);
    }

    #[test]
    fn test_set_order_cannot_break_prefix() {
        let mut c = controller();
        c.set_column_order(vec!["B".into(), "A".into(), "D".into(), "C".into()]);
        assert_eq!(c.presentation().order, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_move_column_before_target() {
        let mut c = controller();
        c.move_column_before("D", "B").unwrap();
        assert_eq!(c.presentation().order, vec!["A", "C", "D", "B"]);
        // dropping onto a pinned column cannot enter the pinned prefix
        c.move_column_before("B", "A").unwrap();
        assert_eq!(c.presentation().order, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_resize_clamps() {
        let mut c = TableStateController::new("leads", lead_columns(), MemoryStore::new());
        let name = c.columns().get("name").unwrap().clone();
        assert_eq!(c.resize_column("name", 10_000.0).unwrap(), name.max_width);
        assert_eq!(c.resize_column("name", -5.0).unwrap(), name.min_width);
        assert_eq!(c.column_width("name"), Some(name.min_width));
        assert!(c.resize_column("nope", 100.0).is_err());
    }

    #[test]
    fn test_sort_tri_state() {
        let mut c = controller();
        c.set_sort("B", Some(SortDirection::Asc)).unwrap();
        c.set_sort("B", Some(SortDirection::Asc)).unwrap();
        assert_eq!(c.sort(), None);

        c.set_sort("B", Some(SortDirection::Asc)).unwrap();
        c.set_sort("B", Some(SortDirection::Desc)).unwrap();
        assert_eq!(c.sort(), Some(&SortSpec::new("B", SortDirection::Desc)));
    }

    #[test]
    fn test_staged_search_not_in_params_until_commit() {
        let mut c = controller();
        let before = c.query_params();
        c.set_search_query("강남");
        assert_eq!(c.query_params(), before);
        assert!(c.commit_search());
        assert_eq!(c.query_params().search, "강남");
        assert!(!c.commit_search());
    }

    #[test]
    fn test_filter_replaces_wholesale() {
        let mut c = controller();
        c.set_filter("B", ["x", "y"]).unwrap();
        c.set_filter("B", ["z"]).unwrap();
        assert_eq!(c.filters().values("B").unwrap().len(), 1);
        c.set_filter("B", Vec::<String>::new()).unwrap();
        assert!(c.filters().is_empty());
    }

    #[test]
    fn test_reset_to_defaults() {
        let mut c = controller();
        c.toggle_column_visibility("B").unwrap();
        c.toggle_column_pinned("D").unwrap();
        c.resize_column("B", 200.0).unwrap();
        c.reset_to_defaults();
        assert_eq!(c.presentation().order, vec!["A", "C", "B", "D"]);
        assert_eq!(c.presentation().visibility.get("B"), Some(&true));
        assert_eq!(c.column_width("B"), Some(200.0));
    }

    #[test]
    fn test_state_survives_reload() {
        let mut c = controller();
        c.toggle_column_visibility("D").unwrap();
        c.cycle_sort("B").unwrap();
        let store = c.store().clone();

        let reloaded = TableStateController::new("t", abcd(), store);
        assert_eq!(reloaded.presentation().visibility.get("D"), Some(&false));
        assert_eq!(reloaded.sort(), Some(&SortSpec::new("B", SortDirection::Asc)));
        let keys: Vec<&str> = reloaded.effective_columns().iter().map(|e| e.descriptor.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "C", "B"]);
    }

    #[test]
    fn test_selection_relative_to_loaded_rows() {
        let mut c = controller();
        let page: Vec<RowId> = vec!["1".into(), "2".into()];
        c.toggle_select_all(&page);
        assert_eq!(c.selection().len(), 2);
        c.toggle_row_selection(&"1".into(), &page);
        assert_eq!(c.selection().len(), 1);
    }
}
