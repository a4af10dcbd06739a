//! Grid coordinator.
//!
//! [`DataGrid`] wires one table's state controller, header and edit state and
//! data layer together and turns discrete UI events into state transitions.
//! Everything here is synchronous; async work goes through a cloned
//! [`DataLayer`] so a host holding the grid in a `RefCell` never keeps it
//! borrowed across an await.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::body::{build_body, BodyRow};
use crate::column::ColumnSet;
use crate::config::GridConfig;
use crate::data::DataLayer;
use crate::editor::{CellCommit, CommitStyle, EditEvent, EditOutcome, EditSession};
use crate::error::{GridError, Result};
use crate::header::{
    build_header, hit_test, HeaderCell, HeaderHit, HeaderState, PopoverKind, ReorderDrag,
    ResizeDrag,
};
use crate::layout::GridLayout;
use crate::state::{PresentationStore, TableStateController};
use crate::types::{QueryParams, Row, RowId, SortDirection};

/// What the header did with a pointer-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderPress {
    Ignored,
    SelectAllToggled,
    ResizeStarted(String),
    ReorderStarted(String),
}

/// Serializable view of the active edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditingView {
    pub row_id: RowId,
    pub column_key: String,
    pub commit_style: &'static str,
    pub display: String,
    pub error: Option<String>,
}

/// Everything a view layer needs to paint one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSnapshot {
    pub layout: GridLayout,
    pub header: Vec<HeaderCell>,
    pub body: Vec<BodyRow>,
    pub total_count: u64,
    pub all_selected: bool,
    pub selected_count: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub editing: Option<EditingView>,
}

/// One grid instance: Leads and Listings each get their own.
#[derive(Debug)]
pub struct DataGrid<S: PresentationStore> {
    config: GridConfig,
    state: TableStateController<S>,
    header: HeaderState,
    session: EditSession,
    data: DataLayer,
}

impl<S: PresentationStore> DataGrid<S> {
    pub fn new(config: GridConfig, columns: ColumnSet, store: S, data: DataLayer) -> Self {
        let state = TableStateController::new(config.table_name.clone(), columns, store);
        Self {
            config,
            state,
            header: HeaderState::new(),
            session: EditSession::new(),
            data,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn state(&self) -> &TableStateController<S> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TableStateController<S> {
        &mut self.state
    }

    pub fn header_state(&self) -> &HeaderState {
        &self.header
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    /// Handle for async data work.
    pub fn data(&self) -> &DataLayer {
        &self.data
    }

    pub fn params(&self) -> QueryParams {
        self.state.query_params()
    }

    /// Loaded rows of the active query, in server order.
    pub fn rows(&self) -> Vec<Row> {
        self.data.rows(&self.params())
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.data.row_ids(&self.params())
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::new(&self.state.effective_columns(), self.config.selection_gutter_width)
    }

    pub fn header_cells(&self) -> Vec<HeaderCell> {
        let columns = self.state.effective_columns();
        let layout = GridLayout::new(&columns, self.config.selection_gutter_width);
        build_header(
            &columns,
            &layout,
            self.state.sort(),
            self.state.filters(),
            &self.header,
        )
    }

    pub fn body_rows(&self) -> Vec<BodyRow> {
        let columns = self.state.effective_columns();
        let layout = GridLayout::new(&columns, self.config.selection_gutter_width);
        build_body(
            &self.rows(),
            &columns,
            &layout,
            self.state.selection(),
            &self.session,
            &self.config.temp_id_prefix,
        )
    }

    pub fn snapshot(&self) -> GridSnapshot {
        let params = self.params();
        let columns = self.state.effective_columns();
        let layout = GridLayout::new(&columns, self.config.selection_gutter_width);
        let rows = self.data.rows(&params);
        let ids: Vec<RowId> = rows.iter().map(|r| r.id.clone()).collect();
        let loader = self.data.loader(&params);
        let header = build_header(
            &columns,
            &layout,
            self.state.sort(),
            self.state.filters(),
            &self.header,
        );
        let body = build_body(
            &rows,
            &columns,
            &layout,
            self.state.selection(),
            &self.session,
            &self.config.temp_id_prefix,
        );
        GridSnapshot {
            header,
            body,
            total_count: self.data.total_count(&params),
            all_selected: self.state.selection().is_all_selected(&ids),
            selected_count: self.state.selection().len(),
            loading: loader.is_in_flight(),
            error: self.data.last_error(&params),
            editing: self.editing_view(),
            layout,
        }
    }

    fn editing_view(&self) -> Option<EditingView> {
        let edit = self.session.active()?;
        Some(EditingView {
            row_id: edit.cursor.row_id.clone(),
            column_key: edit.cursor.column_key.clone(),
            commit_style: match edit.editor.commit_style() {
                CommitStyle::EnterKey => "enter",
                CommitStyle::OptionClick => "option",
                CommitStyle::SaveButton => "save",
            },
            display: edit.editor.display_value(),
            error: edit.error.as_ref().map(ToString::to_string),
        })
    }

    // -------------------------------------------------------------------------
    // Header interactions
    // -------------------------------------------------------------------------

    /// Pointer-down at content x in the header row.
    pub fn header_pointer_down(&mut self, x: f32) -> HeaderPress {
        let columns = self.state.effective_columns();
        let layout = GridLayout::new(&columns, self.config.selection_gutter_width);
        let press = match hit_test(&layout, x) {
            None => HeaderPress::Ignored,
            Some(HeaderHit::Gutter) => HeaderPress::SelectAllToggled,
            Some(HeaderHit::ResizeHandle(idx)) => match columns.get(idx) {
                Some(c) => {
                    self.header.resize = Some(ResizeDrag::begin(c, x));
                    HeaderPress::ResizeStarted(c.key().to_string())
                }
                None => HeaderPress::Ignored,
            },
            Some(HeaderHit::Column(idx)) => match columns.get(idx).and_then(ReorderDrag::begin) {
                Some(drag) => {
                    let key = drag.key().to_string();
                    self.header.reorder = Some(drag);
                    HeaderPress::ReorderStarted(key)
                }
                None => HeaderPress::Ignored,
            },
        };
        if press == HeaderPress::SelectAllToggled {
            self.toggle_select_all();
        }
        press
    }

    /// Pointer-move during a header drag. A resize applies its clamped width
    /// live.
    pub fn header_pointer_move(&mut self, x: f32) {
        if let Some(drag) = self.header.resize.as_mut() {
            let width = drag.update(x);
            let key = drag.key().to_string();
            if let Err(e) = self.state.resize_column(&key, width) {
                log::warn!("resize of {key} dropped: {e}");
            }
            return;
        }
        if self.header.reorder.is_some() {
            let layout = self.layout();
            let target = layout
                .col_at_x(x)
                .and_then(|i| layout.columns.get(i))
                .map(|p| p.key.clone());
            if let Some(drag) = self.header.reorder.as_mut() {
                drag.hover(target.as_deref());
            }
        }
    }

    /// Pointer-up ends whichever drag is active.
    pub fn header_pointer_up(&mut self, x: f32) -> Result<()> {
        if let Some(drag) = self.header.resize.take() {
            let (key, width) = drag.finish();
            self.state.resize_column(&key, width)?;
            return Ok(());
        }
        if let Some(drag) = self.header.reorder.take() {
            let layout = self.layout();
            let target = layout
                .col_at_x(x)
                .and_then(|i| layout.columns.get(i))
                .map(|p| p.key.clone());
            if let Some((dragged, target)) = target.and_then(|t| drag.drop_on(&t)) {
                self.state.move_column_before(&dragged, &target)?;
            }
        }
        Ok(())
    }

    /// Header sort button: unsorted -> asc -> desc -> unsorted.
    pub fn click_sort(&mut self, key: &str) -> Result<()> {
        self.state.cycle_sort(key)
    }

    /// Sort popover choice.
    pub fn set_sort(&mut self, key: &str, direction: Option<SortDirection>) -> Result<()> {
        self.state.set_sort(key, direction)?;
        self.header.popover.close();
        Ok(())
    }

    pub fn toggle_popover(&mut self, key: &str, kind: PopoverKind) -> Result<()> {
        let column = self
            .state
            .columns()
            .get(key)
            .ok_or_else(|| GridError::UnknownColumn(key.to_string()))?;
        self.header
            .popover
            .toggle(column, kind, self.state.filters());
        Ok(())
    }

    pub fn toggle_filter_choice(&mut self, value: &str) {
        if let Some(draft) = self.header.popover.draft_mut() {
            draft.toggle(value);
        }
    }

    /// Apply the open filter popover's draft, replacing the column's set.
    pub fn apply_filter_draft(&mut self) -> Result<()> {
        match self.header.popover.take_draft() {
            Some(draft) => self.state.set_filter(&draft.column, draft.selected),
            None => Ok(()),
        }
    }

    /// Pointer-down anywhere in the document. Closes the popover and cancels
    /// the active edit unless the click landed inside them.
    pub fn document_click(&mut self, inside_popover: bool, inside_editor: bool) {
        self.header.popover.click(inside_popover);
        if !inside_editor {
            self.session.handle(EditEvent::ClickOutside);
        }
    }

    pub fn toggle_column_visibility(&mut self, key: &str) -> Result<()> {
        self.state.toggle_column_visibility(key)
    }

    pub fn toggle_column_pinned(&mut self, key: &str) -> Result<()> {
        self.state.toggle_column_pinned(key)
    }

    pub fn reset_columns(&mut self) {
        self.state.reset_to_defaults();
    }

    // -------------------------------------------------------------------------
    // Search and selection
    // -------------------------------------------------------------------------

    pub fn set_search_query(&mut self, text: &str) {
        self.state.set_search_query(text);
    }

    /// Apply the staged search. True if the active query changed and the
    /// caller should load its first page.
    pub fn commit_search(&mut self) -> bool {
        self.state.commit_search()
    }

    pub fn toggle_row_selection(&mut self, id: &RowId) {
        let ids = self.row_ids();
        self.state.toggle_row_selection(id, &ids);
    }

    pub fn toggle_select_all(&mut self) {
        let ids = self.row_ids();
        self.state.toggle_select_all(&ids);
    }

    pub fn selected_ids(&self) -> Vec<RowId> {
        self.state.selection().ids().cloned().collect()
    }

    pub fn clear_selection(&mut self) {
        self.state.clear_selection();
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    /// Click on a body cell. Enters editing when the column is editable.
    pub fn click_cell(&mut self, row_id: &RowId, key: &str) -> Result<()> {
        let column = self
            .state
            .columns()
            .get(key)
            .ok_or_else(|| GridError::UnknownColumn(key.to_string()))?;
        let row = self
            .data
            .find_row(row_id)
            .ok_or_else(|| GridError::UnknownRow(row_id.clone()))?;
        self.session.begin(column, &row)?;
        Ok(())
    }

    /// Deliver an editing event. A `Committed` outcome carries the commit the
    /// host must pass to [`settle_commit`]; the grid is already back in
    /// viewing mode.
    pub fn edit_event(&mut self, event: EditEvent<'_>) -> EditOutcome {
        self.session.handle(event)
    }

    /// Add a phantom row at the top of the loaded window.
    pub fn add_phantom_row(&mut self, fields: Map<String, Value>) -> RowId {
        self.data.add_phantom_row(fields)
    }

    pub fn retry(&self) {
        self.data.retry(&self.params());
    }
}

/// Dispatch a committed edit and reconcile: optimistic update or phantom
/// create, then background enrichment of created rows, then refetch of the
/// shown query the mutation made stale. A refetch failure is logged; only
/// the mutation's own failure is returned.
pub async fn settle_commit(data: DataLayer, commit: CellCommit) -> Result<Row> {
    let row = data
        .update_cell(&commit.row_id, &commit.column_key, commit.value)
        .await;
    data.run_enrichment().await;
    if let Err(e) = data.refetch_active().await {
        log::warn!("refetch after commit failed: {e}");
    }
    row
}

/// Delete rows and reconcile.
pub async fn settle_delete(data: DataLayer, ids: Vec<RowId>) -> Result<()> {
    let result = data.delete_rows(&ids).await;
    if let Err(e) = data.refetch_active().await {
        log::warn!("refetch after delete failed: {e}");
    }
    result
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
    use crate::data::MemoryDataSource;
    use crate::editor::EditKey;
    use crate::state::MemoryStore;
    use futures::executor::block_on;
    use serde_json::json;
    use std::rc::Rc;

    fn grid() -> DataGrid<MemoryStore> {
        let source = Rc::new(MemoryDataSource::with_rows(vec![
            Row::new("1").with("name", "김철수").with("stage", "NEW"),
            Row::new("2").with("name", "이영희").with("stage", "CLOSED"),
        ]));
        let config = GridConfig::new("leads");
        let data = DataLayer::new(&config, source);
        let grid = DataGrid::new(config, lead_columns(), MemoryStore::new(), data);
        block_on(grid.data().fetch_next_page(&grid.params())).unwrap();
        grid
    }

    #[test]
    fn test_snapshot_shapes() {
        let grid = grid();
        let snap = grid.snapshot();
        assert_eq!(snap.body.len(), 2);
        assert_eq!(snap.header.len(), snap.body[0].cells.len());
        assert_eq!(snap.total_count, 2);
        assert!(!snap.loading);
    }

    #[test]
    fn test_gutter_click_selects_loaded_rows() {
        let mut grid = grid();
        assert_eq!(grid.header_pointer_down(5.0), HeaderPress::SelectAllToggled);
        assert_eq!(grid.selected_ids().len(), 2);
        assert!(grid.snapshot().all_selected);
    }

    #[test]
    fn test_resize_drag_persists_live_width() {
        let mut grid = grid();
        let name = grid.layout().columns[0].clone();
        let edge = name.x + name.width - 1.0;

        assert_eq!(
            grid.header_pointer_down(edge),
            HeaderPress::ResizeStarted("name".into())
        );
        grid.header_pointer_move(edge + 30.0);
        assert_eq!(grid.state().column_width("name"), Some(name.width + 30.0));
        grid.header_pointer_move(edge + 10_000.0);
        grid.header_pointer_up(edge + 10_000.0).unwrap();
        assert_eq!(grid.state().column_width("name"), Some(300.0));
        assert!(!grid.header_state().is_dragging());
    }

    #[test]
    fn test_reorder_drag_moves_before_target() {
        let mut grid = grid();
        let layout = grid.layout();
        let stage = layout.placement("stage").unwrap().clone();
        let phone = layout.placement("phone").unwrap().clone();

        assert_eq!(
            grid.header_pointer_down(stage.x + 5.0),
            HeaderPress::ReorderStarted("stage".into())
        );
        grid.header_pointer_up(phone.x + 5.0).unwrap();
        let order = &grid.state().presentation().order;
        assert_eq!(&order[..3], &["name", "stage", "phone"]);
    }

    #[test]
    fn test_pinned_header_not_draggable() {
        let mut grid = grid();
        let name = grid.layout().columns[0].clone();
        assert_eq!(grid.header_pointer_down(name.x + 5.0), HeaderPress::Ignored);
    }

    #[test]
    fn test_edit_commit_dispatch() {
        let mut grid = grid();
        grid.click_cell(&"1".into(), "name").unwrap();
        grid.edit_event(EditEvent::Input("김영수"));
        let EditOutcome::Committed(commit) = grid.edit_event(EditEvent::Key(EditKey::Enter)) else {
            panic!("expected commit");
        };
        assert!(!grid.session().is_editing());

        let row = block_on(settle_commit(grid.data().clone(), commit)).unwrap();
        assert_eq!(row.get("name"), &json!("김영수"));
        assert_eq!(grid.rows()[0].get("name"), &json!("김영수"));
    }

    #[test]
    fn test_outside_click_cancels_edit_and_popover() {
        let mut grid = grid();
        grid.toggle_popover("stage", PopoverKind::Filter).unwrap();
        grid.click_cell(&"1".into(), "name").unwrap();
        grid.document_click(false, false);
        assert!(grid.header_state().popover.current().is_none());
        assert!(!grid.session().is_editing());
    }

    #[test]
    fn test_filter_draft_applies_wholesale() {
        let mut grid = grid();
        grid.toggle_popover("stage", PopoverKind::Filter).unwrap();
        grid.toggle_filter_choice("NEW");
        grid.apply_filter_draft().unwrap();
        assert!(grid.state().filters().is_active("stage"));

        block_on(grid.data().fetch_next_page(&grid.params())).unwrap();
        assert_eq!(grid.rows().len(), 1);
    }

    #[test]
    fn test_non_editable_column_rejected() {
        let mut grid = grid();
        assert!(matches!(
            grid.click_cell(&"1".into(), "created_at"),
            Err(GridError::NotEditable(_))
        ));
    }
}
