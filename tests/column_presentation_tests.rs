//! Column presentation tests: pinning, reordering, resizing, visibility and
//! persistence across reloads.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use agency_grid::column::{ColumnDescriptor, ColumnSet, ValueType};
use agency_grid::grid::HeaderPress;
use agency_grid::state::{MemoryStore, PresentationStore, TableStateController};
use common::{body_ids, header_keys};
use fixtures::{grid_over, lead_grid, sample_leads, source};

fn abcd() -> ColumnSet {
    ColumnSet::new(vec![
        ColumnDescriptor::new("a", "A", ValueType::Text).pinned(),
        ColumnDescriptor::new("b", "B", ValueType::Text),
        ColumnDescriptor::new("c", "C", ValueType::Text),
        ColumnDescriptor::new("d", "D", ValueType::Text),
    ])
}

// ============================================================================
// Pinned prefix
// ============================================================================

#[test]
fn test_pinning_moves_column_into_prefix_and_persists() {
    let mut ctl = TableStateController::new("t", abcd(), MemoryStore::new());
    ctl.toggle_column_pinned("c").unwrap();

    assert_eq!(ctl.presentation().order, ["a", "c", "b", "d"]);
    assert_eq!(
        ctl.store().get("t_column_order").as_deref(),
        Some(r#"["a","c","b","d"]"#)
    );
}

#[test]
fn test_unpinning_keeps_relative_order_of_both_groups() {
    let mut ctl = TableStateController::new("t", abcd(), MemoryStore::new());
    ctl.toggle_column_pinned("c").unwrap();
    ctl.toggle_column_pinned("a").unwrap();

    assert_eq!(ctl.presentation().order, ["c", "a", "b", "d"]);
}

#[test]
fn test_sticky_offsets_follow_pinned_prefix() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.toggle_column_pinned("stage").unwrap();

    let header = grid.header_cells();
    assert_eq!(header[0].key, "name");
    assert_eq!(header[1].key, "stage");
    assert_eq!(header[0].sticky_left, Some(48.0));
    assert_eq!(header[1].sticky_left, Some(48.0 + 140.0));
    assert!(!header[0].last_pinned);
    assert!(header[1].last_pinned);
    assert_eq!(header[2].sticky_left, None);

    // body cells share the header's geometry
    let row = &grid.body_rows()[0];
    assert_eq!(row.cells[1].sticky_left, Some(188.0));
    assert!(row.cells[1].last_pinned);
}

#[test]
fn test_stored_order_violating_prefix_is_repaired_on_load() {
    let store = MemoryStore::with_entries([
        ("t_column_order", r#"["b","ghost","a","d","b"]"#),
        ("t_sticky_columns", r#"{"a":true,"d":true}"#),
    ]);
    let ctl = TableStateController::new("t", abcd(), store);

    // unknown and duplicate keys dropped, c appended, pinned first
    assert_eq!(ctl.presentation().order, ["a", "d", "b", "c"]);
}

#[test]
fn test_unreadable_state_falls_back_to_defaults() {
    let store = MemoryStore::with_entries([
        ("leads_column_order", "not json"),
        ("leads_visible_columns", "[1,2"),
    ]);
    let src = source(sample_leads());
    let grid = grid_over("leads", &src, store, 50);

    assert_eq!(
        header_keys(&grid),
        ["name", "phone", "stage", "budget", "preferred_area", "region", "created_at"]
    );
}

// ============================================================================
// Reorder drag
// ============================================================================

#[test]
fn test_drag_column_before_another() {
    let (mut grid, _) = lead_grid(sample_leads());
    // phone spans 188..338, budget 448..628
    assert_eq!(
        grid.header_pointer_down(260.0),
        HeaderPress::ReorderStarted("phone".into())
    );
    grid.header_pointer_move(500.0);
    grid.header_pointer_up(500.0).unwrap();

    assert_eq!(&header_keys(&grid)[..4], ["name", "stage", "phone", "budget"]);
    assert!(!grid.header_state().is_dragging());
}

#[test]
fn test_pinned_column_cannot_be_dragged() {
    let (mut grid, _) = lead_grid(sample_leads());
    assert_eq!(grid.header_pointer_down(100.0), HeaderPress::Ignored);
    grid.header_pointer_up(400.0).unwrap();
    assert_eq!(header_keys(&grid)[0], "name");
}

#[test]
fn test_drop_on_pinned_column_keeps_prefix() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.header_pointer_down(400.0); // stage
    grid.header_pointer_up(100.0).unwrap(); // onto name

    let keys = header_keys(&grid);
    assert_eq!(&keys[..3], ["name", "stage", "phone"]);
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn test_resize_clamps_to_column_bounds() {
    let (mut grid, _) = lead_grid(sample_leads());

    // name: default 140, bounds 100..=300; handle at its right edge
    assert_eq!(
        grid.header_pointer_down(186.0),
        HeaderPress::ResizeStarted("name".into())
    );
    grid.header_pointer_move(1186.0);
    assert_eq!(grid.state().column_width("name"), Some(300.0));
    grid.header_pointer_up(1186.0).unwrap();

    grid.header_pointer_down(346.0);
    grid.header_pointer_move(0.0);
    grid.header_pointer_up(0.0).unwrap();
    assert_eq!(grid.state().column_width("name"), Some(100.0));
    assert_eq!(grid.header_cells()[0].width, 100.0);
}

#[test]
fn test_stored_width_out_of_bounds_is_clamped() {
    let store = MemoryStore::with_entries([("leads_column_widths", r#"{"name":5000}"#)]);
    let src = source(sample_leads());
    let grid = grid_over("leads", &src, store, 50);
    assert_eq!(grid.state().column_width("name"), Some(300.0));
}

// ============================================================================
// Visibility, reset and reload
// ============================================================================

#[test]
fn test_hidden_column_toggles_into_view() {
    let (mut grid, _) = lead_grid(sample_leads());
    assert!(!header_keys(&grid).contains(&"memo".to_string()));

    grid.toggle_column_visibility("memo").unwrap();
    assert!(header_keys(&grid).contains(&"memo".to_string()));
    assert!(grid.toggle_column_visibility("nope").is_err());
}

#[test]
fn test_reset_restores_layout_but_keeps_widths() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.toggle_column_visibility("memo").unwrap();
    grid.toggle_column_pinned("region").unwrap();
    grid.state_mut().resize_column("phone", 200.0).unwrap();

    grid.reset_columns();

    assert_eq!(
        header_keys(&grid),
        ["name", "phone", "stage", "budget", "preferred_area", "region", "created_at"]
    );
    assert_eq!(grid.state().column_width("phone"), Some(200.0));
}

#[test]
fn test_presentation_survives_reload() {
    let src = source(sample_leads());
    let mut grid = grid_over("leads", &src, MemoryStore::new(), 50);
    grid.toggle_column_pinned("stage").unwrap();
    grid.toggle_column_visibility("phone").unwrap();
    grid.state_mut().resize_column("region", 220.0).unwrap();
    grid.click_sort("created_at").unwrap();

    let store = grid.state().store().clone();
    let reloaded = grid_over("leads", &src, store, 50);

    assert_eq!(header_keys(&reloaded), header_keys(&grid));
    assert_eq!(reloaded.state().column_width("region"), Some(220.0));
    assert_eq!(reloaded.params().sort, grid.params().sort);
    assert_eq!(body_ids(&reloaded), ["1", "2", "3", "4"]);
}

#[test]
fn test_tables_persist_independently() {
    let src = source(sample_leads());
    let mut leads = grid_over("leads", &src, MemoryStore::new(), 50);
    leads.toggle_column_visibility("region").unwrap();

    let store = leads.state().store().clone();
    assert!(store.get("leads_visible_columns").is_some());
    assert!(store.get("listings_visible_columns").is_none());
}
