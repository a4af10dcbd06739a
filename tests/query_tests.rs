//! Query tests: sort, filter, search and selection driven from the header
//! and toolbar, checked against what the data source returns.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

mod common;
mod fixtures;

use agency_grid::header::PopoverKind;
use agency_grid::types::{RowId, SortDirection, SortSpec};
use common::{body_ids, cell_text};
use fixtures::{lead_grid, load, sample_leads};

// ============================================================================
// Sort
// ============================================================================

#[test]
fn test_header_sort_cycles_through_three_states() {
    let (mut grid, _) = lead_grid(sample_leads());
    let sort_of = |g: &fixtures::TestGrid| {
        g.header_cells()
            .into_iter()
            .find(|c| c.key == "created_at")
            .unwrap()
            .sort
    };

    grid.click_sort("created_at").unwrap();
    load(&grid);
    assert_eq!(sort_of(&grid), Some(SortDirection::Asc));
    assert_eq!(body_ids(&grid), ["1", "2", "3", "4"]);

    grid.click_sort("created_at").unwrap();
    load(&grid);
    assert_eq!(sort_of(&grid), Some(SortDirection::Desc));
    assert_eq!(body_ids(&grid), ["4", "3", "2", "1"]);

    grid.click_sort("created_at").unwrap();
    assert_eq!(sort_of(&grid), None);
    assert_eq!(grid.params().sort, None);
}

#[test]
fn test_repeating_popover_choice_clears_sort() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.toggle_popover("name", PopoverKind::Sort).unwrap();
    grid.set_sort("name", Some(SortDirection::Desc)).unwrap();
    assert!(grid.header_state().popover.current().is_none());
    assert_eq!(
        grid.params().sort,
        Some(SortSpec::new("name", SortDirection::Desc))
    );

    grid.set_sort("name", Some(SortDirection::Desc)).unwrap();
    assert_eq!(grid.params().sort, None);
}

#[test]
fn test_sorting_by_another_column_replaces_sort() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.click_sort("name").unwrap();
    grid.click_sort("created_at").unwrap();
    assert_eq!(
        grid.params().sort,
        Some(SortSpec::new("created_at", SortDirection::Asc))
    );
}

// ============================================================================
// Filter
// ============================================================================

#[test]
fn test_filter_popover_then_sort_desc() {
    let (mut grid, _) = lead_grid(sample_leads());

    grid.toggle_popover("stage", PopoverKind::Filter).unwrap();
    grid.toggle_filter_choice("NEW");
    grid.toggle_filter_choice("IN_PROGRESS");
    grid.apply_filter_draft().unwrap();
    grid.set_sort("created_at", Some(SortDirection::Desc)).unwrap();
    load(&grid);

    assert_eq!(body_ids(&grid), ["4", "3", "1"]);
    assert_eq!(cell_text(&grid, "4", "stage"), "신규");
    let stage = grid
        .header_cells()
        .into_iter()
        .find(|c| c.key == "stage")
        .unwrap();
    assert!(stage.filter_active);
    assert_eq!(stage.popover_open, None);
    assert_eq!(grid.snapshot().total_count, 3);
}

#[test]
fn test_applying_filter_replaces_column_set() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.toggle_popover("stage", PopoverKind::Filter).unwrap();
    grid.toggle_filter_choice("NEW");
    grid.apply_filter_draft().unwrap();

    // reopening seeds the draft with the applied set
    grid.toggle_popover("stage", PopoverKind::Filter).unwrap();
    assert!(grid.header_state().popover.draft().unwrap().is_selected("NEW"));
    grid.toggle_filter_choice("NEW");
    grid.toggle_filter_choice("CLOSED");
    grid.apply_filter_draft().unwrap();
    load(&grid);

    assert_eq!(body_ids(&grid), ["2"]);
}

#[test]
fn test_clearing_every_choice_removes_filter() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.toggle_popover("stage", PopoverKind::Filter).unwrap();
    grid.toggle_filter_choice("CLOSED");
    grid.apply_filter_draft().unwrap();
    grid.toggle_popover("stage", PopoverKind::Filter).unwrap();
    grid.toggle_filter_choice("CLOSED");
    grid.apply_filter_draft().unwrap();

    assert!(grid.params().filters.is_empty());
}

#[test]
fn test_click_outside_closes_popover_without_applying() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.toggle_popover("stage", PopoverKind::Filter).unwrap();
    grid.toggle_filter_choice("NEW");

    grid.document_click(true, false);
    assert!(grid.header_state().popover.current().is_some());

    grid.document_click(false, false);
    assert!(grid.header_state().popover.current().is_none());
    assert!(grid.params().filters.is_empty());
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_search_applies_only_on_commit() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.set_search_query("  박 ");
    assert_eq!(grid.params().search, "");
    assert_eq!(body_ids(&grid).len(), 4);

    assert!(grid.commit_search());
    load(&grid);
    assert_eq!(grid.params().search, "박");
    assert_eq!(body_ids(&grid), ["3"]);

    // same text again is not a new query
    assert!(!grid.commit_search());
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_select_all_covers_loaded_rows_only() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.toggle_select_all();
    let snap = grid.snapshot();
    assert!(snap.all_selected);
    assert_eq!(snap.selected_count, 4);

    grid.toggle_select_all();
    assert!(grid.selected_ids().is_empty());
}

#[test]
fn test_row_selection_marks_body_rows() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.toggle_row_selection(&RowId::new("2"));
    grid.toggle_row_selection(&RowId::new("missing"));

    let selected: Vec<String> = grid
        .body_rows()
        .into_iter()
        .filter(|r| r.selected)
        .map(|r| r.id.to_string())
        .collect();
    assert_eq!(selected, ["2"]);
    assert!(!grid.snapshot().all_selected);
}
