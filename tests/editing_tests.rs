//! Cell editing tests: the viewing/editing protocol as driven through the
//! grid, one editor family at a time.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

mod common;
mod fixtures;

use agency_grid::editor::{EditEvent, EditKey, EditOutcome};
use agency_grid::grid::settle_commit;
use agency_grid::types::{Row, RowId};
use agency_grid::{GridError, ValidationError};
use futures::executor::block_on;
use serde_json::json;
use test_case::test_case;

use common::{cell_text, field};
use fixtures::{lead_grid, listing_grid, sale_listing, sample_leads};

fn id(s: &str) -> RowId {
    RowId::new(s)
}

// ============================================================================
// Entering and leaving edit mode
// ============================================================================

#[test]
fn test_click_enters_edit_mode_for_one_cell() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "name").unwrap();

    let editing = grid.snapshot().editing.unwrap();
    assert_eq!(editing.row_id, id("1"));
    assert_eq!(editing.column_key, "name");
    assert_eq!(editing.commit_style, "enter");
    assert_eq!(editing.display, "김철수");

    let editing_cells: Vec<_> = grid
        .body_rows()
        .into_iter()
        .flat_map(|r| r.cells)
        .filter(|c| c.editing)
        .collect();
    assert_eq!(editing_cells.len(), 1);
}

#[test]
fn test_read_only_column_refuses_edit() {
    let (mut grid, _) = lead_grid(sample_leads());
    let err = grid.click_cell(&id("1"), "created_at").unwrap_err();
    assert!(matches!(err, GridError::NotEditable(_)));
    assert!(grid.snapshot().editing.is_none());
}

#[test]
fn test_new_edit_discards_previous_working_value() {
    let (mut grid, source) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "name").unwrap();
    grid.edit_event(EditEvent::Input("바뀐 이름"));

    grid.click_cell(&id("2"), "name").unwrap();

    assert_eq!(grid.snapshot().editing.unwrap().row_id, id("2"));
    assert_eq!(cell_text(&grid, "1", "name"), "김철수");
    assert_eq!(source.calls().updates, 0);
}

#[test_case(EditEvent::Key(EditKey::Escape) ; "escape")]
#[test_case(EditEvent::CancelClicked ; "cancel button")]
#[test_case(EditEvent::ClickOutside ; "click outside")]
fn test_cancel_paths_send_nothing(event: EditEvent<'static>) {
    let (mut grid, source) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "name").unwrap();
    grid.edit_event(EditEvent::Input("바뀐 이름"));

    assert_eq!(grid.edit_event(event), EditOutcome::Cancelled);
    assert!(grid.snapshot().editing.is_none());
    assert_eq!(cell_text(&grid, "1", "name"), "김철수");
    assert_eq!(source.calls().updates, 0);
}

#[test]
fn test_document_click_inside_editor_keeps_editing() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "stage").unwrap();
    grid.document_click(false, true);
    assert!(grid.snapshot().editing.is_some());
    grid.document_click(false, false);
    assert!(grid.snapshot().editing.is_none());
}

// ============================================================================
// Text and phone
// ============================================================================

#[test]
fn test_text_edit_commits_on_enter() {
    let (mut grid, source) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "region").unwrap();
    grid.edit_event(EditEvent::Input("  강남구 "));
    let EditOutcome::Committed(commit) = grid.edit_event(EditEvent::Key(EditKey::Enter)) else {
        panic!("enter did not commit");
    };
    assert_eq!(commit.value, json!("강남구"));

    block_on(settle_commit(grid.data().clone(), commit)).unwrap();
    assert_eq!(cell_text(&grid, "1", "region"), "강남구");
    assert_eq!(source.calls().updates, 1);
}

#[test]
fn test_required_text_rejects_empty_and_stays_editing() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "name").unwrap();
    grid.edit_event(EditEvent::Input("   "));

    let outcome = grid.edit_event(EditEvent::Key(EditKey::Enter));
    assert_eq!(
        outcome,
        EditOutcome::Rejected(ValidationError::Required("이름".into()))
    );
    let editing = grid.snapshot().editing.unwrap();
    assert_eq!(editing.error.as_deref(), Some("이름 is required"));

    // typing clears the error
    grid.edit_event(EditEvent::Input("김철수"));
    assert!(grid.snapshot().editing.unwrap().error.is_none());
}

#[test]
fn test_phone_input_is_masked_and_committed_as_digits() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "phone").unwrap();
    grid.edit_event(EditEvent::Input("010 1234 5678 99"));
    assert_eq!(grid.snapshot().editing.unwrap().display, "010-1234-5678");

    let EditOutcome::Committed(commit) = grid.edit_event(EditEvent::Key(EditKey::Enter)) else {
        panic!("phone did not commit");
    };
    assert_eq!(commit.value, json!("01012345678"));
    block_on(settle_commit(grid.data().clone(), commit)).unwrap();
    assert_eq!(cell_text(&grid, "1", "phone"), "010-1234-5678");
}

#[test]
fn test_short_phone_is_rejected() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "phone").unwrap();
    grid.edit_event(EditEvent::Input("010-12"));
    assert!(matches!(
        grid.edit_event(EditEvent::Key(EditKey::Enter)),
        EditOutcome::Rejected(ValidationError::InvalidPhone(_))
    ));
}

// ============================================================================
// Select
// ============================================================================

#[test]
fn test_select_commits_on_option_click() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "stage").unwrap();
    assert_eq!(grid.snapshot().editing.unwrap().commit_style, "option");

    // Enter is not a commit gesture for selects
    assert_eq!(
        grid.edit_event(EditEvent::Key(EditKey::Enter)),
        EditOutcome::Ignored
    );
    let EditOutcome::Committed(commit) = grid.edit_event(EditEvent::OptionClicked("CONTRACTED"))
    else {
        panic!("option click did not commit");
    };
    block_on(settle_commit(grid.data().clone(), commit)).unwrap();
    assert_eq!(cell_text(&grid, "1", "stage"), "계약");
}

#[test]
fn test_select_rejects_unknown_option() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "stage").unwrap();
    assert_eq!(
        grid.edit_event(EditEvent::OptionClicked("ARCHIVED")),
        EditOutcome::Rejected(ValidationError::UnknownOption("ARCHIVED".into()))
    );
    assert!(grid.snapshot().editing.is_some());
}

// ============================================================================
// Composite
// ============================================================================

#[test]
fn test_budget_saves_with_button_only() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "budget").unwrap();
    assert_eq!(grid.snapshot().editing.unwrap().commit_style, "save");

    grid.edit_event(EditEvent::FieldInput { field: "min", text: "50,000" });
    grid.edit_event(EditEvent::FieldInput { field: "max", text: "120000" });
    assert_eq!(
        grid.edit_event(EditEvent::Key(EditKey::Enter)),
        EditOutcome::Ignored
    );

    let EditOutcome::Committed(commit) = grid.edit_event(EditEvent::SaveClicked) else {
        panic!("save did not commit");
    };
    assert_eq!(commit.value, json!({"min": 50000, "max": 120000}));
    block_on(settle_commit(grid.data().clone(), commit)).unwrap();
    assert_eq!(cell_text(&grid, "1", "budget"), "5억 ~ 12억");
}

#[test]
fn test_inverted_budget_is_rejected() {
    let (mut grid, _) = lead_grid(sample_leads());
    grid.click_cell(&id("1"), "budget").unwrap();
    grid.edit_event(EditEvent::FieldInput { field: "min", text: "90000" });
    grid.edit_event(EditEvent::FieldInput { field: "max", text: "10000" });
    assert!(matches!(
        grid.edit_event(EditEvent::SaveClicked),
        EditOutcome::Rejected(ValidationError::InvertedRange { .. })
    ));
}

#[test]
fn test_listing_price_editor_follows_transaction_type() {
    let monthly = Row::new("9")
        .with("title", "망원 빌라")
        .with("transaction_type", "MONTHLY_RENT")
        .with("price", json!({"deposit": 1000, "rent": 50}));
    let (mut grid, _) = listing_grid(vec![sale_listing("1", "역삼 래미안", 100), monthly]);

    grid.click_cell(&id("9"), "price").unwrap();
    assert_eq!(grid.snapshot().editing.unwrap().display, "deposit=1000, rent=50");
    grid.edit_event(EditEvent::FieldInput { field: "rent", text: "60" });
    let EditOutcome::Committed(commit) = grid.edit_event(EditEvent::SaveClicked) else {
        panic!("save did not commit");
    };
    block_on(settle_commit(grid.data().clone(), commit)).unwrap();
    assert_eq!(field(&grid, "9", "price"), json!({"deposit": 1000, "rent": 60}));
    assert_eq!(cell_text(&grid, "9", "price"), "1,000만/60만");

    grid.click_cell(&id("1"), "price").unwrap();
    assert_eq!(grid.snapshot().editing.unwrap().display, "selling=100");
}

#[test]
fn test_floor_above_total_is_rejected() {
    let (mut grid, _) = listing_grid(vec![sale_listing("1", "역삼 래미안", 100)]);
    grid.click_cell(&id("1"), "floor").unwrap();
    grid.edit_event(EditEvent::FieldInput { field: "floor", text: "20" });
    grid.edit_event(EditEvent::FieldInput { field: "total", text: "15" });
    assert_eq!(
        grid.edit_event(EditEvent::SaveClicked),
        EditOutcome::Rejected(ValidationError::FloorAboveTotal { floor: 20, total: 15 })
    );
}
