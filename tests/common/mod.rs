//! Snapshot inspection helpers.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

pub use super::fixtures::*;

use agency_grid::types::RowId;

/// Visible column keys, left to right.
pub fn header_keys(grid: &TestGrid) -> Vec<String> {
    grid.header_cells().into_iter().map(|c| c.key).collect()
}

/// Row ids in display order.
pub fn body_ids(grid: &TestGrid) -> Vec<String> {
    grid.body_rows()
        .into_iter()
        .map(|r| r.id.to_string())
        .collect()
}

/// Displayed text of one cell.
pub fn cell_text(grid: &TestGrid, row_id: &str, key: &str) -> String {
    let id = RowId::new(row_id);
    let row = grid
        .body_rows()
        .into_iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("row {row_id} not displayed"));
    row.cells
        .into_iter()
        .find(|c| c.key == key)
        .unwrap_or_else(|| panic!("column {key} not displayed"))
        .text
}

/// Raw field value of a cached row.
pub fn field(grid: &TestGrid, row_id: &str, key: &str) -> serde_json::Value {
    grid.data()
        .find_row(&RowId::new(row_id))
        .unwrap_or_else(|| panic!("row {row_id} not cached"))
        .get(key)
        .clone()
}
