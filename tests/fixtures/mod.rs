//! Row builders and grid constructors shared by the integration tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::rc::Rc;

use agency_grid::column::presets::{lead_columns, listing_columns};
use agency_grid::data::{DataLayer, DataSource, MemoryDataSource};
use agency_grid::state::MemoryStore;
use agency_grid::types::Row;
use agency_grid::{DataGrid, GridConfig};
use futures::executor::block_on;
use serde_json::json;

pub type TestGrid = DataGrid<MemoryStore>;

/// A lead with a name, stage and registration timestamp.
pub fn lead(id: &str, name: &str, stage: &str, created_at: &str) -> Row {
    Row::new(id)
        .with("name", name)
        .with("stage", stage)
        .with("created_at", created_at)
}

/// A sale listing priced in 만원.
pub fn sale_listing(id: &str, title: &str, selling: i64) -> Row {
    Row::new(id)
        .with("title", title)
        .with("transaction_type", "SALE")
        .with("price", json!({ "selling": selling }))
        .with("status", "AVAILABLE")
}

/// Four leads registered on consecutive days.
pub fn sample_leads() -> Vec<Row> {
    vec![
        lead("1", "김철수", "NEW", "2024-03-01T09:00:00Z"),
        lead("2", "이영희", "CLOSED", "2024-03-02T09:00:00Z"),
        lead("3", "박민수", "NEW", "2024-03-03T09:00:00Z"),
        lead("4", "최지우", "NEW", "2024-03-04T09:00:00Z"),
    ]
}

pub fn source(rows: Vec<Row>) -> Rc<MemoryDataSource> {
    Rc::new(MemoryDataSource::with_rows(rows))
}

/// Build a grid over `source` and load its first page.
pub fn grid_over(
    table: &str,
    source: &Rc<MemoryDataSource>,
    store: MemoryStore,
    page_size: usize,
) -> TestGrid {
    let columns = match table {
        "listings" => listing_columns(),
        _ => lead_columns(),
    };
    let config = GridConfig {
        page_size,
        ..GridConfig::new(table)
    };
    let data = DataLayer::new(&config, Rc::clone(source) as Rc<dyn DataSource>);
    let grid = DataGrid::new(config, columns, store, data);
    load(&grid);
    grid
}

/// Leads grid over `rows` with a fresh store.
pub fn lead_grid(rows: Vec<Row>) -> (TestGrid, Rc<MemoryDataSource>) {
    let source = source(rows);
    let grid = grid_over("leads", &source, MemoryStore::new(), 50);
    (grid, source)
}

/// Listings grid over `rows` with a fresh store.
pub fn listing_grid(rows: Vec<Row>) -> (TestGrid, Rc<MemoryDataSource>) {
    let source = source(rows);
    let grid = grid_over("listings", &source, MemoryStore::new(), 50);
    (grid, source)
}

/// Load the next page of the grid's current query.
pub fn load(grid: &TestGrid) -> bool {
    block_on(grid.data().fetch_next_page(&grid.params())).expect("page load failed")
}
