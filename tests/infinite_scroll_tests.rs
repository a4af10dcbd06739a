//! Infinite scroll tests: page gating, failure handling, retry and
//! de-duplication of overlapping pages.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

mod common;
mod fixtures;

use agency_grid::body::LoadGate;
use agency_grid::data::DataSource;
use agency_grid::state::MemoryStore;
use agency_grid::types::Row;
use futures::executor::block_on;
use serde_json::Map;

use common::body_ids;
use fixtures::{grid_over, lead, source};

fn many_leads(n: usize) -> Vec<Row> {
    (1..=n)
        .map(|i| lead(&i.to_string(), &format!("고객{i}"), "NEW", "2024-03-01T09:00:00Z"))
        .collect()
}

#[test]
fn test_pages_load_until_exhausted() {
    let src = source(many_leads(5));
    let grid = grid_over("leads", &src, MemoryStore::new(), 2);
    assert_eq!(body_ids(&grid), ["1", "2"]);
    assert_eq!(grid.data().loader(&grid.params()).gate(), LoadGate::Open);

    assert!(block_on(grid.data().fetch_next_page(&grid.params())).unwrap());
    assert!(block_on(grid.data().fetch_next_page(&grid.params())).unwrap());
    assert_eq!(body_ids(&grid), ["1", "2", "3", "4", "5"]);

    assert_eq!(grid.data().loader(&grid.params()).gate(), LoadGate::NoMorePages);
    assert!(!block_on(grid.data().fetch_next_page(&grid.params())).unwrap());
    assert_eq!(src.calls().fetches, 3);
    assert_eq!(grid.snapshot().total_count, 5);
}

#[test]
fn test_failed_fetch_stops_auto_loading_until_retry() {
    let src = source(many_leads(5));
    let grid = grid_over("leads", &src, MemoryStore::new(), 2);
    src.fail_next_fetches(1);

    let err = block_on(grid.data().fetch_next_page(&grid.params())).unwrap_err();
    assert!(err.to_string().starts_with("Fetch failed"));
    let snap = grid.snapshot();
    assert!(snap.error.is_some());
    assert!(!snap.loading);
    assert_eq!(grid.data().loader(&grid.params()).gate(), LoadGate::Failed);

    // the sentinel staying visible does not retry on its own
    assert!(!block_on(grid.data().fetch_next_page(&grid.params())).unwrap());
    assert_eq!(src.calls().fetches, 2);

    grid.retry();
    assert!(grid.snapshot().error.is_none());
    assert!(block_on(grid.data().fetch_next_page(&grid.params())).unwrap());
    assert_eq!(body_ids(&grid), ["1", "2", "3", "4"]);
}

#[test]
fn test_failed_first_page_shows_error_and_no_rows() {
    let src = source(many_leads(3));
    src.fail_next_fetches(1);
    let config = agency_grid::GridConfig::new("leads");
    let data = agency_grid::DataLayer::new(&config, std::rc::Rc::clone(&src) as std::rc::Rc<dyn DataSource>);
    let grid = agency_grid::DataGrid::new(
        config,
        agency_grid::column::presets::lead_columns(),
        MemoryStore::new(),
        data,
    );

    assert!(block_on(grid.data().fetch_next_page(&grid.params())).is_err());
    assert!(grid.body_rows().is_empty());
    assert_eq!(grid.data().loader(&grid.params()).gate(), LoadGate::Failed);

    grid.retry();
    assert!(block_on(grid.data().fetch_next_page(&grid.params())).unwrap());
    assert_eq!(body_ids(&grid), ["1", "2", "3"]);
}

#[test]
fn test_rows_shifted_by_server_insert_are_not_duplicated() {
    let src = source(many_leads(4));
    let grid = grid_over("leads", &src, MemoryStore::new(), 2);

    // someone else creates a row; offsets shift by one
    let mut payload = Map::new();
    payload.insert("name".into(), "외부 등록".into());
    block_on(src.create_row(payload)).unwrap();

    assert!(block_on(grid.data().fetch_next_page(&grid.params())).unwrap());
    assert_eq!(body_ids(&grid), ["1", "2", "3"]);
}

#[test]
fn test_each_query_keeps_its_own_pages() {
    let src = source(many_leads(5));
    let mut grid = grid_over("leads", &src, MemoryStore::new(), 2);
    let unsorted = grid.params();

    grid.click_sort("name").unwrap();
    assert!(grid.body_rows().is_empty());
    assert!(block_on(grid.data().fetch_next_page(&grid.params())).unwrap());
    assert_eq!(body_ids(&grid), ["1", "2"]);

    // the unsorted query's cache is untouched
    assert_eq!(grid.data().row_ids(&unsorted).len(), 2);
}
