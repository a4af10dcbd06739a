//! Benchmarks for column resolution, page flattening and snapshot building.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::cast_possible_truncation
)]

use std::rc::Rc;

use agency_grid::column::presets::lead_columns;
use agency_grid::data::{CachedQuery, DataLayer, MemoryDataSource};
use agency_grid::state::{MemoryStore, TablePresentationState};
use agency_grid::types::{Page, Row, RowId};
use agency_grid::{DataGrid, GridConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::executor::block_on;

fn lead(i: usize) -> Row {
    Row::new(i.to_string())
        .with("name", format!("고객{i}"))
        .with("phone", "01012345678")
        .with("stage", if i % 2 == 0 { "NEW" } else { "CONTACTED" })
}

/// Resolve visible columns from persisted presentation state
fn bench_resolve_columns(c: &mut Criterion) {
    let columns = lead_columns();
    let state = TablePresentationState::defaults(&columns);

    c.bench_function("resolve_lead_columns", |b| {
        b.iter(|| state.columns.resolve(black_box(&columns)))
    });
}

/// Flatten and dedupe loaded pages, with one overlapping row per page
fn bench_flatten_pages(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten_pages");

    for pages in [10usize, 50, 200] {
        let mut cached = CachedQuery::default();
        for p in 0..pages {
            let start = p * 50;
            let rows = (start.saturating_sub(1)..start + 50).map(lead).collect();
            cached.append_page(Page {
                rows,
                next_page_token: Some((start + 50).to_string()),
                total_count: (pages * 50) as u64,
            });
        }
        group.throughput(Throughput::Elements((pages * 50) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pages), &cached, |b, cached| {
            b.iter(|| black_box(cached.rows()))
        });
    }

    group.finish();
}

/// Build a full paint snapshot over 1000 loaded rows
fn bench_snapshot(c: &mut Criterion) {
    let source = Rc::new(MemoryDataSource::with_rows((1..=1000).map(lead).collect()));
    let mut config = GridConfig::new("leads");
    config.page_size = 1000;
    let data = DataLayer::new(&config, source);
    let mut grid = DataGrid::new(config, lead_columns(), MemoryStore::new(), data);
    block_on(grid.data().fetch_next_page(&grid.params())).expect("Failed to load");
    grid.toggle_row_selection(&RowId::new("7"));

    c.bench_function("snapshot_1000_rows", |b| b.iter(|| black_box(grid.snapshot())));
}

criterion_group!(benches, bench_resolve_columns, bench_flatten_pages, bench_snapshot);
criterion_main!(benches);
