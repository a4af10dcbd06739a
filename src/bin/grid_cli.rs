//! CLI tool for agency-grid - loads rows into a grid and prints its snapshot
//!
//! Usage:
//!   grid_cli <leads|listings> <rows.json>
//!   grid_cli <leads|listings> <rows.json> --state state.json --search 강남 -o out.json
//!
//! `rows.json` is an array of row objects, each with an `id`. `state.json` is a
//! `localStorage`-style dump: an object mapping keys such as
//! `leads_column_order` to JSON values.

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};
use std::rc::Rc;

use agency_grid::column::presets::{lead_columns, listing_columns};
use agency_grid::data::{DataLayer, MemoryDataSource};
use agency_grid::state::MemoryStore;
use agency_grid::{DataGrid, GridConfig};
use futures::executor::block_on;
use serde_json::{Map, Value};

const USAGE: &str = "Usage: grid_cli <leads|listings> <rows.json> [--state state.json] [--search text] [--all] [-o output.json]";

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn read_file(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => fail(&format!("Error reading {path}: {e}")),
    }
}

/// Stored values are JSON text; accept either raw values or pre-encoded strings.
fn load_store(path: &str) -> MemoryStore {
    let dump: Map<String, Value> = match serde_json::from_str(&read_file(path)) {
        Ok(m) => m,
        Err(e) => fail(&format!("Error parsing {path}: {e}")),
    };
    MemoryStore::with_entries(dump.into_iter().map(|(k, v)| match v {
        Value::String(s) => (k, s),
        other => (k, other.to_string()),
    }))
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        fail(USAGE);
    }

    if let Err(e) = agency_grid::logging::init(log::LevelFilter::Info) {
        eprintln!("{e}");
    }

    let preset = args[1].as_str();
    let columns = match preset {
        "leads" => lead_columns(),
        "listings" => listing_columns(),
        other => fail(&format!("Unknown preset: {other}\n{USAGE}")),
    };

    let mut store = MemoryStore::new();
    let mut search = None;
    let mut load_all = false;
    let mut output_path = None;
    let mut rest = args[3..].iter();
    while let Some(flag) = rest.next() {
        match flag.as_str() {
            "--state" => store = load_store(rest.next().unwrap_or_else(|| fail(USAGE))),
            "--search" => search = Some(rest.next().unwrap_or_else(|| fail(USAGE)).clone()),
            "--all" => load_all = true,
            "-o" => output_path = Some(rest.next().unwrap_or_else(|| fail(USAGE)).clone()),
            other => fail(&format!("Unknown option: {other}\n{USAGE}")),
        }
    }

    let source = match MemoryDataSource::from_json(&read_file(&args[2])) {
        Ok(s) => Rc::new(s),
        Err(e) => fail(&format!("Error parsing rows: {e}")),
    };
    log::info!("loaded {} rows", source.len());

    let config = GridConfig::new(preset);
    let data = DataLayer::new(&config, source);
    let mut grid = DataGrid::new(config, columns, store, data);
    if let Some(text) = search {
        grid.set_search_query(&text);
        grid.commit_search();
    }

    // First page, or every page with --all
    loop {
        match block_on(grid.data().fetch_next_page(&grid.params())) {
            Ok(true) if load_all => {}
            Ok(_) => break,
            Err(e) => fail(&format!("Error loading rows: {e}")),
        }
    }

    let json = match serde_json::to_string_pretty(&grid.snapshot()) {
        Ok(j) => j,
        Err(e) => fail(&format!("Error serializing JSON: {e}")),
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &json) {
                fail(&format!("Error writing {path}: {e}"));
            }
            log::info!("wrote {path}");
        }
        None => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{json}") {
                fail(&format!("Error writing output: {e}"));
            }
        }
    }
}
