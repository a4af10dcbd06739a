//! agency-grid - spreadsheet-like data grid engine for real-estate CRM tables
//!
//! Drives the Leads and Listings grids of a brokerage CRM, natively or in the
//! browser via WebAssembly:
//! - Column model with pinning, reordering, resizing and persisted presentation
//! - Server-side sort, filter and search with cursor-paged infinite scroll
//! - Optimistic create/update/delete with per-mutation rollback
//! - Phantom rows that become real on their first edit
//! - Typed cell editors (text, select, phone, budget and area composites)
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { GridHandle } from 'agency-grid';
//! await init();
//! const grid = new GridHandle("leads", "{}", source, null);
//! grid.setOnChange(() => paint(grid.snapshot()));
//! await grid.loadMore();
//! ```

// Model
pub mod column;
pub mod config;
pub mod error;
pub mod state;
pub mod types;

// Data
pub mod data;

// Interaction
pub mod body;
pub mod editor;
pub mod grid;
pub mod header;
pub mod layout;

pub mod logging;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

use wasm_bindgen::prelude::*;

pub use column::{ColumnDescriptor, ColumnSet};
pub use config::GridConfig;
pub use data::{Annotator, DataLayer, DataSource, MemoryDataSource};
pub use error::{GridError, Result, ValidationError};
pub use grid::{settle_commit, settle_delete, DataGrid, GridSnapshot};
pub use state::{MemoryStore, PresentationStore, TableStateController};
pub use types::*;

#[cfg(target_arch = "wasm32")]
pub use wasm::GridHandle;

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
