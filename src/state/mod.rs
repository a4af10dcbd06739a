//! Table state: column presentation, sort, filter, search and selection.
//!
//! - `presentation`: the persisted per-(user, table) aggregate and the
//!   pinned-prefix order invariant
//! - `store`: the string-keyed persistence seam
//! - `controller`: intention-revealing mutators with a persistence side effect

mod controller;
mod presentation;
mod store;

pub use controller::TableStateController;
pub use presentation::{normalize_order, storage_key, ColumnPresentation, TablePresentationState};
pub use store::{MemoryStore, PresentationStore};

#[cfg(target_arch = "wasm32")]
pub use store::LocalStorageStore;
