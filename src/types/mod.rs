//! Value types shared by every layer of the grid.

mod filter;
mod query;
mod row;
mod selection;
mod sort;

pub use filter::*;
pub use query::*;
pub use row::*;
pub use selection::*;
pub use sort::*;
