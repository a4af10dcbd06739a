//! Layout engine for pinned-column offsets and column positions.
//!
//! This module handles:
//! - Sticky `left` offsets for pinned columns behind the selection gutter
//! - Flagging the last pinned column for the separator
//! - Binary search for the column under a horizontal position

mod grid_layout;

pub use grid_layout::{
    last_pinned_index, left_offset, ColumnPlacement, GridLayout, SELECTION_GUTTER_WIDTH,
};
