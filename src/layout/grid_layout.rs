//! Pre-computed horizontal layout for one set of effective columns.
//!
//! Computed once per render from the resolved columns, so header and body
//! agree on every offset without recomputing per cell.

use serde::Serialize;

use crate::column::EffectiveColumn;

/// Width of the row-selection checkbox gutter in pixels.
pub const SELECTION_GUTTER_WIDTH: f32 = 48.0;

/// Sticky `left` offset for the column at `index`: the gutter plus the widths
/// of every pinned column before it.
///
/// Non-pinned columns scroll normally; callers only use this for pinned ones.
pub fn left_offset(columns: &[EffectiveColumn<'_>], index: usize, gutter: f32) -> f32 {
    gutter
        + columns
            .iter()
            .take(index)
            .filter(|c| c.pinned)
            .map(|c| c.width)
            .sum::<f32>()
}

/// Index of the last pinned column (highest index with `pinned = true`).
pub fn last_pinned_index(columns: &[EffectiveColumn<'_>]) -> Option<usize> {
    columns.iter().rposition(|c| c.pinned)
}

/// Position of one column in the layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPlacement {
    pub key: String,
    /// Left edge in content coordinates, gutter included.
    pub x: f32,
    pub width: f32,
    /// Sticky offset, present only for pinned columns.
    pub sticky_left: Option<f32>,
    /// Draws the pinned/scrolling separator.
    pub last_pinned: bool,
}

/// Pre-computed layout data for a grid.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    pub gutter_width: f32,
    pub columns: Vec<ColumnPlacement>,
    /// Cumulative left edges; one extra entry for the final right edge.
    #[serde(skip)]
    col_positions: Vec<f32>,
}

impl GridLayout {
    pub fn new(columns: &[EffectiveColumn<'_>], gutter_width: f32) -> Self {
        let last_pinned = last_pinned_index(columns);
        let mut placements = Vec::with_capacity(columns.len());
        let mut col_positions = Vec::with_capacity(columns.len() + 1);
        let mut x = gutter_width;
        let mut pinned_left = gutter_width;

        for (i, c) in columns.iter().enumerate() {
            col_positions.push(x);
            let sticky_left = if c.pinned {
                let left = pinned_left;
                pinned_left += c.width;
                Some(left)
            } else {
                None
            };
            placements.push(ColumnPlacement {
                key: c.key().to_string(),
                x,
                width: c.width,
                sticky_left,
                last_pinned: last_pinned == Some(i),
            });
            x += c.width;
        }
        col_positions.push(x); // Final edge

        Self {
            gutter_width,
            columns: placements,
            col_positions,
        }
    }

    pub fn placement(&self, key: &str) -> Option<&ColumnPlacement> {
        self.columns.iter().find(|p| p.key == key)
    }

    /// Total content width, gutter included.
    pub fn total_width(&self) -> f32 {
        self.col_positions.last().copied().unwrap_or(self.gutter_width)
    }

    /// Width of the sticky region: gutter plus all pinned columns.
    pub fn pinned_width(&self) -> f32 {
        self.gutter_width
            + self
                .columns
                .iter()
                .filter(|p| p.sticky_left.is_some())
                .map(|p| p.width)
                .sum::<f32>()
    }

    /// Find column index at content x position (binary search).
    pub fn col_at_x(&self, x: f32) -> Option<usize> {
        if x < self.gutter_width || x >= self.total_width() {
            return None;
        }
        let idx = self.col_positions.partition_point(|pos| *pos <= x);
        idx.checked_sub(1).filter(|i| *i < self.columns.len())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, ColumnSet, ValueType};
    use std::collections::HashMap;

    fn set() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDescriptor::new("a", "A", ValueType::Text).width(100.0).pinned(),
            ColumnDescriptor::new("c", "C", ValueType::Text).width(80.0).pinned(),
            ColumnDescriptor::new("b", "B", ValueType::Text).width(120.0),
            ColumnDescriptor::new("d", "D", ValueType::Text).width(90.0),
        ])
    }

    fn effective(columns: &ColumnSet) -> Vec<EffectiveColumn<'_>> {
        crate::column::resolve_columns(
            columns,
            &columns.keys(),
            &columns.default_visibility(),
            &columns.default_pinned(),
            &HashMap::new(),
        )
    }

    #[test]
    fn test_left_offset_sums_preceding_pinned() {
        let columns = set();
        let cols = effective(&columns);
        assert_eq!(left_offset(&cols, 0, 48.0), 48.0);
        assert_eq!(left_offset(&cols, 1, 48.0), 148.0);
        assert_eq!(left_offset(&cols, 3, 48.0), 228.0);
    }

    #[test]
    fn test_last_pinned_flag() {
        let columns = set();
        let cols = effective(&columns);
        assert_eq!(last_pinned_index(&cols), Some(1));

        let layout = GridLayout::new(&cols, SELECTION_GUTTER_WIDTH);
        let flags: Vec<bool> = layout.columns.iter().map(|p| p.last_pinned).collect();
        assert_eq!(flags, vec![false, true, false, false]);
        assert_eq!(layout.columns[1].sticky_left, Some(148.0));
        assert_eq!(layout.columns[2].sticky_left, None);
        assert_eq!(layout.pinned_width(), 228.0);
    }

    #[test]
    fn test_no_pinned_columns() {
        let columns = ColumnSet::new(vec![ColumnDescriptor::new("x", "X", ValueType::Text)]);
        let cols = effective(&columns);
        assert_eq!(last_pinned_index(&cols), None);
        assert!(!GridLayout::new(&cols, 48.0).columns[0].last_pinned);
    }

    #[test]
    fn test_col_at_x() {
        let columns = set();
        let cols = effective(&columns);
        let layout = GridLayout::new(&cols, 48.0);

        assert_eq!(layout.total_width(), 48.0 + 100.0 + 80.0 + 120.0 + 90.0);
        assert_eq!(layout.col_at_x(10.0), None);
        assert_eq!(layout.col_at_x(48.0), Some(0));
        assert_eq!(layout.col_at_x(147.9), Some(0));
        assert_eq!(layout.col_at_x(148.0), Some(1));
        assert_eq!(layout.col_at_x(400.0), Some(3));
        assert_eq!(layout.col_at_x(1000.0), None);
    }

    #[test]
    fn test_empty_layout() {
        let layout = GridLayout::new(&[], 48.0);
        assert_eq!(layout.total_width(), 48.0);
        assert_eq!(layout.col_at_x(50.0), None);
    }
}
