//! Column resize drag.

use crate::column::EffectiveColumn;

/// An in-progress drag on a column's trailing edge.
///
/// Captures the column's bounds when the drag begins, so the live width stays
/// clamped even if the column set is rebuilt mid-drag.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeDrag {
    key: String,
    start_x: f32,
    start_width: f32,
    min_width: f32,
    max_width: f32,
    width: f32,
}

impl ResizeDrag {
    pub fn begin(column: &EffectiveColumn<'_>, start_x: f32) -> Self {
        Self {
            key: column.key().to_string(),
            start_x,
            start_width: column.width,
            min_width: column.descriptor.min_width,
            max_width: column.descriptor.max_width,
            width: column.width,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current live width.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Apply a pointer move. Returns the clamped live width.
    pub fn update(&mut self, x: f32) -> f32 {
        let raw = self.start_width + (x - self.start_x);
        self.width = if raw.is_nan() {
            self.start_width
        } else {
            raw.clamp(self.min_width, self.max_width)
        };
        self.width
    }

    /// End the drag, yielding the column key and final width to persist.
    pub fn finish(self) -> (String, f32) {
        (self.key, self.width)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, ColumnSet, ValueType};
    use crate::state::ColumnPresentation;

    #[test]
    fn test_drag_is_clamped() {
        let columns = ColumnSet::new(vec![ColumnDescriptor::new("a", "A", ValueType::Text)
            .width(150.0)
            .bounds(100.0, 200.0)]);
        let cols = ColumnPresentation::defaults(&columns).resolve(&columns);
        let mut drag = ResizeDrag::begin(&cols[0], 300.0);

        assert_eq!(drag.update(320.0), 170.0);
        assert_eq!(drag.update(900.0), 200.0);
        assert_eq!(drag.update(0.0), 100.0);
        assert_eq!(drag.update(f32::NAN), 150.0);
        drag.update(310.0);
        assert_eq!(drag.finish(), ("a".to_string(), 160.0));
    }
}
