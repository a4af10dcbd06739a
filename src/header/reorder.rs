//! Column reorder drag-and-drop.

use crate::column::EffectiveColumn;

/// An in-progress column drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderDrag {
    key: String,
    over: Option<String>,
}

impl ReorderDrag {
    /// Start dragging `column`. Pinned columns are not draggable.
    pub fn begin(column: &EffectiveColumn<'_>) -> Option<Self> {
        if column.pinned {
            return None;
        }
        Some(Self {
            key: column.key().to_string(),
            over: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Column currently under the pointer, if any.
    pub fn over(&self) -> Option<&str> {
        self.over.as_deref()
    }

    pub fn hover(&mut self, target: Option<&str>) {
        self.over = target.filter(|t| *t != self.key).map(str::to_string);
    }

    /// Drop on `target`. Returns `(dragged, target)` for the controller to
    /// move `dragged` before `target`; `None` for a drop on itself.
    pub fn drop_on(self, target: &str) -> Option<(String, String)> {
        if target == self.key {
            return None;
        }
        Some((self.key, target.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, ColumnSet, ValueType};
    use crate::state::ColumnPresentation;

    #[test]
    fn test_pinned_not_draggable() {
        let columns = ColumnSet::new(vec![
            ColumnDescriptor::new("a", "A", ValueType::Text).pinned(),
            ColumnDescriptor::new("b", "B", ValueType::Text),
            ColumnDescriptor::new("c", "C", ValueType::Text),
        ]);
        let cols = ColumnPresentation::defaults(&columns).resolve(&columns);

        assert!(ReorderDrag::begin(&cols[0]).is_none());

        let mut drag = ReorderDrag::begin(&cols[2]).unwrap();
        drag.hover(Some("c"));
        assert_eq!(drag.over(), None);
        drag.hover(Some("b"));
        assert_eq!(drag.over(), Some("b"));
        assert_eq!(drag.drop_on("b"), Some(("c".to_string(), "b".to_string())));
    }

    #[test]
    fn test_drop_on_self_is_noop() {
        let columns = ColumnSet::new(vec![ColumnDescriptor::new("b", "B", ValueType::Text)]);
        let cols = ColumnPresentation::defaults(&columns).resolve(&columns);
        let drag = ReorderDrag::begin(&cols[0]).unwrap();
        assert_eq!(drag.drop_on("b"), None);
    }
}
