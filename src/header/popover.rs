//! Sort/filter popovers. At most one is open at a time.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::column::ColumnDescriptor;
use crate::types::FilterSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PopoverKind {
    Sort,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popover {
    pub column: String,
    pub kind: PopoverKind,
}

/// The single open popover, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopoverState {
    open: Option<Popover>,
    draft: Option<FilterDraft>,
}

impl PopoverState {
    pub fn current(&self) -> Option<&Popover> {
        self.open.as_ref()
    }

    pub fn kind_for(&self, column: &str) -> Option<PopoverKind> {
        self.open
            .as_ref()
            .filter(|p| p.column == column)
            .map(|p| p.kind)
    }

    /// Open a popover, closing whichever was open. Opening a filter popover
    /// seeds its draft from the applied filter.
    pub fn open(&mut self, column: &ColumnDescriptor, kind: PopoverKind, applied: &FilterSpec) {
        self.draft = match kind {
            PopoverKind::Filter => Some(FilterDraft::seed(column, applied)),
            PopoverKind::Sort => None,
        };
        self.open = Some(Popover {
            column: column.key.clone(),
            kind,
        });
    }

    /// Header-button semantics: clicking the button of the open popover
    /// closes it, any other opens it.
    pub fn toggle(&mut self, column: &ColumnDescriptor, kind: PopoverKind, applied: &FilterSpec) {
        if self.kind_for(&column.key) == Some(kind) {
            self.close();
        } else {
            self.open(column, kind, applied);
        }
    }

    pub fn close(&mut self) {
        self.open = None;
        self.draft = None;
    }

    /// Pointer-down anywhere. Closes the popover unless the click landed
    /// inside it. Returns true if a popover was closed.
    pub fn click(&mut self, inside_popover: bool) -> bool {
        if inside_popover || self.open.is_none() {
            return false;
        }
        self.close();
        true
    }

    pub fn draft(&self) -> Option<&FilterDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut FilterDraft> {
        self.draft.as_mut()
    }

    /// Take the draft for applying and close the popover.
    pub fn take_draft(&mut self) -> Option<FilterDraft> {
        let draft = self.draft.take();
        self.open = None;
        draft
    }
}

/// Checkbox state of an open filter popover.
///
/// Applying replaces the column's whole value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDraft {
    pub column: String,
    pub choices: Vec<(String, String)>,
    pub selected: BTreeSet<String>,
}

impl FilterDraft {
    pub fn seed(column: &ColumnDescriptor, applied: &FilterSpec) -> Self {
        Self {
            column: column.key.clone(),
            choices: column
                .options
                .iter()
                .map(|o| (o.value.clone(), o.label.clone()))
                .collect(),
            selected: applied.values(&column.key).cloned().unwrap_or_default(),
        }
    }

    pub fn toggle(&mut self, value: &str) {
        if !self.selected.remove(value) {
            self.selected.insert(value.to_string());
        }
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.selected.contains(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::column::presets::lead_columns;

    #[test]
    fn test_single_popover_at_a_time() {
        let columns = lead_columns();
        let stage = columns.get("stage").unwrap();
        let name = columns.get("name").unwrap();
        let applied = FilterSpec::new();
        let mut state = PopoverState::default();

        state.open(stage, PopoverKind::Filter, &applied);
        state.open(name, PopoverKind::Sort, &applied);
        assert_eq!(state.kind_for("stage"), None);
        assert_eq!(state.kind_for("name"), Some(PopoverKind::Sort));
        assert!(state.draft().is_none());

        state.toggle(name, PopoverKind::Sort, &applied);
        assert!(state.current().is_none());
    }

    #[test]
    fn test_outside_click_closes() {
        let columns = lead_columns();
        let mut state = PopoverState::default();
        state.open(columns.get("stage").unwrap(), PopoverKind::Filter, &FilterSpec::new());

        assert!(!state.click(true));
        assert!(state.current().is_some());
        assert!(state.click(false));
        assert!(state.current().is_none());
        assert!(!state.click(false));
    }

    #[test]
    fn test_filter_draft_seeds_from_applied() {
        let columns = lead_columns();
        let stage = columns.get("stage").unwrap();
        let applied = FilterSpec::new().with("stage", ["NEW"]);
        let mut state = PopoverState::default();
        state.open(stage, PopoverKind::Filter, &applied);

        let draft = state.draft_mut().unwrap();
        assert!(draft.is_selected("NEW"));
        assert_eq!(draft.choices.len(), stage.options.len());
        draft.toggle("NEW");
        draft.toggle("IN_PROGRESS");

        let draft = state.take_draft().unwrap();
        assert_eq!(draft.selected.iter().collect::<Vec<_>>(), vec!["IN_PROGRESS"]);
        assert!(state.current().is_none());
    }
}
