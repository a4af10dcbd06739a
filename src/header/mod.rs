//! Header renderer: header cell descriptions and header interactions.
//!
//! The renderer is headless. It produces [`HeaderCell`] values that a view
//! layer paints, and owns the transient drag and popover state that must
//! outlive individual re-renders.

mod popover;
mod reorder;
mod resize;

pub use popover::{FilterDraft, Popover, PopoverKind, PopoverState};
pub use reorder::ReorderDrag;
pub use resize::ResizeDrag;

use serde::Serialize;

use crate::column::{Align, EffectiveColumn};
use crate::layout::GridLayout;
use crate::types::{FilterSpec, SortDirection, SortSpec};

/// Size of the resize handle on a column's trailing edge, in pixels.
pub const RESIZE_HANDLE_SIZE: f32 = 8.0;

/// Render description of one header cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCell {
    pub key: String,
    pub label: String,
    pub align: Align,
    pub width: f32,
    pub sticky_left: Option<f32>,
    pub last_pinned: bool,
    pub pinned: bool,
    /// Pinned columns cannot be dragged.
    pub draggable: bool,
    pub sort: Option<SortDirection>,
    pub filterable: bool,
    pub filter_active: bool,
    pub popover_open: Option<PopoverKind>,
}

/// What a pointer position in the header row lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderHit {
    /// The select-all checkbox gutter.
    Gutter,
    /// Trailing-edge resize handle of the column at this index.
    ResizeHandle(usize),
    /// Body of the header cell at this index.
    Column(usize),
}

/// Transient header interaction state.
///
/// Kept apart from the resolved columns so a rebuild of the header (for
/// example after a page load or a filter change) never interrupts a drag.
#[derive(Debug, Clone, Default)]
pub struct HeaderState {
    pub resize: Option<ResizeDrag>,
    pub reorder: Option<ReorderDrag>,
    pub popover: PopoverState,
}

impl HeaderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while any pointer drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.resize.is_some() || self.reorder.is_some()
    }
}

/// Build header cells for the effective columns.
///
/// An in-progress resize overrides its column's width so the drag is
/// reflected even if the persisted width has not caught up.
pub fn build_header(
    columns: &[EffectiveColumn<'_>],
    layout: &GridLayout,
    sort: Option<&SortSpec>,
    filters: &FilterSpec,
    state: &HeaderState,
) -> Vec<HeaderCell> {
    columns
        .iter()
        .zip(&layout.columns)
        .map(|(c, placement)| {
            let key = c.key();
            let width = state
                .resize
                .as_ref()
                .filter(|r| r.key() == key)
                .map_or(c.width, ResizeDrag::width);
            HeaderCell {
                key: key.to_string(),
                label: c.descriptor.display_name.clone(),
                align: c.descriptor.header_align,
                width,
                sticky_left: placement.sticky_left,
                last_pinned: placement.last_pinned,
                pinned: c.pinned,
                draggable: !c.pinned,
                sort: sort.filter(|s| s.column == key).map(|s| s.direction),
                filterable: c.descriptor.is_filterable(),
                filter_active: filters.is_active(key),
                popover_open: state.popover.kind_for(key),
            }
        })
        .collect()
}

/// Hit test a content-space x position against the header row.
pub fn hit_test(layout: &GridLayout, x: f32) -> Option<HeaderHit> {
    if x >= 0.0 && x < layout.gutter_width {
        return Some(HeaderHit::Gutter);
    }
    let idx = layout.col_at_x(x)?;
    let placement = layout.columns.get(idx)?;
    if x >= placement.x + placement.width - RESIZE_HANDLE_SIZE {
        Some(HeaderHit::ResizeHandle(idx))
    } else {
        Some(HeaderHit::Column(idx))
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
    use crate::column::presets::lead_columns;
    use crate::column::ColumnSet;
    use crate::state::ColumnPresentation;

    fn resolved(columns: &ColumnSet) -> Vec<EffectiveColumn<'_>> {
        ColumnPresentation::defaults(columns).resolve(columns)
    }

    #[test]
    fn test_header_marks_sort_filter_and_pinned() {
        let columns = lead_columns();
        let cols = resolved(&columns);
        let layout = GridLayout::new(&cols, 48.0);
        let sort = SortSpec::new("created_at", SortDirection::Desc);
        let filters = FilterSpec::new().with("stage", ["NEW"]);

        let cells = build_header(&cols, &layout, Some(&sort), &filters, &HeaderState::new());

        let name = cells.iter().find(|c| c.key == "name").unwrap();
        assert!(name.pinned && !name.draggable && name.last_pinned);
        assert_eq!(name.sticky_left, Some(48.0));

        let stage = cells.iter().find(|c| c.key == "stage").unwrap();
        assert!(stage.filter_active && stage.filterable);
        assert_eq!(stage.sort, None);

        let created = cells.iter().find(|c| c.key == "created_at").unwrap();
        assert_eq!(created.sort, Some(SortDirection::Desc));
        assert!(cells.iter().all(|c| c.key != "memo"));
    }

    #[test]
    fn test_live_resize_width_survives_rebuild() {
        let columns = lead_columns();
        let cols = resolved(&columns);
        let layout = GridLayout::new(&cols, 48.0);
        let phone = cols.iter().find(|c| c.key() == "phone").unwrap();

        let mut state = HeaderState::new();
        let mut drag = ResizeDrag::begin(phone, 500.0);
        drag.update(540.0);
        state.resize = Some(drag);

        // unrelated rebuild, e.g. after new rows arrived
        let filters = FilterSpec::new().with("stage", ["NEW"]);
        let cells = build_header(&cols, &layout, None, &filters, &state);
        let cell = cells.iter().find(|c| c.key == "phone").unwrap();
        assert_eq!(cell.width, phone.width + 40.0);
        assert!(state.is_dragging());
    }

    #[test]
    fn test_hit_test_regions() {
        let columns = lead_columns();
        let cols = resolved(&columns);
        let layout = GridLayout::new(&cols, 48.0);
        let first = &layout.columns[0];

        assert_eq!(hit_test(&layout, 10.0), Some(HeaderHit::Gutter));
        assert_eq!(hit_test(&layout, first.x + 1.0), Some(HeaderHit::Column(0)));
        assert_eq!(
            hit_test(&layout, first.x + first.width - 2.0),
            Some(HeaderHit::ResizeHandle(0))
        );
        assert_eq!(hit_test(&layout, layout.total_width() + 5.0), None);
    }
}
