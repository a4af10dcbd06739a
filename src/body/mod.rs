//! Body renderer: row and cell descriptions for the loaded window.
//!
//! Rows are emitted in the order the data layer returned them. The grid
//! never re-sorts client-side.

mod scroll;

pub use scroll::{LoadGate, PageLoader};

use serde::Serialize;

use crate::column::{Align, EffectiveColumn};
use crate::editor::EditSession;
use crate::layout::GridLayout;
use crate::types::{Row, RowId, SelectionSet};

/// Render description of one body cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyCell {
    pub key: String,
    pub text: String,
    pub align: Align,
    pub width: f32,
    pub sticky_left: Option<f32>,
    pub last_pinned: bool,
    pub editable: bool,
    pub editing: bool,
}

/// Render description of one body row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyRow {
    pub id: RowId,
    pub selected: bool,
    /// Client-side row the server has not yet confirmed.
    pub pending: bool,
    pub cells: Vec<BodyCell>,
}

/// Build body rows for `rows` against the resolved columns.
pub fn build_body(
    rows: &[Row],
    columns: &[EffectiveColumn<'_>],
    layout: &GridLayout,
    selection: &SelectionSet,
    session: &EditSession,
    temp_id_prefix: &str,
) -> Vec<BodyRow> {
    rows.iter()
        .map(|row| BodyRow {
            id: row.id.clone(),
            selected: selection.is_selected(&row.id),
            pending: row.id.has_prefix(temp_id_prefix),
            cells: columns
                .iter()
                .zip(&layout.columns)
                .map(|(c, placement)| {
                    let key = c.key();
                    BodyCell {
                        key: key.to_string(),
                        text: c.descriptor.display(row),
                        align: c.descriptor.cell_align,
                        width: c.width,
                        sticky_left: placement.sticky_left,
                        last_pinned: placement.last_pinned,
                        editable: c.descriptor.editable,
                        editing: session.is_editing_cell(&row.id, key),
                    }
                })
                .collect(),
        })
        .collect()
}

/// Find the row at a body-relative y position with fixed row height.
pub fn row_at_y(rows: &[Row], row_height: f32, y: f32) -> Option<&Row> {
    if y < 0.0 || row_height <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let idx = (y / row_height).floor() as usize;
    rows.get(idx)
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
    use crate::state::ColumnPresentation;

    fn rows() -> Vec<Row> {
        vec![
            Row::new("1")
                .with("name", "김철수")
                .with("phone", "01012345678")
                .with("stage", "NEW"),
            Row::new("tmp-1").with("name", "신규 리드"),
        ]
    }

    #[test]
    fn test_body_cells_follow_layout() {
        let columns = lead_columns();
        let cols = ColumnPresentation::defaults(&columns).resolve(&columns);
        let layout = GridLayout::new(&cols, 48.0);
        let rows = rows();
        let mut selection = SelectionSet::new();
        let ids: Vec<RowId> = rows.iter().map(|r| r.id.clone()).collect();
        selection.toggle(&ids[0], &ids);

        let mut session = EditSession::new();
        session.begin(columns.get("phone").unwrap(), &rows[0]).unwrap();

        let body = build_body(&rows, &cols, &layout, &selection, &session, "tmp-");
        assert_eq!(body.len(), 2);
        assert!(body[0].selected && !body[0].pending);
        assert!(!body[1].selected && body[1].pending);

        let first = &body[0].cells;
        assert_eq!(first[0].key, "name");
        assert_eq!(first[0].sticky_left, Some(48.0));
        assert!(first[0].last_pinned);
        let phone = first.iter().find(|c| c.key == "phone").unwrap();
        assert_eq!(phone.text, "010-1234-5678");
        assert!(phone.editing);
        let stage = first.iter().find(|c| c.key == "stage").unwrap();
        assert_eq!(stage.text, "신규");
        assert_eq!(stage.sticky_left, None);
        assert!(!first.iter().find(|c| c.key == "created_at").unwrap().editable);
    }

    #[test]
    fn test_row_at_y() {
        let rows = rows();
        assert_eq!(row_at_y(&rows, 40.0, 0.0).unwrap().id.as_str(), "1");
        assert_eq!(row_at_y(&rows, 40.0, 41.0).unwrap().id.as_str(), "tmp-1");
        assert!(row_at_y(&rows, 40.0, 80.0).is_none());
        assert!(row_at_y(&rows, 40.0, -1.0).is_none());
    }
}
