//! Cell editing protocol.
//!
//! A single [`EditSession`] per grid holds at most one active edit. Each
//! active edit owns a [`CellEditor`] chosen from the column's declared
//! [`ValueType`]:
//! - Text and date columns commit on Enter
//! - Phone columns strip to digits but show a hyphenated mask
//! - Select columns commit immediately when an option is clicked
//! - Composite columns (price, area, floor) commit from an explicit save
//!   control in their popover
//!
//! Escape, the cancel control, or a click outside both the cell and its
//! popover cancel. Commit is never implicit.

pub mod composite;
pub mod phone;

use chrono::NaiveDate;
use serde_json::Value;

use crate::column::{ColumnDescriptor, SelectOption, ValueType};
use crate::error::{GridError, Result, ValidationError};
use crate::types::{raw_text, Row, RowId};

use composite::{CompositeEditor, CompositeKind};

/// How a given editor is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStyle {
    /// Enter key inside an inline input.
    EnterKey,
    /// Clicking an option commits it.
    OptionClick,
    /// Explicit save button in a popover.
    SaveButton,
}

/// Inline text editor (also used for dates).
#[derive(Debug, Clone, PartialEq)]
pub struct TextEditor {
    input: String,
    label: String,
    required: bool,
    date: bool,
}

impl TextEditor {
    pub fn input(&self) -> &str {
        &self.input
    }

    fn commit(&self) -> std::result::Result<Value, ValidationError> {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            if self.required {
                return Err(ValidationError::Required(self.label.clone()));
            }
            return Ok(Value::Null);
        }
        if self.date {
            let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map_err(|_| ValidationError::InvalidDate(trimmed.to_string()))?;
            return Ok(Value::String(date.format("%Y-%m-%d").to_string()));
        }
        Ok(Value::String(trimmed.to_string()))
    }
}

/// Single-choice editor over the column's option set.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectEditor {
    options: Vec<SelectOption>,
    current: Option<String>,
}

impl SelectEditor {
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn choose(&mut self, value: &str) -> std::result::Result<Value, ValidationError> {
        if !self.options.iter().any(|o| o.value == value) {
            return Err(ValidationError::UnknownOption(value.to_string()));
        }
        self.current = Some(value.to_string());
        Ok(Value::String(value.to_string()))
    }

    fn commit(&self) -> std::result::Result<Value, ValidationError> {
        Ok(self.current.clone().map_or(Value::Null, Value::String))
    }
}

/// Phone editor: stores digits, displays the mask.
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneEditor {
    digits: String,
    label: String,
    required: bool,
}

impl PhoneEditor {
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// What the input shows while editing.
    pub fn masked(&self) -> String {
        phone::format_mask(&self.digits)
    }

    fn commit(&self) -> std::result::Result<Value, ValidationError> {
        if self.digits.is_empty() {
            if self.required {
                return Err(ValidationError::Required(self.label.clone()));
            }
            return Ok(Value::Null);
        }
        phone::validate(&self.digits)?;
        Ok(Value::String(self.digits.clone()))
    }
}

/// Polymorphic cell editor, discriminated by the column's value type.
#[derive(Debug, Clone, PartialEq)]
pub enum CellEditor {
    Text(TextEditor),
    Select(SelectEditor),
    Phone(PhoneEditor),
    Composite(CompositeEditor),
}

impl CellEditor {
    /// Build the editor for `column` seeded from `row`.
    pub fn seed(column: &ColumnDescriptor, row: &Row) -> Self {
        let value = column.extract(row);
        let label = column.display_name.clone();
        match &column.value_type {
            ValueType::Text | ValueType::Date => CellEditor::Text(TextEditor {
                input: raw_text(&value).unwrap_or_default(),
                label,
                required: column.required,
                date: column.value_type == ValueType::Date,
            }),
            ValueType::Select => CellEditor::Select(SelectEditor {
                options: column.options.clone(),
                current: raw_text(&value),
            }),
            ValueType::Phone => CellEditor::Phone(PhoneEditor {
                digits: raw_text(&value)
                    .map(|s| phone::strip(&s))
                    .unwrap_or_default(),
                label,
                required: column.required,
            }),
            vt @ (ValueType::Price(_) | ValueType::Area | ValueType::Floor) => {
                let kind = CompositeKind::for_column(vt, row).unwrap_or(CompositeKind::Area);
                CellEditor::Composite(CompositeEditor::seed(kind, &value))
            }
        }
    }

    pub fn commit_style(&self) -> CommitStyle {
        match self {
            CellEditor::Text(_) | CellEditor::Phone(_) => CommitStyle::EnterKey,
            CellEditor::Select(_) => CommitStyle::OptionClick,
            CellEditor::Composite(_) => CommitStyle::SaveButton,
        }
    }

    /// Replace the inline input text. Phone input is stripped to digits.
    /// Returns false when this editor has no inline input.
    pub fn set_text(&mut self, text: &str) -> bool {
        match self {
            CellEditor::Text(ed) => {
                ed.input = text.to_string();
                true
            }
            CellEditor::Phone(ed) => {
                ed.digits = phone::strip(text).chars().take(phone::MAX_DIGITS).collect();
                true
            }
            CellEditor::Select(_) | CellEditor::Composite(_) => false,
        }
    }

    /// Replace one composite sub-field.
    pub fn set_field(&mut self, field: &str, text: &str) -> bool {
        match self {
            CellEditor::Composite(ed) => ed.set_field(field, text),
            _ => false,
        }
    }

    /// Text shown in the editing control.
    pub fn display_value(&self) -> String {
        match self {
            CellEditor::Text(ed) => ed.input.clone(),
            CellEditor::Phone(ed) => ed.masked(),
            CellEditor::Select(ed) => ed.current.clone().unwrap_or_default(),
            CellEditor::Composite(ed) => ed
                .inputs()
                .iter()
                .map(|(f, v)| format!("{f}={v}"))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Validate and produce the value to send.
    pub fn commit(&self) -> std::result::Result<Value, ValidationError> {
        match self {
            CellEditor::Text(ed) => ed.commit(),
            CellEditor::Select(ed) => ed.commit(),
            CellEditor::Phone(ed) => ed.commit(),
            CellEditor::Composite(ed) => ed.commit(),
        }
    }
}

/// The one `{row, column}` pair currently being edited.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EditCursor {
    pub row_id: RowId,
    pub column_key: String,
}

/// A committed edit, ready for the cell-update collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct CellCommit {
    pub row_id: RowId,
    pub column_key: String,
    pub value: Value,
}

/// Keys the editing protocol reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Enter,
    Escape,
    Other,
}

/// Discrete user events delivered to the active edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditEvent<'a> {
    Key(EditKey),
    Input(&'a str),
    FieldInput { field: &'a str, text: &'a str },
    OptionClicked(&'a str),
    SaveClicked,
    CancelClicked,
    /// Click outside both the cell and its popover.
    ClickOutside,
}

/// Result of delivering one event.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// Nothing to do (no active edit, or event not meaningful here).
    Ignored,
    /// Working value changed; still editing.
    Updated,
    /// Back to viewing; dispatch the commit.
    Committed(CellCommit),
    /// Back to viewing; nothing sent.
    Cancelled,
    /// Validation failed; still editing with the error attached.
    Rejected(ValidationError),
}

/// An edit in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEdit {
    pub cursor: EditCursor,
    pub editor: CellEditor,
    pub error: Option<ValidationError>,
}

/// Viewing / Editing state machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditSession {
    #[default]
    Viewing,
    Editing(ActiveEdit),
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActiveEdit> {
        match self {
            EditSession::Viewing => None,
            EditSession::Editing(edit) => Some(edit),
        }
    }

    pub fn cursor(&self) -> Option<&EditCursor> {
        self.active().map(|e| &e.cursor)
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, EditSession::Editing(_))
    }

    pub fn is_editing_cell(&self, row_id: &RowId, column_key: &str) -> bool {
        self.cursor()
            .is_some_and(|c| &c.row_id == row_id && c.column_key == column_key)
    }

    /// Enter editing on a cell.
    ///
    /// Any previous edit is cancelled (its cursor is returned); commit is
    /// never implicit. Re-entering the cell already being edited keeps the
    /// working value.
    pub fn begin(&mut self, column: &ColumnDescriptor, row: &Row) -> Result<Option<EditCursor>> {
        if !column.editable {
            return Err(GridError::NotEditable(column.key.clone()));
        }
        if self.is_editing_cell(&row.id, &column.key) {
            return Ok(None);
        }
        let previous = self.cursor().cloned();
        if let Some(prev) = &previous {
            log::debug!("edit on {}/{} cancelled by new edit", prev.row_id, prev.column_key);
        }
        *self = EditSession::Editing(ActiveEdit {
            cursor: EditCursor {
                row_id: row.id.clone(),
                column_key: column.key.clone(),
            },
            editor: CellEditor::seed(column, row),
            error: None,
        });
        Ok(previous)
    }

    /// Drop the active edit without committing.
    pub fn cancel(&mut self) -> Option<EditCursor> {
        match std::mem::take(self) {
            EditSession::Viewing => None,
            EditSession::Editing(edit) => Some(edit.cursor),
        }
    }

    /// Deliver one event to the active edit.
    pub fn handle(&mut self, event: EditEvent<'_>) -> EditOutcome {
        let EditSession::Editing(edit) = self else {
            return EditOutcome::Ignored;
        };

        match event {
            EditEvent::Key(EditKey::Escape)
            | EditEvent::CancelClicked
            | EditEvent::ClickOutside => {
                self.cancel();
                EditOutcome::Cancelled
            }
            EditEvent::Key(EditKey::Enter) => {
                if edit.editor.commit_style() == CommitStyle::EnterKey {
                    self.try_commit()
                } else {
                    EditOutcome::Ignored
                }
            }
            EditEvent::Key(EditKey::Other) => EditOutcome::Ignored,
            EditEvent::SaveClicked => self.try_commit(),
            EditEvent::Input(text) => {
                if edit.editor.set_text(text) {
                    edit.error = None;
                    EditOutcome::Updated
                } else {
                    EditOutcome::Ignored
                }
            }
            EditEvent::FieldInput { field, text } => {
                if edit.editor.set_field(field, text) {
                    edit.error = None;
                    EditOutcome::Updated
                } else {
                    EditOutcome::Ignored
                }
            }
            EditEvent::OptionClicked(value) => {
                let CellEditor::Select(select) = &mut edit.editor else {
                    return EditOutcome::Ignored;
                };
                match select.choose(value) {
                    Ok(v) => {
                        let cursor = edit.cursor.clone();
                        *self = EditSession::Viewing;
                        EditOutcome::Committed(CellCommit {
                            row_id: cursor.row_id,
                            column_key: cursor.column_key,
                            value: v,
                        })
                    }
                    Err(e) => {
                        edit.error = Some(e.clone());
                        EditOutcome::Rejected(e)
                    }
                }
            }
        }
    }

    /// Validate the working value; leave edit mode on success.
    fn try_commit(&mut self) -> EditOutcome {
        let EditSession::Editing(edit) = self else {
            return EditOutcome::Ignored;
        };
        match edit.editor.commit() {
            Ok(value) => {
                let cursor = edit.cursor.clone();
                *self = EditSession::Viewing;
                EditOutcome::Committed(CellCommit {
                    row_id: cursor.row_id,
                    column_key: cursor.column_key,
                    value,
                })
            }
            Err(e) => {
                edit.error = Some(e.clone());
                EditOutcome::Rejected(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::column::presets::{lead_columns, listing_columns};
    use serde_json::json;

    fn lead() -> Row {
        Row::new("L-1")
            .with("name", "김철수")
            .with("phone", "01012345678")
            .with("stage", "NEW")
    }

    #[test]
    fn test_text_commit_on_enter() {
        let cols = lead_columns();
        let mut s = EditSession::new();
        s.begin(cols.get("name").unwrap(), &lead()).unwrap();
        assert_eq!(s.handle(EditEvent::Input("홍길동")), EditOutcome::Updated);
        let out = s.handle(EditEvent::Key(EditKey::Enter));
        assert_eq!(
            out,
            EditOutcome::Committed(CellCommit {
                row_id: "L-1".into(),
                column_key: "name".into(),
                value: json!("홍길동"),
            })
        );
        assert!(!s.is_editing());
    }

    #[test]
    fn test_required_text_rejected_and_stays_editing() {
        let cols = lead_columns();
        let mut s = EditSession::new();
        s.begin(cols.get("name").unwrap(), &lead()).unwrap();
        s.handle(EditEvent::Input("   "));
        let out = s.handle(EditEvent::Key(EditKey::Enter));
        assert_eq!(out, EditOutcome::Rejected(ValidationError::Required("이름".into())));
        assert!(s.is_editing());
        assert!(s.active().unwrap().error.is_some());
    }

    #[test]
    fn test_escape_and_outside_click_cancel() {
        let cols = lead_columns();
        let mut s = EditSession::new();
        s.begin(cols.get("name").unwrap(), &lead()).unwrap();
        assert_eq!(s.handle(EditEvent::Key(EditKey::Escape)), EditOutcome::Cancelled);

        s.begin(cols.get("budget").unwrap(), &lead()).unwrap();
        assert_eq!(s.handle(EditEvent::ClickOutside), EditOutcome::Cancelled);
        assert!(!s.is_editing());
    }

    #[test]
    fn test_new_cell_cancels_previous_without_commit() {
        let cols = lead_columns();
        let mut s = EditSession::new();
        s.begin(cols.get("name").unwrap(), &lead()).unwrap();
        s.handle(EditEvent::Input("changed"));
        let prev = s.begin(cols.get("phone").unwrap(), &lead()).unwrap();
        assert_eq!(prev.unwrap().column_key, "name");
        assert!(s.is_editing_cell(&"L-1".into(), "phone"));
    }

    #[test]
    fn test_not_editable_column() {
        let cols = lead_columns();
        let mut s = EditSession::new();
        let err = s.begin(cols.get("created_at").unwrap(), &lead()).unwrap_err();
        assert!(matches!(err, GridError::NotEditable(_)));
        assert!(!s.is_editing());
    }

    #[test]
    fn test_select_commits_on_option_click() {
        let cols = lead_columns();
        let mut s = EditSession::new();
        s.begin(cols.get("stage").unwrap(), &lead()).unwrap();
        assert_eq!(s.handle(EditEvent::Key(EditKey::Enter)), EditOutcome::Ignored);
        let out = s.handle(EditEvent::OptionClicked("IN_PROGRESS"));
        assert!(matches!(out, EditOutcome::Committed(ref c) if c.value == json!("IN_PROGRESS")));
        assert!(!s.is_editing());
    }

    #[test]
    fn test_select_rejects_unknown_option() {
        let cols = lead_columns();
        let mut s = EditSession::new();
        s.begin(cols.get("stage").unwrap(), &lead()).unwrap();
        let out = s.handle(EditEvent::OptionClicked("BOGUS"));
        assert!(matches!(out, EditOutcome::Rejected(ValidationError::UnknownOption(_))));
        assert!(s.is_editing());
    }

    #[test]
    fn test_phone_masks_while_editing_and_commits_digits() {
        let cols = lead_columns();
        let mut s = EditSession::new();
        s.begin(cols.get("phone").unwrap(), &lead()).unwrap();
        s.handle(EditEvent::Input("010 9876-5432"));
        assert_eq!(s.active().unwrap().editor.display_value(), "010-9876-5432");
        let out = s.handle(EditEvent::Key(EditKey::Enter));
        assert!(matches!(out, EditOutcome::Committed(ref c) if c.value == json!("01098765432")));
    }

    #[test]
    fn test_malformed_phone_rejected() {
        let cols = lead_columns();
        let mut s = EditSession::new();
        s.begin(cols.get("phone").unwrap(), &lead()).unwrap();
        s.handle(EditEvent::Input("12-34"));
        let out = s.handle(EditEvent::Key(EditKey::Enter));
        assert!(matches!(out, EditOutcome::Rejected(ValidationError::InvalidPhone(_))));
    }

    #[test]
    fn test_composite_seeds_empty_and_saves_whole_object() {
        let cols = lead_columns();
        let mut s = EditSession::new();
        s.begin(cols.get("budget").unwrap(), &lead()).unwrap();
        let CellEditor::Composite(ed) = &s.active().unwrap().editor else {
            panic!("budget should use the composite editor");
        };
        assert_eq!(ed.inputs().len(), 2);

        assert_eq!(s.handle(EditEvent::Key(EditKey::Enter)), EditOutcome::Ignored);
        s.handle(EditEvent::FieldInput { field: "min", text: "30000" });
        s.handle(EditEvent::FieldInput { field: "max", text: "50000" });
        let out = s.handle(EditEvent::SaveClicked);
        assert!(matches!(
            out,
            EditOutcome::Committed(ref c) if c.value == json!({"min": 30000, "max": 50000})
        ));
    }

    #[test]
    fn test_listing_price_editor_follows_transaction_type() {
        let cols = listing_columns();
        let row = Row::new("P-1")
            .with("transaction_type", "MONTHLY_RENT")
            .with("price", json!({"deposit": 1000, "rent": 60}));
        let mut s = EditSession::new();
        s.begin(cols.get("price").unwrap(), &row).unwrap();
        let CellEditor::Composite(ed) = &s.active().unwrap().editor else {
            panic!("price should use the composite editor");
        };
        assert_eq!(ed.kind(), CompositeKind::MonthlyPrice);
        assert_eq!(ed.field("rent"), Some("60"));
    }

    #[test]
    fn test_date_editor_validates() {
        let col = ColumnDescriptor::new("moved_at", "입주일", ValueType::Date).editable();
        let row = Row::new("1");
        let mut s = EditSession::new();
        s.begin(&col, &row).unwrap();
        s.handle(EditEvent::Input("2024-13-40"));
        assert!(matches!(
            s.handle(EditEvent::Key(EditKey::Enter)),
            EditOutcome::Rejected(ValidationError::InvalidDate(_))
        ));
        s.handle(EditEvent::Input("2024-02-29"));
        assert!(matches!(
            s.handle(EditEvent::Key(EditKey::Enter)),
            EditOutcome::Committed(ref c) if c.value == json!("2024-02-29")
        ));
    }

    #[test]
    fn test_events_without_edit_are_ignored() {
        let mut s = EditSession::new();
        assert_eq!(s.handle(EditEvent::SaveClicked), EditOutcome::Ignored);
        assert_eq!(s.cancel(), None);
    }
}
