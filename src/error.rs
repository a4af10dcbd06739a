//! Structured error types for the grid engine.
//!
//! Every failure here is local to one row, one cell or one page. Nothing is
//! fatal to the process; callers surface the message and let the user retry.

use crate::types::RowId;

/// Client-side validation failures raised by cell editors before any
/// network call is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was left empty.
    #[error("{0} is required")]
    Required(String),

    /// Phone number with the wrong number of digits.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    /// A numeric sub-field did not parse.
    #[error("{field} is not a number: {input}")]
    NotANumber { field: String, input: String },

    /// A numeric sub-field that must be zero or more was negative.
    #[error("{0} must not be negative")]
    Negative(String),

    /// Lower bound above upper bound (e.g. budget min > max).
    #[error("{low} must not exceed {high}")]
    InvertedRange { low: String, high: String },

    /// Floor number above the building's total floors.
    #[error("floor {floor} is above total floors {total}")]
    FloorAboveTotal { floor: i64, total: i64 },

    /// Private (exclusive) area larger than supply area.
    #[error("private area exceeds supply area")]
    PrivateAreaExceedsSupply,

    /// Select value not present in the column's option set.
    #[error("unknown option: {0}")]
    UnknownOption(String),

    /// Date not in `YYYY-MM-DD` form.
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// All errors that can occur in the grid engine.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Editor rejected the working value.
    #[error("Validation: {0}")]
    Validation(#[from] ValidationError),

    /// Server rejected a create/update/delete; the optimistic patch was rolled back.
    #[error("Mutation {id} failed: {message}")]
    Mutation { id: u64, message: String },

    /// A page load failed; auto-loading stops until retried.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Column key not present in the column model.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Edit attempted on a column that is not editable.
    #[error("Column is not editable: {0}")]
    NotEditable(String),

    /// Row id not present in the cache.
    #[error("Unknown row: {0}")]
    UnknownRow(RowId),

    /// Presentation store failure.
    #[error("Storage: {0}")]
    Storage(String),

    /// JSON (de)serialization error.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for string errors from external collaborators.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

impl From<String> for GridError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<GridError> for wasm_bindgen::JsValue {
    fn from(e: GridError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
