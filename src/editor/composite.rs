//! Composite numeric editors: price, area and floor.
//!
//! Each kind owns a fixed set of named sub-fields. The whole object is
//! validated and committed at once.

use serde_json::{Map, Number, Value};

use crate::column::presets::{TRANSACTION_JEONSE, TRANSACTION_MONTHLY};
use crate::column::{PriceShape, ValueType};
use crate::error::ValidationError;
use crate::types::{raw_text, Row};

/// Sub-field layout of a composite value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    /// Lead budget `{min, max}`.
    Budget,
    /// Sale listing `{selling}`.
    SalePrice,
    /// Jeonse listing `{deposit}`.
    JeonsePrice,
    /// Monthly-rent listing `{deposit, rent}`.
    MonthlyPrice,
    /// `{supply, private}` in square meters.
    Area,
    /// `{floor, total}`.
    Floor,
}

impl CompositeKind {
    /// Pick the layout for a column and row. `None` for non-composite types.
    pub fn for_column(value_type: &ValueType, row: &Row) -> Option<Self> {
        match value_type {
            ValueType::Price(PriceShape::Range) => Some(Self::Budget),
            ValueType::Price(PriceShape::ByTransaction { field }) => {
                Some(match raw_text(row.get(field)).as_deref() {
                    Some(TRANSACTION_JEONSE) => Self::JeonsePrice,
                    Some(TRANSACTION_MONTHLY) => Self::MonthlyPrice,
                    _ => Self::SalePrice,
                })
            }
            ValueType::Area => Some(Self::Area),
            ValueType::Floor => Some(Self::Floor),
            _ => None,
        }
    }

    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Budget => &["min", "max"],
            Self::SalePrice => &["selling"],
            Self::JeonsePrice => &["deposit"],
            Self::MonthlyPrice => &["deposit", "rent"],
            Self::Area => &["supply", "private"],
            Self::Floor => &["floor", "total"],
        }
    }

    /// Basement floors are negative; every other sub-field is a quantity.
    fn allows_negative(self, field: &str) -> bool {
        self == Self::Floor && field == "floor"
    }
}

/// Working state of a composite editor: one text input per sub-field.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeEditor {
    kind: CompositeKind,
    inputs: Vec<(&'static str, String)>,
}

impl CompositeEditor {
    /// Seed from an existing value. Anything that is not an object seeds as
    /// an empty object so every sub-field is still shown.
    pub fn seed(kind: CompositeKind, value: &Value) -> Self {
        let inputs = kind
            .fields()
            .iter()
            .map(|field| {
                let text = value
                    .get(*field)
                    .filter(|v| !v.is_null())
                    .and_then(raw_text)
                    .unwrap_or_default();
                (*field, text)
            })
            .collect();
        Self { kind, inputs }
    }

    pub fn kind(&self) -> CompositeKind {
        self.kind
    }

    pub fn inputs(&self) -> &[(&'static str, String)] {
        &self.inputs
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|(f, _)| *f == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace one sub-field's text. Returns false for unknown fields.
    pub fn set_field(&mut self, name: &str, text: &str) -> bool {
        match self.inputs.iter_mut().find(|(f, _)| *f == name) {
            Some((_, v)) => {
                *v = text.to_string();
                true
            }
            None => false,
        }
    }

    /// Parse and validate every sub-field, producing the committed object.
    /// Empty sub-fields commit as `null`.
    pub fn commit(&self) -> Result<Value, ValidationError> {
        let mut parsed: Vec<(&'static str, Option<f64>)> = Vec::with_capacity(self.inputs.len());
        for (field, text) in &self.inputs {
            let n = parse_number(field, text)?;
            if let Some(v) = n {
                if v < 0.0 && !self.kind.allows_negative(field) {
                    return Err(ValidationError::Negative((*field).to_string()));
                }
            }
            parsed.push((*field, n));
        }

        let get = |name: &str| parsed.iter().find(|(f, _)| *f == name).and_then(|(_, v)| *v);
        match self.kind {
            CompositeKind::Budget => {
                if let (Some(min), Some(max)) = (get("min"), get("max")) {
                    if min > max {
                        return Err(ValidationError::InvertedRange {
                            low: "min".into(),
                            high: "max".into(),
                        });
                    }
                }
            }
            CompositeKind::Area => {
                if let (Some(supply), Some(private)) = (get("supply"), get("private")) {
                    if private > supply {
                        return Err(ValidationError::PrivateAreaExceedsSupply);
                    }
                }
            }
            CompositeKind::Floor => {
                if let (Some(floor), Some(total)) = (get("floor"), get("total")) {
                    if floor > total {
                        return Err(ValidationError::FloorAboveTotal {
                            floor: to_i64(floor),
                            total: to_i64(total),
                        });
                    }
                }
            }
            CompositeKind::SalePrice | CompositeKind::JeonsePrice | CompositeKind::MonthlyPrice => {}
        }

        let mut out = Map::new();
        for (field, n) in parsed {
            out.insert(field.to_string(), n.map_or(Value::Null, number_value));
        }
        Ok(Value::Object(out))
    }
}

fn parse_number(field: &str, text: &str) -> Result<Option<f64>, ValidationError> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(ValidationError::NotANumber {
            field: field.to_string(),
            input: text.to_string(),
        }),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_i64(n: f64) -> i64 {
    n.round().clamp(-1e15, 1e15) as i64
}

/// Integral values are stored as JSON integers.
fn number_value(n: f64) -> Value {
    if n.fract().abs() < f64::EPSILON && n.abs() < 1e15 {
        Value::from(to_i64(n))
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
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
    use serde_json::json;

    #[test]
    fn test_seed_empty_value_shows_all_fields() {
        let ed = CompositeEditor::seed(CompositeKind::MonthlyPrice, &Value::Null);
        assert_eq!(ed.inputs().len(), 2);
        assert_eq!(ed.field("deposit"), Some(""));
        assert_eq!(ed.field("rent"), Some(""));
    }

    #[test]
    fn test_commit_whole_object() {
        let mut ed = CompositeEditor::seed(CompositeKind::Budget, &json!({"min": 10000}));
        assert_eq!(ed.field("min"), Some("10000"));
        assert!(ed.set_field("max", "20,000"));
        assert_eq!(ed.commit().unwrap(), json!({"min": 10000, "max": 20000}));
    }

    #[test]
    fn test_empty_subfield_commits_null() {
        let ed = CompositeEditor::seed(CompositeKind::Area, &json!({"supply": 84.5}));
        assert_eq!(ed.commit().unwrap(), json!({"supply": 84.5, "private": null}));
    }

    #[test]
    fn test_inverted_budget_rejected() {
        let mut ed = CompositeEditor::seed(CompositeKind::Budget, &Value::Null);
        ed.set_field("min", "50000");
        ed.set_field("max", "10000");
        assert!(matches!(
            ed.commit(),
            Err(ValidationError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_negative_rejected_except_basement_floor() {
        let mut price = CompositeEditor::seed(CompositeKind::SalePrice, &Value::Null);
        price.set_field("selling", "-1");
        assert_eq!(price.commit(), Err(ValidationError::Negative("selling".into())));

        let mut floor = CompositeEditor::seed(CompositeKind::Floor, &Value::Null);
        floor.set_field("floor", "-2");
        floor.set_field("total", "15");
        assert_eq!(floor.commit().unwrap(), json!({"floor": -2, "total": 15}));
    }

    #[test]
    fn test_floor_above_total_rejected() {
        let mut floor = CompositeEditor::seed(CompositeKind::Floor, &Value::Null);
        floor.set_field("floor", "20");
        floor.set_field("total", "15");
        assert_eq!(
            floor.commit(),
            Err(ValidationError::FloorAboveTotal { floor: 20, total: 15 })
        );
    }

    #[test]
    fn test_private_area_cannot_exceed_supply() {
        let mut area = CompositeEditor::seed(CompositeKind::Area, &Value::Null);
        area.set_field("supply", "59");
        area.set_field("private", "84");
        assert_eq!(area.commit(), Err(ValidationError::PrivateAreaExceedsSupply));
    }

    #[test]
    fn test_not_a_number() {
        let mut ed = CompositeEditor::seed(CompositeKind::JeonsePrice, &Value::Null);
        ed.set_field("deposit", "3억");
        assert!(matches!(ed.commit(), Err(ValidationError::NotANumber { .. })));
    }

    #[test]
    fn test_price_kind_follows_transaction_type() {
        let vt = ValueType::Price(PriceShape::ByTransaction {
            field: "transaction_type".into(),
        });
        let monthly = Row::new("1").with("transaction_type", "MONTHLY_RENT");
        let sale = Row::new("2").with("transaction_type", "SALE");
        let unknown = Row::new("3");
        assert_eq!(CompositeKind::for_column(&vt, &monthly), Some(CompositeKind::MonthlyPrice));
        assert_eq!(CompositeKind::for_column(&vt, &sale), Some(CompositeKind::SalePrice));
        assert_eq!(CompositeKind::for_column(&vt, &unknown), Some(CompositeKind::SalePrice));
        assert_eq!(CompositeKind::for_column(&ValueType::Text, &sale), None);
    }
}
