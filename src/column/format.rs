//! Default display formatting per value type.
//!
//! Prices are stored in units of 10,000 KRW (만원) and shown with 억/만 units.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use super::{ColumnDescriptor, PriceShape, ValueType};
use crate::editor::phone;
use crate::types::{raw_text, Row};

/// 1억 expressed in 만원.
const EOK_IN_MANWON: i64 = 10_000;

/// Display string used when a column has no custom renderer.
pub fn default_display(column: &ColumnDescriptor, row: &Row) -> String {
    let value = column.extract(row);
    match &column.value_type {
        ValueType::Text => raw_text(&value).unwrap_or_default(),
        ValueType::Select => {
            let raw = raw_text(&value).unwrap_or_default();
            column
                .option_label(&raw)
                .map(str::to_string)
                .unwrap_or(raw)
        }
        ValueType::Phone => raw_text(&value)
            .map(|s| phone::format_mask(&phone::strip(&s)))
            .unwrap_or_default(),
        ValueType::Date => raw_text(&value).map(|s| format_date(&s)).unwrap_or_default(),
        ValueType::Price(PriceShape::Range) => format_budget(&value),
        ValueType::Price(PriceShape::ByTransaction { .. }) => format_listing_price(&value),
        ValueType::Area => format_area(&value),
        ValueType::Floor => format_floor(&value),
    }
}

/// Normalize an RFC 3339 timestamp or plain date to `YYYY-MM-DD`.
pub fn format_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}

fn num(value: &Value, field: &str) -> Option<f64> {
    value.get(field).and_then(Value::as_f64)
}

/// `1억 2,000만`, `5,000만`, `3억`. Fractions of a 만원 are rounded.
#[allow(clippy::cast_possible_truncation)]
pub fn format_manwon(amount: f64) -> String {
    if !amount.is_finite() {
        return String::new();
    }
    let clamped = amount.round().clamp(-1e15, 1e15);
    let total = clamped as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let eok = total / EOK_IN_MANWON;
    let rest = total % EOK_IN_MANWON;

    match (eok, rest) {
        (0, r) => format!("{sign}{}만", format_int_with_thousands(r)),
        (e, 0) => format!("{sign}{}억", format_int_with_thousands(e)),
        (e, r) => format!(
            "{sign}{}억 {}만",
            format_int_with_thousands(e),
            format_int_with_thousands(r)
        ),
    }
}

fn format_budget(value: &Value) -> String {
    match (num(value, "min"), num(value, "max")) {
        (Some(min), Some(max)) => format!("{} ~ {}", format_manwon(min), format_manwon(max)),
        (Some(min), None) => format!("{} 이상", format_manwon(min)),
        (None, Some(max)) => format!("{} 이하", format_manwon(max)),
        (None, None) => String::new(),
    }
}

fn format_listing_price(value: &Value) -> String {
    if let Some(selling) = num(value, "selling") {
        return format_manwon(selling);
    }
    match (num(value, "deposit"), num(value, "rent")) {
        (Some(deposit), Some(rent)) => format!("{}/{}", format_manwon(deposit), format_manwon(rent)),
        (Some(deposit), None) => format_manwon(deposit),
        (None, Some(rent)) => format!("월 {}", format_manwon(rent)),
        (None, None) => String::new(),
    }
}

fn format_area(value: &Value) -> String {
    match (num(value, "supply"), num(value, "private")) {
        (Some(s), Some(p)) => format!("{}㎡ / {}㎡", trim_decimal(s), trim_decimal(p)),
        (Some(s), None) => format!("{}㎡", trim_decimal(s)),
        (None, Some(p)) => format!("{}㎡", trim_decimal(p)),
        (None, None) => String::new(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn format_floor(value: &Value) -> String {
    let label = |f: f64| {
        let f = f.round().clamp(-1e6, 1e6) as i64;
        if f < 0 {
            format!("B{}", f.abs())
        } else {
            f.to_string()
        }
    };
    match (num(value, "floor"), num(value, "total")) {
        (Some(f), Some(t)) => format!("{}/{}층", label(f), label(t)),
        (Some(f), None) => format!("{}층", label(f)),
        (None, Some(t)) => format!("총 {}층", label(t)),
        (None, None) => String::new(),
    }
}

/// At most one decimal place, trailing zeros trimmed.
fn trim_decimal(value: f64) -> String {
    let s = format!("{value:.1}");
    let s = s.trim_end_matches('0');
    s.trim_end_matches('.').to_string()
}

fn format_int_with_thousands(value: i64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let len = digits.len();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
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
    use crate::column::{ColumnDescriptor, SelectOption};
    use serde_json::json;
    use test_case::test_case;

    #[test_case(12_000.0, "1억 2,000만" ; "eok and man")]
    #[test_case(10_000.0, "1억" ; "exact eok")]
    #[test_case(5_000.0, "5,000만" ; "under eok")]
    #[test_case(150_000.0, "15억" ; "many eok")]
    #[test_case(0.0, "0만" ; "zero")]
    fn test_format_manwon(input: f64, expected: &str) {
        assert_eq!(format_manwon(input), expected);
    }

    #[test]
    fn test_budget_display() {
        assert_eq!(format_budget(&json!({"min": 30000, "max": 50000})), "3억 ~ 5억");
        assert_eq!(format_budget(&json!({"min": 30000})), "3억 이상");
        assert_eq!(format_budget(&json!({})), "");
    }

    #[test]
    fn test_listing_price_display() {
        assert_eq!(format_listing_price(&json!({"selling": 85000})), "8억 5,000만");
        assert_eq!(format_listing_price(&json!({"deposit": 1000, "rent": 50})), "1,000만/50만");
        assert_eq!(format_listing_price(&json!({"deposit": 25000})), "2억 5,000만");
    }

    #[test]
    fn test_area_and_floor_display() {
        assert_eq!(format_area(&json!({"supply": 84.93, "private": 59.0})), "84.9㎡ / 59㎡");
        assert_eq!(format_floor(&json!({"floor": 3, "total": 15})), "3/15층");
        assert_eq!(format_floor(&json!({"floor": -1})), "B1층");
    }

    #[test]
    fn test_select_and_date_defaults() {
        let stage = ColumnDescriptor::new("stage", "단계", ValueType::Select)
            .options(vec![SelectOption::new("신규", "NEW")]);
        let created = ColumnDescriptor::new("created_at", "등록일", ValueType::Date);
        let row = Row::new("1")
            .with("stage", "NEW")
            .with("created_at", "2024-03-05T09:30:00+09:00");
        assert_eq!(stage.display(&row), "신규");
        assert_eq!(created.display(&row), "2024-03-05");

        let unknown = Row::new("2").with("stage", "ARCHIVED");
        assert_eq!(stage.display(&unknown), "ARCHIVED");
    }

    #[test]
    fn test_thousands() {
        assert_eq!(format_int_with_thousands(1234567), "1,234,567");
        assert_eq!(format_int_with_thousands(999), "999");
    }
}
