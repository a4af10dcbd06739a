//! Column model: declarative, immutable column descriptors.
//!
//! Descriptors are built once per session and never mutated. Everything a
//! user can change (visibility, order, pinning, width) lives in
//! [`crate::state::ColumnPresentation`] and is layered on top by
//! [`resolve_columns`].

pub mod format;
pub mod presets;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::types::Row;

/// Default column width in pixels.
pub const DEFAULT_COLUMN_WIDTH: f32 = 150.0;
/// Default lower width bound in pixels.
pub const DEFAULT_MIN_WIDTH: f32 = 60.0;
/// Default upper width bound in pixels.
pub const DEFAULT_MAX_WIDTH: f32 = 600.0;

/// Pulls the editable-form value out of a row.
pub type ValueExtractor = Arc<dyn Fn(&Row) -> Value + Send + Sync>;
/// Produces the display string for a row.
pub type CellRenderer = Arc<dyn Fn(&Row) -> String + Send + Sync>;

/// Declared value type; selects both the default formatter and the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Select,
    Phone,
    Date,
    Price(PriceShape),
    Area,
    Floor,
}

/// Sub-field layout of a price column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceShape {
    /// `{min, max}` budget range.
    Range,
    /// Sub-fields chosen per row from the transaction type stored in `field`:
    /// sale `{selling}`, jeonse `{deposit}`, monthly rent `{deposit, rent}`.
    ByTransaction { field: String },
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Select => "select",
            ValueType::Phone => "phone",
            ValueType::Date => "date",
            ValueType::Price(_) => "price",
            ValueType::Area => "area",
            ValueType::Floor => "floor",
        }
    }

    /// Composite types hold an object of named numeric sub-fields.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            ValueType::Price(_) | ValueType::Area | ValueType::Floor
        )
    }
}

/// Horizontal alignment for header or cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// One entry in a select column's ordered option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Immutable per-session column definition.
#[derive(Clone)]
pub struct ColumnDescriptor {
    pub key: String,
    pub display_name: String,
    pub value_type: ValueType,
    pub width: f32,
    pub min_width: f32,
    pub max_width: f32,
    pub header_align: Align,
    pub cell_align: Align,
    pub pinned_by_default: bool,
    pub visible_by_default: bool,
    pub editable: bool,
    pub required: bool,
    pub options: Vec<SelectOption>,
    pub value_extractor: Option<ValueExtractor>,
    pub renderer: Option<CellRenderer>,
}

impl fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("key", &self.key)
            .field("value_type", &self.value_type)
            .field("width", &self.width)
            .field("pinned_by_default", &self.pinned_by_default)
            .field("editable", &self.editable)
            .finish_non_exhaustive()
    }
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>, value_type: ValueType) -> Self {
        let cell_align = match value_type {
            ValueType::Price(_) | ValueType::Area | ValueType::Floor => Align::Right,
            _ => Align::Left,
        };
        Self {
            key: key.into(),
            display_name: display_name.into(),
            value_type,
            width: DEFAULT_COLUMN_WIDTH,
            min_width: DEFAULT_MIN_WIDTH,
            max_width: DEFAULT_MAX_WIDTH,
            header_align: Align::Left,
            cell_align,
            pinned_by_default: false,
            visible_by_default: true,
            editable: false,
            required: false,
            options: Vec::new(),
            value_extractor: None,
            renderer: None,
        }
    }

    /// Declared default width, pulled inside the current bounds. Non-finite
    /// input is ignored.
    #[must_use]
    pub fn width(mut self, width: f32) -> Self {
        if width.is_finite() {
            self.width = width.clamp(self.min_width, self.max_width);
        }
        self
    }

    /// Set width bounds. The declared default is pulled inside them.
    #[must_use]
    pub fn bounds(mut self, min_width: f32, max_width: f32) -> Self {
        self.min_width = min_width.min(max_width);
        self.max_width = max_width.max(min_width);
        self.width = self.width.clamp(self.min_width, self.max_width);
        self
    }

    #[must_use]
    pub fn align(mut self, header: Align, cell: Align) -> Self {
        self.header_align = header;
        self.cell_align = cell;
        self
    }

    #[must_use]
    pub fn pinned(mut self) -> Self {
        self.pinned_by_default = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible_by_default = false;
        self
    }

    #[must_use]
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn extractor(mut self, f: impl Fn(&Row) -> Value + Send + Sync + 'static) -> Self {
        self.value_extractor = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn renderer(mut self, f: impl Fn(&Row) -> String + Send + Sync + 'static) -> Self {
        self.renderer = Some(Arc::new(f));
        self
    }

    /// Editable-form value: the custom extractor, else `row[key]`.
    pub fn extract(&self, row: &Row) -> Value {
        match &self.value_extractor {
            Some(f) => f(row),
            None => row.get(&self.key).clone(),
        }
    }

    /// Display string: the custom renderer, else the type's default format.
    pub fn display(&self, row: &Row) -> String {
        match &self.renderer {
            Some(f) => f(row),
            None => format::default_display(self, row),
        }
    }

    /// Clamp a requested width into `[min_width, max_width]`. Non-finite
    /// input falls back to the declared default.
    pub fn clamp_width(&self, width: f32) -> f32 {
        if width.is_finite() {
            width.clamp(self.min_width, self.max_width)
        } else {
            self.width
        }
    }

    pub fn option_label(&self, value: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }

    /// Select columns expose a value-set filter in their header popover.
    pub fn is_filterable(&self) -> bool {
        self.value_type == ValueType::Select && !self.options.is_empty()
    }
}

/// The full, ordered column model for one table.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSet {
    /// Build a column set. Later duplicates of a key are dropped.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let columns = columns
            .into_iter()
            .filter(|c| seen.insert(c.key.clone()))
            .collect();
        Self { columns }
    }

    pub fn get(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.key.clone()).collect()
    }

    /// Declared visibility for every key.
    pub fn default_visibility(&self) -> HashMap<String, bool> {
        self.columns
            .iter()
            .map(|c| (c.key.clone(), c.visible_by_default))
            .collect()
    }

    /// Declared pinning for every key.
    pub fn default_pinned(&self) -> HashMap<String, bool> {
        self.columns
            .iter()
            .map(|c| (c.key.clone(), c.pinned_by_default))
            .collect()
    }

    /// Replace the `editable` flag of the named columns. Role-dependent
    /// gating is computed by the caller and applied here before resolution.
    #[must_use]
    pub fn with_editable(mut self, keys: &[&str], editable: bool) -> Self {
        for column in &mut self.columns {
            if keys.contains(&column.key.as_str()) {
                column.editable = editable;
            }
        }
        self
    }
}

/// A column with its presentation overrides resolved.
#[derive(Debug, Clone)]
pub struct EffectiveColumn<'a> {
    pub descriptor: &'a ColumnDescriptor,
    pub width: f32,
    pub pinned: bool,
}

impl EffectiveColumn<'_> {
    pub fn key(&self) -> &str {
        &self.descriptor.key
    }
}

/// Resolve the ordered list of visible columns.
///
/// Walks `order`, dropping unknown keys and keys not explicitly visible. Known
/// keys missing from `order` (columns added after the state was persisted) are
/// appended in declared order when visible, using the declared default if
/// `visibility` has no entry for them.
pub fn resolve_columns<'a>(
    columns: &'a ColumnSet,
    order: &[String],
    visibility: &HashMap<String, bool>,
    pinned: &HashMap<String, bool>,
    width_overrides: &HashMap<String, f32>,
) -> Vec<EffectiveColumn<'a>> {
    let effective = |c: &'a ColumnDescriptor| EffectiveColumn {
        descriptor: c,
        width: width_overrides
            .get(&c.key)
            .map_or(c.width, |w| c.clamp_width(*w)),
        pinned: pinned.get(&c.key).copied().unwrap_or(c.pinned_by_default),
    };

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(columns.len());

    for key in order {
        if !seen.insert(key.as_str()) {
            continue;
        }
        let Some(c) = columns.get(key) else {
            continue;
        };
        if visibility.get(key).copied() == Some(true) {
            out.push(effective(c));
        }
    }

    for c in columns.iter() {
        if seen.contains(c.key.as_str()) {
            continue;
        }
        let visible = visibility
            .get(&c.key)
            .copied()
            .unwrap_or(c.visible_by_default);
        if visible {
            out.push(effective(c));
        }
    }

    out
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

    fn set() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDescriptor::new("a", "A", ValueType::Text).width(100.0),
            ColumnDescriptor::new("b", "B", ValueType::Text).width(120.0),
            ColumnDescriptor::new("c", "C", ValueType::Text).hidden(),
            ColumnDescriptor::new("d", "D", ValueType::Text).pinned(),
        ])
    }

    fn keys(cols: &[EffectiveColumn<'_>]) -> Vec<String> {
        cols.iter().map(|c| c.key().to_string()).collect()
    }

    #[test]
    fn test_missing_keys_append_when_visible_by_default() {
        let columns = set();
        let order = vec!["b".to_string(), "a".to_string()];
        let vis: HashMap<String, bool> = [("a".into(), true), ("b".into(), true)].into();
        let out = resolve_columns(&columns, &order, &vis, &HashMap::new(), &HashMap::new());
        // c is hidden by default, d is new and visible
        assert_eq!(keys(&out), vec!["b", "a", "d"]);
        assert!(out[2].pinned);
    }

    #[test]
    fn test_order_keys_without_visibility_entry_are_dropped() {
        let columns = set();
        let order = columns.keys();
        let vis: HashMap<String, bool> = [("a".into(), true), ("b".into(), false)].into();
        let out = resolve_columns(&columns, &order, &vis, &HashMap::new(), &HashMap::new());
        assert_eq!(keys(&out), vec!["a"]);
    }

    #[test]
    fn test_unknown_and_duplicate_keys_ignored() {
        let columns = set();
        let order = vec!["zzz".into(), "a".into(), "a".into()];
        let vis = columns.default_visibility();
        let out = resolve_columns(&columns, &order, &vis, &HashMap::new(), &HashMap::new());
        assert_eq!(keys(&out), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_width_override_and_pinned_override() {
        let columns = set();
        let widths: HashMap<String, f32> = [("a".into(), 5000.0)].into();
        let pinned: HashMap<String, bool> = [("a".into(), true), ("d".into(), false)].into();
        let out = resolve_columns(
            &columns,
            &columns.keys(),
            &columns.default_visibility(),
            &pinned,
            &widths,
        );
        assert_eq!(out[0].width, DEFAULT_MAX_WIDTH);
        assert!(out[0].pinned);
        assert!(!out[2].pinned);
        assert_eq!(out[1].width, 120.0);
    }

    #[test]
    fn test_clamp_width_handles_nan() {
        let c = ColumnDescriptor::new("a", "A", ValueType::Text)
            .width(100.0)
            .bounds(80.0, 200.0);
        assert_eq!(c.clamp_width(f32::NAN), 100.0);
        assert_eq!(c.clamp_width(10.0), 80.0);
        assert_eq!(c.clamp_width(999.0), 200.0);
    }

    #[test]
    fn test_declared_width_stays_within_bounds() {
        let wide = ColumnDescriptor::new("a", "A", ValueType::Text).width(1000.0);
        assert_eq!(wide.width, DEFAULT_MAX_WIDTH);
        assert_eq!(wide.clamp_width(f32::NAN), DEFAULT_MAX_WIDTH);

        let narrow = ColumnDescriptor::new("b", "B", ValueType::Text).width(10.0);
        assert_eq!(narrow.width, DEFAULT_MIN_WIDTH);

        let unchanged = ColumnDescriptor::new("c", "C", ValueType::Text).width(f32::INFINITY);
        assert_eq!(unchanged.width, DEFAULT_COLUMN_WIDTH);
    }

    #[test]
    fn test_extract_falls_back_to_key() {
        let row = Row::new("1").with("name", "홍길동");
        let plain = ColumnDescriptor::new("name", "이름", ValueType::Text);
        assert_eq!(plain.extract(&row), Value::from("홍길동"));

        let custom = ColumnDescriptor::new("name", "이름", ValueType::Text)
            .extractor(|r| Value::from(format!("<{}>", r.get("name").as_str().unwrap_or(""))));
        assert_eq!(custom.extract(&row), Value::from("<홍길동>"));
    }

    #[test]
    fn test_duplicate_descriptor_keys_dropped() {
        let columns = ColumnSet::new(vec![
            ColumnDescriptor::new("a", "A", ValueType::Text),
            ColumnDescriptor::new("a", "A2", ValueType::Text),
        ]);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns.get("a").unwrap().display_name, "A");
    }
}
