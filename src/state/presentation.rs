//! Persisted column presentation and its order invariant.

use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::store::PresentationStore;
use crate::column::{resolve_columns, ColumnSet, EffectiveColumn};
use crate::types::SortSpec;

const VISIBLE_COLUMNS: &str = "visible_columns";
const COLUMN_ORDER: &str = "column_order";
const STICKY_COLUMNS: &str = "sticky_columns";
const COLUMN_WIDTHS: &str = "column_widths";
const SORT_CONFIG: &str = "sort_config";

/// Storage key for one field of one table, e.g. `leads_column_order`.
pub fn storage_key(table: &str, field: &str) -> String {
    format!("{table}_{field}")
}

/// Rebuild `order` as a permutation of every known key with all pinned keys
/// forming a contiguous prefix, each group keeping its relative order.
///
/// Unknown and duplicate keys are dropped; known keys missing from `order`
/// are appended in declared order.
pub fn normalize_order<F>(order: &[String], columns: &ColumnSet, is_pinned: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    let mut seen = HashSet::new();
    let full: Vec<&str> = order
        .iter()
        .map(String::as_str)
        .chain(columns.iter().map(|c| c.key.as_str()))
        .filter(|key| columns.contains(key) && seen.insert(*key))
        .collect();

    let (pinned, rest): (Vec<&str>, Vec<&str>) = full.into_iter().partition(|key| is_pinned(key));
    pinned
        .into_iter()
        .chain(rest)
        .map(str::to_string)
        .collect()
}

/// Per-user, per-table column presentation overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPresentation {
    pub visibility: HashMap<String, bool>,
    pub order: Vec<String>,
    pub pinned: HashMap<String, bool>,
    pub width_override: HashMap<String, f32>,
}

impl ColumnPresentation {
    /// Declared defaults of the column model.
    pub fn defaults(columns: &ColumnSet) -> Self {
        let mut p = Self {
            visibility: columns.default_visibility(),
            order: columns.keys(),
            pinned: columns.default_pinned(),
            width_override: HashMap::new(),
        };
        p.normalize(columns);
        p
    }

    /// Effective pinned flag: override, else declared default.
    pub fn is_pinned(&self, columns: &ColumnSet, key: &str) -> bool {
        self.pinned
            .get(key)
            .copied()
            .or_else(|| columns.get(key).map(|c| c.pinned_by_default))
            .unwrap_or(false)
    }

    /// Re-establish every invariant after a change or a load.
    ///
    /// Unknown keys are dropped from all maps, missing visibility and pinned
    /// entries take declared defaults, stored widths are clamped, and `order`
    /// is rebuilt with the pinned prefix.
    pub fn normalize(&mut self, columns: &ColumnSet) {
        self.visibility.retain(|k, _| columns.contains(k));
        self.pinned.retain(|k, _| columns.contains(k));
        self.width_override.retain(|k, _| columns.contains(k));
        for c in columns.iter() {
            self.visibility
                .entry(c.key.clone())
                .or_insert(c.visible_by_default);
            self.pinned.entry(c.key.clone()).or_insert(c.pinned_by_default);
            if let Some(w) = self.width_override.get_mut(&c.key) {
                *w = c.clamp_width(*w);
            }
        }
        let pinned = &self.pinned;
        self.order = normalize_order(&self.order, columns, |key| {
            pinned.get(key).copied().unwrap_or(false)
        });
    }

    /// Ordered visible columns with overrides applied.
    pub fn resolve<'a>(&self, columns: &'a ColumnSet) -> Vec<EffectiveColumn<'a>> {
        resolve_columns(
            columns,
            &self.order,
            &self.visibility,
            &self.pinned,
            &self.width_override,
        )
    }
}

/// Everything persisted for one (user, table) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePresentationState {
    pub columns: ColumnPresentation,
    pub sort: Option<SortSpec>,
}

impl TablePresentationState {
    pub fn defaults(columns: &ColumnSet) -> Self {
        Self {
            columns: ColumnPresentation::defaults(columns),
            sort: None,
        }
    }

    /// Load from `store`. Each field falls back to its declared default when
    /// absent or unparsable; loading never fails.
    pub fn load<S: PresentationStore + ?Sized>(store: &S, table: &str, columns: &ColumnSet) -> Self {
        let defaults = Self::defaults(columns);
        let mut presentation = ColumnPresentation {
            visibility: read(store, table, VISIBLE_COLUMNS).unwrap_or(defaults.columns.visibility),
            order: read(store, table, COLUMN_ORDER).unwrap_or(defaults.columns.order),
            pinned: read(store, table, STICKY_COLUMNS).unwrap_or(defaults.columns.pinned),
            width_override: read(store, table, COLUMN_WIDTHS)
                .unwrap_or(defaults.columns.width_override),
        };
        presentation.normalize(columns);

        let sort = read::<Option<SortSpec>, _>(store, table, SORT_CONFIG)
            .flatten()
            .filter(|s| columns.contains(&s.column));

        Self {
            columns: presentation,
            sort,
        }
    }

    /// Write every field. Stops at the first backend failure.
    pub fn save<S: PresentationStore + ?Sized>(&self, store: &mut S, table: &str) -> crate::error::Result<()> {
        write(store, table, VISIBLE_COLUMNS, &self.columns.visibility)?;
        write(store, table, COLUMN_ORDER, &self.columns.order)?;
        write(store, table, STICKY_COLUMNS, &self.columns.pinned)?;
        write(store, table, COLUMN_WIDTHS, &self.columns.width_override)?;
        write(store, table, SORT_CONFIG, &self.sort)?;
        Ok(())
    }
}

fn read<T, S>(store: &S, table: &str, field: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: PresentationStore + ?Sized,
{
    let key = storage_key(table, field);
    let raw = store.get(&key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("ignoring unreadable {key}: {e}");
            None
        }
    }
}

fn write<T, S>(store: &mut S, table: &str, field: &str, value: &T) -> crate::error::Result<()>
where
    T: Serialize + ?Sized,
    S: PresentationStore + ?Sized,
{
    let json = serde_json::to_string(value)?;
    store.set(&storage_key(table, field), &json)
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
    use crate::column::{ColumnDescriptor, ValueType};
    use crate::state::MemoryStore;
    use crate::types::SortDirection;

    fn abcd() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDescriptor::new("A", "A", ValueType::Text),
            ColumnDescriptor::new("B", "B", ValueType::Text),
            ColumnDescriptor::new("C", "C", ValueType::Text),
            ColumnDescriptor::new("D", "D", ValueType::Text).bounds(50.0, 300.0),
        ])
    }

    #[test]
    fn test_pinned_prefix_keeps_relative_order() {
        let columns = abcd();
        let order: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let out = normalize_order(&order, &columns, |k| k == "A" || k == "C");
        assert_eq!(out, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_normalize_appends_missing_and_drops_unknown() {
        let columns = abcd();
        let order: Vec<String> = ["D", "gone", "B", "D"].iter().map(|s| s.to_string()).collect();
        let out = normalize_order(&order, &columns, |_| false);
        assert_eq!(out, vec!["D", "B", "A", "C"]);
    }

    #[test]
    fn test_load_falls_back_per_field() {
        let columns = abcd();
        let store = MemoryStore::with_entries([
            ("t_column_order", "[\"C\",\"A\"]"),
            ("t_visible_columns", "{not json"),
            ("t_column_widths", "{\"D\": 9999}"),
            ("t_sort_config", "{\"column\":\"B\",\"direction\":\"desc\"}"),
        ]);
        let state = TablePresentationState::load(&store, "t", &columns);

        assert_eq!(state.columns.order, vec!["C", "A", "B", "D"]);
        assert_eq!(state.columns.visibility, columns.default_visibility());
        assert_eq!(state.columns.width_override.get("D"), Some(&300.0));
        assert_eq!(state.sort, Some(SortSpec::new("B", SortDirection::Desc)));
    }

    #[test]
    fn test_sort_on_removed_column_is_dropped() {
        let columns = abcd();
        let store = MemoryStore::with_entries([(
            "t_sort_config",
            "{\"column\":\"gone\",\"direction\":\"asc\"}",
        )]);
        assert_eq!(TablePresentationState::load(&store, "t", &columns).sort, None);
    }

    #[test]
    fn test_save_then_load() {
        let columns = abcd();
        let mut state = TablePresentationState::defaults(&columns);
        state.columns.pinned.insert("D".into(), true);
        state.columns.normalize(&columns);
        state.sort = Some(SortSpec::new("A", SortDirection::Asc));

        let mut store = MemoryStore::new();
        state.save(&mut store, "t").unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(TablePresentationState::load(&store, "t", &columns), state);
    }
}
