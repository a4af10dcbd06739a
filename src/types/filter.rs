use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::Row;

/// Per-column allowed raw values.
///
/// Columns are ANDed, values within one column are ORed. A column with no
/// entry (or an empty set) is unfiltered, never "matches nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec(BTreeMap<String, BTreeSet<String>>);

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the allowed set for `column` wholesale. An empty set removes
    /// the filter.
    pub fn set<I, S>(&mut self, column: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.0.remove(column);
        } else {
            self.0.insert(column.to_string(), values);
        }
    }

    /// Builder-style variant of [`FilterSpec::set`].
    #[must_use]
    pub fn with<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(column, values);
        self
    }

    pub fn values(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.0.get(column)
    }

    pub fn is_active(&self, column: &str) -> bool {
        self.0.get(column).is_some_and(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }

    /// Evaluate the filter against one row.
    pub fn matches(&self, row: &Row) -> bool {
        self.0.iter().all(|(column, allowed)| {
            allowed.is_empty()
                || row
                    .raw_text(column)
                    .is_some_and(|value| allowed.contains(&value))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_means_no_filter() {
        let mut f = FilterSpec::new();
        f.set("stage", ["NEW"]);
        f.set("stage", Vec::<String>::new());
        assert!(f.is_empty());
        assert!(f.matches(&Row::new("x")));
    }

    #[test]
    fn test_or_within_and_across() {
        let f = FilterSpec::new()
            .with("stage", ["NEW", "IN_PROGRESS"])
            .with("region", ["강남구"]);

        let hit = Row::new("1").with("stage", "NEW").with("region", "강남구");
        let wrong_region = Row::new("2").with("stage", "NEW").with("region", "서초구");
        let wrong_stage = Row::new("3").with("stage", "DONE").with("region", "강남구");

        assert!(f.matches(&hit));
        assert!(!f.matches(&wrong_region));
        assert!(!f.matches(&wrong_stage));
    }

    #[test]
    fn test_missing_field_fails_active_filter() {
        let f = FilterSpec::new().with("stage", ["NEW"]);
        assert!(!f.matches(&Row::new("1")));
    }
}
