use serde::{Deserialize, Serialize};

/// Sort direction for a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// At most one active sort at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Resolve an explicit `setSort(key, direction)` request against the
    /// current sort.
    ///
    /// Requesting the column+direction that is already active clears the sort;
    /// `None` always clears it.
    pub fn apply(
        current: Option<&SortSpec>,
        column: &str,
        direction: Option<SortDirection>,
    ) -> Option<SortSpec> {
        let direction = direction?;
        match current {
            Some(cur) if cur.column == column && cur.direction == direction => None,
            _ => Some(SortSpec::new(column, direction)),
        }
    }

    /// Next state of a header click cycle: unsorted -> asc -> desc -> unsorted.
    pub fn cycle(current: Option<&SortSpec>, column: &str) -> Option<SortSpec> {
        match current {
            Some(cur) if cur.column == column => match cur.direction {
                SortDirection::Asc => Some(SortSpec::new(column, SortDirection::Desc)),
                SortDirection::Desc => None,
            },
            _ => Some(SortSpec::new(column, SortDirection::Asc)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_same_request_twice_clears() {
        let first = SortSpec::apply(None, "k", Some(SortDirection::Asc));
        assert_eq!(first, Some(SortSpec::new("k", SortDirection::Asc)));
        let second = SortSpec::apply(first.as_ref(), "k", Some(SortDirection::Asc));
        assert_eq!(second, None);
    }

    #[test]
    fn test_direction_switch_keeps_column() {
        let first = SortSpec::apply(None, "k", Some(SortDirection::Asc));
        let second = SortSpec::apply(first.as_ref(), "k", Some(SortDirection::Desc));
        assert_eq!(second, Some(SortSpec::new("k", SortDirection::Desc)));
    }

    #[test]
    fn test_header_cycle() {
        let a = SortSpec::cycle(None, "k");
        let b = SortSpec::cycle(a.as_ref(), "k");
        let c = SortSpec::cycle(b.as_ref(), "k");
        assert_eq!(a.map(|s| s.direction), Some(SortDirection::Asc));
        assert_eq!(b.map(|s| s.direction), Some(SortDirection::Desc));
        assert_eq!(c, None);
    }

    #[test]
    fn test_other_column_starts_fresh() {
        let cur = SortSpec::new("a", SortDirection::Desc);
        assert_eq!(
            SortSpec::cycle(Some(&cur), "b"),
            Some(SortSpec::new("b", SortDirection::Asc))
        );
    }
}
