//! In-memory data source.
//!
//! Implements the server-side semantics of [`DataSource`] over a `Vec<Row>`:
//! filtering, case-insensitive search, single-key sort, offset page tokens
//! and id assignment. Failures can be injected per operation, which is what
//! tests use to exercise rollback and fetch-failure paths.

use std::cell::RefCell;
use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::source::DataSource;
use crate::error::{GridError, Result};
use crate::types::{Page, QueryParams, Row, RowId, SortDirection};

/// Field stamped on created rows when the payload has none.
pub const CREATED_AT_FIELD: &str = "created_at";

/// Counts of calls received, for asserting which operation ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub fetches: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<Row>,
    next_id: u64,
    fail_fetches: usize,
    fail_mutations: usize,
    calls: CallCounts,
}

/// A [`DataSource`] backed by a vector of rows.
#[derive(Debug, Default)]
pub struct MemoryDataSource {
    inner: RefCell<Inner>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with rows. Assigned ids continue after the seeded count.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let next_id = u64::try_from(rows.len()).unwrap_or(0) + 1;
        Self {
            inner: RefCell::new(Inner {
                rows,
                next_id,
                ..Inner::default()
            }),
        }
    }

    /// Load rows from a JSON array.
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<Row> = serde_json::from_str(json)?;
        Ok(Self::with_rows(rows))
    }

    /// Fail the next `n` page fetches.
    pub fn fail_next_fetches(&self, n: usize) {
        self.inner.borrow_mut().fail_fetches = n;
    }

    /// Fail the next `n` create/update/delete calls.
    pub fn fail_next_mutations(&self, n: usize) {
        self.inner.borrow_mut().fail_mutations = n;
    }

    pub fn calls(&self) -> CallCounts {
        self.inner.borrow().calls
    }

    /// Server-side copy of a row.
    pub fn row(&self, id: &RowId) -> Option<Row> {
        self.inner.borrow().rows.iter().find(|r| &r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().rows.is_empty()
    }

    /// Rows matching `params`, in result order.
    pub fn query(&self, params: &QueryParams) -> Vec<Row> {
        let inner = self.inner.borrow();
        let needle = params.search.trim().to_lowercase();
        let mut rows: Vec<Row> = inner
            .rows
            .iter()
            .filter(|r| params.filters.matches(r))
            .filter(|r| needle.is_empty() || matches_search(r, &needle))
            .cloned()
            .collect();

        if let Some(sort) = &params.sort {
            // stable, so ties keep insertion order
            rows.sort_by(|a, b| {
                let (x, y) = (a.get(&sort.column), b.get(&sort.column));
                let ord = compare_values(x, y);
                if x.is_null() || y.is_null() {
                    return ord;
                }
                match sort.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        rows
    }

    fn take_mutation_failure(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_mutations > 0 {
            inner.fail_mutations -= 1;
            return Err(GridError::Other("injected mutation failure".into()));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl DataSource for MemoryDataSource {
    async fn fetch_page(
        &self,
        params: &QueryParams,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<Page> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.calls.fetches += 1;
            if inner.fail_fetches > 0 {
                inner.fail_fetches -= 1;
                return Err(GridError::Fetch("injected fetch failure".into()));
            }
        }

        let offset = match page_token {
            Some(t) => t
                .parse::<usize>()
                .map_err(|_| GridError::Fetch(format!("bad page token: {t}")))?,
            None => 0,
        };
        let all = self.query(params);
        let total_count = u64::try_from(all.len()).unwrap_or(u64::MAX);
        let end = offset.saturating_add(page_size.max(1)).min(all.len());
        let rows = all.get(offset..end).map(<[Row]>::to_vec).unwrap_or_default();
        let next_page_token = (end < all.len()).then(|| end.to_string());

        Ok(Page {
            rows,
            next_page_token,
            total_count,
        })
    }

    async fn create_row(&self, mut payload: Map<String, Value>) -> Result<Row> {
        self.inner.borrow_mut().calls.creates += 1;
        self.take_mutation_failure()?;

        let mut inner = self.inner.borrow_mut();
        let id = RowId::new(inner.next_id.to_string());
        inner.next_id += 1;
        payload.remove("id");
        payload
            .entry(CREATED_AT_FIELD)
            .or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));
        let row = Row {
            id,
            fields: payload,
            recommendations: None,
        };
        inner.rows.insert(0, row.clone());
        Ok(row)
    }

    async fn update_row(&self, id: &RowId, patch: Map<String, Value>) -> Result<Row> {
        self.inner.borrow_mut().calls.updates += 1;
        self.take_mutation_failure()?;

        let mut inner = self.inner.borrow_mut();
        let row = inner
            .rows
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| GridError::UnknownRow(id.clone()))?;
        row.merge(&patch);
        Ok(row.clone())
    }

    async fn delete_rows(&self, ids: &[RowId]) -> Result<()> {
        self.inner.borrow_mut().calls.deletes += 1;
        self.take_mutation_failure()?;

        self.inner
            .borrow_mut()
            .rows
            .retain(|r| !ids.contains(&r.id));
        Ok(())
    }
}

fn matches_search(row: &Row, needle: &str) -> bool {
    row.fields.values().any(|v| match v {
        Value::String(s) => s.to_lowercase().contains(needle),
        _ => false,
    })
}

/// Sort key of a composite value: its first numeric sub-field.
fn sort_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => map.values().find_map(Value::as_f64),
        _ => None,
    }
}

/// Ascending order used by the sort: numbers numerically, strings
/// lexically, nulls last. Nulls stay last when the sort is reversed.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => match (sort_number(a), sort_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.to_string().cmp(&b.to_string()),
        },
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
    use crate::types::{FilterSpec, SortSpec};
    use futures::executor::block_on;
    use serde_json::json;

    fn leads() -> MemoryDataSource {
        MemoryDataSource::with_rows(vec![
            Row::new("1").with("name", "김철수").with("stage", "NEW").with("created_at", "2024-01-01"),
            Row::new("2").with("name", "이영희").with("stage", "CLOSED").with("created_at", "2024-03-01"),
            Row::new("3").with("name", "박민수").with("stage", "IN_PROGRESS").with("created_at", "2024-02-01"),
            Row::new("4").with("name", "Kim").with("stage", "NEW").with("created_at", "2024-04-01"),
        ])
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_filter_and_sort_together() {
        let source = leads();
        let params = QueryParams {
            sort: Some(SortSpec::new("created_at", SortDirection::Desc)),
            filters: FilterSpec::new().with("stage", ["NEW", "IN_PROGRESS"]),
            search: String::new(),
        };
        assert_eq!(ids(&source.query(&params)), vec!["4", "3", "1"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let source = leads();
        let params = QueryParams {
            search: "kim".into(),
            ..QueryParams::default()
        };
        assert_eq!(ids(&source.query(&params)), vec!["4"]);
    }

    #[test]
    fn test_pages_follow_tokens() {
        let source = leads();
        let params = QueryParams::default();
        let first = block_on(source.fetch_page(&params, None, 3)).unwrap();
        assert_eq!(first.rows.len(), 3);
        assert_eq!(first.total_count, 4);
        let token = first.next_page_token.unwrap();
        let second = block_on(source.fetch_page(&params, Some(&token), 3)).unwrap();
        assert_eq!(ids(&second.rows), vec!["4"]);
        assert_eq!(second.next_page_token, None);
        assert!(block_on(source.fetch_page(&params, Some("x"), 3)).is_err());
    }

    #[test]
    fn test_create_assigns_id_and_timestamp() {
        let source = leads();
        let mut payload = Map::new();
        payload.insert("id".into(), json!("tmp-1"));
        payload.insert("name".into(), json!("홍길동"));
        let row = block_on(source.create_row(payload)).unwrap();
        assert_eq!(row.id.as_str(), "5");
        assert!(row.get(CREATED_AT_FIELD).is_string());
        assert_eq!(source.len(), 5);
        assert_eq!(source.calls().creates, 1);
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let source = leads();
        source.fail_next_mutations(1);
        assert!(block_on(source.delete_rows(&["1".into()])).is_err());
        assert!(block_on(source.delete_rows(&["1".into()])).is_ok());
        assert_eq!(source.len(), 3);

        source.fail_next_fetches(1);
        assert!(block_on(source.fetch_page(&QueryParams::default(), None, 10)).is_err());
        assert_eq!(source.calls().fetches, 1);
    }

    #[test]
    fn test_nulls_sort_last() {
        let source = MemoryDataSource::with_rows(vec![
            Row::new("a"),
            Row::new("b").with("price", json!({"min": 5000, "max": 9000})),
            Row::new("c").with("price", json!({"min": 3000})),
        ]);
        let params = QueryParams {
            sort: Some(SortSpec::new("price", SortDirection::Asc)),
            ..QueryParams::default()
        };
        assert_eq!(ids(&source.query(&params)), vec!["c", "b", "a"]);
    }
}
