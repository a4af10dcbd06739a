use serde::{Deserialize, Serialize};

use super::{FilterSpec, Row, SortSpec};

/// Everything that changes the server-side result set.
///
/// Only the *applied* search query participates; staged search text never
/// reaches these parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub sort: Option<SortSpec>,
    pub filters: FilterSpec,
    pub search: String,
}

/// Cache key for one independent query: the table plus its full parameter
/// tuple. A parameter change is a new key, so superseded fetches need no
/// manual cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub table: String,
    pub params: QueryParams,
}

impl QueryKey {
    pub fn new(table: impl Into<String>, params: QueryParams) -> Self {
        Self {
            table: table.into(),
            params,
        }
    }
}

/// One page returned by the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub rows: Vec<Row>,
    pub next_page_token: Option<String>,
    pub total_count: u64,
}
