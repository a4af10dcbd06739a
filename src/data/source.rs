//! Async seams to the persistence layer and the enrichment service.
//!
//! Futures are `?Send`: the grid runs on a single-threaded event loop (the
//! browser, or `block_on` natively) and implementations may hold `Rc` or
//! JS handles.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::{Page, QueryParams, Row, RowId};

/// Server-side row storage for one table.
#[async_trait(?Send)]
pub trait DataSource {
    /// Fetch one page. `page_token` is `None` for the first page.
    async fn fetch_page(
        &self,
        params: &QueryParams,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<Page>;

    /// Create a row and return it with its durable id.
    async fn create_row(&self, payload: Map<String, Value>) -> Result<Row>;

    /// Apply a partial update and return the server's view of the row.
    async fn update_row(&self, id: &RowId, patch: Map<String, Value>) -> Result<Row>;

    async fn delete_rows(&self, ids: &[RowId]) -> Result<()>;
}

/// Background annotation computed once per newly created row.
#[async_trait(?Send)]
pub trait Annotator {
    async fn fetch_derived_annotation(&self, row: &Row) -> Result<Value>;
}
