//! Data and mutation layer.
//!
//! [`DataLayer`] fronts a [`DataSource`] with a client-side [`QueryCache`].
//! Writes patch the cache synchronously, are reconciled or rolled back when
//! the server answers, and mark the shown query stale so the next
//! [`DataLayer::refetch_active`] restores eventual consistency.
//!
//! The handle is cheap to clone and single-threaded. No `RefCell` borrow is
//! held across an `.await`, so several operations may be in flight at once.

mod cache;
mod enrich;
mod memory;
mod optimistic;
mod source;

pub use cache::{CachedQuery, QueryCache, DEFAULT_MAX_QUERIES};
pub use enrich::{BudgetMatcher, DEFAULT_SCAN_LIMIT};
pub use memory::{CallCounts, MemoryDataSource, CREATED_AT_FIELD};
pub use optimistic::{InversePatch, MutationId, MutationLedger, OptimisticPatch, PatchOp};
pub use source::{Annotator, DataSource};

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::body::PageLoader;
use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::types::{Page, QueryKey, QueryParams, Row, RowId};

#[derive(Debug, Default)]
struct LayerState {
    cache: QueryCache,
    ledger: MutationLedger,
    /// Client-only rows, newest first.
    phantoms: Vec<Row>,
    /// Edits made to a phantom while its create is in flight.
    creating: HashMap<RowId, Map<String, Value>>,
    annotations: HashMap<RowId, Value>,
    enrich_queue: Vec<Row>,
    next_temp: u64,
    /// The query the grid is showing: the one it last asked to load.
    active: Option<QueryKey>,
}

impl LayerState {
    fn next_temp_id(&mut self, prefix: &str) -> RowId {
        self.next_temp += 1;
        RowId::new(format!("{prefix}{}", self.next_temp))
    }

    fn phantom_mut(&mut self, id: &RowId) -> Option<&mut Row> {
        self.phantoms.iter_mut().find(|r| &r.id == id)
    }

    /// Bring freshly loaded pages of `key` up to date with client state.
    fn settle_pages(&mut self, key: &QueryKey, first_page: usize) {
        if first_page == 0 {
            if let Some(query) = self.cache.get_mut(key) {
                for phantom in self.phantoms.iter().rev() {
                    query.apply(&PatchOp::Insert(phantom.clone()), 0);
                }
            }
            self.ledger.reapply(&mut self.cache, key);
        } else {
            self.ledger.apply_to_new_pages(&mut self.cache, key, first_page);
        }
        if let Some(query) = self.cache.get_mut(key) {
            for (id, annotation) in &self.annotations {
                query.annotate(id, annotation);
            }
        }
    }

    /// Replace a confirmed client row with the server's row.
    fn replace_with_server_row(&mut self, client_id: &RowId, row: &Row) {
        self.cache.apply_all(&PatchOp::Remove(vec![client_id.clone()]));
        self.cache.apply_all(&PatchOp::Insert(row.clone()));
        self.enrich_queue.push(row.clone());
        self.invalidate();
    }

    /// A mutation settled: the shown query goes stale, the rest are dropped.
    fn invalidate(&mut self) {
        self.cache.invalidate(self.active.as_ref());
    }
}

/// Handle to one grid's data layer.
#[derive(Clone)]
pub struct DataLayer {
    table: String,
    page_size: usize,
    temp_id_prefix: String,
    source: Rc<dyn DataSource>,
    annotator: Option<Rc<dyn Annotator>>,
    state: Rc<RefCell<LayerState>>,
}

impl fmt::Debug for DataLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLayer")
            .field("table", &self.table)
            .field("page_size", &self.page_size)
            .field("queries", &self.state.borrow().cache.len())
            .finish_non_exhaustive()
    }
}

impl DataLayer {
    pub fn new(config: &GridConfig, source: Rc<dyn DataSource>) -> Self {
        Self {
            table: config.table_name.clone(),
            page_size: config.page_size.max(1),
            temp_id_prefix: config.temp_id_prefix.clone(),
            source,
            annotator: None,
            state: Rc::new(RefCell::new(LayerState {
                cache: QueryCache::with_capacity(config.max_cached_queries),
                ..LayerState::default()
            })),
        }
    }

    #[must_use]
    pub fn with_annotator(mut self, annotator: Rc<dyn Annotator>) -> Self {
        self.annotator = Some(annotator);
        self
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut LayerState) -> R) -> R {
        f(&mut *self.state.borrow_mut())
    }

    pub fn key(&self, params: &QueryParams) -> QueryKey {
        QueryKey::new(self.table.clone(), params.clone())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Loaded rows for `params`, flattened and deduplicated by id.
    pub fn rows(&self, params: &QueryParams) -> Vec<Row> {
        let key = self.key(params);
        self.state
            .borrow()
            .cache
            .get(&key)
            .map(CachedQuery::rows)
            .unwrap_or_default()
    }

    pub fn row_ids(&self, params: &QueryParams) -> Vec<RowId> {
        self.rows(params).into_iter().map(|r| r.id).collect()
    }

    pub fn total_count(&self, params: &QueryParams) -> u64 {
        let key = self.key(params);
        self.state
            .borrow()
            .cache
            .get(&key)
            .map_or(0, CachedQuery::total_count)
    }

    /// Fetch-gating state of the query for `params`.
    pub fn loader(&self, params: &QueryParams) -> PageLoader {
        let key = self.key(params);
        self.state
            .borrow()
            .cache
            .get(&key)
            .map(|q| q.loader.clone())
            .unwrap_or_default()
    }

    pub fn last_error(&self, params: &QueryParams) -> Option<String> {
        let key = self.key(params);
        self.state
            .borrow()
            .cache
            .get(&key)
            .and_then(|q| q.last_error.clone())
    }

    pub fn find_row(&self, id: &RowId) -> Option<Row> {
        let state = self.state.borrow();
        state
            .phantoms
            .iter()
            .find(|r| &r.id == id)
            .or_else(|| state.cache.find(id))
            .cloned()
    }

    /// True for a client-only row the server has never seen.
    pub fn is_phantom(&self, id: &RowId) -> bool {
        id.has_prefix(&self.temp_id_prefix)
            && self.state.borrow().phantoms.iter().any(|r| &r.id == id)
    }

    pub fn pending_mutations(&self) -> usize {
        self.state.borrow().ledger.pending_count()
    }

    pub fn annotation(&self, id: &RowId) -> Option<Value> {
        self.state.borrow().annotations.get(id).cloned()
    }

    // -------------------------------------------------------------------------
    // Fetching
    // -------------------------------------------------------------------------

    /// Load the next page of `params`: the first page if none has landed,
    /// otherwise the continuation. Returns `Ok(false)` when the loader's gate
    /// is closed (in flight, no more pages, or failed without retry).
    pub async fn fetch_next_page(&self, params: &QueryParams) -> Result<bool> {
        let key = self.key(params);
        let token = {
            let mut state = self.state.borrow_mut();
            state.active = Some(key.clone());
            let query = state.cache.entry(&key);
            let claimed = if query.loader.initial_loaded() {
                query.loader.on_sentinel_visible()
            } else {
                query.loader.begin_initial()
            };
            if !claimed {
                return Ok(false);
            }
            query.next_page_token().map(str::to_string)
        };

        let result = self
            .source
            .fetch_page(params, token.as_deref(), self.page_size)
            .await;

        self.with_state(|state| match result {
            Ok(page) => {
                let has_next = page.next_page_token.is_some();
                let query = state.cache.entry(&key);
                let first_page = query.page_count();
                query.append_page(page);
                query.loader.on_loaded(has_next);
                query.last_error = None;
                state.settle_pages(&key, first_page);
                log::debug!("{}: loaded page {} (more: {has_next})", self.table, first_page + 1);
                Ok(true)
            }
            Err(e) => Err(Self::record_fetch_failure(state, &key, &e)),
        })
    }

    /// Re-load every loaded page of `params` from the first, replacing the
    /// cached pages. Pending optimistic patches, phantom rows and annotations
    /// are laid back over the fresh data.
    pub async fn refetch(&self, params: &QueryParams) -> Result<bool> {
        let key = self.key(params);
        let wanted = {
            let mut state = self.state.borrow_mut();
            let query = state.cache.entry(&key);
            if !query.loader.begin_refetch() {
                return Ok(false);
            }
            query.page_count().max(1)
        };

        let mut pages: Vec<Page> = Vec::with_capacity(wanted);
        let mut token: Option<String> = None;
        for _ in 0..wanted {
            match self
                .source
                .fetch_page(params, token.as_deref(), self.page_size)
                .await
            {
                Ok(page) => {
                    token = page.next_page_token.clone();
                    pages.push(page);
                    if token.is_none() {
                        break;
                    }
                }
                Err(e) => {
                    return Err(self.with_state(|state| Self::record_fetch_failure(state, &key, &e)));
                }
            }
        }

        self.with_state(|state| {
            let query = state.cache.entry(&key);
            query.replace_pages(pages);
            query.loader.on_loaded(token.is_some());
            query.stale = false;
            query.last_error = None;
            state.settle_pages(&key, 0);
        });
        Ok(true)
    }

    /// Refetch the shown query if a settled mutation made it stale. Other
    /// queries were dropped on invalidation and load fresh when shown again.
    pub async fn refetch_active(&self) -> Result<bool> {
        let params = {
            let state = self.state.borrow();
            let stale = state
                .active
                .as_ref()
                .filter(|key| state.cache.get(key).is_some_and(|q| q.stale))
                .map(|key| key.params.clone());
            stale
        };
        match params {
            Some(params) => self.refetch(&params).await,
            None => Ok(false),
        }
    }

    /// User-initiated retry after a fetch failure.
    pub fn retry(&self, params: &QueryParams) {
        let key = self.key(params);
        if let Some(query) = self.state.borrow_mut().cache.get_mut(&key) {
            query.loader.retry();
            query.last_error = None;
        }
    }

    /// Mark the shown query stale and drop every other cached query.
    pub fn invalidate(&self) {
        self.state.borrow_mut().invalidate();
    }

    /// Number of queries currently held in the cache.
    pub fn cached_queries(&self) -> usize {
        self.state.borrow().cache.len()
    }

    fn record_fetch_failure(state: &mut LayerState, key: &QueryKey, e: &GridError) -> GridError {
        let query = state.cache.entry(key);
        query.loader.on_failed();
        query.last_error = Some(e.to_string());
        log::warn!("{}: page fetch failed: {e}", key.table);
        GridError::Fetch(e.to_string())
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Add a client-only row at the top of every cached query. Its first
    /// edit creates it on the server.
    pub fn add_phantom_row(&self, fields: Map<String, Value>) -> RowId {
        let prefix = self.temp_id_prefix.clone();
        self.with_state(|state| {
            let id = state.next_temp_id(&prefix);
            let row = Row {
                id: id.clone(),
                fields,
                recommendations: None,
            };
            state.phantoms.insert(0, row.clone());
            state.cache.apply_all(&PatchOp::Insert(row));
            id
        })
    }

    /// Create a row. It appears immediately under a temporary id and is
    /// swapped for the server's row on success.
    pub async fn create_row(&self, payload: Map<String, Value>) -> Result<Row> {
        let prefix = self.temp_id_prefix.clone();
        let (mutation, temp_id) = self.with_state(|state| {
            let temp_id = state.next_temp_id(&prefix);
            let row = Row {
                id: temp_id.clone(),
                fields: payload.clone(),
                recommendations: None,
            };
            (state.ledger.begin(&mut state.cache, PatchOp::Insert(row)), temp_id)
        });

        match self.source.create_row(payload).await {
            Ok(row) => {
                self.with_state(|state| {
                    state.ledger.confirm(mutation);
                    state.replace_with_server_row(&temp_id, &row);
                });
                Ok(row)
            }
            Err(e) => Err(self.fail(mutation, &e)),
        }
    }

    /// Apply a cell commit. Edits to phantom rows become creates.
    pub async fn update_cell(&self, id: &RowId, column_key: &str, value: Value) -> Result<Row> {
        let mut fields = Map::new();
        fields.insert(column_key.to_string(), value);
        self.update_row(id, fields).await
    }

    /// Partial update of one row.
    pub async fn update_row(&self, id: &RowId, fields: Map<String, Value>) -> Result<Row> {
        if self.is_phantom(id) {
            self.create_from_phantom(id, fields).await
        } else {
            self.update_existing(id, fields).await
        }
    }

    async fn update_existing(&self, id: &RowId, fields: Map<String, Value>) -> Result<Row> {
        let mutation = self.with_state(|state| {
            if state.cache.find(id).is_none() {
                return Err(GridError::UnknownRow(id.clone()));
            }
            let op = PatchOp::Update {
                id: id.clone(),
                fields: fields.clone(),
            };
            Ok(state.ledger.begin(&mut state.cache, op))
        })?;

        match self.source.update_row(id, fields).await {
            Ok(row) => {
                self.with_state(|state| {
                    state.ledger.confirm(mutation);
                    // trust the server's view of the row, except for fields
                    // a later edit still has in flight
                    let mut fields = row.fields.clone();
                    for field in state.ledger.pending_fields(&row.id) {
                        fields.remove(&field);
                    }
                    state.cache.apply_all(&PatchOp::Update {
                        id: row.id.clone(),
                        fields,
                    });
                    state.invalidate();
                });
                Ok(row)
            }
            Err(e) => Err(self.fail(mutation, &e)),
        }
    }

    async fn create_from_phantom(&self, id: &RowId, fields: Map<String, Value>) -> Result<Row> {
        enum Step {
            Deferred(Row),
            Send(MutationId, Map<String, Value>),
        }

        let step = self.with_state(|state| -> Result<Step> {
            if let Some(deferred) = state.creating.get_mut(id) {
                deferred.extend(fields.clone());
                let phantom = state
                    .phantoms
                    .iter_mut()
                    .find(|r| &r.id == id)
                    .ok_or_else(|| GridError::UnknownRow(id.clone()))?;
                phantom.merge(&fields);
                let row = phantom.clone();
                state.cache.apply_all(&PatchOp::Update {
                    id: id.clone(),
                    fields,
                });
                return Ok(Step::Deferred(row));
            }

            let phantom = state
                .phantom_mut(id)
                .ok_or_else(|| GridError::UnknownRow(id.clone()))?;
            let mut payload = phantom.fields.clone();
            payload.extend(fields.clone());
            let op = PatchOp::Update {
                id: id.clone(),
                fields,
            };
            let mutation = state.ledger.begin(&mut state.cache, op);
            state.creating.insert(id.clone(), Map::new());
            Ok(Step::Send(mutation, payload))
        })?;

        let (mutation, payload) = match step {
            Step::Deferred(row) => {
                log::debug!("{id}: edit queued behind pending create");
                return Ok(row);
            }
            Step::Send(mutation, payload) => (mutation, payload),
        };

        log::debug!("{id}: first edit of phantom row, creating");
        let result = self.source.create_row(payload).await;
        let deferred = self
            .with_state(|state| state.creating.remove(id))
            .unwrap_or_default();

        match result {
            Ok(row) => {
                self.with_state(|state| {
                    state.ledger.confirm(mutation);
                    state.phantoms.retain(|r| &r.id != id);
                    state.replace_with_server_row(id, &row);
                });
                if deferred.is_empty() {
                    Ok(row)
                } else {
                    self.update_existing(&row.id, deferred).await
                }
            }
            Err(e) => Err(self.fail(mutation, &e)),
        }
    }

    /// Delete rows. Phantom rows are dropped locally without a server call.
    pub async fn delete_rows(&self, ids: &[RowId]) -> Result<()> {
        let (server_ids, mutation) = self.with_state(|state| {
            let (local, server_ids): (Vec<RowId>, Vec<RowId>) = ids
                .iter()
                .cloned()
                .partition(|id| state.phantoms.iter().any(|r| &r.id == id));
            if !local.is_empty() {
                state.phantoms.retain(|r| !local.contains(&r.id));
                state.cache.apply_all(&PatchOp::Remove(local));
            }
            if server_ids.is_empty() {
                return (server_ids, None);
            }
            let op = PatchOp::Remove(server_ids.clone());
            let mutation = state.ledger.begin(&mut state.cache, op);
            (server_ids, Some(mutation))
        });

        let Some(mutation) = mutation else {
            return Ok(());
        };
        match self.source.delete_rows(&server_ids).await {
            Ok(()) => {
                self.with_state(|state| {
                    state.ledger.confirm(mutation);
                    state.invalidate();
                });
                Ok(())
            }
            Err(e) => Err(self.fail(mutation, &e)),
        }
    }

    /// Roll back a failed mutation and surface it as [`GridError::Mutation`].
    fn fail(&self, mutation: MutationId, e: &GridError) -> GridError {
        self.with_state(|state| {
            state.ledger.rollback(&mut state.cache, mutation);
            state.invalidate();
        });
        log::warn!("{}: mutation {mutation} failed: {e}", self.table);
        GridError::Mutation {
            id: mutation,
            message: e.to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // Enrichment
    // -------------------------------------------------------------------------

    /// Rows created since the last enrichment pass.
    pub fn pending_enrichment(&self) -> usize {
        self.state.borrow().enrich_queue.len()
    }

    /// Annotate every newly created row. Failures are logged and skipped.
    /// Returns how many rows were annotated.
    pub async fn run_enrichment(&self) -> usize {
        let queue = self.with_state(|state| std::mem::take(&mut state.enrich_queue));
        let Some(annotator) = self.annotator.clone() else {
            return 0;
        };
        let mut annotated = 0;
        for row in queue {
            match annotator.fetch_derived_annotation(&row).await {
                Ok(annotation) => {
                    self.with_state(|state| {
                        state.cache.annotate_all(&row.id, &annotation);
                        state.annotations.insert(row.id.clone(), annotation);
                    });
                    annotated += 1;
                }
                Err(e) => log::warn!("{}: enrichment of {} failed: {e}", self.table, row.id),
            }
        }
        annotated
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
    use futures::executor::block_on;
    use serde_json::json;

    fn layer(rows: Vec<Row>, page_size: usize) -> (DataLayer, Rc<MemoryDataSource>) {
        let source = Rc::new(MemoryDataSource::with_rows(rows));
        let config = GridConfig {
            page_size,
            ..GridConfig::new("listings")
        };
        (DataLayer::new(&config, Rc::clone(&source) as Rc<dyn DataSource>), source)
    }

    fn fields(key: &str, value: Value) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert(key.to_string(), value);
        m
    }

    #[test]
    fn test_pages_append_until_exhausted() {
        let rows = (1..=5).map(|i| Row::new(i.to_string())).collect();
        let (layer, _) = layer(rows, 2);
        let params = QueryParams::default();

        assert!(block_on(layer.fetch_next_page(&params)).unwrap());
        assert!(block_on(layer.fetch_next_page(&params)).unwrap());
        assert!(block_on(layer.fetch_next_page(&params)).unwrap());
        assert!(!block_on(layer.fetch_next_page(&params)).unwrap());
        assert_eq!(layer.rows(&params).len(), 5);
        assert_eq!(layer.total_count(&params), 5);
    }

    #[test]
    fn test_failed_update_rolls_back() {
        let (layer, source) = layer(vec![Row::new("1").with("price", 100)], 10);
        let params = QueryParams::default();
        block_on(layer.fetch_next_page(&params)).unwrap();

        source.fail_next_mutations(1);
        let err = block_on(layer.update_cell(&"1".into(), "price", json!(200))).unwrap_err();
        assert!(matches!(err, GridError::Mutation { .. }));
        assert_eq!(layer.rows(&params)[0].get("price"), &json!(100));
        assert_eq!(layer.pending_mutations(), 0);
    }

    #[test]
    fn test_fetch_failure_keeps_rows_until_retry() {
        let rows = (1..=4).map(|i| Row::new(i.to_string())).collect();
        let (layer, source) = layer(rows, 2);
        let params = QueryParams::default();
        block_on(layer.fetch_next_page(&params)).unwrap();

        source.fail_next_fetches(1);
        assert!(matches!(
            block_on(layer.fetch_next_page(&params)),
            Err(GridError::Fetch(_))
        ));
        assert_eq!(layer.rows(&params).len(), 2);
        assert!(layer.last_error(&params).is_some());
        assert!(!block_on(layer.fetch_next_page(&params)).unwrap());

        layer.retry(&params);
        assert!(block_on(layer.fetch_next_page(&params)).unwrap());
        assert_eq!(layer.rows(&params).len(), 4);
    }

    #[test]
    fn test_delete_phantom_is_local() {
        let (layer, source) = layer(vec![Row::new("1")], 10);
        let params = QueryParams::default();
        block_on(layer.fetch_next_page(&params)).unwrap();
        let id = layer.add_phantom_row(Map::new());

        block_on(layer.delete_rows(&[id])).unwrap();
        assert_eq!(layer.rows(&params).len(), 1);
        assert_eq!(source.calls().deletes, 0);
    }

    #[test]
    fn test_phantom_survives_refetch() {
        let (layer, _) = layer(vec![Row::new("1")], 10);
        let params = QueryParams::default();
        block_on(layer.fetch_next_page(&params)).unwrap();
        let id = layer.add_phantom_row(fields("name", json!("신규")));

        assert!(block_on(layer.refetch(&params)).unwrap());
        let rows = layer.rows(&params);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, id);
    }
}
