//! Client-side query cache.
//!
//! One [`CachedQuery`] per [`QueryKey`]. Each keeps its loaded pages in fetch
//! order and its own [`PageLoader`], so a parameter change is an independent
//! query rather than a cancellation.

use std::collections::HashMap;

use crate::body::PageLoader;
use crate::types::{dedup_rows, Page, QueryKey, Row, RowId};

use super::optimistic::{InversePatch, PatchOp};

/// Loaded pages and fetch state for one query.
#[derive(Debug, Clone, Default)]
pub struct CachedQuery {
    pages: Vec<Page>,
    pub loader: PageLoader,
    /// Set when a mutation settled; cleared by the next refetch.
    pub stale: bool,
    pub last_error: Option<String>,
}

impl CachedQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All loaded rows flattened in page order, deduplicated by id.
    pub fn rows(&self) -> Vec<Row> {
        dedup_rows(self.pages.iter().flat_map(|p| p.rows.iter().cloned()))
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows().into_iter().map(|r| r.id).collect()
    }

    pub fn find(&self, id: &RowId) -> Option<&Row> {
        self.pages
            .iter()
            .flat_map(|p| p.rows.iter())
            .find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.find(id).is_some()
    }

    pub fn next_page_token(&self) -> Option<&str> {
        self.pages.last().and_then(|p| p.next_page_token.as_deref())
    }

    /// Server total from the most recent page.
    pub fn total_count(&self) -> u64 {
        self.pages.last().map_or(0, |p| p.total_count)
    }

    pub fn append_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn replace_pages(&mut self, pages: Vec<Page>) {
        self.pages = pages;
    }

    /// Apply `op` to pages from `first_page` on, returning the inverse.
    ///
    /// Inserts only land when `first_page` is 0 and a first page exists; a
    /// query that has not loaded yet will see the row on its initial fetch.
    pub fn apply(&mut self, op: &PatchOp, first_page: usize) -> Option<InversePatch> {
        match op {
            PatchOp::Insert(row) => {
                if first_page != 0 || self.contains(&row.id) {
                    return None;
                }
                let page = self.pages.first_mut()?;
                page.rows.insert(0, row.clone());
                page.total_count += 1;
                Some(InversePatch::RemoveInserted(row.id.clone()))
            }
            PatchOp::Update { id, fields } => {
                let mut prior = None;
                for row in self.rows_mut(first_page).filter(|r| &r.id == id) {
                    let p = row.merge(fields);
                    prior.get_or_insert(p);
                }
                prior.map(|prior| InversePatch::RestoreFields {
                    id: id.clone(),
                    prior,
                })
            }
            PatchOp::Remove(ids) => {
                let mut removed = Vec::new();
                for (page_idx, page) in self.pages.iter_mut().enumerate().skip(first_page) {
                    for (row_idx, row) in page.rows.iter().enumerate() {
                        if ids.contains(&row.id) {
                            removed.push((page_idx, row_idx, row.clone()));
                        }
                    }
                    let before = page.rows.len();
                    page.rows.retain(|r| !ids.contains(&r.id));
                    let gone = u64::try_from(before - page.rows.len()).unwrap_or(0);
                    page.total_count = page.total_count.saturating_sub(gone);
                }
                if removed.is_empty() {
                    None
                } else {
                    Some(InversePatch::Reinsert(removed))
                }
            }
        }
    }

    /// Undo a previously returned inverse.
    pub fn revert(&mut self, inverse: &InversePatch) {
        match inverse {
            InversePatch::RemoveInserted(id) => {
                for page in &mut self.pages {
                    let before = page.rows.len();
                    page.rows.retain(|r| &r.id != id);
                    if page.rows.len() < before {
                        page.total_count = page.total_count.saturating_sub(1);
                    }
                }
            }
            InversePatch::RestoreFields { id, prior } => {
                for row in self.rows_mut(0).filter(|r| &r.id == id) {
                    row.restore(prior);
                }
            }
            InversePatch::Reinsert(removed) => {
                for (page_idx, row_idx, row) in removed {
                    if let Some(page) = self.pages.get_mut(*page_idx) {
                        let at = (*row_idx).min(page.rows.len());
                        page.rows.insert(at, row.clone());
                        page.total_count += 1;
                    }
                }
            }
        }
    }

    /// Attach an enrichment annotation to every copy of a row.
    pub fn annotate(&mut self, id: &RowId, annotation: &serde_json::Value) -> bool {
        let mut hit = false;
        for row in self.rows_mut(0).filter(|r| &r.id == id) {
            row.recommendations = Some(annotation.clone());
            hit = true;
        }
        hit
    }

    fn rows_mut(&mut self, first_page: usize) -> impl Iterator<Item = &mut Row> {
        self.pages
            .iter_mut()
            .skip(first_page)
            .flat_map(|p| p.rows.iter_mut())
    }
}

/// Queries kept when the host does not say otherwise.
pub const DEFAULT_MAX_QUERIES: usize = 8;

/// Recently issued queries, keyed by their full parameter tuple.
///
/// Bounded: past capacity the least recently loaded query without a fetch in
/// flight is evicted, and loads fresh if it is shown again.
#[derive(Debug, Clone)]
pub struct QueryCache {
    entries: HashMap<QueryKey, CachedQuery>,
    /// Least recently used first.
    recency: Vec<QueryKey>,
    capacity: usize,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_QUERIES)
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &QueryKey) -> Option<&CachedQuery> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &QueryKey) -> Option<&mut CachedQuery> {
        self.entries.get_mut(key)
    }

    /// The query for `key`, created if absent. Marks it most recently used.
    pub fn entry(&mut self, key: &QueryKey) -> &mut CachedQuery {
        self.recency.retain(|k| k != key);
        self.recency.push(key.clone());
        if !self.entries.contains_key(key) {
            self.evict_for(key);
        }
        self.entries.entry(key.clone()).or_default()
    }

    fn evict_for(&mut self, incoming: &QueryKey) {
        while self.entries.len() >= self.capacity {
            let victim = self
                .recency
                .iter()
                .find(|k| {
                    *k != incoming
                        && self
                            .entries
                            .get(*k)
                            .is_some_and(|q| !q.loader.is_in_flight())
                })
                .cloned();
            let Some(victim) = victim else {
                break;
            };
            log::debug!("evicting cached query for {}", victim.table);
            self.remove(&victim);
        }
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn remove(&mut self, key: &QueryKey) -> Option<CachedQuery> {
        self.recency.retain(|k| k != key);
        self.entries.remove(key)
    }

    /// Find a row in any cached query.
    pub fn find(&self, id: &RowId) -> Option<&Row> {
        self.entries.values().find_map(|q| q.find(id))
    }

    /// Apply `op` to every cached query, collecting per-query inverses.
    pub fn apply_all(&mut self, op: &PatchOp) -> Vec<(QueryKey, InversePatch)> {
        self.entries
            .iter_mut()
            .filter_map(|(key, q)| q.apply(op, 0).map(|inv| (key.clone(), inv)))
            .collect()
    }

    /// Revert inverses in reverse application order. Queries evicted since
    /// are skipped.
    pub fn revert_all(&mut self, inverses: &[(QueryKey, InversePatch)]) {
        for (key, inverse) in inverses.iter().rev() {
            if let Some(q) = self.entries.get_mut(key) {
                q.revert(inverse);
            }
        }
    }

    pub fn annotate_all(&mut self, id: &RowId, annotation: &serde_json::Value) -> bool {
        let mut hit = false;
        for q in self.entries.values_mut() {
            hit |= q.annotate(id, annotation);
        }
        hit
    }

    /// A mutation settled. `active` is marked stale for refetch; every other
    /// query is dropped unless a fetch for it is in flight, in which case it
    /// is kept and marked stale.
    pub fn invalidate(&mut self, active: Option<&QueryKey>) {
        let dropped: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|(key, q)| Some(*key) != active && !q.loader.is_in_flight())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &dropped {
            self.remove(key);
        }
        for q in self.entries.values_mut() {
            q.stale = true;
        }
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
    use crate::types::QueryParams;
    use serde_json::{json, Map};

    fn page(ids: &[&str], next: Option<&str>) -> Page {
        Page {
            rows: ids.iter().map(|id| Row::new(*id).with("price", 100)).collect(),
            next_page_token: next.map(str::to_string),
            total_count: 10,
        }
    }

    fn query() -> CachedQuery {
        let mut q = CachedQuery::new();
        q.append_page(page(&["a", "b", "x"], Some("3")));
        q.append_page(page(&["x", "c"], None));
        q
    }

    #[test]
    fn test_flatten_dedups_overlapping_pages() {
        let q = query();
        let ids: Vec<String> = q.rows().iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "x", "c"]);
        assert_eq!(q.next_page_token(), None);
    }

    #[test]
    fn test_update_then_revert_touches_every_copy() {
        let mut q = query();
        let mut fields = Map::new();
        fields.insert("price".into(), json!(200));
        let op = PatchOp::Update { id: "x".into(), fields };

        let inv = q.apply(&op, 0).unwrap();
        assert_eq!(q.pages()[1].rows[0].get("price"), &json!(200));
        q.revert(&inv);
        assert_eq!(q.pages()[0].rows[2].get("price"), &json!(100));
        assert_eq!(q.pages()[1].rows[0].get("price"), &json!(100));
    }

    #[test]
    fn test_remove_then_revert_restores_positions() {
        let mut q = query();
        let before: Vec<Page> = q.pages().to_vec();
        let inv = q.apply(&PatchOp::Remove(vec!["b".into(), "x".into()]), 0).unwrap();
        assert_eq!(q.rows().len(), 2);
        q.revert(&inv);
        assert_eq!(q.pages(), before.as_slice());
    }

    #[test]
    fn test_insert_prepends_to_first_page_only_once() {
        let mut q = query();
        let op = PatchOp::Insert(Row::new("tmp-1"));
        assert!(q.apply(&op, 0).is_some());
        assert!(q.apply(&op, 0).is_none());
        assert_eq!(q.pages()[0].rows[0].id.as_str(), "tmp-1");

        let mut empty = CachedQuery::new();
        assert!(empty.apply(&op, 0).is_none());
    }

    fn search_key(text: &str) -> QueryKey {
        QueryKey::new(
            "leads",
            QueryParams {
                search: text.to_string(),
                ..QueryParams::default()
            },
        )
    }

    #[test]
    fn test_least_recently_loaded_query_is_evicted() {
        let mut cache = QueryCache::with_capacity(2);
        cache.entry(&search_key("a")).append_page(page(&["a"], None));
        cache.entry(&search_key("b")).append_page(page(&["b"], None));
        // touching a makes b the oldest
        cache.entry(&search_key("a"));
        cache.entry(&search_key("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&search_key("a")).is_some());
        assert!(cache.get(&search_key("b")).is_none());
        assert!(cache.get(&search_key("c")).is_some());
    }

    #[test]
    fn test_in_flight_query_is_not_evicted() {
        let mut cache = QueryCache::with_capacity(1);
        assert!(cache.entry(&search_key("a")).loader.begin_initial());
        cache.entry(&search_key("b"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&search_key("a")).is_some());
    }

    #[test]
    fn test_invalidate_keeps_only_the_active_query() {
        let mut cache = QueryCache::new();
        for text in ["a", "b", "c"] {
            cache.entry(&search_key(text)).append_page(page(&["a"], None));
        }
        let active = search_key("b");
        cache.invalidate(Some(&active));

        assert_eq!(cache.keys(), vec![active.clone()]);
        assert!(cache.get(&active).unwrap().stale);
    }

    #[test]
    fn test_cache_revert_skips_evicted_queries() {
        let mut cache = QueryCache::new();
        let key = QueryKey::new("leads", QueryParams::default());
        cache.entry(&key).append_page(page(&["a"], None));

        let inverses = cache.apply_all(&PatchOp::Remove(vec!["a".into()]));
        assert_eq!(inverses.len(), 1);
        cache.remove(&key);
        cache.revert_all(&inverses);
        assert!(cache.is_empty());
    }
}
