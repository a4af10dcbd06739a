//! Optimistic patches and the mutation ledger.
//!
//! Every create, update and delete patches the cache before its network call
//! resolves. The ledger tags each patch with the mutation that produced it,
//! so only a mutation that actually failed is rolled back, a settled patch is
//! never applied again, and patches still pending survive a refetch.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::types::{QueryKey, Row, RowId};

use super::cache::QueryCache;

pub type MutationId = u64;

/// A forward change to cached rows.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Prepend a row to the first page of every cached query.
    Insert(Row),
    /// Merge fields into every copy of a row.
    Update { id: RowId, fields: Map<String, Value> },
    /// Drop rows from every cached query.
    Remove(Vec<RowId>),
}

/// The exact undo of one [`PatchOp`] against one cached query.
#[derive(Debug, Clone, PartialEq)]
pub enum InversePatch {
    RemoveInserted(RowId),
    RestoreFields {
        id: RowId,
        prior: Vec<(String, Option<Value>)>,
    },
    /// `(page index, row index, row)` in removal order.
    Reinsert(Vec<(usize, usize, Row)>),
}

/// A patch that has been applied and whose mutation has not settled.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticPatch {
    pub mutation: MutationId,
    pub forward: PatchOp,
    pub inverse: Vec<(QueryKey, InversePatch)>,
}

/// Outstanding optimistic patches keyed by mutation id.
#[derive(Debug, Clone, Default)]
pub struct MutationLedger {
    next_id: MutationId,
    pending: BTreeMap<MutationId, OptimisticPatch>,
}

impl MutationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `forward` to the cache and record it under a fresh mutation id.
    pub fn begin(&mut self, cache: &mut QueryCache, forward: PatchOp) -> MutationId {
        self.next_id += 1;
        let mutation = self.next_id;
        let inverse = cache.apply_all(&forward);
        log::debug!("mutation {mutation} applied to {} queries", inverse.len());
        self.pending.insert(
            mutation,
            OptimisticPatch {
                mutation,
                forward,
                inverse,
            },
        );
        mutation
    }

    /// Server accepted the mutation. The patch leaves the ledger; fresh
    /// server data supersedes it on the next refetch.
    ///
    /// Earlier pending updates to the same fields stop restoring them: the
    /// server now holds this patch's values.
    pub fn confirm(&mut self, mutation: MutationId) -> Option<OptimisticPatch> {
        let patch = self.pending.remove(&mutation)?;
        if let PatchOp::Update { id, fields } = &patch.forward {
            for (_, earlier) in self.pending.range_mut(..mutation) {
                for (_, inverse) in &mut earlier.inverse {
                    if let InversePatch::RestoreFields { id: other, prior } = inverse {
                        if *other == *id {
                            prior.retain(|(field, _)| !fields.contains_key(field));
                        }
                    }
                }
            }
        }
        Some(patch)
    }

    /// Server rejected the mutation. Reverts its patch if still pending.
    /// Returns false when the mutation already settled.
    ///
    /// A field a later pending update overwrote is left alone; its prior
    /// value moves to that update, which restores it if it fails too.
    pub fn rollback(&mut self, cache: &mut QueryCache, mutation: MutationId) -> bool {
        let Some(mut patch) = self.pending.remove(&mutation) else {
            log::debug!("rollback of settled mutation {mutation} ignored");
            return false;
        };
        for (key, inverse) in &mut patch.inverse {
            let key = &*key;
            if let InversePatch::RestoreFields { id, prior } = inverse {
                let id = &*id;
                prior.retain(|(field, value)| !self.hand_off(mutation, key, id, field, value));
            }
        }
        cache.revert_all(&patch.inverse);
        log::warn!("mutation {mutation} rolled back");
        true
    }

    /// Give `value`, the pre-`failed` value of `field`, to the next pending
    /// patch that captured the field on the same row of the same query.
    fn hand_off(
        &mut self,
        failed: MutationId,
        key: &QueryKey,
        id: &RowId,
        field: &str,
        value: &Option<Value>,
    ) -> bool {
        for (_, later) in self.pending.range_mut(failed..) {
            for (k, inverse) in &mut later.inverse {
                if &*k != key {
                    continue;
                }
                match inverse {
                    InversePatch::RestoreFields { id: other, prior } if *other == *id => {
                        if let Some(slot) = prior.iter_mut().find(|(f, _)| f == field) {
                            slot.1 = value.clone();
                            return true;
                        }
                    }
                    InversePatch::Reinsert(removed) => {
                        if let Some(entry) = removed.iter_mut().find(|entry| &entry.2.id == id) {
                            entry.2.restore(&[(field.to_string(), value.clone())]);
                            return true;
                        }
                    }
                    _ => {}
                }
            }
        }
        false
    }

    pub fn is_pending(&self, mutation: MutationId) -> bool {
        self.pending.contains_key(&mutation)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &OptimisticPatch> {
        self.pending.values()
    }

    /// Fields of row `id` that a pending update still owns.
    pub fn pending_fields(&self, id: &RowId) -> Vec<String> {
        self.pending
            .values()
            .filter_map(|patch| match &patch.forward {
                PatchOp::Update { id: other, fields } if other == id => Some(fields.keys()),
                _ => None,
            })
            .flatten()
            .cloned()
            .collect()
    }

    /// Re-apply every pending patch to `key` after its pages were replaced by
    /// a refetch. The inverses recorded against the old pages are discarded.
    pub fn reapply(&mut self, cache: &mut QueryCache, key: &QueryKey) {
        let Some(query) = cache.get_mut(key) else {
            return;
        };
        for patch in self.pending.values_mut() {
            patch.inverse.retain(|(k, _)| k != key);
            if let Some(inv) = query.apply(&patch.forward, 0) {
                patch.inverse.push((key.clone(), inv));
            }
        }
    }

    /// Apply pending patches to pages appended to `key` from `first_page` on.
    pub fn apply_to_new_pages(&mut self, cache: &mut QueryCache, key: &QueryKey, first_page: usize) {
        let Some(query) = cache.get_mut(key) else {
            return;
        };
        for patch in self.pending.values_mut() {
            if let Some(inv) = query.apply(&patch.forward, first_page) {
                patch.inverse.push((key.clone(), inv));
            }
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
    use crate::types::{Page, QueryParams};
    use serde_json::json;

    fn cache_with(rows: Vec<Row>) -> (QueryCache, QueryKey) {
        let mut cache = QueryCache::new();
        let key = QueryKey::new("listings", QueryParams::default());
        cache.entry(&key).append_page(Page {
            total_count: u64::try_from(rows.len()).unwrap(),
            rows,
            next_page_token: None,
        });
        (cache, key)
    }

    fn price(value: i64) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("price".into(), json!(value));
        m
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let (mut cache, key) = cache_with(vec![Row::new("1").with("price", 100)]);
        let mut ledger = MutationLedger::new();
        let m = ledger.begin(&mut cache, PatchOp::Update { id: "1".into(), fields: price(200) });

        assert_eq!(cache.find(&"1".into()).unwrap().get("price"), &json!(200));
        assert!(ledger.rollback(&mut cache, m));
        assert_eq!(cache.get(&key).unwrap().rows()[0].get("price"), &json!(100));
    }

    #[test]
    fn test_only_failed_mutation_rolls_back() {
        let (mut cache, _) = cache_with(vec![Row::new("1").with("price", 100).with("memo", "a")]);
        let mut ledger = MutationLedger::new();
        let failing = ledger.begin(&mut cache, PatchOp::Update { id: "1".into(), fields: price(200) });
        let mut memo = Map::new();
        memo.insert("memo".into(), json!("b"));
        let ok = ledger.begin(&mut cache, PatchOp::Update { id: "1".into(), fields: memo });

        ledger.confirm(ok);
        ledger.rollback(&mut cache, failing);
        let row = cache.find(&"1".into()).unwrap();
        assert_eq!(row.get("price"), &json!(100));
        assert_eq!(row.get("memo"), &json!("b"));
    }

    fn price_of(cache: &QueryCache) -> Value {
        cache.find(&"1".into()).unwrap().get("price").clone()
    }

    fn two_price_updates() -> (QueryCache, MutationLedger, MutationId, MutationId) {
        let (mut cache, _) = cache_with(vec![Row::new("1").with("price", 100)]);
        let mut ledger = MutationLedger::new();
        let first = ledger.begin(&mut cache, PatchOp::Update { id: "1".into(), fields: price(200) });
        let second = ledger.begin(&mut cache, PatchOp::Update { id: "1".into(), fields: price(300) });
        (cache, ledger, first, second)
    }

    #[test]
    fn test_earlier_failure_keeps_later_pending_value() {
        let (mut cache, mut ledger, first, second) = two_price_updates();

        assert!(ledger.rollback(&mut cache, first));
        assert_eq!(price_of(&cache), json!(300));

        assert!(ledger.rollback(&mut cache, second));
        assert_eq!(price_of(&cache), json!(100));
    }

    #[test]
    fn test_later_failure_restores_earlier_pending_value() {
        let (mut cache, mut ledger, first, second) = two_price_updates();

        assert!(ledger.rollback(&mut cache, second));
        assert_eq!(price_of(&cache), json!(200));

        assert!(ledger.rollback(&mut cache, first));
        assert_eq!(price_of(&cache), json!(100));
    }

    #[test]
    fn test_earlier_failure_after_later_confirmed_keeps_server_value() {
        let (mut cache, mut ledger, first, second) = two_price_updates();

        ledger.confirm(second);
        assert!(ledger.rollback(&mut cache, first));
        assert_eq!(price_of(&cache), json!(300));
    }

    #[test]
    fn test_update_failure_under_pending_delete_fixes_snapshot() {
        let (mut cache, _) = cache_with(vec![Row::new("1").with("price", 100)]);
        let mut ledger = MutationLedger::new();
        let update = ledger.begin(&mut cache, PatchOp::Update { id: "1".into(), fields: price(200) });
        let delete = ledger.begin(&mut cache, PatchOp::Remove(vec!["1".into()]));

        assert!(ledger.rollback(&mut cache, update));
        assert!(cache.find(&"1".into()).is_none());
        assert!(ledger.rollback(&mut cache, delete));
        assert_eq!(price_of(&cache), json!(100));
    }

    #[test]
    fn test_pending_fields_lists_owned_fields() {
        let (_, ledger, _, _) = two_price_updates();
        assert_eq!(ledger.pending_fields(&"1".into()), vec!["price", "price"]);
        assert!(ledger.pending_fields(&"2".into()).is_empty());
    }

    #[test]
    fn test_settled_mutation_never_rolls_back() {
        let (mut cache, _) = cache_with(vec![Row::new("1").with("price", 100)]);
        let mut ledger = MutationLedger::new();
        let m = ledger.begin(&mut cache, PatchOp::Update { id: "1".into(), fields: price(200) });
        ledger.confirm(m);
        assert!(!ledger.rollback(&mut cache, m));
        assert_eq!(cache.find(&"1".into()).unwrap().get("price"), &json!(200));
    }

    #[test]
    fn test_pending_patch_survives_refetch() {
        let (mut cache, key) = cache_with(vec![Row::new("1").with("price", 100)]);
        let mut ledger = MutationLedger::new();
        let m = ledger.begin(&mut cache, PatchOp::Update { id: "1".into(), fields: price(200) });

        // server has not seen the write yet
        cache.get_mut(&key).unwrap().replace_pages(vec![Page {
            rows: vec![Row::new("1").with("price", 100)],
            next_page_token: None,
            total_count: 1,
        }]);
        ledger.reapply(&mut cache, &key);
        assert_eq!(cache.find(&"1".into()).unwrap().get("price"), &json!(200));

        ledger.rollback(&mut cache, m);
        assert_eq!(cache.find(&"1".into()).unwrap().get("price"), &json!(100));
        assert_eq!(ledger.pending_count(), 0);
    }
}
