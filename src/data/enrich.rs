//! Budget-based listing recommendations for new leads.
//!
//! Best-effort and not transactionally consistent with the grid: the result
//! is a snapshot attached to the lead row as an annotation.

use std::rc::Rc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::source::{Annotator, DataSource};
use crate::column::presets::{TRANSACTION_SALE, TRANSACTION_TYPE_FIELD};
use crate::error::Result;
use crate::types::{QueryParams, Row};

/// Listings scanned per lookup.
pub const DEFAULT_SCAN_LIMIT: usize = 200;

/// Matches a lead's `budget` range against listing prices.
///
/// Sale listings match on `selling`; jeonse and monthly listings on
/// `deposit`. A lead region, when present, must appear in the listing
/// address.
pub struct BudgetMatcher {
    listings: Rc<dyn DataSource>,
    scan_limit: usize,
}

impl BudgetMatcher {
    pub fn new(listings: Rc<dyn DataSource>) -> Self {
        Self {
            listings,
            scan_limit: DEFAULT_SCAN_LIMIT,
        }
    }

    #[must_use]
    pub fn scan_limit(mut self, limit: usize) -> Self {
        self.scan_limit = limit;
        self
    }

    /// True if `listing` falls inside `lead`'s budget and region.
    pub fn matches(lead: &Row, listing: &Row) -> bool {
        let budget = lead.get("budget");
        let min = budget.get("min").and_then(Value::as_f64);
        let max = budget.get("max").and_then(Value::as_f64);
        if min.is_none() && max.is_none() {
            return false;
        }

        let price = listing.get("price");
        let amount = if listing.get(TRANSACTION_TYPE_FIELD).as_str() == Some(TRANSACTION_SALE) {
            price.get("selling")
        } else {
            price.get("deposit")
        };
        let Some(amount) = amount.and_then(Value::as_f64) else {
            return false;
        };
        if min.is_some_and(|m| amount < m) || max.is_some_and(|m| amount > m) {
            return false;
        }

        match lead.get("region").as_str().map(str::trim) {
            Some(region) if !region.is_empty() => listing
                .get("address")
                .as_str()
                .is_some_and(|a| a.contains(region)),
            _ => true,
        }
    }
}

#[async_trait(?Send)]
impl Annotator for BudgetMatcher {
    async fn fetch_derived_annotation(&self, row: &Row) -> Result<Value> {
        let page = self
            .listings
            .fetch_page(&QueryParams::default(), None, self.scan_limit)
            .await?;
        let ids: Vec<&str> = page
            .rows
            .iter()
            .filter(|listing| Self::matches(row, listing))
            .map(|listing| listing.id.as_str())
            .collect();
        let count = ids.len();
        Ok(json!({ "listingIds": ids, "count": count }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::data::MemoryDataSource;
    use futures::executor::block_on;

    fn listings() -> Rc<dyn DataSource> {
        Rc::new(MemoryDataSource::with_rows(vec![
            Row::new("L1")
                .with(TRANSACTION_TYPE_FIELD, "SALE")
                .with("price", json!({"selling": 80000}))
                .with("address", "서울 강남구 역삼동"),
            Row::new("L2")
                .with(TRANSACTION_TYPE_FIELD, "JEONSE")
                .with("price", json!({"deposit": 50000}))
                .with("address", "서울 마포구 공덕동"),
            Row::new("L3")
                .with(TRANSACTION_TYPE_FIELD, "SALE")
                .with("price", json!({"selling": 150000}))
                .with("address", "서울 강남구 대치동"),
        ]))
    }

    #[test]
    fn test_matches_budget_range() {
        let matcher = BudgetMatcher::new(listings());
        let lead = Row::new("1").with("budget", json!({"min": 40000, "max": 100000}));
        let out = block_on(matcher.fetch_derived_annotation(&lead)).unwrap();
        assert_eq!(out, json!({"listingIds": ["L1", "L2"], "count": 2}));
    }

    #[test]
    fn test_region_narrows_matches() {
        let matcher = BudgetMatcher::new(listings());
        let lead = Row::new("1")
            .with("budget", json!({"min": 40000}))
            .with("region", "강남");
        let out = block_on(matcher.fetch_derived_annotation(&lead)).unwrap();
        assert_eq!(out["listingIds"], json!(["L1", "L3"]));
    }

    #[test]
    fn test_no_budget_matches_nothing() {
        let matcher = BudgetMatcher::new(listings());
        let out = block_on(matcher.fetch_derived_annotation(&Row::new("1"))).unwrap();
        assert_eq!(out["count"], json!(0));
    }
}
