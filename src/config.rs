//! Grid configuration.

use serde::{Deserialize, Serialize};

use crate::data::DEFAULT_MAX_QUERIES;
use crate::error::Result;
use crate::layout::SELECTION_GUTTER_WIDTH;

/// Per-grid settings supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Namespace for persisted presentation state and cache keys.
    pub table_name: String,
    /// Rows requested per page.
    pub page_size: usize,
    /// Width of the row-selection checkbox gutter in pixels.
    pub selection_gutter_width: f32,
    /// Body row height in pixels.
    pub row_height: f32,
    /// Prefix of client-generated row ids.
    pub temp_id_prefix: String,
    /// Distinct queries (sort, filter, search combinations) kept loaded.
    pub max_cached_queries: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            table_name: "grid".to_string(),
            page_size: 50,
            selection_gutter_width: SELECTION_GUTTER_WIDTH,
            row_height: 40.0,
            temp_id_prefix: "tmp-".to_string(),
            max_cached_queries: DEFAULT_MAX_QUERIES,
        }
    }
}

impl GridConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.page_size = config.page_size.max(1);
        config.max_cached_queries = config.max_cached_queries.max(1);
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GridConfig::new("leads");
        assert_eq!(config.table_name, "leads");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.selection_gutter_width, 48.0);
        assert_eq!(config.temp_id_prefix, "tmp-");
        assert_eq!(config.max_cached_queries, 8);
    }

    #[test]
    fn test_from_json_partial() {
        let config = GridConfig::from_json(r#"{"tableName":"listings","pageSize":0}"#).unwrap();
        assert_eq!(config.table_name, "listings");
        assert_eq!(config.page_size, 1);
        assert_eq!(config.row_height, 40.0);
        assert_eq!(config.max_cached_queries, 8);
        assert!(GridConfig::from_json("{").is_err());
    }
}
