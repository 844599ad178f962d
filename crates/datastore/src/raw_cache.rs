//! Cache of raw Open Charge Map responses.

use std::sync::Arc;

use bytes::Bytes;
use object_store::ObjectStore;
use serde_json::Value;
use station_structs::{PipelineError, PipelineResult};

use crate::path_utils::{read_optional, write_bytes};

/// Raw POI cache, one JSON file per country code.
#[derive(Clone)]
pub struct RawResponseCache {
    store: Arc<dyn ObjectStore>,
}

impl RawResponseCache {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Path of the cache file for `countrycode`.
    #[must_use]
    pub fn path_for(countrycode: &str) -> String {
        format!("data/raw/openchargemap_{}.json", countrycode.to_lowercase())
    }

    /// Loads cached POIs, or `None` if nothing is cached for the country.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache exists but is not a JSON array.
    pub async fn load(&self, countrycode: &str) -> PipelineResult<Option<Vec<Value>>> {
        let path = Self::path_for(countrycode);

        let Some(data) = read_optional(self.store.as_ref(), &path).await? else {
            return Ok(None);
        };

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| PipelineError::storage(format!("Failed to parse cached {path}"), e))
    }

    /// Caches POIs as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, countrycode: &str, pois: &[Value]) -> PipelineResult<String> {
        let path = Self::path_for(countrycode);

        let data = serde_json::to_vec_pretty(pois)
            .map_err(|e| PipelineError::storage("Failed to serialize raw POIs", e))?;

        write_bytes(self.store.as_ref(), &path, Bytes::from(data)).await?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_cache_round_trip_per_country() {
        let cache = RawResponseCache::new(Arc::new(InMemory::new()));
        let pois = vec![json!({"ID": 1}), json!({"ID": 2})];

        assert!(cache.load("DE").await.expect("load").is_none());

        let path = cache.save("DE", &pois).await.expect("save");
        assert_eq!(path, "data/raw/openchargemap_de.json");

        assert_eq!(cache.load("DE").await.expect("load"), Some(pois));
        assert!(cache.load("NL").await.expect("load").is_none());
    }
}
