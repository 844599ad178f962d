//! Cached ingestion: API or raw cache → flattened, labelled parquet.

use std::sync::Arc;

use config::IngestSettings;
use datastore::{PROCESSED_DATASET_PATH, RawResponseCache, StationDataset};
use object_store::ObjectStore;
use station_structs::{PipelineError, PipelineResult};
use tracing::info;

use crate::api::client::OpenChargeMapClient;
use crate::flatten::flatten_pois;

/// Where the POIs of a processed run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoiSource {
    RawCache,
    Api,
}

/// Result of [`run_ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The processed dataset already existed and was left untouched.
    Reused,
    /// The processed dataset was (re)written.
    Processed { stations: usize, source: PoiSource },
}

/// Produces the processed station dataset.
///
/// Without `force_refresh`, an existing processed dataset is reused and an
/// existing raw cache spares the API call. Fresh API responses are cached
/// only once they flattened into at least one station.
///
/// # Errors
///
/// Returns [`PipelineError::Upstream`] if the API fails or the POIs yield no
/// stations; nothing is written in that case.
pub async fn run_ingest(
    store: Arc<dyn ObjectStore>,
    client: &OpenChargeMapClient,
    settings: &IngestSettings,
    force_refresh: bool,
) -> PipelineResult<IngestOutcome> {
    let dataset = StationDataset::new(Arc::clone(&store));
    let raw_cache = RawResponseCache::new(store);

    if !force_refresh && dataset.exists().await? {
        info!(path = PROCESSED_DATASET_PATH, "Using existing processed data");
        return Ok(IngestOutcome::Reused);
    }

    let cached = if force_refresh {
        None
    } else {
        raw_cache.load(&settings.countrycode).await?
    };

    let (pois, source) = if let Some(pois) = cached {
        info!(
            path = %RawResponseCache::path_for(&settings.countrycode),
            pois = pois.len(),
            "Loaded cached raw JSON"
        );
        (pois, PoiSource::RawCache)
    } else {
        let pois = client
            .fetch_pois(
                &settings.countrycode,
                settings.maxresults,
                settings.opendata,
                settings.api_key.as_deref(),
            )
            .await?;

        (pois, PoiSource::Api)
    };

    let records = flatten_pois(&pois);
    if records.is_empty() {
        return Err(PipelineError::Upstream(format!(
            "{} POIs yielded no usable stations",
            pois.len()
        )));
    }

    if source == PoiSource::Api {
        let path = raw_cache.save(&settings.countrycode, &pois).await?;
        info!(path = %path, "Cached raw JSON");
    }
    dataset.write_records(&records).await?;

    Ok(IngestOutcome::Processed {
        stations: records.len(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use datastore::{object_exists, read_optional};
    use object_store::memory::InMemory;
    use serde_json::{Value, json};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn sample_pois() -> Value {
        json!([
            {
                "ID": 1,
                "StatusTypeID": 50,
                "AddressInfo": {"Town": "Berlin", "StateOrProvince": "Berlin"},
                "Connections": [{"PowerKW": 150.0, "CurrentTypeID": 30}]
            },
            {
                "ID": 2,
                "StatusTypeID": 150,
                "AddressInfo": {"Town": "Potsdam", "StateOrProvince": "Brandenburg"},
                "Connections": [{"PowerKW": 22.0, "CurrentTypeID": 20}, {"PowerKW": 22.0}]
            }
        ])
    }

    fn settings_for(server: &MockServer) -> (OpenChargeMapClient, IngestSettings) {
        let settings = IngestSettings {
            base_url: format!("{}/v3/poi/", server.uri()),
            ..IngestSettings::default()
        };
        let client = OpenChargeMapClient::new(settings.base_url.clone()).expect("client");
        (client, settings)
    }

    #[tokio::test]
    async fn test_empty_upstream_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        let (client, settings) = settings_for(&server);
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());

        let err = run_ingest(Arc::clone(&store), &client, &settings, false)
            .await
            .expect_err("no POIs");

        assert!(matches!(err, PipelineError::Upstream(_)));
        assert!(
            !object_exists(store.as_ref(), &RawResponseCache::path_for("DE"))
                .await
                .expect("exists")
        );
        assert!(
            !object_exists(store.as_ref(), PROCESSED_DATASET_PATH)
                .await
                .expect("exists")
        );
    }

    #[tokio::test]
    async fn test_rerun_reuses_and_refresh_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_pois()))
            .expect(2)
            .mount(&server)
            .await;
        let (client, settings) = settings_for(&server);
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let dataset = StationDataset::new(Arc::clone(&store));

        let first = run_ingest(Arc::clone(&store), &client, &settings, false)
            .await
            .expect("first run");
        assert_eq!(
            first,
            IngestOutcome::Processed {
                stations: 2,
                source: PoiSource::Api
            }
        );
        let first_records = dataset.read_records().await.expect("read");
        let first_bytes = read_optional(store.as_ref(), PROCESSED_DATASET_PATH)
            .await
            .expect("read")
            .expect("dataset written");

        let second = run_ingest(Arc::clone(&store), &client, &settings, false)
            .await
            .expect("second run");
        assert_eq!(second, IngestOutcome::Reused);
        let reused_bytes = read_optional(store.as_ref(), PROCESSED_DATASET_PATH)
            .await
            .expect("read")
            .expect("dataset kept");
        assert_eq!(reused_bytes, first_bytes);

        run_ingest(Arc::clone(&store), &client, &settings, true)
            .await
            .expect("refresh");
        let refreshed_bytes = read_optional(store.as_ref(), PROCESSED_DATASET_PATH)
            .await
            .expect("read")
            .expect("dataset rewritten");
        assert_eq!(refreshed_bytes, first_bytes);
        assert_eq!(dataset.read_records().await.expect("read"), first_records);
    }

    #[tokio::test]
    async fn test_unusable_pois_are_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([1, "x", {"NoId": true}])),
            )
            .expect(1)
            .mount(&server)
            .await;
        let (client, settings) = settings_for(&server);
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());

        let err = run_ingest(Arc::clone(&store), &client, &settings, false)
            .await
            .expect_err("no usable stations");

        assert!(matches!(err, PipelineError::Upstream(_)));
        assert!(
            !object_exists(store.as_ref(), &RawResponseCache::path_for("DE"))
                .await
                .expect("exists")
        );
        assert!(
            !object_exists(store.as_ref(), PROCESSED_DATASET_PATH)
                .await
                .expect("exists")
        );
    }

    #[tokio::test]
    async fn test_raw_cache_spares_the_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        let (client, settings) = settings_for(&server);
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());

        let Value::Array(pois) = sample_pois() else {
            panic!("sample should be an array");
        };
        RawResponseCache::new(Arc::clone(&store))
            .save("DE", &pois)
            .await
            .expect("seed cache");

        let outcome = run_ingest(Arc::clone(&store), &client, &settings, false)
            .await
            .expect("ingest from cache");
        assert_eq!(
            outcome,
            IngestOutcome::Processed {
                stations: 2,
                source: PoiSource::RawCache
            }
        );

        let records = StationDataset::new(store)
            .read_records()
            .await
            .expect("read");
        assert_eq!(records[0].charger_type, station_structs::ChargerType::DC);
        assert_eq!(records[1].num_connectors, 2);
    }
}
