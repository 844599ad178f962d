//! Ingest command - fetches stations and writes the processed dataset.

use std::sync::Arc;

use anyhow::Result;
use config::IngestSettings;
use object_store::ObjectStore;
use openchargemap_ingest::{IngestOutcome, OpenChargeMapClient, run_ingest};
use tracing::info;

/// Runs the ingest command.
///
/// # Errors
///
/// Returns an error if the API fails or the dataset cannot be written.
pub async fn run(
    store: Arc<dyn ObjectStore>,
    settings: &IngestSettings,
    force_refresh: bool,
) -> Result<()> {
    info!(
        countrycode = %settings.countrycode,
        maxresults = settings.maxresults,
        force_refresh,
        "Starting ingest"
    );

    let client = OpenChargeMapClient::new(settings.base_url.clone())?;

    match run_ingest(store, &client, settings, force_refresh).await? {
        IngestOutcome::Reused => {
            info!("Processed dataset already present; pass --refresh to rebuild it");
        }
        IngestOutcome::Processed { stations, source } => {
            info!(stations, ?source, "Ingest complete");
        }
    }

    Ok(())
}
