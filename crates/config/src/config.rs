//! Configuration loading and object store construction.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use object_store::ObjectStore;
use object_store::local::LocalFileSystem;

/// Default Open Charge Map POI endpoint.
pub const DEFAULT_OPENCHARGEMAP_URL: &str = "https://api.openchargemap.io/v3/poi/";

/// Settings for the Open Charge Map ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    /// ISO country code passed as `countrycode`.
    pub countrycode: String,

    /// Maximum number of POIs requested.
    pub maxresults: u32,

    /// Restrict results to open-data licensed POIs.
    pub opendata: bool,

    /// Optional Open Charge Map API key.
    pub api_key: Option<String>,

    /// POI endpoint, overridable for tests and mirrors.
    pub base_url: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            countrycode: String::from("DE"),
            maxresults: 2000,
            opendata: true,
            api_key: None,
            base_url: String::from(DEFAULT_OPENCHARGEMAP_URL),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding `data/` and `models/`.
    pub data_root: PathBuf,

    /// Open Charge Map ingest settings.
    pub ingest: IngestSettings,

    /// Address the prediction API listens on.
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// Optional environment variables:
    /// - `EV_DATA_ROOT`: root directory for datasets and models (default: `.`)
    /// - `INGEST_COUNTRYCODE`: country to ingest (default: `DE`)
    /// - `INGEST_MAXRESULTS`: max POIs to fetch (default: `2000`)
    /// - `INGEST_OPENDATA`: `true`/`false` (default: `true`)
    /// - `OPENCHARGEMAP_API_KEY`: API key, sent only when set
    /// - `OPENCHARGEMAP_BASE_URL`: POI endpoint override
    /// - `API_BIND_ADDR`: listen address (default: `0.0.0.0:8000`)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = IngestSettings::default();

        let data_root = lookup("EV_DATA_ROOT").map_or_else(|| PathBuf::from("."), PathBuf::from);

        let maxresults = match lookup("INGEST_MAXRESULTS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("INGEST_MAXRESULTS is not a number: {raw}"))?,
            None => defaults.maxresults,
        };

        let opendata = lookup("INGEST_OPENDATA").map_or(defaults.opendata, |raw| {
            raw.eq_ignore_ascii_case("true")
        });

        let bind_raw = lookup("API_BIND_ADDR").unwrap_or_else(|| String::from("0.0.0.0:8000"));
        let bind_addr = bind_raw
            .parse()
            .with_context(|| format!("API_BIND_ADDR is not a socket address: {bind_raw}"))?;

        Ok(Self {
            data_root,
            ingest: IngestSettings {
                countrycode: lookup("INGEST_COUNTRYCODE").unwrap_or(defaults.countrycode),
                maxresults,
                opendata,
                api_key: lookup("OPENCHARGEMAP_API_KEY").filter(|key| !key.is_empty()),
                base_url: lookup("OPENCHARGEMAP_BASE_URL").unwrap_or(defaults.base_url),
            },
            bind_addr,
        })
    }
}

/// Creates the local object store rooted at `root`.
///
/// The directory is created if it does not exist. Writes through this store
/// go to a temporary file first and are renamed into place.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or opened.
pub fn build_object_store(root: &Path) -> Result<Arc<dyn ObjectStore>> {
    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create data root {}", root.display()))?;

    let store = LocalFileSystem::new_with_prefix(root)
        .with_context(|| format!("Failed to open object store at {}", root.display()))?;

    Ok(Arc::new(store))
}
