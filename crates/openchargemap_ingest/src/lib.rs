//! Open Charge Map ingestion.
//!
//! Fetches charging-station POIs, flattens them into [`StationRecord`] rows
//! with a synthetic utilization label, and writes the processed dataset.
//!
//! [`StationRecord`]: station_structs::StationRecord

pub mod api;
mod flatten;
mod ingest;
mod label;

pub use api::client::OpenChargeMapClient;
pub use flatten::flatten_pois;
pub use ingest::{IngestOutcome, PoiSource, run_ingest};
pub use label::{LABEL_SEED, SessionLabeler, synthetic_sessions};
