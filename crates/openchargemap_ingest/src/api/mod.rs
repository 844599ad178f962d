//! Open Charge Map API client and response types.

pub mod client;
pub mod models;
