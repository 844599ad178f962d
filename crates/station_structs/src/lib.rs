//! Common structs for charging-station data shared across crates.

mod error;
mod metadata;
mod prediction;
mod station;

pub use error::*;
pub use metadata::*;
pub use prediction::*;
pub use station::*;
