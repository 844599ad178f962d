//! Synthetic utilization label.
//!
//! There is no public ground truth for charging sessions, so the target is a
//! proxy built from power, connector count and operational status plus
//! seeded noise.

use rand::{Rng as _, SeedableRng as _};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use station_structs::STATUS_OPERATIONAL_ID;

/// Seed of the label noise generator.
pub const LABEL_SEED: u64 = 42;

const NOISE_STD: f64 = 1.5;

/// Noise is clamped to three standard deviations.
const NOISE_BOUND: f64 = 3.0 * NOISE_STD;

const OPERATIONAL_FACTOR: f64 = 1.2;
const OTHER_STATUS_FACTOR: f64 = 0.7;

/// Computes the label from station attributes and a noise draw.
///
/// The result is clipped at zero and rounded to one decimal.
#[must_use]
pub fn synthetic_sessions(
    power_kw: f64,
    num_connectors: i64,
    status_type_id: Option<i64>,
    noise: f64,
) -> f64 {
    let base = power_kw / 10.0 + num_connectors as f64 * 0.8;
    let factor = if status_type_id == Some(STATUS_OPERATIONAL_ID) {
        OPERATIONAL_FACTOR
    } else {
        OTHER_STATUS_FACTOR
    };

    let value = (base * factor + noise).max(0.0);
    (value * 10.0).round() / 10.0
}

/// Deterministic label generator: one noise draw per labelled station.
pub struct SessionLabeler {
    rng: ChaCha8Rng,
}

impl SessionLabeler {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn next_noise(&mut self) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        (z * NOISE_STD).clamp(-NOISE_BOUND, NOISE_BOUND)
    }

    /// Labels the next station.
    pub fn label(&mut self, power_kw: f64, num_connectors: i64, status_type_id: Option<i64>) -> f64 {
        let noise = self.next_noise();
        synthetic_sessions(power_kw, num_connectors, status_type_id, noise)
    }
}

impl Default for SessionLabeler {
    fn default() -> Self {
        Self::new(LABEL_SEED)
    }
}
