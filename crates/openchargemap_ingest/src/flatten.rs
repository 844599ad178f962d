//! Flattening of nested POI JSON into station records.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use station_structs::{ChargerType, CityType, StationRecord, StationStatus};
use tracing::{debug, warn};

use crate::api::models::Poi;
use crate::label::SessionLabeler;

/// Flattens raw POIs into labelled station records.
///
/// POIs without an id are dropped and duplicate ids keep their first
/// occurrence. `city_type` is bucketed by how many stations of the batch
/// share a town. Labels come from a freshly seeded [`SessionLabeler`], so the
/// same input always yields the same records.
#[must_use]
pub fn flatten_pois(pois: &[Value]) -> Vec<StationRecord> {
    let mut seen_ids = HashSet::new();
    let mut kept: Vec<(i64, Poi)> = Vec::with_capacity(pois.len());

    for (index, value) in pois.iter().enumerate() {
        let poi: Poi = match serde_json::from_value(value.clone()) {
            Ok(poi) => poi,
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed POI");
                continue;
            }
        };

        let Some(id) = poi.id else {
            debug!(index, "Skipping POI without ID");
            continue;
        };

        if seen_ids.insert(id) {
            kept.push((id, poi));
        }
    }

    let mut stations_per_town: HashMap<String, usize> = HashMap::new();
    for (_, poi) in &kept {
        if let Some(town) = poi.address_info.as_ref().and_then(|a| a.town.as_ref()) {
            *stations_per_town.entry(town.clone()).or_default() += 1;
        }
    }

    let mut labeler = SessionLabeler::default();

    kept.into_iter()
        .map(|(station_id, poi)| {
            let address = poi.address_info.unwrap_or_default();
            let connections = poi.connections.unwrap_or_default();

            let num_connectors = connections.len() as i64;
            let power_kw = connections
                .iter()
                .map(|c| c.power_kw.unwrap_or(0.0))
                .fold(0.0, f64::max);
            let current_type_ids: Vec<i64> =
                connections.iter().filter_map(|c| c.current_type_id).collect();

            let town_size = address
                .town
                .as_ref()
                .and_then(|town| stations_per_town.get(town))
                .copied()
                .unwrap_or(0);

            let sessions_per_day = labeler.label(power_kw, num_connectors, poi.status_type_id);

            StationRecord {
                station_id,
                title: address.title,
                country: address.country.and_then(|c| c.iso_code),
                region: address.state_or_province,
                town: address.town,
                city_type: CityType::from_station_density(town_size),
                charger_type: ChargerType::classify(&current_type_ids, power_kw),
                latitude: address.latitude,
                longitude: address.longitude,
                num_connectors,
                power_kw,
                usage_type_id: poi.usage_type_id,
                status_type_id: poi.status_type_id,
                status: StationStatus::from_status_type_id(poi.status_type_id),
                sessions_per_day,
            }
        })
        .collect()
}
