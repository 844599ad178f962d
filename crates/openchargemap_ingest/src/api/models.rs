//! API response types for the Open Charge Map POI endpoint.
//!
//! Only the fields the pipeline reads are modelled. Every field is optional
//! because compact responses omit whatever is unknown.

use serde::{Deserialize, Serialize};

/// One point of interest (a charging location).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Poi {
    /// Open Charge Map POI id
    #[serde(rename = "ID")]
    pub id: Option<i64>,

    #[serde(rename = "UsageTypeID")]
    pub usage_type_id: Option<i64>,

    #[serde(rename = "StatusTypeID")]
    pub status_type_id: Option<i64>,

    pub address_info: Option<AddressInfo>,

    pub connections: Option<Vec<Connection>>,
}

/// Location block of a POI.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressInfo {
    pub title: Option<String>,

    pub town: Option<String>,

    pub state_or_province: Option<String>,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    /// Only present in non-compact responses
    pub country: Option<Country>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Country {
    #[serde(rename = "ISOCode")]
    pub iso_code: Option<String>,
}

/// One connector of a POI.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Connection {
    #[serde(rename = "PowerKW")]
    pub power_kw: Option<f64>,

    #[serde(rename = "CurrentTypeID")]
    pub current_type_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parses_compact_poi() {
        let value = json!({
            "ID": 12345,
            "UsageTypeID": 1,
            "StatusTypeID": 50,
            "AddressInfo": {
                "Title": "Alexanderplatz",
                "Town": "Berlin",
                "StateOrProvince": "Berlin",
                "Latitude": 52.52,
                "Longitude": 13.41,
                "CountryID": 87
            },
            "Connections": [
                {"PowerKW": 150.0, "CurrentTypeID": 30},
                {"PowerKW": null, "CurrentTypeID": null}
            ]
        });

        let poi: Poi = serde_json::from_value(value).expect("should parse");
        assert_eq!(poi.id, Some(12345));
        assert_eq!(poi.status_type_id, Some(50));

        let address = poi.address_info.expect("address");
        assert_eq!(address.town.as_deref(), Some("Berlin"));
        assert!(address.country.is_none());

        let connections = poi.connections.expect("connections");
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].current_type_id, Some(30));
        assert!(connections[1].power_kw.is_none());
    }

    #[test]
    fn test_missing_blocks_default_to_none() {
        let poi: Poi = serde_json::from_value(json!({"ID": 1})).expect("should parse");
        assert!(poi.address_info.is_none());
        assert!(poi.connections.is_none());
    }
}
