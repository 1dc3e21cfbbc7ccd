use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Coordinates exactly as the geocoder reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: String,
    pub lon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Daylight figures for one day. Fields the service does not model are kept
/// in `extra` so nothing the upstream returns is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: String,
    pub sunset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solar_noon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_length: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub civil_twilight_begin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub civil_twilight_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nautical_twilight_begin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nautical_twilight_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub astronomical_twilight_begin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub astronomical_twilight_end: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySunData {
    pub date: String,
    pub sun_data: SunTimes,
}

/// The merged response for one request. Serialized as-is by `/sun`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub city: String,
    pub coordinates: Coordinates,
    pub date_range: DateRange,
    pub sun: Vec<DaySunData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// `results` is an object on success and an empty string on failure, so it is
/// only decoded into `SunTimes` after `status` has been checked.
#[derive(Debug, Clone, Deserialize)]
pub struct SunriseSunsetResponse {
    pub status: String,
    #[serde(default)]
    pub results: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sun_times_keeps_unknown_fields() {
        let raw = r#"{
            "sunrise": "2024-06-01T02:46:51+00:00",
            "sunset": "2024-06-01T19:19:27+00:00",
            "solar_noon": "2024-06-01T11:03:09+00:00",
            "day_length": 59556,
            "civil_twilight_end": "2024-06-01T20:08:18+00:00",
            "moon_phase": "waxing"
        }"#;

        let times: SunTimes = serde_json::from_str(raw).unwrap();
        assert_eq!(times.sunrise, "2024-06-01T02:46:51+00:00");
        assert_eq!(times.day_length, Some(Value::from(59556)));
        assert_eq!(times.extra.get("moon_phase"), Some(&Value::from("waxing")));
        assert!(times.nautical_twilight_begin.is_none());

        let back = serde_json::to_value(&times).unwrap();
        assert_eq!(back["moon_phase"], "waxing");
        assert_eq!(back["civil_twilight_end"], "2024-06-01T20:08:18+00:00");
        assert!(back.get("nautical_twilight_begin").is_none());
    }

    #[test]
    fn test_sunrise_sunset_error_envelope_parses() {
        let raw = r#"{"results": "", "status": "INVALID_DATE"}"#;
        let parsed: SunriseSunsetResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, "INVALID_DATE");
        assert_eq!(parsed.results, Value::from(""));

        let raw = r#"{"status": "INVALID_REQUEST"}"#;
        let parsed: SunriseSunsetResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.results.is_null());
    }
}
