use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::types::{Coordinates, SunTimes};
use super::{Geocoder, SunDataSource};
use crate::error::AppError;

/// Offline geocoder with a fixed table of cities. Counts every call.
pub struct MockGeocoder {
    cities: HashMap<String, Coordinates>,
    calls: AtomicUsize,
}

impl MockGeocoder {
    pub fn new() -> Self {
        let cities = [
            ("Berlin", "52.5170365", "13.3888599"),
            ("Madrid", "40.4167047", "-3.7035825"),
            ("Lisbon", "38.7077507", "-9.1365919"),
            ("Reykjavik", "64.1459810", "-21.9422367"),
            ("Quito", "-0.2201641", "-78.5123274"),
        ]
        .into_iter()
        .map(|(name, lat, lon)| {
            (
                name.to_lowercase(),
                Coordinates {
                    lat: lat.to_string(),
                    lon: lon.to_string(),
                },
            )
        })
        .collect();

        Self {
            cities,
            calls: AtomicUsize::new(0),
        }
    }

    #[cfg(test)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn coordinates(&self, city: &str) -> Result<Coordinates, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cities
            .get(&city.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| AppError::CityNotFound("City not found".to_string()))
    }
}

/// Offline daylight source producing stable, date-dependent times. Dates in
/// `failing_dates` answer with an upstream error.
pub struct MockSunDataSource {
    failing_dates: HashSet<NaiveDate>,
    calls: AtomicUsize,
    requested: std::sync::Mutex<Vec<NaiveDate>>,
}

impl MockSunDataSource {
    pub fn new() -> Self {
        Self {
            failing_dates: HashSet::new(),
            calls: AtomicUsize::new(0),
            requested: std::sync::Mutex::new(Vec::new()),
        }
    }

    #[cfg(test)]
    pub fn failing_on(mut self, date: NaiveDate) -> Self {
        self.failing_dates.insert(date);
        self
    }

    #[cfg(test)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Dates in the order they were asked for.
    #[cfg(test)]
    pub fn requested(&self) -> Vec<NaiveDate> {
        self.requested
            .lock()
            .map(|dates| dates.clone())
            .unwrap_or_default()
    }
}

impl Default for MockSunDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SunDataSource for MockSunDataSource {
    async fn day(&self, _lat: &str, _lon: &str, date: NaiveDate) -> Result<SunTimes, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(date);
        }

        if self.failing_dates.contains(&date) {
            return Err(AppError::UpstreamApi(format!(
                "sunrise-sunset API returned status UNKNOWN_ERROR for {}",
                date
            )));
        }

        // Shift sunrise by up to 59 minutes across the year so days differ.
        let minute = date.ordinal() % 60;
        let day = date.format("%Y-%m-%d");
        let day_length = 12 * 3600 + i64::from(date.ordinal() % 120) * 60;

        Ok(SunTimes {
            sunrise: format!("{}T05:{:02}:00+00:00", day, minute),
            sunset: format!("{}T19:{:02}:00+00:00", day, minute),
            solar_noon: Some(format!("{}T12:{:02}:00+00:00", day, minute)),
            day_length: Some(Value::from(day_length)),
            civil_twilight_begin: Some(format!("{}T04:{:02}:00+00:00", day, minute)),
            civil_twilight_end: Some(format!("{}T20:{:02}:00+00:00", day, minute)),
            nautical_twilight_begin: None,
            nautical_twilight_end: None,
            astronomical_twilight_begin: None,
            astronomical_twilight_end: None,
            extra: BTreeMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_geocoder_is_case_insensitive() {
        let geocoder = MockGeocoder::new();
        let coords = geocoder.coordinates(" berlin ").await.unwrap();
        assert_eq!(coords.lat, "52.5170365");
        assert!(matches!(
            geocoder.coordinates("Atlantis").await,
            Err(AppError::CityNotFound(_))
        ));
        assert_eq!(geocoder.calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_sun_source_is_stable() {
        let source = MockSunDataSource::new();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let first = source.day("0", "0", date).await.unwrap();
        let second = source.day("0", "0", date).await.unwrap();
        assert_eq!(first, second);
        assert!(first.sunrise.starts_with("2024-06-01T05:"));
        assert_eq!(source.requested(), vec![date, date]);
    }
}
