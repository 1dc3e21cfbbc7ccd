use chrono::NaiveDate;
use std::sync::Arc;

use crate::cache::{derive_key, CacheKey, Clock, TtlCache};
use crate::error::AppError;
use crate::upstream::types::{AggregatedResult, DateRange, DaySunData};
use crate::upstream::{Geocoder, SunDataSource};

pub type SunCache = TtlCache<CacheKey, Arc<AggregatedResult>>;

/// Serves `/sun` lookups: cache first, otherwise geocode and fetch every day
/// in the range, then remember the merged result.
pub struct SunService {
    cache: Arc<SunCache>,
    geocoder: Arc<dyn Geocoder>,
    sun_source: Arc<dyn SunDataSource>,
    clock: Arc<dyn Clock>,
}

impl SunService {
    pub fn new(
        cache: Arc<SunCache>,
        geocoder: Arc<dyn Geocoder>,
        sun_source: Arc<dyn SunDataSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            geocoder,
            sun_source,
            clock,
        }
    }

    pub fn cache(&self) -> &SunCache {
        &self.cache
    }

    /// Either the whole range is fetched and cached, or the first error is
    /// returned and the cache is left untouched.
    pub async fn resolve(
        &self,
        city: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Arc<AggregatedResult>, AppError> {
        let evicted = self.cache.sweep_expired(self.cache.ttl_seconds());
        if evicted > 0 {
            tracing::debug!("Swept {} expired cache entries", evicted);
        }

        let key = derive_key(city, start_date, end_date)?;
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {}", key);
            return Ok(cached);
        }
        tracing::debug!("Cache miss for {}", key);

        let (start, end) = self.resolve_range(start_date, end_date)?;
        let coordinates = self.geocoder.coordinates(key.city()).await?;

        let mut sun = Vec::new();
        for date in start.iter_days().take_while(|date| *date <= end) {
            let sun_data = self
                .sun_source
                .day(&coordinates.lat, &coordinates.lon, date)
                .await
                .map_err(|e| {
                    tracing::warn!("Sun data for {} on {} failed: {}", key, date, e);
                    e
                })?;
            sun.push(DaySunData {
                date: format_date(date),
                sun_data,
            });
        }

        let result = Arc::new(AggregatedResult {
            city: key.city().to_string(),
            coordinates,
            date_range: DateRange {
                start: format_date(start),
                end: format_date(end),
            },
            sun,
        });

        self.cache.put(key, result.clone());
        Ok(result)
    }

    /// A missing bound takes the value of the other one; with neither, the
    /// range is today (UTC).
    fn resolve_range(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<(NaiveDate, NaiveDate), AppError> {
        let start = start_date.map(parse_date).transpose()?;
        let end = end_date.map(parse_date).transpose()?;

        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            (Some(day), None) | (None, Some(day)) => (day, day),
            (None, None) => {
                let today = self.clock.now().date_naive();
                (today, today)
            }
        };

        if start > end {
            return Err(AppError::InvalidInput(
                "`startDate` cannot be after `endDate`.".to_string(),
            ));
        }
        Ok((start, end))
    }
}

/// Accepts only the zero-padded `YYYY-MM-DD` form. chrono alone also takes
/// `2024-6-1` or `+2024-06-01`, which would give one day several cache keys.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .filter(|date| format_date(*date) == raw)
        .ok_or_else(|| AppError::InvalidInput(format!("{:?} is not a YYYY-MM-DD date.", raw)))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
