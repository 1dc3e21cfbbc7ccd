use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;

use super::types::{SunTimes, SunriseSunsetResponse};
use super::{build_http_client, get_json_with_retry, SunDataSource};
use crate::config::Config;
use crate::error::AppError;

/// Client for the sunrise-sunset.org JSON API.
pub struct SunriseSunsetClient {
    client: Client,
    url: String,
    retry_delay: Duration,
}

impl SunriseSunsetClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_http_client(config)?,
            url: format!("{}{}", config.sun_api_base_url, config.sun_api_path),
            retry_delay: Duration::from_millis(1000),
        })
    }
}

#[async_trait]
impl SunDataSource for SunriseSunsetClient {
    async fn day(&self, lat: &str, lon: &str, date: NaiveDate) -> Result<SunTimes, AppError> {
        let date = date.format("%Y-%m-%d").to_string();
        let response = get_json_with_retry(
            &self.client,
            &self.url,
            &[
                ("lat", lat),
                ("lng", lon),
                ("date", date.as_str()),
                ("formatted", "0"),
            ],
            self.retry_delay,
        )
        .await?;

        let envelope: SunriseSunsetResponse = serde_json::from_value(response)?;
        if envelope.status != "OK" {
            return Err(AppError::UpstreamApi(format!(
                "sunrise-sunset API returned status {} for {}",
                envelope.status, date
            )));
        }

        Ok(serde_json::from_value(envelope.results)?)
    }
}
