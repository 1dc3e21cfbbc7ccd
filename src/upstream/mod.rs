pub mod mock;
pub mod nominatim;
pub mod sunrise_sunset;
pub mod types;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;
use crate::error::AppError;
use types::{Coordinates, SunTimes};

const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Resolves a city name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Fails with `AppError::CityNotFound` when nothing matches.
    async fn coordinates(&self, city: &str) -> Result<Coordinates, AppError>;
}

/// Provides daylight data for one calendar day at a location.
#[async_trait]
pub trait SunDataSource: Send + Sync {
    async fn day(&self, lat: &str, lon: &str, date: NaiveDate) -> Result<SunTimes, AppError>;
}

pub fn build_http_client(config: &Config) -> Result<Client, AppError> {
    Client::builder()
        .user_agent(config.http_user_agent.as_str())
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// GETs `url` and returns the JSON body, backing off on HTTP 429.
pub(crate) async fn get_json_with_retry(
    client: &Client,
    url: &str,
    params: &[(&str, &str)],
    initial_delay: Duration,
) -> Result<Value, AppError> {
    let mut retry_count = 0;
    let mut delay = initial_delay;

    loop {
        let response = client.get(url).query(params).send().await?;

        match response.status() {
            status if status.is_success() => {
                let json: Value = response.json().await?;
                return Ok(json);
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                if retry_count >= MAX_RATE_LIMIT_RETRIES {
                    return Err(AppError::UpstreamApi(format!(
                        "Rate limited by {} after {} retries",
                        url, retry_count
                    )));
                }

                tracing::warn!(
                    "Rate limited by {}, retrying in {}ms",
                    url,
                    delay.as_millis()
                );

                sleep(delay).await;
                delay = delay.mul_f32(2.0 + fastrand::f32() * 0.5); // backoff with jitter
                retry_count += 1;
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                return Err(AppError::UpstreamApi(format!(
                    "HTTP {}: {}",
                    status, error_text
                )));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `router` on an ephemeral local port and returns its base URL.
    pub async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
