use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::types::{Coordinates, NominatimPlace};
use super::{build_http_client, get_json_with_retry, Geocoder};
use crate::config::Config;
use crate::error::AppError;

/// Geocoder backed by the OpenStreetMap Nominatim search API.
pub struct NominatimClient {
    client: Client,
    search_url: String,
    retry_delay: Duration,
}

impl NominatimClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_http_client(config)?,
            search_url: format!(
                "{}{}",
                config.geocoding_base_url, config.geocoding_search_path
            ),
            retry_delay: Duration::from_millis(1000),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn coordinates(&self, city: &str) -> Result<Coordinates, AppError> {
        let response = get_json_with_retry(
            &self.client,
            &self.search_url,
            &[("city", city), ("format", "json")],
            self.retry_delay,
        )
        .await?;

        let places: Vec<NominatimPlace> = serde_json::from_value(response)?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| AppError::CityNotFound("City not found".to_string()))?;

        tracing::debug!(
            "Geocoded {:?} to {},{} ({})",
            city,
            place.lat,
            place.lon,
            place.display_name.as_deref().unwrap_or("unnamed")
        );

        Ok(Coordinates {
            lat: place.lat,
            lon: place.lon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::test_server;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn client_for(router: Router) -> NominatimClient {
        let base = test_server::spawn(router).await;
        let config = Config::from_lookup(|key| match key {
            "GEOCODING_BASE_URL" => Some(base.clone()),
            _ => None,
        })
        .unwrap();
        NominatimClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let router = Router::new().route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("format").map(String::as_str), Some("json"));
                let city = params.get("city").cloned().unwrap_or_default();
                Json(json!([
                    { "lat": "52.5170365", "lon": "13.3888599", "display_name": city },
                    { "lat": "0", "lon": "0", "display_name": "elsewhere" }
                ]))
            }),
        );
        let client = client_for(router).await;

        let coords = client.coordinates("Berlin").await.unwrap();
        assert_eq!(coords.lat, "52.5170365");
        assert_eq!(coords.lon, "13.3888599");
    }

    #[tokio::test]
    async fn test_empty_result_is_city_not_found() {
        let router = Router::new().route("/search", get(|| async { Json(Value::Array(vec![])) }));
        let client = client_for(router).await;

        let err = client.coordinates("Atlantis").await.unwrap_err();
        assert_eq!(err, AppError::CityNotFound("City not found".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_body_is_upstream_error() {
        let router = Router::new().route("/search", get(|| async { Json(json!({ "error": "nope" })) }));
        let client = client_for(router).await;

        let err = client.coordinates("Berlin").await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamApi(_)));
    }
}
