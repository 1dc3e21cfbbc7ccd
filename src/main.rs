use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod config;
mod error;
mod routes;
mod service;
mod upstream;

use cache::{Clock, SystemClock};
use config::Config;
use routes::{create_router, AppState};
use service::{SunCache, SunService};
use upstream::{
    mock::{MockGeocoder, MockSunDataSource},
    nominatim::NominatimClient,
    sunrise_sunset::SunriseSunsetClient,
    Geocoder, SunDataSource,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sun_aggregator_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let (geocoder, sun_source): (Arc<dyn Geocoder>, Arc<dyn SunDataSource>) =
        if config.use_mock_upstream {
            tracing::warn!("USE_MOCK_UPSTREAM is set, serving generated data");
            (
                Arc::new(MockGeocoder::new()),
                Arc::new(MockSunDataSource::new()),
            )
        } else {
            (
                Arc::new(NominatimClient::new(&config)?),
                Arc::new(SunriseSunsetClient::new(&config)?),
            )
        };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(SunCache::new(config.cache_ttl_seconds, clock.clone()));
    tracing::info!("Result cache TTL is {}s", config.cache_ttl_seconds);

    let sun_service = Arc::new(SunService::new(cache, geocoder, sun_source, clock));

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        config: Arc::new(config),
        sun_service,
    };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
