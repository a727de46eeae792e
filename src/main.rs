use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod config;
mod model;
mod providers;
mod routes;
mod service;

use cache::RouteCache;
use config::Config;
use providers::{
    mock::{MockProviderOne, MockProviderTwo},
    provider_one::ProviderOneClient,
    provider_two::ProviderTwoClient,
    ProviderOneApi, ProviderTwoApi,
};
use routes::{create_router, AppState};
use service::SearchService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "route_search_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let (provider_one, provider_two): (Arc<dyn ProviderOneApi>, Arc<dyn ProviderTwoApi>) =
        if config.use_mock_providers {
            tracing::info!("Using in-process mock providers");
            (Arc::new(MockProviderOne), Arc::new(MockProviderTwo))
        } else {
            let one_url = config
                .provider_one_base_url
                .as_deref()
                .ok_or("PROVIDER_ONE_BASE_URL not set")?;
            let two_url = config
                .provider_two_base_url
                .as_deref()
                .ok_or("PROVIDER_TWO_BASE_URL not set")?;
            (
                Arc::new(ProviderOneClient::new(one_url)),
                Arc::new(ProviderTwoClient::new(two_url)),
            )
        };

    // Initialize the route cache and its background sweeper
    let cache = Arc::new(RouteCache::new(config.filter_bounds));
    tokio::spawn(
        cache
            .clone()
            .run_sweeper(Duration::from_millis(config.sweep_interval_ms)),
    );

    let service = Arc::new(SearchService::new(
        provider_one,
        provider_two,
        cache,
        config.filter_bounds,
    ));

    // Create application state
    let state = AppState { service };

    let app: Router = create_router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
