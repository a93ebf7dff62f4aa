//! # memberctl: a paginated member directory
//!
//! `memberctl` serves a directory of members, optionally grouped into teams, over HTTP. Its main
//! job is listing: `GET /members` and `GET /teams` return one page of a sorted result set together
//! with the metadata a client needs to walk the rest (total count, page count, first/last flags).
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer.
//! Persistence goes through the [`store::Store`] trait, which has two backends:
//!
//! - an external PostgreSQL database, accessed with SQLx repositories in [`db::handlers`]
//! - a process-local in-memory store, used when no database is configured and in tests
//!
//! ### Request Flow
//!
//! A listing request arrives with raw `page`, `size` and `sort` query parameters. The
//! [`listing`] service validates them into a [`api::models::pagination::PageRequest`] (rejecting
//! bad input before the store is touched), then asks the store for the page content and the
//! total count concurrently, and projects each record into its response shape.
//!
//! Writes (`POST`, `PATCH`, `DELETE`) are attributed to the actor named in a configurable request
//! header. The store stamps creation and modification metadata from that actor; handlers never set
//! audit fields themselves.
//!
//! ### Start-up
//!
//! [`Application::new`] builds the store (running migrations for PostgreSQL), seeds sample members
//! into an empty store when enabled, and assembles the router. [`Application::serve`] binds the
//! listener and runs until the shutdown future resolves.
//!
//! ## Configuration
//!
//! See [`config`] for the YAML file and `MEMBERCTL_` environment variables.
pub mod api;
pub mod audit;
pub mod config;
pub mod db;
pub mod errors;
pub mod listing;
mod openapi;
pub mod seed;
pub mod store;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::config::{CorsOrigin, DatabaseConfig};
use crate::openapi::ApiDoc;
use crate::store::{InMemoryStore, PostgresStore, Store};
use axum::http::HeaderValue;
use axum::{Json, Router, http, routing::get};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{MemberId, TeamId};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .store(Arc::new(InMemoryStore::new()))
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
}

/// Get the memberctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build the configured store. For PostgreSQL this connects the pool and runs migrations; the
/// pool is returned as well so it can be closed on shutdown.
#[instrument(skip_all)]
async fn setup_store(config: &Config) -> anyhow::Result<(Arc<dyn Store>, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::Memory => {
            info!("Using in-memory store: data will be lost on shutdown");
            Ok((Arc::new(InMemoryStore::new()), None))
        }
        DatabaseConfig::External { url, pool } => {
            info!(
                max_connections = pool.max_connections,
                min_connections = pool.min_connections,
                "Using external database"
            );
            let pg_pool = PgPoolOptions::new()
                .max_connections(pool.max_connections)
                .min_connections(pool.min_connections)
                .acquire_timeout(pool.acquire_timeout)
                .connect(url)
                .await?;
            migrator().run(&pg_pool).await?;

            Ok((Arc::new(PostgresStore::new(pg_pool.clone())), Some(pg_pool)))
        }
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    // A wildcard anywhere in the list allows every origin
    let allow_origin = if config.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION, http::header::RETRY_AFTER]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// Besides the member and team routes this serves `/healthz`, the OpenAPI document, the Scalar
/// docs UI and, when `enable_metrics` is set, Prometheus metrics at `/internal/metrics`.
///
/// # Errors
///
/// Returns an error if the CORS configuration produces an invalid header value.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route(
            "/members",
            get(api::handlers::members::list_members).post(api::handlers::members::create_member),
        )
        .route(
            "/members/{id}",
            get(api::handlers::members::get_member)
                .patch(api::handlers::members::update_member)
                .delete(api::handlers::members::delete_member),
        )
        .route("/teams", get(api::handlers::teams::list_teams).post(api::handlers::teams::create_team))
        .route(
            "/teams/{id}",
            get(api::handlers::teams::get_team)
                .patch(api::handlers::teams::update_team)
                .delete(api::handlers::teams::delete_team),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled service: store, state and router.
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting memberctl with configuration: {:#?}", config);

        let (store, pool) = setup_store(&config).await?;

        if config.seed.enabled {
            seed::seed_members(store.as_ref(), &config.seed).await?;
        }

        let app_state = AppState::builder().store(store).config(config.clone()).build();
        let router = build_router(app_state.clone())?;

        Ok(Self {
            router,
            app_state,
            config,
            pool,
        })
    }

    /// The store this application serves from.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.app_state.store
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> anyhow::Result<axum_test::TestServer> {
        axum_test::TestServer::new(self.router.into_make_service())
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            backend = self.app_state.store.backend(),
            "memberctl listening on http://{}, available at http://localhost:{}", bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
