//! Test utilities for integration testing (available with `test-utils` feature).

use crate::config::{Config, DatabaseConfig, SeedConfig};
use crate::store::{InMemoryStore, Store};
use crate::{AppState, build_router};
use axum_test::TestServer;
use std::sync::Arc;

/// A router over an in-memory store, plus a handle on that store for direct assertions.
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryStore>,
}

/// Configuration for tests: in-memory store, no seeding, no metrics recorder.
pub fn create_test_config() -> Config {
    Config {
        database_url: None,
        database: DatabaseConfig::Memory,
        seed: SeedConfig {
            enabled: false,
            ..SeedConfig::default()
        },
        // The Prometheus recorder is process-global and can only be installed once
        enable_metrics: false,
        enable_otel_export: false,
        ..Config::default()
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_config(create_test_config()).await
}

pub async fn create_test_app_with_config(config: Config) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let server = create_test_server(store.clone(), config);

    TestApp { server, store }
}

/// A router over any store, e.g. a `PostgresStore` on a `#[sqlx::test]` pool.
pub fn create_test_server(store: Arc<dyn Store>, config: Config) -> TestServer {
    let state = AppState::builder().store(store).config(config).build();

    let router = build_router(state).expect("Failed to build router");
    TestServer::new(router.into_make_service()).expect("Failed to create test server")
}
