#![allow(dead_code)]

use geo_service::config::{DatabaseConfig, GeoConfig, StoreBackend};
use geo_service::services::{DeletePolicy, GeoStore, MemoryStore, PgStore};
use geo_service::startup::Application;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

pub const ROOT_USER_ID: &str = "root-user-1";
pub const PLAIN_USER_ID: &str = "user-42";

pub fn test_config(store: StoreBackend) -> GeoConfig {
    GeoConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            ..CoreConfig::default()
        },
        environment: "test".to_string(),
        service_name: "geo-service".to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        log_level: "info".to_string(),
        otlp_endpoint: None,
        store,
        database: DatabaseConfig {
            url: std::env::var("TEST_DATABASE_URL").unwrap_or_default(),
            max_connections: 5,
            min_connections: 1,
        },
        delete_policy: DeletePolicy::Reject,
        seed_file: None,
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: Client,
}

impl TestApp {
    /// Spawn the service on a fresh in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with(
            test_config(StoreBackend::Memory),
            Arc::new(MemoryStore::new()),
        )
        .await
    }

    /// Spawn against `TEST_DATABASE_URL`; the caller owns cleanup.
    pub async fn spawn_postgres() -> Self {
        let config = test_config(StoreBackend::Postgres);
        let store = PgStore::connect(&config.database.url, 5, 1)
            .await
            .expect("Failed to connect to test database");
        store.run_migrations().await.expect("Failed to migrate");
        sqlx::query("TRUNCATE node_movements, geo_nodes")
            .execute(store.pool())
            .await
            .expect("Failed to reset test database");
        Self::spawn_with(config, Arc::new(store)).await
    }

    pub async fn spawn_with(config: GeoConfig, store: Arc<dyn GeoStore>) -> Self {
        let app = Application::build_with_store(config, store)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    fn as_root(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-User-ID", ROOT_USER_ID)
            .header("X-User-Role", "ROOT")
    }

    pub async fn post_node(&self, body: &Value) -> Response {
        self.as_root(self.client.post(format!("{}/admin/geo/nodes", self.address)))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put_node(&self, body: &Value) -> Response {
        self.as_root(self.client.put(format!("{}/admin/geo/nodes", self.address)))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete_node(&self, body: &Value) -> Response {
        self.as_root(self.client.delete(format!("{}/admin/geo/nodes", self.address)))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn move_node(&self, body: &Value) -> Response {
        self.as_root(self.client.put(format!("{}/admin/geo/nodes/move", self.address)))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_as_root(&self, path: &str) -> Response {
        self.as_root(self.client.get(format!("{}{}", self.address, path)))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Add a node and return its JSON representation.
    pub async fn add(&self, body: Value) -> Value {
        let response = self.post_node(&body).await;
        assert_eq!(response.status().as_u16(), 201, "add failed for {}", body);
        let body: Value = response.json().await.expect("Failed to parse JSON");
        body["node"].clone()
    }
}
