use crate::config::{GeoConfig, StoreBackend};
use crate::handlers;
use crate::middleware::metrics_middleware;
use crate::services::seed::{load_seed_file, seed};
use crate::services::{GeoStore, GeoTreeService, MemoryStore, PgStore};
use axum::{
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: GeoConfig,
    pub geo: GeoTreeService,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: GeoConfig) -> Result<Self, AppError> {
        let store = connect_store(&config).await.map_err(|e| {
            tracing::error!("Failed to initialize geo store: {}", e);
            e
        })?;
        Self::build_with_store(config, store).await
    }

    /// Build on an already prepared store.
    pub async fn build_with_store(
        config: GeoConfig,
        store: Arc<dyn GeoStore>,
    ) -> Result<Self, AppError> {
        let geo = GeoTreeService::new(store, config.delete_policy);
        geo.ensure_roots().await?;

        if let Some(path) = &config.seed_file {
            let document = load_seed_file(path).await?;
            seed(geo.store().as_ref(), &document).await?;
        }

        let state = AppState {
            config: config.clone(),
            geo,
        };

        let app = build_router(state.clone());

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port = port,
            store = state.geo.store().backend(),
            delete_policy = ?config.delete_policy,
            "Listening on {}",
            port
        );

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn geo(&self) -> &GeoTreeService {
        &self.state.geo
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn connect_store(config: &GeoConfig) -> Result<Arc<dyn GeoStore>, AppError> {
    match config.store {
        StoreBackend::Postgres => {
            let store = PgStore::connect(
                &config.database.url,
                config.database.max_connections,
                config.database.min_connections,
            )
            .await?;
            store.run_migrations().await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory geo store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route(
            "/nodes",
            post(handlers::add_node)
                .put(handlers::update_node)
                .delete(handlers::delete_node),
        )
        .route("/nodes/move", put(handlers::move_node))
        .route("/nodes/:id", get(handlers::get_node))
        .route("/nodes/:id/history", get(handlers::node_history))
        .route("/all-locations", get(handlers::all_locations));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/geo/provinces", get(handlers::provinces))
        .route("/geo/districts", get(handlers::districts))
        .nest("/admin/geo", admin)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
