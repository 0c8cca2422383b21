//! Server lifecycle with deferred startup.
//!
//! `new()` allocates shared state, `start()` binds the listener, and
//! `serve()` accepts requests until the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    building_detail_handler, count_handler, detail_handler, element_view_handler,
    elements_handler, gwp_handler, health_handler, list_buildings_handler, list_handler,
    liveness_handler, materials_handler, readiness_handler, AppState,
};
use super::middleware::{apply_http_layers, track_in_flight};
use super::shutdown::ShutdownController;
use crate::service::ListQueryService;

/// Assembles the router with every route and the middleware stack.
///
/// Routes:
/// - `GET /health`, `/health/live`, `/health/ready`
/// - `GET /api/{resource}` list query, `GET /api/{resource}/{id}` detail
/// - `GET /api/count/{resource}`
/// - `GET /api/buildings/{id}/elements[/{level}]`, `/materials`, `/gwp`
///
/// Only `/api` routes count as in-flight work for draining.
pub fn build_router(state: AppState, config: &NetworkConfig) -> Router {
    let api = Router::new()
        .route("/api/count/{resource}", get(count_handler))
        .route("/api/buildings", get(list_buildings_handler))
        .route("/api/buildings/{id}", get(building_detail_handler))
        .route("/api/buildings/{id}/elements", get(elements_handler))
        .route(
            "/api/buildings/{id}/elements/{level}",
            get(element_view_handler),
        )
        .route("/api/buildings/{id}/materials", get(materials_handler))
        .route("/api/buildings/{id}/gwp", get(gwp_handler))
        .route("/api/{resource}", get(list_handler))
        .route("/api/{resource}/{id}", get(detail_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state.shutdown),
            track_in_flight,
        ));

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .merge(api)
        .with_state(state);

    apply_http_layers(router, config)
}

/// Owns the listener and shutdown controller of the API server.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
    lists: Arc<ListQueryService>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, lists: Arc<ListQueryService>) -> Self {
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
            lists,
        }
    }

    /// Shared handle to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Binds the listener and returns the bound port (OS-assigned for port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        let port = listener.local_addr()?.port();
        info!(host = %self.config.host, port, "TCP listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then drains.
    ///
    /// After the signal the state becomes `Draining`, new API requests get
    /// 503, and in-flight ones get up to `drain_timeout` to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called or on a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;

        let state = AppState::new(Arc::clone(&self.shutdown), self.lists);
        let router = build_router(state, &self.config);

        self.shutdown.set_ready();
        info!("serving dashboard API");

        let ctrl = Arc::clone(&self.shutdown);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("shutdown requested, draining");
                ctrl.trigger_shutdown();
            })
            .await?;

        if self.shutdown.wait_for_drain(self.config.drain_timeout).await {
            info!("all requests drained");
        } else {
            warn!(
                in_flight = self.shutdown.in_flight_count(),
                "drain timeout expired"
            );
        }
        Ok(())
    }
}
