//! axum handlers of the dashboard API and the shared [`AppState`].

pub mod building;
pub mod error;
pub mod health;
pub mod list;

pub use building::{element_view_handler, elements_handler, gwp_handler, materials_handler};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use list::{
    building_detail_handler, count_handler, detail_handler, list_buildings_handler, list_handler,
};

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;
use crate::service::{BuildingService, ListQueryService};

/// State carried through `State` extraction. Cloning copies `Arc`s only.
#[derive(Clone)]
pub struct AppState {
    /// Readiness and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    pub lists: Arc<ListQueryService>,
    pub buildings: Arc<BuildingService>,
    /// Process start, for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(shutdown: Arc<ShutdownController>, lists: Arc<ListQueryService>) -> Self {
        Self {
            shutdown,
            buildings: Arc::new(BuildingService::new(Arc::clone(&lists))),
            lists,
            start_time: Instant::now(),
        }
    }
}
