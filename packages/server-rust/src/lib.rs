//! `lcadash` server: the list-query API of the building LCA dashboard.
//!
//! Requests flow `network` (axum handlers) -> `service` (list queries and
//! building drill-down) -> `query` (validated plans) -> `store` (rows).

pub mod catalog;
pub mod config;
pub mod network;
pub mod query;
pub mod service;
pub mod store;
pub mod telemetry;

pub use catalog::{ResourceCatalog, ResourceDef};
pub use config::ServerArgs;
pub use network::{NetworkConfig, NetworkModule};
pub use service::{BuildingService, ListQueryService, ServiceConfig, ServiceError};
pub use store::{open_store, RowStore, StoreConfig};
