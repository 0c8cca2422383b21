//! Domain services behind the HTTP surface.
//!
//! 1. **List queries** (`list`): search/sort/pagination over any catalog
//!    resource, counts, and joined detail rows
//! 2. **Buildings** (`building`): element hierarchy drill-down, material
//!    inventory and GWP chart series for one building

pub mod building;
pub mod config;
pub mod error;
pub mod list;

pub use building::{BuildingService, ElementTree, TreeError};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use list::ListQueryService;
