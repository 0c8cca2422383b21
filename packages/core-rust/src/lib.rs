//! `lcadash` core: row values, query descriptors, and the JSON wire schema
//! of the list-query endpoint.

pub mod messages;
pub mod query;
pub mod types;

pub use messages::{
    CountResponse, ElementView, ErrorCode, ErrorPayload, GwpChartItem, ListQueryParams, Page,
    WireError,
};
pub use query::{QueryDescriptor, QueryKey, SearchSpec, SortSpec};
pub use types::{Row, Value};
