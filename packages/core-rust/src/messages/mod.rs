//! JSON wire schema shared by the list-query service and its clients.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so field names match
//! what the dashboard frontend sends and expects (`requireTotalCount`,
//! `totalCount`, `searchTerm`, ...).

pub mod building;
pub mod list;

pub use building::{ElementView, GwpChartItem};
pub use list::{
    CountResponse, ErrorBody, ErrorCode, ErrorPayload, ListQueryParams, Page, SearchParam,
    SortParam, WireError,
};
