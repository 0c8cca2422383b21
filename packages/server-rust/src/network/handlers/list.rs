//! Generic list, detail and count endpoints.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use lcadash_core::messages::list::parse_search;
use lcadash_core::{CountResponse, ListQueryParams, Page, Row};

use super::AppState;
use crate::catalog::BUILDINGS;
use crate::query::QueryError;
use crate::service::ServiceError;

type ListQuery = Result<Query<ListQueryParams>, QueryRejection>;

/// `GET /api/{resource}`
pub async fn list_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    query: ListQuery,
) -> Result<Json<Page>, ServiceError> {
    list_resource(&state, &resource, query).await
}

/// `GET /api/buildings`
pub async fn list_buildings_handler(
    State(state): State<AppState>,
    query: ListQuery,
) -> Result<Json<Page>, ServiceError> {
    list_resource(&state, BUILDINGS.name, query).await
}

/// `GET /api/{resource}/{id}`
pub async fn detail_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Row>, ServiceError> {
    Ok(Json(state.lists.get_detail(&resource, &id).await?))
}

/// `GET /api/buildings/{id}`
pub async fn building_detail_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Row>, ServiceError> {
    Ok(Json(state.lists.get_detail(BUILDINGS.name, &id).await?))
}

/// `GET /api/count/{resource}?search=`
pub async fn count_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    query: ListQuery,
) -> Result<Json<CountResponse>, ServiceError> {
    let Query(params) = query.map_err(rejected)?;
    let search = match params.search.as_deref() {
        Some(raw) => parse_search(raw).map_err(QueryError::from)?,
        None => None,
    };
    let total_count = state.lists.count(&resource, search.as_ref()).await?;
    Ok(Json(CountResponse { total_count }))
}

async fn list_resource(
    state: &AppState,
    resource: &str,
    query: ListQuery,
) -> Result<Json<Page>, ServiceError> {
    let Query(params) = query.map_err(rejected)?;
    let descriptor = params
        .into_descriptor(resource, state.lists.config().default_page_size)
        .map_err(QueryError::from)?;
    Ok(Json(state.lists.list_query(&descriptor).await?))
}

/// Malformed query strings (e.g. `skip=-1`) become `bad_request` payloads.
fn rejected(rejection: QueryRejection) -> ServiceError {
    QueryError::InvalidParameter {
        name: "query",
        reason: rejection.body_text(),
    }
    .into()
}
