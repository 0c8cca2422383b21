//! Building drill-down endpoints.

use axum::extract::{Path, State};
use axum::Json;
use lcadash_core::{ElementView, GwpChartItem, Row};

use super::AppState;
use crate::service::ServiceError;

/// `GET /api/buildings/{id}/elements`
pub async fn elements_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Row>>, ServiceError> {
    Ok(Json(state.buildings.elements(&id).await?))
}

/// `GET /api/buildings/{id}/elements/{level}`
pub async fn element_view_handler(
    State(state): State<AppState>,
    Path((id, level)): Path<(String, String)>,
) -> Result<Json<ElementView>, ServiceError> {
    Ok(Json(state.buildings.element_view(&id, &level).await?))
}

/// `GET /api/buildings/{id}/materials`
pub async fn materials_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Row>>, ServiceError> {
    Ok(Json(state.buildings.materials(&id).await?))
}

/// `GET /api/buildings/{id}/gwp`
pub async fn gwp_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<GwpChartItem>>, ServiceError> {
    Ok(Json(state.buildings.gwp_summary(&id).await?))
}
