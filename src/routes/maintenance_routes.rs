use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;

use crate::dto::maintenance_dto::{CompleteServiceRequest, CreateServiceLogRequest};
use crate::dto::ApiResponse;
use crate::models::{MaintenanceFilters, MaintenanceLog};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_maintenance_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_service_logs).post(open_service_log))
        .route("/:id", get(get_service_log))
        .route("/:id/complete", patch(complete_service_log))
}

async fn open_service_log(
    State(state): State<AppState>,
    Json(request): Json<CreateServiceLogRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MaintenanceLog>>), AppError> {
    let log = state.maintenance.open_service_log(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(log, "Service log opened; vehicle is in shop")),
    ))
}

async fn list_service_logs(
    State(state): State<AppState>,
    Query(filters): Query<MaintenanceFilters>,
) -> Result<Json<ApiResponse<Vec<MaintenanceLog>>>, AppError> {
    let logs = state.maintenance.list_service_logs(&filters).await?;
    Ok(Json(ApiResponse::success(logs)))
}

async fn get_service_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MaintenanceLog>>, AppError> {
    let log = state.maintenance.get_service_log(id).await?;
    Ok(Json(ApiResponse::success(log)))
}

async fn complete_service_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteServiceRequest>>,
) -> Result<Json<ApiResponse<MaintenanceLog>>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let log = state.maintenance.complete_service_log(id, request).await?;
    Ok(Json(ApiResponse::success_with_message(log, "Service completed; vehicle is available")))
}
