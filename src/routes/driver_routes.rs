use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;

use crate::dto::driver_dto::{
    CreateDriverRequest, DriverResponse, LicenseComplianceResponse, UpdateDriverRequest,
    UpdateDutyStatusRequest,
};
use crate::dto::ApiResponse;
use crate::models::{Driver, DriverFilters};
use crate::state::AppState;
use crate::utils::dates;
use crate::utils::errors::AppError;

pub fn create_driver_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_drivers).post(create_driver))
        .route("/available", get(available_drivers))
        .route("/:id", get(get_driver).put(update_driver))
        .route("/:id/duty-status", patch(update_duty_status))
        .route("/:id/compliance", get(check_compliance))
}

fn view(driver: Driver) -> DriverResponse {
    DriverResponse::from_driver(driver, dates::today())
}

fn views(drivers: Vec<Driver>) -> Vec<DriverResponse> {
    let today = dates::today();
    drivers.into_iter().map(|d| DriverResponse::from_driver(d, today)).collect()
}

async fn create_driver(
    State(state): State<AppState>,
    Json(request): Json<CreateDriverRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DriverResponse>>), AppError> {
    let driver = state.drivers.create_driver(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(view(driver), "Driver created")),
    ))
}

async fn list_drivers(
    State(state): State<AppState>,
    Query(filters): Query<DriverFilters>,
) -> Result<Json<ApiResponse<Vec<DriverResponse>>>, AppError> {
    let drivers = state.drivers.list_drivers(&filters).await?;
    Ok(Json(ApiResponse::success(views(drivers))))
}

async fn available_drivers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<DriverResponse>>>, AppError> {
    let drivers = state.drivers.available_drivers().await?;
    Ok(Json(ApiResponse::success(views(drivers))))
}

async fn get_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DriverResponse>>, AppError> {
    let driver = state.drivers.get_driver(id).await?;
    Ok(Json(ApiResponse::success(view(driver))))
}

async fn update_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDriverRequest>,
) -> Result<Json<ApiResponse<DriverResponse>>, AppError> {
    let driver = state.drivers.update_driver(id, request).await?;
    Ok(Json(ApiResponse::success_with_message(view(driver), "Driver updated")))
}

async fn update_duty_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDutyStatusRequest>,
) -> Result<Json<ApiResponse<DriverResponse>>, AppError> {
    let driver = state.drivers.update_duty_status(id, request.duty_status).await?;
    Ok(Json(ApiResponse::success_with_message(view(driver), "Duty status updated")))
}

async fn check_compliance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LicenseComplianceResponse>>, AppError> {
    let compliance = state.drivers.check_license_compliance(id).await?;
    Ok(Json(ApiResponse::success(compliance)))
}
