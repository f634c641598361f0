use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;

use crate::dto::trip_dto::{CreateTripRequest, UpdateTripStatusRequest};
use crate::dto::ApiResponse;
use crate::models::{Trip, TripFilters};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trips).post(create_trip))
        .route("/:id", get(get_trip))
        .route("/:id/status", patch(update_trip_status))
}

async fn create_trip(
    State(state): State<AppState>,
    Json(request): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Trip>>), AppError> {
    let trip = state.trips.create(request).await?;
    let message = format!("Trip created as {}", trip.status);
    Ok((StatusCode::CREATED, Json(ApiResponse::success_with_message(trip, message))))
}

async fn list_trips(
    State(state): State<AppState>,
    Query(filters): Query<TripFilters>,
) -> Result<Json<ApiResponse<Vec<Trip>>>, AppError> {
    let trips = state.trips.list_trips(&filters).await?;
    Ok(Json(ApiResponse::success(trips)))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let trip = state.trips.get_trip(id).await?;
    Ok(Json(ApiResponse::success(trip)))
}

async fn update_trip_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTripStatusRequest>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let trip = state.trips.update_status(id, request).await?;
    let message = format!("Trip is now {}", trip.status);
    Ok(Json(ApiResponse::success_with_message(trip, message)))
}
