use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::dto::expense_dto::{CreateExpenseRequest, CreateFuelLogRequest, VehicleCostSummary};
use crate::dto::ApiResponse;
use crate::models::{Expense, ExpenseFilters};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_expense_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route("/fuel", post(create_fuel_log))
        .route("/vehicle/:id/summary", get(vehicle_cost_summary))
}

async fn create_expense(
    State(state): State<AppState>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Expense>>), AppError> {
    let expense = state.expenses.create_expense(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success_with_message(expense, "Expense recorded"))))
}

async fn create_fuel_log(
    State(state): State<AppState>,
    Json(request): Json<CreateFuelLogRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Expense>>), AppError> {
    let expense = state.expenses.create_fuel_log(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success_with_message(expense, "Fuel log recorded"))))
}

async fn list_expenses(
    State(state): State<AppState>,
    Query(filters): Query<ExpenseFilters>,
) -> Result<Json<ApiResponse<Vec<Expense>>>, AppError> {
    let expenses = state.expenses.list_expenses(&filters).await?;
    Ok(Json(ApiResponse::success(expenses)))
}

async fn vehicle_cost_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VehicleCostSummary>>, AppError> {
    let summary = state.expenses.vehicle_cost_summary(id).await?;
    Ok(Json(ApiResponse::success(summary)))
}
