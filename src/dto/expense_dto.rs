use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::ExpenseType;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExpenseRequest {
    pub vehicle_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub expense_type: ExpenseType,
    pub total_cost: i64,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    #[validate(length(max = 100))]
    pub receipt_ref: Option<String>,

    pub date: Option<DateTime<Utc>>,
}

/// Carga de combustible; el total se calcula a partir de litros y precio
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFuelLogRequest {
    pub vehicle_id: Uuid,
    pub trip_id: Option<Uuid>,

    #[serde(with = "rust_decimal::serde::float")]
    pub liters: Decimal,

    pub cost_per_liter: i64,

    pub odometer_at_fill: Option<i64>,

    #[validate(length(max = 100))]
    pub receipt_ref: Option<String>,

    pub date: Option<DateTime<Utc>>,
}

/// Resumen de costos de operación de un vehículo
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VehicleCostSummary {
    pub vehicle_id: Uuid,
    pub fuel_total: i64,
    pub maintenance_total: i64,
    pub grand_total: i64,
    pub odometer: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost_per_km: Decimal,
}
