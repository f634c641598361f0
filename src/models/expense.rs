//! Modelo de Expense
//!
//! Libro de gastos append-only. Montos en la unidad monetaria mínima.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "expense_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseType {
    Fuel,
    Maintenance,
    Toll,
    Insurance,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub expense_type: ExpenseType,
    pub total_cost: i64,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub liters: Option<Decimal>,
    pub cost_per_liter: Option<i64>,
    pub odometer_at_fill: Option<i64>,
    pub description: Option<String>,
    pub receipt_ref: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseFilters {
    pub vehicle_id: Option<Uuid>,
    pub expense_type: Option<ExpenseType>,
}

impl ExpenseFilters {
    pub fn matches(&self, expense: &Expense) -> bool {
        self.vehicle_id.map_or(true, |v| expense.vehicle_id == v)
            && self.expense_type.map_or(true, |t| expense.expense_type == t)
    }
}

/// Totales de costo de un vehículo
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VehicleCostTotals {
    pub expenses_total: i64,
    pub fuel_total: i64,
    pub maintenance_total: i64,
}
