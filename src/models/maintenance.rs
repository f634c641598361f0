//! Modelo de MaintenanceLog
//!
//! Como máximo un registro IN_PROGRESS por vehículo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "service_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    OilChange,
    TireReplacement,
    BrakeService,
    EngineRepair,
    Inspection,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "maintenance_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MaintenanceLog {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub service_type: ServiceType,
    pub description: String,
    pub technician_name: String,
    pub cost: i64,
    pub scheduled_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
    pub status: MaintenanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceLog {
    pub fn is_open(&self) -> bool {
        self.status == MaintenanceStatus::InProgress
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaintenanceFilters {
    pub vehicle_id: Option<Uuid>,
    pub status: Option<MaintenanceStatus>,
}

impl MaintenanceFilters {
    pub fn matches(&self, log: &MaintenanceLog) -> bool {
        self.vehicle_id.map_or(true, |v| log.vehicle_id == v)
            && self.status.map_or(true, |s| log.status == s)
    }
}
