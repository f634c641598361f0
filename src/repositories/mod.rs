//! Capa de persistencia
//!
//! `FleetStore` es el contrato que consumen los servicios: lecturas por
//! entidad, inserciones, ediciones administrativas y `commit`, que aplica un
//! lote de `Mutation` de forma atómica. Las mutaciones de estado llevan el
//! estado esperado y fallan (abortando todo el lote) si la fila ya no lo tiene.

pub mod memory_store;
pub mod postgres_store;

pub use memory_store::MemoryStore;
pub use postgres_store::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Driver, DriverChanges, DriverFilters, DutyStatus, Expense, ExpenseFilters, MaintenanceFilters,
    MaintenanceLog, Trip, TripChange, TripFilters, TripScope, TripStatus, Vehicle, VehicleChanges,
    VehicleCostTotals, VehicleFilters, VehicleStatus,
};
use crate::utils::errors::{conflict_error, AppError, AppResult, ErrorCode};

/// Cambio atómico sobre el store. Ver `FleetStore::commit`.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    InsertTrip(Trip),
    UpdateTrip {
        id: Uuid,
        expected: TripStatus,
        change: TripChange,
    },
    SetVehicleStatus {
        id: Uuid,
        expected: VehicleStatus,
        status: VehicleStatus,
        odometer: Option<i64>,
    },
    SetDutyStatus {
        id: Uuid,
        expected: DutyStatus,
        status: DutyStatus,
    },
    /// Recalcula completed_trips y completion_rate contando los viajes del conductor
    RefreshDriverPerformance { driver_id: Uuid },
    /// Cancela los DRAFT del vehículo o conductor que existan al momento del
    /// commit y recalcula el rendimiento de cada conductor afectado
    CancelDrafts {
        scope: TripScope,
        cancelled_at: DateTime<Utc>,
    },
    InsertMaintenanceLog(MaintenanceLog),
    CloseMaintenanceLog {
        id: Uuid,
        completed_date: DateTime<Utc>,
        cost: i64,
    },
}

impl Mutation {
    /// Error devuelto cuando la fila no está en el estado esperado
    pub fn guard_violation(&self) -> AppError {
        match self {
            Mutation::UpdateTrip { id, expected, .. } => conflict_error(
                ErrorCode::InvalidTripStatus,
                format!("Trip {} is no longer {}", id, expected),
            ),
            Mutation::SetVehicleStatus { id, expected: VehicleStatus::Available, .. } => conflict_error(
                ErrorCode::VehicleNotAvailable,
                format!("Vehicle {} is not available", id),
            ),
            Mutation::SetDutyStatus { id, expected: DutyStatus::OnDuty, .. } => conflict_error(
                ErrorCode::DriverNotReady,
                format!("Driver {} is not on duty", id),
            ),
            Mutation::CloseMaintenanceLog { id, .. } => conflict_error(
                ErrorCode::LogAlreadyCompleted,
                format!("Service log {} is already completed", id),
            ),
            other => conflict_error(
                ErrorCode::StaleState,
                format!("Concurrent modification detected while applying {}", other.label()),
            ),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mutation::InsertTrip(_) => "insert_trip",
            Mutation::UpdateTrip { .. } => "update_trip",
            Mutation::SetVehicleStatus { .. } => "set_vehicle_status",
            Mutation::SetDutyStatus { .. } => "set_duty_status",
            Mutation::RefreshDriverPerformance { .. } => "refresh_driver_performance",
            Mutation::CancelDrafts { .. } => "cancel_drafts",
            Mutation::InsertMaintenanceLog(_) => "insert_maintenance_log",
            Mutation::CloseMaintenanceLog { .. } => "close_maintenance_log",
        }
    }
}

#[async_trait]
pub trait FleetStore: Send + Sync {
    async fn health_check(&self) -> AppResult<()>;

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle>;
    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;
    async fn list_vehicles(&self, filters: &VehicleFilters) -> AppResult<Vec<Vehicle>>;
    /// Edición administrativa. El odómetro nunca baja y no se toca con el
    /// vehículo en viaje (INVALID_ODOMETER / VEHICLE_ON_TRIP).
    async fn update_vehicle(&self, id: Uuid, changes: &VehicleChanges) -> AppResult<Vehicle>;

    async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver>;
    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>>;
    async fn list_drivers(&self, filters: &DriverFilters) -> AppResult<Vec<Driver>>;
    async fn update_driver(&self, id: Uuid, changes: &DriverChanges) -> AppResult<Driver>;

    async fn find_trip(&self, id: Uuid) -> AppResult<Option<Trip>>;
    async fn list_trips(&self, filters: &TripFilters) -> AppResult<Vec<Trip>>;
    async fn count_trips(&self, scope: TripScope, status: Option<TripStatus>) -> AppResult<i64>;

    async fn find_maintenance_log(&self, id: Uuid) -> AppResult<Option<MaintenanceLog>>;
    async fn find_open_maintenance_log(&self, vehicle_id: Uuid) -> AppResult<Option<MaintenanceLog>>;
    async fn list_maintenance_logs(&self, filters: &MaintenanceFilters) -> AppResult<Vec<MaintenanceLog>>;

    async fn insert_expense(&self, expense: &Expense) -> AppResult<Expense>;
    async fn list_expenses(&self, filters: &ExpenseFilters) -> AppResult<Vec<Expense>>;
    async fn vehicle_cost_totals(&self, vehicle_id: Uuid) -> AppResult<VehicleCostTotals>;

    /// Aplica todas las mutaciones en una sola transacción, o ninguna
    async fn commit(&self, mutations: Vec<Mutation>) -> AppResult<()>;
}
