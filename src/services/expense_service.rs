//! Libro de gastos
//!
//! Gastos append-only por vehículo (opcionalmente atados a un viaje del mismo
//! vehículo), cargas de combustible y resumen de costo operativo.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::expense_dto::{CreateExpenseRequest, CreateFuelLogRequest, VehicleCostSummary};
use crate::models::{Expense, ExpenseFilters, ExpenseType, Vehicle};
use crate::repositories::FleetStore;
use crate::utils::errors::{not_found_error, unprocessable_error, validation_error, AppResult, ErrorCode};
use crate::utils::validation::{validate_non_negative, validate_positive};

pub struct ExpenseService {
    store: Arc<dyn FleetStore>,
}

/// Total de una carga: litros × precio por litro, redondeado a la unidad
pub fn fuel_total(liters: Decimal, cost_per_liter: i64) -> Option<i64> {
    (liters * Decimal::from(cost_per_liter))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Costo por km con dos decimales; 0 si el vehículo no tiene kilometraje
pub fn cost_per_km(grand_total: i64, odometer: i64) -> Decimal {
    if odometer <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(grand_total) / Decimal::from(odometer))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl ExpenseService {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    async fn load_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vehicle> {
        self.store
            .find_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::VehicleNotFound, "Vehicle not found"))
    }

    async fn check_trip_belongs(&self, trip_id: Option<Uuid>, vehicle_id: Uuid) -> AppResult<()> {
        let Some(trip_id) = trip_id else {
            return Ok(());
        };
        let trip = self
            .store
            .find_trip(trip_id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::TripNotFound, "Trip not found"))?;
        if trip.vehicle_id != vehicle_id {
            return Err(unprocessable_error(
                ErrorCode::TripVehicleMismatch,
                "Trip belongs to a different vehicle",
            ));
        }
        Ok(())
    }

    pub async fn create_expense(&self, request: CreateExpenseRequest) -> AppResult<Expense> {
        request.validate()?;
        validate_positive("total_cost", request.total_cost)?;

        let vehicle = self.load_vehicle(request.vehicle_id).await?;
        self.check_trip_belongs(request.trip_id, vehicle.id).await?;

        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4(),
            vehicle_id: vehicle.id,
            trip_id: request.trip_id,
            expense_type: request.expense_type,
            total_cost: request.total_cost,
            liters: None,
            cost_per_liter: None,
            odometer_at_fill: None,
            description: request.description,
            receipt_ref: request.receipt_ref,
            date: request.date.unwrap_or(now),
            created_at: now,
        };

        let created = self.store.insert_expense(&expense).await?;
        info!("💸 Gasto {:?} de {} registrado para {}", created.expense_type, created.total_cost, vehicle.license_plate);
        Ok(created)
    }

    pub async fn create_fuel_log(&self, request: CreateFuelLogRequest) -> AppResult<Expense> {
        request.validate()?;
        validate_positive("liters", request.liters)?;
        validate_positive("cost_per_liter", request.cost_per_liter)?;
        if let Some(odometer) = request.odometer_at_fill {
            validate_non_negative("odometer_at_fill", odometer)?;
        }
        let total_cost = fuel_total(request.liters, request.cost_per_liter)
            .ok_or_else(|| validation_error("liters", "fuel total is out of range"))?;

        let vehicle = self.load_vehicle(request.vehicle_id).await?;
        self.check_trip_belongs(request.trip_id, vehicle.id).await?;

        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4(),
            vehicle_id: vehicle.id,
            trip_id: request.trip_id,
            expense_type: ExpenseType::Fuel,
            total_cost,
            liters: Some(request.liters),
            cost_per_liter: Some(request.cost_per_liter),
            odometer_at_fill: request.odometer_at_fill,
            description: None,
            receipt_ref: request.receipt_ref,
            date: request.date.unwrap_or(now),
            created_at: now,
        };

        let created = self.store.insert_expense(&expense).await?;
        info!("⛽ Carga de {} L registrada para {} ({})", request.liters, vehicle.license_plate, total_cost);
        Ok(created)
    }

    pub async fn list_expenses(&self, filters: &ExpenseFilters) -> AppResult<Vec<Expense>> {
        self.store.list_expenses(filters).await
    }

    pub async fn vehicle_cost_summary(&self, vehicle_id: Uuid) -> AppResult<VehicleCostSummary> {
        let vehicle = self.load_vehicle(vehicle_id).await?;
        let totals = self.store.vehicle_cost_totals(vehicle_id).await?;
        let grand_total = totals.expenses_total + totals.maintenance_total;

        Ok(VehicleCostSummary {
            vehicle_id,
            fuel_total: totals.fuel_total,
            maintenance_total: totals.maintenance_total,
            grand_total,
            odometer: vehicle.odometer,
            cost_per_km: cost_per_km(grand_total, vehicle.odometer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::maintenance_dto::{CompleteServiceRequest, CreateServiceLogRequest};
    use crate::models::{ServiceType, VehicleType};
    use crate::services::fixtures::{trip_request, Fleet};

    fn fuel_request(vehicle_id: Uuid, liters: Decimal, cost_per_liter: i64) -> CreateFuelLogRequest {
        CreateFuelLogRequest {
            vehicle_id,
            trip_id: None,
            liters,
            cost_per_liter,
            odometer_at_fill: None,
            receipt_ref: Some("RCPT-001".into()),
            date: None,
        }
    }

    fn toll(vehicle_id: Uuid, trip_id: Option<Uuid>, total_cost: i64) -> CreateExpenseRequest {
        CreateExpenseRequest {
            vehicle_id,
            trip_id,
            expense_type: ExpenseType::Toll,
            total_cost,
            description: Some("Mumbai-Pune expressway".into()),
            receipt_ref: None,
            date: None,
        }
    }

    #[test]
    fn test_fuel_total_rounds_half_away_from_zero() {
        assert_eq!(fuel_total(Decimal::new(405, 1), 102), Some(4_131));
        assert_eq!(fuel_total(Decimal::new(25, 1), 3), Some(8));
        assert_eq!(fuel_total(Decimal::new(10, 0), 95), Some(950));
    }

    #[test]
    fn test_cost_per_km() {
        assert_eq!(cost_per_km(1_000, 0), Decimal::ZERO);
        assert_eq!(cost_per_km(1_000, 3), Decimal::new(33333, 2));
        assert_eq!(cost_per_km(5, 8), Decimal::new(63, 2));
    }

    #[tokio::test]
    async fn test_fuel_log_computes_total() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Truck, 9_000.0, 10_000).await;

        let expense = fleet
            .expenses
            .create_fuel_log(fuel_request(vehicle.id, Decimal::new(405, 1), 102))
            .await
            .unwrap();
        assert_eq!(expense.expense_type, ExpenseType::Fuel);
        assert_eq!(expense.total_cost, 4_131);
        assert_eq!(expense.liters, Some(Decimal::new(405, 1)));

        let err = fleet
            .expenses
            .create_fuel_log(fuel_request(vehicle.id, Decimal::ZERO, 102))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_expense_trip_must_match_vehicle() {
        let fleet = Fleet::new();
        let van = fleet.vehicle(VehicleType::Van, 500.0, 0).await;
        let other = fleet.vehicle(VehicleType::Van, 500.0, 0).await;
        let driver = fleet.driver(vec![VehicleType::Van]).await;
        let trip = fleet.trips.create(trip_request(&van, &driver, 10.0, None)).await.unwrap();

        fleet.expenses.create_expense(toll(van.id, Some(trip.id), 250)).await.unwrap();

        let err = fleet.expenses.create_expense(toll(other.id, Some(trip.id), 250)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TripVehicleMismatch);

        let err = fleet.expenses.create_expense(toll(van.id, Some(Uuid::new_v4()), 250)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TripNotFound);

        let err = fleet.expenses.create_expense(toll(Uuid::new_v4(), None, 250)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::VehicleNotFound);

        let err = fleet.expenses.create_expense(toll(van.id, None, 0)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_cost_summary_includes_completed_maintenance_only() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Truck, 9_000.0, 1_000).await;

        fleet
            .expenses
            .create_fuel_log(fuel_request(vehicle.id, Decimal::new(20, 0), 100))
            .await
            .unwrap();
        fleet.expenses.create_expense(toll(vehicle.id, None, 500)).await.unwrap();

        let log = fleet
            .maintenance
            .open_service_log(CreateServiceLogRequest {
                vehicle_id: vehicle.id,
                service_type: ServiceType::BrakeService,
                description: "Pastillas delanteras".into(),
                technician_name: "Suresh".into(),
                cost: 3_000,
                scheduled_date: None,
            })
            .await
            .unwrap();

        let pending = fleet.expenses.vehicle_cost_summary(vehicle.id).await.unwrap();
        assert_eq!(pending.maintenance_total, 0);
        assert_eq!(pending.grand_total, 2_500);

        fleet
            .maintenance
            .complete_service_log(log.id, CompleteServiceRequest::default())
            .await
            .unwrap();

        let summary = fleet.expenses.vehicle_cost_summary(vehicle.id).await.unwrap();
        assert_eq!(summary.fuel_total, 2_000);
        assert_eq!(summary.maintenance_total, 3_000);
        assert_eq!(summary.grand_total, 5_500);
        assert_eq!(summary.cost_per_km, Decimal::new(550, 2));

        let fuel_only = fleet
            .expenses
            .list_expenses(&ExpenseFilters {
                vehicle_id: Some(vehicle.id),
                expense_type: Some(ExpenseType::Fuel),
            })
            .await
            .unwrap();
        assert_eq!(fuel_only.len(), 1);
    }
}
