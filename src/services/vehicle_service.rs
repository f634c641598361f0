//! Ciclo de vida del vehículo
//!
//! Alta, edición administrativa, retiro y reactivación. Los cambios a
//! ON_TRIP / IN_SHOP y de vuelta a AVAILABLE los hacen los servicios de
//! viajes y de mantenimiento.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateVehicleRequest};
use crate::models::{TripScope, TripStatus, Vehicle, VehicleChanges, VehicleFilters, VehicleStatus};
use crate::repositories::{FleetStore, Mutation};
use crate::utils::errors::{conflict_error, not_found_error, unprocessable_error, AppResult, ErrorCode};
use crate::utils::validation::{
    validate_finite, validate_non_negative, validate_positive, validate_vehicle_year,
};

pub struct VehicleService {
    store: Arc<dyn FleetStore>,
}

impl VehicleService {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request), fields(plate = %request.license_plate))]
    pub async fn create_vehicle(&self, request: CreateVehicleRequest) -> AppResult<Vehicle> {
        request.validate()?;
        validate_finite("max_capacity", request.max_capacity)?;
        validate_positive("max_capacity", request.max_capacity)?;
        validate_non_negative("odometer", request.odometer)?;
        if let Some(cost) = request.acquisition_cost {
            validate_non_negative("acquisition_cost", cost)?;
        }
        validate_vehicle_year(request.year, Utc::now().year())?;

        let now = Utc::now();
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            model: request.model.trim().to_string(),
            license_plate: request.license_plate.trim().to_uppercase(),
            year: request.year,
            vehicle_type: request.vehicle_type,
            max_capacity: request.max_capacity,
            odometer: request.odometer,
            status: VehicleStatus::Available,
            acquisition_cost: request.acquisition_cost,
            created_at: now,
            updated_at: now,
        };

        let created = self.store.insert_vehicle(&vehicle).await?;
        info!("🚗 Vehículo {} registrado ({})", created.license_plate, created.id);
        Ok(created)
    }

    pub async fn get_vehicle(&self, id: Uuid) -> AppResult<Vehicle> {
        self.store
            .find_vehicle(id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::VehicleNotFound, "Vehicle not found"))
    }

    pub async fn list_vehicles(&self, filters: &VehicleFilters) -> AppResult<Vec<Vehicle>> {
        self.store.list_vehicles(filters).await
    }

    pub async fn available_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let filters = VehicleFilters {
            status: Some(VehicleStatus::Available),
            ..Default::default()
        };
        self.store.list_vehicles(&filters).await
    }

    pub async fn update_vehicle(&self, id: Uuid, request: UpdateVehicleRequest) -> AppResult<Vehicle> {
        request.validate()?;
        if let Some(max_capacity) = request.max_capacity {
            validate_finite("max_capacity", max_capacity)?;
            validate_positive("max_capacity", max_capacity)?;
        }
        if let Some(cost) = request.acquisition_cost {
            validate_non_negative("acquisition_cost", cost)?;
        }

        let current = self.get_vehicle(id).await?;
        if let Some(odometer) = request.odometer {
            // Al completar el viaje el odómetro pasa a odometer_end
            if current.status == VehicleStatus::OnTrip {
                return Err(conflict_error(
                    ErrorCode::VehicleOnTrip,
                    format!("Vehicle {} is on a trip; its odometer is set on completion", current.license_plate),
                ));
            }
            if odometer < current.odometer {
                return Err(unprocessable_error(
                    ErrorCode::InvalidOdometer,
                    format!("Odometer cannot go back from {} to {}", current.odometer, odometer),
                ));
            }
        }

        let changes = VehicleChanges {
            name: request.name.map(|n| n.trim().to_string()),
            model: request.model.map(|m| m.trim().to_string()),
            max_capacity: request.max_capacity,
            odometer: request.odometer,
            acquisition_cost: request.acquisition_cost,
        };
        self.store.update_vehicle(id, &changes).await
    }

    /// Retira un vehículo: sin viajes en curso ni mantenimiento abierto.
    /// Los viajes en borrador del vehículo se cancelan en la misma transacción.
    #[instrument(skip(self))]
    pub async fn retire(&self, id: Uuid) -> AppResult<Vehicle> {
        let vehicle = self.get_vehicle(id).await?;
        if vehicle.status == VehicleStatus::Retired {
            return Ok(vehicle);
        }

        let active = self
            .store
            .count_trips(TripScope::Vehicle(id), Some(TripStatus::Dispatched))
            .await?;
        if active > 0 {
            return Err(conflict_error(
                ErrorCode::ActiveTripsExist,
                "Vehicle has dispatched trips and cannot be retired",
            ));
        }
        if self.store.find_open_maintenance_log(id).await?.is_some() {
            return Err(conflict_error(
                ErrorCode::OpenLogExists,
                "Vehicle has an open service log and cannot be retired",
            ));
        }

        self.store
            .commit(vec![
                Mutation::SetVehicleStatus {
                    id,
                    expected: vehicle.status,
                    status: VehicleStatus::Retired,
                    odometer: None,
                },
                Mutation::CancelDrafts {
                    scope: TripScope::Vehicle(id),
                    cancelled_at: Utc::now(),
                },
            ])
            .await?;

        info!("🪦 Vehículo {} retirado", vehicle.license_plate);
        self.get_vehicle(id).await
    }

    /// Vuelve a poner en servicio un vehículo retirado
    pub async fn reactivate(&self, id: Uuid) -> AppResult<Vehicle> {
        let vehicle = self.get_vehicle(id).await?;
        if vehicle.status != VehicleStatus::Retired {
            return Err(conflict_error(
                ErrorCode::InvalidVehicleStatus,
                format!("Only retired vehicles can be reactivated (current: {})", vehicle.status),
            ));
        }

        self.store
            .commit(vec![Mutation::SetVehicleStatus {
                id,
                expected: VehicleStatus::Retired,
                status: VehicleStatus::Available,
                odometer: None,
            }])
            .await?;

        info!("♻️ Vehículo {} reactivado", vehicle.license_plate);
        self.get_vehicle(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DutyStatus, VehicleType};
    use crate::services::fixtures::{trip_request, vehicle_request, Fleet};

    #[tokio::test]
    async fn test_create_forces_available_status() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Truck, 5_000.0, 12_000).await;
        assert_eq!(vehicle.status, VehicleStatus::Available);
        assert_eq!(vehicle.odometer, 12_000);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_numbers() {
        let fleet = Fleet::new();

        let err = fleet
            .vehicles
            .create_vehicle(vehicle_request(VehicleType::Van, 0.0, 0))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = fleet
            .vehicles
            .create_vehicle(vehicle_request(VehicleType::Van, 100.0, -5))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let mut old = vehicle_request(VehicleType::Van, 100.0, 0);
        old.year = 1985;
        let err = fleet.vehicles.create_vehicle(old).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_duplicate_plate_is_rejected() {
        let fleet = Fleet::new();
        let first = vehicle_request(VehicleType::Van, 100.0, 0);
        let mut second = vehicle_request(VehicleType::Van, 100.0, 0);
        second.license_plate = first.license_plate.to_lowercase();

        fleet.vehicles.create_vehicle(first).await.unwrap();
        let err = fleet.vehicles.create_vehicle(second).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateRecord);
    }

    #[tokio::test]
    async fn test_retire_fails_with_dispatched_trip() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Van, 500.0, 100).await;
        let driver = fleet.driver(vec![VehicleType::Van]).await;
        fleet
            .trips
            .create(trip_request(&vehicle, &driver, 100.0, None))
            .await
            .unwrap();

        let err = fleet.vehicles.retire(vehicle.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ActiveTripsExist);
        assert_eq!(
            fleet.vehicles.get_vehicle(vehicle.id).await.unwrap().status,
            VehicleStatus::OnTrip
        );
    }

    #[tokio::test]
    async fn test_retire_cancels_drafts_and_is_idempotent() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Van, 500.0, 100).await;
        let driver = fleet.driver(vec![VehicleType::Van]).await;
        let draft = fleet
            .trips
            .create(trip_request(&vehicle, &driver, 100.0, Some(TripStatus::Draft)))
            .await
            .unwrap();

        let retired = fleet.vehicles.retire(vehicle.id).await.unwrap();
        assert_eq!(retired.status, VehicleStatus::Retired);

        let trip = fleet.trips.get_trip(draft.id).await.unwrap();
        assert_eq!(trip.status, TripStatus::Cancelled);
        assert!(trip.cancelled_at.is_some());

        let driver = fleet.drivers.get_driver(driver.id).await.unwrap();
        assert_eq!(driver.duty_status, DutyStatus::OnDuty);
        assert_eq!(driver.completion_rate, rust_decimal::Decimal::ZERO);

        let again = fleet.vehicles.retire(vehicle.id).await.unwrap();
        assert_eq!(again.status, VehicleStatus::Retired);
    }

    #[tokio::test]
    async fn test_reactivate_only_from_retired() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Bike, 20.0, 0).await;

        let err = fleet.vehicles.reactivate(vehicle.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidVehicleStatus);

        fleet.vehicles.retire(vehicle.id).await.unwrap();
        let back = fleet.vehicles.reactivate(vehicle.id).await.unwrap();
        assert_eq!(back.status, VehicleStatus::Available);
    }

    #[tokio::test]
    async fn test_update_rejects_odometer_rollback() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Truck, 8_000.0, 5_000).await;

        let err = fleet
            .vehicles
            .update_vehicle(
                vehicle.id,
                UpdateVehicleRequest {
                    odometer: Some(4_999),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOdometer);

        let updated = fleet
            .vehicles
            .update_vehicle(
                vehicle.id,
                UpdateVehicleRequest {
                    name: Some("Long Hauler".into()),
                    odometer: Some(5_200),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Long Hauler");
        assert_eq!(updated.odometer, 5_200);
        assert_eq!(updated.status, VehicleStatus::Available);
    }

    #[tokio::test]
    async fn test_available_vehicles_filters_status() {
        let fleet = Fleet::new();
        let kept = fleet.vehicle(VehicleType::Van, 500.0, 0).await;
        let retired = fleet.vehicle(VehicleType::Van, 500.0, 0).await;
        fleet.vehicles.retire(retired.id).await.unwrap();

        let available = fleet.vehicles.available_vehicles().await.unwrap();
        assert_eq!(available.iter().map(|v| v.id).collect::<Vec<_>>(), vec![kept.id]);
    }

    #[tokio::test]
    async fn test_odometer_edit_rejected_while_on_trip() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Van, 500.0, 1_000).await;
        let driver = fleet.driver(vec![VehicleType::Van]).await;
        let trip = fleet
            .trips
            .create(trip_request(&vehicle, &driver, 100.0, None))
            .await
            .unwrap();

        let err = fleet
            .vehicles
            .update_vehicle(
                vehicle.id,
                UpdateVehicleRequest {
                    odometer: Some(1_200),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::VehicleOnTrip);

        // Los campos descriptivos siguen siendo editables en viaje
        let renamed = fleet
            .vehicles
            .update_vehicle(
                vehicle.id,
                UpdateVehicleRequest {
                    name: Some("Night Runner".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.odometer, 1_000);

        fleet.trips.complete(trip.id, 1_050).await.unwrap();
        assert_eq!(fleet.vehicles.get_vehicle(vehicle.id).await.unwrap().odometer, 1_050);
    }
}
