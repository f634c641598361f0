//! Ciclo de vida de mantenimiento
//!
//! Abrir un registro manda el vehículo a taller; cerrarlo lo devuelve a
//! AVAILABLE. Como máximo un registro IN_PROGRESS por vehículo.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::dto::maintenance_dto::{CompleteServiceRequest, CreateServiceLogRequest};
use crate::events::{EventBus, FleetEvent};
use crate::models::{MaintenanceFilters, MaintenanceLog, MaintenanceStatus, VehicleStatus};
use crate::repositories::{FleetStore, Mutation};
use crate::utils::errors::{conflict_error, not_found_error, AppResult, ErrorCode};
use crate::utils::validation::validate_positive;

pub struct MaintenanceService {
    store: Arc<dyn FleetStore>,
    events: Arc<EventBus>,
}

impl MaintenanceService {
    pub fn new(store: Arc<dyn FleetStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    #[instrument(skip(self, request), fields(vehicle_id = %request.vehicle_id))]
    pub async fn open_service_log(&self, request: CreateServiceLogRequest) -> AppResult<MaintenanceLog> {
        request.validate()?;
        validate_positive("cost", request.cost)?;

        let vehicle = self
            .store
            .find_vehicle(request.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::VehicleNotFound, "Vehicle not found"))?;

        if self.store.find_open_maintenance_log(vehicle.id).await?.is_some() {
            return Err(conflict_error(
                ErrorCode::OpenLogExists,
                "Vehicle already has an open service log",
            ));
        }
        match vehicle.status {
            VehicleStatus::OnTrip => {
                return Err(conflict_error(
                    ErrorCode::VehicleOnTrip,
                    "Vehicle is on a trip; complete or cancel it before servicing",
                ));
            }
            VehicleStatus::Retired => {
                return Err(conflict_error(ErrorCode::VehicleRetired, "Retired vehicles cannot be serviced"));
            }
            VehicleStatus::Available | VehicleStatus::InShop => {}
        }

        let now = Utc::now();
        let log = MaintenanceLog {
            id: Uuid::new_v4(),
            vehicle_id: vehicle.id,
            service_type: request.service_type,
            description: request.description.trim().to_string(),
            technician_name: request.technician_name.trim().to_string(),
            cost: request.cost,
            scheduled_date: request.scheduled_date.unwrap_or(now),
            completed_date: None,
            status: MaintenanceStatus::InProgress,
            created_at: now,
            updated_at: now,
        };

        self.store
            .commit(vec![
                Mutation::SetVehicleStatus {
                    id: vehicle.id,
                    expected: vehicle.status,
                    status: VehicleStatus::InShop,
                    odometer: None,
                },
                Mutation::InsertMaintenanceLog(log.clone()),
            ])
            .await?;

        info!("🔧 Registro de servicio {} abierto para {}", log.id, vehicle.license_plate);
        self.events.publish(FleetEvent::VehicleInShop {
            vehicle_id: vehicle.id,
            plate: vehicle.license_plate,
        });
        Ok(log)
    }

    #[instrument(skip(self, request))]
    pub async fn complete_service_log(&self, log_id: Uuid, request: CompleteServiceRequest) -> AppResult<MaintenanceLog> {
        if let Some(cost) = request.final_cost {
            validate_positive("final_cost", cost)?;
        }

        let log = self.get_service_log(log_id).await?;
        if !log.is_open() {
            return Err(conflict_error(
                ErrorCode::LogAlreadyCompleted,
                "Service log is already completed",
            ));
        }
        let vehicle = self
            .store
            .find_vehicle(log.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::VehicleNotFound, "Vehicle not found"))?;

        self.store
            .commit(vec![
                Mutation::CloseMaintenanceLog {
                    id: log.id,
                    completed_date: request.completed_date.unwrap_or_else(Utc::now),
                    cost: request.final_cost.unwrap_or(log.cost),
                },
                Mutation::SetVehicleStatus {
                    id: vehicle.id,
                    expected: VehicleStatus::InShop,
                    status: VehicleStatus::Available,
                    odometer: None,
                },
            ])
            .await?;

        info!("✅ Registro de servicio {} completado; {} disponible", log.id, vehicle.license_plate);
        self.events.publish(FleetEvent::VehicleAvailable {
            vehicle_id: vehicle.id,
            plate: vehicle.license_plate,
        });
        self.get_service_log(log_id).await
    }

    pub async fn get_service_log(&self, id: Uuid) -> AppResult<MaintenanceLog> {
        self.store
            .find_maintenance_log(id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::LogNotFound, "Service log not found"))
    }

    pub async fn list_service_logs(&self, filters: &MaintenanceFilters) -> AppResult<Vec<MaintenanceLog>> {
        self.store.list_maintenance_logs(filters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ServiceType, VehicleType};
    use crate::services::fixtures::{trip_request, Fleet};

    fn service_request(vehicle_id: Uuid, cost: i64) -> CreateServiceLogRequest {
        CreateServiceLogRequest {
            vehicle_id,
            service_type: ServiceType::OilChange,
            description: "Cambio de aceite y filtro".into(),
            technician_name: "Ramesh".into(),
            cost,
            scheduled_date: None,
        }
    }

    #[tokio::test]
    async fn test_open_log_sends_vehicle_to_shop() {
        let fleet = Fleet::new();
        let mut events = fleet.events.receiver();
        let vehicle = fleet.vehicle(VehicleType::Truck, 6_000.0, 20_000).await;

        let log = fleet.maintenance.open_service_log(service_request(vehicle.id, 4_500)).await.unwrap();
        assert_eq!(log.status, MaintenanceStatus::InProgress);
        assert_eq!(fleet.vehicles.get_vehicle(vehicle.id).await.unwrap().status, VehicleStatus::InShop);
        assert_eq!(
            events.try_recv().unwrap(),
            FleetEvent::VehicleInShop {
                vehicle_id: vehicle.id,
                plate: vehicle.license_plate.clone(),
            }
        );
    }

    #[tokio::test]
    async fn test_second_open_log_rejected() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Van, 800.0, 0).await;
        fleet.maintenance.open_service_log(service_request(vehicle.id, 1_000)).await.unwrap();

        let err = fleet
            .maintenance
            .open_service_log(service_request(vehicle.id, 2_000))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OpenLogExists);

        let open = fleet
            .maintenance
            .list_service_logs(&MaintenanceFilters {
                vehicle_id: Some(vehicle.id),
                status: Some(MaintenanceStatus::InProgress),
            })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn test_vehicle_on_trip_or_retired_cannot_be_serviced() {
        let fleet = Fleet::new();
        let busy = fleet.vehicle(VehicleType::Van, 800.0, 0).await;
        let driver = fleet.driver(vec![VehicleType::Van]).await;
        fleet.trips.create(trip_request(&busy, &driver, 10.0, None)).await.unwrap();

        let err = fleet.maintenance.open_service_log(service_request(busy.id, 500)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::VehicleOnTrip);

        let old = fleet.vehicle(VehicleType::Van, 800.0, 0).await;
        fleet.vehicles.retire(old.id).await.unwrap();
        let err = fleet.maintenance.open_service_log(service_request(old.id, 500)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::VehicleRetired);
    }

    #[tokio::test]
    async fn test_complete_log_returns_vehicle_with_plate_event() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Bike, 25.0, 0).await;
        let log = fleet.maintenance.open_service_log(service_request(vehicle.id, 900)).await.unwrap();
        let mut events = fleet.events.receiver();

        let done = fleet
            .maintenance
            .complete_service_log(
                log.id,
                CompleteServiceRequest {
                    completed_date: None,
                    final_cost: Some(1_200),
                },
            )
            .await
            .unwrap();

        assert_eq!(done.status, MaintenanceStatus::Completed);
        assert_eq!(done.cost, 1_200);
        assert!(done.completed_date.is_some());
        assert_eq!(fleet.vehicles.get_vehicle(vehicle.id).await.unwrap().status, VehicleStatus::Available);
        assert_eq!(
            events.try_recv().unwrap(),
            FleetEvent::VehicleAvailable {
                vehicle_id: vehicle.id,
                plate: vehicle.license_plate.clone(),
            }
        );

        let err = fleet
            .maintenance
            .complete_service_log(log.id, CompleteServiceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::LogAlreadyCompleted);
    }

    #[tokio::test]
    async fn test_in_shop_vehicle_cannot_be_dispatched() {
        let fleet = Fleet::new();
        let vehicle = fleet.vehicle(VehicleType::Van, 800.0, 0).await;
        let driver = fleet.driver(vec![VehicleType::Van]).await;
        fleet.maintenance.open_service_log(service_request(vehicle.id, 700)).await.unwrap();

        let err = fleet.trips.create(trip_request(&vehicle, &driver, 10.0, None)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::VehicleNotAvailable);
    }

    #[tokio::test]
    async fn test_unknown_log_not_found() {
        let fleet = Fleet::new();
        let err = fleet
            .maintenance
            .complete_service_log(Uuid::new_v4(), CompleteServiceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::LogNotFound);
    }
}
