//! Máquina de estados de viajes
//!
//! DRAFT → DISPATCHED → COMPLETED, con CANCELLED alcanzable desde DRAFT y
//! DISPATCHED. Despachar saca al vehículo y al conductor del pool disponible;
//! completar o cancelar los devuelve. Cada transición es un solo `commit`
//! con guardas de estado, así que dos despachos concurrentes del mismo
//! vehículo no pueden ganar ambos.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::dto::trip_dto::{CreateTripRequest, UpdateTripStatusRequest};
use crate::events::{EventBus, FleetEvent};
use crate::models::{
    Driver, DutyStatus, Trip, TripChange, TripFilters, TripStatus, Vehicle, VehicleStatus,
};
use crate::repositories::{FleetStore, Mutation};
use crate::utils::dates;
use crate::utils::errors::{
    bad_request_error, conflict_error, not_found_error, unprocessable_error, AppError, AppResult,
    ErrorCode,
};
use crate::utils::validation::{validate_finite, validate_non_negative, validate_positive};

pub struct TripService {
    store: Arc<dyn FleetStore>,
    events: Arc<EventBus>,
}

/// Mutaciones que ocupan vehículo y conductor
fn occupy(vehicle: &Vehicle, driver: &Driver) -> [Mutation; 2] {
    [
        Mutation::SetVehicleStatus {
            id: vehicle.id,
            expected: VehicleStatus::Available,
            status: VehicleStatus::OnTrip,
            odometer: None,
        },
        Mutation::SetDutyStatus {
            id: driver.id,
            expected: DutyStatus::OnDuty,
            status: DutyStatus::OffDuty,
        },
    ]
}

/// Mutaciones que liberan vehículo y conductor de un viaje despachado
fn release(trip: &Trip, odometer: Option<i64>) -> [Mutation; 2] {
    [
        Mutation::SetVehicleStatus {
            id: trip.vehicle_id,
            expected: VehicleStatus::OnTrip,
            status: VehicleStatus::Available,
            odometer,
        },
        Mutation::SetDutyStatus {
            id: trip.driver_id,
            expected: DutyStatus::OffDuty,
            status: DutyStatus::OnDuty,
        },
    ]
}

impl TripService {
    pub fn new(store: Arc<dyn FleetStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    /// Las siete verificaciones de despacho, en orden. Ninguna toca el store
    /// más allá de leer.
    async fn check_dispatchable(&self, vehicle_id: Uuid, driver_id: Uuid, cargo_weight: f64) -> AppResult<(Vehicle, Driver)> {
        let vehicle = self
            .store
            .find_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::VehicleNotFound, "Vehicle not found"))?;
        if !vehicle.is_available() {
            return Err(conflict_error(
                ErrorCode::VehicleNotAvailable,
                format!("Vehicle {} is {}", vehicle.license_plate, vehicle.status),
            ));
        }
        if !vehicle.can_carry(cargo_weight) {
            return Err(unprocessable_error(
                ErrorCode::VehicleOverloaded,
                format!(
                    "Cargo weight {} kg exceeds vehicle capacity of {} kg",
                    cargo_weight, vehicle.max_capacity
                ),
            ));
        }

        let driver = self
            .store
            .find_driver(driver_id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::DriverNotFound, "Driver not found"))?;
        if driver.duty_status != DutyStatus::OnDuty {
            return Err(conflict_error(
                ErrorCode::DriverNotReady,
                format!("Driver {} is {}", driver.employee_id, driver.duty_status),
            ));
        }
        if driver.is_license_expired(dates::today()) {
            return Err(unprocessable_error(
                ErrorCode::LicenseExpired,
                format!("Driver license expired on {}", driver.license_expiry),
            ));
        }
        if !driver.is_authorized_for(vehicle.vehicle_type) {
            return Err(unprocessable_error(
                ErrorCode::DriverNotAuthorized,
                format!("Driver is not authorized for {} vehicles", vehicle.vehicle_type.as_str()),
            ));
        }

        Ok((vehicle, driver))
    }

    fn publish_dispatched(&self, trip: &Trip) {
        self.events.publish(FleetEvent::TripDispatched {
            trip_id: trip.id,
            vehicle_id: trip.vehicle_id,
            driver_id: trip.driver_id,
        });
    }

    #[instrument(skip(self, request), fields(vehicle_id = %request.vehicle_id, driver_id = %request.driver_id))]
    pub async fn create(&self, request: CreateTripRequest) -> AppResult<Trip> {
        request.validate()?;
        validate_finite("cargo_weight", request.cargo_weight)?;
        validate_positive("cargo_weight", request.cargo_weight)?;
        if let Some(cost) = request.estimated_fuel_cost {
            validate_non_negative("estimated_fuel_cost", cost)?;
        }
        if let Some(revenue) = request.revenue {
            validate_non_negative("revenue", revenue)?;
        }

        let status = request.status.unwrap_or(TripStatus::Dispatched);
        if status.is_terminal() {
            return Err(conflict_error(
                ErrorCode::InvalidTripStatus,
                format!("A trip cannot be created as {}", status),
            ));
        }

        let (vehicle, driver) = self
            .check_dispatchable(request.vehicle_id, request.driver_id, request.cargo_weight)
            .await?;

        let now = Utc::now();
        let dispatched = status == TripStatus::Dispatched;
        let trip = Trip {
            id: Uuid::new_v4(),
            vehicle_id: vehicle.id,
            driver_id: driver.id,
            origin: request.origin.trim().to_string(),
            destination: request.destination.trim().to_string(),
            cargo_weight: request.cargo_weight,
            estimated_fuel_cost: request.estimated_fuel_cost,
            revenue: request.revenue,
            status,
            odometer_start: dispatched.then_some(vehicle.odometer),
            odometer_end: None,
            dispatched_at: dispatched.then_some(now),
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut mutations = Vec::with_capacity(3);
        if dispatched {
            mutations.extend(occupy(&vehicle, &driver));
        }
        mutations.push(Mutation::InsertTrip(trip.clone()));
        self.store.commit(mutations).await?;

        if dispatched {
            info!("🚚 Viaje {} despachado: {} → {}", trip.id, trip.origin, trip.destination);
            self.publish_dispatched(&trip);
        } else {
            info!("📝 Viaje {} creado como borrador", trip.id);
        }
        Ok(trip)
    }

    /// DRAFT → DISPATCHED, repitiendo las verificaciones de creación
    #[instrument(skip(self))]
    pub async fn dispatch(&self, trip_id: Uuid) -> AppResult<Trip> {
        let trip = self.get_trip(trip_id).await?;
        if trip.status != TripStatus::Draft {
            return Err(conflict_error(
                ErrorCode::InvalidTripStatus,
                format!("Only DRAFT trips can be dispatched (current: {})", trip.status),
            ));
        }

        let (vehicle, driver) = self
            .check_dispatchable(trip.vehicle_id, trip.driver_id, trip.cargo_weight)
            .await?;

        let mut mutations: Vec<Mutation> = occupy(&vehicle, &driver).into();
        mutations.push(Mutation::UpdateTrip {
            id: trip.id,
            expected: TripStatus::Draft,
            change: TripChange::Dispatch {
                odometer_start: vehicle.odometer,
                dispatched_at: Utc::now(),
            },
        });
        self.store.commit(mutations).await?;

        let dispatched = self.get_trip(trip_id).await?;
        info!("🚚 Borrador {} despachado", dispatched.id);
        self.publish_dispatched(&dispatched);
        Ok(dispatched)
    }

    #[instrument(skip(self))]
    pub async fn complete(&self, trip_id: Uuid, odometer_end: i64) -> AppResult<Trip> {
        let trip = self.get_trip(trip_id).await?;
        if trip.status != TripStatus::Dispatched {
            return Err(conflict_error(
                ErrorCode::InvalidTripStatus,
                format!("Only DISPATCHED trips can be completed (current: {})", trip.status),
            ));
        }

        let odometer_start = trip
            .odometer_start
            .ok_or_else(|| AppError::Internal(format!("Dispatched trip {} has no odometer_start", trip.id)))?;
        if odometer_end < odometer_start {
            return Err(unprocessable_error(
                ErrorCode::InvalidOdometer,
                format!(
                    "odometer_end ({}) cannot be less than odometer_start ({})",
                    odometer_end, odometer_start
                ),
            ));
        }

        let mut mutations = vec![Mutation::UpdateTrip {
            id: trip.id,
            expected: TripStatus::Dispatched,
            change: TripChange::Complete {
                odometer_end,
                completed_at: Utc::now(),
            },
        }];
        mutations.extend(release(&trip, Some(odometer_end)));
        mutations.push(Mutation::RefreshDriverPerformance { driver_id: trip.driver_id });
        self.store.commit(mutations).await?;

        info!("🏁 Viaje {} completado: {} km", trip.id, odometer_end - odometer_start);
        self.events.publish(FleetEvent::TripCompleted {
            trip_id: trip.id,
            vehicle_id: trip.vehicle_id,
            driver_id: trip.driver_id,
            odometer_end,
        });
        self.get_trip(trip_id).await
    }

    /// Cancela un viaje DRAFT o DISPATCHED. No emite evento.
    #[instrument(skip(self))]
    pub async fn cancel(&self, trip_id: Uuid) -> AppResult<Trip> {
        let trip = self.get_trip(trip_id).await?;

        let mut mutations = vec![Mutation::UpdateTrip {
            id: trip.id,
            expected: trip.status,
            change: TripChange::Cancel { cancelled_at: Utc::now() },
        }];
        match trip.status {
            TripStatus::Draft => {}
            TripStatus::Dispatched => mutations.extend(release(&trip, None)),
            TripStatus::Completed | TripStatus::Cancelled => {
                return Err(conflict_error(
                    ErrorCode::InvalidTripStatus,
                    format!("Trip is already {}", trip.status),
                ));
            }
        }
        mutations.push(Mutation::RefreshDriverPerformance { driver_id: trip.driver_id });
        self.store.commit(mutations).await?;

        info!("🚫 Viaje {} cancelado desde {}", trip.id, trip.status);
        self.get_trip(trip_id).await
    }

    pub async fn get_trip(&self, id: Uuid) -> AppResult<Trip> {
        self.store
            .find_trip(id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::TripNotFound, "Trip not found"))
    }

    pub async fn list_trips(&self, filters: &TripFilters) -> AppResult<Vec<Trip>> {
        self.store.list_trips(filters).await
    }

    /// Punto de entrada HTTP para transiciones por estado destino
    pub async fn update_status(&self, trip_id: Uuid, request: UpdateTripStatusRequest) -> AppResult<Trip> {
        match request.status {
            TripStatus::Completed => {
                let odometer_end = request.odometer_end.ok_or_else(|| {
                    bad_request_error(ErrorCode::MissingData, "odometer_end is required to complete a trip")
                })?;
                self.complete(trip_id, odometer_end).await
            }
            TripStatus::Cancelled => self.cancel(trip_id).await,
            TripStatus::Dispatched => self.dispatch(trip_id).await,
            TripStatus::Draft => Err(bad_request_error(
                ErrorCode::InvalidTransition,
                "A trip cannot be moved back to DRAFT",
            )),
        }
    }
}
