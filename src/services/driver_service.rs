//! Ciclo de vida del conductor
//!
//! Alta, edición, estado de servicio y cumplimiento de licencia. El
//! rendimiento (completed_trips, completion_rate) nunca se escribe desde aquí
//! salvo a través de `RefreshDriverPerformance`.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::dto::driver_dto::{CreateDriverRequest, LicenseComplianceResponse, UpdateDriverRequest};
use crate::models::{
    completion_rate, Driver, DriverChanges, DriverFilters, DutyStatus, TripScope,
    TripStatus, VehicleType,
};
use crate::repositories::{FleetStore, Mutation};
use crate::utils::dates;
use crate::utils::errors::{
    bad_request_error, conflict_error, not_found_error, unprocessable_error, AppResult, ErrorCode,
};

pub struct DriverService {
    store: Arc<dyn FleetStore>,
}

/// Quita duplicados conservando el orden de llegada
fn dedup_types(types: Vec<VehicleType>) -> Vec<VehicleType> {
    let mut unique = Vec::with_capacity(types.len());
    for t in types {
        if !unique.contains(&t) {
            unique.push(t);
        }
    }
    unique
}

impl DriverService {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request), fields(employee_id = %request.employee_id))]
    pub async fn create_driver(&self, request: CreateDriverRequest) -> AppResult<Driver> {
        request.validate()?;

        let now = Utc::now();
        let driver = Driver {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            employee_id: request.employee_id.trim().to_string(),
            license_number: request.license_number.trim().to_uppercase(),
            license_expiry: request.license_expiry,
            authorized_types: dedup_types(request.authorized_types),
            phone: request.phone,
            duty_status: DutyStatus::OnDuty,
            completed_trips: 0,
            completion_rate: completion_rate(0, 0),
            created_at: now,
            updated_at: now,
        };

        let created = self.store.insert_driver(&driver).await?;
        info!("🧑‍✈️ Conductor {} registrado ({})", created.employee_id, created.id);
        Ok(created)
    }

    pub async fn get_driver(&self, id: Uuid) -> AppResult<Driver> {
        self.store
            .find_driver(id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::DriverNotFound, "Driver not found"))
    }

    pub async fn list_drivers(&self, filters: &DriverFilters) -> AppResult<Vec<Driver>> {
        self.store.list_drivers(filters).await
    }

    /// Conductores en servicio con licencia vigente
    pub async fn available_drivers(&self) -> AppResult<Vec<Driver>> {
        let today = dates::today();
        let on_duty = self
            .store
            .list_drivers(&DriverFilters {
                duty_status: Some(DutyStatus::OnDuty),
                ..Default::default()
            })
            .await?;
        Ok(on_duty.into_iter().filter(|d| !d.is_license_expired(today)).collect())
    }

    /// Conductores no suspendidos cuya licencia vence dentro de la ventana
    pub async fn drivers_with_expiring_license(&self, today: NaiveDate, window_days: i64) -> AppResult<Vec<Driver>> {
        self.store
            .list_drivers(&DriverFilters {
                license_expires_by: Some(today + Duration::days(window_days)),
                exclude_status: Some(DutyStatus::Suspended),
                ..Default::default()
            })
            .await
    }

    pub async fn update_driver(&self, id: Uuid, request: UpdateDriverRequest) -> AppResult<Driver> {
        request.validate()?;
        let changes = DriverChanges {
            name: request.name.map(|n| n.trim().to_string()),
            phone: request.phone,
            license_number: request.license_number.map(|l| l.trim().to_uppercase()),
            license_expiry: request.license_expiry,
            authorized_types: request.authorized_types.map(dedup_types),
        };
        self.store.update_driver(id, &changes).await
    }

    /// Cambio manual de estado de servicio. Bloqueado mientras el conductor
    /// tenga un viaje despachado; suspender cancela sus borradores.
    #[instrument(skip(self))]
    pub async fn update_duty_status(&self, id: Uuid, status: DutyStatus) -> AppResult<Driver> {
        let driver = self.get_driver(id).await?;

        let active = self
            .store
            .count_trips(TripScope::Driver(id), Some(TripStatus::Dispatched))
            .await?;
        if active > 0 {
            return Err(conflict_error(
                ErrorCode::ActiveTripExist,
                "Driver has a dispatched trip; complete or cancel it first",
            ));
        }

        // OFF_DUTY significa "en viaje": sólo lo asigna el despacho
        if status == DutyStatus::OffDuty {
            return Err(bad_request_error(
                ErrorCode::InvalidTransition,
                "OFF_DUTY is assigned by dispatch and cannot be set manually",
            ));
        }

        if driver.duty_status == status {
            return Ok(driver);
        }

        let mut mutations = vec![Mutation::SetDutyStatus {
            id,
            expected: driver.duty_status,
            status,
        }];

        if status == DutyStatus::Suspended {
            mutations.push(Mutation::CancelDrafts {
                scope: TripScope::Driver(id),
                cancelled_at: Utc::now(),
            });
        }

        self.store.commit(mutations).await?;
        info!("🔄 Conductor {}: {} → {}", driver.employee_id, driver.duty_status, status);
        self.get_driver(id).await
    }

    pub async fn check_license_compliance(&self, id: Uuid) -> AppResult<LicenseComplianceResponse> {
        let driver = self.get_driver(id).await?;
        let today = dates::today();

        if driver.is_license_expired(today) {
            return Err(unprocessable_error(
                ErrorCode::LicenseExpired,
                format!("Driver license expired on {}", driver.license_expiry),
            ));
        }

        Ok(LicenseComplianceResponse {
            driver_id: driver.id,
            license_expiry: driver.license_expiry,
            license_expiry_status: driver.license_expiry_status(today),
            days_until_expiry: dates::days_until(driver.license_expiry, today),
        })
    }
}
