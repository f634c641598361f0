//! Barrido de licencias vencidas
//!
//! Suspende a los conductores cuya licencia ya venció (cancelando sus
//! borradores vía `DriverService::update_duty_status`) y avisa de las que
//! vencen pronto. Un conductor en viaje, o cuya suspensión falla, se salta
//! hasta el siguiente barrido sin detener al resto.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::events::{EventBus, FleetEvent};
use crate::models::DutyStatus;
use crate::services::DriverService;
use crate::utils::dates;
use crate::utils::errors::{AppResult, ErrorCode};

/// Resultado de una pasada
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub suspended: usize,
    pub expiring: usize,
    pub skipped: usize,
}

pub struct LicenseExpiryJob {
    drivers: Arc<DriverService>,
    events: Arc<EventBus>,
    warning_days: i64,
}

impl LicenseExpiryJob {
    pub fn new(drivers: Arc<DriverService>, events: Arc<EventBus>, warning_days: i64) -> Self {
        Self {
            drivers,
            events,
            warning_days,
        }
    }

    pub async fn run_once(&self, today: NaiveDate) -> AppResult<SweepReport> {
        let candidates = self
            .drivers
            .drivers_with_expiring_license(today, self.warning_days)
            .await?;

        let mut report = SweepReport::default();
        for driver in candidates {
            if !driver.is_license_expired(today) {
                report.expiring += 1;
                warn!(
                    "🪪 Licencia de {} ({}) vence en {} días",
                    driver.name,
                    driver.employee_id,
                    dates::days_until(driver.license_expiry, today)
                );
                continue;
            }

            match self.drivers.update_duty_status(driver.id, DutyStatus::Suspended).await {
                Ok(_) => {
                    report.suspended += 1;
                    self.events.publish(FleetEvent::DriverLicenseExpired {
                        driver_id: driver.id,
                        name: driver.name.clone(),
                    });
                }
                Err(e) if e.code() == ErrorCode::ActiveTripExist => {
                    report.skipped += 1;
                    warn!("⏭️ {} tiene la licencia vencida pero está en viaje; se reintenta en el próximo barrido", driver.employee_id);
                }
                Err(e) => {
                    report.skipped += 1;
                    error!("❌ No se pudo suspender a {}: {}", driver.employee_id, e);
                }
            }
        }

        info!(
            "🧹 Barrido de licencias: {} suspendidos, {} por vencer, {} pendientes",
            report.suspended, report.expiring, report.skipped
        );
        Ok(report)
    }

    /// Lanza el barrido periódico; termina cuando `shutdown` pasa a true
    pub fn spawn(self, interval: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once(dates::today()).await {
                            error!("❌ Barrido de licencias falló: {}", e);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("🛑 Barrido de licencias detenido");
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Driver, DriverChanges, DriverFilters, Expense, ExpenseFilters, MaintenanceFilters, MaintenanceLog,
        Trip, TripFilters, TripScope, TripStatus, Vehicle, VehicleChanges, VehicleCostTotals,
        VehicleFilters, VehicleType,
    };
    use crate::repositories::{FleetStore, Mutation};
    use crate::services::fixtures::{trip_request, Fleet};
    use crate::utils::errors::conflict_error;
    use async_trait::async_trait;
    use chrono::Duration as Days;
    use uuid::Uuid;

    /// Delega en otro store pero rechaza cualquier commit que cambie el
    /// estado de servicio de `failing`
    struct ContendedStore {
        inner: Arc<dyn FleetStore>,
        failing: Uuid,
    }

    #[async_trait]
    impl FleetStore for ContendedStore {
        async fn health_check(&self) -> AppResult<()> {
            self.inner.health_check().await
        }
        async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
            self.inner.insert_vehicle(vehicle).await
        }
        async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
            self.inner.find_vehicle(id).await
        }
        async fn list_vehicles(&self, filters: &VehicleFilters) -> AppResult<Vec<Vehicle>> {
            self.inner.list_vehicles(filters).await
        }
        async fn update_vehicle(&self, id: Uuid, changes: &VehicleChanges) -> AppResult<Vehicle> {
            self.inner.update_vehicle(id, changes).await
        }
        async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver> {
            self.inner.insert_driver(driver).await
        }
        async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
            self.inner.find_driver(id).await
        }
        async fn list_drivers(&self, filters: &DriverFilters) -> AppResult<Vec<Driver>> {
            self.inner.list_drivers(filters).await
        }
        async fn update_driver(&self, id: Uuid, changes: &DriverChanges) -> AppResult<Driver> {
            self.inner.update_driver(id, changes).await
        }
        async fn find_trip(&self, id: Uuid) -> AppResult<Option<Trip>> {
            self.inner.find_trip(id).await
        }
        async fn list_trips(&self, filters: &TripFilters) -> AppResult<Vec<Trip>> {
            self.inner.list_trips(filters).await
        }
        async fn count_trips(&self, scope: TripScope, status: Option<TripStatus>) -> AppResult<i64> {
            self.inner.count_trips(scope, status).await
        }
        async fn find_maintenance_log(&self, id: Uuid) -> AppResult<Option<MaintenanceLog>> {
            self.inner.find_maintenance_log(id).await
        }
        async fn find_open_maintenance_log(&self, vehicle_id: Uuid) -> AppResult<Option<MaintenanceLog>> {
            self.inner.find_open_maintenance_log(vehicle_id).await
        }
        async fn list_maintenance_logs(&self, filters: &MaintenanceFilters) -> AppResult<Vec<MaintenanceLog>> {
            self.inner.list_maintenance_logs(filters).await
        }
        async fn insert_expense(&self, expense: &Expense) -> AppResult<Expense> {
            self.inner.insert_expense(expense).await
        }
        async fn list_expenses(&self, filters: &ExpenseFilters) -> AppResult<Vec<Expense>> {
            self.inner.list_expenses(filters).await
        }
        async fn vehicle_cost_totals(&self, vehicle_id: Uuid) -> AppResult<VehicleCostTotals> {
            self.inner.vehicle_cost_totals(vehicle_id).await
        }
        async fn commit(&self, mutations: Vec<Mutation>) -> AppResult<()> {
            let contended = mutations
                .iter()
                .any(|m| matches!(m, Mutation::SetDutyStatus { id, .. } if *id == self.failing));
            if contended {
                return Err(conflict_error(ErrorCode::StaleState, "Concurrent modification detected"));
            }
            self.inner.commit(mutations).await
        }
    }

    #[tokio::test]
    async fn test_sweep_suspends_expired_and_cancels_drafts() {
        let fleet = Fleet::new();
        let today = dates::today();
        let vehicle = fleet.vehicle(VehicleType::Van, 500.0, 0).await;

        // Vigente al crear el borrador; el barrido corre "en el futuro"
        let lapsing = fleet.driver_expiring(vec![VehicleType::Van], today + Days::days(2)).await;
        let draft = fleet
            .trips
            .create(trip_request(&vehicle, &lapsing, 10.0, Some(TripStatus::Draft)))
            .await
            .unwrap();
        let soon = fleet.driver_expiring(vec![VehicleType::Van], today + Days::days(20)).await;
        fleet.driver(vec![VehicleType::Van]).await;

        let mut events = fleet.events.receiver();
        let job = LicenseExpiryJob::new(Arc::new(DriverService::new(fleet.store.clone())), fleet.events.clone(), 30);
        let report = job.run_once(today + Days::days(5)).await.unwrap();

        assert_eq!(report, SweepReport { suspended: 1, expiring: 1, skipped: 0 });
        assert_eq!(fleet.drivers.get_driver(lapsing.id).await.unwrap().duty_status, DutyStatus::Suspended);
        assert_eq!(fleet.drivers.get_driver(soon.id).await.unwrap().duty_status, DutyStatus::OnDuty);
        assert_eq!(fleet.trips.get_trip(draft.id).await.unwrap().status, TripStatus::Cancelled);
        assert_eq!(
            events.try_recv().unwrap(),
            FleetEvent::DriverLicenseExpired {
                driver_id: lapsing.id,
                name: lapsing.name.clone(),
            }
        );

        // Ya suspendido: no vuelve a aparecer
        let again = job.run_once(today + Days::days(5)).await.unwrap();
        assert_eq!(again.suspended, 0);
    }

    #[tokio::test]
    async fn test_sweep_skips_driver_on_trip() {
        let fleet = Fleet::new();
        let today = dates::today();
        let vehicle = fleet.vehicle(VehicleType::Van, 500.0, 0).await;
        let driver = fleet.driver_expiring(vec![VehicleType::Van], today + Days::days(1)).await;
        fleet.trips.create(trip_request(&vehicle, &driver, 10.0, None)).await.unwrap();

        let job = LicenseExpiryJob::new(Arc::new(DriverService::new(fleet.store.clone())), fleet.events.clone(), 30);
        let report = job.run_once(today + Days::days(3)).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(fleet.drivers.get_driver(driver.id).await.unwrap().duty_status, DutyStatus::OffDuty);
    }

    #[tokio::test]
    async fn test_sweep_continues_past_failed_suspension() {
        let fleet = Fleet::new();
        let today = dates::today();
        let stuck = fleet.driver_expiring(vec![VehicleType::Van], today + Days::days(1)).await;
        let lapsed = fleet.driver_expiring(vec![VehicleType::Van], today + Days::days(1)).await;

        let store: Arc<dyn FleetStore> = Arc::new(ContendedStore {
            inner: fleet.store.clone(),
            failing: stuck.id,
        });
        let job = LicenseExpiryJob::new(Arc::new(DriverService::new(store)), fleet.events.clone(), 30);
        let report = job.run_once(today + Days::days(3)).await.unwrap();

        assert_eq!(report, SweepReport { suspended: 1, expiring: 0, skipped: 1 });
        assert_eq!(fleet.drivers.get_driver(stuck.id).await.unwrap().duty_status, DutyStatus::OnDuty);
        assert_eq!(fleet.drivers.get_driver(lapsed.id).await.unwrap().duty_status, DutyStatus::Suspended);
    }
}
