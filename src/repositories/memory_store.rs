//! Store en memoria
//!
//! Mismas reglas que `PgStore` (unicidad, claves foráneas, guardas de estado)
//! sobre mapas protegidos por un único mutex. `commit` trabaja sobre una copia
//! del estado y sólo la publica si todas las mutaciones se aplicaron.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{FleetStore, Mutation};
use crate::models::{
    completion_rate, Driver, DriverChanges, DriverFilters, Expense, ExpenseFilters, ExpenseType,
    MaintenanceFilters, MaintenanceLog, MaintenanceStatus, Trip, TripChange, TripFilters, TripScope,
    TripStatus, Vehicle, VehicleChanges, VehicleCostTotals, VehicleFilters, VehicleStatus,
};
use crate::utils::errors::{
    conflict_error, duplicate_error, not_found_error, unprocessable_error, AppResult, ErrorCode,
};

#[derive(Debug, Clone, Default)]
struct FleetState {
    vehicles: HashMap<Uuid, Vehicle>,
    drivers: HashMap<Uuid, Driver>,
    trips: HashMap<Uuid, Trip>,
    maintenance_logs: HashMap<Uuid, MaintenanceLog>,
    expenses: HashMap<Uuid, Expense>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<FleetState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(mut items: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

impl FleetState {
    fn ensure_unique_plate(&self, plate: &str) -> AppResult<()> {
        if self.vehicles.values().any(|v| v.license_plate == plate) {
            return Err(duplicate_error("license_plate"));
        }
        Ok(())
    }

    fn ensure_unique_driver_keys(&self, id: Uuid, employee_id: &str, license_number: &str) -> AppResult<()> {
        for other in self.drivers.values().filter(|d| d.id != id) {
            if other.employee_id == employee_id {
                return Err(duplicate_error("employee_id"));
            }
            if other.license_number == license_number {
                return Err(duplicate_error("license_number"));
            }
        }
        Ok(())
    }

    fn count_trips(&self, scope: TripScope, status: Option<TripStatus>) -> i64 {
        self.trips
            .values()
            .filter(|t| match scope {
                TripScope::Vehicle(id) => t.vehicle_id == id,
                TripScope::Driver(id) => t.driver_id == id,
            })
            .filter(|t| status.map_or(true, |s| t.status == s))
            .count() as i64
    }

    fn refresh_driver(&mut self, driver_id: Uuid) -> AppResult<()> {
        let total = self.count_trips(TripScope::Driver(driver_id), None);
        let completed = self.count_trips(TripScope::Driver(driver_id), Some(TripStatus::Completed));
        let driver = self
            .drivers
            .get_mut(&driver_id)
            .ok_or_else(|| not_found_error(ErrorCode::DriverNotFound, "Driver not found"))?;
        driver.completed_trips = completed as i32;
        driver.completion_rate = completion_rate(completed, total);
        driver.updated_at = Utc::now();
        Ok(())
    }

    fn apply(&mut self, mutation: &Mutation) -> AppResult<()> {
        let now = Utc::now();
        match mutation {
            Mutation::InsertTrip(trip) => {
                if !self.vehicles.contains_key(&trip.vehicle_id) {
                    return Err(not_found_error(ErrorCode::VehicleNotFound, "Vehicle not found"));
                }
                if !self.drivers.contains_key(&trip.driver_id) {
                    return Err(not_found_error(ErrorCode::DriverNotFound, "Driver not found"));
                }
                if trip.status == TripStatus::Dispatched {
                    let busy_vehicle = self.count_trips(TripScope::Vehicle(trip.vehicle_id), Some(TripStatus::Dispatched)) > 0;
                    if busy_vehicle {
                        return Err(conflict_error(ErrorCode::VehicleNotAvailable, "Vehicle already has a dispatched trip"));
                    }
                    let busy_driver = self.count_trips(TripScope::Driver(trip.driver_id), Some(TripStatus::Dispatched)) > 0;
                    if busy_driver {
                        return Err(conflict_error(ErrorCode::DriverNotReady, "Driver already has a dispatched trip"));
                    }
                }
                self.trips.insert(trip.id, trip.clone());
            }
            Mutation::UpdateTrip { id, expected, change } => {
                let trip = match self.trips.get_mut(id) {
                    Some(trip) if trip.status == *expected => trip,
                    _ => return Err(mutation.guard_violation()),
                };
                change.apply(trip);
                trip.updated_at = now;
            }
            Mutation::SetVehicleStatus { id, expected, status, odometer } => {
                let vehicle = match self.vehicles.get_mut(id) {
                    Some(vehicle) if vehicle.status == *expected => vehicle,
                    _ => return Err(mutation.guard_violation()),
                };
                vehicle.status = *status;
                if let Some(odometer) = odometer {
                    vehicle.odometer = vehicle.odometer.max(*odometer);
                }
                vehicle.updated_at = now;
            }
            Mutation::SetDutyStatus { id, expected, status } => {
                let driver = match self.drivers.get_mut(id) {
                    Some(driver) if driver.duty_status == *expected => driver,
                    _ => return Err(mutation.guard_violation()),
                };
                driver.duty_status = *status;
                driver.updated_at = now;
            }
            Mutation::RefreshDriverPerformance { driver_id } => self.refresh_driver(*driver_id)?,
            Mutation::CancelDrafts { scope, cancelled_at } => {
                let mut drivers = BTreeSet::new();
                for trip in self.trips.values_mut() {
                    let in_scope = match *scope {
                        TripScope::Vehicle(id) => trip.vehicle_id == id,
                        TripScope::Driver(id) => trip.driver_id == id,
                    };
                    if in_scope && trip.status == TripStatus::Draft {
                        TripChange::Cancel { cancelled_at: *cancelled_at }.apply(trip);
                        trip.updated_at = now;
                        drivers.insert(trip.driver_id);
                    }
                }
                for driver_id in drivers {
                    self.refresh_driver(driver_id)?;
                }
            }
            Mutation::InsertMaintenanceLog(log) => {
                if !self.vehicles.contains_key(&log.vehicle_id) {
                    return Err(not_found_error(ErrorCode::VehicleNotFound, "Vehicle not found"));
                }
                let open_exists = self
                    .maintenance_logs
                    .values()
                    .any(|l| l.vehicle_id == log.vehicle_id && l.is_open());
                if log.is_open() && open_exists {
                    return Err(conflict_error(
                        ErrorCode::OpenLogExists,
                        "Vehicle already has an open service log",
                    ));
                }
                self.maintenance_logs.insert(log.id, log.clone());
            }
            Mutation::CloseMaintenanceLog { id, completed_date, cost } => {
                let log = match self.maintenance_logs.get_mut(id) {
                    Some(log) if log.is_open() => log,
                    _ => return Err(mutation.guard_violation()),
                };
                log.status = MaintenanceStatus::Completed;
                log.completed_date = Some(*completed_date);
                log.cost = *cost;
                log.updated_at = now;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FleetStore for MemoryStore {
    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        let mut state = self.state.lock().await;
        state.ensure_unique_plate(&vehicle.license_plate)?;
        state.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle.clone())
    }

    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.state.lock().await.vehicles.get(&id).cloned())
    }

    async fn list_vehicles(&self, filters: &VehicleFilters) -> AppResult<Vec<Vehicle>> {
        let state = self.state.lock().await;
        let items = state.vehicles.values().filter(|v| filters.matches(v)).cloned().collect();
        Ok(newest_first(items, |v: &Vehicle| v.created_at))
    }

    async fn update_vehicle(&self, id: Uuid, changes: &VehicleChanges) -> AppResult<Vehicle> {
        let mut state = self.state.lock().await;
        let vehicle = state
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| not_found_error(ErrorCode::VehicleNotFound, "Vehicle not found"))?;

        if let Some(odometer) = changes.odometer {
            if vehicle.status == VehicleStatus::OnTrip {
                return Err(conflict_error(
                    ErrorCode::VehicleOnTrip,
                    "Odometer cannot be edited while the vehicle is on a trip",
                ));
            }
            if odometer < vehicle.odometer {
                return Err(unprocessable_error(
                    ErrorCode::InvalidOdometer,
                    format!("Odometer cannot go back from {} to {}", vehicle.odometer, odometer),
                ));
            }
        }

        if let Some(name) = &changes.name {
            vehicle.name = name.clone();
        }
        if let Some(model) = &changes.model {
            vehicle.model = model.clone();
        }
        if let Some(max_capacity) = changes.max_capacity {
            vehicle.max_capacity = max_capacity;
        }
        if let Some(odometer) = changes.odometer {
            vehicle.odometer = odometer;
        }
        if let Some(cost) = changes.acquisition_cost {
            vehicle.acquisition_cost = Some(cost);
        }
        vehicle.updated_at = Utc::now();
        Ok(vehicle.clone())
    }

    async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver> {
        let mut state = self.state.lock().await;
        state.ensure_unique_driver_keys(driver.id, &driver.employee_id, &driver.license_number)?;
        state.drivers.insert(driver.id, driver.clone());
        Ok(driver.clone())
    }

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        Ok(self.state.lock().await.drivers.get(&id).cloned())
    }

    async fn list_drivers(&self, filters: &DriverFilters) -> AppResult<Vec<Driver>> {
        let state = self.state.lock().await;
        let items = state.drivers.values().filter(|d| filters.matches(d)).cloned().collect();
        Ok(newest_first(items, |d: &Driver| d.created_at))
    }

    async fn update_driver(&self, id: Uuid, changes: &DriverChanges) -> AppResult<Driver> {
        let mut state = self.state.lock().await;
        let current = state
            .drivers
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found_error(ErrorCode::DriverNotFound, "Driver not found"))?;

        if let Some(license_number) = &changes.license_number {
            state.ensure_unique_driver_keys(id, &current.employee_id, license_number)?;
        }

        let mut driver = current;
        if let Some(name) = &changes.name {
            driver.name = name.clone();
        }
        if let Some(phone) = &changes.phone {
            driver.phone = Some(phone.clone());
        }
        if let Some(license_number) = &changes.license_number {
            driver.license_number = license_number.clone();
        }
        if let Some(expiry) = changes.license_expiry {
            driver.license_expiry = expiry;
        }
        if let Some(types) = &changes.authorized_types {
            driver.authorized_types = types.clone();
        }
        driver.updated_at = Utc::now();
        state.drivers.insert(id, driver.clone());
        Ok(driver)
    }

    async fn find_trip(&self, id: Uuid) -> AppResult<Option<Trip>> {
        Ok(self.state.lock().await.trips.get(&id).cloned())
    }

    async fn list_trips(&self, filters: &TripFilters) -> AppResult<Vec<Trip>> {
        let state = self.state.lock().await;
        let items = state.trips.values().filter(|t| filters.matches(t)).cloned().collect();
        Ok(newest_first(items, |t: &Trip| t.created_at))
    }

    async fn count_trips(&self, scope: TripScope, status: Option<TripStatus>) -> AppResult<i64> {
        Ok(self.state.lock().await.count_trips(scope, status))
    }

    async fn find_maintenance_log(&self, id: Uuid) -> AppResult<Option<MaintenanceLog>> {
        Ok(self.state.lock().await.maintenance_logs.get(&id).cloned())
    }

    async fn find_open_maintenance_log(&self, vehicle_id: Uuid) -> AppResult<Option<MaintenanceLog>> {
        let state = self.state.lock().await;
        Ok(state
            .maintenance_logs
            .values()
            .find(|l| l.vehicle_id == vehicle_id && l.is_open())
            .cloned())
    }

    async fn list_maintenance_logs(&self, filters: &MaintenanceFilters) -> AppResult<Vec<MaintenanceLog>> {
        let state = self.state.lock().await;
        let items = state
            .maintenance_logs
            .values()
            .filter(|l| filters.matches(l))
            .cloned()
            .collect();
        Ok(newest_first(items, |l: &MaintenanceLog| l.created_at))
    }

    async fn insert_expense(&self, expense: &Expense) -> AppResult<Expense> {
        let mut state = self.state.lock().await;
        if !state.vehicles.contains_key(&expense.vehicle_id) {
            return Err(not_found_error(ErrorCode::VehicleNotFound, "Vehicle not found"));
        }
        state.expenses.insert(expense.id, expense.clone());
        Ok(expense.clone())
    }

    async fn list_expenses(&self, filters: &ExpenseFilters) -> AppResult<Vec<Expense>> {
        let state = self.state.lock().await;
        let items = state.expenses.values().filter(|e| filters.matches(e)).cloned().collect();
        Ok(newest_first(items, |e: &Expense| e.date))
    }

    async fn vehicle_cost_totals(&self, vehicle_id: Uuid) -> AppResult<VehicleCostTotals> {
        let state = self.state.lock().await;
        let expenses = state.expenses.values().filter(|e| e.vehicle_id == vehicle_id);
        let (expenses_total, fuel_total) = expenses.fold((0, 0), |(all, fuel), e| {
            let fuel_cost = if e.expense_type == ExpenseType::Fuel { e.total_cost } else { 0 };
            (all + e.total_cost, fuel + fuel_cost)
        });
        let maintenance_total = state
            .maintenance_logs
            .values()
            .filter(|l| l.vehicle_id == vehicle_id && l.status == MaintenanceStatus::Completed)
            .map(|l| l.cost)
            .sum();

        Ok(VehicleCostTotals {
            expenses_total,
            fuel_total,
            maintenance_total,
        })
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let mut draft = state.clone();
        for mutation in &mutations {
            draft.apply(mutation)?;
        }
        *state = draft;
        Ok(())
    }
}
