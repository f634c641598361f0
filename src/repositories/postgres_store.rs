//! Store PostgreSQL (sqlx)
//!
//! Cada `commit` abre una transacción; las guardas de estado son `UPDATE ...
//! WHERE status = $esperado` con verificación de filas afectadas, y el
//! recálculo de rendimiento bloquea la fila del conductor con `FOR UPDATE`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{FleetStore, Mutation};
use crate::models::{
    completion_rate, Driver, DriverChanges, DriverFilters, Expense, ExpenseFilters, MaintenanceFilters,
    MaintenanceLog, Trip, TripChange, TripFilters, TripScope, TripStatus, Vehicle, VehicleChanges,
    VehicleCostTotals, VehicleFilters, VehicleStatus,
};
use crate::utils::errors::{
    conflict_error, not_found_error, unprocessable_error, AppError, AppResult, ErrorCode,
};

const ONE_OPEN_LOG_INDEX: &str = "maintenance_logs_one_open_per_vehicle";
const ONE_DISPATCHED_PER_VEHICLE_INDEX: &str = "trips_one_dispatched_per_vehicle";
const ONE_DISPATCHED_PER_DRIVER_INDEX: &str = "trips_one_dispatched_per_driver";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Traduce los índices únicos parciales a los conflictos de dominio equivalentes
fn map_state_index_violation(e: sqlx::Error) -> AppError {
    let constraint = e
        .as_database_error()
        .and_then(|db| db.constraint())
        .map(str::to_owned);

    match constraint.as_deref() {
        Some(ONE_OPEN_LOG_INDEX) => conflict_error(
            ErrorCode::OpenLogExists,
            "Vehicle already has an open service log",
        ),
        Some(ONE_DISPATCHED_PER_VEHICLE_INDEX) => conflict_error(
            ErrorCode::VehicleNotAvailable,
            "Vehicle already has a dispatched trip",
        ),
        Some(ONE_DISPATCHED_PER_DRIVER_INDEX) => conflict_error(
            ErrorCode::DriverNotReady,
            "Driver already has a dispatched trip",
        ),
        _ => AppError::from(e),
    }
}

fn ensure_guarded(rows_affected: u64, mutation: &Mutation) -> AppResult<()> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(mutation.guard_violation())
    }
}

async fn refresh_driver_performance(conn: &mut PgConnection, driver_id: Uuid) -> AppResult<()> {
    // Serializa recálculos concurrentes del mismo conductor
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM drivers WHERE id = $1 FOR UPDATE")
        .bind(driver_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found_error(ErrorCode::DriverNotFound, "Driver not found"))?;

    let (completed, total): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FILTER (WHERE status = 'COMPLETED'), COUNT(*)
        FROM trips
        WHERE driver_id = $1
        "#,
    )
    .bind(driver_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE drivers
        SET completed_trips = $2, completion_rate = $3, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(driver_id)
    .bind(completed as i32)
    .bind(completion_rate(completed, total))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn apply_mutation(conn: &mut PgConnection, mutation: &Mutation) -> AppResult<()> {
    debug!("🔧 Aplicando mutación {}", mutation.label());

    match mutation {
        Mutation::InsertTrip(trip) => {
            sqlx::query(
                r#"
                INSERT INTO trips (
                    id, vehicle_id, driver_id, origin, destination, cargo_weight,
                    estimated_fuel_cost, revenue, status, odometer_start, odometer_end,
                    dispatched_at, completed_at, cancelled_at, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                "#,
            )
            .bind(trip.id)
            .bind(trip.vehicle_id)
            .bind(trip.driver_id)
            .bind(&trip.origin)
            .bind(&trip.destination)
            .bind(trip.cargo_weight)
            .bind(trip.estimated_fuel_cost)
            .bind(trip.revenue)
            .bind(trip.status)
            .bind(trip.odometer_start)
            .bind(trip.odometer_end)
            .bind(trip.dispatched_at)
            .bind(trip.completed_at)
            .bind(trip.cancelled_at)
            .bind(trip.created_at)
            .bind(trip.updated_at)
            .execute(&mut *conn)
            .await
            .map_err(map_state_index_violation)?;
        }

        Mutation::UpdateTrip { id, expected, change } => {
            let result = match change {
                TripChange::Dispatch { odometer_start, dispatched_at } => {
                    sqlx::query(
                        r#"
                        UPDATE trips
                        SET status = $3, odometer_start = $4, dispatched_at = $5, updated_at = now()
                        WHERE id = $1 AND status = $2
                        "#,
                    )
                    .bind(id)
                    .bind(expected)
                    .bind(change.target_status())
                    .bind(odometer_start)
                    .bind(dispatched_at)
                    .execute(&mut *conn)
                    .await
                    .map_err(map_state_index_violation)?
                }
                TripChange::Complete { odometer_end, completed_at } => {
                    sqlx::query(
                        r#"
                        UPDATE trips
                        SET status = $3, odometer_end = $4, completed_at = $5, updated_at = now()
                        WHERE id = $1 AND status = $2
                        "#,
                    )
                    .bind(id)
                    .bind(expected)
                    .bind(change.target_status())
                    .bind(odometer_end)
                    .bind(completed_at)
                    .execute(&mut *conn)
                    .await?
                }
                TripChange::Cancel { cancelled_at } => {
                    sqlx::query(
                        r#"
                        UPDATE trips
                        SET status = $3, cancelled_at = $4, updated_at = now()
                        WHERE id = $1 AND status = $2
                        "#,
                    )
                    .bind(id)
                    .bind(expected)
                    .bind(change.target_status())
                    .bind(cancelled_at)
                    .execute(&mut *conn)
                    .await?
                }
            };
            ensure_guarded(result.rows_affected(), mutation)?;
        }

        Mutation::SetVehicleStatus { id, expected, status, odometer } => {
            let result = sqlx::query(
                r#"
                UPDATE vehicles
                SET status = $3, odometer = GREATEST(odometer, COALESCE($4, odometer)), updated_at = now()
                WHERE id = $1 AND status = $2
                "#,
            )
            .bind(id)
            .bind(expected)
            .bind(status)
            .bind(odometer)
            .execute(&mut *conn)
            .await?;
            ensure_guarded(result.rows_affected(), mutation)?;
        }

        Mutation::SetDutyStatus { id, expected, status } => {
            let result = sqlx::query(
                r#"
                UPDATE drivers
                SET duty_status = $3, updated_at = now()
                WHERE id = $1 AND duty_status = $2
                "#,
            )
            .bind(id)
            .bind(expected)
            .bind(status)
            .execute(&mut *conn)
            .await?;
            ensure_guarded(result.rows_affected(), mutation)?;
        }

        Mutation::RefreshDriverPerformance { driver_id } => {
            refresh_driver_performance(conn, *driver_id).await?;
        }

        Mutation::CancelDrafts { scope, cancelled_at } => {
            let sql = match scope {
                TripScope::Vehicle(_) => {
                    r#"
                    UPDATE trips
                    SET status = 'CANCELLED', cancelled_at = $2, updated_at = now()
                    WHERE vehicle_id = $1 AND status = 'DRAFT'
                    RETURNING driver_id
                    "#
                }
                TripScope::Driver(_) => {
                    r#"
                    UPDATE trips
                    SET status = 'CANCELLED', cancelled_at = $2, updated_at = now()
                    WHERE driver_id = $1 AND status = 'DRAFT'
                    RETURNING driver_id
                    "#
                }
            };
            let id = match scope {
                TripScope::Vehicle(id) | TripScope::Driver(id) => *id,
            };

            let drivers: BTreeSet<Uuid> = sqlx::query_scalar::<_, Uuid>(sql)
                .bind(id)
                .bind(cancelled_at)
                .fetch_all(&mut *conn)
                .await?
                .into_iter()
                .collect();

            for driver_id in drivers {
                refresh_driver_performance(conn, driver_id).await?;
            }
        }

        Mutation::InsertMaintenanceLog(log) => {
            sqlx::query(
                r#"
                INSERT INTO maintenance_logs (
                    id, vehicle_id, service_type, description, technician_name, cost,
                    scheduled_date, completed_date, status, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(log.id)
            .bind(log.vehicle_id)
            .bind(log.service_type)
            .bind(&log.description)
            .bind(&log.technician_name)
            .bind(log.cost)
            .bind(log.scheduled_date)
            .bind(log.completed_date)
            .bind(log.status)
            .bind(log.created_at)
            .bind(log.updated_at)
            .execute(&mut *conn)
            .await
            .map_err(map_state_index_violation)?;
        }

        Mutation::CloseMaintenanceLog { id, completed_date, cost } => {
            let result = sqlx::query(
                r#"
                UPDATE maintenance_logs
                SET status = 'COMPLETED', completed_date = $2, cost = $3, updated_at = now()
                WHERE id = $1 AND status = 'IN_PROGRESS'
                "#,
            )
            .bind(id)
            .bind(completed_date)
            .bind(cost)
            .execute(&mut *conn)
            .await?;
            ensure_guarded(result.rows_affected(), mutation)?;
        }
    }

    Ok(())
}

#[async_trait]
impl FleetStore for PgStore {
    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        let created = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (
                id, name, model, license_plate, year, vehicle_type, max_capacity,
                odometer, status, acquisition_cost, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.name)
        .bind(&vehicle.model)
        .bind(&vehicle.license_plate)
        .bind(vehicle.year)
        .bind(vehicle.vehicle_type)
        .bind(vehicle.max_capacity)
        .bind(vehicle.odometer)
        .bind(vehicle.status)
        .bind(vehicle.acquisition_cost)
        .bind(vehicle.created_at)
        .bind(vehicle.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn list_vehicles(&self, filters: &VehicleFilters) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT * FROM vehicles
            WHERE ($1::vehicle_status IS NULL OR status = $1)
              AND ($2::vehicle_type IS NULL OR vehicle_type = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filters.status)
        .bind(filters.vehicle_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    async fn update_vehicle(&self, id: Uuid, changes: &VehicleChanges) -> AppResult<Vehicle> {
        let updated = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET name = COALESCE($2, name),
                model = COALESCE($3, model),
                max_capacity = COALESCE($4, max_capacity),
                odometer = GREATEST(odometer, COALESCE($5, odometer)),
                acquisition_cost = COALESCE($6, acquisition_cost),
                updated_at = now()
            WHERE id = $1
              AND ($5::BIGINT IS NULL OR (status <> 'ON_TRIP' AND odometer <= $5))
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.model)
        .bind(changes.max_capacity)
        .bind(changes.odometer)
        .bind(changes.acquisition_cost)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(vehicle) = updated {
            return Ok(vehicle);
        }

        // Ninguna fila: el vehículo no existe o la guarda del odómetro lo rechazó
        let current = self
            .find_vehicle(id)
            .await?
            .ok_or_else(|| not_found_error(ErrorCode::VehicleNotFound, "Vehicle not found"))?;
        if current.status == VehicleStatus::OnTrip {
            return Err(conflict_error(
                ErrorCode::VehicleOnTrip,
                "Odometer cannot be edited while the vehicle is on a trip",
            ));
        }
        Err(unprocessable_error(
            ErrorCode::InvalidOdometer,
            format!(
                "Odometer cannot go back from {} to {}",
                current.odometer,
                changes.odometer.unwrap_or(current.odometer)
            ),
        ))
    }

    async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver> {
        let created = sqlx::query_as::<_, Driver>(
            r#"
            INSERT INTO drivers (
                id, name, employee_id, license_number, license_expiry, authorized_types,
                phone, duty_status, completed_trips, completion_rate, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(driver.id)
        .bind(&driver.name)
        .bind(&driver.employee_id)
        .bind(&driver.license_number)
        .bind(driver.license_expiry)
        .bind(&driver.authorized_types)
        .bind(&driver.phone)
        .bind(driver.duty_status)
        .bind(driver.completed_trips)
        .bind(driver.completion_rate)
        .bind(driver.created_at)
        .bind(driver.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(driver)
    }

    async fn list_drivers(&self, filters: &DriverFilters) -> AppResult<Vec<Driver>> {
        let drivers = sqlx::query_as::<_, Driver>(
            r#"
            SELECT * FROM drivers
            WHERE ($1::duty_status IS NULL OR duty_status = $1)
              AND ($2::date IS NULL OR license_expiry <= $2)
              AND ($3::duty_status IS NULL OR duty_status <> $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filters.duty_status)
        .bind(filters.license_expires_by)
        .bind(filters.exclude_status)
        .fetch_all(&self.pool)
        .await?;

        Ok(drivers)
    }

    async fn update_driver(&self, id: Uuid, changes: &DriverChanges) -> AppResult<Driver> {
        sqlx::query_as::<_, Driver>(
            r#"
            UPDATE drivers
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                license_number = COALESCE($4, license_number),
                license_expiry = COALESCE($5, license_expiry),
                authorized_types = COALESCE($6, authorized_types),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.phone)
        .bind(&changes.license_number)
        .bind(changes.license_expiry)
        .bind(&changes.authorized_types)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error(ErrorCode::DriverNotFound, "Driver not found"))
    }

    async fn find_trip(&self, id: Uuid) -> AppResult<Option<Trip>> {
        let trip = sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(trip)
    }

    async fn list_trips(&self, filters: &TripFilters) -> AppResult<Vec<Trip>> {
        let trips = sqlx::query_as::<_, Trip>(
            r#"
            SELECT * FROM trips
            WHERE ($1::trip_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR vehicle_id = $2)
              AND ($3::uuid IS NULL OR driver_id = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filters.status)
        .bind(filters.vehicle_id)
        .bind(filters.driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(trips)
    }

    async fn count_trips(&self, scope: TripScope, status: Option<TripStatus>) -> AppResult<i64> {
        let (sql, id) = match scope {
            TripScope::Vehicle(id) => (
                "SELECT COUNT(*) FROM trips WHERE vehicle_id = $1 AND ($2::trip_status IS NULL OR status = $2)",
                id,
            ),
            TripScope::Driver(id) => (
                "SELECT COUNT(*) FROM trips WHERE driver_id = $1 AND ($2::trip_status IS NULL OR status = $2)",
                id,
            ),
        };

        let count = sqlx::query_scalar::<_, i64>(sql)
            .bind(id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn find_maintenance_log(&self, id: Uuid) -> AppResult<Option<MaintenanceLog>> {
        let log = sqlx::query_as::<_, MaintenanceLog>("SELECT * FROM maintenance_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(log)
    }

    async fn find_open_maintenance_log(&self, vehicle_id: Uuid) -> AppResult<Option<MaintenanceLog>> {
        let log = sqlx::query_as::<_, MaintenanceLog>(
            "SELECT * FROM maintenance_logs WHERE vehicle_id = $1 AND status = 'IN_PROGRESS'",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    async fn list_maintenance_logs(&self, filters: &MaintenanceFilters) -> AppResult<Vec<MaintenanceLog>> {
        let logs = sqlx::query_as::<_, MaintenanceLog>(
            r#"
            SELECT * FROM maintenance_logs
            WHERE ($1::uuid IS NULL OR vehicle_id = $1)
              AND ($2::maintenance_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filters.vehicle_id)
        .bind(filters.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    async fn insert_expense(&self, expense: &Expense) -> AppResult<Expense> {
        let created = sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (
                id, vehicle_id, trip_id, expense_type, total_cost, liters, cost_per_liter,
                odometer_at_fill, description, receipt_ref, date, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(expense.id)
        .bind(expense.vehicle_id)
        .bind(expense.trip_id)
        .bind(expense.expense_type)
        .bind(expense.total_cost)
        .bind(expense.liters)
        .bind(expense.cost_per_liter)
        .bind(expense.odometer_at_fill)
        .bind(&expense.description)
        .bind(&expense.receipt_ref)
        .bind(expense.date)
        .bind(expense.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_expenses(&self, filters: &ExpenseFilters) -> AppResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT * FROM expenses
            WHERE ($1::uuid IS NULL OR vehicle_id = $1)
              AND ($2::expense_type IS NULL OR expense_type = $2)
            ORDER BY date DESC
            "#,
        )
        .bind(filters.vehicle_id)
        .bind(filters.expense_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    async fn vehicle_cost_totals(&self, vehicle_id: Uuid) -> AppResult<VehicleCostTotals> {
        let (expenses_total, fuel_total, maintenance_total): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE((SELECT SUM(total_cost) FROM expenses WHERE vehicle_id = $1), 0)::BIGINT,
                COALESCE((SELECT SUM(total_cost) FROM expenses
                          WHERE vehicle_id = $1 AND expense_type = 'FUEL'), 0)::BIGINT,
                COALESCE((SELECT SUM(cost) FROM maintenance_logs
                          WHERE vehicle_id = $1 AND status = 'COMPLETED'), 0)::BIGINT
            "#,
        )
        .bind(vehicle_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(VehicleCostTotals {
            expenses_total,
            fuel_total,
            maintenance_total,
        })
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for mutation in &mutations {
            // Un error aquí descarta `tx` sin commit: rollback implícito
            apply_mutation(&mut *tx, mutation).await?;
        }

        tx.commit().await?;
        debug!("✅ Transacción confirmada ({} mutaciones)", mutations.len());
        Ok(())
    }
}

/// Requieren PostgreSQL: `DATABASE_URL=... cargo test -- --ignored`.
/// `sqlx::test` crea una base temporal por test y aplica `migrations/`.
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::events::EventBus;
    use crate::models::{
        DutyStatus, MaintenanceStatus, ServiceType, TripStatus, VehicleStatus, VehicleType,
    };
    use crate::services::fixtures::{driver_request, trip_request, vehicle_request};
    use crate::services::{DriverService, TripService, VehicleService};
    use crate::utils::dates;

    struct PgFleet {
        store: Arc<dyn FleetStore>,
        vehicles: VehicleService,
        drivers: DriverService,
        trips: Arc<TripService>,
    }

    impl PgFleet {
        fn new(pool: PgPool) -> Self {
            let store: Arc<dyn FleetStore> = Arc::new(PgStore::new(pool));
            let events = Arc::new(EventBus::new(16));
            Self {
                vehicles: VehicleService::new(store.clone()),
                drivers: DriverService::new(store.clone()),
                trips: Arc::new(TripService::new(store.clone(), events)),
                store,
            }
        }

        async fn vehicle(&self, odometer: i64) -> Vehicle {
            self.vehicles
                .create_vehicle(vehicle_request(VehicleType::Van, 500.0, odometer))
                .await
                .unwrap()
        }

        async fn driver(&self) -> Driver {
            let expiry = dates::today() + chrono::Duration::days(365);
            self.drivers
                .create_driver(driver_request(vec![VehicleType::Van, VehicleType::Truck], expiry))
                .await
                .unwrap()
        }
    }

    fn open_log(vehicle_id: Uuid) -> MaintenanceLog {
        let now = Utc::now();
        MaintenanceLog {
            id: Uuid::new_v4(),
            vehicle_id,
            service_type: ServiceType::OilChange,
            description: "Cambio de aceite".into(),
            technician_name: "Ravi".into(),
            cost: 1_500,
            scheduled_date: now,
            completed_date: None,
            status: MaintenanceStatus::InProgress,
            created_at: now,
            updated_at: now,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_driver_authorized_types_round_trip(pool: PgPool) {
        let fleet = PgFleet::new(pool);
        let driver = fleet.driver().await;

        let stored = fleet.store.find_driver(driver.id).await.unwrap().unwrap();
        assert_eq!(stored.authorized_types, vec![VehicleType::Van, VehicleType::Truck]);
        assert_eq!(stored.completion_rate, completion_rate(0, 0));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_dispatch_has_single_winner(pool: PgPool) {
        let fleet = PgFleet::new(pool);
        let vehicle = fleet.vehicle(0).await;
        let mut drivers = Vec::new();
        for _ in 0..4 {
            drivers.push(fleet.driver().await);
        }

        let attempts = drivers.iter().map(|driver| {
            let trips = fleet.trips.clone();
            let request = trip_request(&vehicle, driver, 100.0, None);
            async move { trips.create(request).await }
        });
        let results = futures::future::join_all(attempts).await;

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert_eq!(err.code(), ErrorCode::VehicleNotAvailable);
        }
        let dispatched = fleet
            .store
            .count_trips(TripScope::Vehicle(vehicle.id), Some(TripStatus::Dispatched))
            .await
            .unwrap();
        assert_eq!(dispatched, 1);
        assert_eq!(
            fleet.store.find_vehicle(vehicle.id).await.unwrap().unwrap().status,
            VehicleStatus::OnTrip
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_second_open_log_maps_to_open_log_exists(pool: PgPool) {
        let fleet = PgFleet::new(pool);
        let vehicle = fleet.vehicle(0).await;

        fleet
            .store
            .commit(vec![Mutation::InsertMaintenanceLog(open_log(vehicle.id))])
            .await
            .unwrap();
        let err = fleet
            .store
            .commit(vec![Mutation::InsertMaintenanceLog(open_log(vehicle.id))])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OpenLogExists);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_guard_miss_rolls_back_whole_batch(pool: PgPool) {
        let fleet = PgFleet::new(pool);
        let vehicle = fleet.vehicle(0).await;
        let driver = fleet.driver().await;

        let err = fleet
            .store
            .commit(vec![
                Mutation::SetVehicleStatus {
                    id: vehicle.id,
                    expected: VehicleStatus::Available,
                    status: VehicleStatus::OnTrip,
                    odometer: None,
                },
                Mutation::SetDutyStatus {
                    id: driver.id,
                    expected: DutyStatus::Suspended,
                    status: DutyStatus::OffDuty,
                },
            ])
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::StaleState);
        assert_eq!(
            fleet.store.find_vehicle(vehicle.id).await.unwrap().unwrap().status,
            VehicleStatus::Available
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_duplicate_plate_names_the_field(pool: PgPool) {
        let fleet = PgFleet::new(pool);
        let first = vehicle_request(VehicleType::Van, 500.0, 0);
        let mut second = vehicle_request(VehicleType::Van, 500.0, 0);
        second.license_plate = first.license_plate.clone();

        fleet.vehicles.create_vehicle(first).await.unwrap();
        let err = fleet.vehicles.create_vehicle(second).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateRecord);
        assert_eq!(err.to_string(), "Duplicate record: A record with this license_plate already exists");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_update_vehicle_odometer_guard(pool: PgPool) {
        let fleet = PgFleet::new(pool);
        let vehicle = fleet.vehicle(1_000).await;
        let driver = fleet.driver().await;

        let rollback = VehicleChanges { odometer: Some(900), ..Default::default() };
        let err = fleet.store.update_vehicle(vehicle.id, &rollback).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOdometer);

        fleet.trips.create(trip_request(&vehicle, &driver, 100.0, None)).await.unwrap();
        let bump = VehicleChanges { odometer: Some(1_200), ..Default::default() };
        let err = fleet.store.update_vehicle(vehicle.id, &bump).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::VehicleOnTrip);
        assert_eq!(fleet.store.find_vehicle(vehicle.id).await.unwrap().unwrap().odometer, 1_000);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_cancel_drafts_refreshes_drivers(pool: PgPool) {
        let fleet = PgFleet::new(pool);
        let vehicle = fleet.vehicle(0).await;
        let driver = fleet.driver().await;
        let draft = fleet
            .trips
            .create(trip_request(&vehicle, &driver, 100.0, Some(TripStatus::Draft)))
            .await
            .unwrap();

        fleet.vehicles.retire(vehicle.id).await.unwrap();

        let trip = fleet.store.find_trip(draft.id).await.unwrap().unwrap();
        assert_eq!(trip.status, TripStatus::Cancelled);
        assert!(trip.cancelled_at.is_some());
        let driver = fleet.store.find_driver(driver.id).await.unwrap().unwrap();
        assert_eq!(driver.completion_rate, completion_rate(0, 1));
    }
}
