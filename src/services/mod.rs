//! Servicios de dominio
//!
//! Cada servicio valida precondiciones contra el store, arma el lote de
//! `Mutation` de la operación y lo confirma con un único `commit`. Los
//! eventos se publican sólo después de que el commit tuvo éxito.

pub mod driver_service;
pub mod expense_service;
pub mod maintenance_service;
pub mod trip_service;
pub mod vehicle_service;

pub use driver_service::DriverService;
pub use expense_service::ExpenseService;
pub use maintenance_service::MaintenanceService;
pub use trip_service::TripService;
pub use vehicle_service::VehicleService;

#[cfg(test)]
pub(crate) mod fixtures {
    //! Datos de prueba compartidos por los tests de servicios

    use std::sync::Arc;

    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    use crate::dto::driver_dto::CreateDriverRequest;
    use crate::dto::trip_dto::CreateTripRequest;
    use crate::dto::vehicle_dto::CreateVehicleRequest;
    use crate::events::EventBus;
    use crate::models::{Driver, TripStatus, Vehicle, VehicleType};
    use crate::repositories::{FleetStore, MemoryStore};
    use crate::utils::dates;

    use super::*;

    pub struct Fleet {
        pub store: Arc<dyn FleetStore>,
        pub events: Arc<EventBus>,
        pub vehicles: VehicleService,
        pub drivers: DriverService,
        pub trips: TripService,
        pub maintenance: MaintenanceService,
        pub expenses: ExpenseService,
    }

    impl Fleet {
        pub fn new() -> Self {
            let store: Arc<dyn FleetStore> = Arc::new(MemoryStore::new());
            let events = Arc::new(EventBus::new(64));
            Self {
                vehicles: VehicleService::new(store.clone()),
                drivers: DriverService::new(store.clone()),
                trips: TripService::new(store.clone(), events.clone()),
                maintenance: MaintenanceService::new(store.clone(), events.clone()),
                expenses: ExpenseService::new(store.clone()),
                store,
                events,
            }
        }

        pub async fn vehicle(&self, vehicle_type: VehicleType, max_capacity: f64, odometer: i64) -> Vehicle {
            self.vehicles
                .create_vehicle(vehicle_request(vehicle_type, max_capacity, odometer))
                .await
                .unwrap()
        }

        pub async fn driver(&self, authorized_types: Vec<VehicleType>) -> Driver {
            self.driver_expiring(authorized_types, dates::today() + Duration::days(365)).await
        }

        pub async fn driver_expiring(&self, authorized_types: Vec<VehicleType>, expiry: NaiveDate) -> Driver {
            self.drivers
                .create_driver(driver_request(authorized_types, expiry))
                .await
                .unwrap()
        }
    }

    pub fn vehicle_request(vehicle_type: VehicleType, max_capacity: f64, odometer: i64) -> CreateVehicleRequest {
        let suffix = &Uuid::new_v4().simple().to_string()[..6];
        CreateVehicleRequest {
            name: format!("Unit {}", suffix),
            model: "Tata Ace".into(),
            license_plate: format!("MH12{}", suffix.to_uppercase()),
            year: 2022,
            vehicle_type,
            max_capacity,
            odometer,
            acquisition_cost: Some(850_000),
        }
    }

    pub fn driver_request(authorized_types: Vec<VehicleType>, expiry: NaiveDate) -> CreateDriverRequest {
        let suffix = &Uuid::new_v4().simple().to_string()[..8];
        CreateDriverRequest {
            name: "Arjun Mehta".into(),
            employee_id: format!("EMP{}", suffix),
            license_number: format!("DL{}", suffix),
            license_expiry: expiry,
            authorized_types,
            phone: Some("9876543210".into()),
        }
    }

    pub fn trip_request(vehicle: &Vehicle, driver: &Driver, cargo_weight: f64, status: Option<TripStatus>) -> CreateTripRequest {
        CreateTripRequest {
            vehicle_id: vehicle.id,
            driver_id: driver.id,
            origin: "Pune".into(),
            destination: "Nashik".into(),
            cargo_weight,
            estimated_fuel_cost: Some(2_500),
            revenue: Some(12_000),
            status,
        }
    }
}
