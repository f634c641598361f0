//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL (ver `migrations/`).

pub mod driver;
pub mod expense;
pub mod maintenance;
pub mod trip;
pub mod vehicle;

pub use driver::{completion_rate, Driver, DriverChanges, DriverFilters, DutyStatus, LicenseExpiryStatus};
pub use expense::{Expense, ExpenseFilters, ExpenseType, VehicleCostTotals};
pub use maintenance::{MaintenanceFilters, MaintenanceLog, MaintenanceStatus, ServiceType};
pub use trip::{Trip, TripChange, TripFilters, TripScope, TripStatus};
pub use vehicle::{Vehicle, VehicleChanges, VehicleFilters, VehicleStatus, VehicleType};
