//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::events::EventBus;
use crate::repositories::FleetStore;
use crate::services::{DriverService, ExpenseService, MaintenanceService, TripService, VehicleService};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub store: Arc<dyn FleetStore>,
    pub events: Arc<EventBus>,
    pub vehicles: Arc<VehicleService>,
    pub drivers: Arc<DriverService>,
    pub trips: Arc<TripService>,
    pub maintenance: Arc<MaintenanceService>,
    pub expenses: Arc<ExpenseService>,
}

impl AppState {
    pub fn new(store: Arc<dyn FleetStore>, events: Arc<EventBus>, config: EnvironmentConfig) -> Self {
        Self {
            vehicles: Arc::new(VehicleService::new(store.clone())),
            drivers: Arc::new(DriverService::new(store.clone())),
            trips: Arc::new(TripService::new(store.clone(), events.clone())),
            maintenance: Arc::new(MaintenanceService::new(store.clone(), events.clone())),
            expenses: Arc::new(ExpenseService::new(store.clone())),
            config,
            store,
            events,
        }
    }
}
