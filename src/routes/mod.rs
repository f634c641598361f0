//! Rutas HTTP
//!
//! Un router por recurso, montados bajo `/api` por `build_router`.

pub mod driver_routes;
pub mod expense_routes;
pub mod health_routes;
pub mod maintenance_routes;
pub mod trip_routes;
pub mod vehicle_routes;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_for;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_for(&state.config);

    Router::new()
        .merge(health_routes::create_health_router())
        .nest("/api/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/api/drivers", driver_routes::create_driver_router())
        .nest("/api/trips", trip_routes::create_trip_router())
        .nest("/api/maintenance", maintenance_routes::create_maintenance_router())
        .nest("/api/expenses", expense_routes::create_expense_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
