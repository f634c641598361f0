//! Fleet Ops - backend de operaciones de flota
//!
//! Vehículos, conductores, viajes, mantenimiento y gastos sobre un
//! `FleetStore` intercambiable (PostgreSQL o memoria) y un bus de eventos
//! inyectado en los servicios que publican.

pub mod config;
pub mod database;
pub mod dto;
pub mod events;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::build_router;
pub use state::AppState;
