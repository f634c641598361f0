//! DTOs de la API HTTP
//!
//! Requests validados con `validator` y el sobre de respuesta común.

pub mod api_response;
pub mod driver_dto;
pub mod expense_dto;
pub mod maintenance_dto;
pub mod trip_dto;
pub mod vehicle_dto;

pub use api_response::ApiResponse;
