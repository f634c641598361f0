//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Códigos legibles por máquina que viajan en cada respuesta de error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    VehicleNotFound,
    DriverNotFound,
    TripNotFound,
    LogNotFound,
    ValidationError,
    DuplicateRecord,
    VehicleNotAvailable,
    VehicleOnTrip,
    VehicleRetired,
    InvalidVehicleStatus,
    DriverNotReady,
    OpenLogExists,
    LogAlreadyCompleted,
    ActiveTripExist,
    ActiveTripsExist,
    InvalidTripStatus,
    StaleState,
    VehicleOverloaded,
    LicenseExpired,
    DriverNotAuthorized,
    InvalidOdometer,
    TripVehicleMismatch,
    MissingData,
    InvalidTransition,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::VehicleNotFound => "VEHICLE_NOT_FOUND",
            ErrorCode::DriverNotFound => "DRIVER_NOT_FOUND",
            ErrorCode::TripNotFound => "TRIP_NOT_FOUND",
            ErrorCode::LogNotFound => "LOG_NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::DuplicateRecord => "DUPLICATE_RECORD",
            ErrorCode::VehicleNotAvailable => "VEHICLE_NOT_AVAILABLE",
            ErrorCode::VehicleOnTrip => "VEHICLE_ON_TRIP",
            ErrorCode::VehicleRetired => "VEHICLE_RETIRED",
            ErrorCode::InvalidVehicleStatus => "INVALID_VEHICLE_STATUS",
            ErrorCode::DriverNotReady => "DRIVER_NOT_READY",
            ErrorCode::OpenLogExists => "OPEN_LOG_EXISTS",
            ErrorCode::LogAlreadyCompleted => "LOG_ALREADY_COMPLETED",
            ErrorCode::ActiveTripExist => "ACTIVE_TRIP_EXIST",
            ErrorCode::ActiveTripsExist => "ACTIVE_TRIPS_EXIST",
            ErrorCode::InvalidTripStatus => "INVALID_TRIP_STATUS",
            ErrorCode::StaleState => "STALE_STATE",
            ErrorCode::VehicleOverloaded => "VEHICLE_OVERLOADED",
            ErrorCode::LicenseExpired => "LICENSE_EXPIRED",
            ErrorCode::DriverNotAuthorized => "DRIVER_NOT_AUTHORIZED",
            ErrorCode::InvalidOdometer => "INVALID_ODOMETER",
            ErrorCode::TripVehicleMismatch => "TRIP_VEHICLE_MISMATCH",
            ErrorCode::MissingData => "MISSING_DATA",
            ErrorCode::InvalidTransition => "INVALID_TRANSITION",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Not found: {1}")]
    NotFound(ErrorCode, String),

    #[error("Bad request: {1}")]
    BadRequest(ErrorCode, String),

    #[error("Conflict: {1}")]
    Conflict(ErrorCode, String),

    #[error("Unprocessable: {1}")]
    Unprocessable(ErrorCode, String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Campo expuesto al cliente para cada constraint única del schema
fn unique_field(constraint: Option<&str>) -> &str {
    match constraint {
        Some("vehicles_license_plate_key") => "license_plate",
        Some("drivers_employee_id_key") => "employee_id",
        Some("drivers_license_number_key") => "license_number",
        Some(other) => other,
        None => "field",
    }
}

/// Mensaje de duplicado común a todos los stores
pub fn duplicate_error(field: &str) -> AppError {
    AppError::Duplicate(format!("A record with this {} already exists", field))
}

/// Las violaciones de constraints del store se traducen a la misma taxonomía
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => {
                AppError::NotFound(ErrorCode::NotFound, "Record not found".to_string())
            }
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                duplicate_error(unique_field(db.constraint()))
            }
            other => AppError::Database(other),
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: ErrorCode,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::BadRequest(..) => StatusCode::BAD_REQUEST,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(..) | AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::Unprocessable(..) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => ErrorCode::InternalServerError,
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::Duplicate(_) => ErrorCode::DuplicateRecord,
            AppError::NotFound(code, _)
            | AppError::BadRequest(code, _)
            | AppError::Conflict(code, _)
            | AppError::Unprocessable(code, _) => *code,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (error, message, details) = match self {
            AppError::Database(e) => {
                error!("❌ Database error: {}", e);
                ("Internal Server Error", "Internal server error".to_string(), None)
            }
            AppError::Internal(msg) => {
                error!("❌ Internal error: {}", msg);
                ("Internal Server Error", "Internal server error".to_string(), None)
            }
            AppError::Validation(e) => {
                warn!("⚠️ Validation error: {}", e);
                ("Validation Error", "The provided data is invalid".to_string(), Some(json!(e)))
            }
            AppError::NotFound(_, msg) => ("Not Found", msg, None),
            AppError::BadRequest(_, msg) => ("Bad Request", msg, None),
            AppError::Conflict(_, msg) => ("Conflict", msg, None),
            AppError::Unprocessable(_, msg) => ("Unprocessable Entity", msg, None),
            AppError::Duplicate(msg) => ("Conflict", msg, None),
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
            details,
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(field: &'static str, message: &'static str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("custom");
    error.message = Some(message.into());

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(code: ErrorCode, message: impl Into<String>) -> AppError {
    AppError::NotFound(code, message.into())
}

/// Función helper para crear errores de conflicto de estado
pub fn conflict_error(code: ErrorCode, message: impl Into<String>) -> AppError {
    AppError::Conflict(code, message.into())
}

/// Función helper para violaciones de reglas de dominio
pub fn unprocessable_error(code: ErrorCode, message: impl Into<String>) -> AppError {
    AppError::Unprocessable(code, message.into())
}

/// Función helper para crear errores de solicitud incorrecta
pub fn bad_request_error(code: ErrorCode, message: impl Into<String>) -> AppError {
    AppError::BadRequest(code, message.into())
}
