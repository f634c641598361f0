//! Utilidades de validación
//!
//! Reglas numéricas que `validator` no expresa bien (mínimos exclusivos,
//! años relativos a la fecha actual). Devuelven `ValidationErrors` con el
//! nombre del campo para que la respuesta sea la misma que la del derive.

use num_traits::Zero;
use serde::Serialize;
use validator::{ValidationError, ValidationErrors};

use crate::utils::errors::{AppError, AppResult};

/// Año mínimo aceptado para un vehículo de la flota
pub const MIN_VEHICLE_YEAR: i32 = 1990;

fn field_error(field: &'static str, error: ValidationError) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    AppError::Validation(errors)
}

/// Validar que un valor sea estrictamente positivo
pub fn validate_positive<T: PartialOrd + std::fmt::Display + Zero + Serialize>(
    field: &'static str,
    value: T,
) -> AppResult<()> {
    if value <= T::zero() {
        let mut error = ValidationError::new("positive");
        error.add_param("value".into(), &value);
        return Err(field_error(field, error));
    }
    Ok(())
}

/// Validar que un valor sea no negativo
pub fn validate_non_negative<T: PartialOrd + std::fmt::Display + Zero + Serialize>(
    field: &'static str,
    value: T,
) -> AppResult<()> {
    if value < T::zero() {
        let mut error = ValidationError::new("non_negative");
        error.add_param("value".into(), &value);
        return Err(field_error(field, error));
    }
    Ok(())
}

/// Validar un número finito (`NaN` e infinitos no son pesos válidos)
pub fn validate_finite(field: &'static str, value: f64) -> AppResult<()> {
    if !value.is_finite() {
        return Err(field_error(field, ValidationError::new("finite")));
    }
    Ok(())
}

/// Validar el año de fabricación contra el año en curso
pub fn validate_vehicle_year(year: i32, current_year: i32) -> AppResult<()> {
    if year < MIN_VEHICLE_YEAR || year > current_year {
        let mut error = ValidationError::new("range");
        error.add_param("min".into(), &MIN_VEHICLE_YEAR);
        error.add_param("max".into(), &current_year);
        error.add_param("actual".into(), &year);
        return Err(field_error("year", error));
    }
    Ok(())
}
