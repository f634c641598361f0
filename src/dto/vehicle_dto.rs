use serde::Deserialize;
use validator::Validate;

use crate::models::VehicleType;

// Request para registrar un vehículo; el estado inicial siempre es AVAILABLE
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(length(min = 2, max = 100))]
    pub model: String,

    #[validate(length(min = 2, max = 20))]
    pub license_plate: String,

    pub year: i32,

    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,

    /// Carga máxima en kg
    pub max_capacity: f64,

    #[serde(default)]
    pub odometer: i64,

    pub acquisition_cost: Option<i64>,
}

// Edición administrativa; el estado no se edita por aquí
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub model: Option<String>,

    pub max_capacity: Option<f64>,

    pub odometer: Option<i64>,

    pub acquisition_cost: Option<i64>,
}
