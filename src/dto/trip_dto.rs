use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::TripStatus;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTripRequest {
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,

    #[validate(length(min = 2, max = 200))]
    pub origin: String,

    #[validate(length(min = 2, max = 200))]
    pub destination: String,

    /// Peso de la carga en kg
    pub cargo_weight: f64,

    pub estimated_fuel_cost: Option<i64>,

    pub revenue: Option<i64>,

    /// DRAFT o DISPATCHED; por defecto DISPATCHED
    pub status: Option<TripStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTripStatusRequest {
    pub status: TripStatus,
    pub odometer_end: Option<i64>,
}
