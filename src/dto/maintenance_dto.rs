use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::ServiceType;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateServiceLogRequest {
    pub vehicle_id: Uuid,

    pub service_type: ServiceType,

    #[validate(length(min = 2, max = 500))]
    pub description: String,

    #[validate(length(min = 2, max = 100))]
    pub technician_name: String,

    pub cost: i64,

    /// Por defecto, ahora
    pub scheduled_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteServiceRequest {
    pub completed_date: Option<DateTime<Utc>>,
    pub final_cost: Option<i64>,
}
