use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Driver, DutyStatus, LicenseExpiryStatus, VehicleType};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDriverRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(length(min = 2, max = 50))]
    pub employee_id: String,

    #[validate(length(min = 4, max = 50))]
    pub license_number: String,

    pub license_expiry: NaiveDate,

    #[validate(length(min = 1))]
    pub authorized_types: Vec<VehicleType>,

    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDriverRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,

    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,

    #[validate(length(min = 4, max = 50))]
    pub license_number: Option<String>,

    pub license_expiry: Option<NaiveDate>,

    #[validate(length(min = 1))]
    pub authorized_types: Option<Vec<VehicleType>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDutyStatusRequest {
    pub duty_status: DutyStatus,
}

/// Vista de lectura con el estado de vencimiento de la licencia
#[derive(Debug, Clone, Serialize)]
pub struct DriverResponse {
    pub id: Uuid,
    pub name: String,
    pub employee_id: String,
    pub license_number: String,
    pub license_expiry: NaiveDate,
    pub license_expiry_status: LicenseExpiryStatus,
    pub authorized_types: Vec<VehicleType>,
    pub phone: Option<String>,
    pub duty_status: DutyStatus,
    pub completed_trips: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub completion_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DriverResponse {
    pub fn from_driver(driver: Driver, today: NaiveDate) -> Self {
        let license_expiry_status = driver.license_expiry_status(today);
        Self {
            id: driver.id,
            name: driver.name,
            employee_id: driver.employee_id,
            license_number: driver.license_number,
            license_expiry: driver.license_expiry,
            license_expiry_status,
            authorized_types: driver.authorized_types,
            phone: driver.phone,
            duty_status: driver.duty_status,
            completed_trips: driver.completed_trips,
            completion_rate: driver.completion_rate,
            created_at: driver.created_at,
            updated_at: driver.updated_at,
        }
    }
}

/// Resultado de la verificación de licencia
#[derive(Debug, Clone, Serialize)]
pub struct LicenseComplianceResponse {
    pub driver_id: Uuid,
    pub license_expiry: NaiveDate,
    pub license_expiry_status: LicenseExpiryStatus,
    pub days_until_expiry: i64,
}
