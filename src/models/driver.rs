//! Modelo de Driver
//!
//! Conductores, su estado de servicio y la métrica derivada de cumplimiento.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use super::vehicle::VehicleType;
use crate::utils::dates;

/// Estado de servicio - mapea al ENUM duty_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "duty_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DutyStatus {
    OnDuty,
    OffDuty,
    Suspended,
}

impl DutyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DutyStatus::OnDuty => "ON_DUTY",
            DutyStatus::OffDuty => "OFF_DUTY",
            DutyStatus::Suspended => "SUSPENDED",
        }
    }
}

impl std::fmt::Display for DutyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseExpiryStatus {
    Valid,
    Expiring,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub employee_id: String,
    pub license_number: String,
    pub license_expiry: NaiveDate,
    pub authorized_types: Vec<VehicleType>,
    pub phone: Option<String>,
    pub duty_status: DutyStatus,
    pub completed_trips: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub completion_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn is_license_expired(&self, today: NaiveDate) -> bool {
        dates::is_expired(self.license_expiry, today)
    }

    pub fn is_authorized_for(&self, vehicle_type: VehicleType) -> bool {
        self.authorized_types.contains(&vehicle_type)
    }

    pub fn license_expiry_status(&self, today: NaiveDate) -> LicenseExpiryStatus {
        if self.is_license_expired(today) {
            LicenseExpiryStatus::Expired
        } else if dates::is_expiring_soon(self.license_expiry, today, dates::EXPIRY_WARNING_DAYS) {
            LicenseExpiryStatus::Expiring
        } else {
            LicenseExpiryStatus::Valid
        }
    }
}

/// Porcentaje de viajes asignados que llegaron a COMPLETED, redondeado a un
/// decimal (mitades alejándose de cero). Sin viajes asignados vale 100.
pub fn completion_rate(completed: i64, total_assigned: i64) -> Decimal {
    if total_assigned <= 0 {
        return Decimal::new(1000, 1);
    }
    let rate = Decimal::from(completed) * Decimal::ONE_HUNDRED / Decimal::from(total_assigned);
    rate.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Default)]
pub struct DriverChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub authorized_types: Option<Vec<VehicleType>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverFilters {
    pub duty_status: Option<DutyStatus>,
    /// Sólo conductores cuya licencia vence en o antes de esta fecha
    #[serde(skip)]
    pub license_expires_by: Option<NaiveDate>,
    #[serde(skip)]
    pub exclude_status: Option<DutyStatus>,
}

impl DriverFilters {
    pub fn matches(&self, driver: &Driver) -> bool {
        self.duty_status.map_or(true, |s| driver.duty_status == s)
            && self.license_expires_by.map_or(true, |d| driver.license_expiry <= d)
            && self.exclude_status.map_or(true, |s| driver.duty_status != s)
    }
}
