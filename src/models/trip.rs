//! Modelo de Trip
//!
//! Un viaje referencia (sin poseer) un vehículo y un conductor. COMPLETED y
//! CANCELLED son estados terminales.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del viaje - mapea al ENUM trip_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "trip_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Draft,
    Dispatched,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Draft => "DRAFT",
            TripStatus::Dispatched => "DISPATCHED",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Trip {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub origin: String,
    pub destination: String,
    /// Peso de la carga en kg
    pub cargo_weight: f64,
    pub estimated_fuel_cost: Option<i64>,
    pub revenue: Option<i64>,
    pub status: TripStatus,
    pub odometer_start: Option<i64>,
    pub odometer_end: Option<i64>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Distancia recorrida, sólo conocida para viajes completados
    pub fn distance(&self) -> Option<i64> {
        match (self.odometer_start, self.odometer_end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Transición aplicada a una fila de trips dentro de una transacción
#[derive(Debug, Clone, PartialEq)]
pub enum TripChange {
    Dispatch {
        odometer_start: i64,
        dispatched_at: DateTime<Utc>,
    },
    Complete {
        odometer_end: i64,
        completed_at: DateTime<Utc>,
    },
    Cancel {
        cancelled_at: DateTime<Utc>,
    },
}

impl TripChange {
    pub fn target_status(&self) -> TripStatus {
        match self {
            TripChange::Dispatch { .. } => TripStatus::Dispatched,
            TripChange::Complete { .. } => TripStatus::Completed,
            TripChange::Cancel { .. } => TripStatus::Cancelled,
        }
    }

    pub fn apply(&self, trip: &mut Trip) {
        trip.status = self.target_status();
        match *self {
            TripChange::Dispatch { odometer_start, dispatched_at } => {
                trip.odometer_start = Some(odometer_start);
                trip.dispatched_at = Some(dispatched_at);
            }
            TripChange::Complete { odometer_end, completed_at } => {
                trip.odometer_end = Some(odometer_end);
                trip.completed_at = Some(completed_at);
            }
            TripChange::Cancel { cancelled_at } => {
                trip.cancelled_at = Some(cancelled_at);
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripFilters {
    pub status: Option<TripStatus>,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
}

impl TripFilters {
    pub fn matches(&self, trip: &Trip) -> bool {
        self.status.map_or(true, |s| trip.status == s)
            && self.vehicle_id.map_or(true, |v| trip.vehicle_id == v)
            && self.driver_id.map_or(true, |d| trip.driver_id == d)
    }
}

/// Alcance de un conteo de viajes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripScope {
    Vehicle(Uuid),
    Driver(Uuid),
}
