//! Eventos de dominio
//!
//! El bus se construye en `main` y se inyecta a través de `AppState`; los
//! servicios publican después de confirmar su transacción y los suscriptores
//! nunca afectan el resultado de la operación que originó el evento.

pub mod event_bus;
pub mod subscribers;

pub use event_bus::{EventBus, EventHandler};

use serde::Serialize;
use uuid::Uuid;

/// Tópicos publicados por el sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    VehicleInShop,
    VehicleAvailable,
    TripDispatched,
    TripCompleted,
    DriverLicenseExpired,
}

impl EventTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventTopic::VehicleInShop => "vehicle.inShop",
            EventTopic::VehicleAvailable => "vehicle.available",
            EventTopic::TripDispatched => "trip.dispatched",
            EventTopic::TripCompleted => "trip.completed",
            EventTopic::DriverLicenseExpired => "driver.licenseExpired",
        }
    }
}

impl std::fmt::Display for EventTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payloads de los eventos, serializados en camelCase
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "topic", content = "payload")]
pub enum FleetEvent {
    #[serde(rename = "vehicle.inShop", rename_all = "camelCase")]
    VehicleInShop { vehicle_id: Uuid, plate: String },

    #[serde(rename = "vehicle.available", rename_all = "camelCase")]
    VehicleAvailable { vehicle_id: Uuid, plate: String },

    #[serde(rename = "trip.dispatched", rename_all = "camelCase")]
    TripDispatched {
        trip_id: Uuid,
        vehicle_id: Uuid,
        driver_id: Uuid,
    },

    #[serde(rename = "trip.completed", rename_all = "camelCase")]
    TripCompleted {
        trip_id: Uuid,
        vehicle_id: Uuid,
        driver_id: Uuid,
        odometer_end: i64,
    },

    #[serde(rename = "driver.licenseExpired", rename_all = "camelCase")]
    DriverLicenseExpired { driver_id: Uuid, name: String },
}

impl FleetEvent {
    pub fn topic(&self) -> EventTopic {
        match self {
            FleetEvent::VehicleInShop { .. } => EventTopic::VehicleInShop,
            FleetEvent::VehicleAvailable { .. } => EventTopic::VehicleAvailable,
            FleetEvent::TripDispatched { .. } => EventTopic::TripDispatched,
            FleetEvent::TripCompleted { .. } => EventTopic::TripCompleted,
            FleetEvent::DriverLicenseExpired { .. } => EventTopic::DriverLicenseExpired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_uses_camel_case_and_topic_name() {
        let vehicle_id = Uuid::new_v4();
        let event = FleetEvent::VehicleInShop {
            vehicle_id,
            plate: "MH-12-AB-1234".into(),
        };

        assert_eq!(event.topic().as_str(), "vehicle.inShop");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "topic": "vehicle.inShop",
                "payload": { "vehicleId": vehicle_id, "plate": "MH-12-AB-1234" }
            })
        );
    }

    #[test]
    fn test_completed_payload_carries_odometer() {
        let event = FleetEvent::TripCompleted {
            trip_id: Uuid::nil(),
            vehicle_id: Uuid::nil(),
            driver_id: Uuid::nil(),
            odometer_end: 10_250,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["topic"], "trip.completed");
        assert_eq!(value["payload"]["odometerEnd"], 10_250);
    }
}
