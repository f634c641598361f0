//! Suscriptores registrados al arrancar

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{EventBus, EventHandler, EventTopic, FleetEvent};

/// Deja constancia en el log de cada evento de dominio
pub struct AuditLogSubscriber;

#[async_trait]
impl EventHandler for AuditLogSubscriber {
    fn name(&self) -> &str {
        "audit_log"
    }

    async fn handle(&self, event: &FleetEvent) -> anyhow::Result<()> {
        match event {
            FleetEvent::VehicleInShop { vehicle_id, plate } => {
                info!("🔧 Vehículo {} ({}) entró a taller", plate, vehicle_id);
            }
            FleetEvent::VehicleAvailable { vehicle_id, plate } => {
                info!("✅ Vehículo {} ({}) disponible", plate, vehicle_id);
            }
            FleetEvent::TripDispatched { trip_id, vehicle_id, driver_id } => {
                info!("🚚 Viaje {} despachado (vehículo {}, conductor {})", trip_id, vehicle_id, driver_id);
            }
            FleetEvent::TripCompleted { trip_id, odometer_end, .. } => {
                info!("🏁 Viaje {} completado en {} km", trip_id, odometer_end);
            }
            FleetEvent::DriverLicenseExpired { driver_id, name } => {
                info!("🪪 Licencia vencida: {} ({}) suspendido", name, driver_id);
            }
        }
        Ok(())
    }
}

const ALL_TOPICS: [EventTopic; 5] = [
    EventTopic::VehicleInShop,
    EventTopic::VehicleAvailable,
    EventTopic::TripDispatched,
    EventTopic::TripCompleted,
    EventTopic::DriverLicenseExpired,
];

pub fn register_default_subscribers(bus: &EventBus) {
    let audit: Arc<dyn EventHandler> = Arc::new(AuditLogSubscriber);
    for topic in ALL_TOPICS {
        bus.subscribe(topic, audit.clone());
    }
    info!("📡 {} suscriptores de auditoría registrados", ALL_TOPICS.len());
}
