//! Bus de eventos en proceso
//!
//! Cada suscriptor corre en su propia tarea tokio con su propio receptor del
//! canal broadcast. `publish` nunca bloquea ni falla hacia el llamador.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{EventTopic, FleetEvent};

/// Capacidad por defecto del canal; un suscriptor más lento pierde eventos (Lagged)
pub const DEFAULT_CAPACITY: usize = 256;

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Nombre usado en los logs
    fn name(&self) -> &str;

    async fn handle(&self, event: &FleetEvent) -> anyhow::Result<()>;
}

pub struct EventBus {
    sender: broadcast::Sender<FleetEvent>,
    shutdown: watch::Sender<bool>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        Self { sender, shutdown }
    }

    /// Publica sin esperar a los suscriptores
    pub fn publish(&self, event: FleetEvent) {
        let topic = event.topic();
        match self.sender.send(event) {
            Ok(receivers) => debug!("📣 Evento {} entregado a {} receptores", topic, receivers),
            // Sin suscriptores el evento simplemente se descarta
            Err(_) => debug!("📣 Evento {} sin suscriptores", topic),
        }
    }

    /// Registra un handler para un tópico. El receptor se crea antes de
    /// devolver, así que ningún evento publicado después se pierde.
    pub fn subscribe(&self, topic: EventTopic, handler: Arc<dyn EventHandler>) -> JoinHandle<()> {
        let mut events = self.sender.subscribe();
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("🛑 Suscriptor {} detenido", handler.name());
                            break;
                        }
                    }
                    received = events.recv() => match received {
                        Ok(event) if event.topic() == topic => {
                            if let Err(e) = handler.handle(&event).await {
                                warn!("⚠️ Suscriptor {} falló procesando {}: {:#}", handler.name(), topic, e);
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("⚠️ Suscriptor {} perdió {} eventos", handler.name(), skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        })
    }

    /// Receptor crudo de todos los eventos
    pub fn receiver(&self) -> broadcast::Receiver<FleetEvent> {
        self.sender.subscribe()
    }

    /// Detiene todas las tareas de suscriptores
    pub fn shutdown(&self) {
        // send_replace no falla aunque no haya suscriptores
        self.shutdown.send_replace(true);
    }
}
