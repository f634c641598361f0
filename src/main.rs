use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fleet_ops::config::{DatabaseConfig, EnvironmentConfig, StoreBackend};
use fleet_ops::database::connect_and_migrate;
use fleet_ops::events::subscribers::register_default_subscribers;
use fleet_ops::events::EventBus;
use fleet_ops::jobs::license_expiry::LicenseExpiryJob;
use fleet_ops::repositories::{FleetStore, MemoryStore, PgStore};
use fleet_ops::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚚 Fleet Ops - backend de operaciones de flota");
    info!("================================================");

    let config = EnvironmentConfig::from_env()?;

    let store: Arc<dyn FleetStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = match connect_and_migrate(&db_config).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(e);
                }
            };
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("⚠️ STORE_BACKEND=memory: los datos se pierden al reiniciar");
            Arc::new(MemoryStore::new())
        }
    };

    let events = Arc::new(EventBus::new(config.event_bus_capacity));
    register_default_subscribers(&events);

    let state = AppState::new(store, events.clone(), config.clone());

    let (job_shutdown, job_shutdown_rx) = watch::channel(false);
    let job = LicenseExpiryJob::new(
        state.drivers.clone(),
        events.clone(),
        config.license_expiry_warning_days,
    )
    .spawn(config.license_sweep_interval(), job_shutdown_rx);

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🌐 Servidor iniciado en http://{}", addr);
    info!("📋 Endpoints: /health, /api/vehicles, /api/drivers, /api/trips, /api/maintenance, /api/expenses");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    job_shutdown.send_replace(true);
    events.shutdown();
    if let Err(e) = job.await {
        warn!("⚠️ El job de licencias terminó con error: {}", e);
    }

    info!("👋 Servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Señal de apagado recibida");
}
