//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Los valores ausentes toman su default; los inválidos son un error.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};

/// Backend de persistencia seleccionado con `STORE_BACKEND`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{}'", other),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub store_backend: StoreBackend,
    pub event_bus_capacity: usize,
    pub license_sweep_interval_hours: u64,
    pub license_expiry_warning_days: i64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
            store_backend: StoreBackend::Postgres,
            event_bus_capacity: 256,
            license_sweep_interval_hours: 24,
            license_expiry_warning_days: 30,
        }
    }
}

/// Lee una variable y la parsea; ausente o vacía devuelve `default`
fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        _ => Ok(default),
    }
}

impl EnvironmentConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_var("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            cors_origins,
            store_backend: parse_var("STORE_BACKEND", defaults.store_backend)?,
            event_bus_capacity: parse_var("EVENT_BUS_CAPACITY", defaults.event_bus_capacity)?,
            license_sweep_interval_hours: parse_var(
                "LICENSE_SWEEP_INTERVAL_HOURS",
                defaults.license_sweep_interval_hours,
            )?,
            license_expiry_warning_days: parse_var(
                "LICENSE_EXPIRY_WARNING_DAYS",
                defaults.license_expiry_warning_days,
            )?,
        };

        if config.event_bus_capacity == 0 {
            bail!("EVENT_BUS_CAPACITY must be greater than 0");
        }
        if config.license_sweep_interval_hours == 0 {
            bail!("LICENSE_SWEEP_INTERVAL_HOURS must be greater than 0");
        }
        Ok(config)
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn license_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.license_sweep_interval_hours * 3600)
    }
}
