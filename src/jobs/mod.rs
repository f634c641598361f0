//! Tareas periódicas en segundo plano

pub mod license_expiry;
