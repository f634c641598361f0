//! Helpers de fechas para vencimiento de licencias

use chrono::{NaiveDate, Utc};

/// Días de antelación con los que una licencia se considera "por vencer"
pub const EXPIRY_WARNING_DAYS: i64 = 30;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Una licencia es válida hasta el final de su fecha de vencimiento
pub fn is_expired(expiry: NaiveDate, today: NaiveDate) -> bool {
    expiry < today
}

pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

pub fn is_expiring_soon(expiry: NaiveDate, today: NaiveDate, days: i64) -> bool {
    let diff = days_until(expiry, today);
    (0..=days).contains(&diff)
}
