/// Formatting helpers for the readings log
use time::macros::format_description;
use time::OffsetDateTime;

use crate::models::Quantity;

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS`.
///
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Column name of one quantity of one sensor, e.g. `DHT11_PIN4_temp`.
pub fn log_field(sensor_name: &str, quantity: Quantity) -> String {
    format!("{}_{}", sensor_name, quantity)
}

/// Two decimals, or nothing for a missing value.
pub fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}
