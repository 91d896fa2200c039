// Sensor reading domain models
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// One temperature/humidity sample. `timestamp` is seconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub timestamp: f64,
    pub temperature: f64,
    pub humidity: f64,
}

impl Reading {
    pub fn new(timestamp: f64, temperature: f64, humidity: f64) -> Self {
        Self {
            timestamp,
            temperature,
            humidity,
        }
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        epoch_seconds_to_datetime(self.timestamp)
    }
}

/// A row as returned by the store, before any validation.
///
/// Field values are kept as raw JSON so that numbers and numeric strings
/// are both accepted; `received_at` is the store's own insert time when
/// the backend reports one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingRow {
    pub timestamp: Option<Value>,
    pub temperature: Option<Value>,
    pub humidity: Option<Value>,
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("field `{0}` is missing")]
    Missing(&'static str),
    #[error("field `{field}` is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
    #[error("field `{0}` is not a finite number")]
    NotFinite(&'static str),
}

impl ReadingRow {
    /// Validate the row into a `Reading`. Rows with a missing, non-numeric
    /// or non-finite field are rejected so they never reach the watermarks.
    pub fn parse(&self) -> Result<Reading, RowError> {
        let timestamp = field("timestamp", self.timestamp.as_ref())?;
        let temperature = field("temperature", self.temperature.as_ref())?;
        let humidity = field("humidity", self.humidity.as_ref())?;
        Ok(Reading::new(timestamp, temperature, humidity))
    }
}

#[cfg(test)]
impl ReadingRow {
    pub fn from_numbers(timestamp: f64, temperature: f64, humidity: f64) -> Self {
        Self {
            timestamp: Some(Value::from(timestamp)),
            temperature: Some(Value::from(temperature)),
            humidity: Some(Value::from(humidity)),
            received_at: None,
        }
    }

    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }
}

fn field(name: &'static str, value: Option<&Value>) -> Result<f64, RowError> {
    let value = value.ok_or(RowError::Missing(name))?;
    let number = parse_number(value).ok_or_else(|| RowError::NotNumeric {
        field: name,
        value: value.to_string(),
    })?;

    if number.is_finite() {
        Ok(number)
    } else {
        Err(RowError::NotFinite(name))
    }
}

/// Accepts JSON numbers and numeric strings (stores often ship numbers as text).
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Convert fractional epoch seconds to a UTC date-time, millisecond precision.
/// Out-of-range values collapse to the epoch.
pub fn epoch_seconds_to_datetime(seconds: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64).unwrap_or_default()
}
