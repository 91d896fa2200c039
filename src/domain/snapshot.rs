// Per-poll aggregation results
use super::reading::Reading;
use super::watermark::Watermark;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Readings of one poll window, ascending by timestamp with one reading
/// per distinct timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    readings: Vec<Reading>,
}

impl Series {
    /// Stable-sort by timestamp, then keep the first reading of each run of
    /// equal timestamps.
    pub fn from_readings(mut readings: Vec<Reading>) -> Self {
        readings.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        readings.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn labels(&self) -> Vec<DateTime<Utc>> {
        self.readings.iter().map(Reading::recorded_at).collect()
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.readings.iter().map(|r| r.temperature).collect()
    }

    pub fn humidities(&self) -> Vec<f64> {
        self.readings.iter().map(|r| r.humidity).collect()
    }
}

/// Delay between a sensor taking a reading and the store receiving it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DelayStats {
    pub mean_ms: f64,
    pub std_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl DelayStats {
    /// Population statistics over `delays_ms`; `None` when empty.
    pub fn from_delays(delays_ms: &[f64]) -> Option<Self> {
        if delays_ms.is_empty() {
            return None;
        }

        let n = delays_ms.len() as f64;
        let mean = delays_ms.iter().sum::<f64>() / n;
        let variance = delays_ms.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        let min = delays_ms.iter().copied().fold(f64::INFINITY, f64::min);
        let max = delays_ms.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            mean_ms: mean,
            std_ms: variance.sqrt(),
            min_ms: min,
            max_ms: max,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryStats {
    /// Rows returned by the store.
    pub total_rows: usize,
    /// Rows dropped because a field was missing or not a finite number.
    pub skipped_rows: usize,
    /// Distinct timestamps among the valid rows.
    pub unique_rows: usize,
    pub delay: Option<DelayStats>,
}

impl DeliveryStats {
    pub fn unique_percent(&self) -> Option<f64> {
        if self.total_rows == 0 {
            None
        } else {
            Some(self.unique_rows as f64 / self.total_rows as f64 * 100.0)
        }
    }
}

/// Everything one poll cycle produces for a zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub zone_id: String,
    pub window_start: DateTime<Utc>,
    pub series: Series,
    pub temperature: Option<Watermark>,
    pub humidity: Option<Watermark>,
    pub stats: DeliveryStats,
}
