// Render collaborators - Chart and watermark text output
use crate::domain::reading::epoch_seconds_to_datetime;
use crate::domain::snapshot::{DeliveryStats, Snapshot};
use crate::domain::watermark::Watermark;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const HUMIDITY_UNIT: &str = "%";
const MISSING: &str = "n/a";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a value stored in degrees Celsius to this unit.
    pub fn convert(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

/// The four high/low text fields shown next to the charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WatermarkText {
    pub temperature_high: String,
    pub temperature_low: String,
    pub humidity_high: String,
    pub humidity_low: String,
}

impl WatermarkText {
    pub fn from_snapshot(snapshot: &Snapshot, unit: TemperatureUnit) -> Self {
        let temperature = snapshot.temperature.map(|mark| convert_mark(mark, unit));
        let suffix = unit.suffix();

        Self {
            temperature_high: format_high(temperature.as_ref(), suffix),
            temperature_low: format_low(temperature.as_ref(), suffix),
            humidity_high: format_high(snapshot.humidity.as_ref(), HUMIDITY_UNIT),
            humidity_low: format_low(snapshot.humidity.as_ref(), HUMIDITY_UNIT),
        }
    }
}

fn convert_mark(mark: Watermark, unit: TemperatureUnit) -> Watermark {
    Watermark {
        high: unit.convert(mark.high),
        low: unit.convert(mark.low),
        ..mark
    }
}

fn format_high(mark: Option<&Watermark>, unit: &str) -> String {
    mark.map(|m| format_value(m.high, m.high_at, unit))
        .unwrap_or_else(|| MISSING.to_string())
}

fn format_low(mark: Option<&Watermark>, unit: &str) -> String {
    mark.map(|m| format_value(m.low, m.low_at, unit))
        .unwrap_or_else(|| MISSING.to_string())
}

fn format_value(value: f64, at: f64, unit: &str) -> String {
    format!("{:.2}{} at {}", value, unit, format_timestamp(epoch_seconds_to_datetime(at)))
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Chart content for one zone: one label per reading and the matching values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<DateTime<Utc>>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
}

impl ChartSeries {
    pub fn from_snapshot(snapshot: &Snapshot, unit: TemperatureUnit) -> Self {
        Self {
            labels: snapshot.series.labels(),
            temperature: snapshot
                .series
                .temperatures()
                .into_iter()
                .map(|c| unit.convert(c))
                .collect(),
            humidity: snapshot.series.humidities(),
        }
    }
}

/// Everything a zone's page shows after one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneView {
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub chart: ChartSeries,
    pub text: WatermarkText,
    pub stats: DeliveryStats,
}

impl ZoneView {
    pub fn from_snapshot(snapshot: &Snapshot, unit: TemperatureUnit, updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at,
            chart: ChartSeries::from_snapshot(snapshot, unit),
            text: WatermarkText::from_snapshot(snapshot, unit),
            stats: snapshot.stats.clone(),
        }
    }
}

/// Receives rendered poll results. Each call replaces the whole view of the
/// zone, chart and text together; nothing is appended.
pub trait DisplaySink: Send + Sync {
    fn show(&self, zone_id: &str, view: ZoneView);
}

/// Push one snapshot to the display.
pub fn render(snapshot: &Snapshot, unit: TemperatureUnit, sink: &dyn DisplaySink) {
    sink.show(&snapshot.zone_id, ZoneView::from_snapshot(snapshot, unit, Utc::now()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::aggregator::aggregate;
    use crate::domain::reading::ReadingRow;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        views: Mutex<Vec<(String, ZoneView)>>,
    }

    impl DisplaySink for RecordingSink {
        fn show(&self, zone_id: &str, view: ZoneView) {
            self.views.lock().unwrap().push((zone_id.to_string(), view));
        }
    }

    fn snapshot() -> Snapshot {
        let window = DateTime::from_timestamp(0, 0).unwrap();
        aggregate(
            "top",
            window,
            vec![
                ReadingRow::from_numbers(1_704_110_400.0, 20.0, 50.0),
                ReadingRow::from_numbers(1_704_114_000.0, 22.5, 48.0),
            ],
        )
    }

    #[test]
    fn test_watermark_text_celsius() {
        let text = WatermarkText::from_snapshot(&snapshot(), TemperatureUnit::Celsius);

        assert_eq!(text.temperature_high, "22.50°C at 2024-01-01 13:00:00 UTC");
        assert_eq!(text.temperature_low, "20.00°C at 2024-01-01 12:00:00 UTC");
        assert_eq!(text.humidity_high, "50.00% at 2024-01-01 12:00:00 UTC");
        assert_eq!(text.humidity_low, "48.00% at 2024-01-01 13:00:00 UTC");
    }

    #[test]
    fn test_watermark_text_fahrenheit() {
        let text = WatermarkText::from_snapshot(&snapshot(), TemperatureUnit::Fahrenheit);

        assert_eq!(text.temperature_high, "72.50°F at 2024-01-01 13:00:00 UTC");
        assert_eq!(text.temperature_low, "68.00°F at 2024-01-01 12:00:00 UTC");
        assert_eq!(text.humidity_high, "50.00% at 2024-01-01 12:00:00 UTC");
    }

    #[test]
    fn test_watermark_text_without_data() {
        let empty = aggregate("top", DateTime::from_timestamp(0, 0).unwrap(), Vec::new());
        let text = WatermarkText::from_snapshot(&empty, TemperatureUnit::Celsius);

        assert_eq!(text.temperature_high, "n/a");
        assert_eq!(text.humidity_low, "n/a");
    }

    #[test]
    fn test_render_hands_over_chart_and_text_in_one_view() {
        let sink = RecordingSink::default();

        render(&snapshot(), TemperatureUnit::Fahrenheit, &sink);

        let views = sink.views.lock().unwrap();
        assert_eq!(views.len(), 1);
        let (zone, view) = &views[0];
        assert_eq!(zone, "top");
        assert_eq!(view.chart.labels.len(), 2);
        assert_eq!(view.chart.temperature, vec![68.0, 72.5]);
        assert_eq!(view.chart.humidity, vec![50.0, 48.0]);
        assert_eq!(view.text.temperature_low, "68.00°F at 2024-01-01 12:00:00 UTC");
        assert_eq!(view.stats.unique_rows, 2);
    }

    #[test]
    fn test_view_serializes_chart_fields_at_top_level() {
        let updated_at = DateTime::from_timestamp(60, 0).unwrap();
        let view = ZoneView::from_snapshot(&snapshot(), TemperatureUnit::Celsius, updated_at);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["temperature"][1], 22.5);
        assert_eq!(json["labels"].as_array().unwrap().len(), 2);
        assert_eq!(json["text"]["humidity_low"], "48.00% at 2024-01-01 13:00:00 UTC");
    }

    #[test]
    fn test_unit_deserializes_lowercase() {
        let unit: TemperatureUnit = serde_json::from_str("\"fahrenheit\"").unwrap();
        assert_eq!(unit, TemperatureUnit::Fahrenheit);
    }
}
