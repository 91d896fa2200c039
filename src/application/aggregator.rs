// Reading aggregator - Use case turning a query window into a snapshot
use crate::application::reading_repository::{QueryError, ReadingRepository};
use crate::domain::reading::{Reading, ReadingRow};
use crate::domain::snapshot::{DelayStats, DeliveryStats, Series, Snapshot};
use crate::domain::watermark::track;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Per-zone aggregation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Store key identifying the monitored zone.
    pub query_key: String,
    /// How far back each poll looks.
    pub window_size_seconds: u64,
    pub poll_interval_ms: u64,
}

impl AggregatorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The look-back window, or `None` when it is too large to represent.
    pub fn window(&self) -> Option<TimeDelta> {
        i64::try_from(self.window_size_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
    }
}

#[derive(Clone)]
pub struct ReadingAggregator {
    zone_id: String,
    config: AggregatorConfig,
    repository: Arc<dyn ReadingRepository>,
}

impl ReadingAggregator {
    pub fn new(
        zone_id: String,
        config: AggregatorConfig,
        repository: Arc<dyn ReadingRepository>,
    ) -> Self {
        Self {
            zone_id,
            config,
            repository,
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.config
            .window()
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Query the store for the window and aggregate the result.
    pub async fn refresh(&self, window_start: DateTime<Utc>) -> Result<Snapshot, QueryError> {
        tracing::debug!(
            "Querying zone {} (key {}) from {}",
            self.zone_id,
            self.config.query_key,
            window_start
        );

        let rows = self
            .repository
            .query_readings(&self.config.query_key, window_start)
            .await?;

        Ok(aggregate(&self.zone_id, window_start, rows))
    }
}

/// Parse, order, deduplicate and summarize one window of rows.
pub fn aggregate(zone_id: &str, window_start: DateTime<Utc>, rows: Vec<ReadingRow>) -> Snapshot {
    let total_rows = rows.len();
    let mut readings = Vec::with_capacity(total_rows);
    let mut delays_ms = Vec::new();

    for row in &rows {
        match row.parse() {
            Ok(reading) => {
                if let Some(received_at) = row.received_at {
                    delays_ms.push(delay_ms(&reading, received_at));
                }
                readings.push(reading);
            }
            Err(e) => {
                tracing::debug!("Skipping malformed row for zone {}: {}", zone_id, e);
            }
        }
    }

    let skipped_rows = total_rows - readings.len();
    let series = Series::from_readings(readings);

    let mut temperature = None;
    let mut humidity = None;
    for reading in series.readings() {
        track(&mut temperature, reading.temperature, reading.timestamp);
        track(&mut humidity, reading.humidity, reading.timestamp);
    }

    let stats = DeliveryStats {
        total_rows,
        skipped_rows,
        unique_rows: series.len(),
        delay: DelayStats::from_delays(&delays_ms),
    };

    Snapshot {
        zone_id: zone_id.to_string(),
        window_start,
        series,
        temperature,
        humidity,
        stats,
    }
}

fn delay_ms(reading: &Reading, received_at: DateTime<Utc>) -> f64 {
    received_at.timestamp_millis() as f64 - reading.timestamp * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reading_repository::testing::StubRepository;
    use crate::domain::watermark::Watermark;
    use serde_json::json;

    fn window() -> DateTime<Utc> {
        DateTime::from_timestamp(0, 0).unwrap()
    }

    fn config() -> AggregatorConfig {
        AggregatorConfig {
            query_key: "temp-humidity/Omega-F4E1/top".to_string(),
            window_size_seconds: 86_400,
            poll_interval_ms: 300_000,
        }
    }

    #[test]
    fn test_aggregate_example_window() {
        let rows = vec![
            ReadingRow::from_numbers(100.0, 20.0, 50.0),
            ReadingRow::from_numbers(50.0, 22.5, 48.0),
            ReadingRow::from_numbers(100.0, 20.0, 50.0),
        ];

        let snapshot = aggregate("top", window(), rows);

        assert_eq!(
            snapshot.series.readings(),
            &[Reading::new(50.0, 22.5, 48.0), Reading::new(100.0, 20.0, 50.0)]
        );
        assert_eq!(
            snapshot.temperature,
            Some(Watermark {
                high: 22.5,
                high_at: 50.0,
                low: 20.0,
                low_at: 100.0,
            })
        );
        assert_eq!(
            snapshot.humidity,
            Some(Watermark {
                high: 50.0,
                high_at: 100.0,
                low: 48.0,
                low_at: 50.0,
            })
        );
        assert_eq!(snapshot.stats.total_rows, 3);
        assert_eq!(snapshot.stats.unique_rows, 2);
    }

    #[test]
    fn test_single_row_sets_both_bounds() {
        let snapshot = aggregate("top", window(), vec![ReadingRow::from_numbers(10.0, 18.0, 60.0)]);

        assert_eq!(snapshot.temperature, Some(Watermark::starting_at(18.0, 10.0)));
        assert_eq!(snapshot.humidity, Some(Watermark::starting_at(60.0, 10.0)));
    }

    #[test]
    fn test_empty_window_has_no_watermarks() {
        let snapshot = aggregate("top", window(), Vec::new());

        assert!(snapshot.series.is_empty());
        assert_eq!(snapshot.temperature, None);
        assert_eq!(snapshot.humidity, None);
        assert_eq!(snapshot.stats, DeliveryStats::default());
    }

    #[test]
    fn test_distinct_timestamps_keep_every_row_in_order() {
        let rows: Vec<ReadingRow> = [7.0, 3.0, 9.0, 1.0, 5.0]
            .iter()
            .map(|&t| ReadingRow::from_numbers(t, t * 2.0, 40.0 + t))
            .collect();

        let snapshot = aggregate("top", window(), rows);

        let timestamps: Vec<f64> = snapshot.series.readings().iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![1.0, 3.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_high_never_below_low() {
        let rows: Vec<ReadingRow> = (0..50)
            .map(|i| {
                let t = i as f64;
                ReadingRow::from_numbers((i * 37 % 50) as f64, (t * 1.7).sin() * 10.0, (t * 0.3).cos() * 30.0 + 50.0)
            })
            .collect();

        let snapshot = aggregate("top", window(), rows);

        for mark in [snapshot.temperature.unwrap(), snapshot.humidity.unwrap()] {
            assert!(mark.high >= mark.low);
        }
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let rows = vec![
            ReadingRow::from_numbers(30.0, 12.0, 70.0),
            ReadingRow::from_numbers(10.0, 13.0, 71.0),
            ReadingRow::from_numbers(30.0, 12.0, 70.0),
            ReadingRow::from_numbers(20.0, 11.5, 69.0),
        ];

        let first = aggregate("top", window(), rows.clone());
        let second = aggregate("top", window(), rows);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let rows = vec![
            ReadingRow::from_numbers(10.0, 15.0, 60.0),
            ReadingRow {
                temperature: Some(json!("n/a")),
                ..ReadingRow::from_numbers(20.0, 0.0, 0.0)
            },
            ReadingRow {
                humidity: None,
                ..ReadingRow::from_numbers(30.0, -999.0, 0.0)
            },
            ReadingRow::from_numbers(40.0, 16.0, 61.0),
        ];

        let snapshot = aggregate("top", window(), rows);

        assert_eq!(snapshot.series.len(), 2);
        assert_eq!(snapshot.stats.skipped_rows, 2);
        let temperature = snapshot.temperature.unwrap();
        assert_eq!(temperature.low, 15.0);
        assert_eq!(temperature.high, 16.0);
    }

    #[test]
    fn test_delay_stats_from_received_time() {
        let received = |ms: i64| DateTime::from_timestamp_millis(ms).unwrap();
        let rows = vec![
            ReadingRow::from_numbers(10.0, 15.0, 60.0).with_received_at(received(10_250)),
            ReadingRow::from_numbers(20.0, 15.0, 60.0).with_received_at(received(20_750)),
            ReadingRow::from_numbers(30.0, 15.0, 60.0),
        ];

        let delay = aggregate("top", window(), rows).stats.delay.unwrap();

        assert_eq!(delay.mean_ms, 500.0);
        assert_eq!(delay.min_ms, 250.0);
        assert_eq!(delay.max_ms, 750.0);
    }

    #[test]
    fn test_window_start() {
        let aggregator = ReadingAggregator::new(
            "top".to_string(),
            config(),
            Arc::new(StubRepository::default()),
        );
        let now = DateTime::from_timestamp(1_704_110_400, 0).unwrap();

        assert_eq!(aggregator.window_start(now).timestamp(), 1_704_110_400 - 86_400);
    }

    #[test]
    fn test_oversized_window_reaches_back_to_earliest_time() {
        let now = DateTime::from_timestamp(1_704_110_400, 0).unwrap();

        for window_size_seconds in [u64::MAX, i64::MAX as u64 + 1, i64::MAX as u64] {
            let config = AggregatorConfig {
                window_size_seconds,
                ..config()
            };
            assert!(config.window().is_none());

            let aggregator =
                ReadingAggregator::new("top".to_string(), config, Arc::new(StubRepository::default()));
            let start = aggregator.window_start(now);
            assert_eq!(start, DateTime::<Utc>::MIN_UTC);
            assert!(start < now);
        }
    }

    #[tokio::test]
    async fn test_refresh_queries_zone_key() {
        let repository = Arc::new(StubRepository::returning(vec![ReadingRow::from_numbers(
            5.0, 14.0, 65.0,
        )]));
        let aggregator = ReadingAggregator::new("top".to_string(), config(), repository.clone());

        let snapshot = aggregator.refresh(window()).await.unwrap();

        assert_eq!(snapshot.zone_id, "top");
        assert_eq!(snapshot.series.len(), 1);
        assert_eq!(
            repository.last_request(),
            Some(("temp-humidity/Omega-F4E1/top".to_string(), window()))
        );
    }

    #[tokio::test]
    async fn test_refresh_propagates_query_error() {
        let repository = Arc::new(StubRepository::failing(QueryError::Transport(
            "connection refused".to_string(),
        )));
        let aggregator = ReadingAggregator::new("top".to_string(), config(), repository);

        let result = aggregator.refresh(window()).await;

        assert_eq!(
            result,
            Err(QueryError::Transport("connection refused".to_string()))
        );
    }
}
