// InfluxDB repository implementation
use crate::application::reading_repository::{QueryError, ReadingRepository};
use crate::domain::reading::ReadingRow;
use crate::infrastructure::config::{StoreSettings, prepare_query};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    query_template: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    #[allow(dead_code)]
    name: String,
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl InfluxRepository {
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            host: settings.host.trim_end_matches('/').to_string(),
            token: settings.token,
            database: settings.database,
            retention_policy: settings.retention_policy,
            query_template: settings.query,
            client: reqwest::Client::new(),
        }
    }

    fn build_query(&self, key: &str, window_start: DateTime<Utc>) -> String {
        let mut vars = HashMap::new();
        vars.insert("key".to_string(), escape_string_literal(key));
        vars.insert(
            "window_start_ms".to_string(),
            window_start.timestamp_millis().to_string(),
        );
        prepare_query(&self.query_template, &vars)
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host, self.database, self.retention_policy, encoded_query
        )
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse, QueryError> {
        let url = self.build_query_url(query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Status { status, body });
        }

        response
            .json::<InfluxQLResponse>()
            .await
            .map_err(|e| QueryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ReadingRepository for InfluxRepository {
    async fn query_readings(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<ReadingRow>, QueryError> {
        let query = self.build_query(key, window_start);
        tracing::debug!("Executing readings query: {}", query);

        let response = self.execute_query(&query).await?;
        let rows = rows_from_response(response)?;

        tracing::debug!("Got {} rows from InfluxDB for key {}", rows.len(), key);
        Ok(rows)
    }
}

/// Flatten the InfluxQL envelope into rows. The `time` column is the
/// store's own timestamp and becomes `received_at`.
fn rows_from_response(response: InfluxQLResponse) -> Result<Vec<ReadingRow>, QueryError> {
    let mut rows = Vec::new();

    for result in response.results {
        if let Some(error) = result.error {
            return Err(QueryError::Store(error));
        }

        for series in result.series.unwrap_or_default() {
            let column = |name: &str| series.columns.iter().position(|c| c == name);
            let time_idx = column("time");
            let timestamp_idx = column("timestamp");
            let temperature_idx = column("temperature");
            let humidity_idx = column("humidity");

            for values in &series.values {
                let cell = |idx: Option<usize>| {
                    idx.and_then(|i| values.get(i))
                        .filter(|v| !v.is_null())
                        .cloned()
                };

                let received_at = cell(time_idx)
                    .as_ref()
                    .and_then(Value::as_str)
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|t| t.with_timezone(&Utc));

                rows.push(ReadingRow {
                    timestamp: cell(timestamp_idx),
                    temperature: cell(temperature_idx),
                    humidity: cell(humidity_idx),
                    received_at,
                });
            }
        }
    }

    Ok(rows)
}

/// Escape a value for use inside a single-quoted InfluxQL string.
fn escape_string_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
