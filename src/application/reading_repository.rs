// Repository trait for sensor reading access
use crate::domain::reading::ReadingRow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("failed to reach the store: {0}")]
    Transport(String),
    #[error("store query failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode store response: {0}")]
    Decode(String),
    #[error("store reported an error: {0}")]
    Store(String),
}

#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// Fetch every row stored under `key` at or after `window_start`.
    /// Rows come back in whatever order the store produces them.
    async fn query_readings(
        &self,
        key: &str,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<ReadingRow>, QueryError>;
}
