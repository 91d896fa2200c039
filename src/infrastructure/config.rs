use crate::application::aggregator::AggregatorConfig;
use crate::application::display::TemperatureUnit;
use crate::domain::zone::Zone;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "config/monitor";
const ENV_PREFIX: &str = "MONITOR";

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub store: StoreSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    #[serde(default = "default_retention_policy")]
    pub retention_policy: String,
    /// InfluxQL template; `${key}` and `${window_start_ms}` are substituted.
    #[serde(default = "default_query")]
    pub query: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingSettings {
    #[serde(default = "default_window_size_seconds")]
    pub window_size_seconds: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DisplaySettings {
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ZoneConfig {
    pub id: String,
    pub query_key: String,
    pub name: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            window_size_seconds: default_window_size_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_retention_policy() -> String {
    "autogen".to_string()
}

fn default_query() -> String {
    "SELECT \"temperature\", \"humidity\", \"timestamp\" FROM \"readings\" \
     WHERE \"topic\" = '${key}' AND time >= ${window_start_ms}ms"
        .to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_window_size_seconds() -> u64 {
    86_400
}

fn default_poll_interval_ms() -> u64 {
    300_000
}

impl MonitorConfig {
    pub fn zones(&self) -> Vec<Zone> {
        self.zones
            .iter()
            .map(|z| Zone::new(z.id.clone(), z.query_key.clone(), z.name.clone()))
            .collect()
    }

    pub fn aggregator_config(&self, zone: &ZoneConfig) -> AggregatorConfig {
        AggregatorConfig {
            query_key: zone.query_key.clone(),
            window_size_seconds: self.polling.window_size_seconds,
            poll_interval_ms: self.polling.poll_interval_ms,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.zones.is_empty() {
            anyhow::bail!("no zones configured");
        }

        let mut seen = HashSet::new();
        for zone in &self.zones {
            if !seen.insert(zone.id.as_str()) {
                anyhow::bail!("duplicate zone id: {}", zone.id);
            }
            if zone.query_key.is_empty() {
                anyhow::bail!("zone {} has an empty query_key", zone.id);
            }
        }

        if self.polling.poll_interval_ms == 0 {
            anyhow::bail!("polling.poll_interval_ms must be positive");
        }
        if self.polling.window_size_seconds == 0 {
            anyhow::bail!("polling.window_size_seconds must be positive");
        }
        if let Some(zone) = self.zones.first() {
            if self.aggregator_config(zone).window().is_none() {
                anyhow::bail!(
                    "polling.window_size_seconds is too large: {}",
                    self.polling.window_size_seconds
                );
            }
        }

        Ok(())
    }
}

/// Load `config/monitor.*` (or the given file), then `MONITOR__*` overrides.
pub fn load_monitor_config(path: Option<&Path>) -> anyhow::Result<MonitorConfig> {
    let builder = config::Config::builder();
    let builder = match path {
        Some(path) => builder.add_source(File::from(path)),
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
    };

    build_config(builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__")))
}

fn build_config(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<MonitorConfig> {
    let settings: MonitorConfig = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

/// Replace `${name}` placeholders in a query string in a single pass.
/// Substituted values are never scanned again; unknown placeholders are kept.
pub fn prepare_query(query: &str, vars: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(query.len());
    let mut rest = query;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let substitution = after
            .find('}')
            .and_then(|end| vars.get(&after[..end]).map(|value| (end, value)));

        match substitution {
            Some((end, value)) => {
                result.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                result.push_str("${");
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}
