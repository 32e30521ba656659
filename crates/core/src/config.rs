//! Configuration management -- flowherd.toml parsing and runtime settings.
//!
//! [`FlowherdConfig`] is the top-level structure for one supervisor run.
//! It is read once at startup and immutable afterwards; changing it
//! requires a full pipeline restart.
//!
//! # Loading precedence
//! 1. CLI arguments (highest)
//! 2. Environment variables (`FLOWHERD_PIPELINE_INTERFACE=eth0` style)
//! 3. Configuration file (`flowherd.toml`)
//! 4. Defaults (`Default` impls)

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, FlowherdError};

/// Unified flowherd configuration.
///
/// Represents the top-level structure of `flowherd.toml`. Each component
/// reads only its own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowherdConfig {
    /// General settings (logging, PID file).
    #[serde(default)]
    pub general: GeneralConfig,
    /// Pipeline topology and supervision settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Archival branch settings.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Aggregation branch settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,
    /// Stage executable names (overridable for testing and packaging).
    #[serde(default)]
    pub programs: ProgramsConfig,
}

impl FlowherdConfig {
    /// Load configuration from a TOML file and apply environment overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FlowherdError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, without environment overrides
    /// or validation. [`load`](Self::load) validates after the overrides
    /// are applied, so an override can repair a bad file value.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, FlowherdError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FlowherdError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                FlowherdError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, FlowherdError> {
        toml::from_str(toml_str).map_err(|e| {
            FlowherdError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Override settings from environment variables.
    ///
    /// Naming convention: `FLOWHERD_{SECTION}_{FIELD}`,
    /// e.g. `FLOWHERD_PIPELINE_INTERFACE=eth0`.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "FLOWHERD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "FLOWHERD_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "FLOWHERD_GENERAL_PID_FILE");

        // Pipeline
        override_string(&mut self.pipeline.interface, "FLOWHERD_PIPELINE_INTERFACE");
        override_u16(
            &mut self.pipeline.capture_port,
            "FLOWHERD_PIPELINE_CAPTURE_PORT",
        );
        override_u16(&mut self.pipeline.hub_port, "FLOWHERD_PIPELINE_HUB_PORT");
        override_bool(&mut self.pipeline.enrichment, "FLOWHERD_PIPELINE_ENRICHMENT");
        override_u64(
            &mut self.pipeline.poll_interval_ms,
            "FLOWHERD_PIPELINE_POLL_INTERVAL_MS",
        );
        override_u64(
            &mut self.pipeline.probe_interval_ms,
            "FLOWHERD_PIPELINE_PROBE_INTERVAL_MS",
        );
        override_u32(
            &mut self.pipeline.probe_attempts,
            "FLOWHERD_PIPELINE_PROBE_ATTEMPTS",
        );
        override_u64(
            &mut self.pipeline.shutdown_grace_ms,
            "FLOWHERD_PIPELINE_SHUTDOWN_GRACE_MS",
        );
        override_u64(
            &mut self.pipeline.restart_backoff_ms,
            "FLOWHERD_PIPELINE_RESTART_BACKOFF_MS",
        );
        override_u64(
            &mut self.pipeline.restart_backoff_cap_ms,
            "FLOWHERD_PIPELINE_RESTART_BACKOFF_CAP_MS",
        );
        override_u32(
            &mut self.pipeline.max_consecutive_failures,
            "FLOWHERD_PIPELINE_MAX_CONSECUTIVE_FAILURES",
        );

        // Archive
        override_string(&mut self.archive.root, "FLOWHERD_ARCHIVE_ROOT");
        override_string(&mut self.archive.prefix, "FLOWHERD_ARCHIVE_PREFIX");
        override_string(&mut self.archive.rotation, "FLOWHERD_ARCHIVE_ROTATION");
        override_u32(
            &mut self.archive.compress_after_days,
            "FLOWHERD_ARCHIVE_COMPRESS_AFTER_DAYS",
        );
        override_u32(&mut self.archive.retain_days, "FLOWHERD_ARCHIVE_RETAIN_DAYS");

        // Aggregation
        override_bool(&mut self.aggregation.enabled, "FLOWHERD_AGGREGATION_ENABLED");
        override_string(
            &mut self.aggregation.pipe_path,
            "FLOWHERD_AGGREGATION_PIPE_PATH",
        );
        override_u64(
            &mut self.aggregation.bin_interval_secs,
            "FLOWHERD_AGGREGATION_BIN_INTERVAL_SECS",
        );

        // Programs
        override_string(&mut self.programs.capture, "FLOWHERD_PROGRAMS_CAPTURE");
        override_string(&mut self.programs.hub, "FLOWHERD_PROGRAMS_HUB");
        override_string(&mut self.programs.archiver, "FLOWHERD_PROGRAMS_ARCHIVER");
        override_string(&mut self.programs.aggregator, "FLOWHERD_PROGRAMS_AGGREGATOR");
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), FlowherdError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.pipeline.interface.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.interface".to_owned(),
                reason: "interface must not be empty".to_owned(),
            }
            .into());
        }

        if self.pipeline.capture_port == 0 || self.pipeline.hub_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.capture_port/hub_port".to_owned(),
                reason: "ports must be non-zero".to_owned(),
            }
            .into());
        }

        if self.pipeline.capture_port == self.pipeline.hub_port {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.hub_port".to_owned(),
                reason: "capture and hub must listen on distinct ports".to_owned(),
            }
            .into());
        }

        if self.pipeline.probe_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.probe_attempts".to_owned(),
                reason: "at least one probe attempt is required".to_owned(),
            }
            .into());
        }

        if self.archive.root.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "archive.root".to_owned(),
                reason: "archive root must not be empty".to_owned(),
            }
            .into());
        }

        // Deletion is unconditional once the retention age is crossed, so a
        // retention window inside the compression window would delete files
        // before they are ever compressed.
        if self.archive.retain_days <= self.archive.compress_after_days {
            return Err(ConfigError::InvalidValue {
                field: "archive.retain_days".to_owned(),
                reason: format!(
                    "must exceed compress_after_days ({})",
                    self.archive.compress_after_days
                ),
            }
            .into());
        }

        if self.aggregation.enabled && self.aggregation.pipe_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "aggregation.pipe_path".to_owned(),
                reason: "pipe_path must not be empty when aggregation is enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
    /// PID file path; empty disables the PID file.
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: "/var/run/flowherd.pid".to_owned(),
        }
    }
}

/// Pipeline topology and supervision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Network interface the capture stage records from.
    pub interface: String,
    /// TCP port the capture stage listens on once ready.
    pub capture_port: u16,
    /// TCP port the hub stage listens on once ready.
    pub hub_port: u16,
    /// Whether the hub enriches records (GeoIP and friends).
    pub enrichment: bool,
    /// Liveness poll period in milliseconds.
    pub poll_interval_ms: u64,
    /// Delay between readiness probe attempts in milliseconds.
    pub probe_interval_ms: u64,
    /// Maximum readiness probe attempts before startup failure.
    pub probe_attempts: u32,
    /// Grace period before forced termination during shutdown.
    pub shutdown_grace_ms: u64,
    /// Restart backoff floor for degradable stages.
    pub restart_backoff_ms: u64,
    /// Restart backoff ceiling for degradable stages.
    pub restart_backoff_cap_ms: u64,
    /// Consecutive restart failures before a degradable stage is disabled.
    pub max_consecutive_failures: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interface: "eth0".to_owned(),
            capture_port: 561,
            hub_port: 562,
            enrichment: true,
            poll_interval_ms: 3_000,
            probe_interval_ms: 500,
            probe_attempts: 20,
            shutdown_grace_ms: 10_000,
            restart_backoff_ms: 1_000,
            restart_backoff_cap_ms: 30_000,
            max_consecutive_failures: 5,
        }
    }
}

/// Archival branch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Root of the date-partitioned archive tree.
    pub root: String,
    /// Archive file name prefix.
    pub prefix: String,
    /// Rotation interval (1h, 6h, 12h, 1d, 7d).
    pub rotation: String,
    /// Age in days after which a closed file is compressed.
    pub compress_after_days: u32,
    /// Age in days after which any file is deleted.
    pub retain_days: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: "/var/lib/flowherd/archive".to_owned(),
            prefix: "flows".to_owned(),
            rotation: "1h".to_owned(),
            compress_after_days: 2,
            retain_days: 30,
        }
    }
}

/// Aggregation branch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Whether the aggregation branch runs at all.
    pub enabled: bool,
    /// FIFO path the time series is delivered through.
    pub pipe_path: String,
    /// Time-bin width for the aggregated series, in seconds.
    pub bin_interval_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pipe_path: "/var/run/flowherd/series.fifo".to_owned(),
            bin_interval_secs: 60,
        }
    }
}

/// Stage executable names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramsConfig {
    /// Capture stage binary.
    pub capture: String,
    /// Hub/enrichment stage binary.
    pub hub: String,
    /// Archival stage binary.
    pub archiver: String,
    /// Aggregation stage binary.
    pub aggregator: String,
}

impl Default for ProgramsConfig {
    fn default() -> Self {
        Self {
            capture: "flow-capture".to_owned(),
            hub: "flow-hub".to_owned(),
            archiver: "flow-archive".to_owned(),
            aggregator: "flow-aggregate".to_owned(),
        }
    }
}

// --- Environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
