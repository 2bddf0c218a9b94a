use std::time::Duration;

use fhirpipe_core::{AuthHeader, EndpointPair, HttpTimeouts, ResourceType, WaitPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub openmrs: OpenmrsConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub parquet: ParquetConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (label, pair) in [
            ("endpoints.host", &self.endpoints.host),
            ("endpoints.docker", &self.endpoints.docker),
        ] {
            if pair.openmrs.trim().is_empty() || pair.sink.trim().is_empty() {
                return Err(format!("{label} requires both openmrs and sink URLs"));
            }
        }
        if self.http.connect_timeout_ms == 0 || self.http.request_timeout_ms == 0 {
            return Err("http timeouts must be > 0".into());
        }
        if self.parquet.timeout_secs == 0 {
            return Err("parquet.timeout_secs must be > 0".into());
        }
        if self.parquet.backend == ParquetBackend::Tool {
            if self.parquet.program.trim().is_empty() {
                return Err("parquet.program must not be empty".into());
            }
            if self.parquet.tool_artifact.trim().is_empty() {
                return Err("parquet.tool_artifact must not be empty".into());
            }
        }
        if self.streaming.poll_interval_secs == 0 {
            return Err("streaming.poll_interval_secs must be > 0".into());
        }
        if self.streaming.max_attempts == 0 {
            return Err("streaming.max_attempts must be > 0".into());
        }
        if self.streaming.settle_polls == 0 {
            return Err("streaming.settle_polls must be > 0".into());
        }
        if self.streaming.seed_timeout_secs == 0 {
            return Err("streaming.seed_timeout_secs must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn http_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_millis(self.http.connect_timeout_ms),
            request: Duration::from_millis(self.http.request_timeout_ms),
        }
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            probe: self.streaming.probe_resource,
            interval: Duration::from_secs(self.streaming.poll_interval_secs),
            max_attempts: self.streaming.max_attempts,
            settle_polls: self.streaming.settle_polls,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_host_endpoints")]
    pub host: EndpointPair,
    #[serde(default = "default_docker_endpoints")]
    pub docker: EndpointPair,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            host: default_host_endpoints(),
            docker: default_docker_endpoints(),
        }
    }
}

fn default_host_endpoints() -> EndpointPair {
    EndpointPair {
        openmrs: "http://localhost:8099".into(),
        sink: "http://localhost:8098".into(),
    }
}

fn default_docker_endpoints() -> EndpointPair {
    EndpointPair {
        openmrs: "http://openmrs:8080".into(),
        sink: "http://sink-server:8080".into(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenmrsConfig {
    #[serde(default = "default_openmrs_api_path")]
    pub api_path: String,
    #[serde(default = "default_openmrs_username")]
    pub username: String,
    #[serde(default = "default_openmrs_password")]
    pub password: String,
}

impl Default for OpenmrsConfig {
    fn default() -> Self {
        Self {
            api_path: default_openmrs_api_path(),
            username: default_openmrs_username(),
            password: default_openmrs_password(),
        }
    }
}

impl OpenmrsConfig {
    pub fn auth(&self) -> Option<AuthHeader> {
        AuthHeader::from_parts(Some(&self.username), Some(&self.password), None)
    }
}

fn default_openmrs_api_path() -> String {
    "openmrs/ws/fhir2/R4".into()
}
fn default_openmrs_username() -> String {
    "admin".into()
}
fn default_openmrs_password() -> String {
    "Admin123".into()
}

/// Sink FHIR server access. Anonymous unless credentials are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_sink_api_path")]
    pub api_path: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            api_path: default_sink_api_path(),
            username: None,
            password: None,
            bearer_token: None,
        }
    }
}

impl SinkConfig {
    pub fn auth(&self) -> Option<AuthHeader> {
        AuthHeader::from_parts(
            self.username.as_deref(),
            self.password.as_deref(),
            self.bearer_token.as_deref(),
        )
    }
}

fn default_sink_api_path() -> String {
    "fhir".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_request_timeout_ms() -> u64 {
    20_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParquetBackend {
    /// External row-count utility (parquet-tools)
    #[default]
    Tool,
    /// Parquet footer metadata, read in-process
    Native,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParquetConfig {
    #[serde(default)]
    pub backend: ParquetBackend,
    /// Row-count tool artifact expected in the home directory
    #[serde(default = "default_tool_artifact")]
    pub tool_artifact: String,
    #[serde(default = "default_tool_program")]
    pub program: String,
    /// Arguments; `{artifact}` and `{dir}` are substituted
    #[serde(default = "default_tool_args")]
    pub args: Vec<String>,
    /// Zero-based whitespace column of the summary line holding the count
    #[serde(default = "default_count_column")]
    pub count_column: usize,
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
    /// Delete zero-byte files from the output directories before counting
    #[serde(default)]
    pub prune_empty_files: bool,
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            backend: ParquetBackend::default(),
            tool_artifact: default_tool_artifact(),
            program: default_tool_program(),
            args: default_tool_args(),
            count_column: default_count_column(),
            timeout_secs: default_tool_timeout_secs(),
            prune_empty_files: false,
        }
    }
}

fn default_tool_artifact() -> String {
    "parquet-tools-1.11.1.jar".into()
}
fn default_tool_program() -> String {
    "java".into()
}
fn default_tool_args() -> Vec<String> {
    ["-jar", "{artifact}", "rowcount", "{dir}"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_count_column() -> usize {
    2
}
fn default_tool_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Given name of the seeded test patient
    #[serde(default = "default_patient_given_name")]
    pub patient_given_name: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Consecutive identical nonzero polls before the sink counts as ready
    #[serde(default = "default_settle_polls")]
    pub settle_polls: u32,
    #[serde(default = "default_probe_resource")]
    pub probe_resource: ResourceType,
    /// Uploader command line; `{openmrs_url}` and `{home}` are substituted.
    /// Empty skips seeding.
    #[serde(default)]
    pub seed_command: Vec<String>,
    #[serde(default = "default_seed_timeout_secs")]
    pub seed_timeout_secs: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            patient_given_name: default_patient_given_name(),
            poll_interval_secs: default_poll_interval_secs(),
            max_attempts: default_max_attempts(),
            settle_polls: default_settle_polls(),
            probe_resource: default_probe_resource(),
            seed_command: Vec::new(),
            seed_timeout_secs: default_seed_timeout_secs(),
        }
    }
}

fn default_patient_given_name() -> String {
    "Alberta625".into()
}
fn default_poll_interval_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    40
}
fn default_settle_polls() -> u32 {
    1
}
fn default_probe_resource() -> ResourceType {
    ResourceType::Patient
}
fn default_seed_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchConfig {
    /// Fixed delay before counting, for pipelines that flush late
    #[serde(default)]
    pub settle_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_CONFIG_FILE: &str = "fhirpipe.toml";

    /// Layers built-in defaults, the optional TOML file and `FHIRPIPE__*`
    /// environment overrides, then validates the result.
    pub fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(format!("config file {} does not exist", p.display()));
                }
                builder = builder.add_source(File::from(p.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., FHIRPIPE__STREAMING__MAX_ATTEMPTS=5
        builder = builder.add_source(
            Environment::with_prefix("FHIRPIPE")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.http_timeouts().connect, Duration::from_secs(5));
        assert_eq!(cfg.http_timeouts().request, Duration::from_secs(20));
        assert_eq!(cfg.wait_policy().interval, Duration::from_secs(30));
        assert_eq!(cfg.parquet.count_column, 2);
        assert_eq!(cfg.sink.auth(), None);
        assert_eq!(
            cfg.openmrs.auth(),
            Some(AuthHeader::basic("admin", "Admin123"))
        );
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut cfg = AppConfig::default();
        cfg.streaming.max_attempts = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.http.request_timeout_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_native_backend_needs_no_tool() {
        let mut cfg = AppConfig::default();
        cfg.parquet.backend = ParquetBackend::Native;
        cfg.parquet.program.clear();
        assert!(cfg.validate().is_ok());
    }
}
