//! Command line arguments and the layered configuration of the exporter.
//!
//! Sources, from lowest to highest precedence: the embedded
//! `default-config.yaml`, a YAML file (`--config` or `config.yaml` in the
//! config directory), then the command line.

#[macro_use]
extern crate tracing;

mod app_config;
mod args;

use app_config::AppConfig;
pub use app_config::{
    get_config_dir,
    ENV_PREFIX,
};
pub use args::Args;
use brigade_exporter_collector::ExporterConfig;
use eyre::{
    bail,
    Context as _,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    net::SocketAddr,
    time::Duration,
};
use url::Url;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    app_config: AppConfig,
    pub listen_addr: SocketAddr,
    pub metrics_path: String,
    pub api_url: Url,
    #[serde(with = "humantime_duration")]
    pub collect_timeout: Duration,
    /// Upper bound of one Brigade API request.
    #[serde(with = "humantime_duration")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub disable_project_collector: bool,
    #[serde(default)]
    pub disable_build_collector: bool,
    #[serde(default)]
    pub disable_job_collector: bool,
    #[serde(default)]
    pub fake: bool,
    #[serde(default)]
    pub development: bool,
    #[serde(default)]
    pub debug: bool,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl Config {
    pub fn new(args: Args) -> Result<Self> {
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("config_dir", config_dir.display().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        builder = match &args.config {
            Some(path) => builder.add_source(config::File::from(path.as_path()).format(config::FileFormat::Yaml)),
            None => builder.add_source(
                config::File::from(config_dir.join("config.yaml"))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            ),
        };

        builder = builder.add_source(args);

        let cfg: Self = builder
            .build()
            .and_then(|built| built.try_deserialize::<Self>())
            .wrap_err("Failed to load configuration")?;
        cfg.validate()?;

        debug!(config = ?cfg, "configuration loaded");
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            bail!("request timeout must be greater than zero");
        }
        if !self.metrics_path.starts_with('/') {
            bail!("metrics path {:?} must start with '/'", self.metrics_path);
        }
        if self.metrics_path == "/" || self.metrics_path == "/healthz" {
            bail!("metrics path {:?} collides with a built-in route", self.metrics_path);
        }
        if self.metrics_path.contains(['{', '}']) {
            bail!("metrics path {:?} must not contain route parameters", self.metrics_path);
        }
        // axum panics on segments in its old capture syntax
        if self.metrics_path.split('/').any(|segment| segment.starts_with([':', '*'])) {
            bail!(
                "metrics path {:?} must not have segments starting with ':' or '*'",
                self.metrics_path
            );
        }
        Ok(())
    }

    pub fn exporter_config(&self) -> ExporterConfig {
        ExporterConfig {
            collect_timeout: self.collect_timeout,
            disable_projects: self.disable_project_collector,
            disable_builds: self.disable_build_collector,
            disable_jobs: self.disable_job_collector,
        }
    }
}

/// Durations written the way people write them, e.g. `10s` or `1m 30s`.
mod humantime_duration {
    use serde::{
        Deserialize,
        Deserializer,
        Serializer,
    };
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
