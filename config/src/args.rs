use clap::Parser;
use std::{
    net::SocketAddr,
    path::PathBuf,
    time::Duration,
};
use url::Url;

/// Prometheus exporter for Brigade projects, builds and jobs.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// YAML file layered over the defaults, instead of `config.yaml` in the config directory.
    #[arg(long, env = "BRIGADE_EXPORTER_CONFIG_FILE", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the metrics server listens on.
    #[arg(long, env = "BRIGADE_EXPORTER_LISTEN_ADDR", value_name = "ADDR")]
    pub listen_addr: Option<SocketAddr>,

    /// Path the metrics are served on.
    #[arg(long, env = "BRIGADE_EXPORTER_METRICS_PATH", value_name = "PATH")]
    pub metrics_path: Option<String>,

    /// Address of the Brigade API server.
    #[arg(long, env = "BRIGADE_EXPORTER_API_URL", value_name = "URL")]
    pub api_url: Option<Url>,

    /// Upper bound of a single collection, e.g. `10s` or `1500ms`.
    #[arg(
        long,
        env = "BRIGADE_EXPORTER_COLLECT_TIMEOUT",
        value_name = "DURATION",
        value_parser = humantime::parse_duration
    )]
    pub collect_timeout: Option<Duration>,

    /// Upper bound of a single Brigade API request.
    #[arg(
        long,
        env = "BRIGADE_EXPORTER_REQUEST_TIMEOUT",
        value_name = "DURATION",
        value_parser = humantime::parse_duration
    )]
    pub request_timeout: Option<Duration>,

    /// Disables the project metrics.
    #[arg(long, env = "BRIGADE_EXPORTER_DISABLE_PROJECT_COLLECTOR", action)]
    pub disable_project_collector: bool,

    /// Disables the build metrics.
    #[arg(long, env = "BRIGADE_EXPORTER_DISABLE_BUILD_COLLECTOR", action)]
    pub disable_build_collector: bool,

    /// Disables the job metrics.
    #[arg(long, env = "BRIGADE_EXPORTER_DISABLE_JOB_COLLECTOR", action)]
    pub disable_job_collector: bool,

    /// Serves made up data instead of talking to Brigade.
    #[arg(long, env = "BRIGADE_EXPORTER_FAKE", action)]
    pub fake: bool,

    /// Human readable logs instead of JSON.
    #[arg(long, env = "BRIGADE_EXPORTER_DEVELOPMENT", action)]
    pub development: bool,

    /// Logs at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, env = "BRIGADE_EXPORTER_DEBUG", action)]
    pub debug: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(listen_addr) = &self.listen_addr {
                cache.insert("listen_addr".to_string(), listen_addr.to_string().into());
            }
            if let Some(metrics_path) = &self.metrics_path {
                cache.insert("metrics_path".to_string(), metrics_path.clone().into());
            }
            if let Some(api_url) = &self.api_url {
                cache.insert("api_url".to_string(), api_url.to_string().into());
            }
            if let Some(timeout) = &self.collect_timeout {
                cache.insert(
                    "collect_timeout".to_string(),
                    humantime::format_duration(*timeout).to_string().into(),
                );
            }
            if let Some(timeout) = &self.request_timeout {
                cache.insert(
                    "request_timeout".to_string(),
                    humantime::format_duration(*timeout).to_string().into(),
                );
            }
            let flags = [
                ("disable_project_collector", self.disable_project_collector),
                ("disable_build_collector", self.disable_build_collector),
                ("disable_job_collector", self.disable_job_collector),
                ("fake", self.fake),
                ("development", self.development),
                ("debug", self.debug),
            ];
            for (key, set) in flags {
                if set {
                    cache.insert(key.to_string(), true.into());
                }
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let version = clap::crate_version!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "\
{version}

Config directory: {config_dir_path}"
    )
}
