//! Environment-driven configuration.
//!
//! Every knob in §6 of the design is read from the environment once, at startup, through
//! [`Config::from_env`]. There is deliberately no config file format: the daemon is meant to
//! run as a single container whose configuration surface is its environment.

use std::time::Duration;

use crate::error::{Error, Result};

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for local development.
    Pretty,
    /// One JSON object per line, for production log pipelines.
    Json,
}

/// Fully validated daemon configuration, loaded once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// `CLOUDFLARE_API_TOKEN`. The only startup condition that is fatal by spec (§7):
    /// absent credential refuses to start.
    pub cloudflare_api_token: String,
    /// `DNS_SYNC_INTERVAL`, default 60s.
    pub dns_sync_interval: Duration,
    /// `HEALTH_CHECK_INTERVAL`, default 30s.
    pub health_check_interval: Duration,
    /// `ENABLE_HEALTH_SERVER`, default true.
    pub enable_health_server: bool,
    /// `HEALTH_PORT`, default 8080.
    pub health_port: u16,
    /// `K8S_CONFIG_PATH`. Empty means in-cluster config.
    pub k8s_config_path: Option<String>,
    /// `MAX_RETRIES`, default 3.
    pub max_retries: u32,
    /// `RETRY_DELAY`, default 5s.
    pub retry_delay: Duration,
    /// `LOG_LEVEL`, default "info".
    pub log_level: String,
    /// `LOG_FORMAT`, default pretty.
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Each malformed variable produces a descriptive [`Error::Config`] naming the variable
    /// and the expected shape; only a missing `CLOUDFLARE_API_TOKEN` is reported as
    /// [`Error::CredentialAbsent`], matching the one fatal-by-spec startup condition.
    pub fn from_env() -> Result<Self> {
        let cloudflare_api_token = std::env::var("CLOUDFLARE_API_TOKEN").map_err(|_| {
            Error::credential_absent(
                "CLOUDFLARE_API_TOKEN is required. Set it via: export CLOUDFLARE_API_TOKEN=...",
            )
        })?;
        if cloudflare_api_token.trim().is_empty() {
            return Err(Error::credential_absent("CLOUDFLARE_API_TOKEN is empty"));
        }

        let dns_sync_interval = parse_secs_env("DNS_SYNC_INTERVAL", 60)?;
        let health_check_interval = parse_secs_env("HEALTH_CHECK_INTERVAL", 30)?;
        let enable_health_server = parse_bool_env("ENABLE_HEALTH_SERVER", true)?;
        let health_port = parse_env("HEALTH_PORT", 8080u16)?;
        let k8s_config_path = std::env::var("K8S_CONFIG_PATH")
            .ok()
            .filter(|s| !s.is_empty());
        let max_retries = parse_env("MAX_RETRIES", 3u32)?;
        let retry_delay = parse_secs_env("RETRY_DELAY", 5)?;
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(Error::config(format!(
                    "LOG_FORMAT '{other}' is not valid. Valid values: pretty, json"
                )));
            }
        };

        let config = Self {
            cloudflare_api_token,
            dns_sync_interval,
            health_check_interval,
            enable_health_server,
            health_port,
            k8s_config_path,
            max_retries,
            retry_delay,
            log_level,
            log_format,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.dns_sync_interval.as_secs() == 0 {
            return Err(Error::config("DNS_SYNC_INTERVAL must be at least 1 second"));
        }
        if self.max_retries > 10 {
            return Err(Error::config(format!(
                "MAX_RETRIES must be between 0 and 10. Got: {}",
                self.max_retries
            )));
        }
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(Error::config(format!(
                    "LOG_LEVEL '{other}' is not valid. Valid levels: trace, debug, info, warn, error"
                )));
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, default: T) -> Result<T> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::config(format!("{var} is not a valid value: '{raw}'"))),
    }
}

fn parse_secs_env(var: &str, default_secs: u64) -> Result<Duration> {
    let secs: u64 = parse_env(var, default_secs)?;
    Ok(Duration::from_secs(secs))
}

fn parse_bool_env(var: &str, default: bool) -> Result<bool> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(Error::config(format!(
                "{var} is not a valid boolean: '{raw}'"
            ))),
        },
    }
}
