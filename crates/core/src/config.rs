use crate::error::{AppError, Result};
use directories::ProjectDirs;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_RELAY_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MIN_RADIUS: f64 = 10.0;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the relay that forwards captures to the analysis service.
    pub relay_url: Url,
    /// Bounded wait for one analysis request.
    pub timeout: Duration,
    /// Circles with a radius at or below this are discarded.
    pub min_radius: f64,
    /// Where captured images and the history log are kept.
    pub data_dir: PathBuf,
    /// Number of records `--history` shows by default.
    pub history_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let relay = lookup("SNAPCIRCLE_RELAY_URL").unwrap_or_else(|| DEFAULT_RELAY_URL.to_string());
        let timeout_secs = parse_var(&lookup, "SNAPCIRCLE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let min_radius = parse_var(&lookup, "SNAPCIRCLE_MIN_RADIUS", DEFAULT_MIN_RADIUS)?;
        let history_limit = parse_var(&lookup, "SNAPCIRCLE_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?;

        let mut builder = Config::builder()
            .with_relay_url(&relay)
            .with_timeout(Duration::from_secs(timeout_secs))
            .with_min_radius(min_radius)
            .with_history_limit(history_limit);
        if let Some(dir) = lookup("SNAPCIRCLE_DATA_DIR") {
            builder = builder.with_data_dir(dir);
        }
        builder.build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Directory captured PNGs are written to.
    pub fn captures_dir(&self) -> PathBuf {
        self.data_dir.join("captures")
    }

    /// SQLite database holding the capture history.
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.db")
    }

    fn default_data_dir() -> PathBuf {
        ProjectDirs::from("", "snapcircle", "snapcircle")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("snapcircle-data"))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::config(format!("{key} has an invalid value: {raw:?}"))),
        None => Ok(default),
    }
}

/// Programmatic overrides on top of the defaults.
#[derive(Default)]
pub struct ConfigBuilder {
    relay_url: Option<String>,
    timeout: Option<Duration>,
    min_radius: Option<f64>,
    data_dir: Option<PathBuf>,
    history_limit: Option<usize>,
}

impl ConfigBuilder {
    pub fn with_relay_url(mut self, url: impl Into<String>) -> Self {
        self.relay_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_min_radius(mut self, radius: f64) -> Self {
        self.min_radius = Some(radius);
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn build(self) -> Result<Config> {
        let raw_url = self.relay_url.as_deref().unwrap_or(DEFAULT_RELAY_URL);
        let mut relay_url = Url::parse(raw_url)
            .map_err(|e| AppError::config(format!("Invalid relay URL {raw_url:?}: {e}")))?;
        if !matches!(relay_url.scheme(), "http" | "https") {
            return Err(AppError::config(format!(
                "Relay URL must use http or https, got {raw_url:?}"
            )));
        }
        // Url::join replaces the last segment unless the path ends with '/'
        if !relay_url.path().ends_with('/') {
            let path = format!("{}/", relay_url.path());
            relay_url.set_path(&path);
        }

        let timeout = self.timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if timeout.is_zero() {
            return Err(AppError::config("Timeout must be greater than zero"));
        }

        let min_radius = self.min_radius.unwrap_or(DEFAULT_MIN_RADIUS);
        if !min_radius.is_finite() || min_radius < 0.0 {
            return Err(AppError::config(format!(
                "Minimum radius must be a non-negative number, got {min_radius}"
            )));
        }

        Ok(Config {
            relay_url,
            timeout,
            min_radius,
            data_dir: self.data_dir.unwrap_or_else(Config::default_data_dir),
            history_limit: self.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        })
    }
}
