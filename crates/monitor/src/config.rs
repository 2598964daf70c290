//! Configuration management for dirwatch.
//!
//! Uses figment to merge configuration from multiple sources:
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables
//! 4. Command-line arguments

use dirwatch_protocol::MIN_READ_BUFFER;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Shortest scan interval the polling backend accepts.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Which notification facility a session is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Kernel inotify where available, polling elsewhere.
    #[default]
    Auto,
    /// Kernel inotify (Linux only).
    Inotify,
    /// Periodic filesystem scans.
    Poll,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Notification backend
    #[serde(default)]
    pub backend: Backend,

    /// Scan interval for the polling backend, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Size of the read buffer in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_buffer_size() -> usize {
    MIN_READ_BUFFER
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            backend: Backend::default(),
            poll_interval_ms: default_poll_interval_ms(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from all sources
    pub fn load(config_file: Option<&PathBuf>) -> Result<Self, figment::Error> {
        Self::figment(config_file).extract()
    }

    fn figment(config_file: Option<&PathBuf>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(MonitorConfig::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        } else {
            let default_paths = [
                PathBuf::from("/etc/dirwatch/config.toml"),
                dirs::config_dir()
                    .unwrap_or_default()
                    .join("dirwatch/config.toml"),
            ];

            for path in &default_paths {
                if path.exists() {
                    figment = figment.merge(Toml::file(path));
                    break;
                }
            }
        }

        // Environment variables (DIRWATCH_ prefix)
        figment.merge(Env::prefixed("DIRWATCH_"))
    }

    /// Override log level from CLI
    pub fn with_log_level(mut self, log_level: Option<String>) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self
    }

    /// Override backend from CLI
    pub fn with_backend(mut self, backend: Option<Backend>) -> Self {
        if let Some(backend) = backend {
            self.backend = backend;
        }
        self
    }

    /// Override poll interval from CLI
    pub fn with_poll_interval_ms(mut self, interval: Option<u64>) -> Self {
        if let Some(interval) = interval {
            self.poll_interval_ms = interval;
        }
        self
    }

    /// Override buffer size from CLI
    pub fn with_buffer_size(mut self, size: Option<usize>) -> Self {
        if let Some(size) = size {
            self.buffer_size = size;
        }
        self
    }

    /// Buffer size actually used: never smaller than one maximal event.
    pub fn effective_buffer_size(&self) -> usize {
        if self.buffer_size < MIN_READ_BUFFER {
            tracing::warn!(
                requested = self.buffer_size,
                minimum = MIN_READ_BUFFER,
                "Read buffer too small for one event, raising it"
            );
            MIN_READ_BUFFER
        } else {
            self.buffer_size
        }
    }

    /// Scan interval actually used. Zero would make the poll thread spin and
    /// every idle read return at once.
    pub fn effective_poll_interval(&self) -> Duration {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            tracing::warn!(
                requested = self.poll_interval_ms,
                minimum = MIN_POLL_INTERVAL_MS,
                "Poll interval too short, raising it"
            );
            Duration::from_millis(MIN_POLL_INTERVAL_MS)
        } else {
            Duration::from_millis(self.poll_interval_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.backend, Backend::Auto);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.buffer_size, MIN_READ_BUFFER);
    }

    #[test]
    fn test_cli_overrides() {
        let config = MonitorConfig::default()
            .with_log_level(Some("debug".to_string()))
            .with_backend(Some(Backend::Poll))
            .with_poll_interval_ms(Some(250))
            .with_buffer_size(None);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.backend, Backend::Poll);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.buffer_size, MIN_READ_BUFFER);
    }

    #[test]
    fn test_small_buffer_is_raised() {
        let config = MonitorConfig::default().with_buffer_size(Some(8));
        assert_eq!(config.effective_buffer_size(), MIN_READ_BUFFER);

        let config = MonitorConfig::default().with_buffer_size(Some(64 * 1024));
        assert_eq!(config.effective_buffer_size(), 64 * 1024);
    }

    #[test]
    fn test_short_poll_interval_is_raised() {
        let config = MonitorConfig::default().with_poll_interval_ms(Some(0));
        assert_eq!(config.effective_poll_interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));

        let config = MonitorConfig::default().with_poll_interval_ms(Some(250));
        assert_eq!(config.effective_poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_file_and_env_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "dirwatch.toml",
                r#"
                backend = "poll"
                poll_interval_ms = 500
                "#,
            )?;
            jail.set_env("DIRWATCH_POLL_INTERVAL_MS", "100");

            let path = PathBuf::from("dirwatch.toml");
            let config: MonitorConfig = MonitorConfig::figment(Some(&path)).extract()?;
            assert_eq!(config.backend, Backend::Poll);
            assert_eq!(config.poll_interval_ms, 100);
            assert_eq!(config.log_level, "info");
            Ok(())
        });
    }
}
