//! Command-line interface for dirwatch.

use crate::config::Backend;
use clap::Parser;
use std::path::PathBuf;

/// Watch a file or directory and print every change notification it receives
#[derive(Debug, Parser)]
#[command(name = "dirwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// File or directory to watch
    pub path: PathBuf,

    /// Configuration file path
    #[arg(short, long, env = "DIRWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Notification backend
    #[arg(short, long, value_enum)]
    pub backend: Option<Backend>,

    /// Scan interval for the polling backend, in milliseconds
    #[arg(short = 'i', long)]
    pub poll_interval_ms: Option<u64>,

    /// Read buffer size in bytes
    #[arg(long)]
    pub buffer_size: Option<usize>,
}

impl Cli {
    /// Parse arguments, exiting with status 1 on usage errors.
    ///
    /// `--help` and `--version` still exit with status 0.
    pub fn parse_or_exit() -> Self {
        match Self::try_parse() {
            Ok(cli) => cli,
            Err(e) => {
                let _ = e.print();
                std::process::exit(if e.use_stderr() { 1 } else { 0 });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_path() {
        let cli = Cli::parse_from(["dirwatch", "/tmp/watched"]);
        assert_eq!(cli.path, PathBuf::from("/tmp/watched"));
        assert!(cli.backend.is_none());
    }

    #[test]
    fn test_cli_parse_with_options() {
        let cli = Cli::parse_from([
            "dirwatch",
            "--backend",
            "poll",
            "--poll-interval-ms",
            "250",
            "--buffer-size",
            "4096",
            "/mnt/media",
        ]);
        assert_eq!(cli.path, PathBuf::from("/mnt/media"));
        assert_eq!(cli.backend, Some(Backend::Poll));
        assert_eq!(cli.poll_interval_ms, Some(250));
        assert_eq!(cli.buffer_size, Some(4096));
    }

    #[test]
    fn test_cli_requires_exactly_one_path() {
        assert!(Cli::try_parse_from(["dirwatch"]).is_err());
        assert!(Cli::try_parse_from(["dirwatch", "/a", "/b"]).is_err());
    }
}
