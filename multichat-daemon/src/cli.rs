use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use multichat_display::DEFAULT_SERVER_URL;

#[derive(Parser, Debug)]
#[command(name = "multichat-daemon", version, about = "Multi-platform live chat aggregator")]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the viewer WebSocket bind address
    #[arg(long, global = true)]
    pub bind: Option<SocketAddr>,

    /// Log level; RUST_LOG takes precedence
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect to the chat platforms and serve viewers (default)
    Serve,
    /// Print a running broadcaster's chat to the terminal
    Watch {
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        url: String,
    },
    /// Show version and build information
    Version,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::try_parse_from(["multichat-daemon"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.log_level, LogLevel::Info);
        assert!(cli.bind.is_none());
    }

    #[test]
    fn test_flags_and_subcommands() {
        let cli = Cli::try_parse_from([
            "multichat-daemon",
            "--bind",
            "0.0.0.0:9000",
            "--log-level",
            "debug",
            "watch",
            "--url",
            "ws://host:9000/",
        ])
        .unwrap();
        assert_eq!(cli.bind, Some("0.0.0.0:9000".parse().unwrap()));
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(
            cli.command,
            Some(Command::Watch {
                url: "ws://host:9000/".to_string()
            })
        );

        let cli = Cli::try_parse_from(["multichat-daemon", "watch"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Watch {
                url: DEFAULT_SERVER_URL.to_string()
            })
        );
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        assert!(Cli::try_parse_from(["multichat-daemon", "--bind", "nope"]).is_err());
    }
}
