use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bth-trader")]
#[command(about = "bth-trader - gRPC order gateway for Kraken")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to Kraken and serve the gRPC API
    Start {
        /// Path to the configuration file
        #[arg(short, long, env = "BTH_CONFIG", default_value = "bth-trader.yaml")]
        config: PathBuf,

        /// Override gRPC port
        #[arg(long)]
        grpc: Option<u16>,

        /// Override log format (pretty, json, compact)
        #[arg(long)]
        log_format: Option<String>,
    },

    /// Validate configuration without connecting
    Validate {
        /// Path to the configuration file
        #[arg(short, long, env = "BTH_CONFIG", default_value = "bth-trader.yaml")]
        config: PathBuf,
    },

    /// Write a configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "bth-trader.yaml")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_with_overrides() {
        let cli = Cli::try_parse_from([
            "bth-trader",
            "start",
            "--config",
            "/etc/bth/trader.yaml",
            "--grpc",
            "5600",
            "--log-format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Start {
                config,
                grpc,
                log_format,
            } => {
                assert_eq!(config, PathBuf::from("/etc/bth/trader.yaml"));
                assert_eq!(grpc, Some(5600));
                assert_eq!(log_format.as_deref(), Some("json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_init_default_output() {
        let cli = Cli::try_parse_from(["bth-trader", "init"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Init { output } if output == PathBuf::from("bth-trader.yaml")
        ));
    }

    #[test]
    fn test_validate_short_flag() {
        let cli = Cli::try_parse_from(["bth-trader", "validate", "-c", "x.yaml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Validate { config } if config == PathBuf::from("x.yaml")
        ));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["bth-trader", "start", "--grpc", "99999"]).is_err());
    }
}
