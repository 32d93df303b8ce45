//! Command line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "points-ledger", version, about = "Payer points ledger with oldest-first spending")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API backed by a SQLite ledger
    Serve(ServerConfig),
    /// Apply a csv of operations to an empty in-memory ledger and print balances
    Replay {
        /// Operations file with `type,payer,points,timestamp` columns
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "POINTS_LEDGER_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to bind
    #[arg(long, env = "POINTS_LEDGER_PORT", default_value_t = 8000)]
    pub port: u16,

    /// SQLite database file, or `:memory:`
    #[arg(long, env = "POINTS_LEDGER_DATABASE", default_value = "points.db")]
    pub database: PathBuf,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["points-ledger", "serve"]).unwrap();
        let Command::Serve(config) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(config.addr(), "127.0.0.1:8000".parse().unwrap());
        assert_eq!(config.database, PathBuf::from("points.db"));
    }

    #[test]
    fn serve_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "points-ledger",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--database",
            ":memory:",
        ])
        .unwrap();
        let Command::Serve(config) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(config.addr(), "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.database, PathBuf::from(":memory:"));
    }

    #[test]
    fn replay_requires_path() {
        assert!(Cli::try_parse_from(["points-ledger", "replay"]).is_err());

        let cli = Cli::try_parse_from(["points-ledger", "replay", "ops.csv"]).unwrap();
        assert!(matches!(cli.command, Command::Replay { path } if path == PathBuf::from("ops.csv")));
    }
}
