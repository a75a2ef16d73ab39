//! CLI argument parsing.

use clap::{Args, Parser, Subcommand};

use pricevault_core::config::ServerConfig;

/// Daily stock price ingestion service.
#[derive(Parser, Debug)]
#[command(name = "pricevault-server", version, about = "Daily stock price ingestion service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve(ServeArgs),
    /// Run one ingestion over the default symbols and print the report
    Ingest,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Bind address (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,
}

impl Cli {
    pub fn resolve(self) -> Command {
        self.command
            .unwrap_or_else(|| Command::Serve(ServeArgs::default()))
    }
}

impl ServeArgs {
    /// Flags win over whatever the environment configured.
    pub fn apply(self, server: &mut ServerConfig) {
        if let Some(host) = self.host {
            server.host = host;
        }
        if let Some(port) = self.port {
            server.port = port;
        }
    }
}
