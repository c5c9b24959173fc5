//! Configuration module for the line dealer.
//!
//! Everything comes from the command line: an input file, a client count,
//! and an optional port.

use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;

/// Port used when none is given on the command line
pub const DEFAULT_PORT: u16 = 19876;

/// Command-line arguments for the line dealer
#[derive(Parser, Debug)]
#[command(name = "line-dealer")]
#[command(version = "0.1.0")]
#[command(about = "Deals out lines from a text file, one per connection", long_about = None)]
pub struct CliArgs {
    /// Text file whose lines are handed out to clients
    pub inputfile: PathBuf,

    /// Number of clients to notify once the file is exhausted
    pub clients: u32,

    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub inputfile: PathBuf,
    pub clients: u32,
    pub port: u16,
}

impl Config {
    /// Load configuration from CLI args.
    ///
    /// Help and version requests print to stdout and exit 0; malformed
    /// arguments are returned as an error so the caller can exit 1.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = match CliArgs::try_parse() {
            Ok(cli) => cli,
            Err(e) => match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
                _ => return Err(ConfigError::Args(e)),
            },
        };

        Ok(Config {
            inputfile: cli.inputfile,
            clients: cli.clients,
            port: cli.port,
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    Args(clap::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Args(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
