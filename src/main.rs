//! line-dealer: a line-dispensing TCP server
//!
//! Hands out the lines of a text file to connecting clients, one line per
//! connection, in file order. Once the file is exhausted, a fixed number of
//! clients receive the literal line `exit` so they know to stop asking, and
//! the server shuts down.
//!
//! Invocation: `line-dealer <inputfile> <clients> [port]`

mod config;
mod protocol;
mod server;
mod source;

use config::Config;
use server::Server;
use source::LineSource;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("server failed: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        input = %config.inputfile.display(),
        clients = config.clients,
        port = config.port,
        "starting line dealer"
    );

    let source = LineSource::open(&config.inputfile).await.map_err(|e| {
        format!(
            "cannot access input file '{}': {e}",
            config.inputfile.display()
        )
    })?;

    let server = Server::bind(&config, source).await?;
    server.run().await?;

    Ok(())
}
