//! Pet store demo: an in-memory API served behind the turnstile interposer.

mod store;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use turnstile::{server, Interposer, Logger, Options};
use turnstile_telemetry::{
    init_logging, log_listening, log_shutdown, log_startup, LogFormat, LogSettings,
};

use crate::store::PetStore;

const BUNDLED_CONTRACT: &[u8] = include_bytes!("../petstore.yaml");

#[derive(Parser, Debug)]
#[command(
    name = "turnstile-petstore",
    about = "Pet store API guarded by an OpenAPI contract",
    version
)]
struct Cli {
    /// OpenAPI contract to enforce (YAML or JSON). Defaults to the bundled petstore.yaml.
    #[arg(long, env = "TURNSTILE_CONTRACT")]
    contract: Option<PathBuf>,

    /// Interposer options file (YAML).
    #[arg(long, env = "TURNSTILE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, env = "TURNSTILE_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Validate handler responses before they reach the client. Overrides the options file.
    #[arg(long, env = "TURNSTILE_VALIDATE_RESPONSE")]
    validate_response: Option<bool>,

    /// Log level filter (RUST_LOG takes precedence).
    #[arg(long, env = "TURNSTILE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format (json or pretty).
    #[arg(long, env = "TURNSTILE_LOG_FORMAT", default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&LogSettings::new(&cli.log_level, cli.log_format))?;
    log_startup!(
        service = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION")
    );

    let mut options = match &cli.config {
        Some(path) => Options::from_yaml_file(path)?,
        None => Options::new(),
    };
    if let Some(enabled) = cli.validate_response {
        options = options.with_validate_response(enabled);
    }
    let options = options.with_logger(Logger::current());

    let contract = match &cli.contract {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read contract {}", path.display()))?,
        None => BUNDLED_CONTRACT.to_vec(),
    };

    let interposer = Interposer::new(&contract, options)?;
    let app = interposer.wrap(PetStore::new());

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind to {}", cli.listen))?;
    log_listening!(addr = %cli.listen);

    server::serve_with_shutdown(listener, app, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    log_shutdown!(reason = "ctrl_c");
    Ok(())
}
