//! # Batch Downloader - Entry Point
//! src/main.rs

use batch_downloader::config::Config;
use batch_downloader::server::Server;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let config = Config::new();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match config.log_filter() {
            Ok(filter) => filter,
            Err(e) => {
                eprintln!("Configuración inválida: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        return ExitCode::FAILURE;
    }
    config.print_summary();

    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        tracing::error!(dir = %config.output_dir.display(), error = %e, "cannot create output directory");
        return ExitCode::FAILURE;
    }

    let server = Server::new(config);
    if let Err(e) = server.run() {
        tracing::error!(error = %e, "server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
