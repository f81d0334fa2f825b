//! Process entry point for the inventory HTTP API.

use clap::Parser;
use inventory_core::init_logging;
use inventory_http::config::Config;
use inventory_http::{router, AppState};
use log::{error, info};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    let target = match config.log_target() {
        Ok(target) => target,
        Err(err) => {
            eprintln!("invalid logging configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(config.log_level(), target) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let location = config.db_location();
    let app = router(AppState::for_location(&location));

    let listener = match tokio::net::TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(
                "event=http_bind module=http status=error addr={} error={}",
                config.bind, err
            );
            return ExitCode::FAILURE;
        }
    };
    info!(
        "event=http_start module=http status=ok addr={} db={}",
        config.bind, location
    );

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("event=http_serve module=http status=error error={err}");
        return ExitCode::FAILURE;
    }

    info!("event=http_stop module=http status=ok");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("event=signal module=http status=error error={err}");
    }
}
