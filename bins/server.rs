use std::process::ExitCode;

use configs::AppConfig;
use dotenvy::dotenv;
use tracing::{error, info};

fn main() -> ExitCode {
    // .env first so RUST_LOG / LOG_FORMAT and config overrides take effect
    dotenv().ok();
    common::utils::logging::init_logging_from_env();

    let cfg = match AppConfig::load_or_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %format!("{e:#}"), "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(threads) = cfg.server.worker_threads {
        builder.worker_threads(threads);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        threads = ?cfg.server.worker_threads,
        "gamerate starting"
    );

    match rt.block_on(server::run(cfg)) {
        Ok(()) => {
            info!("gamerate stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "gamerate exited with an error");
            ExitCode::FAILURE
        }
    }
}
