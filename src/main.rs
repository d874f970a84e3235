mod cli;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = cli::Args::parse();
    let (plan, factory) = match cli::build(&args) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "invalid plan");
            return ExitCode::FAILURE;
        }
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt_flag = interrupted.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt_flag.store(true, Ordering::Relaxed);
        }
    });

    let snapshot = match heyrs::run(&plan, factory, interrupted).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "transport failed to build");
            return ExitCode::FAILURE;
        }
    };

    match plan.output_mode {
        heyrs::OutputMode::Summary => {
            print!("{}", heyrs::reporter::render_summary(&snapshot));
        }
        heyrs::OutputMode::Csv => {
            let stdout = std::io::stdout();
            if let Err(e) = heyrs::reporter::render_csv(&snapshot, stdout.lock()) {
                error!(error = %e, "failed to write csv output");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
