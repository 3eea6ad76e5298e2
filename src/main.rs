//! signboard - events and reservations board for makerspace displays
//!
//! Pulls events from Wild Apricot and space reservations from Skedda and
//! serves them as filterable pages:
//! - Master page with quick links and QR codes (`/`)
//! - Kiosk, mobile, desktop and print layouts (`/display`)
//! - Kiosk pages reload themselves every five minutes

mod cli;
mod core;
mod kiosk;
mod logging;
mod providers;
mod render;
mod server;
mod settings;

use clap::Parser;
use cli::{exit_codes, Cli, Commands};
use server::ServerError;
use settings::Settings;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return exit_codes::CONFIG_ERROR;
        }
    };

    if let Err(e) = logging::init(cli.verbose, cli.json_output, &settings.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::UNEXPECTED_FAILURE;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Some(Commands::Serve(args)) => cli::serve::run(args, settings).await,
            Some(Commands::Display(args)) => cli::display::run(args, settings).await,
            Some(Commands::Qr(args)) => cli::qr::run(args, &settings).await,
            None => cli::serve::run(Default::default(), settings).await,
        }
    });

    match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            categorize_error(&e)
        }
    }
}

/// Categorize an error into the appropriate exit code
fn categorize_error(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<ServerError>() {
        Some(ServerError::Bind { .. }) => exit_codes::BIND_ERROR,
        _ if e.downcast_ref::<settings::SettingsError>().is_some() => exit_codes::CONFIG_ERROR,
        _ => exit_codes::UNEXPECTED_FAILURE,
    }
}
