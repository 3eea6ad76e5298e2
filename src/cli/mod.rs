//! Command-line interface
//!
//! With no subcommand the board is served over HTTP.

pub mod display;
pub mod qr;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use display::DisplayArgs;
pub use qr::QrArgs;
pub use serve::ServeArgs;

/// signboard - makerspace events and reservations board
#[derive(Parser, Debug)]
#[command(name = "signboard")]
#[command(version, about = "Events and reservations board for makerspace displays")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Settings file (defaults to <config dir>/signboard/config.toml)
    #[arg(long, global = true, env = "SIGNBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the board over HTTP (default)
    Serve(ServeArgs),

    /// Render a display view in the terminal
    Display(DisplayArgs),

    /// Write a QR code for a URL
    Qr(QrArgs),
}

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const UNEXPECTED_FAILURE: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const BIND_ERROR: i32 = 3;
}
