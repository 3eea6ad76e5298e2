//! Serve command implementation

use std::sync::Arc;

use clap::Args;

use crate::server::{self, AppState};
use crate::settings::Settings;

/// Arguments for the serve command
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to listen on (overrides settings)
    #[arg(long)]
    pub bind: Option<String>,
}

/// Run the serve command
pub async fn run(args: ServeArgs, settings: Settings) -> anyhow::Result<()> {
    let bind = args.bind.unwrap_or_else(|| settings.bind.clone());

    tracing::info!(
        wild_apricot = %settings.wild_apricot_url,
        fetch_timeout_secs = settings.fetch_timeout_secs,
        kiosk_match = settings.kiosk_match.as_str(),
        "Starting board server"
    );

    let state = Arc::new(AppState::new(settings));
    server::run(state, &bind).await?;
    Ok(())
}
