//! QR command implementation

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::render::QrGenerator;
use crate::settings::Settings;

/// Arguments for the qr command
#[derive(Args, Debug)]
pub struct QrArgs {
    /// URL to encode
    pub url: String,

    /// Write a PNG here instead of printing a data URI
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the qr command
pub async fn run(args: QrArgs, settings: &Settings) -> anyhow::Result<()> {
    let generator = QrGenerator::new(settings.qr);

    match args.output {
        Some(path) => {
            let png = generator.png(&args.url)?;
            tokio::fs::write(&path, &png)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} bytes to {}", png.len(), path.display());
        }
        None => println!("{}", generator.data_uri(&args.url)?),
    }

    Ok(())
}
