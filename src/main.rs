use anyhow::Context;
use clap::Parser;
use chess_core::engine::config::EngineConfig;
use chess_core::settings::{default_settings_path, AppSettings};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod ui;

use app::App;

/// Play chess against the computer or a friend in the terminal.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file to read and update
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory for saved games, overriding the settings file
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Engine tuning file: JSON multipliers on the default piece values
    #[arg(long)]
    engine_config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let settings_path = args.settings.unwrap_or_else(default_settings_path);
    let mut settings = match AppSettings::load(&settings_path) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!("using default settings: {err}");
            AppSettings::default()
        }
    };
    if let Some(dir) = args.save_dir {
        settings.save_dir = dir;
    }
    tracing::info!("saves go to {}", settings.save_dir.display());

    let engine_config = match args.engine_config.as_deref() {
        Some(path) => load_engine_config(path)?,
        None => EngineConfig::default(),
    };

    App::new(settings, settings_path, engine_config)?.run().await
}

fn load_engine_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading engine config {}", path.display()))?;
    let config = EngineConfig::load_from_json(&text)
        .with_context(|| format!("parsing engine config {}", path.display()))?;
    tracing::info!("engine config loaded from {}", path.display());
    Ok(config)
}

fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // Logs go to stderr so they never interleave with the board on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
