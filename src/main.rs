use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use plaintextfeeds::app;
use plaintextfeeds::config::Config;

/// Get the home directory from $HOME
fn get_home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home))
}

/// Default settings file (~/.config/plaintextfeeds/config.toml)
fn default_config_path(home: &Path) -> PathBuf {
    home.join(".config")
        .join("plaintextfeeds")
        .join("config.toml")
}

#[derive(Parser, Debug)]
#[command(
    name = "plaintextfeeds",
    version,
    about = "Print new entries from RSS/Atom feeds as plain text"
)]
struct Args {
    /// Feed list: one URL per line, '#' starts a comment [default: ~/.plaintextfeeds]
    #[arg(long, value_name = "FILE")]
    feeds: Option<PathBuf>,

    /// Seen-entry state file [default: ~/.plaintextfeeds.seen.json]
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Settings file [default: ~/.config/plaintextfeeds/config.toml]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr: stdout carries the digest
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let home = get_home_dir()?;

    let config_path = match &args.config {
        Some(path) if !path.exists() => {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        Some(path) => path.clone(),
        None => default_config_path(&home),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;

    let (feeds_path, state_path) = config.resolve_paths(args.feeds, args.state, &home);

    let mut out = std::io::stdout().lock();
    let mut err = std::io::stderr();
    app::run(&feeds_path, &state_path, &config, &mut out, &mut err).await?;

    Ok(())
}
