//! Clinotes CLI - Extract structured clinical fields from free-text notes.

use clap::Parser;
use clinotes_cli::commands;
use clinotes_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // .env is optional; real environment variables take precedence
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clinotes=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> clinotes_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load or create config
    let config = match cli.config {
        Some(path) => Config::load(&path)?,
        None => {
            let path = Config::default_path()?;
            if path.exists() {
                Config::load(&path)?
            } else {
                let cfg = Config::default();
                cfg.save(&path).ok();
                cfg
            }
        }
    };

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Extract(args) => commands::execute_extract(args, &config, &formatter).await?,
        Command::Schema => commands::execute_schema(&formatter)?,
        Command::Models => commands::execute_models(&config, &formatter)?,
    }

    Ok(())
}
