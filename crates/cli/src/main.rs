use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use libris_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "libris", version, about = "Libris book catalog API")]
struct Cli {
    /// Directory holding base.toml and {env}.toml
    #[arg(long, global = true, env = "LIBRIS_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Deployment environment: local, staging or production
    #[arg(long, global = true, env = "LIBRIS_ENV", default_value = "local")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C or SIGTERM
    Serve,
    /// Print the effective settings as JSON, secrets masked
    Config,
    /// Print the merged OpenAPI document
    Openapi,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let config_dir = self
            .config_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("config"));
        Settings::load_from(&config_dir, &self.env).context("failed to load Libris settings")
    }
}

fn main() -> anyhow::Result<()> {
    // `.env` feeds both the flags below and the settings layers
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let settings = cli.settings()?;

    match cli.command {
        Command::Serve => {
            libris_telemetry::init(&settings.telemetry)?;
            tokio::runtime::Runtime::new()
                .context("failed to start the tokio runtime")?
                .block_on(libris_app::run(settings))
        }
        Command::Config => print_json(&serde_json::to_value(settings.redacted())?),
        Command::Openapi => print_json(&libris_app::openapi_document(&settings)?),
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
