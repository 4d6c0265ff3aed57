use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use fieldgate::{app, telemetry, Settings};

#[derive(Parser, Debug)]
#[command(name = "fieldgate")]
#[command(about = "Polls field devices through Scada-LTS and forwards readings to RabbitMQ")]
struct Args {
    /// Path to the settings file (defaults to ./fieldgate.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "info,fieldgate_engine=trace"
    #[arg(short, long)]
    log_level: Option<String>,

    /// Load and validate the settings, print them, and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref())?;
    telemetry::init(telemetry::filter(
        args.log_level.as_deref(),
        &settings.logging.level,
    )?)?;

    if args.check {
        println!("{:#?}", settings.scheduler);
        println!("{:#?}", settings.monitor);
        return Ok(());
    }

    app::run(settings).await
}
