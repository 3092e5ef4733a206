use std::fs::File;
use std::path::PathBuf;

use anyhow::Error;
use clap::Parser;

use picguessr_core::{
    app,
    config::{Config, SharedConfig},
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the JSON config file.
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Print debug logs and allow games in private chats.
    #[arg(short, long)]
    debug: bool,
}

fn load_config(args: &Args) -> Result<Config, Error> {
    let file = File::open(&args.config)?;
    let mut config: Config = serde_json::from_reader(file)?;
    if args.debug {
        config.allow_private_chats = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let mut logger = pretty_env_logger::formatted_timed_builder();
    logger.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            log::error!(
                "Failed to load config from {}: {}",
                args.config.display(),
                err
            );
            std::process::exit(1);
        }
    };

    log::info!("Bot is starting...");
    app::run(SharedConfig::new(config)).await;
}
