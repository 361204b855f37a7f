mod cli;
mod config;
mod decode;
mod error;
mod export;
mod literal;
mod loader;
mod model;
mod pipeline;
mod reference;
mod report;
mod stats;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tft_item_analysis=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Cli::parse();

    if let Err(err) = cli::run(args) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
