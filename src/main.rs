//! Entry point of the `scoring-api` server.
#![forbid(unsafe_code)]

use clap::Parser;
use scoring_api::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli::run(cli).await {
        eprintln!("scoring-api: {err}");
        std::process::exit(1);
    }
}
