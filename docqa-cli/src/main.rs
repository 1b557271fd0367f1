//! DocQA CLI - ask questions about documents from the terminal

use clap::Parser;
use docqa_cli::Cli;
use docqa_telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli.telemetry_config())?;
    docqa_cli::run(cli).await
}
