use clap::Parser;
use decentral_store::telemetry;

mod cli;

use cli::{execute_command, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.store.json_logs);

    execute_command(&cli.store, cli.command).await
}
