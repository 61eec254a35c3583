use std::net::IpAddr;

use anyhow::anyhow;
use clap::Parser;
use decentral_store::config::StoreConfig;
use decentral_store::telemetry;
use rocket::data::ToByteUnit;
use server::AppState;

#[derive(Parser)]
#[command(name = "api_server")]
#[command(about = "HTTP API for the decentral store", long_about = None)]
struct ServerArgs {
    #[command(flatten)]
    store: StoreConfig,

    #[arg(long, env = "API_ADDRESS", default_value = "127.0.0.1")]
    address: IpAddr,

    #[arg(long, env = "API_PORT", default_value_t = 8081)]
    port: u16,

    /// Largest accepted upload in MiB
    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = 100)]
    max_upload_mb: u64,
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    telemetry::init(args.store.json_logs);

    let service = args.store.open_service().await?;
    let state = AppState::new(service, args.store.anchor_timeout(), args.max_upload_mb.mebibytes());

    let figment = rocket::Config::figment()
        .merge(("address", args.address))
        .merge(("port", args.port));

    server::build(state)
        .configure(figment)
        .launch()
        .await
        .map_err(|e| anyhow!("server failed: {}", e))?;
    Ok(())
}
