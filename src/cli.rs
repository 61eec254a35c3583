use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use decentral_store::config::StoreConfig;
use decentral_store::storage::DiskContentStore;
use decentral_store::{CreatedFile, FileId};
use tokio::fs;

#[derive(Parser)]
#[command(name = "decentral-store")]
#[command(about = "Content-addressed file store with on-chain metadata anchors", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreConfig,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a file and anchor its metadata
    Upload {
        path: PathBuf,

        #[arg(short, long, default_value = "anonymous")]
        owner: String,

        /// Stored name, defaults to the file name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Download a file with its download token
    Download {
        id: String,

        #[arg(short, long)]
        token: String,

        #[arg(short = 'o', long = "out")]
        output: PathBuf,
    },

    /// Delete a file with its delete token
    Delete {
        id: String,

        #[arg(short, long)]
        token: String,
    },

    /// Show the public metadata and on-chain reference of a file
    Show { id: String },

    /// List public metadata of every record
    List,

    /// Retry anchoring a file that was stored without a confirmation
    Reanchor { id: String },

    /// Remove content chunks no stored object refers to
    Gc,
}

pub async fn execute_command(config: &StoreConfig, command: Commands) -> anyhow::Result<()> {
    let service = config.open_service().await?;

    match command {
        Commands::Upload { path, owner, name } => {
            let name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("Invalid filename: {}", path.display()))?,
            };
            let file = fs::File::open(&path)
                .await
                .with_context(|| format!("File not found: {}", path.display()))?;

            let outcome = service.create(&config.anchor_context(), &name, &owner, file).await?;
            println!("{}", serde_json::to_string_pretty(&CreatedFile::from(&outcome))?);
        }
        Commands::Download { id, token, output } => {
            let download = service.read(&FileId::parse(&id)?, &token).await?;
            fs::write(&output, &download.data).await?;
            println!("File downloaded to {}", output.display());
        }
        Commands::Delete { id, token } => {
            let reference = service.delete(&config.anchor_context(), &FileId::parse(&id)?, &token).await?;
            println!("{}", serde_json::to_string_pretty(&reference)?);
        }
        Commands::Show { id } => {
            let view = service.provenance(&FileId::parse(&id)?).await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::List => {
            let views = service.list().await?;
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        Commands::Reanchor { id } => {
            let reference = service.reanchor(&config.anchor_context(), &FileId::parse(&id)?).await?;
            println!("{}", serde_json::to_string_pretty(&reference)?);
        }
        Commands::Gc => {
            let content = DiskContentStore::new(&config.data_dir).await?;
            let removed = content.collect_garbage().await?;
            println!("Removed {} orphaned chunks", removed);
        }
    }

    Ok(())
}
