//! Asset Ledger CLI - Command Line Interface

use assetledger_asset::{Asset, AssetFields};
use assetledger_cli::ApiClient;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "assetctl")]
#[command(about = "Asset Ledger CLI - manage dealer assets on a node")]
#[command(version)]
struct Cli {
    /// Node URL
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    node: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a dealer asset
    Create(AssetArgs),

    /// Replace every attribute of an existing asset
    Update(AssetArgs),

    /// Read the current asset
    Read {
        /// Dealer ID
        dealer_id: String,
    },

    /// Show every version of an asset, oldest first
    History {
        /// Dealer ID
        dealer_id: String,

        /// Include transaction ID, version and timestamp
        #[arg(long)]
        meta: bool,
    },

    /// Node status
    Status,
}

#[derive(Args)]
struct AssetArgs {
    /// Dealer ID
    dealer_id: String,

    #[arg(long)]
    msisdn: String,

    #[arg(long)]
    mpin: String,

    #[arg(long)]
    balance: f64,

    #[arg(long, default_value = "Active")]
    status: String,

    #[arg(long)]
    trans_amount: f64,

    #[arg(long)]
    trans_type: String,

    #[arg(long, default_value = "")]
    remarks: String,
}

impl AssetArgs {
    fn into_asset(self) -> Asset {
        Asset::new(
            self.dealer_id,
            AssetFields::new(
                self.msisdn,
                self.mpin,
                self.status,
                self.trans_type,
                self.remarks,
                self.balance,
                self.trans_amount,
            ),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let api_client = ApiClient::new(&cli.node)?;

    match cli.command {
        Commands::Create(args) => {
            let ack = api_client.create_asset(&args.into_asset()).await?;
            println!("{} ({}), state version {}", ack.message, ack.dealer_id, ack.state_version);
        }

        Commands::Update(args) => {
            let ack = api_client.update_asset(&args.into_asset()).await?;
            println!("{} ({}), state version {}", ack.message, ack.dealer_id, ack.state_version);
        }

        Commands::Read { dealer_id } => {
            let asset = api_client.read_asset(&dealer_id).await?;
            println!("{}", serde_json::to_string_pretty(&asset)?);
        }

        Commands::History { dealer_id, meta } => {
            if meta {
                let entries = api_client.asset_history_entries(&dealer_id).await?;
                if entries.is_empty() {
                    println!("No history for {}.", dealer_id);
                }
                for entry in entries {
                    println!("#{} tx={} at={}", entry.version, entry.tx_id, entry.timestamp);
                    println!("{}", serde_json::to_string_pretty(&entry.asset)?);
                }
            } else {
                let assets = api_client.asset_history(&dealer_id).await?;
                println!("{}", serde_json::to_string_pretty(&assets)?);
            }
        }

        Commands::Status => {
            let status = api_client.status().await?;
            println!("Asset Ledger Node Status");
            println!("========================");
            println!("Name:          {}", status.name);
            println!("Backend:       {}", status.backend);
            println!("State Version: {}", status.state_version);
        }
    }

    Ok(())
}
