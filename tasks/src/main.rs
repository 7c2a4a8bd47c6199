use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use demine_core::{Config, HardhatDeployments, JsonRpcClient, LocalSigners, Network};
use demine_tasks::{accounts, agent, nft, wrapped, TaskContext};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "demine",
    version,
    author = "DeMine Team",
    about = "DeMine contract deployment and maintenance tasks",
    long_about = None
)]
struct Cli {
    /// Target network (matic, maticdev, bsc, bscdev, localhost)
    #[arg(long, global = true, env = "DEMINE_NETWORK", default_value = "localhost")]
    network: String,

    /// Config file path
    #[arg(short, long, global = true, default_value = "demine.json")]
    config: PathBuf,

    /// Debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print named accounts
    Accounts,

    /// Print the ABI of a deployed contract
    Abi {
        #[arg(long)]
        contract: String,
    },

    /// Clone a wrapped token contract
    WrappedClone {
        /// Coin to wrap (usd, btc, eth, fil)
        #[arg(long)]
        coin: String,
    },

    /// Clone the DeMine NFT contract for a coin
    NftClone {
        #[arg(long)]
        coin: String,
    },

    /// Clone the mortgage agent for a coin's NFT
    AgentClone {
        #[arg(long)]
        coin: String,

        /// Cost per token in USD
        #[arg(long)]
        cost: String,
    },

    /// Finalize a single day, or pin the first finalized day with --timestamp
    NftAdminFinalize {
        #[arg(long)]
        coin: String,

        /// Start of the first day to finalize (unix seconds)
        #[arg(long)]
        timestamp: Option<u64>,
    },

    /// Finalize every full day up to today
    NftFinalize {
        #[arg(long)]
        coin: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let default_level = if cli.debug { "debug" } else { config.logging.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let network: Network = cli.network.parse().map_err(anyhow::Error::msg)?;

    let rpc_url = config.rpc_url(network)?;
    let mut chain = JsonRpcClient::new(rpc_url, &config.rpc, config.gas_price(network))
        .context("Failed to build RPC client")?;
    match LocalSigners::from_env().context("Failed to load signing keys")? {
        Some(signers) => chain = chain.with_signers(signers, network.chain_id()),
        None => tracing::warn!(
            "No DEPLOYER/ADMIN/CUSTODIAN/ALCHEMIST keys set, relying on accounts managed by the node"
        ),
    }
    let registry = HardhatDeployments::new(&config.deployments_dir, network);
    tracing::debug!(
        "Using {} via {} (local signing: {})",
        network,
        chain.base_url(),
        chain.signs_locally()
    );

    let ctx = TaskContext::new(config, network, chain, registry);

    match cli.command {
        Command::Accounts => {
            for (name, address) in accounts::accounts(&ctx).await? {
                let label = format!("{:<15}", format!("{}:", name));
                println!("{}{}", label.bright_black(), address.to_string().bright_cyan());
            }
        }
        Command::Abi { contract } => {
            let abi = accounts::abi(&ctx, &contract)?;
            println!("{}", serde_json::to_string_pretty(&abi)?);
        }
        Command::WrappedClone { coin } => {
            let address = wrapped::wrapped_clone(&ctx, &coin).await?;
            println!("{}", address);
        }
        Command::NftClone { coin } => {
            let address = nft::nft_clone(&ctx, &coin).await?;
            println!("{}", address);
        }
        Command::AgentClone { coin, cost } => {
            let address = agent::agent_clone(&ctx, &coin, &cost).await?;
            println!("{}", address);
        }
        Command::NftAdminFinalize { coin, timestamp } => {
            nft::nft_admin_finalize(&ctx, &coin, timestamp).await?;
        }
        Command::NftFinalize { coin } => {
            if let Some(report) = nft::nft_finalize(&ctx, &coin, Utc::now()).await? {
                println!(
                    "{} finalized up to {} ({} days advanced)",
                    coin.bright_green().bold(),
                    report.watermark,
                    report.advanced
                );
            }
        }
    }

    Ok(())
}
