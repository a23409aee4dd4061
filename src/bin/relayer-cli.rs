use std::path::PathBuf;

use alloy::primitives::B256;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use evm_relayer::config::{load_config, EvmChainConfig};
use evm_relayer::rpc::ClientRegistry;

#[derive(Parser)]
#[command(name = "relayer-cli")]
#[command(about = "Diagnostics for the EVM bridge relayer", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "relayer.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which finality rule each chain is classified under
    Probe {
        /// Only probe this chain (and its L1)
        #[arg(long)]
        chain: Option<String>,
    },
    /// Check whether a transaction is finalized
    Finality {
        #[arg(long)]
        chain: String,

        #[arg(long)]
        tx: B256,

        #[arg(long, default_value_t = 1)]
        confirmations: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Probe { chain } => {
            let chains = match &chain {
                Some(name) => chains_for(&config.chains, name)?,
                None => config.chains.clone(),
            };
            let registry = ClientRegistry::connect(&chains).await?;

            let report: Vec<Value> = registry
                .chains()
                .into_iter()
                .filter_map(|name| {
                    registry
                        .get(&name)
                        .map(|client| json!({ "chain": name, "finality": client.kind().to_string() }))
                })
                .collect();
            print_json(&Value::Array(report))?;
        }
        Commands::Finality {
            chain,
            tx,
            confirmations,
        } => {
            let registry = ClientRegistry::connect(&chains_for(&config.chains, &chain)?).await?;
            let client = registry
                .get(&chain)
                .ok_or_else(|| format!("chain {} is not enabled", chain))?;

            let receipt = match client.transaction_receipt(tx).await {
                Ok(receipt) => receipt,
                Err(e) if e.is_not_found() => {
                    print_json(&json!({ "chain": chain, "tx": tx, "status": "not_found" }))?;
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            let finalized_height = client.finalized_height(confirmations, &receipt).await?;

            print_json(&json!({
                "chain": chain,
                "tx": tx,
                "finality": client.kind().to_string(),
                "block_number": receipt.block_number,
                "succeeded": receipt.status,
                "finalized": finalized_height.is_some(),
                "finalized_height": finalized_height,
            }))?;
        }
    }

    Ok(())
}

/// The named chain plus the L1 it settles to, if any.
fn chains_for(chains: &[EvmChainConfig], name: &str) -> Result<Vec<EvmChainConfig>, String> {
    let chain = chains
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| format!("chain {} is not configured", name))?;

    let mut selected = vec![chain.clone()];
    if let Some(l1_name) = &chain.l1_chain_name {
        if let Some(l1) = chains.iter().find(|c| c.name.eq_ignore_ascii_case(l1_name)) {
            selected.push(l1.clone());
        }
    }
    Ok(selected)
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
