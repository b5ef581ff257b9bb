//! Portal Bridge CLI entrypoint
//!
//! With a subcommand the tool runs one flow and exits; without one it
//! drops into the interactive menu. Either way the session needs
//! `BRIDGE_PRIVATE_KEY` in the environment (a `.env` file works).

use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use eyre::Result;
use tracing_subscriber::EnvFilter;

use opstack_rs::{BridgeOps, PortalBridge};
use portal_bridge_cli::{config::Config, deploy, flows, prompt, render};

#[derive(Parser)]
#[command(name = "portal-bridge")]
#[command(about = "Bridge ETH across an OP Stack portal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Deposit ETH from L1 to L2
    Deposit {
        /// Amount in ETH (prompted if omitted)
        amount: Option<String>,
    },

    /// Withdraw ETH from L2 to L1 (initiate, prove, finalize)
    Withdraw {
        /// Amount in ETH (prompted if omitted)
        amount: Option<String>,

        /// Stop after the initiation; prove and finalize later
        #[arg(long)]
        initiate_only: bool,
    },

    /// Prove an initiated withdrawal
    Prove {
        /// L2 initiation transaction hash (prompted if omitted)
        tx_hash: Option<String>,
    },

    /// Finalize a proven withdrawal after the challenge period
    Finalize {
        /// L2 initiation transaction hash (prompted if omitted)
        tx_hash: Option<String>,
    },

    /// Show L1 and L2 balances
    Balance,

    /// Compile the token template and deploy it to L2
    Deploy {
        /// Token name
        #[arg(long)]
        name: Option<String>,

        /// Token symbol
        #[arg(long)]
        symbol: Option<String>,

        /// Initial supply in whole tokens (18 decimals)
        #[arg(long)]
        supply: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            render::fail(&format!("{error}"));
            println!("Set it with: export BRIDGE_PRIVATE_KEY=0x... (or put it in .env)");
            std::process::exit(1);
        }
    };

    let bridge = match PortalBridge::new(
        config.l1_rpc_url.as_str(),
        config.l2_rpc_url.as_str(),
        &config.private_key,
        config.addresses,
        config.tuning,
    ) {
        Ok(bridge) => bridge,
        Err(error) => {
            render::fail(&format!("{error:#}"));
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(command) => run_command(command, &bridge, &config).await,
        None => interactive(&bridge, &config).await,
    }
}

/// One-shot mode: run the flow and let any error propagate (non-zero exit).
async fn run_command<B: BridgeOps>(command: Commands, bridge: &B, config: &Config) -> Result<()> {
    match command {
        Commands::Deposit { amount } => {
            let amount = resolve_amount(amount, "Deposit amount (ETH) L1 -> L2", "0.001")?;
            flows::deposit_flow(bridge, amount).await?;
        }

        Commands::Withdraw {
            amount,
            initiate_only,
        } => {
            let amount = resolve_amount(amount, "Withdraw amount (ETH) L2 -> L1", "0.00005")?;
            if initiate_only {
                flows::withdraw_initiate_flow(bridge, amount).await?;
                render::reminder("Keep the L2 tx hash to prove and finalize later");
            } else {
                flows::withdraw_full_flow(bridge, amount).await?;
            }
        }

        Commands::Prove { tx_hash } => {
            let tx_hash = resolve_tx_hash(tx_hash, "L2 withdrawal tx hash (initiation)")?;
            flows::withdraw_prove_flow(bridge, tx_hash).await?;
        }

        Commands::Finalize { tx_hash } => {
            let tx_hash = resolve_tx_hash(tx_hash, "L2 withdrawal tx hash (proved)")?;
            flows::withdraw_finalize_flow(bridge, tx_hash).await?;
        }

        Commands::Balance => {
            flows::balances_flow(bridge, &config.l1_name, &config.l2_name).await?;
        }

        Commands::Deploy {
            name,
            symbol,
            supply,
        } => {
            let name = match name {
                Some(name) => name,
                None => prompt::prompt_text("Token name", "My Token")?,
            };
            let symbol = match symbol {
                Some(symbol) => symbol,
                None => prompt::prompt_text("Token symbol", "MTK")?,
            };
            let supply = match supply {
                Some(supply) => prompt::parse_token_supply(&supply)?,
                None => {
                    prompt::parse_token_supply(&prompt::prompt_text("Initial supply", "1000000")?)?
                }
            };
            deploy::deploy_flow(bridge, config, &name, &symbol, supply).await?;
        }
    }
    Ok(())
}

/// Interactive mode: banner, balances, then the menu loop. Flow errors are
/// printed and the menu continues; leaving the menu exits cleanly.
async fn interactive<B: BridgeOps>(bridge: &B, config: &Config) -> Result<()> {
    render::banner(bridge.sender());

    if let Err(error) = flows::balances_flow(bridge, &config.l1_name, &config.l2_name).await {
        render::fail(&format!("balance check failed: {error:#}"));
    }
    println!();

    loop {
        let choice = prompt::prompt_menu(
            "Main menu",
            &["Bridge ETH", "Deploy ERC-20 (template)", "Check balances", "Exit"],
        );
        let choice = match choice {
            Ok(choice) => choice,
            // Closed stdin means leave
            Err(_) => break,
        };

        let result = match choice {
            0 => bridge_menu(bridge).await,
            1 => deploy_menu(bridge, config).await,
            2 => flows::balances_flow(bridge, &config.l1_name, &config.l2_name)
                .await
                .map(|_| ()),
            _ => break,
        };

        if let Err(error) = result {
            render::fail(&format!("{error:#}"));
        }
        render::hr(Some("Main menu"));
    }

    println!("Bye!");
    Ok(())
}

async fn bridge_menu<B: BridgeOps>(bridge: &B) -> Result<()> {
    let choice = prompt::prompt_menu(
        "Bridge menu",
        &[
            "Deposit (L1 -> L2)",
            "Withdraw initiate (L2 -> L1)",
            "Withdraw prove",
            "Withdraw finalize",
            "Withdraw full (initiate -> prove -> finalize)",
            "Back",
        ],
    )?;

    match choice {
        0 => {
            let amount = prompt::prompt_amount("Deposit amount (ETH) L1 -> L2", "0.001")?;
            if !confirm_amount(amount)? {
                return Ok(());
            }
            flows::deposit_flow(bridge, amount).await?;
        }
        1 => {
            let amount = prompt::prompt_amount("Withdraw amount (ETH) L2 -> L1", "0.00005")?;
            if !confirm_amount(amount)? {
                return Ok(());
            }
            flows::withdraw_initiate_flow(bridge, amount).await?;
            render::reminder("Keep the L2 tx hash to prove and finalize later");
        }
        2 => {
            let tx_hash = prompt::prompt_tx_hash("L2 withdrawal tx hash (initiation)")?;
            flows::withdraw_prove_flow(bridge, tx_hash).await?;
        }
        3 => {
            let tx_hash = prompt::prompt_tx_hash("L2 withdrawal tx hash (proved)")?;
            flows::withdraw_finalize_flow(bridge, tx_hash).await?;
        }
        4 => {
            let amount = prompt::prompt_amount("Withdraw amount (ETH) L2 -> L1", "0.00005")?;
            if !confirm_amount(amount)? {
                return Ok(());
            }
            flows::withdraw_full_flow(bridge, amount).await?;
        }
        _ => {}
    }
    Ok(())
}

async fn deploy_menu<B: BridgeOps>(bridge: &B, config: &Config) -> Result<()> {
    let name = prompt::prompt_text("Token name", "My Token")?;
    let symbol = prompt::prompt_text("Token symbol", "MTK")?;
    let supply = loop {
        let input = prompt::prompt_text("Initial supply (whole tokens, 18 decimals)", "1000000")?;
        match prompt::parse_token_supply(&input) {
            Ok(supply) => break supply,
            Err(error) => println!("  {error}"),
        }
    };

    deploy::deploy_flow(bridge, config, &name, &symbol, supply).await?;
    Ok(())
}

fn confirm_amount(amount: U256) -> Result<bool> {
    let proceed = prompt::confirm(
        &format!(
            "Send {} ETH?",
            alloy::primitives::utils::format_ether(amount)
        ),
        true,
    )?;
    if !proceed {
        println!("Cancelled");
    }
    Ok(proceed)
}

fn resolve_amount(given: Option<String>, message: &str, initial: &str) -> Result<U256> {
    match given {
        Some(amount) => prompt::parse_eth_amount(&amount),
        None => prompt::prompt_amount(message, initial),
    }
}

fn resolve_tx_hash(
    given: Option<String>,
    message: &str,
) -> Result<alloy::primitives::B256> {
    match given {
        Some(hash) => prompt::parse_tx_hash(&hash),
        None => prompt::prompt_tx_hash(message),
    }
}
