//! Configuration for the bridge CLI
//!
//! Everything comes from environment variables (a `.env` file is honored),
//! with defaults for everything except the private key.

use alloy::primitives::Address;
use eyre::{eyre, Result};
use opstack_rs::{BridgeAddresses, BridgeTuning, MESSAGE_PASSER_PREDEPLOY};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Runtime configuration, fully resolved.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hex private key driving both chains
    pub private_key: String,
    pub l1_rpc_url: Url,
    pub l2_rpc_url: Url,
    /// Display name of the base chain
    pub l1_name: String,
    /// Display name of the rollup
    pub l2_name: String,
    pub addresses: BridgeAddresses,
    pub tuning: BridgeTuning,
    /// Solidity compiler binary
    pub solc_path: String,
    /// Token template compiled by the deploy menu
    pub token_template: PathBuf,
    /// Contract name inside the template
    pub token_contract_name: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `BRIDGE_PRIVATE_KEY` is the only required variable. The dispute
    /// game factory address may be left unset; it is then discovered from
    /// the portal at first use.
    pub fn from_env() -> Result<Self> {
        let private_key = std::env::var("BRIDGE_PRIVATE_KEY")
            .map_err(|_| eyre!("BRIDGE_PRIVATE_KEY is not set"))?;

        let l1_rpc_url =
            std::env::var("L1_RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string());
        let l2_rpc_url =
            std::env::var("L2_RPC_URL").unwrap_or_else(|_| "http://localhost:9545".to_string());

        let addresses = BridgeAddresses {
            portal: parse_address_env("PORTAL_ADDRESS"),
            dispute_game_factory: parse_address_env("DISPUTE_GAME_FACTORY_ADDRESS"),
            message_passer: {
                let configured = parse_address_env("MESSAGE_PASSER_ADDRESS");
                if configured == Address::ZERO {
                    MESSAGE_PASSER_PREDEPLOY
                } else {
                    configured
                }
            },
        };

        let tuning = BridgeTuning {
            deposit_gas_limit: parse_u64_env("DEPOSIT_GAS_LIMIT", 100_000),
            withdrawal_gas_limit: parse_u64_env("WITHDRAWAL_GAS_LIMIT", 100_000),
            receipt_poll: Duration::from_millis(parse_u64_env("RECEIPT_POLL_MS", 2_000)),
            l1_receipt_timeout: Duration::from_secs(parse_u64_env("L1_RECEIPT_TIMEOUT_SECS", 300)),
            l2_receipt_timeout: Duration::from_secs(parse_u64_env("L2_RECEIPT_TIMEOUT_SECS", 600)),
            provable_poll: Duration::from_secs(parse_u64_env("PROVABLE_POLL_SECS", 30)),
            finalizable_poll: Duration::from_secs(parse_u64_env("FINALIZABLE_POLL_SECS", 60)),
        };

        Ok(Self {
            private_key,
            l1_rpc_url: Url::parse(&l1_rpc_url)?,
            l2_rpc_url: Url::parse(&l2_rpc_url)?,
            l1_name: std::env::var("L1_NAME").unwrap_or_else(|_| "L1".to_string()),
            l2_name: std::env::var("L2_NAME").unwrap_or_else(|_| "L2".to_string()),
            addresses,
            tuning,
            solc_path: std::env::var("SOLC_PATH").unwrap_or_else(|_| "solc".to_string()),
            token_template: std::env::var("TOKEN_TEMPLATE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("contracts/Token.sol")),
            token_contract_name: std::env::var("TOKEN_CONTRACT_NAME")
                .unwrap_or_else(|_| "Token".to_string()),
        })
    }
}

fn parse_address_env(key: &str) -> Address {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Address::ZERO)
}

fn parse_u64_env(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
