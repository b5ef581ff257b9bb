//! OPStack-RS: Shared OP Stack Bridge Library
//!
//! This crate provides the chain-facing half of the portal bridge tool:
//!
//! - **Clients** - Read-only and transaction-signing HTTP clients for the
//!   base chain and the rollup
//! - **Contracts** - `sol!` bindings for the OptimismPortal, the
//!   DisputeGameFactory, and the L2ToL1MessagePasser predeploy
//! - **Deposit** - Deposit transaction derivation: decoding
//!   `TransactionDeposited` logs and predicting the rollup-side
//!   transaction hash from a base-chain receipt
//! - **Withdrawal** - Withdrawal extraction and hashing matching the
//!   message passer contract, plus the `sentMessages` storage slot
//! - **Bridge** - The `BridgeOps` trait and its `PortalBridge`
//!   implementation sequencing deposit and initiate/prove/finalize calls
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! opstack-rs = { path = "../opstack-rs" }
//! ```

pub mod bridge;
pub mod client;
pub mod contracts;
pub mod deposit;
pub mod withdrawal;

// Re-export commonly used items at the crate root
pub use bridge::{
    BridgeAddresses, BridgeOps, BridgeTuning, DepositRequest, DisputeGameRef, PortalBridge,
    WithdrawalRequest,
};
pub use client::{ChainClient, ChainSigner, TxConfirmation};
pub use deposit::{predicted_l2_hashes, DepositTransaction};
pub use withdrawal::{extract_withdrawal, hash_withdrawal, Withdrawal};

/// Address of the `L2ToL1MessagePasser` predeploy on OP Stack rollups.
pub const MESSAGE_PASSER_PREDEPLOY: alloy::primitives::Address =
    alloy::primitives::address!("4200000000000000000000000000000000000016");
