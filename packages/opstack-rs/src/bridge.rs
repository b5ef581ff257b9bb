//! Bridge operations
//!
//! `BridgeOps` is the seam between the interactive flows and the chains:
//! every network-touching step of the deposit and withdrawal sequences is a
//! method here, so the flows can be exercised against a mock. The real
//! implementation, `PortalBridge`, holds the four client handles (read-only
//! and signing, per chain) and sequences the portal, dispute game factory,
//! and message passer calls.

use std::time::Duration;

use alloy::{
    eips::BlockId,
    primitives::{Address, Bytes, TxKind, B256, U256},
    providers::Provider,
    rpc::types::{TransactionInput, TransactionRequest},
};
use async_trait::async_trait;
use eyre::{bail, ensure, eyre, Result, WrapErr};
use tracing::{debug, info, warn};

use crate::client::{ChainClient, ChainSigner, TxConfirmation};
use crate::contracts::{
    DisputeGameFactory, FaultDisputeGame, L2ToL1MessagePasser, OptimismPortal, OutputRootProof,
    ERC20, GAME_STATUS_CHALLENGER_WINS,
};
use crate::withdrawal::Withdrawal;

/// How many games a single provability poll will inspect, newest first.
const GAME_SCAN_DEPTH: u64 = 256;

/// Gas floor for plain value transfers.
const MIN_TRANSFER_GAS: u64 = 21_000;

/// Bridge contract addresses on both chains.
#[derive(Debug, Clone, Copy)]
pub struct BridgeAddresses {
    /// OptimismPortal on the base chain
    pub portal: Address,
    /// DisputeGameFactory on the base chain; `Address::ZERO` means
    /// "discover it from the portal"
    pub dispute_game_factory: Address,
    /// L2ToL1MessagePasser predeploy on the rollup
    pub message_passer: Address,
}

/// Polling and gas tuning.
#[derive(Debug, Clone, Copy)]
pub struct BridgeTuning {
    /// Fallback rollup gas limit for deposits when estimation fails
    pub deposit_gas_limit: u64,
    /// Gas limit forwarded with withdrawal initiations
    pub withdrawal_gas_limit: u64,
    /// Receipt poll interval
    pub receipt_poll: Duration,
    /// How long to wait for a base-chain receipt
    pub l1_receipt_timeout: Duration,
    /// How long to wait for a rollup receipt (deposits can take minutes)
    pub l2_receipt_timeout: Duration,
    /// Interval between provability polls
    pub provable_poll: Duration,
    /// Interval between finalizability polls
    pub finalizable_poll: Duration,
}

impl Default for BridgeTuning {
    fn default() -> Self {
        Self {
            deposit_gas_limit: 100_000,
            withdrawal_gas_limit: 100_000,
            receipt_poll: Duration::from_secs(2),
            l1_receipt_timeout: Duration::from_secs(300),
            l2_receipt_timeout: Duration::from_secs(600),
            provable_poll: Duration::from_secs(30),
            finalizable_poll: Duration::from_secs(60),
        }
    }
}

/// Arguments of a portal deposit, built before submission.
#[derive(Debug, Clone)]
pub struct DepositRequest {
    /// Rollup-side recipient
    pub to: Address,
    /// ETH minted on the rollup (also the base-chain msg.value)
    pub mint: U256,
    /// Rollup gas limit for the deposit transaction
    pub gas_limit: u64,
    /// Rollup calldata
    pub data: Bytes,
}

/// Arguments of a withdrawal initiation, built before submission.
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    /// Base-chain target of the replayed call
    pub target: Address,
    /// ETH withdrawn
    pub value: U256,
    /// Gas limit of the replayed base-chain call
    pub gas_limit: U256,
    /// Calldata of the replayed call
    pub data: Bytes,
}

/// A dispute game a withdrawal can be proven against.
#[derive(Debug, Clone, Copy)]
pub struct DisputeGameRef {
    /// Creation index in the factory
    pub index: u64,
    /// Game proxy address
    pub proxy: Address,
    /// Rollup block the game's root claim commits to
    pub l2_block_number: u64,
}

/// The network-touching bridge operations, one method per step.
#[async_trait]
pub trait BridgeOps: Send + Sync {
    /// The account driving the bridge
    fn sender(&self) -> Address;

    /// OptimismPortal address on the base chain
    fn portal_address(&self) -> Address;

    /// Message passer predeploy address on the rollup
    fn message_passer_address(&self) -> Address;

    /// Sender's base-chain balance
    async fn l1_balance(&self) -> Result<U256>;

    /// Sender's rollup balance
    async fn l2_balance(&self) -> Result<U256>;

    /// Build deposit arguments (rollup-side gas estimate)
    async fn build_deposit(&self, amount: U256) -> Result<DepositRequest>;

    /// Submit the deposit through the portal on the base chain
    async fn submit_deposit(&self, request: &DepositRequest) -> Result<B256>;

    /// Wait for a base-chain transaction to confirm
    async fn wait_l1_confirmation(&self, tx_hash: B256) -> Result<TxConfirmation>;

    /// Wait for a rollup transaction to confirm
    async fn wait_l2_confirmation(&self, tx_hash: B256) -> Result<TxConfirmation>;

    /// Build withdrawal arguments (base-chain gas estimate)
    async fn build_withdrawal(&self, amount: U256) -> Result<WithdrawalRequest>;

    /// Initiate the withdrawal through the message passer on the rollup
    async fn submit_withdrawal(&self, request: &WithdrawalRequest) -> Result<B256>;

    /// Poll until a respected dispute game covers the given rollup block
    async fn wait_provable(&self, l2_block: u64) -> Result<DisputeGameRef>;

    /// Prove the withdrawal on the base chain against the given game
    async fn submit_proof(&self, withdrawal: &Withdrawal, game: &DisputeGameRef) -> Result<B256>;

    /// Poll until the challenge window has passed and the portal accepts
    /// the withdrawal as finalizable
    async fn wait_finalizable(&self, withdrawal_hash: B256) -> Result<()>;

    /// Finalize the withdrawal on the base chain
    async fn submit_finalize(&self, withdrawal: &Withdrawal) -> Result<B256>;

    /// Deploy a contract on the rollup and wait for its receipt
    async fn deploy_contract(&self, creation_code: Bytes) -> Result<TxConfirmation>;
}

/// The real bridge: four client handles plus contract addresses.
pub struct PortalBridge {
    l1: ChainClient,
    l2: ChainClient,
    l1_wallet: ChainSigner,
    l2_wallet: ChainSigner,
    addresses: BridgeAddresses,
    tuning: BridgeTuning,
}

impl PortalBridge {
    /// Construct the four client handles from one private key.
    pub fn new(
        l1_rpc_url: &str,
        l2_rpc_url: &str,
        private_key: &str,
        addresses: BridgeAddresses,
        tuning: BridgeTuning,
    ) -> Result<Self> {
        ensure!(
            addresses.portal != Address::ZERO,
            "portal contract address is not configured"
        );
        ensure!(
            addresses.message_passer != Address::ZERO,
            "message passer address is not configured"
        );

        let l1 = ChainClient::new("L1", l1_rpc_url)?;
        let l2 = ChainClient::new("L2", l2_rpc_url)?;
        let l1_wallet = ChainSigner::new("L1", l1_rpc_url, private_key)?;
        let l2_wallet = ChainSigner::new("L2", l2_rpc_url, private_key)?;

        Ok(Self {
            l1,
            l2,
            l1_wallet,
            l2_wallet,
            addresses,
            tuning,
        })
    }

    /// The configured dispute game factory, or the one the portal reports.
    async fn dispute_game_factory_address(&self) -> Result<Address> {
        if self.addresses.dispute_game_factory != Address::ZERO {
            return Ok(self.addresses.dispute_game_factory);
        }
        let portal = OptimismPortal::new(self.addresses.portal, self.l1.provider());
        let factory = portal
            .disputeGameFactory()
            .call()
            .await
            .wrap_err("failed to query the portal's dispute game factory")?
            ._0;
        ensure!(
            factory != Address::ZERO,
            "portal reports no dispute game factory"
        );
        Ok(factory)
    }

    /// Newest respected-type game, if it already covers the target block.
    async fn latest_covering_game(
        &self,
        factory: &Address,
        game_type: u32,
        l2_block: u64,
    ) -> Result<Option<DisputeGameRef>> {
        let factory = DisputeGameFactory::new(*factory, self.l1.provider());
        let count: u64 = factory
            .gameCount()
            .call()
            .await?
            ._0
            .try_into()
            .unwrap_or(u64::MAX);
        let floor = count.saturating_sub(GAME_SCAN_DEPTH);

        let mut index = count;
        while index > floor {
            index -= 1;
            let game = factory.gameAtIndex(U256::from(index)).call().await?;
            if game.gameType != game_type {
                continue;
            }
            let proxy = FaultDisputeGame::new(game.proxy, self.l1.provider());
            let game_block: u64 = proxy
                .l2BlockNumber()
                .call()
                .await?
                ._0
                .try_into()
                .unwrap_or(u64::MAX);
            if game_block < l2_block {
                // Newest respected game is still behind the withdrawal
                return Ok(None);
            }
            let status = proxy.status().call().await?._0;
            if status == GAME_STATUS_CHALLENGER_WINS {
                continue;
            }
            return Ok(Some(DisputeGameRef {
                index,
                proxy: game.proxy,
                l2_block_number: game_block,
            }));
        }
        Ok(None)
    }

    /// Estimate the gas of a plain self-transfer, with a configured fallback.
    async fn estimate_transfer_gas(
        &self,
        client: &ChainClient,
        amount: U256,
        fallback: u64,
    ) -> u64 {
        let request = TransactionRequest {
            from: Some(self.sender()),
            to: Some(TxKind::Call(self.sender())),
            value: Some(amount),
            ..Default::default()
        };
        match client.estimate_gas(&request).await {
            Ok(gas) => gas.max(MIN_TRANSFER_GAS),
            Err(error) => {
                warn!(
                    chain = %client.name(),
                    %error,
                    fallback,
                    "Gas estimation failed, using fallback"
                );
                fallback
            }
        }
    }
}

#[async_trait]
impl BridgeOps for PortalBridge {
    fn sender(&self) -> Address {
        self.l1_wallet.address()
    }

    fn portal_address(&self) -> Address {
        self.addresses.portal
    }

    fn message_passer_address(&self) -> Address {
        self.addresses.message_passer
    }

    async fn l1_balance(&self) -> Result<U256> {
        self.l1.get_balance(self.sender()).await
    }

    async fn l2_balance(&self) -> Result<U256> {
        self.l2.get_balance(self.sender()).await
    }

    async fn build_deposit(&self, amount: U256) -> Result<DepositRequest> {
        let estimated = self
            .estimate_transfer_gas(&self.l2, amount, self.tuning.deposit_gas_limit)
            .await;

        // The portal enforces a calldata-dependent minimum
        let portal = OptimismPortal::new(self.addresses.portal, self.l1.provider());
        let floor = portal
            .minimumGasLimit(0)
            .call()
            .await
            .map(|result| result._0)
            .unwrap_or(MIN_TRANSFER_GAS);

        Ok(DepositRequest {
            to: self.sender(),
            mint: amount,
            gas_limit: estimated.max(floor),
            data: Bytes::new(),
        })
    }

    async fn submit_deposit(&self, request: &DepositRequest) -> Result<B256> {
        let portal = OptimismPortal::new(self.addresses.portal, self.l1_wallet.provider());
        let pending = portal
            .depositTransaction(
                request.to,
                request.mint,
                request.gas_limit,
                false,
                request.data.clone(),
            )
            .value(request.mint)
            .send()
            .await
            .wrap_err("failed to submit the deposit on L1")?;
        let tx_hash = *pending.tx_hash();
        info!(tx = %tx_hash, mint = %request.mint, "Deposit submitted");
        Ok(tx_hash)
    }

    async fn wait_l1_confirmation(&self, tx_hash: B256) -> Result<TxConfirmation> {
        self.l1
            .wait_for_confirmation(tx_hash, self.tuning.l1_receipt_timeout, self.tuning.receipt_poll)
            .await
    }

    async fn wait_l2_confirmation(&self, tx_hash: B256) -> Result<TxConfirmation> {
        self.l2
            .wait_for_confirmation(tx_hash, self.tuning.l2_receipt_timeout, self.tuning.receipt_poll)
            .await
    }

    async fn build_withdrawal(&self, amount: U256) -> Result<WithdrawalRequest> {
        let gas_limit = self
            .estimate_transfer_gas(&self.l1, amount, self.tuning.withdrawal_gas_limit)
            .await;
        Ok(WithdrawalRequest {
            target: self.sender(),
            value: amount,
            gas_limit: U256::from(gas_limit),
            data: Bytes::new(),
        })
    }

    async fn submit_withdrawal(&self, request: &WithdrawalRequest) -> Result<B256> {
        let messenger =
            L2ToL1MessagePasser::new(self.addresses.message_passer, self.l2_wallet.provider());
        let pending = messenger
            .initiateWithdrawal(request.target, request.gas_limit, request.data.clone())
            .value(request.value)
            .send()
            .await
            .wrap_err("failed to initiate the withdrawal on L2")?;
        let tx_hash = *pending.tx_hash();
        info!(tx = %tx_hash, value = %request.value, "Withdrawal initiated");
        Ok(tx_hash)
    }

    async fn wait_provable(&self, l2_block: u64) -> Result<DisputeGameRef> {
        let factory = self.dispute_game_factory_address().await?;
        let portal = OptimismPortal::new(self.addresses.portal, self.l1.provider());
        let game_type = portal.respectedGameType().call().await?._0;

        info!(l2_block, game_type, "Waiting for an output proposal covering the withdrawal");
        loop {
            if let Some(game) = self.latest_covering_game(&factory, game_type, l2_block).await? {
                info!(
                    game_index = game.index,
                    game_block = game.l2_block_number,
                    "Withdrawal is provable"
                );
                return Ok(game);
            }
            debug!(l2_block, "No covering output proposal yet");
            tokio::time::sleep(self.tuning.provable_poll).await;
        }
    }

    async fn submit_proof(&self, withdrawal: &Withdrawal, game: &DisputeGameRef) -> Result<B256> {
        let (state_root, block_hash) = self.l2.block_commitment(game.l2_block_number).await?;

        let slot = withdrawal.storage_slot();
        let proof = self
            .l2
            .provider()
            .get_proof(self.addresses.message_passer, vec![slot])
            .block_id(BlockId::from(game.l2_block_number))
            .await
            .wrap_err("failed to fetch the withdrawal storage proof")?;
        let storage_proof = proof
            .storage_proof
            .first()
            .map(|entry| entry.proof.clone())
            .ok_or_else(|| eyre!("storage proof response carries no proof nodes"))?;

        let output_root_proof = OutputRootProof {
            version: B256::ZERO,
            stateRoot: state_root,
            messagePasserStorageRoot: proof.storage_hash,
            latestBlockhash: block_hash,
        };

        let portal = OptimismPortal::new(self.addresses.portal, self.l1_wallet.provider());
        let pending = portal
            .proveWithdrawalTransaction(
                withdrawal.to_transaction(),
                U256::from(game.index),
                output_root_proof,
                storage_proof,
            )
            .send()
            .await
            .wrap_err("failed to submit the withdrawal proof on L1")?;
        let tx_hash = *pending.tx_hash();
        info!(tx = %tx_hash, withdrawal = %withdrawal.withdrawal_hash, "Withdrawal proof submitted");
        Ok(tx_hash)
    }

    async fn wait_finalizable(&self, withdrawal_hash: B256) -> Result<()> {
        let portal = OptimismPortal::new(self.addresses.portal, self.l1.provider());

        if portal.finalizedWithdrawals(withdrawal_hash).call().await?._0 {
            bail!("withdrawal {} has already been finalized", withdrawal_hash);
        }

        let delay: u64 = portal
            .proofMaturityDelaySeconds()
            .call()
            .await?
            ._0
            .try_into()
            .unwrap_or(u64::MAX);
        info!(delay_seconds = delay, "Waiting out the challenge window");

        loop {
            let proven = portal
                .provenWithdrawals(withdrawal_hash, self.sender())
                .call()
                .await?;
            ensure!(
                proven.timestamp != 0,
                "withdrawal {} has not been proven by {}",
                withdrawal_hash,
                self.sender()
            );

            let now = self.l1.latest_timestamp().await?;
            let ready_at = proven.timestamp.saturating_add(delay);
            if now >= ready_at {
                match portal
                    .checkWithdrawal(withdrawal_hash, self.sender())
                    .call()
                    .await
                {
                    Ok(_) => return Ok(()),
                    Err(error) => debug!(%error, "Withdrawal not yet finalizable"),
                }
            } else {
                info!(
                    remaining_seconds = ready_at - now,
                    "Challenge window still open"
                );
            }
            tokio::time::sleep(self.tuning.finalizable_poll).await;
        }
    }

    async fn submit_finalize(&self, withdrawal: &Withdrawal) -> Result<B256> {
        let portal = OptimismPortal::new(self.addresses.portal, self.l1_wallet.provider());
        let pending = portal
            .finalizeWithdrawalTransaction(withdrawal.to_transaction())
            .send()
            .await
            .wrap_err("failed to finalize the withdrawal on L1")?;
        let tx_hash = *pending.tx_hash();
        info!(tx = %tx_hash, withdrawal = %withdrawal.withdrawal_hash, "Withdrawal finalized");
        Ok(tx_hash)
    }

    async fn deploy_contract(&self, creation_code: Bytes) -> Result<TxConfirmation> {
        let request = TransactionRequest {
            from: Some(self.sender()),
            to: Some(TxKind::Create),
            input: TransactionInput::new(creation_code),
            ..Default::default()
        };
        let confirmation = self.l2_wallet.send(request).await?;

        // Sanity read against the fresh deployment
        if let Some(address) = confirmation.contract_address {
            let token = ERC20::new(address, self.l2.provider());
            if let (Ok(name), Ok(symbol)) =
                (token.name().call().await, token.symbol().call().await)
            {
                info!(token = %address, name = %name._0, symbol = %symbol._0, "Token deployed");
            }
        }
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_portal() {
        let addresses = BridgeAddresses {
            portal: Address::ZERO,
            dispute_game_factory: Address::ZERO,
            message_passer: crate::MESSAGE_PASSER_PREDEPLOY,
        };
        let result = PortalBridge::new(
            "http://localhost:8545",
            "http://localhost:9545",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            addresses,
            BridgeTuning::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_default_tuning_is_sane() {
        let tuning = BridgeTuning::default();
        assert!(tuning.l2_receipt_timeout > tuning.l1_receipt_timeout);
        assert!(tuning.deposit_gas_limit >= MIN_TRANSFER_GAS);
    }
}
