//! Chain client wrappers
//!
//! Provides a read-only client and a transaction-signing client over HTTP
//! JSON-RPC. The bridge uses one of each per chain: the read-only clients
//! answer balance/receipt/proof queries, the signing clients submit
//! transactions.

use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, EthereumWallet},
    primitives::{Address, B256, U256},
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            WalletFiller,
        },
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::{BlockTransactionsKind, Log, TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use eyre::{eyre, Result, WrapErr};
use std::time::Duration;
use tracing::{debug, info};

/// Provider stack used by the signing client: recommended fillers
/// (gas, blob gas, nonce, chain id) plus the local wallet.
pub type WalletProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Http<Client>>,
    Http<Client>,
    Ethereum,
>;

/// A confirmed transaction, reduced to the fields the flows consume.
#[derive(Debug, Clone)]
pub struct TxConfirmation {
    /// Transaction hash
    pub tx_hash: B256,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Hash of that block
    pub block_hash: B256,
    /// Whether the transaction succeeded
    pub status: bool,
    /// Logs emitted by the transaction
    pub logs: Vec<Log>,
    /// Created contract address, for deployment transactions
    pub contract_address: Option<Address>,
}

impl TxConfirmation {
    /// Reduce a full receipt to a confirmation.
    pub fn from_receipt(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or_default(),
            block_hash: receipt.block_hash.unwrap_or_default(),
            status: receipt.status(),
            logs: receipt.inner.logs().to_vec(),
            contract_address: receipt.contract_address,
        }
    }
}

/// Read-only chain client
pub struct ChainClient {
    /// The alloy provider
    provider: RootProvider<Http<Client>>,
    /// Chain label used in logs ("L1", "L2")
    name: String,
}

impl ChainClient {
    /// Create a new read-only client
    pub fn new(name: &str, rpc_url: &str) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL for {}: {}", name, e))?,
        );

        info!(chain = %name, rpc_url = %rpc_url, "Created read-only chain client");

        Ok(Self {
            provider,
            name: name.to_string(),
        })
    }

    /// Chain label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying provider (for contract bindings and proof queries)
    pub fn provider(&self) -> &RootProvider<Http<Client>> {
        &self.provider
    }

    /// Get the ETH balance of an address
    pub async fn get_balance(&self, address: Address) -> Result<U256> {
        let balance = self.provider.get_balance(address).await?;
        Ok(balance)
    }

    /// Get the current block number
    pub async fn get_block_number(&self) -> Result<u64> {
        let block = self.provider.get_block_number().await?;
        Ok(block)
    }

    /// Get the timestamp of the latest block
    pub async fn latest_timestamp(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest, BlockTransactionsKind::Hashes)
            .await?
            .ok_or_else(|| eyre!("{} has no latest block", self.name))?;
        Ok(block.header.timestamp)
    }

    /// Get a block's state root and hash by number
    pub async fn block_commitment(&self, number: u64) -> Result<(B256, B256)> {
        let block = self
            .provider
            .get_block_by_number(
                BlockNumberOrTag::Number(number),
                BlockTransactionsKind::Hashes,
            )
            .await?
            .ok_or_else(|| eyre!("{} block {} not found", self.name, number))?;
        Ok((block.header.state_root, block.header.hash))
    }

    /// Estimate gas for a transaction request
    pub async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64> {
        let gas = self
            .provider
            .estimate_gas(tx)
            .await
            .wrap_err_with(|| format!("Failed to estimate gas on {}", self.name))?;
        Ok(gas)
    }

    /// Wait for a transaction to be confirmed, polling until the receipt
    /// shows up or the timeout elapses. Reverted transactions are errors.
    pub async fn wait_for_confirmation(
        &self,
        tx_hash: B256,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<TxConfirmation> {
        let start = std::time::Instant::now();

        while start.elapsed() < timeout {
            if let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? {
                let confirmation = TxConfirmation::from_receipt(&receipt);
                if !confirmation.status {
                    return Err(eyre!(
                        "Transaction {} reverted on {} (block {})",
                        tx_hash,
                        self.name,
                        confirmation.block_number
                    ));
                }
                debug!(
                    chain = %self.name,
                    tx = %tx_hash,
                    block = confirmation.block_number,
                    "Transaction confirmed"
                );
                return Ok(confirmation);
            }
            tokio::time::sleep(poll_interval).await;
        }

        Err(eyre!(
            "Transaction {} not confirmed on {} after {:?}",
            tx_hash,
            self.name,
            timeout
        ))
    }
}

/// Chain client with signing capabilities
pub struct ChainSigner {
    /// Provider with wallet attached
    provider: WalletProvider,
    /// Chain label used in logs
    name: String,
    /// Signer's address
    address: Address,
}

impl ChainSigner {
    /// Create a new signing client from a private key
    pub fn new(name: &str, rpc_url: &str, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(
                rpc_url
                    .parse()
                    .map_err(|e| eyre!("Invalid RPC URL for {}: {}", name, e))?,
            );

        info!(chain = %name, address = %address, "Created signing chain client");

        Ok(Self {
            provider,
            name: name.to_string(),
            address,
        })
    }

    /// The signer's address
    pub fn address(&self) -> Address {
        self.address
    }

    /// The wallet-filled provider (for contract bindings)
    pub fn provider(&self) -> &WalletProvider {
        &self.provider
    }

    /// Send a transaction and wait for its receipt. Reverted transactions
    /// are errors.
    pub async fn send(&self, tx: TransactionRequest) -> Result<TxConfirmation> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .wrap_err_with(|| format!("Failed to send transaction on {}", self.name))?;

        let tx_hash = *pending.tx_hash();
        debug!(chain = %self.name, tx = %tx_hash, "Transaction sent");

        let receipt = pending
            .get_receipt()
            .await
            .wrap_err_with(|| format!("Failed to get receipt on {}", self.name))?;

        let confirmation = TxConfirmation::from_receipt(&receipt);
        if !confirmation.status {
            return Err(eyre!(
                "Transaction {} reverted on {} (block {})",
                tx_hash,
                self.name,
                confirmation.block_number
            ));
        }
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_rpc_url_rejected() {
        assert!(ChainClient::new("L1", "not a url").is_err());
    }

    #[test]
    fn test_invalid_private_key_rejected() {
        let result = ChainSigner::new("L1", "http://localhost:8545", "0xnotakey");
        assert!(result.is_err());
    }

    #[test]
    fn test_signer_address_derived_from_key() {
        // Well-known anvil test key 0
        let signer = ChainSigner::new(
            "L1",
            "http://localhost:8545",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .expect("valid key");

        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }
}
