//! Withdrawal extraction and hashing
//!
//! Initiating a withdrawal emits a `MessagePassed` log on the rollup. The
//! prove and finalize steps on the base chain replay the withdrawal fields
//! from that log, so both steps start by recovering the withdrawal from the
//! initiation receipt. The withdrawal hash doubles as the key of the
//! message passer's `sentMessages` mapping, whose storage slot is what the
//! proof transaction demonstrates inclusion of.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::{SolEvent, SolValue};
use eyre::{ensure, eyre, Result};

use crate::client::TxConfirmation;
use crate::contracts::{L2ToL1MessagePasser, WithdrawalTransaction};

/// A withdrawal passed through the rollup's message passer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    /// Message nonce (version in the high bits)
    pub nonce: U256,
    /// Rollup-side sender
    pub sender: Address,
    /// Base-chain target of the replayed call
    pub target: Address,
    /// ETH value passed along
    pub value: U256,
    /// Gas limit of the replayed call
    pub gas_limit: U256,
    /// Calldata of the replayed call
    pub data: Bytes,
    /// Hash as recorded in `sentMessages`
    pub withdrawal_hash: B256,
}

impl Withdrawal {
    /// Storage slot of this withdrawal in the message passer's
    /// `sentMessages` mapping: `keccak256(hash ++ bytes32(0))`.
    pub fn storage_slot(&self) -> B256 {
        let mut input = [0u8; 64];
        input[..32].copy_from_slice(self.withdrawal_hash.as_slice());
        keccak256(input)
    }

    /// The withdrawal as the portal's calldata struct.
    pub fn to_transaction(&self) -> WithdrawalTransaction {
        WithdrawalTransaction {
            nonce: self.nonce,
            sender: self.sender,
            target: self.target,
            value: self.value,
            gasLimit: self.gas_limit,
            data: self.data.clone(),
        }
    }
}

/// Hash a withdrawal the way the message passer does:
/// `keccak256(abi.encode(nonce, sender, target, value, gasLimit, data))`.
pub fn hash_withdrawal(
    nonce: U256,
    sender: Address,
    target: Address,
    value: U256,
    gas_limit: U256,
    data: &Bytes,
) -> B256 {
    let encoded = (nonce, sender, target, value, gas_limit, data.clone()).abi_encode_params();
    keccak256(encoded)
}

/// Recover the withdrawal from an initiation receipt.
///
/// Locates the `MessagePassed` log emitted by the message passer, decodes
/// it, and cross-checks the recomputed hash against the one the contract
/// recorded.
pub fn extract_withdrawal(
    confirmation: &TxConfirmation,
    message_passer: Address,
) -> Result<Withdrawal> {
    let log = confirmation
        .logs
        .iter()
        .find(|log| {
            log.inner.address == message_passer
                && log.inner.data.topics().first()
                    == Some(&L2ToL1MessagePasser::MessagePassed::SIGNATURE_HASH)
        })
        .ok_or_else(|| {
            eyre!(
                "transaction {} carries no MessagePassed log; is it a withdrawal initiation?",
                confirmation.tx_hash
            )
        })?;

    let decoded = L2ToL1MessagePasser::MessagePassed::decode_log(&log.inner, true)
        .map_err(|e| eyre!("failed to decode MessagePassed log: {}", e))?;
    let event = decoded.data;

    let withdrawal = Withdrawal {
        nonce: event.nonce,
        sender: event.sender,
        target: event.target,
        value: event.value,
        gas_limit: event.gasLimit,
        data: event.data.clone(),
        withdrawal_hash: event.withdrawalHash,
    };

    let recomputed = hash_withdrawal(
        withdrawal.nonce,
        withdrawal.sender,
        withdrawal.target,
        withdrawal.value,
        withdrawal.gas_limit,
        &withdrawal.data,
    );
    ensure!(
        recomputed == withdrawal.withdrawal_hash,
        "withdrawal hash mismatch: event says {}, recomputed {}",
        withdrawal.withdrawal_hash,
        recomputed
    );

    Ok(withdrawal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Log, LogData};
    use alloy::rpc::types::Log as RpcLog;

    const MESSAGE_PASSER: Address = address!("4200000000000000000000000000000000000016");
    const SENDER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    fn message_passed_log(
        nonce: U256,
        sender: Address,
        target: Address,
        value: U256,
        gas_limit: U256,
        data: Bytes,
        withdrawal_hash: B256,
    ) -> RpcLog {
        let body = (value, gas_limit, data, withdrawal_hash).abi_encode_params();
        RpcLog {
            inner: Log {
                address: MESSAGE_PASSER,
                data: LogData::new_unchecked(
                    vec![
                        L2ToL1MessagePasser::MessagePassed::SIGNATURE_HASH,
                        B256::from(nonce),
                        sender.into_word(),
                        target.into_word(),
                    ],
                    body.into(),
                ),
            },
            block_hash: Some(B256::ZERO),
            block_number: Some(100),
            block_timestamp: None,
            transaction_hash: Some(B256::ZERO),
            transaction_index: Some(0),
            log_index: Some(0),
            removed: false,
        }
    }

    fn confirmation_with(logs: Vec<RpcLog>) -> TxConfirmation {
        TxConfirmation {
            tx_hash: B256::ZERO,
            block_number: 100,
            block_hash: B256::ZERO,
            status: true,
            logs,
            contract_address: None,
        }
    }

    #[test]
    fn test_extract_withdrawal_roundtrip() {
        let nonce = U256::from(42u64);
        let value = U256::from(50_000_000_000_000u64);
        let gas_limit = U256::from(100_000u64);
        let data = Bytes::new();
        let hash = hash_withdrawal(nonce, SENDER, SENDER, value, gas_limit, &data);

        let confirmation = confirmation_with(vec![message_passed_log(
            nonce, SENDER, SENDER, value, gas_limit, data, hash,
        )]);

        let withdrawal = extract_withdrawal(&confirmation, MESSAGE_PASSER).expect("extracts");
        assert_eq!(withdrawal.nonce, nonce);
        assert_eq!(withdrawal.sender, SENDER);
        assert_eq!(withdrawal.target, SENDER);
        assert_eq!(withdrawal.value, value);
        assert_eq!(withdrawal.gas_limit, gas_limit);
        assert_eq!(withdrawal.withdrawal_hash, hash);
    }

    #[test]
    fn test_extract_fails_without_message_passed_log() {
        let confirmation = confirmation_with(vec![]);
        assert!(extract_withdrawal(&confirmation, MESSAGE_PASSER).is_err());
    }

    #[test]
    fn test_extract_rejects_hash_mismatch() {
        let nonce = U256::from(1u64);
        let value = U256::ONE;
        let gas_limit = U256::from(21_000u64);

        let confirmation = confirmation_with(vec![message_passed_log(
            nonce,
            SENDER,
            SENDER,
            value,
            gas_limit,
            Bytes::new(),
            B256::repeat_byte(0xAB),
        )]);

        assert!(extract_withdrawal(&confirmation, MESSAGE_PASSER).is_err());
    }

    #[test]
    fn test_hash_sensitive_to_every_field() {
        let base = hash_withdrawal(
            U256::ZERO,
            SENDER,
            SENDER,
            U256::ONE,
            U256::from(21_000u64),
            &Bytes::new(),
        );
        let other_nonce = hash_withdrawal(
            U256::ONE,
            SENDER,
            SENDER,
            U256::ONE,
            U256::from(21_000u64),
            &Bytes::new(),
        );
        let other_value = hash_withdrawal(
            U256::ZERO,
            SENDER,
            SENDER,
            U256::from(2u64),
            U256::from(21_000u64),
            &Bytes::new(),
        );
        let other_data = hash_withdrawal(
            U256::ZERO,
            SENDER,
            SENDER,
            U256::ONE,
            U256::from(21_000u64),
            &Bytes::from(vec![1]),
        );
        assert_ne!(base, other_nonce);
        assert_ne!(base, other_value);
        assert_ne!(base, other_data);
    }

    #[test]
    fn test_storage_slot_differs_from_hash() {
        let withdrawal = Withdrawal {
            nonce: U256::ZERO,
            sender: SENDER,
            target: SENDER,
            value: U256::ONE,
            gas_limit: U256::from(21_000u64),
            data: Bytes::new(),
            withdrawal_hash: B256::repeat_byte(0x11),
        };
        assert_ne!(withdrawal.storage_slot(), withdrawal.withdrawal_hash);
        assert_eq!(withdrawal.storage_slot(), withdrawal.storage_slot());
    }
}
