//! Deposit transaction derivation
//!
//! A portal deposit emits a `TransactionDeposited` log on the base chain.
//! The rollup later executes a deposit transaction reconstructed from that
//! log, so the rollup-side transaction hash can be predicted as soon as the
//! base-chain receipt is available: decode the log back into the deposit
//! transaction and hash its EIP-2718 envelope (type `0x7E`).

use alloy::primitives::{keccak256, Address, Bytes, Log, TxKind, B256, U256};
use alloy::sol_types::SolEvent;
use alloy_rlp::{BufMut, Encodable, Header, EMPTY_STRING_CODE};
use eyre::{bail, ensure, eyre, Result};

use crate::client::TxConfirmation;
use crate::contracts::OptimismPortal;

/// EIP-2718 type byte of rollup deposit transactions.
pub const DEPOSIT_TX_TYPE: u8 = 0x7E;

/// Version of the `TransactionDeposited` opaque-data layout this decoder
/// understands.
const DEPOSIT_EVENT_VERSION_0: B256 = B256::ZERO;

/// Domain identifier mixed into the source hash of user deposits.
const USER_DEPOSIT_SOURCE_DOMAIN: u64 = 0;

/// A rollup deposit transaction, reconstructed from a base-chain
/// `TransactionDeposited` log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DepositTransaction {
    /// Hash that uniquely identifies the source of the deposit
    pub source_hash: B256,
    /// The address of the sender account
    pub from: Address,
    /// The recipient, or a contract creation
    pub to: TxKind,
    /// The ETH value to mint on the rollup
    pub mint: Option<u128>,
    /// The ETH value to send to the recipient
    pub value: U256,
    /// The gas limit for the rollup transaction
    pub gas_limit: u64,
    /// Whether this transaction is exempt from the rollup gas limit
    pub is_system_transaction: bool,
    /// Call input (or init code for creations)
    pub input: Bytes,
}

impl DepositTransaction {
    fn fields_len(&self) -> usize {
        self.source_hash.length()
            + self.from.length()
            + self.to.length()
            + self.mint.map_or(1, |mint| mint.length())
            + self.value.length()
            + self.gas_limit.length()
            + self.is_system_transaction.length()
            + self.input.0.length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.source_hash.encode(out);
        self.from.encode(out);
        self.to.encode(out);
        if let Some(mint) = self.mint {
            mint.encode(out);
        } else {
            out.put_u8(EMPTY_STRING_CODE);
        }
        self.value.encode(out);
        self.gas_limit.encode(out);
        self.is_system_transaction.encode(out);
        self.input.encode(out);
    }

    /// The rollup-side transaction hash: keccak256 of the EIP-2718
    /// envelope (the type byte followed by the RLP-encoded fields).
    pub fn tx_hash(&self) -> B256 {
        let payload_length = self.fields_len();
        let mut buf = Vec::with_capacity(payload_length + 4);
        buf.put_u8(DEPOSIT_TX_TYPE);
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut buf);
        self.encode_fields(&mut buf);
        keccak256(&buf)
    }
}

/// Source hash of a user deposit: a two-stage keccak over the base-chain
/// block hash and the log index, domain-separated from system deposits.
pub fn user_deposit_source_hash(l1_block_hash: B256, log_index: u64) -> B256 {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(l1_block_hash.as_slice());
    input[64 - 8..].copy_from_slice(&log_index.to_be_bytes());
    let deposit_id_hash = keccak256(input);

    let mut domain_input = [0u8; 64];
    domain_input[32 - 8..32].copy_from_slice(&USER_DEPOSIT_SOURCE_DOMAIN.to_be_bytes());
    domain_input[32..].copy_from_slice(deposit_id_hash.as_slice());
    keccak256(domain_input)
}

/// Decode a `TransactionDeposited` log into the rollup deposit transaction
/// it will execute as.
///
/// The event's data field is the ABI encoding of a single `bytes` value
/// whose content is the tightly packed `(mint, value, gasLimit, isCreation,
/// data)` tuple.
pub fn decode_transaction_deposited(
    block_hash: B256,
    log_index: u64,
    log: &Log,
) -> Result<DepositTransaction> {
    let topics = log.data.topics();
    ensure!(
        topics.len() == 4,
        "unexpected number of deposit log topics: {}",
        topics.len()
    );
    ensure!(
        topics[0] == OptimismPortal::TransactionDeposited::SIGNATURE_HASH,
        "not a TransactionDeposited log: selector {}",
        topics[0]
    );

    let data = log.data.data.as_ref();
    ensure!(data.len() >= 64, "incomplete deposit log data: {} bytes", data.len());
    ensure!(
        data.len() % 32 == 0,
        "deposit log data not 32-byte aligned: {} bytes",
        data.len()
    );

    let from = Address::from_slice(&topics[1][12..]);
    let to_address = Address::from_slice(&topics[2][12..]);
    let version = topics[3];
    ensure!(
        version == DEPOSIT_EVENT_VERSION_0,
        "unsupported deposit event version: {}",
        version
    );

    // Offset of the opaque bytes content; always 32 for a single value
    let offset = u64::from_be_bytes(
        data[24..32]
            .try_into()
            .map_err(|_| eyre!("invalid opaque data offset"))?,
    );
    ensure!(offset == 32, "invalid opaque data offset: {}", offset);

    let opaque_len = u64::from_be_bytes(
        data[56..64]
            .try_into()
            .map_err(|_| eyre!("invalid opaque data length"))?,
    ) as usize;
    let content_len = data.len() - 64;
    ensure!(
        opaque_len <= content_len,
        "opaque data length {} exceeds log data length {}",
        opaque_len,
        content_len
    );
    ensure!(
        content_len < opaque_len + 32,
        "opaque data padding exceeds 31 bytes: {} > {}",
        content_len,
        opaque_len
    );
    let opaque = &data[64..64 + opaque_len];

    let mut tx = DepositTransaction {
        source_hash: user_deposit_source_hash(block_hash, log_index),
        from,
        is_system_transaction: false,
        ..Default::default()
    };
    unmarshal_opaque_v0(&mut tx, to_address, opaque)?;
    Ok(tx)
}

/// Unpack the version-0 opaque data layout:
/// `uint256 mint ++ uint256 value ++ uint64 gasLimit ++ uint8 isCreation ++ bytes data`.
fn unmarshal_opaque_v0(tx: &mut DepositTransaction, to: Address, data: &[u8]) -> Result<()> {
    ensure!(
        data.len() >= 32 + 32 + 8 + 1,
        "opaque deposit data too short: {} bytes",
        data.len()
    );

    // Mint is declared uint256 but must fit a u128; the high bytes are zero
    // for any representable ETH supply
    if data[..16].iter().any(|b| *b != 0) {
        bail!("deposit mint value exceeds u128");
    }
    let mint = u128::from_be_bytes(
        data[16..32]
            .try_into()
            .map_err(|_| eyre!("invalid deposit mint value"))?,
    );
    // Zero mint is represented as absent to skip minting
    tx.mint = if mint == 0 { None } else { Some(mint) };

    tx.value = U256::from_be_slice(&data[32..64]);

    tx.gas_limit = u64::from_be_bytes(
        data[64..72]
            .try_into()
            .map_err(|_| eyre!("invalid deposit gas value"))?,
    );

    tx.to = if data[72] == 0 {
        TxKind::Call(to)
    } else {
        TxKind::Create
    };

    tx.input = Bytes::copy_from_slice(&data[73..]);
    Ok(())
}

/// Derive the predicted rollup-side transaction hashes from a base-chain
/// deposit receipt: one per `TransactionDeposited` log the portal emitted.
pub fn predicted_l2_hashes(confirmation: &TxConfirmation, portal: Address) -> Result<Vec<B256>> {
    let mut hashes = Vec::new();
    for log in &confirmation.logs {
        if log.inner.address != portal {
            continue;
        }
        if log.inner.data.topics().first()
            != Some(&OptimismPortal::TransactionDeposited::SIGNATURE_HASH)
        {
            continue;
        }
        let index = log
            .log_index
            .ok_or_else(|| eyre!("deposit log is missing its log index"))?;
        let tx = decode_transaction_deposited(confirmation.block_hash, index, &log.inner)?;
        hashes.push(tx.tx_hash());
    }
    Ok(hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256, LogData};

    const FROM: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const TO: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const BLOCK_HASH: B256 =
        b256!("1111111111111111111111111111111111111111111111111111111111111111");

    fn opaque_data(mint: u128, value: u128, gas: u64, is_creation: bool, calldata: &[u8]) -> Bytes {
        let mut packed = Vec::new();
        packed.extend_from_slice(&U256::from(mint).to_be_bytes::<32>());
        packed.extend_from_slice(&U256::from(value).to_be_bytes::<32>());
        packed.extend_from_slice(&gas.to_be_bytes());
        packed.push(u8::from(is_creation));
        packed.extend_from_slice(calldata);

        let mut data = Vec::new();
        data.extend_from_slice(&U256::from(32).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(packed.len()).to_be_bytes::<32>());
        let padded = packed.len().div_ceil(32) * 32;
        packed.resize(padded, 0);
        data.extend_from_slice(&packed);
        data.into()
    }

    fn deposit_log(data: Bytes) -> Log {
        Log {
            address: address!("9999999999999999999999999999999999999999"),
            data: LogData::new_unchecked(
                vec![
                    OptimismPortal::TransactionDeposited::SIGNATURE_HASH,
                    FROM.into_word(),
                    TO.into_word(),
                    B256::ZERO,
                ],
                data,
            ),
        }
    }

    #[test]
    fn test_event_signature_matches_portal_contract() {
        // keccak256("TransactionDeposited(address,address,uint256,bytes)")
        assert_eq!(
            OptimismPortal::TransactionDeposited::SIGNATURE_HASH,
            b256!("b3813568d9991fc951961fcb4c784893574240a28925604d09fc577c55bb7c32")
        );
    }

    #[test]
    fn test_source_hash_depends_on_log_index() {
        let first = user_deposit_source_hash(BLOCK_HASH, 0);
        let second = user_deposit_source_hash(BLOCK_HASH, 1);
        assert_ne!(first, second);
        assert_eq!(first, user_deposit_source_hash(BLOCK_HASH, 0));
    }

    #[test]
    fn test_decode_rejects_wrong_topic_count() {
        let log = Log {
            address: Address::ZERO,
            data: LogData::new_unchecked(
                vec![OptimismPortal::TransactionDeposited::SIGNATURE_HASH],
                opaque_data(1, 1, 21_000, false, &[]),
            ),
        };
        assert!(decode_transaction_deposited(BLOCK_HASH, 0, &log).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_selector() {
        let log = Log {
            address: Address::ZERO,
            data: LogData::new_unchecked(
                vec![B256::ZERO, FROM.into_word(), TO.into_word(), B256::ZERO],
                opaque_data(1, 1, 21_000, false, &[]),
            ),
        };
        assert!(decode_transaction_deposited(BLOCK_HASH, 0, &log).is_err());
    }

    #[test]
    fn test_decode_rejects_short_data() {
        let log = deposit_log(Bytes::from(vec![0u8; 32]));
        assert!(decode_transaction_deposited(BLOCK_HASH, 0, &log).is_err());
    }

    #[test]
    fn test_decode_rejects_unaligned_data() {
        let mut data = opaque_data(1, 1, 21_000, false, &[]).to_vec();
        data.push(0);
        let log = deposit_log(data.into());
        assert!(decode_transaction_deposited(BLOCK_HASH, 0, &log).is_err());
    }

    #[test]
    fn test_decode_deposit_fields() {
        let one_eth = 1_000_000_000_000_000_000u128;
        let log = deposit_log(opaque_data(one_eth, one_eth, 100_000, false, &[]));

        let tx = decode_transaction_deposited(BLOCK_HASH, 7, &log).expect("valid log");
        assert_eq!(tx.from, FROM);
        assert_eq!(tx.to, TxKind::Call(TO));
        assert_eq!(tx.mint, Some(one_eth));
        assert_eq!(tx.value, U256::from(one_eth));
        assert_eq!(tx.gas_limit, 100_000);
        assert!(tx.input.is_empty());
        assert!(!tx.is_system_transaction);
        assert_eq!(tx.source_hash, user_deposit_source_hash(BLOCK_HASH, 7));
    }

    #[test]
    fn test_decode_zero_mint_is_absent() {
        let log = deposit_log(opaque_data(0, 0, 21_000, false, &[]));
        let tx = decode_transaction_deposited(BLOCK_HASH, 0, &log).expect("valid log");
        assert_eq!(tx.mint, None);
    }

    #[test]
    fn test_decode_creation_flag() {
        let log = deposit_log(opaque_data(0, 0, 500_000, true, &[0x60, 0x80]));
        let tx = decode_transaction_deposited(BLOCK_HASH, 0, &log).expect("valid log");
        assert_eq!(tx.to, TxKind::Create);
        assert_eq!(tx.input.to_vec(), vec![0x60, 0x80]);
    }

    #[test]
    fn test_tx_hash_changes_with_source() {
        let log = deposit_log(opaque_data(1, 1, 21_000, false, &[]));
        let first = decode_transaction_deposited(BLOCK_HASH, 0, &log).unwrap();
        let second = decode_transaction_deposited(BLOCK_HASH, 1, &log).unwrap();
        assert_ne!(first.tx_hash(), second.tx_hash());
        assert_eq!(
            first.tx_hash(),
            decode_transaction_deposited(BLOCK_HASH, 0, &log).unwrap().tx_hash()
        );
    }

    #[test]
    fn test_predicted_hashes_filter_by_portal_address() {
        use alloy::rpc::types::Log as RpcLog;

        let portal = address!("4200000000000000000000000000000000000042");
        let inner = deposit_log(opaque_data(1, 1, 21_000, false, &[]));

        let portal_log = RpcLog {
            inner: Log {
                address: portal,
                data: inner.data.clone(),
            },
            block_hash: Some(BLOCK_HASH),
            block_number: Some(10),
            block_timestamp: None,
            transaction_hash: Some(B256::ZERO),
            transaction_index: Some(0),
            log_index: Some(3),
            removed: false,
        };
        let other_log = RpcLog {
            inner: inner.clone(),
            block_hash: Some(BLOCK_HASH),
            block_number: Some(10),
            block_timestamp: None,
            transaction_hash: Some(B256::ZERO),
            transaction_index: Some(0),
            log_index: Some(4),
            removed: false,
        };

        let confirmation = TxConfirmation {
            tx_hash: B256::ZERO,
            block_number: 10,
            block_hash: BLOCK_HASH,
            status: true,
            logs: vec![portal_log, other_log],
            contract_address: None,
        };

        let hashes = predicted_l2_hashes(&confirmation, portal).expect("decodes");
        assert_eq!(hashes.len(), 1);
    }
}
