//! OP Stack contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the bridge
//! contracts on both chains: the portal and dispute game factory on the
//! base chain, and the message passer predeploy on the rollup.

use alloy::sol;

sol! {
    /// A withdrawal transaction as stored by the message passer and
    /// replayed through the portal (matches `Types.WithdrawalTransaction`).
    struct WithdrawalTransaction {
        uint256 nonce;
        address sender;
        address target;
        uint256 value;
        uint256 gasLimit;
        bytes data;
    }

    /// Proof of a rollup output root (matches `Types.OutputRootProof`).
    struct OutputRootProof {
        bytes32 version;
        bytes32 stateRoot;
        bytes32 messagePasserStorageRoot;
        bytes32 latestBlockhash;
    }

    // ========================================================================
    // OptimismPortal (base chain)
    // ========================================================================

    /// The portal contract: entry point for deposits and exit point for
    /// proven withdrawals.
    #[sol(rpc)]
    contract OptimismPortal {
        /// Deposit a transaction onto the rollup; `msg.value` is minted there
        function depositTransaction(address _to, uint256 _value, uint64 _gasLimit, bool _isCreation, bytes _data) external payable;

        /// Minimum rollup gas limit for a deposit with the given calldata size
        function minimumGasLimit(uint64 _byteCount) external pure returns (uint64);

        /// Prove a withdrawal against a dispute game's output root
        function proveWithdrawalTransaction(
            WithdrawalTransaction _tx,
            uint256 _disputeGameIndex,
            OutputRootProof _outputRootProof,
            bytes[] _withdrawalProof
        ) external;

        /// Finalize a proven withdrawal after the proof maturity delay
        function finalizeWithdrawalTransaction(WithdrawalTransaction _tx) external;

        /// Reverts unless the withdrawal is ready to finalize
        function checkWithdrawal(bytes32 _withdrawalHash, address _proofSubmitter) external view;

        /// Seconds a proof must mature before finalization (challenge window)
        function proofMaturityDelaySeconds() external view returns (uint256);

        /// Game type withdrawals must be proven against
        function respectedGameType() external view returns (uint32);

        /// The dispute game factory consulted for output proposals
        function disputeGameFactory() external view returns (address);

        /// Proof record for a withdrawal hash and proof submitter
        function provenWithdrawals(bytes32 _withdrawalHash, address _proofSubmitter) external view returns (
            address disputeGameProxy,
            uint64 timestamp
        );

        /// Whether a withdrawal hash has already been finalized
        function finalizedWithdrawals(bytes32 _withdrawalHash) external view returns (bool);

        /// Emitted once per deposit; the opaque data carries the packed
        /// rollup transaction fields
        event TransactionDeposited(
            address indexed from,
            address indexed to,
            uint256 indexed version,
            bytes opaqueData
        );

        /// Withdrawal proven on the base chain
        event WithdrawalProven(bytes32 indexed withdrawalHash, address indexed from, address indexed to);

        /// Withdrawal finalized on the base chain
        event WithdrawalFinalized(bytes32 indexed withdrawalHash, bool success);
    }

    // ========================================================================
    // DisputeGameFactory (base chain)
    // ========================================================================

    /// Registry of output-proposal dispute games.
    #[sol(rpc)]
    contract DisputeGameFactory {
        /// Total number of games created
        function gameCount() external view returns (uint256);

        /// Game metadata at a creation index
        function gameAtIndex(uint256 _index) external view returns (
            uint32 gameType,
            uint64 timestamp,
            address proxy
        );
    }

    /// A single output-proposal dispute game.
    #[sol(rpc)]
    contract FaultDisputeGame {
        /// The rollup block number this game's root claim commits to
        function l2BlockNumber() external view returns (uint256);

        /// Game status: 0 in progress, 1 challenger wins, 2 defender wins
        function status() external view returns (uint8);

        /// The claimed output root
        function rootClaim() external view returns (bytes32);
    }

    // ========================================================================
    // L2ToL1MessagePasser (rollup predeploy)
    // ========================================================================

    /// The rollup-side exit contract; withdrawals burn value here.
    #[sol(rpc)]
    contract L2ToL1MessagePasser {
        /// Initiate a withdrawal to a base-chain target
        function initiateWithdrawal(address _target, uint256 _gasLimit, bytes _data) external payable;

        /// Next message nonce (encodes the message version in the high bits)
        function messageNonce() external view returns (uint256);

        /// Emitted once per initiated withdrawal
        event MessagePassed(
            uint256 indexed nonce,
            address indexed sender,
            address indexed target,
            uint256 value,
            uint256 gasLimit,
            bytes data,
            bytes32 withdrawalHash
        );
    }

    // ========================================================================
    // ERC20 (deployed token sanity reads)
    // ========================================================================

    /// Standard ERC20 interface
    #[sol(rpc)]
    contract ERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);

        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}

/// Dispute game status value meaning the challenger won; games in this
/// state must not be proven against.
pub const GAME_STATUS_CHALLENGER_WINS: u8 = 1;
