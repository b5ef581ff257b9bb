//! Interactive bridge flows
//!
//! Each flow sequences `BridgeOps` calls in the order the protocol
//! requires and narrates progress to the console. Deposits derive the
//! predicted rollup transaction hash only after the base-chain receipt is
//! confirmed; withdrawals prove only after the initiation receipt is
//! confirmed and finalize only after the challenge-window check passes.

use alloy::primitives::{utils::format_ether, B256, U256};
use eyre::{eyre, Result};
use opstack_rs::{deposit, withdrawal, BridgeOps, TxConfirmation, Withdrawal};

use crate::render;

/// Result of a completed deposit.
#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub l1_tx: B256,
    pub l1_block: u64,
    pub l2_tx: B256,
    pub l2_block: u64,
}

/// Deposit ETH from the base chain to the rollup.
pub async fn deposit_flow<B: BridgeOps>(bridge: &B, amount: U256) -> Result<DepositOutcome> {
    render::step("Preparing deposit");
    let request = bridge.build_deposit(amount).await?;
    render::ok(&format!(
        "Deposit arguments ready (rollup gas limit {})",
        request.gas_limit
    ));

    render::step("Sending deposit on L1");
    let l1_tx = bridge.submit_deposit(&request).await?;
    render::ok(&format!("L1 tx: {l1_tx}"));

    render::step("Waiting for L1 confirmation");
    let l1 = bridge.wait_l1_confirmation(l1_tx).await?;
    render::ok(&format!("L1 confirmed (block {})", l1.block_number));

    let hashes = deposit::predicted_l2_hashes(&l1, bridge.portal_address())?;
    let l2_tx = *hashes
        .first()
        .ok_or_else(|| eyre!("deposit receipt carries no TransactionDeposited log"))?;
    render::note(&format!("L2 tx (predicted): {l2_tx}"));

    render::step("Waiting for L2 confirmation (usually 1-3 minutes)");
    let l2 = bridge.wait_l2_confirmation(l2_tx).await?;
    render::ok(&format!("L2 confirmed (block {})", l2.block_number));

    render::success_box("Deposit completed");
    Ok(DepositOutcome {
        l1_tx,
        l1_block: l1.block_number,
        l2_tx,
        l2_block: l2.block_number,
    })
}

/// Initiate a withdrawal on the rollup. Returns the extracted withdrawal
/// and its initiation receipt; the caller needs both to prove later.
pub async fn withdraw_initiate_flow<B: BridgeOps>(
    bridge: &B,
    amount: U256,
) -> Result<(Withdrawal, TxConfirmation)> {
    render::step("Preparing withdrawal initiation");
    let request = bridge.build_withdrawal(amount).await?;
    render::ok("Withdrawal arguments ready");

    render::step("Sending initiation on L2");
    let l2_tx = bridge.submit_withdrawal(&request).await?;
    render::ok(&format!("L2 tx: {l2_tx}"));

    render::step("Waiting for L2 confirmation");
    let confirmation = bridge.wait_l2_confirmation(l2_tx).await?;
    render::ok(&format!(
        "L2 confirmed (block {}, withdrawal initiated)",
        confirmation.block_number
    ));

    let withdrawal = withdrawal::extract_withdrawal(&confirmation, bridge.message_passer_address())?;
    render::note(&format!(
        "Withdrawal hash: {}",
        withdrawal.withdrawal_hash
    ));

    Ok((withdrawal, confirmation))
}

/// Prove a previously initiated withdrawal, identified by its rollup
/// initiation transaction hash.
pub async fn withdraw_prove_flow<B: BridgeOps>(bridge: &B, initiation_tx: B256) -> Result<B256> {
    let (withdrawal, confirmation) = resolve_withdrawal(bridge, initiation_tx).await?;
    let proof_tx = prove_steps(bridge, &withdrawal, confirmation.block_number).await?;
    render::reminder("Proved. Finalize after the challenge period has passed");
    Ok(proof_tx)
}

/// Finalize a previously proven withdrawal, identified by its rollup
/// initiation transaction hash. Blocks until the challenge window passes.
pub async fn withdraw_finalize_flow<B: BridgeOps>(bridge: &B, initiation_tx: B256) -> Result<B256> {
    let (withdrawal, _) = resolve_withdrawal(bridge, initiation_tx).await?;
    let finalize_tx = finalize_steps(bridge, &withdrawal).await?;
    render::success_box("Withdrawal finalized");
    Ok(finalize_tx)
}

/// Run the whole withdrawal in one sitting: initiate, prove, finalize.
/// The finalize wait can span the protocol's multi-day challenge window.
pub async fn withdraw_full_flow<B: BridgeOps>(bridge: &B, amount: U256) -> Result<()> {
    let (withdrawal, confirmation) = withdraw_initiate_flow(bridge, amount).await?;
    prove_steps(bridge, &withdrawal, confirmation.block_number).await?;
    finalize_steps(bridge, &withdrawal).await?;
    render::success_box("Withdrawal finalized");
    Ok(())
}

/// Read both balances concurrently and print them.
pub async fn balances_flow<B: BridgeOps>(
    bridge: &B,
    l1_name: &str,
    l2_name: &str,
) -> Result<(U256, U256)> {
    let (l1, l2) = tokio::try_join!(bridge.l1_balance(), bridge.l2_balance())?;
    println!("{l1_name}: {} ETH", format_ether(l1));
    println!("{l2_name}: {} ETH", format_ether(l2));
    Ok((l1, l2))
}

/// Await the initiation receipt and recover the withdrawal from it.
async fn resolve_withdrawal<B: BridgeOps>(
    bridge: &B,
    initiation_tx: B256,
) -> Result<(Withdrawal, TxConfirmation)> {
    render::step("Fetching L2 initiation receipt");
    let confirmation = bridge.wait_l2_confirmation(initiation_tx).await?;
    render::ok(&format!(
        "Receipt found (block {})",
        confirmation.block_number
    ));

    let withdrawal = withdrawal::extract_withdrawal(&confirmation, bridge.message_passer_address())?;
    Ok((withdrawal, confirmation))
}

/// Wait until provable, submit the proof, await its confirmation.
async fn prove_steps<B: BridgeOps>(
    bridge: &B,
    withdrawal: &Withdrawal,
    l2_block: u64,
) -> Result<B256> {
    render::step("Waiting until the withdrawal is provable");
    let game = bridge.wait_provable(l2_block).await?;
    render::ok(&format!(
        "Provable against output proposal {} (L2 block {})",
        game.index, game.l2_block_number
    ));

    render::step("Proving withdrawal on L1");
    let proof_tx = bridge.submit_proof(withdrawal, &game).await?;
    render::ok(&format!("L1 prove tx: {proof_tx}"));

    render::step("Waiting for L1 confirmation");
    bridge.wait_l1_confirmation(proof_tx).await?;
    render::ok("L1 confirmed (proved)");
    Ok(proof_tx)
}

/// Wait out the challenge window, finalize, await its confirmation.
async fn finalize_steps<B: BridgeOps>(bridge: &B, withdrawal: &Withdrawal) -> Result<B256> {
    render::step("Waiting until the withdrawal is finalizable (challenge period)");
    bridge.wait_finalizable(withdrawal.withdrawal_hash).await?;
    render::ok("Challenge period passed");

    render::step("Finalizing withdrawal on L1");
    let finalize_tx = bridge.submit_finalize(withdrawal).await?;
    render::ok(&format!("L1 finalize tx: {finalize_tx}"));

    render::step("Waiting for L1 confirmation");
    bridge.wait_l1_confirmation(finalize_tx).await?;
    render::ok("L1 confirmed (finalized)");
    Ok(finalize_tx)
}
