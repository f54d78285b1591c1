//! Sends native funds to the proxy through its payable `fundContract()`.

use alloy_core::{
    primitives::{Address, U256},
    sol_types::SolCall,
};
use anyhow::Context;

use crate::{
    DeployError,
    chain::{CallRequest, ChainClient, TransactionReceipt},
    contracts::ILetsPay,
    gate::{InteractiveGate, Prompter},
    units::{format_native, parse_native},
};

/// Amount offered when neither the operator nor the environment provides one.
pub const DEFAULT_FUND_AMOUNT: &str = "10";

#[derive(Debug, Clone)]
pub struct FundReport {
    pub proxy: Address,
    pub amount: U256,
    pub receipt: TransactionReceipt,
    pub sender_before: U256,
    pub sender_after: U256,
    pub proxy_balance: U256,
}

#[derive(Debug, Clone)]
pub enum FundOutcome {
    Funded(Box<FundReport>),
    Cancelled,
}

/// Prompt for an amount and fund `proxy` with it.
///
/// The amount is validated before any chain call is made.
pub async fn fund_proxy<C, P>(
    client: &C,
    proxy: Option<Address>,
    default_amount: &str,
    gate: &mut InteractiveGate<P>,
) -> Result<FundOutcome, DeployError>
where
    C: ChainClient,
    P: Prompter,
{
    let proxy = proxy.ok_or_else(|| {
        DeployError::Configuration(
            "LETSPAY_PROXY_ADDRESS must be set to the proxy to fund".to_string(),
        )
    })?;

    let amount = gate.prompt_amount("Amount of HBAR to send to the proxy?", default_amount)?;
    let amount = parse_native(&amount).map_err(DeployError::Validation)?;

    let sender = client
        .sender()
        .ok_or_else(|| DeployError::Configuration("funding requires a signing key".to_string()))?;

    let sender_before = client
        .get_balance(sender)
        .await
        .map_err(DeployError::Chain)?;
    tracing::info!(
        proxy = %proxy,
        from = %sender,
        amount = %format_native(amount),
        balance = %format_native(sender_before),
        "Funding proxy contract"
    );

    if !gate.confirm(&format!("Send {} to {proxy}?", format_native(amount)))? {
        tracing::info!("Funding cancelled by operator");
        return Ok(FundOutcome::Cancelled);
    }

    let request = CallRequest::call(sender, proxy, ILetsPay::fundContractCall {}.abi_encode())
        .with_value(amount);
    let hash = client
        .send_transaction(request)
        .await
        .context("Failed to submit fundContract()")
        .map_err(DeployError::Chain)?;
    tracing::info!(tx = %hash, "Transaction submitted, waiting for confirmation");

    let receipt = client
        .wait_for_receipt(hash)
        .await
        .map_err(DeployError::Chain)?;
    if !receipt.status {
        return Err(DeployError::chain_msg(format!("fundContract() transaction {hash} reverted")));
    }

    let sender_after = client
        .get_balance(sender)
        .await
        .map_err(DeployError::Chain)?;
    let proxy_balance = client
        .get_balance(proxy)
        .await
        .map_err(DeployError::Chain)?;

    tracing::info!(
        block = ?receipt.block_number,
        gas_used = receipt.gas_used,
        sender_balance = %format_native(sender_after),
        proxy_balance = %format_native(proxy_balance),
        "Proxy funded"
    );

    Ok(FundOutcome::Funded(Box::new(FundReport {
        proxy,
        amount,
        receipt,
        sender_before,
        sender_after,
        proxy_balance,
    })))
}
