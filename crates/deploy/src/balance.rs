//! Read-only proxy balance lookup.

use alloy_core::primitives::{Address, U256};

use crate::{DeployError, chain::ChainClient, units::format_native};

pub async fn check_proxy_balance<C: ChainClient>(
    client: &C,
    proxy: Option<Address>,
) -> Result<U256, DeployError> {
    let proxy = proxy.ok_or_else(|| {
        DeployError::Configuration(
            "LETSPAY_PROXY_ADDRESS must be set to the proxy you want to inspect".to_string(),
        )
    })?;

    let balance = client.get_balance(proxy).await.map_err(DeployError::Chain)?;
    tracing::info!(proxy = %proxy, balance = %format_native(balance), "Proxy balance");
    Ok(balance)
}
