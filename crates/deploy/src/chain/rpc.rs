//! JSON-RPC implementation of [`ChainClient`].

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U64, U128, U256};
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use super::{CallRequest, ChainClient, LegacyTransaction, TransactionReceipt};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Extra gas on top of `eth_estimateGas` for submitted transactions, in percent.
const GAS_LIMIT_MARGIN_PERCENT: u64 = 20;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

/// JSON-RPC 2.0 response. A `null` result is kept as-is so that lookups like
/// `eth_getTransactionReceipt` can decode it into `None`.
#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    message: String,
}

impl RpcResponse {
    fn into_result<T: DeserializeOwned>(self, method: &str) -> anyhow::Result<T> {
        if let Some(error) = self.error {
            anyhow::bail!("{method} rejected by the relay ({}): {}", error.code, error.message);
        }
        serde_json::from_value(self.result).with_context(|| format!("malformed {method} result"))
    }
}

/// Marker error: the transaction is not mined yet.
#[derive(Debug, thiserror::Error)]
#[error("transaction receipt not available yet")]
struct ReceiptPending;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: B256,
    block_number: Option<U64>,
    gas_used: U64,
    status: Option<U64>,
    contract_address: Option<Address>,
}

impl From<RawReceipt> for TransactionReceipt {
    fn from(raw: RawReceipt) -> Self {
        Self {
            transaction_hash: raw.transaction_hash,
            block_number: raw.block_number.map(|n| n.to::<u64>()),
            gas_used: raw.gas_used.to::<u64>(),
            // Pre-byzantium receipts carry no status; treat them as successful.
            status: raw.status.is_none_or(|s| s == U64::from(1)),
            contract_address: raw.contract_address,
        }
    }
}

/// Chain client over HTTP JSON-RPC, signing locally with an optional private key.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    http: reqwest::Client,
    url: Url,
    signer: Option<PrivateKeySigner>,
    chain_id: u64,
}

impl RpcChainClient {
    /// Read-only client.
    pub fn new(url: Url, chain_id: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            url,
            signer: None,
            chain_id,
        })
    }

    /// Attach the key transactions are signed with.
    pub fn with_signer(mut self, signer: PrivateKeySigner) -> Self {
        self.signer = Some(signer);
        self
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> anyhow::Result<T> {
        tracing::trace!(method, url = %self.url, "JSON-RPC request");
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params: &params,
        };

        let response: RpcResponse = self
            .http
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{method} request to {} failed", self.url))?
            .json()
            .await
            .with_context(|| format!("{method} response is not JSON-RPC"))?;
        response.into_result(method)
    }

    async fn nonce(&self, address: Address, block: &str) -> anyhow::Result<u64> {
        let count: U64 = self
            .request(
                "eth_getTransactionCount",
                vec![serde_json::to_value(address)?, block.into()],
            )
            .await?;
        Ok(count.to::<u64>())
    }

    async fn fetch_receipt(&self, hash: B256) -> anyhow::Result<TransactionReceipt> {
        let receipt: Option<RawReceipt> = self
            .request("eth_getTransactionReceipt", vec![serde_json::to_value(hash)?])
            .await?;

        receipt
            .map(TransactionReceipt::from)
            .ok_or_else(|| ReceiptPending.into())
    }
}

impl ChainClient for RpcChainClient {
    fn sender(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    async fn chain_id(&self) -> anyhow::Result<u64> {
        let id: U64 = self.request("eth_chainId", vec![]).await?;
        Ok(id.to::<u64>())
    }

    async fn get_balance(&self, address: Address) -> anyhow::Result<U256> {
        self.request(
            "eth_getBalance",
            vec![serde_json::to_value(address)?, "latest".into()],
        )
        .await
    }

    async fn get_transaction_count(&self, address: Address) -> anyhow::Result<u64> {
        self.nonce(address, "latest").await
    }

    async fn estimate_gas(&self, request: &CallRequest) -> anyhow::Result<u64> {
        let gas: U64 = self
            .request("eth_estimateGas", vec![serde_json::to_value(request)?])
            .await?;
        Ok(gas.to::<u64>())
    }

    async fn gas_price(&self) -> anyhow::Result<u128> {
        let price: U128 = self.request("eth_gasPrice", vec![]).await?;
        Ok(price.to::<u128>())
    }

    async fn get_storage_at(&self, address: Address, slot: B256) -> anyhow::Result<B256> {
        self.request(
            "eth_getStorageAt",
            vec![
                serde_json::to_value(address)?,
                serde_json::to_value(slot)?,
                "latest".into(),
            ],
        )
        .await
    }

    async fn call(&self, request: &CallRequest) -> anyhow::Result<Bytes> {
        self.request("eth_call", vec![serde_json::to_value(request)?, "latest".into()])
            .await
    }

    async fn send_transaction(&self, request: CallRequest) -> anyhow::Result<B256> {
        let signer = self
            .signer
            .as_ref()
            .context("No signing key configured for this client")?;
        anyhow::ensure!(
            signer.address() == request.from,
            "Transaction sender {} does not match the signing key {}",
            request.from,
            signer.address()
        );

        let nonce = self.nonce(request.from, "pending").await?;
        let gas_price = self.gas_price().await?;
        let estimated = self.estimate_gas(&request).await?;
        let gas_limit = estimated + estimated * GAS_LIMIT_MARGIN_PERCENT / 100;

        let tx = LegacyTransaction {
            chain_id: self.chain_id,
            nonce,
            gas_price,
            gas_limit,
            to: request.to,
            value: request.value.unwrap_or_default(),
            input: request.data,
        };
        let raw = tx.sign(signer)?;

        tracing::debug!(
            nonce,
            gas_limit,
            gas_price = %gas_price,
            to = ?tx.to,
            "Submitting transaction"
        );

        self.request("eth_sendRawTransaction", vec![serde_json::to_value(raw)?])
            .await
    }

    async fn wait_for_receipt(&self, hash: B256) -> anyhow::Result<TransactionReceipt> {
        tracing::debug!(tx = %hash, "Waiting for receipt");

        (move || async move { self.fetch_receipt(hash).await })
            .retry(
                ConstantBuilder::default()
                    .with_delay(RECEIPT_POLL_INTERVAL)
                    .without_max_times(),
            )
            .when(|e: &anyhow::Error| e.is::<ReceiptPending>())
            .notify(|_, delay| {
                tracing::trace!(tx = %hash, ?delay, "Transaction still pending");
            })
            .await
    }
}
