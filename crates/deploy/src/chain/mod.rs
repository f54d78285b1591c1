//! Chain access: the client abstraction every flow talks through, its JSON-RPC
//! implementation, and legacy transaction signing.

use std::future::Future;

use alloy_core::primitives::{Address, B256, Bytes, U256};
use serde::Serialize;

mod rpc;
pub use rpc::RpcChainClient;

mod tx;
pub use tx::LegacyTransaction;

/// Call or transaction parameters, shared by `eth_call`, `eth_estimateGas` and sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    pub from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    pub data: Bytes,
}

impl CallRequest {
    /// A contract creation carrying `code` (bytecode plus encoded constructor arguments).
    pub fn deploy(from: Address, code: Bytes) -> Self {
        Self {
            from,
            to: None,
            value: None,
            data: code,
        }
    }

    /// A call to `to` with ABI-encoded `data`.
    pub fn call(from: Address, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from,
            to: Some(to),
            value: None,
            data: data.into(),
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }
}

/// The parts of a mined transaction receipt the flows report on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// `false` when the transaction reverted.
    pub status: bool,
    pub contract_address: Option<Address>,
}

/// Read/write access to an EVM JSON-RPC endpoint.
///
/// Every call is a single suspension point; implementations do not retry.
pub trait ChainClient: Send + Sync {
    /// Address transactions are sent from, if the client can sign.
    fn sender(&self) -> Option<Address>;

    fn chain_id(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;

    fn get_balance(&self, address: Address) -> impl Future<Output = anyhow::Result<U256>> + Send;

    /// Confirmed transaction count of `address`, i.e. the nonce of its next CREATE.
    fn get_transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;

    fn estimate_gas(
        &self,
        request: &CallRequest,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;

    fn gas_price(&self) -> impl Future<Output = anyhow::Result<u128>> + Send;

    fn get_storage_at(
        &self,
        address: Address,
        slot: B256,
    ) -> impl Future<Output = anyhow::Result<B256>> + Send;

    /// Read-only call against the latest block.
    fn call(&self, request: &CallRequest) -> impl Future<Output = anyhow::Result<Bytes>> + Send;

    /// Sign and submit a transaction, returning its hash.
    fn send_transaction(
        &self,
        request: CallRequest,
    ) -> impl Future<Output = anyhow::Result<B256>> + Send;

    /// Wait until the transaction is mined.
    fn wait_for_receipt(
        &self,
        hash: B256,
    ) -> impl Future<Output = anyhow::Result<TransactionReceipt>> + Send;
}

/// Read the low 20 bytes of a storage word as an address.
pub fn slot_to_address(word: B256) -> Address {
    Address::from_word(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_request_serialization_skips_unset_fields() {
        let request = CallRequest::deploy(Address::repeat_byte(1), Bytes::from_static(&[0x60]));
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("to").is_none());
        assert!(json.get("value").is_none());
        assert_eq!(json["data"], "0x60");

        let request = CallRequest::call(Address::repeat_byte(1), Address::repeat_byte(2), vec![1u8])
            .with_value(U256::from(16));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["value"], "0x10");
    }

    #[test]
    fn test_slot_to_address_takes_low_bytes() {
        let mut word = B256::ZERO;
        word.0[12..].copy_from_slice(Address::repeat_byte(0xab).as_slice());
        assert_eq!(slot_to_address(word), Address::repeat_byte(0xab));
    }
}
