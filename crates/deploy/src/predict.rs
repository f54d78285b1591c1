//! CREATE address prediction.

use alloy_core::primitives::Address;

/// Address a CREATE transaction from `sender` with `nonce` will deploy to:
/// `keccak256(rlp([sender, nonce]))[12..]`.
///
/// The result is advisory. A concurrent transaction from the same sender consumes the
/// nonce and invalidates it.
pub fn predict_create_address(sender: Address, nonce: u64) -> Address {
    sender.create(nonce)
}
