//! ABI of the contract methods the tooling calls.

use alloy_core::{
    primitives::{B256, b256},
    sol,
};

sol! {
    /// Methods of the upgradeable payment contract, called through its proxy.
    interface ILetsPay {
        function initialize(address owner) external;
        function upgradeTo(address newImplementation) external;
        function fundContract() external payable;
        function owner() external view returns (address);
        function CREDIT() external view returns (uint256);
    }
}

/// ERC-1967 implementation slot, `keccak256("eip1967.proxy.implementation") - 1`.
pub const IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// Default value of `CREDIT()` on the upgraded implementation: 200 with 8 decimals.
pub const DEFAULT_EXPECTED_CREDIT: u64 = 200 * 100_000_000;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::{
        primitives::{U256, keccak256},
        sol_types::SolCall,
    };

    #[test]
    fn test_implementation_slot_derivation() {
        let hash = U256::from_be_bytes(keccak256("eip1967.proxy.implementation").0);
        assert_eq!(B256::from(hash - U256::from(1)), IMPLEMENTATION_SLOT);
    }

    #[test]
    fn test_selectors() {
        assert_eq!(ILetsPay::initializeCall::SELECTOR, [0xc4, 0xd6, 0x6d, 0xe8]);
        assert_eq!(ILetsPay::upgradeToCall::SELECTOR, [0x36, 0x59, 0xcf, 0xe6]);
        assert_eq!(ILetsPay::ownerCall::SELECTOR, [0x8d, 0xa5, 0xcb, 0x5b]);
    }

    #[test]
    fn test_default_credit() {
        assert_eq!(DEFAULT_EXPECTED_CREDIT, 20_000_000_000);
    }
}
