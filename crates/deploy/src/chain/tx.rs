//! EIP-155 legacy transactions.
//!
//! The Hedera JSON-RPC relay accepts legacy transactions everywhere, so that is the only
//! envelope built here.

use alloy_core::{
    primitives::{Address, B256, Bytes, Signature, U256, keccak256},
    rlp::{BufMut, EMPTY_STRING_CODE, Encodable, Header},
};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;

/// Unsigned legacy transaction. `to == None` is a contract creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

impl LegacyTransaction {
    fn fields_length(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.to.map_or(1, |to| to.length())
            + self.value.length()
            + self.input.length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        match self.to {
            Some(to) => to.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
        self.value.encode(out);
        self.input.encode(out);
    }

    /// Hash signed under EIP-155: `keccak256(rlp([.., chainId, 0, 0]))`.
    pub fn signing_hash(&self) -> B256 {
        let header = Header {
            list: true,
            payload_length: self.fields_length() + self.chain_id.length() + 2,
        };

        let mut buf = Vec::new();
        header.encode(&mut buf);
        self.encode_fields(&mut buf);
        self.chain_id.encode(&mut buf);
        0u8.encode(&mut buf);
        0u8.encode(&mut buf);

        keccak256(&buf)
    }

    /// Raw signed transaction, ready for `eth_sendRawTransaction`.
    pub fn encode_signed(&self, signature: &Signature) -> Bytes {
        let v = self.chain_id * 2 + 35 + u64::from(signature.v());
        let r = signature.r();
        let s = signature.s();

        let header = Header {
            list: true,
            payload_length: self.fields_length() + v.length() + r.length() + s.length(),
        };

        let mut buf = Vec::new();
        header.encode(&mut buf);
        self.encode_fields(&mut buf);
        v.encode(&mut buf);
        r.encode(&mut buf);
        s.encode(&mut buf);

        buf.into()
    }

    pub fn sign(&self, signer: &PrivateKeySigner) -> anyhow::Result<Bytes> {
        let signature = signer
            .sign_hash_sync(&self.signing_hash())
            .context("Failed to sign transaction")?;
        Ok(self.encode_signed(&signature))
    }
}
