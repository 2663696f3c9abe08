//! Transactions: wallet-level requests, signed legacy (EIP-155) encoding,
//! and receipts.

use k256::ecdsa::SigningKey;
use serde::Deserialize;

use super::network::parse_hex_u64;
use super::{keccak256, rlp, Address};
use crate::types::{Result, XyraError};

/// What a caller asks the wallet to send. Unset fields are filled by the
/// wallet (nonce, gas price, gas limit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    /// `None` deploys a contract
    pub to: Option<Address>,
    pub data: Vec<u8>,
    pub value: u128,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub nonce: Option<u64>,
}

impl TransactionRequest {
    pub fn call(to: Address, data: Vec<u8>) -> Self {
        Self {
            to: Some(to),
            data,
            ..Default::default()
        }
    }

    pub fn deploy(bytecode: Vec<u8>) -> Self {
        Self {
            data: bytecode,
            ..Default::default()
        }
    }

    /// JSON object for `eth_call` / `eth_estimateGas`
    pub fn to_rpc_object(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "data": format!("0x{}", hex::encode(&self.data)),
        });
        if let Some(from) = self.from {
            obj["from"] = serde_json::Value::String(from.to_checksum());
        }
        if let Some(to) = self.to {
            obj["to"] = serde_json::Value::String(to.to_checksum());
        }
        if self.value > 0 {
            obj["value"] = serde_json::Value::String(format!("0x{:x}", self.value));
        }
        obj
    }
}

/// Fully specified pre-EIP-1559 transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas: u64,
    pub to: Option<Address>,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn base_fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp::encode_uint(self.nonce as u128),
            rlp::encode_uint(self.gas_price),
            rlp::encode_uint(self.gas as u128),
            match &self.to {
                Some(to) => rlp::encode_bytes(to.as_bytes()),
                None => rlp::encode_bytes(&[]),
            },
            rlp::encode_uint(self.value),
            rlp::encode_bytes(&self.data),
        ]
    }

    /// RLP payload hashed for signing (EIP-155: chain id, 0, 0 appended)
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = self.base_fields();
        fields.push(rlp::encode_uint(self.chain_id as u128));
        fields.push(rlp::encode_uint(0));
        fields.push(rlp::encode_uint(0));
        rlp::encode_list(&fields)
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Sign and return the raw transaction bytes for `eth_sendRawTransaction`
    pub fn sign(&self, key: &SigningKey) -> Result<Vec<u8>> {
        let hash = self.signing_hash();
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| XyraError::Internal(format!("signing failed: {}", e)))?;

        let v = self.chain_id as u128 * 2 + 35 + recovery_id.to_byte() as u128;
        let r = signature.r().to_bytes();
        let s = signature.s().to_bytes();

        let mut fields = self.base_fields();
        fields.push(rlp::encode_uint(v));
        fields.push(rlp::encode_bytes(&rlp::trim_leading_zeros(&r)));
        fields.push(rlp::encode_bytes(&rlp::trim_leading_zeros(&s)));
        Ok(rlp::encode_list(&fields))
    }
}

/// Subset of `eth_getTransactionReceipt` we act on
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
}

impl TransactionReceipt {
    /// Receipts without a status field predate Byzantium; treat as success
    pub fn succeeded(&self) -> bool {
        match &self.status {
            Some(status) => parse_hex_u64(status) == Some(1),
            None => true,
        }
    }

    pub fn block(&self) -> Option<u64> {
        self.block_number.as_deref().and_then(parse_hex_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Example transaction from EIP-155
    fn eip155_example() -> (LegacyTransaction, SigningKey) {
        let tx = LegacyTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas: 21_000,
            to: Some("0x3535353535353535353535353535353535353535".parse().unwrap()),
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
            chain_id: 1,
        };
        let key = SigningKey::from_slice(&[0x46u8; 32]).unwrap();
        (tx, key)
    }

    #[test]
    fn test_eip155_signing_payload() {
        let (tx, _) = eip155_example();
        assert_eq!(
            hex::encode(tx.signing_payload()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_eip155_signed_transaction() {
        let (tx, key) = eip155_example();
        let raw = tx.sign(&key).unwrap();
        assert_eq!(
            hex::encode(raw),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_receipt_status() {
        let ok: TransactionReceipt = serde_json::from_value(serde_json::json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x10",
            "status": "0x1"
        }))
        .unwrap();
        assert!(ok.succeeded());
        assert_eq!(ok.block(), Some(16));

        let reverted: TransactionReceipt = serde_json::from_value(serde_json::json!({
            "transactionHash": "0xabc",
            "status": "0x0"
        }))
        .unwrap();
        assert!(!reverted.succeeded());
    }

    #[test]
    fn test_rpc_object_for_deploy_omits_to() {
        let req = TransactionRequest::deploy(vec![0x60, 0x80]);
        let obj = req.to_rpc_object();
        assert_eq!(obj["data"], "0x6080");
        assert!(obj.get("to").is_none());
    }
}
