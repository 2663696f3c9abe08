//! Network parameters for the chains the wallet may be asked to add

use serde::{Deserialize, Serialize};

pub const APOTHEM_CHAIN_ID: u64 = 51;

/// Native currency descriptor used by `wallet_addEthereumChain`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Everything a wallet needs to add a chain.
///
/// Serializes to the `wallet_addEthereumChain` parameter shape, with the
/// chain id as a `0x`-prefixed hex string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParams {
    #[serde(with = "hex_chain_id")]
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl NetworkParams {
    /// XDC Apothem testnet
    pub fn apothem() -> Self {
        Self {
            chain_id: APOTHEM_CHAIN_ID,
            chain_name: "XDC Apothem Testnet".to_string(),
            native_currency: NativeCurrency {
                name: "XDC".to_string(),
                symbol: "XDC".to_string(),
                decimals: 18,
            },
            rpc_urls: vec!["https://rpc.apothem.network".to_string()],
            block_explorer_urls: vec!["https://apothem.xdcscan.io".to_string()],
        }
    }

    /// Apothem parameters pointed at a specific RPC endpoint
    pub fn apothem_with_rpc(rpc_url: &str) -> Self {
        let mut params = Self::apothem();
        params.rpc_urls = vec![rpc_url.to_string()];
        params
    }

    /// Parameters for the configured chain; any id other than Apothem gets a
    /// generic descriptor with no explorer
    pub fn for_chain(chain_id: u64, rpc_url: &str) -> Self {
        if chain_id == APOTHEM_CHAIN_ID {
            return Self::apothem_with_rpc(rpc_url);
        }
        Self {
            chain_id,
            chain_name: format!("Chain {}", chain_id),
            native_currency: NativeCurrency {
                name: "Ether".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            rpc_urls: vec![rpc_url.to_string()],
            block_explorer_urls: Vec::new(),
        }
    }

    pub fn chain_id_hex(&self) -> String {
        chain_id_hex(self.chain_id)
    }

    /// Primary RPC endpoint
    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }

    /// Explorer page for a transaction
    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        self.block_explorer_urls
            .first()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}

pub fn chain_id_hex(chain_id: u64) -> String {
    format!("0x{:x}", chain_id)
}

/// Parse a `0x`-prefixed hex quantity
pub fn parse_hex_u64(value: &str) -> Option<u64> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.is_empty() {
        return Some(0);
    }
    u64::from_str_radix(digits, 16).ok()
}

pub fn parse_hex_u128(value: &str) -> Option<u128> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(digits, 16).ok()
}

mod hex_chain_id {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::chain_id_hex(*id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_hex_u64(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid chain id: {}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apothem_chain_id_hex() {
        assert_eq!(NetworkParams::apothem().chain_id_hex(), "0x33");
    }

    #[test]
    fn test_add_chain_param_shape() {
        let json = serde_json::to_value(NetworkParams::apothem()).unwrap();
        assert_eq!(json["chainId"], "0x33");
        assert_eq!(json["chainName"], "XDC Apothem Testnet");
        assert_eq!(json["nativeCurrency"]["decimals"], 18);
        assert_eq!(json["rpcUrls"][0], "https://rpc.apothem.network");
        assert_eq!(json["blockExplorerUrls"][0], "https://apothem.xdcscan.io");

        let back: NetworkParams = serde_json::from_value(json).unwrap();
        assert_eq!(back.chain_id, 51);
    }

    #[test]
    fn test_tx_url() {
        let url = NetworkParams::apothem().tx_url("0xabc").unwrap();
        assert_eq!(url, "https://apothem.xdcscan.io/tx/0xabc");
    }

    #[test]
    fn test_for_chain() {
        let apothem = NetworkParams::for_chain(51, "http://localhost:8545");
        assert_eq!(apothem.chain_name, "XDC Apothem Testnet");
        assert_eq!(apothem.rpc_url(), Some("http://localhost:8545"));

        let local = NetworkParams::for_chain(31337, "http://localhost:8545");
        assert_eq!(local.chain_id_hex(), "0x7a69");
        assert!(local.tx_url("0xabc").is_none());
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex_u64("0x33"), Some(51));
        assert_eq!(parse_hex_u64("0x"), Some(0));
        assert_eq!(parse_hex_u64("0xzz"), None);
        assert_eq!(parse_hex_u128("0x4a817c800"), Some(20_000_000_000));
    }
}
