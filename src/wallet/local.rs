//! Local-key wallet.
//!
//! Holds a secp256k1 key and a registry of known networks, and behaves like
//! an injected browser wallet: switching to an unknown chain fails with
//! code 4902 until the chain is added. Transactions are signed locally as
//! legacy EIP-155 transactions and submitted through the active network's
//! JSON-RPC endpoint.

use async_trait::async_trait;
use dashmap::DashMap;
use k256::ecdsa::SigningKey;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::provider::WalletProvider;
use crate::chain::network::{parse_hex_u128, parse_hex_u64};
use crate::chain::{
    Address, LegacyTransaction, NetworkParams, RpcClient, TransactionReceipt, TransactionRequest,
};
use crate::types::error::{UNRECOGNIZED_CHAIN, USER_REJECTED};
use crate::types::{Result, XyraError};

/// Code for a request naming an account the wallet does not hold
const UNAUTHORIZED_ACCOUNT: i64 = 4100;
const INVALID_PARAMS: i64 = -32602;

struct KnownNetwork {
    params: NetworkParams,
    rpc: RpcClient,
}

pub struct LocalWallet {
    key: SigningKey,
    address: Address,
    networks: DashMap<u64, Arc<KnownNetwork>>,
    active_chain: AtomicU64,
    timeout: Option<Duration>,
}

impl LocalWallet {
    /// Create a wallet from a hex private key, active on `network`
    pub fn new(private_key: &str, network: NetworkParams, timeout: Option<Duration>) -> Result<Self> {
        let digits = private_key.trim().strip_prefix("0x").unwrap_or(private_key.trim());
        let bytes = hex::decode(digits)
            .map_err(|_| XyraError::Config("PRIVATE_KEY is not valid hex".to_string()))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| XyraError::Config("PRIVATE_KEY is not a valid secp256k1 key".to_string()))?;
        let address = Address::from_verifying_key(key.verifying_key());

        let wallet = Self {
            key,
            address,
            networks: DashMap::new(),
            active_chain: AtomicU64::new(network.chain_id),
            timeout,
        };
        wallet.register(network)?;
        Ok(wallet)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn register(&self, params: NetworkParams) -> Result<()> {
        let url = params
            .rpc_url()
            .ok_or_else(|| XyraError::wallet(INVALID_PARAMS, "network has no RPC URL"))?
            .to_string();
        let rpc = RpcClient::new(url, self.timeout)?;
        self.networks
            .insert(params.chain_id, Arc::new(KnownNetwork { params, rpc }));
        Ok(())
    }

    fn active_network(&self) -> Result<Arc<KnownNetwork>> {
        let chain_id = self.active_chain.load(Ordering::SeqCst);
        self.networks
            .get(&chain_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                XyraError::wallet(UNRECOGNIZED_CHAIN, format!("active chain {} is unknown", chain_id))
            })
    }

    fn check_sender(&self, from: Option<Address>) -> Result<()> {
        match from {
            Some(from) if from != self.address => Err(XyraError::wallet(
                UNAUTHORIZED_ACCOUNT,
                format!("account {} is not managed by this wallet", from),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .field("active_chain", &self.active_chain.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![self.address])
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.active_chain.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        if !self.networks.contains_key(&chain_id) {
            return Err(XyraError::wallet(
                UNRECOGNIZED_CHAIN,
                format!("Unrecognized chain ID 0x{:x}", chain_id),
            ));
        }
        self.active_chain.store(chain_id, Ordering::SeqCst);
        info!("Wallet switched to chain {}", chain_id);
        Ok(())
    }

    async fn add_chain(&self, params: &NetworkParams) -> Result<()> {
        let url = params
            .rpc_url()
            .ok_or_else(|| XyraError::wallet(INVALID_PARAMS, "network has no RPC URL"))?;

        // Refuse endpoints that serve a different chain than advertised
        let endpoint = RpcClient::new(url, self.timeout)?;
        let reported: String = endpoint
            .request("eth_chainId", serde_json::json!([]))
            .await
            .map_err(|e| XyraError::wallet(USER_REJECTED, format!("cannot reach {}: {}", url, e)))?;
        if parse_hex_u64(&reported) != Some(params.chain_id) {
            return Err(XyraError::wallet(
                INVALID_PARAMS,
                format!(
                    "RPC endpoint reports chain {} but {} was requested",
                    reported,
                    params.chain_id_hex()
                ),
            ));
        }

        self.register(params.clone())?;
        self.active_chain.store(params.chain_id, Ordering::SeqCst);
        info!("Wallet added and switched to {} ({})", params.chain_name, params.chain_id);
        Ok(())
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<String> {
        self.check_sender(request.from)?;
        let network = self.active_network()?;
        let rpc = &network.rpc;
        let from = self.address.to_checksum();

        let nonce = match request.nonce {
            Some(n) => n,
            None => {
                let hex: String = rpc
                    .request("eth_getTransactionCount", serde_json::json!([from, "pending"]))
                    .await?;
                parse_hex_u64(&hex)
                    .ok_or_else(|| XyraError::Internal(format!("invalid nonce {}", hex)))?
            }
        };

        let gas_price = match request.gas_price {
            Some(p) => p,
            None => {
                let hex: String = rpc.request("eth_gasPrice", serde_json::json!([])).await?;
                parse_hex_u128(&hex)
                    .ok_or_else(|| XyraError::Internal(format!("invalid gas price {}", hex)))?
            }
        };

        let gas = match request.gas {
            Some(g) => g,
            None => {
                let mut estimate_req = request.clone();
                estimate_req.from = Some(self.address);
                let hex: String = rpc
                    .request("eth_estimateGas", serde_json::json!([estimate_req.to_rpc_object()]))
                    .await?;
                parse_hex_u64(&hex)
                    .ok_or_else(|| XyraError::Internal(format!("invalid gas estimate {}", hex)))?
            }
        };

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas,
            to: request.to,
            value: request.value,
            data: request.data,
            chain_id: network.params.chain_id,
        };
        debug!(
            "Signing tx nonce={} gas={} gas_price={} chain={}",
            tx.nonce, tx.gas, tx.gas_price, tx.chain_id
        );

        let raw = tx.sign(&self.key)?;
        let hash: String = rpc
            .request(
                "eth_sendRawTransaction",
                serde_json::json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        Ok(hash)
    }

    async fn call(&self, request: TransactionRequest) -> Result<Vec<u8>> {
        let network = self.active_network()?;
        let hex: String = network
            .rpc
            .request("eth_call", serde_json::json!([request.to_rpc_object(), "latest"]))
            .await?;
        hex::decode(hex.trim_start_matches("0x"))
            .map_err(|e| XyraError::Abi(format!("eth_call returned invalid hex: {}", e)))
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>> {
        let network = self.active_network()?;
        network
            .rpc
            .request_optional("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn wallet() -> LocalWallet {
        LocalWallet::new(KEY, NetworkParams::apothem(), None).unwrap()
    }

    #[tokio::test]
    async fn test_accounts_from_key() {
        let accounts = wallet().request_accounts().await.unwrap();
        assert_eq!(
            accounts[0].to_checksum(),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );
    }

    #[tokio::test]
    async fn test_switch_to_unknown_chain_is_unrecognized() {
        let wallet = wallet();
        let err = wallet.switch_chain(1).await.unwrap_err();
        assert!(err.is_unrecognized_chain());
        assert_eq!(wallet.chain_id().await.unwrap(), 51);
    }

    #[tokio::test]
    async fn test_rejects_foreign_sender() {
        let wallet = wallet();
        let mut req = TransactionRequest::call(Address([1; 20]), vec![]);
        req.from = Some(Address([2; 20]));
        let err = wallet.send_transaction(req).await.unwrap_err();
        assert!(matches!(err, XyraError::Wallet { code: UNAUTHORIZED_ACCOUNT, .. }));
    }

    #[test]
    fn test_invalid_key() {
        assert!(LocalWallet::new("0x1234", NetworkParams::apothem(), None).is_err());
        assert!(LocalWallet::new("zz", NetworkParams::apothem(), None).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", wallet());
        assert!(!rendered.contains("4c0883a6"));
    }
}
