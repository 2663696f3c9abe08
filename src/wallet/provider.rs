//! Wallet provider abstraction.
//!
//! Mirrors the request surface a browser wallet exposes: account access,
//! chain inspection/switching/addition, and transaction submission.
//! Errors carry EIP-1193 codes in [`XyraError::Wallet`].

use async_trait::async_trait;

use crate::chain::{Address, NetworkParams, TransactionReceipt, TransactionRequest};
use crate::types::Result;

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask for account access (`eth_requestAccounts`)
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Active chain id (`eth_chainId`)
    async fn chain_id(&self) -> Result<u64>;

    /// Switch the active chain (`wallet_switchEthereumChain`).
    ///
    /// Fails with code 4902 when the chain is unknown to the wallet.
    async fn switch_chain(&self, chain_id: u64) -> Result<()>;

    /// Register a chain and make it active (`wallet_addEthereumChain`)
    async fn add_chain(&self, params: &NetworkParams) -> Result<()>;

    /// Sign and submit a transaction; returns its hash
    async fn send_transaction(&self, request: TransactionRequest) -> Result<String>;

    /// Read-only contract call (`eth_call`) on the active chain
    async fn call(&self, request: TransactionRequest) -> Result<Vec<u8>>;

    /// Receipt for a mined transaction, `None` while pending
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>>;
}
