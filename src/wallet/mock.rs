//! Mock wallet provider for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use super::provider::WalletProvider;
use crate::chain::abi::{self, OnChainReport};
use crate::chain::{Address, NetworkParams, TransactionReceipt, TransactionRequest};
use crate::types::error::{UNRECOGNIZED_CHAIN, USER_REJECTED};
use crate::types::{Result, XyraError};

/// In-memory wallet.
///
/// Knows only the chain it starts on, so switching elsewhere fails with 4902
/// until `add_chain` is called. Every request is counted.
pub struct MockWallet {
    accounts: Vec<Address>,
    active_chain: AtomicU64,
    known_chains: Mutex<HashSet<u64>>,
    reports: Mutex<Vec<OnChainReport>>,
    sent: Mutex<Vec<TransactionRequest>>,
    switch_error: Option<i64>,
    reject_add: bool,
    send_error: Option<String>,
    pending_receipts: bool,
    reverting: bool,
    switch_calls: AtomicU32,
    add_calls: AtomicU32,
}

impl MockWallet {
    /// Create a mock wallet active on `chain_id`
    pub fn new(chain_id: u64) -> Self {
        Self {
            accounts: vec![Address([0xab; 20])],
            active_chain: AtomicU64::new(chain_id),
            known_chains: Mutex::new(HashSet::from([chain_id])),
            reports: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            switch_error: None,
            reject_add: false,
            send_error: None,
            pending_receipts: false,
            reverting: false,
            switch_calls: AtomicU32::new(0),
            add_calls: AtomicU32::new(0),
        }
    }

    /// Set the accounts returned by `request_accounts`
    pub fn with_accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Let `switch_chain` reach `chain_id` without adding it first
    pub fn with_known_chain(mut self, chain_id: u64) -> Self {
        if let Ok(known) = self.known_chains.get_mut() {
            known.insert(chain_id);
        }
        self
    }

    /// Make every switch fail with `code`
    pub fn with_switch_error(mut self, code: i64) -> Self {
        self.switch_error = Some(code);
        self
    }

    /// Reject `wallet_addEthereumChain`
    pub fn with_add_rejected(mut self) -> Self {
        self.reject_add = true;
        self
    }

    /// Make `send_transaction` fail with `message`
    pub fn with_send_failure(mut self, message: impl Into<String>) -> Self {
        self.send_error = Some(message.into());
        self
    }

    /// Never return a receipt
    pub fn with_pending_receipts(mut self) -> Self {
        self.pending_receipts = true;
        self
    }

    /// Return a failed receipt for every transaction
    pub fn with_reverting_transactions(mut self) -> Self {
        self.reverting = true;
        self
    }

    /// Seed the reports `getMyReports()` returns
    pub fn with_reports(self, reports: Vec<OnChainReport>) -> Self {
        if let Ok(mut stored) = self.reports.lock() {
            *stored = reports;
        }
        self
    }

    /// First account
    pub fn address(&self) -> Address {
        self.accounts.first().copied().unwrap_or(Address([0; 20]))
    }

    pub fn sent_transactions(&self) -> Vec<TransactionRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn switch_calls(&self) -> u32 {
        self.switch_calls.load(Ordering::SeqCst)
    }

    pub fn add_calls(&self) -> u32 {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn active_chain(&self) -> u64 {
        self.active_chain.load(Ordering::SeqCst)
    }

    fn lock_err<T>(_: T) -> XyraError {
        XyraError::Internal("mock wallet lock poisoned".to_string())
    }
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new(crate::chain::APOTHEM_CHAIN_ID)
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        Ok(self.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.active_chain.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(code) = self.switch_error {
            return Err(XyraError::wallet(code, "mock switch failure"));
        }
        let known = self.known_chains.lock().map_err(Self::lock_err)?;
        if !known.contains(&chain_id) {
            return Err(XyraError::wallet(UNRECOGNIZED_CHAIN, "Unrecognized chain ID"));
        }
        self.active_chain.store(chain_id, Ordering::SeqCst);
        Ok(())
    }

    async fn add_chain(&self, params: &NetworkParams) -> Result<()> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);

        if self.reject_add {
            return Err(XyraError::wallet(USER_REJECTED, "User rejected the request."));
        }
        self.known_chains
            .lock()
            .map_err(Self::lock_err)?
            .insert(params.chain_id);
        self.active_chain.store(params.chain_id, Ordering::SeqCst);
        Ok(())
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<String> {
        if let Some(message) = &self.send_error {
            return Err(XyraError::Rpc {
                code: -32000,
                message: message.clone(),
            });
        }

        let mut sent = self.sent.lock().map_err(Self::lock_err)?;
        sent.push(request);
        Ok(format!("0x{:064x}", sent.len()))
    }

    async fn call(&self, request: TransactionRequest) -> Result<Vec<u8>> {
        if request.data == abi::encode_get_my_reports() {
            let reports = self.reports.lock().map_err(Self::lock_err)?;
            return Ok(abi::encode_reports(&reports));
        }
        Ok(Vec::new())
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>> {
        if self.pending_receipts {
            return Ok(None);
        }
        let status = if self.reverting { "0x0" } else { "0x1" };
        Ok(Some(TransactionReceipt {
            transaction_hash: tx_hash.to_string(),
            block_number: Some("0x1".to_string()),
            status: Some(status.to_string()),
            contract_address: Some(format!("0x{}", "cd".repeat(20))),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_chain_until_added() {
        let wallet = MockWallet::new(1);
        let err = wallet.switch_chain(51).await.unwrap_err();
        assert!(err.is_unrecognized_chain());

        wallet.add_chain(&NetworkParams::apothem()).await.unwrap();
        assert_eq!(wallet.chain_id().await.unwrap(), 51);
        wallet.switch_chain(1).await.unwrap();
        wallet.switch_chain(51).await.unwrap();
        assert_eq!(wallet.switch_calls(), 3);
        assert_eq!(wallet.add_calls(), 1);
    }

    #[tokio::test]
    async fn test_known_chain_switches_directly() {
        let wallet = MockWallet::new(1).with_known_chain(51);
        wallet.switch_chain(51).await.unwrap();
        assert_eq!(wallet.active_chain(), 51);
        assert_eq!(wallet.add_calls(), 0);
    }

    #[tokio::test]
    async fn test_transaction_hashes_are_distinct() {
        let wallet = MockWallet::default();
        let a = wallet
            .send_transaction(TransactionRequest::deploy(vec![1]))
            .await
            .unwrap();
        let b = wallet
            .send_transaction(TransactionRequest::deploy(vec![2]))
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 66);
    }
}
