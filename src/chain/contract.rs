//! Binding for the deployed XyraChain report registry contract

use std::time::Duration;
use tracing::{debug, info, warn};

use super::abi::{self, OnChainReport};
use super::tx::{TransactionReceipt, TransactionRequest};
use super::Address;
use crate::types::{Result, XyraError};
use crate::wallet::WalletProvider;

/// How long to wait for a transaction to be mined
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_polls: 90,
        }
    }
}

/// Contract methods used by the mint flow and the tooling commands
pub struct XyraChainContract {
    address: Address,
    confirmation: ConfirmationPolicy,
}

impl XyraChainContract {
    pub fn new(address: Address, confirmation: ConfirmationPolicy) -> Self {
        Self {
            address,
            confirmation,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Send `addReport` from `from`; returns the transaction hash
    pub async fn add_report(
        &self,
        wallet: &dyn WalletProvider,
        from: Address,
        ipfs_hash: &str,
        diagnosis: &str,
        confidence: u64,
    ) -> Result<String> {
        let mut request =
            TransactionRequest::call(self.address, abi::encode_add_report(ipfs_hash, diagnosis, confidence));
        request.from = Some(from);

        let tx_hash = wallet.send_transaction(request).await?;
        info!("addReport sent: {} (cid {})", tx_hash, ipfs_hash);
        Ok(tx_hash)
    }

    /// Reports recorded by `from` (the contract keys reports by `msg.sender`)
    pub async fn get_my_reports(
        &self,
        wallet: &dyn WalletProvider,
        from: Address,
    ) -> Result<Vec<OnChainReport>> {
        let mut request = TransactionRequest::call(self.address, abi::encode_get_my_reports());
        request.from = Some(from);

        let data = wallet.call(request).await?;
        let reports = abi::decode_reports(&data)?;
        debug!("getMyReports returned {} report(s)", reports.len());
        Ok(reports)
    }

    /// Block until the transaction is mined; a reverted receipt is an error
    pub async fn wait_for_confirmation(
        &self,
        wallet: &dyn WalletProvider,
        tx_hash: &str,
    ) -> Result<TransactionReceipt> {
        wait_for_receipt(wallet, tx_hash, self.confirmation).await
    }

    /// Deploy contract bytecode from `from`; returns the new contract address
    pub async fn deploy(
        wallet: &dyn WalletProvider,
        from: Address,
        bytecode: Vec<u8>,
        confirmation: ConfirmationPolicy,
    ) -> Result<Self> {
        let mut request = TransactionRequest::deploy(bytecode);
        request.from = Some(from);

        let tx_hash = wallet.send_transaction(request).await?;
        info!("Deployment transaction sent: {}", tx_hash);

        let receipt = wait_for_receipt(wallet, &tx_hash, confirmation).await?;
        let address = receipt
            .contract_address
            .as_deref()
            .ok_or_else(|| XyraError::Rpc {
                code: 0,
                message: "deployment receipt has no contract address".to_string(),
            })?
            .parse()?;

        Ok(Self::new(address, confirmation))
    }
}

async fn wait_for_receipt(
    wallet: &dyn WalletProvider,
    tx_hash: &str,
    policy: ConfirmationPolicy,
) -> Result<TransactionReceipt> {
    for attempt in 1..=policy.max_polls {
        if let Some(receipt) = wallet.transaction_receipt(tx_hash).await? {
            if !receipt.succeeded() {
                warn!("Transaction {} reverted", tx_hash);
                return Err(XyraError::Reverted(tx_hash.to_string()));
            }
            info!(
                "Transaction {} confirmed in block {:?}",
                tx_hash,
                receipt.block()
            );
            return Ok(receipt);
        }
        debug!("Receipt for {} pending (poll {}/{})", tx_hash, attempt, policy.max_polls);
        tokio::time::sleep(policy.poll_interval).await;
    }

    Err(XyraError::Rpc {
        code: 0,
        message: format!(
            "transaction {} not confirmed after {} polls",
            tx_hash, policy.max_polls
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::MockWallet;

    fn fast() -> ConfirmationPolicy {
        ConfirmationPolicy {
            poll_interval: Duration::from_millis(1),
            max_polls: 3,
        }
    }

    #[tokio::test]
    async fn test_add_report_sends_encoded_call() {
        let wallet = MockWallet::new(51);
        let contract = XyraChainContract::new(Address([0x11; 20]), fast());

        let hash = contract
            .add_report(&wallet, wallet.address(), "QmCid", "PNEUMONIA", 95)
            .await
            .unwrap();
        assert!(hash.starts_with("0x"));

        let sent = wallet.sent_transactions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, Some(Address([0x11; 20])));
        assert_eq!(sent[0].data, abi::encode_add_report("QmCid", "PNEUMONIA", 95));
    }

    #[tokio::test]
    async fn test_wait_for_confirmation_gives_up() {
        let wallet = MockWallet::new(51).with_pending_receipts();
        let contract = XyraChainContract::new(Address([0x11; 20]), fast());

        let err = contract.wait_for_confirmation(&wallet, "0xdead").await.unwrap_err();
        assert!(err.to_string().contains("not confirmed"));
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_error() {
        let wallet = MockWallet::new(51).with_reverting_transactions();
        let contract = XyraChainContract::new(Address([0x11; 20]), fast());

        let err = contract.wait_for_confirmation(&wallet, "0xdead").await.unwrap_err();
        assert!(matches!(err, XyraError::Reverted(_)));
    }
}
