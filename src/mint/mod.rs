//! Mint: pin a report through the backend and anchor its CID on-chain.
//!
//! Runs only from a completed analysis with a connected wallet. The wallet
//! is moved onto the expected network first (switch, or add when the wallet
//! does not know it). A chain failure after a successful pin is a partial
//! failure that still carries the CID.

use cid::Cid;
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::analysis::AnalysisWorkflow;
use crate::backend::ReportRequest;
use crate::chain::{NetworkParams, XyraChainContract};
use crate::types::{Notice, Result, XyraError};
use crate::wallet::{WalletProvider, WalletSession};

/// Outcome of a successful mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRecord {
    pub tx_hash: String,
    pub cid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

pub struct Minter {
    contract: XyraChainContract,
    network: NetworkParams,
    settle: Duration,
}

impl Minter {
    pub fn new(contract: XyraChainContract, network: NetworkParams, settle: Duration) -> Self {
        Self {
            contract,
            network,
            settle,
        }
    }

    pub fn network(&self) -> &NetworkParams {
        &self.network
    }

    pub fn contract(&self) -> &XyraChainContract {
        &self.contract
    }

    /// Pin the workflow's result and record it from the session account
    pub async fn mint(
        &self,
        workflow: &AnalysisWorkflow,
        wallet: &WalletSession,
    ) -> Result<MintRecord> {
        let notifier = workflow.notifier();
        let outcome = self.run(workflow, wallet).await;
        match &outcome {
            Ok(record) => notifier.publish(Notice::success(format!(
                "Report minted. IPFS CID: {} Tx Hash: {}",
                record.cid, record.tx_hash
            ))),
            Err(e) => notifier.publish(Notice::from_error(e)),
        }
        outcome
    }

    async fn run(&self, workflow: &AnalysisWorkflow, wallet: &WalletSession) -> Result<MintRecord> {
        let _slot = workflow.begin_mint()?;
        let (result, _) = workflow.completed("mint").await?;
        let account = wallet.require_address().await?;

        self.ensure_network(wallet.provider()).await?;

        let request = ReportRequest::new(result.clone(), account.to_checksum());
        let response = workflow.backend().generate_report(&request).await?;
        if !response.is_success() {
            return Err(XyraError::Pin(
                response
                    .message
                    .unwrap_or_else(|| format!("backend returned status '{}'", response.status)),
            ));
        }
        let cid = response
            .cid
            .ok_or_else(|| XyraError::Pin("response is missing 'cid'".to_string()))?;
        Cid::from_str(&cid)
            .map_err(|e| XyraError::Pin(format!("backend returned an invalid CID '{}': {}", cid, e)))?;
        info!("Report pinned: {}", cid);

        let provider = wallet.provider();
        let write = async {
            let tx_hash = self
                .contract
                .add_report(
                    provider,
                    account,
                    &cid,
                    result.diagnosis.as_str(),
                    result.confidence.floor(),
                )
                .await?;
            self.contract.wait_for_confirmation(provider, &tx_hash).await?;
            Ok::<_, XyraError>(tx_hash)
        };

        match write.await {
            Ok(tx_hash) => {
                info!("Report {} recorded in {}", cid, tx_hash);
                Ok(MintRecord {
                    explorer_url: self.network.tx_url(&tx_hash),
                    tx_hash,
                    cid,
                })
            }
            Err(e) => {
                warn!("Chain write failed after pinning {}: {}", cid, e);
                Err(XyraError::PartialMint {
                    cid,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Put the wallet on the expected chain, adding it if unknown
    pub async fn ensure_network(&self, provider: &dyn WalletProvider) -> Result<()> {
        let current = provider.chain_id().await?;
        if current == self.network.chain_id {
            return Ok(());
        }
        info!(
            "Wallet on chain {}, switching to {}",
            current, self.network.chain_id
        );

        match provider.switch_chain(self.network.chain_id).await {
            Ok(()) => {
                tokio::time::sleep(self.settle).await;
                Ok(())
            }
            Err(e) if e.is_unrecognized_chain() => {
                info!("Chain {} unknown to wallet, adding it", self.network.chain_id);
                provider.add_chain(&self.network).await.map_err(|add_err| {
                    warn!("Adding chain failed: {}", add_err);
                    XyraError::wallet(
                        wallet_code(&add_err),
                        format!(
                            "Please manually add {} (RPC: {})",
                            self.network.chain_name,
                            self.network.rpc_url().unwrap_or_default()
                        ),
                    )
                })
            }
            Err(e) => {
                warn!("Chain switch failed: {}", e);
                Err(XyraError::wallet(
                    wallet_code(&e),
                    format!(
                        "Please switch your wallet to {} (Chain ID {}) and try again.",
                        self.network.chain_name, self.network.chain_id
                    ),
                ))
            }
        }
    }
}

fn wallet_code(err: &XyraError) -> i64 {
    match err {
        XyraError::Wallet { code, .. } | XyraError::Rpc { code, .. } => *code,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Address, ConfirmationPolicy};
    use crate::types::error::{INTERNAL_RPC_ERROR, USER_REJECTED};
    use crate::wallet::MockWallet;

    fn minter() -> Minter {
        Minter::new(
            XyraChainContract::new(Address([0x11; 20]), ConfirmationPolicy::default()),
            NetworkParams::apothem(),
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_same_chain_is_noop() {
        let wallet = MockWallet::new(51);
        minter().ensure_network(&wallet).await.unwrap();
        assert_eq!(wallet.switch_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_chain_is_added() {
        let wallet = MockWallet::new(1);
        minter().ensure_network(&wallet).await.unwrap();
        assert_eq!(wallet.add_calls(), 1);
        assert_eq!(wallet.active_chain(), 51);
    }

    #[tokio::test]
    async fn test_internal_error_code_also_adds_chain() {
        let wallet = MockWallet::new(1).with_switch_error(INTERNAL_RPC_ERROR);
        minter().ensure_network(&wallet).await.unwrap();
        assert_eq!(wallet.add_calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_switch_asks_for_manual_switch() {
        let wallet = MockWallet::new(1).with_switch_error(USER_REJECTED);
        let err = minter().ensure_network(&wallet).await.unwrap_err();
        assert_eq!(
            err.user_message(),
            "Please switch your wallet to XDC Apothem Testnet (Chain ID 51) and try again."
        );
        assert_eq!(wallet.add_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_add_asks_for_manual_add() {
        let wallet = MockWallet::new(1).with_add_rejected();
        let err = minter().ensure_network(&wallet).await.unwrap_err();
        assert_eq!(
            err.user_message(),
            "Please manually add XDC Apothem Testnet (RPC: https://rpc.apothem.network)"
        );
    }
}
