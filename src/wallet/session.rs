//! Per-user wallet connection context

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::provider::WalletProvider;
use crate::chain::{shorten_address, Address};
use crate::types::{Result, XyraError};

/// Snapshot of the connection, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub address: Option<String>,
    pub short_address: Option<String>,
    pub connected: bool,
}

/// Connected account plus the provider it came from.
///
/// Starts disconnected; only `connect` and `disconnect` change it.
pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    account: RwLock<Option<Address>>,
}

impl WalletSession {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider,
            account: RwLock::new(None),
        }
    }

    /// Request account access and keep the first account
    pub async fn connect(&self) -> Result<Address> {
        let accounts = self.provider.request_accounts().await?;
        let address = accounts
            .first()
            .copied()
            .ok_or_else(|| XyraError::wallet(4100, "wallet returned no accounts"))?;

        *self.account.write().await = Some(address);
        info!("Wallet connected: {}", shorten_address(&address.to_checksum()));
        Ok(address)
    }

    pub async fn disconnect(&self) {
        if self.account.write().await.take().is_some() {
            info!("Wallet disconnected");
        }
    }

    pub async fn address(&self) -> Option<Address> {
        *self.account.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.account.read().await.is_some()
    }

    /// Connected account, or `WalletNotConnected`
    pub async fn require_address(&self) -> Result<Address> {
        self.address().await.ok_or(XyraError::WalletNotConnected)
    }

    pub async fn state(&self) -> WalletState {
        let address = self.address().await.map(|a| a.to_checksum());
        WalletState {
            short_address: address.as_deref().map(shorten_address),
            connected: address.is_some(),
            address,
        }
    }

    pub fn provider(&self) -> &dyn WalletProvider {
        self.provider.as_ref()
    }
}
