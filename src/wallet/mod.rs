//! Wallet providers and the per-user connection context

pub mod local;
pub mod mock;
pub mod provider;
pub mod session;

pub use local::LocalWallet;
pub use mock::MockWallet;
pub use provider::WalletProvider;
pub use session::{WalletSession, WalletState};
