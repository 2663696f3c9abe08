//! XyraChain - chest X-ray analysis with on-chain report anchoring
//!
//! An X-ray is sent to an inference backend; the diagnosis, confidence and
//! heatmap it returns can be downloaded as a PDF report, or pinned to IPFS
//! and recorded with the XyraChain contract on XDC Apothem.
//!
//! ## Components
//!
//! - **Analysis**: image selection and the upload/processing state machine
//! - **Mint**: report pinning plus the `addReport` transaction
//! - **Wallet**: local signing wallet and the per-user connection
//! - **Chain**: ABI, RLP, JSON-RPC and the contract binding
//! - **Report**: PDF rendering of a completed analysis
//! - **Chat**: health assistant and symptom triage conversations
//! - **Server**: HTTP gateway exposing all of the above per session

pub mod analysis;
pub mod backend;
pub mod chain;
pub mod chat;
pub mod config;
pub mod mint;
pub mod report;
pub mod server;
pub mod types;
pub mod vault;
pub mod wallet;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, XyraError};
