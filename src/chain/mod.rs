//! EVM chain plumbing: addresses, ABI, RLP, transactions, JSON-RPC and the
//! XyraChain contract binding.

pub mod abi;
pub mod address;
pub mod contract;
pub mod network;
pub mod rlp;
pub mod rpc;
pub mod tx;

pub use abi::OnChainReport;
pub use address::{shorten_address, Address};
pub use contract::{ConfirmationPolicy, XyraChainContract};
pub use network::{NetworkParams, APOTHEM_CHAIN_ID};
pub use rpc::RpcClient;
pub use tx::{LegacyTransaction, TransactionReceipt, TransactionRequest};

use sha3::{Digest, Keccak256};

/// Keccak-256 as used by Ethereum (not NIST SHA3)
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(input);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}
