//! Error types for XyraChain
//!
//! Every failure a workflow attempt can end in maps onto one
//! [`ErrorCategory`], which is what callers (CLI, gateway, notices) branch on.

use hyper::StatusCode;
use serde::Serialize;

/// JSON-RPC / EIP-1193 code a wallet returns when asked to switch to a chain
/// it does not know.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// Some wallets report an unknown chain as a generic internal error.
pub const INTERNAL_RPC_ERROR: i64 = -32603;

/// EIP-1193 code for a request the user rejected.
pub const USER_REJECTED: i64 = 4001;

/// Coarse error taxonomy surfaced to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Input rejected before any network call
    Validation,
    /// Backend returned a well-formed failure payload
    Backend,
    /// Backend or node could not be reached
    Connectivity,
    /// Wallet provider or chain rejected a request
    Wallet,
    /// Report pinned but the on-chain write failed
    PartialFailure,
    /// Operation not allowed in the current workflow state
    State,
    /// Everything else
    Internal,
}

/// Main error type for XyraChain operations
#[derive(Debug, thiserror::Error)]
pub enum XyraError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Analysis failed: {0}")]
    Backend(String),

    #[error("Failed to mint results: {0}")]
    Pin(String),

    #[error("Connection error: {0}")]
    Connectivity(String),

    #[error("Wallet error {code}: {message}")]
    Wallet { code: i64, message: String },

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("IPFS Upload Success, but Blockchain Minting Failed: {reason} (CID {cid})")]
    PartialMint { cid: String, reason: String },

    #[error("Cannot {action} while {state}")]
    InvalidTransition { state: String, action: String },

    #[error("Response discarded: request {token} is no longer current")]
    Stale { token: u64 },

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl XyraError {
    /// Build a wallet error from a provider code and message
    pub fn wallet(code: i64, message: impl Into<String>) -> Self {
        Self::Wallet {
            code,
            message: message.into(),
        }
    }

    /// Build an invalid-transition error
    pub fn transition(state: impl Into<String>, action: impl Into<String>) -> Self {
        Self::InvalidTransition {
            state: state.into(),
            action: action.into(),
        }
    }

    /// True when a chain switch failed because the wallet lacks the network
    pub fn is_unrecognized_chain(&self) -> bool {
        match self {
            Self::Wallet { code, .. } | Self::Rpc { code, .. } => {
                *code == UNRECOGNIZED_CHAIN || *code == INTERNAL_RPC_ERROR
            }
            _ => false,
        }
    }

    /// Taxonomy bucket for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Backend(_) | Self::Pin(_) => ErrorCategory::Backend,
            Self::Connectivity(_) => ErrorCategory::Connectivity,
            Self::Wallet { .. } | Self::WalletNotConnected | Self::Rpc { .. } | Self::Reverted(_) => {
                ErrorCategory::Wallet
            }
            Self::PartialMint { .. } => ErrorCategory::PartialFailure,
            Self::InvalidTransition { .. } | Self::Stale { .. } => ErrorCategory::State,
            Self::Abi(_)
            | Self::Report(_)
            | Self::NotFound(_)
            | Self::Config(_)
            | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Content address that survived a partial failure, if any
    pub fn content_address(&self) -> Option<&str> {
        match self {
            Self::PartialMint { cid, .. } => Some(cid),
            _ => None,
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::WalletNotConnected => StatusCode::UNAUTHORIZED,
            _ => match self.category() {
                ErrorCategory::Validation => StatusCode::BAD_REQUEST,
                ErrorCategory::Backend => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCategory::Connectivity => StatusCode::BAD_GATEWAY,
                ErrorCategory::Wallet => StatusCode::BAD_GATEWAY,
                ErrorCategory::PartialFailure => StatusCode::MULTI_STATUS,
                ErrorCategory::State => StatusCode::CONFLICT,
                ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// JSON body for HTTP error responses
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "error": self.to_string(),
            "category": self.category(),
            "message": self.user_message(),
        });
        if let Some(cid) = self.content_address() {
            body["contentAddress"] = serde_json::Value::String(cid.to_string());
        }
        body
    }

    /// Message shown to the user for this error
    pub fn user_message(&self) -> String {
        match self {
            Self::Connectivity(_) => "Error connecting to analysis server.".to_string(),
            Self::Backend(msg) => format!("Analysis failed: {}", msg),
            Self::WalletNotConnected => {
                "Please process an image and connect your wallet first.".to_string()
            }
            Self::Wallet { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for XyraError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Backend(format!("malformed response: {}", err))
        } else {
            Self::Connectivity(err.to_string())
        }
    }
}

impl From<serde_json::Error> for XyraError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for XyraError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<hyper::Error> for XyraError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

/// Result type alias for XyraChain operations
pub type Result<T> = std::result::Result<T, XyraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_chain_codes() {
        assert!(XyraError::wallet(UNRECOGNIZED_CHAIN, "unknown").is_unrecognized_chain());
        assert!(XyraError::wallet(INTERNAL_RPC_ERROR, "internal").is_unrecognized_chain());
        assert!(!XyraError::wallet(USER_REJECTED, "rejected").is_unrecognized_chain());
        assert!(!XyraError::Backend("x".into()).is_unrecognized_chain());
    }

    #[test]
    fn test_partial_mint_keeps_cid() {
        let err = XyraError::PartialMint {
            cid: "bafkreiabc".into(),
            reason: "execution reverted".into(),
        };
        assert_eq!(err.category(), ErrorCategory::PartialFailure);
        assert_eq!(err.content_address(), Some("bafkreiabc"));

        let body = err.to_json();
        assert_eq!(body["contentAddress"], "bafkreiabc");
        assert_eq!(body["category"], "partial_failure");
        assert!(body["error"].as_str().unwrap().contains("bafkreiabc"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            XyraError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            XyraError::transition("uploading", "submit").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            XyraError::NotFound("session".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_wallet_message_shown_verbatim() {
        let err = XyraError::wallet(USER_REJECTED, "Please switch your wallet and try again.");
        assert_eq!(err.user_message(), "Please switch your wallet and try again.");
        assert!(err.to_string().contains("4001"));
    }

    #[test]
    fn test_connectivity_message_is_generic() {
        let err = XyraError::Connectivity("tcp connect error: refused".into());
        assert_eq!(err.user_message(), "Error connecting to analysis server.");
    }
}
