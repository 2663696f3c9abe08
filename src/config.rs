//! Configuration for XyraChain
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// XyraChain contract deployed on Apothem
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x8E1Fd433627b4b4AC1c8731CE0a4837419DE44Ab";

/// XyraChain - decentralized chest X-ray analysis client
#[derive(Parser, Debug, Clone)]
#[command(name = "xyrachain")]
#[command(about = "Chest X-ray analysis with IPFS reports anchored on XDC Apothem")]
pub struct Args {
    /// Inference / report backend base URL
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:5000")]
    pub backend_url: String,

    /// Triage chat backend base URL
    #[arg(long, env = "TRIAGE_URL", default_value = "http://localhost:8000")]
    pub triage_url: String,

    /// JSON-RPC endpoint of the test network
    #[arg(long, env = "APOTHEM_RPC_URL", default_value = "https://erpc.apothem.network")]
    pub rpc_url: String,

    /// Hex-encoded secp256k1 key used by the local wallet
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Deployed XyraChain contract address
    #[arg(long, env = "CONTRACT_ADDRESS", default_value = DEFAULT_CONTRACT_ADDRESS)]
    pub contract_address: String,

    /// Chain id the mint flow requires
    #[arg(long, env = "CHAIN_ID", default_value = "51")]
    pub chain_id: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in milliseconds (unset: no timeout)
    #[arg(long, env = "REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Delay after a successful chain switch before transacting
    #[arg(long, env = "CHAIN_SWITCH_SETTLE_MS", default_value = "1000")]
    pub chain_switch_settle_ms: u64,

    /// Interval between transaction receipt polls
    #[arg(long, env = "CONFIRMATION_POLL_MS", default_value = "2000")]
    pub confirmation_poll_ms: u64,

    /// Receipt polls before giving up on confirmation
    #[arg(long, env = "CONFIRMATION_MAX_POLLS", default_value = "90")]
    pub confirmation_max_polls: u32,

    /// Idle seconds before a gateway session expires
    #[arg(long, env = "SESSION_TTL_SECS", default_value = "3600")]
    pub session_ttl_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// What to run
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Address to listen on
        #[arg(long, env = "LISTEN", default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },

    /// Analyze one X-ray image
    Analyze {
        /// Image file to upload
        file: PathBuf,

        /// Write a PDF report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Pin the report and record it on-chain
        #[arg(long)]
        mint: bool,
    },

    /// Ask the health assistant a question
    Chat {
        message: String,
    },

    /// Send a symptom description to the triage assistant
    Triage {
        message: String,
    },

    /// List reports recorded on-chain for the wallet account
    Reports,

    /// Show the patient vault
    Vault,

    /// Show the patient profile
    Profile,

    /// Deploy the contract from a compiled artifact
    Deploy {
        /// Artifact JSON with a `bytecode` field
        artifact: PathBuf,
    },

    /// Exercise the deployed contract (read, add test report, read again)
    Verify,
}

impl Args {
    /// Optional request timeout
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn chain_switch_settle(&self) -> Duration {
        Duration::from_millis(self.chain_switch_settle_ms)
    }

    pub fn confirmation_poll(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// True for commands that sign transactions or need an account
    pub fn needs_wallet(&self) -> bool {
        match &self.command {
            Command::Analyze { mint, .. } => *mint,
            Command::Reports | Command::Deploy { .. } | Command::Verify => true,
            _ => false,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in [
            ("BACKEND_URL", &self.backend_url),
            ("TRIAGE_URL", &self.triage_url),
            ("APOTHEM_RPC_URL", &self.rpc_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(format!("{} is not a valid URL: {}", name, url));
            }
        }

        if !is_hex_of_len(&self.contract_address, 20) {
            return Err(format!(
                "CONTRACT_ADDRESS must be a 20-byte hex address, got {}",
                self.contract_address
            ));
        }

        match &self.private_key {
            Some(key) if !is_hex_of_len(key, 32) => {
                return Err("PRIVATE_KEY must be 32 bytes of hex".to_string());
            }
            None if self.needs_wallet() => {
                return Err("PRIVATE_KEY is required for this command".to_string());
            }
            _ => {}
        }

        if self.confirmation_max_polls == 0 {
            return Err("CONFIRMATION_MAX_POLLS must be at least 1".to_string());
        }

        if self.session_ttl_secs == 0 {
            return Err("SESSION_TTL_SECS must be at least 1".to_string());
        }

        Ok(())
    }
}

fn is_hex_of_len(value: &str, bytes: usize) -> bool {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    digits.len() == bytes * 2 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("xyrachain").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_validate() {
        let args = parse(&["vault"]);
        assert_eq!(args.backend_url, "http://localhost:5000");
        assert_eq!(args.chain_id, 51);
        assert!(args.request_timeout().is_none());
        assert_eq!(args.session_ttl(), Duration::from_secs(3600));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_mint_requires_key() {
        let args = parse(&["analyze", "scan.png", "--mint"]);
        assert!(args.needs_wallet());
        assert!(args.validate().unwrap_err().contains("PRIVATE_KEY"));
    }

    #[test]
    fn test_rejects_bad_contract_address() {
        let args = parse(&["--contract-address", "0x1234", "profile"]);
        assert!(args.validate().unwrap_err().contains("CONTRACT_ADDRESS"));
    }

    #[test]
    fn test_rejects_short_key() {
        let args = parse(&["--private-key", "0xdeadbeef", "chat", "hi"]);
        assert!(args.validate().is_err());
    }
}
