//! Patient vault and profile views.
//!
//! The vault and profile show fixed demo data. On-chain reports of the
//! connected account can be turned into vault records for the `reports`
//! listing.

use serde::Serialize;

use crate::chain::{shorten_address, NetworkParams, OnChainReport};

/// One row of the vault table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    pub id: u32,
    pub date: String,
    pub diagnosis: String,
    pub confidence: u64,
    pub tx_hash: String,
    pub ipfs_cid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl VaultRecord {
    /// `#0001` style identifier
    pub fn display_id(&self) -> String {
        format!("#{:04}", self.id)
    }

    pub fn is_normal(&self) -> bool {
        self.diagnosis.eq_ignore_ascii_case("normal")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStats {
    pub total_records: u32,
    pub health_score: String,
    pub network: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub stats: VaultStats,
    pub records: Vec<VaultRecord>,
}

fn preview(photo: &str) -> Option<String> {
    Some(format!(
        "https://images.unsplash.com/{}?auto=format&fit=crop&q=80&w=300&h=300",
        photo
    ))
}

fn record(
    id: u32,
    date: &str,
    diagnosis: &str,
    confidence: u64,
    tx_hash: &str,
    ipfs_cid: &str,
    photo: &str,
) -> VaultRecord {
    VaultRecord {
        id,
        date: date.to_string(),
        diagnosis: diagnosis.to_string(),
        confidence,
        tx_hash: tx_hash.to_string(),
        ipfs_cid: ipfs_cid.to_string(),
        preview: preview(photo),
    }
}

/// Demo vault contents
pub fn mock_vault() -> Vault {
    Vault {
        stats: VaultStats {
            total_records: 12,
            health_score: "94/100".to_string(),
            network: "XDC Apothem".to_string(),
        },
        records: vec![
            record(
                1,
                "2024-03-08",
                "Pneumonia",
                94,
                "0x7129...8921",
                "QmXyZ...9abc",
                "photo-1530497610245-94d3c16cda28",
            ),
            record(
                2,
                "2024-02-15",
                "Normal",
                98,
                "0x8231...1120",
                "QmBaC...7xyz",
                "photo-1579154204601-01588f351e67",
            ),
            record(
                3,
                "2024-01-22",
                "Normal",
                97,
                "0x9912...3341",
                "QmDeF...2mno",
                "photo-1584036561566-b93a50208c3c",
            ),
        ],
    }
}

/// Vault rows for reports read from the contract. The contract does not
/// keep transaction hashes, so that column is empty.
pub fn records_from_chain(reports: &[OnChainReport]) -> Vec<VaultRecord> {
    reports
        .iter()
        .enumerate()
        .map(|(i, report)| VaultRecord {
            id: i as u32 + 1,
            date: report.timestamp.format("%Y-%m-%d").to_string(),
            diagnosis: report.diagnosis.clone(),
            confidence: report.confidence,
            tx_hash: String::new(),
            ipfs_cid: report.ipfs_hash.clone(),
            preview: None,
        })
        .collect()
}

/// Explorer page for a transaction on Apothem
pub fn explorer_link(tx_hash: &str) -> String {
    NetworkParams::apothem()
        .tx_url(tx_hash)
        .unwrap_or_else(|| tx_hash.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileNetwork {
    pub name: String,
    pub chain_id: u64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_reports: u32,
    pub ai_accuracy: f64,
    pub last_scan_date: String,
    pub storage_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub address: String,
    pub short_address: String,
    pub balance: String,
    pub network: ProfileNetwork,
    pub stats: ProfileStats,
}

/// Demo profile
pub fn mock_profile() -> Profile {
    let address = "xdc742d35Cc6634C0532925a3b844Bc454e4438f44e".to_string();
    Profile {
        short_address: shorten_address(&address),
        address,
        balance: "1,245.50".to_string(),
        network: ProfileNetwork {
            name: "XDC Apothem Testnet".to_string(),
            chain_id: 51,
            status: "connected".to_string(),
        },
        stats: ProfileStats {
            total_reports: 42,
            ai_accuracy: 94.8,
            last_scan_date: "2024-03-08".to_string(),
            storage_used: "145 MB".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_mock_vault() {
        let vault = mock_vault();
        assert_eq!(vault.records.len(), 3);
        assert_eq!(vault.stats.total_records, 12);
        assert_eq!(vault.records[0].display_id(), "#0001");
        assert!(!vault.records[0].is_normal());
        assert!(vault.records[1].is_normal());
        assert!(vault.records[2]
            .preview
            .as_deref()
            .unwrap()
            .contains("photo-1584036561566-b93a50208c3c"));
    }

    #[test]
    fn test_explorer_link() {
        assert_eq!(
            explorer_link("0x7129...8921"),
            "https://apothem.xdcscan.io/tx/0x7129...8921"
        );
    }

    #[test]
    fn test_mock_profile() {
        let profile = mock_profile();
        assert_eq!(profile.short_address, "xdc742...f44e");
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["network"]["chainId"], 51);
        assert_eq!(json["stats"]["aiAccuracy"], 94.8);
    }

    #[test]
    fn test_records_from_chain() {
        let reports = vec![OnChainReport {
            ipfs_hash: "QmTestHash123456789".to_string(),
            diagnosis: "NORMAL".to_string(),
            confidence: 95,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap(),
        }];
        let records = records_from_chain(&reports);
        assert_eq!(records[0].date, "2024-03-08");
        assert_eq!(records[0].ipfs_cid, "QmTestHash123456789");
        assert_eq!(records[0].display_id(), "#0001");
    }
}
