//! Solidity ABI encoding for the XyraChain contract
//!
//! Only the shapes the contract uses are supported: `uint256`, `address`,
//! `string` and the `(string,string,uint256,uint256)[]` that
//! `getMyReports()` returns.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use super::{keccak256, Address};
use crate::types::{Result, XyraError};

pub const ADD_REPORT_SIGNATURE: &str = "addReport(string,string,uint256)";
pub const GET_MY_REPORTS_SIGNATURE: &str = "getMyReports()";

const WORD: usize = 32;

/// An ABI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address(Address),
    String(String),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_))
    }
}

/// A report as stored by the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainReport {
    pub ipfs_hash: String,
    pub diagnosis: String,
    pub confidence: u64,
    pub timestamp: DateTime<Utc>,
}

/// First four bytes of the keccak hash of a function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode a tuple of tokens (head/tail layout)
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
        }
        match token {
            Token::Uint(v) => head.extend_from_slice(&uint_word(*v)),
            Token::Address(a) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(a.as_bytes());
                head.extend_from_slice(&word);
            }
            Token::String(s) => {
                tail.extend_from_slice(&uint_word(s.len() as u128));
                tail.extend_from_slice(s.as_bytes());
                let padding = (WORD - s.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Selector followed by encoded arguments
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&encode(tokens));
    data
}

/// Calldata for `addReport(ipfsHash, diagnosis, confidence)`
pub fn encode_add_report(ipfs_hash: &str, diagnosis: &str, confidence: u64) -> Vec<u8> {
    encode_call(
        ADD_REPORT_SIGNATURE,
        &[
            Token::String(ipfs_hash.to_string()),
            Token::String(diagnosis.to_string()),
            Token::Uint(confidence as u128),
        ],
    )
}

/// Calldata for `getMyReports()`
pub fn encode_get_my_reports() -> Vec<u8> {
    selector(GET_MY_REPORTS_SIGNATURE).to_vec()
}

/// Decode the return data of `getMyReports()`
pub fn decode_reports(data: &[u8]) -> Result<Vec<OnChainReport>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let array_start = read_usize(data, 0)?;
    let count = read_usize(data, array_start)?;
    let elements = array_start + WORD;

    let mut reports = Vec::with_capacity(count.min(1024));
    for i in 0..count {
        let tuple_start = elements + read_usize(data, elements + i * WORD)?;
        let ipfs_hash = read_string(data, tuple_start + read_usize(data, tuple_start)?)?;
        let diagnosis = read_string(data, tuple_start + read_usize(data, tuple_start + WORD)?)?;
        let confidence = read_u128(data, tuple_start + 2 * WORD)?;
        let timestamp = read_u128(data, tuple_start + 3 * WORD)?;

        let confidence = u64::try_from(confidence)
            .map_err(|_| XyraError::Abi(format!("confidence out of range: {}", confidence)))?;
        let timestamp = i64::try_from(timestamp)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or_else(|| XyraError::Abi(format!("invalid timestamp: {}", timestamp)))?;

        reports.push(OnChainReport {
            ipfs_hash,
            diagnosis,
            confidence,
            timestamp,
        });
    }

    Ok(reports)
}

/// Encode reports the way `getMyReports()` returns them
pub fn encode_reports(reports: &[OnChainReport]) -> Vec<u8> {
    let tuples: Vec<Vec<u8>> = reports
        .iter()
        .map(|r| {
            encode(&[
                Token::String(r.ipfs_hash.clone()),
                Token::String(r.diagnosis.clone()),
                Token::Uint(r.confidence as u128),
                Token::Uint(r.timestamp.timestamp().max(0) as u128),
            ])
        })
        .collect();

    let mut data = uint_word(WORD as u128).to_vec();
    data.extend_from_slice(&uint_word(tuples.len() as u128));
    let mut offset = tuples.len() * WORD;
    for tuple in &tuples {
        data.extend_from_slice(&uint_word(offset as u128));
        offset += tuple.len();
    }
    for tuple in tuples {
        data.extend_from_slice(&tuple);
    }
    data
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8]> {
    data.get(offset..offset + WORD)
        .ok_or_else(|| XyraError::Abi(format!("truncated data at offset {}", offset)))
}

fn read_u128(data: &[u8], offset: usize) -> Result<u128> {
    let word = word_at(data, offset)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(XyraError::Abi(format!("value at offset {} exceeds 128 bits", offset)));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(buf))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize> {
    let value = read_u128(data, offset)?;
    let value = usize::try_from(value)
        .map_err(|_| XyraError::Abi(format!("offset too large: {}", value)))?;
    if value > data.len() {
        return Err(XyraError::Abi(format!("offset {} beyond data", value)));
    }
    Ok(value)
}

fn read_string(data: &[u8], offset: usize) -> Result<String> {
    let len = read_usize(data, offset)?;
    let start = offset + WORD;
    let bytes = data
        .get(start..start + len)
        .ok_or_else(|| XyraError::Abi(format!("truncated string at offset {}", offset)))?;
    String::from_utf8(bytes.to_vec()).map_err(|e| XyraError::Abi(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-assembled `getMyReports()` return value for one report
    fn encoded_single_report() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&uint_word(0x20)); // array offset
        data.extend_from_slice(&uint_word(1)); // length
        data.extend_from_slice(&uint_word(0x20)); // tuple offset (relative to elements)
        // tuple head
        data.extend_from_slice(&uint_word(0x80)); // ipfsHash offset
        data.extend_from_slice(&uint_word(0xc0)); // diagnosis offset
        data.extend_from_slice(&uint_word(95));
        data.extend_from_slice(&uint_word(1_709_856_000));
        // ipfsHash
        data.extend_from_slice(&uint_word(19));
        let mut s = b"QmTestHash123456789".to_vec();
        s.resize(32, 0);
        data.extend_from_slice(&s);
        // diagnosis
        data.extend_from_slice(&uint_word(9));
        let mut d = b"PNEUMONIA".to_vec();
        d.resize(32, 0);
        data.extend_from_slice(&d);
        data
    }

    #[test]
    fn test_known_selector() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn test_encode_add_report_layout() {
        let data = encode_add_report("QmHash", "NORMAL", 97);
        assert_eq!(&data[..4], &selector(ADD_REPORT_SIGNATURE));

        let args = &data[4..];
        // head: two offsets and the uint
        assert_eq!(read_u128(args, 0).unwrap(), 0x60);
        assert_eq!(read_u128(args, 32).unwrap(), 0xa0);
        assert_eq!(read_u128(args, 64).unwrap(), 97);
        assert_eq!(read_string(args, 0x60).unwrap(), "QmHash");
        assert_eq!(read_string(args, 0xa0).unwrap(), "NORMAL");
        assert_eq!(args.len(), 32 * 7);
    }

    #[test]
    fn test_decode_single_report() {
        let reports = decode_reports(&encoded_single_report()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].ipfs_hash, "QmTestHash123456789");
        assert_eq!(reports[0].diagnosis, "PNEUMONIA");
        assert_eq!(reports[0].confidence, 95);
        assert_eq!(reports[0].timestamp.timestamp(), 1_709_856_000);
    }

    #[test]
    fn test_encode_reports_matches_contract_layout() {
        let reports = decode_reports(&encoded_single_report()).unwrap();
        assert_eq!(encode_reports(&reports), encoded_single_report());

        let two = vec![reports[0].clone(), reports[0].clone()];
        assert_eq!(decode_reports(&encode_reports(&two)).unwrap(), two);
    }

    #[test]
    fn test_decode_empty_array() {
        let mut data = uint_word(0x20).to_vec();
        data.extend_from_slice(&uint_word(0));
        assert!(decode_reports(&data).unwrap().is_empty());
        assert!(decode_reports(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_truncated_fails() {
        let data = encoded_single_report();
        assert!(decode_reports(&data[..data.len() - 40]).is_err());
    }
}
