//! Analysis outcome and the derived values shown to users

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label returned by the model. Unknown labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Diagnosis {
    Pneumonia,
    Normal,
    Other(String),
}

impl Diagnosis {
    pub fn as_str(&self) -> &str {
        match self {
            Diagnosis::Pneumonia => "PNEUMONIA",
            Diagnosis::Normal => "NORMAL",
            Diagnosis::Other(label) => label,
        }
    }
}

impl From<String> for Diagnosis {
    fn from(label: String) -> Self {
        match label.as_str() {
            "PNEUMONIA" => Diagnosis::Pneumonia,
            "NORMAL" => Diagnosis::Normal,
            _ => Diagnosis::Other(label),
        }
    }
}

impl From<&str> for Diagnosis {
    fn from(label: &str) -> Self {
        Diagnosis::from(label.to_string())
    }
}

impl From<Diagnosis> for String {
    fn from(d: Diagnosis) -> Self {
        d.as_str().to_string()
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage in `0..=100`, rounded to two decimals
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// From the backend's `0..=1` fraction
    pub fn from_fraction(fraction: f64) -> Self {
        Self::from_percent(fraction * 100.0)
    }

    pub fn from_percent(percent: f64) -> Self {
        Self(round2(percent.clamp(0.0, 100.0)))
    }

    pub fn percent(&self) -> f64 {
        self.0
    }

    /// Integer value written to the contract
    pub fn floor(&self) -> u64 {
        self.0.floor() as u64
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Result of one successful upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub diagnosis: Diagnosis,
    pub confidence: Confidence,
    /// Absolute heat-map URL
    pub heatmap: String,
}

impl AnalysisResult {
    /// Probability of pneumonia as printed in the report
    pub fn pneumonia_probability(&self) -> String {
        match self.diagnosis {
            Diagnosis::Pneumonia => self.confidence.to_string(),
            _ => format!("{:.2}", round2(100.0 - self.confidence.percent())),
        }
    }
}

/// Resolve the heat-map locator against the backend.
///
/// Locators with a scheme pass through; anything else is reduced to its last
/// path segment (either separator) under `{backend}/uploads/`.
pub fn normalize_heatmap(locator: &str, backend_url: &str) -> String {
    if locator.starts_with("http") {
        return locator.to_string();
    }
    let filename = locator.rsplit(['/', '\\']).next().unwrap_or(locator);
    format!("{}/uploads/{}", backend_url.trim_end_matches('/'), filename)
}
