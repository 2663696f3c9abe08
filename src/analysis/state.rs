//! Analysis workflow states and the transitions between them

use serde::Serialize;

use super::image::ImageFile;
use super::result::AnalysisResult;
use crate::types::{Result, XyraError};

/// Where one analysis attempt stands
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisState {
    Idle { file: Option<ImageFile> },
    Uploading { file: ImageFile },
    Processing { file: ImageFile },
    Complete { file: ImageFile, result: AnalysisResult },
}

impl Default for AnalysisState {
    fn default() -> Self {
        AnalysisState::Idle { file: None }
    }
}

impl AnalysisState {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisState::Idle { .. } => "idle",
            AnalysisState::Uploading { .. } => "uploading",
            AnalysisState::Processing { .. } => "processing",
            AnalysisState::Complete { .. } => "complete",
        }
    }

    pub fn file(&self) -> Option<&ImageFile> {
        match self {
            AnalysisState::Idle { file } => file.as_ref(),
            AnalysisState::Uploading { file }
            | AnalysisState::Processing { file }
            | AnalysisState::Complete { file, .. } => Some(file),
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisState::Complete { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            AnalysisState::Uploading { .. } | AnalysisState::Processing { .. }
        )
    }

    /// Choose a new file; drops any previous result
    pub fn select_file(&mut self, file: ImageFile) -> Result<()> {
        if self.is_in_flight() {
            return Err(XyraError::transition(self.name(), "select a file"));
        }
        *self = AnalysisState::Idle { file: Some(file) };
        Ok(())
    }

    /// Drop the selected file; only while idle or complete
    pub fn clear_file(&mut self) -> Result<()> {
        if self.is_in_flight() {
            return Err(XyraError::transition(self.name(), "clear the file"));
        }
        *self = AnalysisState::default();
        Ok(())
    }

    /// `Idle{file}` → `Uploading`; returns the file to send
    pub fn begin_upload(&mut self) -> Result<ImageFile> {
        match self {
            AnalysisState::Idle { file: Some(file) } => {
                let file = file.clone();
                *self = AnalysisState::Uploading { file: file.clone() };
                Ok(file)
            }
            AnalysisState::Idle { file: None } => Err(XyraError::Validation(
                "Select an image before starting the analysis".to_string(),
            )),
            other => Err(XyraError::transition(other.name(), "start an analysis")),
        }
    }

    /// `Uploading` → `Processing`
    pub fn begin_processing(&mut self) -> Result<()> {
        match self {
            AnalysisState::Uploading { file } => {
                *self = AnalysisState::Processing { file: file.clone() };
                Ok(())
            }
            other => Err(XyraError::transition(other.name(), "process")),
        }
    }

    /// `Uploading`/`Processing` → `Complete`
    pub fn complete(&mut self, result: AnalysisResult) -> Result<()> {
        match self {
            AnalysisState::Uploading { file } | AnalysisState::Processing { file } => {
                *self = AnalysisState::Complete {
                    file: file.clone(),
                    result,
                };
                Ok(())
            }
            other => Err(XyraError::transition(other.name(), "complete")),
        }
    }

    /// Back to `Idle`, keeping the selected file
    pub fn fail(&mut self) {
        let file = self.file().cloned();
        *self = AnalysisState::Idle { file };
    }

    pub fn reset(&mut self) {
        *self = AnalysisState::default();
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        AnalysisSnapshot {
            status: self.name(),
            file_name: self.file().map(|f| f.name.clone()),
            file_size_mb: self.file().map(ImageFile::size_mb),
            result: self.result().cloned(),
        }
    }
}

/// Serializable view of the state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub status: &'static str,
    pub file_name: Option<String>,
    pub file_size_mb: Option<String>,
    pub result: Option<AnalysisResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Confidence, Diagnosis};

    fn image() -> ImageFile {
        ImageFile::new("scan.png", "image/png", vec![1u8, 2, 3]).unwrap()
    }

    fn result() -> AnalysisResult {
        AnalysisResult {
            diagnosis: Diagnosis::Normal,
            confidence: Confidence::from_percent(97.0),
            heatmap: "http://h/x.png".to_string(),
        }
    }

    #[test]
    fn test_full_cycle() {
        let mut state = AnalysisState::default();
        state.select_file(image()).unwrap();
        assert_eq!(state.begin_upload().unwrap(), image());
        state.begin_processing().unwrap();
        state.complete(result()).unwrap();
        assert_eq!(state.name(), "complete");
        assert_eq!(state.result(), Some(&result()));

        state.reset();
        assert_eq!(state, AnalysisState::Idle { file: None });
    }

    #[test]
    fn test_submit_without_file_is_validation_error() {
        let mut state = AnalysisState::default();
        assert!(matches!(state.begin_upload(), Err(XyraError::Validation(_))));
    }

    #[test]
    fn test_in_flight_rejects_changes() {
        let mut state = AnalysisState::default();
        state.select_file(image()).unwrap();
        state.begin_upload().unwrap();

        assert!(matches!(
            state.begin_upload(),
            Err(XyraError::InvalidTransition { .. })
        ));
        assert!(matches!(
            state.select_file(image()),
            Err(XyraError::InvalidTransition { .. })
        ));
        assert!(state.clear_file().is_err());
    }

    #[test]
    fn test_fail_keeps_file() {
        let mut state = AnalysisState::default();
        state.select_file(image()).unwrap();
        state.begin_upload().unwrap();
        state.fail();
        assert_eq!(state, AnalysisState::Idle { file: Some(image()) });
    }

    #[test]
    fn test_new_file_drops_result() {
        let mut state = AnalysisState::Complete {
            file: image(),
            result: result(),
        };
        let other = ImageFile::new("b.jpg", "image/jpeg", vec![9u8]).unwrap();
        state.select_file(other.clone()).unwrap();
        assert!(state.result().is_none());
        assert_eq!(state.file(), Some(&other));
    }

    #[test]
    fn test_snapshot() {
        let snap = AnalysisState::Complete {
            file: image(),
            result: result(),
        }
        .snapshot();
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["fileName"], "scan.png");
        assert_eq!(json["result"]["diagnosis"], "NORMAL");
    }
}
