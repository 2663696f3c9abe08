//! X-ray analysis: image selection, backend inference and the result state

pub mod image;
pub mod result;
pub mod state;
pub mod workflow;

pub use image::ImageFile;
pub use result::{normalize_heatmap, AnalysisResult, Confidence, Diagnosis};
pub use state::{AnalysisSnapshot, AnalysisState};
pub use workflow::{AnalysisWorkflow, MintGuard};
