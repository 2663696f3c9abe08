//! Fixed A4 report template.
//!
//! Coordinates are millimetres from the top-left corner of the page; the
//! renderer flips them into PDF space.

use chrono::{DateTime, Utc};

use crate::analysis::AnalysisResult;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

const MARGIN_X: f32 = 20.0;
const IMAGE_Y: f32 = 85.0;
const IMAGE_WIDTH: f32 = 80.0;
const IMAGE_HEIGHT: f32 = 100.0;
const RESULTS_Y: f32 = 200.0;

pub const MODEL_ARCHITECTURE: &str = "CheXNet-v2 (CNN)";
pub const TRAINING_DATASET: &str = "Kermany Chest X-Ray Data";
pub const DISCLAIMER: &str =
    "Disclaimer: This report is generated by an AI model and should not replace professional medical advice.";
pub const COPYRIGHT: &str = "XyraChain Decentralized Health Network (c) 2024";

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb8(pub u8, pub u8, pub u8);

impl Rgb8 {
    pub const fn gray(level: u8) -> Self {
        Rgb8(level, level, level)
    }
}

const INDIGO: Rgb8 = Rgb8(79, 70, 229);
const BLACK: Rgb8 = Rgb8::gray(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Original,
    Heatmap,
}

/// One drawing instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        text: String,
        size: f32,
        x: f32,
        y: f32,
        color: Rgb8,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        thickness: f32,
        color: Rgb8,
    },
    Image {
        slot: ImageSlot,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Everything the template prints
pub struct ReportContext<'a> {
    pub result: &'a AnalysisResult,
    pub file_name: &'a str,
    pub file_size_mb: &'a str,
    pub account: Option<&'a str>,
    pub generated_at: DateTime<Utc>,
    pub analysis_id: i64,
    pub original_available: bool,
    pub heatmap_available: bool,
}

fn text(text: impl Into<String>, size: f32, x: f32, y: f32, color: Rgb8) -> Element {
    Element::Text {
        text: text.into(),
        size,
        x,
        y,
        color,
    }
}

pub fn layout(ctx: &ReportContext<'_>) -> Vec<Element> {
    let meta = Rgb8::gray(100);
    let mut elements = vec![
        text("XyraChain Medical AI Report", 22.0, MARGIN_X, 20.0, INDIGO),
        text(
            format!(
                "Generated on: {}",
                ctx.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            10.0,
            MARGIN_X,
            30.0,
            meta,
        ),
        text(
            format!("Patient ID (Wallet): {}", ctx.account.unwrap_or("Anonymous")),
            10.0,
            MARGIN_X,
            35.0,
            meta,
        ),
        text(
            format!("Analysis ID: {}", ctx.analysis_id),
            10.0,
            MARGIN_X,
            40.0,
            meta,
        ),
        Element::Rule {
            x1: MARGIN_X,
            x2: 190.0,
            y: 45.0,
            thickness: 0.5,
            color: Rgb8::gray(200),
        },
        text("Input Data", 14.0, MARGIN_X, 55.0, BLACK),
        text(format!("File Name: {}", ctx.file_name), 10.0, MARGIN_X, 62.0, meta),
        text(format!("Size: {} MB", ctx.file_size_mb), 10.0, MARGIN_X, 67.0, meta),
    ];

    let slots = [
        (ImageSlot::Original, "Original X-Ray Scan:", MARGIN_X, ctx.original_available),
        (
            ImageSlot::Heatmap,
            "AI Attention Heatmap (Grad-CAM):",
            110.0,
            ctx.heatmap_available,
        ),
    ];
    for (slot, label, x, available) in slots {
        elements.push(text(label, 10.0, x, 80.0, BLACK));
        if available {
            elements.push(Element::Image {
                slot,
                x,
                y: IMAGE_Y,
                width: IMAGE_WIDTH,
                height: IMAGE_HEIGHT,
            });
        } else {
            elements.push(text("(Image could not be loaded)", 10.0, x, IMAGE_Y + 5.0, meta));
        }
    }

    let body = Rgb8::gray(50);
    elements.extend([
        text("Analysis Results", 14.0, MARGIN_X, RESULTS_Y, BLACK),
        text(
            format!("Model Assessment: {}", ctx.result.diagnosis),
            12.0,
            MARGIN_X,
            RESULTS_Y + 10.0,
            body,
        ),
        text(
            format!(
                "Pneumonia Probability: {}%",
                ctx.result.pneumonia_probability()
            ),
            12.0,
            MARGIN_X,
            RESULTS_Y + 18.0,
            body,
        ),
        text(
            format!("Model Architecture: {}", MODEL_ARCHITECTURE),
            12.0,
            MARGIN_X,
            RESULTS_Y + 26.0,
            body,
        ),
        text(
            format!("Training Dataset: {}", TRAINING_DATASET),
            12.0,
            MARGIN_X,
            RESULTS_Y + 34.0,
            body,
        ),
        text(DISCLAIMER, 8.0, MARGIN_X, 280.0, Rgb8::gray(150)),
        text(COPYRIGHT, 8.0, MARGIN_X, 285.0, Rgb8::gray(150)),
    ]);

    elements
}

/// `XyraChain_Report_{millis}.pdf`
pub fn file_name(analysis_id: i64) -> String {
    format!("XyraChain_Report_{}.pdf", analysis_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Confidence, Diagnosis};
    use chrono::TimeZone;

    fn texts(elements: &[Element]) -> Vec<String> {
        elements
            .iter()
            .filter_map(|e| match e {
                Element::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn context<'a>(result: &'a AnalysisResult, account: Option<&'a str>) -> ReportContext<'a> {
        ReportContext {
            result,
            file_name: "scan.png",
            file_size_mb: "0.25",
            account,
            generated_at: Utc.with_ymd_and_hms(2024, 3, 8, 10, 30, 0).unwrap(),
            analysis_id: 1_709_893_800_000,
            original_available: true,
            heatmap_available: true,
        }
    }

    #[test]
    fn test_normal_report_text() {
        let result = AnalysisResult {
            diagnosis: Diagnosis::Normal,
            confidence: Confidence::from_percent(95.0),
            heatmap: String::new(),
        };
        let lines = texts(&layout(&context(&result, None)));

        assert!(lines.contains(&"Patient ID (Wallet): Anonymous".to_string()));
        assert!(lines.contains(&"Model Assessment: NORMAL".to_string()));
        assert!(lines.contains(&"Pneumonia Probability: 5.00%".to_string()));
        assert!(lines.contains(&"Size: 0.25 MB".to_string()));
        assert!(lines.contains(&"Analysis ID: 1709893800000".to_string()));
        assert!(lines.contains(&"Generated on: 2024-03-08 10:30:00 UTC".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some(COPYRIGHT));
    }

    #[test]
    fn test_images_side_by_side() {
        let result = AnalysisResult {
            diagnosis: Diagnosis::Pneumonia,
            confidence: Confidence::from_percent(95.0),
            heatmap: String::new(),
        };
        let elements = layout(&context(&result, Some("0xabc")));
        let images: Vec<_> = elements
            .iter()
            .filter_map(|e| match e {
                Element::Image { slot, x, width, height, .. } => Some((*slot, *x, *width, *height)),
                _ => None,
            })
            .collect();
        assert_eq!(
            images,
            vec![
                (ImageSlot::Original, 20.0, 80.0, 100.0),
                (ImageSlot::Heatmap, 110.0, 80.0, 100.0)
            ]
        );
        assert!(texts(&elements).contains(&"Pneumonia Probability: 95.00%".to_string()));
    }

    #[test]
    fn test_missing_image_gets_placeholder() {
        let result = AnalysisResult {
            diagnosis: Diagnosis::Pneumonia,
            confidence: Confidence::from_percent(90.0),
            heatmap: String::new(),
        };
        let mut ctx = context(&result, None);
        ctx.heatmap_available = false;
        let elements = layout(&ctx);

        let image_count = elements
            .iter()
            .filter(|e| matches!(e, Element::Image { .. }))
            .count();
        assert_eq!(image_count, 1);
        assert!(texts(&elements).contains(&"(Image could not be loaded)".to_string()));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(42), "XyraChain_Report_42.pdf");
    }
}
