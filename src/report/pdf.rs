//! PDF rendering of a report layout

use printpdf::image_crate::{self, DynamicImage};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, Line, Mm, PdfDocument, PdfLayerReference, Point,
    Rgb,
};
use tracing::warn;

use super::layout::{Element, ImageSlot, Rgb8, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use crate::types::{Result, XyraError};

const IMAGE_DPI: f32 = 300.0;

fn pdf_error(err: impl std::fmt::Debug) -> XyraError {
    XyraError::Report(format!("{:?}", err))
}

fn color(c: Rgb8) -> Color {
    Color::Rgb(Rgb::new(
        c.0 as f32 / 255.0,
        c.1 as f32 / 255.0,
        c.2 as f32 / 255.0,
        None,
    ))
}

/// Template y (from top) to PDF y (from bottom)
fn flip(y_mm: f32) -> Mm {
    Mm(PAGE_HEIGHT_MM - y_mm)
}

/// Decode image bytes into something the PDF can embed
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image_crate::load_from_memory(bytes)
        .map_err(|e| XyraError::Report(format!("cannot decode image: {}", e)))?;
    // Embedded as RGB; alpha is dropped
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// Render `elements` onto one A4 page
pub fn render(
    title: &str,
    elements: &[Element],
    original: Option<&DynamicImage>,
    heatmap: Option<&DynamicImage>,
) -> Result<Vec<u8>> {
    let (doc, page, layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;

    for element in elements {
        match element {
            Element::Text {
                text,
                size,
                x,
                y,
                color: c,
            } => {
                layer.set_fill_color(color(*c));
                layer.use_text(text.as_str(), *size, Mm(*x), flip(*y), &font);
            }
            Element::Rule {
                x1,
                x2,
                y,
                thickness,
                color: c,
            } => {
                layer.set_outline_color(color(*c));
                layer.set_outline_thickness(*thickness);
                layer.add_line(Line {
                    points: vec![
                        (Point::new(Mm(*x1), flip(*y)), false),
                        (Point::new(Mm(*x2), flip(*y)), false),
                    ],
                    is_closed: false,
                });
            }
            Element::Image {
                slot,
                x,
                y,
                width,
                height,
            } => {
                let source = match slot {
                    ImageSlot::Original => original,
                    ImageSlot::Heatmap => heatmap,
                };
                match source {
                    Some(image) => place_image(&layer, image, *x, *y, *width, *height),
                    None => warn!("No decoded image for {:?}; slot left empty", slot),
                }
            }
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

/// Scale `image` into a `width` x `height` mm box whose top-left is `(x, y)`
fn place_image(
    layer: &PdfLayerReference,
    image: &DynamicImage,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) {
    let natural_w = image.width().max(1) as f32 * 25.4 / IMAGE_DPI;
    let natural_h = image.height().max(1) as f32 * 25.4 / IMAGE_DPI;

    Image::from_dynamic_image(image).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(flip(y + height)),
            scale_x: Some(width / natural_w),
            scale_y: Some(height / natural_h),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip() {
        assert_eq!(flip(20.0).0, 277.0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(XyraError::Report(_))
        ));
    }

    #[test]
    fn test_render_text_only() {
        let elements = vec![Element::Text {
            text: "Hello".to_string(),
            size: 12.0,
            x: 20.0,
            y: 20.0,
            color: Rgb8::gray(0),
        }];
        let bytes = render("Test", &elements, None, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
