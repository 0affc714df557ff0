//! PDF output for laid-out documents.
//!
//! Each [`Page`] becomes one printpdf page with a single layer. Draw ops map
//! onto layer calls: text uses the built-in Helvetica faces, shapes become
//! lines and polygons, and raster slices are embedded as RGB image XObjects.
//! Layout coordinates are millimetres from the top-left corner, printpdf's
//! are from the bottom-left, so every y is flipped against the page height.

use crate::error::PdfError;
use crate::layout::document::{DrawOp, MM_PER_PT, approx_text_width};
use crate::layout::{Document, Page, Stroke, TextAlign};
use image::{DynamicImage, RgbImage, RgbaImage};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, CustomPdfConformance, Image, ImageTransform, IndirectFontRef, Line, Mm,
    PdfConformance, PdfDocument, PdfLayerReference, Point, Polygon, Rgb,
};
use std::io::BufWriter;

/// Resolution images are embedded at before scaling to their box.
const IMAGE_DPI: f32 = 300.0;

/// Straight segments used to approximate a circle.
const CIRCLE_SEGMENTS: usize = 32;

const LAYER_NAME: &str = "Content";

/// Metadata written to the document info dictionary.
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    pub producer: String,
}

impl Default for PdfMetadata {
    fn default() -> Self {
        Self {
            producer: "AuthenticX".to_string(),
        }
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn encode_err(e: impl std::fmt::Display) -> PdfError {
    PdfError::Encode(e.to_string())
}

/// Serialize `doc` to PDF bytes.
pub fn serialize(doc: &Document, meta: &PdfMetadata) -> Result<Vec<u8>, PdfError> {
    if doc.pages.is_empty() {
        return Err(PdfError::NoPages);
    }
    let width = Mm(doc.geometry.width);
    let height = doc.geometry.height;

    let pdf = PdfDocument::empty(doc.title.as_str())
        .with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_icc_profile: false,
            requires_xmp_metadata: false,
            ..Default::default()
        }))
        .with_producer(meta.producer.as_str());

    let fonts = Fonts {
        regular: pdf
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(encode_err)?,
        bold: pdf
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(encode_err)?,
    };

    for page in &doc.pages {
        let (page_idx, layer_idx) = pdf.add_page(width, Mm(height), LAYER_NAME);
        let layer = pdf.get_page(page_idx).get_layer(layer_idx);
        draw_page(&layer, page, height, &fonts);
    }

    let mut writer = BufWriter::new(Vec::new());
    pdf.save(&mut writer).map_err(encode_err)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| encode_err(e.into_error()))?;

    tracing::debug!(
        "Serialized '{}': {} pages, {} bytes",
        doc.title,
        doc.pages.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn draw_page(layer: &PdfLayerReference, page: &Page, page_height: f32, fonts: &Fonts) {
    let flip = |mm: f32| Mm(page_height - mm);
    let point = |x: f32, y: f32| (Point::new(Mm(x), flip(y)), false);

    for op in page.ops() {
        match op {
            DrawOp::Text {
                x,
                y,
                text,
                size,
                bold,
                align,
                color,
            } => {
                let width = approx_text_width(text, *size);
                let left = match align {
                    TextAlign::Left => *x,
                    TextAlign::Center => x - width / 2.0,
                    TextAlign::Right => x - width,
                };
                let font = if *bold { &fonts.bold } else { &fonts.regular };
                layer.set_fill_color(rgb(*color));
                layer.use_text(pdf_text(text), *size, Mm(left), flip(*y), font);
            }
            DrawOp::Rect {
                x,
                y,
                w,
                h,
                fill,
                stroke,
            } => {
                let ring = vec![
                    point(*x, *y),
                    point(x + w, *y),
                    point(x + w, y + h),
                    point(*x, y + h),
                ];
                paint_shape(layer, ring, *fill, *stroke);
            }
            DrawOp::Circle {
                cx,
                cy,
                r,
                fill,
                stroke,
            } => {
                let ring = (0..CIRCLE_SEGMENTS)
                    .map(|i| {
                        let a = i as f32 / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
                        point(cx + r * a.cos(), cy + r * a.sin())
                    })
                    .collect();
                paint_shape(layer, ring, *fill, *stroke);
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                stroke,
            } => {
                set_stroke(layer, *stroke);
                layer.add_line(Line {
                    points: vec![point(*x1, *y1), point(*x2, *y2)],
                    is_closed: false,
                });
            }
            DrawOp::Image { x, y, w, h, image } => {
                let (img_w, img_h) = image.dimensions();
                if img_w == 0 || img_h == 0 {
                    continue;
                }
                // Native size at IMAGE_DPI, then scaled onto the layout box.
                let native_w = img_w as f32 * 25.4 / IMAGE_DPI;
                let native_h = img_h as f32 * 25.4 / IMAGE_DPI;
                Image::from_dynamic_image(&DynamicImage::ImageRgb8(flatten_rgb(image)))
                    .add_to_layer(
                        layer.clone(),
                        ImageTransform {
                            translate_x: Some(Mm(*x)),
                            translate_y: Some(flip(y + h)),
                            scale_x: Some(w / native_w),
                            scale_y: Some(h / native_h),
                            dpi: Some(IMAGE_DPI),
                            ..Default::default()
                        },
                    );
            }
        }
    }
}

fn rgb(color: [u8; 3]) -> Color {
    Color::Rgb(Rgb::new(
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
        None,
    ))
}

fn set_stroke(layer: &PdfLayerReference, stroke: Stroke) {
    layer.set_outline_color(rgb(stroke.color));
    layer.set_outline_thickness(stroke.width / MM_PER_PT);
}

fn paint_shape(
    layer: &PdfLayerReference,
    ring: Vec<(Point, bool)>,
    fill: Option<[u8; 3]>,
    stroke: Option<Stroke>,
) {
    let mode = match (fill, stroke) {
        (Some(_), Some(_)) => PaintMode::FillStroke,
        (Some(_), None) => PaintMode::Fill,
        (None, Some(_)) => PaintMode::Stroke,
        (None, None) => return,
    };
    if let Some(f) = fill {
        layer.set_fill_color(rgb(f));
    }
    if let Some(s) = stroke {
        set_stroke(layer, s);
    }
    layer.add_polygon(Polygon {
        rings: vec![ring],
        mode,
        winding_order: WindingOrder::NonZero,
    });
}

/// RGB copy with alpha composited onto white.
fn flatten_rgb(image: &RgbaImage) -> RgbImage {
    let (w, h) = image.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let p = image.get_pixel(x, y).0;
        let a = p[3] as u32;
        let mix = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([mix(p[0]), mix(p[1]), mix(p[2])])
    })
}

/// Text restricted to what the standard Type1 faces can show.
///
/// Line breaks collapse to spaces and characters outside Latin-1 become `?`.
pub fn pdf_text(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            ' '..='~' | '\u{A0}'..='\u{FF}' => c,
            _ => '?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::document::DrawCommand;
    use crate::layout::{PageGeometry, Section, layout};
    use image::Rgba;
    use regex::bytes::Regex;
    use std::sync::Arc;

    fn meta() -> PdfMetadata {
        PdfMetadata {
            producer: "AuthenticX Test".into(),
        }
    }

    fn count(haystack: &[u8], pattern: &str) -> usize {
        Regex::new(pattern).unwrap().find_iter(haystack).count()
    }

    #[test]
    fn test_header_and_trailer() {
        let doc = layout("Report", PageGeometry::a4(), &[Section::text("Hello", 16.0)]);
        let bytes = serialize(&doc, &meta()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.trim_ascii_end().ends_with(b"%%EOF"));
        assert_eq!(count(&bytes, r"/Type\s*/Page\b"), 1);
        assert!(count(&bytes, r"/BaseFont\s*/Helvetica\b") >= 1);
    }

    #[test]
    fn test_page_objects_match_document_pages() {
        let doc = layout(
            "t",
            PageGeometry::a4(),
            &[
                Section::text("a", 11.0),
                Section::Spacer(500.0),
                Section::text("b", 11.0),
                Section::Spacer(500.0),
                Section::text("c", 11.0),
            ],
        );
        assert_eq!(doc.page_count(), 3);
        let bytes = serialize(&doc, &meta()).unwrap();
        assert_eq!(count(&bytes, r"/Type\s*/Page\b"), 3);
        assert_eq!(count(&bytes, r"/Count\s+3\b"), 1);
    }

    #[test]
    fn test_images_become_xobjects() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128]));
        let doc = layout("t", PageGeometry::a4(), &[Section::Image(Arc::new(img))]);
        let bytes = serialize(&doc, &meta()).unwrap();
        assert_eq!(count(&bytes, r"/Subtype\s*/Image\b"), 1);
    }

    #[test]
    fn test_shapes_only_page_serializes() {
        let mut doc = layout("t", PageGeometry::a4(), &[Section::text("x", 11.0)]);
        let circle = DrawOp::Circle {
            cx: 50.0,
            cy: 50.0,
            r: 5.0,
            fill: Some([200, 0, 0]),
            stroke: Some(Stroke {
                color: [0, 0, 0],
                width: 0.3,
            }),
        };
        let empty_rect = DrawOp::Rect {
            x: 10.0,
            y: 10.0,
            w: 20.0,
            h: 5.0,
            fill: None,
            stroke: None,
        };
        for op in [circle, empty_rect] {
            doc.pages[0].commands.push(DrawCommand { section: 0, op });
        }
        let bytes = serialize(&doc, &meta()).unwrap();
        assert_eq!(count(&bytes, r"/Type\s*/Page\b"), 1);
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let mut doc = layout("t", PageGeometry::a4(), &[]);
        doc.pages.clear();
        assert!(matches!(serialize(&doc, &meta()), Err(PdfError::NoPages)));
    }

    #[test]
    fn test_flatten_composites_on_white() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        assert_eq!(flatten_rgb(&img).into_raw(), vec![255, 255, 255]);
        let img = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255]));
        assert_eq!(flatten_rgb(&img).into_raw(), vec![10, 20, 30]);
    }

    #[test]
    fn test_pdf_text() {
        assert_eq!(pdf_text("a(b)c"), "a(b)c");
        assert_eq!(pdf_text("caf\u{e9}"), "caf\u{e9}");
        assert_eq!(pdf_text("\u{4e2d}"), "?");
        assert_eq!(pdf_text("a\nb"), "a b");
    }
}
