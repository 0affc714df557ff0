//! Raster images scaled to the content width and sliced across pages.

use super::document::DrawOp;
use super::{LayoutEngine, SectionMetrics};
use image::RgbaImage;
use std::sync::Arc;

/// Below this much room a slice is not started on the current page.
const MIN_SLICE: f32 = 10.0;

pub(crate) fn layout(engine: &mut LayoutEngine, image: &Arc<RgbaImage>) -> SectionMetrics {
    let (width_px, height_px) = image.dimensions();
    if width_px == 0 || height_px == 0 {
        tracing::warn!("Skipping empty image ({}x{})", width_px, height_px);
        return SectionMetrics::Image {
            slices: 0,
            rows_consumed: 0,
        };
    }

    let content_w = engine.geometry().content_width();
    let mm_per_px = content_w / width_px as f32;
    let x = engine.geometry().margin_left;
    let mut consumed = 0u32;
    let mut slices = 0usize;

    // a whole image that fits never splits
    let total_h = height_px as f32 * mm_per_px;
    if total_h <= engine.geometry().usable_height() {
        engine.ensure_space(total_h);
    } else if engine.remaining() < MIN_SLICE {
        engine.new_page();
    }

    while consumed < height_px {
        let rows_fit = ((engine.remaining().max(0.0) + 1e-4) / mm_per_px).floor() as u32;
        if rows_fit == 0 && !engine.at_page_top() {
            engine.new_page();
            continue;
        }
        // a page shorter than one pixel row still takes one
        let take = rows_fit.max(1).min(height_px - consumed);
        let slice = if consumed == 0 && take == height_px {
            Arc::clone(image)
        } else {
            let view = image::imageops::crop_imm(image.as_ref(), 0, consumed, width_px, take);
            Arc::new(view.to_image())
        };
        let h = take as f32 * mm_per_px;
        engine.push(DrawOp::Image {
            x,
            y: engine.cursor(),
            w: content_w,
            h,
            image: slice,
        });
        engine.advance(h);
        consumed += take;
        slices += 1;
        if consumed < height_px {
            engine.new_page();
        }
    }

    SectionMetrics::Image {
        slices,
        rows_consumed: consumed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PageGeometry, Section, layout as layout_doc};
    use image::Rgba;

    fn image_doc(w: u32, h: u32) -> crate::layout::Document {
        let img = RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]));
        layout_doc("t", PageGeometry::a4(), &[Section::Image(Arc::new(img))])
    }

    fn slice_heights(doc: &crate::layout::Document) -> Vec<u32> {
        doc.pages
            .iter()
            .flat_map(|p| p.ops())
            .filter_map(|op| match op {
                DrawOp::Image { image, .. } => Some(image.height()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_small_image_is_one_slice() {
        let doc = image_doc(364, 200);
        assert_eq!(doc.page_count(), 1);
        assert_eq!(slice_heights(&doc), vec![200]);
        match &doc.sections[0].metrics {
            SectionMetrics::Image {
                slices,
                rows_consumed,
            } => {
                assert_eq!(*slices, 1);
                assert_eq!(*rows_consumed, 200);
            }
            other => panic!("unexpected metrics {other:?}"),
        }
        // 364px across 182mm is 0.5mm per pixel
        let heights: Vec<f32> = doc
            .pages
            .iter()
            .flat_map(|p| p.ops())
            .map(|op| op.max_y())
            .collect();
        assert_eq!(heights, vec![120.0]);
    }

    #[test]
    fn test_tall_image_slices_without_loss() {
        // 0.5mm per pixel, 2000px is 1000mm of content
        let doc = image_doc(364, 2000);
        let heights = slice_heights(&doc);
        assert!(heights.len() >= 4);
        assert_eq!(heights.iter().sum::<u32>(), 2000);
        assert_eq!(doc.page_count(), heights.len());
        assert!(doc.max_y() <= 277.0 + 1e-3);
    }

    #[test]
    fn test_empty_image_is_skipped() {
        let doc = image_doc(0, 0);
        assert_eq!(doc.page_count(), 1);
        assert!(slice_heights(&doc).is_empty());
    }

    #[test]
    fn test_rows_taller_than_page_still_terminate() {
        // 2 pixels across 182mm is 91mm per row, taller than the page
        let geometry = PageGeometry {
            margin_top: 140.0,
            margin_bottom: 140.0,
            ..PageGeometry::a4()
        };
        let img = RgbaImage::from_pixel(2, 3, Rgba([0, 0, 0, 255]));
        let doc = layout_doc("t", geometry, &[Section::Image(Arc::new(img))]);
        assert_eq!(slice_heights(&doc), vec![1, 1, 1]);
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_image_after_content_moves_to_fresh_page_when_it_fits_there() {
        let img = Arc::new(RgbaImage::from_pixel(364, 300, Rgba([0, 0, 0, 255])));
        let doc = layout_doc(
            "t",
            PageGeometry::a4(),
            &[
                Section::text("title", 16.0),
                Section::Spacer(150.0),
                Section::Image(img),
            ],
        );
        assert_eq!(slice_heights(&doc), vec![300]);
        assert_eq!(doc.sections[2].first_page, 1);
    }
}
