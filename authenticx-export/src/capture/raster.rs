//! Software rasterizer for element trees.
//!
//! Behaves like DOM capture libraries: it understands hex, `rgb()`/`rgba()`
//! and a few keywords, fails on any perceptual color function, and cannot
//! replay canvas drawing (canvases come out blank). Text is drawn as ink
//! blocks per word.

use super::element::{Element, ElementKind, Flow};
use crate::color::{Rgba, has_perceptual_color};
use crate::error::CaptureError;
use image::imageops::{self, FilterType};
use image::{Rgba as Pixel, RgbaImage};

pub const DEFAULT_VIEWPORT_WIDTH: u32 = 800;
/// Largest bitmap side the rasterizer will allocate.
pub const MAX_DIMENSION: u32 = 16_384;

const DEFAULT_FONT_PX: f32 = 14.0;
const LINE_FACTOR: f32 = 1.4;
const GLYPH_FACTOR: f32 = 0.55;

/// Laid-out box in CSS pixels.
#[derive(Debug, Clone, Copy)]
struct Frame {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Rasterize `root` at `scale` device pixels per CSS pixel.
pub fn rasterize(root: &Element, scale: u32) -> Result<RgbaImage, CaptureError> {
    reject_unparsable(root)?;
    let scale = scale.max(1);
    let width = root.width.unwrap_or(DEFAULT_VIEWPORT_WIDTH);
    let height = measure(root, width);
    let (pw, ph) = (width.saturating_mul(scale), height.saturating_mul(scale));
    if pw == 0 || ph == 0 || pw > MAX_DIMENSION || ph > MAX_DIMENSION {
        return Err(CaptureError::RasterFailed {
            message: format!("bitmap of {pw}x{ph} pixels is out of range"),
        });
    }
    let mut canvas = RgbaImage::from_pixel(pw, ph, Pixel([255, 255, 255, 255]));
    paint(
        &mut canvas,
        root,
        Frame {
            x: 0,
            y: 0,
            w: width,
            h: height,
        },
        scale,
    );
    Ok(canvas)
}

fn reject_unparsable(root: &Element) -> Result<(), CaptureError> {
    for el in root.descendants() {
        for (property, value) in &el.style {
            if has_perceptual_color(value) {
                return Err(CaptureError::UnsupportedColor {
                    property: property.clone(),
                    value: value.clone(),
                });
            }
        }
    }
    Ok(())
}

fn font_px(el: &Element) -> f32 {
    el.style
        .get("font-size")
        .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
        .filter(|v| *v > 0.0)
        .unwrap_or(DEFAULT_FONT_PX)
}

fn text_lines(text: &str, width: u32, font: f32) -> Vec<Vec<(u32, u32)>> {
    // each line is a list of (offset, width) word runs
    let glyph = font * GLYPH_FACTOR;
    let mut lines = vec![Vec::new()];
    let mut cursor = 0.0f32;
    for word in text.split_whitespace() {
        let w = word.chars().count() as f32 * glyph;
        if cursor > 0.0 && cursor + w > width as f32 {
            lines.push(Vec::new());
            cursor = 0.0;
        }
        if let Some(line) = lines.last_mut() {
            line.push((cursor as u32, (w as u32).max(1)));
        }
        cursor += w + glyph;
    }
    lines
}

/// Border-box height of `el` when given `width`.
fn measure(el: &Element, width: u32) -> u32 {
    if let Some(h) = el.height {
        return h;
    }
    let inner = width.saturating_sub(2 * el.padding);
    let content = match &el.kind {
        ElementKind::Text(text) => {
            let font = font_px(el);
            (text_lines(text, inner, font).len() as f32 * font * LINE_FACTOR).ceil() as u32
        }
        ElementKind::Canvas(bitmap) => bitmap.height(),
        ElementKind::Image(img) => {
            if img.width() == 0 {
                0
            } else {
                (img.height() as u64 * inner as u64 / img.width() as u64) as u32
            }
        }
        ElementKind::Block(Flow::Column) => el
            .visible_children()
            .iter()
            .map(|c| measure(c, c.width.unwrap_or(inner)))
            .sum(),
        ElementKind::Block(Flow::Row) => {
            let widths = row_widths(el.visible_children(), inner);
            el.visible_children()
                .iter()
                .zip(widths)
                .map(|(c, w)| measure(c, w))
                .max()
                .unwrap_or(0)
        }
    };
    content + 2 * el.padding
}

/// Fixed widths are kept; the rest share what is left equally.
fn row_widths(children: &[Element], inner: u32) -> Vec<u32> {
    let fixed: u32 = children.iter().filter_map(|c| c.width).sum();
    let flexible = children.iter().filter(|c| c.width.is_none()).count() as u32;
    let share = if flexible == 0 {
        0
    } else {
        inner.saturating_sub(fixed) / flexible
    };
    children.iter().map(|c| c.width.unwrap_or(share)).collect()
}

fn paint(canvas: &mut RgbaImage, el: &Element, frame: Frame, scale: u32) {
    if let Some(bg) = el.style.get("background-color").and_then(|v| parse_css_color(v)) {
        fill_rect(canvas, frame, bg, scale);
    }
    if let Some(border) = el.style.get("border-color").and_then(|v| parse_css_color(v)) {
        stroke_rect(canvas, frame, border, scale);
    }

    let inner = Frame {
        x: frame.x + el.padding,
        y: frame.y + el.padding,
        w: frame.w.saturating_sub(2 * el.padding),
        h: frame.h.saturating_sub(2 * el.padding),
    };
    match &el.kind {
        ElementKind::Text(text) => {
            let font = font_px(el);
            let ink = el
                .style
                .get("color")
                .and_then(|v| parse_css_color(v))
                .unwrap_or(Rgba::BLACK);
            let line_h = font * LINE_FACTOR;
            let glyph_h = (font * 0.6).max(1.0) as u32;
            for (i, line) in text_lines(text, inner.w, font).iter().enumerate() {
                let top = inner.y + (i as f32 * line_h + (line_h - glyph_h as f32) / 2.0) as u32;
                for (offset, w) in line {
                    let run = Frame {
                        x: inner.x + offset,
                        y: top,
                        w: (*w).min(inner.w.saturating_sub(*offset)),
                        h: glyph_h,
                    };
                    fill_rect(canvas, run, ink, scale);
                }
            }
        }
        // cloned canvases carry no drawing commands
        ElementKind::Canvas(_) => {}
        ElementKind::Image(img) => draw_image(canvas, img, inner, scale),
        ElementKind::Block(flow) => {
            let children = el.visible_children();
            match flow {
                Flow::Column => {
                    let mut y = inner.y;
                    for child in children {
                        let w = child.width.unwrap_or(inner.w);
                        let h = measure(child, w);
                        paint(canvas, child, Frame { x: inner.x, y, w, h }, scale);
                        y += h;
                    }
                }
                Flow::Row => {
                    let widths = row_widths(children, inner.w);
                    let mut x = inner.x;
                    for (child, w) in children.iter().zip(widths) {
                        let h = child.height.unwrap_or(inner.h);
                        paint(canvas, child, Frame { x, y: inner.y, w, h }, scale);
                        x += w;
                    }
                }
            }
        }
    }
}

fn device_rect(canvas: &RgbaImage, frame: Frame, scale: u32) -> (u32, u32, u32, u32) {
    let x0 = (frame.x.saturating_mul(scale)).min(canvas.width());
    let y0 = (frame.y.saturating_mul(scale)).min(canvas.height());
    let x1 = ((frame.x + frame.w).saturating_mul(scale)).min(canvas.width());
    let y1 = ((frame.y + frame.h).saturating_mul(scale)).min(canvas.height());
    (x0, y0, x1, y1)
}

fn blend(dst: &mut Pixel<u8>, color: Rgba) {
    let a = color.a.clamp(0.0, 1.0);
    let src = color.rgb();
    for c in 0..3 {
        let mixed = src[c] as f32 * a + dst.0[c] as f32 * (1.0 - a);
        dst.0[c] = mixed.round() as u8;
    }
    dst.0[3] = 255;
}

fn fill_rect(canvas: &mut RgbaImage, frame: Frame, color: Rgba, scale: u32) {
    let (x0, y0, x1, y1) = device_rect(canvas, frame, scale);
    for y in y0..y1 {
        for x in x0..x1 {
            blend(canvas.get_pixel_mut(x, y), color);
        }
    }
}

fn stroke_rect(canvas: &mut RgbaImage, frame: Frame, color: Rgba, scale: u32) {
    let (x0, y0, x1, y1) = device_rect(canvas, frame, scale);
    if x1 <= x0 || y1 <= y0 {
        return;
    }
    let t = scale.min(x1 - x0).min(y1 - y0);
    for y in y0..y1 {
        for x in x0..x1 {
            let edge = x < x0 + t || x >= x1 - t || y < y0 + t || y >= y1 - t;
            if edge {
                blend(canvas.get_pixel_mut(x, y), color);
            }
        }
    }
}

fn draw_image(canvas: &mut RgbaImage, img: &RgbaImage, frame: Frame, scale: u32) {
    let (x0, y0, x1, y1) = device_rect(canvas, frame, scale);
    if x1 <= x0 || y1 <= y0 || img.width() == 0 || img.height() == 0 {
        return;
    }
    let scaled = imageops::resize(img, x1 - x0, y1 - y0, FilterType::Nearest);
    imageops::overlay(canvas, &scaled, x0 as i64, y0 as i64);
}

/// Parse the CSS color forms the rasterizer understands.
pub fn parse_css_color(value: &str) -> Option<Rgba> {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "transparent" | "none" => return None,
        "white" => return Some(Rgba::WHITE),
        "black" => return Some(Rgba::BLACK),
        _ => {}
    }
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex);
    }
    let (args, has_alpha) = if let Some(rest) = v.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else if let Some(rest) = v.strip_prefix("rgb(") {
        (rest.strip_suffix(')')?, false)
    } else {
        return None;
    };
    let parts: Vec<&str> = args
        .split([',', '/', ' '])
        .filter(|p| !p.is_empty())
        .collect();
    let expected = if has_alpha { 4 } else { 3 };
    if parts.len() != expected && !(parts.len() == 4 && !has_alpha) {
        return None;
    }
    let channel = |s: &str| s.parse::<f32>().ok().map(|c| c.clamp(0.0, 255.0).round() as u8);
    let a = match parts.get(3) {
        Some(s) => s.parse::<f32>().ok()?.clamp(0.0, 1.0),
        None => 1.0,
    };
    Some(Rgba {
        r: channel(parts[0])?,
        g: channel(parts[1])?,
        b: channel(parts[2])?,
        a,
    })
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let expand = |c: char| c.to_digit(16).map(|d| (d * 17) as u8);
    match hex.len() {
        3 => {
            let mut it = hex.chars();
            Some(Rgba::opaque(
                expand(it.next()?)?,
                expand(it.next()?)?,
                expand(it.next()?)?,
            ))
        }
        6 => {
            let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            Some(Rgba::opaque(byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_css_colors() {
        assert_eq!(parse_css_color("#fff"), Some(Rgba::WHITE));
        assert_eq!(parse_css_color("#ef4444"), Some(Rgba::opaque(239, 68, 68)));
        assert_eq!(parse_css_color("rgb(1, 2, 3)"), Some(Rgba::opaque(1, 2, 3)));
        assert_eq!(
            parse_css_color("rgba(1, 2, 3, 0.5)"),
            Some(Rgba {
                r: 1,
                g: 2,
                b: 3,
                a: 0.5
            })
        );
        assert_eq!(parse_css_color("transparent"), None);
        assert_eq!(parse_css_color("#12"), None);
        assert_eq!(parse_css_color("hsl(0 0% 0%)"), None);
    }

    #[test]
    fn test_oklch_is_rejected() {
        let el = Element::block()
            .size(10, 10)
            .style("background-color", "oklch(0.5 0.1 20)");
        assert!(matches!(
            rasterize(&el, 2),
            Err(CaptureError::UnsupportedColor { .. })
        ));
    }

    #[test]
    fn test_background_fill_and_scale() {
        let el = Element::block()
            .size(10, 4)
            .style("background-color", "rgb(239, 68, 68)");
        let img = rasterize(&el, 3).expect("raster");
        assert_eq!(img.dimensions(), (30, 12));
        assert_eq!(img.get_pixel(15, 6).0, [239, 68, 68, 255]);
    }

    #[test]
    fn test_column_layout_stacks_children() {
        let el = Element::block()
            .width(20)
            .child(Element::block().height(5).style("background-color", "#000"))
            .child(Element::block().height(5).style("background-color", "#fff"));
        let img = rasterize(&el, 1).expect("raster");
        assert_eq!(img.height(), 10);
        assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 7).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_row_layout_shares_width() {
        let el = Element::row()
            .width(20)
            .height(4)
            .child(Element::block().style("background-color", "#000"))
            .child(Element::block().style("background-color", "#00f"));
        let img = rasterize(&el, 1).expect("raster");
        assert_eq!(img.get_pixel(2, 2).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(15, 2).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_canvas_rasterizes_blank() {
        let bitmap = RgbaImage::from_pixel(8, 8, Pixel([0, 0, 0, 255]));
        let el = Element::block().width(8).child(Element::canvas(bitmap));
        let img = rasterize(&el, 1).expect("raster");
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_image_is_drawn() {
        let bitmap = RgbaImage::from_pixel(8, 8, Pixel([0, 0, 0, 255]));
        let el = Element::block()
            .width(8)
            .child(Element::image(std::sync::Arc::new(bitmap)).size(8, 8));
        let img = rasterize(&el, 2).expect("raster");
        assert_eq!(img.dimensions(), (16, 16));
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_collapsed_content_is_not_painted() {
        let el = Element::block().width(10).collapsible(false).child(
            Element::block()
                .height(10)
                .style("background-color", "#000"),
        );
        assert!(matches!(rasterize(&el, 2), Err(CaptureError::RasterFailed { .. })));
    }

    #[test]
    fn test_text_leaves_ink() {
        let el = Element::text("Critical findings").width(200).style("color", "#000");
        let img = rasterize(&el, 2).expect("raster");
        assert!(img.pixels().any(|p| p.0 == [0, 0, 0, 255]));
    }
}
