//! Asset by severity heatmap grid.

use super::document::{DrawOp, HeatCell, Stroke, TextAlign, approx_text_width, line_height};
use super::{LayoutEngine, SectionMetrics};
use authenticx_core::{AssetSeverityMatrix, Severity};

pub const LABEL_WIDTH: f32 = 50.0;
pub const CELL_WIDTH: f32 = 22.0;
pub const CELL_HEIGHT: f32 = 9.0;

const HEADING_SIZE: f32 = 14.0;
const TEXT_SIZE: f32 = 9.0;
const LEGEND_GAP: f32 = 6.0;
const SWATCH: f32 = 4.0;
const LEGEND_ROW: f32 = 6.0;
const HEADER_FILL: [u8; 3] = [243, 244, 246];

pub const EMPTY_MESSAGE: &str = "No vulnerability data available";

/// Fill for a cell: white blended toward the severity color by
/// `count / max`.
pub fn cell_fill(severity: Severity, count: usize, max: usize) -> [u8; 3] {
    let t = if max == 0 {
        0.0
    } else {
        (count as f32 / max as f32).clamp(0.0, 1.0)
    };
    severity
        .base_color()
        .map(|c| (255.0 - (255.0 - c as f32) * t).round() as u8)
}

pub(crate) fn layout(
    engine: &mut LayoutEngine,
    heading: Option<&str>,
    matrix: &AssetSeverityMatrix,
) -> SectionMetrics {
    let heading_h = heading.map_or(0.0, |_| line_height(HEADING_SIZE) + 2.0);
    let first_row = if matrix.is_empty() {
        line_height(TEXT_SIZE) + 2.0
    } else {
        CELL_HEIGHT
    };
    let legend_h = Severity::ORDERED.len() as f32 * LEGEND_ROW;
    engine.ensure_space(heading_h + (CELL_HEIGHT + first_row).max(legend_h));
    if let Some(text) = heading {
        engine.text_line(text, HEADING_SIZE, true);
        engine.advance(2.0);
    }

    let left = engine.geometry().margin_left;
    let grid_top = engine.cursor();
    let legend_page = engine.page_index();
    draw_header(engine, left, grid_top);
    draw_legend(engine, left + LABEL_WIDTH + 4.0 * CELL_WIDTH + LEGEND_GAP, grid_top);
    engine.advance(CELL_HEIGHT);

    let max = matrix.max_count();
    let mut cells = Vec::with_capacity(matrix.rows().len() * Severity::ORDERED.len());
    for row in matrix.rows() {
        if CELL_HEIGHT > engine.remaining() + 1e-3 {
            engine.new_page();
        }
        let y = engine.cursor();
        engine.push(DrawOp::Rect {
            x: left,
            y,
            w: LABEL_WIDTH,
            h: CELL_HEIGHT,
            fill: None,
            stroke: Some(Stroke::HAIRLINE),
        });
        engine.text(
            left + 2.0,
            y + 6.0,
            fit_label(&row.asset, LABEL_WIDTH - 4.0),
            TEXT_SIZE,
            false,
            TextAlign::Left,
        );
        for (i, severity) in Severity::ORDERED.into_iter().enumerate() {
            let count = row.get(severity);
            let fill = cell_fill(severity, count, max);
            let x = left + LABEL_WIDTH + i as f32 * CELL_WIDTH;
            engine.push(DrawOp::Rect {
                x,
                y,
                w: CELL_WIDTH,
                h: CELL_HEIGHT,
                fill: Some(fill),
                stroke: Some(Stroke::HAIRLINE),
            });
            engine.text(
                x + CELL_WIDTH / 2.0,
                y + 6.0,
                count.to_string(),
                TEXT_SIZE,
                false,
                TextAlign::Center,
            );
            cells.push(HeatCell {
                asset: row.asset.clone(),
                severity,
                count,
                fill,
            });
        }
        engine.advance(CELL_HEIGHT);
    }

    if matrix.is_empty() {
        engine.advance(2.0);
        engine.text_line(EMPTY_MESSAGE, TEXT_SIZE, false);
    }

    if engine.page_index() == legend_page {
        let legend_bottom = grid_top + legend_h;
        if engine.cursor() < legend_bottom {
            engine.advance(legend_bottom - engine.cursor());
        }
    }

    SectionMetrics::Heatmap {
        rows: matrix.rows().len(),
        cells,
    }
}

fn draw_header(engine: &mut LayoutEngine, left: f32, y: f32) {
    let labels = std::iter::once("Asset").chain(Severity::ORDERED.iter().map(|s| s.label()));
    let mut x = left;
    for (i, label) in labels.enumerate() {
        let w = if i == 0 { LABEL_WIDTH } else { CELL_WIDTH };
        engine.push(DrawOp::Rect {
            x,
            y,
            w,
            h: CELL_HEIGHT,
            fill: Some(HEADER_FILL),
            stroke: Some(Stroke::HAIRLINE),
        });
        let (tx, align) = if i == 0 {
            (x + 2.0, TextAlign::Left)
        } else {
            (x + w / 2.0, TextAlign::Center)
        };
        engine.text(tx, y + 6.0, label, TEXT_SIZE, true, align);
        x += w;
    }
}

fn draw_legend(engine: &mut LayoutEngine, x: f32, top: f32) {
    for (i, severity) in Severity::ORDERED.into_iter().enumerate() {
        let y = top + i as f32 * LEGEND_ROW;
        engine.push(DrawOp::Rect {
            x,
            y,
            w: SWATCH,
            h: SWATCH,
            fill: Some(severity.base_color()),
            stroke: None,
        });
        engine.text(
            x + SWATCH + 2.0,
            y + SWATCH - 0.5,
            severity.label(),
            TEXT_SIZE,
            false,
            TextAlign::Left,
        );
    }
}

/// Truncate a label with an ellipsis so it fits `max_width`.
fn fit_label(label: &str, max_width: f32) -> String {
    if approx_text_width(label, TEXT_SIZE) <= max_width {
        return label.to_string();
    }
    let mut out = String::new();
    for ch in label.chars() {
        out.push(ch);
        if approx_text_width(&out, TEXT_SIZE) + approx_text_width("...", TEXT_SIZE) > max_width {
            out.pop();
            break;
        }
    }
    out.push_str("...");
    out
}
