//! Findings table: fixed column set, wrapped cells, header repeated after
//! every page break.

use super::document::{
    DrawOp, Stroke, TextAlign, approx_text_width, baseline_offset, line_height,
};
use super::{LayoutEngine, SectionMetrics};
use authenticx_core::{Finding, TABLE_HEADERS};

pub const FONT_SIZE: f32 = 8.0;
pub const CELL_PADDING: f32 = 1.5;

/// Column shares of the content width, in header order.
const COLUMN_SHARES: [f32; 7] = [0.15, 0.10, 0.10, 0.25, 0.16, 0.08, 0.16];

const CELL_FILL: [u8; 3] = [255, 255, 255];

struct Row {
    cells: Vec<Vec<String>>,
    lines: usize,
}

impl Row {
    fn new(texts: &[String], widths: &[f32]) -> Self {
        let cells: Vec<Vec<String>> = texts
            .iter()
            .zip(widths)
            .map(|(t, w)| wrap(t, w - 2.0 * CELL_PADDING, FONT_SIZE))
            .collect();
        let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
        Self { cells, lines }
    }

    fn height(&self) -> f32 {
        height_for(self.lines)
    }
}

fn height_for(lines: usize) -> f32 {
    lines as f32 * line_height(FONT_SIZE) + 2.0 * CELL_PADDING
}

/// Widths of the seven columns for a given content width.
pub fn column_widths(content_width: f32) -> [f32; 7] {
    COLUMN_SHARES.map(|share| share * content_width)
}

pub(crate) fn layout(engine: &mut LayoutEngine, findings: &[Finding]) -> SectionMetrics {
    let widths = column_widths(engine.geometry().content_width());
    let header_texts: Vec<String> = TABLE_HEADERS.iter().map(|h| h.to_string()).collect();
    let header = Row::new(&header_texts, &widths);
    let rows: Vec<Row> = findings
        .iter()
        .map(|f| Row::new(&f.table_cells(), &widths))
        .collect();

    // keep the header together with the first body line
    let first = rows.first().map_or(0.0, |r| height_for(1).min(r.height()));
    engine.ensure_space(header.height() + first);
    // true while the current page holds nothing but a header drawn at its top
    let mut fresh = engine.at_page_top();
    draw_row(engine, &header, 0, header.lines, &widths, true);
    let mut header_rows = 1;

    let usable = engine.geometry().usable_height() - header.height();
    for row in &rows {
        let mut start = 0;
        // whole rows move to the next page; only rows taller than a page split
        if row.height() > engine.remaining() && row.height() <= usable && !fresh {
            engine.new_page();
            draw_row(engine, &header, 0, header.lines, &widths, true);
            header_rows += 1;
            fresh = true;
        }
        while start < row.lines {
            let fit = lines_that_fit(engine.remaining());
            if fit == 0 && !fresh {
                engine.new_page();
                draw_row(engine, &header, 0, header.lines, &widths, true);
                header_rows += 1;
                fresh = true;
                continue;
            }
            // a page too short for one line under its header still takes one
            let end = (start + fit.max(1)).min(row.lines);
            draw_row(engine, row, start, end, &widths, false);
            start = end;
            fresh = false;
        }
    }

    SectionMetrics::Table {
        rows: rows.len(),
        header_rows,
    }
}

fn lines_that_fit(space: f32) -> usize {
    let body = space - 2.0 * CELL_PADDING;
    if body <= 0.0 {
        return 0;
    }
    (body / line_height(FONT_SIZE) + 1e-4).floor() as usize
}

/// Draw lines `start..end` of a row at the cursor and advance past it.
fn draw_row(
    engine: &mut LayoutEngine,
    row: &Row,
    start: usize,
    end: usize,
    widths: &[f32],
    bold: bool,
) {
    let top = engine.cursor();
    let h = height_for(end - start);
    let lh = line_height(FONT_SIZE);
    let mut x = engine.geometry().margin_left;
    for (cell, w) in row.cells.iter().zip(widths) {
        engine.push(DrawOp::Rect {
            x,
            y: top,
            w: *w,
            h,
            fill: Some(CELL_FILL),
            stroke: Some(Stroke::HAIRLINE),
        });
        for (i, line) in cell.iter().enumerate().take(end).skip(start) {
            let y = top + CELL_PADDING + (i - start) as f32 * lh + baseline_offset(FONT_SIZE);
            engine.text(x + CELL_PADDING, y, line.clone(), FONT_SIZE, bold, TextAlign::Left);
        }
        x += w;
    }
    engine.advance(h);
}

/// Greedy word wrap against an approximate glyph width. Words longer than a
/// line are broken by character.
pub fn wrap(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if approx_text_width(&candidate, size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if approx_text_width(word, size) <= max_width {
            current = word.to_string();
        } else {
            for ch in word.chars() {
                let mut next = current.clone();
                next.push(ch);
                if !current.is_empty() && approx_text_width(&next, size) > max_width {
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                } else {
                    current = next;
                }
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PageGeometry, Section, SectionKind, layout as layout_doc};
    use authenticx_core::Severity;
    use pretty_assertions::assert_eq;

    fn finding(i: usize) -> Finding {
        Finding::new(format!("CVE-2024-{i:05}"), Severity::High, 7.5)
            .with_description("Remote code execution")
            .with_service("Apache", 443)
            .with_asset("web.x.com")
    }

    fn table_metrics(n: usize) -> (usize, usize, usize) {
        let findings: Vec<Finding> = (0..n).map(finding).collect();
        let doc = layout_doc("t", PageGeometry::a4(), &[Section::Table(findings)]);
        match &doc.sections[0].metrics {
            SectionMetrics::Table { rows, header_rows } => (*rows, *header_rows, doc.page_count()),
            other => panic!("unexpected metrics {other:?}"),
        }
    }

    #[test]
    fn test_wrap_short_text() {
        assert_eq!(wrap("Apache", 30.0, FONT_SIZE), vec!["Apache"]);
        assert_eq!(wrap("", 30.0, FONT_SIZE), vec![""]);
    }

    #[test]
    fn test_wrap_breaks_words_and_long_tokens() {
        let lines = wrap("alpha beta gamma delta", 10.0, FONT_SIZE);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), "alpha beta gamma delta");

        let long = "x".repeat(80);
        let lines = wrap(&long, 10.0, FONT_SIZE);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| approx_text_width(l, FONT_SIZE) <= 10.0));
        assert_eq!(lines.concat(), long);
    }

    #[test]
    fn test_column_widths_span_content() {
        let total: f32 = column_widths(182.0).iter().sum();
        assert!((total - 182.0).abs() < 1e-3);
    }

    #[test]
    fn test_header_and_rows() {
        let (rows, headers, pages) = table_metrics(2);
        assert_eq!((rows, headers, pages), (2, 1, 1));
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let doc = layout_doc("t", PageGeometry::a4(), &[Section::Table(vec![])]);
        let (idx, record) = doc.section(SectionKind::Table).expect("table section");
        assert_eq!(
            record.metrics,
            SectionMetrics::Table {
                rows: 0,
                header_rows: 1
            }
        );
        let texts: Vec<String> = doc
            .ops_in_section(idx)
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 7);
    }

    #[test]
    fn test_header_repeats_on_every_page() {
        let (rows, headers, pages) = table_metrics(200);
        assert_eq!(rows, 200);
        assert!(pages > 1);
        assert_eq!(headers, pages);
    }

    #[test]
    fn test_nothing_crosses_bottom_margin() {
        let findings: Vec<Finding> = (0..150).map(finding).collect();
        let doc = layout_doc("t", PageGeometry::a4(), &[Section::Table(findings)]);
        assert!(doc.max_y() <= 277.0 + 1e-3);
    }

    #[test]
    fn test_cramped_page_still_terminates() {
        let geometry = PageGeometry {
            margin_top: 145.0,
            margin_bottom: 145.0,
            ..PageGeometry::a4()
        };
        let findings: Vec<Finding> = (0..3).map(finding).collect();
        let doc = layout_doc("t", geometry, &[Section::Table(findings)]);
        match &doc.sections[0].metrics {
            SectionMetrics::Table { rows, header_rows } => {
                assert_eq!(*rows, 3);
                assert_eq!(*header_rows, doc.page_count());
            }
            other => panic!("unexpected metrics {other:?}"),
        }
        // one page per body line at most, plus the first
        assert!(doc.page_count() <= 1 + 3 * 4);
    }

    #[test]
    fn test_oversized_row_splits() {
        let huge = Finding::new("CVE-1", Severity::Low, 1.0)
            .with_description("word ".repeat(2000))
            .with_asset("a");
        let doc = layout_doc("t", PageGeometry::a4(), &[Section::Table(vec![huge])]);
        assert!(doc.page_count() > 1);
        assert!(doc.max_y() <= 277.0 + 1e-3);
        match &doc.sections[0].metrics {
            SectionMetrics::Table { rows, header_rows } => {
                assert_eq!(*rows, 1);
                assert_eq!(*header_rows, doc.page_count());
            }
            other => panic!("unexpected metrics {other:?}"),
        }
    }
}
