//! Severity bar chart.
//!
//! One bar per severity in fixed order, heights proportional to the largest
//! count. The count sits above each bar and the severity label below it.

use super::document::{BarMetric, DrawOp, TextAlign, line_height};
use super::{LayoutEngine, SectionMetrics};
use authenticx_core::{Severity, SeverityTally};

pub const BAR_WIDTH: f32 = 30.0;
pub const BAR_GAP: f32 = 15.0;
pub const MAX_BAR_HEIGHT: f32 = 50.0;

const INDENT: f32 = 6.0;
const HEADING_SIZE: f32 = 14.0;
const VALUE_SIZE: f32 = 10.0;
const VALUE_ROOM: f32 = 6.0;
const LABEL_ROOM: f32 = 8.0;

/// Vertical space the chart body needs, excluding any heading.
pub fn body_height() -> f32 {
    VALUE_ROOM + MAX_BAR_HEIGHT + LABEL_ROOM
}

/// Height of a bar for `count` when the tallest bar holds `max`.
pub fn bar_height(count: usize, max: usize) -> f32 {
    if max == 0 {
        0.0
    } else {
        count as f32 / max as f32 * MAX_BAR_HEIGHT
    }
}

pub(crate) fn layout(
    engine: &mut LayoutEngine,
    heading: Option<&str>,
    tally: &SeverityTally,
) -> SectionMetrics {
    let heading_h = heading.map_or(0.0, |_| line_height(HEADING_SIZE) + 2.0);
    engine.ensure_space(heading_h + body_height());
    if let Some(text) = heading {
        engine.text_line(text, HEADING_SIZE, true);
        engine.advance(2.0);
    }

    let base = engine.cursor() + VALUE_ROOM + MAX_BAR_HEIGHT;
    let max = tally.max();
    let left = engine.geometry().margin_left + INDENT;
    let mut bars = Vec::with_capacity(Severity::ORDERED.len());
    for (i, severity) in Severity::ORDERED.into_iter().enumerate() {
        let count = tally.get(severity);
        let height = bar_height(count, max);
        let x = left + i as f32 * (BAR_WIDTH + BAR_GAP);
        let center = x + BAR_WIDTH / 2.0;
        engine.push(DrawOp::Rect {
            x,
            y: base - height,
            w: BAR_WIDTH,
            h: height,
            fill: Some(severity.base_color()),
            stroke: None,
        });
        engine.text(
            center,
            base - height - 2.0,
            count.to_string(),
            VALUE_SIZE,
            false,
            TextAlign::Center,
        );
        engine.text(
            center,
            base + 5.0,
            severity.label(),
            VALUE_SIZE,
            false,
            TextAlign::Center,
        );
        bars.push(BarMetric {
            severity,
            count,
            height,
        });
    }
    engine.advance(body_height());
    SectionMetrics::BarChart { bars }
}
