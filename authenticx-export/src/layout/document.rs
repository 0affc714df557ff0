//! In-memory document model: pages of drawing operations plus per-section records.
//!
//! Coordinates are millimetres from the top-left corner of the page. Text `y`
//! is the baseline, as in most PDF drawing APIs.

use authenticx_core::Severity;
use authenticx_core::config::PageConfig;
use image::RgbaImage;
use std::sync::Arc;

/// Millimetres per typographic point.
pub const MM_PER_PT: f32 = 25.4 / 72.0;

/// Fixed physical page plus margins, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl PageGeometry {
    /// A4 portrait with the default margins.
    pub fn a4() -> Self {
        Self::from_config(&PageConfig::default())
    }

    pub fn from_config(config: &PageConfig) -> Self {
        let (width, height) = config.size.dimensions_mm();
        Self {
            width,
            height,
            margin_top: config.margin_top,
            margin_bottom: config.margin_bottom,
            margin_left: config.margin_left,
            margin_right: config.margin_right,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Lowest y coordinate any drawing may reach.
    pub fn bottom_limit(&self) -> f32 {
        self.height - self.margin_bottom
    }

    pub fn usable_height(&self) -> f32 {
        self.bottom_limit() - self.margin_top
    }
}

/// Horizontal anchoring of a text run relative to its `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Outline style for shapes and lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: [u8; 3],
    pub width: f32,
}

impl Stroke {
    pub const HAIRLINE: Stroke = Stroke {
        color: [0, 0, 0],
        width: 0.2,
    };
    pub const THIN: Stroke = Stroke {
        color: [0, 0, 0],
        width: 0.4,
    };
}

/// A single drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        text: String,
        /// Font size in points.
        size: f32,
        bold: bool,
        align: TextAlign,
        color: [u8; 3],
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<[u8; 3]>,
        stroke: Option<Stroke>,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        fill: Option<[u8; 3]>,
        stroke: Option<Stroke>,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        stroke: Stroke,
    },
    Image {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        image: Arc<RgbaImage>,
    },
}

impl DrawOp {
    /// Lowest point the operation paints.
    pub fn max_y(&self) -> f32 {
        match self {
            DrawOp::Text { y, size, .. } => y + 0.2 * size * MM_PER_PT,
            DrawOp::Rect { y, h, .. } => y + h,
            DrawOp::Circle { cy, r, .. } => cy + r,
            DrawOp::Line { y1, y2, .. } => y1.max(*y2),
            DrawOp::Image { y, h, .. } => y + h,
        }
    }

    /// Whether this is a node/bar/cell shape rather than text, line or image.
    pub fn is_shape(&self) -> bool {
        matches!(self, DrawOp::Rect { .. } | DrawOp::Circle { .. })
    }
}

/// A drawing operation tagged with the section that emitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub section: usize,
    pub op: DrawOp,
}

/// One fixed-size page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub commands: Vec<DrawCommand>,
}

impl Page {
    pub fn ops(&self) -> impl Iterator<Item = &DrawOp> {
        self.commands.iter().map(|c| &c.op)
    }
}

/// Kind of a rendered section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Text,
    Spacer,
    Table,
    BarChart,
    Heatmap,
    AttackPath,
    Image,
}

/// A bar as drawn by the bar chart section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarMetric {
    pub severity: Severity,
    pub count: usize,
    pub height: f32,
}

/// A heatmap cell as drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatCell {
    pub asset: String,
    pub severity: Severity,
    pub count: usize,
    pub fill: [u8; 3],
}

/// Where an attack-path node ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePlacement {
    pub id: String,
    pub page: usize,
    /// Vertical centre of the shape.
    pub y: f32,
}

/// Kind-specific results of laying out a section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionMetrics {
    Text {
        lines: usize,
    },
    Spacer,
    Table {
        /// Body rows, one per finding.
        rows: usize,
        /// Header rows drawn, including repeats on continuation pages.
        header_rows: usize,
    },
    BarChart {
        bars: Vec<BarMetric>,
    },
    Heatmap {
        rows: usize,
        cells: Vec<HeatCell>,
    },
    AttackPath {
        shapes: usize,
        connectors: usize,
        placements: Vec<NodePlacement>,
        /// Graph links whose endpoints are not nodes of the graph.
        dangling_links: usize,
    },
    Image {
        slices: usize,
        /// Source pixel rows consumed.
        rows_consumed: u32,
    },
}

/// Summary of one rendered section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub kind: SectionKind,
    pub first_page: usize,
    pub last_page: usize,
    pub metrics: SectionMetrics,
}

/// The finished, serializable document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub geometry: PageGeometry,
    pub pages: Vec<Page>,
    pub sections: Vec<SectionRecord>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// First section of the given kind.
    pub fn section(&self, kind: SectionKind) -> Option<(usize, &SectionRecord)> {
        self.sections.iter().enumerate().find(|(_, s)| s.kind == kind)
    }

    /// All operations emitted by a section, across pages.
    pub fn ops_in_section(&self, section: usize) -> impl Iterator<Item = &DrawOp> {
        self.pages
            .iter()
            .flat_map(|p| p.commands.iter())
            .filter(move |c| c.section == section)
            .map(|c| &c.op)
    }

    /// Every text run in the document, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|p| p.ops()).filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Lowest painted point over all pages.
    pub fn max_y(&self) -> f32 {
        self.pages
            .iter()
            .flat_map(|p| p.ops())
            .map(DrawOp::max_y)
            .fold(0.0, f32::max)
    }
}

/// Approximate advance width of `text` in millimetres.
///
/// Uses an average Helvetica glyph width; precise metrics are not needed for
/// wrapping and centring table and chart labels.
pub fn approx_text_width(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * MM_PER_PT * 0.5
}

/// Height of one text line in millimetres.
pub fn line_height(size_pt: f32) -> f32 {
    size_pt * MM_PER_PT * 1.15
}

/// Distance from the top of a line box to its baseline.
pub fn baseline_offset(size_pt: f32) -> f32 {
    size_pt * MM_PER_PT * 0.8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_geometry() {
        let g = PageGeometry::a4();
        assert_eq!(g.width, 210.0);
        assert_eq!(g.content_width(), 182.0);
        assert_eq!(g.bottom_limit(), 277.0);
        assert_eq!(g.usable_height(), 257.0);
    }

    #[test]
    fn test_text_fits_inside_its_line() {
        for size in [8.0, 11.0, 16.0, 18.0] {
            let op = DrawOp::Text {
                x: 0.0,
                y: baseline_offset(size),
                text: "x".into(),
                size,
                bold: false,
                align: TextAlign::Left,
                color: [0, 0, 0],
            };
            assert!(op.max_y() <= line_height(size));
        }
    }

    #[test]
    fn test_max_y_per_op() {
        let rect = DrawOp::Rect {
            x: 0.0,
            y: 10.0,
            w: 5.0,
            h: 4.0,
            fill: None,
            stroke: Some(Stroke::HAIRLINE),
        };
        assert_eq!(rect.max_y(), 14.0);
        assert!(rect.is_shape());
        let line = DrawOp::Line {
            x1: 0.0,
            y1: 3.0,
            x2: 0.0,
            y2: 9.0,
            stroke: Stroke::THIN,
        };
        assert_eq!(line.max_y(), 9.0);
        assert!(!line.is_shape());
    }
}
