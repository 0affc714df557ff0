//! Paginated document layout.
//!
//! A [`LayoutEngine`] owns a growing [`Document`] and a vertical cursor. Each
//! [`Section`] is laid out in order; sections break onto new pages whenever
//! their next piece would cross the bottom margin.

pub mod attack_path;
pub mod chart;
pub mod document;
pub mod heatmap;
pub mod slices;
pub mod table;

use authenticx_core::{AssetSeverityMatrix, Finding, Graph, SeverityTally};
use image::RgbaImage;
use std::sync::Arc;

pub use document::{
    BarMetric, DrawCommand, DrawOp, Document, HeatCell, NodePlacement, Page, PageGeometry,
    SectionKind, SectionMetrics, SectionRecord, Stroke, TextAlign,
};
use document::{baseline_offset, line_height};

/// How attack-path node shapes are painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeStyle {
    /// Colored by node group.
    Filled,
    /// Outline only.
    Outline,
}

/// A unit of content to lay out.
#[derive(Debug, Clone)]
pub enum Section {
    /// A single line of text, drawn at the cursor.
    Text { text: String, size: f32, bold: bool },
    /// Blank vertical space.
    Spacer(f32),
    /// Findings table with a repeated header row.
    Table(Vec<Finding>),
    /// Severity bar chart.
    BarChart {
        heading: Option<String>,
        tally: SeverityTally,
    },
    /// Asset by severity grid.
    Heatmap {
        heading: Option<String>,
        matrix: AssetSeverityMatrix,
    },
    /// Vertical chain of graph nodes.
    AttackPath {
        heading: Option<String>,
        graph: Graph,
        style: ShapeStyle,
    },
    /// Raster image scaled to the content width and sliced across pages.
    Image(Arc<RgbaImage>),
}

impl Section {
    pub fn text(text: impl Into<String>, size: f32) -> Self {
        Section::Text {
            text: text.into(),
            size,
            bold: false,
        }
    }

    pub fn heading(text: impl Into<String>, size: f32) -> Self {
        Section::Text {
            text: text.into(),
            size,
            bold: true,
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Text { .. } => SectionKind::Text,
            Section::Spacer(_) => SectionKind::Spacer,
            Section::Table(_) => SectionKind::Table,
            Section::BarChart { .. } => SectionKind::BarChart,
            Section::Heatmap { .. } => SectionKind::Heatmap,
            Section::AttackPath { .. } => SectionKind::AttackPath,
            Section::Image(_) => SectionKind::Image,
        }
    }
}

/// Cursor-driven page builder.
#[derive(Debug)]
pub struct LayoutEngine {
    doc: Document,
    cursor: f32,
    section: usize,
}

impl LayoutEngine {
    /// Start a document with one empty page and the cursor at the top margin.
    pub fn new(title: impl Into<String>, geometry: PageGeometry) -> Self {
        Self {
            doc: Document {
                title: title.into(),
                geometry,
                pages: vec![Page::default()],
                sections: Vec::new(),
            },
            cursor: geometry.margin_top,
            section: 0,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.doc.geometry
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    /// Zero-based index of the page currently being filled.
    pub fn page_index(&self) -> usize {
        self.doc.pages.len() - 1
    }

    /// Room left between the cursor and the bottom margin.
    pub fn remaining(&self) -> f32 {
        self.doc.geometry.bottom_limit() - self.cursor
    }

    /// Whether the cursor sits at the top margin of its page.
    pub fn at_page_top(&self) -> bool {
        self.cursor <= self.doc.geometry.margin_top + f32::EPSILON
    }

    pub(crate) fn advance(&mut self, dy: f32) {
        self.cursor += dy;
    }

    pub(crate) fn new_page(&mut self) {
        self.doc.pages.push(Page::default());
        self.cursor = self.doc.geometry.margin_top;
    }

    /// Break to a new page unless `height` fits below the cursor.
    ///
    /// Never breaks at the top of a page, so content taller than a page is
    /// placed there and left to the section to split.
    pub(crate) fn ensure_space(&mut self, height: f32) -> bool {
        if height <= self.remaining() + 1e-3 || self.at_page_top() {
            return false;
        }
        self.new_page();
        true
    }

    pub(crate) fn push(&mut self, op: DrawOp) {
        let command = DrawCommand {
            section: self.section,
            op,
        };
        if let Some(page) = self.doc.pages.last_mut() {
            page.commands.push(command);
        }
    }

    pub(crate) fn text(
        &mut self,
        x: f32,
        y: f32,
        text: impl Into<String>,
        size: f32,
        bold: bool,
        align: TextAlign,
    ) {
        self.push(DrawOp::Text {
            x,
            y,
            text: text.into(),
            size,
            bold,
            align,
            color: [0, 0, 0],
        });
    }

    /// Draw a left-aligned line of text at the cursor and move past it.
    pub(crate) fn text_line(&mut self, text: &str, size: f32, bold: bool) {
        let h = line_height(size);
        self.ensure_space(h);
        let x = self.doc.geometry.margin_left;
        let y = self.cursor + baseline_offset(size);
        self.text(x, y, text, size, bold, TextAlign::Left);
        self.cursor += h;
    }

    /// Lay out one section and record its metrics.
    pub fn add(&mut self, section: &Section) -> &SectionRecord {
        self.section = self.doc.sections.len();
        let start_page = self.page_index();
        let metrics = match section {
            Section::Text { text, size, bold } => {
                self.text_line(text, *size, *bold);
                SectionMetrics::Text { lines: 1 }
            }
            Section::Spacer(height) => {
                // space at the bottom of a page is simply dropped
                self.cursor =
                    (self.cursor + height.max(0.0)).min(self.doc.geometry.bottom_limit());
                SectionMetrics::Spacer
            }
            Section::Table(findings) => table::layout(self, findings),
            Section::BarChart { heading, tally } => chart::layout(self, heading.as_deref(), tally),
            Section::Heatmap { heading, matrix } => {
                heatmap::layout(self, heading.as_deref(), matrix)
            }
            Section::AttackPath {
                heading,
                graph,
                style,
            } => attack_path::layout(self, heading.as_deref(), graph, *style),
            Section::Image(image) => slices::layout(self, image),
        };
        // a section that broke before drawing anything starts on the later page
        let first_page = (start_page..self.doc.pages.len())
            .find(|&i| {
                self.doc.pages[i]
                    .commands
                    .iter()
                    .any(|c| c.section == self.section)
            })
            .unwrap_or(start_page);
        let record = SectionRecord {
            kind: section.kind(),
            first_page,
            last_page: self.page_index(),
            metrics,
        };
        tracing::trace!(
            "Laid out {:?} section on pages {}..={}",
            record.kind,
            record.first_page,
            record.last_page
        );
        self.doc.sections.push(record);
        let idx = self.doc.sections.len() - 1;
        &self.doc.sections[idx]
    }

    /// Finish layout and hand over the document.
    pub fn finish(self) -> Document {
        self.doc
    }
}

/// Lay out a list of sections into a fresh document.
pub fn layout(title: &str, geometry: PageGeometry, sections: &[Section]) -> Document {
    let mut engine = LayoutEngine::new(title, geometry);
    for section in sections {
        engine.add(section);
    }
    engine.finish()
}
