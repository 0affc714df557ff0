//! Export orchestration: one operation per document type.
//!
//! Every `build_*` operation lays a document out from scratch (tallies and
//! matrices are recomputed per call) and every `export_*` operation
//! serializes the result and hands it to the configured [`DocumentSink`].

use crate::capture::{RenderSurface, SnapshotCapturer};
use crate::error::ExportError;
use crate::layout::{self, Document, PageGeometry, Section, ShapeStyle};
use crate::pdf::{self, PdfMetadata};
use crate::sink::DocumentSink;
use authenticx_core::{AssetSeverityMatrix, ExportConfig, Finding, Graph, SeverityTally};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

const TITLE_SIZE: f32 = 16.0;
const FULL_TITLE_SIZE: f32 = 18.0;
const SUMMARY_SIZE: f32 = 12.0;
const SECTION_GAP: f32 = 8.0;

/// The document types the dashboard can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Table,
    Chart,
    Graph,
    Heatmap,
    Full,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Table,
        DocumentKind::Chart,
        DocumentKind::Graph,
        DocumentKind::Heatmap,
        DocumentKind::Full,
    ];

    /// File name stem shared by every export of this type.
    pub fn file_prefix(self) -> &'static str {
        match self {
            DocumentKind::Table => "VulnerabilityTable",
            DocumentKind::Chart => "SeverityChart",
            DocumentKind::Graph => "AttackPathGraph",
            DocumentKind::Heatmap => "SeverityHeatmap",
            DocumentKind::Full => "FullReport",
        }
    }

    /// Human-readable document title.
    pub fn title(self) -> &'static str {
        match self {
            DocumentKind::Table => "Vulnerability Table",
            DocumentKind::Chart => "Severity Distribution",
            DocumentKind::Graph => "Attack Path Graph",
            DocumentKind::Heatmap => "Severity Heatmap",
            DocumentKind::Full => "Full Report",
        }
    }

    /// `{prefix}_{target}.pdf`, with the target made safe for a file name.
    pub fn file_name(self, target: &str) -> String {
        format!("{}_{}.pdf", self.file_prefix(), sanitize_target(target))
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Replace path separators and control characters with `_`.
pub fn sanitize_target(target: &str) -> String {
    let cleaned: String = target
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".repeat(cleaned.len().max(1)),
        _ => cleaned,
    }
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub kind: DocumentKind,
    pub file_name: String,
    pub path: PathBuf,
    pub pages: usize,
    pub bytes: usize,
}

/// Builds and saves report documents.
pub struct ReportExporter {
    sink: Arc<dyn DocumentSink>,
    geometry: PageGeometry,
    capturer: SnapshotCapturer,
    producer: String,
}

impl fmt::Debug for ReportExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportExporter")
            .field("geometry", &self.geometry)
            .field("capturer", &self.capturer)
            .field("producer", &self.producer)
            .finish_non_exhaustive()
    }
}

impl ReportExporter {
    /// Exporter with default page, capture and metadata settings.
    pub fn new(sink: Arc<dyn DocumentSink>) -> Self {
        Self::with_settings(&ExportConfig::default(), sink)
    }

    /// Exporter for a loaded configuration.
    ///
    /// Page geometry that leaves too little room to lay out content is
    /// rejected before anything is built.
    pub fn from_config(
        config: &ExportConfig,
        sink: Arc<dyn DocumentSink>,
    ) -> Result<Self, ExportError> {
        let config = config.clone().validated()?;
        Ok(Self::with_settings(&config, sink))
    }

    fn with_settings(config: &ExportConfig, sink: Arc<dyn DocumentSink>) -> Self {
        Self {
            sink,
            geometry: PageGeometry::from_config(&config.page),
            capturer: SnapshotCapturer::from_config(&config.capture),
            producer: config.report.producer.clone(),
        }
    }

    pub fn with_capturer(mut self, capturer: SnapshotCapturer) -> Self {
        self.capturer = capturer;
        self
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Title line, then the findings table.
    pub fn build_table(&self, findings: &[Finding], target: &str) -> Document {
        let title = titled(DocumentKind::Table, target);
        layout::layout(
            &title,
            self.geometry,
            &[
                Section::heading(title.clone(), TITLE_SIZE),
                Section::Spacer(4.0),
                Section::Table(findings.to_vec()),
            ],
        )
    }

    /// Title line, then the severity bar chart.
    pub fn build_chart(&self, findings: &[Finding], target: &str) -> Document {
        let title = titled(DocumentKind::Chart, target);
        layout::layout(
            &title,
            self.geometry,
            &[
                Section::heading(title.clone(), TITLE_SIZE),
                Section::Spacer(SECTION_GAP),
                Section::BarChart {
                    heading: None,
                    tally: SeverityTally::from_findings(findings),
                },
            ],
        )
    }

    /// Title line, then the attack path with shapes filled by node group.
    pub fn build_graph(&self, graph: &Graph, target: &str) -> Document {
        let title = titled(DocumentKind::Graph, target);
        layout::layout(
            &title,
            self.geometry,
            &[
                Section::heading(title.clone(), TITLE_SIZE),
                Section::Spacer(SECTION_GAP),
                Section::AttackPath {
                    heading: None,
                    graph: graph.clone(),
                    style: ShapeStyle::Filled,
                },
            ],
        )
    }

    /// Title, summary, table, bar chart, heatmap grid and attack path.
    pub fn build_full(&self, findings: &[Finding], graph: &Graph, target: &str) -> Document {
        let title = titled(DocumentKind::Full, target);
        layout::layout(
            &title,
            self.geometry,
            &[
                Section::heading(title.clone(), FULL_TITLE_SIZE),
                Section::text(
                    format!("Total Vulnerabilities: {}", findings.len()),
                    SUMMARY_SIZE,
                ),
                Section::Spacer(4.0),
                Section::Table(findings.to_vec()),
                Section::Spacer(SECTION_GAP),
                Section::BarChart {
                    heading: Some("Severity Distribution".into()),
                    tally: SeverityTally::from_findings(findings),
                },
                Section::Spacer(SECTION_GAP),
                Section::Heatmap {
                    heading: Some("Asset Severity Heatmap".into()),
                    matrix: AssetSeverityMatrix::from_findings(findings),
                },
                Section::Spacer(SECTION_GAP),
                Section::AttackPath {
                    heading: Some("Attack Path Graph".into()),
                    graph: graph.clone(),
                    style: ShapeStyle::Outline,
                },
            ],
        )
    }

    /// Capture `region` from a live surface and place the snapshot under a
    /// title, sliced across as many pages as it needs.
    pub async fn build_heatmap(
        &self,
        surface: &dyn RenderSurface,
        region: &str,
        target: &str,
    ) -> Result<Document, ExportError> {
        let snapshot = self.capturer.capture(surface, region).await?;
        let title = titled(DocumentKind::Heatmap, target);
        Ok(layout::layout(
            &title,
            self.geometry,
            &[
                Section::heading(title.clone(), TITLE_SIZE),
                Section::Spacer(4.0),
                Section::Image(snapshot.image),
            ],
        ))
    }

    pub fn export_table(
        &self,
        findings: &[Finding],
        target: &str,
    ) -> Result<ExportReceipt, ExportError> {
        let doc = self.build_table(findings, target);
        self.save(DocumentKind::Table, target, &doc)
    }

    pub fn export_chart(
        &self,
        findings: &[Finding],
        target: &str,
    ) -> Result<ExportReceipt, ExportError> {
        let doc = self.build_chart(findings, target);
        self.save(DocumentKind::Chart, target, &doc)
    }

    pub fn export_graph(&self, graph: &Graph, target: &str) -> Result<ExportReceipt, ExportError> {
        let doc = self.build_graph(graph, target);
        self.save(DocumentKind::Graph, target, &doc)
    }

    pub fn export_full(
        &self,
        findings: &[Finding],
        graph: &Graph,
        target: &str,
    ) -> Result<ExportReceipt, ExportError> {
        let doc = self.build_full(findings, graph, target);
        self.save(DocumentKind::Full, target, &doc)
    }

    /// Capture and save the heatmap. Nothing is saved if capture fails.
    pub async fn export_heatmap(
        &self,
        surface: &dyn RenderSurface,
        region: &str,
        target: &str,
    ) -> Result<ExportReceipt, ExportError> {
        let doc = self.build_heatmap(surface, region, target).await?;
        self.save(DocumentKind::Heatmap, target, &doc)
    }

    fn save(
        &self,
        kind: DocumentKind,
        target: &str,
        doc: &Document,
    ) -> Result<ExportReceipt, ExportError> {
        let meta = PdfMetadata {
            producer: self.producer.clone(),
        };
        let bytes = pdf::serialize(doc, &meta)?;
        let file_name = kind.file_name(target);
        let path = self.sink.save(&file_name, &bytes)?;
        tracing::info!(
            "Exported {} for {} to {} ({} pages)",
            kind,
            target,
            path.display(),
            doc.page_count()
        );
        Ok(ExportReceipt {
            kind,
            file_name,
            path,
            pages: doc.page_count(),
            bytes: bytes.len(),
        })
    }
}

fn titled(kind: DocumentKind, target: &str) -> String {
    format!("{} - {}", kind.title(), target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{SectionKind, SectionMetrics};
    use crate::sink::MemorySink;
    use authenticx_core::Severity;
    use pretty_assertions::assert_eq;

    fn exporter() -> (Arc<MemorySink>, ReportExporter) {
        let sink = Arc::new(MemorySink::new());
        let exporter = ReportExporter::new(sink.clone());
        (sink, exporter)
    }

    #[test]
    fn test_from_config_rejects_cramped_pages() {
        let mut config = ExportConfig::default();
        config.page.margin_top = 145.0;
        config.page.margin_bottom = 145.0;
        let err = ReportExporter::from_config(&config, Arc::new(MemorySink::new())).unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error: "));
    }

    #[test]
    fn test_from_config_uses_page_settings() {
        let mut config = ExportConfig::default();
        config.page.margin_left = 20.0;
        let exporter = ReportExporter::from_config(&config, Arc::new(MemorySink::new())).unwrap();
        assert_eq!(exporter.geometry().margin_left, 20.0);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            DocumentKind::Table.file_name("examplebank.com"),
            "VulnerabilityTable_examplebank.com.pdf"
        );
        assert_eq!(
            DocumentKind::Heatmap.file_name("a/b"),
            "SeverityHeatmap_a_b.pdf"
        );
        assert_eq!(DocumentKind::Full.file_name(".."), "FullReport___.pdf");
    }

    #[test]
    fn test_sanitize_target() {
        assert_eq!(sanitize_target("shopsecure.io"), "shopsecure.io");
        assert_eq!(sanitize_target("..\\evil\n"), ".._evil_");
        assert_eq!(sanitize_target(""), "_");
    }

    #[test]
    fn test_table_document_starts_with_title() {
        let (_, exporter) = exporter();
        let doc = exporter.build_table(&[Finding::new("CVE-1", Severity::Low, 2.0)], "t");
        assert_eq!(doc.title, "Vulnerability Table - t");
        assert_eq!(doc.texts().next(), Some("Vulnerability Table - t"));
        let (_, table) = doc.section(SectionKind::Table).unwrap();
        assert!(matches!(
            table.metrics,
            SectionMetrics::Table {
                rows: 1,
                header_rows: 1
            }
        ));
    }

    #[test]
    fn test_full_report_section_order() {
        let (_, exporter) = exporter();
        let findings = vec![Finding::new("CVE-1", Severity::High, 7.0).with_asset("a")];
        let graph = Graph::from_findings("t", &findings);
        let doc = exporter.build_full(&findings, &graph, "t");
        let kinds: Vec<SectionKind> = doc
            .sections
            .iter()
            .map(|s| s.kind)
            .filter(|k| *k != SectionKind::Spacer)
            .collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Text,
                SectionKind::Text,
                SectionKind::Table,
                SectionKind::BarChart,
                SectionKind::Heatmap,
                SectionKind::AttackPath,
            ]
        );
        assert!(doc.texts().any(|t| t == "Total Vulnerabilities: 1"));
    }

    #[test]
    fn test_export_saves_to_sink() {
        let (sink, exporter) = exporter();
        let receipt = exporter
            .export_chart(&[Finding::new("CVE-1", Severity::Critical, 9.0)], "x.com")
            .unwrap();
        assert_eq!(receipt.file_name, "SeverityChart_x.com.pdf");
        assert_eq!(receipt.pages, 1);
        let bytes = sink.get("SeverityChart_x.com.pdf").unwrap();
        assert_eq!(bytes.len(), receipt.bytes);
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
