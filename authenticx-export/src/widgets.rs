//! Dashboard widgets as element trees.
//!
//! Styles use the dashboard's OKLCH palette, so the trees cannot be
//! rasterized until their colors are normalized.

use crate::capture::Element;
use authenticx_core::{AssetSeverityMatrix, Finding, Severity, SeverityTally};
use image::{Rgba, RgbaImage};

pub const HEATMAP_REGION: &str = "heatmap-section";
pub const HEATMAP_TITLE: &str = "Asset Severity Heatmap";

const WIDGET_WIDTH: u32 = 800;

const WHITE: &str = "oklch(100% 0 0)";
const GRAY_50: &str = "oklch(98.5% 0.002 247.839)";
const GRAY_300: &str = "oklch(87.2% 0.01 258.338)";
const GRAY_400: &str = "oklch(70.7% 0.022 261.325)";
const GRAY_600: &str = "oklch(44.6% 0.03 256.802)";
const GRAY_700: &str = "oklch(37.3% 0.034 259.733)";
const GRAY_800: &str = "oklch(27.8% 0.033 256.848)";
const SLATE_100: &str = "oklch(96.8% 0.007 247.896)";
const SLATE_600: &str = "oklch(44.6% 0.043 257.281)";

/// Shades 900, 800, 700, 600 per severity, used at rising intensity.
fn shades(severity: Severity) -> [&'static str; 4] {
    match severity {
        Severity::Critical => [
            "39.6% 0.141 25.723",
            "44.4% 0.177 26.899",
            "50.5% 0.213 27.518",
            "57.7% 0.245 27.325",
        ],
        Severity::High => [
            "40.8% 0.123 38.172",
            "47% 0.157 37.304",
            "55.3% 0.195 38.402",
            "64.6% 0.222 41.116",
        ],
        Severity::Medium => [
            "42.1% 0.095 57.708",
            "47.6% 0.114 61.907",
            "55.4% 0.135 66.442",
            "68.1% 0.162 75.834",
        ],
        Severity::Low => [
            "39.3% 0.095 152.535",
            "44.8% 0.119 151.328",
            "52.7% 0.154 150.069",
            "62.7% 0.194 149.214",
        ],
    }
}

const SHADE_ALPHA: [&str; 4] = ["0.3", "0.5", "0.7", "0.9"];

/// Background of a heatmap cell: a gray for zero, otherwise one of four
/// severity shades picked by `count / max`.
pub fn cell_background(severity: Severity, count: usize, max: usize) -> String {
    if count == 0 {
        return GRAY_700.to_string();
    }
    let intensity = (count as f32 / max.max(1) as f32).min(1.0);
    let bucket = ((intensity * 4.0).floor() as usize).min(3);
    format!(
        "oklch({} / {})",
        shades(severity)[bucket],
        SHADE_ALPHA[bucket]
    )
}

/// Small severity distribution chart, as the chart library paints it.
pub fn severity_sparkline(tally: &SeverityTally) -> RgbaImage {
    const W: u32 = 160;
    const H: u32 = 40;
    const BAR: u32 = 30;
    const GAP: u32 = 10;
    let mut img = RgbaImage::from_pixel(W, H, Rgba([255, 255, 255, 255]));
    let max = tally.max().max(1);
    for (i, (severity, count)) in tally.iter().enumerate() {
        let h = (count as u64 * H as u64 / max as u64) as u32;
        let [r, g, b] = severity.base_color();
        let x0 = i as u32 * (BAR + GAP);
        for x in x0..(x0 + BAR).min(W) {
            for y in (H - h)..H {
                img.put_pixel(x, y, Rgba([r, g, b, 255]));
            }
        }
    }
    img
}

fn cell(text: impl Into<String>, background: &str, color: &str) -> Element {
    Element::block()
        .padding(12)
        .style("background-color", background)
        .child(
            Element::text(text)
                .style("color", color)
                .style("font-size", "14px"),
        )
}

/// The dashboard's collapsible heatmap card, collapsed as on first render.
pub fn heatmap_widget(findings: &[Finding], region: &str) -> Element {
    let matrix = AssetSeverityMatrix::from_findings(findings);
    let tally = SeverityTally::from_findings(findings);

    let header = Element::row()
        .height(48)
        .padding(6)
        .child(
            Element::text(HEATMAP_TITLE)
                .style("color", GRAY_800)
                .style("font-size", "18px"),
        )
        .child(Element::canvas(severity_sparkline(&tally)).named("severity-sparkline"));

    let mut details = Element::block()
        .named("heatmap-details")
        .collapsible(false)
        .padding(16);

    if matrix.is_empty() {
        details = details.child(
            Element::text("No vulnerability data available")
                .padding(32)
                .style("color", GRAY_400),
        );
    } else {
        let max = matrix.max_count();
        let mut head = Element::row().child(cell("Asset", GRAY_800, GRAY_300));
        for severity in Severity::ORDERED {
            head = head.child(cell(severity.label(), GRAY_800, GRAY_300));
        }
        details = details.child(head.child(cell("Total", GRAY_800, GRAY_300)));

        for row in matrix.rows() {
            let mut line = Element::row().child(cell(row.asset.clone(), GRAY_800, GRAY_300));
            for severity in Severity::ORDERED {
                let count = row.get(severity);
                let mut c = cell(
                    count.to_string(),
                    &cell_background(severity, count, max),
                    WHITE,
                );
                if count == 0 {
                    c = c.style("border-color", GRAY_600);
                }
                line = line.child(c);
            }
            details = details.child(line.child(cell(row.total().to_string(), SLATE_600, SLATE_100)));
        }

        details = details.child(
            Element::block()
                .padding(16)
                .style("background-color", GRAY_800)
                .child(Element::text("Legend").style("color", GRAY_300))
                .child(
                    Element::row()
                        .height(16)
                        .children(Severity::ORDERED.into_iter().rev().map(|s| {
                            Element::block().width(12).height(12).style(
                                "background-color",
                                format!("oklch({})", shades(s)[2]),
                            )
                        })),
                ),
        );
    }

    Element::block()
        .named(region)
        .width(WIDGET_WIDTH)
        .style("background-color", WHITE)
        .style("border-color", GRAY_700)
        .child(
            Element::block()
                .padding(8)
                .style("background-color", GRAY_50)
                .child(header)
                .child(details),
        )
}
