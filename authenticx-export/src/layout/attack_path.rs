//! Attack path: graph nodes drawn as a vertical chain in input order.
//!
//! Each node gets a shape by group and its label beside it. Consecutive nodes
//! on the same page are joined by a downward arrow; a page break leaves the
//! pair unconnected and repeats the heading at the top of the new page.
//! Chains short enough for one page start on a fresh page rather than split.

use super::document::{DrawOp, NodePlacement, Stroke, TextAlign, line_height};
use super::{LayoutEngine, SectionMetrics, ShapeStyle};
use authenticx_core::{Graph, Node, NodeGroup};

pub const NODE_SPACING: f32 = 40.0;
/// Half-height of the tallest node shape.
pub const NODE_EXTENT: f32 = 10.0;
pub const NODE_INDENT: f32 = 26.0;

const CIRCLE_RADIUS: f32 = 10.0;
const RECT_W: f32 = 30.0;
const RECT_H: f32 = 16.0;
const HEADING_SIZE: f32 = 14.0;
const LABEL_SIZE: f32 = 11.0;
const LABEL_OFFSET: f32 = 25.0;
const CONNECTOR_GAP: f32 = 12.0;
const ARROW: f32 = 3.0;
const ARROW_STROKE: Stroke = Stroke {
    color: [0, 0, 0],
    width: 0.4,
};

/// Fill color for a node group.
pub fn group_color(group: NodeGroup) -> [u8; 3] {
    match group {
        NodeGroup::Vulnerability => [239, 68, 68],
        NodeGroup::Asset => [59, 130, 246],
        NodeGroup::Entry => [34, 197, 94],
        NodeGroup::Unknown => [148, 163, 184],
    }
}

fn display_label(node: &Node) -> &str {
    if node.label.trim().is_empty() {
        &node.id
    } else {
        &node.label
    }
}

pub(crate) fn layout(
    engine: &mut LayoutEngine,
    heading: Option<&str>,
    graph: &Graph,
    style: ShapeStyle,
) -> SectionMetrics {
    let heading_h = heading.map_or(0.0, |_| line_height(HEADING_SIZE) + 2.0);
    let lead = 4.0 + NODE_EXTENT;
    let first_need = if graph.nodes.is_empty() {
        heading_h
    } else {
        heading_h + lead + NODE_EXTENT
    };
    // a chain that fits on one page is kept together
    let whole = first_need + graph.nodes.len().saturating_sub(1) as f32 * NODE_SPACING;
    if whole <= engine.geometry().usable_height() + 1e-3 {
        engine.ensure_space(whole);
    } else {
        engine.ensure_space(first_need);
    }
    if let Some(text) = heading {
        engine.text_line(text, HEADING_SIZE, true);
        engine.advance(2.0);
    }

    let x = engine.geometry().margin_left + NODE_INDENT;
    let bottom = engine.geometry().bottom_limit();
    let mut shapes = 0;
    let mut connectors = 0;
    let mut placements: Vec<NodePlacement> = Vec::with_capacity(graph.nodes.len());

    for (i, node) in graph.nodes.iter().enumerate() {
        let mut y = match placements.last() {
            Some(prev) => prev.y + NODE_SPACING,
            None => engine.cursor() + lead,
        };
        let mut connected = i > 0;
        // the first node already had room reserved above
        if i > 0 && y + NODE_EXTENT > bottom + 1e-3 {
            engine.new_page();
            if let Some(text) = heading {
                engine.text_line(&format!("{text} (continued)"), HEADING_SIZE, true);
                engine.advance(2.0);
            }
            y = engine.cursor() + lead;
            connected = false;
        }
        if connected && let Some(prev) = placements.last() {
            draw_connector(engine, x, prev.y, y);
            connectors += 1;
        }
        draw_node(engine, x, y, node, style);
        shapes += 1;
        placements.push(NodePlacement {
            id: node.id.clone(),
            page: engine.page_index(),
            y,
        });
    }

    if let Some(last) = placements.last() {
        let end = last.y + NODE_EXTENT;
        if end > engine.cursor() {
            engine.advance(end - engine.cursor());
        }
    }

    let dangling = graph.dangling_links();
    for link in &dangling {
        tracing::warn!(
            "Attack path link {} -> {} references an unknown node",
            link.source,
            link.target
        );
    }
    tracing::debug!(
        "Attack path: {} nodes, {} connectors, {} links in graph",
        shapes,
        connectors,
        graph.links.len()
    );
    SectionMetrics::AttackPath {
        shapes,
        connectors,
        placements,
        dangling_links: dangling.len(),
    }
}

fn draw_node(engine: &mut LayoutEngine, x: f32, y: f32, node: &Node, style: ShapeStyle) {
    let (fill, stroke) = match style {
        ShapeStyle::Filled => (Some(group_color(node.group)), None),
        ShapeStyle::Outline => (None, Some(Stroke::THIN)),
    };
    if node.group == NodeGroup::Vulnerability {
        engine.push(DrawOp::Circle {
            cx: x,
            cy: y,
            r: CIRCLE_RADIUS,
            fill,
            stroke,
        });
    } else {
        engine.push(DrawOp::Rect {
            x: x - RECT_W / 2.0,
            y: y - RECT_H / 2.0,
            w: RECT_W,
            h: RECT_H,
            fill,
            stroke,
        });
    }
    engine.text(
        x + LABEL_OFFSET,
        y + 3.0,
        display_label(node),
        LABEL_SIZE,
        false,
        TextAlign::Left,
    );
}

/// Shaft from below one node to above the next, with a two-stroke head.
fn draw_connector(engine: &mut LayoutEngine, x: f32, from: f32, to: f32) {
    let start = from + CONNECTOR_GAP;
    let tip = to - CONNECTOR_GAP;
    engine.push(DrawOp::Line {
        x1: x,
        y1: start,
        x2: x,
        y2: tip,
        stroke: ARROW_STROKE,
    });
    for dx in [-ARROW, ARROW] {
        engine.push(DrawOp::Line {
            x1: x + dx,
            y1: tip - ARROW,
            x2: x,
            y2: tip,
            stroke: ARROW_STROKE,
        });
    }
}

/// Number of nodes a fresh page holds below a heading of `heading_h`.
pub fn nodes_per_page(usable_height: f32, heading_h: f32) -> usize {
    let first_center = heading_h + 4.0 + NODE_EXTENT;
    let room = usable_height - first_center - NODE_EXTENT;
    if room < 0.0 {
        return 1;
    }
    (room / NODE_SPACING + 1e-4).floor() as usize + 1
}

/// Height of a section heading as laid out above the chain.
pub fn heading_height() -> f32 {
    line_height(HEADING_SIZE) + 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PageGeometry, Section, layout as layout_doc};
    use authenticx_core::Link;
    use pretty_assertions::assert_eq;

    fn chain(n: usize) -> Graph {
        let nodes = (0..n)
            .map(|i| {
                let group = match i % 4 {
                    0 => NodeGroup::Entry,
                    1 => NodeGroup::Asset,
                    2 => NodeGroup::Vulnerability,
                    _ => NodeGroup::Unknown,
                };
                Node::new(format!("n{i}"), format!("Node {i}"), group)
            })
            .collect();
        Graph::new(nodes, vec![])
    }

    fn metrics(doc: &crate::layout::Document) -> (usize, usize, Vec<NodePlacement>) {
        match &doc.sections[0].metrics {
            SectionMetrics::AttackPath {
                shapes,
                connectors,
                placements,
                ..
            } => (*shapes, *connectors, placements.clone()),
            other => panic!("unexpected metrics {other:?}"),
        }
    }

    fn path_doc(n: usize, style: ShapeStyle) -> crate::layout::Document {
        layout_doc(
            "t",
            PageGeometry::a4(),
            &[Section::AttackPath {
                heading: Some("Attack Path Graph".into()),
                graph: chain(n),
                style,
            }],
        )
    }

    #[test]
    fn test_four_nodes_three_connectors() {
        let doc = path_doc(4, ShapeStyle::Filled);
        let (shapes, connectors, placements) = metrics(&doc);
        assert_eq!(shapes, 4);
        assert_eq!(connectors, 3);
        let ids: Vec<&str> = placements.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["n0", "n1", "n2", "n3"]);
        for pair in placements.windows(2) {
            assert!((pair[1].y - pair[0].y - NODE_SPACING).abs() < 1e-3);
        }
        let circles = doc
            .ops_in_section(0)
            .filter(|op| matches!(op, DrawOp::Circle { .. }))
            .count();
        assert_eq!(circles, 1);
    }

    #[test]
    fn test_filled_shapes_use_group_colors() {
        let doc = path_doc(4, ShapeStyle::Filled);
        let fills: Vec<[u8; 3]> = doc
            .ops_in_section(0)
            .filter_map(|op| match op {
                DrawOp::Rect { fill: Some(f), .. } | DrawOp::Circle { fill: Some(f), .. } => {
                    Some(*f)
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            fills,
            vec![
                group_color(NodeGroup::Entry),
                group_color(NodeGroup::Asset),
                group_color(NodeGroup::Vulnerability),
                group_color(NodeGroup::Unknown),
            ]
        );
    }

    #[test]
    fn test_outline_shapes_have_no_fill() {
        let doc = path_doc(4, ShapeStyle::Outline);
        assert!(doc.ops_in_section(0).all(|op| match op {
            DrawOp::Rect { fill, .. } | DrawOp::Circle { fill, .. } => fill.is_none(),
            _ => true,
        }));
    }

    #[test]
    fn test_labels_fall_back_to_id() {
        let graph = Graph::new(vec![Node::new("Internet", "", NodeGroup::Entry)], vec![]);
        let doc = layout_doc(
            "t",
            PageGeometry::a4(),
            &[Section::AttackPath {
                heading: None,
                graph,
                style: ShapeStyle::Filled,
            }],
        );
        assert!(doc.texts().any(|t| t == "Internet"));
    }

    #[test]
    fn test_empty_graph_draws_heading_only() {
        let doc = path_doc(0, ShapeStyle::Filled);
        let (shapes, connectors, _) = metrics(&doc);
        assert_eq!((shapes, connectors), (0, 0));
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.texts().collect::<Vec<_>>(), vec!["Attack Path Graph"]);
    }

    #[test]
    fn test_dangling_links_are_counted() {
        let mut graph = chain(2);
        graph.links = vec![Link::new("n0", "n1"), Link::new("n1", "ghost")];
        let doc = layout_doc(
            "t",
            PageGeometry::a4(),
            &[Section::AttackPath {
                heading: None,
                graph,
                style: ShapeStyle::Filled,
            }],
        );
        let SectionMetrics::AttackPath { dangling_links, shapes, .. } = &doc.sections[0].metrics
        else {
            panic!("expected attack path metrics");
        };
        assert_eq!(*dangling_links, 1);
        // drawing still follows node order
        assert_eq!(*shapes, 2);
    }

    #[test]
    fn test_cramped_page_places_one_node_per_page() {
        let geometry = PageGeometry {
            margin_top: 140.0,
            margin_bottom: 140.0,
            ..PageGeometry::a4()
        };
        let doc = layout_doc(
            "t",
            geometry,
            &[Section::AttackPath {
                heading: Some("Attack Path Graph".into()),
                graph: chain(3),
                style: ShapeStyle::Outline,
            }],
        );
        let (shapes, connectors, placements) = metrics(&doc);
        assert_eq!(shapes, 3);
        assert_eq!(connectors, 0);
        assert_eq!(doc.page_count(), 3);
        let pages: Vec<usize> = placements.iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![0, 1, 2]);
    }

    #[test]
    fn test_page_break_drops_connector() {
        let per_page = nodes_per_page(257.0, heading_height());
        let doc = path_doc(per_page + 1, ShapeStyle::Filled);
        let (shapes, connectors, placements) = metrics(&doc);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(shapes, per_page + 1);
        assert_eq!(connectors, per_page - 1);
        assert_eq!(placements[per_page].page, 1);
        assert_eq!(placements[per_page - 1].page, 0);
        assert!(doc.texts().any(|t| t == "Attack Path Graph (continued)"));
    }

    #[test]
    fn test_short_chain_moves_to_fresh_page() {
        let doc = layout_doc(
            "t",
            PageGeometry::a4(),
            &[
                Section::Spacer(200.0),
                Section::AttackPath {
                    heading: Some("Attack Path Graph".into()),
                    graph: chain(4),
                    style: ShapeStyle::Outline,
                },
            ],
        );
        assert_eq!(doc.page_count(), 2);
        let SectionMetrics::AttackPath { connectors, .. } = &doc.sections[1].metrics else {
            panic!("expected attack path metrics");
        };
        assert_eq!(*connectors, 3);
        assert_eq!(doc.sections[1].first_page, 1);
    }

    #[test]
    fn test_exact_page_capacity() {
        let per_page = nodes_per_page(257.0, heading_height());
        let doc = path_doc(per_page, ShapeStyle::Filled);
        assert_eq!(doc.page_count(), 1);
        assert!(doc.max_y() <= 277.0 + 1e-3);
    }
}
