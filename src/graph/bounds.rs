//! Segment bounding boxes
//!
//! Post-layout pass computing one axis-aligned rectangle per segment from
//! its member nodes' final positions and sizes. Stateless: recomputed from
//! scratch after every layout, and idempotent for unchanged input.

use std::collections::BTreeMap;

use super::types::{FlowGraph, SegmentBounds};

/// Margin added on every side of a segment box, identical for all
/// segments and nesting levels
pub const SEGMENT_MARGIN: f32 = 50.0;

/// Compute one bounding box per segment with at least one laid-out member
/// node. Segments whose members are all missing or unpositioned produce
/// no entry and must not be rendered.
pub fn compute_segment_bounds(graph: &FlowGraph) -> BTreeMap<String, SegmentBounds> {
    let mut bounds = BTreeMap::new();

    for segment in &graph.segments {
        let mut current: Option<SegmentBounds> = None;

        for member in &segment.members {
            let Some(node) = graph.get_node(member) else {
                continue;
            };
            let Some((x, y, w, h)) = node.rect() else {
                continue;
            };

            let b = current.get_or_insert(SegmentBounds {
                min_x: f32::INFINITY,
                min_y: f32::INFINITY,
                max_x: f32::NEG_INFINITY,
                max_y: f32::NEG_INFINITY,
            });
            b.min_x = b.min_x.min(x - SEGMENT_MARGIN);
            b.min_y = b.min_y.min(y - SEGMENT_MARGIN);
            b.max_x = b.max_x.max(x + w + SEGMENT_MARGIN);
            b.max_y = b.max_y.max(y + h + SEGMENT_MARGIN);
        }

        if let Some(b) = current {
            bounds.insert(segment.name.clone(), b);
        }
    }

    bounds
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::FlowGraphBuilder;
    use crate::graph::layout::{LayoutDirection, LayoutEngine};
    use crate::model::Integration;

    fn laid_out(yaml: &str) -> FlowGraph {
        let integration: Integration = serde_yaml::from_str(yaml).unwrap();
        let mut graph = FlowGraphBuilder::new(&integration).build();
        LayoutEngine::new(LayoutDirection::LeftToRight).layout(&mut graph);
        graph
    }

    #[test]
    fn test_single_node_box_is_tight() {
        let graph = laid_out(
            r#"
name: delta demo
stand: IFT
flowName: delta-demo
segments:
  - segment: delta
    elements:
      - id: 0
        type: kafka
        name: DELTA.TOPIC.EVENT.V1
"#,
        );
        let bounds = compute_segment_bounds(&graph);
        assert_eq!(bounds.len(), 1);

        let node = graph.get_node("0").unwrap();
        let (x, y, w, h) = node.rect().unwrap();
        let b = &bounds["delta"];
        assert_eq!(b.min_x, x - SEGMENT_MARGIN);
        assert_eq!(b.min_y, y - SEGMENT_MARGIN);
        assert_eq!(b.max_x, x + w + SEGMENT_MARGIN);
        assert_eq!(b.max_y, y + h + SEGMENT_MARGIN);
    }

    #[test]
    fn test_box_contains_all_members_with_margin() {
        let graph = laid_out(
            r#"
name: multi
stand: IFT
flowName: multi
segments:
  - segment: alpha
    elements:
      - id: 1
        type: nginx
        next: 2
      - id: 2
        type: kafka
  - segment: omega
    elements:
      - id: 3
        type: geo-load-balancer
"#,
        );
        let bounds = compute_segment_bounds(&graph);
        assert_eq!(bounds.len(), 2);

        for segment in &graph.segments {
            let b = &bounds[&segment.name];
            let mut touches_left = false;
            for member in &segment.members {
                let (x, y, w, h) = graph.get_node(member).unwrap().rect().unwrap();
                assert!(b.min_x <= x - SEGMENT_MARGIN);
                assert!(b.max_x >= x + w + SEGMENT_MARGIN);
                assert!(b.min_y <= y - SEGMENT_MARGIN);
                assert!(b.max_y >= y + h + SEGMENT_MARGIN);
                if (b.min_x - (x - SEGMENT_MARGIN)).abs() < f32::EPSILON {
                    touches_left = true;
                }
            }
            // Tightness: the box sits margin-distance from some member
            assert!(touches_left);
        }
    }

    #[test]
    fn test_empty_segment_produces_no_box() {
        let graph = laid_out(
            r#"
name: hollow
stand: IFT
flowName: hollow
segments:
  - segment: alpha
    elements:
      - id: 1
        type: kafka
  - segment: ghost
    elements: []
"#,
        );
        let bounds = compute_segment_bounds(&graph);
        assert!(bounds.contains_key("alpha"));
        assert!(!bounds.contains_key("ghost"));
    }

    #[test]
    fn test_recompute_is_byte_identical() {
        let graph = laid_out(
            r#"
name: stable
stand: IFT
flowName: stable
segments:
  - segment: alpha
    elements:
      - id: 1
        type: nginx
        next: 2
      - id: 2
        type: k8s
        services:
          - id: 20
            service: api
"#,
        );
        let a = compute_segment_bounds(&graph);
        let b = compute_segment_bounds(&graph);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }
}
