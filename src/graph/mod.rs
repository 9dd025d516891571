//! Graph construction and layout for integration flows
//!
//! The pipeline is three pure stages, re-run in full on every data or
//! selection change:
//!
//! ```text
//! Integration (model)
//!        │
//!        ▼
//! FlowGraphBuilder (nodes, edges, emphasis, segment membership)
//!        │
//!        ▼
//! LayoutEngine (layered positions, nested sublayouts)
//!        │
//!        ▼
//! compute_segment_bounds (per-segment boxes)
//! ```

pub mod bounds;
pub mod builder;
pub mod layout;
pub mod types;

pub use bounds::{compute_segment_bounds, SEGMENT_MARGIN};
pub use builder::FlowGraphBuilder;
pub use layout::{LayoutDirection, LayoutEngine, LayoutProfile, LayoutResult};
pub use types::*;

use crate::model::Integration;

/// Run the full rebuild pipeline: build, lay out, compute segment bounds
pub fn build_flow_graph(
    integration: &Integration,
    selected: Option<&str>,
    direction: LayoutDirection,
) -> FlowGraph {
    let mut graph = FlowGraphBuilder::new(integration).selected(selected).build();
    LayoutEngine::new(direction).layout(&mut graph);
    graph.segment_bounds = compute_segment_bounds(&graph);
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_produces_bounds() {
        let integration: Integration = serde_yaml::from_str(
            r#"
name: pipeline
stand: IFT
flowName: pipeline
segments:
  - segment: delta
    elements:
      - id: 0
        type: kafka
"#,
        )
        .unwrap();
        let graph = build_flow_graph(&integration, None, LayoutDirection::LeftToRight);
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.segment_bounds.len(), 1);
        assert!(graph.nodes[0].x.is_some());
    }
}
