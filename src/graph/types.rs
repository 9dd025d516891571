//! Graph types for flow visualization
//!
//! These types are the intermediate representation between the graph
//! builder and its consumers: the layout engine fills in positions, the
//! bounds pass fills in segment rectangles, and the canvas (or the JSON
//! API) renders the result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Node rendering variant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Plain element card
    #[default]
    Simple,
    /// Container card embedding a nested service subgraph (`k8s`)
    Composite,
}

/// Derived highlight level, propagated backward through reachability
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    #[default]
    Normal,
    Warn,
    Error,
}

/// A positioned node of the flow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    /// Element type tag (kafka, nginx, k8s, ...)
    pub type_tag: String,
    /// Owning segment name
    pub segment: String,
    pub warn: u32,
    pub error: u32,
    pub selected: bool,
    /// Size hint, assigned by the builder and authoritative for layout
    /// and bounds alike
    pub width: f32,
    pub height: f32,
    /// Top-left position, computed by the layout engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Rank layer index assigned during layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    /// Nested service rows (composite nodes only), positioned in local
    /// coordinates relative to the container's content origin
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceNode>,
    /// Edges between nested services (composite nodes only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_edges: Vec<FlowEdge>,
    /// Full element attributes for detail views
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl FlowNode {
    /// Bounding box as (x, y, w, h), if laid out
    pub fn rect(&self) -> Option<(f32, f32, f32, f32)> {
        Some((self.x?, self.y?, self.width, self.height))
    }
}

/// A nested service row inside a composite node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceNode {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    pub warn: u32,
    pub error: u32,
    pub selected: bool,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
}

/// An edge between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub emphasis: Emphasis,
}

/// Segment membership, in document order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub name: String,
    /// Member node ids
    pub members: Vec<String>,
}

/// Axis-aligned segment bounding box, margin included
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl SegmentBounds {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Anchor point for the segment label, offset from the top-left corner
    pub fn label_anchor(&self) -> (f32, f32) {
        (self.min_x + 20.0, self.min_y - 30.0)
    }
}

/// Statistics about the graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_type: BTreeMap<String, usize>,
}

/// Graph projection of one integration, ready for layout and rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowGraph {
    pub name: String,
    pub stand: String,
    pub flow: String,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    /// Segment -> member node ids, in document order
    pub segments: Vec<SegmentInfo>,
    /// Per-segment bounding boxes, computed after layout
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub segment_bounds: BTreeMap<String, SegmentBounds>,
    pub stats: GraphStats,
}

impl FlowGraph {
    pub fn new(name: String, stand: String, flow: String) -> Self {
        Self {
            name,
            stand,
            flow,
            nodes: Vec::new(),
            edges: Vec::new(),
            segments: Vec::new(),
            segment_bounds: BTreeMap::new(),
            stats: GraphStats::default(),
        }
    }

    pub fn add_node(&mut self, node: FlowNode) {
        self.nodes.push(node);
    }

    pub fn add_edge(&mut self, edge: FlowEdge) {
        self.edges.push(edge);
    }

    pub fn get_node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Id of the selected node or nested service, if any
    pub fn selected_id(&self) -> Option<&str> {
        for node in &self.nodes {
            if node.selected {
                return Some(node.id.as_str());
            }
            for svc in &node.services {
                if svc.selected {
                    return Some(svc.id.as_str());
                }
            }
        }
        None
    }

    /// World-space bounding box over all laid-out nodes
    pub fn content_bounds(&self) -> Option<SegmentBounds> {
        let mut bounds: Option<SegmentBounds> = None;
        for node in &self.nodes {
            let Some((x, y, w, h)) = node.rect() else {
                continue;
            };
            let b = bounds.get_or_insert(SegmentBounds {
                min_x: x,
                min_y: y,
                max_x: x + w,
                max_y: y + h,
            });
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x + w);
            b.max_y = b.max_y.max(y + h);
        }
        bounds
    }

    /// Recompute node/edge statistics
    pub fn compute_stats(&mut self) {
        self.stats.total_nodes = self.nodes.len();
        self.stats.total_edges = self.edges.len();
        self.stats.nodes_by_type.clear();
        for node in &self.nodes {
            *self
                .stats
                .nodes_by_type
                .entry(node.type_tag.clone())
                .or_insert(0) += 1;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
