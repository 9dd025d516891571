//! Flow graph builder
//!
//! Converts one `Integration` snapshot plus the currently selected node id
//! into a flat node/edge graph ready for layout, together with the
//! segment -> member-node index consumed by the bounds pass.
//!
//! The builder is a pure function of its inputs: rebuilding from the same
//! snapshot yields the same graph, and selection state survives rebuilds
//! because identity is by id value.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::{Element, Integration, ServiceSpec};

use super::types::{
    Emphasis, FlowEdge, FlowGraph, FlowNode, NodeKind, SegmentInfo, ServiceNode,
};

// =============================================================================
// SIZE HINTS
// =============================================================================

/// Node sizes per rendering variant. The builder is the single source of
/// size truth; layout and bounds both read the sizes assigned here.
pub const K8S_NODE_WIDTH: f32 = 350.0;
pub const K8S_NODE_MIN_HEIGHT: f32 = 250.0;
pub const KAFKA_NODE_WIDTH: f32 = 240.0;
pub const DEFAULT_NODE_WIDTH: f32 = 180.0;
pub const SIMPLE_NODE_HEIGHT: f32 = 90.0;
pub const SERVICE_NODE_WIDTH: f32 = 160.0;
pub const SERVICE_NODE_HEIGHT: f32 = 60.0;

/// Vertical room inside a composite card above/below the service rows
const K8S_HEADER_HEIGHT: f32 = 56.0;
/// Stride of one stacked service row (row height plus compact spacing)
const K8S_ROW_STRIDE: f32 = 84.0;

/// Deterministic size hint for an element
fn element_size(element: &Element) -> (f32, f32) {
    if element.element_type.is_k8s() {
        let rows = element.services.as_ref().map(|s| s.len()).unwrap_or(0) as f32;
        let height = (K8S_HEADER_HEIGHT + rows * K8S_ROW_STRIDE).max(K8S_NODE_MIN_HEIGHT);
        return (K8S_NODE_WIDTH, height);
    }
    match element.element_type.as_str() {
        // Kafka nodes are wider to fit topic names
        "kafka" => (KAFKA_NODE_WIDTH, SIMPLE_NODE_HEIGHT),
        _ => (DEFAULT_NODE_WIDTH, SIMPLE_NODE_HEIGHT),
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builds a `FlowGraph` from an `Integration` snapshot
pub struct FlowGraphBuilder<'a> {
    integration: &'a Integration,
    selected: Option<String>,
}

impl<'a> FlowGraphBuilder<'a> {
    pub fn new(integration: &'a Integration) -> Self {
        Self {
            integration,
            selected: None,
        }
    }

    /// Mark the node (or nested service) with this id as selected
    pub fn selected(mut self, id: Option<&str>) -> Self {
        self.selected = id.map(|s| s.to_string());
        self
    }

    pub fn build(self) -> FlowGraph {
        let mut graph = FlowGraph::new(
            self.integration.name.clone(),
            self.integration.stand.clone(),
            self.integration.flow_name.clone(),
        );
        let selected = self.selected.as_deref();

        // Identity is integration-wide for top-level `next` resolution
        let known_ids: HashSet<String> = self
            .integration
            .iter_elements()
            .map(|(_, el)| el.id.as_key())
            .collect();

        let mut edge_seq = 0usize;

        for segment in &self.integration.segments {
            let mut members = Vec::with_capacity(segment.elements.len());

            for element in &segment.elements {
                let key = element.id.as_key();
                members.push(key.clone());
                graph.add_node(self.build_node(segment.segment.as_str(), element, selected));

                // One edge per resolved `next` reference; fan-out supported
                if let Some(next) = &element.next {
                    for target in next.targets() {
                        let target_key = target.as_key();
                        if !known_ids.contains(&target_key) {
                            tracing::warn!(
                                flow = %self.integration.flow_name,
                                source = %key,
                                target = %target_key,
                                "dropping edge to unknown element"
                            );
                            continue;
                        }
                        edge_seq += 1;
                        graph.add_edge(FlowEdge {
                            id: format!("e{}", edge_seq),
                            source: key.clone(),
                            target: target_key,
                            emphasis: Emphasis::Normal,
                        });
                    }
                }
            }

            graph.segments.push(SegmentInfo {
                name: segment.segment.clone(),
                members,
            });
        }

        // Edge emphasis is the worst severity found walking the edge's
        // endpoint backward through its ancestors (the source included)
        let severity: HashMap<String, Emphasis> = self
            .integration
            .iter_elements()
            .map(|(_, el)| {
                (
                    el.id.as_key(),
                    severity_of(el.warn_count(), el.error_count()),
                )
            })
            .collect();
        let adjacency = forward_adjacency(&graph.edges);
        let reach = propagate_severity(&severity, &adjacency);
        for edge in &mut graph.edges {
            edge.emphasis = reach.get(&edge.target).copied().unwrap_or(Emphasis::Normal);
        }

        graph.compute_stats();
        graph
    }

    fn build_node(&self, segment: &str, element: &Element, selected: Option<&str>) -> FlowNode {
        let key = element.id.as_key();
        let (width, height) = element_size(element);
        let kind = if element.element_type.is_k8s() {
            NodeKind::Composite
        } else {
            NodeKind::Simple
        };

        let (services, service_edges) = match (&kind, &element.services) {
            (NodeKind::Composite, Some(specs)) => build_service_subgraph(specs, selected),
            _ => (Vec::new(), Vec::new()),
        };

        FlowNode {
            id: key.clone(),
            kind,
            label: element.label().to_string(),
            type_tag: element.element_type.as_str().to_string(),
            segment: segment.to_string(),
            warn: element.warn_count(),
            error: element.error_count(),
            selected: selected == Some(key.as_str()),
            width,
            height,
            x: None,
            y: None,
            rank: None,
            services,
            service_edges,
            payload: serde_json::to_value(element).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Build the nested service subgraph of a composite node. Service `next`
/// references resolve against siblings only, and the emphasis rule is
/// applied to the sibling graph in isolation.
fn build_service_subgraph(
    specs: &[ServiceSpec],
    selected: Option<&str>,
) -> (Vec<ServiceNode>, Vec<FlowEdge>) {
    let known: HashSet<String> = specs.iter().map(|s| s.id.as_key()).collect();

    let mut nodes = Vec::with_capacity(specs.len());
    let mut edges = Vec::new();
    let mut edge_seq = 0usize;

    for spec in specs {
        let key = spec.id.as_key();
        nodes.push(ServiceNode {
            id: key.clone(),
            label: spec.service.clone(),
            sub_type: spec.sub_type.clone(),
            warn: spec.warn_count(),
            error: spec.error_count(),
            selected: selected == Some(key.as_str()),
            width: SERVICE_NODE_WIDTH,
            height: SERVICE_NODE_HEIGHT,
            x: None,
            y: None,
        });

        if let Some(next) = &spec.next {
            for target in next.targets() {
                let target_key = target.as_key();
                if !known.contains(&target_key) {
                    tracing::warn!(
                        source = %key,
                        target = %target_key,
                        "dropping service edge to unknown sibling"
                    );
                    continue;
                }
                edge_seq += 1;
                edges.push(FlowEdge {
                    id: format!("s{}", edge_seq),
                    source: key.clone(),
                    target: target_key,
                    emphasis: Emphasis::Normal,
                });
            }
        }
    }

    let severity: HashMap<String, Emphasis> = specs
        .iter()
        .map(|s| (s.id.as_key(), severity_of(s.warn_count(), s.error_count())))
        .collect();
    let adjacency = forward_adjacency(&edges);
    let reach = propagate_severity(&severity, &adjacency);
    for edge in &mut edges {
        edge.emphasis = reach.get(&edge.target).copied().unwrap_or(Emphasis::Normal);
    }

    (nodes, edges)
}

// =============================================================================
// EMPHASIS PROPAGATION
// =============================================================================

fn severity_of(warn: u32, error: u32) -> Emphasis {
    if error > 0 {
        Emphasis::Error
    } else if warn > 0 {
        Emphasis::Warn
    } else {
        Emphasis::Normal
    }
}

fn forward_adjacency(edges: &[FlowEdge]) -> HashMap<String, Vec<String>> {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for edge in edges {
        adjacency
            .entry(edge.source.clone())
            .or_default()
            .push(edge.target.clone());
    }
    adjacency
}

/// Push each node's own severity forward along `next` edges, keeping the
/// max seen per node. The result at a node equals the max severity over
/// the node and every ancestor backward-reachable from it. Each node is
/// re-enqueued at most once per severity level, so the pass stays linear
/// and terminates on cycles.
fn propagate_severity(
    severity: &HashMap<String, Emphasis>,
    adjacency: &HashMap<String, Vec<String>>,
) -> HashMap<String, Emphasis> {
    let mut levels = severity.clone();
    let mut queue: VecDeque<String> = severity
        .iter()
        .filter(|(_, s)| **s > Emphasis::Normal)
        .map(|(id, _)| id.clone())
        .collect();

    while let Some(id) = queue.pop_front() {
        let level = levels.get(&id).copied().unwrap_or(Emphasis::Normal);
        let Some(successors) = adjacency.get(&id) else {
            continue;
        };
        for succ in successors {
            let current = levels.get(succ).copied().unwrap_or(Emphasis::Normal);
            if current < level {
                levels.insert(succ.clone(), level);
                queue.push_back(succ.clone());
            }
        }
    }

    levels
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Integration;

    fn parse(yaml: &str) -> Integration {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn single_kafka() -> Integration {
        parse(
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
        )
    }

    #[test]
    fn test_single_element_graph() {
        let integration = single_kafka();
        let graph = FlowGraphBuilder::new(&integration).build();

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.edges.len(), 0);
        assert_eq!(graph.segments.len(), 1);
        assert_eq!(graph.segments[0].name, "delta");
        assert_eq!(graph.segments[0].members, vec!["0".to_string()]);
        assert_eq!(graph.nodes[0].width, KAFKA_NODE_WIDTH);
    }

    #[test]
    fn test_fanout_produces_three_edges() {
        let integration = parse(
            r#"
name: fanout
stand: IFT
flowName: fanout
segments:
  - segment: alpha
    elements:
      - id: 1
        type: nginx
        next: 2
      - id: 2
        type: kafka
        next: [3, 4]
      - id: 3
        type: kafka
      - id: 4
        type: kafka
"#,
        );
        let graph = FlowGraphBuilder::new(&integration).build();
        assert_eq!(graph.edges.len(), 3);
        let pairs: Vec<(&str, &str)> = graph
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("1", "2"), ("2", "3"), ("2", "4")]);
    }

    #[test]
    fn test_dangling_reference_dropped_without_panic() {
        let integration = parse(
            r#"
name: dangling
stand: IFT
flowName: dangling
segments:
  - segment: alpha
    elements:
      - id: 1
        type: nginx
        next: 99
"#,
        );
        let graph = FlowGraphBuilder::new(&integration).build();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.edges.len(), 0);
    }

    #[test]
    fn test_next_resolves_across_segments() {
        let integration = parse(
            r#"
name: cross
stand: IFT
flowName: cross
segments:
  - segment: alpha
    elements:
      - id: 1
        type: kafka
        next: 2
  - segment: omega
    elements:
      - id: 2
        type: nginx
"#,
        );
        let graph = FlowGraphBuilder::new(&integration).build();
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.segments.len(), 2);
    }

    #[test]
    fn test_emphasis_propagates_downstream() {
        // 1 (error) -> 2 -> 3; edge 2->3 inherits error from ancestor 1
        let integration = parse(
            r#"
name: errors
stand: IFT
flowName: errors
segments:
  - segment: alpha
    elements:
      - id: 1
        type: kafka
        error: 2
        next: 2
      - id: 2
        type: nginx
        next: 3
      - id: 3
        type: kafka
"#,
        );
        let graph = FlowGraphBuilder::new(&integration).build();
        assert!(graph.edges.iter().all(|e| e.emphasis == Emphasis::Error));
    }

    #[test]
    fn test_warn_propagates_but_error_wins() {
        // 1 (warn) -> 2 (error) -> 3: the first edge already sees 2's
        // error; a pure warn chain stays warn
        let integration = parse(
            r#"
name: mixed
stand: IFT
flowName: mixed
segments:
  - segment: alpha
    elements:
      - id: 1
        type: kafka
        warn: 1
        next: 2
      - id: 2
        type: nginx
        error: 1
        next: 3
      - id: 3
        type: kafka
"#,
        );
        let graph = FlowGraphBuilder::new(&integration).build();
        assert!(graph.edges.iter().all(|e| e.emphasis == Emphasis::Error));

        let integration = parse(
            r#"
name: warn-chain
stand: IFT
flowName: warn-chain
segments:
  - segment: alpha
    elements:
      - id: 1
        type: kafka
        warn: 1
        next: 2
      - id: 2
        type: nginx
        next: 3
      - id: 3
        type: kafka
"#,
        );
        let graph = FlowGraphBuilder::new(&integration).build();
        assert!(graph.edges.iter().all(|e| e.emphasis == Emphasis::Warn));
    }

    #[test]
    fn test_emphasis_cycle_terminates() {
        let integration = parse(
            r#"
name: loop
stand: IFT
flowName: loop
segments:
  - segment: alpha
    elements:
      - id: 1
        type: kafka
        warn: 1
        next: 2
      - id: 2
        type: nginx
        next: 1
"#,
        );
        let graph = FlowGraphBuilder::new(&integration).build();
        assert_eq!(graph.edges.len(), 2);
        assert!(graph.edges.iter().all(|e| e.emphasis == Emphasis::Warn));
    }

    #[test]
    fn test_k8s_nested_subgraph() {
        let integration = parse(
            r#"
name: cluster
stand: IFT
flowName: cluster
segments:
  - segment: alpha
    elements:
      - id: 1
        type: k8s
        name: core
        services:
          - id: 10
            service: ingest
            next: 11
          - id: 11
            service: enrich
            error: 1
            next: 12
          - id: 12
            service: publish
"#,
        );
        let graph = FlowGraphBuilder::new(&integration).build();
        let node = graph.get_node("1").unwrap();
        assert_eq!(node.kind, NodeKind::Composite);
        assert_eq!(node.services.len(), 3);
        assert_eq!(node.service_edges.len(), 2);

        // 10 -> 11(error) -> 12: both edges see the error
        assert!(node
            .service_edges
            .iter()
            .all(|e| e.emphasis == Emphasis::Error));

        // Composite height grows with the service count
        assert!(node.height >= K8S_NODE_MIN_HEIGHT);
    }

    #[test]
    fn test_nested_error_marks_nested_edge() {
        // Two services where the first points at the second and the
        // second carries error=1: the nested edge is emphasized
        let integration = parse(
            r#"
name: cluster2
stand: IFT
flowName: cluster2
segments:
  - segment: alpha
    elements:
      - id: 1
        type: k8s
        services:
          - id: 21
            service: one
            next: 22
          - id: 22
            service: two
            error: 1
"#,
        );
        let graph = FlowGraphBuilder::new(&integration).build();
        let node = graph.get_node("1").unwrap();
        assert_eq!(node.service_edges.len(), 1);
        assert_eq!(node.service_edges[0].emphasis, Emphasis::Error);
    }

    #[test]
    fn test_selection_round_trip() {
        let integration = parse(
            r#"
name: sel
stand: IFT
flowName: sel
segments:
  - segment: alpha
    elements:
      - id: 1
        type: kafka
      - id: 2
        type: k8s
        services:
          - id: 20
            service: api
"#,
        );
        let graph = FlowGraphBuilder::new(&integration)
            .selected(Some("20"))
            .build();
        assert_eq!(graph.selected_id(), Some("20"));
        let selected_count = graph
            .nodes
            .iter()
            .map(|n| {
                n.selected as usize + n.services.iter().filter(|s| s.selected).count()
            })
            .sum::<usize>();
        assert_eq!(selected_count, 1);

        // Rebuild from the same snapshot preserves selection by id
        let rebuilt = FlowGraphBuilder::new(&integration)
            .selected(graph.selected_id())
            .build();
        assert_eq!(rebuilt.selected_id(), Some("20"));
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let integration = single_kafka();
        let a = FlowGraphBuilder::new(&integration).build();
        let b = FlowGraphBuilder::new(&integration).build();
        assert_eq!(a.nodes.len(), b.nodes.len());
        assert_eq!(a.edges.len(), b.edges.len());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
