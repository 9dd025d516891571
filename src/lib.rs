//! flowviz - integration flow visualization core
//!
//! Transforms declarative integration descriptions (network segments of
//! brokers, proxies, balancers and cluster deployments linked by `next`
//! references) into positioned node-and-edge diagrams:
//!
//! - [`model`] - the parsed document data model
//! - [`loader`] - document sources, YAML parsing, polling
//! - [`graph`] - graph builder, layered layout engine, segment bounds
//!
//! Rendering lives in the `flowviz-canvas` crate; document serving in
//! `flowviz-web`.

pub mod error;
pub mod graph;
pub mod loader;
pub mod model;

pub use error::FlowVizError;
pub use graph::{build_flow_graph, FlowGraph, FlowGraphBuilder, LayoutDirection, LayoutEngine};
pub use loader::{DirSource, DocumentPoller, DocumentRef, DocumentSource, HttpSource};
pub use model::{Element, ElementId, ElementKind, Integration, Segment, ServiceSpec};
