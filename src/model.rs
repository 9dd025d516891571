//! Data model for integration flow documents
//!
//! An `Integration` is the parsed form of one configuration document:
//! ordered network segments, each holding flow elements with `next`
//! references to other elements. Snapshots are immutable once produced by
//! the loader and replaced wholesale on the next poll cycle.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Element identity as it appears in documents: a string or an integer.
///
/// Identity across rebuilds is by value (via the string form), never by
/// object identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementId {
    Num(i64),
    Text(String),
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Num(n) => write!(f, "{}", n),
            ElementId::Text(s) => f.write_str(s),
        }
    }
}

impl ElementId {
    /// Canonical string form used as the graph node key
    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

/// Outgoing `next` reference: a single id or a fan-out list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NextRef {
    One(ElementId),
    Many(Vec<ElementId>),
}

impl NextRef {
    /// Referenced target ids, in document order
    pub fn targets(&self) -> &[ElementId] {
        match self {
            NextRef::One(id) => std::slice::from_ref(id),
            NextRef::Many(ids) => ids.as_slice(),
        }
    }
}

/// Element type tag, a closed sum with a default arm for unknown tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    Kafka,
    Nginx,
    GeoLoadBalancer,
    K8s,
    Other(String),
}

impl From<String> for ElementKind {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "kafka" => ElementKind::Kafka,
            "nginx" => ElementKind::Nginx,
            "geo-load-balancer" => ElementKind::GeoLoadBalancer,
            "k8s" => ElementKind::K8s,
            _ => ElementKind::Other(s),
        }
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        kind.as_str().to_string()
    }
}

impl ElementKind {
    pub fn as_str(&self) -> &str {
        match self {
            ElementKind::Kafka => "kafka",
            ElementKind::Nginx => "nginx",
            ElementKind::GeoLoadBalancer => "geo-load-balancer",
            ElementKind::K8s => "k8s",
            ElementKind::Other(s) => s.as_str(),
        }
    }

    pub fn is_k8s(&self) -> bool {
        matches!(self, ElementKind::K8s)
    }
}

/// Connection endpoint details, kept opaque to the core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One ACL entry of a Kafka topic's security block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPrincipal {
    pub principal: String,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<String>>,
}

/// Security block of a Kafka element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Security {
    #[serde(default)]
    pub principals: Vec<SecurityPrincipal>,
}

/// A node of the top-level flow graph
///
/// Type-specific attribute bags (connection, security, configuration and
/// the flattened `extra` map) are carried for detail views; the core never
/// interprets them beyond existence checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub element_type: ElementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<NextRef>,
    /// Nested services, present only for `k8s` elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceSpec>>,
    /// Validation issue counts, used for visual emphasis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<u32>,
    #[serde(rename = "connectionInfo", skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Security>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<BTreeMap<String, serde_yaml::Value>>,
    /// Remaining type-specific fields (nginx schemas, balancer server lists)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Element {
    /// Display label, falling back to the type tag
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.element_type.as_str())
    }

    pub fn warn_count(&self) -> u32 {
        self.warn.unwrap_or(0)
    }

    pub fn error_count(&self) -> u32 {
        self.error.unwrap_or(0)
    }
}

/// A nested node owned by a `k8s` element
///
/// Exists only as a child of exactly one element; its `next` references
/// resolve against siblings within the same `services` list only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub id: ElementId,
    /// Display label
    pub service: String,
    #[serde(rename = "subType", skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<NextRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<u32>,
    #[serde(rename = "connectionInfo", skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionInfo>,
    #[serde(rename = "destinationInfo", skip_serializing_if = "Option::is_none")]
    pub destination: Option<ConnectionInfo>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ServiceSpec {
    pub fn warn_count(&self) -> u32 {
        self.warn.unwrap_or(0)
    }

    pub fn error_count(&self) -> u32 {
        self.error.unwrap_or(0)
    }
}

/// A named grouping of elements sharing a background tint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub segment: String,
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// One parsed configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Deployment/environment tag the document belongs to
    pub stand: String,
    /// Source document identifier
    #[serde(rename = "flowName")]
    pub flow_name: String,
    pub segments: Vec<Segment>,
}

impl Integration {
    /// Iterate elements with their segment name, in document order
    pub fn iter_elements(&self) -> impl Iterator<Item = (&str, &Element)> {
        self.segments.iter().flat_map(|seg| {
            seg.elements
                .iter()
                .map(move |el| (seg.segment.as_str(), el))
        })
    }

    /// Look up an element or nested service by its id key
    pub fn find(&self, key: &str) -> Option<FlowItem<'_>> {
        for (_, element) in self.iter_elements() {
            if element.id.as_key() == key {
                return Some(FlowItem::Element(element));
            }
            if let Some(services) = &element.services {
                for service in services {
                    if service.id.as_key() == key {
                        return Some(FlowItem::Service(service));
                    }
                }
            }
        }
        None
    }
}

/// A reference to either kind of flow item
#[derive(Debug, Clone, Copy)]
pub enum FlowItem<'a> {
    Element(&'a Element),
    Service(&'a ServiceSpec),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_element_id_forms() {
        let yaml = "id: 7\ntype: kafka\n";
        let el: Element = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(el.id, ElementId::Num(7));
        assert_eq!(el.id.as_key(), "7");

        let yaml = "id: broker-a\ntype: kafka\n";
        let el: Element = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(el.id.as_key(), "broker-a");
    }

    #[test]
    fn test_next_single_and_fanout() {
        let el: Element = serde_yaml::from_str("id: 1\ntype: nginx\nnext: 2\n").unwrap();
        let next = el.next.unwrap();
        assert_eq!(next.targets(), &[ElementId::Num(2)]);

        let el: Element =
            serde_yaml::from_str("id: 1\ntype: nginx\nnext:\n  - 2\n  - 3\n").unwrap();
        let next = el.next.unwrap();
        assert_eq!(next.targets().len(), 2);
    }

    #[test]
    fn test_element_kind_round_trip() {
        assert_eq!(ElementKind::from("kafka".to_string()), ElementKind::Kafka);
        assert_eq!(
            ElementKind::from("geo-load-balancer".to_string()),
            ElementKind::GeoLoadBalancer
        );
        let other = ElementKind::from("llm-service".to_string());
        assert_eq!(other.as_str(), "llm-service");
        assert!(!other.is_k8s());
    }

    #[test]
    fn test_unknown_fields_land_in_extra() {
        let yaml = "id: 9\ntype: nginx\nschemaVersion: 3\nrules:\n  - allow-all\n";
        let el: Element = serde_yaml::from_str(yaml).unwrap();
        assert!(el.extra.contains_key("schemaVersion"));
        assert!(el.extra.contains_key("rules"));
    }

    #[test]
    fn test_label_falls_back_to_type() {
        let el: Element = serde_yaml::from_str("id: 1\ntype: kafka\n").unwrap();
        assert_eq!(el.label(), "kafka");
        let el: Element =
            serde_yaml::from_str("id: 1\ntype: kafka\nname: DELTA.TOPIC.EVENT.V1\n").unwrap();
        assert_eq!(el.label(), "DELTA.TOPIC.EVENT.V1");
    }

    #[test]
    fn test_find_resolves_nested_services() {
        let yaml = r#"
name: demo
stand: IFT
flowName: demo-flow
segments:
  - segment: alpha
    elements:
      - id: 1
        type: k8s
        services:
          - id: 10
            service: ingest
          - id: 11
            service: enrich
"#;
        let integration: Integration = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(integration.find("1"), Some(FlowItem::Element(_))));
        assert!(matches!(integration.find("11"), Some(FlowItem::Service(_))));
        assert!(integration.find("99").is_none());
    }
}
