//! Attack-path graph model.

use crate::finding::Finding;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Attack-path graph: ordered nodes and directed links.
///
/// Links are not validated against the node list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// An entity on the attack path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub group: NodeGroup,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, group: NodeGroup) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            group,
        }
    }
}

/// Category tag of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeGroup {
    Entry,
    Asset,
    #[serde(alias = "vuln")]
    Vulnerability,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Directed relationship between two node identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl Graph {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        Self { nodes, links }
    }

    /// Derive the per-report attack path from a finding list.
    ///
    /// `Internet` (entry) reaches the target asset, which exposes one
    /// vulnerability node per distinct identifier, each leading to the
    /// `Database` asset.
    pub fn from_findings(target: &str, findings: &[Finding]) -> Self {
        let mut nodes = vec![
            Node::new("Internet", "Internet", NodeGroup::Entry),
            Node::new(target, "Web Server", NodeGroup::Asset),
        ];
        let mut links = vec![Link::new("Internet", target)];

        for f in findings {
            let node_id = if !f.cve_id.is_empty() {
                f.cve_id.clone()
            } else if !f.description.is_empty() {
                f.description.clone()
            } else {
                format!("{}-vuln", f.asset)
            };
            let label = [&f.description, &f.cve_id]
                .into_iter()
                .find(|s| !s.is_empty())
                .cloned()
                .unwrap_or_else(|| "Vulnerability".to_string());
            if !nodes.iter().any(|n| n.id == node_id) {
                nodes.push(Node::new(node_id.clone(), label, NodeGroup::Vulnerability));
            }
            links.push(Link::new(target, node_id.clone()));
            links.push(Link::new(node_id, "Database"));
        }

        nodes.push(Node::new("Database", "Database Server", NodeGroup::Asset));
        Self { nodes, links }
    }

    /// Look up a node by identifier.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Links whose source or target is not a known node.
    pub fn dangling_links(&self) -> Vec<&Link> {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.links
            .iter()
            .filter(|l| !ids.contains(l.source.as_str()) || !ids.contains(l.target.as_str()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
