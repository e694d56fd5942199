//! Service graph derived from a snapshot, and the synthetic span trees built
//! from it.
//!
//! Nodes are addresses. A source node is named after the hostname half of its
//! token when one was reported, otherwise after its address. Destinations
//! connect to sources through the address they share, so a chain of pods
//! observed by the sniffer becomes a chain of calls.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use netlog_types::MetricsSnapshot;

/// Caller/callee graph of every edge in a snapshot.
///
/// Self-calls and edges whose source degraded to an empty identity are left
/// out; their endpoints still appear as nodes when they have an address.
///
/// # Example
///
/// ```rust
/// use netlog_receiver::ServiceGraph;
/// use netlog_types::MetricsSnapshot;
///
/// let snapshot = MetricsSnapshot::builder()
///     .edge("10.0.0.1:frontend", "10.0.0.2")
///     .edge("10.0.0.2:checkout", "10.0.0.3")
///     .build();
///
/// let graph = ServiceGraph::from_snapshot(&snapshot);
/// assert_eq!(graph.roots(), ["10.0.0.1"]);
///
/// let trees = graph.span_trees();
/// assert_eq!(trees[0].service, "frontend");
/// assert_eq!(trees[0].span_count(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceGraph {
    services: BTreeMap<String, String>,
    calls: BTreeMap<String, BTreeSet<String>>,
}

impl ServiceGraph {
    /// Build the graph from every edge in `snapshot`.
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        let mut graph = Self::default();

        for edge in snapshot {
            if edge.source_ip.is_empty() {
                continue;
            }
            graph.name_node(&edge.source_ip, &edge.source_hostname);
            graph.name_node(&edge.destination_ip, "");

            if edge.source_ip != edge.destination_ip {
                graph
                    .calls
                    .entry(edge.source_ip.clone())
                    .or_default()
                    .insert(edge.destination_ip.clone());
            }
        }

        graph
    }

    // Prefer a reported hostname over the bare address; among several
    // hostnames for one address keep the smallest so the result does not
    // depend on edge order.
    fn name_node(&mut self, address: &str, hostname: &str) {
        let name = if hostname.is_empty() { address } else { hostname };
        match self.services.get_mut(address) {
            Some(current) if current == address && name != address => {
                *current = name.to_string();
            }
            Some(current) if name != address && name < current.as_str() => {
                *current = name.to_string();
            }
            Some(_) => {}
            None => {
                self.services.insert(address.to_string(), name.to_string());
            }
        }
    }

    /// True when the snapshot produced no nodes.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Every node address, sorted.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Every caller → callee pair, sorted.
    pub fn calls(&self) -> impl Iterator<Item = (&str, &str)> {
        self.calls.iter().flat_map(|(caller, callees)| {
            callees
                .iter()
                .map(move |callee| (caller.as_str(), callee.as_str()))
        })
    }

    /// Service name for a node address.
    pub fn service_name(&self, address: &str) -> Option<&str> {
        self.services.get(address).map(String::as_str)
    }

    /// Nodes nothing calls, sorted. These start the synthetic traces.
    pub fn roots(&self) -> Vec<&str> {
        let called: HashSet<&str> = self
            .calls
            .values()
            .flat_map(|callees| callees.iter().map(String::as_str))
            .collect();

        self.nodes().filter(|node| !called.contains(node)).collect()
    }

    /// One span tree per root, walking calls depth first.
    ///
    /// A node reachable along several paths appears under each of them. A
    /// call back to a node already on the current path is cut, so cycles end
    /// instead of recursing. Nodes that sit only on cycles have no root and
    /// produce no tree.
    pub fn span_trees(&self) -> Vec<SpanNode> {
        let mut path = Vec::new();
        self.roots()
            .into_iter()
            .map(|root| self.walk(root, &mut path))
            .collect()
    }

    fn walk<'a>(&'a self, address: &'a str, path: &mut Vec<&'a str>) -> SpanNode {
        path.push(address);

        let children = self
            .calls
            .get(address)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .filter(|callee| !path.contains(callee))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|callee| self.walk(callee, path))
            .collect();

        path.pop();

        SpanNode {
            service: self.service_name(address).unwrap_or(address).to_string(),
            address: address.to_string(),
            children,
        }
    }
}

/// One synthetic SERVER span and the calls made beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanNode {
    /// Service the span is reported under.
    pub service: String,
    /// Node address.
    pub address: String,
    /// Spans for the calls this node makes.
    pub children: Vec<SpanNode>,
}

impl SpanNode {
    /// Spans in this tree, including this one.
    pub fn span_count(&self) -> usize {
        1 + self.children.iter().map(SpanNode::span_count).sum::<usize>()
    }
}
