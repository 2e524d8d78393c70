//! Signal graph construction and reachability.
//!
//! The graph is rebuilt per query from current device metadata and never
//! persisted. Queries take `&self` and run to completion on the calling
//! thread; nothing in here is shared across tasks while a search runs.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use roomproto::Device;
use serde::{Deserialize, Serialize};

/// Errors returned by routing queries.
///
/// "No path" is not one of them; see [`SignalGraph::reachable`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("device {0} is not part of the signal graph")]
    UnknownDevice(String),

    #[error("path from {sink} back to {origin} exceeds {limit} hops; check the port configuration for cycles")]
    CyclicPorts {
        sink: String,
        /// The device the signal starts at.
        origin: String,
        limit: usize,
    },
}

/// Ordered devices from a sink back to a source, both inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalPath {
    devices: Vec<Device>,
}

impl SignalPath {
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn ids(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn sink(&self) -> &Device {
        &self.devices[0]
    }

    pub fn source(&self) -> &Device {
        &self.devices[self.devices.len() - 1]
    }

    /// Devices strictly between sink and source.
    pub fn intermediates(&self) -> &[Device] {
        if self.devices.len() < 3 {
            return &[];
        }
        &self.devices[1..self.devices.len() - 1]
    }

    /// Number of device-to-device links.
    pub fn hop_count(&self) -> usize {
        self.devices.len().saturating_sub(1)
    }
}

/// Serializable view of the graph, for debugging port configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<String>,
    /// `(sink, source)` pairs.
    pub edges: Vec<(String, String)>,
}

/// Directed connectivity between devices, sink → source.
pub struct SignalGraph {
    inner: DiGraph<Device, ()>,
    index_map: HashMap<String, NodeIndex>,
}

impl SignalGraph {
    /// Build the graph from device metadata.
    ///
    /// Every port contributes an edge from its destination device to its
    /// source device. Ports naming devices outside `devices` are ignored, as
    /// are repeated device ids (first one wins).
    pub fn build(devices: &[Device]) -> Self {
        let mut inner = DiGraph::new();
        let mut index_map = HashMap::new();

        for device in devices {
            if index_map.contains_key(&device.id) {
                tracing::debug!(device = %device.id, "duplicate device id in signal graph input");
                continue;
            }
            let index = inner.add_node(device.clone());
            index_map.insert(device.id.clone(), index);
        }

        for device in devices {
            for port in &device.ports {
                let (Some(&sink), Some(&source)) = (
                    index_map.get(&port.destination_device),
                    index_map.get(&port.source_device),
                ) else {
                    tracing::trace!(
                        device = %device.id,
                        port = %port.id,
                        "port references a device outside the graph"
                    );
                    continue;
                };

                if sink != source {
                    inner.update_edge(sink, source, ());
                }
            }
        }

        tracing::debug!(
            nodes = inner.node_count(),
            edges = inner.edge_count(),
            "signal graph built"
        );

        Self { inner, index_map }
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_map.contains_key(id)
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        let index = self.index_map.get(id)?;
        self.inner.node_weight(*index)
    }

    /// Devices that directly feed `id`.
    pub fn feeds(&self, id: &str) -> Result<Vec<&Device>, RoutingError> {
        let index = self.index_of(id)?;
        Ok(self
            .sorted_neighbors(index)
            .into_iter()
            .map(|n| &self.inner[n])
            .collect())
    }

    /// Every device whose signal can reach `id`, nearest first.
    pub fn upstream(&self, id: &str) -> Result<Vec<&Device>, RoutingError> {
        let start = self.index_of(id)?;

        let mut result = Vec::new();
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            for neighbor in self.sorted_neighbors(current) {
                if visited.insert(neighbor) {
                    result.push(&self.inner[neighbor]);
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(result)
    }

    /// Can `source`'s signal reach `sink`?
    ///
    /// Returns the shortest path from `sink` back to `source` when it can,
    /// `Ok(None)` when it cannot. Unknown device ids are errors.
    pub fn reachable(&self, sink: &str, source: &str) -> Result<Option<SignalPath>, RoutingError> {
        let sink_idx = self.index_of(sink)?;
        let source_idx = self.index_of(source)?;

        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited = HashSet::from([sink_idx]);
        let mut frontier = VecDeque::from([sink_idx]);
        let mut found = sink_idx == source_idx;

        while !found {
            let Some(current) = frontier.pop_front() else {
                break;
            };

            for neighbor in self.sorted_neighbors(current) {
                if !visited.insert(neighbor) {
                    continue;
                }
                parents.insert(neighbor, current);
                if neighbor == source_idx {
                    found = true;
                    break;
                }
                frontier.push_back(neighbor);
            }
        }

        if !found {
            tracing::debug!(sink, source, "no signal path");
            return Ok(None);
        }

        let path = self.trace_back(sink_idx, source_idx, &parents, sink, source)?;
        tracing::debug!(sink, source, hops = path.hop_count(), "signal path found");
        Ok(Some(path))
    }

    /// Walk parent pointers from `source` to `sink`, bounded by the node count.
    fn trace_back(
        &self,
        sink_idx: NodeIndex,
        source_idx: NodeIndex,
        parents: &HashMap<NodeIndex, NodeIndex>,
        sink: &str,
        source: &str,
    ) -> Result<SignalPath, RoutingError> {
        let limit = self.node_count();
        let cyclic = || RoutingError::CyclicPorts {
            sink: sink.to_string(),
            origin: source.to_string(),
            limit,
        };

        let mut reversed = vec![source_idx];
        let mut current = source_idx;

        while current != sink_idx {
            if reversed.len() > limit {
                return Err(cyclic());
            }
            current = *parents.get(&current).ok_or_else(cyclic)?;
            reversed.push(current);
        }

        let devices = reversed
            .into_iter()
            .rev()
            .map(|idx| self.inner[idx].clone())
            .collect();

        Ok(SignalPath { devices })
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<String> = self.inner.node_weights().map(|d| d.id.clone()).collect();
        nodes.sort();

        let mut edges: Vec<(String, String)> = self
            .inner
            .edge_references()
            .map(|e| {
                (
                    self.inner[e.source()].id.clone(),
                    self.inner[e.target()].id.clone(),
                )
            })
            .collect();
        edges.sort();

        GraphSnapshot { nodes, edges }
    }

    fn index_of(&self, id: &str) -> Result<NodeIndex, RoutingError> {
        self.index_map
            .get(id)
            .copied()
            .ok_or_else(|| RoutingError::UnknownDevice(id.to_string()))
    }

    // petgraph yields neighbors newest-edge first; sort so paths don't depend
    // on port declaration order.
    fn sorted_neighbors(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self
            .inner
            .neighbors_directed(index, Direction::Outgoing)
            .collect();
        neighbors.sort_by(|a, b| self.inner[*a].id.cmp(&self.inner[*b].id));
        neighbors
    }
}
