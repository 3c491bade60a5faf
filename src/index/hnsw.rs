//! HNSW (Hierarchical Navigable Small World) graph for approximate
//! nearest neighbor search.
//!
//! Each node is assigned to layers `0..=L` where `L` follows exponential
//! decay; layer 0 contains all nodes. Search starts at the top layer,
//! greedily descends to layer 0, then beam-searches with width `ef`.
//!
//! The service adaptation differs from a build-then-freeze index in three
//! ways: nodes carry external document labels and tombstones (deletion and
//! replacement never restructure the graph), the element count is bounded
//! by an explicit capacity that the registry grows via [`HnswIndex::resize`],
//! and searches can carry a membership predicate over a candidate id set.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fs;
use std::io::Write;
use std::path::Path;

use rayon::prelude::*;

use crate::constants::search::PARALLEL_SCAN_THRESHOLD;
use crate::distance::DistanceMetric;
use crate::error::{QuiverDbError, Result};
use crate::metadata::IdSet;
use crate::persistence::{FileHeader, Section};
use crate::types::DocId;

/// Node identifier within the graph.
type NodeId = usize;

/// A node with its computed distance, used for heap operations.
#[derive(Clone, Copy)]
struct ScoredNode {
    id: NodeId,
    distance: f32,
}

impl PartialEq for ScoredNode {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for ScoredNode {}

impl PartialOrd for ScoredNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// Graph connections for a node at each layer.
struct NodeConnections {
    layers: Vec<SmallVec<[NodeId; 32]>>,
}

/// HNSW index with external labels, tombstones, and bounded capacity.
pub struct HnswIndex {
    dim: usize,
    metric: DistanceMetric,
    /// Maximum number of graph nodes before [`Self::add`] refuses.
    capacity: usize,
    /// Max connections per node above layer 0.
    m_max: usize,
    /// Max connections in layer 0 (m * 2).
    m_max0: usize,
    /// Beam width during construction.
    ef_construction: usize,
    /// Normalization factor for level generation.
    ml: f64,
    /// Flat vector data, `dim` floats per node.
    vector_data: Vec<f32>,
    /// External label per node.
    labels: Vec<DocId>,
    /// Tombstone per node. Deleted and superseded nodes stay in the graph
    /// as routing waypoints but never appear in results.
    deleted: Vec<bool>,
    /// Live external id to its newest node.
    id_map: HashMap<DocId, NodeId>,
    graph: Vec<NodeConnections>,
    entry_point: Option<NodeId>,
    max_layer: usize,
}

impl HnswIndex {
    /// Create a new empty index.
    pub fn new(
        dim: usize,
        m: usize,
        ef_construction: usize,
        metric: DistanceMetric,
        capacity: usize,
    ) -> Self {
        Self {
            dim,
            metric,
            capacity,
            m_max: m,
            m_max0: m * 2,
            ef_construction,
            ml: 1.0 / (m as f64).ln(),
            vector_data: Vec::new(),
            labels: Vec::new(),
            deleted: Vec::new(),
            id_map: HashMap::new(),
            graph: Vec::new(),
            entry_point: None,
            max_layer: 0,
        }
    }

    /// Vector dimensionality.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Total graph nodes, tombstoned included. This is what counts against
    /// [`Self::capacity`].
    pub fn node_count(&self) -> usize {
        self.graph.len()
    }

    /// Number of live (searchable) documents.
    pub fn live_count(&self) -> usize {
        self.id_map.len()
    }

    /// Current element capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True if the index holds no live documents.
    pub fn is_empty(&self) -> bool {
        self.id_map.is_empty()
    }

    /// True if `id` is live in the index.
    pub fn contains(&self, id: DocId) -> bool {
        self.id_map.contains_key(&id)
    }

    /// Grow the element capacity. Shrinking is a no-op.
    pub fn resize(&mut self, new_capacity: usize) {
        if new_capacity <= self.capacity {
            return;
        }
        self.capacity = new_capacity;
        self.vector_data.reserve(new_capacity * self.dim - self.vector_data.len());
        self.graph.reserve(new_capacity - self.graph.len());
    }

    /// Generate a random layer for a new node.
    fn random_layer(&self) -> usize {
        let r: f64 = rand::random();
        (-r.ln() * self.ml).floor() as usize
    }

    #[inline]
    fn vector(&self, node_id: NodeId) -> &[f32] {
        let start = node_id * self.dim;
        &self.vector_data[start..start + self.dim]
    }

    #[inline]
    fn distance_query(&self, query: &[f32], node_id: NodeId) -> f32 {
        self.metric.compute(query, self.vector(node_id))
    }

    #[inline]
    fn distance_nodes(&self, a: NodeId, b: NodeId) -> f32 {
        self.metric.compute(self.vector(a), self.vector(b))
    }

    /// Insert a vector under `id`.
    ///
    /// Re-adding an id tombstones its previous node and inserts a fresh
    /// one; the id map always points at the newest node.
    pub fn add(&mut self, id: DocId, data: &[f32]) -> Result<()> {
        if data.len() != self.dim {
            return Err(QuiverDbError::dimension_mismatch(self.dim, data.len()));
        }
        if self.graph.len() >= self.capacity {
            return Err(QuiverDbError::internal(format!(
                "index at capacity ({}); resize before inserting",
                self.capacity
            )));
        }

        if let Some(&old) = self.id_map.get(&id) {
            self.deleted[old] = true;
        }

        let node_id = self.graph.len();
        let layer = self.random_layer();

        self.vector_data.extend_from_slice(data);
        self.labels.push(id);
        self.deleted.push(false);
        self.id_map.insert(id, node_id);

        let mut layers = Vec::with_capacity(layer + 1);
        for _ in 0..=layer {
            layers.push(SmallVec::new());
        }
        self.graph.push(NodeConnections { layers });

        // First node becomes entry point
        let entry_point = match self.entry_point {
            Some(ep) => ep,
            None => {
                self.entry_point = Some(node_id);
                self.max_layer = layer;
                return Ok(());
            }
        };

        let mut ep = vec![entry_point];

        // Greedy descent from the top layer down to just above the target
        for lc in (layer + 1..=self.max_layer).rev() {
            ep = self.search_layer_for_node(node_id, &ep, 1, lc);
        }

        // Connect at layers target..0
        for lc in (0..=layer.min(self.max_layer)).rev() {
            let candidates = self.search_layer_for_node(node_id, &ep, self.ef_construction, lc);
            let neighbor_m = if lc == 0 { self.m_max0 } else { self.m_max };
            let neighbors = self.select_neighbors_sorted(node_id, &candidates, neighbor_m);

            for &neighbor in &neighbors {
                self.add_connection(node_id, neighbor, lc);
                self.add_connection(neighbor, node_id, lc);
                self.prune_connections(neighbor, neighbor_m, lc);
            }

            ep = neighbors;
        }

        if layer > self.max_layer {
            self.entry_point = Some(node_id);
            self.max_layer = layer;
        }

        Ok(())
    }

    /// Tombstone the node for `id`. Returns false if `id` is not live.
    pub fn mark_delete(&mut self, id: DocId) -> bool {
        match self.id_map.remove(&id) {
            Some(node) => {
                self.deleted[node] = true;
                true
            }
            None => false,
        }
    }

    /// Beam search at one layer during construction; the query is a node.
    fn search_layer_for_node(
        &self,
        query_node: NodeId,
        entry_points: &[NodeId],
        ef: usize,
        layer: usize,
    ) -> Vec<NodeId> {
        let query_start = query_node * self.dim;
        let query: Vec<f32> = self.vector_data[query_start..query_start + self.dim].to_vec();
        self.search_layer(&query, entry_points, ef, layer, &|_| true)
            .into_iter()
            .map(|sn| sn.id)
            .collect()
    }

    /// Beam search at one layer.
    ///
    /// Traversal visits every reachable node regardless of `admit`; only
    /// admitted nodes enter the result set. With a selective predicate the
    /// result heap fills slowly and the walk widens accordingly.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[NodeId],
        ef: usize,
        layer: usize,
        admit: &dyn Fn(NodeId) -> bool,
    ) -> Vec<ScoredNode> {
        let mut visited = vec![false; self.graph.len()];
        let mut candidates: BinaryHeap<Reverse<ScoredNode>> = BinaryHeap::with_capacity(ef);
        let mut results: BinaryHeap<ScoredNode> = BinaryHeap::with_capacity(ef + 1);

        for &ep in entry_points {
            if !visited[ep] {
                visited[ep] = true;
                let dist = self.distance_query(query, ep);
                candidates.push(Reverse(ScoredNode { id: ep, distance: dist }));
                if admit(ep) {
                    results.push(ScoredNode { id: ep, distance: dist });
                }
            }
        }

        while let Some(Reverse(current)) = candidates.pop() {
            let worst_dist = results.peek().map(|n| n.distance).unwrap_or(f32::MAX);
            if current.distance > worst_dist && results.len() >= ef {
                break;
            }

            let neighbors: SmallVec<[NodeId; 32]> = {
                let node = &self.graph[current.id];
                if layer < node.layers.len() {
                    node.layers[layer].clone()
                } else {
                    SmallVec::new()
                }
            };

            for neighbor in neighbors {
                if visited[neighbor] {
                    continue;
                }
                visited[neighbor] = true;
                let neighbor_dist = self.distance_query(query, neighbor);
                let worst_dist = results.peek().map(|n| n.distance).unwrap_or(f32::MAX);

                if neighbor_dist < worst_dist || results.len() < ef {
                    candidates.push(Reverse(ScoredNode {
                        id: neighbor,
                        distance: neighbor_dist,
                    }));
                    if admit(neighbor) {
                        results.push(ScoredNode {
                            id: neighbor,
                            distance: neighbor_dist,
                        });
                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        results.into_vec()
    }

    fn select_neighbors_sorted(
        &self,
        query_node: NodeId,
        candidates: &[NodeId],
        m: usize,
    ) -> Vec<NodeId> {
        let mut scored: Vec<(NodeId, f32)> = candidates
            .iter()
            .map(|&id| (id, self.distance_nodes(query_node, id)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.into_iter().take(m).map(|(id, _)| id).collect()
    }

    fn add_connection(&mut self, from: NodeId, to: NodeId, layer: usize) {
        let node = &mut self.graph[from];
        if layer < node.layers.len() && !node.layers[layer].contains(&to) {
            node.layers[layer].push(to);
        }
    }

    fn prune_connections(&mut self, node_id: NodeId, m: usize, layer: usize) {
        let neighbors: Vec<NodeId> = {
            let node = &self.graph[node_id];
            if layer >= node.layers.len() || node.layers[layer].len() <= m {
                return;
            }
            node.layers[layer].iter().copied().collect()
        };

        let mut scored: Vec<(NodeId, f32)> = neighbors
            .into_iter()
            .map(|neighbor| (neighbor, self.distance_nodes(node_id, neighbor)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(m);

        self.graph[node_id].layers[layer] = scored.into_iter().map(|(id, _)| id).collect();
    }

    /// Greedy descent through layers above 0, then a layer-0 beam search
    /// admitting only nodes that pass `admit`.
    fn search_with(
        &self,
        query: &[f32],
        k: usize,
        ef: usize,
        admit: &dyn Fn(NodeId) -> bool,
    ) -> Vec<(DocId, f32)> {
        let entry_point = match self.entry_point {
            Some(ep) => ep,
            None => return Vec::new(),
        };

        let mut ep_id = entry_point;
        let mut ep_dist = self.distance_query(query, entry_point);

        for lc in (1..=self.max_layer).rev() {
            let mut changed = true;
            while changed {
                changed = false;
                let node = &self.graph[ep_id];
                if lc >= node.layers.len() {
                    continue;
                }
                for &neighbor in &node.layers[lc] {
                    let dist = self.distance_query(query, neighbor);
                    if dist < ep_dist {
                        ep_id = neighbor;
                        ep_dist = dist;
                        changed = true;
                    }
                }
            }
        }

        let ef = ef.max(k);
        let found = self.search_layer(query, &[ep_id], ef, 0, admit);

        let mut results: Vec<(DocId, f32)> = found
            .into_iter()
            .map(|sn| (self.labels[sn.id], sn.distance))
            .collect();
        results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        results.truncate(k);
        results
    }

    /// Search for the k nearest live documents, best first.
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<(DocId, f32)> {
        self.search_with(query, k, ef, &|n| self.is_live(n))
    }

    /// Approximate filtered search: graph traversal with a membership
    /// predicate over `allowed`.
    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        ef: usize,
        allowed: &IdSet,
    ) -> Vec<(DocId, f32)> {
        self.search_with(query, k, ef, &|n| {
            self.is_live(n) && allowed.contains(&self.labels[n])
        })
    }

    /// Exact filtered search: score the query against every live id in
    /// `allowed` directly, bypassing the graph. Large candidate sets are
    /// scored on the rayon pool.
    pub fn search_exact_filtered(
        &self,
        query: &[f32],
        k: usize,
        allowed: &IdSet,
    ) -> Vec<(DocId, f32)> {
        let nodes: Vec<NodeId> = allowed
            .iter()
            .filter_map(|id| self.id_map.get(id).copied())
            .collect();

        let mut scored: Vec<(DocId, f32)> = if nodes.len() >= PARALLEL_SCAN_THRESHOLD {
            nodes
                .par_iter()
                .map(|&n| (self.labels[n], self.distance_query(query, n)))
                .collect()
        } else {
            nodes
                .iter()
                .map(|&n| (self.labels[n], self.distance_query(query, n)))
                .collect()
        };

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        scored
    }

    #[inline]
    fn is_live(&self, node: NodeId) -> bool {
        !self.deleted[node]
    }

    /// Copy of the vector stored under `id`.
    pub fn get_vector(&self, id: DocId) -> Result<Vec<f32>> {
        let node = self
            .id_map
            .get(&id)
            .ok_or(QuiverDbError::DocumentNotFound(id))?;
        Ok(self.vector(*node).to_vec())
    }

    /// Persist the graph to `path` (bincode snapshot in the standard
    /// header envelope, written via temp file + rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = HnswSnapshot {
            dim: self.dim,
            metric: self.metric,
            capacity: self.capacity,
            m_max: self.m_max,
            ef_construction: self.ef_construction,
            max_layer: self.max_layer,
            entry_point: self.entry_point,
            vector_data: self.vector_data.clone(),
            labels: self.labels.clone(),
            deleted: self.deleted.clone(),
            graph: self
                .graph
                .iter()
                .map(|node| {
                    node.layers
                        .iter()
                        .map(|layer| layer.iter().copied().collect())
                        .collect()
                })
                .collect(),
        };

        let body = bincode::serialize(&snapshot)?;
        let header = FileHeader::new(Section::Hnsw, crc32fast::hash(&body));

        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&header.to_bytes())?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Load a graph previously written by [`Self::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path)?;
        let body = FileHeader::verify(&data, Section::Hnsw)?;
        let snapshot: HnswSnapshot = bincode::deserialize(body)?;

        let mut id_map = HashMap::new();
        for (node, &label) in snapshot.labels.iter().enumerate() {
            if !snapshot.deleted[node] {
                id_map.insert(label, node);
            }
        }

        Ok(Self {
            dim: snapshot.dim,
            metric: snapshot.metric,
            capacity: snapshot.capacity,
            m_max: snapshot.m_max,
            m_max0: snapshot.m_max * 2,
            ef_construction: snapshot.ef_construction,
            ml: 1.0 / (snapshot.m_max as f64).ln(),
            vector_data: snapshot.vector_data,
            labels: snapshot.labels,
            deleted: snapshot.deleted,
            id_map,
            graph: snapshot
                .graph
                .into_iter()
                .map(|layers| NodeConnections {
                    layers: layers
                        .into_iter()
                        .map(|layer| layer.into_iter().collect())
                        .collect(),
                })
                .collect(),
            entry_point: snapshot.entry_point,
            max_layer: snapshot.max_layer,
        })
    }
}

/// Plain-data mirror of the graph for bincode.
#[derive(Serialize, Deserialize)]
struct HnswSnapshot {
    dim: usize,
    metric: DistanceMetric,
    capacity: usize,
    m_max: usize,
    ef_construction: usize,
    max_layer: usize,
    entry_point: Option<usize>,
    vector_data: Vec<f32>,
    labels: Vec<DocId>,
    deleted: Vec<bool>,
    graph: Vec<Vec<Vec<usize>>>,
}
