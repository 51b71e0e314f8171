//! Graph manager: owns the nodes, the typed edges between their ports,
//! and the execution machinery.
//!
//! Execution is single-threaded and pull-based. A pass computes a
//! topological order with Kahn's algorithm (ties broken by node insertion
//! order, so output is deterministic), copies fresh outputs across edges,
//! and runs every dirty node exactly once. Cycles are rejected when an
//! edge would introduce one, and again defensively at execution time.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::{FlowError, Result};
use crate::node::Node;
use crate::port::PortValue;

/// A directed, typed connection `(src, src_port) -> (dst, dst_port)`.
///
/// Edges form a multiset: two nodes may be linked through several port
/// pairs, and the dependency between them only disappears when the last
/// edge goes.
#[derive(Debug, Clone)]
struct Edge {
    src: usize,
    src_port: String,
    dst: usize,
    dst_port: String,
}

/// A directed acyclic graph of processing nodes.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    dirty: bool,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    fn idx(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| FlowError::UnknownNode {
                name: name.to_string(),
            })
    }

    pub fn node(&self, name: &str) -> Result<&Node> {
        Ok(&self.nodes[self.idx(name)?])
    }

    pub fn node_mut(&mut self, name: &str) -> Result<&mut Node> {
        let idx = self.idx(name)?;
        Ok(&mut self.nodes[idx])
    }

    /// Add a node to the graph. Node names must be unique.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.index.contains_key(node.name()) {
            return Err(FlowError::DuplicateName {
                name: node.name().to_string(),
            });
        }
        self.index.insert(node.name().to_string(), self.nodes.len());
        debug!(node = node.name(), kind = node.type_name(), "node added");
        self.nodes.push(node);
        self.dirty = true;
        Ok(())
    }

    /// Remove a node and every edge touching it. Former descendants are
    /// marked dirty.
    pub fn remove_node(&mut self, name: &str) -> Result<()> {
        let idx = self.idx(name)?;
        for d in self.descendants(idx) {
            self.nodes[d].mark_dirty();
        }
        self.edges.retain(|e| e.src != idx && e.dst != idx);
        for e in &mut self.edges {
            if e.src > idx {
                e.src -= 1;
            }
            if e.dst > idx {
                e.dst -= 1;
            }
        }
        self.nodes.remove(idx);
        self.index.remove(name);
        for v in self.index.values_mut() {
            if *v > idx {
                *v -= 1;
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Drop all nodes and edges.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.edges.clear();
        self.dirty = false;
    }

    /// Connect an output port to an input port.
    ///
    /// Fails if either node is unknown, a port is undeclared or the kinds
    /// disagree, the input port already has a feeder, or the edge would
    /// close a cycle. On success the whole graph is marked dirty.
    pub fn connect(&mut self, src: &str, src_port: &str, dst: &str, dst_port: &str) -> Result<()> {
        let src_idx = self.idx(src)?;
        let dst_idx = self.idx(dst)?;

        let src_kind = self.nodes[src_idx].output_kind(src_port).ok_or_else(|| {
            FlowError::ValidationError {
                node: src.to_string(),
                message: format!("no output port named '{src_port}'"),
            }
        })?;
        let dst_kind = self.nodes[dst_idx].input_kind(dst_port).ok_or_else(|| {
            FlowError::ValidationError {
                node: dst.to_string(),
                message: format!("no input port named '{dst_port}'"),
            }
        })?;
        if src_kind != dst_kind {
            return Err(FlowError::ValidationError {
                node: dst.to_string(),
                message: format!(
                    "cannot connect {src}.{src_port} ({src_kind}) to {dst}.{dst_port} ({dst_kind})"
                ),
            });
        }

        if self
            .edges
            .iter()
            .any(|e| e.dst == dst_idx && e.dst_port == dst_port)
        {
            return Err(FlowError::PortOccupied {
                node: dst.to_string(),
                port: dst_port.to_string(),
            });
        }

        // Reject before recording the edge: if src is reachable from dst,
        // the new edge closes a loop.
        if self.reachable(dst_idx, src_idx) {
            return Err(FlowError::CycleIntroduced {
                src: src.to_string(),
                dst: dst.to_string(),
            });
        }

        debug!(src, src_port, dst, dst_port, "edge added");
        self.edges.push(Edge {
            src: src_idx,
            src_port: src_port.to_string(),
            dst: dst_idx,
            dst_port: dst_port.to_string(),
        });
        for node in &mut self.nodes {
            node.mark_dirty();
        }
        self.dirty = true;
        Ok(())
    }

    /// Remove one edge. The dependency between the two nodes survives as
    /// long as any other edge links them; the destination and everything
    /// downstream of it are marked dirty.
    pub fn remove_connection(
        &mut self,
        src: &str,
        src_port: &str,
        dst: &str,
        dst_port: &str,
    ) -> Result<()> {
        let src_idx = self.idx(src)?;
        let dst_idx = self.idx(dst)?;
        let pos = self
            .edges
            .iter()
            .position(|e| {
                e.src == src_idx
                    && e.dst == dst_idx
                    && e.src_port == src_port
                    && e.dst_port == dst_port
            })
            .ok_or_else(|| FlowError::ValidationError {
                node: dst.to_string(),
                message: format!("no connection {src}.{src_port} -> {dst}.{dst_port}"),
            })?;
        self.edges.remove(pos);
        self.nodes[dst_idx].mark_dirty();
        for d in self.descendants(dst_idx) {
            self.nodes[d].mark_dirty();
        }
        self.dirty = true;
        Ok(())
    }

    /// Upstream dependencies of a node: the distinct sources of its
    /// incoming edges, in edge insertion order.
    pub fn dependencies(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.idx(name)?;
        let mut seen = Vec::new();
        for e in self.edges.iter().filter(|e| e.dst == idx) {
            let src = self.nodes[e.src].name();
            if !seen.contains(&src) {
                seen.push(src);
            }
        }
        Ok(seen)
    }

    /// Set a node parameter and mark the node plus all its descendants
    /// dirty.
    pub fn set_parameter(&mut self, node: &str, name: &str, value: PortValue) -> Result<()> {
        let idx = self.idx(node)?;
        self.nodes[idx].set_parameter(name, value)?;
        for d in self.descendants(idx) {
            self.nodes[d].mark_dirty();
        }
        self.dirty = true;
        Ok(())
    }

    /// Set a node input directly (for ports not fed by an edge) and mark
    /// the node plus all its descendants dirty.
    pub fn set_input(&mut self, node: &str, name: &str, value: PortValue) -> Result<()> {
        let idx = self.idx(node)?;
        self.nodes[idx].set_input(name, value)?;
        for d in self.descendants(idx) {
            self.nodes[d].mark_dirty();
        }
        self.dirty = true;
        Ok(())
    }

    /// Is `to` reachable from `from` along edges?
    fn reachable(&self, from: usize, to: usize) -> bool {
        let mut stack = vec![from];
        let mut visited = vec![false; self.nodes.len()];
        while let Some(n) = stack.pop() {
            if n == to {
                return true;
            }
            if visited[n] {
                continue;
            }
            visited[n] = true;
            for e in self.edges.iter().filter(|e| e.src == n) {
                stack.push(e.dst);
            }
        }
        false
    }

    /// Strict descendants of a node, unordered.
    fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = self
            .edges
            .iter()
            .filter(|e| e.src == idx)
            .map(|e| e.dst)
            .collect();
        let mut out = Vec::new();
        while let Some(n) = stack.pop() {
            if visited[n] {
                continue;
            }
            visited[n] = true;
            out.push(n);
            for e in self.edges.iter().filter(|e| e.src == n) {
                stack.push(e.dst);
            }
        }
        out
    }

    /// Kahn's algorithm. Ready nodes are drained smallest-index-first, so
    /// ties resolve by insertion order and passes are reproducible.
    fn topological_order(&self) -> Result<Vec<usize>> {
        let mut in_degree = vec![0usize; self.nodes.len()];
        for e in &self.edges {
            in_degree[e.dst] += 1;
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(&next) = ready.iter().next() {
            ready.remove(&next);
            order.push(next);
            for e in self.edges.iter().filter(|e| e.src == next) {
                in_degree[e.dst] -= 1;
                if in_degree[e.dst] == 0 {
                    ready.insert(e.dst);
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(FlowError::CycleDetected);
        }
        Ok(order)
    }

    /// Run one pass: propagate fresh outputs along edges and execute every
    /// dirty node in topological order.
    ///
    /// An edge copies its value only when the source node executed earlier
    /// in the same pass (or the destination never received that input), so
    /// stages upstream of a change keep their memoized outputs. A node
    /// failure aborts the pass immediately: earlier nodes keep their new
    /// outputs, the graph stays dirty.
    pub fn execute(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let order = self.topological_order()?;
        let mut executed = vec![false; self.nodes.len()];

        for idx in order {
            let incoming: Vec<(usize, String, String)> = self
                .edges
                .iter()
                .filter(|e| e.dst == idx)
                .map(|e| (e.src, e.src_port.clone(), e.dst_port.clone()))
                .collect();
            for (src, src_port, dst_port) in incoming {
                if executed[src] || !self.nodes[idx].has_input(&dst_port) {
                    let value = self.nodes[src].peek_output(&src_port)?.clone();
                    self.nodes[idx].set_input(&dst_port, value)?;
                }
            }
            if self.nodes[idx].dirty() {
                debug!(node = self.nodes[idx].name(), "executing");
                self.nodes[idx].execute()?;
                executed[idx] = true;
            }
        }

        self.dirty = false;
        Ok(())
    }

    /// Read a node output, running a pass first if anything is stale.
    pub fn get_node_output(&mut self, node: &str, port: &str) -> Result<&PortValue> {
        if self.dirty {
            self.execute()?;
        }
        let idx = self.idx(node)?;
        self.nodes[idx].peek_output(port)
    }

    /// Drop every node's outputs and mark the whole graph dirty.
    pub fn reset_all(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
        self.dirty = true;
    }
}
