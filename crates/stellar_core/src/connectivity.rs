//! Proximity graph between stars.
//!
//! `ConnectionScan` walks every unordered pair in fixed-size batches so a host
//! can yield between `step` calls. Each scan recomputes from scratch; nothing
//! is carried over between scans.

use std::collections::{HashSet, VecDeque};

use crate::{
    Constants, Event, EventEnvelope, Position, ShipState, StarConnection, StarId, StarProfile,
    Timestamp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProgress {
    Pending { compared: usize, total: usize },
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionGraph {
    pub origin: StarId,
    pub edges: Vec<StarConnection>,
}

pub struct ConnectionScan {
    stars: Vec<(StarId, Position)>,
    threshold: f64,
    batch_size: usize,
    i: usize,
    j: usize,
    compared: usize,
    edges: Vec<StarConnection>,
}

impl ConnectionScan {
    /// Stars sharing an id are scanned once; the first occurrence wins.
    pub fn new(stars: &[StarProfile], threshold: f64, batch_size: usize) -> Self {
        let mut seen = HashSet::new();
        let stars: Vec<(StarId, Position)> = stars
            .iter()
            .filter(|star| seen.insert(star.id.clone()))
            .map(|star| (star.id.clone(), star.position))
            .collect();
        Self {
            stars,
            threshold,
            batch_size: batch_size.max(1),
            i: 0,
            j: 1,
            compared: 0,
            edges: Vec::new(),
        }
    }

    pub fn total_pairs(&self) -> usize {
        let n = self.stars.len();
        n * n.saturating_sub(1) / 2
    }

    pub fn is_done(&self) -> bool {
        self.i + 1 >= self.stars.len()
    }

    /// Compares at most `batch_size` pairs.
    pub fn step(&mut self) -> ScanProgress {
        let mut budget = self.batch_size;
        while budget > 0 && !self.is_done() {
            let (a_id, a_pos) = &self.stars[self.i];
            let (b_id, b_pos) = &self.stars[self.j];
            let distance = a_pos.distance_to(b_pos);
            if distance <= self.threshold {
                let (from, to) = if a_id <= b_id {
                    (a_id.clone(), b_id.clone())
                } else {
                    (b_id.clone(), a_id.clone())
                };
                self.edges.push(StarConnection { from, to, distance });
            }
            self.compared += 1;
            budget -= 1;
            self.j += 1;
            if self.j >= self.stars.len() {
                self.i += 1;
                self.j = self.i + 1;
            }
        }
        if self.is_done() {
            ScanProgress::Done
        } else {
            ScanProgress::Pending {
                compared: self.compared,
                total: self.total_pairs(),
            }
        }
    }

    /// Consumes the scan. Edges come back sorted by `(from, to)`.
    pub fn finish(mut self, origin: StarId) -> ConnectionGraph {
        while self.step() != ScanProgress::Done {}
        self.edges
            .sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.to.cmp(&b.to)));
        ConnectionGraph {
            origin,
            edges: self.edges,
        }
    }
}

/// Runs a full scan without yielding.
pub fn compute_connections(
    stars: &[StarProfile],
    origin: &StarId,
    constants: &Constants,
) -> ConnectionGraph {
    ConnectionScan::new(
        stars,
        constants.connection_threshold,
        constants.connection_batch_size,
    )
    .finish(origin.clone())
}

/// Replaces the ship's stored graph and clears any pending request.
pub fn store_connections(
    state: &mut ShipState,
    graph: ConnectionGraph,
    now: Timestamp,
) -> Vec<EventEnvelope> {
    let edge_count = graph.edges.len();
    let origin = graph.origin.clone();
    state.connectivity.origin = Some(graph.origin);
    state.connectivity.edges = graph.edges;
    state.connectivity.computed_at = Some(now);
    if state.connectivity.pending_origin.as_ref() == Some(&origin) {
        state.connectivity.pending_origin = None;
    }
    vec![crate::emit(
        &mut state.counters,
        now,
        Event::ConnectionsComputed { origin, edge_count },
    )]
}

pub fn neighbors<'a>(
    edges: &'a [StarConnection],
    star: &'a StarId,
) -> impl Iterator<Item = &'a StarId> {
    edges.iter().filter_map(move |edge| {
        if &edge.from == star {
            Some(&edge.to)
        } else if &edge.to == star {
            Some(&edge.from)
        } else {
            None
        }
    })
}

/// Number of hops on the shortest path between two stars, or `None` if they
/// are not connected. `Some(0)` when `from == to`.
pub fn hop_count(from: &StarId, to: &StarId, edges: &[StarConnection]) -> Option<u64> {
    if from == to {
        return Some(0);
    }
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back((from, 0u64));
    visited.insert(from);
    while let Some((star, hops)) = queue.pop_front() {
        for next in neighbors(edges, star) {
            if next == to {
                return Some(hops + 1);
            }
            if visited.insert(next) {
                queue.push_back((next, hops + 1));
            }
        }
    }
    None
}
