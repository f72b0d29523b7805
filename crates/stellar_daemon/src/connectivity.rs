use crate::state::{now_ms, SharedSim};
use stellar_core::{store_connections, ConnectionScan, EventEnvelope, ScanProgress, StarId};

/// Rebuilds the proximity graph around `origin`, yielding to the runtime
/// between batches so request handlers keep running during large scans.
///
/// The lock is held only to snapshot the star set and to store the result.
/// A scan whose request was replaced by a different origin meanwhile is dropped.
pub async fn recompute_connectivity(sim: &SharedSim, origin: StarId) -> Vec<EventEnvelope> {
    let mut scan = {
        let guard = sim.lock();
        let constants = &guard.content.constants;
        ConnectionScan::new(
            &guard.stars,
            constants.connection_threshold,
            constants.connection_batch_size,
        )
    };
    let total = scan.total_pairs();
    let mut batches = 0_usize;
    while let ScanProgress::Pending { .. } = scan.step() {
        batches += 1;
        tokio::task::yield_now().await;
    }
    let graph = scan.finish(origin.clone());

    let mut guard = sim.lock();
    if let Some(pending) = &guard.ship.connectivity.pending_origin {
        if *pending != origin {
            tracing::debug!(%origin, %pending, "connectivity scan superseded");
            return Vec::new();
        }
    }
    tracing::debug!(
        %origin,
        pairs = total,
        batches,
        edges = graph.edges.len(),
        "connectivity recomputed"
    );
    store_connections(&mut guard.ship, graph, now_ms())
}
