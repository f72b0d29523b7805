//! `stellar_core`: ship economy and procedural-content simulation.
//!
//! No IO, no network. Every command validates before it mutates, and all
//! elapsed-time progress advances in `tick(now)`. Generation randomness comes
//! from an RNG keyed by star id.

mod connectivity;
pub mod diagnostics;
mod engine;
mod error;
mod extraction;
mod generator;
mod id;
mod ledger;
mod navigation;
mod research;
pub mod spectral;
#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;
mod types;
mod wear;

pub use connectivity::{
    compute_connections, hop_count, neighbors, store_connections, ConnectionGraph,
    ConnectionScan, ScanProgress,
};
pub use diagnostics::{diagnose, upgrade_suggestions, ShipDiagnostics, UpgradeSuggestion};
pub use engine::{apply_command, reduce, tick};
pub use error::{CommandError, ErrorKind};
pub use generator::{fallback_allocation, generate, generate_with_rng};
pub use id::{star_rng, star_seed};
pub use ledger::{allocation_for, is_module_unlocked};
pub use research::tech_status;
pub use types::*;
pub use wear::durability_efficiency;

pub(crate) fn emit(counters: &mut Counters, at: Timestamp, event: Event) -> EventEnvelope {
    counters.next_event_id += 1;
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    EventEnvelope { id, at, event }
}

pub(crate) fn elapsed_secs(from: Timestamp, to: Timestamp) -> f64 {
    to.saturating_sub(from) as f64 / 1000.0
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn ms_from_f64(ms: f64) -> u64 {
    if ms.is_finite() && ms > 0.0 {
        ms.round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests;
