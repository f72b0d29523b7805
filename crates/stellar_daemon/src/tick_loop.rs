use crate::connectivity::recompute_connectivity;
use crate::state::{now_ms, AppState, SimState};
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Advances the ship on a fixed cadence and services connectivity requests.
///
/// With `tick_interval_ms == 0` the loop runs flat out, yielding between ticks.
pub async fn run_tick_loop(app_state: AppState, max_ticks: Option<u64>) {
    let mut interval = if app_state.tick_interval_ms > 0 {
        let mut iv = tokio::time::interval(Duration::from_millis(app_state.tick_interval_ms));
        iv.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        Some(iv)
    } else {
        None
    };
    let mut ticks = 0_u64;

    loop {
        if !app_state.paused.load(Ordering::Relaxed) {
            let (events, pending) = {
                let mut guard = app_state.sim.lock();
                let SimState { ship, content, .. } = &mut *guard;
                let events = stellar_core::tick(ship, content, now_ms());
                (events, ship.connectivity.pending_origin.clone())
            };
            let _ = app_state.event_tx.send(events);

            if let Some(origin) = pending {
                let events = recompute_connectivity(&app_state.sim, origin).await;
                let _ = app_state.event_tx.send(events);
            }

            ticks += 1;
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
        }

        if let Some(ref mut iv) = interval {
            iv.tick().await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}
