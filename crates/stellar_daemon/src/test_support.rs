use crate::state::{AppState, SimState};
use parking_lot::Mutex;
use stellar_core::test_fixtures::{base_content, base_state, home_star, star};
use stellar_core::Position;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Loadout ship at `sol` with one neighbour (`alpha`, 12 units) and one
/// distant star (`far`, 100 units). Tick interval 0 so loops run flat out.
pub fn make_test_state() -> AppState {
    let content = base_content();
    let ship = base_state(&content);
    let stars = vec![
        home_star(),
        star("alpha", "K1V", Position::new(12.0, 0.0, 0.0)),
        star("far", "M2V", Position::new(100.0, 0.0, 0.0)),
    ];
    let (event_tx, _) = tokio::sync::broadcast::channel(64);
    AppState {
        sim: Arc::new(Mutex::new(SimState {
            ship,
            content,
            stars,
        })),
        event_tx,
        paused: Arc::new(AtomicBool::new(false)),
        tick_interval_ms: 0,
    }
}
