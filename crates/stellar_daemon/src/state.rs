use parking_lot::Mutex;
use stellar_core::{Command, EventEnvelope, GameContent, ShipState, StarProfile, Timestamp};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

pub struct SimState {
    pub ship: ShipState,
    pub content: GameContent,
    /// Stars the daemon knows about. The proximity graph is built over these.
    pub stars: Vec<StarProfile>,
}

impl SimState {
    /// Adds any star named by an accepted command to the known set.
    pub fn remember_star(&mut self, command: &Command) {
        let star = match command {
            Command::NavigateToStar { star, .. } | Command::StartExtraction { star, .. } => star,
            _ => return,
        };
        if !self.stars.iter().any(|known| known.id == star.id) {
            self.stars.push(star.clone());
        }
    }
}

pub type SharedSim = Arc<Mutex<SimState>>;
pub type EventTx = broadcast::Sender<Vec<EventEnvelope>>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub event_tx: EventTx,
    pub paused: Arc<AtomicBool>,
    pub tick_interval_ms: u64,
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> Timestamp {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
