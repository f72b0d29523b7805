use super::*;
use crate::test_fixtures::{base_content, base_state, home_star, module_id, star, tech_id};

mod energy;
mod navigation;

// --- Shared test helpers ------------------------------------------------

fn test_content() -> GameContent {
    base_content()
}

fn test_state(content: &GameContent) -> ShipState {
    base_state(content)
}

fn snapshot(state: &ShipState) -> serde_json::Value {
    serde_json::to_value(state).unwrap()
}

/// Applies a command that must succeed.
fn run(
    state: &mut ShipState,
    content: &GameContent,
    command: Command,
    now: Timestamp,
) -> Vec<EventEnvelope> {
    apply_command(state, &command, content, now)
        .unwrap_or_else(|err| panic!("{command:?} rejected: {err}"))
}

/// Applies a command that must fail, and checks that nothing changed.
fn reject(
    state: &mut ShipState,
    content: &GameContent,
    command: Command,
    now: Timestamp,
) -> CommandError {
    let before = snapshot(state);
    let Err(err) = apply_command(state, &command, content, now) else {
        panic!("{command:?} should have been rejected");
    };
    assert_eq!(snapshot(state), before, "rejected command mutated state");
    err
}

/// Bolts a module straight onto the ship, skipping install costs.
fn fit(
    state: &mut ShipState,
    content: &GameContent,
    id: &str,
    active: bool,
    allocation: f64,
) {
    let def = content.module_def(&module_id(id)).unwrap();
    let mut module = InstalledModule::fresh(def);
    module.is_active = active;
    module.energy_allocation = allocation;
    state.modules.insert(module_id(id), module);
}

fn has_event(events: &[EventEnvelope], check: impl Fn(&Event) -> bool) -> bool {
    events.iter().any(|envelope| check(&envelope.event))
}
