use crate::{
    extraction, ledger, navigation, research, Command, CommandError, EventEnvelope, GameContent,
    ShipState, Timestamp,
};

/// Validates and applies `command` against a copy of `state`.
///
/// Returns the successor state and the events it produced. On error the input
/// is untouched, so every command is all-or-nothing.
pub fn reduce(
    state: &ShipState,
    command: &Command,
    content: &GameContent,
    now: Timestamp,
) -> Result<(ShipState, Vec<EventEnvelope>), CommandError> {
    let mut next = state.clone();
    let mut events = Vec::new();
    dispatch(&mut next, command, content, now, &mut events)?;
    ledger::recompute(&mut next, content, now, &mut events);
    Ok((next, events))
}

/// In-place form of [`reduce`]. `state` is replaced only on success.
pub fn apply_command(
    state: &mut ShipState,
    command: &Command,
    content: &GameContent,
    now: Timestamp,
) -> Result<Vec<EventEnvelope>, CommandError> {
    match reduce(state, command, content, now) {
        Ok((next, events)) => {
            *state = next;
            Ok(events)
        }
        Err(err) => {
            tracing::debug!(?command, error = %err, kind = ?err.kind(), "command rejected");
            Err(err)
        }
    }
}

fn dispatch(
    state: &mut ShipState,
    command: &Command,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    match command {
        Command::InstallModule { module_id } => {
            ledger::install_module(state, module_id, content, now, events)
        }
        Command::ToggleModuleActive { module_id } => {
            ledger::toggle_module_active(state, module_id, content, now, events)
        }
        Command::UpdateModuleEnergyAllocation { module_id, percent } => {
            ledger::update_energy_allocation(state, module_id, *percent, content, now, events)
        }
        Command::RepairModule { module_id, amount } => {
            ledger::repair_module(state, module_id, *amount, content, now, events)
        }
        Command::DamageModule { module_id, amount } => {
            ledger::damage_module(state, module_id, *amount, content, now, events)
        }
        Command::StartModuleUpgrade { module_id } => {
            ledger::start_module_upgrade(state, module_id, content, now, events)
        }
        Command::StartResearch { tech_id } => {
            research::start_research(state, tech_id, content, now, events)
        }
        Command::CancelResearch => research::cancel_research(state, now, events),
        Command::NavigateToStar { star, mode } => {
            navigation::navigate_to_star(state, star, *mode, content, now, events)
        }
        Command::CancelNavigation => navigation::cancel_navigation(state, now, events),
        Command::StartExtraction { star, resource } => {
            extraction::start_extraction(state, star, resource, content, now, events)
        }
        Command::CancelExtraction { star_id } => {
            extraction::cancel_extraction(state, star_id, now, events)
        }
        Command::RecomputeConnections { stars, origin } => {
            if !stars.iter().any(|star| &star.id == origin) {
                return Err(CommandError::not_found("star", origin));
            }
            let graph = crate::compute_connections(stars, origin, &content.constants);
            events.extend(crate::store_connections(state, graph, now));
            Ok(())
        }
    }
}

/// Advance every time-driven subsystem to `now`.
///
/// Order of operations:
/// 1. Integrate stored energy over the time since the last tick. Modules
///    drawing on storage only work for as long as it lasts.
/// 2. Accrue research points, then advance the active tech.
/// 3. Advance navigation; arrival requests a connectivity recompute.
/// 4. Complete finished extractions into the inventory.
/// 5. Complete finished module upgrades.
/// 6. Recompute the energy budget and module statuses.
///
/// Calling with no pending work, or with `now` earlier than the last tick,
/// only refreshes derived values.
pub fn tick(state: &mut ShipState, content: &GameContent, now: Timestamp) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    let now = now.max(state.meta.last_tick_at);
    let elapsed = crate::elapsed_secs(state.meta.last_tick_at, now);

    let powered = ledger::integrate_energy(&mut state.energy, elapsed);
    research::accrue_points(state, content, elapsed, powered);
    research::advance_research(state, content, now, &mut events);
    navigation::advance_navigation(state, now, &mut events);
    extraction::advance_extractions(state, content, now, &mut events);
    ledger::advance_upgrades(state, content, now, &mut events);
    ledger::recompute(state, content, now, &mut events);

    state.meta.last_tick_at = now;
    events
}
