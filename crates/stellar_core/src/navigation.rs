//! Navigation state machine: `Idle` (no `NavigationState`) or `Moving(mode)`.

use crate::{
    CommandError, Event, EventEnvelope, GameContent, ModuleId, NavigationState, ShipState, StarId,
    StarProfile, Timestamp, TravelMode,
};

pub(crate) fn navigate_to_star(
    state: &mut ShipState,
    star: &StarProfile,
    mode: TravelMode,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    if let Some(nav) = &state.navigation {
        return Err(CommandError::conflict(format!(
            "navigation (en route to {})",
            nav.target_star_id
        )));
    }
    if state.location.current_star_id.as_ref() == Some(&star.id) {
        return Err(CommandError::AlreadyAtStar(star.id.clone()));
    }
    let (module_id, base_speed) = pick_drive(state, mode, content)
        .ok_or(CommandError::MissingModule(mode.required_category()))?;
    let required = content.constants.nav_min_energy(mode);
    if state.energy.current_stored < required {
        return Err(CommandError::InsufficientEnergy {
            required,
            available: state.energy.current_stored,
        });
    }

    let travel_speed = match mode {
        TravelMode::Normal => base_speed,
        TravelMode::Warp => base_speed * content.constants.warp_speed_multiplier,
    };
    let distance = state.location.position.distance_to(&star.position);
    let travel_ms = if travel_speed > 0.0 {
        crate::ms_from_f64(distance / travel_speed * 1000.0)
    } else {
        0
    }
    .max(content.constants.min_travel_ms);
    let estimated_completion = now.saturating_add(travel_ms);

    if let Some(module) = state.modules.get_mut(&module_id) {
        module.is_active = true;
        module.energy_allocation = 100.0;
    }
    state.navigation = Some(NavigationState {
        mode,
        target_star_id: star.id.clone(),
        target_position: star.position,
        travel_progress: 0.0,
        travel_speed,
        module_id,
        started_at: now,
        estimated_completion,
    });
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::NavigationStarted {
            target_star_id: star.id.clone(),
            mode,
            estimated_completion,
        },
    ));
    Ok(())
}

/// Fastest usable drive of the category the mode needs. A drive with no
/// speed cannot move the ship and is never picked.
fn pick_drive(
    state: &ShipState,
    mode: TravelMode,
    content: &GameContent,
) -> Option<(ModuleId, f64)> {
    let category = mode.required_category();
    state
        .modules
        .values()
        .filter(|module| module.upgrade.is_none() && module.current_durability > 0.0)
        .filter_map(|module| content.module_def(&module.id))
        .filter(|def| def.category == category && def.speed > 0.0)
        .max_by(|a, b| a.speed.total_cmp(&b.speed))
        .map(|def| (def.id.clone(), def.speed))
}

pub(crate) fn cancel_navigation(
    state: &mut ShipState,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    let Some(nav) = state.navigation.take() else {
        return Err(CommandError::not_found("navigation", "none"));
    };
    park_drive(state, &nav.module_id);
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::NavigationCancelled {
            target_star_id: nav.target_star_id,
        },
    ));
    if let Some(origin) = state.location.current_star_id.clone() {
        request_connectivity(state, origin, now, events);
    }
    Ok(())
}

pub(crate) fn advance_navigation(
    state: &mut ShipState,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) {
    let Some(nav) = state.navigation.as_mut() else {
        return;
    };
    let total = nav.estimated_completion.saturating_sub(nav.started_at);
    if now < nav.estimated_completion && total > 0 {
        let elapsed = now.saturating_sub(nav.started_at);
        nav.travel_progress = (elapsed as f64 / total as f64 * 100.0).min(100.0);
        return;
    }
    nav.travel_progress = 100.0;
    complete_navigation(state, now, events);
}

fn complete_navigation(state: &mut ShipState, now: Timestamp, events: &mut Vec<EventEnvelope>) {
    let Some(nav) = state.navigation.take() else {
        return;
    };
    state.location.current_star_id = Some(nav.target_star_id.clone());
    state.location.position = nav.target_position;
    park_drive(state, &nav.module_id);
    tracing::debug!(star = %nav.target_star_id, "navigation completed");
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::NavigationCompleted {
            star_id: nav.target_star_id.clone(),
        },
    ));
    request_connectivity(state, nav.target_star_id, now, events);
}

fn park_drive(state: &mut ShipState, module_id: &ModuleId) {
    if let Some(module) = state.modules.get_mut(module_id) {
        module.is_active = false;
        module.energy_allocation = 0.0;
    }
}

fn request_connectivity(
    state: &mut ShipState,
    origin: StarId,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) {
    state.connectivity.pending_origin = Some(origin.clone());
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::ConnectivityRecomputeRequested { origin },
    ));
}
