//! Research progression: one tech in progress at a time, advanced by `tick`.

use crate::{
    CommandError, Event, EventEnvelope, GameContent, ResearchProgress, ShipState, TechDef,
    TechId, TechStatus, Timestamp,
};

/// Absolute slack in points: a tech completes once its points come within
/// this amount of the total.
const COMPLETION_EPSILON: f64 = 1e-9;

pub fn tech_status(state: &ShipState, tech: &TechDef) -> TechStatus {
    if state.research.completed.contains(&tech.id) {
        return TechStatus::Completed;
    }
    if state
        .research
        .active
        .as_ref()
        .is_some_and(|active| active.tech_id == tech.id)
    {
        return TechStatus::InProgress;
    }
    if tech
        .prereqs
        .iter()
        .all(|prereq| state.research.completed.contains(prereq))
    {
        TechStatus::Available
    } else {
        TechStatus::Locked
    }
}

pub(crate) fn start_research(
    state: &mut ShipState,
    tech_id: &TechId,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    if let Some(active) = &state.research.active {
        return Err(CommandError::conflict(format!(
            "research slot (running {})",
            active.tech_id
        )));
    }
    let tech = content
        .tech(tech_id)
        .ok_or_else(|| CommandError::not_found("tech", tech_id))?;
    if state.research.completed.contains(tech_id) {
        return Err(CommandError::conflict(format!("completed tech {tech_id}")));
    }
    if let Some(missing) = tech
        .prereqs
        .iter()
        .find(|prereq| !state.research.completed.contains(prereq))
    {
        return Err(CommandError::MissingPrerequisite {
            tech_id: tech_id.clone(),
            missing: missing.clone(),
        });
    }
    state
        .inventory
        .check_available(&tech.cost.required_resources)?;
    if state.research.points < tech.cost.research_points {
        return Err(CommandError::InsufficientResearchPoints {
            required: tech.cost.research_points,
            available: state.research.points,
        });
    }

    state
        .inventory
        .deduct(&tech.cost.required_resources, content);
    state.research.points -= tech.cost.research_points;
    state.research.active = Some(ResearchProgress {
        tech_id: tech_id.clone(),
        current_points: 0.0,
        total_points: tech.cost.research_points,
        start_time: now,
    });
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::ResearchStarted {
            tech_id: tech_id.clone(),
            total_points: tech.cost.research_points,
        },
    ));
    Ok(())
}

/// Drops the active research. Spent points and resources are not refunded.
pub(crate) fn cancel_research(
    state: &mut ShipState,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    let Some(active) = state.research.active.take() else {
        return Err(CommandError::not_found("active research", "none"));
    };
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::ResearchCancelled {
            tech_id: active.tech_id,
        },
    ));
    Ok(())
}

/// Adds passive and module research output to the spendable balance.
/// Modules only earn for `powered_secs`.
pub(crate) fn accrue_points(
    state: &mut ShipState,
    content: &GameContent,
    elapsed_secs: f64,
    powered_secs: f64,
) {
    let passive = content.constants.research_points_per_second * elapsed_secs;
    let modules = crate::ledger::module_research_output(state, content) * powered_secs;
    state.research.points += passive + modules;
}

/// Recomputes the active tech's points from its start time and completes it
/// once the total is reached.
pub(crate) fn advance_research(
    state: &mut ShipState,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) {
    let Some(active) = state.research.active.as_mut() else {
        return;
    };
    let Some(tech) = content.tech(&active.tech_id) else {
        // Definition dropped from content mid-run; nothing can complete it.
        return;
    };
    let time_required = tech.cost.time_required;
    if time_required <= 0.0 {
        active.current_points = active.total_points;
    } else {
        let rate = active.total_points / time_required
            * content.constants.research_speed_multiplier;
        let elapsed = crate::elapsed_secs(active.start_time, now);
        active.current_points = (rate * elapsed).min(active.total_points);
    }
    if active.current_points + COMPLETION_EPSILON < active.total_points {
        return;
    }

    let tech_id = active.tech_id.clone();
    let unlocks = tech.unlocks.clone();
    state.research.active = None;
    state.research.completed.push(tech_id.clone());
    tracing::debug!(%tech_id, "research completed");
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::ResearchCompleted { tech_id, unlocks },
    ));
}
