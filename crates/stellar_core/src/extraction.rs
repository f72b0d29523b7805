//! Per-star extraction runs, rate-limited by a fixed hourly window.

use crate::{
    ActiveExtraction, CommandError, Event, EventEnvelope, ExtractionHistory, GameContent,
    ShipState, StarId, StarProfile, Timestamp,
};

impl ExtractionHistory {
    /// Extractions counted against the current window as of `now`.
    pub fn count_in_window(&self, now: Timestamp, window_ms: u64) -> u32 {
        if now.saturating_sub(self.window_started_at) >= window_ms {
            0
        } else {
            self.extractions_this_hour
        }
    }

    fn record(&mut self, now: Timestamp, window_ms: u64) {
        if now.saturating_sub(self.window_started_at) >= window_ms {
            self.window_started_at = now;
            self.extractions_this_hour = 0;
        }
        self.extractions_this_hour += 1;
        self.total_extractions += 1;
        self.last_extraction = Some(now);
    }
}

pub(crate) fn start_extraction(
    state: &mut ShipState,
    star: &StarProfile,
    resource: &str,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    if state.extraction.active.contains_key(&star.id) {
        return Err(CommandError::conflict(format!("extraction at {}", star.id)));
    }
    // Validate against a scratch copy so a rejected start caches nothing.
    let allocation = match state.allocations.get(&star.id) {
        Some(cached) => cached.clone(),
        None => crate::generate(star, content, state.meta.seed),
    };
    let window_ms = content.constants.extraction_window_ms;
    let used = state
        .extraction
        .history
        .get(&star.id)
        .map_or(0, |history| history.count_in_window(now, window_ms));
    if used >= allocation.max_extractions_per_hour {
        return Err(CommandError::RateLimited {
            star_id: star.id.clone(),
            limit: allocation.max_extractions_per_hour,
        });
    }
    let expected_yield = allocation.yield_of(resource).ok_or_else(|| {
        CommandError::not_found("resource at star", format!("{}/{resource}", star.id))
    })?;

    crate::allocation_for(state, star, content, now, events);
    let completes_at = now.saturating_add(
        content
            .constants
            .extraction_duration_ms(allocation.extraction_difficulty),
    );
    state.extraction.active.insert(
        star.id.clone(),
        ActiveExtraction {
            resource_type: resource.to_string(),
            progress: 0.0,
            expected_yield,
            started_at: now,
            completes_at,
        },
    );
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::ExtractionStarted {
            star_id: star.id.clone(),
            resource: resource.to_string(),
            expected_yield,
            completes_at,
        },
    ));
    Ok(())
}

/// Discards the run. No yield is credited.
pub(crate) fn cancel_extraction(
    state: &mut ShipState,
    star_id: &StarId,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    if state.extraction.active.remove(star_id).is_none() {
        return Err(CommandError::not_found("active extraction", star_id));
    }
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::ExtractionCancelled {
            star_id: star_id.clone(),
        },
    ));
    Ok(())
}

pub(crate) fn advance_extractions(
    state: &mut ShipState,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) {
    let mut finished: Vec<StarId> = Vec::new();
    for (star_id, run) in &mut state.extraction.active {
        let total = run.completes_at.saturating_sub(run.started_at);
        if now >= run.completes_at || total == 0 {
            run.progress = 100.0;
            finished.push(star_id.clone());
        } else {
            let elapsed = now.saturating_sub(run.started_at);
            run.progress = (elapsed as f64 / total as f64 * 100.0).min(100.0);
        }
    }

    let window_ms = content.constants.extraction_window_ms;
    for star_id in finished {
        let Some(run) = state.extraction.active.remove(&star_id) else {
            continue;
        };
        let stored = state
            .inventory
            .add(&run.resource_type, run.expected_yield, content);
        state
            .extraction
            .history
            .entry(star_id.clone())
            .or_default()
            .record(now, window_ms);
        tracing::debug!(
            star = %star_id,
            resource = %run.resource_type,
            stored,
            "extraction completed"
        );
        events.push(crate::emit(
            &mut state.counters,
            now,
            Event::ExtractionCompleted {
                star_id,
                resource: run.resource_type,
                stored,
            },
        ));
    }
}
