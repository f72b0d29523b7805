use std::collections::HashSet;

use stellar_core::{
    is_module_unlocked, neighbors, tech_status, upgrade_suggestions, Command, GameContent,
    ModuleCategory, ShipState, StarId, StarProfile, TechStatus, TravelMode,
};

/// Decides the next commands for a scripted voyage:
/// 1. Chart the neighbourhood when a connectivity recompute is pending.
/// 2. Research the cheapest available tech.
/// 3. Start any upgrade that is unlocked and affordable.
/// 4. Fit and power up a research lab.
/// 5. Extract once at each star, then cruise to the nearest unvisited neighbour.
#[derive(Debug, Default)]
pub struct Autopilot {
    visited: HashSet<StarId>,
}

impl Autopilot {
    pub fn plan(
        &mut self,
        state: &ShipState,
        content: &GameContent,
        stars: &[StarProfile],
    ) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(here) = &state.location.current_star_id {
            self.visited.insert(here.clone());
        }
        if let Some(origin) = &state.connectivity.pending_origin {
            commands.push(Command::RecomputeConnections {
                stars: stars.to_vec(),
                origin: origin.clone(),
            });
        }
        commands.extend(research_command(state, content));
        if state.navigation.is_none() {
            commands.extend(
                upgrade_suggestions(state, content)
                    .into_iter()
                    .filter(|suggestion| suggestion.is_ready())
                    .map(|suggestion| Command::StartModuleUpgrade {
                        module_id: suggestion.module_id,
                    }),
            );
        }
        commands.extend(lab_command(state, content));
        commands.extend(self.voyage_command(state, content, stars));
        commands
    }

    fn voyage_command(
        &self,
        state: &ShipState,
        content: &GameContent,
        stars: &[StarProfile],
    ) -> Option<Command> {
        if state.navigation.is_some() {
            return None;
        }
        let here = state.location.current_star_id.as_ref()?;
        if state.extraction.active.contains_key(here) {
            return None;
        }
        let star = stars.iter().find(|star| &star.id == here)?;
        let history = state.extraction.history.get(here);
        if !history.is_some_and(|h| h.total_extractions > 0) {
            let allocation = state
                .allocations
                .get(here)
                .cloned()
                .unwrap_or_else(|| stellar_core::generate(star, content, state.meta.seed));
            let used = history.map_or(0, |h| {
                h.count_in_window(state.meta.last_tick_at, content.constants.extraction_window_ms)
            });
            if used < allocation.max_extractions_per_hour {
                let (resource, _) = allocation
                    .primary_resources
                    .iter()
                    .max_by(|a, b| a.1.total_cmp(b.1))?;
                return Some(Command::StartExtraction {
                    star: star.clone(),
                    resource: resource.clone(),
                });
            }
        }
        if state.energy.current_stored < content.constants.normal_nav_min_energy {
            return None;
        }
        let distance =
            |candidate: &StarProfile| candidate.position.distance_to(&state.location.position);
        let adjacent: Vec<&StarProfile> = neighbors(&state.connectivity.edges, here)
            .filter_map(|id| stars.iter().find(|star| &star.id == id))
            .collect();
        let target = adjacent
            .iter()
            .filter(|star| !self.visited.contains(&star.id))
            .min_by(|a, b| distance(a).total_cmp(&distance(b)))
            .or_else(|| adjacent.iter().min_by(|a, b| distance(a).total_cmp(&distance(b))))?;
        Some(Command::NavigateToStar {
            star: (*target).clone(),
            mode: TravelMode::Normal,
        })
    }
}

/// Cheapest available tech the ship can pay for right now.
fn research_command(state: &ShipState, content: &GameContent) -> Option<Command> {
    if state.research.active.is_some() {
        return None;
    }
    content
        .techs
        .iter()
        .filter(|tech| tech_status(state, tech) == TechStatus::Available)
        .filter(|tech| state.research.points >= tech.cost.research_points)
        .filter(|tech| {
            state
                .inventory
                .check_available(&tech.cost.required_resources)
                .is_ok()
        })
        .min_by(|a, b| a.cost.research_points.total_cmp(&b.cost.research_points))
        .map(|tech| Command::StartResearch {
            tech_id: tech.id.clone(),
        })
}

fn lab_command(state: &ShipState, content: &GameContent) -> Option<Command> {
    let lab = content
        .modules
        .iter()
        .find(|def| def.category == ModuleCategory::Research && def.tier == 0)?;
    match state.modules.get(&lab.id) {
        None => (is_module_unlocked(state, lab, content)
            && state.inventory.check_available(&lab.required_resources).is_ok())
        .then(|| Command::InstallModule {
            module_id: lab.id.clone(),
        }),
        Some(installed) if !installed.is_active && installed.current_durability > 0.0 => {
            Some(Command::ToggleModuleActive {
                module_id: lab.id.clone(),
            })
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::test_fixtures::{base_content, base_state, home_star, module_id, star};
    use stellar_core::{compute_connections, store_connections, ExtractionHistory, Position};

    fn stars() -> Vec<StarProfile> {
        vec![
            home_star(),
            star("alpha", "K1V", Position::new(12.0, 0.0, 0.0)),
            star("beta", "M4V", Position::new(0.0, 5.0, 0.0)),
        ]
    }

    #[test]
    fn test_pending_connectivity_is_charted_first() {
        let content = base_content();
        let mut state = base_state(&content);
        state.connectivity.pending_origin = Some(home_star().id);

        let commands = Autopilot::default().plan(&state, &content, &stars());

        assert!(matches!(
            commands.first(),
            Some(Command::RecomputeConnections { stars, .. }) if stars.len() == 3
        ));
    }

    #[test]
    fn test_cheapest_affordable_tech_is_researched() {
        let content = base_content();
        let mut state = base_state(&content);
        state.research.points = 100.0;

        let commands = Autopilot::default().plan(&state, &content, &stars());

        assert!(commands.iter().any(|command| matches!(
            command,
            Command::StartResearch { tech_id } if tech_id.0 == "tech_advanced_propulsion"
        )));
    }

    #[test]
    fn test_lab_is_fitted_when_affordable() {
        let content = base_content();
        let state = base_state(&content);

        let commands = Autopilot::default().plan(&state, &content, &stars());

        assert!(commands.iter().any(|command| matches!(
            command,
            Command::InstallModule { module_id: id } if *id == module_id("research_lab")
        )));
    }

    #[test]
    fn test_extracts_once_then_moves_to_nearest_unvisited() {
        let content = base_content();
        let mut state = base_state(&content);
        let graph = compute_connections(&stars(), &home_star().id, &content.constants);
        store_connections(&mut state, graph, 0);
        let mut autopilot = Autopilot::default();

        let commands = autopilot.plan(&state, &content, &stars());
        assert!(commands.iter().any(|command| matches!(
            command,
            Command::StartExtraction { star, .. } if star.id.0 == "sol"
        )));

        state.extraction.history.insert(
            home_star().id,
            ExtractionHistory {
                total_extractions: 1,
                ..ExtractionHistory::default()
            },
        );
        let commands = autopilot.plan(&state, &content, &stars());
        assert!(commands.iter().any(|command| matches!(
            command,
            Command::NavigateToStar { star, mode: TravelMode::Normal } if star.id.0 == "beta"
        )));
    }
}
