//! Integration test: research, travel, extract, fit warp, warp jump, chart neighbours.

use stellar_core::test_fixtures::{base_content, base_state, home_star, module_id, star, tech_id};
use stellar_core::*;

fn vega() -> StarProfile {
    let mut vega = star("vega", "A0V", Position::new(15.0, 0.0, 0.0));
    vega.temperature_k = 9_600.0;
    vega.mass = 2.1;
    vega.radius = 2.4;
    vega.luminosity = 40.0;
    vega
}

fn deneb() -> StarProfile {
    star("deneb", "A2Ia", Position::new(515.0, 0.0, 0.0))
}

fn apply(
    state: &mut ShipState,
    content: &GameContent,
    command: Command,
    now: u64,
) -> Vec<EventEnvelope> {
    apply_command(state, &command, content, now)
        .unwrap_or_else(|err| panic!("{command:?} rejected: {err}"))
}

#[test]
fn full_voyage_lifecycle() {
    let content = base_content();
    let mut state = base_state(&content);
    state.research.points = 100.0;
    let catalog = vec![home_star(), vega(), deneb()];

    // Research warp theory while cruising to Vega on the ion drive.
    apply(
        &mut state,
        &content,
        Command::StartResearch {
            tech_id: tech_id("tech_warp_theory"),
        },
        0,
    );
    apply(
        &mut state,
        &content,
        Command::NavigateToStar {
            star: vega(),
            mode: TravelMode::Normal,
        },
        0,
    );
    assert_eq!(state.navigation.as_ref().unwrap().estimated_completion, 7_500);

    tick(&mut state, &content, 7_500);
    assert_eq!(state.location.current_star_id, Some(StarId("vega".to_string())));
    let origin = state.connectivity.pending_origin.clone().unwrap();
    let graph = compute_connections(&catalog, &origin, &content.constants);
    store_connections(&mut state, graph, 7_500);
    assert!(state.connectivity.pending_origin.is_none());
    let sol = StarId("sol".to_string());
    let edges = &state.connectivity.edges;
    assert_eq!(hop_count(&sol, &StarId("vega".to_string()), edges), Some(1));
    assert_eq!(hop_count(&sol, &StarId("deneb".to_string()), edges), None);

    // Harvest whatever Vega offers first.
    let allocation = generate(&vega(), &content, state.meta.seed);
    let (resource, _) = allocation.primary_resources.iter().next().unwrap();
    let before = state.inventory.quantity(resource);
    apply(
        &mut state,
        &content,
        Command::StartExtraction {
            star: vega(),
            resource: resource.clone(),
        },
        7_500,
    );
    let completes_at = state.extraction.active[&StarId("vega".to_string())].completes_at;

    let events = tick(&mut state, &content, completes_at.max(120_000));
    let stored = events
        .iter()
        .find_map(|e| match &e.event {
            Event::ExtractionCompleted { stored, .. } => Some(*stored),
            _ => None,
        })
        .expect("extraction should complete");
    assert!(stored > 0.0);
    assert!((state.inventory.quantity(resource) - before - stored).abs() < 1e-9);
    assert!(state
        .research
        .completed
        .contains(&tech_id("tech_warp_theory")));

    // Salvaged exotic matter goes into containment; fit the warp core.
    let salvaged = state.inventory.add("exotic_matter", 2.0, &content);
    assert!((salvaged - 2.0).abs() < 1e-9);
    apply(
        &mut state,
        &content,
        Command::InstallModule {
            module_id: module_id("warp_core"),
        },
        120_000,
    );
    assert!(state.energy.current_stored >= content.constants.warp_nav_min_energy);

    apply(
        &mut state,
        &content,
        Command::NavigateToStar {
            star: deneb(),
            mode: TravelMode::Warp,
        },
        120_000,
    );
    // 500 units at 5 × 10
    assert_eq!(state.navigation.as_ref().unwrap().estimated_completion, 130_000);

    let events = tick(&mut state, &content, 130_000);
    assert!(events
        .iter()
        .any(|e| matches!(e.event, Event::NavigationCompleted { .. })));
    assert_eq!(state.location.current_star_id, Some(StarId("deneb".to_string())));
    assert!(!state.modules[&module_id("warp_core")].is_active);

    let report = diagnose(&state, &content);
    assert!(report.critical_issues.is_empty(), "{report:?}");
}
