use super::*;

/// Reactor worn into the critical band (half output) with a full set of
/// consumers running: generation 10, demand 14.5.
fn overloaded_state(content: &GameContent) -> ShipState {
    let mut state = test_state(content);
    state
        .modules
        .get_mut(&module_id("reactor_core"))
        .unwrap()
        .current_durability = 10.0;
    fit(&mut state, content, "ion_drive", true, 100.0);
    fit(&mut state, content, "research_lab", true, 100.0);
    fit(&mut state, content, "extractor", true, 100.0);
    fit(&mut state, content, "sensor_array", true, 100.0);
    state
}

#[test]
fn test_base_budget() {
    let content = test_content();
    let state = test_state(&content);
    assert!((state.energy.total_generation - 20.0).abs() < 1e-9);
    assert!((state.energy.total_consumption - 0.5).abs() < 1e-9);
    assert!((state.energy.distribution_efficiency - 97.5).abs() < 1e-9);
    assert!(state.energy.unmet_demand.abs() < 1e-9);
}

#[test]
fn test_storage_covers_deficit_before_shedding() {
    let content = test_content();
    let mut state = overloaded_state(&content);
    tick(&mut state, &content, 0);

    assert!((state.energy.total_generation - 10.0).abs() < 1e-9);
    assert!((state.energy.total_consumption - 14.5).abs() < 1e-9);
    assert!(state.energy.unmet_demand.abs() < 1e-9);
    assert!(state.modules.values().all(|m| !m.energy_starved));

    tick(&mut state, &content, 10_000);
    assert!((state.energy.current_stored - 255.0).abs() < 1e-6);
}

#[test]
fn test_empty_storage_sheds_lowest_priority_first() {
    let content = test_content();
    let mut state = overloaded_state(&content);
    state.energy.current_stored = 0.0;

    let events = tick(&mut state, &content, 0);

    let starved: Vec<&str> = state
        .modules
        .values()
        .filter(|m| m.energy_starved)
        .map(|m| m.id.0.as_str())
        .collect();
    assert_eq!(starved, vec!["research_lab", "sensor_array"]);
    assert!((state.energy.unmet_demand - 5.0).abs() < 1e-9);
    assert_eq!(
        state.modules[&module_id("sensor_array")].status,
        ModuleStatus::EnergyShortage
    );
    assert_eq!(
        state.modules[&module_id("ion_drive")].status,
        ModuleStatus::Normal
    );
    assert!(has_event(&events, |e| matches!(e, Event::EnergyShortage { .. })));

    // Same shortage on the next tick is not re-announced.
    let events = tick(&mut state, &content, 1_000);
    assert!(!has_event(&events, |e| matches!(e, Event::EnergyShortage { .. })));
}

fn starved_ids(state: &ShipState) -> Vec<&str> {
    state
        .modules
        .values()
        .filter(|m| m.energy_starved)
        .map(|m| m.id.0.as_str())
        .collect()
}

#[test]
fn test_shedding_holds_steady_across_ticks() {
    let content = test_content();
    let mut state = overloaded_state(&content);
    state.energy.current_stored = 0.0;
    let events = tick(&mut state, &content, 0);
    assert!(has_event(&events, |e| matches!(e, Event::EnergyShortage { .. })));

    // Shedding leaves a 0.5/s surplus that slowly refills storage.
    for second in 1..=20_u64 {
        let events = tick(&mut state, &content, second * 1_000);
        assert!(
            !has_event(&events, |e| matches!(e, Event::EnergyShortage { .. })),
            "shortage re-announced at {second}s"
        );
        assert_eq!(starved_ids(&state), vec!["research_lab", "sensor_array"]);
        assert_eq!(
            state.modules[&module_id("research_lab")].status,
            ModuleStatus::EnergyShortage
        );
        assert_eq!(
            state.modules[&module_id("ion_drive")].status,
            ModuleStatus::Normal
        );
    }
    assert!((state.energy.current_stored - 10.0).abs() < 1e-9);
    // Only passive accrual while the lab is starved.
    assert!((state.research.points - 2.0).abs() < 1e-9);
}

#[test]
fn test_storage_pays_only_what_it_holds() {
    let content = test_content();
    let mut state = overloaded_state(&content);
    state.energy.current_stored = 2.0;
    tick(&mut state, &content, 0);
    assert!(starved_ids(&state).is_empty());

    // A 4.5/s deficit drains 2.0 stored in 4/9 of a second.
    let events = tick(&mut state, &content, 1_000);

    assert!(state.energy.current_stored.abs() < 1e-9);
    let expected = 0.1 + 0.5 * (2.0 / 4.5);
    assert!(
        (state.research.points - expected).abs() < 1e-9,
        "points {} expected {expected}",
        state.research.points
    );
    assert_eq!(starved_ids(&state), vec!["research_lab", "sensor_array"]);
    assert!(has_event(&events, |e| matches!(e, Event::EnergyShortage { .. })));
}

#[test]
fn test_shed_modules_return_once_storage_can_carry_the_deficit() {
    let content = test_content();
    let mut state = overloaded_state(&content);
    state.energy.current_stored = 0.0;
    tick(&mut state, &content, 0);

    // Just short of a full recovery window at a 4.5/s deficit.
    state.energy.current_stored = 4.5 * 60.0 - 1.0;
    tick(&mut state, &content, 0);
    assert_eq!(starved_ids(&state), vec!["research_lab", "sensor_array"]);

    state.energy.current_stored = 4.5 * 60.0 + 1.0;
    tick(&mut state, &content, 0);
    assert!(starved_ids(&state).is_empty());
    assert_eq!(
        state.modules[&module_id("sensor_array")].status,
        ModuleStatus::Normal
    );
}

#[test]
fn test_repairing_the_reactor_ends_the_shortage() {
    let content = test_content();
    let mut state = overloaded_state(&content);
    state.energy.current_stored = 0.0;
    tick(&mut state, &content, 0);
    assert!(!starved_ids(&state).is_empty());

    run(
        &mut state,
        &content,
        Command::RepairModule {
            module_id: module_id("reactor_core"),
            amount: 90.0,
        },
        1_000,
    );

    assert!((state.energy.total_generation - 20.0).abs() < 1e-9);
    assert!(starved_ids(&state).is_empty());
    assert!(state.energy.unmet_demand.abs() < 1e-9);
}

#[test]
fn test_stored_energy_is_clamped_to_capacity() {
    let content = test_content();
    let mut state = test_state(&content);
    tick(&mut state, &content, 1_000_000);
    assert!((state.energy.current_stored - 500.0).abs() < 1e-9);
}

#[test]
fn test_research_lab_adds_to_point_rate() {
    let content = test_content();
    let mut state = test_state(&content);
    fit(&mut state, &content, "research_lab", true, 100.0);
    tick(&mut state, &content, 0);
    tick(&mut state, &content, 10_000);
    // 0.1 passive + 0.5 from the lab
    assert!((state.research.points - 6.0).abs() < 1e-9);
}

#[test]
fn test_idle_tick_is_quiet() {
    let content = test_content();
    let mut state = test_state(&content);
    let first = tick(&mut state, &content, 5_000);
    let second = tick(&mut state, &content, 5_000);
    assert!(first.is_empty());
    assert!(second.is_empty());
    assert_eq!(state.meta.last_tick_at, 5_000);

    // A clock that runs backwards never rewinds progress.
    tick(&mut state, &content, 1_000);
    assert_eq!(state.meta.last_tick_at, 5_000);
}
