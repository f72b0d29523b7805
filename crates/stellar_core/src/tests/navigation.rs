use super::*;

fn go(target: &StarProfile, mode: TravelMode) -> Command {
    Command::NavigateToStar {
        star: target.clone(),
        mode,
    }
}

fn alpha() -> StarProfile {
    star("alpha", "K1V", Position::new(20.0, 0.0, 0.0))
}

#[test]
fn test_warp_needs_one_hundred_stored() {
    let content = test_content();
    let mut state = test_state(&content);
    fit(&mut state, &content, "warp_core", false, 0.0);

    state.energy.current_stored = 99.0;
    let err = reject(&mut state, &content, go(&alpha(), TravelMode::Warp), 0);
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(err, CommandError::InsufficientEnergy { .. }));

    state.energy.current_stored = 100.0;
    run(&mut state, &content, go(&alpha(), TravelMode::Warp), 0);
    let nav = state.navigation.as_ref().unwrap();
    assert_eq!(nav.mode, TravelMode::Warp);
    assert_eq!(nav.module_id, module_id("warp_core"));
    let warp = &state.modules[&module_id("warp_core")];
    assert!(warp.is_active);
    assert!((warp.energy_allocation - 100.0).abs() < 1e-9);
}

#[test]
fn test_normal_travel_threshold_is_fifty() {
    let content = test_content();
    let mut state = test_state(&content);
    state.energy.current_stored = 49.0;
    let err = reject(&mut state, &content, go(&alpha(), TravelMode::Normal), 0);
    assert!(matches!(err, CommandError::InsufficientEnergy { .. }));
    state.energy.current_stored = 50.0;
    run(&mut state, &content, go(&alpha(), TravelMode::Normal), 0);
}

#[test]
fn test_warp_without_warp_module() {
    let content = test_content();
    let mut state = test_state(&content);
    let err = reject(&mut state, &content, go(&alpha(), TravelMode::Warp), 0);
    assert_eq!(err, CommandError::MissingModule(ModuleCategory::Warp));
    assert_eq!(err.kind(), ErrorKind::Module);
}

#[test]
fn test_second_trip_conflicts() {
    let content = test_content();
    let mut state = test_state(&content);
    run(&mut state, &content, go(&alpha(), TravelMode::Normal), 0);
    let beta = star("beta", "M4V", Position::new(0.0, 12.0, 0.0));
    let err = reject(&mut state, &content, go(&beta, TravelMode::Normal), 0);
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn test_already_at_target() {
    let content = test_content();
    let mut state = test_state(&content);
    let err = reject(&mut state, &content, go(&home_star(), TravelMode::Normal), 0);
    assert!(matches!(err, CommandError::AlreadyAtStar(_)));
}

#[test]
fn test_travel_progress_and_arrival() {
    let content = test_content();
    let mut state = test_state(&content);
    let events = run(&mut state, &content, go(&alpha(), TravelMode::Normal), 0);
    // 20 units at speed 2
    assert!(has_event(&events, |e| matches!(
        e,
        Event::NavigationStarted {
            estimated_completion: 10_000,
            ..
        }
    )));
    assert!((state.energy.total_consumption - 6.5).abs() < 1e-9);

    tick(&mut state, &content, 5_000);
    let nav = state.navigation.as_ref().unwrap();
    assert!((nav.travel_progress - 50.0).abs() < 1e-9);

    let events = tick(&mut state, &content, 10_000);
    assert!(state.navigation.is_none());
    assert_eq!(state.location.current_star_id, Some(StarId("alpha".to_string())));
    assert!((state.location.position.x - 20.0).abs() < 1e-9);
    let drive = &state.modules[&module_id("ion_drive")];
    assert!(!drive.is_active);
    assert!(drive.energy_allocation.abs() < 1e-9);
    assert_eq!(
        state.connectivity.pending_origin,
        Some(StarId("alpha".to_string()))
    );
    assert!(has_event(&events, |e| matches!(e, Event::NavigationCompleted { .. })));
    assert!(has_event(&events, |e| matches!(
        e,
        Event::ConnectivityRecomputeRequested { .. }
    )));
}

#[test]
fn test_short_hops_take_minimum_time() {
    let content = test_content();
    let mut state = test_state(&content);
    let near = star("near", "G8V", Position::new(1.0, 0.0, 0.0));
    run(&mut state, &content, go(&near, TravelMode::Normal), 2_000);
    let nav = state.navigation.as_ref().unwrap();
    assert_eq!(nav.estimated_completion, 7_000);
}

fn with_drive_speed(speed: f64) -> GameContent {
    let mut content = test_content();
    content
        .modules
        .iter_mut()
        .find(|def| def.id == module_id("ion_drive"))
        .unwrap()
        .speed = speed;
    content
}

#[test]
fn test_crawling_drive_saturates_arrival_time() {
    let content = with_drive_speed(1e-20);
    let mut state = test_state(&content);
    run(&mut state, &content, go(&alpha(), TravelMode::Normal), 5_000);
    let nav = state.navigation.as_ref().unwrap();
    assert_eq!(nav.estimated_completion, u64::MAX);

    tick(&mut state, &content, 10_000);
    let nav = state.navigation.as_ref().unwrap();
    assert!(nav.travel_progress < 1e-9);
}

#[test]
fn test_stalled_drive_is_not_a_drive() {
    let content = with_drive_speed(0.0);
    let mut state = test_state(&content);
    let err = reject(&mut state, &content, go(&alpha(), TravelMode::Normal), 0);
    assert_eq!(err, CommandError::MissingModule(ModuleCategory::Engine));
}

#[test]
fn test_warp_multiplies_speed() {
    let content = test_content();
    let mut state = test_state(&content);
    fit(&mut state, &content, "warp_core", false, 0.0);
    let far = star("far", "A0V", Position::new(500.0, 0.0, 0.0));
    run(&mut state, &content, go(&far, TravelMode::Warp), 0);
    let nav = state.navigation.as_ref().unwrap();
    assert!((nav.travel_speed - 50.0).abs() < 1e-9);
    assert_eq!(nav.estimated_completion, 10_000);
}

#[test]
fn test_cancel_keeps_position_and_requests_recompute() {
    let content = test_content();
    let mut state = test_state(&content);

    let err = reject(&mut state, &content, Command::CancelNavigation, 0);
    assert_eq!(err.kind(), ErrorKind::NotFound);

    run(&mut state, &content, go(&alpha(), TravelMode::Normal), 0);
    tick(&mut state, &content, 5_000);
    let events = run(&mut state, &content, Command::CancelNavigation, 5_000);

    assert!(state.navigation.is_none());
    assert_eq!(state.location.current_star_id, Some(StarId("sol".to_string())));
    assert!(state.location.position.x.abs() < 1e-9);
    assert!(!state.modules[&module_id("ion_drive")].is_active);
    assert_eq!(
        state.connectivity.pending_origin,
        Some(StarId("sol".to_string()))
    );
    assert!(has_event(&events, |e| matches!(e, Event::NavigationCancelled { .. })));

    // Restarting begins from zero progress.
    run(&mut state, &content, go(&alpha(), TravelMode::Normal), 5_000);
    let nav = state.navigation.as_ref().unwrap();
    assert!(nav.travel_progress.abs() < 1e-9);
    assert_eq!(nav.estimated_completion, 15_000);
}
