//! Content validation tests for the shipped `content/*.json` tables.
//!
//! These load the real content directory and check:
//! 1. Schema validity: every file deserializes and passes `validate_content`
//! 2. Playability: the starting ship can move, research, and reach a neighbour
//! 3. Reachability: every tech can be researched and every resource can spawn
//! 4. Balance sanity: flag extreme outliers

use stellar_core::{
    compute_connections, diagnose, generate, GameContent, ModuleCategory, StarProfile, TechId,
};
use stellar_world::{build_initial_state, load_content, load_stars, StarCatalog};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Integration tests run from the crate directory, so go up two levels.
fn content_dir() -> String {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    format!("{manifest}/../../content")
}

fn load_test_content() -> &'static GameContent {
    static CONTENT: OnceLock<GameContent> = OnceLock::new();
    CONTENT.get_or_init(|| {
        load_content(&content_dir()).expect("load_content should succeed for production content")
    })
}

fn load_test_catalog() -> &'static StarCatalog {
    static CATALOG: OnceLock<StarCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        load_stars(&content_dir()).expect("load_stars should succeed for the sample catalog")
    })
}

fn home() -> &'static StarProfile {
    load_test_catalog().home_star().expect("home star")
}

// =========================================================================
// 1. Schema validation
// =========================================================================

#[test]
fn content_loads_successfully() {
    let content = load_test_content();
    assert!(!content.content_version.is_empty());
}

#[test]
fn catalog_loads_successfully() {
    assert!(load_test_catalog().stars.len() > 1);
}

#[test]
fn ids_are_non_empty() {
    let content = load_test_content();
    assert!(content.modules.iter().all(|m| !m.id.0.is_empty()));
    assert!(content.techs.iter().all(|t| !t.id.0.is_empty()));
    assert!(content.resources.iter().all(|r| !r.id.is_empty()));
}

// =========================================================================
// 2. Playability of the starting ship
// =========================================================================

#[test]
fn starting_ship_has_positive_energy_balance() {
    let content = load_test_content();
    let state = build_initial_state(content, 1, home(), 0);
    assert!(
        state.energy.total_generation > state.energy.total_consumption,
        "generation {} does not cover consumption {}",
        state.energy.total_generation,
        state.energy.total_consumption
    );
    assert!(state.energy.current_stored >= content.constants.normal_nav_min_energy);
}

#[test]
fn starting_ship_carries_power_and_engine() {
    let content = load_test_content();
    let state = build_initial_state(content, 1, home(), 0);
    for category in [ModuleCategory::Power, ModuleCategory::Engine] {
        assert!(
            state
                .modules
                .keys()
                .filter_map(|id| content.module_def(id))
                .any(|def| def.category == category),
            "loadout has no {category:?} module"
        );
    }
}

#[test]
fn starting_ship_passes_diagnostics() {
    let content = load_test_content();
    let state = build_initial_state(content, 1, home(), 0);
    let report = diagnose(&state, content);
    assert!(report.critical_issues.is_empty(), "{report:?}");
}

#[test]
fn starting_inventory_fits_in_the_hold() {
    let content = load_test_content();
    let state = build_initial_state(content, 1, home(), 0);
    assert!(state.inventory.current_capacity <= state.inventory.max_capacity);
}

#[test]
fn home_star_has_a_neighbour() {
    let content = load_test_content();
    let catalog = load_test_catalog();
    let graph = compute_connections(&catalog.stars, &catalog.home, &content.constants);
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.from == catalog.home || e.to == catalog.home),
        "home star is isolated at threshold {}",
        content.constants.connection_threshold
    );
}

#[test]
fn every_catalog_star_yields_something() {
    let content = load_test_content();
    for star in &load_test_catalog().stars {
        let allocation = generate(star, content, 42);
        assert!(
            !allocation.primary_resources.is_empty(),
            "star '{}' yields nothing",
            star.id
        );
    }
}

// =========================================================================
// 3. Reachability
// =========================================================================

#[test]
fn every_tech_is_researchable() {
    let content = load_test_content();
    let mut done: HashSet<&TechId> = HashSet::new();
    loop {
        let before = done.len();
        for tech in &content.techs {
            if tech.prereqs.iter().all(|p| done.contains(p)) {
                done.insert(&tech.id);
            }
        }
        if done.len() == before {
            break;
        }
    }
    for tech in &content.techs {
        assert!(
            done.contains(&tech.id),
            "tech '{}' sits on a prerequisite cycle",
            tech.id
        );
    }
}

#[test]
fn every_required_resource_has_a_compatible_catalog_star() {
    let content = load_test_content();
    let catalog = load_test_catalog();
    let letters: HashSet<_> = catalog
        .stars
        .iter()
        .filter_map(StarProfile::spectral_letter)
        .collect();
    let required = content
        .modules
        .iter()
        .flat_map(|m| m.required_resources.keys())
        .chain(content.techs.iter().flat_map(|t| t.cost.required_resources.keys()));
    for resource in required {
        let def = content.resource(resource).expect("validated resource");
        assert!(
            def.spectral_classes.iter().any(|c| letters.contains(c)),
            "resource '{resource}' has no compatible star in the sample catalog"
        );
    }
}

#[test]
fn every_drive_moves_the_ship() {
    let content = load_test_content();
    let drives: Vec<_> = content
        .modules
        .iter()
        .filter(|d| matches!(d.category, ModuleCategory::Engine | ModuleCategory::Warp))
        .collect();
    assert!(!drives.is_empty());
    for def in drives {
        assert!(def.speed > 0.0, "drive {} has speed {}", def.id, def.speed);
    }
}

#[test]
fn every_upgrade_has_a_base_tier() {
    let content = load_test_content();
    for def in content.modules.iter().filter(|d| d.tier > 0) {
        let base = content
            .modules
            .iter()
            .find(|m| m.category == def.category && m.tier + 1 == def.tier)
            .expect("validated tier chain");
        let next = content.next_tier(base).expect("next tier");
        assert_eq!(next.id, def.id);
    }
}

// =========================================================================
// 4. Balance sanity
// =========================================================================

#[test]
fn upgrades_improve_on_their_base() {
    let content = load_test_content();
    for def in &content.modules {
        let Some(next) = content.next_tier(def) else {
            continue;
        };
        let better = next.energy_generation > def.energy_generation
            || next.energy_storage > def.energy_storage
            || next.cargo_capacity > def.cargo_capacity
            || next.speed > def.speed
            || next.research_output > def.research_output;
        assert!(better, "'{}' is no improvement over '{}'", next.id, def.id);
    }
}

#[test]
fn research_times_are_bounded() {
    let content = load_test_content();
    for tech in &content.techs {
        assert!(
            tech.cost.time_required > 0.0 && tech.cost.time_required <= 3_600.0,
            "tech '{}' takes {}s",
            tech.id,
            tech.cost.time_required
        );
    }
}

#[test]
fn storage_holds_a_warp_reserve() {
    let content = load_test_content();
    let best_storage = content
        .modules
        .iter()
        .filter(|m| m.category == ModuleCategory::Storage)
        .map(|m| m.energy_storage)
        .fold(0.0, f64::max);
    assert!(
        content.constants.base_energy_storage + best_storage
            >= content.constants.warp_nav_min_energy
    );
}
