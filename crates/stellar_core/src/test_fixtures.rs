//! Shared test fixtures for stellar_core and downstream crates.
//!
//! `base_content()` is a small but complete table set: one module per
//! category plus an engine upgrade tier, three techs, seven resources, and
//! compressed durations. `base_state()` is a ship fitted from its loadout and
//! parked at `sol`.

use crate::spectral::SpectralClass;
use crate::{
    Constants, ContentIndex, EnergyRange, ExtractionDifficulty, GameContent, GenerationTables,
    Loadout, ModuleCategory, ModuleDef, ModuleId, Position, Rarity, ResearchCost, ResourceCategory,
    ResourceDef, ShipLocation, ShipState, StarId, StarProfile, TechDef, TechId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};

pub const HOME_STAR: &str = "sol";

pub fn base_content() -> GameContent {
    let mut content = GameContent {
        content_version: "test".to_string(),
        modules: base_modules(),
        techs: base_techs(),
        resources: base_resources(),
        generation: GenerationTables {
            rarity_weights: HashMap::from([
                (Rarity::Common, 1.0),
                (Rarity::Uncommon, 0.8),
                (Rarity::Rare, 0.5),
                (Rarity::Epic, 0.3),
                (Rarity::Legendary, 0.1),
            ]),
            // No G entries: tests rely on a neutral bonus for sun-like stars.
            spectral_bonus: HashMap::from([
                (
                    SpectralClass::O,
                    HashMap::from([
                        (ResourceCategory::Plasma, 1.5),
                        (ResourceCategory::Crystal, 1.3),
                    ]),
                ),
                (
                    SpectralClass::B,
                    HashMap::from([(ResourceCategory::Plasma, 1.3)]),
                ),
                (
                    SpectralClass::M,
                    HashMap::from([(ResourceCategory::Metal, 1.2)]),
                ),
            ]),
        },
        loadout: Loadout {
            modules: vec![
                module_id("reactor_core"),
                module_id("battery_bank"),
                module_id("ion_drive"),
                module_id("cargo_hold"),
            ],
            active_modules: vec![module_id("reactor_core"), module_id("cargo_hold")],
            inventory: HashMap::from([
                ("iron".to_string(), 30.0),
                ("titanium".to_string(), 10.0),
                ("hydrogen".to_string(), 20.0),
            ]),
            special_slots: BTreeMap::from([("containment".to_string(), 10.0)]),
            energy: 300.0,
            research_points: 0.0,
        },
        constants: base_constants(),
        index: ContentIndex::default(),
    };
    content.reindex();
    content
}

pub fn base_constants() -> Constants {
    Constants {
        research_points_per_second: 0.1,
        research_speed_multiplier: 1.0,
        warp_speed_multiplier: 10.0,
        min_travel_ms: 5_000,
        normal_nav_min_energy: 50.0,
        warp_nav_min_energy: 100.0,
        base_extraction_ms: 60_000,
        extraction_difficulty_multipliers: HashMap::from([
            (ExtractionDifficulty::Easy, 1.0),
            (ExtractionDifficulty::Medium, 1.5),
            (ExtractionDifficulty::Hard, 2.0),
            (ExtractionDifficulty::Extreme, 3.0),
        ]),
        extraction_window_ms: 3_600_000,
        connection_threshold: 20.0,
        connection_batch_size: 100,
        upgrade_duration_ms: 120_000,
        repair_status_ms: 10_000,
        base_energy_storage: 100.0,
        base_cargo_capacity: 200.0,
        durability_band_degraded_threshold: 0.5,
        durability_band_critical_threshold: 0.2,
        durability_band_degraded_efficiency: 0.75,
        durability_band_critical_efficiency: 0.5,
        shortage_recovery_secs: 60.0,
    }
}

fn module(id: &str, tier: u32, category: ModuleCategory, durability: f64) -> ModuleDef {
    ModuleDef {
        id: module_id(id),
        name: id.replace('_', " "),
        tier,
        category,
        energy_consumption: EnergyRange::default(),
        energy_generation: 0.0,
        energy_storage: 0.0,
        cargo_capacity: 0.0,
        speed: 0.0,
        research_output: 0.0,
        required_resources: HashMap::new(),
        required_research: None,
        durability,
        upgrade_effects: None,
    }
}

fn base_modules() -> Vec<ModuleDef> {
    vec![
        ModuleDef {
            energy_generation: 20.0,
            ..module("reactor_core", 0, ModuleCategory::Power, 100.0)
        },
        ModuleDef {
            energy_storage: 400.0,
            ..module("battery_bank", 0, ModuleCategory::Storage, 80.0)
        },
        ModuleDef {
            energy_consumption: EnergyRange { base: 2.0, max: 6.0 },
            speed: 2.0,
            required_resources: HashMap::from([("iron".to_string(), 10.0)]),
            ..module("ion_drive", 0, ModuleCategory::Engine, 100.0)
        },
        ModuleDef {
            energy_consumption: EnergyRange { base: 3.0, max: 8.0 },
            speed: 4.0,
            required_resources: HashMap::from([
                ("iron".to_string(), 20.0),
                ("titanium".to_string(), 5.0),
            ]),
            required_research: Some(tech_id("tech_advanced_propulsion")),
            upgrade_effects: Some("doubles cruising speed".to_string()),
            ..module("ion_drive_mk2", 1, ModuleCategory::Engine, 120.0)
        },
        ModuleDef {
            energy_consumption: EnergyRange { base: 10.0, max: 10.0 },
            speed: 5.0,
            required_resources: HashMap::from([
                ("exotic_matter".to_string(), 2.0),
                ("titanium".to_string(), 10.0),
            ]),
            required_research: Some(tech_id("tech_warp_theory")),
            ..module("warp_core", 0, ModuleCategory::Warp, 150.0)
        },
        ModuleDef {
            energy_consumption: EnergyRange { base: 0.5, max: 0.5 },
            cargo_capacity: 100.0,
            required_resources: HashMap::from([("iron".to_string(), 5.0)]),
            ..module("cargo_hold", 0, ModuleCategory::Cargo, 60.0)
        },
        ModuleDef {
            energy_consumption: EnergyRange { base: 1.0, max: 4.0 },
            research_output: 0.5,
            required_resources: HashMap::from([("titanium".to_string(), 2.0)]),
            ..module("research_lab", 0, ModuleCategory::Research, 60.0)
        },
        ModuleDef {
            energy_consumption: EnergyRange { base: 1.0, max: 3.0 },
            required_resources: HashMap::from([("iron".to_string(), 8.0)]),
            ..module("extractor", 0, ModuleCategory::Extraction, 90.0)
        },
        ModuleDef {
            energy_consumption: EnergyRange { base: 1.0, max: 1.0 },
            ..module("sensor_array", 0, ModuleCategory::Sensor, 50.0)
        },
    ]
}

fn base_techs() -> Vec<TechDef> {
    vec![
        TechDef {
            id: tech_id("tech_advanced_propulsion"),
            name: "Advanced Propulsion".to_string(),
            tier: 1,
            category: "propulsion".to_string(),
            cost: ResearchCost {
                research_points: 50.0,
                required_resources: HashMap::from([("iron".to_string(), 5.0)]),
                time_required: 60.0,
            },
            prereqs: vec![],
            unlocks: vec!["ion_drive_mk2".to_string()],
            effects: vec![],
        },
        TechDef {
            id: tech_id("tech_warp_theory"),
            name: "Warp Theory".to_string(),
            tier: 1,
            category: "propulsion".to_string(),
            cost: ResearchCost {
                research_points: 100.0,
                required_resources: HashMap::new(),
                time_required: 120.0,
            },
            prereqs: vec![],
            unlocks: vec!["warp_core".to_string()],
            effects: vec![],
        },
        TechDef {
            id: tech_id("tech_quantum_mining"),
            name: "Quantum Mining".to_string(),
            tier: 2,
            category: "extraction".to_string(),
            cost: ResearchCost {
                research_points: 150.0,
                required_resources: HashMap::new(),
                time_required: 180.0,
            },
            prereqs: vec![tech_id("tech_warp_theory")],
            unlocks: vec![],
            effects: vec!["extraction_yield_bonus".to_string()],
        },
    ]
}

#[allow(clippy::too_many_arguments)]
fn resource(
    id: &str,
    category: ResourceCategory,
    rarity: Rarity,
    classes: &[SpectralClass],
    temperature_range: (f64, f64),
    mass_range: (f64, f64),
    luminosity_range: (f64, f64),
    base_probability: f64,
    max_yield_per_hour: f64,
) -> ResourceDef {
    ResourceDef {
        id: id.to_string(),
        name: id.replace('_', " "),
        category,
        rarity,
        spectral_classes: classes.to_vec(),
        temperature_range,
        mass_range,
        luminosity_range,
        variable_only: false,
        base_probability,
        base_value: max_yield_per_hour * 10.0,
        max_yield_per_hour,
        storage_slot: None,
    }
}

fn base_resources() -> Vec<ResourceDef> {
    use SpectralClass::{A, B, F, G, K, M, O};
    vec![
        resource(
            "hydrogen",
            ResourceCategory::Gas,
            Rarity::Common,
            &[O, B, A, F, G, K, M],
            (2_000.0, 50_000.0),
            (0.08, 150.0),
            (0.0001, 1_000_000.0),
            90.0,
            8.0,
        ),
        resource(
            "helium",
            ResourceCategory::Gas,
            Rarity::Common,
            &[O, B, A, F, G, K],
            (3_000.0, 50_000.0),
            (0.1, 150.0),
            (0.001, 1_000_000.0),
            70.0,
            6.0,
        ),
        resource(
            "iron",
            ResourceCategory::Metal,
            Rarity::Common,
            &[F, G, K, M],
            (2_500.0, 8_000.0),
            (0.3, 5.0),
            (0.01, 100.0),
            60.0,
            5.0,
        ),
        resource(
            "titanium",
            ResourceCategory::Metal,
            Rarity::Uncommon,
            &[A, F, G, K],
            (3_500.0, 10_000.0),
            (0.5, 8.0),
            (0.1, 500.0),
            40.0,
            3.0,
        ),
        resource(
            "stellar_plasma",
            ResourceCategory::Plasma,
            Rarity::Rare,
            &[O, B, A],
            (7_500.0, 50_000.0),
            (1.5, 150.0),
            (5.0, 1_000_000.0),
            30.0,
            2.0,
        ),
        ResourceDef {
            variable_only: true,
            storage_slot: Some("containment".to_string()),
            ..resource(
                "exotic_matter",
                ResourceCategory::Exotic,
                Rarity::Epic,
                &[O, B, A, F, G, K, M],
                (2_000.0, 50_000.0),
                (0.1, 150.0),
                (0.001, 1_000_000.0),
                15.0,
                0.5,
            )
        },
        resource(
            "dilithium",
            ResourceCategory::Crystal,
            Rarity::Legendary,
            &[O, B],
            (20_000.0, 50_000.0),
            (10.0, 150.0),
            (1_000.0, 1_000_000.0),
            10.0,
            0.3,
        ),
    ]
}

/// Sun-like defaults; override fields as needed.
pub fn star(id: &str, spectral_class: &str, position: Position) -> StarProfile {
    StarProfile {
        id: StarId(id.to_string()),
        name: id.to_string(),
        spectral_class: spectral_class.to_string(),
        temperature_k: 5_778.0,
        mass: 1.0,
        radius: 1.0,
        luminosity: 1.0,
        variable_type: None,
        position,
    }
}

pub fn home_star() -> StarProfile {
    star(HOME_STAR, "G2V", Position::default())
}

/// Loadout ship at `sol`, seed 42, clock at 0.
pub fn base_state(content: &GameContent) -> ShipState {
    ShipState::from_loadout(
        content,
        42,
        ShipLocation {
            current_star_id: Some(StarId(HOME_STAR.to_string())),
            position: Position::default(),
        },
        0,
    )
}

pub fn module_id(id: &str) -> ModuleId {
    ModuleId(id.to_string())
}

pub fn tech_id(id: &str) -> TechId {
    TechId(id.to_string())
}

/// Deterministic RNG seeded with 42.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
