//! Content loading and ship construction shared between stellar_cli and stellar_daemon.

use anyhow::{ensure, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use stellar_core::{
    Constants, ContentIndex, GameContent, GenerationTables, Loadout, ModuleCategory, ModuleDef,
    ModuleId, ResourceDef, ShipLocation, ShipState, StarId, StarProfile, TechDef, TechId,
    Timestamp,
};
use std::collections::HashSet;
use std::path::Path;

#[derive(Deserialize)]
struct TechsFile {
    content_version: String,
    techs: Vec<TechDef>,
}

/// Sample star catalog read from `stars.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct StarCatalog {
    /// Star the ship is built at.
    pub home: StarId,
    pub stars: Vec<StarProfile>,
}

impl StarCatalog {
    pub fn get(&self, id: &StarId) -> Option<&StarProfile> {
        self.stars.iter().find(|star| &star.id == id)
    }

    pub fn home_star(&self) -> Option<&StarProfile> {
        self.get(&self.home)
    }
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let text = std::fs::read_to_string(dir.join(file)).with_context(|| format!("reading {file}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {file}"))
}

/// Validates cross-references in loaded content, panicking on any authoring error.
///
/// Catches mistakes like: a module requiring an unknown resource, a tech
/// prereq that doesn't exist, or an upgrade tier with nothing below it.
pub fn validate_content(content: &GameContent) {
    let resource_ids: HashSet<&str> = content.resources.iter().map(|r| r.id.as_str()).collect();
    let module_ids: HashSet<&ModuleId> = content.modules.iter().map(|m| &m.id).collect();
    let tech_ids: HashSet<&TechId> = content.techs.iter().map(|t| &t.id).collect();

    assert_eq!(
        resource_ids.len(),
        content.resources.len(),
        "resources.json contains a duplicate resource id"
    );
    assert_eq!(
        module_ids.len(),
        content.modules.len(),
        "modules.json contains a duplicate module id"
    );
    assert_eq!(
        tech_ids.len(),
        content.techs.len(),
        "techs.json contains a duplicate tech id"
    );

    validate_constants(&content.constants);
    for resource in &content.resources {
        validate_resource(resource, &content.loadout);
    }
    for def in &content.modules {
        validate_module(def, content, &resource_ids, &tech_ids);
    }
    for tech in &content.techs {
        validate_tech(tech, &resource_ids, &module_ids, &tech_ids);
    }
    validate_loadout(&content.loadout, &resource_ids, &module_ids);
}

fn validate_constants(constants: &Constants) {
    assert!(
        constants.connection_threshold > 0.0,
        "connection_threshold must be positive, got {}",
        constants.connection_threshold
    );
    assert!(
        constants.connection_batch_size > 0,
        "connection_batch_size must be at least 1"
    );
    assert!(
        constants.extraction_window_ms > 0,
        "extraction_window_ms must be positive"
    );
    assert!(
        constants.durability_band_critical_threshold
            <= constants.durability_band_degraded_threshold,
        "critical durability band must sit below the degraded band"
    );
    assert!(
        constants.shortage_recovery_secs >= 0.0,
        "shortage_recovery_secs must not be negative"
    );
}

fn validate_resource(resource: &ResourceDef, loadout: &Loadout) {
    for (name, (low, high)) in [
        ("temperature_range", resource.temperature_range),
        ("mass_range", resource.mass_range),
        ("luminosity_range", resource.luminosity_range),
    ] {
        assert!(
            low <= high,
            "resource '{}' {name} is inverted: [{low}, {high}]",
            resource.id,
        );
    }
    assert!(
        (0.0..=100.0).contains(&resource.base_probability),
        "resource '{}' base_probability {} is outside 0..=100",
        resource.id,
        resource.base_probability,
    );
    if let Some(slot) = &resource.storage_slot {
        assert!(
            loadout.special_slots.contains_key(slot),
            "resource '{}' storage slot '{}' is not a loadout special slot",
            resource.id,
            slot,
        );
    }
}

fn validate_module(
    def: &ModuleDef,
    content: &GameContent,
    resource_ids: &HashSet<&str>,
    tech_ids: &HashSet<&TechId>,
) {
    for resource in def.required_resources.keys() {
        assert!(
            resource_ids.contains(resource.as_str()),
            "module '{}' requires '{}' which is not a known resource",
            def.id,
            resource,
        );
    }
    if let Some(tech_id) = &def.required_research {
        assert!(
            tech_ids.contains(tech_id),
            "module '{}' required_research '{}' is not a known tech id",
            def.id,
            tech_id,
        );
        assert!(
            content
                .techs
                .iter()
                .any(|tech| tech.unlocks.iter().any(|unlock| *unlock == def.id.0)),
            "module '{}' requires research but no tech unlocks it",
            def.id,
        );
    }
    assert!(
        def.energy_consumption.base <= def.energy_consumption.max,
        "module '{}' energy_consumption base exceeds max",
        def.id,
    );
    assert!(
        def.durability > 0.0,
        "module '{}' has non-positive durability",
        def.id
    );
    if matches!(def.category, ModuleCategory::Engine | ModuleCategory::Warp) {
        assert!(
            def.speed > 0.0,
            "module '{}' is a drive with non-positive speed {}",
            def.id,
            def.speed,
        );
    }

    // Upgrade chains: one definition per (category, tier), no gaps.
    let same_tier = content
        .modules
        .iter()
        .filter(|other| other.category == def.category && other.tier == def.tier)
        .count();
    assert_eq!(
        same_tier, 1,
        "module '{}' shares {:?} tier {} with another definition",
        def.id, def.category, def.tier,
    );
    if def.tier > 0 {
        assert!(
            content
                .modules
                .iter()
                .any(|other| other.category == def.category && other.tier + 1 == def.tier),
            "module '{}' is {:?} tier {} with no tier {} below it",
            def.id,
            def.category,
            def.tier,
            def.tier - 1,
        );
    }
}

fn validate_tech(
    tech: &TechDef,
    resource_ids: &HashSet<&str>,
    module_ids: &HashSet<&ModuleId>,
    tech_ids: &HashSet<&TechId>,
) {
    for prereq in &tech.prereqs {
        assert!(
            tech_ids.contains(prereq),
            "tech '{}' prereq '{}' is not a known tech id",
            tech.id,
            prereq,
        );
    }
    for resource in tech.cost.required_resources.keys() {
        assert!(
            resource_ids.contains(resource.as_str()),
            "tech '{}' cost references '{}' which is not a known resource",
            tech.id,
            resource,
        );
    }
    for unlock in &tech.unlocks {
        assert!(
            module_ids.contains(&ModuleId(unlock.clone())),
            "tech '{}' unlocks '{}' which is not a known module",
            tech.id,
            unlock,
        );
    }
    assert!(
        tech.cost.time_required >= 0.0 && tech.cost.research_points >= 0.0,
        "tech '{}' has a negative cost",
        tech.id,
    );
}

fn validate_loadout(
    loadout: &Loadout,
    resource_ids: &HashSet<&str>,
    module_ids: &HashSet<&ModuleId>,
) {
    for module_id in &loadout.modules {
        assert!(
            module_ids.contains(module_id),
            "loadout module '{module_id}' is not a known module",
        );
    }
    for module_id in &loadout.active_modules {
        assert!(
            loadout.modules.contains(module_id),
            "loadout active module '{module_id}' is not in the loadout",
        );
    }
    for resource in loadout.inventory.keys() {
        assert!(
            resource_ids.contains(resource.as_str()),
            "loadout inventory '{resource}' is not a known resource",
        );
    }
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = read_json(dir, "constants.json")?;
    let techs_file: TechsFile = read_json(dir, "techs.json")?;
    let modules: Vec<ModuleDef> = read_json(dir, "modules.json")?;
    let resources: Vec<ResourceDef> = read_json(dir, "resources.json")?;
    let generation: GenerationTables = read_json(dir, "generation.json")?;
    let loadout: Loadout = read_json(dir, "loadout.json")?;
    let mut content = GameContent {
        content_version: techs_file.content_version,
        modules,
        techs: techs_file.techs,
        resources,
        generation,
        loadout,
        constants,
        index: ContentIndex::default(),
    };
    content.reindex();
    validate_content(&content);
    Ok(content)
}

/// Reads `stars.json`. Unlike content tables, a bad catalog is an error, not a panic.
pub fn load_stars(content_dir: &str) -> Result<StarCatalog> {
    let catalog: StarCatalog = read_json(Path::new(content_dir), "stars.json")?;
    let mut seen = HashSet::new();
    for star in &catalog.stars {
        ensure!(seen.insert(&star.id), "stars.json: duplicate star id '{}'", star.id);
        ensure!(
            star.spectral_letter().is_some(),
            "stars.json: star '{}' has unrecognised spectral class '{}'",
            star.id,
            star.spectral_class
        );
    }
    ensure!(
        catalog.home_star().is_some(),
        "stars.json: home star '{}' is not in the catalog",
        catalog.home
    );
    Ok(catalog)
}

/// A freshly fitted ship docked at `home`.
pub fn build_initial_state(
    content: &GameContent,
    seed: u64,
    home: &StarProfile,
    now: Timestamp,
) -> ShipState {
    ShipState::from_loadout(
        content,
        seed,
        ShipLocation {
            current_star_id: Some(home.id.clone()),
            position: home.position,
        },
        now,
    )
}
