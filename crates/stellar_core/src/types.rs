//! Type definitions for `stellar_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the simulation.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::spectral::{LuminosityClass, SpectralClass};

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// Wall-clock milliseconds. All persisted progress is stored as absolute
/// timestamps, never as countdowns.
pub type Timestamp = u64;
pub type ResourceId = String;
pub type ResourceAmounts = HashMap<ResourceId, f64>;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(StarId);
string_id!(ModuleId);
string_id!(TechId);
string_id!(EventId);

// ---------------------------------------------------------------------------
// Stars
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Physical description of a star, produced by the external star catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarProfile {
    pub id: StarId,
    #[serde(default)]
    pub name: String,
    /// Full spectral designation, e.g. `G2V` or `B1Ia`.
    pub spectral_class: String,
    pub temperature_k: f64,
    /// Solar masses.
    pub mass: f64,
    /// Solar radii.
    pub radius: f64,
    /// Solar luminosities.
    pub luminosity: f64,
    #[serde(default)]
    pub variable_type: Option<String>,
    pub position: Position,
}

impl StarProfile {
    pub fn spectral_letter(&self) -> Option<SpectralClass> {
        SpectralClass::parse(&self.spectral_class)
    }

    /// Luminosity class from the designation suffix, inferred from radius when
    /// the designation carries none.
    pub fn luminosity_class(&self) -> LuminosityClass {
        LuminosityClass::parse(&self.spectral_class)
            .unwrap_or_else(|| LuminosityClass::infer_from_radius(self.radius))
    }

    pub fn is_variable(&self) -> bool {
        self.variable_type.is_some()
    }
}

// ---------------------------------------------------------------------------
// Resource generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Gas,
    Metal,
    Crystal,
    Plasma,
    Exotic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    pub id: ResourceId,
    pub name: String,
    pub category: ResourceCategory,
    pub rarity: Rarity,
    pub spectral_classes: Vec<SpectralClass>,
    pub temperature_range: (f64, f64),
    pub mass_range: (f64, f64),
    pub luminosity_range: (f64, f64),
    #[serde(default)]
    pub variable_only: bool,
    /// Percent, 0..=100.
    pub base_probability: f64,
    pub base_value: f64,
    pub max_yield_per_hour: f64,
    /// Special inventory slot this resource is stored in, if any.
    #[serde(default)]
    pub storage_slot: Option<String>,
}

/// Weight tables applied on top of each definition's base probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationTables {
    pub rarity_weights: HashMap<Rarity, f64>,
    /// Missing entries default to 1.0.
    pub spectral_bonus: HashMap<SpectralClass, HashMap<ResourceCategory, f64>>,
}

impl GenerationTables {
    pub fn rarity_weight(&self, rarity: Rarity) -> f64 {
        self.rarity_weights.get(&rarity).copied().unwrap_or(1.0)
    }

    pub fn spectral_bonus(&self, class: SpectralClass, category: ResourceCategory) -> f64 {
        self.spectral_bonus
            .get(&class)
            .and_then(|by_category| by_category.get(&category))
            .copied()
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionDifficulty {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl ExtractionDifficulty {
    pub fn max_extractions_per_hour(self) -> u32 {
        match self {
            ExtractionDifficulty::Easy => 6,
            ExtractionDifficulty::Medium => 4,
            ExtractionDifficulty::Hard => 3,
            ExtractionDifficulty::Extreme => 2,
        }
    }
}

/// A star's derived harvestable-resource profile. Cached per star id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StellarResourceAllocation {
    /// Never empty.
    pub primary_resources: BTreeMap<ResourceId, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rare_resources: BTreeMap<ResourceId, f64>,
    pub extraction_difficulty: ExtractionDifficulty,
    /// Percent, 40..=100.
    pub renewal_rate: u32,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub special_conditions: SmallVec<[String; 4]>,
    pub max_extractions_per_hour: u32,
}

impl StellarResourceAllocation {
    /// Hourly yield of `resource` from either the primary or rare table.
    pub fn yield_of(&self, resource: &str) -> Option<f64> {
        self.primary_resources
            .get(resource)
            .or_else(|| self.rare_resources.get(resource))
            .copied()
    }
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleCategory {
    Power,
    Storage,
    Engine,
    Warp,
    Cargo,
    Research,
    Extraction,
    Shield,
    Sensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyRange {
    pub base: f64,
    pub max: f64,
}

impl EnergyRange {
    /// Consumption at the given allocation percent.
    pub fn at(&self, allocation_pct: f64) -> f64 {
        self.base + (self.max - self.base) * allocation_pct.clamp(0.0, 100.0) / 100.0
    }

    pub fn is_adjustable(&self) -> bool {
        (self.max - self.base).abs() > f64::EPSILON
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDef {
    pub id: ModuleId,
    pub name: String,
    pub tier: u32,
    pub category: ModuleCategory,
    #[serde(default)]
    pub energy_consumption: EnergyRange,
    #[serde(default)]
    pub energy_generation: f64,
    #[serde(default)]
    pub energy_storage: f64,
    #[serde(default)]
    pub cargo_capacity: f64,
    /// Travel speed in distance units per second (engine and warp modules).
    #[serde(default)]
    pub speed: f64,
    /// Research points per second while active.
    #[serde(default)]
    pub research_output: f64,
    #[serde(default)]
    pub required_resources: ResourceAmounts,
    #[serde(default)]
    pub required_research: Option<TechId>,
    pub durability: f64,
    #[serde(default)]
    pub upgrade_effects: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleStatus {
    Normal,
    Damaged,
    Disabled,
    Upgrading,
    Repairing,
    EnergyShortage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeProgress {
    pub target: ModuleId,
    pub started_at: Timestamp,
    pub completes_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledModule {
    /// References a `ModuleDef`.
    pub id: ModuleId,
    pub current_durability: f64,
    pub is_active: bool,
    /// Percent, 0..=100.
    pub energy_allocation: f64,
    pub status: ModuleStatus,
    pub upgrade: Option<UpgradeProgress>,
    /// `REPAIRING` is shown until this instant.
    pub repairing_until: Option<Timestamp>,
    /// Set by the energy budget when this module's share cannot be served.
    pub energy_starved: bool,
}

// ---------------------------------------------------------------------------
// Research
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchCost {
    pub research_points: f64,
    #[serde(default)]
    pub required_resources: ResourceAmounts,
    /// Seconds.
    pub time_required: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechDef {
    pub id: TechId,
    pub name: String,
    pub tier: u32,
    pub category: String,
    pub cost: ResearchCost,
    /// All must be completed.
    #[serde(default)]
    pub prereqs: Vec<TechId>,
    /// Module ids made available on completion.
    #[serde(default)]
    pub unlocks: Vec<String>,
    #[serde(default)]
    pub effects: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TechStatus {
    Locked,
    Available,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchProgress {
    pub tech_id: TechId,
    pub current_points: f64,
    pub total_points: f64,
    pub start_time: Timestamp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchState {
    /// Completion order is preserved.
    pub completed: Vec<TechId>,
    /// Spendable research-point balance.
    pub points: f64,
    pub active: Option<ResearchProgress>,
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Normal,
    Warp,
}

impl TravelMode {
    pub fn required_category(self) -> ModuleCategory {
        match self {
            TravelMode::Normal => ModuleCategory::Engine,
            TravelMode::Warp => ModuleCategory::Warp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    pub mode: TravelMode,
    pub target_star_id: StarId,
    pub target_position: Position,
    /// Percent, 0..=100.
    pub travel_progress: f64,
    /// Distance units per second.
    pub travel_speed: f64,
    pub module_id: ModuleId,
    pub started_at: Timestamp,
    pub estimated_completion: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipLocation {
    pub current_star_id: Option<StarId>,
    pub position: Position,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveExtraction {
    pub resource_type: ResourceId,
    /// Percent, 0..=100.
    pub progress: f64,
    pub expected_yield: f64,
    pub started_at: Timestamp,
    pub completes_at: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionHistory {
    pub total_extractions: u64,
    pub extractions_this_hour: u32,
    pub last_extraction: Option<Timestamp>,
    pub window_started_at: Timestamp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionState {
    /// At most one per star.
    pub active: BTreeMap<StarId, ActiveExtraction>,
    pub history: BTreeMap<StarId, ExtractionHistory>,
}

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

/// Unordered pair, stored with `from <= to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarConnection {
    pub from: StarId,
    pub to: StarId,
    pub distance: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectivityState {
    pub origin: Option<StarId>,
    pub edges: Vec<StarConnection>,
    /// Set when a recompute around this star has been requested but not yet run.
    pub pending_origin: Option<StarId>,
    pub computed_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Ledger state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyState {
    pub total_generation: f64,
    pub total_consumption: f64,
    pub current_stored: f64,
    pub total_storage: f64,
    /// Signed percent; negative when consumption exceeds generation.
    pub distribution_efficiency: f64,
    /// Consumption shed because neither generation nor storage could serve it.
    pub unmet_demand: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotUsage {
    pub used: f64,
    pub capacity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceInventory {
    pub items: ResourceAmounts,
    pub current_capacity: f64,
    pub max_capacity: f64,
    pub special_slots: BTreeMap<String, SlotUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    pub seed: u64,
    pub last_tick_at: Timestamp,
    pub schema_version: u32,
    pub content_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
}

/// The whole simulation aggregate for one ship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipState {
    pub meta: MetaState,
    pub location: ShipLocation,
    pub energy: EnergyState,
    pub inventory: ResourceInventory,
    pub modules: BTreeMap<ModuleId, InstalledModule>,
    pub research: ResearchState,
    pub navigation: Option<NavigationState>,
    pub extraction: ExtractionState,
    /// Generated allocations, keyed by star id.
    pub allocations: HashMap<StarId, StellarResourceAllocation>,
    pub connectivity: ConnectivityState,
    pub counters: Counters,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    InstallModule {
        module_id: ModuleId,
    },
    ToggleModuleActive {
        module_id: ModuleId,
    },
    UpdateModuleEnergyAllocation {
        module_id: ModuleId,
        percent: f64,
    },
    RepairModule {
        module_id: ModuleId,
        amount: f64,
    },
    DamageModule {
        module_id: ModuleId,
        amount: f64,
    },
    StartModuleUpgrade {
        module_id: ModuleId,
    },
    StartResearch {
        tech_id: TechId,
    },
    CancelResearch,
    NavigateToStar {
        star: StarProfile,
        mode: TravelMode,
    },
    CancelNavigation,
    StartExtraction {
        star: StarProfile,
        resource: ResourceId,
    },
    CancelExtraction {
        star_id: StarId,
    },
    RecomputeConnections {
        stars: Vec<StarProfile>,
        origin: StarId,
    },
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub at: Timestamp,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ModuleInstalled {
        module_id: ModuleId,
    },
    ModuleToggled {
        module_id: ModuleId,
        active: bool,
    },
    EnergyAllocationChanged {
        module_id: ModuleId,
        percent: f64,
    },
    ModuleRepaired {
        module_id: ModuleId,
        durability_before: f64,
        durability_after: f64,
    },
    ModuleDamaged {
        module_id: ModuleId,
        durability_after: f64,
    },
    UpgradeStarted {
        module_id: ModuleId,
        target: ModuleId,
        completes_at: Timestamp,
    },
    UpgradeCompleted {
        from: ModuleId,
        to: ModuleId,
    },
    EnergyShortage {
        starved_modules: Vec<ModuleId>,
        unmet_demand: f64,
    },
    ResearchStarted {
        tech_id: TechId,
        total_points: f64,
    },
    ResearchCompleted {
        tech_id: TechId,
        unlocks: Vec<String>,
    },
    ResearchCancelled {
        tech_id: TechId,
    },
    NavigationStarted {
        target_star_id: StarId,
        mode: TravelMode,
        estimated_completion: Timestamp,
    },
    NavigationCompleted {
        star_id: StarId,
    },
    NavigationCancelled {
        target_star_id: StarId,
    },
    AllocationGenerated {
        star_id: StarId,
    },
    ExtractionStarted {
        star_id: StarId,
        resource: ResourceId,
        expected_yield: f64,
        completes_at: Timestamp,
    },
    ExtractionCompleted {
        star_id: StarId,
        resource: ResourceId,
        /// Amount actually stored, bounded by free capacity.
        stored: f64,
    },
    ExtractionCancelled {
        star_id: StarId,
    },
    ConnectivityRecomputeRequested {
        origin: StarId,
    },
    ConnectionsComputed {
        origin: StarId,
        edge_count: usize,
    },
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub modules: Vec<ModuleDef>,
    pub techs: Vec<TechDef>,
    pub resources: Vec<ResourceDef>,
    pub generation: GenerationTables,
    pub loadout: Loadout,
    pub constants: Constants,
    /// Rebuilt by `reindex`; never serialized.
    #[serde(skip)]
    pub index: ContentIndex,
}

/// Table positions keyed by id. A stale or missing entry falls back to a scan,
/// so edits to the tables after `reindex` never return the wrong definition.
#[derive(Debug, Clone, Default)]
pub struct ContentIndex {
    modules: HashMap<ModuleId, usize>,
    techs: HashMap<TechId, usize>,
    resources: HashMap<ResourceId, usize>,
}

fn lookup<'a, T>(
    table: &'a [T],
    hint: Option<&usize>,
    matches: impl Fn(&T) -> bool,
) -> Option<&'a T> {
    hint.and_then(|&position| table.get(position))
        .filter(|item| matches(item))
        .or_else(|| table.iter().find(|item| matches(item)))
}

impl GameContent {
    /// Rebuilds the id index. Call after loading or editing the tables.
    pub fn reindex(&mut self) {
        self.index = ContentIndex {
            modules: self
                .modules
                .iter()
                .enumerate()
                .map(|(position, def)| (def.id.clone(), position))
                .collect(),
            techs: self
                .techs
                .iter()
                .enumerate()
                .map(|(position, tech)| (tech.id.clone(), position))
                .collect(),
            resources: self
                .resources
                .iter()
                .enumerate()
                .map(|(position, def)| (def.id.clone(), position))
                .collect(),
        };
    }

    pub fn module_def(&self, id: &ModuleId) -> Option<&ModuleDef> {
        lookup(&self.modules, self.index.modules.get(id), |def| &def.id == id)
    }

    pub fn tech(&self, id: &TechId) -> Option<&TechDef> {
        lookup(&self.techs, self.index.techs.get(id), |tech| &tech.id == id)
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceDef> {
        lookup(&self.resources, self.index.resources.get(id), |def| def.id == id)
    }

    /// The next definition in the same category's tier chain.
    pub fn next_tier(&self, def: &ModuleDef) -> Option<&ModuleDef> {
        self.modules
            .iter()
            .find(|candidate| candidate.category == def.category && candidate.tier == def.tier + 1)
    }
}

/// Starting equipment and stock for a freshly built ship.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Loadout {
    pub modules: Vec<ModuleId>,
    /// Modules from `modules` that start active.
    #[serde(default)]
    pub active_modules: Vec<ModuleId>,
    #[serde(default)]
    pub inventory: ResourceAmounts,
    #[serde(default)]
    pub special_slots: BTreeMap<String, f64>,
    pub energy: f64,
    #[serde(default)]
    pub research_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    /// Passive research-point accrual.
    pub research_points_per_second: f64,
    /// Scales every tech's `points / time_required` progress rate.
    pub research_speed_multiplier: f64,
    pub warp_speed_multiplier: f64,
    pub min_travel_ms: u64,
    pub normal_nav_min_energy: f64,
    pub warp_nav_min_energy: f64,
    pub base_extraction_ms: u64,
    pub extraction_difficulty_multipliers: HashMap<ExtractionDifficulty, f64>,
    pub extraction_window_ms: u64,
    pub connection_threshold: f64,
    pub connection_batch_size: usize,
    pub upgrade_duration_ms: u64,
    pub repair_status_ms: u64,
    pub base_energy_storage: f64,
    pub base_cargo_capacity: f64,
    pub durability_band_degraded_threshold: f64,
    pub durability_band_critical_threshold: f64,
    pub durability_band_degraded_efficiency: f64,
    pub durability_band_critical_efficiency: f64,
    /// Once modules are shed, they stay shed until storage can carry the full
    /// deficit for this many seconds.
    pub shortage_recovery_secs: f64,
}

impl Constants {
    pub fn nav_min_energy(&self, mode: TravelMode) -> f64 {
        match mode {
            TravelMode::Normal => self.normal_nav_min_energy,
            TravelMode::Warp => self.warp_nav_min_energy,
        }
    }

    pub fn extraction_duration_ms(&self, difficulty: ExtractionDifficulty) -> u64 {
        let multiplier = self
            .extraction_difficulty_multipliers
            .get(&difficulty)
            .copied()
            .unwrap_or(1.0);
        crate::ms_from_f64(self.base_extraction_ms as f64 * multiplier)
    }
}
