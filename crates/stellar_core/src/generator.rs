//! Procedural resource allocation: star physics in, harvestable resources out.
//!
//! `generate` is pure given the star, the content tables, and the world seed.
//! Draws come from an RNG keyed by star id, so the same star always yields the
//! same allocation.

use std::collections::BTreeMap;

use rand::Rng;
use smallvec::SmallVec;

use crate::spectral::{LuminosityClass, SpectralClass};
use crate::{
    ExtractionDifficulty, GameContent, GenerationTables, Rarity, ResourceDef, StarProfile,
    StellarResourceAllocation,
};

/// Resource used whenever nothing else can be allocated.
pub const FALLBACK_RESOURCE: &str = "hydrogen";
const FALLBACK_YIELD: f64 = 5.0;
const FALLBACK_RENEWAL_RATE: u32 = 70;

const PRIMARY_MIN: usize = 2;
const PRIMARY_MAX: usize = 4;
/// Rare trials run at this fraction of the computed probability.
const RARE_TRIAL_FACTOR: f64 = 0.3;
const PRIMARY_YIELD_FACTOR: f64 = 1.5;
const RARE_YIELD_FACTOR: f64 = 0.6;
const MIN_YIELD: f64 = 0.1;

const TEMPERATURE_PROXIMITY_WEIGHT: f64 = 0.3;
const MASS_PROXIMITY_WEIGHT: f64 = 0.2;
const LUMINOSITY_PROXIMITY_WEIGHT: f64 = 0.1;
const MIN_PROXIMITY_FACTOR: f64 = 0.1;

const HOT_STAR_K: f64 = 30_000.0;
const COOL_STAR_K: f64 = 3_000.0;

/// Allocation for a star, seeded by `world_seed` and the star id.
pub fn generate(
    star: &StarProfile,
    content: &GameContent,
    world_seed: u64,
) -> StellarResourceAllocation {
    let mut rng = crate::star_rng(world_seed, &star.id);
    generate_with_rng(star, content, &mut rng)
}

/// The minimal allocation used when no definition matches a star.
pub fn fallback_allocation() -> StellarResourceAllocation {
    StellarResourceAllocation {
        primary_resources: BTreeMap::from([(FALLBACK_RESOURCE.to_string(), FALLBACK_YIELD)]),
        rare_resources: BTreeMap::new(),
        extraction_difficulty: ExtractionDifficulty::Medium,
        renewal_rate: FALLBACK_RENEWAL_RATE,
        special_conditions: SmallVec::new(),
        max_extractions_per_hour: ExtractionDifficulty::Medium.max_extractions_per_hour(),
    }
}

/// Allocation using a caller-supplied RNG.
pub fn generate_with_rng(
    star: &StarProfile,
    content: &GameContent,
    rng: &mut impl Rng,
) -> StellarResourceAllocation {
    let Some(class) = star.spectral_letter() else {
        return fallback_allocation();
    };
    let tables = &content.generation;

    // Candidates sorted by probability, highest first; ties broken by id.
    let mut candidates: Vec<(&ResourceDef, f64)> = content
        .resources
        .iter()
        .filter(|def| is_compatible(def, star, class))
        .map(|def| (def, selection_probability(def, star, class, tables)))
        .collect();
    if candidates.is_empty() {
        return fallback_allocation();
    }
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));

    let target = rng.gen_range(PRIMARY_MIN..=PRIMARY_MAX);
    let mut primary: Vec<&ResourceDef> = Vec::new();
    for (def, probability) in &candidates {
        if primary.len() >= target {
            break;
        }
        let roll: f64 = rng.gen_range(0.0..100.0);
        if roll < *probability {
            primary.push(def);
        }
    }

    let mut rare: Vec<&ResourceDef> = Vec::new();
    for (def, probability) in &candidates {
        if def.rarity <= Rarity::Uncommon || primary.iter().any(|p| p.id == def.id) {
            continue;
        }
        let roll: f64 = rng.gen_range(0.0..100.0);
        if roll < probability * RARE_TRIAL_FACTOR {
            rare.push(def);
        }
    }

    let mut primary_resources: BTreeMap<String, f64> = primary
        .iter()
        .map(|def| (def.id.clone(), hourly_yield(def, star, class, tables, true)))
        .collect();
    if primary_resources.is_empty() {
        primary_resources.insert(FALLBACK_RESOURCE.to_string(), FALLBACK_YIELD);
    }
    let rare_resources: BTreeMap<String, f64> = rare
        .iter()
        .map(|def| (def.id.clone(), hourly_yield(def, star, class, tables, false)))
        .collect();

    let luminosity_class = star.luminosity_class();
    let extraction_difficulty = difficulty_for_score(difficulty_score(star, luminosity_class));
    StellarResourceAllocation {
        primary_resources,
        rare_resources,
        extraction_difficulty,
        renewal_rate: renewal_rate(star, luminosity_class),
        special_conditions: special_conditions(
            star,
            class,
            luminosity_class,
            extraction_difficulty,
        ),
        max_extractions_per_hour: extraction_difficulty.max_extractions_per_hour(),
    }
}

fn in_range(value: f64, (low, high): (f64, f64)) -> bool {
    value >= low && value <= high
}

fn is_compatible(def: &ResourceDef, star: &StarProfile, class: SpectralClass) -> bool {
    def.spectral_classes.contains(&class)
        && in_range(star.temperature_k, def.temperature_range)
        && in_range(star.mass, def.mass_range)
        && in_range(star.luminosity, def.luminosity_range)
        && (!def.variable_only || star.is_variable())
}

/// Normalised distance from the midpoint of `range`: 0 at the centre, 1 at
/// either edge.
fn midpoint_offset(value: f64, (low, high): (f64, f64)) -> f64 {
    let half_width = (high - low) / 2.0;
    if half_width <= 0.0 {
        return 0.0;
    }
    ((value - (low + half_width)).abs() / half_width).min(1.0)
}

fn proximity_factor(def: &ResourceDef, star: &StarProfile) -> f64 {
    let penalty = TEMPERATURE_PROXIMITY_WEIGHT
        * midpoint_offset(star.temperature_k, def.temperature_range)
        + MASS_PROXIMITY_WEIGHT * midpoint_offset(star.mass, def.mass_range)
        + LUMINOSITY_PROXIMITY_WEIGHT * midpoint_offset(star.luminosity, def.luminosity_range);
    (1.0 - penalty).max(MIN_PROXIMITY_FACTOR)
}

/// Percent chance, 0..=100, that a single trial selects `def`.
pub(crate) fn selection_probability(
    def: &ResourceDef,
    star: &StarProfile,
    class: SpectralClass,
    tables: &GenerationTables,
) -> f64 {
    let probability = def.base_probability
        * tables.rarity_weight(def.rarity)
        * tables.spectral_bonus(class, def.category)
        * proximity_factor(def, star);
    probability.clamp(0.0, 100.0)
}

fn mass_factor(mass: f64) -> f64 {
    if mass > 10.0 {
        1.3
    } else if mass > 5.0 {
        1.1
    } else if mass < 0.5 {
        0.7
    } else {
        1.0
    }
}

fn hourly_yield(
    def: &ResourceDef,
    star: &StarProfile,
    class: SpectralClass,
    tables: &GenerationTables,
    primary: bool,
) -> f64 {
    let role_factor = if primary {
        PRIMARY_YIELD_FACTOR
    } else {
        RARE_YIELD_FACTOR
    };
    let raw = def.max_yield_per_hour
        * role_factor
        * tables.spectral_bonus(class, def.category)
        * mass_factor(star.mass);
    ((raw * 10.0).round() / 10.0).max(MIN_YIELD)
}

fn temperature_score(temperature_k: f64) -> u32 {
    if temperature_k > HOT_STAR_K {
        3
    } else if temperature_k > 15_000.0 {
        2
    } else if temperature_k > 8_000.0 || temperature_k < COOL_STAR_K {
        1
    } else {
        0
    }
}

fn mass_score(mass: f64) -> u32 {
    if mass > 40.0 {
        3
    } else if mass > 15.0 {
        2
    } else if mass > 5.0 {
        1
    } else {
        0
    }
}

fn luminosity_score(luminosity: f64) -> u32 {
    if luminosity > 100_000.0 {
        3
    } else if luminosity > 10_000.0 {
        2
    } else if luminosity > 1_000.0 {
        1
    } else {
        0
    }
}

/// Additive difficulty score over temperature, mass, luminosity, luminosity
/// class, and variability.
pub(crate) fn difficulty_score(star: &StarProfile, luminosity_class: LuminosityClass) -> u32 {
    let class_bonus = match luminosity_class {
        LuminosityClass::Supergiant => 2,
        LuminosityClass::Giant | LuminosityClass::BrightGiant => 1,
        LuminosityClass::Subgiant
        | LuminosityClass::MainSequence
        | LuminosityClass::WhiteDwarf => 0,
    };
    let variable_bonus = if star.is_variable() { 2 } else { 0 };
    temperature_score(star.temperature_k)
        + mass_score(star.mass)
        + luminosity_score(star.luminosity)
        + class_bonus
        + variable_bonus
}

pub(crate) fn difficulty_for_score(score: u32) -> ExtractionDifficulty {
    if score >= 8 {
        ExtractionDifficulty::Extreme
    } else if score >= 5 {
        ExtractionDifficulty::Hard
    } else if score >= 3 {
        ExtractionDifficulty::Medium
    } else {
        ExtractionDifficulty::Easy
    }
}

/// Percent of yield restored between extraction windows, 40..=100.
pub(crate) fn renewal_rate(star: &StarProfile, luminosity_class: LuminosityClass) -> u32 {
    let mut rate: i32 = 80;
    match luminosity_class {
        LuminosityClass::MainSequence => rate += 10,
        LuminosityClass::Supergiant => rate -= 20,
        LuminosityClass::Giant | LuminosityClass::BrightGiant => rate -= 10,
        LuminosityClass::Subgiant | LuminosityClass::WhiteDwarf => {}
    }
    if star.is_variable() {
        rate -= 15;
    }
    if star.temperature_k > HOT_STAR_K || star.temperature_k < COOL_STAR_K {
        rate -= 10;
    }
    if star.mass > 50.0 {
        rate -= 15;
    }
    rate.clamp(40, 100).unsigned_abs()
}

struct StarTraits {
    temperature_k: f64,
    class: SpectralClass,
    luminosity_class: LuminosityClass,
    variable: bool,
    difficulty: ExtractionDifficulty,
}

struct ConditionRule {
    label: &'static str,
    applies: fn(&StarTraits) -> bool,
}

/// Evaluated in order; a label appears once even if several rules match.
const CONDITION_RULES: &[ConditionRule] = &[
    ConditionRule {
        label: "Intense radiation field",
        applies: |t| t.temperature_k > HOT_STAR_K,
    },
    ConditionRule {
        label: "High-energy particle streams",
        applies: |t| t.temperature_k > 10_000.0,
    },
    ConditionRule {
        label: "Low-energy extraction window",
        applies: |t| t.temperature_k < 3_500.0,
    },
    ConditionRule {
        label: "Massive stellar wind",
        applies: |t| t.luminosity_class == LuminosityClass::Supergiant,
    },
    ConditionRule {
        label: "Extended tenuous atmosphere",
        applies: |t| t.luminosity_class.is_giant(),
    },
    ConditionRule {
        label: "Degenerate matter surface",
        applies: |t| t.luminosity_class == LuminosityClass::WhiteDwarf,
    },
    ConditionRule {
        label: "Periodic output fluctuation",
        applies: |t| t.variable,
    },
    ConditionRule {
        label: "Reinforced extraction equipment required",
        applies: |t| t.difficulty == ExtractionDifficulty::Extreme,
    },
    ConditionRule {
        label: "Heat shielding recommended",
        applies: |t| t.difficulty >= ExtractionDifficulty::Hard,
    },
    ConditionRule {
        label: "Intense radiation field",
        applies: |t| t.class == SpectralClass::O,
    },
    ConditionRule {
        label: "Frequent stellar flares",
        applies: |t| t.class == SpectralClass::M,
    },
];

pub(crate) fn special_conditions(
    star: &StarProfile,
    class: SpectralClass,
    luminosity_class: LuminosityClass,
    difficulty: ExtractionDifficulty,
) -> SmallVec<[String; 4]> {
    let traits = StarTraits {
        temperature_k: star.temperature_k,
        class,
        luminosity_class,
        variable: star.is_variable(),
        difficulty,
    };
    let mut conditions: SmallVec<[String; 4]> = SmallVec::new();
    for rule in CONDITION_RULES {
        if (rule.applies)(&traits) && !conditions.iter().any(|c| c == rule.label) {
            conditions.push(rule.label.to_string());
        }
    }
    conditions
}
