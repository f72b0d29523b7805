//! Energy & module ledger: inventory, installed modules, and the derived
//! energy budget. Every other subsystem reads and mutates ship resources
//! through here.

use std::collections::{BTreeMap, HashMap};

use crate::{
    CommandError, ConnectivityState, Counters, EnergyState, Event, EventEnvelope,
    ExtractionState, GameContent, InstalledModule, MetaState, ModuleCategory, ModuleDef,
    ModuleId, ModuleStatus, ResearchState, ResourceAmounts, ResourceInventory, ShipLocation,
    ShipState, SlotUsage, StarProfile, StellarResourceAllocation, Timestamp, UpgradeProgress,
};

/// Quantities below this are treated as empty.
const MIN_MEANINGFUL_AMOUNT: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

impl ResourceInventory {
    pub fn quantity(&self, resource: &str) -> f64 {
        self.items.get(resource).copied().unwrap_or(0.0)
    }

    /// Fails on the first (by name) resource that falls short.
    pub fn check_available(&self, required: &ResourceAmounts) -> Result<(), CommandError> {
        let mut names: Vec<&String> = required.keys().collect();
        names.sort();
        for name in names {
            let needed = required[name];
            let available = self.quantity(name);
            if available < needed {
                return Err(CommandError::InsufficientResources {
                    resource: name.clone(),
                    required: needed,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Removes `required` in full. Callers validate with `check_available` first.
    pub(crate) fn deduct(&mut self, required: &ResourceAmounts, content: &GameContent) {
        for (name, amount) in required {
            if let Some(held) = self.items.get_mut(name) {
                *held = (*held - amount).max(0.0);
            }
        }
        self.refresh_usage(content);
    }

    /// Free space for `resource`, in its special slot if it has one.
    pub fn free_space(&self, resource: &str, content: &GameContent) -> f64 {
        match self.slot_of(resource, content) {
            Some(slot) => self
                .special_slots
                .get(slot)
                .map_or(0.0, |usage| (usage.capacity - usage.used).max(0.0)),
            None => (self.max_capacity - self.current_capacity).max(0.0),
        }
    }

    /// Stores up to `amount`, bounded by free space. Returns the amount stored.
    pub fn add(&mut self, resource: &str, amount: f64, content: &GameContent) -> f64 {
        let stored = amount.min(self.free_space(resource, content)).max(0.0);
        if stored > MIN_MEANINGFUL_AMOUNT {
            *self.items.entry(resource.to_string()).or_insert(0.0) += stored;
            self.refresh_usage(content);
        }
        stored
    }

    fn slot_of<'a>(&self, resource: &str, content: &'a GameContent) -> Option<&'a str> {
        content
            .resource(resource)
            .and_then(|def| def.storage_slot.as_deref())
            .filter(|slot| self.special_slots.contains_key(*slot))
    }

    /// Recomputes `current_capacity` and slot usage from the item map.
    pub(crate) fn refresh_usage(&mut self, content: &GameContent) {
        let mut general = 0.0;
        let mut slot_used: BTreeMap<&str, f64> = BTreeMap::new();
        for (name, quantity) in &self.items {
            match self.slot_of(name, content) {
                Some(slot) => *slot_used.entry(slot).or_insert(0.0) += quantity,
                None => general += quantity,
            }
        }
        let slot_used: Vec<(String, f64)> = slot_used
            .into_iter()
            .map(|(slot, used)| (slot.to_string(), used))
            .collect();
        self.current_capacity = general;
        for usage in self.special_slots.values_mut() {
            usage.used = 0.0;
        }
        for (slot, used) in slot_used {
            if let Some(usage) = self.special_slots.get_mut(&slot) {
                usage.used = used;
            }
        }
    }

    pub fn slot_usage(&self, slot: &str) -> Option<SlotUsage> {
        self.special_slots.get(slot).copied()
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

pub(crate) fn installed_def<'a>(
    state: &ShipState,
    module_id: &ModuleId,
    content: &'a GameContent,
) -> Result<&'a ModuleDef, CommandError> {
    if !state.modules.contains_key(module_id) {
        return Err(CommandError::not_found("installed module", module_id));
    }
    content
        .module_def(module_id)
        .ok_or_else(|| CommandError::not_found("module definition", module_id))
}

/// True if `def` is base equipment or some completed tech unlocks it.
pub fn is_module_unlocked(state: &ShipState, def: &ModuleDef, content: &GameContent) -> bool {
    if def.tier == 0 && def.required_research.is_none() {
        return true;
    }
    state
        .research
        .completed
        .iter()
        .filter_map(|tech_id| content.tech(tech_id))
        .any(|tech| tech.unlocks.iter().any(|unlock| *unlock == def.id.0))
}

/// Research and unlock checks shared by install and upgrade.
fn check_module_prerequisites(
    state: &ShipState,
    def: &ModuleDef,
    content: &GameContent,
) -> Result<(), CommandError> {
    if let Some(tech_id) = &def.required_research {
        if !state.research.completed.contains(tech_id) {
            return Err(CommandError::MissingResearch {
                target: def.id.0.clone(),
                tech_id: tech_id.clone(),
            });
        }
    }
    if !is_module_unlocked(state, def, content) {
        return Err(CommandError::NotUnlocked(def.id.clone()));
    }
    Ok(())
}

/// Cached allocation for `star`, generating it on first use.
pub fn allocation_for<'a>(
    state: &'a mut ShipState,
    star: &StarProfile,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> &'a StellarResourceAllocation {
    if !state.allocations.contains_key(&star.id) {
        let allocation = crate::generate(star, content, state.meta.seed);
        state.allocations.insert(star.id.clone(), allocation);
        events.push(crate::emit(
            &mut state.counters,
            now,
            Event::AllocationGenerated {
                star_id: star.id.clone(),
            },
        ));
    }
    &state.allocations[&star.id]
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub(crate) fn install_module(
    state: &mut ShipState,
    module_id: &ModuleId,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    let def = content
        .module_def(module_id)
        .ok_or_else(|| CommandError::not_found("module definition", module_id))?;
    if state.modules.contains_key(module_id) {
        return Err(CommandError::conflict(format!("module {module_id}")));
    }
    check_module_prerequisites(state, def, content)?;
    state.inventory.check_available(&def.required_resources)?;

    state.inventory.deduct(&def.required_resources, content);
    state.modules.insert(module_id.clone(), InstalledModule::fresh(def));
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::ModuleInstalled {
            module_id: module_id.clone(),
        },
    ));
    Ok(())
}

impl InstalledModule {
    /// Fresh module: full durability, inactive, 0% allocation.
    pub fn fresh(def: &ModuleDef) -> Self {
        Self {
            id: def.id.clone(),
            current_durability: def.durability,
            is_active: false,
            energy_allocation: 0.0,
            status: ModuleStatus::Disabled,
            upgrade: None,
            repairing_until: None,
            energy_starved: false,
        }
    }
}

impl ShipState {
    /// A ship fitted from `content.loadout`, docked at `location`.
    ///
    /// Loadout entries without a definition are skipped. Derived energy and
    /// capacity figures are computed before returning.
    pub fn from_loadout(
        content: &GameContent,
        seed: u64,
        location: ShipLocation,
        now: Timestamp,
    ) -> Self {
        let loadout = &content.loadout;
        let mut modules = BTreeMap::new();
        for module_id in &loadout.modules {
            let Some(def) = content.module_def(module_id) else {
                continue;
            };
            let mut module = InstalledModule::fresh(def);
            if loadout.active_modules.contains(module_id) {
                module.is_active = true;
                module.energy_allocation = 100.0;
            }
            modules.insert(module_id.clone(), module);
        }
        let special_slots = loadout
            .special_slots
            .iter()
            .map(|(slot, capacity)| {
                (
                    slot.clone(),
                    SlotUsage {
                        used: 0.0,
                        capacity: *capacity,
                    },
                )
            })
            .collect();

        let mut state = ShipState {
            meta: MetaState {
                seed,
                last_tick_at: now,
                schema_version: 1,
                content_version: content.content_version.clone(),
            },
            location,
            energy: EnergyState {
                current_stored: loadout.energy,
                ..EnergyState::default()
            },
            inventory: ResourceInventory {
                items: loadout.inventory.clone(),
                special_slots,
                ..ResourceInventory::default()
            },
            modules,
            research: ResearchState {
                points: loadout.research_points,
                ..ResearchState::default()
            },
            navigation: None,
            extraction: ExtractionState::default(),
            allocations: HashMap::new(),
            connectivity: ConnectivityState::default(),
            counters: Counters::default(),
        };
        let mut discarded = Vec::new();
        recompute(&mut state, content, now, &mut discarded);
        state
    }
}

pub(crate) fn toggle_module_active(
    state: &mut ShipState,
    module_id: &ModuleId,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    installed_def(state, module_id, content)?;
    let Some(module) = state.modules.get_mut(module_id) else {
        return Err(CommandError::not_found("installed module", module_id));
    };
    module.is_active = !module.is_active;
    let active = module.is_active;
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::ModuleToggled {
            module_id: module_id.clone(),
            active,
        },
    ));
    Ok(())
}

pub(crate) fn update_energy_allocation(
    state: &mut ShipState,
    module_id: &ModuleId,
    percent: f64,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    let def = installed_def(state, module_id, content)?;
    if !def.energy_consumption.is_adjustable() {
        return Err(CommandError::InvalidAllocation {
            module_id: module_id.clone(),
            reason: "consumption is fixed",
        });
    }
    if percent.is_nan() {
        return Err(CommandError::InvalidAllocation {
            module_id: module_id.clone(),
            reason: "percent is not a number",
        });
    }
    let Some(module) = state.modules.get_mut(module_id) else {
        return Err(CommandError::not_found("installed module", module_id));
    };
    if !module.is_active {
        return Err(CommandError::InvalidAllocation {
            module_id: module_id.clone(),
            reason: "module is inactive",
        });
    }
    let percent = percent.clamp(0.0, 100.0);
    module.energy_allocation = percent;
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::EnergyAllocationChanged {
            module_id: module_id.clone(),
            percent,
        },
    ));
    Ok(())
}

pub(crate) fn repair_module(
    state: &mut ShipState,
    module_id: &ModuleId,
    amount: f64,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    let def = installed_def(state, module_id, content)?;
    let max_durability = def.durability;
    let repair_status_ms = content.constants.repair_status_ms;
    let Some(module) = state.modules.get_mut(module_id) else {
        return Err(CommandError::not_found("installed module", module_id));
    };
    if module.upgrade.is_some() {
        return Err(CommandError::conflict(format!("upgrade of {module_id}")));
    }
    let durability_before = module.current_durability;
    module.current_durability = (durability_before + amount.max(0.0)).min(max_durability);
    module.repairing_until = Some(now.saturating_add(repair_status_ms));
    let durability_after = module.current_durability;
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::ModuleRepaired {
            module_id: module_id.clone(),
            durability_before,
            durability_after,
        },
    ));
    Ok(())
}

/// External damage. A module worn down to zero shuts itself off.
pub(crate) fn damage_module(
    state: &mut ShipState,
    module_id: &ModuleId,
    amount: f64,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    installed_def(state, module_id, content)?;
    let Some(module) = state.modules.get_mut(module_id) else {
        return Err(CommandError::not_found("installed module", module_id));
    };
    module.current_durability = (module.current_durability - amount.max(0.0)).max(0.0);
    if module.current_durability <= 0.0 {
        module.is_active = false;
        module.energy_allocation = 0.0;
    }
    let durability_after = module.current_durability;
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::ModuleDamaged {
            module_id: module_id.clone(),
            durability_after,
        },
    ));
    Ok(())
}

pub(crate) fn start_module_upgrade(
    state: &mut ShipState,
    module_id: &ModuleId,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    let def = installed_def(state, module_id, content)?;
    let next = content
        .next_tier(def)
        .ok_or_else(|| CommandError::not_found("upgrade tier", module_id))?;
    if state.modules[module_id].upgrade.is_some() {
        return Err(CommandError::conflict(format!("upgrade of {module_id}")));
    }
    if state.modules.contains_key(&next.id) {
        return Err(CommandError::conflict(format!("module {}", next.id)));
    }
    if state
        .navigation
        .as_ref()
        .is_some_and(|nav| &nav.module_id == module_id)
    {
        return Err(CommandError::conflict(format!("navigation using {module_id}")));
    }
    check_module_prerequisites(state, next, content)?;
    state.inventory.check_available(&next.required_resources)?;

    state.inventory.deduct(&next.required_resources, content);
    let completes_at = now.saturating_add(content.constants.upgrade_duration_ms);
    if let Some(module) = state.modules.get_mut(module_id) {
        module.upgrade = Some(UpgradeProgress {
            target: next.id.clone(),
            started_at: now,
            completes_at,
        });
    }
    events.push(crate::emit(
        &mut state.counters,
        now,
        Event::UpgradeStarted {
            module_id: module_id.clone(),
            target: next.id.clone(),
            completes_at,
        },
    ));
    Ok(())
}

// ---------------------------------------------------------------------------
// Time-driven
// ---------------------------------------------------------------------------

/// Swaps in the next-tier definition for every upgrade that has finished.
pub(crate) fn advance_upgrades(
    state: &mut ShipState,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) {
    let finished: Vec<(ModuleId, ModuleId)> = state
        .modules
        .values()
        .filter_map(|module| {
            module
                .upgrade
                .as_ref()
                .filter(|upgrade| upgrade.completes_at <= now)
                .map(|upgrade| (module.id.clone(), upgrade.target.clone()))
        })
        .collect();

    for (from, to) in finished {
        let Some(old) = state.modules.remove(&from) else {
            continue;
        };
        let Some(def) = content.module_def(&to) else {
            // Target vanished from content; keep the original module.
            let mut restored = old;
            restored.upgrade = None;
            state.modules.insert(from, restored);
            continue;
        };
        let mut upgraded = InstalledModule::fresh(def);
        upgraded.is_active = old.is_active;
        upgraded.energy_allocation = old.energy_allocation;
        state.modules.insert(to.clone(), upgraded);
        tracing::debug!(%from, %to, "module upgrade completed");
        events.push(crate::emit(
            &mut state.counters,
            now,
            Event::UpgradeCompleted { from, to },
        ));
    }
}

/// Integrates stored energy over `elapsed_secs` using the last computed budget.
///
/// Returns the seconds the served load was actually powered. A draw on
/// storage stops once storage is empty, so the result falls short of
/// `elapsed_secs` when the deficit outlasts the stored energy.
pub(crate) fn integrate_energy(energy: &mut EnergyState, elapsed_secs: f64) -> f64 {
    let served = energy.total_consumption - energy.unmet_demand;
    let net = energy.total_generation - served;
    if net >= 0.0 {
        energy.current_stored = (energy.current_stored + net * elapsed_secs)
            .min(energy.total_storage)
            .max(0.0);
        return elapsed_secs;
    }
    let powered_secs = (energy.current_stored.max(0.0) / -net).min(elapsed_secs);
    energy.current_stored = (energy.current_stored + net * powered_secs)
        .min(energy.total_storage)
        .max(0.0);
    powered_secs
}

/// Research points per second from active, powered research modules.
pub(crate) fn module_research_output(state: &ShipState, content: &GameContent) -> f64 {
    state
        .modules
        .values()
        .filter(|module| module.is_active && !module.energy_starved)
        .filter_map(|module| {
            content.module_def(&module.id).map(|def| {
                def.research_output
                    * crate::durability_efficiency(
                        module.current_durability,
                        def.durability,
                        &content.constants,
                    )
            })
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Derived recomputation
// ---------------------------------------------------------------------------

/// Load-shedding order: lowest value is starved first. `None` is never shed.
fn shed_priority(category: ModuleCategory) -> Option<u8> {
    match category {
        ModuleCategory::Sensor => Some(0),
        ModuleCategory::Research => Some(1),
        ModuleCategory::Extraction => Some(2),
        ModuleCategory::Cargo => Some(3),
        ModuleCategory::Shield => Some(4),
        ModuleCategory::Power
        | ModuleCategory::Storage
        | ModuleCategory::Engine
        | ModuleCategory::Warp => None,
    }
}

/// Recomputes energy totals, capacities, shortage flags, and module statuses.
/// Run after every mutating command and every tick.
pub(crate) fn recompute(
    state: &mut ShipState,
    content: &GameContent,
    now: Timestamp,
    events: &mut Vec<EventEnvelope>,
) {
    let constants = &content.constants;
    let mut generation = 0.0;
    let mut consumption = 0.0;
    let mut storage = constants.base_energy_storage;
    let mut cargo = constants.base_cargo_capacity;
    let mut consumers: Vec<(ModuleId, u8, f64)> = Vec::new();

    for module in state.modules.values() {
        let Some(def) = content.module_def(&module.id) else {
            continue;
        };
        storage += def.energy_storage;
        cargo += def.cargo_capacity;
        if !module.is_active || module.upgrade.is_some() {
            continue;
        }
        generation += def.energy_generation
            * crate::durability_efficiency(module.current_durability, def.durability, constants);
        let draw = def.energy_consumption.at(module.energy_allocation);
        consumption += draw;
        if let Some(priority) = shed_priority(def.category) {
            consumers.push((module.id.clone(), priority, draw));
        }
    }

    let previously_starved: Vec<ModuleId> = state
        .modules
        .values()
        .filter(|module| module.energy_starved)
        .map(|module| module.id.clone())
        .collect();
    for module in state.modules.values_mut() {
        module.energy_starved = false;
    }

    // Storage covers a deficit until it runs dry; only then are modules
    // starved. They stay starved until storage could carry the whole deficit
    // for `shortage_recovery_secs`.
    let deficit = consumption - generation;
    let stored = state.energy.current_stored;
    let must_shed = deficit > 0.0
        && if previously_starved.is_empty() {
            stored <= MIN_MEANINGFUL_AMOUNT
        } else {
            stored < deficit * constants.shortage_recovery_secs
        };
    let mut unmet = 0.0;
    let mut starved: Vec<ModuleId> = Vec::new();
    if must_shed {
        consumers.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let mut remaining = deficit;
        for (module_id, _, draw) in consumers {
            if remaining <= 0.0 {
                break;
            }
            if let Some(module) = state.modules.get_mut(&module_id) {
                module.energy_starved = true;
            }
            unmet += draw;
            remaining -= draw;
            starved.push(module_id);
        }
    }

    state.energy.total_generation = generation;
    state.energy.total_consumption = consumption;
    state.energy.total_storage = storage;
    state.energy.current_stored = state.energy.current_stored.min(storage).max(0.0);
    state.energy.distribution_efficiency = (generation - consumption) / generation.max(1.0) * 100.0;
    state.energy.unmet_demand = unmet;

    state.inventory.max_capacity = cargo;
    state.inventory.refresh_usage(content);

    for module in state.modules.values_mut() {
        let max_durability = content
            .module_def(&module.id)
            .map_or(0.0, |def| def.durability);
        module.status = derive_status(module, max_durability, now);
        if module.repairing_until.is_some_and(|until| until <= now) {
            module.repairing_until = None;
        }
    }

    let mut starved_sorted = starved.clone();
    starved_sorted.sort();
    if !starved.is_empty() && starved_sorted != previously_starved {
        tracing::debug!(count = starved.len(), unmet, "energy shortage");
        events.push(crate::emit(
            &mut state.counters,
            now,
            Event::EnergyShortage {
                starved_modules: starved,
                unmet_demand: unmet,
            },
        ));
    }
}

fn derive_status(module: &InstalledModule, max_durability: f64, now: Timestamp) -> ModuleStatus {
    if module.upgrade.is_some() {
        ModuleStatus::Upgrading
    } else if module.repairing_until.is_some_and(|until| until > now) {
        ModuleStatus::Repairing
    } else if module.energy_starved {
        ModuleStatus::EnergyShortage
    } else if max_durability > 0.0 && module.current_durability < max_durability * 0.5 {
        ModuleStatus::Damaged
    } else if !module.is_active {
        ModuleStatus::Disabled
    } else {
        ModuleStatus::Normal
    }
}
