//! Read-only health report and upgrade advice computed from the ledger.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{GameContent, ModuleCategory, ModuleId, ModuleStatus, ResourceId, ShipState, TechStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Advisory,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Optimal,
    Good,
    Degraded,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipDiagnostics {
    pub overall_status: OverallStatus,
    /// Percent, 0..=100.
    pub efficiency: f64,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
    /// Ids of every rule that fired, in table order.
    pub fired: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeSuggestion {
    pub module_id: ModuleId,
    pub target: ModuleId,
    /// Research for the target tier is done and the target is unlocked.
    pub unlocked: bool,
    /// Shortfall per resource; empty when the upgrade is affordable.
    pub missing_resources: BTreeMap<ResourceId, f64>,
}

impl UpgradeSuggestion {
    pub fn is_ready(&self) -> bool {
        self.unlocked && self.missing_resources.is_empty()
    }
}

type RuleFn = fn(&ShipState, &GameContent) -> bool;

struct DiagnosticRule {
    id: &'static str,
    severity: Severity,
    check: RuleFn,
    message: &'static str,
    suggested_action: &'static str,
}

/// Cargo fill ratio above which the hold counts as nearly full.
const CARGO_NEAR_FULL: f64 = 0.9;

const RULES: &[DiagnosticRule] = &[
    DiagnosticRule {
        id: "ENERGY_SHORTAGE",
        severity: Severity::Critical,
        check: |s, _| s.energy.unmet_demand > 0.0,
        message: "Energy demand exceeds supply; modules are being shed",
        suggested_action: "Activate power modules or lower energy allocations",
    },
    DiagnosticRule {
        id: "NO_ACTIVE_POWER",
        severity: Severity::Critical,
        check: |s, c| !has_active(s, c, ModuleCategory::Power),
        message: "No power module is generating",
        suggested_action: "Install or activate a power module",
    },
    DiagnosticRule {
        id: "MODULE_CRITICAL_WEAR",
        severity: Severity::Critical,
        check: |s, c| {
            s.modules.values().any(|module| {
                c.module_def(&module.id).is_some_and(|def| {
                    def.durability > 0.0
                        && module.current_durability / def.durability
                            <= c.constants.durability_band_critical_threshold
                })
            })
        },
        message: "A module is close to failure",
        suggested_action: "Repair critically worn modules",
    },
    DiagnosticRule {
        id: "NO_ENGINE",
        severity: Severity::Critical,
        check: |s, c| !has_installed(s, c, ModuleCategory::Engine),
        message: "No engine installed; the ship cannot travel",
        suggested_action: "Install an engine module",
    },
    DiagnosticRule {
        id: "RUNNING_ON_STORAGE",
        severity: Severity::Warning,
        check: |s, _| {
            s.energy.unmet_demand <= 0.0 && s.energy.total_consumption > s.energy.total_generation
        },
        message: "Consumption exceeds generation; stored energy is draining",
        suggested_action: "Reduce consumption before storage runs dry",
    },
    DiagnosticRule {
        id: "MODULE_DAMAGED",
        severity: Severity::Warning,
        check: |s, _| {
            s.modules
                .values()
                .any(|module| module.status == ModuleStatus::Damaged)
        },
        message: "One or more modules are below half durability",
        suggested_action: "Schedule repairs for damaged modules",
    },
    DiagnosticRule {
        id: "WARP_RESERVE_LOW",
        severity: Severity::Warning,
        check: |s, c| {
            has_installed(s, c, ModuleCategory::Warp)
                && s.energy.current_stored < c.constants.warp_nav_min_energy
        },
        message: "Stored energy is below the warp reserve",
        suggested_action: "Let storage recharge before warping",
    },
    DiagnosticRule {
        id: "CARGO_NEAR_FULL",
        severity: Severity::Warning,
        check: |s, _| {
            s.inventory.max_capacity > 0.0
                && s.inventory.current_capacity / s.inventory.max_capacity > CARGO_NEAR_FULL
        },
        message: "Cargo hold above 90% capacity",
        suggested_action: "Spend resources or install more cargo capacity",
    },
    DiagnosticRule {
        id: "RESEARCH_IDLE",
        severity: Severity::Advisory,
        check: |s, c| {
            s.research.active.is_none()
                && c
                    .techs
                    .iter()
                    .any(|tech| crate::tech_status(s, tech) == TechStatus::Available)
        },
        message: "No research in progress",
        suggested_action: "Start an available research project",
    },
];

fn has_installed(state: &ShipState, content: &GameContent, category: ModuleCategory) -> bool {
    state
        .modules
        .values()
        .filter_map(|module| content.module_def(&module.id))
        .any(|def| def.category == category)
}

fn has_active(state: &ShipState, content: &GameContent, category: ModuleCategory) -> bool {
    state
        .modules
        .values()
        .filter(|module| module.is_active && module.upgrade.is_none())
        .filter_map(|module| content.module_def(&module.id))
        .any(|def| def.category == category)
}

/// Mean module condition, scaled by the share of demand actually served.
fn efficiency(state: &ShipState, content: &GameContent) -> f64 {
    let ratios: Vec<f64> = state
        .modules
        .values()
        .filter_map(|module| {
            content
                .module_def(&module.id)
                .filter(|def| def.durability > 0.0)
                .map(|def| (module.current_durability / def.durability).clamp(0.0, 1.0))
        })
        .collect();
    if ratios.is_empty() {
        return 0.0;
    }
    let condition = ratios.iter().sum::<f64>() / ratios.len() as f64;
    let served = if state.energy.total_consumption > 0.0 {
        1.0 - state.energy.unmet_demand / state.energy.total_consumption
    } else {
        1.0
    };
    (condition * served.clamp(0.0, 1.0) * 100.0).clamp(0.0, 100.0)
}

/// Efficiency at or above which a ship with no findings is `Optimal`.
const OPTIMAL_EFFICIENCY: f64 = 90.0;

pub fn diagnose(state: &ShipState, content: &GameContent) -> ShipDiagnostics {
    let mut critical_issues = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();
    let mut fired = Vec::new();
    let mut worst: Option<Severity> = None;

    for rule in RULES {
        if !(rule.check)(state, content) {
            continue;
        }
        fired.push(rule.id);
        worst = worst.max(Some(rule.severity));
        if rule.severity == Severity::Critical {
            critical_issues.push(rule.message.to_string());
        }
        if !recommendations.iter().any(|r| r == rule.suggested_action) {
            recommendations.push(rule.suggested_action.to_string());
        }
    }

    let efficiency = efficiency(state, content);
    let overall_status = match worst {
        Some(Severity::Critical) => OverallStatus::Critical,
        Some(Severity::Warning) => OverallStatus::Degraded,
        _ if efficiency >= OPTIMAL_EFFICIENCY && worst.is_none() => OverallStatus::Optimal,
        _ => OverallStatus::Good,
    };

    ShipDiagnostics {
        overall_status,
        efficiency,
        critical_issues,
        recommendations,
        fired,
    }
}

/// One entry per installed module that has a next tier not yet installed.
pub fn upgrade_suggestions(state: &ShipState, content: &GameContent) -> Vec<UpgradeSuggestion> {
    state
        .modules
        .values()
        .filter(|module| module.upgrade.is_none())
        .filter_map(|module| {
            let def = content.module_def(&module.id)?;
            let next = content.next_tier(def)?;
            if state.modules.contains_key(&next.id) {
                return None;
            }
            let research_done = next
                .required_research
                .as_ref()
                .map_or(true, |tech_id| state.research.completed.contains(tech_id));
            let unlocked = research_done && crate::is_module_unlocked(state, next, content);
            let missing_resources = next
                .required_resources
                .iter()
                .filter_map(|(resource, needed)| {
                    let shortfall = needed - state.inventory.quantity(resource);
                    (shortfall > 0.0).then_some((resource.clone(), shortfall))
                })
                .collect();
            Some(UpgradeSuggestion {
                module_id: module.id.clone(),
                target: next.id.clone(),
                unlocked,
                missing_resources,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_state};

    #[test]
    fn healthy_ship_has_no_critical_issues() {
        let content = base_content();
        let state = base_state(&content);
        let report = diagnose(&state, &content);
        assert!(report.critical_issues.is_empty(), "{report:?}");
        assert_ne!(report.overall_status, OverallStatus::Critical);
        assert!(report.efficiency > 99.0);
    }

    #[test]
    fn missing_power_is_critical() {
        let content = base_content();
        let mut state = base_state(&content);
        for module in state.modules.values_mut() {
            module.is_active = false;
        }
        let report = diagnose(&state, &content);
        assert_eq!(report.overall_status, OverallStatus::Critical);
        assert!(report.fired.contains(&"NO_ACTIVE_POWER"));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("power module")));
    }

    #[test]
    fn worn_module_lowers_efficiency() {
        let content = base_content();
        let mut state = base_state(&content);
        let healthy = diagnose(&state, &content).efficiency;
        let reactor = state
            .modules
            .get_mut(&ModuleId("reactor_core".to_string()))
            .unwrap();
        reactor.current_durability = 5.0;
        let report = diagnose(&state, &content);
        assert!(report.efficiency < healthy);
        assert!(report.fired.contains(&"MODULE_CRITICAL_WEAR"));
    }

    #[test]
    fn suggestions_report_shortfall_and_lock() {
        let content = base_content();
        let state = base_state(&content);
        let suggestions = upgrade_suggestions(&state, &content);
        let drive = suggestions
            .iter()
            .find(|s| s.module_id == ModuleId("ion_drive".to_string()))
            .expect("ion drive has a next tier");
        assert_eq!(drive.target, ModuleId("ion_drive_mk2".to_string()));
        assert!(!drive.unlocked);
        assert!(!drive.is_ready());
    }
}
