//! Scenario and scenario-run models.
//!
//! A scenario is a named unit of work targeting one or more SUT machines.
//! Each (scenario, target machine) pair expands into an independent
//! `ScenarioRun` — the atomic unit the scheduler allocates machines for.
//!
//! # Runtime Estimates
//!
//! Runtimes are in minutes. A scenario may carry a fixed estimate; otherwise
//! a per-kind default applies at expansion (SINGLE=30, DUAL=45, TRIPLE=60).

use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::{MachineRole, ModelError};

/// How many machines a scenario needs, and in which roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// SUT only.
    Single,
    /// SUT + load generator.
    Dual,
    /// SUT + load generator + database.
    Triple,
}

impl ScenarioKind {
    /// Roles required by this kind, in resolution order (SUT first).
    pub fn required_roles(&self) -> &'static [MachineRole] {
        match self {
            ScenarioKind::Single => &[MachineRole::Sut],
            ScenarioKind::Dual => &[MachineRole::Sut, MachineRole::Load],
            ScenarioKind::Triple => &[MachineRole::Sut, MachineRole::Load, MachineRole::Db],
        }
    }

    /// Number of machines required.
    pub fn machine_count(&self) -> usize {
        self.required_roles().len()
    }

    /// Fallback runtime estimate in minutes when a scenario has none.
    pub fn default_runtime(&self) -> f64 {
        match self {
            ScenarioKind::Single => 30.0,
            ScenarioKind::Dual => 45.0,
            ScenarioKind::Triple => 60.0,
        }
    }

    /// Numeric wire encoding (1, 2, 3).
    pub fn from_machine_count(count: u8) -> Option<ScenarioKind> {
        match count {
            1 => Some(ScenarioKind::Single),
            2 => Some(ScenarioKind::Dual),
            3 => Some(ScenarioKind::Triple),
            _ => None,
        }
    }
}

/// A scenario to be scheduled.
///
/// Two scenarios are equal when their name and target-machine *set* match;
/// target order is irrelevant to identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name (e.g. `"plaintext"`).
    pub name: String,
    /// Required machine roles.
    pub kind: ScenarioKind,
    /// Target SUT machine names. Never empty.
    pub target_machines: Vec<String>,
    /// Template reference handed to the external rendering step.
    pub template: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
    /// Fixed runtime estimate in minutes, if known.
    pub estimated_runtime: Option<f64>,
    /// Per-(machine name, role) profile overrides.
    pub profile_overrides: HashMap<String, HashMap<MachineRole, String>>,
}

impl Scenario {
    /// Creates a scenario. An empty target list is a construction error.
    pub fn new(
        name: impl Into<String>,
        kind: ScenarioKind,
        target_machines: Vec<String>,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        if target_machines.is_empty() {
            return Err(ModelError::NoTargetMachines(name));
        }
        Ok(Self {
            name,
            kind,
            target_machines,
            template: None,
            description: None,
            estimated_runtime: None,
            profile_overrides: HashMap::new(),
        })
    }

    /// Sets the fixed runtime estimate (minutes).
    pub fn with_runtime(mut self, minutes: f64) -> Self {
        self.estimated_runtime = Some(minutes);
        self
    }

    /// Sets the template reference.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a profile override for a (machine name, role) pair.
    pub fn with_profile_override(
        mut self,
        machine: impl Into<String>,
        role: MachineRole,
        profile: impl Into<String>,
    ) -> Self {
        self.profile_overrides
            .entry(machine.into())
            .or_default()
            .insert(role, profile.into());
        self
    }

    /// Roles required by this scenario, in resolution order.
    pub fn required_roles(&self) -> &'static [MachineRole] {
        self.kind.required_roles()
    }

    /// The profile this scenario prefers for a (machine, role) pair, if any.
    pub fn preferred_profile(&self, machine: &str, role: MachineRole) -> Option<&str> {
        self.profile_overrides
            .get(machine)
            .and_then(|by_role| by_role.get(&role))
            .map(String::as_str)
    }

    /// Display name including targets, e.g. `"plaintext-[gold-lin,gold-win]"`.
    pub fn display_name(&self) -> String {
        match self.target_machines.as_slice() {
            [single] => format!("{}-{}", self.name, single),
            targets => format!("{}-[{}]", self.name, targets.join(",")),
        }
    }
}

impl PartialEq for Scenario {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name {
            return false;
        }
        let mine: BTreeSet<&str> = self.target_machines.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = other.target_machines.iter().map(String::as_str).collect();
        mine == theirs
    }
}

impl Eq for Scenario {}

impl Hash for Scenario {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        let targets: BTreeSet<&str> = self.target_machines.iter().map(String::as_str).collect();
        for target in targets {
            target.hash(state);
        }
    }
}

/// One (scenario, target machine) pair — the unit actually scheduled.
///
/// Carries the resolved runtime estimate so later stages never consult the
/// fallback table again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRun {
    /// The scenario this run belongs to.
    pub scenario: Scenario,
    /// The specific target machine for this run.
    pub target_machine: String,
    /// Resolved runtime estimate in minutes.
    pub estimated_runtime: f64,
}

impl ScenarioRun {
    /// Creates a run for one target, resolving the runtime estimate.
    pub fn new(scenario: &Scenario, target_machine: &str) -> Self {
        let estimated_runtime = scenario
            .estimated_runtime
            .unwrap_or_else(|| scenario.kind.default_runtime());
        Self {
            scenario: scenario.clone(),
            target_machine: target_machine.to_string(),
            estimated_runtime,
        }
    }

    /// Expands scenarios into one run per target machine.
    pub fn expand(scenarios: &[Scenario]) -> Vec<ScenarioRun> {
        scenarios
            .iter()
            .flat_map(|s| s.target_machines.iter().map(|t| ScenarioRun::new(s, t)))
            .collect()
    }

    /// Display name, e.g. `"plaintext-gold-lin"`.
    pub fn display_name(&self) -> String {
        format!("{}-{}", self.scenario.name, self.target_machine)
    }
}
