//! Machine allocation for a single scenario run.
//!
//! Resolves each role the scenario requires to a concrete machine and
//! profile, or reports infeasibility. SUT is always resolved first and must
//! be the run's exact target machine; LOAD/DB candidates are ranked by an
//! effective priority combining capability priority, the anchor machine's
//! partner preferences, and group compatibility.
//!
//! Infeasibility is a normal negative result (`None`), not an error: the
//! caller simply retries the run in a later stage.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::models::{Capability, Machine, MachineRole, Scenario, ScenarioRun};

/// Machines and profiles resolved for one scenario run.
#[derive(Debug, Clone)]
pub struct RoleBinding {
    /// Machine name serving each required role.
    pub machines: HashMap<MachineRole, String>,
    /// Selected profile for each required role.
    pub profiles: HashMap<MachineRole, String>,
}

/// Ranked candidate for a LOAD/DB role.
struct Candidate<'a> {
    machine: &'a Machine,
    capability: &'a Capability,
    /// Effective priority: 0.0 exact preferred, 0.1 + 0.1·i for the anchor's
    /// i-th preferred partner, else the capability priority. Lower wins.
    effective_priority: f64,
}

/// Allocates machines to scenario runs under capability, group, and partner
/// constraints.
pub struct MachineAllocator {
    machines: HashMap<String, Machine>,
    enforce_machine_groups: bool,
}

impl MachineAllocator {
    /// Creates an allocator over the machine pool.
    pub fn new(machines: &[Machine], enforce_machine_groups: bool) -> Self {
        Self {
            machines: machines.iter().map(|m| (m.name.clone(), m.clone())).collect(),
            enforce_machine_groups,
        }
    }

    /// Allocates machines and profiles for every role the run requires.
    ///
    /// Returns `None` if any role cannot be resolved; no partial binding is
    /// ever produced. `committed` holds the machine names already taken in
    /// the current stage; it is copied internally, so the caller's set is
    /// only extended after a successful allocation.
    pub fn allocate(&self, run: &ScenarioRun, committed: &HashSet<String>) -> Option<RoleBinding> {
        let mut taken = committed.clone();
        let mut binding = RoleBinding {
            machines: HashMap::new(),
            profiles: HashMap::new(),
        };
        let mut anchor: Option<&Machine> = None;

        for &role in run.scenario.required_roles() {
            let (machine, profile) = match role {
                MachineRole::Sut => self.select_sut(&run.target_machine, &taken, &run.scenario)?,
                _ => self.select_for_role(role, &taken, None, &run.scenario, anchor)?,
            };

            taken.insert(machine.name.clone());
            binding.machines.insert(role, machine.name.clone());
            binding.profiles.insert(role, profile);
            if role == MachineRole::Sut {
                anchor = Some(machine);
            }
        }

        Some(binding)
    }

    /// Resolves the SUT role: the exact target machine or nothing.
    fn select_sut(
        &self,
        target: &str,
        taken: &HashSet<String>,
        scenario: &Scenario,
    ) -> Option<(&Machine, String)> {
        if taken.contains(target) {
            return None;
        }
        let machine = self.machines.get(target)?;
        let capability = machine.capability(MachineRole::Sut)?;
        let profile = select_profile(capability, machine, MachineRole::Sut, scenario);
        Some((machine, profile))
    }

    /// Resolves a LOAD/DB role by effective priority.
    ///
    /// `preferred` pins a machine to effective priority 0.0 when given; the
    /// current scheduling flow never passes it for LOAD/DB, but the contract
    /// keeps it ahead of partner bonuses. Ties on effective priority are
    /// broken by machine name, so equal-priority selection is deterministic.
    fn select_for_role(
        &self,
        role: MachineRole,
        taken: &HashSet<String>,
        preferred: Option<&str>,
        scenario: &Scenario,
        anchor: Option<&Machine>,
    ) -> Option<(&Machine, String)> {
        let partners: &[String] = anchor.map(|m| m.preferred_partners.as_slice()).unwrap_or(&[]);

        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        for machine in self.machines.values() {
            if taken.contains(&machine.name) {
                continue;
            }
            let Some(capability) = machine.capability(role) else {
                continue;
            };
            if self.enforce_machine_groups {
                if let Some(anchor) = anchor {
                    if !anchor.group_compatible(machine) {
                        continue;
                    }
                }
            }

            let effective_priority = if preferred == Some(machine.name.as_str()) {
                0.0
            } else if let Some(index) = partners.iter().position(|p| p == &machine.name) {
                // Partner bonus (0.1, 0.2, ...) always ranks ahead of
                // capability priorities, which are integers >= 1.
                0.1 + index as f64 * 0.1
            } else {
                f64::from(capability.priority)
            };

            candidates.push(Candidate {
                machine,
                capability,
                effective_priority,
            });
        }

        candidates.sort_by(|a, b| {
            a.effective_priority
                .total_cmp(&b.effective_priority)
                .then_with(|| a.machine.name.cmp(&b.machine.name))
        });

        let best = candidates.first()?;
        debug!(
            role = %role,
            machine = %best.machine.name,
            effective_priority = best.effective_priority,
            "selected machine for role"
        );
        let profile = select_profile(best.capability, best.machine, role, scenario);
        Some((best.machine, profile))
    }
}

/// Picks the profile for a resolved role: the scenario's override for this
/// (machine, role) pair when it names an available profile, else the
/// capability default.
fn select_profile(
    capability: &Capability,
    machine: &Machine,
    role: MachineRole,
    scenario: &Scenario,
) -> String {
    if let Some(preferred) = scenario.preferred_profile(&machine.name, role) {
        if capability.has_profile(preferred) {
            return preferred.to_string();
        }
    }
    capability.default_profile.clone()
}
