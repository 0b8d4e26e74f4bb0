//! Machine and capability models.
//!
//! Machines are the physical lab hosts that execute scenario runs. Each
//! machine declares which roles it can serve (with a preference priority and
//! a set of named configuration profiles per role), an ordered list of
//! preferred partner machines, and an optional compatibility group.
//!
//! Machines are read-only inputs to scheduling; no scheduling step mutates
//! a machine.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ModelError;

/// A role a machine can serve for a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineRole {
    /// System under test.
    Sut,
    /// Load generator.
    Load,
    /// Database backend.
    Db,
}

impl MachineRole {
    /// All roles, in canonical resolution order (SUT first).
    pub const ALL: [MachineRole; 3] = [MachineRole::Sut, MachineRole::Load, MachineRole::Db];

    /// Lowercase wire label (`"sut"`, `"load"`, `"db"`).
    pub fn label(&self) -> &'static str {
        match self {
            MachineRole::Sut => "sut",
            MachineRole::Load => "load",
            MachineRole::Db => "db",
        }
    }

    /// Parses a wire label.
    pub fn parse(label: &str) -> Option<MachineRole> {
        match label {
            "sut" => Some(MachineRole::Sut),
            "load" => Some(MachineRole::Load),
            "db" => Some(MachineRole::Db),
            _ => None,
        }
    }
}

impl fmt::Display for MachineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A machine's ability to serve one role.
///
/// Carries the selection priority (lower = preferred when choosing among
/// candidates), the available configuration profiles for the role, and the
/// profile used when a scenario does not override it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    /// Selection priority (1 = preferred, 2 = secondary, ...).
    pub priority: i32,
    /// Available profiles for this role. Never empty.
    pub profiles: Vec<String>,
    /// Profile used when no override applies. Always a member of `profiles`.
    pub default_profile: String,
}

impl Capability {
    /// Creates a capability.
    ///
    /// `default_profile = None` falls back to the first profile. An empty
    /// profile list, or a default profile that is not in the list, is a
    /// construction error.
    pub fn new(
        role: MachineRole,
        priority: i32,
        profiles: Vec<String>,
        default_profile: Option<String>,
    ) -> Result<Self, ModelError> {
        let Some(first) = profiles.first() else {
            return Err(ModelError::EmptyProfiles { role });
        };

        let default_profile = match default_profile {
            None => first.clone(),
            Some(profile) => {
                if !profiles.contains(&profile) {
                    return Err(ModelError::UnknownDefaultProfile { role, profile });
                }
                profile
            }
        };

        Ok(Self {
            priority,
            profiles,
            default_profile,
        })
    }

    /// Whether this capability offers the named profile.
    pub fn has_profile(&self, profile: &str) -> bool {
        self.profiles.iter().any(|p| p == profile)
    }
}

/// A physical lab machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Unique machine name.
    pub name: String,
    /// Roles this machine can serve.
    pub capabilities: HashMap<MachineRole, Capability>,
    /// Partner machines to prefer for LOAD/DB roles, most-preferred first.
    pub preferred_partners: Vec<String>,
    /// Optional compatibility group label.
    pub machine_group: Option<String>,
}

impl Machine {
    /// Creates a machine with no capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: HashMap::new(),
            preferred_partners: Vec::new(),
            machine_group: None,
        }
    }

    /// Adds a capability for a role.
    pub fn with_capability(mut self, role: MachineRole, capability: Capability) -> Self {
        self.capabilities.insert(role, capability);
        self
    }

    /// Appends a preferred partner machine name.
    pub fn with_partner(mut self, name: impl Into<String>) -> Self {
        self.preferred_partners.push(name.into());
        self
    }

    /// Sets the compatibility group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.machine_group = Some(group.into());
        self
    }

    /// Returns the capability for a role, if any.
    pub fn capability(&self, role: MachineRole) -> Option<&Capability> {
        self.capabilities.get(&role)
    }

    /// Whether this machine can serve the given role.
    pub fn can_serve(&self, role: MachineRole) -> bool {
        self.capabilities.contains_key(&role)
    }

    /// Roles this machine supports, sorted by capability priority then role.
    pub fn supported_roles(&self) -> Vec<MachineRole> {
        let mut roles: Vec<MachineRole> = self.capabilities.keys().copied().collect();
        roles.sort_by_key(|r| (self.capabilities[r].priority, *r));
        roles
    }

    /// The machine's most-preferred role (lowest capability priority).
    pub fn primary_role(&self) -> Option<MachineRole> {
        self.supported_roles().first().copied()
    }

    /// Whether two machines may co-serve one scenario run.
    ///
    /// A machine with no group is compatible with any machine; two grouped
    /// machines must share the group label.
    pub fn group_compatible(&self, other: &Machine) -> bool {
        match (&self.machine_group, &other.machine_group) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}
