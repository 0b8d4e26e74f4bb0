//! Combined JSON configuration loading.
//!
//! One JSON document supplies the metadata (queues, base recurrence
//! expression, group enforcement, split settings), the machine inventory,
//! and the scenario list. Parsing uses raw serde mirrors of the wire shape,
//! then converts into domain types so every structural invariant is enforced
//! by the model constructors at load time.
//!
//! # Wire shape
//!
//! ```json
//! {
//!   "metadata": {
//!     "name": "perf-lab",
//!     "schedule": "0 9 * * *",
//!     "queues": ["queue-a", "queue-b"],
//!     "enforce_machine_groups": true,
//!     "yaml_generation": { "target_yaml_count": 2, "schedule_offset_hours": 6 }
//!   },
//!   "machines": [
//!     {
//!       "name": "gold-lin",
//!       "capabilities": { "sut": { "priority": 1, "profiles": ["gold-lin"] } },
//!       "preferred_partners": ["load-1"],
//!       "machine_group": "east"
//!     }
//!   ],
//!   "scenarios": [
//!     { "name": "plaintext", "type": 2, "target_machines": ["gold-lin"] }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::models::{Capability, Machine, MachineRole, ModelError, Scenario, ScenarioKind};
use crate::splitter::SplitConfig;

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("unknown machine role '{role}' in {context}")]
    UnknownRole { role: String, context: String },

    #[error("scenario '{scenario}' has unknown type {value} (expected 1, 2, or 3)")]
    UnknownScenarioKind { scenario: String, value: u8 },
}

/// Configuration metadata.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Configuration name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Configuration version string.
    pub version: String,
    /// Base cron-style recurrence expression.
    pub schedule: String,
    /// Queue names; the queue count bounds assignments per stage.
    pub queues: Vec<String>,
    /// Whether LOAD/DB candidates must be group-compatible with the SUT.
    pub enforce_machine_groups: bool,
    /// Split settings, when schedule splitting is requested.
    pub split: Option<SplitConfig>,
}

/// A fully parsed lab configuration.
#[derive(Debug, Clone)]
pub struct LabConfig {
    pub metadata: Metadata,
    pub machines: Vec<Machine>,
    pub scenarios: Vec<Scenario>,
}

impl LabConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;

        let machines = raw
            .machines
            .into_iter()
            .map(convert_machine)
            .collect::<Result<Vec<_>, _>>()?;
        let scenarios = raw
            .scenarios
            .into_iter()
            .map(convert_scenario)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            metadata: Metadata {
                name: raw.metadata.name,
                description: raw.metadata.description,
                version: raw.metadata.version,
                schedule: raw.metadata.schedule,
                queues: raw.metadata.queues,
                enforce_machine_groups: raw.metadata.enforce_machine_groups,
                split: raw.metadata.split.map(|s| SplitConfig {
                    target_count: s.target_count,
                    offset_hours: s.offset_hours,
                }),
            },
            machines,
            scenarios,
        })
    }

    /// Number of queues, bounding assignments per stage.
    pub fn max_queues(&self) -> usize {
        self.metadata.queues.len()
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    metadata: RawMetadata,
    #[serde(default)]
    machines: Vec<RawMachine>,
    #[serde(default)]
    scenarios: Vec<RawScenario>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    schedule: String,
    #[serde(default)]
    queues: Vec<String>,
    #[serde(default = "default_true")]
    enforce_machine_groups: bool,
    #[serde(default, rename = "yaml_generation")]
    split: Option<RawSplit>,
}

impl Default for RawMetadata {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: String::new(),
            version: default_version(),
            schedule: String::new(),
            queues: Vec::new(),
            enforce_machine_groups: true,
            split: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSplit {
    #[serde(default = "default_split_count", rename = "target_yaml_count")]
    target_count: usize,
    #[serde(default = "default_split_offset", rename = "schedule_offset_hours")]
    offset_hours: u32,
}

#[derive(Debug, Deserialize)]
struct RawMachine {
    name: String,
    #[serde(default)]
    capabilities: HashMap<String, RawCapability>,
    #[serde(default)]
    preferred_partners: Vec<String>,
    #[serde(default)]
    machine_group: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCapability {
    #[serde(default = "default_priority")]
    priority: i32,
    #[serde(default)]
    profiles: Vec<String>,
    #[serde(default)]
    default_profile: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawScenario {
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    target_machines: Vec<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    estimated_runtime: Option<f64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    profile_overrides: Option<HashMap<String, HashMap<String, String>>>,
}

fn default_name() -> String {
    "Configuration".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_priority() -> i32 {
    1
}

fn default_split_count() -> usize {
    2
}

fn default_split_offset() -> u32 {
    6
}

fn convert_machine(raw: RawMachine) -> Result<Machine, ConfigError> {
    let mut machine = Machine::new(raw.name.clone());
    machine.preferred_partners = raw.preferred_partners;
    machine.machine_group = raw.machine_group;

    for (role_label, capability) in raw.capabilities {
        let role = MachineRole::parse(&role_label).ok_or_else(|| ConfigError::UnknownRole {
            role: role_label,
            context: format!("machine '{}'", raw.name),
        })?;
        machine.capabilities.insert(
            role,
            Capability::new(
                role,
                capability.priority,
                capability.profiles,
                capability.default_profile,
            )?,
        );
    }

    Ok(machine)
}

fn convert_scenario(raw: RawScenario) -> Result<Scenario, ConfigError> {
    let kind =
        ScenarioKind::from_machine_count(raw.kind).ok_or_else(|| ConfigError::UnknownScenarioKind {
            scenario: raw.name.clone(),
            value: raw.kind,
        })?;

    let mut scenario = Scenario::new(raw.name.clone(), kind, raw.target_machines)?;
    scenario.template = raw.template;
    scenario.description = raw.description;
    scenario.estimated_runtime = raw.estimated_runtime;

    if let Some(overrides) = raw.profile_overrides {
        for (machine, by_role) in overrides {
            for (role_label, profile) in by_role {
                let role =
                    MachineRole::parse(&role_label).ok_or_else(|| ConfigError::UnknownRole {
                        role: role_label,
                        context: format!("profile overrides of scenario '{}'", raw.name),
                    })?;
                scenario = scenario.with_profile_override(machine.clone(), role, profile);
            }
        }
    }

    Ok(scenario)
}
