//! Input validation for scheduling configurations.
//!
//! Checks structural integrity of machines, scenarios, and queue settings
//! before scheduling. Detects:
//! - Duplicate machine names and duplicate scenarios
//! - Scenario targets referencing unknown machines
//! - Targets lacking SUT capability (those runs can never be placed)
//! - Role demand with no capable machine in the pool
//! - Empty queue lists and dangling partner references
//!
//! All issues are collected and returned together rather than failing on
//! the first.

use std::collections::HashSet;

use crate::models::{Machine, MachineRole, Scenario};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two machines share the same name.
    DuplicateMachine,
    /// Two scenarios share a name and target-machine set.
    DuplicateScenario,
    /// A scenario targets a machine that doesn't exist.
    UnknownTargetMachine,
    /// A target machine cannot serve the SUT role.
    MissingSutCapability,
    /// Scenarios require a role no machine in the pool can serve.
    MissingRoleCoverage,
    /// The queue list is empty, so no stage can hold an assignment.
    EmptyQueues,
    /// A preferred partner references a machine that doesn't exist.
    UnknownPartner,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a scheduling configuration.
///
/// Returns `Ok(())` if all checks pass, `Err(errors)` with every detected
/// issue otherwise.
pub fn validate_input(
    machines: &[Machine],
    scenarios: &[Scenario],
    queues: &[String],
) -> ValidationResult {
    let mut errors = Vec::new();

    if queues.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyQueues,
            "no queues configured; stages cannot hold any assignment",
        ));
    }

    // Machine name uniqueness.
    let mut machine_names = HashSet::new();
    for machine in machines {
        if !machine_names.insert(machine.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateMachine,
                format!("Duplicate machine name: {}", machine.name),
            ));
        }
    }

    // Partner references.
    for machine in machines {
        for partner in &machine.preferred_partners {
            if !machine_names.contains(partner.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownPartner,
                    format!(
                        "Machine '{}' prefers unknown partner '{}'",
                        machine.name, partner
                    ),
                ));
            }
        }
    }

    // Scenario uniqueness (name + target set).
    let mut seen_scenarios: Vec<&Scenario> = Vec::new();
    for scenario in scenarios {
        if seen_scenarios.iter().any(|s| *s == scenario) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateScenario,
                format!("Duplicate scenario: {}", scenario.display_name()),
            ));
        } else {
            seen_scenarios.push(scenario);
        }
    }

    // Target references and SUT capability.
    for scenario in scenarios {
        for target in &scenario.target_machines {
            match machines.iter().find(|m| &m.name == target) {
                None => errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownTargetMachine,
                    format!(
                        "Scenario '{}' targets unknown machine '{}'",
                        scenario.name, target
                    ),
                )),
                Some(machine) if !machine.can_serve(MachineRole::Sut) => {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::MissingSutCapability,
                        format!(
                            "Scenario '{}' targets '{}', which has no SUT capability",
                            scenario.name, target
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    // Role coverage: every demanded role needs at least one capable machine.
    for role in [MachineRole::Load, MachineRole::Db] {
        let demanded = scenarios.iter().any(|s| s.required_roles().contains(&role));
        let covered = machines.iter().any(|m| m.can_serve(role));
        if demanded && !covered {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingRoleCoverage,
                format!("Scenarios require the '{role}' role but no machine can serve it"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Capability, ScenarioKind};

    fn sut_machine(name: &str) -> Machine {
        let capability =
            Capability::new(MachineRole::Sut, 1, vec![format!("{name}-sut")], None).unwrap();
        Machine::new(name).with_capability(MachineRole::Sut, capability)
    }

    fn load_machine(name: &str) -> Machine {
        let capability =
            Capability::new(MachineRole::Load, 1, vec![format!("{name}-load")], None).unwrap();
        Machine::new(name).with_capability(MachineRole::Load, capability)
    }

    fn single(name: &str, target: &str) -> Scenario {
        Scenario::new(name, ScenarioKind::Single, vec![target.to_string()]).unwrap()
    }

    fn queues() -> Vec<String> {
        vec!["q0".into(), "q1".into()]
    }

    #[test]
    fn test_valid_input() {
        let machines = vec![sut_machine("m1"), sut_machine("m2")];
        let scenarios = vec![single("a", "m1"), single("b", "m2")];
        assert!(validate_input(&machines, &scenarios, &queues()).is_ok());
    }

    #[test]
    fn test_duplicate_machine() {
        let machines = vec![sut_machine("m1"), sut_machine("m1")];
        let errors = validate_input(&machines, &[], &queues()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateMachine));
    }

    #[test]
    fn test_duplicate_scenario_ignores_target_order() {
        let machines = vec![sut_machine("m1"), sut_machine("m2")];
        let scenarios = vec![
            Scenario::new("s", ScenarioKind::Single, vec!["m1".into(), "m2".into()]).unwrap(),
            Scenario::new("s", ScenarioKind::Single, vec!["m2".into(), "m1".into()]).unwrap(),
        ];
        let errors = validate_input(&machines, &scenarios, &queues()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateScenario));
    }

    #[test]
    fn test_unknown_target_machine() {
        let machines = vec![sut_machine("m1")];
        let scenarios = vec![single("a", "ghost")];
        let errors = validate_input(&machines, &scenarios, &queues()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownTargetMachine));
    }

    #[test]
    fn test_target_without_sut_capability() {
        let machines = vec![load_machine("l1")];
        let scenarios = vec![single("a", "l1")];
        let errors = validate_input(&machines, &scenarios, &queues()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MissingSutCapability));
    }

    #[test]
    fn test_missing_role_coverage() {
        let machines = vec![sut_machine("m1")];
        let scenarios =
            vec![Scenario::new("d", ScenarioKind::Triple, vec!["m1".into()]).unwrap()];
        let errors = validate_input(&machines, &scenarios, &queues()).unwrap_err();

        let coverage: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::MissingRoleCoverage)
            .collect();
        // Both LOAD and DB are demanded and uncovered.
        assert_eq!(coverage.len(), 2);
    }

    #[test]
    fn test_empty_queues() {
        let machines = vec![sut_machine("m1")];
        let errors = validate_input(&machines, &[], &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::EmptyQueues));
    }

    #[test]
    fn test_unknown_partner() {
        let machines = vec![sut_machine("m1").with_partner("ghost")];
        let errors = validate_input(&machines, &[], &queues()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownPartner));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let machines = vec![sut_machine("m1"), sut_machine("m1")];
        let scenarios = vec![single("a", "ghost")];
        let errors = validate_input(&machines, &scenarios, &[]).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
