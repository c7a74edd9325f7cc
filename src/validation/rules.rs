//! Lint rules for machine configurations.

use crate::core::Actions;
use crate::machine::{MachineConfig, StateNode};
use crate::service::ServiceOptions;
use crate::validation::issues::ConfigIssue;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type IssueCheck = Validation<(), NonEmptyVec<ConfigIssue>>;

/// Check the structure of a configuration: states exist, the initial
/// state is declared, and every target names a declared state.
///
/// Returns `Validation::Success(())` if everything resolves, otherwise
/// `Validation::Failure` with every issue found.
pub fn validate<C>(config: &MachineConfig<C>) -> Validation<(), NonEmptyVec<ConfigIssue>> {
    Validation::all_vec(structural_checks(config)).map(|_| ())
}

/// Like [`validate`], and also check that every named action has an
/// implementation in `options`.
pub fn validate_with<C>(
    config: &MachineConfig<C>,
    options: &ServiceOptions<C>,
) -> Validation<(), NonEmptyVec<ConfigIssue>> {
    let mut checks = structural_checks(config);
    for (name, node) in config.states() {
        for action in named_actions(node) {
            checks.push(check(options.has_action(action), || {
                ConfigIssue::UnresolvedAction {
                    state: name.to_string(),
                    action: action.to_string(),
                }
            }));
        }
    }
    Validation::all_vec(checks).map(|_| ())
}

fn check(ok: bool, issue: impl FnOnce() -> ConfigIssue) -> IssueCheck {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(issue())
    }
}

fn structural_checks<C>(config: &MachineConfig<C>) -> Vec<IssueCheck> {
    let mut checks = Vec::new();

    checks.push(check(config.states().next().is_some(), || {
        ConfigIssue::NoStates
    }));

    if let Some(initial) = config.initial_name() {
        checks.push(check(config.contains(initial), || {
            ConfigIssue::UnknownInitial {
                initial: initial.to_string(),
            }
        }));
    }

    for (name, node) in config.states() {
        for (event, transition) in node.transitions() {
            if let Some(target) = transition.declared_target() {
                checks.push(check(config.contains(target), || {
                    ConfigIssue::UnknownTarget {
                        state: name.to_string(),
                        event: event.to_string(),
                        target: target.to_string(),
                    }
                }));
            }
        }

        for after in node.after_transitions() {
            checks.push(check(config.contains(after.target()), || {
                ConfigIssue::UnknownAfterTarget {
                    state: name.to_string(),
                    delay: after.delay(),
                    target: after.target().to_string(),
                }
            }));
        }

        for always in node.always_transitions() {
            checks.push(check(config.contains(always.target()), || {
                ConfigIssue::UnknownAlwaysTarget {
                    state: name.to_string(),
                    target: always.target().to_string(),
                }
            }));
        }
    }

    checks
}

/// Every named action referenced by a state, in declaration order.
fn named_actions<C>(node: &StateNode<C>) -> Vec<&str> {
    let mut lists: Vec<&Actions<C>> = vec![node.entry_actions(), node.exit_actions()];
    lists.extend(node.transitions().filter_map(|(_, t)| t.actions()));
    lists.extend(node.after_transitions().iter().map(|a| a.transition_actions()));
    lists.extend(node.always_transitions().iter().map(|a| a.transition_actions()));

    let mut names: Vec<&str> = Vec::new();
    for name in lists.into_iter().flat_map(Actions::names) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
