//! Configuration linting.
//!
//! Building a machine never fails: undefined targets and unknown action
//! names silently degrade to "no transition" and "no-op". This module
//! reports those problems up front. It uses Stillwater's `Validation` to
//! accumulate every issue instead of stopping at the first one.
//!
//! # Example
//!
//! ```rust
//! use waypoint::validation::{validate, ConfigIssue};
//! use waypoint::{MachineConfig, StateNode};
//! use stillwater::validation::Validation;
//!
//! let config: MachineConfig<()> = MachineConfig::new()
//!     .initial("missing")
//!     .state("A", StateNode::new().on("NEXT", "nowhere"));
//!
//! match validate(&config) {
//!     Validation::Failure(issues) => {
//!         assert_eq!(issues.len(), 2);
//!         assert!(issues
//!             .iter()
//!             .any(|i| matches!(i, ConfigIssue::UnknownInitial { .. })));
//!     }
//!     Validation::Success(_) => panic!("expected issues"),
//! }
//! ```

pub mod issues;
pub mod rules;

pub use issues::ConfigIssue;
pub use rules::{validate, validate_with};
