//! Platform rules and launch argument expansion
pub mod arguments;
pub mod rules;

pub use arguments::{build_arguments, substitute_variables, LaunchArguments};
pub use rules::{evaluate, Environment, FeatureSet, OsName, Rule, RuleAction};
