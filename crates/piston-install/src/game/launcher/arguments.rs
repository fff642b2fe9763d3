//! Launch argument expansion from descriptor templates
use crate::game::launcher::rules::{evaluate, Environment, FeatureSet};
use crate::game::version::argument::Argument;
use crate::game::version::descriptor::ArgumentTemplates;
use std::collections::HashMap;

/// JVM arguments for descriptors that only carry a flat game argument string
pub const LEGACY_JVM_ARGUMENTS: [&str; 3] = [
    "-Djava.library.path=${natives_directory}",
    "-cp",
    "${classpath}",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchArguments {
    pub jvm: Vec<String>,
    pub game: Vec<String>,
}

/// Expand argument templates for one launch.
///
/// Conditional arguments are kept only when their rules pass for `env`
/// with `features`; `${name}` placeholders are then substituted.
pub fn build_arguments(
    templates: &ArgumentTemplates,
    env: &Environment,
    features: &FeatureSet,
    variables: &HashMap<String, String>,
) -> LaunchArguments {
    match templates {
        ArgumentTemplates::Structured { game, jvm } => LaunchArguments {
            jvm: expand(jvm, env, features, variables),
            game: expand(game, env, features, variables),
        },
        ArgumentTemplates::Flat(flat) => LaunchArguments {
            jvm: LEGACY_JVM_ARGUMENTS
                .iter()
                .map(|a| substitute_variables(a, variables))
                .collect(),
            game: split_flat(flat)
                .iter()
                .map(|a| substitute_variables(a, variables))
                .collect(),
        },
    }
}

fn expand(
    arguments: &[Argument],
    env: &Environment,
    features: &FeatureSet,
    variables: &HashMap<String, String>,
) -> Vec<String> {
    arguments
        .iter()
        .filter(|arg| evaluate(&arg.rules, env, features))
        .flat_map(|arg| arg.values.iter())
        .map(|value| substitute_variables(value, variables))
        .collect()
}

/// Split a legacy argument string, honouring shell quoting
fn split_flat(flat: &str) -> Vec<String> {
    match shlex::split(flat) {
        Some(parts) => parts,
        None => {
            log::warn!("Unbalanced quoting in legacy arguments, splitting on whitespace");
            flat.split_whitespace().map(str::to_string).collect()
        }
    }
}

/// Replace `${key}` placeholders; unknown placeholders are left as written
pub fn substitute_variables(text: &str, variables: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match variables.get(key) {
                    Some(value) => result.push_str(value),
                    None => result.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::launcher::rules::{OsName, Rule};

    fn vars() -> HashMap<String, String> {
        HashMap::from([
            ("auth_player_name".to_string(), "Steve".to_string()),
            ("classpath".to_string(), "a.jar:b.jar".to_string()),
            ("natives_directory".to_string(), "/n".to_string()),
            ("version_name".to_string(), "1.7.10".to_string()),
        ])
    }

    #[test]
    fn structured_arguments_follow_rules_and_features() {
        let templates = ArgumentTemplates::Structured {
            game: vec![
                Argument::plain("--username"),
                Argument::plain("${auth_player_name}"),
                Argument::conditional(
                    vec!["--demo".into()],
                    vec![Rule::allow().with_feature("is_demo_user", true)],
                ),
            ],
            jvm: vec![
                Argument::conditional(
                    vec!["-XstartOnFirstThread".into()],
                    vec![Rule::allow().with_os_name("osx")],
                ),
                Argument::plain("-cp"),
                Argument::plain("${classpath}"),
            ],
        };

        let linux = Environment::new(OsName::Linux, "x86_64");
        let args = build_arguments(&templates, &linux, &FeatureSet::none(), &vars());
        assert_eq!(args.game, vec!["--username", "Steve"]);
        assert_eq!(args.jvm, vec!["-cp", "a.jar:b.jar"]);

        let mac = Environment::new(OsName::MacOs, "x86_64");
        let demo = FeatureSet::none().with("is_demo_user");
        let args = build_arguments(&templates, &mac, &demo, &vars());
        assert_eq!(args.game.last().map(String::as_str), Some("--demo"));
        assert_eq!(args.jvm[0], "-XstartOnFirstThread");
    }

    #[test]
    fn flat_arguments_are_split_then_substituted() {
        let templates = ArgumentTemplates::Flat(
            "--username ${auth_player_name} --title 'My Game' --version ${version_name}".into(),
        );
        let env = Environment::new(OsName::Linux, "x86_64");
        let args = build_arguments(&templates, &env, &FeatureSet::none(), &vars());
        assert_eq!(
            args.game,
            vec!["--username", "Steve", "--title", "My Game", "--version", "1.7.10"]
        );
        assert_eq!(args.jvm, vec!["-Djava.library.path=/n", "-cp", "a.jar:b.jar"]);
    }

    #[test]
    fn unknown_placeholders_survive() {
        assert_eq!(
            substitute_variables("${a}-${missing}-${b", &HashMap::from([("a".into(), "1".into())])),
            "1-${missing}-${b"
        );
    }
}
