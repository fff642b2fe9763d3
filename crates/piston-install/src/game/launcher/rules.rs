//! Conditional inclusion rules for libraries and launch arguments
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Rule clause for conditional arguments/libraries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub action: RuleAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, bool>>,
}

impl Rule {
    pub fn allow() -> Self {
        Self {
            action: RuleAction::Allow,
            os: None,
            features: None,
        }
    }

    pub fn disallow() -> Self {
        Self {
            action: RuleAction::Disallow,
            os: None,
            features: None,
        }
    }

    pub fn with_os_name(mut self, name: &str) -> Self {
        self.os.get_or_insert_with(OsRule::default).name = Some(name.to_string());
        self
    }

    pub fn with_arch(mut self, arch: &str) -> Self {
        self.os.get_or_insert_with(OsRule::default).arch = Some(arch.to_string());
        self
    }

    pub fn with_feature(mut self, feature: &str, value: bool) -> Self {
        self.features
            .get_or_insert_with(BTreeMap::new)
            .insert(feature.to_string(), value);
        self
    }

    /// Whether every filter on this clause holds for the environment
    fn applies_to(&self, env: &Environment, features: &FeatureSet) -> bool {
        if let Some(ref os_rule) = self.os {
            if let Some(ref name) = os_rule.name {
                if !env.os.matches(name) {
                    return false;
                }
            }
            if let Some(ref arch) = os_rule.arch {
                if arch != &env.arch {
                    return false;
                }
            }
        }

        if let Some(ref required) = self.features {
            for (feature, wanted) in required {
                if features.is_enabled(feature) != *wanted {
                    return false;
                }
            }
        }

        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Carried through for round-tripping; never consulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

/// Operating system families rules can name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsName {
    Windows,
    MacOs,
    Linux,
}

impl OsName {
    pub fn current() -> Self {
        #[cfg(target_os = "windows")]
        return OsName::Windows;

        #[cfg(target_os = "macos")]
        return OsName::MacOs;

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        return OsName::Linux;
    }

    /// Name used as a key in library `natives` maps
    pub fn as_str(&self) -> &'static str {
        match self {
            OsName::Windows => "windows",
            OsName::MacOs => "osx",
            OsName::Linux => "linux",
        }
    }

    /// "osx" and "macos" are two spellings of the same platform.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            OsName::Windows => name == "windows",
            OsName::MacOs => name == "osx" || name == "macos",
            OsName::Linux => name == "linux",
        }
    }
}

/// The platform rules are evaluated against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub os: OsName,
    pub arch: String,
}

impl Environment {
    pub fn new(os: OsName, arch: impl Into<String>) -> Self {
        Self {
            os,
            arch: arch.into(),
        }
    }

    /// Detect the host platform
    pub fn current() -> Self {
        let arch = match std::env::consts::ARCH {
            "x86" => "x86",
            "aarch64" => "arm64",
            "arm" => "arm32",
            other => other,
        };
        Self::new(OsName::current(), arch)
    }

    /// Pointer-width string substituted for `${arch}` in native classifiers
    pub fn arch_bits(&self) -> &'static str {
        match self.arch.as_str() {
            "x86" | "arm32" => "32",
            _ => "64",
        }
    }
}

/// Feature flags enabled for argument evaluation (e.g. `is_demo_user`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    enabled: BTreeSet<String>,
}

impl FeatureSet {
    /// No features; used for library inclusion
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, feature: &str) -> Self {
        self.enabled.insert(feature.to_string());
        self
    }

    pub fn is_enabled(&self, feature: &str) -> bool {
        self.enabled.contains(feature)
    }
}

/// Evaluate a clause list: an empty list passes, otherwise the last clause
/// whose filters match decides, and the result starts out as "does not apply".
pub fn evaluate(rules: &[Rule], env: &Environment, features: &FeatureSet) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        if !rule.applies_to(env, features) {
            continue;
        }
        allowed = rule.action == RuleAction::Allow;
    }

    allowed
}

/// Convenience for optional rule lists as they appear in descriptors
pub fn evaluate_optional(
    rules: Option<&[Rule]>,
    env: &Environment,
    features: &FeatureSet,
) -> bool {
    rules.map_or(true, |r| evaluate(r, env, features))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac() -> Environment {
        Environment::new(OsName::MacOs, "x86_64")
    }

    #[test]
    fn empty_rules_always_pass() {
        assert!(evaluate(&[], &mac(), &FeatureSet::none()));
        assert!(evaluate(&[], &mac(), &FeatureSet::none().with("is_demo_user")));
        assert!(evaluate_optional(None, &mac(), &FeatureSet::none()));
    }

    #[test]
    fn lone_disallow_fails() {
        assert!(!evaluate(&[Rule::disallow()], &mac(), &FeatureSet::none()));
    }

    #[test]
    fn non_matching_clause_is_skipped() {
        let rules = vec![
            Rule::allow().with_os_name("osx"),
            Rule::disallow().with_os_name("windows"),
        ];
        assert!(evaluate(&rules, &mac(), &FeatureSet::none()));
    }

    #[test]
    fn default_stands_when_nothing_matches() {
        let rules = vec![Rule::allow().with_os_name("linux")];
        assert!(!evaluate(&rules, &mac(), &FeatureSet::none()));
    }

    #[test]
    fn last_matching_clause_wins() {
        let rules = vec![Rule::allow(), Rule::disallow().with_os_name("osx")];
        assert!(!evaluate(&rules, &mac(), &FeatureSet::none()));

        let linux = Environment::new(OsName::Linux, "x86_64");
        assert!(evaluate(&rules, &linux, &FeatureSet::none()));

        let rules = vec![Rule::disallow().with_os_name("macos"), Rule::allow()];
        assert!(evaluate(&rules, &mac(), &FeatureSet::none()));
    }

    #[test]
    fn both_mac_spellings_match() {
        for name in ["osx", "macos"] {
            let rules = vec![Rule::allow().with_os_name(name)];
            assert!(evaluate(&rules, &mac(), &FeatureSet::none()), "{name}");
        }
    }

    #[test]
    fn arch_filter_only_matches_host_arch() {
        let rules = vec![Rule::allow().with_arch("x86")];
        assert!(!evaluate(&rules, &mac(), &FeatureSet::none()));
        let x86 = Environment::new(OsName::Windows, "x86");
        assert!(evaluate(&rules, &x86, &FeatureSet::none()));
    }

    #[test]
    fn feature_filters() {
        let rules = vec![Rule::allow().with_feature("has_custom_resolution", true)];
        assert!(!evaluate(&rules, &mac(), &FeatureSet::none()));
        assert!(evaluate(
            &rules,
            &mac(),
            &FeatureSet::none().with("has_custom_resolution")
        ));

        // A feature required to be off matches when it is not enabled
        let rules = vec![Rule::allow().with_feature("is_demo_user", false)];
        assert!(evaluate(&rules, &mac(), &FeatureSet::none()));
        assert!(!evaluate(&rules, &mac(), &FeatureSet::none().with("is_demo_user")));
    }

    #[test]
    fn rule_json_shape() {
        let rule: Rule = serde_json::from_str(
            r#"{"action":"disallow","os":{"name":"osx","version":"^10\\.5\\.\\d$"}}"#,
        )
        .unwrap();
        assert_eq!(rule.action, RuleAction::Disallow);
        assert_eq!(rule.os.as_ref().unwrap().name.as_deref(), Some("osx"));
        assert_eq!(
            serde_json::to_string(&Rule::allow()).unwrap(),
            r#"{"action":"allow"}"#
        );
    }
}
