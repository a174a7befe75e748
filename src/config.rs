//! Planner configuration.
//!
//! Configuration comes from three layers, applied in order: built-in
//! defaults, an optional JSON document (feature `config`), and environment
//! variable overrides under a caller-chosen prefix.

use std::env;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::assembly_order::{AssemblyOrderSpec, AssemblyPreset};
use crate::error::{PlanError, PlanResult};
use crate::key::{TypeKind, TypeRef};

/// Name patterns recognising framework-provided types.
///
/// A pattern matches a type when it equals the type's full or simple name.
/// A trailing `*` turns it into a prefix match (`Func<*`, `System.*`).
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{FrameworkTypes, TypeRef};
///
/// let fw = FrameworkTypes::default();
/// assert!(fw.is_framework_parameter(&TypeRef::new("Func<App.Repo>")));
/// assert!(fw.is_disposal_contract(&TypeRef::new("System.IDisposable")));
/// assert!(!fw.is_framework_interface(&TypeRef::new("App.ILogger")));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameworkTypes {
    /// Factory, lazy and provider parameter types; never produce edges
    pub parameter_patterns: Vec<String>,
    /// Interfaces that do not signal service intent and are never registered
    pub interface_patterns: Vec<String>,
    /// Interfaces marking a type as disposable
    pub disposal_contracts: Vec<String>,
    /// Interfaces marking a type as a plugin
    pub plugin_contracts: Vec<String>,
    /// Names treated as primitives regardless of the reported kind
    pub primitive_names: Vec<String>,
}

impl Default for FrameworkTypes {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            parameter_patterns: owned(&[
                "IServiceProvider",
                "IServiceScopeFactory",
                "Func<*",
                "Lazy<*",
                "Factory<*",
                "Provider<*",
            ]),
            interface_patterns: owned(&[
                "IDisposable",
                "IAsyncDisposable",
                "IEquatable<*",
                "IComparable*",
                "System.*",
            ]),
            disposal_contracts: owned(&["IDisposable", "IAsyncDisposable"]),
            plugin_contracts: owned(&["IServicePlugin", "IRegistrationPlugin"]),
            primitive_names: owned(&[
                "bool", "byte", "sbyte", "char", "short", "ushort", "int", "uint", "long",
                "ulong", "float", "double", "decimal", "string", "object",
                "System.Boolean", "System.Byte", "System.Char", "System.Int16",
                "System.Int32", "System.Int64", "System.Single", "System.Double",
                "System.Decimal", "System.String", "System.Guid", "System.TimeSpan",
                "System.DateTime",
            ]),
        }
    }
}

impl FrameworkTypes {
    pub fn is_framework_parameter(&self, ty: &TypeRef) -> bool {
        any_matches(&self.parameter_patterns, ty)
    }

    pub fn is_framework_interface(&self, ty: &TypeRef) -> bool {
        any_matches(&self.interface_patterns, ty)
    }

    pub fn is_disposal_contract(&self, ty: &TypeRef) -> bool {
        any_matches(&self.disposal_contracts, ty)
    }

    pub fn is_plugin_contract(&self, ty: &TypeRef) -> bool {
        any_matches(&self.plugin_contracts, ty)
    }

    /// Primitive or value parameter that needs a factory.
    pub fn is_non_injectable(&self, ty: &TypeRef) -> bool {
        ty.is_value_like() || any_matches(&self.primitive_names, ty)
    }

    /// Kind for a bare type name, used by providers that only see names.
    pub fn kind_of_name(&self, name: &str) -> TypeKind {
        if any_matches(&self.primitive_names, &TypeRef::new(name)) {
            TypeKind::Primitive
        } else {
            TypeKind::Reference
        }
    }
}

fn any_matches(patterns: &[String], ty: &TypeRef) -> bool {
    patterns
        .iter()
        .any(|p| pattern_matches(p, ty.name()) || pattern_matches(p, ty.simple_name()))
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

/// Options for one planning pass.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::PlannerConfig;
///
/// let config = PlannerConfig::default();
/// assert!(!config.treat_warnings_as_fatal);
/// assert!(config.strict_disposable_check);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlannerConfig {
    /// Escalate warnings to a failure when the plan is applied
    pub treat_warnings_as_fatal: bool,
    /// Run the explicit-lifetime disposable-captive sub-check
    pub strict_disposable_check: bool,
    /// Cross-unit processing order
    pub assembly_order: AssemblyOrderSpec,
    /// Framework type recognition
    pub framework: FrameworkTypes,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            treat_warnings_as_fatal: false,
            strict_disposable_check: true,
            assembly_order: AssemblyOrderSpec::default(),
            framework: FrameworkTypes::default(),
        }
    }
}

impl PlannerConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> PlanResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON file.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Applies overrides from process environment variables under `prefix`.
    pub fn with_env_overrides(self, prefix: &str) -> PlanResult<Self> {
        self.with_overrides_from(&EnvironmentSource::with_prefix(prefix))
    }

    /// Applies overrides from any key/value source.
    pub fn with_overrides_from(mut self, source: &dyn ConfigSource) -> PlanResult<Self> {
        if let Some(value) = source.get("treat_warnings_as_fatal") {
            self.treat_warnings_as_fatal = parse_bool("treat_warnings_as_fatal", &value)?;
        }
        if let Some(value) = source.get("strict_disposable_check") {
            self.strict_disposable_check = parse_bool("strict_disposable_check", &value)?;
        }
        if let Some(value) = source.get("assembly_first") {
            self.assembly_order.first = split_list(&value);
        }
        if let Some(value) = source.get("assembly_last") {
            self.assembly_order.last = split_list(&value);
        }
        if let Some(value) = source.get("assembly_preset") {
            self.assembly_order.preset = value
                .parse::<AssemblyPreset>()
                .map_err(PlanError::Config)?;
        }
        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> PlanResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(PlanError::Config(format!("{} expects a boolean, got '{}'", key, other))),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Key/value source for configuration overrides
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a raw value by lower-case key
    fn get(&self, key: &str) -> Option<String>;
}

/// Environment variable configuration source
///
/// Keys are upper-cased and joined to the prefix with `_`, so
/// `treat_warnings_as_fatal` under prefix `plan` reads
/// `PLAN_TREAT_WARNINGS_AS_FATAL`.
#[derive(Debug, Default)]
pub struct EnvironmentSource {
    prefix: Option<String>,
}

impl EnvironmentSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()) }
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(self.env_key(key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct MapSource(HashMap<String, String>);

    impl ConfigSource for MapSource {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
    }

    fn source(pairs: &[(&str, &str)]) -> MapSource {
        MapSource(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn prefix_patterns_match_simple_and_full_names() {
        let fw = FrameworkTypes::default();
        assert!(fw.is_framework_parameter(&TypeRef::new("System.Lazy<App.Repo>")));
        assert!(fw.is_framework_interface(&TypeRef::new("System.Collections.IEnumerable")));
        assert!(fw.is_plugin_contract(&TypeRef::new("App.Hosting.IServicePlugin")));
        assert!(!fw.is_framework_parameter(&TypeRef::new("App.FuncRunner")));
    }

    #[test]
    fn primitive_names_are_non_injectable() {
        let fw = FrameworkTypes::default();
        assert!(fw.is_non_injectable(&TypeRef::new("string")));
        assert!(fw.is_non_injectable(&TypeRef::with_kind("App.Money", TypeKind::Value)));
        assert!(!fw.is_non_injectable(&TypeRef::new("App.Repo")));
        assert_eq!(fw.kind_of_name("System.Int32"), TypeKind::Primitive);
    }

    #[test]
    fn overrides_replace_lists_and_flags() {
        let config = PlannerConfig::default()
            .with_overrides_from(&source(&[
                ("treat_warnings_as_fatal", "yes"),
                ("assembly_first", "Core, Web ,"),
                ("assembly_preset", "tests-last"),
            ]))
            .unwrap();
        assert!(config.treat_warnings_as_fatal);
        assert_eq!(config.assembly_order.first, ["Core", "Web"]);
        assert_eq!(config.assembly_order.preset, AssemblyPreset::TestsLast);
    }

    #[test]
    fn bad_boolean_is_a_config_error() {
        let err = PlannerConfig::default()
            .with_overrides_from(&source(&[("strict_disposable_check", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, PlanError::Config(_)));
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = PlannerConfig::from_json_str(
            r#"{ "treat_warnings_as_fatal": true, "assembly_order": { "last": ["Legacy"] } }"#,
        )
        .unwrap();
        assert!(config.treat_warnings_as_fatal);
        assert!(config.strict_disposable_check);
        assert_eq!(config.assembly_order.last, ["Legacy"]);
        assert_eq!(config.framework, FrameworkTypes::default());
    }
}
