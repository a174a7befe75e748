//! Type classification: role and effective lifetime per candidate.
//!
//! Classification runs once per candidate and yields a plain
//! [`Classification`] value. Everything downstream dispatches on that value
//! instead of looking at markers again.

use std::collections::BTreeMap;
use std::fmt;

use crate::collection::CandidateSet;
use crate::config::FrameworkTypes;
use crate::descriptors::{CandidateType, Marker};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::key::TypeRef;
use crate::lifetime::{EffectiveLifetime, Lifetime};

/// What a candidate type is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Registered service
    Service,
    /// Wraps another implementation of a service it decorates
    Decorator,
    /// Wraps calls to an intercepted target
    Interceptor,
    /// Binds a configuration section
    Options,
    /// Not a registration participant
    None,
}

/// Why a type will not be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// `Excluded` or `NotInjectable` marker
    Marker,
    /// Abstract class or interface
    NotConcrete,
    /// Constructor needs a primitive or value argument
    RequiresFactory { parameter: TypeRef },
    /// Marker set is malformed or contradictory
    InvalidMarkers(String),
    /// Nothing signals service intent (pure plugins)
    NotAService,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Marker => f.write_str("excluded by marker"),
            ExclusionReason::NotConcrete => f.write_str("abstract or interface"),
            ExclusionReason::RequiresFactory { parameter } => {
                write!(f, "constructor parameter '{}' requires a factory", parameter)
            }
            ExclusionReason::InvalidMarkers(reason) => write!(f, "invalid markers: {}", reason),
            ExclusionReason::NotAService => f.write_str("no service intent"),
        }
    }
}

/// Registration outcome of classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Registered(EffectiveLifetime),
    Excluded(ExclusionReason),
}

/// Pre-computed classification of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub role: Role,
    pub disposition: Disposition,
    /// Plugin discovery is independent of registration
    pub plugin: bool,
    /// Implements a disposal contract
    pub disposable: bool,
}

impl Classification {
    pub fn lifetime(&self) -> Option<EffectiveLifetime> {
        match &self.disposition {
            Disposition::Registered(lt) => Some(*lt),
            Disposition::Excluded(_) => None,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self.disposition, Disposition::Excluded(_))
    }

    pub fn exclusion(&self) -> Option<&ExclusionReason> {
        match &self.disposition {
            Disposition::Excluded(reason) => Some(reason),
            Disposition::Registered(_) => None,
        }
    }
}

/// Decides role and lifetime for each candidate.
///
/// Rules apply in priority order:
///
/// 1. exclusion markers exclude;
/// 2. abstract types and interfaces are not registration targets;
/// 3. `DecoratorFor` / `InterceptorFor` / `Options` pick the role;
/// 4. an explicit lifetime is used verbatim;
/// 5. otherwise the role default applies (Singleton for services and options,
///    Transient for decorators and interceptors).
///
/// Plugin discovery is computed separately and ignores exclusion.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{CandidateType, FrameworkTypes, Lifetime, Role, TypeClassifier};
///
/// let framework = FrameworkTypes::default();
/// let classifier = TypeClassifier::new(&framework);
///
/// let repo = CandidateType::class("App.Repo").implements("App.IRepo");
/// let c = classifier.classify(&repo);
/// assert_eq!(c.role, Role::Service);
/// assert_eq!(c.lifetime().map(|lt| lt.lifetime), Some(Lifetime::Singleton));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeClassifier<'a> {
    framework: &'a FrameworkTypes,
}

impl<'a> TypeClassifier<'a> {
    pub fn new(framework: &'a FrameworkTypes) -> Self {
        Self { framework }
    }

    pub fn classify(&self, ty: &CandidateType) -> Classification {
        let plugin = self.is_plugin(ty);
        let disposable = self.is_disposable(ty);
        let excluded = |reason| Classification {
            role: Role::None,
            disposition: Disposition::Excluded(reason),
            plugin,
            disposable,
        };

        if let Err(reason) = self.validate_markers(ty) {
            return excluded(ExclusionReason::InvalidMarkers(reason));
        }
        if ty.has_exclusion_marker() {
            return excluded(ExclusionReason::Marker);
        }
        if !ty.is_concrete() {
            return excluded(ExclusionReason::NotConcrete);
        }

        let role = if !ty.decorator_targets().is_empty() {
            Role::Decorator
        } else if !ty.interceptor_targets().is_empty() {
            Role::Interceptor
        } else if ty.options_section().is_some() {
            Role::Options
        } else if self.has_service_intent(ty, plugin) {
            Role::Service
        } else {
            return excluded(ExclusionReason::NotAService);
        };

        if role != Role::Options && ty.declared_dependencies().is_none() {
            if let Some(parameter) = ty
                .constructor_parameter_types
                .iter()
                .find(|p| self.framework.is_non_injectable(p))
            {
                return Classification {
                    role,
                    disposition: Disposition::Excluded(ExclusionReason::RequiresFactory {
                        parameter: parameter.clone(),
                    }),
                    plugin,
                    disposable,
                };
            }
        }

        let lifetime = match ty.declared_lifetime {
            Some(lt) => EffectiveLifetime::explicit(lt),
            None => EffectiveLifetime::inferred(role_default(role)),
        };

        Classification {
            role,
            disposition: Disposition::Registered(lifetime),
            plugin,
            disposable,
        }
    }

    /// Plugin candidates implement a plugin contract (or carry the plugin
    /// marker) and can be built without arguments.
    pub fn is_plugin(&self, ty: &CandidateType) -> bool {
        let contract = ty.markers.contains(&Marker::PluginRole)
            || ty
                .declared_interfaces
                .iter()
                .chain(&ty.base_types)
                .any(|i| self.framework.is_plugin_contract(i));
        contract && ty.is_concrete() && ty.constructor_parameter_types.is_empty()
    }

    pub fn is_disposable(&self, ty: &CandidateType) -> bool {
        ty.declared_interfaces
            .iter()
            .chain(&ty.base_types)
            .any(|i| self.framework.is_disposal_contract(i))
    }

    /// Interfaces the type may be registered under.
    pub fn service_interfaces<'t>(&self, ty: &'t CandidateType) -> impl Iterator<Item = &'t TypeRef> + 't
    where
        'a: 't,
    {
        let framework = self.framework;
        ty.declared_interfaces
            .iter()
            .filter(move |i| !framework.is_framework_interface(i) && !framework.is_plugin_contract(i))
    }

    fn has_service_intent(&self, ty: &CandidateType, plugin: bool) -> bool {
        if !plugin {
            return true;
        }
        ty.declared_lifetime.is_some()
            || !ty.keys().is_empty()
            || !ty.register_only_as().is_empty()
            || self.service_interfaces(ty).next().is_some()
    }

    fn validate_markers(&self, ty: &CandidateType) -> Result<(), String> {
        let mut problems = Vec::new();

        for marker in &ty.markers {
            if let Marker::Malformed { marker, reason } = marker {
                problems.push(format!("malformed marker '{}': {}", marker, reason));
            }
        }

        let decorates = ty.decorator_targets();
        let intercepts = ty.interceptor_targets();
        if !decorates.is_empty() && !intercepts.is_empty() {
            problems.push("DecoratorFor cannot be combined with InterceptorFor".to_string());
        }
        if ty.options_section().is_some() && (!decorates.is_empty() || !intercepts.is_empty()) {
            problems.push("Options cannot be combined with DecoratorFor or InterceptorFor".to_string());
        }
        for (service, _) in &decorates {
            if !ty.is_assignable_to(service) || *service == &ty.full_name {
                problems.push(format!("DecoratorFor({}) but the type does not implement it", service));
            }
        }
        for target in ty.register_only_as() {
            if !ty.is_assignable_to(target) {
                problems.push(format!("RegisterOnlyAs({}) is not implemented by the type", target));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }
}

fn role_default(role: Role) -> Lifetime {
    match role {
        Role::Decorator | Role::Interceptor => Lifetime::Transient,
        Role::Service | Role::Options | Role::None => Lifetime::Singleton,
    }
}

/// Classification of every candidate in a frozen set.
#[derive(Debug, Clone, Default)]
pub struct Classifications {
    by_type: BTreeMap<TypeRef, Classification>,
}

impl Classifications {
    /// Classifies all candidates. Invalid marker sets produce an error
    /// diagnostic, factory-only constructors an informational one.
    pub fn compute(
        candidates: &CandidateSet,
        classifier: &TypeClassifier<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut by_type = BTreeMap::new();
        for ty in candidates.iter() {
            let classification = classifier.classify(ty);
            match classification.exclusion() {
                Some(ExclusionReason::InvalidMarkers(reason)) => diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::InvalidMarkers,
                        format!("'{}' excluded: {}", ty.full_name, reason),
                    )
                    .with_subject(ty.full_name.clone())
                    .with_unit(ty.source_unit.clone()),
                ),
                Some(reason @ ExclusionReason::RequiresFactory { .. }) => diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::RequiresFactory,
                        format!("'{}' not registered: {}", ty.full_name, reason),
                    )
                    .with_subject(ty.full_name.clone())
                    .with_unit(ty.source_unit.clone()),
                ),
                _ => {}
            }
            tracing::trace!(ty = %ty.full_name, role = ?classification.role, "classified");
            by_type.insert(ty.full_name.clone(), classification);
        }
        Self { by_type }
    }

    pub fn get(&self, ty: &TypeRef) -> Option<&Classification> {
        self.by_type.get(ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeRef, &Classification)> {
        self.by_type.iter()
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::TypeKind;

    fn classify(ty: &CandidateType) -> Classification {
        let framework = FrameworkTypes::default();
        TypeClassifier::new(&framework).classify(ty)
    }

    #[test]
    fn exclusion_marker_wins_over_everything() {
        let ty = CandidateType::class("App.Job")
            .implements("App.IJob")
            .lifetime(Lifetime::Scoped)
            .marker(Marker::Excluded);
        let c = classify(&ty);
        assert_eq!(c.role, Role::None);
        assert_eq!(c.exclusion(), Some(&ExclusionReason::Marker));
    }

    #[test]
    fn explicit_lifetime_is_used_verbatim() {
        let ty = CandidateType::class("App.Repo").lifetime(Lifetime::Scoped);
        assert_eq!(c_lifetime(&ty), Some(EffectiveLifetime::explicit(Lifetime::Scoped)));
    }

    #[test]
    fn inferred_defaults_follow_role() {
        let service = CandidateType::class("App.Repo");
        assert_eq!(c_lifetime(&service), Some(EffectiveLifetime::inferred(Lifetime::Singleton)));

        let decorator = CandidateType::class("App.CachedRepo")
            .implements("App.IRepo")
            .ctor(["App.IRepo"])
            .marker(Marker::DecoratorFor { service: "App.IRepo".into(), order: 1 });
        let c = classify(&decorator);
        assert_eq!(c.role, Role::Decorator);
        assert_eq!(c.lifetime(), Some(EffectiveLifetime::inferred(Lifetime::Transient)));
    }

    #[test]
    fn primitive_parameter_requires_factory() {
        let ty = CandidateType::class("App.Client")
            .param(TypeRef::new("App.ILogger"))
            .param(TypeRef::with_kind("System.Int32", TypeKind::Primitive));
        let c = classify(&ty);
        assert!(matches!(
            c.exclusion(),
            Some(ExclusionReason::RequiresFactory { parameter }) if parameter.name() == "System.Int32"
        ));
    }

    #[test]
    fn declared_dependencies_lift_the_factory_requirement() {
        let ty = CandidateType::class("App.Client")
            .param(TypeRef::with_kind("string", TypeKind::Primitive))
            .marker(Marker::DeclaredDependencies(vec!["App.ILogger".into()]));
        assert!(!classify(&ty).is_excluded());
    }

    #[test]
    fn plugin_discovery_ignores_exclusion() {
        let ty = CandidateType::class("App.Setup")
            .implements("App.IServicePlugin")
            .marker(Marker::Excluded);
        let c = classify(&ty);
        assert!(c.plugin);
        assert!(c.is_excluded());
    }

    #[test]
    fn pure_plugin_is_not_a_service() {
        let ty = CandidateType::class("App.Setup").marker(Marker::PluginRole);
        let c = classify(&ty);
        assert!(c.plugin);
        assert_eq!(c.exclusion(), Some(&ExclusionReason::NotAService));
    }

    #[test]
    fn plugin_needs_zero_argument_constructor() {
        let ty = CandidateType::class("App.Setup")
            .implements("IServicePlugin")
            .ctor(["App.ILogger"]);
        assert!(!classify(&ty).plugin);
    }

    #[test]
    fn contradictory_markers_downgrade_to_excluded() {
        let ty = CandidateType::class("App.Wrapper")
            .implements("App.IRepo")
            .marker(Marker::DecoratorFor { service: "App.IRepo".into(), order: 0 })
            .marker(Marker::InterceptorFor { target: "App.Repo".into(), order: 0 });
        assert!(matches!(classify(&ty).exclusion(), Some(ExclusionReason::InvalidMarkers(_))));

        let not_implemented = CandidateType::class("App.Repo")
            .marker(Marker::RegisterOnlyAs("App.IOther".into()));
        assert!(matches!(
            classify(&not_implemented).exclusion(),
            Some(ExclusionReason::InvalidMarkers(_))
        ));
    }

    #[test]
    fn malformed_marker_is_invalid() {
        let ty = CandidateType::class("App.Repo").marker(Marker::Malformed {
            marker: "Keyed".into(),
            reason: "expected a string argument".into(),
        });
        assert!(matches!(classify(&ty).exclusion(), Some(ExclusionReason::InvalidMarkers(r)) if r.contains("Keyed")));
    }

    #[test]
    fn disposable_via_framework_contract() {
        let ty = CandidateType::class("App.Conn").implements("System.IDisposable");
        assert!(classify(&ty).disposable);
    }

    fn c_lifetime(ty: &CandidateType) -> Option<EffectiveLifetime> {
        classify(ty).lifetime()
    }
}
