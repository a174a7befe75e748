//! Registration plan assembly and cross-unit merge.
//!
//! The plan is the only output a container populator or a code emitter
//! needs. It holds one [`RegistrationPlanEntry`] per registered
//! implementation; [`RegistrationPlan::registrations`] expands those into the
//! flat list of service registrations in application order.
//!
//! Singleton sharing is structural: an implementation's factory is registered
//! once under its primary key and every other service type it is exposed as
//! forwards to that key, so all of them resolve the same instance.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::assembly_order::{AssemblyOrderResolver, AssemblyOrderSpec};
use crate::classify::{Classifications, Role, TypeClassifier};
use crate::collection::CandidateSet;
use crate::decoration::Chains;
use crate::descriptors::CandidateType;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::key::{AssemblyRef, ServiceKey, TypeRef};
use crate::lifetime::Lifetime;
use crate::plugins::PluginEntry;

/// How a registration produces its instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FactoryDescriptor {
    /// Call the constructor with these parameter types
    Constructor { parameters: Vec<TypeRef> },
    /// Construct, then wrap in interceptors, innermost first
    Intercepted {
        implementation: TypeRef,
        parameters: Vec<TypeRef>,
        interceptors: Vec<TypeRef>,
    },
    /// Bind a configuration section
    Options { section: String },
    /// Resolve another registration (same instance for singletons)
    Forward { target: ServiceKey },
    /// Resolve `inner`, then wrap it in `chain`, innermost first
    Decorated {
        implementation: TypeRef,
        inner: ServiceKey,
        chain: Vec<TypeRef>,
    },
}

/// A service type an implementation provides through a wrapper chain.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecoratedService {
    pub service: TypeRef,
    /// Decorators innermost first, then interceptors of the service
    pub chain: Vec<TypeRef>,
}

/// Registration decision for one implementation type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegistrationPlanEntry {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub ty: TypeRef,
    pub lifetime: Lifetime,
    /// Service types the implementation is exposed as, besides itself
    pub interfaces: Vec<TypeRef>,
    pub factory: FactoryDescriptor,
    pub keys: Vec<String>,
    /// Registered under its own type
    pub register_self: bool,
    /// Services reached through a decorator or interceptor chain
    pub decorated: Vec<DecoratedService>,
    pub unit: AssemblyRef,
}

impl RegistrationPlanEntry {
    /// Key the factory is registered under; everything else forwards here.
    pub fn primary_key(&self) -> ServiceKey {
        match self.interfaces.first() {
            Some(first) if !self.register_self => ServiceKey::Type(first.clone()),
            _ => ServiceKey::Type(self.ty.clone()),
        }
    }

    /// Every service type this entry is directly registered under.
    pub fn service_types(&self) -> impl Iterator<Item = &TypeRef> {
        let own = self.register_self.then_some(&self.ty);
        own.into_iter().chain(&self.interfaces)
    }

    /// Expands the entry into service registrations.
    pub fn registrations(&self) -> Vec<ServiceRegistration> {
        let primary = self.primary_key();
        let forward = |key: ServiceKey| ServiceRegistration {
            key,
            lifetime: self.lifetime,
            implementation: self.ty.clone(),
            factory: FactoryDescriptor::Forward { target: primary.clone() },
        };

        let mut out = vec![ServiceRegistration {
            key: primary.clone(),
            lifetime: self.lifetime,
            implementation: self.ty.clone(),
            factory: self.factory.clone(),
        }];
        for service in self.service_types() {
            let key = ServiceKey::Type(service.clone());
            if key != primary {
                out.push(forward(key));
            }
        }
        for decorated in &self.decorated {
            out.push(ServiceRegistration {
                key: ServiceKey::Type(decorated.service.clone()),
                lifetime: self.lifetime,
                implementation: self.ty.clone(),
                factory: FactoryDescriptor::Decorated {
                    implementation: self.ty.clone(),
                    inner: primary.clone(),
                    chain: decorated.chain.clone(),
                },
            });
        }
        for key in &self.keys {
            for service in self.service_types() {
                out.push(forward(ServiceKey::Keyed(service.clone(), key.clone())));
            }
        }
        out
    }
}

/// One flattened container registration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ServiceRegistration {
    pub key: ServiceKey,
    pub lifetime: Lifetime,
    pub implementation: TypeRef,
    pub factory: FactoryDescriptor,
}

/// The validated output of a planning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegistrationPlan {
    pub entries: Vec<RegistrationPlanEntry>,
    /// Plugins to run once, in execution order
    pub plugins: Vec<PluginEntry>,
}

impl RegistrationPlan {
    pub fn entry(&self, ty: &TypeRef) -> Option<&RegistrationPlanEntry> {
        self.entries.iter().find(|e| &e.ty == ty)
    }

    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.entry(ty).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registrations in application order.
    pub fn registrations(&self) -> Vec<ServiceRegistration> {
        self.entries.iter().flat_map(RegistrationPlanEntry::registrations).collect()
    }

    /// Implementations registered under `service`, decorated ones included.
    pub fn implementations_of<'p>(&'p self, service: &'p TypeRef) -> impl Iterator<Item = &'p TypeRef> + 'p {
        self.entries
            .iter()
            .filter(move |e| e.service_types().any(|s| s == service) || e.decorated.iter().any(|d| &d.service == service))
            .map(|e| &e.ty)
    }
}

/// Turns classifications and chains into the final plan.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{
///     CandidateSet, CandidateType, Classifications, DecoratorChainResolver, FrameworkTypes,
///     Lifetime, RegistrationPlanAssembler, TypeClassifier, TypeRef,
/// };
///
/// let candidates: CandidateSet = vec![
///     CandidateType::interface("App.ILogger"),
///     CandidateType::class("App.Logger").implements("App.ILogger").implements("System.IDisposable"),
/// ]
/// .into_iter()
/// .collect();
/// let framework = FrameworkTypes::default();
/// let classifier = TypeClassifier::new(&framework);
/// let mut diagnostics = Vec::new();
/// let classes = Classifications::compute(&candidates, &classifier, &mut diagnostics);
/// let chains = DecoratorChainResolver::new().resolve_candidates(&candidates, &classes, &mut diagnostics);
///
/// let plan = RegistrationPlanAssembler::new(&candidates, &classes, &chains, classifier).assemble(Vec::new());
/// let logger = plan.entry(&"App.Logger".into()).unwrap();
/// assert_eq!(logger.lifetime, Lifetime::Singleton);
/// assert_eq!(logger.interfaces, vec![TypeRef::new("App.ILogger")]);
/// ```
pub struct RegistrationPlanAssembler<'a> {
    candidates: &'a CandidateSet,
    classifications: &'a Classifications,
    chains: &'a Chains,
    classifier: TypeClassifier<'a>,
}

impl<'a> RegistrationPlanAssembler<'a> {
    pub fn new(
        candidates: &'a CandidateSet,
        classifications: &'a Classifications,
        chains: &'a Chains,
        classifier: TypeClassifier<'a>,
    ) -> Self {
        Self {
            candidates,
            classifications,
            chains,
            classifier,
        }
    }

    /// Builds the plan; entries come out in ordinal name order.
    pub fn assemble(&self, plugins: Vec<PluginEntry>) -> RegistrationPlan {
        let entries: Vec<_> = self
            .candidates
            .iter()
            .filter_map(|ty| self.entry_for(ty))
            .collect();
        tracing::debug!(entries = entries.len(), plugins = plugins.len(), "assembled registration plan");
        RegistrationPlan { entries, plugins }
    }

    fn entry_for(&self, ty: &CandidateType) -> Option<RegistrationPlanEntry> {
        let class = self.classifications.get(&ty.full_name)?;
        let lifetime = class.lifetime()?;
        let factory = match class.role {
            Role::Service | Role::Decorator => match self.chains.interceptors_of(&ty.full_name) {
                Some(chain) => FactoryDescriptor::Intercepted {
                    implementation: ty.full_name.clone(),
                    parameters: ty.dependency_types().to_vec(),
                    interceptors: chain.types().cloned().collect(),
                },
                None => FactoryDescriptor::Constructor {
                    parameters: ty.dependency_types().to_vec(),
                },
            },
            Role::Options => FactoryDescriptor::Options {
                section: ty.options_section().unwrap_or_default().to_string(),
            },
            // Interceptors are constructed by the chains that use them
            Role::Interceptor | Role::None => return None,
        };
        // A decorator is never registered directly under the service it wraps
        let wrapped: Vec<&TypeRef> = ty.decorator_targets().into_iter().map(|(service, _)| service).collect();

        let restricted = ty.register_only_as();
        let (mut register_self, exposed): (bool, BTreeSet<TypeRef>) = if restricted.is_empty() {
            (true, self.classifier.service_interfaces(ty).cloned().collect())
        } else {
            (
                restricted.iter().any(|t| **t == ty.full_name),
                restricted
                    .into_iter()
                    .filter(|t| **t != ty.full_name)
                    .cloned()
                    .collect(),
            )
        };

        let mut interfaces = Vec::new();
        let mut decorated = Vec::new();
        for service in exposed.into_iter().filter(|s| !wrapped.contains(&s)) {
            let chain = self.wrapper_chain(&service);
            if chain.is_empty() {
                interfaces.push(service);
            } else {
                decorated.push(DecoratedService { service, chain });
            }
        }
        // The wrapped instance needs a home when every exposed type is decorated
        if !register_self && interfaces.is_empty() {
            register_self = true;
        }

        let mut keys: Vec<String> = ty.keys().into_iter().map(str::to_string).collect();
        keys.sort();

        Some(RegistrationPlanEntry {
            ty: ty.full_name.clone(),
            lifetime: lifetime.lifetime,
            interfaces,
            factory,
            keys,
            register_self,
            decorated,
            unit: ty.source_unit.clone(),
        })
    }

    fn wrapper_chain(&self, service: &TypeRef) -> Vec<TypeRef> {
        let decorators = self.chains.decorators_of(service).into_iter().flat_map(|c| c.types());
        let interceptors = self.chains.interceptors_of(service).into_iter().flat_map(|c| c.types());
        decorators.chain(interceptors).cloned().collect()
    }
}

/// Merges independently planned units.
///
/// Units are processed in the order `spec` resolves their names to. The first
/// registration of a type wins; a later, different registration of the same
/// type is reported as informational and dropped. Plugins are deduplicated
/// by type across units.
pub fn merge_plans<I>(units: I, spec: &AssemblyOrderSpec, diagnostics: &mut Vec<Diagnostic>) -> RegistrationPlan
where
    I: IntoIterator<Item = (AssemblyRef, RegistrationPlan)>,
{
    let mut by_unit: BTreeMap<AssemblyRef, Vec<RegistrationPlan>> = BTreeMap::new();
    for (unit, plan) in units {
        by_unit.entry(unit).or_default().push(plan);
    }
    let order = AssemblyOrderResolver::new(spec.clone()).resolve(by_unit.keys().cloned());

    let mut merged = RegistrationPlan::default();
    let mut seen: BTreeMap<TypeRef, usize> = BTreeMap::new();
    let mut plugins = Vec::new();

    for unit in order {
        let Some(plans) = by_unit.remove(&unit) else { continue };
        for plan in plans {
            for entry in plan.entries {
                match seen.get(&entry.ty) {
                    None => {
                        seen.insert(entry.ty.clone(), merged.entries.len());
                        merged.entries.push(entry);
                    }
                    Some(&idx) => {
                        let kept = &merged.entries[idx];
                        if !same_registration(kept, &entry) {
                            diagnostics.push(
                                Diagnostic::new(
                                    DiagnosticCode::DuplicateRegistration,
                                    format!(
                                        "'{}' planned differently by '{}' and '{}'; keeping the registration from '{}'",
                                        entry.ty, kept.unit, unit, kept.unit
                                    ),
                                )
                                .with_subject(entry.ty.clone())
                                .with_unit(unit.clone()),
                            );
                        }
                    }
                }
            }
            plugins.extend(plan.plugins);
        }
    }

    merged.plugins = crate::plugins::PluginDeduplicator::unique(plugins);
    tracing::debug!(entries = merged.entries.len(), "merged unit plans");
    merged
}

fn same_registration(a: &RegistrationPlanEntry, b: &RegistrationPlanEntry) -> bool {
    a.lifetime == b.lifetime
        && a.interfaces == b.interfaces
        && a.factory == b.factory
        && a.keys == b.keys
        && a.register_self == b.register_self
        && a.decorated == b.decorated
}
