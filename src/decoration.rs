//! Decorator and interceptor chains.
//!
//! Decorators of a service are grouped by the service they wrap and ordered
//! by their order key, ties broken by type name. The lowest order is the
//! innermost wrapper (it receives the undecorated implementation); the highest
//! is what a consumer resolving the service actually gets. Interceptor chains
//! use exactly the same ordering, keyed by the intercepted target.

use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{Classifications, Role};
use crate::collection::CandidateSet;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::key::TypeRef;

/// `decorator_type` wraps `service_type` at position `order`.
///
/// Identity is structural: two discoveries of the same entry collapse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecoratorEntry {
    pub service_type: TypeRef,
    pub decorator_type: TypeRef,
    pub order: i32,
}

impl DecoratorEntry {
    pub fn new(service_type: impl Into<TypeRef>, decorator_type: impl Into<TypeRef>, order: i32) -> Self {
        Self {
            service_type: service_type.into(),
            decorator_type: decorator_type.into(),
            order,
        }
    }
}

/// Ordered wrappers for one service, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorChain {
    pub service: TypeRef,
    pub entries: Vec<DecoratorEntry>,
}

impl DecoratorChain {
    /// Wraps `original` with each entry in order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_plan::{DecoratorChainResolver, DecoratorEntry, TypeRef};
    ///
    /// let chains = DecoratorChainResolver::new().resolve(vec![
    ///     DecoratorEntry::new("App.IRepo", "App.LoggedRepo", 2),
    ///     DecoratorEntry::new("App.IRepo", "App.CachedRepo", 1),
    /// ]);
    /// let chain = &chains[&TypeRef::new("App.IRepo")];
    ///
    /// let built = chain.apply("Repo".to_string(), |entry, inner| {
    ///     format!("{}({})", entry.decorator_type.simple_name(), inner)
    /// });
    /// assert_eq!(built, "LoggedRepo(CachedRepo(Repo))");
    /// ```
    pub fn apply<T, F>(&self, original: T, mut construct: F) -> T
    where
        F: FnMut(&DecoratorEntry, T) -> T,
    {
        let mut resolved = original;
        for entry in &self.entries {
            resolved = construct(entry, resolved);
        }
        resolved
    }

    /// Wrapper types, innermost first.
    pub fn types(&self) -> impl Iterator<Item = &TypeRef> {
        self.entries.iter().map(|e| &e.decorator_type)
    }

    pub fn innermost(&self) -> Option<&TypeRef> {
        self.entries.first().map(|e| &e.decorator_type)
    }

    pub fn outermost(&self) -> Option<&TypeRef> {
        self.entries.last().map(|e| &e.decorator_type)
    }

    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.entries.iter().any(|e| &e.decorator_type == ty)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every chain of a planning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chains {
    /// Keyed by decorated service
    pub decorators: BTreeMap<TypeRef, DecoratorChain>,
    /// Keyed by intercepted target
    pub interceptors: BTreeMap<TypeRef, DecoratorChain>,
}

impl Chains {
    pub fn decorators_of(&self, service: &TypeRef) -> Option<&DecoratorChain> {
        self.decorators.get(service)
    }

    pub fn interceptors_of(&self, target: &TypeRef) -> Option<&DecoratorChain> {
        self.interceptors.get(target)
    }

    /// Returns true if `ty` appears in any decorator chain.
    pub fn is_decorator(&self, ty: &TypeRef) -> bool {
        self.decorators.values().any(|c| c.contains(ty))
    }

    pub fn is_interceptor(&self, ty: &TypeRef) -> bool {
        self.interceptors.values().any(|c| c.contains(ty))
    }
}

/// Groups and linearizes decorator entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecoratorChainResolver;

impl DecoratorChainResolver {
    pub fn new() -> Self {
        Self
    }

    /// Groups entries by service, sorted by `(order, decorator name)`.
    pub fn resolve<I>(&self, entries: I) -> BTreeMap<TypeRef, DecoratorChain>
    where
        I: IntoIterator<Item = DecoratorEntry>,
    {
        let mut groups: BTreeMap<TypeRef, BTreeSet<(i32, TypeRef)>> = BTreeMap::new();
        for entry in entries {
            groups
                .entry(entry.service_type)
                .or_default()
                .insert((entry.order, entry.decorator_type));
        }

        groups
            .into_iter()
            .map(|(service, ordered)| {
                let entries = ordered
                    .into_iter()
                    .map(|(order, decorator_type)| DecoratorEntry {
                        service_type: service.clone(),
                        decorator_type,
                        order,
                    })
                    .collect();
                (service.clone(), DecoratorChain { service, entries })
            })
            .collect()
    }

    /// Builds decorator and interceptor chains from registered candidates and
    /// warns about decorator groups with nothing to wrap.
    pub fn resolve_candidates(
        &self,
        candidates: &CandidateSet,
        classifications: &Classifications,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Chains {
        let mut decorators = Vec::new();
        let mut interceptors = Vec::new();

        for ty in candidates.iter() {
            let Some(class) = classifications.get(&ty.full_name) else { continue };
            if class.is_excluded() {
                continue;
            }
            match class.role {
                Role::Decorator => decorators.extend(
                    ty.decorator_targets()
                        .into_iter()
                        .map(|(service, order)| DecoratorEntry::new(service.clone(), ty.full_name.clone(), order)),
                ),
                Role::Interceptor => interceptors.extend(
                    ty.interceptor_targets()
                        .into_iter()
                        .map(|(target, order)| DecoratorEntry::new(target.clone(), ty.full_name.clone(), order)),
                ),
                _ => {}
            }
        }

        let chains = Chains {
            decorators: self.resolve(decorators),
            interceptors: self.resolve(interceptors),
        };

        for chain in chains.decorators.values().chain(chains.interceptors.values()) {
            let wrapped = candidates.implementors(&chain.service).any(|impl_ty| {
                !chain.contains(&impl_ty.full_name)
                    && classifications
                        .get(&impl_ty.full_name)
                        .map_or(false, |c| !c.is_excluded() && c.role == Role::Service)
            });
            if wrapped {
                continue;
            }
            let first = chain.innermost().cloned().unwrap_or_else(|| chain.service.clone());
            let unit = candidates.get(&first).map(|c| c.source_unit.clone()).unwrap_or_default();
            let names: Vec<_> = chain.types().map(ToString::to_string).collect();
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::OrphanedDecorator,
                    format!(
                        "No registered implementation of '{}' to wrap; [{}] will never be applied",
                        chain.service,
                        names.join(", ")
                    ),
                )
                .with_subject(first)
                .with_unit(unit),
            );
        }

        tracing::debug!(
            decorated = chains.decorators.len(),
            intercepted = chains.interceptors.len(),
            "resolved chains"
        );
        chains
    }
}
