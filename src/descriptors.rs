//! Candidate type descriptors: the frozen input of a planning pass.

use std::collections::BTreeSet;

use crate::key::{AssemblyRef, TypeRef};
use crate::lifetime::Lifetime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Declarative marker attached to a candidate type.
///
/// Markers are plain data decoded once by a provider. Nothing downstream
/// re-inspects the source metadata; the classifier turns the marker set into
/// a [`Classification`](crate::classify::Classification) value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Marker {
    /// Never register this type
    Excluded,
    /// Not an injectable service (treated like `Excluded` for registration)
    NotInjectable,
    /// Decorates `service`; lower orders wrap closer to the implementation
    DecoratorFor { service: TypeRef, order: i32 },
    /// Intercepts calls to `target`; ordered like decorators
    InterceptorFor { target: TypeRef, order: i32 },
    /// Register only under this type (repeatable)
    RegisterOnlyAs(TypeRef),
    /// Additional keyed registration
    Keyed(String),
    /// Declares the plugin contract directly
    PluginRole,
    /// Use these types as constructor dependencies instead of the visible constructor
    DeclaredDependencies(Vec<TypeRef>),
    /// Options binder for a configuration section
    Options(String),
    /// Relative execution order (plugins)
    Order(i32),
    /// A marker the provider found but could not decode
    Malformed { marker: String, reason: String },
}

impl Marker {
    /// Returns true for markers that suppress service registration.
    pub fn is_exclusion(&self) -> bool {
        matches!(self, Marker::Excluded | Marker::NotInjectable)
    }
}

/// A type eligible for classification, as delivered by a provider.
///
/// Both providers must produce structurally identical records for the same
/// logical type, so every field is plain data with a canonical ordering.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{CandidateType, Lifetime, Marker};
///
/// let repo = CandidateType::class("App.Repo")
///     .implements("App.IRepo")
///     .ctor(["App.ILogger"])
///     .lifetime(Lifetime::Scoped)
///     .marker(Marker::Keyed("main".into()))
///     .in_unit("App.Data");
///
/// assert!(repo.is_concrete());
/// assert!(repo.is_assignable_to(&"App.IRepo".into()));
/// assert_eq!(repo.keys(), vec!["main"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CandidateType {
    pub full_name: TypeRef,
    /// All implemented interfaces, inherited ones included
    pub declared_interfaces: BTreeSet<TypeRef>,
    /// All ancestor classes, transitively
    pub base_types: BTreeSet<TypeRef>,
    pub constructor_parameter_types: Vec<TypeRef>,
    pub declared_lifetime: Option<Lifetime>,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub markers: BTreeSet<Marker>,
    pub source_unit: AssemblyRef,
}

impl CandidateType {
    /// A concrete class with no interfaces and a parameterless constructor.
    pub fn class(full_name: impl Into<TypeRef>) -> Self {
        Self {
            full_name: full_name.into(),
            declared_interfaces: BTreeSet::new(),
            base_types: BTreeSet::new(),
            constructor_parameter_types: Vec::new(),
            declared_lifetime: None,
            is_abstract: false,
            is_interface: false,
            markers: BTreeSet::new(),
            source_unit: AssemblyRef::default(),
        }
    }

    /// An interface type.
    pub fn interface(full_name: impl Into<TypeRef>) -> Self {
        Self { is_interface: true, is_abstract: true, ..Self::class(full_name) }
    }

    /// An abstract class.
    pub fn abstract_class(full_name: impl Into<TypeRef>) -> Self {
        Self { is_abstract: true, ..Self::class(full_name) }
    }

    pub fn implements(mut self, interface: impl Into<TypeRef>) -> Self {
        self.declared_interfaces.insert(interface.into());
        self
    }

    pub fn extends(mut self, base: impl Into<TypeRef>) -> Self {
        self.base_types.insert(base.into());
        self
    }

    /// Replaces the constructor with reference-typed parameters.
    pub fn ctor<I, T>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeRef>,
    {
        self.constructor_parameter_types = params.into_iter().map(Into::into).collect();
        self
    }

    /// Appends one constructor parameter, keeping its kind.
    pub fn param(mut self, param: TypeRef) -> Self {
        self.constructor_parameter_types.push(param);
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.declared_lifetime = Some(lifetime);
        self
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.insert(marker);
        self
    }

    pub fn in_unit(mut self, unit: impl Into<AssemblyRef>) -> Self {
        self.source_unit = unit.into();
        self
    }

    /// Neither abstract nor an interface.
    pub fn is_concrete(&self) -> bool {
        !self.is_abstract && !self.is_interface
    }

    /// True if a value of this type can stand in for `target`.
    pub fn is_assignable_to(&self, target: &TypeRef) -> bool {
        &self.full_name == target
            || self.declared_interfaces.contains(target)
            || self.base_types.contains(target)
    }

    pub fn has_exclusion_marker(&self) -> bool {
        self.markers.iter().any(Marker::is_exclusion)
    }

    /// `(service, order)` pairs from `DecoratorFor` markers.
    pub fn decorator_targets(&self) -> Vec<(&TypeRef, i32)> {
        self.markers
            .iter()
            .filter_map(|m| match m {
                Marker::DecoratorFor { service, order } => Some((service, *order)),
                _ => None,
            })
            .collect()
    }

    /// `(target, order)` pairs from `InterceptorFor` markers.
    pub fn interceptor_targets(&self) -> Vec<(&TypeRef, i32)> {
        self.markers
            .iter()
            .filter_map(|m| match m {
                Marker::InterceptorFor { target, order } => Some((target, *order)),
                _ => None,
            })
            .collect()
    }

    pub fn register_only_as(&self) -> Vec<&TypeRef> {
        self.markers
            .iter()
            .filter_map(|m| match m {
                Marker::RegisterOnlyAs(ty) => Some(ty),
                _ => None,
            })
            .collect()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.markers
            .iter()
            .filter_map(|m| match m {
                Marker::Keyed(key) => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn declared_dependencies(&self) -> Option<&[TypeRef]> {
        self.markers.iter().find_map(|m| match m {
            Marker::DeclaredDependencies(types) => Some(types.as_slice()),
            _ => None,
        })
    }

    pub fn options_section(&self) -> Option<&str> {
        self.markers.iter().find_map(|m| match m {
            Marker::Options(section) => Some(section.as_str()),
            _ => None,
        })
    }

    pub fn order(&self) -> i32 {
        self.markers
            .iter()
            .find_map(|m| match m {
                Marker::Order(order) => Some(*order),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Dependency types used for edges: declared ones win over the constructor.
    pub fn dependency_types(&self) -> &[TypeRef] {
        self.declared_dependencies()
            .unwrap_or(&self.constructor_parameter_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_dependencies_override_constructor() {
        let ty = CandidateType::class("App.Clock")
            .ctor(["System.Int32"])
            .marker(Marker::DeclaredDependencies(vec!["App.ITimeSource".into()]));
        let deps: Vec<_> = ty.dependency_types().iter().map(|t| t.name()).collect();
        assert_eq!(deps, ["App.ITimeSource"]);
    }

    #[test]
    fn interface_is_not_concrete() {
        let iface = CandidateType::interface("App.ILogger");
        assert!(!iface.is_concrete());
        assert!(iface.is_interface);
        assert!(!CandidateType::abstract_class("App.Base").is_concrete());
    }

    #[test]
    fn marker_accessors_are_sorted_by_marker_order() {
        let ty = CandidateType::class("App.Cache")
            .marker(Marker::Keyed("b".into()))
            .marker(Marker::Keyed("a".into()))
            .marker(Marker::Order(5));
        assert_eq!(ty.keys(), vec!["a", "b"]);
        assert_eq!(ty.order(), 5);
        assert!(!ty.has_exclusion_marker());
    }
}
