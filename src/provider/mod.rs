//! Candidate providers.
//!
//! Two independent sources produce [`CandidateType`] records: live
//! introspection of loaded assembly metadata ([`IntrospectionProvider`]) and
//! static analysis of a symbol table ([`SymbolTableProvider`]). Both decode
//! attributes through [`decode_attributes`] and compute ancestors through
//! [`TypeHierarchy`], so the same logical type set yields identical records
//! from either path.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::FrameworkTypes;
use crate::descriptors::{CandidateType, Marker};
use crate::error::PlanResult;
use crate::key::{AssemblyRef, TypeKind, TypeRef};
use crate::lifetime::Lifetime;

pub mod introspection;
pub mod symbols;

pub use introspection::{IntrospectionProvider, LoadedAssembly, RuntimeParam, RuntimeType, RuntimeTypeKind};
pub use symbols::SymbolTableProvider;

/// Source of candidate types for one unit.
///
/// Providers run on collection worker threads, hence `Send + Sync`.
pub trait CandidateProvider: Send + Sync {
    /// The unit this provider describes.
    fn unit(&self) -> AssemblyRef;

    /// Produces the unit's candidates. Per-type problems become
    /// [`Marker::Malformed`] markers; `Err` is reserved for input that
    /// cannot be read at all.
    fn provide(&self) -> PlanResult<Vec<CandidateType>>;
}

/// Attribute argument as seen in metadata or source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrArg {
    Str(String),
    Int(i64),
    Type(String),
}

/// A declarative attribute attached to a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub args: Vec<AttrArg>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: AttrArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn type_arg(self, name: impl Into<String>) -> Self {
        self.arg(AttrArg::Type(name.into()))
    }

    pub fn str_arg(self, value: impl Into<String>) -> Self {
        self.arg(AttrArg::Str(value.into()))
    }

    pub fn int_arg(self, value: i64) -> Self {
        self.arg(AttrArg::Int(value))
    }

    /// Name without namespace and without a trailing `Attribute`.
    fn short_name(&self) -> &str {
        let name = self.name.rsplit('.').next().unwrap_or(&self.name);
        name.strip_suffix("Attribute").filter(|s| !s.is_empty()).unwrap_or(name)
    }
}

/// Declared lifetime plus markers decoded from an attribute list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedAttributes {
    pub lifetime: Option<Lifetime>,
    pub markers: BTreeSet<Marker>,
}

/// Decodes the shared attribute vocabulary.
///
/// Unknown attributes are ignored. Known attributes with bad arguments, and
/// conflicting lifetime attributes, become [`Marker::Malformed`].
///
/// ```rust
/// use ferrous_plan::provider::{decode_attributes, Attribute};
/// use ferrous_plan::{FrameworkTypes, Lifetime, Marker};
///
/// let decoded = decode_attributes(
///     &[
///         Attribute::new("ScopedAttribute"),
///         Attribute::new("Keyed").str_arg("primary"),
///         Attribute::new("Keyed"),
///     ],
///     &FrameworkTypes::default(),
/// );
/// assert_eq!(decoded.lifetime, Some(Lifetime::Scoped));
/// assert!(decoded.markers.contains(&Marker::Keyed("primary".into())));
/// assert!(decoded.markers.iter().any(|m| matches!(m, Marker::Malformed { .. })));
/// ```
pub fn decode_attributes(attributes: &[Attribute], framework: &FrameworkTypes) -> DecodedAttributes {
    let mut decoded = DecodedAttributes::default();
    let mut lifetimes = BTreeSet::new();

    for attr in attributes {
        let name = attr.short_name();
        let marker = match name {
            "Singleton" | "Scoped" | "Transient" => {
                if attr.args.is_empty() {
                    if let Ok(lt) = name.parse::<Lifetime>() {
                        lifetimes.insert(lt);
                    }
                    continue;
                }
                Err("lifetime attributes take no arguments".to_string())
            }
            "Exclude" | "Excluded" | "ExcludeFromRegistration" => no_args(attr, Marker::Excluded),
            "NotInjectable" => no_args(attr, Marker::NotInjectable),
            "Plugin" => no_args(attr, Marker::PluginRole),
            "DecoratorFor" => type_and_order(attr).map(|(service, order)| Marker::DecoratorFor { service, order }),
            "InterceptorFor" => type_and_order(attr).map(|(target, order)| Marker::InterceptorFor { target, order }),
            "RegisterAs" | "RegisterOnlyAs" => match type_list(attr, framework) {
                Ok(types) if !types.is_empty() => {
                    decoded.markers.extend(types.into_iter().map(Marker::RegisterOnlyAs));
                    continue;
                }
                Ok(_) => Err("expected at least one type argument".to_string()),
                Err(e) => Err(e),
            },
            "Keyed" => match attr.args.as_slice() {
                [AttrArg::Str(key)] => Ok(Marker::Keyed(key.clone())),
                [AttrArg::Int(key)] => Ok(Marker::Keyed(key.to_string())),
                _ => Err("expected one string or integer key".to_string()),
            },
            "Order" => match attr.args.as_slice() {
                [AttrArg::Int(order)] => i32::try_from(*order)
                    .map(Marker::Order)
                    .map_err(|_| format!("order {} out of range", order)),
                _ => Err("expected one integer argument".to_string()),
            },
            "Options" => match attr.args.as_slice() {
                [AttrArg::Str(section)] => Ok(Marker::Options(section.clone())),
                _ => Err("expected one section name".to_string()),
            },
            "DependsOn" => type_list(attr, framework).map(Marker::DeclaredDependencies),
            _ => continue,
        };

        decoded.markers.insert(marker.unwrap_or_else(|reason| Marker::Malformed {
            marker: name.to_string(),
            reason,
        }));
    }

    match lifetimes.len() {
        0 => {}
        1 => decoded.lifetime = lifetimes.into_iter().next(),
        _ => {
            let names: Vec<_> = lifetimes.iter().map(ToString::to_string).collect();
            decoded.markers.insert(Marker::Malformed {
                marker: "Lifetime".to_string(),
                reason: format!("conflicting lifetimes {}", names.join(", ")),
            });
        }
    }

    decoded
}

fn no_args(attr: &Attribute, marker: Marker) -> Result<Marker, String> {
    if attr.args.is_empty() {
        Ok(marker)
    } else {
        Err("takes no arguments".to_string())
    }
}

fn type_and_order(attr: &Attribute) -> Result<(TypeRef, i32), String> {
    match attr.args.as_slice() {
        [AttrArg::Type(ty)] => Ok((TypeRef::new(ty.as_str()), 0)),
        [AttrArg::Type(ty), AttrArg::Int(order)] => i32::try_from(*order)
            .map(|order| (TypeRef::new(ty.as_str()), order))
            .map_err(|_| format!("order {} out of range", order)),
        _ => Err("expected (type) or (type, order)".to_string()),
    }
}

fn type_list(attr: &Attribute, framework: &FrameworkTypes) -> Result<Vec<TypeRef>, String> {
    attr.args
        .iter()
        .map(|arg| match arg {
            AttrArg::Type(name) => Ok(TypeRef::with_kind(name.as_str(), framework.kind_of_name(name))),
            other => Err(format!("expected a type argument, got {:?}", other)),
        })
        .collect()
}

/// Direct supertypes of one declared type.
#[derive(Debug, Clone, Default)]
pub(crate) struct Supertypes {
    pub base: Option<String>,
    pub interfaces: Vec<String>,
}

/// Transitive ancestor computation over declared types.
///
/// Unknown supertypes (outside the declared set) are kept as leaves.
#[derive(Debug, Default)]
pub(crate) struct TypeHierarchy {
    direct: BTreeMap<String, Supertypes>,
}

impl TypeHierarchy {
    pub fn declare(&mut self, name: &str, supertypes: Supertypes) {
        self.direct.insert(name.to_string(), supertypes);
    }

    /// `(base classes, interfaces)` reachable from `name`, excluding itself.
    pub fn ancestors(&self, name: &str) -> (BTreeSet<TypeRef>, BTreeSet<TypeRef>) {
        let mut bases = BTreeSet::new();
        let mut interfaces = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut pending = vec![name.to_string()];

        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(direct) = self.direct.get(&current) else { continue };
            if let Some(base) = &direct.base {
                if base != name {
                    bases.insert(TypeRef::new(base.as_str()));
                }
                pending.push(base.clone());
            }
            for iface in &direct.interfaces {
                if iface != name {
                    interfaces.insert(TypeRef::new(iface.as_str()));
                }
                pending.push(iface.clone());
            }
        }
        (bases, interfaces)
    }
}

/// Picks the constructor with the most parameters; the first one wins ties.
pub(crate) fn widest_constructor<T: Clone>(constructors: &[Vec<T>]) -> Vec<T> {
    let mut best: Option<&Vec<T>> = None;
    for ctor in constructors {
        if best.map_or(true, |b| ctor.len() > b.len()) {
            best = Some(ctor);
        }
    }
    best.cloned().unwrap_or_default()
}

/// Type kind for a parameter name given the set of declared value types.
pub(crate) fn parameter_kind(name: &str, value_types: &BTreeSet<String>, framework: &FrameworkTypes) -> TypeKind {
    if value_types.contains(name) {
        TypeKind::Value
    } else {
        framework.kind_of_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_lifetimes_are_malformed() {
        let decoded = decode_attributes(
            &[Attribute::new("Singleton"), Attribute::new("Transient")],
            &FrameworkTypes::default(),
        );
        assert_eq!(decoded.lifetime, None);
        assert!(decoded
            .markers
            .iter()
            .any(|m| matches!(m, Marker::Malformed { marker, .. } if marker == "Lifetime")));
    }

    #[test]
    fn repeated_same_lifetime_is_fine() {
        let decoded = decode_attributes(
            &[Attribute::new("Scoped"), Attribute::new("App.ScopedAttribute")],
            &FrameworkTypes::default(),
        );
        assert_eq!(decoded.lifetime, Some(Lifetime::Scoped));
        assert!(decoded.markers.is_empty());
    }

    #[test]
    fn decorator_order_defaults_to_zero() {
        let decoded = decode_attributes(
            &[Attribute::new("DecoratorFor").type_arg("App.IRepo")],
            &FrameworkTypes::default(),
        );
        assert!(decoded
            .markers
            .contains(&Marker::DecoratorFor { service: "App.IRepo".into(), order: 0 }));
    }

    #[test]
    fn unknown_attributes_are_ignored() {
        let decoded = decode_attributes(&[Attribute::new("Serializable")], &FrameworkTypes::default());
        assert_eq!(decoded, DecodedAttributes::default());
    }

    #[test]
    fn hierarchy_closes_over_bases_and_interface_inheritance() {
        let mut h = TypeHierarchy::default();
        h.declare("IB", Supertypes { base: None, interfaces: vec!["IA".into()] });
        h.declare("Base", Supertypes { base: None, interfaces: vec!["IB".into()] });
        h.declare("Leaf", Supertypes { base: Some("Base".into()), interfaces: vec!["IC".into()] });

        let (bases, ifaces) = h.ancestors("Leaf");
        assert_eq!(bases.into_iter().map(|t| t.name().to_string()).collect::<Vec<_>>(), ["Base"]);
        assert_eq!(
            ifaces.into_iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
            ["IA", "IB", "IC"]
        );
    }

    #[test]
    fn widest_constructor_prefers_first_on_ties() {
        let ctors = vec![vec!["a"], vec!["b", "c"], vec!["d", "e"]];
        assert_eq!(widest_constructor(&ctors), vec!["b", "c"]);
        assert!(widest_constructor::<&str>(&[]).is_empty());
    }
}
