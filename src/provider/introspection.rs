//! Candidates from live type metadata of loaded assemblies.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::FrameworkTypes;
use crate::descriptors::CandidateType;
use crate::error::PlanResult;
use crate::key::{AssemblyRef, TypeKind, TypeRef};

use super::{decode_attributes, widest_constructor, Attribute, CandidateProvider, Supertypes, TypeHierarchy};

/// Declaration kind reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeTypeKind {
    Class,
    AbstractClass,
    Interface,
    Struct,
}

/// Constructor parameter as reported by the runtime, kind included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeParam {
    pub type_name: String,
    pub kind: TypeKind,
}

impl RuntimeParam {
    pub fn reference(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), kind: TypeKind::Reference }
    }

    pub fn value(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), kind: TypeKind::Value }
    }

    pub fn primitive(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), kind: TypeKind::Primitive }
    }
}

/// Runtime metadata for one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeType {
    pub full_name: String,
    pub kind: RuntimeTypeKind,
    pub base_type: Option<String>,
    pub interfaces: Vec<String>,
    /// Public constructor overloads; empty means parameterless
    pub constructors: Vec<Vec<RuntimeParam>>,
    pub attributes: Vec<Attribute>,
}

impl RuntimeType {
    fn with_kind(full_name: impl Into<String>, kind: RuntimeTypeKind) -> Self {
        Self {
            full_name: full_name.into(),
            kind,
            base_type: None,
            interfaces: Vec::new(),
            constructors: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn class(full_name: impl Into<String>) -> Self {
        Self::with_kind(full_name, RuntimeTypeKind::Class)
    }

    pub fn abstract_class(full_name: impl Into<String>) -> Self {
        Self::with_kind(full_name, RuntimeTypeKind::AbstractClass)
    }

    pub fn interface(full_name: impl Into<String>) -> Self {
        Self::with_kind(full_name, RuntimeTypeKind::Interface)
    }

    pub fn value_type(full_name: impl Into<String>) -> Self {
        Self::with_kind(full_name, RuntimeTypeKind::Struct)
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn constructor(mut self, params: Vec<RuntimeParam>) -> Self {
        self.constructors.push(params);
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Metadata of one loaded binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAssembly {
    pub name: String,
    pub types: Vec<RuntimeType>,
}

impl LoadedAssembly {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), types: Vec::new() }
    }

    pub fn with_type(mut self, ty: RuntimeType) -> Self {
        self.types.push(ty);
        self
    }
}

/// Provider backed by runtime metadata.
///
/// Referenced assemblies contribute to ancestor resolution only; their
/// types are not candidates of this unit.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::provider::{Attribute, CandidateProvider, IntrospectionProvider, LoadedAssembly, RuntimeParam, RuntimeType};
/// use ferrous_plan::Lifetime;
///
/// let asm = LoadedAssembly::new("App")
///     .with_type(RuntimeType::interface("App.ILogger"))
///     .with_type(
///         RuntimeType::class("App.Repo")
///             .constructor(vec![RuntimeParam::reference("App.ILogger")])
///             .attribute(Attribute::new("ScopedAttribute")),
///     );
///
/// let candidates = IntrospectionProvider::new(asm).provide().unwrap();
/// let repo = candidates.iter().find(|c| c.full_name.name() == "App.Repo").unwrap();
/// assert_eq!(repo.declared_lifetime, Some(Lifetime::Scoped));
/// assert_eq!(repo.source_unit.name(), "App");
/// ```
#[derive(Debug, Clone)]
pub struct IntrospectionProvider {
    assembly: Arc<LoadedAssembly>,
    references: Vec<Arc<LoadedAssembly>>,
    framework: FrameworkTypes,
}

impl IntrospectionProvider {
    pub fn new(assembly: LoadedAssembly) -> Self {
        Self {
            assembly: Arc::new(assembly),
            references: Vec::new(),
            framework: FrameworkTypes::default(),
        }
    }

    pub fn with_reference(mut self, reference: LoadedAssembly) -> Self {
        self.references.push(Arc::new(reference));
        self
    }

    pub fn with_framework(mut self, framework: FrameworkTypes) -> Self {
        self.framework = framework;
        self
    }

    fn hierarchy(&self) -> TypeHierarchy {
        let mut hierarchy = TypeHierarchy::default();
        for asm in self.references.iter().chain(std::iter::once(&self.assembly)) {
            for ty in &asm.types {
                hierarchy.declare(
                    &ty.full_name,
                    Supertypes {
                        base: ty.base_type.clone(),
                        interfaces: ty.interfaces.clone(),
                    },
                );
            }
        }
        hierarchy
    }

    fn describe(&self, ty: &RuntimeType, hierarchy: &TypeHierarchy) -> CandidateType {
        let (base_types, declared_interfaces) = hierarchy.ancestors(&ty.full_name);
        let decoded = decode_attributes(&ty.attributes, &self.framework);
        let constructor_parameter_types = widest_constructor(&ty.constructors)
            .into_iter()
            .map(|p| {
                // Names listed as primitives win over a reported reference kind
                let kind = match p.kind {
                    TypeKind::Reference => self.framework.kind_of_name(&p.type_name),
                    other => other,
                };
                TypeRef::with_kind(p.type_name, kind)
            })
            .collect();

        CandidateType {
            full_name: TypeRef::new(ty.full_name.as_str()),
            declared_interfaces,
            base_types,
            constructor_parameter_types,
            declared_lifetime: decoded.lifetime,
            is_abstract: matches!(ty.kind, RuntimeTypeKind::AbstractClass | RuntimeTypeKind::Interface),
            is_interface: ty.kind == RuntimeTypeKind::Interface,
            markers: decoded.markers,
            source_unit: AssemblyRef::new(self.assembly.name.as_str()),
        }
    }
}

impl CandidateProvider for IntrospectionProvider {
    fn unit(&self) -> AssemblyRef {
        AssemblyRef::new(self.assembly.name.as_str())
    }

    fn provide(&self) -> PlanResult<Vec<CandidateType>> {
        let hierarchy = self.hierarchy();
        let mut seen = BTreeSet::new();
        let candidates = self
            .assembly
            .types
            .iter()
            .filter(|ty| seen.insert(ty.full_name.as_str()))
            .map(|ty| self.describe(ty, &hierarchy))
            .collect::<Vec<_>>();
        tracing::debug!(unit = %self.assembly.name, count = candidates.len(), "introspected assembly");
        Ok(candidates)
    }
}
