//! Type and assembly identifiers used throughout the planner.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shape of a referenced type, as far as constructor eligibility cares.
///
/// Only reference types look injectable. Primitives (numbers, strings,
/// booleans) and value types need a factory or manual wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TypeKind {
    /// Class, interface or any other reference type
    #[default]
    Reference,
    /// User-defined value type (struct)
    Value,
    /// Built-in primitive or string
    Primitive,
}

/// Reference to a type by fully-qualified name.
///
/// Identity is the name alone: equality, ordering and hashing ignore the
/// [`TypeKind`]. Ordering is ordinal on the name, which gives the planner
/// its deterministic traversal order.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{TypeRef, TypeKind};
///
/// let a = TypeRef::new("App.Logger");
/// let b = TypeRef::with_kind("App.Logger", TypeKind::Value);
/// assert_eq!(a, b);
/// assert_eq!(a.simple_name(), "Logger");
/// assert!(TypeRef::new("App.A") < TypeRef::new("App.B"));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeRef {
    name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    kind: TypeKind,
}

impl TypeRef {
    /// Creates a reference-type ref.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Reference)
    }

    /// Creates a ref with an explicit kind.
    pub fn with_kind(name: impl Into<String>, kind: TypeKind) -> Self {
        Self { name: name.into(), kind }
    }

    /// Fully-qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type kind carried as data.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Name after the last namespace separator, generic arguments kept.
    pub fn simple_name(&self) -> &str {
        let head_end = self.name.find('<').unwrap_or(self.name.len());
        match self.name[..head_end].rfind(['.', ':']) {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }

    /// Returns true for primitive and value types.
    pub fn is_value_like(&self) -> bool {
        !matches!(self.kind, TypeKind::Reference)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for TypeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::new(name)
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::new(name)
    }
}

/// Identity of a source unit (assembly, crate, compilation unit).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AssemblyRef(String);

impl AssemblyRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssemblyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssemblyRef {
    fn from(name: &str) -> Self {
        AssemblyRef::new(name)
    }
}

/// Key a registration is published under in the container.
///
/// Mirrors how a container looks services up: by concrete type, by
/// interface, or by either of those plus a string key.
///
/// ```rust
/// use ferrous_plan::{ServiceKey, TypeRef};
///
/// let key = ServiceKey::Keyed(TypeRef::new("App.ICache"), "primary".into());
/// assert_eq!(key.service().name(), "App.ICache");
/// assert_eq!(key.key_name(), Some("primary"));
/// assert_eq!(key.to_string(), "App.ICache[primary]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ServiceKey {
    /// Plain service type (concrete or interface)
    Type(TypeRef),
    /// Service type registered under a string key
    Keyed(TypeRef, String),
}

impl ServiceKey {
    /// The service type this key resolves.
    pub fn service(&self) -> &TypeRef {
        match self {
            ServiceKey::Type(ty) | ServiceKey::Keyed(ty, _) => ty,
        }
    }

    /// The string key, if any.
    pub fn key_name(&self) -> Option<&str> {
        match self {
            ServiceKey::Type(_) => None,
            ServiceKey::Keyed(_, key) => Some(key),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKey::Type(ty) => write!(f, "{}", ty),
            ServiceKey::Keyed(ty, key) => write!(f, "{}[{}]", ty, key),
        }
    }
}
