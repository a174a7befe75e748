//! Service lifetime definitions.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Service lifetimes controlling instance reuse
///
/// Lifetimes are ordered by how long an instance lives:
/// `Transient < Scoped < Singleton`. A consumer may safely hold a dependency
/// of equal or greater rank; holding a lower-ranked one makes it captive.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::Lifetime;
///
/// assert!(Lifetime::Singleton.rank() > Lifetime::Scoped.rank());
/// assert!(Lifetime::Singleton.outlives(Lifetime::Transient));
/// assert!(!Lifetime::Transient.outlives(Lifetime::Singleton));
/// assert_eq!("scoped".parse::<Lifetime>(), Ok(Lifetime::Scoped));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Lifetime {
    /// Single instance per root container, shared everywhere
    Singleton,
    /// Single instance per scope
    Scoped,
    /// New instance per resolution
    Transient,
}

impl Lifetime {
    /// Rank used for captive-dependency comparisons.
    pub const fn rank(self) -> u8 {
        match self {
            Lifetime::Transient => 0,
            Lifetime::Scoped => 1,
            Lifetime::Singleton => 2,
        }
    }

    /// Returns true if an instance with this lifetime lives strictly longer
    /// than one with `other`.
    pub const fn outlives(self, other: Lifetime) -> bool {
        self.rank() > other.rank()
    }
}

impl PartialOrd for Lifetime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Lifetime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Singleton => "Singleton",
            Lifetime::Scoped => "Scoped",
            Lifetime::Transient => "Transient",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Lifetime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singleton" => Ok(Lifetime::Singleton),
            "scoped" => Ok(Lifetime::Scoped),
            "transient" => Ok(Lifetime::Transient),
            other => Err(format!("unknown lifetime '{}'", other)),
        }
    }
}

/// A resolved lifetime together with how it was obtained.
///
/// The stricter disposable-captive check only trusts lifetimes that were
/// declared explicitly, so the provenance travels with the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EffectiveLifetime {
    /// The lifetime the type will be registered with
    pub lifetime: Lifetime,
    /// Whether it came from an explicit marker rather than a role default
    pub explicit: bool,
}

impl EffectiveLifetime {
    /// A lifetime taken verbatim from a marker.
    pub const fn explicit(lifetime: Lifetime) -> Self {
        Self { lifetime, explicit: true }
    }

    /// A lifetime inferred from the type's role.
    pub const fn inferred(lifetime: Lifetime) -> Self {
        Self { lifetime, explicit: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_strictly_ordered() {
        assert!(Lifetime::Transient < Lifetime::Scoped);
        assert!(Lifetime::Scoped < Lifetime::Singleton);
        assert_eq!(Lifetime::Singleton.max(Lifetime::Transient), Lifetime::Singleton);
    }

    #[test]
    fn outlives_is_irreflexive() {
        for lt in [Lifetime::Singleton, Lifetime::Scoped, Lifetime::Transient] {
            assert!(!lt.outlives(lt));
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("forever".parse::<Lifetime>().is_err());
        assert_eq!(" Transient ".parse::<Lifetime>(), Ok(Lifetime::Transient));
    }
}
