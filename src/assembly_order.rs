//! Cross-assembly processing order.
//!
//! The default order is ordinal ascending by assembly name. Explicit `first`
//! entries move to the front in the order given, explicit `last` entries to
//! the back in the order given, and the `TestsLast` preset then pushes every
//! remaining test-looking assembly behind the explicit `last` entries.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::key::AssemblyRef;

/// Named ordering presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AssemblyPreset {
    #[default]
    None,
    /// Push test-looking assemblies to the end
    TestsLast,
}

impl FromStr for AssemblyPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "" | "none" => Ok(AssemblyPreset::None),
            "testslast" => Ok(AssemblyPreset::TestsLast),
            other => Err(format!("unknown assembly preset '{}'", other)),
        }
    }
}

impl fmt::Display for AssemblyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyPreset::None => f.write_str("none"),
            AssemblyPreset::TestsLast => f.write_str("tests-last"),
        }
    }
}

/// Ordering hints for [`AssemblyOrderResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AssemblyOrderSpec {
    pub first: Vec<String>,
    pub last: Vec<String>,
    pub preset: AssemblyPreset,
}

impl AssemblyOrderSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.first = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn last<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.last = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn preset(mut self, preset: AssemblyPreset) -> Self {
        self.preset = preset;
        self
    }
}

/// Computes a total order over source assemblies.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{AssemblyOrderResolver, AssemblyOrderSpec, AssemblyRef};
///
/// let spec = AssemblyOrderSpec::new().first(["Z"]).last(["A"]);
/// let order = AssemblyOrderResolver::new(spec)
///     .resolve(["A", "B", "Z"].map(AssemblyRef::from));
/// let names: Vec<_> = order.iter().map(|a| a.name()).collect();
/// assert_eq!(names, ["Z", "B", "A"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssemblyOrderResolver {
    spec: AssemblyOrderSpec,
}

impl AssemblyOrderResolver {
    pub fn new(spec: AssemblyOrderSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &AssemblyOrderSpec {
        &self.spec
    }

    /// Orders `assemblies`. Duplicates collapse; names listed in `first` or `last` that are
    /// not among the inputs are ignored.
    pub fn resolve<I>(&self, assemblies: I) -> Vec<AssemblyRef>
    where
        I: IntoIterator<Item = AssemblyRef>,
    {
        let mut remaining: BTreeSet<AssemblyRef> = assemblies.into_iter().collect();
        let mut head = Vec::new();
        let mut tail = Vec::new();

        for name in &self.spec.first {
            if let Some(asm) = take(&mut remaining, name) {
                head.push(asm);
            }
        }
        // `first` already removed anything listed in both
        for name in &self.spec.last {
            if let Some(asm) = take(&mut remaining, name) {
                tail.push(asm);
            }
        }

        let mut middle = Vec::with_capacity(remaining.len());
        let mut preset_tail = Vec::new();
        for asm in remaining {
            if self.spec.preset == AssemblyPreset::TestsLast && looks_like_test_assembly(asm.name()) {
                preset_tail.push(asm);
            } else {
                middle.push(asm);
            }
        }

        tracing::trace!(
            first = head.len(),
            middle = middle.len(),
            last = tail.len(),
            preset = preset_tail.len(),
            "resolved assembly order"
        );

        head.into_iter()
            .chain(middle)
            .chain(tail)
            .chain(preset_tail)
            .collect()
    }
}

fn take(set: &mut BTreeSet<AssemblyRef>, name: &str) -> Option<AssemblyRef> {
    let key = AssemblyRef::new(name);
    set.take(&key)
}

/// Heuristic test-project detection on an assembly name.
///
/// Any `.`, `-` or `_` separated segment equal to `test`, `tests`,
/// `testing` or `specs` (case-insensitive) counts, as does a segment with a
/// capitalised `Tests` suffix such as `UnitTests`.
pub fn looks_like_test_assembly(name: &str) -> bool {
    name.split(['.', '-', '_']).any(|segment| {
        if segment.ends_with("Tests") {
            return true;
        }
        let segment = segment.to_ascii_lowercase();
        matches!(segment.as_str(), "test" | "tests" | "testing" | "specs")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(order: &[AssemblyRef]) -> Vec<&str> {
        order.iter().map(|a| a.name()).collect()
    }

    fn refs(items: &[&str]) -> Vec<AssemblyRef> {
        items.iter().map(|s| AssemblyRef::new(*s)).collect()
    }

    #[test]
    fn default_is_alphabetical() {
        let order = AssemblyOrderResolver::default().resolve(refs(&["b", "C", "a"]));
        assert_eq!(names(&order), ["C", "a", "b"]);
    }

    #[test]
    fn first_wins_over_last() {
        let spec = AssemblyOrderSpec::new().first(["B"]).last(["B", "A"]);
        let order = AssemblyOrderResolver::new(spec).resolve(refs(&["A", "B", "C"]));
        assert_eq!(names(&order), ["B", "C", "A"]);
    }

    #[test]
    fn tests_last_runs_after_explicit_entries() {
        let spec = AssemblyOrderSpec::new()
            .first(["App.Tests"])
            .last(["Legacy"])
            .preset(AssemblyPreset::TestsLast);
        let order = AssemblyOrderResolver::new(spec).resolve(refs(&[
            "App",
            "App.Tests",
            "App.IntegrationTests",
            "Legacy",
            "Web",
            "Web.Specs",
        ]));
        assert_eq!(
            names(&order),
            ["App.Tests", "App", "Web", "Legacy", "App.IntegrationTests", "Web.Specs"]
        );
    }

    #[test]
    fn test_heuristic() {
        assert!(looks_like_test_assembly("Core.UnitTests"));
        assert!(looks_like_test_assembly("core-test"));
        assert!(looks_like_test_assembly("my_crate_testing"));
        assert!(looks_like_test_assembly("App.IntegrationTests"));
        assert!(looks_like_test_assembly("APP.TESTS"));
        assert!(!looks_like_test_assembly("Contest"));
        assert!(!looks_like_test_assembly("Contests"));
        assert!(!looks_like_test_assembly("Shop.Protests"));
        assert!(!looks_like_test_assembly("Attestation"));
    }

    #[test]
    fn unknown_names_are_ignored() {
        let spec = AssemblyOrderSpec::new().first(["Missing"]).last(["AlsoMissing"]);
        let order = AssemblyOrderResolver::new(spec).resolve(refs(&["B", "A"]));
        assert_eq!(names(&order), ["A", "B"]);
    }

    #[test]
    fn preset_parses() {
        assert_eq!("tests_last".parse::<AssemblyPreset>(), Ok(AssemblyPreset::TestsLast));
        assert_eq!("None".parse::<AssemblyPreset>(), Ok(AssemblyPreset::None));
        assert!("sometimes".parse::<AssemblyPreset>().is_err());
    }
}
