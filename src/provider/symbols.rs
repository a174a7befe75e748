//! Candidates from a compiled unit's symbol table.
//!
//! The table is line oriented:
//!
//! ```text
//! # comment
//! unit App.Core
//! interface App.Core.ILogger
//! class App.Core.Logger : App.Core.ILogger, System.IDisposable
//!   ctor(App.Core.Clock, int)
//!   @Singleton
//!   @Keyed("primary")
//! abstract class App.Core.Base : App.Core.IThing
//! class App.Core.Derived extends App.Core.Base
//! struct App.Core.Money
//!
//! extern unit System
//! interface System.IDisposable
//! ```
//!
//! Declarations in `extern unit` sections only feed ancestor resolution.
//! Indented lines belong to the preceding declaration. Errors in a
//! declaration's member lines mark that type malformed; only structural
//! problems (members before any declaration, unknown keywords, declarations
//! outside a unit) fail the whole table.

use std::collections::BTreeSet;

use crate::config::FrameworkTypes;
use crate::descriptors::{CandidateType, Marker};
use crate::error::{PlanError, PlanResult};
use crate::key::{AssemblyRef, TypeRef};

use super::{
    decode_attributes, parameter_kind, widest_constructor, AttrArg, Attribute, CandidateProvider, Supertypes,
    TypeHierarchy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Class,
    AbstractClass,
    Interface,
    Struct,
}

#[derive(Debug)]
struct Declaration {
    name: String,
    kind: DeclKind,
    unit: String,
    external: bool,
    base: Option<String>,
    interfaces: Vec<String>,
    constructors: Vec<Vec<String>>,
    attributes: Vec<Attribute>,
    problems: Vec<(String, String)>,
}

/// Provider backed by symbol table text.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::provider::{CandidateProvider, SymbolTableProvider};
///
/// let table = "unit App\ninterface App.IClock\nclass App.Clock : App.IClock\n  @Transient\n";
/// let provider = SymbolTableProvider::new(table);
/// assert_eq!(provider.unit().name(), "App");
///
/// let candidates = provider.provide().unwrap();
/// assert_eq!(candidates.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SymbolTableProvider {
    source: String,
    framework: FrameworkTypes,
}

impl SymbolTableProvider {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            framework: FrameworkTypes::default(),
        }
    }

    /// Reads the table from a file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> PlanResult<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    pub fn with_framework(mut self, framework: FrameworkTypes) -> Self {
        self.framework = framework;
        self
    }

    fn parse(&self) -> PlanResult<Vec<Declaration>> {
        let mut declarations: Vec<Declaration> = Vec::new();
        let mut unit: Option<(String, bool)> = None;

        for (idx, raw) in self.source.lines().enumerate() {
            let line_no = idx + 1;
            let line = strip_comment(raw);
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with(char::is_whitespace) {
                let decl = declarations.last_mut().ok_or_else(|| PlanError::SymbolTable {
                    line: line_no,
                    message: "member line before any declaration".to_string(),
                })?;
                parse_member(decl, line.trim());
                continue;
            }

            let line = line.trim();
            if let Some(name) = line.strip_prefix("extern unit ") {
                unit = Some((name.trim().to_string(), true));
                continue;
            }
            if let Some(name) = line.strip_prefix("unit ") {
                unit = Some((name.trim().to_string(), false));
                continue;
            }

            let (unit_name, external) = unit.clone().ok_or_else(|| PlanError::SymbolTable {
                line: line_no,
                message: "declaration outside of a unit".to_string(),
            })?;
            let decl = parse_declaration(line, unit_name, external).map_err(|message| PlanError::SymbolTable {
                line: line_no,
                message,
            })?;
            declarations.push(decl);
        }

        Ok(declarations)
    }

    fn describe(
        &self,
        decl: &Declaration,
        hierarchy: &TypeHierarchy,
        value_types: &BTreeSet<String>,
    ) -> CandidateType {
        let (base_types, declared_interfaces) = hierarchy.ancestors(&decl.name);
        let mut decoded = decode_attributes(&decl.attributes, &self.framework);
        for (marker, reason) in &decl.problems {
            decoded.markers.insert(Marker::Malformed {
                marker: marker.clone(),
                reason: reason.clone(),
            });
        }
        let constructor_parameter_types = widest_constructor(&decl.constructors)
            .into_iter()
            .map(|name| {
                let kind = parameter_kind(&name, value_types, &self.framework);
                TypeRef::with_kind(name, kind)
            })
            .collect();

        CandidateType {
            full_name: TypeRef::new(decl.name.as_str()),
            declared_interfaces,
            base_types,
            constructor_parameter_types,
            declared_lifetime: decoded.lifetime,
            is_abstract: matches!(decl.kind, DeclKind::AbstractClass | DeclKind::Interface),
            is_interface: decl.kind == DeclKind::Interface,
            markers: decoded.markers,
            source_unit: AssemblyRef::new(decl.unit.as_str()),
        }
    }
}

impl CandidateProvider for SymbolTableProvider {
    /// First non-extern unit declared in the table.
    fn unit(&self) -> AssemblyRef {
        self.source
            .lines()
            .map(|l| strip_comment(l).trim())
            .find_map(|l| l.strip_prefix("unit "))
            .map(|name| AssemblyRef::new(name.trim()))
            .unwrap_or_default()
    }

    fn provide(&self) -> PlanResult<Vec<CandidateType>> {
        let declarations = self.parse()?;

        let mut hierarchy = TypeHierarchy::default();
        let mut value_types = BTreeSet::new();
        for decl in &declarations {
            hierarchy.declare(
                &decl.name,
                Supertypes {
                    base: decl.base.clone(),
                    interfaces: decl.interfaces.clone(),
                },
            );
            if decl.kind == DeclKind::Struct {
                value_types.insert(decl.name.clone());
            }
        }

        let mut seen = BTreeSet::new();
        let candidates: Vec<_> = declarations
            .iter()
            .filter(|d| !d.external && seen.insert(d.name.as_str()))
            .map(|d| self.describe(d, &hierarchy, &value_types))
            .collect();
        tracing::debug!(count = candidates.len(), "analyzed symbol table");
        Ok(candidates)
    }
}

/// Cuts the line at the first `#` outside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (idx, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..idx],
            _ => {}
        }
    }
    line
}

fn parse_declaration(line: &str, unit: String, external: bool) -> Result<Declaration, String> {
    let (kind, rest) = if let Some(rest) = line.strip_prefix("abstract class ") {
        (DeclKind::AbstractClass, rest)
    } else if let Some(rest) = line.strip_prefix("class ") {
        (DeclKind::Class, rest)
    } else if let Some(rest) = line.strip_prefix("interface ") {
        (DeclKind::Interface, rest)
    } else if let Some(rest) = line.strip_prefix("struct ") {
        (DeclKind::Struct, rest)
    } else {
        return Err(format!("unknown declaration '{}'", line));
    };

    let (head, interfaces) = match split_top_level(rest, ':').as_slice() {
        [head] => (head.to_string(), Vec::new()),
        [head, ifaces] => (
            head.to_string(),
            split_top_level(ifaces, ',')
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        _ => return Err("more than one ':' in declaration".to_string()),
    };

    let mut words = head.split_whitespace();
    let name = words.next().ok_or("missing type name")?.to_string();
    let base = match (words.next(), words.next(), words.next()) {
        (None, _, _) => None,
        (Some("extends"), Some(base), None) if kind != DeclKind::Interface => Some(base.to_string()),
        _ => return Err(format!("unexpected tokens after '{}'", name)),
    };

    Ok(Declaration {
        name,
        kind,
        unit,
        external,
        base,
        interfaces,
        constructors: Vec::new(),
        attributes: Vec::new(),
        problems: Vec::new(),
    })
}

fn parse_member(decl: &mut Declaration, line: &str) {
    if let Some(rest) = line.strip_prefix("ctor") {
        match parenthesized(rest) {
            Some(inner) => {
                let params = split_top_level(inner, ',')
                    .into_iter()
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
                decl.constructors.push(params);
            }
            None => decl
                .problems
                .push(("ctor".to_string(), format!("cannot parse '{}'", line))),
        }
        return;
    }

    if let Some(rest) = line.strip_prefix('@') {
        let (name, args) = match rest.find('(') {
            None => (rest.trim(), None),
            Some(idx) => (rest[..idx].trim(), Some(&rest[idx..])),
        };
        let mut attribute = Attribute::new(name);
        if let Some(args) = args {
            let Some(inner) = parenthesized(args) else {
                decl.problems
                    .push((name.to_string(), format!("cannot parse arguments '{}'", args)));
                return;
            };
            for arg in split_top_level(inner, ',') {
                let arg = arg.trim();
                if arg.is_empty() {
                    continue;
                }
                attribute.args.push(parse_arg(arg));
            }
        }
        decl.attributes.push(attribute);
        return;
    }

    decl.problems
        .push(("member".to_string(), format!("unknown member line '{}'", line)));
}

fn parse_arg(arg: &str) -> AttrArg {
    if let Some(s) = arg.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        AttrArg::Str(s.to_string())
    } else if let Ok(n) = arg.parse::<i64>() {
        AttrArg::Int(n)
    } else {
        AttrArg::Type(arg.to_string())
    }
}

/// Contents of a balanced `( ... )` spanning the whole input.
fn parenthesized(s: &str) -> Option<&str> {
    let s = s.trim();
    let inner = s.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Splits on `sep` outside angle brackets, parentheses and string literals.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut start = 0;
    for (idx, c) in s.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '<' | '(' if !in_string => depth += 1,
            '>' | ')' if !in_string => depth -= 1,
            c if c == sep && depth == 0 && !in_string => {
                parts.push(&s[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
