//! Variant Expansion
//!
//! Turns a shader's macro-line declaration into the ordered list of macro
//! sets ([`Variant`]s) that must be compiled for it.
//!
//! # Model
//!
//! A [`MacroLine`] is a set of mutually exclusive preprocessor symbols.
//! Every variant picks exactly one symbol from every line; picking the
//! reserved [`PLACEHOLDER`] means "no macro from this line".
//!
//! ```rust,ignore
//! use shaderpack::variant::{expand, MacroLine};
//!
//! let lines = vec![
//!     MacroLine::from(["A", "B"]),
//!     MacroLine::from(["C", "_"]),
//! ];
//! // [A, C], [A], [B, C], [B]
//! let variants = expand(&lines)?;
//! ```
//!
//! # Ordering
//!
//! Variants are produced in depth-first order: lines in declaration order,
//! symbols within a line in declaration order. The pack stores entries in
//! this order, so it must stay stable for identical input.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::DeclarationError;

/// The reserved symbol meaning "select nothing from this line".
pub const PLACEHOLDER: &str = "_";

// ---------------------------------------------------------------------------
// MacroLine
// ---------------------------------------------------------------------------

/// An ordered set of mutually exclusive macro names, as declared in metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacroLine(Vec<String>);

impl MacroLine {
    #[must_use]
    pub fn new(symbols: Vec<String>) -> Self {
        Self(symbols)
    }

    #[inline]
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Applies the optional-macro rule: a single real macro becomes
    /// `[macro, _]` so the line yields both "present" and "absent".
    fn normalized(&self, line: usize) -> Result<MacroLine, DeclarationError> {
        match self.0.as_slice() {
            [only] if only == PLACEHOLDER => Err(DeclarationError::PlaceholderOnlyLine { line }),
            [only] => Ok(MacroLine(vec![only.clone(), PLACEHOLDER.to_string()])),
            _ => Ok(self.clone()),
        }
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for MacroLine {
    fn from(symbols: [S; N]) -> Self {
        Self(symbols.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<String>> for MacroLine {
    fn from(symbols: Vec<String>) -> Self {
        Self(symbols)
    }
}

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// One concrete macro combination to compile.
///
/// Macro order follows line declaration order. Equality is order-sensitive;
/// use [`Variant::same_set`] to compare as a set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variant(Vec<String>);

impl Variant {
    /// The variant with no macros defined.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn macros(&self) -> &[String] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|m| m == name)
    }

    /// Returns `true` if both variants define the same macros, in any order.
    #[must_use]
    pub fn same_set<S: AsRef<str>>(&self, macros: &[S]) -> bool {
        self.0.len() == macros.len() && macros.iter().all(|m| self.contains(m.as_ref()))
    }

    /// Renders the `#define` prelude prepended to the shader source.
    #[must_use]
    pub fn define_prelude(&self) -> String {
        self.0.iter().fold(String::new(), |mut out, name| {
            out.push_str("#define ");
            out.push_str(name);
            out.push('\n');
            out
        })
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Variant {
    fn from(macros: [S; N]) -> Self {
        Self(macros.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> FromIterator<S> for Variant {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

/// Validates `lines` and expands them into the ordered variant list.
///
/// Empty lines are ignored. With no remaining lines the result is a single
/// empty variant. The first declaration error found aborts expansion.
pub fn expand(lines: &[MacroLine]) -> Result<Vec<Variant>, DeclarationError> {
    let lines = validate(lines)?;

    let mut variants = Vec::new();
    let mut current = Vec::with_capacity(lines.len());
    visit(&lines, 0, &mut current, &mut variants);
    Ok(variants)
}

/// Normalizes and checks each line in declaration order, so the first
/// violation reported is the first one by line position.
fn validate(lines: &[MacroLine]) -> Result<Vec<MacroLine>, DeclarationError> {
    let mut owners: FxHashMap<String, usize> = FxHashMap::default();
    let mut normalized = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().filter(|l| !l.is_empty()).enumerate() {
        let line = line.normalized(index)?;
        check_symbols(index, &line, &mut owners)?;
        normalized.push(line);
    }
    Ok(normalized)
}

/// Checks in-line uniqueness and cross-line exclusivity of one line,
/// recording the owning line of every real macro in `owners`.
fn check_symbols(
    index: usize,
    line: &MacroLine,
    owners: &mut FxHashMap<String, usize>,
) -> Result<(), DeclarationError> {
    for (pos, name) in line.symbols().iter().enumerate() {
        if line.symbols()[..pos].contains(name) {
            return Err(DeclarationError::DuplicateInLine {
                line: index,
                name: name.clone(),
            });
        }
        if name == PLACEHOLDER {
            continue;
        }
        if let Some(&first_line) = owners.get(name) {
            return Err(DeclarationError::MacroReused {
                name: name.clone(),
                first_line,
                line: index,
            });
        }
        owners.insert(name.clone(), index);
    }
    Ok(())
}

fn visit(lines: &[MacroLine], index: usize, current: &mut Vec<String>, out: &mut Vec<Variant>) {
    let Some(line) = lines.get(index) else {
        out.push(Variant(current.clone()));
        return;
    };

    for symbol in line.symbols() {
        if symbol == PLACEHOLDER {
            visit(lines, index + 1, current, out);
        } else {
            current.push(symbol.clone());
            visit(lines, index + 1, current, out);
            current.pop();
        }
    }
}
