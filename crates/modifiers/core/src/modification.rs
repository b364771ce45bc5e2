//! Modification directives and the pure fold that applies them.
//!
//! A directive is a class-filtered `add`, `multiply` or `replace`. Folding a
//! list of directives into a raw value always follows the same order:
//!
//! ```text
//! Filter by class → Multiply (product) → Add (sum) → Replace (last wins)
//! ```
//!
//! i.e. `result = replace.unwrap_or(raw × Π multiply + Σ add)`. Directives are
//! visited in registration order, so the floating point product and sum are
//! computed identically on every participant of a lockstep game.

use std::fmt;

use crate::types::ClassList;

/// The kind of a directive, independent of its amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OperationKind {
    Add,
    Multiply,
    Replace,
}

/// One arithmetic operation carried by a directive.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Operation {
    Add(f64),
    Multiply(f64),
    Replace(f64),
}

impl Operation {
    pub fn new(kind: OperationKind, amount: f64) -> Self {
        match kind {
            OperationKind::Add => Self::Add(amount),
            OperationKind::Multiply => Self::Multiply(amount),
            OperationKind::Replace => Self::Replace(amount),
        }
    }

    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Add(_) => OperationKind::Add,
            Self::Multiply(_) => OperationKind::Multiply,
            Self::Replace(_) => OperationKind::Replace,
        }
    }

    pub const fn amount(&self) -> f64 {
        match *self {
            Self::Add(v) | Self::Multiply(v) | Self::Replace(v) => v,
        }
    }
}

/// A single class requirement inside a conjunction (`Infantry` or `!Hero`).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassTerm {
    pub class: String,
    pub negated: bool,
}

impl ClassTerm {
    fn parse(term: &str) -> Self {
        match term.strip_prefix('!') {
            Some(class) => Self {
                class: class.to_owned(),
                negated: true,
            },
            None => Self {
                class: term.to_owned(),
                negated: false,
            },
        }
    }

    fn holds(&self, classes: &ClassList) -> bool {
        classes.contains(&self.class) != self.negated
    }
}

/// Class-match expression: a disjunction of conjunctions.
///
/// Textual form: alternatives separated by whitespace, terms of one
/// alternative joined by `+`, `!` negates a term. `"Infantry+!Hero Cavalry"`
/// matches non-hero infantry and any cavalry.
///
/// An alternative with no terms matches every class list. An expression with
/// no alternatives matches nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassMatch {
    alternatives: Vec<Vec<ClassTerm>>,
}

impl ClassMatch {
    /// Matches every target.
    pub fn any() -> Self {
        Self {
            alternatives: vec![Vec::new()],
        }
    }

    /// Matches no target.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parses the textual form described on the type.
    pub fn parse(expression: &str) -> Self {
        Self::from_alternatives(expression.split_whitespace())
    }

    /// Builds an expression where each item is one alternative whose terms are
    /// separated by `+` or whitespace.
    pub fn from_alternatives<'a>(alternatives: impl IntoIterator<Item = &'a str>) -> Self {
        let alternatives = alternatives
            .into_iter()
            .map(|alternative| {
                alternative
                    .split(|c: char| c == '+' || c.is_whitespace())
                    .filter(|term| !term.is_empty())
                    .map(ClassTerm::parse)
                    .collect()
            })
            .collect();
        Self { alternatives }
    }

    /// Builds an expression from already split conjunctions.
    pub fn from_conjunctions<S: AsRef<str>>(conjunctions: &[Vec<S>]) -> Self {
        let alternatives = conjunctions
            .iter()
            .map(|terms| {
                terms
                    .iter()
                    .map(|t| t.as_ref())
                    .filter(|t| !t.is_empty())
                    .map(ClassTerm::parse)
                    .collect()
            })
            .collect();
        Self { alternatives }
    }

    pub fn alternatives(&self) -> &[Vec<ClassTerm>] {
        &self.alternatives
    }

    pub fn matches(&self, classes: &ClassList) -> bool {
        self.alternatives
            .iter()
            .any(|terms| terms.iter().all(|term| term.holds(classes)))
    }
}

impl fmt::Display for ClassMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, terms) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            for (j, term) in terms.iter().enumerate() {
                if j > 0 {
                    f.write_str("+")?;
                }
                if term.negated {
                    f.write_str("!")?;
                }
                f.write_str(&term.class)?;
            }
        }
        Ok(())
    }
}

/// A class-filtered operation contributed by one source.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Directive {
    pub affects: ClassMatch,
    pub operation: Operation,
}

impl Directive {
    pub fn new(affects: ClassMatch, operation: Operation) -> Self {
        Self { affects, operation }
    }

    /// `add` directive for targets matching `affects`.
    pub fn add(affects: &str, amount: f64) -> Self {
        Self::new(ClassMatch::parse(affects), Operation::Add(amount))
    }

    /// `multiply` directive for targets matching `affects`.
    pub fn multiply(affects: &str, amount: f64) -> Self {
        Self::new(ClassMatch::parse(affects), Operation::Multiply(amount))
    }

    /// `replace` directive for targets matching `affects`.
    pub fn replace(affects: &str, amount: f64) -> Self {
        Self::new(ClassMatch::parse(affects), Operation::Replace(amount))
    }

    pub fn applies_to(&self, classes: &ClassList) -> bool {
        self.affects.matches(classes)
    }
}

/// The affine effect of a folded directive list on any raw value.
///
/// Two summaries that compare equal have the same effect for every raw value,
/// which is what ownership handling uses to decide whether a property truly
/// changed for an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModificationSummary {
    pub multiply: f64,
    pub add: f64,
    pub replace: Option<f64>,
}

impl ModificationSummary {
    pub const IDENTITY: Self = Self {
        multiply: 1.0,
        add: 0.0,
        replace: None,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Folds one more directive into the summary.
    pub fn push(&mut self, operation: Operation) {
        match operation {
            Operation::Multiply(v) => self.multiply *= v,
            Operation::Add(v) => self.add += v,
            Operation::Replace(v) => self.replace = Some(v),
        }
    }

    pub fn apply(&self, raw: f64) -> f64 {
        match self.replace {
            Some(value) => value,
            None if self.is_identity() => raw,
            None => raw * self.multiply + self.add,
        }
    }
}

impl Default for ModificationSummary {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Summarises the directives that apply to `classes`, in iteration order.
pub fn summarize<'a>(
    directives: impl IntoIterator<Item = &'a Directive>,
    classes: &ClassList,
) -> ModificationSummary {
    directives
        .into_iter()
        .filter(|directive| directive.applies_to(classes))
        .fold(ModificationSummary::IDENTITY, |mut summary, directive| {
            summary.push(directive.operation);
            summary
        })
}

/// Folds `directives` into `raw` for a target carrying `classes`.
///
/// # Example
/// ```
/// # use modifiers_core::{ClassList, Directive, apply_modifications};
/// let directives = [
///     Directive::add("Infantry", 2.0),
///     Directive::multiply("Infantry", 1.5),
///     Directive::add("Cavalry", 100.0),
/// ];
/// let infantry = ClassList::parse("Unit Infantry");
/// // 10 × 1.5 + 2
/// assert_eq!(apply_modifications(&directives, &infantry, 10.0), 17.0);
/// ```
pub fn apply_modifications<'a>(
    directives: impl IntoIterator<Item = &'a Directive>,
    classes: &ClassList,
    raw: f64,
) -> f64 {
    summarize(directives, classes).apply(raw)
}
