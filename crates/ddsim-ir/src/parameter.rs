//! Symbolic gate parameters and their binding.
//!
//! Circuits carry [`ParameterExpression`]s on rotation gates. Binding replaces
//! every symbol with a concrete value and folds the expression to a constant.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{IrError, IrResult};

/// A symbolic or concrete parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// A named free parameter.
    Symbol(String),
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Subtraction.
    Sub(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// Element `index` of a parameter vector, named `name[index]`.
    pub fn vector_element(name: &str, index: usize) -> Self {
        ParameterExpression::Symbol(format!("{name}[{index}]"))
    }

    /// Check if this expression contains any symbols.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Constant(_) => false,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Evaluate to a concrete value if the expression holds no symbols.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Symbol(_) => None,
            ParameterExpression::Neg(e) => e.as_f64().map(|v| -v),
            ParameterExpression::Add(a, b) => Some(a.as_f64()? + b.as_f64()?),
            ParameterExpression::Sub(a, b) => Some(a.as_f64()? - b.as_f64()?),
            ParameterExpression::Mul(a, b) => Some(a.as_f64()? * b.as_f64()?),
            ParameterExpression::Div(a, b) => Some(a.as_f64()? / b.as_f64()?),
        }
    }

    /// Evaluate to a finite value, naming the first unbound symbol on failure.
    pub fn value(&self) -> IrResult<f64> {
        if let Some(name) = self.symbols().into_iter().next() {
            return Err(IrError::UnboundParameter(name));
        }
        match self.as_f64() {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(IrError::NonFiniteParameter(self.to_string())),
        }
    }

    /// All symbol names in this expression.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut BTreeSet<String>) {
        match self {
            ParameterExpression::Constant(_) => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) => e.collect_symbols(set),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Replace every symbol present in `values`, folding fully bound
    /// sub-expressions to constants. Symbols absent from `values` stay free.
    pub fn substitute(&self, values: &FxHashMap<String, f64>) -> Self {
        let substituted = match self {
            ParameterExpression::Symbol(name) => match values.get(name) {
                Some(v) => ParameterExpression::Constant(*v),
                None => self.clone(),
            },
            ParameterExpression::Constant(_) => self.clone(),
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.substitute(values))),
            ParameterExpression::Add(a, b) => {
                ParameterExpression::Add(Box::new(a.substitute(values)), Box::new(b.substitute(values)))
            }
            ParameterExpression::Sub(a, b) => {
                ParameterExpression::Sub(Box::new(a.substitute(values)), Box::new(b.substitute(values)))
            }
            ParameterExpression::Mul(a, b) => {
                ParameterExpression::Mul(Box::new(a.substitute(values)), Box::new(b.substitute(values)))
            }
            ParameterExpression::Div(a, b) => {
                ParameterExpression::Div(Box::new(a.substitute(values)), Box::new(b.substitute(values)))
            }
        };
        match substituted.as_f64() {
            Some(v) => ParameterExpression::Constant(v),
            None => substituted,
        }
    }
}

/// Order parameter names alphabetically, comparing a trailing `[index]`
/// numerically so that `theta[2]` sorts before `theta[10]`.
pub fn compare_parameter_names(a: &str, b: &str) -> Ordering {
    match (split_vector_index(a), split_vector_index(b)) {
        (Some((base_a, idx_a)), Some((base_b, idx_b))) => {
            base_a.cmp(base_b).then(idx_a.cmp(&idx_b))
        }
        _ => a.cmp(b),
    }
}

fn split_vector_index(name: &str) -> Option<(&str, u64)> {
    let inner = name.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let index = inner[open + 1..].parse().ok()?;
    Some((&inner[..open], index))
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Add(a, b) => write!(f, "({a} + {b})"),
            ParameterExpression::Sub(a, b) => write!(f, "({a} - {b})"),
            ParameterExpression::Mul(a, b) => write!(f, "({a} * {b})"),
            ParameterExpression::Div(a, b) => write!(f, "({a} / {b})"),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<&str> for ParameterExpression {
    fn from(name: &str) -> Self {
        ParameterExpression::Symbol(name.to_string())
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ParameterExpression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_folds_to_constant() {
        let expr = ParameterExpression::symbol("a") * ParameterExpression::constant(2.0)
            + ParameterExpression::symbol("b");
        let mut values = FxHashMap::default();
        values.insert("a".to_string(), 1.5);
        values.insert("b".to_string(), -1.0);

        let bound = expr.substitute(&values);
        assert_eq!(bound, ParameterExpression::Constant(2.0));
        assert_eq!(bound.value().unwrap(), 2.0);
    }

    #[test]
    fn test_partial_substitution_keeps_free_symbols() {
        let expr = ParameterExpression::symbol("a") + ParameterExpression::symbol("b");
        let mut values = FxHashMap::default();
        values.insert("a".to_string(), 1.0);

        let partial = expr.substitute(&values);
        assert!(partial.is_symbolic());
        assert_eq!(partial.symbols().into_iter().collect::<Vec<_>>(), vec!["b"]);
        assert!(matches!(partial.value(), Err(IrError::UnboundParameter(name)) if name == "b"));
    }

    #[test]
    fn test_division_by_zero_is_not_finite() {
        let expr = ParameterExpression::constant(1.0) / ParameterExpression::constant(0.0);
        assert!(matches!(expr.value(), Err(IrError::NonFiniteParameter(_))));
    }

    #[test]
    fn test_natural_parameter_order() {
        let mut names = vec!["theta[10]", "theta[2]", "alpha", "theta[0]"];
        names.sort_by(|a, b| compare_parameter_names(a, b));
        assert_eq!(names, vec!["alpha", "theta[0]", "theta[2]", "theta[10]"]);
    }
}
