//! Models.
//!
//! A [`Model`] assigns values to uninterpreted constants and to ground
//! occurrences of uninterpreted predicates. Evaluation is total over
//! ground, quantifier-free terms of the language: constants without an
//! assignment take a sort default (zero, `false`), matching the usual
//! model-completion convention.
//!
//! Models are owned by the solver that produced them and extended in
//! place: the projector re-registers a variable after the divisibility
//! substitution, and the game loop registers values for fresh witness
//! constants.

use crate::ast::{TermId, TermKind, TermManager};
use crate::error::{QsatError, Result};
use crate::sort::Sort;
use lasso::Spur;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use rustc_hash::FxHashMap;

/// A ground value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Exact rational value; integers are rationals with denominator one.
    Rational(BigRational),
}

impl Value {
    /// Extract the rational, when the value is arithmetic.
    #[must_use]
    pub fn as_rational(&self) -> Option<&BigRational> {
        match self {
            Value::Rational(r) => Some(r),
            Value::Bool(_) => None,
        }
    }

    /// Extract the boolean, when the value is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Rational(_) => None,
        }
    }

    /// Integer value from an integer-valued rational.
    #[must_use]
    pub fn as_int(&self) -> Option<BigInt> {
        match self {
            Value::Rational(r) if r.is_integer() => Some(r.to_integer()),
            _ => None,
        }
    }
}

/// An assignment for constants and ground predicate occurrences.
#[derive(Debug, Clone, Default)]
pub struct Model {
    consts: FxHashMap<Spur, Value>,
    apps: FxHashMap<TermId, bool>,
}

impl Model {
    /// Empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value for a constant. Later registrations win; the
    /// projector relies on this when it re-interprets a variable.
    pub fn register(&mut self, name: Spur, value: Value) {
        self.consts.insert(name, value);
    }

    /// Register a truth value for a ground predicate occurrence.
    pub fn register_app(&mut self, occurrence: TermId, value: bool) {
        self.apps.insert(occurrence, value);
    }

    /// Value of a constant, if explicitly assigned.
    #[must_use]
    pub fn value_of(&self, name: Spur) -> Option<&Value> {
        self.consts.get(&name)
    }

    /// Evaluate a ground, quantifier-free term.
    pub fn eval(&self, tm: &TermManager, t: TermId) -> Result<Value> {
        match tm.kind(t) {
            TermKind::True => Ok(Value::Bool(true)),
            TermKind::False => Ok(Value::Bool(false)),
            TermKind::Num(r) => Ok(Value::Rational(r.clone())),
            TermKind::Var(name) => Ok(self.consts.get(name).cloned().unwrap_or_else(|| {
                match tm.sort_of(t) {
                    Sort::Bool => Value::Bool(false),
                    _ => Value::Rational(BigRational::zero()),
                }
            })),
            TermKind::Not(a) => Ok(Value::Bool(!self.eval_bool(tm, *a)?)),
            TermKind::And(args) => {
                for &a in args {
                    if !self.eval_bool(tm, a)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            TermKind::Or(args) => {
                for &a in args {
                    if self.eval_bool(tm, a)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            TermKind::Implies(a, b) => {
                Ok(Value::Bool(!self.eval_bool(tm, *a)? || self.eval_bool(tm, *b)?))
            }
            TermKind::Iff(a, b) => {
                Ok(Value::Bool(self.eval_bool(tm, *a)? == self.eval_bool(tm, *b)?))
            }
            TermKind::Eq(a, b) => Ok(Value::Bool(self.eval(tm, *a)? == self.eval(tm, *b)?)),
            TermKind::Ite(c, a, b) => {
                if self.eval_bool(tm, *c)? {
                    self.eval(tm, *a)
                } else {
                    self.eval(tm, *b)
                }
            }
            TermKind::Le(a, b) => {
                Ok(Value::Bool(self.eval_rational(tm, *a)? <= self.eval_rational(tm, *b)?))
            }
            TermKind::Lt(a, b) => {
                Ok(Value::Bool(self.eval_rational(tm, *a)? < self.eval_rational(tm, *b)?))
            }
            TermKind::Add(args) => {
                let mut sum = BigRational::zero();
                for &a in args {
                    sum += self.eval_rational(tm, a)?;
                }
                Ok(Value::Rational(sum))
            }
            TermKind::Sub(a, b) => Ok(Value::Rational(
                self.eval_rational(tm, *a)? - self.eval_rational(tm, *b)?,
            )),
            TermKind::Neg(a) => Ok(Value::Rational(-self.eval_rational(tm, *a)?)),
            TermKind::Mul(a, b) => Ok(Value::Rational(
                self.eval_rational(tm, *a)? * self.eval_rational(tm, *b)?,
            )),
            TermKind::Mod(a, b) => {
                let lhs = self.eval_rational(tm, *a)?;
                let rhs = self.eval_rational(tm, *b)?;
                Ok(Value::Rational(euclidean_mod(&lhs, &rhs)?))
            }
            TermKind::App(_, _) => Ok(Value::Bool(self.apps.get(&t).copied().unwrap_or(false))),
            TermKind::Exists(_, _) | TermKind::Forall(_, _) => Err(QsatError::internal(format!(
                "eval on quantified term {}",
                tm.display(t)
            ))),
        }
    }

    /// Evaluate to a boolean.
    pub fn eval_bool(&self, tm: &TermManager, t: TermId) -> Result<bool> {
        self.eval(tm, t)?.as_bool().ok_or_else(|| {
            QsatError::internal(format!("expected boolean value for {}", tm.display(t)))
        })
    }

    /// Evaluate to a rational (the spec's `is_numeral` extraction).
    pub fn eval_rational(&self, tm: &TermManager, t: TermId) -> Result<BigRational> {
        match self.eval(tm, t)? {
            Value::Rational(r) => Ok(r),
            Value::Bool(_) => Err(QsatError::internal(format!(
                "expected arithmetic value for {}",
                tm.display(t)
            ))),
        }
    }

    /// Check that a literal holds.
    pub fn is_true(&self, tm: &TermManager, t: TermId) -> Result<bool> {
        self.eval_bool(tm, t)
    }
}

/// Euclidean remainder with a positive divisor: result in `[0, |k|)`.
fn euclidean_mod(lhs: &BigRational, rhs: &BigRational) -> Result<BigRational> {
    if rhs.is_zero() {
        return Err(QsatError::internal("mod by zero"));
    }
    if !lhs.is_integer() || !rhs.is_integer() {
        return Err(QsatError::internal("mod on non-integers"));
    }
    let k = rhs.to_integer().abs();
    Ok(BigRational::from_integer(lhs.to_integer().mod_floor(&k)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_linear_atom() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let two = tm.mk_int(BigInt::from(2));
        let seven = tm.mk_int(BigInt::from(7));
        let tx = tm.mk_mul(two, x);
        let le = tm.mk_le(tx, seven);

        let mut mdl = Model::new();
        let name = tm.var_name(x).unwrap();
        mdl.register(name, Value::Rational(BigRational::from_integer(BigInt::from(3))));
        assert!(mdl.is_true(&tm, le).unwrap());

        mdl.register(name, Value::Rational(BigRational::from_integer(BigInt::from(4))));
        assert!(!mdl.is_true(&tm, le).unwrap());
    }

    #[test]
    fn eval_mod_is_euclidean() {
        let mut tm = TermManager::new();
        let a = tm.mk_int(BigInt::from(-7));
        let k = tm.mk_int(BigInt::from(3));
        let m = tm.mk_mod(a, k);
        let mdl = Model::new();
        let v = mdl.eval(&tm, m).unwrap();
        assert_eq!(v.as_int().unwrap(), BigInt::from(2));
    }

    #[test]
    fn missing_const_defaults() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let p = tm.mk_var("p", tm.sorts.bool_sort);
        let mdl = Model::new();
        assert_eq!(mdl.eval_rational(&tm, x).unwrap(), BigRational::zero());
        assert!(!mdl.eval_bool(&tm, p).unwrap());
    }

    #[test]
    fn app_occurrences_default_false() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let bool_sort = tm.sorts.bool_sort;
        let px = tm.mk_app("P", vec![x], bool_sort);
        let mut mdl = Model::new();
        assert!(!mdl.eval_bool(&tm, px).unwrap());
        mdl.register_app(px, true);
        assert!(mdl.eval_bool(&tm, px).unwrap());
    }
}
