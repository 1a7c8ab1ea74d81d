//! Literal Normalization.
//!
//! The projector and the game loop never emit a literal raw: everything
//! passes through [`LitRewriter::rewrite`], an idempotent normalizer.
//! Linear atoms are put into the canonical shape `Σ cᵢ·xᵢ + k ⋈ 0` with
//! integer, coprime, base-ordered coefficients; ground atoms fold to
//! constants; divisibility atoms `(t mod d) = 0` are reduced. Integer
//! inequalities are tightened by gcd rounding when the option is on.
//!
//! Boolean structure is rebuilt bottom-up through the folding
//! constructors, so the rewriter is applicable to whole formulas as well
//! as single literals.

use crate::ast::{TermId, TermKind, TermManager};
use crate::sort::SortId;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashMap;

/// Options for literal normalization.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Tighten integer inequalities by dividing through the coefficient
    /// gcd and rounding the constant.
    pub gcd_rounding: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self { gcd_rounding: true }
    }
}

/// Idempotent literal normalizer.
#[derive(Debug, Clone, Default)]
pub struct LitRewriter {
    config: RewriteConfig,
}

/// Comparison shape of a normalized linear atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rel {
    Le,
    Lt,
    Eq,
}

/// `Σ coeffs + constant` over base terms.
#[derive(Debug, Clone, Default)]
struct Linear {
    coeffs: FxHashMap<TermId, BigRational>,
    constant: BigRational,
}

impl Linear {
    fn add(&mut self, base: TermId, c: &BigRational) {
        let entry = self.coeffs.entry(base).or_insert_with(BigRational::zero);
        *entry += c;
        if entry.is_zero() {
            self.coeffs.remove(&base);
        }
    }

    fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Bases in id order, for a canonical rebuild.
    fn ordered(&self) -> Vec<(TermId, BigRational)> {
        let mut v: Vec<_> = self.coeffs.iter().map(|(k, c)| (*k, c.clone())).collect();
        v.sort_by_key(|(k, _)| *k);
        v
    }
}

impl LitRewriter {
    /// Normalizer with the given options.
    #[must_use]
    pub fn new(config: RewriteConfig) -> Self {
        Self { config }
    }

    /// Normalize a formula. Idempotent and semantics-preserving.
    pub fn rewrite(&self, tm: &mut TermManager, t: TermId) -> TermId {
        match tm.kind(t).clone() {
            TermKind::Not(a) => {
                let ra = self.rewrite(tm, a);
                if let Some(neg) = self.negate_atom(tm, ra) {
                    neg
                } else {
                    tm.mk_not(ra)
                }
            }
            TermKind::And(args) => {
                let rs = args.iter().map(|&a| self.rewrite(tm, a)).collect();
                tm.mk_and(rs)
            }
            TermKind::Or(args) => {
                let rs = args.iter().map(|&a| self.rewrite(tm, a)).collect();
                tm.mk_or(rs)
            }
            TermKind::Implies(a, b) => {
                let ra = self.rewrite(tm, a);
                let rb = self.rewrite(tm, b);
                tm.mk_implies(ra, rb)
            }
            TermKind::Iff(a, b) => {
                let ra = self.rewrite(tm, a);
                let rb = self.rewrite(tm, b);
                tm.mk_iff(ra, rb)
            }
            TermKind::Ite(c, a, b) => {
                let rc = self.rewrite(tm, c);
                let ra = self.rewrite(tm, a);
                let rb = self.rewrite(tm, b);
                tm.mk_ite(rc, ra, rb)
            }
            TermKind::Le(a, b) => self.rewrite_cmp(tm, a, b, Rel::Le),
            TermKind::Lt(a, b) => self.rewrite_cmp(tm, a, b, Rel::Lt),
            TermKind::Eq(a, b) => self.rewrite_eq(tm, a, b),
            TermKind::Exists(vars, body) => {
                let rb = self.rewrite(tm, body);
                let vars = vars
                    .into_iter()
                    .filter(|v| tm.occurs(*v, rb))
                    .collect::<Vec<_>>();
                tm.mk_exists(vars, rb)
            }
            TermKind::Forall(vars, body) => {
                let rb = self.rewrite(tm, body);
                let vars = vars
                    .into_iter()
                    .filter(|v| tm.occurs(*v, rb))
                    .collect::<Vec<_>>();
                tm.mk_forall(vars, rb)
            }
            _ => t,
        }
    }

    /// Push a negation into a normalized linear atom, when the shape
    /// allows it without a model.
    fn negate_atom(&self, tm: &mut TermManager, t: TermId) -> Option<TermId> {
        match tm.kind(t) {
            TermKind::Le(a, b) => {
                let (a, b) = (*a, *b);
                Some(self.rewrite_cmp(tm, b, a, Rel::Lt))
            }
            TermKind::Lt(a, b) => {
                let (a, b) = (*a, *b);
                Some(self.rewrite_cmp(tm, b, a, Rel::Le))
            }
            _ => None,
        }
    }

    fn rewrite_eq(&self, tm: &mut TermManager, a: TermId, b: TermId) -> TermId {
        let sa = tm.sort_of(a);
        if sa.is_bool() {
            let ra = self.rewrite(tm, a);
            let rb = self.rewrite(tm, b);
            return tm.mk_iff(ra, rb);
        }
        if !sa.is_arith() {
            // uninterpreted-sort equality passes through
            return tm.mk_eq(a, b);
        }
        // divisibility shape: (t mod k) = r with ground k, r
        if let Some(d) = self
            .match_divides(tm, a, b)
            .or_else(|| self.match_divides(tm, b, a))
        {
            return d;
        }
        self.rewrite_cmp(tm, a, b, Rel::Eq)
    }

    /// `(t mod k) = r` where `k` and `r` fold to numerals.
    fn match_divides(&self, tm: &mut TermManager, lhs: TermId, rhs: TermId) -> Option<TermId> {
        let (t, k) = match tm.kind(lhs) {
            TermKind::Mod(t, k) => (*t, *k),
            _ => return None,
        };
        let k = fold_ground(tm, k)?;
        let r = fold_ground(tm, rhs)?;
        if !k.is_integer() || k.is_zero() || !r.is_integer() {
            return None;
        }
        let k = k.to_integer().abs();
        // k | (t - r)
        let mut lin = Linear::default();
        if linearize(tm, t, &BigRational::one(), &mut lin).is_err() {
            return None;
        }
        lin.constant -= r;
        Some(self.build_divides(tm, lin, k))
    }

    fn build_divides(&self, tm: &mut TermManager, mut lin: Linear, k: BigInt) -> TermId {
        if lin.is_constant() {
            let holds = lin.constant.is_integer()
                && lin.constant.to_integer().mod_floor(&k).is_zero();
            return tm.mk_bool(holds);
        }
        let scale = integer_scale(&mut lin);
        let k = k * scale.to_integer();
        // reduce by the common divisor of all coefficients and the modulus
        let mut g = k.clone();
        for c in lin.coeffs.values() {
            g = g.gcd(&c.to_integer());
        }
        g = g.gcd(&lin.constant.to_integer());
        if g > BigInt::one() {
            for c in lin.coeffs.values_mut() {
                *c /= BigRational::from_integer(g.clone());
            }
            lin.constant /= BigRational::from_integer(g.clone());
        }
        let k = k / g;
        if k.is_one() {
            return tm.mk_true();
        }
        // constant reduced into [0, k)
        let c = lin.constant.to_integer().mod_floor(&k);
        lin.constant = BigRational::from_integer(c);
        let int_sort = tm.sorts.int_sort;
        let sum = self.build_sum(tm, &lin, int_sort);
        tm.mk_divides(&k, sum)
    }

    fn rewrite_cmp(&self, tm: &mut TermManager, a: TermId, b: TermId, rel: Rel) -> TermId {
        let sort = tm.sort_of(a);
        let mut lin = Linear::default();
        let one = BigRational::one();
        let ok = linearize(tm, a, &one, &mut lin).is_ok()
            && linearize(tm, b, &-one, &mut lin).is_ok();
        if !ok {
            // non-linear atom: leave the shape, children as given
            return match rel {
                Rel::Le => tm.mk_le(a, b),
                Rel::Lt => tm.mk_lt(a, b),
                Rel::Eq => tm.mk_eq(a, b),
            };
        }
        if lin.is_constant() {
            let holds = match rel {
                Rel::Le => lin.constant <= BigRational::zero(),
                Rel::Lt => lin.constant < BigRational::zero(),
                Rel::Eq => lin.constant.is_zero(),
            };
            return tm.mk_bool(holds);
        }
        let is_int = sort.is_int();
        let mut rel = rel;
        integer_scale(&mut lin);
        if is_int && rel == Rel::Lt {
            // t < 0  ==>  t + 1 <= 0 on integers
            lin.constant += BigRational::one();
            rel = Rel::Le;
        }
        // divide through the coefficient gcd
        let mut g = BigInt::zero();
        for c in lin.coeffs.values() {
            g = g.gcd(&c.to_integer());
        }
        if g > BigInt::one() {
            let gr = BigRational::from_integer(g.clone());
            match rel {
                Rel::Eq if is_int => {
                    if !(&lin.constant / &gr).is_integer() {
                        return tm.mk_false();
                    }
                    for c in lin.coeffs.values_mut() {
                        *c /= &gr;
                    }
                    lin.constant /= &gr;
                }
                Rel::Le if is_int && self.config.gcd_rounding => {
                    for c in lin.coeffs.values_mut() {
                        *c /= &gr;
                    }
                    lin.constant = BigRational::from_integer((&lin.constant / &gr).ceil().to_integer());
                }
                _ if !is_int => {
                    for c in lin.coeffs.values_mut() {
                        *c /= &gr;
                    }
                    lin.constant /= &gr;
                }
                _ => {}
            }
        }
        if rel == Rel::Eq {
            // sign canonicalization: lowest base has a positive coefficient
            let ordered = lin.ordered();
            if let Some((_, c)) = ordered.first() {
                if c.is_negative() {
                    for v in lin.coeffs.values_mut() {
                        *v = -v.clone();
                    }
                    lin.constant = -lin.constant.clone();
                }
            }
        }
        let sort_id = if is_int {
            tm.sorts.int_sort
        } else {
            tm.sorts.real_sort
        };
        let sum = self.build_sum(tm, &lin, sort_id);
        let zero = tm.mk_num(BigRational::zero(), sort_id);
        match rel {
            Rel::Le => tm.mk_le(sum, zero),
            Rel::Lt => tm.mk_lt(sum, zero),
            Rel::Eq => tm.mk_eq(sum, zero),
        }
    }

    fn build_sum(&self, tm: &mut TermManager, lin: &Linear, sort: SortId) -> TermId {
        let mut parts = Vec::new();
        for (base, coeff) in lin.ordered() {
            parts.push(tm.mk_mul_num(&coeff, base));
        }
        if !lin.constant.is_zero() {
            parts.push(tm.mk_num(lin.constant.clone(), sort));
        }
        tm.mk_add(parts, sort)
    }
}

/// Multiply through denominators so all coefficients and the constant are
/// integers; returns the (positive) scale applied.
fn integer_scale(lin: &mut Linear) -> BigRational {
    let mut lcm = BigInt::one();
    for c in lin.coeffs.values() {
        lcm = lcm.lcm(c.denom());
    }
    lcm = lcm.lcm(lin.constant.denom());
    let scale = BigRational::from_integer(lcm);
    if !scale.is_one() {
        for c in lin.coeffs.values_mut() {
            *c *= &scale;
        }
        lin.constant *= &scale;
    }
    scale
}

/// Fold a fully-ground arithmetic term to a rational.
pub(crate) fn fold_ground(tm: &TermManager, t: TermId) -> Option<BigRational> {
    match tm.kind(t) {
        TermKind::Num(r) => Some(r.clone()),
        TermKind::Add(args) => {
            let mut sum = BigRational::zero();
            for &a in args {
                sum += fold_ground(tm, a)?;
            }
            Some(sum)
        }
        TermKind::Sub(a, b) => Some(fold_ground(tm, *a)? - fold_ground(tm, *b)?),
        TermKind::Neg(a) => Some(-fold_ground(tm, *a)?),
        TermKind::Mul(a, b) => Some(fold_ground(tm, *a)? * fold_ground(tm, *b)?),
        TermKind::Mod(a, b) => {
            let a = fold_ground(tm, *a)?;
            let b = fold_ground(tm, *b)?;
            if !a.is_integer() || !b.is_integer() || b.is_zero() {
                return None;
            }
            Some(BigRational::from_integer(
                a.to_integer().mod_floor(&b.to_integer().abs()),
            ))
        }
        _ => None,
    }
}

/// Decompose `t` as a linear combination over base terms, accumulating
/// `mul * t` into `lin`. Fails on genuinely non-linear structure
/// (a product of two non-ground terms).
fn linearize(
    tm: &TermManager,
    t: TermId,
    mul: &BigRational,
    lin: &mut Linear,
) -> std::result::Result<(), ()> {
    if let Some(c) = fold_ground(tm, t) {
        lin.constant += mul * c;
        return Ok(());
    }
    match tm.kind(t) {
        TermKind::Add(args) => {
            for &a in args.clone().iter() {
                linearize(tm, a, mul, lin)?;
            }
            Ok(())
        }
        TermKind::Sub(a, b) => {
            let (a, b) = (*a, *b);
            linearize(tm, a, mul, lin)?;
            linearize(tm, b, &-mul.clone(), lin)
        }
        TermKind::Neg(a) => {
            let a = *a;
            linearize(tm, a, &-mul.clone(), lin)
        }
        TermKind::Mul(a, b) => {
            let (a, b) = (*a, *b);
            if let Some(c) = fold_ground(tm, a) {
                linearize(tm, b, &(mul * c), lin)
            } else if let Some(c) = fold_ground(tm, b) {
                linearize(tm, a, &(mul * c), lin)
            } else {
                Err(())
            }
        }
        TermKind::Var(_) | TermKind::Mod(_, _) | TermKind::Ite(_, _, _) => {
            lin.add(t, mul);
            Ok(())
        }
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_rw() -> LitRewriter {
        LitRewriter::new(RewriteConfig::default())
    }

    #[test]
    fn folds_ground_atoms() {
        let mut tm = TermManager::new();
        let rw = int_rw();
        let two = tm.mk_int(BigInt::from(2));
        let five = tm.mk_int(BigInt::from(5));
        let le = tm.mk_le(two, five);
        assert_eq!(rw.rewrite(&mut tm, le), tm.mk_true());
        let lt = tm.mk_lt(five, two);
        assert_eq!(rw.rewrite(&mut tm, lt), tm.mk_false());
    }

    #[test]
    fn gcd_rounding_tightens() {
        // 2x <= 5  ==>  x <= 2  (i.e. x - 2 <= 0)
        let mut tm = TermManager::new();
        let rw = int_rw();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let two = tm.mk_int(BigInt::from(2));
        let five = tm.mk_int(BigInt::from(5));
        let tx = tm.mk_mul(two, x);
        let le = tm.mk_le(tx, five);
        let out = rw.rewrite(&mut tm, le);
        let minus_two = tm.mk_int(BigInt::from(-2));
        let sum = tm.mk_add(vec![x, minus_two], tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        assert_eq!(out, tm.mk_le(sum, zero));
    }

    #[test]
    fn equality_gcd_conflict_folds_false() {
        // 2x = 1 over Int is false by parity
        let mut tm = TermManager::new();
        let rw = int_rw();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let two = tm.mk_int(BigInt::from(2));
        let one = tm.mk_int(BigInt::from(1));
        let tx = tm.mk_mul(two, x);
        let eq = tm.mk_eq(tx, one);
        assert_eq!(rw.rewrite(&mut tm, eq), tm.mk_false());
    }

    #[test]
    fn strict_int_becomes_nonstrict() {
        // x < 0  ==>  x + 1 <= 0
        let mut tm = TermManager::new();
        let rw = int_rw();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let lt = tm.mk_lt(x, zero);
        let out = rw.rewrite(&mut tm, lt);
        let one = tm.mk_int(BigInt::from(1));
        let sum = tm.mk_add(vec![x, one], tm.sorts.int_sort);
        assert_eq!(out, tm.mk_le(sum, zero));
    }

    #[test]
    fn divisibility_reduces() {
        // 4 | (2x + 2)  ==>  2 | (x + 1)
        let mut tm = TermManager::new();
        let rw = int_rw();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let two = tm.mk_int(BigInt::from(2));
        let tx = tm.mk_mul(two, x);
        let sum = tm.mk_add(vec![tx, two], tm.sorts.int_sort);
        let d = tm.mk_divides(&BigInt::from(4), sum);
        let out = rw.rewrite(&mut tm, d);
        let one = tm.mk_int(BigInt::from(1));
        let expect_sum = tm.mk_add(vec![x, one], tm.sorts.int_sort);
        let expect = tm.mk_divides(&BigInt::from(2), expect_sum);
        assert_eq!(out, expect);
    }

    #[test]
    fn divides_one_is_true() {
        let mut tm = TermManager::new();
        let rw = int_rw();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let d = tm.mk_divides(&BigInt::from(1), x);
        assert_eq!(rw.rewrite(&mut tm, d), tm.mk_true());
    }

    #[test]
    fn idempotent() {
        let mut tm = TermManager::new();
        let rw = int_rw();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let three = tm.mk_int(BigInt::from(3));
        let six = tm.mk_int(BigInt::from(6));
        let tx = tm.mk_mul(three, x);
        let ty = tm.mk_mul(six, y);
        let sum = tm.mk_add(vec![tx, ty], tm.sorts.int_sort);
        let seven = tm.mk_int(BigInt::from(7));
        let le = tm.mk_le(sum, seven);
        let once = rw.rewrite(&mut tm, le);
        let twice = rw.rewrite(&mut tm, once);
        assert_eq!(once, twice);
    }

    #[test]
    fn negation_pushes_into_order_atoms() {
        let mut tm = TermManager::new();
        let rw = int_rw();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let le = tm.mk_le(x, zero);
        let nle = tm.mk_not(le);
        let out = rw.rewrite(&mut tm, nle);
        // not (x <= 0)  ==>  0 < x  ==>  -x + 1 <= 0 on Int
        assert!(!matches!(tm.kind(out), TermKind::Not(_)));
        let one = tm.mk_int(BigInt::from(1));
        let neg_x = tm.mk_mul_num(&BigRational::from_integer(BigInt::from(-1)), x);
        let sum = tm.mk_add(vec![neg_x, one], tm.sorts.int_sort);
        assert_eq!(out, tm.mk_le(sum, zero));
    }
}
