//! Model-Guided Arithmetic Projection.
//!
//! Eliminates one arithmetic variable at a time from a conjunction of
//! literals, guided by a model of the conjunction. Loos-Weispfenning
//! virtual substitution for reals, with the integer refinements:
//! divisibility accumulation from `mod` occurrences, strict inequalities
//! tightened to non-strict, an equality short-circuit, and a bounded
//! residue split when two opposite bounds both have non-unit
//! coefficients.
//!
//! Every emitted literal is normalized by the rewriter and must remain
//! true under the model; the output conjunction is entailed by the
//! existential closure of the input.

use crate::ast::{TermId, TermKind, TermManager};
use crate::error::{QsatError, Result};
use crate::model::{Model, Value};
use crate::rewrite::{LitRewriter, RewriteConfig};
use crate::sort::SortId;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use tracing::{debug, trace};

/// Counters for a projector instance.
#[derive(Debug, Clone, Default)]
pub struct ProjectStats {
    /// Variables eliminated.
    pub vars_projected: u64,
    /// Variables handed back to the caller.
    pub vars_retained: u64,
    /// Residue case splits emitted for non-unit opposite bounds.
    pub residue_splits: u64,
    /// Equality short-circuits taken.
    pub equality_substitutions: u64,
}

/// `c·x + t ⋈ 0` with an x-free `t`.
#[derive(Debug, Clone)]
struct Ineq {
    coeff: BigRational,
    term: TermId,
    strict: bool,
}

/// `d | (c·x + t)` with an x-free `t`.
#[derive(Debug, Clone)]
struct DivLit {
    coeff: BigRational,
    term: TermId,
    divisor: BigInt,
}

/// Classified literal over the current variable.
struct LinLit {
    coeff: BigRational,
    term: TermId,
    strict: bool,
    is_eq: bool,
}

/// One-variable projection engine. State is reset per variable; the
/// rewriter configuration is fixed at construction.
pub struct ArithProjector {
    rw: LitRewriter,
    var: Option<TermId>,
    ineqs: Vec<Ineq>,
    divs: Vec<DivLit>,
    new_lits: Vec<TermId>,
    delta: BigInt,
    u: BigInt,
    stats: ProjectStats,
}

impl ArithProjector {
    /// Projector with gcd rounding on, as the elimination lemmas expect.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RewriteConfig { gcd_rounding: true })
    }

    /// Projector with an explicit rewriter configuration.
    #[must_use]
    pub fn with_config(config: RewriteConfig) -> Self {
        Self {
            rw: LitRewriter::new(config),
            var: None,
            ineqs: Vec::new(),
            divs: Vec::new(),
            new_lits: Vec::new(),
            delta: BigInt::one(),
            u: BigInt::zero(),
            stats: ProjectStats::default(),
        }
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> &ProjectStats {
        &self.stats
    }

    /// Project every arithmetic variable of `vars` out of the conjunction
    /// `lits`. Returns the variables that could not be projected and the
    /// projected conjunction. The model is extended in place when the
    /// divisibility substitution re-interprets a variable.
    pub fn project_all(
        &mut self,
        tm: &mut TermManager,
        model: &mut Model,
        vars: &[TermId],
        lits: &[TermId],
    ) -> Result<(Vec<TermId>, TermId)> {
        let mut retained = Vec::new();
        let mut cur: Vec<TermId> = lits.to_vec();
        for &v in vars {
            if !tm.sort_of(v).is_arith() {
                retained.push(v);
                continue;
            }
            match self.project(tm, model, v, &mut cur) {
                Ok(()) => {
                    self.stats.vars_projected += 1;
                    trace!(var = %tm.display(v), "projected");
                }
                Err(QsatError::CantProject { term }) => {
                    self.stats.vars_retained += 1;
                    debug!(var = %tm.display(v), term = %term, "retained, cannot project");
                    retained.push(v);
                }
                Err(e) => return Err(e),
            }
        }
        let conj = tm.mk_and(cur);
        Ok((retained, conj))
    }

    /// Eliminate `x` from `lits`, which the model satisfies.
    pub fn project(
        &mut self,
        tm: &mut TermManager,
        model: &mut Model,
        x: TermId,
        lits: &mut Vec<TermId>,
    ) -> Result<()> {
        self.reset(x);
        let is_int = self.is_int(tm);
        let mut num_pos = 0usize;
        let mut num_neg = 0usize;
        let mut found_eq = false;
        let mut eq_index = 0usize;

        for &lit in lits.iter() {
            if !tm.occurs(x, lit) {
                self.new_lits.push(lit);
                continue;
            }
            let ll = self.linearize_lit(tm, model, lit)?;
            if ll.coeff.is_zero() {
                // the variable only occurred under mod; emit the x-free rest
                let zero = self.mk_num(tm, &BigRational::zero());
                let atom = if ll.is_eq {
                    tm.mk_eq(ll.term, zero)
                } else if ll.strict {
                    tm.mk_lt(ll.term, zero)
                } else {
                    tm.mk_le(ll.term, zero)
                };
                let mut out = std::mem::take(&mut self.new_lits);
                self.add_lit(tm, model, &mut out, atom)?;
                self.new_lits = out;
            } else {
                self.ineqs.push(Ineq {
                    coeff: ll.coeff.clone(),
                    term: ll.term,
                    strict: ll.strict,
                });
                if ll.is_eq {
                    found_eq = true;
                    eq_index = self.ineqs.len() - 1;
                } else if ll.coeff.is_positive() {
                    num_pos += 1;
                } else {
                    num_neg += 1;
                }
            }
        }

        lits.clear();
        lits.append(&mut self.new_lits);

        if found_eq {
            self.stats.equality_substitutions += 1;
            return self.apply_equality(tm, model, eq_index, lits);
        }
        if self.divs.is_empty() && (num_pos == 0 || num_neg == 0) {
            return Ok(());
        }
        if !self.divs.is_empty() {
            self.apply_divides(tm, model, lits)?;
        }
        if num_pos == 0 || num_neg == 0 {
            return Ok(());
        }
        let use_pos = num_pos < num_neg;
        let max_t = self.find_max(tm, model, use_pos, is_int)?;

        for i in 0..self.ineqs.len() {
            if i == max_t {
                continue;
            }
            if self.ineqs[i].coeff.is_positive() == use_pos {
                let t = self.mk_le(tm, i, max_t);
                self.add_lit(tm, model, lits, t)?;
            } else {
                self.mk_lt(tm, model, lits, i, max_t, is_int)?;
            }
        }
        Ok(())
    }

    fn reset(&mut self, x: TermId) {
        self.var = Some(x);
        self.ineqs.clear();
        self.divs.clear();
        self.new_lits.clear();
        self.delta = BigInt::one();
        self.u = BigInt::zero();
    }

    /// The variable under elimination.
    fn x(&self) -> TermId {
        self.var.expect("projection variable is set")
    }

    fn is_int(&self, tm: &TermManager) -> bool {
        tm.sort_of(self.x()).is_int()
    }

    fn var_sort(&self, tm: &TermManager) -> SortId {
        tm.sort_id_of(self.x())
    }

    fn mk_num(&self, tm: &mut TermManager, r: &BigRational) -> TermId {
        let s = self.var_sort(tm);
        tm.mk_num(r.clone(), s)
    }

    /// Classify a literal over `x` as `c·x + t ⋈ 0`.
    fn linearize_lit(
        &mut self,
        tm: &mut TermManager,
        model: &mut Model,
        lit: TermId,
    ) -> Result<LinLit> {
        let (is_not, body) = match tm.kind(lit) {
            TermKind::Not(inner) => (true, *inner),
            _ => (false, lit),
        };
        let mut c = BigRational::zero();
        let mut ts: Vec<TermId> = Vec::new();
        let mul = if is_not {
            -BigRational::one()
        } else {
            BigRational::one()
        };
        let mut strict;
        let mut is_eq = false;
        match tm.kind(body).clone() {
            TermKind::Le(e1, e2) => {
                self.linearize(tm, model, &mul, e1, &mut c, &mut ts)?;
                self.linearize(tm, model, &-mul.clone(), e2, &mut c, &mut ts)?;
                strict = is_not;
            }
            TermKind::Lt(e1, e2) => {
                self.linearize(tm, model, &mul, e1, &mut c, &mut ts)?;
                self.linearize(tm, model, &-mul.clone(), e2, &mut c, &mut ts)?;
                strict = !is_not;
            }
            TermKind::Eq(e1, e2) if tm.sort_of(e1).is_arith() && !is_not => {
                self.linearize(tm, model, &mul, e1, &mut c, &mut ts)?;
                self.linearize(tm, model, &-mul.clone(), e2, &mut c, &mut ts)?;
                strict = false;
                is_eq = true;
            }
            TermKind::Eq(e1, e2) if tm.sort_of(e1).is_arith() && is_not => {
                // orient the disequality as a strict inequality the model
                // satisfies
                let r1 = model.eval_rational(tm, e1)?;
                let r2 = model.eval_rational(tm, e2)?;
                if r1 == r2 {
                    return Err(QsatError::internal(format!(
                        "disequality {} not satisfied by model",
                        tm.display(lit)
                    )));
                }
                let (e1, e2) = if r1 < r2 { (e2, e1) } else { (e1, e2) };
                strict = true;
                self.linearize(tm, model, &mul, e1, &mut c, &mut ts)?;
                self.linearize(tm, model, &-mul.clone(), e2, &mut c, &mut ts)?;
            }
            _ => {
                return Err(QsatError::cant_project(tm.display(lit)));
            }
        }
        if strict && self.is_int(tm) {
            let one = self.mk_num(tm, &BigRational::one());
            ts.push(one);
            strict = false;
        }
        let sort = self.var_sort(tm);
        let mut t = tm.mk_add(ts, sort);
        if is_eq && c.is_negative() {
            t = tm.mk_neg(t);
            c = -c;
        }
        Ok(LinLit {
            coeff: c,
            term: t,
            strict,
            is_eq,
        })
    }

    /// Accumulate `mul·t` as `c·x + Σ ts` with x-free `ts`.
    fn linearize(
        &mut self,
        tm: &mut TermManager,
        model: &mut Model,
        mul: &BigRational,
        t: TermId,
        c: &mut BigRational,
        ts: &mut Vec<TermId>,
    ) -> Result<()> {
        if t == self.x() {
            *c += mul;
            return Ok(());
        }
        match tm.kind(t).clone() {
            TermKind::Mul(t1, t2) => {
                if let Some(n) = tm.numeral(t1).cloned() {
                    self.linearize(tm, model, &(mul * n), t2, c, ts)
                } else if let Some(n) = tm.numeral(t2).cloned() {
                    self.linearize(tm, model, &(mul * n), t1, c, ts)
                } else if tm.occurs(self.x(), t) {
                    Err(QsatError::cant_project(tm.display(t)))
                } else {
                    ts.push(tm.mk_mul_num(mul, t));
                    Ok(())
                }
            }
            TermKind::Add(args) => {
                for &a in args.iter() {
                    self.linearize(tm, model, mul, a, c, ts)?;
                }
                Ok(())
            }
            TermKind::Sub(t1, t2) => {
                self.linearize(tm, model, mul, t1, c, ts)?;
                self.linearize(tm, model, &-mul.clone(), t2, c, ts)
            }
            TermKind::Neg(t1) => self.linearize(tm, model, &-mul.clone(), t1, c, ts),
            TermKind::Num(n) => {
                let v = self.mk_num(tm, &(mul * n));
                ts.push(v);
                Ok(())
            }
            TermKind::Mod(_, _) if tm.occurs(self.x(), t) => {
                let val = self.extract_mod(tm, model, t)?;
                ts.push(tm.mk_mul_num(mul, val));
                Ok(())
            }
            _ => {
                if tm.occurs(self.x(), t) {
                    trace!(term = %tm.display(t), "cannot project");
                    Err(QsatError::cant_project(tm.display(t)))
                } else {
                    ts.push(tm.mk_mul_num(mul, t));
                    Ok(())
                }
            }
        }
    }

    /// `t = (a·x + s) mod k` under the model: replace the occurrence by
    /// its value and record the divisibility side condition.
    fn extract_mod(
        &mut self,
        tm: &mut TermManager,
        model: &mut Model,
        t: TermId,
    ) -> Result<TermId> {
        let (arg, k) = match tm.kind(t) {
            TermKind::Mod(arg, k) => (*arg, *k),
            _ => return Err(QsatError::cant_project(tm.display(t))),
        };
        let Some(k) = tm.numeral(k).cloned() else {
            return Err(QsatError::cant_project(tm.display(t)));
        };
        if !k.is_integer() || k.is_zero() {
            return Err(QsatError::cant_project(tm.display(t)));
        }
        let mut c = BigRational::zero();
        let mut ts: Vec<TermId> = Vec::new();
        let one = BigRational::one();
        self.linearize(tm, model, &one, arg, &mut c, &mut ts)?;
        let sort = self.var_sort(tm);
        let s = tm.mk_add(ts, sort);
        let v = model.eval_rational(tm, t)?;
        let val = self.mk_num(tm, &v);
        trace!(
            term = %tm.display(t),
            value = %v,
            coeff = %c,
            "mod occurrence"
        );
        if !c.is_zero() {
            let shifted = tm.mk_sub(s, val);
            self.divs.push(DivLit {
                coeff: c,
                term: shifted,
                divisor: k.to_integer().abs(),
            });
        } else {
            let kn = self.mk_num(tm, &k);
            let m = tm.mk_mod(s, kn);
            let eq = tm.mk_eq(m, val);
            let mut out = std::mem::take(&mut self.new_lits);
            self.add_lit(tm, model, &mut out, eq)?;
            self.new_lits = out;
        }
        Ok(val)
    }

    /// Rewrite, check against the model, and keep non-trivial literals.
    fn add_lit(
        &self,
        tm: &mut TermManager,
        model: &Model,
        lits: &mut Vec<TermId>,
        e: TermId,
    ) -> Result<()> {
        let r = self.rw.rewrite(tm, e);
        trace!(from = %tm.display(e), to = %tm.display(r), "emit");
        if !model.is_true(tm, e)? {
            return Err(QsatError::internal(format!(
                "emitted literal {} is false under the model",
                tm.display(e)
            )));
        }
        if tm.bool_value(r) != Some(true) {
            lits.push(r);
        }
        Ok(())
    }

    /// Index of the representative bound on the chosen side.
    fn find_max(
        &self,
        tm: &TermManager,
        model: &Model,
        do_pos: bool,
        is_int: bool,
    ) -> Result<usize> {
        let mut result = None;
        let mut max_r = BigRational::zero();
        for (i, ineq) in self.ineqs.iter().enumerate() {
            if ineq.coeff.is_positive() != do_pos {
                continue;
            }
            let r = model.eval_rational(tm, ineq.term)? / ineq.coeff.abs();
            let new_max = match result {
                None => true,
                Some(prev) => {
                    let prev_ineq: &Ineq = &self.ineqs[prev];
                    r > max_r
                        || (r == max_r && ineq.strict && !prev_ineq.strict)
                        || (r == max_r && is_int && ineq.coeff.abs().is_one())
                }
            };
            if new_max {
                result = Some(i);
                max_r = r;
            }
        }
        result.ok_or_else(|| QsatError::internal("no bound on the chosen side"))
    }

    /// Same-sign pair: the representative dominates, `t_i/|c_i| <= t*/|c*|`.
    fn mk_le(&self, tm: &mut TermManager, i: usize, j: usize) -> TermId {
        let a = &self.ineqs[i];
        let b = &self.ineqs[j];
        let bt = tm.mk_mul_num(&b.coeff.abs(), a.term);
        let as_ = tm.mk_mul_num(&a.coeff.abs(), b.term);
        if a.strict && !b.strict {
            tm.mk_lt(bt, as_)
        } else {
            tm.mk_le(bt, as_)
        }
    }

    /// Opposite-sign pair: resolve the two bounds against each other.
    fn mk_lt(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        lits: &mut Vec<TermId>,
        i: usize,
        j: usize,
        is_int: bool,
    ) -> Result<()> {
        let ac = self.ineqs[i].coeff.clone();
        let bc = self.ineqs[j].coeff.clone();
        if is_int && !ac.abs().is_one() && !bc.abs().is_one() {
            return self.mk_int_lt(tm, model, lits, i, j);
        }
        let t = self.ineqs[i].term;
        let s = self.ineqs[j].term;
        let strict = self.ineqs[i].strict || self.ineqs[j].strict;
        let bt = tm.mk_mul_num(&bc.abs(), t);
        let as_ = tm.mk_mul_num(&ac.abs(), s);
        let sort = self.var_sort(tm);
        let ts = tm.mk_add(vec![bt, as_], sort);
        let zero = self.mk_num(tm, &BigRational::zero());
        let fml = if strict {
            tm.mk_lt(ts, zero)
        } else {
            tm.mk_le(ts, zero)
        };
        self.add_lit(tm, model, lits, fml)
    }

    /// Opposite-sign integer bounds with non-unit coefficients: either the
    /// slack resolvent holds in the model, or a bounded residue split over
    /// the smaller coefficient encodes the disjunction in closed form.
    fn mk_int_lt(
        &mut self,
        tm: &mut TermManager,
        model: &Model,
        lits: &mut Vec<TermId>,
        i: usize,
        j: usize,
    ) -> Result<()> {
        let ac = self.ineqs[i].coeff.clone();
        let bc = self.ineqs[j].coeff.clone();
        let mut t = self.ineqs[i].term;
        let mut s = self.ineqs[j].term;
        if self.ineqs[i].strict || self.ineqs[j].strict {
            return Err(QsatError::internal(
                "strict integer inequality survived tightening",
            ));
        }
        let mut abs_a = ac.abs();
        let mut abs_b = bc.abs();
        let as_ = tm.mk_mul_num(&abs_a, s);
        let bt = tm.mk_mul_num(&abs_b, t);

        let slack = (&abs_a - BigRational::one()) * (&abs_b - BigRational::one());
        let mut tval = model.eval_rational(tm, t)?;
        let mut sval = model.eval_rational(tm, s)?;
        let use_case1 = &ac * &sval + &bc * &tval + &slack <= BigRational::zero();
        if use_case1 {
            let neg_slack = self.mk_num(tm, &-slack.clone());
            let sort = self.var_sort(tm);
            let sum = tm.mk_add(vec![as_, bt, neg_slack], sort);
            let zero = self.mk_num(tm, &BigRational::zero());
            let fml = tm.mk_le(sum, zero);
            return self.add_lit(tm, model, lits, fml);
        }

        self.stats.residue_splits += 1;
        let mut a1 = ac;
        let mut b1 = bc;
        if abs_a < abs_b {
            std::mem::swap(&mut abs_a, &mut abs_b);
            std::mem::swap(&mut a1, &mut b1);
            std::mem::swap(&mut s, &mut t);
            std::mem::swap(&mut sval, &mut tval);
        }

        // residue z with |b| | (s + z), chosen so the model satisfies it
        let abs_b_int = abs_b.to_integer();
        let mut z = sval.to_integer().mod_floor(&abs_b_int);
        if !z.is_zero() {
            z = &abs_b_int - z;
        }
        let zn = self.mk_num(tm, &BigRational::from_integer(z));
        let sort = self.var_sort(tm);
        let s_plus_z = tm.mk_add(vec![zn, s], sort);

        let div = tm.mk_divides(&abs_b_int, s_plus_z);
        self.add_lit(tm, model, lits, div)?;

        let factor = &a1 * n_sign(&b1);
        let lhs = tm.mk_mul_num(&factor, s_plus_z);
        let rhs = tm.mk_mul_num(&abs_b, t);
        let sum = tm.mk_add(vec![lhs, rhs], sort);
        let zero = self.mk_num(tm, &BigRational::zero());
        let fml = tm.mk_le(sum, zero);
        self.add_lit(tm, model, lits, fml)
    }

    /// `c·x + t = 0` with `c > 0`: substitute the equality into every
    /// other literal and terminate.
    fn apply_equality(
        &mut self,
        tm: &mut TermManager,
        model: &mut Model,
        eq_index: usize,
        lits: &mut Vec<TermId>,
    ) -> Result<()> {
        let c = self.ineqs[eq_index].coeff.clone();
        let t = self.ineqs[eq_index].term;
        if !c.is_positive() {
            return Err(QsatError::internal("equality coefficient not normalized"));
        }
        if self.is_int(tm) && !c.is_one() {
            let d = tm.mk_divides(&c.to_integer(), t);
            self.add_lit(tm, model, lits, d)?;
        }
        for k in 0..self.divs.len() {
            let dv = self.divs[k].clone();
            let cd = (&c * BigRational::from_integer(dv.divisor.clone())).to_integer();
            let cs = tm.mk_mul_num(&c, dv.term);
            let at = tm.mk_mul_num(&dv.coeff, t);
            let diff = tm.mk_sub(cs, at);
            let d = tm.mk_divides(&cd, diff);
            self.add_lit(tm, model, lits, d)?;
        }
        for i in 0..self.ineqs.len() {
            if i == eq_index {
                continue;
            }
            let ineq = self.ineqs[i].clone();
            let ct = tm.mk_mul_num(&c, ineq.term);
            let bt = tm.mk_mul_num(&ineq.coeff, t);
            let lhs = tm.mk_sub(ct, bt);
            let zero = self.mk_num(tm, &BigRational::zero());
            let fml = if ineq.strict {
                tm.mk_lt(lhs, zero)
            } else {
                tm.mk_le(lhs, zero)
            };
            self.add_lit(tm, model, lits, fml)?;
        }
        Ok(())
    }

    /// Consolidate the divisibility literals: emit their residue
    /// instances, rescale the inequalities by the divisor lcm, and
    /// re-interpret the variable as `(M(x) - u) / delta`.
    fn apply_divides(
        &mut self,
        tm: &mut TermManager,
        model: &mut Model,
        lits: &mut Vec<TermId>,
    ) -> Result<()> {
        if !self.delta.is_one() {
            return Err(QsatError::internal("divisor lcm already consolidated"));
        }
        if self.divs.is_empty() {
            return Ok(());
        }
        for d in &self.divs {
            self.delta = self.delta.lcm(&d.divisor);
        }
        let x_val = model.eval_rational(tm, self.x())?;
        if !x_val.is_integer() {
            return Err(QsatError::internal("integer variable with non-integer value"));
        }
        let x_int = x_val.to_integer();
        self.u = x_int.mod_floor(&self.delta);
        trace!(delta = %self.delta, u = %self.u, "divisibility consolidation");

        let u_rat = BigRational::from_integer(self.u.clone());
        for k in 0..self.divs.len() {
            let dv = self.divs[k].clone();
            let cu = self.mk_num(tm, &(&dv.coeff * &u_rat));
            let sort = self.var_sort(tm);
            let sum = tm.mk_add(vec![cu, dv.term], sort);
            let d = tm.mk_divides(&dv.divisor, sum);
            self.add_lit(tm, model, lits, d)?;
        }

        // x := delta·x' + u ; the new x is (x - u) / delta
        let delta_rat = BigRational::from_integer(self.delta.clone());
        for i in 0..self.ineqs.len() {
            if !self.u.is_zero() {
                let un = self.mk_num(tm, &u_rat);
                self.ineqs[i].term = tm.mk_sub(self.ineqs[i].term, un);
            }
            self.ineqs[i].coeff *= &delta_rat;
        }
        let new_val = (x_int - &self.u) / &self.delta;
        let name = tm.var_name(self.x()).ok_or_else(|| {
            QsatError::internal("projection variable is not a constant")
        })?;
        model.register(name, Value::Rational(BigRational::from_integer(new_val)));
        Ok(())
    }
}

impl Default for ArithProjector {
    fn default() -> Self {
        Self::new()
    }
}

fn n_sign(b: &BigRational) -> BigRational {
    if b.is_positive() {
        -BigRational::one()
    } else {
        BigRational::one()
    }
}

/// Project the arithmetic variables of `vars` out of the conjunction of
/// `lits`. Returns the retained variables and the projected conjunction.
pub fn arith_project(
    tm: &mut TermManager,
    model: &mut Model,
    vars: &[TermId],
    lits: &[TermId],
) -> Result<(Vec<TermId>, TermId)> {
    let mut ap = ArithProjector::new();
    ap.project_all(tm, model, vars, lits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qe::flatten_and;

    fn int_model(tm: &TermManager, vals: &[(TermId, i64)]) -> Model {
        let mut m = Model::new();
        for &(v, n) in vals {
            let name = tm.var_name(v).unwrap();
            m.register(
                name,
                Value::Rational(BigRational::from_integer(BigInt::from(n))),
            );
        }
        m
    }

    fn check_invariants(tm: &TermManager, model: &Model, x: TermId, out: TermId) {
        assert!(!tm.occurs(x, out), "variable not eliminated: {}", tm.display(out));
        for lit in flatten_and(tm, out) {
            assert!(
                model.is_true(tm, lit).unwrap(),
                "output literal {} false under model",
                tm.display(lit)
            );
        }
    }

    #[test]
    fn interval_with_divisibility_projects_to_true() {
        // {x >= 2, x <= 5, 3 | x+1} with M(x) = 5
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let two = tm.mk_int(BigInt::from(2));
        let five = tm.mk_int(BigInt::from(5));
        let one = tm.mk_int(BigInt::from(1));
        let ge = tm.mk_ge(x, two);
        let le = tm.mk_le(x, five);
        let x1 = tm.mk_add(vec![x, one], tm.sorts.int_sort);
        let div = tm.mk_divides(&BigInt::from(3), x1);
        let mut model = int_model(&tm, &[(x, 5)]);
        assert!(model.is_true(&tm, div).unwrap());

        let (retained, out) = arith_project(&mut tm, &mut model, &[x], &[ge, le, div]).unwrap();
        assert!(retained.is_empty());
        assert_eq!(out, tm.mk_true());
    }

    #[test]
    fn opposite_nonunit_coefficients_residue_split() {
        // {2x + y <= 0, -3x + z <= 0} with M = {x: 0, y: 0, z: 0}
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let z = tm.mk_var("z", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let two = tm.mk_int(BigInt::from(2));
        let three = tm.mk_int(BigInt::from(3));
        let tx = tm.mk_mul(two, x);
        let sum1 = tm.mk_add(vec![tx, y], tm.sorts.int_sort);
        let l1 = tm.mk_le(sum1, zero);
        let n3 = tm.mk_neg(three);
        let nx = tm.mk_mul(n3, x);
        let sum2 = tm.mk_add(vec![nx, z], tm.sorts.int_sort);
        let l2 = tm.mk_le(sum2, zero);
        let mut model = int_model(&tm, &[(x, 0), (y, 0), (z, 0)]);

        let mut ap = ArithProjector::new();
        let (retained, out) = ap.project_all(&mut tm, &mut model, &[x], &[l1, l2]).unwrap();
        assert!(retained.is_empty());
        assert_eq!(ap.stats().residue_splits, 1);
        check_invariants(&tm, &model, x, out);
        // the split leaves a divisibility literal
        let is_div = |l: TermId| match tm.kind(l) {
            TermKind::Eq(a, b) => {
                matches!(tm.kind(*a), TermKind::Mod(_, _))
                    || matches!(tm.kind(*b), TermKind::Mod(_, _))
            }
            _ => false,
        };
        let has_div = flatten_and(&tm, out).iter().any(|&l| is_div(l));
        assert!(has_div, "expected a divisibility literal in {}", tm.display(out));
    }

    #[test]
    fn equality_short_circuit() {
        // {3x + y = 0, x <= w, 7 | (x + 2)} with a consistent model
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let w = tm.mk_var("w", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let three = tm.mk_int(BigInt::from(3));
        let two = tm.mk_int(BigInt::from(2));
        let tx = tm.mk_mul(three, x);
        let sum = tm.mk_add(vec![tx, y], tm.sorts.int_sort);
        let eq = tm.mk_eq(sum, zero);
        let le = tm.mk_le(x, w);
        let x2 = tm.mk_add(vec![x, two], tm.sorts.int_sort);
        let div = tm.mk_divides(&BigInt::from(7), x2);
        // x = 5, y = -15, w = 6 ; 7 | 7
        let mut model = int_model(&tm, &[(x, 5), (y, -15), (w, 6)]);
        assert!(model.is_true(&tm, eq).unwrap());
        assert!(model.is_true(&tm, div).unwrap());

        let mut ap = ArithProjector::new();
        let (retained, out) = ap
            .project_all(&mut tm, &mut model, &[x], &[eq, le, div])
            .unwrap();
        assert!(retained.is_empty());
        assert_eq!(ap.stats().equality_substitutions, 1);
        check_invariants(&tm, &model, x, out);
    }

    #[test]
    fn real_interval_resolves() {
        // {x > 0, x < 1} over Real, M(x) = 1/2 ; projection resolves the
        // two bounds to a ground truth
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.real_sort);
        let zero = tm.mk_real(BigRational::zero());
        let one = tm.mk_real(BigRational::one());
        let gt = tm.mk_gt(x, zero);
        let lt = tm.mk_lt(x, one);
        let mut model = Model::new();
        let name = tm.var_name(x).unwrap();
        model.register(
            name,
            Value::Rational(BigRational::new(BigInt::from(1), BigInt::from(2))),
        );

        let (retained, out) = arith_project(&mut tm, &mut model, &[x], &[gt, lt]).unwrap();
        assert!(retained.is_empty());
        assert_eq!(out, tm.mk_true());
    }

    #[test]
    fn unprojectable_variable_is_retained() {
        // x under an uninterpreted application cannot be projected
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let bool_sort = tm.sorts.bool_sort;
        let px = tm.mk_app("P", vec![x], bool_sort);
        let mut model = int_model(&tm, &[(x, 0)]);
        model.register_app(px, true);

        let (retained, out) = arith_project(&mut tm, &mut model, &[x], &[px]).unwrap();
        assert_eq!(retained, vec![x]);
        assert_eq!(out, px);
    }

    #[test]
    fn xfree_literals_pass_through() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let le = tm.mk_le(y, zero);
        let ge = tm.mk_ge(x, zero);
        let mut model = int_model(&tm, &[(x, 0), (y, -1)]);

        let (retained, out) = arith_project(&mut tm, &mut model, &[x], &[le, ge]).unwrap();
        assert!(retained.is_empty());
        assert_eq!(out, le);
    }

    #[test]
    fn disequality_oriented_by_model() {
        // {x != 3} with M(x) = 5 : x > 3 after orientation, projects to true
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let three = tm.mk_int(BigInt::from(3));
        let eq = tm.mk_eq(x, three);
        let ne = tm.mk_not(eq);
        let mut model = int_model(&tm, &[(x, 5)]);

        let (retained, out) = arith_project(&mut tm, &mut model, &[x], &[ne]).unwrap();
        assert!(retained.is_empty());
        assert_eq!(out, tm.mk_true());
    }

    #[test]
    fn mod_with_cancelled_coefficient_emits_equality() {
        // ((x - x + y) mod 2) <= x : the variable cancels inside the mod
        // argument, so its value is pinned by an emitted equality
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let two = tm.mk_int(BigInt::from(2));
        let nx = tm.mk_neg(x);
        let arg = tm.mk_add(vec![x, nx, y], tm.sorts.int_sort);
        let m = tm.mk_mod(arg, two);
        let le = tm.mk_le(m, x);
        let mut model = int_model(&tm, &[(x, 1), (y, 3)]);
        assert!(model.is_true(&tm, le).unwrap());

        let (retained, out) = arith_project(&mut tm, &mut model, &[x], &[le]).unwrap();
        assert!(retained.is_empty());
        check_invariants(&tm, &model, x, out);
        // the residue of y survives as a divisibility fact
        let lits = flatten_and(&tm, out);
        assert!(!lits.is_empty());
        for l in lits {
            assert!(!tm.occurs(x, l));
        }
    }

    #[test]
    fn model_updated_after_divisibility_substitution() {
        // after consolidation the variable is re-registered as
        // (M(x) - u) / delta
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let one = tm.mk_int(BigInt::from(1));
        let hundred = tm.mk_int(BigInt::from(100));
        let x1 = tm.mk_add(vec![x, one], tm.sorts.int_sort);
        let div = tm.mk_divides(&BigInt::from(3), x1);
        let le = tm.mk_le(x, hundred);
        let zero = tm.mk_int(BigInt::from(0));
        let ge = tm.mk_ge(x, zero);
        let mut model = int_model(&tm, &[(x, 5)]);

        let (retained, _out) = arith_project(&mut tm, &mut model, &[x], &[ge, le, div]).unwrap();
        assert!(retained.is_empty());
        let name = tm.var_name(x).unwrap();
        // u = 5 mod 3 = 2, new value (5 - 2) / 3 = 1
        assert_eq!(
            model.value_of(name).unwrap().as_int().unwrap(),
            BigInt::from(1)
        );
    }
}
