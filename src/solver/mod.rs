//! Decision Procedure Interface and Ground Solver.
//!
//! [`Oracle`] is the kernel surface the game loop drives: scoped
//! assertions, assumption-based checks, models on sat, cores on unsat, a
//! cooperative cancel hook. [`GroundSolver`] implements it for ground
//! formulas over linear integer/real arithmetic, booleans, and
//! uninterpreted predicate occurrences: case analysis over the boolean
//! atoms with three-valued pruning, a linear feasibility check per full
//! branch, and deletion-minimized unsat cores.

mod theory;

use crate::ast::{TermId, TermKind, TermManager};
use crate::model::{Model, Value};
use crate::rewrite::fold_ground;
use crate::sort::Sort;
use num_rational::BigRational;
use num_traits::{One, Zero};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use theory::{Choice, Constraint, DivCon, LinSum, Problem, Rel, Verdict};
use tracing::trace;

/// Shared cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A fresh, unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// Check the flag.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Verdict of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverResult {
    /// A model exists.
    Sat,
    /// No model exists.
    Unsat,
    /// The solver could not decide.
    Undef,
}

/// The decision-procedure surface required by the game loop.
pub trait Oracle {
    /// Assert a formula in the current scope.
    fn assert(&mut self, e: TermId);

    /// Open a scope.
    fn push(&mut self);

    /// Close `n` scopes, dropping their assertions.
    fn pop(&mut self, n: u32);

    /// Check the asserted formulas together with `assumptions`.
    fn check(&mut self, tm: &TermManager, assumptions: &[TermId]) -> SolverResult;

    /// Model of the last `Sat` answer.
    fn model(&self) -> Option<&Model>;

    /// Unsat core of the last `Unsat` answer; a subset of the assumptions
    /// passed to `check`.
    fn unsat_core(&self) -> &[TermId];

    /// Install the shared cancel flag.
    fn set_cancel(&mut self, flag: CancelFlag);

    /// Failure message of the last `Undef` answer.
    fn last_failure(&self) -> String;
}

/// Counters for a ground-solver instance.
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    /// Number of `check` calls.
    pub checks: u64,
    /// Boolean decisions across all checks.
    pub decisions: u64,
    /// Theory feasibility queries.
    pub theory_queries: u64,
}

/// Ground decision procedure.
#[derive(Debug, Default)]
pub struct GroundSolver {
    assertions: Vec<TermId>,
    frames: Vec<usize>,
    model: Option<Model>,
    core: Vec<TermId>,
    cancel: CancelFlag,
    failure: String,
    stats: SolverStats,
}

/// Outcome of one internal search over a formula set.
enum Search {
    Sat(Model),
    Unsat,
    Undef(String),
}

impl GroundSolver {
    /// Fresh solver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    fn solve_set(&mut self, tm: &TermManager, formulas: &[TermId]) -> Search {
        let atoms = collect_atoms(tm, formulas);
        let mut assign: FxHashMap<TermId, bool> = FxHashMap::default();
        let mut undef: Option<String> = None;
        let r = self.dpll(tm, formulas, &atoms, &mut assign, &mut undef);
        match r {
            Some(model) => Search::Sat(model),
            None => match undef {
                Some(msg) => Search::Undef(msg),
                None => Search::Unsat,
            },
        }
    }

    fn dpll(
        &mut self,
        tm: &TermManager,
        formulas: &[TermId],
        atoms: &[TermId],
        assign: &mut FxHashMap<TermId, bool>,
        undef: &mut Option<String>,
    ) -> Option<Model> {
        if self.cancel.is_cancelled() {
            *undef = Some("canceled".to_string());
            return None;
        }
        let mut all_true = true;
        for &f in formulas {
            match eval_partial(tm, f, assign) {
                Some(false) => return None,
                Some(true) => {}
                None => all_true = false,
            }
        }
        if all_true {
            self.stats.theory_queries += 1;
            return match self.theory_check(tm, assign) {
                Ok(model) => Some(model),
                Err(None) => None,
                Err(Some(msg)) => {
                    *undef = Some(msg);
                    None
                }
            };
        }
        // branch on an atom of an undetermined formula first
        let pick = formulas
            .iter()
            .filter(|&&f| eval_partial(tm, f, assign).is_none())
            .find_map(|&f| find_unassigned(tm, f, assign))
            .or_else(|| atoms.iter().copied().find(|a| !assign.contains_key(a)));
        let Some(atom) = pick else {
            // all atoms assigned yet some formula undetermined: only
            // possible when a formula contains an unsupported construct
            *undef = Some("undetermined formula".to_string());
            return None;
        };
        for value in [true, false] {
            self.stats.decisions += 1;
            assign.insert(atom, value);
            if let Some(m) = self.dpll(tm, formulas, atoms, assign, undef) {
                return Some(m);
            }
            assign.remove(&atom);
        }
        None
    }

    /// Feasibility of the arithmetic literals of a full boolean
    /// assignment. `Err(None)` is a theory conflict, `Err(Some(msg))` an
    /// undecided branch.
    fn theory_check(
        &mut self,
        tm: &TermManager,
        assign: &FxHashMap<TermId, bool>,
    ) -> Result<Model, Option<String>> {
        let mut problem = Problem::default();
        let mut apps: Vec<(TermId, bool)> = Vec::new();
        let mut bools: Vec<(TermId, bool)> = Vec::new();
        for (&atom, &value) in assign {
            match tm.kind(atom) {
                TermKind::Var(_) => bools.push((atom, value)),
                TermKind::App(_, _) => apps.push((atom, value)),
                TermKind::Le(a, b) => {
                    let (a, b) = (*a, *b);
                    add_cmp(tm, &mut problem, a, b, value, false)
                        .map_err(|()| Some("nonlinear atom".to_string()))?;
                }
                TermKind::Lt(a, b) => {
                    let (a, b) = (*a, *b);
                    add_cmp(tm, &mut problem, a, b, value, true)
                        .map_err(|()| Some("nonlinear atom".to_string()))?;
                }
                TermKind::Eq(a, b) => {
                    let (a, b) = (*a, *b);
                    add_eq(tm, &mut problem, a, b, value)
                        .map_err(|()| Some("unsupported equality".to_string()))?;
                }
                _ => return Err(Some("unsupported atom".to_string())),
            }
        }
        add_congruence(tm, &mut problem, &apps).map_err(|()| None)?;
        match theory::solve(&problem) {
            Verdict::Sat(values) => {
                let mut model = Model::new();
                for (name, v) in values {
                    model.register(name, Value::Rational(v));
                }
                for (t, value) in bools {
                    if let Some(name) = tm.var_name(t) {
                        model.register(name, Value::Bool(value));
                    }
                }
                for (t, value) in apps {
                    model.register_app(t, value);
                }
                Ok(model)
            }
            Verdict::Unsat => Err(None),
            Verdict::Unknown => Err(Some("arithmetic undecided".to_string())),
        }
    }
}

impl Oracle for GroundSolver {
    fn assert(&mut self, e: TermId) {
        self.assertions.push(e);
    }

    fn push(&mut self) {
        self.frames.push(self.assertions.len());
    }

    fn pop(&mut self, n: u32) {
        for _ in 0..n {
            if let Some(mark) = self.frames.pop() {
                self.assertions.truncate(mark);
            }
        }
    }

    fn check(&mut self, tm: &TermManager, assumptions: &[TermId]) -> SolverResult {
        self.stats.checks += 1;
        self.model = None;
        self.core.clear();
        self.failure.clear();
        let mut formulas = self.assertions.clone();
        formulas.extend_from_slice(assumptions);
        match self.solve_set(tm, &formulas) {
            Search::Sat(model) => {
                self.model = Some(model);
                SolverResult::Sat
            }
            Search::Undef(msg) => {
                self.failure = msg;
                SolverResult::Undef
            }
            Search::Unsat => {
                // deletion-minimized core over the assumptions
                let mut kept: Vec<TermId> = assumptions.to_vec();
                let mut i = 0;
                while i < kept.len() {
                    let mut trial = self.assertions.clone();
                    trial.extend(kept.iter().take(i).copied());
                    trial.extend(kept.iter().skip(i + 1).copied());
                    match self.solve_set(tm, &trial) {
                        Search::Unsat => {
                            kept.remove(i);
                        }
                        _ => i += 1,
                    }
                }
                trace!(core = kept.len(), "unsat core minimized");
                self.core = kept;
                SolverResult::Unsat
            }
        }
    }

    fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    fn unsat_core(&self) -> &[TermId] {
        &self.core
    }

    fn set_cancel(&mut self, flag: CancelFlag) {
        self.cancel = flag;
    }

    fn last_failure(&self) -> String {
        self.failure.clone()
    }
}

/// A boolean-sorted subterm that is not boolean structure.
fn is_atom(tm: &TermManager, t: TermId) -> bool {
    if !tm.sort_of(t).is_bool() {
        return false;
    }
    !matches!(
        tm.kind(t),
        TermKind::True
            | TermKind::False
            | TermKind::Not(_)
            | TermKind::And(_)
            | TermKind::Or(_)
            | TermKind::Implies(_, _)
            | TermKind::Iff(_, _)
            | TermKind::Ite(_, _, _)
    )
}

fn find_unassigned(
    tm: &TermManager,
    t: TermId,
    assign: &FxHashMap<TermId, bool>,
) -> Option<TermId> {
    if assign.contains_key(&t) {
        return None;
    }
    if is_atom(tm, t) {
        return Some(t);
    }
    if !tm.sort_of(t).is_bool() {
        return None;
    }
    tm.children(t)
        .into_iter()
        .find_map(|c| find_unassigned(tm, c, assign))
}

fn collect_atoms(tm: &TermManager, formulas: &[TermId]) -> Vec<TermId> {
    let mut atoms = Vec::new();
    let mut seen = FxHashSet::default();
    let mut todo: Vec<TermId> = formulas.to_vec();
    while let Some(t) = todo.pop() {
        if !seen.insert(t) {
            continue;
        }
        if is_atom(tm, t) {
            atoms.push(t);
            continue;
        }
        if tm.sort_of(t).is_bool() {
            todo.extend(tm.children(t));
        }
    }
    atoms.sort();
    atoms
}

/// Three-valued evaluation of boolean structure under a partial atom
/// assignment.
fn eval_partial(tm: &TermManager, t: TermId, assign: &FxHashMap<TermId, bool>) -> Option<bool> {
    if let Some(&v) = assign.get(&t) {
        return Some(v);
    }
    match tm.kind(t) {
        TermKind::True => Some(true),
        TermKind::False => Some(false),
        TermKind::Not(a) => eval_partial(tm, *a, assign).map(|v| !v),
        TermKind::And(args) => {
            let mut all = true;
            for &a in args {
                match eval_partial(tm, a, assign) {
                    Some(false) => return Some(false),
                    Some(true) => {}
                    None => all = false,
                }
            }
            if all {
                Some(true)
            } else {
                None
            }
        }
        TermKind::Or(args) => {
            let mut none = true;
            for &a in args {
                match eval_partial(tm, a, assign) {
                    Some(true) => return Some(true),
                    Some(false) => {}
                    None => none = false,
                }
            }
            if none {
                Some(false)
            } else {
                None
            }
        }
        TermKind::Implies(a, b) => match (eval_partial(tm, *a, assign), eval_partial(tm, *b, assign)) {
            (Some(false), _) | (_, Some(true)) => Some(true),
            (Some(true), Some(false)) => Some(false),
            _ => None,
        },
        TermKind::Iff(a, b) => match (eval_partial(tm, *a, assign), eval_partial(tm, *b, assign)) {
            (Some(x), Some(y)) => Some(x == y),
            _ => None,
        },
        TermKind::Ite(c, a, b) => match eval_partial(tm, *c, assign) {
            Some(true) => eval_partial(tm, *a, assign),
            Some(false) => eval_partial(tm, *b, assign),
            None => match (eval_partial(tm, *a, assign), eval_partial(tm, *b, assign)) {
                (Some(x), Some(y)) if x == y => Some(x),
                _ => None,
            },
        },
        // unassigned atom
        _ => None,
    }
}

/// Linearize an arithmetic term into the theory representation. Fails on
/// non-linear structure or non-variable bases.
fn to_linsum(tm: &TermManager, t: TermId, mul: &BigRational, out: &mut LinSum) -> Result<(), ()> {
    if let Some(c) = fold_ground(tm, t) {
        out.k += mul * c;
        return Ok(());
    }
    match tm.kind(t) {
        TermKind::Var(name) => {
            out.add_term(*name, mul);
            Ok(())
        }
        TermKind::Add(args) => {
            for &a in args.clone().iter() {
                to_linsum(tm, a, mul, out)?;
            }
            Ok(())
        }
        TermKind::Sub(a, b) => {
            let (a, b) = (*a, *b);
            to_linsum(tm, a, mul, out)?;
            to_linsum(tm, b, &-mul.clone(), out)
        }
        TermKind::Neg(a) => {
            let a = *a;
            to_linsum(tm, a, &-mul.clone(), out)
        }
        TermKind::Mul(a, b) => {
            let (a, b) = (*a, *b);
            if let Some(c) = fold_ground(tm, a) {
                to_linsum(tm, b, &(mul * c), out)
            } else if let Some(c) = fold_ground(tm, b) {
                to_linsum(tm, a, &(mul * c), out)
            } else {
                Err(())
            }
        }
        _ => Err(()),
    }
}

fn note_int_vars(tm: &TermManager, lin: &LinSum, problem: &mut Problem, t: TermId) {
    // every base of the sum takes its integrality from its sort;
    // uninterpreted sorts count as integer carriers
    let mut names: FxHashSet<_> = lin.terms.keys().copied().collect();
    let mut todo = vec![t];
    let mut seen = FxHashSet::default();
    while let Some(cur) = todo.pop() {
        if !seen.insert(cur) {
            continue;
        }
        if let TermKind::Var(name) = tm.kind(cur) {
            if names.remove(name) {
                let is_int = !matches!(tm.sort_of(cur), Sort::Real);
                problem.int_vars.insert(*name, is_int);
            }
        }
        todo.extend(tm.children(cur));
    }
}

fn add_cmp(
    tm: &TermManager,
    problem: &mut Problem,
    a: TermId,
    b: TermId,
    value: bool,
    strict: bool,
) -> Result<(), ()> {
    let mut lin = LinSum::default();
    let one = BigRational::one();
    if value {
        to_linsum(tm, a, &one, &mut lin)?;
        to_linsum(tm, b, &-one.clone(), &mut lin)?;
    } else {
        // not (a <= b)  is  b < a ; not (a < b)  is  b <= a
        to_linsum(tm, b, &one, &mut lin)?;
        to_linsum(tm, a, &-one.clone(), &mut lin)?;
    }
    let rel = match (value, strict) {
        (true, true) => Rel::Lt,
        (true, false) => Rel::Le,
        (false, true) => Rel::Le,
        (false, false) => Rel::Lt,
    };
    note_int_vars(tm, &lin, problem, a);
    note_int_vars(tm, &lin, problem, b);
    problem.cons.push(Constraint { lin, rel });
    Ok(())
}

fn add_eq(
    tm: &TermManager,
    problem: &mut Problem,
    a: TermId,
    b: TermId,
    value: bool,
) -> Result<(), ()> {
    // divisibility shape first
    if let Some((k, t, r)) = match_div(tm, a, b).or_else(|| match_div(tm, b, a)) {
        let mut lin = LinSum::default();
        to_linsum(tm, t, &BigRational::one(), &mut lin)?;
        lin.k -= r;
        note_int_vars(tm, &lin, problem, t);
        if value {
            problem.divs.push(DivCon { d: k, lin });
        } else {
            // residue split: t ≢ 0 (mod k)
            let mut choices = Vec::new();
            let mut res = BigRational::one();
            let kq = BigRational::from_integer(k.clone());
            while res < kq {
                let mut shifted = lin.clone();
                shifted.k -= &res;
                choices.push(Choice::Div(DivCon {
                    d: k.clone(),
                    lin: shifted,
                }));
                res += BigRational::one();
            }
            if choices.is_empty() {
                // k = 1 divides everything; the negation is false
                problem.cons.push(Constraint {
                    lin: LinSum::constant(BigRational::one()),
                    rel: Rel::Le,
                });
            } else {
                problem.disjs.push(choices);
            }
        }
        return Ok(());
    }
    let mut lin = LinSum::default();
    let one = BigRational::one();
    to_linsum(tm, a, &one, &mut lin)?;
    to_linsum(tm, b, &-one.clone(), &mut lin)?;
    note_int_vars(tm, &lin, problem, a);
    note_int_vars(tm, &lin, problem, b);
    if value {
        problem.cons.push(Constraint { lin, rel: Rel::Eq });
    } else {
        problem.disjs.push(vec![
            Choice::Con(Constraint {
                lin: lin.clone(),
                rel: Rel::Lt,
            }),
            Choice::Con(Constraint {
                lin: lin.negated(),
                rel: Rel::Lt,
            }),
        ]);
    }
    Ok(())
}

/// `(t mod k) = r` with ground `k`, `r`.
fn match_div(
    tm: &TermManager,
    lhs: TermId,
    rhs: TermId,
) -> Option<(num_bigint::BigInt, TermId, BigRational)> {
    let (t, k) = match tm.kind(lhs) {
        TermKind::Mod(t, k) => (*t, *k),
        _ => return None,
    };
    let k = fold_ground(tm, k)?;
    let r = fold_ground(tm, rhs)?;
    if !k.is_integer() || k.numer().bits() > 16 {
        return None;
    }
    use num_traits::Signed;
    let k = k.to_integer().abs();
    if k.is_zero() {
        return None;
    }
    Some((k, t, r))
}

/// Opposite-polarity occurrences of the same predicate must differ in
/// some argument.
fn add_congruence(
    tm: &TermManager,
    problem: &mut Problem,
    apps: &[(TermId, bool)],
) -> Result<(), ()> {
    for (i, &(p, pv)) in apps.iter().enumerate() {
        for &(q, qv) in apps.iter().skip(i + 1) {
            if pv == qv {
                continue;
            }
            let (TermKind::App(pf, pargs), TermKind::App(qf, qargs)) = (tm.kind(p), tm.kind(q))
            else {
                continue;
            };
            if pf != qf || pargs.len() != qargs.len() {
                continue;
            }
            let mut choices = Vec::new();
            for (&pa, &qa) in pargs.iter().zip(qargs.iter()) {
                if pa == qa {
                    continue;
                }
                let mut lin = LinSum::default();
                let one = BigRational::one();
                to_linsum(tm, pa, &one, &mut lin).map_err(|()| ())?;
                to_linsum(tm, qa, &-one.clone(), &mut lin).map_err(|()| ())?;
                note_int_vars(tm, &lin, problem, pa);
                note_int_vars(tm, &lin, problem, qa);
                choices.push(Choice::Con(Constraint {
                    lin: lin.clone(),
                    rel: Rel::Lt,
                }));
                choices.push(Choice::Con(Constraint {
                    lin: lin.negated(),
                    rel: Rel::Lt,
                }));
            }
            if choices.is_empty() {
                // identical argument vectors with opposite truth
                return Err(());
            }
            problem.disjs.push(choices);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn int(tm: &mut TermManager, n: i64) -> TermId {
        tm.mk_int(BigInt::from(n))
    }

    #[test]
    fn sat_with_model() {
        let mut tm = TermManager::new();
        let mut s = GroundSolver::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let two = int(&mut tm, 2);
        let five = int(&mut tm, 5);
        let ge = tm.mk_ge(x, two);
        let le = tm.mk_le(x, five);
        s.assert(ge);
        s.assert(le);
        assert_eq!(s.check(&tm, &[]), SolverResult::Sat);
        let mdl = s.model().unwrap();
        let v = mdl.eval_rational(&tm, x).unwrap().to_integer();
        assert!(v >= BigInt::from(2) && v <= BigInt::from(5));
    }

    #[test]
    fn unsat_parity() {
        let mut tm = TermManager::new();
        let mut s = GroundSolver::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let two = int(&mut tm, 2);
        let one = int(&mut tm, 1);
        let tx = tm.mk_mul(two, x);
        let eq = tm.mk_eq(tx, one);
        s.assert(eq);
        assert_eq!(s.check(&tm, &[]), SolverResult::Unsat);
    }

    #[test]
    fn assumption_core_is_minimal() {
        let mut tm = TermManager::new();
        let mut s = GroundSolver::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = int(&mut tm, 0);
        let ten = int(&mut tm, 10);
        let p = tm.mk_le(x, zero); // x <= 0
        let q = tm.mk_ge(x, ten); // x >= 10
        let r = tm.mk_le(x, ten); // x <= 10, irrelevant
        assert_eq!(s.check(&tm, &[p, q, r]), SolverResult::Unsat);
        let core = s.unsat_core().to_vec();
        assert!(core.contains(&p));
        assert!(core.contains(&q));
        assert!(!core.contains(&r));
    }

    #[test]
    fn push_pop_scopes() {
        let mut tm = TermManager::new();
        let mut s = GroundSolver::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = int(&mut tm, 0);
        let one = int(&mut tm, 1);
        let pos = tm.mk_ge(x, one);
        let neg = tm.mk_le(x, zero);
        s.assert(pos);
        s.push();
        s.assert(neg);
        assert_eq!(s.check(&tm, &[]), SolverResult::Unsat);
        s.pop(1);
        assert_eq!(s.check(&tm, &[]), SolverResult::Sat);
    }

    #[test]
    fn boolean_structure() {
        let mut tm = TermManager::new();
        let mut s = GroundSolver::new();
        let p = tm.mk_var("p", tm.sorts.bool_sort);
        let q = tm.mk_var("q", tm.sorts.bool_sort);
        let np = tm.mk_not(p);
        let either = tm.mk_or(vec![np, q]);
        s.assert(either);
        s.assert(p);
        assert_eq!(s.check(&tm, &[]), SolverResult::Sat);
        let mdl = s.model().unwrap();
        assert!(mdl.eval_bool(&tm, q).unwrap());
    }

    #[test]
    fn congruence_over_identical_args() {
        let mut tm = TermManager::new();
        let mut s = GroundSolver::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let bool_sort = tm.sorts.bool_sort;
        let px = tm.mk_app("P", vec![x], bool_sort);
        let npx = tm.mk_not(px);
        s.assert(px);
        s.assert(npx);
        assert_eq!(s.check(&tm, &[]), SolverResult::Unsat);
    }

    #[test]
    fn congruence_forces_distinct_args() {
        let mut tm = TermManager::new();
        let mut s = GroundSolver::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let bool_sort = tm.sorts.bool_sort;
        let px = tm.mk_app("P", vec![x], bool_sort);
        let py = tm.mk_app("P", vec![y], bool_sort);
        let npy = tm.mk_not(py);
        let eq = tm.mk_eq(x, y);
        s.assert(px);
        s.assert(npy);
        s.assert(eq);
        assert_eq!(s.check(&tm, &[]), SolverResult::Unsat);
    }

    #[test]
    fn cancellation_yields_undef() {
        let mut tm = TermManager::new();
        let mut s = GroundSolver::new();
        let flag = CancelFlag::new();
        s.set_cancel(flag.clone());
        flag.cancel();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = int(&mut tm, 0);
        let ge = tm.mk_ge(x, zero);
        s.assert(ge);
        assert_eq!(s.check(&tm, &[]), SolverResult::Undef);
    }
}
