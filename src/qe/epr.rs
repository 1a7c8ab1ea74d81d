//! Uninterpreted Predicate Elimination.
//!
//! Specializes the alternating game to formulas
//! `exists P, x. forall Q, y. matrix` where the predicates named by a
//! caller-supplied classifier are to be eliminated. The game runs over
//! two kernels and at most four plies between backjumps; assumption
//! construction depends on the level:
//!
//! | level | assumptions |
//! |---|---|
//! | 0 | none |
//! | 1 | outer atoms, plus a forced disequality for every opposite pair of occurrences of an eliminated predicate |
//! | 2 | outer atoms, forced disequalities, and the function graph of every predicate at its bound occurrences |
//! | 3 | every atom, unchanged |
//!
//! Level-1 conflicts are projected (bound arithmetic dropped),
//! universally closed, negated, asserted to the existential kernel and
//! accumulated as the answer; deeper conflicts collapse two levels at a
//! time.

use crate::ast::{TermId, TermKind, TermManager};
use crate::error::{QsatError, Result};
use crate::hoist::hoist;
use crate::model::{Model, Value};
use crate::qe::arith::ArithProjector;
use crate::qe::pred_abs::PredAbs;
use crate::solver::{CancelFlag, GroundSolver, Oracle, SolverResult};
use lasso::Spur;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

/// Verdict of a predicate-elimination run.
#[derive(Debug, Clone)]
pub enum EprResult {
    /// A quantifier-free formula equivalent to the input with the
    /// classified predicates eliminated.
    Eliminated(TermId),
    /// The input is unsatisfiable.
    Unsat,
    /// The kernels gave up.
    Unknown(String),
}

/// Counters for an elimination run.
#[derive(Debug, Clone, Default)]
pub struct EprStats {
    /// Game rounds played.
    pub num_rounds: u64,
    /// Forced disequalities learned.
    pub num_disequalities: u64,
    /// Function graphs constructed.
    pub num_graphs: u64,
    /// Deepest level reached.
    pub max_level: u32,
}

/// The elimination loop over a pair of kernels.
pub struct EprSolver<O: Oracle = GroundSolver> {
    pa: PredAbs,
    ap: ArithProjector,
    ex: O,
    fa: O,
    level: u32,
    model: Option<Model>,
    answer: Vec<TermId>,
    bound_vars: Vec<TermId>,
    free_pred_occs: FxHashMap<Spur, Vec<TermId>>,
    bound_pred_occs: FxHashMap<Spur, Vec<TermId>>,
    diseq_names: Vec<TermId>,
    known_diseq: FxHashSet<(TermId, TermId)>,
    cancel: CancelFlag,
    stats: EprStats,
}

impl EprSolver<GroundSolver> {
    /// Solver over the built-in ground decision procedure.
    #[must_use]
    pub fn new() -> Self {
        Self::with_oracles(GroundSolver::new(), GroundSolver::new())
    }
}

impl Default for EprSolver<GroundSolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Oracle> EprSolver<O> {
    /// Solver over caller-supplied kernels.
    pub fn with_oracles(ex: O, fa: O) -> Self {
        Self {
            pa: PredAbs::new(),
            ap: ArithProjector::new(),
            ex,
            fa,
            level: 0,
            model: None,
            answer: Vec::new(),
            bound_vars: Vec::new(),
            free_pred_occs: FxHashMap::default(),
            bound_pred_occs: FxHashMap::default(),
            diseq_names: Vec::new(),
            known_diseq: FxHashSet::default(),
            cancel: CancelFlag::new(),
            stats: EprStats::default(),
        }
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> &EprStats {
        &self.stats
    }

    /// Install a shared cancel flag, propagated to both kernels.
    pub fn set_cancel(&mut self, flag: CancelFlag) {
        self.ex.set_cancel(flag.clone());
        self.fa.set_cancel(flag.clone());
        self.cancel = flag;
    }

    /// Eliminate the predicates picked out by `classify` from
    /// `exists P. fml`, where `fml` carries the universal block. As with
    /// the game solver, an instance runs one elimination; build a fresh
    /// instance per query.
    pub fn eliminate(
        &mut self,
        tm: &mut TermManager,
        fml: TermId,
        classify: &dyn Fn(&str) -> bool,
    ) -> Result<EprResult> {
        self.pa = PredAbs::new();
        self.level = 0;
        self.model = None;
        self.answer.clear();
        self.bound_vars.clear();
        self.free_pred_occs.clear();
        self.bound_pred_occs.clear();
        self.diseq_names.clear();
        self.known_diseq.clear();
        let prefix = hoist(tm, fml);
        let free_vars = prefix.blocks[0].clone();
        self.bound_vars = prefix
            .blocks
            .get(1)
            .cloned()
            .unwrap_or_default();
        let matrix = prefix.matrix;
        for &v in &free_vars {
            self.pa.set_expr_level(v, 0);
        }
        for &v in &self.bound_vars {
            self.pa.set_expr_level(v, 2);
        }
        self.collect_predicates(tm, matrix, classify);
        debug!(
            bound_vars = self.bound_vars.len(),
            bound_preds = self.bound_pred_occs.len(),
            "elimination problem"
        );

        let mut defs = Vec::new();
        let abstracted = self.pa.abstract_atoms(tm, matrix, 0, &mut defs);
        for d in defs {
            self.ex.assert(d);
            self.fa.assert(d);
        }
        self.fa.assert(abstracted);
        let neg = tm.mk_not(abstracted);
        self.ex.assert(neg);

        loop {
            self.check_cancel()?;
            self.stats.num_rounds += 1;
            self.stats.max_level = self.stats.max_level.max(self.level);
            let asms = self.get_assumptions(tm)?;
            let even = self.level % 2 == 0;
            let res = if even {
                self.ex.check(tm, &asms)
            } else {
                self.fa.check(tm, &asms)
            };
            trace!(level = self.level, result = ?res, "round");
            match res {
                SolverResult::Sat => {
                    let mdl = (if even { self.ex.model() } else { self.fa.model() })
                        .cloned()
                        .ok_or_else(|| QsatError::internal("sat without model"))?;
                    self.model = Some(mdl);
                    self.pa.push();
                    self.level += 1;
                }
                SolverResult::Unsat => {
                    if self.level == 0 {
                        break;
                    }
                    self.project(tm)?;
                }
                SolverResult::Undef => {
                    let msg = if even {
                        self.ex.last_failure()
                    } else {
                        self.fa.last_failure()
                    };
                    return Ok(EprResult::Unknown(msg));
                }
            }
        }
        let conj = tm.mk_and(self.answer.clone());
        if tm.bool_value(conj) == Some(false) {
            Ok(EprResult::Unsat)
        } else {
            Ok(EprResult::Eliminated(conj))
        }
    }

    /// Handle a conflict above level zero.
    fn project(&mut self, tm: &mut TermManager) -> Result<()> {
        let even = self.level % 2 == 0;
        let raw = if even {
            self.ex.unsat_core()
        } else {
            self.fa.unsat_core()
        };
        let core = raw.to_vec();
        let core = self.pa.mk_concrete(tm, &core);
        trace!(level = self.level, core = core.len(), "conflict");
        if self.level == 1 {
            let lemma = self.negate_core(tm, &core)?;
            self.ex.assert(lemma);
            self.answer.push(lemma);
            self.pa.pop(1);
            self.model = None;
            self.level -= 1;
        } else if self.model.is_none() {
            // levels two and three are only reachable through a model
            return Err(QsatError::internal("conflict above level one without a model"));
        } else {
            if self.level > 3 {
                return Err(QsatError::internal("level exceeds three"));
            }
            let lemma = self.negate_core(tm, &core)?;
            self.ex.assert(lemma);
            self.fa.assert(lemma);
            self.level -= 2;
        }
        Ok(())
    }

    /// Project bound arithmetic out of the core, close universally over
    /// what remains, and negate.
    fn negate_core(&mut self, tm: &mut TermManager, core: &[TermId]) -> Result<TermId> {
        let mut work = self.model.clone().unwrap_or_default();
        let bound = self.bound_vars.clone();
        let (retained, conj) = self.ap.project_all(tm, &mut work, &bound, core)?;
        let neg = tm.mk_not(conj);
        Ok(tm.mk_forall(retained, neg))
    }

    fn get_assumptions(&mut self, tm: &mut TermManager) -> Result<Vec<TermId>> {
        match self.level {
            0 => Ok(Vec::new()),
            1 => {
                self.ensure_disequalities(tm)?;
                let mut asms = self.outer_implicant(tm)?;
                self.assume_diseqs(tm, &mut asms)?;
                Ok(asms)
            }
            2 => {
                let mut asms = self.outer_implicant(tm)?;
                self.assume_diseqs(tm, &mut asms)?;
                self.extract_function_graphs(tm, &mut asms)?;
                Ok(asms)
            }
            3 => {
                let model = self.model_ref()?;
                self.pa.extract_implicant(tm, model)
            }
            _ => Err(QsatError::internal("level exceeds three")),
        }
    }

    fn model_ref(&self) -> Result<&Model> {
        self.model
            .as_ref()
            .ok_or_else(|| QsatError::internal("no model above level zero"))
    }

    /// Atoms mentioning no bound constant, signed by the model.
    fn outer_implicant(&mut self, tm: &mut TermManager) -> Result<Vec<TermId>> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| QsatError::internal("no model above level zero"))?;
        self.pa.implicant_below(tm, &model, 0)
    }

    /// Sign every forced disequality by the model.
    fn assume_diseqs(&mut self, tm: &mut TermManager, asms: &mut Vec<TermId>) -> Result<()> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| QsatError::internal("no model above level zero"))?;
        for &d in &self.diseq_names {
            let Some(lit) = self.pa.lit_of(d) else {
                continue;
            };
            if model.eval_bool(tm, lit)? {
                asms.push(d);
            } else {
                let nd = tm.mk_not(d);
                asms.push(nd);
            }
        }
        Ok(())
    }

    /// For every opposite-polarity pair of occurrences of an eliminated
    /// predicate, force apart one argument position where the model
    /// already separates them.
    fn ensure_disequalities(&mut self, tm: &mut TermManager) -> Result<()> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| QsatError::internal("no model above level zero"))?;
        let occs_by_pred: Vec<Vec<TermId>> = self.bound_pred_occs.values().cloned().collect();
        for occs in occs_by_pred {
            let (pos, neg) = collect_pos_neg(tm, &model, &occs)?;
            for &p in &pos {
                'pairs: for &n in &neg {
                    let (pargs, nargs) = match (tm.kind(p), tm.kind(n)) {
                        (TermKind::App(_, pa), TermKind::App(_, na)) => (pa.clone(), na.clone()),
                        _ => continue,
                    };
                    for (&a, &b) in pargs.iter().zip(nargs.iter()) {
                        if self.known_diseq.contains(&(a, b)) || self.known_diseq.contains(&(b, a))
                        {
                            continue 'pairs;
                        }
                    }
                    let mut separated = false;
                    for (&a, &b) in pargs.iter().zip(nargs.iter()) {
                        let va = model.eval(tm, a)?;
                        let vb = model.eval(tm, b)?;
                        if va != vb {
                            let eq = tm.mk_eq(a, b);
                            let diseq = tm.mk_not(eq);
                            let mut defs = Vec::new();
                            let name =
                                self.pa
                                    .mk_assumption_literal(tm, diseq, self.level, &mut defs);
                            self.assert_defs(tm, &defs)?;
                            self.diseq_names.push(name);
                            self.known_diseq.insert((a, b));
                            self.stats.num_disequalities += 1;
                            trace!(diseq = %tm.display(diseq), "forced disequality");
                            separated = true;
                            break;
                        }
                    }
                    if !separated {
                        return Err(QsatError::internal(
                            "opposite occurrences with identical argument values",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Graph assumptions for every predicate at its bound occurrences.
    fn extract_function_graphs(
        &mut self,
        tm: &mut TermManager,
        asms: &mut Vec<TermId>,
    ) -> Result<()> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| QsatError::internal("no model above level zero"))?;
        let groups: Vec<Vec<TermId>> = self
            .bound_pred_occs
            .values()
            .chain(self.free_pred_occs.values())
            .cloned()
            .collect();
        for occs in groups {
            let (pos, neg) = collect_pos_neg(tm, &model, &occs)?;
            if neg.is_empty() {
                for &p in &pos {
                    self.push_asm(tm, asms, p)?;
                }
                continue;
            }
            if pos.is_empty() {
                for &n in &neg {
                    let nn = tm.mk_not(n);
                    self.push_asm(tm, asms, nn)?;
                }
                continue;
            }
            for &p in pos.iter().chain(neg.iter()) {
                if self.pa.compute_level(tm, p) == 2 {
                    let graph = mk_graph(tm, p, &pos, &neg);
                    self.stats.num_graphs += 1;
                    self.push_asm(tm, asms, graph)?;
                }
            }
        }
        Ok(())
    }

    fn push_asm(&mut self, tm: &mut TermManager, asms: &mut Vec<TermId>, fml: TermId) -> Result<()> {
        let mut defs = Vec::new();
        let lit = self
            .pa
            .mk_assumption_literal(tm, fml, self.level, &mut defs);
        self.assert_defs(tm, &defs)?;
        asms.push(lit);
        Ok(())
    }

    /// Assert definitions to both kernels and register the name's value
    /// in the model, so later implicants stay consistent.
    fn assert_defs(&mut self, tm: &mut TermManager, defs: &[TermId]) -> Result<()> {
        for &def in defs {
            let TermKind::Iff(name, body) = tm.kind(def).clone() else {
                return Err(QsatError::internal("definition is not an equivalence"));
            };
            if let Some(model) = self.model.as_mut() {
                let v = model.eval_bool(tm, body)?;
                if let Some(spur) = tm.var_name(name) {
                    model.register(spur, Value::Bool(v));
                }
            }
            self.ex.assert(def);
            self.fa.assert(def);
        }
        Ok(())
    }

    /// Predicate occurrences in the matrix, split by the classifier.
    fn collect_predicates(
        &mut self,
        tm: &TermManager,
        fml: TermId,
        classify: &dyn Fn(&str) -> bool,
    ) {
        let mut seen = FxHashSet::default();
        let mut todo = vec![fml];
        while let Some(t) = todo.pop() {
            if !seen.insert(t) {
                continue;
            }
            if let TermKind::App(name, _) = tm.kind(t) {
                if tm.sort_of(t).is_bool() {
                    let target = if classify(tm.resolve(*name)) {
                        &mut self.bound_pred_occs
                    } else {
                        &mut self.free_pred_occs
                    };
                    target.entry(*name).or_default().push(t);
                }
            }
            todo.extend(tm.children(t));
        }
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(QsatError::Cancelled);
        }
        Ok(())
    }
}

/// Occurrences split by their truth under the model.
fn collect_pos_neg(
    tm: &TermManager,
    model: &Model,
    occs: &[TermId],
) -> Result<(Vec<TermId>, Vec<TermId>)> {
    let mut pos = Vec::new();
    let mut neg = Vec::new();
    for &o in occs {
        if model.eval_bool(tm, o)? {
            pos.push(o);
        } else {
            neg.push(o);
        }
    }
    Ok((pos, neg))
}

/// `p <-> (argument vector equals some positive occurrence and no
/// negative one)`.
fn mk_graph(tm: &mut TermManager, p: TermId, pos: &[TermId], neg: &[TermId]) -> TermId {
    let mut any = Vec::new();
    for &q in pos {
        any.push(eq_args(tm, p, q));
    }
    let hit = tm.mk_or(any);
    let mut parts = vec![hit];
    for &q in neg {
        let eq = eq_args(tm, p, q);
        let ne = tm.mk_not(eq);
        parts.push(ne);
    }
    let body = tm.mk_and(parts);
    tm.mk_iff(p, body)
}

/// Conjunction of equalities between differing argument positions.
fn eq_args(tm: &mut TermManager, p: TermId, q: TermId) -> TermId {
    let (pargs, qargs) = match (tm.kind(p), tm.kind(q)) {
        (TermKind::App(_, pa), TermKind::App(_, qa)) => (pa.clone(), qa.clone()),
        _ => return tm.mk_true(),
    };
    let mut eqs = Vec::new();
    for (&a, &b) in pargs.iter().zip(qargs.iter()) {
        if a != b {
            eqs.push(tm.mk_eq(a, b));
        }
    }
    tm.mk_and(eqs)
}

/// Eliminate the classified predicates from `fml` over the built-in
/// kernels.
pub fn epr_qe(
    tm: &mut TermManager,
    fml: TermId,
    classify: &dyn Fn(&str) -> bool,
) -> Result<EprResult> {
    let mut solver = EprSolver::new();
    solver.eliminate(tm, fml, classify)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn underscore(name: &str) -> bool {
        name.starts_with('_')
    }

    #[test]
    fn distinct_arguments_tautology() {
        // exists P. forall x y. P(x) and not P(y) implies x != y
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let bool_sort = tm.sorts.bool_sort;
        let px = tm.mk_app("_P", vec![x], bool_sort);
        let py = tm.mk_app("_P", vec![y], bool_sort);
        let npy = tm.mk_not(py);
        let ante = tm.mk_and(vec![px, npy]);
        let eq = tm.mk_eq(x, y);
        let ne = tm.mk_not(eq);
        let body = tm.mk_implies(ante, ne);
        let fml = tm.mk_forall(vec![x, y], body);
        match epr_qe(&mut tm, fml, &underscore).unwrap() {
            EprResult::Eliminated(ans) => assert_eq!(ans, tm.mk_true()),
            r => panic!("expected elimination to true, got {r:?}"),
        }
    }

    #[test]
    fn contradictory_ground_occurrences() {
        // exists P. P(a) and not P(a)
        let mut tm = TermManager::new();
        let a = tm.mk_var("a", tm.sorts.int_sort);
        let bool_sort = tm.sorts.bool_sort;
        let pa_ = tm.mk_app("_P", vec![a], bool_sort);
        let npa = tm.mk_not(pa_);
        let fml = tm.mk_and(vec![pa_, npa]);
        assert!(matches!(
            epr_qe(&mut tm, fml, &underscore).unwrap(),
            EprResult::Unsat
        ));
    }

    #[test]
    fn trivial_matrix_eliminates_to_true() {
        // exists P. forall x. 0 <= 0
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let body = tm.mk_le(zero, zero);
        let fml = tm.mk_forall(vec![x], body);
        match epr_qe(&mut tm, fml, &underscore).unwrap() {
            EprResult::Eliminated(ans) => assert_eq!(ans, tm.mk_true()),
            r => panic!("expected elimination to true, got {r:?}"),
        }
    }

    #[test]
    fn forced_disequality_construction() {
        // the level-1 machinery picks an argument position the model
        // separates
        let mut tm = TermManager::new();
        let mut solver = EprSolver::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let bool_sort = tm.sorts.bool_sort;
        let px = tm.mk_app("_P", vec![x], bool_sort);
        let py = tm.mk_app("_P", vec![y], bool_sort);
        solver
            .bound_pred_occs
            .entry(tm.intern("_P"))
            .or_default()
            .extend([px, py]);
        let mut model = Model::new();
        let xn = tm.var_name(x).unwrap();
        let yn = tm.var_name(y).unwrap();
        model.register(
            xn,
            Value::Rational(num_rational::BigRational::from_integer(BigInt::from(1))),
        );
        model.register(
            yn,
            Value::Rational(num_rational::BigRational::from_integer(BigInt::from(2))),
        );
        model.register_app(px, true);
        model.register_app(py, false);
        solver.model = Some(model);
        solver.level = 1;
        solver.ensure_disequalities(&mut tm).unwrap();
        assert_eq!(solver.stats().num_disequalities, 1);
        assert_eq!(solver.diseq_names.len(), 1);
        let lit = solver.pa.lit_of(solver.diseq_names[0]).unwrap();
        let eq = tm.mk_eq(x, y);
        assert_eq!(lit, tm.mk_not(eq));
    }

    #[test]
    fn graph_formula_shape() {
        // P(x), P(y) positive, P(z) negative:
        // P(w) <-> (w = x or w = y) and w != z, at the occurrence w = x
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let z = tm.mk_var("z", tm.sorts.int_sort);
        let bool_sort = tm.sorts.bool_sort;
        let px = tm.mk_app("_P", vec![x], bool_sort);
        let py = tm.mk_app("_P", vec![y], bool_sort);
        let pz = tm.mk_app("_P", vec![z], bool_sort);
        let g = mk_graph(&mut tm, px, &[px, py], &[pz]);
        // p(x) <-> ((true or x = y) and x != z) ; the self equality
        // collapses to true, so the whole hit disjunction is true
        let xz = tm.mk_eq(x, z);
        let nxz = tm.mk_not(xz);
        let expect = tm.mk_iff(px, nxz);
        assert_eq!(g, expect);
    }
}
