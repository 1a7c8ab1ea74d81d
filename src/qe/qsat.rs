//! Alternating Quantified Satisfiability.
//!
//! Decides a hoisted prefix formula by a game between an existential
//! player (even levels, playing for the formula) and a universal player
//! (odd levels, playing for its negation). Two kernels are kept in
//! lockstep, one per side: both receive every definition and learned
//! lemma, pushes and pops are mirrored, and each query routes to the
//! kernel of the current level's parity.
//!
//! Each round checks the current player's formula under the opponent's
//! witness literals. A sat answer refreshes the player's witnesses and
//! descends; in projection mode the bound blocks are first eliminated
//! from the implicant and the negated projection is learned one level
//! up, which generalizes a single winning move to the whole winning
//! region. An unsat answer above the bottom two levels backjumps to the
//! deepest core literal and learns the negated core; learned lemmas are
//! replayed after every pop so they survive backtracking.

use crate::ast::{TermId, TermManager};
use crate::error::{QsatError, Result};
use crate::hoist::hoist;
use crate::model::{Model, Value};
use crate::qe::arith::ArithProjector;
use crate::qe::pred_abs::PredAbs;
use crate::solver::{CancelFlag, GroundSolver, Oracle, SolverResult};
use crate::sort::Sort;
use tracing::{debug, trace};

/// Verdict of a quantified satisfiability check.
#[derive(Debug, Clone)]
pub enum QsatResult {
    /// The formula has a model; the witness covers the free constants
    /// and the outermost existential block.
    Sat(Model),
    /// The formula has no model.
    Unsat,
    /// The underlying solver gave up.
    Unknown(String),
}

/// Options for the game loop.
#[derive(Debug, Clone)]
pub struct QsatConfig {
    /// Project bound blocks out of the implicant after every win above
    /// level zero and learn the negated projection at the opposing
    /// level. Required for termination on prefixes where one player has
    /// unboundedly many moves; turn off to exercise the pure
    /// counterexample loop.
    pub project: bool,
}

impl Default for QsatConfig {
    fn default() -> Self {
        Self { project: true }
    }
}

/// Counters for a solver instance.
#[derive(Debug, Clone, Default)]
pub struct QsatStats {
    /// Game rounds played.
    pub num_rounds: u64,
    /// Backjumps taken.
    pub num_backjumps: u64,
    /// Projection lemmas learned.
    pub num_projections: u64,
}

enum Step {
    Sat(Model, Vec<TermId>),
    Unsat(Vec<TermId>),
}

/// The alternating game loop over a pair of kernels.
pub struct QsatSolver<O: Oracle = GroundSolver> {
    config: QsatConfig,
    pa: PredAbs,
    ap: ArithProjector,
    ex: O,
    fa: O,
    fml_pred: Option<TermId>,
    nfml_pred: Option<TermId>,
    blocks: Vec<Vec<TermId>>,
    vals: Vec<Vec<Option<Value>>>,
    preds: Vec<Vec<TermId>>,
    assumptions: Vec<TermId>,
    assumptions_lim: Vec<usize>,
    replay: Vec<Vec<TermId>>,
    level: u32,
    model: Option<Model>,
    cancel: CancelFlag,
    stats: QsatStats,
}

impl QsatSolver<GroundSolver> {
    /// Solver over the built-in ground decision procedure.
    #[must_use]
    pub fn new() -> Self {
        Self::with_oracles(QsatConfig::default(), GroundSolver::new(), GroundSolver::new())
    }

    /// Solver with explicit options.
    #[must_use]
    pub fn with_config(config: QsatConfig) -> Self {
        Self::with_oracles(config, GroundSolver::new(), GroundSolver::new())
    }
}

impl Default for QsatSolver<GroundSolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Oracle> QsatSolver<O> {
    /// Solver over a caller-supplied pair of kernels, one per player.
    pub fn with_oracles(config: QsatConfig, ex: O, fa: O) -> Self {
        Self {
            config,
            pa: PredAbs::new(),
            ap: ArithProjector::new(),
            ex,
            fa,
            fml_pred: None,
            nfml_pred: None,
            blocks: Vec::new(),
            vals: Vec::new(),
            preds: Vec::new(),
            assumptions: Vec::new(),
            assumptions_lim: Vec::new(),
            replay: vec![Vec::new()],
            level: 0,
            model: None,
            cancel: CancelFlag::new(),
            stats: QsatStats::default(),
        }
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> &QsatStats {
        &self.stats
    }

    /// Install a shared cancel flag, propagated to both kernels.
    pub fn set_cancel(&mut self, flag: CancelFlag) {
        self.ex.set_cancel(flag.clone());
        self.fa.set_cancel(flag.clone());
        self.cancel = flag;
    }

    /// Decide the formula. A solver instance carries its kernels'
    /// assertion state, so each instance decides one formula; build a
    /// fresh instance per query.
    pub fn check(&mut self, tm: &mut TermManager, fml: TermId) -> Result<QsatResult> {
        self.reset();
        let prefix = hoist(tm, fml);
        debug!(blocks = prefix.blocks.len(), "hoisted prefix");
        self.blocks = prefix.blocks;
        self.vals = self
            .blocks
            .iter()
            .map(|b| vec![None; b.len()])
            .collect();
        self.preds = self.blocks.clone();

        let mut defs = Vec::new();
        let abstracted = self.pa.abstract_atoms(tm, prefix.matrix, 0, &mut defs);
        for d in defs {
            self.assert_both(d);
        }
        let f = tm.fresh_bool("fml");
        let nf = tm.mk_not(f);
        self.fml_pred = Some(f);
        self.nfml_pred = Some(nf);
        let def = tm.mk_iff(f, abstracted);
        self.assert_both(def);

        match self.check_sat(tm) {
            Ok(true) => {
                let model = self.model.take().unwrap_or_default();
                Ok(QsatResult::Sat(model))
            }
            Ok(false) => Ok(QsatResult::Unsat),
            Err(QsatError::Undef { reason }) => Ok(QsatResult::Unknown(reason)),
            Err(e) => Err(e),
        }
    }

    /// The game proper: `Ok(true)` when the existential player wins.
    fn check_sat(&mut self, tm: &mut TermManager) -> Result<bool> {
        if let Some(outcome) = self.initialize(tm)? {
            return Ok(outcome);
        }
        loop {
            self.check_cancel()?;
            self.stats.num_rounds += 1;
            let mut asms = self.assumptions.clone();
            self.assume_tail(self.level, &mut asms);
            match self.check_inner(tm, asms)? {
                Step::Sat(mdl, implicant) => {
                    if self.level == 0 {
                        self.model = Some(mdl.clone());
                    }
                    self.update_tail(tm, &mdl, self.level as usize)?;
                    if self.config.project && self.level > 0 {
                        self.project(tm, &implicant, &mdl)?;
                    }
                    self.push();
                }
                Step::Unsat(core) => {
                    if self.level == 0 {
                        return Ok(false);
                    }
                    if self.level == 1 {
                        return Ok(true);
                    }
                    self.backtrack(tm, core)?;
                }
            }
        }
    }

    /// Opening moves: both players must have an initial position, or the
    /// game is over immediately.
    fn initialize(&mut self, tm: &mut TermManager) -> Result<Option<bool>> {
        let f = self.player_fml(0)?;
        match self.ex.check(tm, &[f]) {
            SolverResult::Unsat => return Ok(Some(false)),
            SolverResult::Undef => return Err(QsatError::undef(self.ex.last_failure())),
            SolverResult::Sat => {}
        }
        let mdl0 = self
            .ex
            .model()
            .cloned()
            .ok_or_else(|| QsatError::internal("sat without model"))?;
        self.update_tail(tm, &mdl0, 0)?;
        let nf = self.player_fml(1)?;
        match self.fa.check(tm, &[nf]) {
            SolverResult::Unsat => {
                debug!("universal player has no opening move");
                self.model = Some(mdl0);
                return Ok(Some(true));
            }
            SolverResult::Undef => return Err(QsatError::undef(self.fa.last_failure())),
            SolverResult::Sat => {}
        }
        let mdl1 = self
            .fa
            .model()
            .cloned()
            .ok_or_else(|| QsatError::internal("sat without model"))?;
        self.update_tail(tm, &mdl1, 1)?;
        Ok(None)
    }

    /// One oracle round at the current level.
    fn check_inner(&mut self, tm: &mut TermManager, mut asms: Vec<TermId>) -> Result<Step> {
        let fml = self.player_fml(self.level)?;
        asms.push(fml);
        let even = self.level % 2 == 0;
        let res = if even {
            self.ex.check(tm, &asms)
        } else {
            self.fa.check(tm, &asms)
        };
        match res {
            SolverResult::Sat => {
                let mdl = (if even { self.ex.model() } else { self.fa.model() })
                    .cloned()
                    .ok_or_else(|| QsatError::internal("sat without model"))?;
                let implicant = self.pa.extract_implicant(tm, &mdl)?;
                let nf = tm.mk_not(fml);
                let minimized = if even {
                    self.pa.minimize(tm, &mut self.ex, &implicant, nf)?
                } else {
                    self.pa.minimize(tm, &mut self.fa, &implicant, nf)?
                };
                trace!(
                    level = self.level,
                    implicant = minimized.len(),
                    "player moves"
                );
                Ok(Step::Sat(mdl, minimized))
            }
            SolverResult::Unsat => {
                let raw = if even {
                    self.ex.unsat_core()
                } else {
                    self.fa.unsat_core()
                };
                let core: Vec<TermId> = raw.iter().copied().filter(|&e| e != fml).collect();
                trace!(level = self.level, core = core.len(), "player is stuck");
                Ok(Step::Unsat(core))
            }
            SolverResult::Undef => {
                let msg = if even {
                    self.ex.last_failure()
                } else {
                    self.fa.last_failure()
                };
                Err(QsatError::undef(msg))
            }
        }
    }

    /// Refresh witness literals for every block of the given parity from
    /// the new model.
    fn update_tail(&mut self, tm: &mut TermManager, mdl: &Model, start: usize) -> Result<()> {
        let mut i = start;
        while i < self.blocks.len() {
            for j in 0..self.blocks[i].len() {
                let v = self.blocks[i][j];
                self.pa.del_pred(self.preds[i][j]);
                let val = mdl.eval(tm, v)?;
                self.vals[i][j] = Some(val.clone());
                let pred = if matches!(tm.sort_of(v), Sort::Bool) {
                    let lit = match val {
                        Value::Bool(true) => v,
                        Value::Bool(false) => tm.mk_not(v),
                        Value::Rational(_) => {
                            return Err(QsatError::internal("boolean variable with numeric value"))
                        }
                    };
                    self.pa.add_pred(tm, lit, lit, i as u32);
                    lit
                } else {
                    let r = val.as_rational().ok_or_else(|| {
                        QsatError::internal("arithmetic variable with boolean value")
                    })?;
                    let sort = tm.sort_id_of(v);
                    let num = tm.mk_num(r.clone(), sort);
                    let eq = tm.mk_eq(v, num);
                    let pred = tm.fresh_bool("eq");
                    if let Some(def) = self.pa.add_pred(tm, pred, eq, i as u32) {
                        self.assert_both(def);
                    }
                    pred
                };
                self.preds[i][j] = pred;
            }
            i += 2;
        }
        Ok(())
    }

    /// Witness blocks of the opponent parity, from one level below the
    /// query (or above the current level at the bottom).
    fn assume_tail(&self, level: u32, asms: &mut Vec<TermId>) {
        let start = if level > 0 {
            (level - 1) as usize
        } else {
            (self.level + 1) as usize
        };
        let mut i = start;
        while i < self.blocks.len() {
            asms.extend(self.preds[i].iter().copied());
            i += 2;
        }
    }

    /// Generalize the current win: eliminate the player's own blocks
    /// from the implicant and learn the negated projection one level up.
    /// Only blocks of the current parity are projected; the opponent's
    /// commitments stay in the lemma.
    fn project(&mut self, tm: &mut TermManager, implicant: &[TermId], mdl: &Model) -> Result<()> {
        if self.level == 0 {
            return Ok(());
        }
        let mut vars = Vec::new();
        let mut i = self.level as usize;
        while i < self.blocks.len() {
            vars.extend(self.blocks[i].iter().copied());
            i += 2;
        }
        let mut imp = implicant.to_vec();
        self.assume_tail(self.level + 2, &mut imp);
        let lits = self.pa.mk_concrete(tm, &imp);
        let mut work = mdl.clone();
        let (retained, conj) = self.ap.project_all(tm, &mut work, &vars, &lits)?;
        let closed = tm.mk_exists(retained, conj);
        let lemma = tm.mk_not(closed);
        self.stats.num_projections += 1;
        trace!(
            level = self.level,
            lemma = %tm.display(lemma),
            "projection lemma"
        );
        self.persist_assertion(tm, self.level - 1, lemma)
    }

    /// Non-chronological backtracking guided by the core levels.
    fn backtrack(&mut self, tm: &mut TermManager, core: Vec<TermId>) -> Result<()> {
        self.stats.num_backjumps += 1;
        let mut target = if self.level % 2 == 0 { 0 } else { 1 };
        let mut kept = Vec::new();
        for c in core {
            let lvl = self
                .pa
                .level_of(c)
                .ok_or_else(|| QsatError::internal("core literal without a level"))?;
            if lvl + 1 < self.level {
                target = target.max(lvl);
                kept.push(c);
            }
        }
        if target >= self.level {
            return Err(QsatError::internal("backjump does not descend"));
        }
        debug!(from = self.level, to = target, "backjump");
        self.pop(self.level - target);
        let conj = tm.mk_and(kept);
        let lemma = tm.mk_not(conj);
        self.persist_assertion(tm, target, lemma)
    }

    /// Learn `fml` at `level`, guarded by the owning player's formula,
    /// and record it for replay across pops.
    fn persist_assertion(&mut self, tm: &mut TermManager, level: u32, fml: TermId) -> Result<()> {
        let guard = self.player_fml(level)?;
        let lemma = tm.mk_implies(guard, fml);
        self.assert_both(lemma);
        if let Some(frame) = self.replay.last_mut() {
            frame.push(lemma);
        }
        Ok(())
    }

    fn push(&mut self) {
        self.assumptions_lim.push(self.assumptions.len());
        self.pa.push();
        self.level += 1;
        self.ex.push();
        self.fa.push();
        self.replay.push(Vec::new());
        if self.level >= 2 {
            let below = self.preds[(self.level - 2) as usize].clone();
            self.assumptions.extend(below);
        }
    }

    fn pop(&mut self, n: u32) {
        let mut replayed = Vec::new();
        self.level -= n;
        for _ in 0..n {
            if let Some(frame) = self.replay.pop() {
                replayed.extend(frame);
            }
        }
        let mark = self.assumptions_lim[self.level as usize];
        for i in mark..self.assumptions.len() {
            self.pa.del_pred(self.assumptions[i]);
        }
        self.assumptions.truncate(mark);
        self.assumptions_lim.truncate(self.level as usize);
        self.pa.pop(n);
        self.ex.pop(n);
        self.fa.pop(n);
        for &lemma in &replayed {
            self.assert_both(lemma);
        }
        if self.level > 0 {
            if let Some(frame) = self.replay.last_mut() {
                frame.extend(replayed);
            }
        }
    }

    fn assert_both(&mut self, e: TermId) {
        self.ex.assert(e);
        self.fa.assert(e);
    }

    fn player_fml(&self, level: u32) -> Result<TermId> {
        let f = if level % 2 == 0 {
            self.fml_pred
        } else {
            self.nfml_pred
        };
        f.ok_or_else(|| QsatError::internal("solver not initialized"))
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(QsatError::Cancelled);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.pa = PredAbs::new();
        self.fml_pred = None;
        self.nfml_pred = None;
        self.blocks.clear();
        self.vals.clear();
        self.preds.clear();
        self.assumptions.clear();
        self.assumptions_lim.clear();
        self.replay = vec![Vec::new()];
        self.level = 0;
        self.model = None;
    }

    /// Game state rendering for traces and test failures.
    #[must_use]
    pub fn display(&self, tm: &TermManager) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let _ = writeln!(out, "level: {}", self.level);
        for (i, block) in self.blocks.iter().enumerate() {
            let tag = if i % 2 == 0 { "E" } else { "A" };
            let _ = write!(out, "{tag}:");
            for (j, &v) in block.iter().enumerate() {
                let _ = write!(out, " {}", tm.display(v));
                if let Some(val) = self.vals.get(i).and_then(|vs| vs.get(j)).and_then(|v| v.as_ref()) {
                    let _ = write!(out, " |-> {val:?}");
                }
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "assumptions: {}", self.assumptions.len());
        out
    }
}

/// Decide a quantified formula over the built-in kernels.
pub fn qsat_check(tm: &mut TermManager, fml: TermId) -> Result<QsatResult> {
    let mut solver = QsatSolver::new();
    solver.check(tm, fml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use num_rational::BigRational;
    use num_traits::{One, Zero};

    #[test]
    fn exists_real_open_interval() {
        // exists x:Real. 0 < x < 1
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.real_sort);
        let zero = tm.mk_real(BigRational::zero());
        let one = tm.mk_real(BigRational::one());
        let lo = tm.mk_gt(x, zero);
        let hi = tm.mk_lt(x, one);
        let body = tm.mk_and(vec![lo, hi]);
        let fml = tm.mk_exists(vec![x], body);
        match qsat_check(&mut tm, fml).unwrap() {
            QsatResult::Sat(mdl) => {
                let v = mdl.eval_rational(&tm, x).unwrap();
                assert!(v > BigRational::zero() && v < BigRational::one());
            }
            r => panic!("expected sat, got {r:?}"),
        }
    }

    #[test]
    fn exists_int_even_equals_one() {
        // exists x:Int. 2x = 1
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let two = tm.mk_int(BigInt::from(2));
        let one = tm.mk_int(BigInt::from(1));
        let tx = tm.mk_mul(two, x);
        let body = tm.mk_eq(tx, one);
        let fml = tm.mk_exists(vec![x], body);
        assert!(matches!(
            qsat_check(&mut tm, fml).unwrap(),
            QsatResult::Unsat
        ));
    }

    #[test]
    fn forall_exists_successor() {
        // forall x:Int. exists y:Int. y > x
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let body = tm.mk_gt(y, x);
        let inner = tm.mk_exists(vec![y], body);
        let fml = tm.mk_forall(vec![x], inner);
        assert!(matches!(
            qsat_check(&mut tm, fml).unwrap(),
            QsatResult::Sat(_)
        ));
    }

    #[test]
    fn forall_bounded_fails() {
        // forall x:Int. x <= 10 is falsified
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let ten = tm.mk_int(BigInt::from(10));
        let body = tm.mk_le(x, ten);
        let fml = tm.mk_forall(vec![x], body);
        assert!(matches!(
            qsat_check(&mut tm, fml).unwrap(),
            QsatResult::Unsat
        ));
    }

    #[test]
    fn free_variable_witnessed() {
        // a <= 5 with free a: sat, and the witness respects the bound
        let mut tm = TermManager::new();
        let a = tm.mk_var("a", tm.sorts.int_sort);
        let five = tm.mk_int(BigInt::from(5));
        let fml = tm.mk_le(a, five);
        match qsat_check(&mut tm, fml).unwrap() {
            QsatResult::Sat(mdl) => {
                assert!(mdl.eval_bool(&tm, fml).unwrap());
            }
            r => panic!("expected sat, got {r:?}"),
        }
    }

    #[test]
    fn cancellation_unwinds() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let body = tm.mk_ge(x, zero);
        let fml = tm.mk_exists(vec![x], body);
        let mut solver = QsatSolver::new();
        let flag = CancelFlag::new();
        solver.set_cancel(flag.clone());
        flag.cancel();
        // the kernels report undef under cancellation before the loop
        // reaches its own poll
        match solver.check(&mut tm, fml) {
            Ok(QsatResult::Unknown(_)) | Err(QsatError::Cancelled) => {}
            other => panic!("expected cancellation, got {other:?}"),
        }
    }
}
