//! Predicate Abstraction.
//!
//! Maintains the two-way mapping between atoms and fresh propositional
//! names, with the level each name was introduced at. The game loops
//! assert the definition clauses `p <-> atom` into their kernels; this
//! component only records the bijection, rebuilds formulas over the
//! names, extracts implicants from models, minimizes them by dual
//! propagation, and maps propositional cores back to concrete literals.
//!
//! Scoping: `push`/`pop` snapshot the tracked-atom list; popping removes
//! every mapping introduced above the surviving scope.

use crate::ast::{TermId, TermKind, TermManager};
use crate::error::{QsatError, Result};
use crate::model::Model;
use crate::solver::{Oracle, SolverResult};
use rustc_hash::FxHashMap;
use tracing::trace;

/// Counters for the abstraction layer.
#[derive(Debug, Clone, Default)]
pub struct PredAbsStats {
    /// Propositional names created.
    pub num_predicates: u64,
    /// Implicant minimization rounds.
    pub num_minimizations: u64,
}

/// Atom/name bijection with levels.
#[derive(Debug, Default)]
pub struct PredAbs {
    lit2pred: FxHashMap<TermId, TermId>,
    pred2lit: FxHashMap<TermId, TermId>,
    pred2level: FxHashMap<TermId, u32>,
    atoms: Vec<TermId>,
    atoms_lim: Vec<usize>,
    expr_level: FxHashMap<TermId, u32>,
    stats: PredAbsStats,
}

impl PredAbs {
    /// Empty abstraction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> &PredAbsStats {
        &self.stats
    }

    /// The tracked propositional names, in introduction order.
    #[must_use]
    pub fn atoms(&self) -> &[TermId] {
        &self.atoms
    }

    /// The atom a name stands for.
    #[must_use]
    pub fn lit_of(&self, p: TermId) -> Option<TermId> {
        self.pred2lit.get(&p).copied()
    }

    /// The introduction level of a name.
    #[must_use]
    pub fn level_of(&self, p: TermId) -> Option<u32> {
        self.pred2level.get(&p).copied()
    }

    /// Record a name for an atom. When `p != lit` the caller must assert
    /// the returned definition into its kernels.
    pub fn add_pred(&mut self, tm: &mut TermManager, p: TermId, lit: TermId, level: u32) -> Option<TermId> {
        self.pred2lit.insert(p, lit);
        self.lit2pred.insert(lit, p);
        self.pred2level.insert(p, level);
        self.atoms.push(p);
        self.stats.num_predicates += 1;
        if p != lit {
            Some(tm.mk_iff(p, lit))
        } else {
            None
        }
    }

    /// Drop a name and its mappings; the tracked-atom list keeps its slot
    /// until the scope pops.
    pub fn del_pred(&mut self, p: TermId) {
        if let Some(lit) = self.pred2lit.remove(&p) {
            self.lit2pred.remove(&lit);
            self.pred2level.remove(&p);
        }
    }

    /// Abstract a quantifier-free formula: boolean structure is kept,
    /// every other boolean subformula gets (or reuses) a name. New
    /// definition equivalences are appended to `defs`.
    pub fn abstract_atoms(
        &mut self,
        tm: &mut TermManager,
        fml: TermId,
        level: u32,
        defs: &mut Vec<TermId>,
    ) -> TermId {
        let mut cache: FxHashMap<TermId, TermId> = FxHashMap::default();
        self.abstract_rec(tm, fml, level, defs, &mut cache)
    }

    fn abstract_rec(
        &mut self,
        tm: &mut TermManager,
        e: TermId,
        level: u32,
        defs: &mut Vec<TermId>,
        cache: &mut FxHashMap<TermId, TermId>,
    ) -> TermId {
        if let Some(&r) = cache.get(&e) {
            return r;
        }
        let r = match tm.kind(e).clone() {
            TermKind::True | TermKind::False => e,
            TermKind::Not(a) => {
                let ra = self.abstract_rec(tm, a, level, defs, cache);
                tm.mk_not(ra)
            }
            TermKind::And(args) => {
                let rs = args
                    .iter()
                    .map(|&a| self.abstract_rec(tm, a, level, defs, cache))
                    .collect();
                tm.mk_and(rs)
            }
            TermKind::Or(args) => {
                let rs = args
                    .iter()
                    .map(|&a| self.abstract_rec(tm, a, level, defs, cache))
                    .collect();
                tm.mk_or(rs)
            }
            TermKind::Implies(a, b) => {
                let ra = self.abstract_rec(tm, a, level, defs, cache);
                let rb = self.abstract_rec(tm, b, level, defs, cache);
                tm.mk_implies(ra, rb)
            }
            TermKind::Iff(a, b) => {
                let ra = self.abstract_rec(tm, a, level, defs, cache);
                let rb = self.abstract_rec(tm, b, level, defs, cache);
                tm.mk_iff(ra, rb)
            }
            TermKind::Ite(c, a, b) if tm.sort_of(e).is_bool() => {
                let rc = self.abstract_rec(tm, c, level, defs, cache);
                let ra = self.abstract_rec(tm, a, level, defs, cache);
                let rb = self.abstract_rec(tm, b, level, defs, cache);
                tm.mk_ite(rc, ra, rb)
            }
            TermKind::Var(_) => {
                if !self.pred2lit.contains_key(&e) {
                    self.add_pred(tm, e, e, level);
                }
                e
            }
            _ => {
                if let Some(&p) = self.lit2pred.get(&e) {
                    p
                } else {
                    let p = tm.fresh_bool("p");
                    if let Some(def) = self.add_pred(tm, p, e, level) {
                        defs.push(def);
                    }
                    trace!(atom = %tm.display(e), name = %tm.display(p), "abstracted");
                    p
                }
            }
        };
        cache.insert(e, r);
        r
    }

    /// Name an arbitrary formula for use as an assumption. Negations of
    /// tracked atoms reuse the atom's name.
    pub fn mk_assumption_literal(
        &mut self,
        tm: &mut TermManager,
        fml: TermId,
        level: u32,
        defs: &mut Vec<TermId>,
    ) -> TermId {
        if let Some(&p) = self.lit2pred.get(&fml) {
            return p;
        }
        if matches!(tm.kind(fml), TermKind::Var(_)) && self.pred2lit.contains_key(&fml) {
            return fml;
        }
        let negated = match tm.kind(fml) {
            TermKind::Not(inner) => Some(*inner),
            _ => None,
        };
        if let Some(inner) = negated {
            if let Some(&p) = self.lit2pred.get(&inner) {
                return tm.mk_not(p);
            }
        }
        let p = tm.fresh_bool("asm");
        if let Some(def) = self.add_pred(tm, p, fml, level) {
            defs.push(def);
        }
        p
    }

    /// The implicant of the tracked atoms under a model: `p` when the
    /// atom holds, `not p` otherwise. Names whose mapping was dropped are
    /// skipped. Latest names come first, so that minimization prefers to
    /// drop witness literals and keep the formula's own atoms.
    pub fn extract_implicant(&self, tm: &mut TermManager, model: &Model) -> Result<Vec<TermId>> {
        let mut out = Vec::new();
        for &p in self.atoms.iter().rev() {
            let Some(&lit) = self.pred2lit.get(&p) else {
                continue;
            };
            if model.eval_bool(tm, lit)? {
                out.push(p);
            } else {
                let np = tm.mk_not(p);
                out.push(np);
            }
        }
        Ok(out)
    }

    /// As [`extract_implicant`](Self::extract_implicant), restricted to
    /// atoms whose constants all sit at or below `cutoff` in the
    /// quantifier prefix.
    pub fn implicant_below(
        &self,
        tm: &mut TermManager,
        model: &Model,
        cutoff: u32,
    ) -> Result<Vec<TermId>> {
        let mut out = Vec::new();
        for &p in self.atoms.iter().rev() {
            let Some(&lit) = self.pred2lit.get(&p) else {
                continue;
            };
            if self.compute_level(tm, lit) > cutoff {
                continue;
            }
            if model.eval_bool(tm, lit)? {
                out.push(p);
            } else {
                let np = tm.mk_not(p);
                out.push(np);
            }
        }
        Ok(out)
    }

    /// Minimize an implicant by dual propagation: the implicant together
    /// with the negated formula is unsat, and the core is the minimized
    /// implicant.
    pub fn minimize<O: Oracle>(
        &mut self,
        tm: &mut TermManager,
        oracle: &mut O,
        implicant: &[TermId],
        not_fml: TermId,
    ) -> Result<Vec<TermId>> {
        self.stats.num_minimizations += 1;
        let mut asms = implicant.to_vec();
        asms.push(not_fml);
        match oracle.check(tm, &asms) {
            SolverResult::Unsat => {
                let core: Vec<TermId> = oracle
                    .unsat_core()
                    .iter()
                    .copied()
                    .filter(|&e| e != not_fml)
                    .collect();
                Ok(core)
            }
            SolverResult::Sat => Err(QsatError::internal(
                "implicant does not imply the formula",
            )),
            SolverResult::Undef => Err(QsatError::undef(oracle.last_failure())),
        }
    }

    /// Replace names by their atoms, through negation.
    pub fn mk_concrete(&self, tm: &mut TermManager, core: &[TermId]) -> Vec<TermId> {
        let mut out = Vec::with_capacity(core.len());
        for &e in core {
            let concrete = match tm.kind(e) {
                TermKind::Not(p) => {
                    let p = *p;
                    match self.pred2lit.get(&p) {
                        Some(&lit) => tm.mk_not(lit),
                        None => e,
                    }
                }
                _ => self.pred2lit.get(&e).copied().unwrap_or(e),
            };
            out.push(concrete);
        }
        out
    }

    /// Assign a quantifier level to a constant.
    pub fn set_expr_level(&mut self, v: TermId, level: u32) {
        self.expr_level.insert(v, level);
    }

    /// Maximum quantifier level over the constants of a term; constants
    /// without an assigned level count as level zero.
    #[must_use]
    pub fn compute_level(&self, tm: &TermManager, t: TermId) -> u32 {
        tm.free_consts(t)
            .iter()
            .map(|v| self.expr_level.get(v).copied().unwrap_or(0))
            .max()
            .unwrap_or(0)
    }

    /// Open a scope.
    pub fn push(&mut self) {
        self.atoms_lim.push(self.atoms.len());
    }

    /// Close `n` scopes, dropping the mappings introduced inside them.
    pub fn pop(&mut self, n: u32) {
        for _ in 0..n {
            let Some(mark) = self.atoms_lim.pop() else {
                break;
            };
            while self.atoms.len() > mark {
                let p = self.atoms.pop().expect("atom stack in sync");
                self.del_pred(p);
            }
        }
    }
}
