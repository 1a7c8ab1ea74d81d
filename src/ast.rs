//! Hash-Consed Term Arena.
//!
//! All formulas and terms live in a [`TermManager`]: an arena of interned
//! nodes addressed by copy-cheap [`TermId`] indices. Structural equality is
//! id equality. Nodes are never mutated after interning; the DAG is built
//! bottom-up, so no cycles arise.
//!
//! Constructors perform light canonicalization only (boolean constant
//! folding, `>=`/`>` normalization to `<=`/`<`, argument flattening);
//! semantic normalization is the job of the rewriter.

use crate::sort::{Sort, SortId, Sorts};
use lasso::{Rodeo, Spur};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::fmt;

/// Argument list representation for interned nodes.
pub type Args = SmallVec<[TermId; 4]>;

/// Index of an interned term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermId(u32);

impl TermId {
    /// Raw index value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// The shape of a term node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// Boolean constant `true`.
    True,
    /// Boolean constant `false`.
    False,
    /// An uninterpreted constant; its sort lives on the node.
    Var(Spur),
    /// An exact numeral; sort distinguishes `Int` from `Real`.
    Num(BigRational),
    /// Negation.
    Not(TermId),
    /// N-ary conjunction.
    And(Args),
    /// N-ary disjunction.
    Or(Args),
    /// Implication.
    Implies(TermId, TermId),
    /// Equivalence of Booleans.
    Iff(TermId, TermId),
    /// Equality (any sort).
    Eq(TermId, TermId),
    /// If-then-else.
    Ite(TermId, TermId, TermId),
    /// Non-strict order on arithmetic terms.
    Le(TermId, TermId),
    /// Strict order on arithmetic terms.
    Lt(TermId, TermId),
    /// N-ary sum.
    Add(Args),
    /// Difference.
    Sub(TermId, TermId),
    /// Unary minus.
    Neg(TermId),
    /// Binary product.
    Mul(TermId, TermId),
    /// Euclidean remainder.
    Mod(TermId, TermId),
    /// Application of an uninterpreted predicate or function.
    App(Spur, Args),
    /// Existential quantifier over named constants.
    Exists(Vec<TermId>, TermId),
    /// Universal quantifier over named constants.
    Forall(Vec<TermId>, TermId),
}

/// An interned term node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    /// Node shape.
    pub kind: TermKind,
    /// Sort of the node.
    pub sort: SortId,
}

/// Arena, interner and sort table for all terms.
pub struct TermManager {
    terms: Vec<Term>,
    intern: FxHashMap<Term, TermId>,
    sort_table: Vec<Sort>,
    sort_intern: FxHashMap<Sort, SortId>,
    names: Rodeo,
    /// The well-known sorts.
    pub sorts: Sorts,
    fresh_counter: u32,
}

impl TermManager {
    /// Create an empty manager with the interpreted sorts installed.
    #[must_use]
    pub fn new() -> Self {
        let mut tm = Self {
            terms: Vec::new(),
            intern: FxHashMap::default(),
            sort_table: Vec::new(),
            sort_intern: FxHashMap::default(),
            names: Rodeo::default(),
            sorts: Sorts {
                bool_sort: SortId(0),
                int_sort: SortId(0),
                real_sort: SortId(0),
            },
            fresh_counter: 0,
        };
        tm.sorts = Sorts {
            bool_sort: tm.mk_sort(Sort::Bool),
            int_sort: tm.mk_sort(Sort::Int),
            real_sort: tm.mk_sort(Sort::Real),
        };
        tm
    }

    /// Intern a sort.
    pub fn mk_sort(&mut self, sort: Sort) -> SortId {
        if let Some(&id) = self.sort_intern.get(&sort) {
            return id;
        }
        let id = SortId(self.sort_table.len() as u32);
        self.sort_table.push(sort);
        self.sort_intern.insert(sort, id);
        id
    }

    /// Intern an uninterpreted sort by name.
    pub fn mk_uninterpreted_sort(&mut self, name: &str) -> SortId {
        let spur = self.names.get_or_intern(name);
        self.mk_sort(Sort::Uninterpreted(spur))
    }

    /// Look up a sort.
    #[must_use]
    pub fn sort(&self, id: SortId) -> Sort {
        self.sort_table[id.0 as usize]
    }

    /// Sort of a term.
    #[must_use]
    pub fn sort_of(&self, t: TermId) -> Sort {
        self.sort_table[self.get(t).sort.0 as usize]
    }

    /// Sort id of a term.
    #[must_use]
    pub fn sort_id_of(&self, t: TermId) -> SortId {
        self.get(t).sort
    }

    /// Look up a node.
    #[must_use]
    pub fn get(&self, t: TermId) -> &Term {
        &self.terms[t.0 as usize]
    }

    /// Look up a node's kind.
    #[must_use]
    pub fn kind(&self, t: TermId) -> &TermKind {
        &self.get(t).kind
    }

    /// Resolve an interned name.
    #[must_use]
    pub fn resolve(&self, name: Spur) -> &str {
        self.names.resolve(&name)
    }

    /// Intern a name.
    pub fn intern(&mut self, name: &str) -> Spur {
        self.names.get_or_intern(name)
    }

    fn mk(&mut self, kind: TermKind, sort: SortId) -> TermId {
        let node = Term { kind, sort };
        if let Some(&id) = self.intern.get(&node) {
            return id;
        }
        let id = TermId(self.terms.len() as u32);
        self.terms.push(node.clone());
        self.intern.insert(node, id);
        id
    }

    /// `true`.
    pub fn mk_true(&mut self) -> TermId {
        let s = self.sorts.bool_sort;
        self.mk(TermKind::True, s)
    }

    /// `false`.
    pub fn mk_false(&mut self) -> TermId {
        let s = self.sorts.bool_sort;
        self.mk(TermKind::False, s)
    }

    /// Boolean constant by value.
    pub fn mk_bool(&mut self, b: bool) -> TermId {
        if b {
            self.mk_true()
        } else {
            self.mk_false()
        }
    }

    /// An uninterpreted constant.
    pub fn mk_var(&mut self, name: &str, sort: SortId) -> TermId {
        let spur = self.names.get_or_intern(name);
        self.mk(TermKind::Var(spur), sort)
    }

    /// A fresh uninterpreted constant, named `prefix!n`.
    pub fn fresh_var(&mut self, prefix: &str, sort: SortId) -> TermId {
        let n = self.fresh_counter;
        self.fresh_counter += 1;
        let name = format!("{prefix}!{n}");
        self.mk_var(&name, sort)
    }

    /// A fresh Boolean constant.
    pub fn fresh_bool(&mut self, prefix: &str) -> TermId {
        let s = self.sorts.bool_sort;
        self.fresh_var(prefix, s)
    }

    /// Integer numeral.
    pub fn mk_int(&mut self, n: BigInt) -> TermId {
        let s = self.sorts.int_sort;
        self.mk(TermKind::Num(BigRational::from_integer(n)), s)
    }

    /// Real numeral.
    pub fn mk_real(&mut self, r: BigRational) -> TermId {
        let s = self.sorts.real_sort;
        self.mk(TermKind::Num(r), s)
    }

    /// Numeral of a given arithmetic sort.
    pub fn mk_num(&mut self, r: BigRational, sort: SortId) -> TermId {
        self.mk(TermKind::Num(r), sort)
    }

    /// Negation, folding constants and double negation.
    pub fn mk_not(&mut self, t: TermId) -> TermId {
        match self.kind(t) {
            TermKind::True => self.mk_false(),
            TermKind::False => self.mk_true(),
            TermKind::Not(inner) => *inner,
            _ => {
                let s = self.sorts.bool_sort;
                self.mk(TermKind::Not(t), s)
            }
        }
    }

    /// Conjunction; flattens nested conjunctions and folds constants.
    pub fn mk_and(&mut self, args: Vec<TermId>) -> TermId {
        let mut flat: Args = SmallVec::new();
        let mut seen = FxHashSet::default();
        for a in args {
            match self.kind(a) {
                TermKind::True => {}
                TermKind::False => return self.mk_false(),
                TermKind::And(inner) => {
                    for &i in inner.clone().iter() {
                        if seen.insert(i) {
                            flat.push(i);
                        }
                    }
                }
                _ => {
                    if seen.insert(a) {
                        flat.push(a);
                    }
                }
            }
        }
        match flat.len() {
            0 => self.mk_true(),
            1 => flat[0],
            _ => {
                let s = self.sorts.bool_sort;
                self.mk(TermKind::And(flat), s)
            }
        }
    }

    /// Disjunction; flattens nested disjunctions and folds constants.
    pub fn mk_or(&mut self, args: Vec<TermId>) -> TermId {
        let mut flat: Args = SmallVec::new();
        let mut seen = FxHashSet::default();
        for a in args {
            match self.kind(a) {
                TermKind::False => {}
                TermKind::True => return self.mk_true(),
                TermKind::Or(inner) => {
                    for &i in inner.clone().iter() {
                        if seen.insert(i) {
                            flat.push(i);
                        }
                    }
                }
                _ => {
                    if seen.insert(a) {
                        flat.push(a);
                    }
                }
            }
        }
        match flat.len() {
            0 => self.mk_false(),
            1 => flat[0],
            _ => {
                let s = self.sorts.bool_sort;
                self.mk(TermKind::Or(flat), s)
            }
        }
    }

    /// Implication.
    pub fn mk_implies(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        match (self.kind(lhs), self.kind(rhs)) {
            (TermKind::True, _) => rhs,
            (TermKind::False, _) | (_, TermKind::True) => self.mk_true(),
            (_, TermKind::False) => self.mk_not(lhs),
            _ => {
                let s = self.sorts.bool_sort;
                self.mk(TermKind::Implies(lhs, rhs), s)
            }
        }
    }

    /// Boolean equivalence.
    pub fn mk_iff(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        if lhs == rhs {
            return self.mk_true();
        }
        match (self.kind(lhs), self.kind(rhs)) {
            (TermKind::True, _) => rhs,
            (_, TermKind::True) => lhs,
            (TermKind::False, _) => self.mk_not(rhs),
            (_, TermKind::False) => self.mk_not(lhs),
            _ => {
                let (a, b) = if lhs < rhs { (lhs, rhs) } else { (rhs, lhs) };
                let s = self.sorts.bool_sort;
                self.mk(TermKind::Iff(a, b), s)
            }
        }
    }

    /// Equality; oriented by id for canonical interning. Boolean
    /// equality is an equivalence.
    pub fn mk_eq(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        if lhs == rhs {
            return self.mk_true();
        }
        if self.sort_of(lhs).is_bool() {
            return self.mk_iff(lhs, rhs);
        }
        let (a, b) = if lhs < rhs { (lhs, rhs) } else { (rhs, lhs) };
        let s = self.sorts.bool_sort;
        self.mk(TermKind::Eq(a, b), s)
    }

    /// If-then-else.
    pub fn mk_ite(&mut self, cond: TermId, then_br: TermId, else_br: TermId) -> TermId {
        match self.kind(cond) {
            TermKind::True => then_br,
            TermKind::False => else_br,
            _ => {
                let s = self.sort_id_of(then_br);
                self.mk(TermKind::Ite(cond, then_br, else_br), s)
            }
        }
    }

    /// `lhs <= rhs`.
    pub fn mk_le(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.mk(TermKind::Le(lhs, rhs), s)
    }

    /// `lhs < rhs`.
    pub fn mk_lt(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.mk(TermKind::Lt(lhs, rhs), s)
    }

    /// `lhs >= rhs`, stored as `rhs <= lhs`.
    pub fn mk_ge(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        self.mk_le(rhs, lhs)
    }

    /// `lhs > rhs`, stored as `rhs < lhs`.
    pub fn mk_gt(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        self.mk_lt(rhs, lhs)
    }

    /// N-ary sum; flattens nested sums. An empty sum is the zero numeral
    /// of the given sort.
    pub fn mk_add(&mut self, args: Vec<TermId>, sort: SortId) -> TermId {
        let mut flat: Args = SmallVec::new();
        for a in args {
            match self.kind(a) {
                TermKind::Add(inner) => flat.extend(inner.clone()),
                _ => flat.push(a),
            }
        }
        match flat.len() {
            0 => self.mk_num(BigRational::zero(), sort),
            1 => flat[0],
            _ => self.mk(TermKind::Add(flat), sort),
        }
    }

    /// Difference.
    pub fn mk_sub(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sort_id_of(lhs);
        self.mk(TermKind::Sub(lhs, rhs), s)
    }

    /// Unary minus.
    pub fn mk_neg(&mut self, t: TermId) -> TermId {
        let s = self.sort_id_of(t);
        self.mk(TermKind::Neg(t), s)
    }

    /// Binary product.
    pub fn mk_mul(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sort_id_of(rhs);
        self.mk(TermKind::Mul(lhs, rhs), s)
    }

    /// Scale a term by a rational constant; `1 * t` stays `t`.
    pub fn mk_mul_num(&mut self, r: &BigRational, t: TermId) -> TermId {
        use num_traits::One;
        if r.is_one() {
            return t;
        }
        let s = self.sort_id_of(t);
        let n = self.mk_num(r.clone(), s);
        self.mk_mul(n, t)
    }

    /// Euclidean remainder.
    pub fn mk_mod(&mut self, lhs: TermId, rhs: TermId) -> TermId {
        let s = self.sort_id_of(lhs);
        self.mk(TermKind::Mod(lhs, rhs), s)
    }

    /// Divisibility `k | t`, represented as `(t mod |k|) = 0`.
    pub fn mk_divides(&mut self, k: &BigInt, t: TermId) -> TermId {
        use num_traits::Signed;
        let s = self.sort_id_of(t);
        let kn = self.mk_num(BigRational::from_integer(k.abs()), s);
        let m = self.mk_mod(t, kn);
        let z = self.mk_num(BigRational::zero(), s);
        self.mk_eq(m, z)
    }

    /// Uninterpreted predicate or function application.
    pub fn mk_app(&mut self, name: &str, args: Vec<TermId>, sort: SortId) -> TermId {
        let spur = self.names.get_or_intern(name);
        self.mk(TermKind::App(spur, args.into_iter().collect()), sort)
    }

    /// Existential quantifier; an empty binder list is dropped.
    pub fn mk_exists(&mut self, vars: Vec<TermId>, body: TermId) -> TermId {
        if vars.is_empty() {
            return body;
        }
        let s = self.sorts.bool_sort;
        self.mk(TermKind::Exists(vars, body), s)
    }

    /// Universal quantifier; an empty binder list is dropped.
    pub fn mk_forall(&mut self, vars: Vec<TermId>, body: TermId) -> TermId {
        if vars.is_empty() {
            return body;
        }
        let s = self.sorts.bool_sort;
        self.mk(TermKind::Forall(vars, body), s)
    }

    /// Numeral value of a term, when it is one.
    #[must_use]
    pub fn numeral(&self, t: TermId) -> Option<&BigRational> {
        match self.kind(t) {
            TermKind::Num(r) => Some(r),
            _ => None,
        }
    }

    /// Boolean value of a term, when it is a constant.
    #[must_use]
    pub fn bool_value(&self, t: TermId) -> Option<bool> {
        match self.kind(t) {
            TermKind::True => Some(true),
            TermKind::False => Some(false),
            _ => None,
        }
    }

    /// Check whether a term is an uninterpreted constant.
    #[must_use]
    pub fn is_var(&self, t: TermId) -> bool {
        matches!(self.kind(t), TermKind::Var(_))
    }

    /// Name of an uninterpreted constant.
    #[must_use]
    pub fn var_name(&self, t: TermId) -> Option<Spur> {
        match self.kind(t) {
            TermKind::Var(name) => Some(*name),
            _ => None,
        }
    }

    /// Direct children of a node.
    #[must_use]
    pub fn children(&self, t: TermId) -> Args {
        match self.kind(t) {
            TermKind::True | TermKind::False | TermKind::Var(_) | TermKind::Num(_) => {
                SmallVec::new()
            }
            TermKind::Not(a) | TermKind::Neg(a) => SmallVec::from_slice(&[*a]),
            TermKind::Implies(a, b)
            | TermKind::Iff(a, b)
            | TermKind::Eq(a, b)
            | TermKind::Le(a, b)
            | TermKind::Lt(a, b)
            | TermKind::Sub(a, b)
            | TermKind::Mul(a, b)
            | TermKind::Mod(a, b) => SmallVec::from_slice(&[*a, *b]),
            TermKind::Ite(a, b, c) => SmallVec::from_slice(&[*a, *b, *c]),
            TermKind::And(args) | TermKind::Or(args) | TermKind::Add(args) => args.clone(),
            TermKind::App(_, args) => args.clone(),
            TermKind::Exists(_, body) | TermKind::Forall(_, body) => SmallVec::from_slice(&[*body]),
        }
    }

    /// Check whether constant `x` occurs in `t`, not descending under a
    /// binder that rebinds it.
    #[must_use]
    pub fn occurs(&self, x: TermId, t: TermId) -> bool {
        let mut todo = vec![t];
        let mut visited = FxHashSet::default();
        while let Some(cur) = todo.pop() {
            if !visited.insert(cur) {
                continue;
            }
            if cur == x {
                return true;
            }
            match self.kind(cur) {
                TermKind::Exists(vars, body) | TermKind::Forall(vars, body) => {
                    if !vars.contains(&x) {
                        todo.push(*body);
                    }
                }
                _ => todo.extend(self.children(cur)),
            }
        }
        false
    }

    /// Collect the free uninterpreted constants of a formula, in first
    /// occurrence order. Constants bound by a quantifier are excluded.
    #[must_use]
    pub fn free_consts(&self, t: TermId) -> Vec<TermId> {
        let mut out = Vec::new();
        let mut bound = FxHashSet::default();
        self.free_consts_rec(t, &mut bound, &mut out, &mut FxHashSet::default());
        out
    }

    fn free_consts_rec(
        &self,
        t: TermId,
        bound: &mut FxHashSet<TermId>,
        out: &mut Vec<TermId>,
        seen: &mut FxHashSet<TermId>,
    ) {
        // sharing is only cached outside binders; under a binder the same
        // node can have a different free set
        if bound.is_empty() && !seen.insert(t) {
            return;
        }
        match self.kind(t) {
            TermKind::Var(_) => {
                if !bound.contains(&t) && !out.contains(&t) {
                    out.push(t);
                }
            }
            TermKind::Exists(vars, body) | TermKind::Forall(vars, body) => {
                let fresh: Vec<TermId> =
                    vars.iter().copied().filter(|v| bound.insert(*v)).collect();
                self.free_consts_rec(*body, bound, out, seen);
                for v in fresh {
                    bound.remove(&v);
                }
            }
            _ => {
                for c in self.children(t) {
                    self.free_consts_rec(c, bound, out, seen);
                }
            }
        }
    }

    /// Replace constants according to `map`, rebuilding the DAG bottom-up.
    /// Quantifier binders shadow replacements of the constants they bind.
    pub fn substitute(&mut self, t: TermId, map: &FxHashMap<TermId, TermId>) -> TermId {
        if map.is_empty() {
            return t;
        }
        self.substitute_rec(t, map)
    }

    fn substitute_rec(&mut self, t: TermId, map: &FxHashMap<TermId, TermId>) -> TermId {
        if let Some(&r) = map.get(&t) {
            return r;
        }
        let kind = self.kind(t).clone();
        match kind {
            TermKind::True
            | TermKind::False
            | TermKind::Var(_)
            | TermKind::Num(_) => t,
            TermKind::Not(a) => {
                let a2 = self.substitute_rec(a, map);
                self.mk_not(a2)
            }
            TermKind::Neg(a) => {
                let a2 = self.substitute_rec(a, map);
                self.mk_neg(a2)
            }
            TermKind::And(args) => {
                let args2 = args.iter().map(|&a| self.substitute_rec(a, map)).collect();
                self.mk_and(args2)
            }
            TermKind::Or(args) => {
                let args2 = args.iter().map(|&a| self.substitute_rec(a, map)).collect();
                self.mk_or(args2)
            }
            TermKind::Add(args) => {
                let sort = self.sort_id_of(t);
                let args2 = args.iter().map(|&a| self.substitute_rec(a, map)).collect();
                self.mk_add(args2, sort)
            }
            TermKind::Implies(a, b) => {
                let a2 = self.substitute_rec(a, map);
                let b2 = self.substitute_rec(b, map);
                self.mk_implies(a2, b2)
            }
            TermKind::Iff(a, b) => {
                let a2 = self.substitute_rec(a, map);
                let b2 = self.substitute_rec(b, map);
                self.mk_iff(a2, b2)
            }
            TermKind::Eq(a, b) => {
                let a2 = self.substitute_rec(a, map);
                let b2 = self.substitute_rec(b, map);
                self.mk_eq(a2, b2)
            }
            TermKind::Le(a, b) => {
                let a2 = self.substitute_rec(a, map);
                let b2 = self.substitute_rec(b, map);
                self.mk_le(a2, b2)
            }
            TermKind::Lt(a, b) => {
                let a2 = self.substitute_rec(a, map);
                let b2 = self.substitute_rec(b, map);
                self.mk_lt(a2, b2)
            }
            TermKind::Sub(a, b) => {
                let a2 = self.substitute_rec(a, map);
                let b2 = self.substitute_rec(b, map);
                self.mk_sub(a2, b2)
            }
            TermKind::Mul(a, b) => {
                let a2 = self.substitute_rec(a, map);
                let b2 = self.substitute_rec(b, map);
                self.mk_mul(a2, b2)
            }
            TermKind::Mod(a, b) => {
                let a2 = self.substitute_rec(a, map);
                let b2 = self.substitute_rec(b, map);
                self.mk_mod(a2, b2)
            }
            TermKind::Ite(a, b, c) => {
                let a2 = self.substitute_rec(a, map);
                let b2 = self.substitute_rec(b, map);
                let c2 = self.substitute_rec(c, map);
                self.mk_ite(a2, b2, c2)
            }
            TermKind::App(name, args) => {
                let sort = self.sort_id_of(t);
                let args2: Vec<TermId> =
                    args.iter().map(|&a| self.substitute_rec(a, map)).collect();
                let name_str = self.resolve(name).to_owned();
                self.mk_app(&name_str, args2, sort)
            }
            TermKind::Exists(vars, body) => {
                let mut inner = map.clone();
                for v in &vars {
                    inner.remove(v);
                }
                let body2 = self.substitute_rec(body, &inner);
                self.mk_exists(vars, body2)
            }
            TermKind::Forall(vars, body) => {
                let mut inner = map.clone();
                for v in &vars {
                    inner.remove(v);
                }
                let body2 = self.substitute_rec(body, &inner);
                self.mk_forall(vars, body2)
            }
        }
    }

    /// S-expression rendering, for traces and test failure messages.
    #[must_use]
    pub fn display(&self, t: TermId) -> String {
        let mut s = String::new();
        self.display_rec(t, &mut s);
        s
    }

    fn display_rec(&self, t: TermId, out: &mut String) {
        use std::fmt::Write;
        match self.kind(t) {
            TermKind::True => out.push_str("true"),
            TermKind::False => out.push_str("false"),
            TermKind::Var(name) => out.push_str(self.resolve(*name)),
            TermKind::Num(r) => {
                let _ = write!(out, "{r}");
            }
            TermKind::Not(a) => self.display_app(out, "not", &[*a]),
            TermKind::And(args) => self.display_app(out, "and", args),
            TermKind::Or(args) => self.display_app(out, "or", args),
            TermKind::Implies(a, b) => self.display_app(out, "=>", &[*a, *b]),
            TermKind::Iff(a, b) | TermKind::Eq(a, b) => self.display_app(out, "=", &[*a, *b]),
            TermKind::Ite(a, b, c) => self.display_app(out, "ite", &[*a, *b, *c]),
            TermKind::Le(a, b) => self.display_app(out, "<=", &[*a, *b]),
            TermKind::Lt(a, b) => self.display_app(out, "<", &[*a, *b]),
            TermKind::Add(args) => self.display_app(out, "+", args),
            TermKind::Sub(a, b) => self.display_app(out, "-", &[*a, *b]),
            TermKind::Neg(a) => self.display_app(out, "-", &[*a]),
            TermKind::Mul(a, b) => self.display_app(out, "*", &[*a, *b]),
            TermKind::Mod(a, b) => self.display_app(out, "mod", &[*a, *b]),
            TermKind::App(name, args) => {
                let head = self.resolve(*name).to_owned();
                self.display_app(out, &head, args);
            }
            TermKind::Exists(vars, body) => self.display_quant(out, "exists", vars, *body),
            TermKind::Forall(vars, body) => self.display_quant(out, "forall", vars, *body),
        }
    }

    fn display_app(&self, out: &mut String, head: &str, args: &[TermId]) {
        out.push('(');
        out.push_str(head);
        for &a in args {
            out.push(' ');
            self.display_rec(a, out);
        }
        out.push(')');
    }

    fn display_quant(&self, out: &mut String, head: &str, vars: &[TermId], body: TermId) {
        out.push('(');
        out.push_str(head);
        out.push_str(" (");
        for (i, &v) in vars.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.display_rec(v, out);
        }
        out.push_str(") ");
        self.display_rec(body, out);
        out.push(')');
    }

    /// Number of interned terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Check whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl Default for TermManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TermManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermManager")
            .field("terms", &self.terms.len())
            .field("sorts", &self.sort_table.len())
            .finish()
    }
}
