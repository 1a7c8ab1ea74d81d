//! Quantifier Hoisting.
//!
//! Extracts the outer quantifier prefix of a formula into alternating
//! variable blocks, existential-outermost by convention: block 0 holds
//! the free constants together with the outermost existentials, block 1
//! the following universals, and so on. The final block is empty.
//!
//! Quantifiers are pulled through negation polarity and through directly
//! nested binders; a bound constant that collides with a name already
//! hoisted is renamed apart.

use crate::ast::{TermId, TermKind, TermManager};
use rustc_hash::{FxHashMap, FxHashSet};

/// An alternating quantifier prefix over a quantifier-free matrix.
#[derive(Debug, Clone)]
pub struct Prefix {
    /// Variable blocks; even indices are existential.
    pub blocks: Vec<Vec<TermId>>,
    /// The quantifier-free matrix.
    pub matrix: TermId,
}

/// Hoist the prefix of `fml`.
pub fn hoist(tm: &mut TermManager, fml: TermId) -> Prefix {
    let mut seen: FxHashSet<TermId> = FxHashSet::default();
    let mut blocks: Vec<Vec<TermId>> = Vec::new();

    let mut block0 = tm.free_consts(fml);
    for &v in &block0 {
        seen.insert(v);
    }
    let mut cur = fml;
    let mut vars = Vec::new();
    cur = pull_quantifier(tm, cur, false, &mut vars, &mut seen);
    block0.append(&mut vars);
    blocks.push(block0);

    let mut is_forall = false;
    loop {
        is_forall = !is_forall;
        let mut vars = Vec::new();
        cur = pull_quantifier(tm, cur, is_forall, &mut vars, &mut seen);
        let done = vars.is_empty();
        blocks.push(vars);
        if done {
            break;
        }
    }
    Prefix {
        blocks,
        matrix: cur,
    }
}

/// Strip every outermost quantifier of the requested kind, collecting the
/// bound constants (renamed apart when already in use).
fn pull_quantifier(
    tm: &mut TermManager,
    fml: TermId,
    want_forall: bool,
    out: &mut Vec<TermId>,
    seen: &mut FxHashSet<TermId>,
) -> TermId {
    match tm.kind(fml).clone() {
        TermKind::Exists(vars, body) if !want_forall => {
            let body = rename_bound(tm, &vars, body, out, seen);
            pull_quantifier(tm, body, want_forall, out, seen)
        }
        TermKind::Forall(vars, body) if want_forall => {
            let body = rename_bound(tm, &vars, body, out, seen);
            pull_quantifier(tm, body, want_forall, out, seen)
        }
        TermKind::Not(inner) => {
            let pulled = pull_quantifier(tm, inner, !want_forall, out, seen);
            if pulled == inner {
                fml
            } else {
                tm.mk_not(pulled)
            }
        }
        _ => fml,
    }
}

fn rename_bound(
    tm: &mut TermManager,
    vars: &[TermId],
    body: TermId,
    out: &mut Vec<TermId>,
    seen: &mut FxHashSet<TermId>,
) -> TermId {
    let mut renaming: FxHashMap<TermId, TermId> = FxHashMap::default();
    for &v in vars {
        if seen.insert(v) {
            out.push(v);
        } else {
            let name = tm
                .var_name(v)
                .map(|s| tm.resolve(s).to_owned())
                .unwrap_or_else(|| "v".to_owned());
            let sort = tm.sort_id_of(v);
            let fresh = tm.fresh_var(&name, sort);
            seen.insert(fresh);
            renaming.insert(v, fresh);
            out.push(fresh);
        }
    }
    tm.substitute(body, &renaming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn prefix_of_exists_forall() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let body = tm.mk_lt(x, y);
        let fa = tm.mk_forall(vec![y], body);
        let ex = tm.mk_exists(vec![x], fa);
        let p = hoist(&mut tm, ex);
        assert_eq!(p.blocks.len(), 3);
        assert_eq!(p.blocks[0], vec![x]);
        assert_eq!(p.blocks[1], vec![y]);
        assert!(p.blocks[2].is_empty());
        assert_eq!(p.matrix, body);
    }

    #[test]
    fn forall_under_negation_is_existential() {
        // not (forall x. x <= 0)  hoists x existentially
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let le = tm.mk_le(x, zero);
        let fa = tm.mk_forall(vec![x], le);
        let nfa = tm.mk_not(fa);
        let p = hoist(&mut tm, nfa);
        assert_eq!(p.blocks[0], vec![x]);
        let expect = tm.mk_not(le);
        assert_eq!(p.matrix, expect);
    }

    #[test]
    fn free_constants_join_block_zero() {
        let mut tm = TermManager::new();
        let a = tm.mk_var("a", tm.sorts.int_sort);
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let body = tm.mk_le(a, x);
        let ex = tm.mk_exists(vec![x], body);
        let p = hoist(&mut tm, ex);
        assert_eq!(p.blocks[0], vec![a, x]);
        assert_eq!(p.matrix, body);
    }

    #[test]
    fn rebound_constant_renamed_apart() {
        // exists x. forall x. x <= 0 : the inner binder is renamed
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let le = tm.mk_le(x, zero);
        let fa = tm.mk_forall(vec![x], le);
        let ex = tm.mk_exists(vec![x], fa);
        let p = hoist(&mut tm, ex);
        assert_eq!(p.blocks[0], vec![x]);
        assert_eq!(p.blocks[1].len(), 1);
        let x2 = p.blocks[1][0];
        assert_ne!(x2, x);
        let expect = tm.mk_le(x2, zero);
        assert_eq!(p.matrix, expect);
    }

    #[test]
    fn nested_quantifier_in_connective_stays() {
        // only the outer prefix is hoisted; an exists inside a
        // conjunction is left to the abstraction layer
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let free_atom = tm.mk_le(x, zero);
        let bound_atom = tm.mk_lt(zero, x);
        let ex = tm.mk_exists(vec![x], bound_atom);
        let fml = tm.mk_and(vec![free_atom, ex]);
        let p = hoist(&mut tm, fml);
        assert_eq!(p.blocks[0], vec![x]);
        assert_eq!(p.matrix, fml);
    }

    #[test]
    fn quantifier_free_formula() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let zero = tm.mk_int(BigInt::from(0));
        let le = tm.mk_le(x, zero);
        let p = hoist(&mut tm, le);
        assert_eq!(p.blocks.len(), 2);
        assert_eq!(p.blocks[0], vec![x]);
        assert!(p.blocks[1].is_empty());
        assert_eq!(p.matrix, le);
    }
}
