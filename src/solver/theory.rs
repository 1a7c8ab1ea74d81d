//! Linear Feasibility.
//!
//! Decides conjunctions of linear constraints over mixed integer/real
//! variables, with divisibility side conditions. Equalities are removed
//! by substitution, inequalities by Fourier-Motzkin elimination, and a
//! sample point is reconstructed in reverse elimination order. Integer
//! candidates are searched within a residue window so divisibility
//! constraints can be met.
//!
//! Verdicts are sound, not complete: `Unsat` comes only from a ground
//! conflict after elimination (the real shadow) or a direct divisibility
//! conflict, `Sat` only from a fully verified sample; everything else is
//! `Unknown`.

use lasso::{Key, Spur};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashMap;

/// Candidate window for integer sample search; large enough for any
/// divisor lcm the tests exercise, small enough to stay cheap.
const SAMPLE_WINDOW: i64 = 64;

/// Comparison of a linear sum against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rel {
    /// `lin <= 0`
    Le,
    /// `lin < 0`
    Lt,
    /// `lin = 0`
    Eq,
}

/// `Σ cᵢ·vᵢ + k` keyed by variable name.
#[derive(Debug, Clone, Default)]
pub(crate) struct LinSum {
    pub terms: FxHashMap<Spur, BigRational>,
    pub k: BigRational,
}

impl LinSum {
    pub fn constant(k: BigRational) -> Self {
        Self {
            terms: FxHashMap::default(),
            k,
        }
    }

    pub fn add_term(&mut self, v: Spur, c: &BigRational) {
        let entry = self.terms.entry(v).or_insert_with(BigRational::zero);
        *entry += c;
        if entry.is_zero() {
            self.terms.remove(&v);
        }
    }

    pub fn add_scaled(&mut self, other: &LinSum, mul: &BigRational) {
        for (v, c) in &other.terms {
            self.add_term(*v, &(c * mul));
        }
        self.k += &other.k * mul;
    }

    pub fn is_ground(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn negated(&self) -> Self {
        let minus_one = -BigRational::one();
        let mut out = LinSum::default();
        out.add_scaled(self, &minus_one);
        out
    }

    /// Drop variable `v`, returning its coefficient.
    fn split_var(&self, v: Spur) -> (BigRational, LinSum) {
        let mut rest = self.clone();
        let c = rest.terms.remove(&v).unwrap_or_else(BigRational::zero);
        (c, rest)
    }

    /// Multiply through so every coefficient and the constant is integer.
    fn scale_to_int(&mut self) {
        let mut lcm = BigInt::one();
        for c in self.terms.values() {
            lcm = lcm.lcm(c.denom());
        }
        lcm = lcm.lcm(self.k.denom());
        if !lcm.is_one() {
            let s = BigRational::from_integer(lcm);
            for c in self.terms.values_mut() {
                *c *= &s;
            }
            self.k *= &s;
        }
    }

    fn eval(&self, assign: &FxHashMap<Spur, BigRational>) -> Option<BigRational> {
        let mut sum = self.k.clone();
        for (v, c) in &self.terms {
            sum += c * assign.get(v)?;
        }
        Some(sum)
    }
}

/// A single constraint.
#[derive(Debug, Clone)]
pub(crate) struct Constraint {
    pub lin: LinSum,
    pub rel: Rel,
}

/// `d | lin`.
#[derive(Debug, Clone)]
pub(crate) struct DivCon {
    pub d: BigInt,
    pub lin: LinSum,
}

/// One alternative of a disjunctive obligation.
#[derive(Debug, Clone)]
pub(crate) enum Choice {
    Con(Constraint),
    Div(DivCon),
}

/// The problem handed to the theory layer.
#[derive(Debug, Clone, Default)]
pub(crate) struct Problem {
    pub cons: Vec<Constraint>,
    pub divs: Vec<DivCon>,
    /// Disjunctions (disequality splits, residue splits, congruence).
    pub disjs: Vec<Vec<Choice>>,
    /// Integrality per variable; uninterpreted-sort variables count as
    /// integer-valued.
    pub int_vars: FxHashMap<Spur, bool>,
}

/// Theory verdict.
#[derive(Debug, Clone)]
pub(crate) enum Verdict {
    Sat(FxHashMap<Spur, BigRational>),
    Unsat,
    Unknown,
}

pub(crate) fn solve(problem: &Problem) -> Verdict {
    let mut unknown = false;
    let verdict = solve_disjs(problem, 0, &mut problem.cons.clone(), &mut problem.divs.clone(), &mut unknown);
    match verdict {
        Some(assign) => Verdict::Sat(assign),
        None if unknown => Verdict::Unknown,
        None => Verdict::Unsat,
    }
}

fn solve_disjs(
    problem: &Problem,
    idx: usize,
    cons: &mut Vec<Constraint>,
    divs: &mut Vec<DivCon>,
    unknown: &mut bool,
) -> Option<FxHashMap<Spur, BigRational>> {
    if idx == problem.disjs.len() {
        return match base_solve(cons, divs, &problem.int_vars) {
            Verdict::Sat(a) => Some(a),
            Verdict::Unsat => None,
            Verdict::Unknown => {
                *unknown = true;
                None
            }
        };
    }
    for choice in &problem.disjs[idx] {
        match choice {
            Choice::Con(c) => {
                cons.push(c.clone());
                if let Some(a) = solve_disjs(problem, idx + 1, cons, divs, unknown) {
                    return Some(a);
                }
                cons.pop();
            }
            Choice::Div(d) => {
                divs.push(d.clone());
                if let Some(a) = solve_disjs(problem, idx + 1, cons, divs, unknown) {
                    return Some(a);
                }
                divs.pop();
            }
        }
    }
    None
}

/// Elimination record, in the order applied.
enum Elim {
    /// `c·v + rest = 0`, i.e. `v = -rest/c`.
    Subst { v: Spur, c: BigRational, rest: LinSum },
    /// Bounds on `v`: lowers are `(lin, strict)` with `v >= lin` (or `>`),
    /// uppers with `v <= lin` (or `<`).
    Bounds {
        v: Spur,
        lowers: Vec<(LinSum, bool)>,
        uppers: Vec<(LinSum, bool)>,
    },
}

fn base_solve(
    cons: &[Constraint],
    divs: &[DivCon],
    int_vars: &FxHashMap<Spur, bool>,
) -> Verdict {
    let mut work: Vec<Constraint> = cons.to_vec();
    let mut divs: Vec<DivCon> = divs.to_vec();
    let mut elims: Vec<Elim> = Vec::new();

    // equality substitution
    loop {
        match check_ground(&work) {
            GroundStatus::Conflict => return Verdict::Unsat,
            GroundStatus::Ok => {}
        }
        let Some(pos) = work
            .iter()
            .position(|c| c.rel == Rel::Eq && !c.lin.is_ground())
        else {
            break;
        };
        let mut eq = work.swap_remove(pos);
        eq.lin.scale_to_int();
        let v = *eq
            .lin
            .terms
            .keys()
            .min_by_key(|s| s.into_usize())
            .expect("non-ground equality has a variable");
        let (c, rest) = eq.lin.split_var(v);
        // substitute v = -rest/c everywhere
        let sub = |lin: &LinSum| -> LinSum {
            let (cv, mut other) = lin.split_var(v);
            if !cv.is_zero() {
                other.add_scaled(&rest, &(-cv / &c));
            }
            other
        };
        for con in work.iter_mut() {
            con.lin = sub(&con.lin);
        }
        for d in divs.iter_mut() {
            d.lin = sub(&d.lin);
        }
        if int_vars.get(&v).copied().unwrap_or(true) {
            // integrality of -rest/c becomes a divisibility side condition
            let mut r = rest.clone();
            r.scale_to_int();
            let d = c.to_integer().abs();
            if !d.is_one() {
                if r.is_ground() {
                    if !r.k.to_integer().mod_floor(&d).is_zero() {
                        return Verdict::Unsat;
                    }
                } else {
                    divs.push(DivCon { d, lin: r });
                }
            }
        }
        elims.push(Elim::Subst { v, c, rest });
    }

    // Fourier-Motzkin on the remaining inequalities
    loop {
        match check_ground(&work) {
            GroundStatus::Conflict => return Verdict::Unsat,
            GroundStatus::Ok => {}
        }
        let Some(v) = pick_var(&work) else { break };
        let mut lowers: Vec<(LinSum, bool)> = Vec::new();
        let mut uppers: Vec<(LinSum, bool)> = Vec::new();
        let mut rest_cons: Vec<Constraint> = Vec::new();
        for con in work.drain(..) {
            let (c, other) = con.lin.split_var(v);
            if c.is_zero() {
                rest_cons.push(Constraint { lin: other, rel: con.rel });
                continue;
            }
            let strict = con.rel == Rel::Lt;
            // c·v + other <= 0  =>  v <= -other/c (c > 0) or v >= -other/c (c < 0)
            let mut bound = LinSum::default();
            bound.add_scaled(&other, &(-BigRational::one() / &c));
            if c.is_positive() {
                uppers.push((bound, strict));
            } else {
                lowers.push((bound, strict));
            }
        }
        // real shadow: every lower/upper pair must be consistent
        for (lo, lo_strict) in &lowers {
            for (hi, hi_strict) in &uppers {
                let mut diff = lo.clone();
                diff.add_scaled(hi, &-BigRational::one());
                // lo <= v <= hi  =>  lo - hi <= 0
                let rel = if *lo_strict || *hi_strict { Rel::Lt } else { Rel::Le };
                rest_cons.push(Constraint { lin: diff, rel });
            }
        }
        elims.push(Elim::Bounds { v, lowers, uppers });
        work = rest_cons;
    }
    match check_ground(&work) {
        GroundStatus::Conflict => return Verdict::Unsat,
        GroundStatus::Ok => {}
    }
    // divisibility over constants only
    for d in &divs {
        if d.lin.is_ground() {
            let mut lin = d.lin.clone();
            lin.scale_to_int();
            if !lin.k.is_integer() || !lin.k.to_integer().mod_floor(&d.d).is_zero() {
                return Verdict::Unsat;
            }
        }
    }

    // sample reconstruction, reverse elimination order
    let mut assign: FxHashMap<Spur, BigRational> = FxHashMap::default();
    if sample(&elims, elims.len(), &divs, int_vars, &mut assign)
        && verify(cons, &divs, &assign)
    {
        Verdict::Sat(assign)
    } else {
        Verdict::Unknown
    }
}

enum GroundStatus {
    Ok,
    Conflict,
}

fn check_ground(cons: &[Constraint]) -> GroundStatus {
    for c in cons {
        if c.lin.is_ground() {
            let holds = match c.rel {
                Rel::Le => c.lin.k <= BigRational::zero(),
                Rel::Lt => c.lin.k < BigRational::zero(),
                Rel::Eq => c.lin.k.is_zero(),
            };
            if !holds {
                return GroundStatus::Conflict;
            }
        }
    }
    GroundStatus::Ok
}

fn pick_var(cons: &[Constraint]) -> Option<Spur> {
    cons.iter()
        .flat_map(|c| c.lin.terms.keys())
        .min_by_key(|s| s.into_usize())
        .copied()
}

/// Assign variables from the last elimination backwards; integer choices
/// are tried within a window so later divisibility checks can succeed.
fn sample(
    elims: &[Elim],
    depth: usize,
    divs: &[DivCon],
    int_vars: &FxHashMap<Spur, bool>,
    assign: &mut FxHashMap<Spur, BigRational>,
) -> bool {
    if depth == 0 {
        // every divisibility must now be decidable
        return divs.iter().all(|d| match d.lin.eval(assign) {
            Some(val) => {
                val.is_integer() && val.to_integer().mod_floor(&d.d).is_zero()
            }
            None => {
                // mentions a variable no constraint bound; default it
                for v in d.lin.terms.keys() {
                    if !assign.contains_key(v) {
                        assign.insert(*v, BigRational::zero());
                    }
                }
                match d.lin.eval(assign) {
                    Some(val) => {
                        val.is_integer() && val.to_integer().mod_floor(&d.d).is_zero()
                    }
                    None => false,
                }
            }
        });
    }
    match &elims[depth - 1] {
        Elim::Subst { v, c, rest } => {
            let Some(r) = rest.eval(assign) else {
                // variables of `rest` that never hit another constraint
                for w in rest.terms.keys() {
                    assign.entry(*w).or_insert_with(BigRational::zero);
                }
                let Some(r) = rest.eval(assign) else { return false };
                let val = -r / c;
                if int_vars.get(v).copied().unwrap_or(true) && !val.is_integer() {
                    return false;
                }
                assign.insert(*v, val);
                return sample(elims, depth - 1, divs, int_vars, assign);
            };
            let val = -r / c;
            if int_vars.get(v).copied().unwrap_or(true) && !val.is_integer() {
                return false;
            }
            assign.insert(*v, val);
            sample(elims, depth - 1, divs, int_vars, assign)
        }
        Elim::Bounds { v, lowers, uppers } => {
            let mut lo: Option<(BigRational, bool)> = None;
            for (lin, strict) in lowers {
                for w in lin.terms.keys() {
                    assign.entry(*w).or_insert_with(BigRational::zero);
                }
                let Some(val) = lin.eval(assign) else { return false };
                let better = match &lo {
                    None => true,
                    Some((cur, cur_strict)) => {
                        val > *cur || (val == *cur && *strict && !cur_strict)
                    }
                };
                if better {
                    lo = Some((val, *strict));
                }
            }
            let mut hi: Option<(BigRational, bool)> = None;
            for (lin, strict) in uppers {
                for w in lin.terms.keys() {
                    assign.entry(*w).or_insert_with(BigRational::zero);
                }
                let Some(val) = lin.eval(assign) else { return false };
                let better = match &hi {
                    None => true,
                    Some((cur, cur_strict)) => {
                        val < *cur || (val == *cur && *strict && !cur_strict)
                    }
                };
                if better {
                    hi = Some((val, *strict));
                }
            }
            let is_int = int_vars.get(v).copied().unwrap_or(true);
            if is_int {
                for cand in int_candidates(&lo, &hi) {
                    assign.insert(*v, BigRational::from_integer(cand));
                    if sample(elims, depth - 1, divs, int_vars, assign) {
                        return true;
                    }
                }
                assign.remove(v);
                false
            } else {
                let val = match (&lo, &hi) {
                    (None, None) => BigRational::zero(),
                    (Some((l, _)), None) => l + BigRational::one(),
                    (None, Some((h, _))) => h - BigRational::one(),
                    (Some((l, ls)), Some((h, hs))) => {
                        if l > h {
                            return false;
                        }
                        if l == h {
                            if *ls || *hs {
                                return false;
                            }
                            l.clone()
                        } else {
                            (l + h) / BigRational::from_integer(BigInt::from(2))
                        }
                    }
                };
                assign.insert(*v, val);
                sample(elims, depth - 1, divs, int_vars, assign)
            }
        }
    }
}

/// Integer candidates within the bound interval, nearest the lower end,
/// capped by the sample window.
fn int_candidates(
    lo: &Option<(BigRational, bool)>,
    hi: &Option<(BigRational, bool)>,
) -> Vec<BigInt> {
    let lo_int = lo.as_ref().map(|(l, strict)| {
        let f = l.floor().to_integer();
        if *strict || BigRational::from_integer(f.clone()) < *l {
            f + 1
        } else {
            f
        }
    });
    let hi_int = hi.as_ref().map(|(h, strict)| {
        let c = h.ceil().to_integer();
        if *strict || BigRational::from_integer(c.clone()) > *h {
            c - 1
        } else {
            c
        }
    });
    let mut out = Vec::new();
    match (lo_int, hi_int) {
        (Some(l), Some(h)) => {
            let mut cur = l;
            let mut n = 0;
            while cur <= h && n < SAMPLE_WINDOW {
                out.push(cur.clone());
                cur += 1;
                n += 1;
            }
        }
        (Some(l), None) => {
            let mut cur = l;
            for _ in 0..SAMPLE_WINDOW {
                out.push(cur.clone());
                cur += 1;
            }
        }
        (None, Some(h)) => {
            let mut cur = h;
            for _ in 0..SAMPLE_WINDOW {
                out.push(cur.clone());
                cur -= 1;
            }
        }
        (None, None) => {
            for i in 0..SAMPLE_WINDOW {
                out.push(BigInt::from(i));
                if i > 0 {
                    out.push(BigInt::from(-i));
                }
            }
        }
    }
    out
}

fn verify(
    cons: &[Constraint],
    divs: &[DivCon],
    assign: &FxHashMap<Spur, BigRational>,
) -> bool {
    for c in cons {
        let Some(val) = c.lin.eval(assign) else { return false };
        let holds = match c.rel {
            Rel::Le => val <= BigRational::zero(),
            Rel::Lt => val < BigRational::zero(),
            Rel::Eq => val.is_zero(),
        };
        if !holds {
            return false;
        }
    }
    for d in divs {
        let Some(val) = d.lin.eval(assign) else { return false };
        if !val.is_integer() || !val.to_integer().mod_floor(&d.d).is_zero() {
            return false;
        }
    }
    true
}
