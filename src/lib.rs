//! quesat — model-guided quantifier elimination and quantified
//! satisfiability for linear arithmetic and uninterpreted predicates.
//!
//! The engine decides quantified boolean combinations of linear
//! integer/real atoms and predicate occurrences by an alternating game
//! over a hoisted prefix, and eliminates existentially quantified
//! arithmetic variables from conjunctions of literals by
//! Loos-Weispfenning virtual substitution guided by a model.
//!
//! # Projection
//!
//! ```
//! use num_bigint::BigInt;
//! use quesat::{arith_project, Model, TermManager, Value};
//! use num_rational::BigRational;
//!
//! let mut tm = TermManager::new();
//! let x = tm.mk_var("x", tm.sorts.int_sort);
//! let two = tm.mk_int(BigInt::from(2));
//! let five = tm.mk_int(BigInt::from(5));
//! let lo = tm.mk_ge(x, two);
//! let hi = tm.mk_le(x, five);
//!
//! let mut model = Model::new();
//! let name = tm.var_name(x).unwrap();
//! model.register(name, Value::Rational(BigRational::from_integer(BigInt::from(3))));
//!
//! let (retained, projected) = arith_project(&mut tm, &mut model, &[x], &[lo, hi]).unwrap();
//! assert!(retained.is_empty());
//! assert!(!tm.occurs(x, projected));
//! ```
//!
//! # Quantified satisfiability
//!
//! ```
//! use quesat::{qsat_check, QsatResult, TermManager};
//! use num_bigint::BigInt;
//!
//! let mut tm = TermManager::new();
//! let x = tm.mk_var("x", tm.sorts.int_sort);
//! let y = tm.mk_var("y", tm.sorts.int_sort);
//! let gt = tm.mk_gt(y, x);
//! let inner = tm.mk_exists(vec![y], gt);
//! let fml = tm.mk_forall(vec![x], inner);
//! assert!(matches!(qsat_check(&mut tm, fml).unwrap(), QsatResult::Sat(_)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
pub mod error;
pub mod hoist;
pub mod model;
pub mod qe;
pub mod rewrite;
pub mod solver;
pub mod sort;

pub use ast::{Term, TermId, TermKind, TermManager};
pub use error::{QsatError, Result};
pub use hoist::{hoist, Prefix};
pub use model::{Model, Value};
pub use qe::arith::{arith_project, ArithProjector, ProjectStats};
pub use qe::epr::{epr_qe, EprResult, EprSolver, EprStats};
pub use qe::pred_abs::{PredAbs, PredAbsStats};
pub use qe::qsat::{qsat_check, QsatConfig, QsatResult, QsatSolver, QsatStats};
pub use rewrite::{LitRewriter, RewriteConfig};
pub use solver::{CancelFlag, GroundSolver, Oracle, SolverResult, SolverStats};
pub use sort::{Sort, SortId, Sorts};
