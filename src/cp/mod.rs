//! Finite-domain constraint programming layer.
//!
//! The call model is expressed against [`CpModel`] and handed to any
//! [`CpSolver`]. [`MilpSolver`] is the bundled implementation; it
//! linearizes the model and solves it with HiGHS.
//!
//! # Workflow
//! 1. Declare variables over explicit value sets with [`CpModel::new_int_var`]
//! 2. Post constraints, optionally guarded with `only_enforce_if`
//! 3. Set an objective with [`CpModel::minimize`]
//! 4. Call [`CpSolver::solve`] with a [`SolverConfig`] time budget
//! 5. Read values back through [`CpSolution::value`]

mod milp;
mod model;
mod solver;

pub use milp::MilpSolver;
pub use model::{
    BoolVar, Constraint, CpModel, Domain, IntVar, LinearConstraint, LinearExpr, LinearHandle,
    Literal, Relation,
};
pub use solver::{
    CpSolution, CpSolver, SolveStats, SolveStatus, SolverConfig, DEFAULT_TIME_LIMIT,
};
