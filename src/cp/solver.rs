//! Solver contract: configuration, status, and solution values.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::model::{BoolVar, CpModel, IntVar};

/// Default wall-clock budget for one solve: 30 seconds.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(30);

/// Solver termination settings.
///
/// The time limit is the only stopping rule. A solve that proves optimality
/// inside the budget returns the same assignment on every run; one that is
/// cut off returns the incumbent at that moment, which depends on machine
/// speed and load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    /// Search stops after this duration; the best solution so far is kept.
    pub time_limit: Duration,
}

impl SolverConfig {
    pub fn with_time_limit(time_limit: Duration) -> Self {
        Self { time_limit }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}

/// Terminal status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// Best possible objective proven.
    Optimal,
    /// A solution was found but the budget expired before proving optimality.
    Feasible,
    /// Proven that no assignment satisfies the hard constraints.
    Infeasible,
    /// Budget expired before any solution was found.
    Unknown,
}

impl SolveStatus {
    pub fn is_solution_found(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// Size of the problem handed to the backend and the time it took.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveStats {
    /// Backend decision columns, auxiliary binaries included.
    pub columns: usize,
    /// Backend rows after dropping constant ones.
    pub rows: usize,
    pub elapsed: Duration,
}

/// Result of a solve: status plus, on success, one value per variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpSolution {
    pub status: SolveStatus,
    values: Vec<i64>,
    objective_value: Option<i64>,
    pub stats: SolveStats,
}

impl CpSolution {
    pub fn new(status: SolveStatus, values: Vec<i64>, objective_value: Option<i64>) -> Self {
        Self {
            status,
            values,
            objective_value,
            stats: SolveStats::default(),
        }
    }

    /// A solution with no values, for infeasible or timed-out solves.
    pub fn unsolved(status: SolveStatus) -> Self {
        Self::new(status, Vec::new(), None)
    }

    pub fn with_stats(mut self, stats: SolveStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn is_solution_found(&self) -> bool {
        self.status.is_solution_found()
    }

    pub fn value(&self, var: IntVar) -> Option<i64> {
        self.values.get(var.index()).copied()
    }

    pub fn bool_value(&self, b: BoolVar) -> Option<bool> {
        self.value(b.var()).map(|v| v == 1)
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn objective_value(&self) -> Option<i64> {
        self.objective_value
    }
}

/// A finite-domain constraint solver.
///
/// The objective is minimized; a model without one stops at its first
/// feasible assignment and reports it as optimal.
///
/// Implementations must not keep state between calls: each `solve` is an
/// independent unit of work bounded by `config.time_limit`.
pub trait CpSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::Domain;

    #[test]
    fn test_default_budget_is_thirty_seconds() {
        assert_eq!(SolverConfig::default().time_limit, Duration::from_secs(30));
    }

    #[test]
    fn test_status_solution_found() {
        assert!(SolveStatus::Optimal.is_solution_found());
        assert!(SolveStatus::Feasible.is_solution_found());
        assert!(!SolveStatus::Infeasible.is_solution_found());
        assert!(!SolveStatus::Unknown.is_solution_found());
    }

    #[test]
    fn test_solution_value_lookup() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::interval(0, 9), "x");
        let b = model.new_bool_var("b");
        let solution = CpSolution::new(SolveStatus::Optimal, vec![7, 1], Some(7));
        assert_eq!(solution.value(x), Some(7));
        assert_eq!(solution.bool_value(b), Some(true));
        assert_eq!(solution.objective_value(), Some(7));

        let unsolved = CpSolution::unsolved(SolveStatus::Unknown);
        assert_eq!(unsolved.value(x), None);
        assert!(!unsolved.is_solution_found());
    }
}
