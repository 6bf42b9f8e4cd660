//! MILP backend: linearizes a [`CpModel`] and solves it with HiGHS through
//! `good_lp`.
//!
//! A variable over an explicit value set becomes one binary per value with
//! the binaries summing to one, and indicators on it reuse those binaries.
//! Interval variables become bounded integer columns. Enforcement literals,
//! `!=`, and max/min equalities are written as big-M rows whose constants
//! come from the declared domains.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;

use good_lp::solvers::highs::highs;
use good_lp::*;
use tracing::{debug, warn};

use super::model::{Constraint, CpModel, IntVar, LinearConstraint, LinearExpr, Literal, Relation};
use super::solver::{CpSolution, CpSolver, SolveStats, SolveStatus, SolverConfig};

/// [`CpSolver`] backed by the HiGHS mixed-integer solver.
///
/// Stateless: every call builds and solves a fresh MILP.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpSolver;

impl MilpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for MilpSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();
        let mut linearizer = Linearizer::new(model);
        linearizer.post_constraints();

        let stats = |linearizer: &Linearizer| SolveStats {
            columns: linearizer.column_count,
            rows: linearizer.rows.len(),
            elapsed: started.elapsed(),
        };

        if linearizer.contradiction {
            debug!(model = model.name(), "contradiction while linearizing");
            let stats = stats(&linearizer);
            return CpSolution::unsolved(SolveStatus::Infeasible).with_stats(stats);
        }

        let objective = model
            .objective()
            .map(|objective| linearizer.linear(objective))
            .unwrap_or_default();
        let mut solve_stats = stats(&linearizer);

        let Linearizer {
            vars, columns, rows, ..
        } = linearizer;
        let mut problem = vars
            .minimise(objective.into_expression())
            .using(highs)
            .with_time_limit(config.time_limit.as_secs_f64());
        for (row, sense) in rows {
            problem.add_constraint(row.into_constraint(sense));
        }

        let solution = match problem.solve() {
            Ok(found) => {
                let values: Vec<i64> = columns.iter().map(|column| column.value(&found)).collect();
                let proven = matches!(found.status(), SolutionStatus::Optimal);
                if model.is_satisfied_by(&values) {
                    let status = if proven {
                        SolveStatus::Optimal
                    } else {
                        SolveStatus::Feasible
                    };
                    let objective_value = model.objective().map(|o| o.evaluate(&values));
                    CpSolution::new(status, values, objective_value)
                } else {
                    // Without an incumbent HiGHS still hands back a point.
                    if proven {
                        warn!(model = model.name(), "optimal MILP point violates the model");
                    }
                    CpSolution::unsolved(SolveStatus::Unknown)
                }
            }
            // Every column is bounded, so "unbounded" can only mean infeasible.
            Err(ResolutionError::Infeasible) | Err(ResolutionError::Unbounded) => {
                CpSolution::unsolved(SolveStatus::Infeasible)
            }
            Err(error) => {
                warn!(model = model.name(), %error, "MILP backend failed");
                CpSolution::unsolved(SolveStatus::Unknown)
            }
        };

        solve_stats.elapsed = started.elapsed();
        debug!(
            model = model.name(),
            status = ?solution.status,
            columns = solve_stats.columns,
            rows = solve_stats.rows,
            elapsed_ms = solve_stats.elapsed.as_millis() as u64,
            "MILP solve finished"
        );
        solution.with_stats(solve_stats)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sense {
    Le,
    Ge,
    Eq,
}

/// Affine combination of backend columns; rows read `affine <sense> 0`.
#[derive(Debug, Clone, Default)]
struct Affine {
    terms: Vec<(Variable, f64)>,
    constant: f64,
}

impl Affine {
    fn constant(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    fn of(var: Variable) -> Self {
        Self {
            terms: vec![(var, 1.0)],
            constant: 0.0,
        }
    }

    fn add(&mut self, other: &Affine, scale: f64) {
        if scale == 0.0 {
            return;
        }
        self.terms
            .extend(other.terms.iter().map(|&(var, coef)| (var, coef * scale)));
        self.constant += other.constant * scale;
    }

    fn plus(mut self, other: &Affine, scale: f64) -> Self {
        self.add(other, scale);
        self
    }

    fn shift(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    fn into_expression(self) -> Expression {
        self.terms
            .into_iter()
            .fold(Expression::from(self.constant), |acc, (var, coef)| acc + coef * var)
    }

    fn into_constraint(self, sense: Sense) -> good_lp::Constraint {
        let expr = self.into_expression();
        match sense {
            Sense::Le => expr.leq(0.0),
            Sense::Ge => expr.geq(0.0),
            Sense::Eq => expr.eq(0.0),
        }
    }
}

/// How one model variable is represented in the MILP.
#[derive(Debug, Clone)]
enum Column {
    Fixed(i64),
    Integer(Variable),
    OneHot(Vec<(i64, Variable)>),
}

impl Column {
    fn value(&self, solution: &impl Solution) -> i64 {
        match self {
            Column::Fixed(value) => *value,
            Column::Integer(var) => solution.value(*var).round() as i64,
            Column::OneHot(choices) => choices
                .iter()
                .max_by(|a, b| solution.value(a.1).total_cmp(&solution.value(b.1)))
                .map(|(value, _)| *value)
                .unwrap_or_default(),
        }
    }
}

struct Linearizer<'a> {
    model: &'a CpModel,
    vars: ProblemVariables,
    columns: Vec<Column>,
    aliased: HashSet<usize>,
    rows: Vec<(Affine, Sense)>,
    column_count: usize,
    contradiction: bool,
}

impl<'a> Linearizer<'a> {
    fn new(model: &'a CpModel) -> Self {
        let indicators: HashMap<usize, (IntVar, i64)> = model
            .constraints()
            .iter()
            .filter_map(|c| match c {
                Constraint::Indicator {
                    indicator,
                    var,
                    value,
                } => Some((indicator.var().index(), (*var, *value))),
                _ => None,
            })
            .collect();

        let mut linearizer = Linearizer {
            model,
            vars: variables!(),
            columns: Vec::with_capacity(model.variable_count()),
            aliased: HashSet::new(),
            rows: Vec::new(),
            column_count: 0,
            contradiction: false,
        };
        for var in model.variables() {
            let alias = indicators
                .get(&var.index())
                .and_then(|&(target, value)| linearizer.alias(target, value));
            let column = match alias {
                Some(column) => {
                    linearizer.aliased.insert(var.index());
                    column
                }
                None => linearizer.declare(var),
            };
            linearizer.columns.push(column);
        }
        linearizer
    }

    /// Column for `target == value` when `target` is already one-hot or fixed.
    fn alias(&self, target: IntVar, value: i64) -> Option<Column> {
        match self.columns.get(target.index())? {
            Column::Fixed(fixed) => Some(Column::Fixed(i64::from(*fixed == value))),
            Column::OneHot(choices) => Some(
                choices
                    .iter()
                    .find(|(v, _)| *v == value)
                    .map_or(Column::Fixed(0), |(_, y)| Column::Integer(*y)),
            ),
            Column::Integer(_) => None,
        }
    }

    fn declare(&mut self, var: IntVar) -> Column {
        let model = self.model;
        let domain = model.domain(var);
        let name = model.var_name(var);
        if domain.is_empty() {
            self.contradiction = true;
            return Column::Fixed(0);
        }
        if let Some(value) = domain.fixed_value() {
            return Column::Fixed(value);
        }
        if let Some(values) = domain.explicit_values() {
            let choices: Vec<(i64, Variable)> = values
                .iter()
                .map(|&value| {
                    let y = self.vars.add(variable().binary().name(format!("{}_{}", name, value)));
                    (value, y)
                })
                .collect();
            self.column_count += choices.len();
            let mut exactly_one = Affine::constant(-1.0);
            for (_, y) in &choices {
                exactly_one.add(&Affine::of(*y), 1.0);
            }
            self.push(exactly_one, Sense::Eq);
            return Column::OneHot(choices);
        }
        let (lo, hi) = (domain.min(), domain.max());
        let definition = if (lo, hi) == (0, 1) {
            variable().binary()
        } else {
            variable().integer().min(lo as f64).max(hi as f64)
        };
        self.column_count += 1;
        Column::Integer(self.vars.add(definition.name(name)))
    }

    fn binary(&mut self, name: String) -> Variable {
        self.column_count += 1;
        self.vars.add(variable().binary().name(name))
    }

    fn push(&mut self, row: Affine, sense: Sense) {
        if row.terms.is_empty() {
            let c = row.constant;
            let holds = match sense {
                Sense::Le => c <= 0.0,
                Sense::Ge => c >= 0.0,
                Sense::Eq => c == 0.0,
            };
            self.contradiction |= !holds;
            return;
        }
        self.rows.push((row, sense));
    }

    fn var_expr(&self, var: IntVar) -> Affine {
        match &self.columns[var.index()] {
            Column::Fixed(value) => Affine::constant(*value as f64),
            Column::Integer(column) => Affine::of(*column),
            Column::OneHot(choices) => Affine {
                terms: choices.iter().map(|&(value, y)| (y, value as f64)).collect(),
                constant: 0.0,
            },
        }
    }

    /// 0/1 expression of `var == value`, if `var` is not an interval column.
    fn equals(&self, var: IntVar, value: i64) -> Option<Affine> {
        match &self.columns[var.index()] {
            Column::Fixed(fixed) => Some(Affine::constant(if *fixed == value { 1.0 } else { 0.0 })),
            Column::OneHot(choices) => Some(
                choices
                    .iter()
                    .find(|(v, _)| *v == value)
                    .map_or(Affine::constant(0.0), |(_, y)| Affine::of(*y)),
            ),
            Column::Integer(_) => None,
        }
    }

    /// 0/1 expression of `expr == rhs` when `expr` is a single scaled variable.
    fn equality_flag(&self, expr: &LinearExpr, rhs: i64) -> Option<Affine> {
        let [(var, coef)] = expr.terms() else {
            return None;
        };
        let target = rhs - expr.offset();
        if target % coef != 0 {
            return self.equals(*var, 0).map(|_| Affine::constant(0.0));
        }
        self.equals(*var, target / coef)
    }

    fn linear(&self, expr: &LinearExpr) -> Affine {
        let mut affine = Affine::constant(expr.offset() as f64);
        for &(var, coef) in expr.terms() {
            affine.add(&self.var_expr(var), coef as f64);
        }
        affine
    }

    fn bounds(&self, expr: &LinearExpr) -> (i64, i64) {
        expr.terms()
            .iter()
            .fold((expr.offset(), expr.offset()), |(lo, hi), &(var, coef)| {
                let domain = self.model.domain(var);
                let (a, b) = (coef * domain.min(), coef * domain.max());
                (lo + a.min(b), hi + a.max(b))
            })
    }

    /// Number of enforcement literals that do not hold; zero when all do.
    fn slack(&self, literals: &[Literal]) -> Affine {
        let mut slack = Affine::default();
        for literal in literals {
            let b = self.var_expr(literal.var());
            if literal.true_value() == 1 {
                slack.add(&Affine::constant(1.0).plus(&b, -1.0), 1.0);
            } else {
                slack.add(&b, 1.0);
            }
        }
        slack
    }

    fn post_constraints(&mut self) {
        let model = self.model;
        for constraint in model.constraints() {
            if self.contradiction {
                return;
            }
            match constraint {
                Constraint::Linear(c) => self.post_linear(c),
                Constraint::Indicator {
                    indicator,
                    var,
                    value,
                } => {
                    if self.aliased.contains(&indicator.var().index()) {
                        continue;
                    }
                    let expr = LinearExpr::from(*var);
                    let b = self.var_expr(indicator.var());
                    let unless_set = Affine::constant(1.0).plus(&b, -1.0);
                    self.upper(&expr, *value, &unless_set);
                    self.lower(&expr, *value, &unless_set);
                    self.not_equal(&expr, *value, &b);
                }
                Constraint::AllDifferent(vars) => self.post_all_different(vars),
                Constraint::MaxEquality { target, vars } => self.post_extremum(*target, vars, true),
                Constraint::MinEquality { target, vars } => self.post_extremum(*target, vars, false),
            }
        }
    }

    fn post_linear(&mut self, c: &LinearConstraint) {
        let slack = self.slack(&c.enforcement);
        match c.relation {
            Relation::Le => self.upper(&c.expr, c.rhs, &slack),
            Relation::Ge => self.lower(&c.expr, c.rhs, &slack),
            Relation::Eq => match self.equality_flag(&c.expr, c.rhs) {
                // flag >= 1 - slack
                Some(flag) => self.push(flag.plus(&slack, 1.0).shift(-1.0), Sense::Ge),
                None => {
                    self.upper(&c.expr, c.rhs, &slack);
                    self.lower(&c.expr, c.rhs, &slack);
                }
            },
            Relation::Ne => match self.equality_flag(&c.expr, c.rhs) {
                // flag <= slack
                Some(flag) => self.push(flag.plus(&slack, -1.0), Sense::Le),
                None => self.not_equal(&c.expr, c.rhs, &slack),
            },
        }
    }

    /// `expr <= rhs` whenever `slack` is zero.
    fn upper(&mut self, expr: &LinearExpr, rhs: i64, slack: &Affine) {
        let (_, hi) = self.bounds(expr);
        if hi <= rhs {
            return;
        }
        let big_m = (hi - rhs) as f64;
        let row = self.linear(expr).shift(-(rhs as f64)).plus(slack, -big_m);
        self.push(row, Sense::Le);
    }

    /// `expr >= rhs` whenever `slack` is zero.
    fn lower(&mut self, expr: &LinearExpr, rhs: i64, slack: &Affine) {
        let (lo, _) = self.bounds(expr);
        if lo >= rhs {
            return;
        }
        let big_m = (rhs - lo) as f64;
        let row = self.linear(expr).shift(-(rhs as f64)).plus(slack, big_m);
        self.push(row, Sense::Ge);
    }

    /// `expr != rhs` whenever `slack` is zero, split by an auxiliary binary
    /// into `expr <= rhs - 1` or `expr >= rhs + 1`.
    fn not_equal(&mut self, expr: &LinearExpr, rhs: i64, slack: &Affine) {
        let (lo, hi) = self.bounds(expr);
        if hi < rhs || lo > rhs {
            return;
        }
        let above = Affine::of(self.binary(format!("ne_{}", self.column_count)));
        let below_m = (hi - rhs + 1) as f64;
        let above_m = (rhs + 1 - lo) as f64;
        let value = self.linear(expr);

        let below_row = value
            .clone()
            .shift(-((rhs - 1) as f64))
            .plus(&above, -below_m)
            .plus(slack, -below_m);
        self.push(below_row, Sense::Le);

        let above_row = value
            .shift(-((rhs + 1) as f64) + above_m)
            .plus(&above, -above_m)
            .plus(slack, above_m);
        self.push(above_row, Sense::Ge);
    }

    fn post_all_different(&mut self, vars: &[IntVar]) {
        let mut candidates = BTreeSet::new();
        for var in vars {
            match &self.columns[var.index()] {
                Column::Fixed(value) => {
                    candidates.insert(*value);
                }
                Column::OneHot(choices) => candidates.extend(choices.iter().map(|(v, _)| *v)),
                Column::Integer(_) => {
                    self.post_pairwise_different(vars);
                    return;
                }
            }
        }
        for value in candidates {
            let mut taken = Affine::constant(-1.0);
            for var in vars {
                if let Some(flag) = self.equals(*var, value) {
                    taken.add(&flag, 1.0);
                }
            }
            self.push(taken, Sense::Le);
        }
    }

    fn post_pairwise_different(&mut self, vars: &[IntVar]) {
        for (i, &first) in vars.iter().enumerate() {
            for &second in &vars[i + 1..] {
                let diff = LinearExpr::new().term(first, 1).term(second, -1);
                self.not_equal(&diff, 0, &Affine::default());
            }
        }
    }

    /// `target == max(vars)` (or `min` when `is_max` is false), exactly:
    /// one selector binary picks the variable the target must equal.
    fn post_extremum(&mut self, target: IntVar, vars: &[IntVar], is_max: bool) {
        if vars.is_empty() {
            self.contradiction = true;
            return;
        }
        let model = self.model;
        let target_domain = model.domain(target);
        let (target_lo, target_hi) = (target_domain.min(), target_domain.max());
        let t = self.var_expr(target);
        let bound_sense = if is_max { Sense::Ge } else { Sense::Le };

        if let [only] = vars {
            let row = t.plus(&self.var_expr(*only), -1.0);
            self.push(row, Sense::Eq);
            return;
        }

        let mut exactly_one = Affine::constant(-1.0);
        for &var in vars {
            let x = self.var_expr(var);
            let diff = t.clone().plus(&x, -1.0);
            self.push(diff.clone(), bound_sense);

            let selected = Affine::of(self.binary(format!("pick_{}", self.column_count)));
            exactly_one.add(&selected, 1.0);
            let unselected = Affine::constant(1.0).plus(&selected, -1.0);
            let domain = model.domain(var);
            if is_max {
                let big_m = (target_hi - domain.min()).max(0) as f64;
                self.push(diff.plus(&unselected, -big_m), Sense::Le);
            } else {
                let big_m = (domain.max() - target_lo).max(0) as f64;
                self.push(diff.plus(&unselected, big_m), Sense::Ge);
            }
        }
        self.push(exactly_one, Sense::Eq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::Domain;
    use std::time::Duration;

    fn config() -> SolverConfig {
        SolverConfig::with_time_limit(Duration::from_secs(5))
    }

    #[test]
    fn test_value_set_variable_takes_a_member() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::from_values([1, 3, 5]), "x");
        model.minimize(LinearExpr::new().term(x, -1));

        let solution = MilpSolver::new().solve(&model, &config());
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.value(x), Some(5));
        assert_eq!(solution.objective_value(), Some(-5));
        assert_eq!(solution.stats.columns, 3);
    }

    #[test]
    fn test_indicator_shares_the_value_binary() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::from_values([1, 2, 3]), "x");
        let b = model.new_indicator(x, 2, "x_is_2");
        model.add_linear(b, Relation::Eq, 1);

        let solution = MilpSolver::new().solve(&model, &config());
        assert!(solution.is_solution_found());
        assert_eq!(solution.value(x), Some(2));
        assert_eq!(solution.bool_value(b), Some(true));
        assert_eq!(solution.stats.columns, 3);
    }

    #[test]
    fn test_indicator_on_interval_variable() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::interval(0, 4), "x");
        let b = model.new_indicator(x, 2, "x_is_2");
        model.add_linear(x, Relation::Ge, 2);
        model.add_linear(b, Relation::Eq, 0);
        model.minimize(LinearExpr::from(x));

        let solution = MilpSolver::new().solve(&model, &config());
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.value(x), Some(3));
    }

    #[test]
    fn test_enforcement_literal_guards_the_row() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::interval(0, 10), "x");
        let b = model.new_bool_var("b");
        model.add_linear(x, Relation::Le, 3).only_enforce_if([Literal::from(b)]);
        model.minimize(LinearExpr::new().term(x, -1).term(b.var(), -5));

        let solution = MilpSolver::new().solve(&model, &config());
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.bool_value(b), Some(false));
        assert_eq!(solution.objective_value(), Some(-10));
    }

    #[test]
    fn test_all_different_pigeonhole_is_infeasible() {
        let mut model = CpModel::new("t");
        let vars: Vec<IntVar> = (0..3)
            .map(|i| model.new_int_var(Domain::from_values([1, 2]), format!("v{}", i)))
            .collect();
        model.add_all_different(vars);
        assert_eq!(MilpSolver::new().solve(&model, &config()).status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_all_different_over_intervals() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::interval(0, 3), "x");
        let y = model.new_int_var(Domain::interval(0, 3), "y");
        model.add_all_different(vec![x, y]);
        model.minimize(LinearExpr::sum([x, y]));

        let solution = MilpSolver::new().solve(&model, &config());
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective_value(), Some(1));
    }

    #[test]
    fn test_max_and_min_equalities_are_exact() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::interval(0, 5), "x");
        let y = model.new_int_var(Domain::interval(0, 5), "y");
        let hi = model.new_int_var(Domain::interval(0, 5), "hi");
        let lo = model.new_int_var(Domain::interval(0, 5), "lo");
        model.add_linear(x, Relation::Eq, 2);
        model.add_linear(y, Relation::Eq, 4);
        model.add_max_equality(hi, vec![x, y]);
        model.add_min_equality(lo, vec![x, y]);
        // Pulls hi down and lo up; exactness keeps them at 4 and 2.
        model.minimize(LinearExpr::new().term(hi, 1).term(lo, -1));

        let solution = MilpSolver::new().solve(&model, &config());
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.value(hi), Some(4));
        assert_eq!(solution.value(lo), Some(2));
    }

    #[test]
    fn test_fixed_contradiction_skips_the_backend() {
        let mut model = CpModel::new("t");
        let a = model.new_constant(1, "a");
        let b = model.new_constant(1, "b");
        model.add_all_different(vec![a, b]);

        let solution = MilpSolver::new().solve(&model, &config());
        assert_eq!(solution.status, SolveStatus::Infeasible);
        assert_eq!(solution.stats.columns, 0);
    }

    #[test]
    fn test_guarded_not_equal_on_value_set() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(Domain::from_values([-1, 4, 5]), "x");
        let on = model.new_bool_var("on");
        model.add_linear(on, Relation::Eq, 1);
        model.add_linear(x, Relation::Ne, -1).only_enforce_if([Literal::from(on)]);
        model.add_linear(x, Relation::Ne, 4).only_enforce_if([Literal::from(on)]);

        let solution = MilpSolver::new().solve(&model, &config());
        assert!(solution.is_solution_found());
        assert_eq!(solution.value(x), Some(5));
    }
}
