//! Objective Assembler: counting variables and the weighted cost.
//!
//! ```text
//! fairness_weight    * spread
//! + gamma_balance      * deviation_sum
//! + gamma_no_call      * penalty_no_call
//! + gamma_unavail_prev * penalty_unavail_prev
//! - gamma_1B           * total_1B
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constraints::CallModel;
use crate::cp::{BoolVar, CpSolution, Domain, IntVar, LinearExpr};
use crate::domain::{CallLevel, CallProblem, SurgeonId};

/// Realized value of each objective term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveBreakdown {
    pub spread: i64,
    pub deviation_sum: i64,
    #[serde(rename = "total1B")]
    pub total_1b: i64,
    pub penalty_no_call: i64,
    pub penalty_unavail_prev: i64,
}

/// Auxiliary variables created by [`assemble`].
#[derive(Debug, Clone)]
pub struct ObjectiveTerms {
    /// Per-surgeon call totals, in roster order.
    pub totals: Vec<(SurgeonId, IntVar)>,
    pub max_total: IntVar,
    pub min_total: IntVar,
    pub spread: IntVar,
    pub deviation_sum: IntVar,
    pub total_1b: IntVar,
    pub penalty_no_call: IntVar,
    pub penalty_unavail_prev: IntVar,
    pub cost: LinearExpr,
}

impl ObjectiveTerms {
    /// Reads every term back from a solved assignment.
    pub fn breakdown(&self, solution: &CpSolution) -> Option<ObjectiveBreakdown> {
        Some(ObjectiveBreakdown {
            spread: solution.value(self.spread)?,
            deviation_sum: solution.value(self.deviation_sum)?,
            total_1b: solution.value(self.total_1b)?,
            penalty_no_call: solution.value(self.penalty_no_call)?,
            penalty_unavail_prev: solution.value(self.penalty_unavail_prev)?,
        })
    }

    pub fn total(&self, surgeon: SurgeonId) -> Option<IntVar> {
        self.totals
            .iter()
            .find(|(id, _)| *id == surgeon)
            .map(|(_, var)| *var)
    }
}

/// Builds the counting variables and sets the model's objective.
pub fn assemble(call_model: &mut CallModel, problem: &CallProblem) -> ObjectiveTerms {
    let num_days = call_model.num_days() as i64;
    let n = problem.surgeons.len() as i64;
    let weights = problem.config.weights;

    // total[s]; same-day exclusivity bounds it by the number of days.
    let totals: Vec<(SurgeonId, IntVar)> = problem
        .surgeons
        .iter()
        .map(|surgeon| {
            let calls = call_model.surgeon_indicators(surgeon.id);
            let name = format!("total_{}", surgeon.id);
            let model = call_model.model_mut();
            let total = if calls.is_empty() {
                model.new_constant(0, name)
            } else {
                let total = model.new_int_var(Domain::interval(0, num_days), name);
                model.add_equality(total, LinearExpr::sum(calls.into_iter().map(BoolVar::var)));
                total
            };
            (surgeon.id, total)
        })
        .collect();
    let total_vars: Vec<IntVar> = totals.iter().map(|(_, var)| *var).collect();

    let (max_total, min_total, spread) = {
        let model = call_model.model_mut();
        let max_total = model.new_int_var(Domain::interval(0, num_days), "max_total");
        let min_total = model.new_int_var(Domain::interval(0, num_days), "min_total");
        model.add_max_equality(max_total, total_vars.clone());
        model.add_min_equality(min_total, total_vars.clone());
        let spread = model.new_int_var(Domain::interval(0, num_days), "spread");
        model.add_equality(spread, LinearExpr::new().term(max_total, 1).term(min_total, -1));
        (max_total, min_total, spread)
    };

    let deviation_sum = assemble_deviation(call_model, &total_vars, n, num_days);
    let total_1b = assemble_total_1b(call_model);
    let soft_no_call = call_model.soft_no_call().to_vec();
    let penalty_no_call = count(call_model, soft_no_call, "penalty_no_call");
    let before_absence = calls_before_absence(call_model, problem);
    let penalty_unavail_prev = count(call_model, before_absence, "penalty_unavail_prev");

    let cost = LinearExpr::new()
        .term(spread, i64::from(weights.fairness_weight))
        .term(deviation_sum, i64::from(weights.gamma_balance))
        .term(penalty_no_call, i64::from(weights.gamma_no_call))
        .term(penalty_unavail_prev, i64::from(weights.gamma_unavail_prev))
        .term(total_1b, -i64::from(weights.gamma_1b));
    call_model.model_mut().minimize(cost.clone());

    debug!(
        surgeons = n,
        variables = call_model.model().variable_count(),
        constraints = call_model.model().constraint_count(),
        "objective assembled"
    );

    ObjectiveTerms {
        totals,
        max_total,
        min_total,
        spread,
        deviation_sum,
        total_1b,
        penalty_no_call,
        penalty_unavail_prev,
        cost,
    }
}

/// `sum_s |n * total[s] - sum(total)|`, linearized through `max(diff, -diff)`.
fn assemble_deviation(call_model: &mut CallModel, totals: &[IntVar], n: i64, num_days: i64) -> IntVar {
    let model = call_model.model_mut();
    let bound = n * n * num_days;
    let mut deviations = Vec::with_capacity(totals.len());
    for (i, &total) in totals.iter().enumerate() {
        let mut diff_expr = LinearExpr::new();
        for &other in totals {
            diff_expr.add_term(other, if other == total { n - 1 } else { -1 });
        }
        let diff = model.new_int_var(Domain::interval(-bound, bound), format!("diff_{}", i));
        model.add_equality(diff, diff_expr);
        let neg = model.new_int_var(Domain::interval(-bound, bound), format!("neg_diff_{}", i));
        model.add_equality(neg, LinearExpr::new().term(diff, -1));
        let dev = model.new_int_var(Domain::interval(0, bound), format!("dev_{}", i));
        model.add_max_equality(dev, vec![diff, neg]);
        deviations.push(dev);
    }
    let deviation_sum = model.new_int_var(Domain::interval(0, bound * n), "deviation_sum");
    model.add_equality(deviation_sum, LinearExpr::sum(deviations));
    deviation_sum
}

/// Days on which the optional 1B slot is filled.
fn assemble_total_1b(call_model: &mut CallModel) -> IntVar {
    let num_days = call_model.num_days();
    let vacancies: Vec<BoolVar> = (0..num_days)
        .filter_map(|day| call_model.vacancy(day, CallLevel::Level1B))
        .collect();
    let model = call_model.model_mut();
    if vacancies.is_empty() {
        return model.new_constant(0, "total_1B");
    }
    let total_1b = model.new_int_var(Domain::interval(0, num_days as i64), "total_1B");
    let mut filled = LinearExpr::constant(vacancies.len() as i64);
    for vacant in vacancies {
        filled.add_term(vacant.var(), -1);
    }
    model.add_equality(total_1b, filled);
    total_1b
}

/// Indicators of surgeons on call the day before one of their UNAVAILABLE days.
fn calls_before_absence(call_model: &CallModel, problem: &CallProblem) -> Vec<BoolVar> {
    let mut flagged = Vec::new();
    for day in 0..call_model.num_days() {
        let Some(next) = call_model.period().date_of(day).succ_opt() else {
            continue;
        };
        for surgeon in &problem.surgeons {
            if call_model.is_unavailable(surgeon.id, next) {
                flagged.extend(call_model.day_indicators(day, surgeon.id));
            }
        }
    }
    flagged
}

fn count(call_model: &mut CallModel, flags: Vec<BoolVar>, name: &str) -> IntVar {
    let model = call_model.model_mut();
    if flags.is_empty() {
        return model.new_constant(0, name);
    }
    let counter = model.new_int_var(Domain::interval(0, flags.len() as i64), name);
    model.add_equality(counter, LinearExpr::sum(flags.into_iter().map(BoolVar::var)));
    counter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::build;
    use crate::cp::{CpSolver, MilpSolver, SolveStatus};
    use crate::domain::{AvailabilityRequest, ObjectiveWeights, SchedulingConfig, Surgeon};
    use crate::domains::SlotDomains;
    use crate::testing::{march, period, quick, staffed_roster};
    use CallLevel::*;

    fn assembled(problem: &CallProblem) -> (CallModel, ObjectiveTerms) {
        let mut call_model = build(problem, SlotDomains::build(&problem.surgeons));
        let terms = assemble(&mut call_model, problem);
        (call_model, terms)
    }

    #[test]
    fn test_objective_is_set_with_signed_weights() {
        let problem = CallProblem::new(period(3), staffed_roster());
        let (call_model, terms) = assembled(&problem);
        let objective = call_model.model().objective().unwrap();
        assert_eq!(objective, &terms.cost);
        assert!(objective.terms().contains(&(terms.spread, 1000)));
        assert!(objective.terms().contains(&(terms.deviation_sum, 100)));
        assert!(objective.terms().contains(&(terms.total_1b, -1)));
        assert_eq!(terms.totals.len(), 12);
    }

    #[test]
    fn test_zero_weights_drop_terms() {
        let config = SchedulingConfig {
            weights: ObjectiveWeights {
                gamma_1b: 0,
                gamma_no_call: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let problem = CallProblem::new(period(3), staffed_roster()).with_config(config);
        let (_, terms) = assembled(&problem);
        assert_eq!(terms.cost.terms().len(), 3);
    }

    #[test]
    fn test_absent_terms_are_constant_zero() {
        let problem = CallProblem::new(period(3), staffed_roster());
        let (call_model, terms) = assembled(&problem);
        let model = call_model.model();
        assert_eq!(model.domain(terms.total_1b).fixed_value(), Some(0));
        assert_eq!(model.domain(terms.penalty_no_call).fixed_value(), Some(0));
        assert_eq!(model.domain(terms.penalty_unavail_prev).fixed_value(), Some(0));
    }

    #[test]
    fn test_balanced_roster_reaches_zero_cost() {
        let problem = CallProblem::new(period(3), staffed_roster());
        let (call_model, terms) = assembled(&problem);
        let solution = MilpSolver::new().solve(call_model.model(), &quick());

        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective_value(), Some(0));
        let breakdown = terms.breakdown(&solution).unwrap();
        assert_eq!(breakdown, ObjectiveBreakdown::default());
        for (_, total) in &terms.totals {
            assert_eq!(solution.value(*total), Some(1));
        }
    }

    #[test]
    fn test_filled_1b_is_rewarded() {
        // Two 1A/1B surgeons over one day: filling 1B earns -gamma_1B but
        // both surgeons then work, keeping spread at zero.
        let roster = vec![
            Surgeon::new(1, "A").with_qualifications([Level1A, Level1B]),
            Surgeon::new(2, "B").with_qualifications([Level1A, Level1B]),
        ];
        let problem = CallProblem::new(period(1), roster);
        let (call_model, terms) = assembled(&problem);
        let solution = MilpSolver::new().solve(call_model.model(), &quick());

        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.value(terms.total_1b), Some(1));
        assert_eq!(solution.objective_value(), Some(-1));
    }

    #[test]
    fn test_call_before_absence_is_penalized() {
        // Surgeon 1 is the only 1A-qualified surgeon on day 1 and is away on day 2.
        let roster = vec![
            Surgeon::new(1, "A").with_qualifications([Level1A]),
            Surgeon::new(2, "B").with_qualifications([Level3]),
        ];
        let problem = CallProblem::new(period(1), roster)
            .with_availability(vec![AvailabilityRequest::unavailable(1, march(2))]);
        let (call_model, terms) = assembled(&problem);
        let solution = MilpSolver::new().solve(call_model.model(), &quick());

        assert_eq!(solution.status, SolveStatus::Optimal);
        let breakdown = terms.breakdown(&solution).unwrap();
        assert_eq!(breakdown.penalty_unavail_prev, 1);
        assert_eq!(breakdown.spread, 0);
        assert_eq!(solution.objective_value(), Some(5));
    }

    #[test]
    fn test_soft_no_call_is_counted() {
        let roster = vec![
            Surgeon::new(1, "A").with_qualifications([Level1A]),
            Surgeon::new(2, "B").with_qualifications([Level3]),
        ];
        let config = SchedulingConfig {
            no_call_hard: false,
            ..Default::default()
        };
        let problem = CallProblem::new(period(1), roster)
            .with_config(config)
            .with_availability(vec![AvailabilityRequest::no_call(1, march(1))]);
        let (call_model, terms) = assembled(&problem);
        let solution = MilpSolver::new().solve(call_model.model(), &quick());

        assert!(solution.is_solution_found());
        assert_eq!(solution.value(terms.penalty_no_call), Some(1));
        assert_eq!(solution.objective_value(), Some(10));
    }

    #[test]
    fn test_spread_and_deviation_for_uneven_roster() {
        // A third surgeon with no qualifications always has zero calls.
        let roster = vec![
            Surgeon::new(1, "A").with_qualifications([Level1A]),
            Surgeon::new(2, "B").with_qualifications([Level3]),
            Surgeon::new(3, "C"),
        ];
        let problem = CallProblem::new(period(1), roster);
        let (call_model, terms) = assembled(&problem);
        let solution = MilpSolver::new().solve(call_model.model(), &quick());

        let breakdown = terms.breakdown(&solution).unwrap();
        // Totals 1, 1, 0 with mean 2/3: |3-2| + |3-2| + |0-2| = 4.
        assert_eq!(breakdown.spread, 1);
        assert_eq!(breakdown.deviation_sum, 4);
        assert_eq!(solution.objective_value(), Some(1000 + 400));
        assert_eq!(call_model.model().domain(terms.total(3).unwrap()).fixed_value(), Some(0));
    }
}
