//! Input validation for call problems.
//!
//! Runs before any model is built and rejects:
//! - Empty periods
//! - Empty rosters
//! - Negative or duplicate surgeon ids
//! - Availability requests for surgeons missing from the roster

use std::collections::HashSet;

use crate::domain::CallProblem;
use crate::error::SchedulingError;

/// Checks structural integrity of a problem, returning the first defect.
pub fn validate_problem(problem: &CallProblem) -> Result<(), SchedulingError> {
    if problem.period.num_days == 0 {
        return Err(SchedulingError::InvalidPeriod(format!(
            "period starting {} has no days",
            problem.period.start
        )));
    }
    if problem.surgeons.is_empty() {
        return Err(SchedulingError::EmptyRoster);
    }

    let mut ids = HashSet::new();
    for surgeon in &problem.surgeons {
        if surgeon.id < 0 {
            return Err(SchedulingError::InvalidSurgeonId(surgeon.id));
        }
        if !ids.insert(surgeon.id) {
            return Err(SchedulingError::DuplicateSurgeon(surgeon.id));
        }
    }

    if let Some(request) = problem
        .availability
        .iter()
        .find(|r| !ids.contains(&r.surgeon_id))
    {
        return Err(SchedulingError::UnknownSurgeon(request.surgeon_id));
    }

    Ok(())
}
