//! Solution Mapper: turns raw slot values into a dated call table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::constraints::CallModel;
use crate::cp::{CpSolution, SolveStatus};
use crate::domain::{CallLevel, Surgeon, SurgeonId};
use crate::domains::UNASSIGNED;
use crate::error::SchedulingError;
use crate::objective::{ObjectiveBreakdown, ObjectiveTerms};

/// Surgeon name per slot type for one day; `None` marks an empty slot.
pub type DayAssignments = BTreeMap<CallLevel, Option<String>>;

/// A solved monthly call roster.
///
/// Serializes with ISO 8601 date keys and slot-type codes:
/// `{"days": {"2024-03-05": {"1A": "Ames 1", "1B": null, ...}}, "cost": 0, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSchedule {
    pub status: SolveStatus,
    pub cost: i64,
    pub breakdown: ObjectiveBreakdown,
    pub days: BTreeMap<NaiveDate, DayAssignments>,
}

impl CallSchedule {
    /// Name assigned to one slot, if filled.
    pub fn assigned(&self, date: NaiveDate, level: CallLevel) -> Option<&str> {
        self.days.get(&date)?.get(&level)?.as_deref()
    }

    /// Every filled slot as `(date, level, surgeon name)`, in date order.
    pub fn assignments(&self) -> impl Iterator<Item = (NaiveDate, CallLevel, &str)> + '_ {
        self.days.iter().flat_map(|(date, slots)| {
            slots
                .iter()
                .filter_map(move |(level, name)| name.as_deref().map(|name| (*date, *level, name)))
        })
    }

    /// Number of filled slots held by `name`.
    pub fn calls_for(&self, name: &str) -> usize {
        self.assignments().filter(|(_, _, n)| *n == name).count()
    }
}

/// Maps a solver result back to the caller-facing schedule.
///
/// Infeasible and timed-out solves are both [`SchedulingError::NoFeasibleSchedule`].
pub fn map_solution(
    call_model: &CallModel,
    terms: &ObjectiveTerms,
    surgeons: &[Surgeon],
    solution: &CpSolution,
) -> Result<CallSchedule, SchedulingError> {
    if !solution.is_solution_found() {
        return Err(SchedulingError::NoFeasibleSchedule);
    }
    let names: HashMap<SurgeonId, &str> = surgeons.iter().map(|s| (s.id, s.name.as_str())).collect();

    let mut days = BTreeMap::new();
    for day in 0..call_model.num_days() {
        let mut slots = DayAssignments::new();
        for level in CallLevel::ALL {
            let value = solution
                .value(call_model.slot(day, level))
                .ok_or(SchedulingError::NoFeasibleSchedule)?;
            let name = match value {
                UNASSIGNED => None,
                id => Some(
                    names
                        .get(&id)
                        .ok_or(SchedulingError::UnknownSurgeon(id))?
                        .to_string(),
                ),
            };
            slots.insert(level, name);
        }
        days.insert(call_model.period().date_of(day), slots);
    }

    Ok(CallSchedule {
        status: solution.status,
        cost: solution.objective_value().unwrap_or_default(),
        breakdown: terms.breakdown(solution).unwrap_or_default(),
        days,
    })
}
