//! Error taxonomy for schedule generation.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::SurgeonId;

/// Errors raised while validating input or generating a call schedule.
///
/// Everything except [`SchedulingError::NoFeasibleSchedule`] is malformed
/// input and is reported before a constraint model is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    #[error("invalid scheduling period: {0}")]
    InvalidPeriod(String),

    #[error("the roster has no surgeons")]
    EmptyRoster,

    #[error("surgeon id {0} is negative")]
    InvalidSurgeonId(SurgeonId),

    #[error("duplicate surgeon id {0}")]
    DuplicateSurgeon(SurgeonId),

    #[error("unknown surgeon id {0}")]
    UnknownSurgeon(SurgeonId),

    #[error("unknown call level code {0:?}")]
    UnknownCallLevel(String),

    #[error("availability range for surgeon {surgeon_id} starts on {start} after it ends on {end}")]
    InvalidDateRange {
        surgeon_id: SurgeonId,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// The solver proved infeasibility or ran out of time without a solution.
    #[error("no feasible schedule was found")]
    NoFeasibleSchedule,
}

impl SchedulingError {
    /// Returns true for errors caused by the caller's input rather than by the solve.
    pub fn is_malformed_input(&self) -> bool {
        !matches!(self, SchedulingError::NoFeasibleSchedule)
    }
}
