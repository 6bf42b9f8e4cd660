//! DTOs for REST API requests/responses.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{
    group_dates, sort_roster, AvailabilityKind, AvailabilityRange, CallLevel, CallProblem,
    ObjectiveWeights, QuotaConfig, SchedulePeriod, SchedulingConfig, Surgeon, SurgeonId,
};
use crate::error::SchedulingError;
use crate::solution::CallSchedule;
use crate::solver::{JobStatus, SolveJob};
use crate::stats::CallStatsRow;

/// A roster entry; qualifications are a comma-separated list of level codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurgeonDto {
    pub id: SurgeonId,
    pub name: String,
    #[serde(default)]
    pub call_levels: String,
}

impl From<&Surgeon> for SurgeonDto {
    fn from(s: &Surgeon) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            call_levels: s
                .qualifications
                .iter()
                .map(|level| level.code())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl SurgeonDto {
    pub fn to_surgeon(&self) -> Result<Surgeon, SchedulingError> {
        let levels = CallLevel::parse_list(&self.call_levels)?;
        Ok(Surgeon::new(self.id, self.name.clone()).with_qualifications(levels))
    }
}

fn default_no_call_hard() -> bool {
    true
}

/// One month's scheduling request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequestDto {
    pub year: i32,
    pub month: u32,
    pub surgeons: Vec<SurgeonDto>,
    #[serde(default)]
    pub availability: Vec<AvailabilityRange>,
    #[serde(default)]
    pub max_calls: QuotaConfig,
    #[serde(default)]
    pub weights: ObjectiveWeights,
    #[serde(default = "default_no_call_hard")]
    pub no_call_hard: bool,
}

impl ScheduleRequestDto {
    /// Builds the domain problem, expanding availability ranges into days.
    ///
    /// Structural checks on the roster are left to validation.
    pub fn to_problem(&self) -> Result<CallProblem, SchedulingError> {
        let period = SchedulePeriod::month(self.year, self.month)?;
        let surgeons = self
            .surgeons
            .iter()
            .map(SurgeonDto::to_surgeon)
            .collect::<Result<Vec<_>, _>>()?;

        let mut availability = Vec::new();
        for range in &self.availability {
            availability.extend(range.expand()?);
        }

        let config = SchedulingConfig {
            max_calls: self.max_calls.clone(),
            weights: self.weights,
            no_call_hard: self.no_call_hard,
        };
        Ok(CallProblem::new(period, surgeons)
            .with_availability(availability)
            .with_config(config))
    }

    /// Converts a problem back to the request format.
    ///
    /// The roster comes out in seniority order and availability is
    /// collapsed into consecutive ranges.
    pub fn from_problem(problem: &CallProblem) -> Self {
        let mut roster = problem.surgeons.clone();
        sort_roster(&mut roster);

        let mut dates: BTreeMap<(SurgeonId, AvailabilityKind), Vec<_>> = BTreeMap::new();
        for request in &problem.availability {
            dates
                .entry((request.surgeon_id, request.kind))
                .or_default()
                .push(request.date);
        }
        let availability = dates
            .into_iter()
            .flat_map(|((surgeon_id, kind), dates)| {
                group_dates(dates).into_iter().map(move |range| AvailabilityRange {
                    surgeon_id,
                    kind,
                    start: range.start,
                    end: range.end,
                })
            })
            .collect();

        let start = problem.period.start;
        Self {
            year: start.year(),
            month: start.month(),
            surgeons: roster.iter().map(SurgeonDto::from).collect(),
            availability,
            max_calls: problem.config.max_calls.clone(),
            weights: problem.config.weights,
            no_call_hard: problem.config.no_call_hard,
        }
    }
}

/// A job's status and, once solved, its schedule.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleJobDto {
    pub id: String,
    pub status: JobStatus,
    pub schedule: Option<CallSchedule>,
}

impl From<&SolveJob> for ScheduleJobDto {
    fn from(job: &SolveJob) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status,
            schedule: job.schedule.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub solver_engine: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub cost: Option<i64>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsRequest {
    pub schedules: Vec<CallSchedule>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub rows: Vec<CallStatsRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_data::{generate, DemoData};
    use crate::domain::AvailabilityRequest;
    use chrono::NaiveDate;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn test_request_parses_with_defaults() {
        let json = r#"{
            "year": 2024,
            "month": 3,
            "surgeons": [
                {"id": 1, "name": "Ames", "callLevels": "1A, 1B"},
                {"id": 2, "name": "Baker", "callLevels": "2A"}
            ],
            "availability": [
                {"surgeonId": 2, "kind": "no_call", "start": "2024-03-30", "end": "2024-04-02"}
            ]
        }"#;
        let dto: ScheduleRequestDto = serde_json::from_str(json).unwrap();
        let problem = dto.to_problem().unwrap();

        assert_eq!(problem.num_days(), 31);
        assert_eq!(problem.config, SchedulingConfig::default());
        assert!(problem.surgeons[0].is_qualified(CallLevel::Level1B));
        assert_eq!(problem.availability.len(), 4);
        assert_eq!(
            problem.availability[3],
            AvailabilityRequest::no_call(2, date(4, 2))
        );
    }

    #[test]
    fn test_unknown_level_code_is_rejected() {
        let dto = SurgeonDto {
            id: 1,
            name: "Ames".to_string(),
            call_levels: "1A,5".to_string(),
        };
        assert_eq!(
            dto.to_surgeon(),
            Err(SchedulingError::UnknownCallLevel("5".to_string()))
        );
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        let dto = ScheduleRequestDto {
            year: 2024,
            month: 13,
            surgeons: vec![],
            availability: vec![],
            max_calls: QuotaConfig::default(),
            weights: ObjectiveWeights::default(),
            no_call_hard: true,
        };
        assert!(matches!(dto.to_problem(), Err(SchedulingError::InvalidPeriod(_))));
    }

    #[test]
    fn test_from_problem_groups_availability_into_ranges() {
        let problem = CallProblem::new(
            SchedulePeriod::month(2024, 3).unwrap(),
            vec![Surgeon::new(4, "Dunn").with_qualifications([CallLevel::Level4])],
        )
        .with_availability(vec![
            AvailabilityRequest::unavailable(4, date(3, 2)),
            AvailabilityRequest::unavailable(4, date(3, 1)),
            AvailabilityRequest::unavailable(4, date(3, 9)),
            AvailabilityRequest::no_call(4, date(3, 3)),
        ]);
        let dto = ScheduleRequestDto::from_problem(&problem);

        assert_eq!((dto.year, dto.month), (2024, 3));
        assert_eq!(dto.surgeons[0].call_levels, "4");
        assert_eq!(dto.availability.len(), 3);
        assert_eq!(dto.availability[0].kind, AvailabilityKind::Unavailable);
        assert_eq!((dto.availability[0].start, dto.availability[0].end), (date(3, 1), date(3, 2)));
        assert_eq!(dto.availability[2].kind, AvailabilityKind::NoCall);
    }

    #[test]
    fn test_demo_problem_survives_the_request_format() {
        let mut problem = generate(DemoData::Small).unwrap();
        let rebuilt = ScheduleRequestDto::from_problem(&problem).to_problem().unwrap();

        sort_roster(&mut problem.surgeons);
        assert_eq!(rebuilt.surgeons, problem.surgeons);
        assert_eq!(rebuilt.config, problem.config);
        let mut expected = problem.availability.clone();
        let mut actual = rebuilt.availability.clone();
        expected.sort();
        expected.dedup();
        actual.sort();
        assert_eq!(actual, expected);
    }
}
