//! Call statistics aggregated over one or more stored schedules.

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::solution::CallSchedule;

/// Per-surgeon totals across the selected schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStatsRow {
    pub surgeon: String,
    pub total_calls: u32,
    pub weekend_calls: u32,
    /// Most senior level worked (1A/1B = 1 .. 4 = 5).
    pub min_level_rank: u8,
}

/// Aggregates call counts per surgeon name.
///
/// Rows are ordered by seniority rank, then by case-insensitive name.
pub fn call_stats<'a>(schedules: impl IntoIterator<Item = &'a CallSchedule>) -> Vec<CallStatsRow> {
    let mut rows: HashMap<&str, CallStatsRow> = HashMap::new();
    for schedule in schedules {
        for (date, level, surgeon) in schedule.assignments() {
            let row = rows.entry(surgeon).or_insert_with(|| CallStatsRow {
                surgeon: surgeon.to_string(),
                total_calls: 0,
                weekend_calls: 0,
                min_level_rank: u8::MAX,
            });
            row.total_calls += 1;
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                row.weekend_calls += 1;
            }
            row.min_level_rank = row.min_level_rank.min(level.stats_rank());
        }
    }

    let mut rows: Vec<CallStatsRow> = rows.into_values().collect();
    rows.sort_by(|a, b| {
        a.min_level_rank
            .cmp(&b.min_level_rank)
            .then_with(|| a.surgeon.to_lowercase().cmp(&b.surgeon.to_lowercase()))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::SolveStatus;
    use crate::domain::CallLevel::{self, *};
    use crate::objective::ObjectiveBreakdown;
    use crate::solution::DayAssignments;
    use crate::testing::march;

    fn schedule(entries: &[(u32, CallLevel, &str)]) -> CallSchedule {
        let mut days = std::collections::BTreeMap::new();
        for &(day, level, name) in entries {
            days.entry(march(day))
                .or_insert_with(DayAssignments::new)
                .insert(level, Some(name.to_string()));
        }
        CallSchedule {
            status: SolveStatus::Optimal,
            cost: 0,
            breakdown: ObjectiveBreakdown::default(),
            days,
        }
    }

    #[test]
    fn test_counts_totals_and_weekends() {
        // 2024-03-02 is a Saturday, 2024-03-04 a Monday.
        let first = schedule(&[(2, Level2A, "Baker"), (4, Level3, "cole"), (4, Level1A, "Ames")]);
        let second = schedule(&[(3, Level4, "cole"), (7, Level2B, "Baker")]);
        let rows = call_stats([&first, &second]);

        let names: Vec<&str> = rows.iter().map(|r| r.surgeon.as_str()).collect();
        assert_eq!(names, vec!["Ames", "Baker", "cole"]);

        let baker = &rows[1];
        assert_eq!((baker.total_calls, baker.weekend_calls, baker.min_level_rank), (2, 1, 2));
        let cole = &rows[2];
        assert_eq!((cole.total_calls, cole.weekend_calls, cole.min_level_rank), (2, 1, 4));
    }

    #[test]
    fn test_name_order_is_case_insensitive_within_rank() {
        let rows = call_stats([&schedule(&[(4, Level3, "zed"), (5, Level3, "Adam"), (6, Level3, "bea")])]);
        let names: Vec<&str> = rows.iter().map(|r| r.surgeon.as_str()).collect();
        assert_eq!(names, vec!["Adam", "bea", "zed"]);
    }

    #[test]
    fn test_empty_slots_are_ignored() {
        let mut empty = schedule(&[(4, Level1A, "Ames")]);
        empty.days.get_mut(&march(4)).unwrap().insert(Level1B, None);
        let rows = call_stats([&empty]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_calls, 1);
    }
}
