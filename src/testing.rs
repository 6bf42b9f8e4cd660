//! Shared fixtures for unit tests.

use chrono::NaiveDate;
use std::time::Duration;

use crate::cp::SolverConfig;
use crate::domain::{CallLevel, SchedulePeriod, Surgeon};

use CallLevel::*;

pub(crate) fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

pub(crate) fn period(days: usize) -> SchedulePeriod {
    SchedulePeriod::new(march(1), days)
}

pub(crate) fn quick() -> SolverConfig {
    SolverConfig::with_time_limit(Duration::from_secs(5))
}

/// Three dedicated surgeons per forced level, ids 1..=12.
///
/// 1A: 1-3, 2A (also 2B, self-sufficient): 4-6, 3: 7-9, 4: 10-12.
pub(crate) fn staffed_roster() -> Vec<Surgeon> {
    let pools: [(&str, &[CallLevel]); 4] = [
        ("Ames", &[Level1A]),
        ("Baker", &[Level2A, Level2B]),
        ("Cole", &[Level3]),
        ("Dunn", &[Level4]),
    ];
    roster(&pools)
}

/// Level-2 supervision fixture, ids 1..=15.
///
/// Needs supervision (2A only): 1-3, supervisor only (2B only): 4-6,
/// 1A: 7-9, 3: 10-12, 4: 13-15.
pub(crate) fn supervision_roster() -> Vec<Surgeon> {
    let pools: [(&str, &[CallLevel]); 5] = [
        ("Park", &[Level2A]),
        ("Stone", &[Level2B]),
        ("Ames", &[Level1A]),
        ("Cole", &[Level3]),
        ("Dunn", &[Level4]),
    ];
    roster(&pools)
}

fn roster(pools: &[(&str, &[CallLevel])]) -> Vec<Surgeon> {
    pools
        .iter()
        .enumerate()
        .flat_map(|(p, (name, levels))| {
            (1..=3).map(move |k| {
                let id = (p * 3 + k) as i64;
                Surgeon::new(id, format!("{} {}", name, k)).with_qualifications(levels.iter().copied())
            })
        })
        .collect()
}
