//! Domain model for surgeon on-call rostering.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::domains::SupervisionGroup;
use crate::error::SchedulingError;

/// Identifier of a surgeon as issued by the roster provider.
pub type SurgeonId = i64;

/// One of the six on-call duty categories filled at most once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CallLevel {
    #[serde(rename = "1A")]
    Level1A,
    #[serde(rename = "1B")]
    Level1B,
    #[serde(rename = "2A")]
    Level2A,
    #[serde(rename = "2B")]
    Level2B,
    #[serde(rename = "3")]
    Level3,
    #[serde(rename = "4")]
    Level4,
}

impl CallLevel {
    /// All slot types in their canonical order.
    pub const ALL: [CallLevel; 6] = [
        CallLevel::Level1A,
        CallLevel::Level1B,
        CallLevel::Level2A,
        CallLevel::Level2B,
        CallLevel::Level3,
        CallLevel::Level4,
    ];

    /// Slots that must be filled every day whenever someone is eligible.
    pub const FORCED: [CallLevel; 4] = [
        CallLevel::Level1A,
        CallLevel::Level2A,
        CallLevel::Level3,
        CallLevel::Level4,
    ];

    pub fn code(self) -> &'static str {
        match self {
            CallLevel::Level1A => "1A",
            CallLevel::Level1B => "1B",
            CallLevel::Level2A => "2A",
            CallLevel::Level2B => "2B",
            CallLevel::Level3 => "3",
            CallLevel::Level4 => "4",
        }
    }

    /// Position of this level in [`CallLevel::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The 1B and 2B pairing slots may stay empty on any day.
    pub fn is_optional(self) -> bool {
        matches!(self, CallLevel::Level1B | CallLevel::Level2B)
    }

    pub fn quota_group(self) -> QuotaGroup {
        match self {
            CallLevel::Level1A | CallLevel::Level1B => QuotaGroup::One,
            CallLevel::Level2A | CallLevel::Level2B => QuotaGroup::Two,
            CallLevel::Level3 => QuotaGroup::Three,
            CallLevel::Level4 => QuotaGroup::Four,
        }
    }

    /// Seniority rank used by call statistics (1A/1B = 1 .. 4 = 5).
    pub fn stats_rank(self) -> u8 {
        match self {
            CallLevel::Level1A | CallLevel::Level1B => 1,
            CallLevel::Level2A => 2,
            CallLevel::Level2B => 3,
            CallLevel::Level3 => 4,
            CallLevel::Level4 => 5,
        }
    }

    /// Parses a comma-separated list such as `"1A, 2A,2B"`.
    ///
    /// ```
    /// use surgeon_call_scheduling::domain::CallLevel;
    ///
    /// let levels = CallLevel::parse_list("2B, 1A").unwrap();
    /// assert_eq!(levels.into_iter().collect::<Vec<_>>(), vec![CallLevel::Level1A, CallLevel::Level2B]);
    /// assert!(CallLevel::parse_list("").unwrap().is_empty());
    /// ```
    pub fn parse_list(list: &str) -> Result<BTreeSet<CallLevel>, SchedulingError> {
        list.split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for CallLevel {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1A" => Ok(CallLevel::Level1A),
            "1B" => Ok(CallLevel::Level1B),
            "2A" => Ok(CallLevel::Level2A),
            "2B" => Ok(CallLevel::Level2B),
            "3" => Ok(CallLevel::Level3),
            "4" => Ok(CallLevel::Level4),
            other => Err(SchedulingError::UnknownCallLevel(other.to_string())),
        }
    }
}

impl fmt::Display for CallLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A surgeon who can be assigned to call slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surgeon {
    pub id: SurgeonId,
    pub name: String,
    pub qualifications: BTreeSet<CallLevel>,
}

impl Surgeon {
    pub fn new(id: SurgeonId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            qualifications: BTreeSet::new(),
        }
    }

    pub fn with_qualifications(mut self, levels: impl IntoIterator<Item = CallLevel>) -> Self {
        self.qualifications.extend(levels);
        self
    }

    pub fn is_qualified(&self, level: CallLevel) -> bool {
        self.qualifications.contains(&level)
    }

    pub fn supervision_group(&self) -> Option<SupervisionGroup> {
        SupervisionGroup::classify(&self.qualifications)
    }

    /// Most senior quota group this surgeon covers, or 99 when unqualified.
    /// Used to order rosters for display.
    pub fn lowest_level_order(&self) -> u8 {
        self.qualifications
            .iter()
            .map(|level| level.quota_group().order())
            .min()
            .unwrap_or(99)
    }
}

/// Sorts a roster by seniority, then by case-insensitive name.
pub fn sort_roster(surgeons: &mut [Surgeon]) {
    surgeons.sort_by(|a, b| {
        a.lowest_level_order()
            .cmp(&b.lowest_level_order())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// Aggregation of slot types for quota caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuotaGroup {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
}

impl QuotaGroup {
    pub const ALL: [QuotaGroup; 4] = [
        QuotaGroup::One,
        QuotaGroup::Two,
        QuotaGroup::Three,
        QuotaGroup::Four,
    ];

    pub fn levels(self) -> &'static [CallLevel] {
        match self {
            QuotaGroup::One => &[CallLevel::Level1A, CallLevel::Level1B],
            QuotaGroup::Two => &[CallLevel::Level2A, CallLevel::Level2B],
            QuotaGroup::Three => &[CallLevel::Level3],
            QuotaGroup::Four => &[CallLevel::Level4],
        }
    }

    pub fn order(self) -> u8 {
        match self {
            QuotaGroup::One => 1,
            QuotaGroup::Two => 2,
            QuotaGroup::Three => 3,
            QuotaGroup::Four => 4,
        }
    }
}

const DEFAULT_MAX_CALLS: u32 = 10;

/// Maximum number of calls per surgeon and quota group over the period.
///
/// A group missing from the map is uncapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuotaConfig {
    max_calls: BTreeMap<QuotaGroup, u32>,
}

impl QuotaConfig {
    /// Same cap for all four groups.
    pub fn uniform(max_calls: u32) -> Self {
        Self {
            max_calls: QuotaGroup::ALL.iter().map(|g| (*g, max_calls)).collect(),
        }
    }

    /// No caps at all.
    pub fn uncapped() -> Self {
        Self {
            max_calls: BTreeMap::new(),
        }
    }

    pub fn with_max_calls(mut self, group: QuotaGroup, max_calls: u32) -> Self {
        self.max_calls.insert(group, max_calls);
        self
    }

    pub fn max_calls(&self, group: QuotaGroup) -> Option<u32> {
        self.max_calls.get(&group).copied()
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self::uniform(DEFAULT_MAX_CALLS)
    }
}

/// Kind of availability exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityKind {
    /// The surgeon cannot work at all that day.
    Unavailable,
    /// The surgeon asked not to be on call that day.
    NoCall,
}

/// A single-day availability exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub surgeon_id: SurgeonId,
    pub date: NaiveDate,
    pub kind: AvailabilityKind,
}

impl AvailabilityRequest {
    pub fn new(surgeon_id: SurgeonId, date: NaiveDate, kind: AvailabilityKind) -> Self {
        Self {
            surgeon_id,
            date,
            kind,
        }
    }

    pub fn unavailable(surgeon_id: SurgeonId, date: NaiveDate) -> Self {
        Self::new(surgeon_id, date, AvailabilityKind::Unavailable)
    }

    pub fn no_call(surgeon_id: SurgeonId, date: NaiveDate) -> Self {
        Self::new(surgeon_id, date, AvailabilityKind::NoCall)
    }
}

/// An availability exception entered as an inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRange {
    pub surgeon_id: SurgeonId,
    pub kind: AvailabilityKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AvailabilityRange {
    /// Expands the range into one request per day.
    pub fn expand(&self) -> Result<Vec<AvailabilityRequest>, SchedulingError> {
        if self.start > self.end {
            return Err(SchedulingError::InvalidDateRange {
                surgeon_id: self.surgeon_id,
                start: self.start,
                end: self.end,
            });
        }
        Ok(self
            .start
            .iter_days()
            .take_while(|date| *date <= self.end)
            .map(|date| AvailabilityRequest::new(self.surgeon_id, date, self.kind))
            .collect())
    }
}

/// Inclusive run of consecutive dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Collapses dates into maximal runs of consecutive days.
///
/// ```
/// use chrono::NaiveDate;
/// use surgeon_call_scheduling::domain::group_dates;
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
/// let ranges = group_dates([d(5), d(1), d(2), d(3)]);
/// assert_eq!(ranges.len(), 2);
/// assert_eq!((ranges[0].start, ranges[0].end), (d(1), d(3)));
/// assert_eq!((ranges[1].start, ranges[1].end), (d(5), d(5)));
/// ```
pub fn group_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Vec<DateRange> {
    let sorted: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let mut ranges: Vec<DateRange> = Vec::new();
    for date in sorted {
        match ranges.last_mut() {
            Some(range) if range.end.succ_opt() == Some(date) => range.end = date,
            _ => ranges.push(DateRange {
                start: date,
                end: date,
            }),
        }
    }
    ranges
}

/// Objective weighting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectiveWeights {
    pub fairness_weight: u32,
    pub gamma_no_call: u32,
    pub gamma_unavail_prev: u32,
    #[serde(rename = "gamma1B")]
    pub gamma_1b: u32,
    pub gamma_balance: u32,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            fairness_weight: 1000,
            gamma_no_call: 10,
            gamma_unavail_prev: 5,
            gamma_1b: 1,
            gamma_balance: 100,
        }
    }
}

/// Tunable configuration read from the roster provider at invocation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingConfig {
    pub max_calls: QuotaConfig,
    pub weights: ObjectiveWeights,
    /// When false, NO_CALL requests are penalized instead of forbidden.
    pub no_call_hard: bool,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            max_calls: QuotaConfig::default(),
            weights: ObjectiveWeights::default(),
            no_call_hard: true,
        }
    }
}

/// A dense run of calendar days; day index 0 is `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePeriod {
    pub start: NaiveDate,
    pub num_days: usize,
}

impl SchedulePeriod {
    pub fn new(start: NaiveDate, num_days: usize) -> Self {
        Self { start, num_days }
    }

    /// Every day of the given calendar month.
    ///
    /// ```
    /// use surgeon_call_scheduling::domain::SchedulePeriod;
    ///
    /// assert_eq!(SchedulePeriod::month(2024, 2).unwrap().num_days, 29);
    /// assert_eq!(SchedulePeriod::month(2023, 2).unwrap().num_days, 28);
    /// assert!(SchedulePeriod::month(2024, 13).is_err());
    /// ```
    pub fn month(year: i32, month: u32) -> Result<Self, SchedulingError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            SchedulingError::InvalidPeriod(format!("{}-{:02} is not a calendar month", year, month))
        })?;
        let num_days = start
            .iter_days()
            .take_while(|date| date.month() == month)
            .count();
        Ok(Self::new(start, num_days))
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        self.start.iter_days().take(self.num_days).collect()
    }

    /// Day index of `date`, if it falls inside the period.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.start).num_days();
        usize::try_from(offset).ok().filter(|i| *i < self.num_days)
    }

    pub fn date_of(&self, index: usize) -> NaiveDate {
        self.start + Duration::days(index as i64)
    }
}

/// Everything needed to build one month's call model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallProblem {
    pub period: SchedulePeriod,
    pub surgeons: Vec<Surgeon>,
    #[serde(default)]
    pub availability: Vec<AvailabilityRequest>,
    #[serde(default)]
    pub config: SchedulingConfig,
}

impl CallProblem {
    pub fn new(period: SchedulePeriod, surgeons: Vec<Surgeon>) -> Self {
        Self {
            period,
            surgeons,
            availability: Vec::new(),
            config: SchedulingConfig::default(),
        }
    }

    pub fn with_availability(mut self, availability: Vec<AvailabilityRequest>) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_config(mut self, config: SchedulingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn surgeon(&self, id: SurgeonId) -> Option<&Surgeon> {
        self.surgeons.iter().find(|s| s.id == id)
    }

    pub fn num_days(&self) -> usize {
        self.period.num_days
    }
}
