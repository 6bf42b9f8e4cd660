//! Constraint Model Builder: slot variables and every hard rule of the
//! monthly call roster.
//!
//! Each `(day, slot type)` pair gets one integer variable whose values are
//! the eligible surgeon ids, plus [`UNASSIGNED`] for slots that may stay
//! empty. Conditional rules are expressed through reified indicators
//! `b <=> (X == value)` and constraints guarded by them.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::cp::{BoolVar, CpModel, Domain, IntVar, LinearExpr, Literal, Relation};
use crate::domain::{AvailabilityKind, CallLevel, CallProblem, QuotaGroup, SchedulePeriod, Surgeon, SurgeonId};
use crate::domains::{SlotDomains, SupervisionGroup, UNASSIGNED};

/// Two assignments of one surgeon must be at least this many days apart.
pub const REST_WINDOW: usize = 3;

/// How a single-day availability request enters the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityRule {
    /// Zero assignments that day, always.
    Forbid,
    /// Assignments that day feed the no-call penalty.
    Penalize,
}

impl AvailabilityRule {
    pub fn for_kind(kind: AvailabilityKind, no_call_hard: bool) -> Self {
        match kind {
            AvailabilityKind::Unavailable => AvailabilityRule::Forbid,
            AvailabilityKind::NoCall if no_call_hard => AvailabilityRule::Forbid,
            AvailabilityKind::NoCall => AvailabilityRule::Penalize,
        }
    }
}

/// A built call model together with the handles needed to read it back.
#[derive(Debug, Clone)]
pub struct CallModel {
    model: CpModel,
    period: SchedulePeriod,
    domains: SlotDomains,
    slots: Vec<[IntVar; 6]>,
    vacancies: Vec<[Option<BoolVar>; 6]>,
    indicators: HashMap<(usize, CallLevel, SurgeonId), BoolVar>,
    soft_no_call: Vec<BoolVar>,
    unavailable: BTreeSet<(SurgeonId, NaiveDate)>,
}

impl CallModel {
    pub fn model(&self) -> &CpModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut CpModel {
        &mut self.model
    }

    pub fn period(&self) -> &SchedulePeriod {
        &self.period
    }

    pub fn domains(&self) -> &SlotDomains {
        &self.domains
    }

    pub fn num_days(&self) -> usize {
        self.slots.len()
    }

    /// Decision variable of one slot.
    pub fn slot(&self, day: usize, level: CallLevel) -> IntVar {
        self.slots[day][level.index()]
    }

    /// `vacant <=> (slot == UNASSIGNED)` for optional slots with candidates.
    /// Forced and structurally absent slots have none.
    pub fn vacancy(&self, day: usize, level: CallLevel) -> Option<BoolVar> {
        self.vacancies[day][level.index()]
    }

    /// `b <=> (slot == surgeon)`; only exists where the surgeon is eligible.
    pub fn indicator(&self, day: usize, level: CallLevel, surgeon: SurgeonId) -> Option<BoolVar> {
        self.indicators.get(&(day, level, surgeon)).copied()
    }

    /// Every indicator of `surgeon` on `day`, one per eligible level.
    pub fn day_indicators(&self, day: usize, surgeon: SurgeonId) -> Vec<BoolVar> {
        self.domains
            .levels_for(surgeon)
            .filter_map(|level| self.indicator(day, level, surgeon))
            .collect()
    }

    /// Every indicator of `surgeon` over the whole period.
    pub fn surgeon_indicators(&self, surgeon: SurgeonId) -> Vec<BoolVar> {
        (0..self.num_days())
            .flat_map(|day| self.day_indicators(day, surgeon))
            .collect()
    }

    /// Indicators that coincide with a soft NO_CALL request.
    pub fn soft_no_call(&self) -> &[BoolVar] {
        &self.soft_no_call
    }

    /// True if `surgeon` has an UNAVAILABLE request on `date`, inside the
    /// period or not.
    pub fn is_unavailable(&self, surgeon: SurgeonId, date: NaiveDate) -> bool {
        self.unavailable.contains(&(surgeon, date))
    }
}

/// Declares the slot variables and posts hard rules 1 to 7.
///
/// The problem is expected to have passed validation.
pub fn build(problem: &CallProblem, domains: SlotDomains) -> CallModel {
    let num_days = problem.num_days();
    let mut model = CpModel::new(format!("calls-{}", problem.period.start.format("%Y-%m")));

    let slots: Vec<[IntVar; 6]> = (0..num_days)
        .map(|day| {
            CallLevel::ALL.map(|level| {
                let slot = domains.get(level);
                model.new_int_var(
                    Domain::from_values(slot.values()),
                    format!("X_{}_{}", day, level.code()),
                )
            })
        })
        .collect();

    let mut call_model = CallModel {
        model,
        period: problem.period,
        domains,
        slots,
        vacancies: vec![[None; 6]; num_days],
        indicators: HashMap::new(),
        soft_no_call: Vec::new(),
        unavailable: BTreeSet::new(),
    };

    call_model.reify_slots();
    call_model.post_daily_distinctness();
    call_model.post_rest_windows(&problem.surgeons);
    call_model.post_level1_pairing();
    call_model.post_supervision(&problem.surgeons);
    call_model.post_quotas(problem);
    call_model.post_availability(problem);

    debug!(
        days = num_days,
        surgeons = problem.surgeons.len(),
        indicators = call_model.indicators.len(),
        soft_no_call = call_model.soft_no_call.len(),
        variables = call_model.model.variable_count(),
        constraints = call_model.model.constraint_count(),
        "hard constraints posted"
    );
    call_model
}

impl CallModel {
    fn reify_slots(&mut self) {
        for day in 0..self.num_days() {
            for slot in self.domains.iter() {
                let level = slot.level();
                let x = self.slots[day][level.index()];
                for &id in slot.eligible() {
                    let b = self
                        .model
                        .new_indicator(x, id, format!("ind_{}_{}_{}", day, level.code(), id));
                    self.indicators.insert((day, level, id), b);
                }
                if level.is_optional() && !slot.is_structurally_absent() {
                    let vacant = self.model.new_indicator(
                        x,
                        UNASSIGNED,
                        format!("vacant_{}_{}", day, level.code()),
                    );
                    self.vacancies[day][level.index()] = Some(vacant);
                }
            }
        }
    }

    /// Rule 1: forced slots of one day take pairwise distinct surgeons.
    fn post_daily_distinctness(&mut self) {
        let forced: Vec<CallLevel> = CallLevel::FORCED
            .into_iter()
            .filter(|level| self.domains.get(*level).is_forced())
            .collect();
        if forced.len() < 2 {
            return;
        }
        for day in 0..self.num_days() {
            let vars = forced.iter().map(|level| self.slot(day, *level)).collect();
            self.model.add_all_different(vars);
        }
    }

    /// Rule 2: at most one assignment per surgeon in any window of
    /// [`REST_WINDOW`] consecutive days, across all six slot types.
    ///
    /// The window also covers a single day, so 1B and 2B surgeons never
    /// double up with another slot on the same day.
    fn post_rest_windows(&mut self, surgeons: &[Surgeon]) {
        let num_days = self.num_days();
        let starts = num_days.saturating_sub(REST_WINDOW - 1).max(1);
        for surgeon in surgeons {
            for start in 0..starts {
                let end = (start + REST_WINDOW).min(num_days);
                let window: Vec<IntVar> = (start..end)
                    .flat_map(|day| self.day_indicators(day, surgeon.id))
                    .map(BoolVar::var)
                    .collect();
                if window.len() > 1 {
                    self.model.add_linear(LinearExpr::sum(window), Relation::Le, 1);
                }
            }
        }
    }

    /// Rule 3: a filled 1B slot differs from the day's 1A slot, posted as
    /// `[1A == s] + [1B == s] <= 1` for every surgeon eligible for both.
    fn post_level1_pairing(&mut self) {
        if self.domains.get(CallLevel::Level1A).is_structurally_absent() {
            return;
        }
        let both: Vec<SurgeonId> = self
            .domains
            .get(CallLevel::Level1B)
            .eligible()
            .iter()
            .copied()
            .filter(|id| self.domains.get(CallLevel::Level1A).eligible().contains(id))
            .collect();
        for day in 0..self.num_days() {
            for &id in &both {
                let pair = [CallLevel::Level1A, CallLevel::Level1B]
                    .into_iter()
                    .filter_map(|level| self.indicator(day, level, id))
                    .map(BoolVar::var);
                self.model.add_linear(LinearExpr::sum(pair), Relation::Le, 1);
            }
        }
    }

    /// Rule 4: level-2 supervision pairing, keyed on the 2A assignment.
    fn post_supervision(&mut self, surgeons: &[Surgeon]) {
        let candidates: Vec<(SurgeonId, SupervisionGroup)> = self
            .domains
            .get(CallLevel::Level2A)
            .eligible()
            .iter()
            .filter_map(|id| {
                surgeons
                    .iter()
                    .find(|s| s.id == *id)
                    .and_then(Surgeon::supervision_group)
                    .map(|group| (*id, group))
            })
            .collect();
        let supervisors_exist = !self.domains.get(CallLevel::Level2B).is_structurally_absent();

        for day in 0..self.num_days() {
            let x_2b = self.slot(day, CallLevel::Level2B);
            for &(id, group) in &candidates {
                let Some(on_2a) = self.indicator(day, CallLevel::Level2A, id) else {
                    continue;
                };
                match group {
                    SupervisionGroup::NeedsSupervision => {
                        self.model
                            .add_linear(x_2b, Relation::Ne, UNASSIGNED)
                            .only_enforce_if([Literal::from(on_2a)]);
                        self.model
                            .add_linear(x_2b, Relation::Ne, id)
                            .only_enforce_if([Literal::from(on_2a)]);
                    }
                    SupervisionGroup::SelfSufficient | SupervisionGroup::SupervisorOnly => {
                        if supervisors_exist {
                            self.model
                                .add_linear(x_2b, Relation::Eq, UNASSIGNED)
                                .only_enforce_if([Literal::from(on_2a)]);
                        }
                    }
                }
            }
        }
    }

    /// Rule 5: per-surgeon call caps per quota group over the period.
    fn post_quotas(&mut self, problem: &CallProblem) {
        for group in QuotaGroup::ALL {
            let Some(cap) = problem.config.max_calls.max_calls(group) else {
                continue;
            };
            for surgeon in &problem.surgeons {
                let mut calls = Vec::new();
                for day in 0..self.num_days() {
                    for level in group.levels() {
                        if let Some(b) = self.indicator(day, *level, surgeon.id) {
                            calls.push(b.var());
                        }
                    }
                }
                if !calls.is_empty() {
                    self.model
                        .add_linear(LinearExpr::sum(calls), Relation::Le, i64::from(cap));
                }
            }
        }
    }

    /// Rules 6 and 7: UNAVAILABLE always forbids, NO_CALL forbids or
    /// penalizes depending on `no_call_hard`.
    fn post_availability(&mut self, problem: &CallProblem) {
        let requests: BTreeSet<_> = problem.availability.iter().copied().collect();
        for request in requests {
            if request.kind == AvailabilityKind::Unavailable {
                self.unavailable.insert((request.surgeon_id, request.date));
            }
            let Some(day) = self.period.index_of(request.date) else {
                continue;
            };
            let on_call = self.day_indicators(day, request.surgeon_id);
            if on_call.is_empty() {
                continue;
            }
            match AvailabilityRule::for_kind(request.kind, problem.config.no_call_hard) {
                AvailabilityRule::Forbid => {
                    let vars = on_call.into_iter().map(BoolVar::var);
                    self.model.add_linear(LinearExpr::sum(vars), Relation::Eq, 0);
                }
                AvailabilityRule::Penalize => self.soft_no_call.extend(on_call),
            }
        }
    }
}
