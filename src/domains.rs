//! Eligibility domains per slot type and level-2 supervision classes.

use std::collections::BTreeSet;

use crate::domain::{CallLevel, Surgeon, SurgeonId};

/// Value a slot variable takes when the slot stays empty.
pub const UNASSIGNED: i64 = -1;

/// Level-2 supervision class of a 2A-eligible surgeon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisionGroup {
    /// Group 1: 2A without 2B. Needs a 2B supervisor on the same day.
    NeedsSupervision,
    /// Group 2: both 2A and 2B.
    SelfSufficient,
    /// Group 3: 2B without 2A. May still cover 2A alone.
    SupervisorOnly,
}

impl SupervisionGroup {
    pub fn classify(qualifications: &BTreeSet<CallLevel>) -> Option<Self> {
        let has_2a = qualifications.contains(&CallLevel::Level2A);
        let has_2b = qualifications.contains(&CallLevel::Level2B);
        match (has_2a, has_2b) {
            (true, false) => Some(SupervisionGroup::NeedsSupervision),
            (true, true) => Some(SupervisionGroup::SelfSufficient),
            (false, true) => Some(SupervisionGroup::SupervisorOnly),
            (false, false) => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            SupervisionGroup::NeedsSupervision => 1,
            SupervisionGroup::SelfSufficient => 2,
            SupervisionGroup::SupervisorOnly => 3,
        }
    }
}

/// Surgeons eligible for one slot type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDomain {
    level: CallLevel,
    eligible: Vec<SurgeonId>,
}

impl SlotDomain {
    pub fn level(&self) -> CallLevel {
        self.level
    }

    /// Eligible surgeon ids in roster order.
    pub fn eligible(&self) -> &[SurgeonId] {
        &self.eligible
    }

    pub fn contains(&self, id: SurgeonId) -> bool {
        self.eligible.contains(&id)
    }

    /// No one can ever fill this slot; its domain is `{UNASSIGNED}` only.
    pub fn is_structurally_absent(&self) -> bool {
        self.eligible.is_empty()
    }

    /// Optional slots and structurally absent slots may take [`UNASSIGNED`].
    pub fn allows_unassigned(&self) -> bool {
        self.level.is_optional() || self.is_structurally_absent()
    }

    /// Slot must take a real surgeon every day.
    pub fn is_forced(&self) -> bool {
        !self.allows_unassigned()
    }

    /// Finite value set for the slot's decision variable.
    pub fn values(&self) -> Vec<i64> {
        let mut values = self.eligible.clone();
        if self.allows_unassigned() {
            values.push(UNASSIGNED);
        }
        values
    }
}

/// Domain Builder output: one [`SlotDomain`] per slot type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDomains {
    slots: Vec<SlotDomain>,
}

impl SlotDomains {
    pub fn build(surgeons: &[Surgeon]) -> Self {
        let slots = CallLevel::ALL
            .iter()
            .map(|&level| SlotDomain {
                level,
                eligible: surgeons
                    .iter()
                    .filter(|s| is_eligible(s, level))
                    .map(|s| s.id)
                    .collect(),
            })
            .collect();
        Self { slots }
    }

    pub fn get(&self, level: CallLevel) -> &SlotDomain {
        &self.slots[level.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotDomain> {
        self.slots.iter()
    }

    /// Levels the surgeon can fill, in canonical order.
    pub fn levels_for(&self, id: SurgeonId) -> impl Iterator<Item = CallLevel> + '_ {
        self.slots
            .iter()
            .filter(move |slot| slot.contains(id))
            .map(|slot| slot.level)
    }
}

/// 2A also admits 2B holders, who may cover a 2A shift themselves.
fn is_eligible(surgeon: &Surgeon, level: CallLevel) -> bool {
    match level {
        CallLevel::Level2A => {
            surgeon.is_qualified(CallLevel::Level2A) || surgeon.is_qualified(CallLevel::Level2B)
        }
        other => surgeon.is_qualified(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CallLevel::*;

    fn roster() -> Vec<Surgeon> {
        vec![
            Surgeon::new(1, "A").with_qualifications([Level1A, Level2A]),
            Surgeon::new(2, "B").with_qualifications([Level2B]),
            Surgeon::new(3, "C").with_qualifications([Level3, Level4]),
            Surgeon::new(4, "D").with_qualifications([Level2A, Level2B]),
        ]
    }

    #[test]
    fn test_supervisor_only_surgeon_is_in_both_level2_domains() {
        let domains = SlotDomains::build(&roster());
        assert!(domains.get(Level2A).contains(2));
        assert!(domains.get(Level2B).contains(2));
        assert_eq!(domains.get(Level2A).eligible(), &[1, 2, 4]);
        assert_eq!(domains.get(Level2B).eligible(), &[2, 4]);
    }

    #[test]
    fn test_1a_only_surgeon_never_in_1b_domain() {
        let domains = SlotDomains::build(&roster());
        assert!(domains.get(Level1A).contains(1));
        assert!(!domains.get(Level1B).contains(1));
        assert!(domains.get(Level1B).is_structurally_absent());
        assert_eq!(domains.get(Level1B).values(), vec![UNASSIGNED]);
    }

    #[test]
    fn test_forced_and_optional_value_sets() {
        let domains = SlotDomains::build(&roster());
        assert_eq!(domains.get(Level1A).values(), vec![1]);
        assert!(domains.get(Level1A).is_forced());
        assert_eq!(domains.get(Level2B).values(), vec![2, 4, UNASSIGNED]);
        assert!(!domains.get(Level2B).is_forced());
        assert_eq!(domains.get(Level3).values(), vec![3]);
    }

    #[test]
    fn test_empty_forced_slot_is_structurally_absent() {
        let domains = SlotDomains::build(&[Surgeon::new(9, "Solo").with_qualifications([Level3])]);
        let slot = domains.get(Level4);
        assert!(slot.is_structurally_absent());
        assert!(!slot.is_forced());
        assert_eq!(slot.values(), vec![UNASSIGNED]);
    }

    #[test]
    fn test_supervision_classification() {
        let group = |levels: &[CallLevel]| {
            SupervisionGroup::classify(&levels.iter().copied().collect())
        };
        assert_eq!(group(&[Level2A]), Some(SupervisionGroup::NeedsSupervision));
        assert_eq!(group(&[Level2A, Level2B]), Some(SupervisionGroup::SelfSufficient));
        assert_eq!(group(&[Level2B, Level1A]), Some(SupervisionGroup::SupervisorOnly));
        assert_eq!(group(&[Level1A, Level3]), None);
        assert_eq!(SupervisionGroup::SupervisorOnly.number(), 3);
    }

    #[test]
    fn test_levels_for_surgeon() {
        let domains = SlotDomains::build(&roster());
        let levels: Vec<CallLevel> = domains.levels_for(2).collect();
        assert_eq!(levels, vec![Level2A, Level2B]);
        assert_eq!(domains.levels_for(99).count(), 0);
    }
}
