//! Demo data generators for surgeon call scheduling.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::{
    AvailabilityKind, AvailabilityRequest, CallLevel, CallProblem, SchedulePeriod, SchedulingConfig,
    Surgeon,
};
use crate::error::SchedulingError;

use CallLevel::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    Small,
    Large,
}

impl std::str::FromStr for DemoData {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SMALL" => Ok(DemoData::Small),
            "LARGE" => Ok(DemoData::Large),
            _ => Err(()),
        }
    }
}

impl DemoData {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoData::Small => "SMALL",
            DemoData::Large => "LARGE",
        }
    }

    fn parameters(&self) -> DemoDataParameters {
        match self {
            DemoData::Small => DemoDataParameters {
                year: 2024,
                month: 3,
                roster: vec![
                    (vec![Level1A, Level1B], 2),
                    (vec![Level1A], 2),
                    (vec![Level2A], 2),
                    (vec![Level2A, Level2B], 2),
                    (vec![Level2B], 2),
                    (vec![Level3], 4),
                    (vec![Level4], 4),
                ],
                availability_count_distribution: vec![(0, 7.0), (1, 2.0), (2, 1.0)],
                no_call_hard: true,
            },
            DemoData::Large => DemoDataParameters {
                year: 2024,
                month: 7,
                roster: vec![
                    (vec![Level1A, Level1B], 3),
                    (vec![Level1A], 3),
                    (vec![Level1B], 1),
                    (vec![Level2A], 4),
                    (vec![Level2A, Level2B], 3),
                    (vec![Level2B], 3),
                    (vec![Level3], 5),
                    (vec![Level3, Level4], 1),
                    (vec![Level4], 5),
                ],
                availability_count_distribution: vec![(0, 3.0), (1, 4.0), (2, 2.0), (3, 1.0)],
                no_call_hard: false,
            },
        }
    }
}

struct DemoDataParameters {
    year: i32,
    month: u32,
    /// Qualification template and how many surgeons share it.
    roster: Vec<(Vec<CallLevel>, usize)>,
    availability_count_distribution: Vec<(usize, f64)>,
    no_call_hard: bool,
}

/// List of available demo data sets.
pub fn list_demo_data() -> Vec<&'static str> {
    vec!["SMALL", "LARGE"]
}

/// Generates a demo call problem for the given size.
pub fn generate(demo: DemoData) -> Result<CallProblem, SchedulingError> {
    let params = demo.parameters();
    let mut rng = StdRng::seed_from_u64(0);

    let period = SchedulePeriod::month(params.year, params.month)?;

    let name_permutations = generate_name_permutations(&mut rng);
    let mut surgeons = Vec::new();
    for (levels, count) in &params.roster {
        for _ in 0..*count {
            let index = surgeons.len();
            let name = name_permutations[index % name_permutations.len()].clone();
            surgeons.push(
                Surgeon::new(index as i64 + 1, name).with_qualifications(levels.iter().copied()),
            );
        }
    }

    let mut availability = Vec::new();
    for date in period.days() {
        let count = pick_count(&mut rng, &params.availability_count_distribution);
        let chosen: Vec<i64> = surgeons
            .choose_multiple(&mut rng, count.min(surgeons.len()))
            .map(|s| s.id)
            .collect();
        for surgeon_id in chosen {
            let kind = if rng.gen_bool(0.5) {
                AvailabilityKind::Unavailable
            } else {
                AvailabilityKind::NoCall
            };
            availability.push(AvailabilityRequest::new(surgeon_id, date, kind));
        }
    }

    let config = SchedulingConfig {
        no_call_hard: params.no_call_hard,
        ..Default::default()
    };

    Ok(CallProblem::new(period, surgeons)
        .with_availability(availability)
        .with_config(config))
}

/// Pick a count based on weighted distribution.
fn pick_count(rng: &mut StdRng, distribution: &[(usize, f64)]) -> usize {
    let total_weight: f64 = distribution.iter().map(|(_, w)| w).sum();
    let mut choice = rng.gen::<f64>() * total_weight;

    for (count, weight) in distribution {
        if choice < *weight {
            return *count;
        }
        choice -= weight;
    }
    distribution.last().map(|(c, _)| *c).unwrap_or(0)
}

const FIRST_NAMES: &[&str] = &[
    "Amara", "Boris", "Chiara", "Deepak", "Elena", "Farid", "Greta", "Hiro", "Ines", "Jonas",
];
const LAST_NAMES: &[&str] = &[
    "Adler", "Bianchi", "Costa", "Dubois", "Eriksen", "Fischer", "Garcia", "Haas", "Ito", "Jansen",
];

fn generate_name_permutations(rng: &mut StdRng) -> Vec<String> {
    let mut names = Vec::with_capacity(FIRST_NAMES.len() * LAST_NAMES.len());
    for first in FIRST_NAMES {
        for last in LAST_NAMES {
            names.push(format!("Dr. {} {}", first, last));
        }
    }
    names.shuffle(rng);
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::SlotDomains;
    use crate::validation::validate_problem;
    use std::collections::HashSet;

    #[test]
    fn test_generate_small() {
        let problem = generate(DemoData::Small).unwrap();
        assert_eq!(problem.surgeons.len(), 18);
        assert_eq!(problem.num_days(), 31);
        assert!(problem.config.no_call_hard);
        assert_eq!(validate_problem(&problem), Ok(()));
    }

    #[test]
    fn test_generate_large() {
        let problem = generate(DemoData::Large).unwrap();
        assert_eq!(problem.surgeons.len(), 28);
        assert_eq!(problem.num_days(), 31);
        assert!(!problem.config.no_call_hard);
        assert!(!problem.availability.is_empty());
        assert_eq!(validate_problem(&problem), Ok(()));
    }

    #[test]
    fn test_every_forced_slot_has_a_rotation() {
        for demo in [DemoData::Small, DemoData::Large] {
            let problem = generate(demo).unwrap();
            let domains = SlotDomains::build(&problem.surgeons);
            for level in CallLevel::FORCED {
                assert!(
                    domains.get(level).eligible().len() >= 4,
                    "{} has too few {} surgeons",
                    demo.as_str(),
                    level
                );
            }
            assert!(!domains.get(Level1B).is_structurally_absent());
            assert!(!domains.get(Level2B).is_structurally_absent());
        }
    }

    #[test]
    fn test_names_are_unique() {
        let problem = generate(DemoData::Large).unwrap();
        let names: HashSet<&str> = problem.surgeons.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), problem.surgeons.len());
    }

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(generate(DemoData::Small).unwrap(), generate(DemoData::Small).unwrap());
    }

    #[test]
    fn test_demo_data_from_str() {
        assert_eq!("SMALL".parse::<DemoData>(), Ok(DemoData::Small));
        assert_eq!("small".parse::<DemoData>(), Ok(DemoData::Small));
        assert_eq!("LARGE".parse::<DemoData>(), Ok(DemoData::Large));
        assert!("invalid".parse::<DemoData>().is_err());
    }
}
