//! Demo problem presets.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constraints::{Constraint, DifficultyBuckets, Level, LevelBuckets};
use crate::domain::Problem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    NurseRostering,
    BillReview,
    BillReviewStrict,
}

impl std::str::FromStr for DemoData {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NURSE_ROSTERING" => Ok(DemoData::NurseRostering),
            "BILL_REVIEW" => Ok(DemoData::BillReview),
            "BILL_REVIEW_STRICT" => Ok(DemoData::BillReviewStrict),
            _ => Err(()),
        }
    }
}

impl DemoData {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoData::NurseRostering => "NURSE_ROSTERING",
            DemoData::BillReview => "BILL_REVIEW",
            DemoData::BillReviewStrict => "BILL_REVIEW_STRICT",
        }
    }
}

/// List of available demo data sets.
pub fn list_demo_data() -> Vec<&'static str> {
    vec!["NURSE_ROSTERING", "BILL_REVIEW", "BILL_REVIEW_STRICT"]
}

/// Generates the demo problem for the given preset.
pub fn generate(demo: DemoData) -> Problem {
    match demo {
        DemoData::NurseRostering => nurse_rostering(),
        DemoData::BillReview => bill_review("Bill review", 0.5),
        DemoData::BillReviewStrict => bill_review("Bill review (strict)", 2.0),
    }
}

/// Three nurses covering eleven days: no back-to-back duty, one nurse per
/// day, and workloads nudged toward the fair share of days.
fn nurse_rostering() -> Problem {
    let n_nurses = 3;
    let n_days = 11;
    // Fair share of days per nurse, rounded down.
    let duty_days = (n_days / n_nurses) as f64;

    let mut rng = StdRng::seed_from_u64(0);
    let labels: Vec<String> = generate_name_permutations(&mut rng)
        .into_iter()
        .take(n_nurses)
        .collect();

    Problem::builder("Nurse rostering", n_nurses, n_days)
        .with_entity_labels(labels)
        .with_constraint(Constraint::consecutive_exclusion(3.5))
        .with_constraint(Constraint::slot_coverage(1.3, 1.0))
        .with_constraint(Constraint::workload_balance(0.3, duty_days))
        .build()
        .unwrap()
}

/// Six scrutinizers reviewing ten hospital bills: seniority steered toward
/// bill difficulty, one reviewer per bill, at most three bills each.
fn bill_review(name: &str, overflow_penalty: f64) -> Problem {
    let levels = LevelBuckets::new(1, 3, 2);
    let difficulties = DifficultyBuckets::new(3, 4, 3);
    let n_scrutinizers = levels.total();
    let n_bills = difficulties.total();

    let mut rng = StdRng::seed_from_u64(1);
    let names = generate_name_permutations(&mut rng);
    let labels: Vec<String> = (0..n_scrutinizers)
        .map(|i| {
            let level = match levels.level_of(i) {
                Level::Senior => "Senior",
                Level::Intermediate => "Intermediate",
                Level::Junior => "Junior",
            };
            format!("{} ({})", names[i], level)
        })
        .collect();

    Problem::builder(name, n_scrutinizers, n_bills)
        .with_entity_labels(labels)
        .with_constraint(Constraint::skill_mismatch(levels, difficulties))
        .with_constraint(Constraint::unique_assignment(20_000.0))
        .with_constraint(Constraint::capacity_overflow(3, overflow_penalty))
        .build()
        .unwrap()
}

const FIRST_NAMES: &[&str] = &[
    "Ada", "Ben", "Cara", "Dev", "Emma", "Finn", "Gita", "Hana", "Igor", "June",
];
const LAST_NAMES: &[&str] = &[
    "Barnes", "Chen", "Diaz", "Evans", "Ford", "Gray", "Hale", "Iyer", "Jain", "Katz",
];

fn generate_name_permutations(rng: &mut StdRng) -> Vec<String> {
    let mut names = Vec::with_capacity(FIRST_NAMES.len() * LAST_NAMES.len());
    for first in FIRST_NAMES {
        for last in LAST_NAMES {
            names.push(format!("{} {}", first, last));
        }
    }
    names.shuffle(rng);
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_nurse_rostering() {
        let problem = generate(DemoData::NurseRostering);

        assert_eq!(problem.n_entities(), 3);
        assert_eq!(problem.n_slots(), 11);
        assert_eq!(problem.constraints().len(), 3);
        assert_eq!(problem.entity_labels().len(), 3);

        // Seeded generation is reproducible.
        let again = generate(DemoData::NurseRostering);
        assert_eq!(problem.entity_labels(), again.entity_labels());
    }

    #[test]
    fn test_generate_bill_review() {
        let problem = generate(DemoData::BillReview);

        assert_eq!(problem.n_entities(), 6);
        assert_eq!(problem.n_slots(), 10);

        let names: Vec<&str> = problem.constraints().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["Skill mismatch", "Unique assignment", "Capacity overflow"]
        );

        assert!(problem.entity_labels()[0].ends_with("(Senior)"));
        assert!(problem.entity_labels()[1].ends_with("(Intermediate)"));
        assert!(problem.entity_labels()[5].ends_with("(Junior)"));
    }

    #[test]
    fn test_strict_variant_raises_overflow_penalty() {
        let lenient = generate(DemoData::BillReview);
        let strict = generate(DemoData::BillReviewStrict);

        let penalty_of = |problem: &Problem| {
            problem.constraints().iter().find_map(|c| match c {
                Constraint::CapacityOverflow { penalty, .. } => Some(*penalty),
                _ => None,
            })
        };
        assert_eq!(penalty_of(&lenient), Some(0.5));
        assert_eq!(penalty_of(&strict), Some(2.0));
    }

    #[test]
    fn test_presets_encode() {
        for preset in [
            DemoData::NurseRostering,
            DemoData::BillReview,
            DemoData::BillReviewStrict,
        ] {
            let problem = generate(preset);
            let qubo = problem.build_qubo().unwrap();
            assert_eq!(qubo.n_variables(), problem.n_variables());
            assert!(qubo.len() > 0, "{} produced an empty model", preset.as_str());
        }
    }

    #[test]
    fn test_demo_data_from_str() {
        assert_eq!(
            "NURSE_ROSTERING".parse::<DemoData>(),
            Ok(DemoData::NurseRostering)
        );
        assert_eq!("bill_review".parse::<DemoData>(), Ok(DemoData::BillReview));
        assert_eq!(
            "BILL_REVIEW_STRICT".parse::<DemoData>(),
            Ok(DemoData::BillReviewStrict)
        );
        assert!("invalid".parse::<DemoData>().is_err());
    }

    #[test]
    fn test_as_str_round_trips() {
        for preset in [
            DemoData::NurseRostering,
            DemoData::BillReview,
            DemoData::BillReviewStrict,
        ] {
            assert_eq!(preset.as_str().parse::<DemoData>(), Ok(preset));
        }
    }
}
