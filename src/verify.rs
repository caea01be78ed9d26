//! Independent feasibility checking of decoded schedules.
//!
//! Each check re-evaluates a constraint's closed-form penalty directly from
//! the assignment grid; nothing here reads the encoded coefficient map. A
//! defect in the quadratic expansion (or in this re-evaluation) therefore
//! shows up as a mismatch between the model energy and the residual sum,
//! instead of going unnoticed.

use serde::{Deserialize, Serialize};

use crate::constraints::{Constraint, GroupBy};
use crate::domain::{Problem, Schedule};
use crate::error::Error;

/// Residuals up to this magnitude count as zero for hard constraints.
pub const HARD_TOLERANCE: f64 = 1e-9;

/// The re-evaluated penalty of one constraint for one schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintCheck {
    /// Display name of the constraint family.
    pub name: String,
    /// Closed-form penalty value; zero means satisfied, negative values are
    /// rewards.
    pub residual: f64,
    /// Whether a nonzero residual makes the schedule invalid.
    pub hard: bool,
}

/// Re-evaluates every constraint of the problem against a schedule.
///
/// Checks are returned in constraint declaration order. The schedule grid
/// must match the problem shape.
///
/// # Examples
///
/// ```
/// use qubo_scheduling::constraints::Constraint;
/// use qubo_scheduling::domain::{Problem, Schedule};
/// use qubo_scheduling::verify;
///
/// let problem = Problem::builder("tiny", 2, 1)
///     .with_constraint(Constraint::unique_assignment(100.0))
///     .build()
///     .unwrap();
/// let schedule = Schedule::from_grid(vec![vec![true], vec![true]]).unwrap();
///
/// let checks = verify::check(&problem, &schedule).unwrap();
/// assert_eq!(checks[0].residual, 100.0);
/// assert!(!verify::is_feasible(&checks));
/// ```
pub fn check(problem: &Problem, schedule: &Schedule) -> Result<Vec<ConstraintCheck>, Error> {
    if schedule.n_entities() != problem.n_entities() || schedule.n_slots() != problem.n_slots() {
        return Err(Error::Domain(format!(
            "schedule grid {}x{} does not match problem grid {}x{}",
            schedule.n_entities(),
            schedule.n_slots(),
            problem.n_entities(),
            problem.n_slots()
        )));
    }
    Ok(problem
        .constraints()
        .iter()
        .map(|constraint| ConstraintCheck {
            name: constraint.name().to_string(),
            residual: residual(constraint, schedule),
            hard: constraint.is_hard(),
        })
        .collect())
}

/// Returns `true` when every hard constraint's residual is zero within
/// [`HARD_TOLERANCE`].
pub fn is_feasible(checks: &[ConstraintCheck]) -> bool {
    checks
        .iter()
        .all(|check| !check.hard || check.residual.abs() <= HARD_TOLERANCE)
}

/// Sums all residuals. For a model built from the same constraints this
/// equals the energy of the decoded assignment.
pub fn total_residual(checks: &[ConstraintCheck]) -> f64 {
    checks.iter().map(|check| check.residual).sum()
}

fn residual(constraint: &Constraint, schedule: &Schedule) -> f64 {
    match constraint {
        Constraint::ConsecutiveExclusion { weight, adjacency } => {
            exclusion_residual(schedule, *weight, adjacency.as_deref())
        }
        Constraint::AggregateTarget {
            group_by,
            strength,
            target,
            weights,
            ..
        } => aggregate_residual(schedule, *group_by, *strength, *target, weights.as_deref()),
        Constraint::UniqueAssignment { penalty } => unique_residual(schedule, *penalty),
        Constraint::SkillMismatch {
            levels,
            difficulties,
            table,
        } => schedule
            .assignments()
            .map(|(entity, slot)| {
                table.bias(levels.level_of(entity), difficulties.difficulty_of(slot))
            })
            .sum(),
        Constraint::CapacityOverflow { capacity, penalty } => {
            capacity_residual(schedule, *capacity, *penalty)
        }
    }
}

fn exclusion_residual(schedule: &Schedule, weight: f64, adjacency: Option<&[(usize, usize)]>) -> f64 {
    let mut total = 0.0;
    for entity in 0..schedule.n_entities() {
        let both =
            |a: usize, b: usize| schedule.is_assigned(entity, a) && schedule.is_assigned(entity, b);
        match adjacency {
            Some(pairs) => {
                for &(a, b) in pairs {
                    if both(a, b) {
                        total += weight;
                    }
                }
            }
            None => {
                for slot in 0..schedule.n_slots().saturating_sub(1) {
                    if both(slot, slot + 1) {
                        total += weight;
                    }
                }
            }
        }
    }
    total
}

fn aggregate_residual(
    schedule: &Schedule,
    group_by: GroupBy,
    strength: f64,
    target: f64,
    weights: Option<&[f64]>,
) -> f64 {
    let mut total = 0.0;
    match group_by {
        GroupBy::Slot => {
            for slot in 0..schedule.n_slots() {
                let sum: f64 = (0..schedule.n_entities())
                    .filter(|&entity| schedule.is_assigned(entity, slot))
                    .map(|entity| weights.map_or(1.0, |w| w[entity]))
                    .sum();
                let gap = sum - target;
                total += strength * gap * gap;
            }
        }
        GroupBy::Entity => {
            for entity in 0..schedule.n_entities() {
                let sum: f64 = (0..schedule.n_slots())
                    .filter(|&slot| schedule.is_assigned(entity, slot))
                    .map(|slot| weights.map_or(1.0, |w| w[slot]))
                    .sum();
                let gap = sum - target;
                total += strength * gap * gap;
            }
        }
    }
    total
}

fn unique_residual(schedule: &Schedule, penalty: f64) -> f64 {
    let mut total = 0.0;
    for slot in 0..schedule.n_slots() {
        let assigned = (0..schedule.n_entities())
            .filter(|&entity| schedule.is_assigned(entity, slot))
            .count();
        // One penalty per clashing entity pair in the slot.
        total += penalty * (assigned * assigned.saturating_sub(1) / 2) as f64;
    }
    total
}

/// Uses the binomial form instead of re-walking subsets: each assigned pair
/// of an entity's slots lies in `C(n_slots - 2, capacity - 1)` of the
/// `(capacity + 1)`-subsets the encoder penalizes.
fn capacity_residual(schedule: &Schedule, capacity: usize, penalty: f64) -> f64 {
    let n_slots = schedule.n_slots();
    if n_slots < 2 || capacity + 1 > n_slots {
        return 0.0;
    }
    let pair_multiplicity = binomial(n_slots - 2, capacity - 1);
    schedule
        .assignment_counts()
        .into_iter()
        .map(|assigned| {
            let pairs = (assigned * assigned.saturating_sub(1) / 2) as f64;
            penalty * pairs * pair_multiplicity
        })
        .sum()
}

/// Binomial coefficient as f64; exact for the sizes this crate deals with
/// because every running prefix is itself an integer coefficient.
fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}
