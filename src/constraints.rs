//! Constraint families and their QUBO encodings.
//!
//! Each family turns one scheduling rule into quadratic coefficients on the
//! shared variable grid. Families are encoded independently into local
//! accumulators and merged in declaration order, so the assembled model is
//! deterministic and each family's contribution is purely additive.

use rayon::prelude::*;

use crate::domain::{Problem, VariableIndexer};
use crate::error::Error;
use crate::qubo::{Qubo, QuboBuilder};

/// Which axis an aggregate-equality constraint groups by.
///
/// Grouping by [`GroupBy::Slot`] targets how many entities cover each slot;
/// grouping by [`GroupBy::Entity`] targets how many slots each entity takes.
/// The penalty algebra is identical, only the axis is swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Slot,
    Entity,
}

/// Entity skill level, assigned by position: the leading entities are
/// senior, then intermediate, then junior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Senior,
    Intermediate,
    Junior,
}

/// Slot difficulty, assigned by position: the leading slots are hard,
/// then medium, then easy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Hard,
    Medium,
    Easy,
}

/// Contiguous skill-level buckets over the entity axis.
///
/// # Examples
///
/// ```
/// use qubo_scheduling::constraints::{Level, LevelBuckets};
///
/// let buckets = LevelBuckets::new(1, 3, 2);
/// assert_eq!(buckets.level_of(0), Level::Senior);
/// assert_eq!(buckets.level_of(2), Level::Intermediate);
/// assert_eq!(buckets.level_of(5), Level::Junior);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelBuckets {
    pub senior: usize,
    pub intermediate: usize,
    pub junior: usize,
}

impl LevelBuckets {
    /// Creates buckets of `senior`, then `intermediate`, then `junior`
    /// entities, in that index order.
    pub fn new(senior: usize, intermediate: usize, junior: usize) -> Self {
        Self {
            senior,
            intermediate,
            junior,
        }
    }

    /// Returns the total number of bucketed entities.
    pub fn total(&self) -> usize {
        self.senior + self.intermediate + self.junior
    }

    /// Returns the level of an entity by its index.
    #[inline]
    pub fn level_of(&self, entity: usize) -> Level {
        if entity < self.senior {
            Level::Senior
        } else if entity < self.senior + self.intermediate {
            Level::Intermediate
        } else {
            Level::Junior
        }
    }
}

/// Contiguous difficulty buckets over the slot axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyBuckets {
    pub hard: usize,
    pub medium: usize,
    pub easy: usize,
}

impl DifficultyBuckets {
    /// Creates buckets of `hard`, then `medium`, then `easy` slots, in that
    /// index order.
    pub fn new(hard: usize, medium: usize, easy: usize) -> Self {
        Self { hard, medium, easy }
    }

    /// Returns the total number of bucketed slots.
    pub fn total(&self) -> usize {
        self.hard + self.medium + self.easy
    }

    /// Returns the difficulty of a slot by its index.
    #[inline]
    pub fn difficulty_of(&self, slot: usize) -> Difficulty {
        if slot < self.hard {
            Difficulty::Hard
        } else if slot < self.hard + self.medium {
            Difficulty::Medium
        } else {
            Difficulty::Easy
        }
    }
}

/// Diagonal bias per (level, difficulty) combination: negative rewards for
/// acceptable pairings, positive penalties for mismatches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MismatchTable {
    /// Bias for an acceptable pairing.
    pub reward: f64,
    /// Penalty for a junior entity on a medium or hard slot.
    pub junior_mismatch: f64,
    /// Penalty for an intermediate entity on a hard slot.
    pub intermediate_on_hard: f64,
    /// Penalty for a senior entity wasted on an easy or medium slot.
    pub senior_mismatch: f64,
}

impl MismatchTable {
    /// Returns the diagonal bias for assigning `level` to `difficulty`.
    #[inline]
    pub fn bias(&self, level: Level, difficulty: Difficulty) -> f64 {
        match (level, difficulty) {
            (Level::Junior, Difficulty::Easy) => self.reward,
            (Level::Junior, _) => self.junior_mismatch,
            (Level::Intermediate, Difficulty::Hard) => self.intermediate_on_hard,
            (Level::Intermediate, _) => self.reward,
            (Level::Senior, Difficulty::Hard) => self.reward,
            (Level::Senior, _) => self.senior_mismatch,
        }
    }
}

impl Default for MismatchTable {
    fn default() -> Self {
        Self {
            reward: -100.0,
            junior_mismatch: 10_000.0,
            intermediate_on_hard: 5_000.0,
            senior_mismatch: 100_000.0,
        }
    }
}

/// One scheduling rule, with the parameters of its QUBO encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// An entity must not hold both slots of an adjacent pair. Hard, encoded
    /// directly as a positive coefficient on each in-row pair.
    ConsecutiveExclusion {
        weight: f64,
        /// Slot pairs that exclude each other; `None` means every
        /// consecutive `(s, s + 1)` pair.
        adjacency: Option<Vec<(usize, usize)>>,
    },
    /// The weighted sum over one axis of each group must equal `target`,
    /// encoded as the expansion of `strength * (sum - target)^2` per group.
    AggregateTarget {
        group_by: GroupBy,
        strength: f64,
        target: f64,
        /// Per-member weights along the grouped axis; `None` means all ones.
        weights: Option<Vec<f64>>,
        /// Whether the verifier treats a nonzero residual as infeasible.
        hard: bool,
    },
    /// At most one entity per slot, encoded as a large penalty on every
    /// same-slot entity pair. Hard.
    UniqueAssignment { penalty: f64 },
    /// Diagonal bias steering skill levels toward matching difficulties.
    SkillMismatch {
        levels: LevelBuckets,
        difficulties: DifficultyBuckets,
        table: MismatchTable,
    },
    /// Discourages any entity from taking more than `capacity` slots, via a
    /// penalty on every pair within every `(capacity + 1)`-subset of slots.
    CapacityOverflow { capacity: usize, penalty: f64 },
}

impl Constraint {
    /// Exclusion of consecutive slot pairs `(s, s + 1)` per entity.
    pub fn consecutive_exclusion(weight: f64) -> Self {
        Constraint::ConsecutiveExclusion {
            weight,
            adjacency: None,
        }
    }

    /// Exclusion of an explicit slot adjacency list per entity.
    pub fn consecutive_exclusion_between(weight: f64, adjacency: Vec<(usize, usize)>) -> Self {
        Constraint::ConsecutiveExclusion {
            weight,
            adjacency: Some(adjacency),
        }
    }

    /// Hard coverage: every slot staffed by exactly `target` entities.
    pub fn slot_coverage(strength: f64, target: f64) -> Self {
        Constraint::AggregateTarget {
            group_by: GroupBy::Slot,
            strength,
            target,
            weights: None,
            hard: true,
        }
    }

    /// Hard coverage with a per-entity contribution weight (e.g. effort).
    pub fn slot_coverage_weighted(strength: f64, target: f64, weights: Vec<f64>) -> Self {
        Constraint::AggregateTarget {
            group_by: GroupBy::Slot,
            strength,
            target,
            weights: Some(weights),
            hard: true,
        }
    }

    /// Soft balance: every entity nudged toward `target` slots.
    pub fn workload_balance(strength: f64, target: f64) -> Self {
        Constraint::AggregateTarget {
            group_by: GroupBy::Entity,
            strength,
            target,
            weights: None,
            hard: false,
        }
    }

    /// Soft balance with a per-slot contribution weight (e.g. preference).
    pub fn workload_balance_weighted(strength: f64, target: f64, weights: Vec<f64>) -> Self {
        Constraint::AggregateTarget {
            group_by: GroupBy::Entity,
            strength,
            target,
            weights: Some(weights),
            hard: false,
        }
    }

    /// At most one entity per slot.
    pub fn unique_assignment(penalty: f64) -> Self {
        Constraint::UniqueAssignment { penalty }
    }

    /// Skill/difficulty steering with the default bias table.
    pub fn skill_mismatch(levels: LevelBuckets, difficulties: DifficultyBuckets) -> Self {
        Constraint::SkillMismatch {
            levels,
            difficulties,
            table: MismatchTable::default(),
        }
    }

    /// Skill/difficulty steering with an explicit bias table.
    pub fn skill_mismatch_with_table(
        levels: LevelBuckets,
        difficulties: DifficultyBuckets,
        table: MismatchTable,
    ) -> Self {
        Constraint::SkillMismatch {
            levels,
            difficulties,
            table,
        }
    }

    /// Per-entity workload cap of `capacity` slots.
    pub fn capacity_overflow(capacity: usize, penalty: f64) -> Self {
        Constraint::CapacityOverflow { capacity, penalty }
    }

    /// Returns the display name used in reports and check lines.
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::ConsecutiveExclusion { .. } => "Consecutive exclusion",
            Constraint::AggregateTarget {
                group_by: GroupBy::Slot,
                ..
            } => "Slot coverage",
            Constraint::AggregateTarget {
                group_by: GroupBy::Entity,
                ..
            } => "Workload balance",
            Constraint::UniqueAssignment { .. } => "Unique assignment",
            Constraint::SkillMismatch { .. } => "Skill mismatch",
            Constraint::CapacityOverflow { .. } => "Capacity overflow",
        }
    }

    /// Returns `true` if a nonzero residual means the schedule is invalid.
    pub fn is_hard(&self) -> bool {
        match self {
            Constraint::ConsecutiveExclusion { .. } | Constraint::UniqueAssignment { .. } => true,
            Constraint::AggregateTarget { hard, .. } => *hard,
            Constraint::SkillMismatch { .. } | Constraint::CapacityOverflow { .. } => false,
        }
    }

    /// Checks the constraint's parameters against the problem shape.
    pub(crate) fn validate(&self, n_entities: usize, n_slots: usize) -> Result<(), Error> {
        match self {
            Constraint::ConsecutiveExclusion { adjacency, .. } => {
                if let Some(pairs) = adjacency {
                    for &(a, b) in pairs {
                        if a >= n_slots || b >= n_slots {
                            return Err(Error::Configuration(format!(
                                "adjacent pair ({}, {}) out of range for {} slots",
                                a, b, n_slots
                            )));
                        }
                        if a == b {
                            return Err(Error::Configuration(format!(
                                "adjacent pair ({}, {}) must name two different slots",
                                a, b
                            )));
                        }
                    }
                }
                Ok(())
            }
            Constraint::AggregateTarget {
                group_by, weights, ..
            } => {
                if let Some(weights) = weights {
                    let expected = match group_by {
                        GroupBy::Slot => n_entities,
                        GroupBy::Entity => n_slots,
                    };
                    if weights.len() != expected {
                        return Err(Error::Configuration(format!(
                            "expected {} aggregate weights, got {}",
                            expected,
                            weights.len()
                        )));
                    }
                }
                Ok(())
            }
            Constraint::UniqueAssignment { .. } => Ok(()),
            Constraint::SkillMismatch {
                levels,
                difficulties,
                ..
            } => {
                if levels.total() != n_entities {
                    return Err(Error::Configuration(format!(
                        "level buckets cover {} entities, problem has {}",
                        levels.total(),
                        n_entities
                    )));
                }
                if difficulties.total() != n_slots {
                    return Err(Error::Configuration(format!(
                        "difficulty buckets cover {} slots, problem has {}",
                        difficulties.total(),
                        n_slots
                    )));
                }
                Ok(())
            }
            Constraint::CapacityOverflow { capacity, .. } => {
                if *capacity == 0 {
                    return Err(Error::Configuration(
                        "capacity must be at least 1".into(),
                    ));
                }
                if *capacity > n_slots {
                    return Err(Error::Configuration(format!(
                        "capacity {} exceeds the {} available slots",
                        capacity, n_slots
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Encodes every constraint of a validated problem into one QUBO.
pub(crate) fn encode(problem: &Problem) -> Result<Qubo, Error> {
    let indexer = problem.indexer();
    let builders: Vec<QuboBuilder> = problem
        .constraints()
        .par_iter()
        .map(|constraint| encode_constraint(constraint, &indexer))
        .collect::<Result<Vec<_>, Error>>()?;

    // Merge order is declaration order; addition makes the result
    // independent of which family finished encoding first.
    let mut merged = QuboBuilder::new();
    for builder in builders {
        merged.merge(builder);
    }
    Ok(merged.build(indexer.n_variables()))
}

fn encode_constraint(
    constraint: &Constraint,
    indexer: &VariableIndexer,
) -> Result<QuboBuilder, Error> {
    let mut builder = QuboBuilder::new();
    match constraint {
        Constraint::ConsecutiveExclusion { weight, adjacency } => {
            encode_consecutive_exclusion(&mut builder, indexer, *weight, adjacency.as_deref())?;
        }
        Constraint::AggregateTarget {
            group_by,
            strength,
            target,
            weights,
            ..
        } => {
            encode_aggregate_target(
                &mut builder,
                indexer,
                *group_by,
                *strength,
                *target,
                weights.as_deref(),
            )?;
        }
        Constraint::UniqueAssignment { penalty } => {
            encode_unique_assignment(&mut builder, indexer, *penalty)?;
        }
        Constraint::SkillMismatch {
            levels,
            difficulties,
            table,
        } => {
            encode_skill_mismatch(&mut builder, indexer, levels, difficulties, table)?;
        }
        Constraint::CapacityOverflow { capacity, penalty } => {
            encode_capacity_overflow(&mut builder, indexer, *capacity, *penalty)?;
        }
    }
    Ok(builder)
}

// ============================================================================
// Consecutive exclusion
// ============================================================================

fn encode_consecutive_exclusion(
    builder: &mut QuboBuilder,
    indexer: &VariableIndexer,
    weight: f64,
    adjacency: Option<&[(usize, usize)]>,
) -> Result<(), Error> {
    let pairs: Vec<(usize, usize)> = match adjacency {
        Some(pairs) => pairs.to_vec(),
        None => (0..indexer.n_slots().saturating_sub(1))
            .map(|slot| (slot, slot + 1))
            .collect(),
    };
    for entity in 0..indexer.n_entities() {
        for &(a, b) in &pairs {
            let i = indexer.to_index(entity, a)?;
            let j = indexer.to_index(entity, b)?;
            builder.add(i, j, weight);
        }
    }
    Ok(())
}

// ============================================================================
// Aggregate equality (coverage / balance)
// ============================================================================

/// Expands `strength * (sum of w * x - target)^2` for each group: a diagonal
/// term `strength * (w^2 - 2 * target * w)` per member, a cross term
/// `2 * strength * w_a * w_b` per member pair, and `strength * target^2` on
/// the offset per group. The constant offset makes a satisfied group
/// contribute exactly zero energy.
fn encode_aggregate_target(
    builder: &mut QuboBuilder,
    indexer: &VariableIndexer,
    group_by: GroupBy,
    strength: f64,
    target: f64,
    weights: Option<&[f64]>,
) -> Result<(), Error> {
    let (n_groups, n_members) = match group_by {
        GroupBy::Slot => (indexer.n_slots(), indexer.n_entities()),
        GroupBy::Entity => (indexer.n_entities(), indexer.n_slots()),
    };
    let cell = |group: usize, member: usize| match group_by {
        GroupBy::Slot => (member, group),
        GroupBy::Entity => (group, member),
    };
    let weight_of = |member: usize| weights.map_or(1.0, |w| w[member]);

    for group in 0..n_groups {
        for member in 0..n_members {
            let w = weight_of(member);
            let (entity, slot) = cell(group, member);
            let i = indexer.to_index(entity, slot)?;
            builder.add(i, i, strength * (w * w - 2.0 * target * w));

            for other in member + 1..n_members {
                let (entity, slot) = cell(group, other);
                let j = indexer.to_index(entity, slot)?;
                builder.add(i, j, 2.0 * strength * w * weight_of(other));
            }
        }
        builder.add_offset(strength * target * target);
    }
    Ok(())
}

// ============================================================================
// Unique assignment
// ============================================================================

fn encode_unique_assignment(
    builder: &mut QuboBuilder,
    indexer: &VariableIndexer,
    penalty: f64,
) -> Result<(), Error> {
    // Exactly one contribution per (slot, entity pair).
    for slot in 0..indexer.n_slots() {
        for entity in 0..indexer.n_entities() {
            let i = indexer.to_index(entity, slot)?;
            for other in entity + 1..indexer.n_entities() {
                let j = indexer.to_index(other, slot)?;
                builder.add(i, j, penalty);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Skill mismatch
// ============================================================================

fn encode_skill_mismatch(
    builder: &mut QuboBuilder,
    indexer: &VariableIndexer,
    levels: &LevelBuckets,
    difficulties: &DifficultyBuckets,
    table: &MismatchTable,
) -> Result<(), Error> {
    for entity in 0..indexer.n_entities() {
        let level = levels.level_of(entity);
        for slot in 0..indexer.n_slots() {
            let i = indexer.to_index(entity, slot)?;
            builder.add(i, i, table.bias(level, difficulties.difficulty_of(slot)));
        }
    }
    Ok(())
}

// ============================================================================
// Capacity overflow
// ============================================================================

/// The subset walk is `O(n_slots choose capacity + 1)` per entity, so this
/// family only suits small capacities relative to the slot count.
fn encode_capacity_overflow(
    builder: &mut QuboBuilder,
    indexer: &VariableIndexer,
    capacity: usize,
    penalty: f64,
) -> Result<(), Error> {
    let n_slots = indexer.n_slots();
    if capacity + 1 > n_slots {
        // capacity == n_slots cannot be exceeded; nothing to encode
        return Ok(());
    }
    for entity in 0..indexer.n_entities() {
        for subset in Combinations::new(n_slots, capacity + 1) {
            for (pos, &a) in subset.iter().enumerate() {
                let i = indexer.to_index(entity, a)?;
                for &b in &subset[pos + 1..] {
                    let j = indexer.to_index(entity, b)?;
                    builder.add(i, j, penalty);
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Iterates all k-element subsets of `0..n` in lexicographic order.
struct Combinations {
    n: usize,
    k: usize,
    current: Vec<usize>,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            current: (0..k).collect(),
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let result = self.current.clone();
        let mut pos = self.k;
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            // position can advance if room remains for the tail after it
            if self.current[pos] + (self.k - pos) < self.n {
                self.current[pos] += 1;
                for later in pos + 1..self.k {
                    self.current[later] = self.current[later - 1] + 1;
                }
                break;
            }
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Problem;

    fn qubo_for(n_entities: usize, n_slots: usize, constraint: Constraint) -> Qubo {
        Problem::builder("test", n_entities, n_slots)
            .with_constraint(constraint)
            .build()
            .unwrap()
            .build_qubo()
            .unwrap()
    }

    #[test]
    fn test_consecutive_exclusion_penalizes_adjacent_pairs() {
        let qubo = qubo_for(2, 3, Constraint::consecutive_exclusion(3.5));

        // Two (s, s+1) pairs per entity, nothing else.
        assert_eq!(qubo.len(), 4);
        assert_eq!(qubo.coefficient(0, 1), 3.5);
        assert_eq!(qubo.coefficient(1, 2), 3.5);
        assert_eq!(qubo.coefficient(3, 4), 3.5);
        assert_eq!(qubo.coefficient(4, 5), 3.5);
        assert_eq!(qubo.coefficient(0, 2), 0.0);
        assert_eq!(qubo.coefficient(0, 0), 0.0);
        assert_eq!(qubo.offset(), 0.0);
    }

    #[test]
    fn test_consecutive_exclusion_with_custom_adjacency() {
        let qubo = qubo_for(
            1,
            3,
            Constraint::consecutive_exclusion_between(2.0, vec![(0, 2)]),
        );
        assert_eq!(qubo.len(), 1);
        assert_eq!(qubo.coefficient(0, 2), 2.0);
        assert_eq!(qubo.coefficient(0, 1), 0.0);
    }

    #[test]
    fn test_slot_coverage_expansion() {
        // strength * (sum - target)^2 per slot, expanded over 2 entities.
        let qubo = qubo_for(2, 2, Constraint::slot_coverage(1.3, 1.0));

        for index in 0..4 {
            let diagonal = qubo.coefficient(index, index);
            assert!((diagonal - 1.3 * (1.0 - 2.0)).abs() < 1e-12);
        }
        // Same-slot entity pairs: (0,2) and (1,3) under row-major indexing.
        assert!((qubo.coefficient(0, 2) - 2.6).abs() < 1e-12);
        assert!((qubo.coefficient(1, 3) - 2.6).abs() < 1e-12);
        assert_eq!(qubo.coefficient(0, 1), 0.0);
        // One strength * target^2 per slot.
        assert!((qubo.offset() - 2.6).abs() < 1e-12);
    }

    #[test]
    fn test_workload_balance_groups_by_entity() {
        let qubo = qubo_for(2, 2, Constraint::workload_balance(0.3, 3.0));

        for index in 0..4 {
            let diagonal = qubo.coefficient(index, index);
            assert!((diagonal - 0.3 * (1.0 - 6.0)).abs() < 1e-12);
        }
        // Same-entity slot pairs: (0,1) and (2,3).
        assert!((qubo.coefficient(0, 1) - 0.6).abs() < 1e-12);
        assert!((qubo.coefficient(2, 3) - 0.6).abs() < 1e-12);
        assert_eq!(qubo.coefficient(0, 2), 0.0);
        assert!((qubo.offset() - 0.3 * 9.0 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_aggregate_uses_member_weights() {
        let qubo = qubo_for(
            2,
            1,
            Constraint::slot_coverage_weighted(1.0, 4.0, vec![2.0, 3.0]),
        );

        assert!((qubo.coefficient(0, 0) - (4.0 - 16.0)).abs() < 1e-12);
        assert!((qubo.coefficient(1, 1) - (9.0 - 24.0)).abs() < 1e-12);
        assert!((qubo.coefficient(0, 1) - 12.0).abs() < 1e-12);
        assert!((qubo.offset() - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_unique_assignment_adds_once_per_pair() {
        let qubo = qubo_for(3, 2, Constraint::unique_assignment(20_000.0));

        // Three entity pairs per slot, two slots. The coefficient must be
        // the penalty exactly once, not once per grid variable.
        assert_eq!(qubo.len(), 6);
        assert_eq!(qubo.coefficient(0, 2), 20_000.0);
        assert_eq!(qubo.coefficient(0, 4), 20_000.0);
        assert_eq!(qubo.coefficient(2, 4), 20_000.0);
        assert_eq!(qubo.coefficient(1, 3), 20_000.0);
        assert_eq!(qubo.coefficient(1, 5), 20_000.0);
        assert_eq!(qubo.coefficient(3, 5), 20_000.0);
    }

    #[test]
    fn test_skill_mismatch_biases_follow_buckets() {
        // 1 senior, 3 intermediate, 2 junior over 3 hard, 4 medium, 3 easy.
        let qubo = qubo_for(
            6,
            10,
            Constraint::skill_mismatch(
                LevelBuckets::new(1, 3, 2),
                DifficultyBuckets::new(3, 4, 3),
            ),
        );

        let diag = |entity: usize, slot: usize| {
            let index = entity * 10 + slot;
            qubo.coefficient(index, index)
        };
        assert_eq!(diag(0, 0), -100.0); // senior on hard
        assert_eq!(diag(0, 9), 100_000.0); // senior on easy
        assert_eq!(diag(0, 3), 100_000.0); // senior on medium
        assert_eq!(diag(1, 0), 5_000.0); // intermediate on hard
        assert_eq!(diag(1, 3), -100.0); // intermediate on medium
        assert_eq!(diag(4, 7), -100.0); // junior on easy
        assert_eq!(diag(4, 3), 10_000.0); // junior on medium
        assert_eq!(diag(5, 0), 10_000.0); // junior on hard
    }

    #[test]
    fn test_capacity_overflow_penalizes_pairs_in_each_subset() {
        let qubo = qubo_for(1, 3, Constraint::capacity_overflow(1, 0.5));

        // Subsets of size 2 from 3 slots: each pair appears in exactly one.
        assert_eq!(qubo.len(), 3);
        assert_eq!(qubo.coefficient(0, 1), 0.5);
        assert_eq!(qubo.coefficient(0, 2), 0.5);
        assert_eq!(qubo.coefficient(1, 2), 0.5);
        assert_eq!(qubo.coefficient(0, 0), 0.0);
    }

    #[test]
    fn test_capacity_overflow_counts_containing_subsets() {
        let qubo = qubo_for(1, 4, Constraint::capacity_overflow(2, 1.0));

        // Each pair lies in C(4 - 2, 3 - 2) = 2 of the 3-subsets.
        assert_eq!(qubo.len(), 6);
        assert_eq!(qubo.coefficient(0, 1), 2.0);
        assert_eq!(qubo.coefficient(2, 3), 2.0);
    }

    #[test]
    fn test_capacity_equal_to_slot_count_encodes_nothing() {
        let qubo = qubo_for(2, 3, Constraint::capacity_overflow(3, 0.5));
        assert!(qubo.is_empty());
        assert_eq!(qubo.offset(), 0.0);
    }

    #[test]
    fn test_validation_rejects_bad_parameters() {
        let build = |n_entities, n_slots, constraint| {
            Problem::builder("bad", n_entities, n_slots)
                .with_constraint(constraint)
                .build()
        };

        assert!(matches!(
            build(2, 3, Constraint::capacity_overflow(0, 1.0)),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            build(2, 3, Constraint::capacity_overflow(4, 1.0)),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            build(
                2,
                3,
                Constraint::skill_mismatch(
                    LevelBuckets::new(1, 1, 1),
                    DifficultyBuckets::new(1, 1, 1)
                )
            ),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            build(
                2,
                3,
                Constraint::slot_coverage_weighted(1.0, 1.0, vec![1.0, 1.0, 1.0])
            ),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            build(
                2,
                3,
                Constraint::consecutive_exclusion_between(1.0, vec![(0, 3)])
            ),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            build(
                2,
                3,
                Constraint::consecutive_exclusion_between(1.0, vec![(1, 1)])
            ),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_families_accumulate_additively() {
        let problem = Problem::builder("stacked", 2, 2)
            .with_constraint(Constraint::slot_coverage(1.3, 1.0))
            .with_constraint(Constraint::unique_assignment(100.0))
            .build()
            .unwrap();
        let qubo = problem.build_qubo().unwrap();

        // Same-slot entity pair carries coverage cross term plus uniqueness.
        assert!((qubo.coefficient(0, 2) - (2.6 + 100.0)).abs() < 1e-12);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let problem = Problem::builder("repeat", 3, 5)
            .with_constraint(Constraint::consecutive_exclusion(3.5))
            .with_constraint(Constraint::slot_coverage(1.3, 1.0))
            .with_constraint(Constraint::workload_balance(0.3, 2.0))
            .with_constraint(Constraint::unique_assignment(50.0))
            .with_constraint(Constraint::capacity_overflow(2, 0.5))
            .build()
            .unwrap();

        let first = problem.build_qubo().unwrap();
        let second = problem.build_qubo().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.terms().collect::<Vec<_>>(),
            second.terms().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_empty_constraint_list_gives_empty_model() {
        let problem = Problem::builder("empty", 2, 2).build().unwrap();
        let qubo = problem.build_qubo().unwrap();
        assert!(qubo.is_empty());
        assert_eq!(qubo.offset(), 0.0);
        assert_eq!(qubo.n_variables(), 4);
    }

    #[test]
    fn test_combinations_enumerates_lexicographically() {
        let subsets: Vec<Vec<usize>> = Combinations::new(4, 2).collect();
        assert_eq!(subsets.len(), 6);
        assert_eq!(subsets[0], vec![0, 1]);
        assert_eq!(subsets[5], vec![2, 3]);

        assert_eq!(Combinations::new(5, 3).count(), 10);
        assert_eq!(Combinations::new(3, 0).count(), 1);
        assert_eq!(Combinations::new(2, 3).count(), 0);
    }
}
