//! Problem configuration, variable indexing and decoded schedules.
//!
//! A problem is a rectangular assignment grid: `n_entities` rows (nurses,
//! reviewers, workers) by `n_slots` columns (days, bills, shifts). Each
//! cell is one binary variable; [`VariableIndexer`] is the bijection between
//! cells and the flat variable ids the QUBO is written over.

use std::collections::BTreeMap;

use crate::constraints::Constraint;
use crate::error::Error;
use crate::qubo::Qubo;

/// Bijection between `(entity, slot)` cells and flat variable indices.
///
/// The flat index is `entity * n_slots + slot`, so all of an entity's slots
/// are contiguous and the inverse is a div/mod pair.
///
/// # Examples
///
/// ```
/// use qubo_scheduling::domain::VariableIndexer;
///
/// let indexer = VariableIndexer::new(3, 11);
/// assert_eq!(indexer.n_variables(), 33);
/// assert_eq!(indexer.to_index(1, 4).unwrap(), 15);
/// assert_eq!(indexer.from_index(15).unwrap(), (1, 4));
/// assert!(indexer.to_index(3, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableIndexer {
    n_entities: usize,
    n_slots: usize,
}

impl VariableIndexer {
    /// Creates an indexer for an `n_entities x n_slots` grid.
    pub fn new(n_entities: usize, n_slots: usize) -> Self {
        Self { n_entities, n_slots }
    }

    /// Returns the number of entities (grid rows).
    pub fn n_entities(&self) -> usize {
        self.n_entities
    }

    /// Returns the number of slots (grid columns).
    pub fn n_slots(&self) -> usize {
        self.n_slots
    }

    /// Returns the total number of binary variables.
    pub fn n_variables(&self) -> usize {
        self.n_entities * self.n_slots
    }

    /// Maps a cell to its flat variable index.
    pub fn to_index(&self, entity: usize, slot: usize) -> Result<usize, Error> {
        if entity >= self.n_entities {
            return Err(Error::Domain(format!(
                "entity {} out of range for {} entities",
                entity, self.n_entities
            )));
        }
        if slot >= self.n_slots {
            return Err(Error::Domain(format!(
                "slot {} out of range for {} slots",
                slot, self.n_slots
            )));
        }
        Ok(entity * self.n_slots + slot)
    }

    /// Maps a flat variable index back to its `(entity, slot)` cell.
    pub fn from_index(&self, index: usize) -> Result<(usize, usize), Error> {
        if index >= self.n_variables() {
            return Err(Error::Domain(format!(
                "variable index {} out of range for {} variables",
                index,
                self.n_variables()
            )));
        }
        Ok((index / self.n_slots, index % self.n_slots))
    }
}

/// A decoded assignment grid: `grid[entity][slot]` is `true` when the
/// entity is assigned to the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    grid: Vec<Vec<bool>>,
}

impl Schedule {
    /// Decodes a sampler result into an assignment grid.
    ///
    /// `bits` maps flat variable indices to 0/1 values; absent indices and
    /// zero bits leave their cell unassigned, so an empty sample decodes to
    /// the empty grid. An index outside the problem fails with
    /// [`Error::Decode`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use qubo_scheduling::domain::{Schedule, VariableIndexer};
    ///
    /// let indexer = VariableIndexer::new(2, 3);
    /// let bits = BTreeMap::from([(0, 1u8), (5, 1u8), (2, 0u8)]);
    /// let schedule = Schedule::from_sample(&bits, &indexer).unwrap();
    /// assert!(schedule.is_assigned(0, 0));
    /// assert!(schedule.is_assigned(1, 2));
    /// assert!(!schedule.is_assigned(0, 2));
    /// ```
    pub fn from_sample(
        bits: &BTreeMap<usize, u8>,
        indexer: &VariableIndexer,
    ) -> Result<Self, Error> {
        let mut grid = vec![vec![false; indexer.n_slots()]; indexer.n_entities()];
        for (&index, &bit) in bits {
            if bit == 0 {
                continue;
            }
            let (entity, slot) = indexer.from_index(index).map_err(|_| {
                Error::Decode(format!(
                    "sample index {} is outside the {}-variable problem",
                    index,
                    indexer.n_variables()
                ))
            })?;
            grid[entity][slot] = true;
        }
        Ok(Self { grid })
    }

    /// Builds a schedule from an explicit grid, e.g. one submitted for
    /// analysis. All rows must have the same length.
    pub fn from_grid(grid: Vec<Vec<bool>>) -> Result<Self, Error> {
        if let Some(first) = grid.first() {
            let width = first.len();
            if grid.iter().any(|row| row.len() != width) {
                return Err(Error::Domain(
                    "schedule grid rows must all have the same length".into(),
                ));
            }
        }
        Ok(Self { grid })
    }

    /// Returns the number of entities (grid rows).
    pub fn n_entities(&self) -> usize {
        self.grid.len()
    }

    /// Returns the number of slots (grid columns).
    pub fn n_slots(&self) -> usize {
        self.grid.first().map(Vec::len).unwrap_or(0)
    }

    /// Returns `true` if the entity is assigned to the slot. Out-of-range
    /// cells read as unassigned.
    pub fn is_assigned(&self, entity: usize, slot: usize) -> bool {
        self.grid
            .get(entity)
            .and_then(|row| row.get(slot))
            .copied()
            .unwrap_or(false)
    }

    /// Iterates all assigned `(entity, slot)` cells in row-major order.
    pub fn assignments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.grid.iter().enumerate().flat_map(|(entity, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, &assigned)| assigned)
                .map(move |(slot, _)| (entity, slot))
        })
    }

    /// Returns how many slots each entity is assigned to.
    pub fn assignment_counts(&self) -> Vec<usize> {
        self.grid
            .iter()
            .map(|row| row.iter().filter(|&&assigned| assigned).count())
            .collect()
    }

    /// Returns the raw grid.
    pub fn grid(&self) -> &[Vec<bool>] {
        &self.grid
    }
}

/// An immutable scheduling problem: grid shape, display labels and the
/// constraints to encode.
///
/// # Examples
///
/// ```
/// use qubo_scheduling::constraints::Constraint;
/// use qubo_scheduling::domain::Problem;
///
/// let problem = Problem::builder("Nurse rostering", 3, 11)
///     .with_constraint(Constraint::consecutive_exclusion(3.5))
///     .with_constraint(Constraint::slot_coverage(1.3, 1.0))
///     .build()
///     .unwrap();
/// assert_eq!(problem.n_variables(), 33);
/// assert_eq!(problem.constraints().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Problem {
    name: String,
    n_entities: usize,
    n_slots: usize,
    entity_labels: Vec<String>,
    constraints: Vec<Constraint>,
}

impl Problem {
    /// Starts building a problem over an `n_entities x n_slots` grid.
    pub fn builder(name: impl Into<String>, n_entities: usize, n_slots: usize) -> ProblemBuilder {
        ProblemBuilder {
            name: name.into(),
            n_entities,
            n_slots,
            entity_labels: None,
            constraints: Vec::new(),
        }
    }

    /// Returns the problem name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of entities (grid rows).
    pub fn n_entities(&self) -> usize {
        self.n_entities
    }

    /// Returns the number of slots (grid columns).
    pub fn n_slots(&self) -> usize {
        self.n_slots
    }

    /// Returns the total number of binary variables.
    pub fn n_variables(&self) -> usize {
        self.n_entities * self.n_slots
    }

    /// Returns the display label for each entity.
    pub fn entity_labels(&self) -> &[String] {
        &self.entity_labels
    }

    /// Returns the configured constraints in declaration order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns the variable indexer for this problem's grid.
    pub fn indexer(&self) -> VariableIndexer {
        VariableIndexer::new(self.n_entities, self.n_slots)
    }

    /// Encodes all constraints into one QUBO model.
    ///
    /// Families are encoded independently and merged in declaration order,
    /// so the result is deterministic for a given problem.
    pub fn build_qubo(&self) -> Result<Qubo, Error> {
        crate::constraints::encode(self)
    }
}

/// Builder for [`Problem`]. Validation happens in [`ProblemBuilder::build`],
/// before any coefficient is generated.
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    name: String,
    n_entities: usize,
    n_slots: usize,
    entity_labels: Option<Vec<String>>,
    constraints: Vec<Constraint>,
}

impl ProblemBuilder {
    /// Sets display labels for the entities; must match the entity count.
    pub fn with_entity_labels(mut self, labels: Vec<String>) -> Self {
        self.entity_labels = Some(labels);
        self
    }

    /// Appends a constraint. Declaration order is the merge order.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Validates the configuration and builds the problem.
    pub fn build(self) -> Result<Problem, Error> {
        if self.n_entities == 0 {
            return Err(Error::Configuration(
                "problem must have at least one entity".into(),
            ));
        }
        if self.n_slots == 0 {
            return Err(Error::Configuration(
                "problem must have at least one slot".into(),
            ));
        }
        let entity_labels = match self.entity_labels {
            Some(labels) => {
                if labels.len() != self.n_entities {
                    return Err(Error::Configuration(format!(
                        "expected {} entity labels, got {}",
                        self.n_entities,
                        labels.len()
                    )));
                }
                labels
            }
            None => (0..self.n_entities)
                .map(|entity| format!("Entity {}", entity))
                .collect(),
        };
        for constraint in &self.constraints {
            constraint.validate(self.n_entities, self.n_slots)?;
        }
        Ok(Problem {
            name: self.name,
            n_entities: self.n_entities,
            n_slots: self.n_slots,
            entity_labels,
            constraints: self.constraints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexer_roundtrip_covers_every_cell() {
        let indexer = VariableIndexer::new(4, 7);
        let mut seen = vec![false; indexer.n_variables()];
        for entity in 0..4 {
            for slot in 0..7 {
                let index = indexer.to_index(entity, slot).unwrap();
                assert_eq!(index, entity * 7 + slot);
                assert_eq!(indexer.from_index(index).unwrap(), (entity, slot));
                assert!(!seen[index], "index {} mapped twice", index);
                seen[index] = true;
            }
        }
        assert!(seen.into_iter().all(|hit| hit));
    }

    #[test]
    fn test_indexer_rejects_out_of_range() {
        let indexer = VariableIndexer::new(3, 11);
        assert!(matches!(indexer.to_index(3, 0), Err(Error::Domain(_))));
        assert!(matches!(indexer.to_index(0, 11), Err(Error::Domain(_))));
        assert!(matches!(indexer.from_index(33), Err(Error::Domain(_))));
    }

    #[test]
    fn test_zero_sized_indexer_has_empty_domain() {
        let indexer = VariableIndexer::new(0, 5);
        assert_eq!(indexer.n_variables(), 0);
        assert!(indexer.to_index(0, 0).is_err());
        assert!(indexer.from_index(0).is_err());
    }

    #[test]
    fn test_decode_sets_only_nonzero_bits() {
        let indexer = VariableIndexer::new(3, 4);
        let bits = BTreeMap::from([(0, 1u8), (7, 1u8), (9, 0u8)]);
        let schedule = Schedule::from_sample(&bits, &indexer).unwrap();

        assert!(schedule.is_assigned(0, 0));
        assert!(schedule.is_assigned(1, 3));
        assert!(!schedule.is_assigned(2, 1));
        assert_eq!(schedule.assignment_counts(), vec![1, 1, 0]);
        assert_eq!(
            schedule.assignments().collect::<Vec<_>>(),
            vec![(0, 0), (1, 3)]
        );
    }

    #[test]
    fn test_decode_empty_sample_is_empty_grid() {
        let indexer = VariableIndexer::new(2, 2);
        let schedule = Schedule::from_sample(&BTreeMap::new(), &indexer).unwrap();
        assert_eq!(schedule.assignment_counts(), vec![0, 0]);
    }

    #[test]
    fn test_decode_rejects_foreign_index() {
        let indexer = VariableIndexer::new(2, 3);
        let bits = BTreeMap::from([(6, 1u8)]);
        assert!(matches!(
            Schedule::from_sample(&bits, &indexer),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let indexer = VariableIndexer::new(3, 11);
        let bits = BTreeMap::from([(0, 1u8), (12, 1u8), (32, 1u8)]);
        let first = Schedule::from_sample(&bits, &indexer).unwrap();
        let second = Schedule::from_sample(&bits, &indexer).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_grid_rejects_ragged_rows() {
        let grid = vec![vec![true, false], vec![true]];
        assert!(matches!(Schedule::from_grid(grid), Err(Error::Domain(_))));
    }

    #[test]
    fn test_builder_rejects_zero_axes() {
        assert!(matches!(
            Problem::builder("empty", 0, 5).build(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Problem::builder("empty", 5, 0).build(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_builder_checks_label_count() {
        let result = Problem::builder("labels", 3, 2)
            .with_entity_labels(vec!["A".into(), "B".into()])
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_builder_generates_default_labels() {
        let problem = Problem::builder("plain", 2, 2).build().unwrap();
        assert_eq!(problem.entity_labels(), ["Entity 0", "Entity 1"]);
    }
}
