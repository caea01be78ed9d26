//! Sparse QUBO accumulation and the finished model.
//!
//! A QUBO is a map from unordered variable pairs to coefficients plus a
//! constant energy offset. [`QuboBuilder`] is the additive accumulator the
//! constraint encoders write into; [`Qubo`] is the immutable result handed
//! to samplers.

use std::collections::BTreeMap;

/// Additive accumulator for QUBO coefficients.
///
/// Keys are canonicalized to `(min, max)` so `(i, j)` and `(j, i)` address
/// the same coefficient, and contributions always add, never overwrite.
/// Several builders (one per constraint family) can be merged into one.
///
/// # Examples
///
/// ```
/// use qubo_scheduling::qubo::QuboBuilder;
///
/// let mut builder = QuboBuilder::new();
/// builder.add(2, 1, 0.5);
/// builder.add(1, 2, 0.25);
/// assert_eq!(builder.coefficient(1, 2), 0.75);
/// assert_eq!(builder.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuboBuilder {
    terms: BTreeMap<(usize, usize), f64>,
    offset: f64,
}

impl QuboBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            terms: BTreeMap::new(),
            offset: 0.0,
        }
    }

    /// Adds `value` to the coefficient of the unordered pair `(i, j)`.
    ///
    /// `i == j` addresses the diagonal (linear) coefficient of variable `i`.
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        let key = if i <= j { (i, j) } else { (j, i) };
        *self.terms.entry(key).or_insert(0.0) += value;
    }

    /// Adds `value` to the constant energy offset.
    pub fn add_offset(&mut self, value: f64) {
        self.offset += value;
    }

    /// Folds another builder into this one, summing shared coefficients
    /// and offsets.
    pub fn merge(&mut self, other: QuboBuilder) {
        for ((i, j), value) in other.terms {
            *self.terms.entry((i, j)).or_insert(0.0) += value;
        }
        self.offset += other.offset;
    }

    /// Returns the accumulated coefficient for `(i, j)`, or zero if the
    /// pair was never touched.
    pub fn coefficient(&self, i: usize, j: usize) -> f64 {
        let key = if i <= j { (i, j) } else { (j, i) };
        self.terms.get(&key).copied().unwrap_or(0.0)
    }

    /// Returns the accumulated offset.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Returns the number of distinct coefficient entries.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if no coefficient has been touched.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Finishes accumulation, recording the model size.
    pub fn build(self, n_variables: usize) -> Qubo {
        Qubo {
            n_variables,
            terms: self.terms,
            offset: self.offset,
        }
    }
}

/// An assembled QUBO model: sparse coefficients over `n_variables` binary
/// variables plus a constant offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Qubo {
    n_variables: usize,
    terms: BTreeMap<(usize, usize), f64>,
    offset: f64,
}

impl Qubo {
    /// Returns the number of binary variables the model is defined over.
    pub fn n_variables(&self) -> usize {
        self.n_variables
    }

    /// Returns the constant energy offset.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Returns the number of stored coefficient entries.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if the model has no coefficients.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns the coefficient for the unordered pair `(i, j)`, or zero.
    pub fn coefficient(&self, i: usize, j: usize) -> f64 {
        let key = if i <= j { (i, j) } else { (j, i) };
        self.terms.get(&key).copied().unwrap_or(0.0)
    }

    /// Iterates the coefficients in ascending `(i, j)` key order.
    pub fn terms(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.terms.iter().map(|(&key, &value)| (key, value))
    }

    /// Evaluates the model energy for a sample.
    ///
    /// `bits` maps variable index to a 0/1 value; absent indices count as 0.
    /// The result is `sum of Q[i,j] * x_i * x_j` over the stored terms plus
    /// the offset, so a zero-penalty assignment evaluates to exactly the
    /// offset contributed by the soft targets.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use qubo_scheduling::qubo::QuboBuilder;
    ///
    /// let mut builder = QuboBuilder::new();
    /// builder.add(0, 0, -1.0); // linear term on x0
    /// builder.add(0, 1, 2.0);
    /// builder.add_offset(0.5);
    /// let qubo = builder.build(2);
    ///
    /// let bits = BTreeMap::from([(0, 1u8), (1, 1u8)]);
    /// assert_eq!(qubo.energy(&bits), -1.0 + 2.0 + 0.5);
    ///
    /// let bits = BTreeMap::from([(0, 1u8)]);
    /// assert_eq!(qubo.energy(&bits), -1.0 + 0.5);
    /// ```
    pub fn energy(&self, bits: &BTreeMap<usize, u8>) -> f64 {
        let set = |index: usize| bits.get(&index).copied().unwrap_or(0) != 0;
        let mut total = self.offset;
        for (&(i, j), &value) in &self.terms {
            if set(i) && set(j) {
                total += value;
            }
        }
        total
    }

    /// Projects the sparse map into a dense upper-triangular matrix, for
    /// samplers that take a full `n x n` coefficient matrix.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let mut matrix = vec![vec![0.0; self.n_variables]; self.n_variables];
        for (&(i, j), &value) in &self.terms {
            matrix[i][j] += value;
        }
        matrix
    }
}
