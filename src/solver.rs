//! Solve pipeline and job management.
//!
//! The pipeline encodes a problem into a QUBO, hands the model to a
//! [`Sampler`], decodes the returned sample into a schedule and verifies it
//! against the original constraints. Minimization itself always happens
//! behind the trait; this crate never implements an optimizer.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::console;
use crate::domain::{Problem, Schedule, VariableIndexer};
use crate::error::Error;
use crate::qubo::Qubo;
use crate::verify::{self, ConstraintCheck};

/// Default sampler time limit: 30 seconds.
const DEFAULT_TIME_LIMIT_SECS: u64 = 30;

/// Sampler run configuration.
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Time limit passed through to the sampler backend.
    pub time_limit: Option<Duration>,
    /// Label attached to the submission, for backend-side bookkeeping.
    pub label: Option<String>,
}

impl SolverConfig {
    /// Creates a config with the default 30-second time limit.
    pub fn default_config() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(DEFAULT_TIME_LIMIT_SECS)),
            ..Default::default()
        }
    }

    /// Sets the submission label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the sampler time limit.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}

/// One sampler result: a bit per variable index and the energy the backend
/// reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Variable index to 0/1 value; absent indices read as 0.
    pub bits: BTreeMap<usize, u8>,
    /// Backend-reported energy, passed through without re-evaluation.
    pub energy: f64,
}

/// Error type for sampler backends.
#[derive(Debug)]
pub enum SamplerError {
    /// The backend could not be reached.
    Network(String),
    /// The backend answered with something unusable.
    Protocol(String),
    /// The backend refused the submission.
    Rejected(String),
}

impl std::fmt::Display for SamplerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerError::Network(msg) => write!(f, "Network error: {}", msg),
            SamplerError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            SamplerError::Rejected(msg) => write!(f, "Rejected by sampler: {}", msg),
        }
    }
}

impl std::error::Error for SamplerError {}

impl From<SamplerError> for Error {
    fn from(err: SamplerError) -> Self {
        Error::SolverUnavailable(err.to_string())
    }
}

/// A backend that draws low-energy samples from a QUBO model.
pub trait Sampler: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Submits the model and returns one sample.
    fn sample(&self, qubo: &Qubo, config: &SolverConfig) -> Result<Sample, SamplerError>;
}

/// Sampler that returns a canned assignment, with the energy evaluated from
/// the submitted model. It performs no minimization; tests and offline demos
/// use it to drive the full pipeline without a backend.
#[derive(Debug, Clone, Default)]
pub struct FixedSampler {
    bits: BTreeMap<usize, u8>,
}

impl FixedSampler {
    /// Creates a sampler that always returns `bits`.
    pub fn new(bits: BTreeMap<usize, u8>) -> Self {
        Self { bits }
    }

    /// Creates a sampler from assigned `(entity, slot)` cells.
    pub fn from_cells(cells: &[(usize, usize)], indexer: &VariableIndexer) -> Result<Self, Error> {
        let mut bits = BTreeMap::new();
        for &(entity, slot) in cells {
            bits.insert(indexer.to_index(entity, slot)?, 1u8);
        }
        Ok(Self { bits })
    }
}

impl Sampler for FixedSampler {
    fn name(&self) -> &str {
        "fixed"
    }

    fn sample(&self, qubo: &Qubo, _config: &SolverConfig) -> Result<Sample, SamplerError> {
        Ok(Sample {
            bits: self.bits.clone(),
            energy: qubo.energy(&self.bits),
        })
    }
}

/// A fully processed sampler result: decoded grid, reported energy and the
/// independent constraint checks.
#[derive(Debug, Clone)]
pub struct SolvedSchedule {
    pub schedule: Schedule,
    pub energy: f64,
    pub checks: Vec<ConstraintCheck>,
    pub feasible: bool,
}

/// Runs the whole pipeline once: encode, sample, decode, verify.
///
/// # Examples
///
/// ```
/// use qubo_scheduling::constraints::Constraint;
/// use qubo_scheduling::domain::Problem;
/// use qubo_scheduling::solver::{solve, FixedSampler, SolverConfig};
///
/// let problem = Problem::builder("tiny", 2, 2)
///     .with_constraint(Constraint::slot_coverage(1.0, 1.0))
///     .build()
///     .unwrap();
/// let sampler = FixedSampler::from_cells(&[(0, 0), (1, 1)], &problem.indexer()).unwrap();
///
/// let result = solve(&problem, &sampler, &SolverConfig::default_config()).unwrap();
/// assert!(result.feasible);
/// assert_eq!(result.energy, 0.0);
/// ```
pub fn solve(
    problem: &Problem,
    sampler: &dyn Sampler,
    config: &SolverConfig,
) -> Result<SolvedSchedule, Error> {
    let encode_start = Instant::now();
    let qubo = problem.build_qubo()?;
    info!(
        problem = %problem.name(),
        variables = qubo.n_variables(),
        terms = qubo.len(),
        encode_ms = encode_start.elapsed().as_millis() as u64,
        sampler = sampler.name(),
        "Submitting QUBO model"
    );

    let sample_start = Instant::now();
    let sample = sampler.sample(&qubo, config)?;
    let schedule = Schedule::from_sample(&sample.bits, &problem.indexer())?;
    let checks = verify::check(problem, &schedule)?;
    let feasible = verify::is_feasible(&checks);
    info!(
        energy = sample.energy,
        feasible,
        sample_ms = sample_start.elapsed().as_millis() as u64,
        "Sample decoded and verified"
    );

    Ok(SolvedSchedule {
        schedule,
        energy: sample.energy,
        checks,
        feasible,
    })
}

/// Status of a solving job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    /// Not currently solving.
    NotSolving,
    /// Submission in flight.
    Solving,
}

impl SolverStatus {
    /// Returns the status as a SCREAMING_SNAKE_CASE string for API responses.
    ///
    /// ```
    /// use qubo_scheduling::solver::SolverStatus;
    ///
    /// assert_eq!(SolverStatus::NotSolving.as_str(), "NOT_SOLVING");
    /// assert_eq!(SolverStatus::Solving.as_str(), "SOLVING");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            SolverStatus::NotSolving => "NOT_SOLVING",
            SolverStatus::Solving => "SOLVING",
        }
    }
}

/// A solving job with current state.
pub struct SolveJob {
    /// Unique job identifier.
    pub id: String,
    /// Current status.
    pub status: SolverStatus,
    /// The problem being solved.
    pub problem: Problem,
    /// Sampler configuration.
    pub config: SolverConfig,
    /// Result of the last completed solve, if any.
    pub result: Option<SolvedSchedule>,
    /// Failure message of the last solve, if it failed.
    pub error: Option<String>,
    /// When the job was created.
    pub submitted_at: DateTime<Utc>,
    /// Stop signal sender.
    stop_signal: Option<oneshot::Sender<()>>,
}

impl SolveJob {
    /// Creates a new solve job with default config.
    pub fn new(id: String, problem: Problem) -> Self {
        Self::with_config(id, problem, SolverConfig::default_config())
    }

    /// Creates a new solve job with custom config.
    pub fn with_config(id: String, problem: Problem, config: SolverConfig) -> Self {
        Self {
            id,
            status: SolverStatus::NotSolving,
            problem,
            config,
            result: None,
            error: None,
            submitted_at: Utc::now(),
            stop_signal: None,
        }
    }
}

/// Manages solving jobs against one sampler backend.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use qubo_scheduling::domain::Problem;
/// use qubo_scheduling::solver::{FixedSampler, SolverService, SolverStatus};
///
/// let service = SolverService::new(Arc::new(FixedSampler::default()));
/// let problem = Problem::builder("demo", 2, 3).build().unwrap();
///
/// // Create a job (doesn't start solving yet)
/// let job = service.create_job("job-1".to_string(), problem);
/// assert_eq!(job.read().status, SolverStatus::NotSolving);
/// ```
pub struct SolverService {
    jobs: RwLock<HashMap<String, Arc<RwLock<SolveJob>>>>,
    sampler: Arc<dyn Sampler>,
}

impl SolverService {
    /// Creates a service that submits every job to `sampler`.
    pub fn new(sampler: Arc<dyn Sampler>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            sampler,
        }
    }

    /// Creates a new job for the given problem with default config.
    pub fn create_job(&self, id: String, problem: Problem) -> Arc<RwLock<SolveJob>> {
        let job = Arc::new(RwLock::new(SolveJob::new(id.clone(), problem)));
        self.jobs.write().insert(id, job.clone());
        job
    }

    /// Creates a new job with custom config.
    pub fn create_job_with_config(
        &self,
        id: String,
        problem: Problem,
        config: SolverConfig,
    ) -> Arc<RwLock<SolveJob>> {
        let job = Arc::new(RwLock::new(SolveJob::with_config(id.clone(), problem, config)));
        self.jobs.write().insert(id, job.clone());
        job
    }

    /// Name of the sampler backend jobs are submitted to.
    pub fn sampler_name(&self) -> &str {
        self.sampler.name()
    }

    /// Gets a job by ID.
    pub fn get_job(&self, id: &str) -> Option<Arc<RwLock<SolveJob>>> {
        self.jobs.read().get(id).cloned()
    }

    /// Lists all job IDs.
    pub fn list_jobs(&self) -> Vec<String> {
        self.jobs.read().keys().cloned().collect()
    }

    /// Removes a job by ID.
    pub fn remove_job(&self, id: &str) -> Option<Arc<RwLock<SolveJob>>> {
        self.jobs.write().remove(id)
    }

    /// Starts solving a job in the background.
    pub fn start_solving(&self, job: Arc<RwLock<SolveJob>>) {
        let (tx, rx) = oneshot::channel();

        {
            let mut job_guard = job.write();
            job_guard.status = SolverStatus::Solving;
            job_guard.stop_signal = Some(tx);
        }

        let job_clone = job.clone();
        let sampler = self.sampler.clone();

        tokio::task::spawn_blocking(move || {
            solve_blocking(job_clone, sampler, rx);
        });
    }

    /// Stops a solving job. The in-flight sampler call cannot be aborted;
    /// its result is discarded when it returns.
    pub fn stop_solving(&self, id: &str) -> bool {
        if let Some(job) = self.get_job(id) {
            let mut job_guard = job.write();
            if let Some(stop_signal) = job_guard.stop_signal.take() {
                let _ = stop_signal.send(());
                job_guard.status = SolverStatus::NotSolving;
                return true;
            }
        }
        false
    }
}

/// Runs one job in a blocking context.
fn solve_blocking(
    job: Arc<RwLock<SolveJob>>,
    sampler: Arc<dyn Sampler>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let (job_id, problem, config) = {
        let guard = job.read();
        (guard.id.clone(), guard.problem.clone(), guard.config.clone())
    };

    info!(
        job_id = %job_id,
        problem = %problem.name(),
        entities = problem.n_entities(),
        slots = problem.n_slots(),
        "Starting solve job"
    );
    console::print_problem(&problem);

    let outcome = solve(&problem, sampler.as_ref(), &config);

    if stop_rx.try_recv().is_ok() {
        info!(job_id = %job_id, "Job was stopped; discarding sampler result");
        return;
    }

    let mut job_guard = job.write();
    job_guard.stop_signal = None;
    job_guard.status = SolverStatus::NotSolving;
    match outcome {
        Ok(result) => {
            info!(
                job_id = %job_id,
                energy = result.energy,
                feasible = result.feasible,
                "Solve job finished"
            );
            console::print_report(&problem, &result);
            job_guard.error = None;
            job_guard.result = Some(result);
        }
        Err(err) => {
            error!(job_id = %job_id, error = %err, "Solve job failed");
            job_guard.error = Some(err.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Constraint;

    fn nurse_problem() -> Problem {
        Problem::builder("Nurse rostering", 3, 11)
            .with_constraint(Constraint::consecutive_exclusion(3.5))
            .with_constraint(Constraint::slot_coverage(1.3, 1.0))
            .with_constraint(Constraint::workload_balance(0.3, 3.0))
            .build()
            .unwrap()
    }

    struct FailingSampler;

    impl Sampler for FailingSampler {
        fn name(&self) -> &str {
            "failing"
        }

        fn sample(&self, _qubo: &Qubo, _config: &SolverConfig) -> Result<Sample, SamplerError> {
            Err(SamplerError::Network("connection refused".into()))
        }
    }

    #[test]
    fn test_solve_runs_full_pipeline() {
        let problem = nurse_problem();
        let cells: Vec<(usize, usize)> = (0..11).map(|day| (day % 3, day)).collect();
        let sampler = FixedSampler::from_cells(&cells, &problem.indexer()).unwrap();

        let result = solve(&problem, &sampler, &SolverConfig::default_config()).unwrap();

        assert!(result.feasible);
        assert_eq!(result.checks.len(), 3);
        assert!((result.energy - 0.6).abs() < 1e-9);
        assert_eq!(result.schedule.assignment_counts(), vec![4, 4, 3]);
    }

    #[test]
    fn test_sampler_failure_maps_to_solver_unavailable() {
        let problem = nurse_problem();
        let result = solve(&problem, &FailingSampler, &SolverConfig::default_config());
        match result {
            Err(Error::SolverUnavailable(msg)) => assert!(msg.contains("connection refused")),
            other => panic!("expected SolverUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_sample_bits_fail_decoding() {
        let problem = nurse_problem();
        let sampler = FixedSampler::new(BTreeMap::from([(999, 1u8)]));
        assert!(matches!(
            solve(&problem, &sampler, &SolverConfig::default_config()),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_service_job_bookkeeping() {
        let service = SolverService::new(Arc::new(FixedSampler::default()));
        let job = service.create_job("job-1".to_string(), nurse_problem());

        assert_eq!(job.read().status, SolverStatus::NotSolving);
        assert!(job.read().result.is_none());
        assert!(service.get_job("job-1").is_some());
        assert_eq!(service.list_jobs(), vec!["job-1".to_string()]);

        // Stopping a job that never started has nothing to signal.
        assert!(!service.stop_solving("job-1"));

        assert!(service.remove_job("job-1").is_some());
        assert!(service.get_job("job-1").is_none());
    }

    #[test]
    fn test_config_builders() {
        let config = SolverConfig::default_config()
            .with_label("Nurse rostering demo")
            .with_time_limit(Duration::from_secs(5));
        assert_eq!(config.label.as_deref(), Some("Nurse rostering demo"));
        assert_eq!(config.time_limit, Some(Duration::from_secs(5)));
    }
}
