//! REST API handlers for QUBO scheduling.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constraints::{Constraint, DifficultyBuckets, GroupBy, LevelBuckets, MismatchTable};
use crate::demo_data::{self, DemoData};
use crate::domain::{Problem, Schedule};
use crate::error::Error;
use crate::solver::{SolveJob, SolverConfig, SolverService, SolverStatus};
use crate::verify::{self, ConstraintCheck};

/// Application state shared across handlers.
pub struct AppState {
    pub service: SolverService,
}

impl AppState {
    pub fn new(service: SolverService) -> Self {
        Self { service }
    }
}

// ============================================================================
// DTOs
// ============================================================================

/// Wire form of [`GroupBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupByDto {
    Slot,
    Entity,
}

impl GroupByDto {
    fn to_domain(self) -> GroupBy {
        match self {
            GroupByDto::Slot => GroupBy::Slot,
            GroupByDto::Entity => GroupBy::Entity,
        }
    }

    fn from_domain(group_by: GroupBy) -> Self {
        match group_by {
            GroupBy::Slot => GroupByDto::Slot,
            GroupBy::Entity => GroupByDto::Entity,
        }
    }
}

/// Wire form of [`LevelBuckets`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LevelBucketsDto {
    pub senior: usize,
    pub intermediate: usize,
    pub junior: usize,
}

/// Wire form of [`DifficultyBuckets`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DifficultyBucketsDto {
    pub hard: usize,
    pub medium: usize,
    pub easy: usize,
}

/// Wire form of [`MismatchTable`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MismatchTableDto {
    pub reward: f64,
    pub junior_mismatch: f64,
    pub intermediate_on_hard: f64,
    pub senior_mismatch: f64,
}

impl MismatchTableDto {
    fn to_domain(&self) -> MismatchTable {
        MismatchTable {
            reward: self.reward,
            junior_mismatch: self.junior_mismatch,
            intermediate_on_hard: self.intermediate_on_hard,
            senior_mismatch: self.senior_mismatch,
        }
    }

    fn from_domain(table: &MismatchTable) -> Self {
        Self {
            reward: table.reward,
            junior_mismatch: table.junior_mismatch,
            intermediate_on_hard: table.intermediate_on_hard,
            senior_mismatch: table.senior_mismatch,
        }
    }
}

/// Constraint DTO, tagged by family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "family",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ConstraintDto {
    ConsecutiveExclusion {
        weight: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        adjacency: Option<Vec<(usize, usize)>>,
    },
    AggregateTarget {
        group_by: GroupByDto,
        strength: f64,
        target: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weights: Option<Vec<f64>>,
        #[serde(default)]
        hard: bool,
    },
    UniqueAssignment {
        penalty: f64,
    },
    SkillMismatch {
        levels: LevelBucketsDto,
        difficulties: DifficultyBucketsDto,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table: Option<MismatchTableDto>,
    },
    CapacityOverflow {
        capacity: usize,
        penalty: f64,
    },
}

impl ConstraintDto {
    pub fn to_constraint(&self) -> Constraint {
        match self {
            ConstraintDto::ConsecutiveExclusion { weight, adjacency } => {
                Constraint::ConsecutiveExclusion {
                    weight: *weight,
                    adjacency: adjacency.clone(),
                }
            }
            ConstraintDto::AggregateTarget {
                group_by,
                strength,
                target,
                weights,
                hard,
            } => Constraint::AggregateTarget {
                group_by: group_by.to_domain(),
                strength: *strength,
                target: *target,
                weights: weights.clone(),
                hard: *hard,
            },
            ConstraintDto::UniqueAssignment { penalty } => Constraint::UniqueAssignment {
                penalty: *penalty,
            },
            ConstraintDto::SkillMismatch {
                levels,
                difficulties,
                table,
            } => Constraint::SkillMismatch {
                levels: LevelBuckets::new(levels.senior, levels.intermediate, levels.junior),
                difficulties: DifficultyBuckets::new(
                    difficulties.hard,
                    difficulties.medium,
                    difficulties.easy,
                ),
                table: table
                    .as_ref()
                    .map(MismatchTableDto::to_domain)
                    .unwrap_or_default(),
            },
            ConstraintDto::CapacityOverflow { capacity, penalty } => {
                Constraint::CapacityOverflow {
                    capacity: *capacity,
                    penalty: *penalty,
                }
            }
        }
    }

    pub fn from_constraint(constraint: &Constraint) -> Self {
        match constraint {
            Constraint::ConsecutiveExclusion { weight, adjacency } => {
                ConstraintDto::ConsecutiveExclusion {
                    weight: *weight,
                    adjacency: adjacency.clone(),
                }
            }
            Constraint::AggregateTarget {
                group_by,
                strength,
                target,
                weights,
                hard,
            } => ConstraintDto::AggregateTarget {
                group_by: GroupByDto::from_domain(*group_by),
                strength: *strength,
                target: *target,
                weights: weights.clone(),
                hard: *hard,
            },
            Constraint::UniqueAssignment { penalty } => ConstraintDto::UniqueAssignment {
                penalty: *penalty,
            },
            Constraint::SkillMismatch {
                levels,
                difficulties,
                table,
            } => ConstraintDto::SkillMismatch {
                levels: LevelBucketsDto {
                    senior: levels.senior,
                    intermediate: levels.intermediate,
                    junior: levels.junior,
                },
                difficulties: DifficultyBucketsDto {
                    hard: difficulties.hard,
                    medium: difficulties.medium,
                    easy: difficulties.easy,
                },
                table: Some(MismatchTableDto::from_domain(table)),
            },
            Constraint::CapacityOverflow { capacity, penalty } => {
                ConstraintDto::CapacityOverflow {
                    capacity: *capacity,
                    penalty: *penalty,
                }
            }
        }
    }
}

/// Problem DTO for requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDto {
    pub name: String,
    pub n_entities: usize,
    pub n_slots: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_labels: Option<Vec<String>>,
    pub constraints: Vec<ConstraintDto>,
}

impl ProblemDto {
    pub fn from_problem(problem: &Problem) -> Self {
        Self {
            name: problem.name().to_string(),
            n_entities: problem.n_entities(),
            n_slots: problem.n_slots(),
            entity_labels: Some(problem.entity_labels().to_vec()),
            constraints: problem
                .constraints()
                .iter()
                .map(ConstraintDto::from_constraint)
                .collect(),
        }
    }

    pub fn to_problem(&self) -> Result<Problem, Error> {
        let mut builder = Problem::builder(self.name.clone(), self.n_entities, self.n_slots);
        if let Some(labels) = &self.entity_labels {
            builder = builder.with_entity_labels(labels.clone());
        }
        for constraint in &self.constraints {
            builder = builder.with_constraint(constraint.to_constraint());
        }
        builder.build()
    }
}

/// Full job DTO: the problem plus solving state and, once available, the
/// decoded schedule with its verification results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDto {
    pub id: String,
    pub problem: ProblemDto,
    pub solver_status: SolverStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<Vec<Vec<bool>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<ConstraintCheck>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feasible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl ScheduleDto {
    pub fn from_job(job: &SolveJob) -> Self {
        Self {
            id: job.id.clone(),
            problem: ProblemDto::from_problem(&job.problem),
            solver_status: job.status,
            grid: job.result.as_ref().map(|r| r.schedule.grid().to_vec()),
            energy: job.result.as_ref().map(|r| r.energy),
            checks: job.result.as_ref().map(|r| r.checks.clone()),
            feasible: job.result.as_ref().map(|r| r.feasible),
            error: job.error.clone(),
            submitted_at: job.submitted_at,
        }
    }
}

// ============================================================================
// Router and Handlers
// ============================================================================

/// Creates the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health & Info
        .route("/health", get(health))
        .route("/info", get(info))
        // Demo data
        .route("/demo-data", get(list_demo_data))
        .route("/demo-data/{id}", get(get_demo_data))
        // Schedules
        .route("/schedules", post(create_schedule))
        .route("/schedules", get(list_schedules))
        .route("/schedules/analyze", put(analyze_schedule))
        .route("/schedules/{id}", get(get_schedule))
        .route("/schedules/{id}/status", get(get_schedule_status))
        .route("/schedules/{id}", delete(delete_schedule))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health - Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub sampler: String,
}

/// GET /info - Application info endpoint.
async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "QUBO Scheduling",
        version: env!("CARGO_PKG_VERSION"),
        sampler: state.service.sampler_name().to_string(),
    })
}

/// GET /demo-data - List available demo data sets.
async fn list_demo_data() -> Json<Vec<&'static str>> {
    Json(demo_data::list_demo_data())
}

/// GET /demo-data/{id} - Get a specific demo problem.
async fn get_demo_data(Path(id): Path<String>) -> Result<Json<ProblemDto>, StatusCode> {
    match id.parse::<DemoData>() {
        Ok(demo) => {
            let problem = demo_data::generate(demo);
            Ok(Json(ProblemDto::from_problem(&problem)))
        }
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

/// POST /schedules - Create a job and start solving it.
/// Returns the job ID as plain text.
async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<ProblemDto>,
) -> Result<String, StatusCode> {
    let problem = dto.to_problem().map_err(|_| StatusCode::BAD_REQUEST)?;
    let id = uuid::Uuid::new_v4().to_string();
    let config = SolverConfig::default_config().with_label(problem.name().to_string());

    let job = state.service.create_job_with_config(id.clone(), problem, config);
    state.service.start_solving(job);

    Ok(id)
}

/// GET /schedules - List all job IDs.
async fn list_schedules(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.service.list_jobs())
}

/// GET /schedules/{id} - Get a job's current state.
async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleDto>, StatusCode> {
    match state.service.get_job(&id) {
        Some(job) => Ok(Json(ScheduleDto::from_job(&job.read()))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Response for job status only.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub solver_status: SolverStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feasible: Option<bool>,
}

/// GET /schedules/{id}/status - Get a job's status.
async fn get_schedule_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, StatusCode> {
    match state.service.get_job(&id) {
        Some(job) => {
            let guard = job.read();
            Ok(Json(StatusResponse {
                solver_status: guard.status,
                energy: guard.result.as_ref().map(|r| r.energy),
                feasible: guard.result.as_ref().map(|r| r.feasible),
            }))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// DELETE /schedules/{id} - Stop solving and remove a job.
async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    state.service.stop_solving(&id);
    match state.service.remove_job(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// Request for schedule analysis: a problem and a candidate grid.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub problem: ProblemDto,
    pub grid: Vec<Vec<bool>>,
}

/// Response for schedule analysis.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub energy: f64,
    pub total_residual: f64,
    pub feasible: bool,
    pub checks: Vec<ConstraintCheck>,
}

/// PUT /schedules/analyze - Verify a candidate schedule without solving.
///
/// Recomputes every constraint residual from the grid and the model energy
/// of the matching assignment, so clients can cross-check sampler results.
async fn analyze_schedule(
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, StatusCode> {
    let problem = request
        .problem
        .to_problem()
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    let schedule = Schedule::from_grid(request.grid).map_err(|_| StatusCode::BAD_REQUEST)?;
    let checks = verify::check(&problem, &schedule).map_err(|_| StatusCode::BAD_REQUEST)?;

    let qubo = problem.build_qubo().map_err(|_| StatusCode::BAD_REQUEST)?;
    let indexer = problem.indexer();
    let mut bits = BTreeMap::new();
    for (entity, slot) in schedule.assignments() {
        let index = indexer
            .to_index(entity, slot)
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        bits.insert(index, 1u8);
    }

    Ok(Json(AnalyzeResponse {
        energy: qubo.energy(&bits),
        total_residual: verify::total_residual(&checks),
        feasible: verify::is_feasible(&checks),
        checks,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_dto_wire_format() {
        let dto = ConstraintDto::from_constraint(&Constraint::slot_coverage(1.3, 1.0));
        let json = serde_json::to_value(&dto).unwrap();

        assert_eq!(json["family"], "AGGREGATE_TARGET");
        assert_eq!(json["groupBy"], "SLOT");
        assert_eq!(json["strength"], 1.3);
        assert_eq!(json["hard"], true);
        assert!(json.get("weights").is_none());
    }

    #[test]
    fn test_skill_mismatch_dto_defaults_table() {
        let json = r#"{
            "family": "SKILL_MISMATCH",
            "levels": {"senior": 1, "intermediate": 3, "junior": 2},
            "difficulties": {"hard": 3, "medium": 4, "easy": 3}
        }"#;
        let dto: ConstraintDto = serde_json::from_str(json).unwrap();

        match dto.to_constraint() {
            Constraint::SkillMismatch { levels, table, .. } => {
                assert_eq!(levels.total(), 6);
                assert_eq!(table, MismatchTable::default());
            }
            other => panic!("expected skill mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_problem_dto_preserves_problem() {
        let problem = demo_data::generate(DemoData::BillReview);
        let dto = ProblemDto::from_problem(&problem);
        let rebuilt = dto.to_problem().unwrap();

        assert_eq!(rebuilt.name(), problem.name());
        assert_eq!(rebuilt.n_entities(), problem.n_entities());
        assert_eq!(rebuilt.n_slots(), problem.n_slots());
        assert_eq!(rebuilt.entity_labels(), problem.entity_labels());
        assert_eq!(rebuilt.constraints(), problem.constraints());
    }

    #[test]
    fn test_problem_dto_rejects_invalid() {
        let dto = ProblemDto {
            name: "broken".to_string(),
            n_entities: 0,
            n_slots: 5,
            entity_labels: None,
            constraints: vec![],
        };
        assert!(dto.to_problem().is_err());
    }

    #[test]
    fn test_schedule_dto_tracks_job_lifecycle() {
        let problem = demo_data::generate(DemoData::NurseRostering);
        let mut job = SolveJob::new("job-1".to_string(), problem.clone());

        let pending = ScheduleDto::from_job(&job);
        assert_eq!(pending.solver_status, SolverStatus::NotSolving);
        assert!(pending.grid.is_none());
        assert!(pending.energy.is_none());

        let grid: Vec<Vec<bool>> = (0..3)
            .map(|nurse| (0..11).map(|day| day % 3 == nurse).collect())
            .collect();
        let schedule = Schedule::from_grid(grid).unwrap();
        let checks = verify::check(&problem, &schedule).unwrap();
        job.result = Some(crate::solver::SolvedSchedule {
            feasible: verify::is_feasible(&checks),
            energy: verify::total_residual(&checks),
            schedule,
            checks,
        });

        let finished = ScheduleDto::from_job(&job);
        assert_eq!(finished.feasible, Some(true));
        assert!((finished.energy.unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(finished.grid.as_ref().map(|g| g.len()), Some(3));
        assert_eq!(finished.checks.as_ref().map(|c| c.len()), Some(3));
    }
}
