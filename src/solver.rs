//! Schedule generation pipeline and job-based solver service.
//!
//! Domain Builder -> Constraint Model Builder -> Objective Assembler ->
//! [`CpSolver`] -> Solution Mapper. Every call builds a fresh model; nothing
//! is shared between solves.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::constraints::{self, CallModel};
use crate::cp::{CpSolver, MilpSolver, SolverConfig};
use crate::domain::CallProblem;
use crate::domains::SlotDomains;
use crate::error::SchedulingError;
use crate::objective::{self, ObjectiveTerms};
use crate::solution::{map_solution, CallSchedule};
use crate::validation::validate_problem;

/// Validates the problem and builds the complete model with its objective.
pub fn build_model(problem: &CallProblem) -> Result<(CallModel, ObjectiveTerms), SchedulingError> {
    validate_problem(problem)?;
    let domains = SlotDomains::build(&problem.surgeons);
    let mut call_model = constraints::build(problem, domains);
    let terms = objective::assemble(&mut call_model, problem);
    Ok((call_model, terms))
}

/// Builds, solves, and maps one period's call schedule.
///
/// # Examples
///
/// ```
/// use surgeon_call_scheduling::cp::{MilpSolver, SolverConfig};
/// use surgeon_call_scheduling::domain::{
///     CallLevel, CallProblem, QuotaConfig, QuotaGroup, SchedulePeriod, SchedulingConfig, Surgeon,
/// };
/// use surgeon_call_scheduling::error::SchedulingError;
/// use surgeon_call_scheduling::solver::generate_schedule;
///
/// let period = SchedulePeriod::month(2024, 3).unwrap();
/// let roster = vec![Surgeon::new(1, "Solo").with_qualifications([CallLevel::Level1A])];
/// let config = SchedulingConfig {
///     max_calls: QuotaConfig::uniform(5).with_max_calls(QuotaGroup::One, 0),
///     ..Default::default()
/// };
/// let problem = CallProblem::new(period, roster).with_config(config);
///
/// let result = generate_schedule(&problem, &MilpSolver::new(), &SolverConfig::default());
/// assert_eq!(result, Err(SchedulingError::NoFeasibleSchedule));
/// ```
pub fn generate_schedule<S: CpSolver>(
    problem: &CallProblem,
    solver: &S,
    config: &SolverConfig,
) -> Result<CallSchedule, SchedulingError> {
    let (call_model, terms) = build_model(problem)?;
    let model = call_model.model();

    info!(
        period = %problem.period.start,
        days = problem.num_days(),
        surgeons = problem.surgeons.len(),
        variables = model.variable_count(),
        constraints = model.constraint_count(),
        "Call model built"
    );
    #[cfg(feature = "console")]
    crate::console::print_model(
        problem.num_days(),
        problem.surgeons.len(),
        model.variable_count(),
        model.constraint_count(),
    );

    let solution = solver.solve(model, config);

    info!(
        status = ?solution.status,
        objective = ?solution.objective_value(),
        columns = solution.stats.columns,
        rows = solution.stats.rows,
        elapsed_ms = solution.stats.elapsed.as_millis() as u64,
        "Solve finished"
    );
    #[cfg(feature = "console")]
    crate::console::print_solve_result(&solution);

    map_solution(&call_model, &terms, &problem.surgeons, &solution)
}

/// Status of a solving job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Solve in progress.
    Solving,
    /// A schedule is available.
    Solved,
    /// Infeasible, or the time budget ran out without a schedule.
    NoFeasibleSchedule,
}

impl JobStatus {
    /// Returns the status as a SCREAMING_SNAKE_CASE string for API responses.
    ///
    /// ```
    /// use surgeon_call_scheduling::solver::JobStatus;
    ///
    /// assert_eq!(JobStatus::Solving.as_str(), "SOLVING");
    /// assert_eq!(JobStatus::NoFeasibleSchedule.as_str(), "NO_FEASIBLE_SCHEDULE");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Solving => "SOLVING",
            JobStatus::Solved => "SOLVED",
            JobStatus::NoFeasibleSchedule => "NO_FEASIBLE_SCHEDULE",
        }
    }
}

/// A solving job with its input and, once done, its schedule.
pub struct SolveJob {
    /// Unique job identifier.
    pub id: String,
    /// Current status.
    pub status: JobStatus,
    pub problem: CallProblem,
    /// Set once the job is solved.
    pub schedule: Option<CallSchedule>,
}

impl SolveJob {
    pub fn new(id: String, problem: CallProblem) -> Self {
        Self {
            id,
            status: JobStatus::Solving,
            problem,
            schedule: None,
        }
    }
}

/// Manages schedule generation jobs.
///
/// # Examples
///
/// ```
/// use surgeon_call_scheduling::solver::{JobStatus, SolverService};
/// use surgeon_call_scheduling::demo_data::{generate, DemoData};
///
/// let service = SolverService::new();
/// let job = service.create_job("job-1".to_string(), generate(DemoData::Small).unwrap());
/// assert_eq!(job.read().status, JobStatus::Solving);
/// assert_eq!(service.list_jobs(), vec!["job-1".to_string()]);
/// ```
pub struct SolverService {
    jobs: RwLock<HashMap<String, Arc<RwLock<SolveJob>>>>,
    config: SolverConfig,
}

impl SolverService {
    /// Creates a service with the default 30-second budget.
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Registers a job without starting it.
    pub fn create_job(&self, id: String, problem: CallProblem) -> Arc<RwLock<SolveJob>> {
        let job = Arc::new(RwLock::new(SolveJob::new(id.clone(), problem)));
        self.jobs.write().insert(id, job.clone());
        job
    }

    /// Validates the problem, registers a job under a fresh id, and starts it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, problem: CallProblem) -> Result<String, SchedulingError> {
        validate_problem(&problem)?;
        let id = Uuid::new_v4().to_string();
        let job = self.create_job(id.clone(), problem);
        self.start_solving(job);
        Ok(id)
    }

    pub fn get_job(&self, id: &str) -> Option<Arc<RwLock<SolveJob>>> {
        self.jobs.read().get(id).cloned()
    }

    pub fn list_jobs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Forgets a job. A solve in progress still runs to its time budget.
    pub fn remove_job(&self, id: &str) -> Option<Arc<RwLock<SolveJob>>> {
        self.jobs.write().remove(id)
    }

    /// Solves a job on the blocking thread pool.
    pub fn start_solving(&self, job: Arc<RwLock<SolveJob>>) {
        let config = self.config;
        tokio::task::spawn_blocking(move || solve_blocking(job, config));
    }
}

impl Default for SolverService {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one job to completion on the current thread.
fn solve_blocking(job: Arc<RwLock<SolveJob>>, config: SolverConfig) {
    let (job_id, problem) = {
        let guard = job.read();
        (guard.id.clone(), guard.problem.clone())
    };
    info!(job_id = %job_id, surgeons = problem.surgeons.len(), "Starting call solver");

    let result = generate_schedule(&problem, &MilpSolver::new(), &config);

    let mut guard = job.write();
    match result {
        Ok(schedule) => {
            info!(job_id = %job_id, cost = schedule.cost, "Schedule solved");
            guard.status = JobStatus::Solved;
            guard.schedule = Some(schedule);
        }
        Err(err) => {
            warn!(job_id = %job_id, error = %err, "No schedule produced");
            guard.status = JobStatus::NoFeasibleSchedule;
        }
    }
}
