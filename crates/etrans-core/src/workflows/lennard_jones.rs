use crate::core::io::onedmin::PROGRAM_NAME;
use crate::core::models::ids::{ComputationKey, TheoryLevel};
use crate::core::models::record::{CacheRecord, Provenance};
use crate::core::models::sample::Quantity;
use crate::core::models::species::SpeciesPair;
use crate::core::store::CacheStore;
use crate::engine::aggregate::{self, Aggregation};
use crate::engine::commit::{self, CommitOutcome};
use crate::engine::config::{ConfigError, WorkRequest};
use crate::engine::error::{Stage, WorkflowError};
use crate::engine::execution::{ExecutionService, WorkerStatus};
use crate::engine::fanout::{self, FanOutPlan};
use crate::engine::gather::{self, DroppedSample};
use crate::engine::need::{self, NeedAssessment};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::provider::GeometryProvider;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

const UNKNOWN_VERSION: &str = "unknown";

/// Everything that identifies one Lennard-Jones sampling invocation.
#[derive(Debug, Clone)]
pub struct LjJob {
    pub key: ComputationKey,
    pub pair: SpeciesPair,
    pub request: WorkRequest,
    /// Scratch directory receiving one `job_NNN` subdirectory per worker.
    pub run_dir: PathBuf,
}

impl LjJob {
    pub fn new(
        pair: SpeciesPair,
        theory: TheoryLevel,
        request: WorkRequest,
        run_dir: impl Into<PathBuf>,
    ) -> Self {
        let key = ComputationKey::new(pair.target.id.clone(), pair.bath.id.clone(), theory);
        Self {
            key,
            pair,
            request,
            run_dir: run_dir.into(),
        }
    }
}

/// The collaborators a workflow run depends on.
pub struct LjServices<'a> {
    pub store: &'a dyn CacheStore,
    pub provider: &'a dyn GeometryProvider,
    pub executor: &'a dyn ExecutionService,
}

/// What happened to the jobs of a run that got past the cache check.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub plan: FanOutPlan,
    pub statuses: Vec<WorkerStatus>,
    pub new_samples: usize,
    pub dropped: Vec<DroppedSample>,
    pub failed_workers: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LjOutcome {
    /// The cache already held enough samples; nothing was run.
    Cached { record: CacheRecord },
    /// Jobs ran but left nothing to aggregate; the stored record is unchanged.
    NoUpdate { report: RunReport },
    /// A new record was committed (or an identical one was already stored).
    Updated {
        commit: CommitOutcome,
        sample_count: usize,
        values: BTreeMap<Quantity, f64>,
        report: RunReport,
    },
}

/// Result of a dry run: the decisions a real run would take.
#[derive(Debug, Clone, PartialEq)]
pub struct LjPreview {
    pub cached_samples: Option<usize>,
    pub assessment: NeedAssessment,
    pub plan: Option<FanOutPlan>,
}

/// Assesses the cache and plans the fan-out for `job` without writing anything.
pub fn preview(job: &LjJob, store: &dyn CacheStore) -> Result<LjPreview, WorkflowError> {
    let key = &job.key;
    check_run_dir(job, store)?;
    let existing = store
        .read(key)
        .map_err(|e| WorkflowError::new(key, Stage::Assess, e))?;
    let assessment = need::assess(
        existing.as_ref(),
        job.request.total_needed,
        job.request.overwrite,
    );
    let plan = if assessment.must_run {
        Some(
            fanout::plan(assessment.additional_needed, job.request.worker_count)
                .map_err(|e| WorkflowError::new(key, Stage::Plan, e))?,
        )
    } else {
        None
    };
    Ok(LjPreview {
        cached_samples: existing.map(|r| r.sample_count),
        assessment,
        plan,
    })
}

/// Brings the cached Lennard-Jones record of `job.key` up to `job.request.total_needed`
/// samples.
///
/// Blocks until every worker has finished. Any fatal error leaves the stored record
/// untouched and names the stage that failed.
#[instrument(skip_all, name = "lennard_jones_workflow", fields(key = %job.key))]
pub fn run(
    job: &LjJob,
    services: &LjServices,
    reporter: &ProgressReporter,
) -> Result<LjOutcome, WorkflowError> {
    let key = &job.key;
    let request = &job.request;

    // === Phase 1: Need assessment ===
    reporter.report(Progress::PhaseStart {
        name: "Checking cache",
    });
    let existing = services
        .store
        .read(key)
        .map_err(|e| WorkflowError::new(key, Stage::Assess, e))?;
    let expected_revision = existing.as_ref().map(|r| r.revision);
    let assessment = need::assess(existing.as_ref(), request.total_needed, request.overwrite);
    reporter.report(Progress::PhaseFinish);

    info!(
        reason = ?assessment.reason,
        additional = assessment.additional_needed,
        "Need assessment complete."
    );
    let existing = match existing {
        Some(record) if !assessment.must_run => {
            info!(
                "Cache already holds {} sample(s); nothing to do.",
                record.sample_count
            );
            return Ok(LjOutcome::Cached { record });
        }
        other => other,
    };

    // === Phase 2: Fan-out ===
    reporter.report(Progress::PhaseStart {
        name: "Preparing jobs",
    });
    // The run directory is wiped below; it must not hold the cached record.
    check_run_dir(job, services.store)?;
    let plan = fanout::plan(assessment.additional_needed, request.worker_count)
        .map_err(|e| WorkflowError::new(key, Stage::Plan, e))?;
    let payloads = if plan.is_empty() {
        warn!(
            additional = assessment.additional_needed,
            workers = request.worker_count,
            "Too few samples needed to give every worker one; no jobs scheduled."
        );
        Vec::new()
    } else {
        let target = services
            .provider
            .geometry(&key.target, &key.theory)
            .map_err(|e| WorkflowError::new(key, Stage::Plan, e))?;
        let bath = services
            .provider
            .geometry(&key.bath, &key.theory)
            .map_err(|e| WorkflowError::new(key, Stage::Plan, e))?;
        let mut rng = fanout::seed_rng(request.seed);
        fanout::build_payloads(
            &plan,
            &job.pair,
            &key.theory,
            request,
            &target,
            &bath,
            &mut rng,
        )
        .map_err(|e| WorkflowError::new(key, Stage::Plan, e))?
    };
    let jobs = fanout::write_payloads(&job.run_dir, &payloads)
        .map_err(|e| WorkflowError::new(key, Stage::Plan, e))?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Execution (full barrier) ===
    let statuses = if jobs.is_empty() {
        Vec::new()
    } else {
        reporter.report(Progress::PhaseStart {
            name: "Running jobs",
        });
        let statuses = services
            .executor
            .execute(&jobs, reporter)
            .map_err(|e| WorkflowError::new(key, Stage::Execute, e))?;
        reporter.report(Progress::PhaseFinish);
        statuses
    };

    // === Phase 4: Gather ===
    reporter.report(Progress::PhaseStart {
        name: "Gathering results",
    });
    let base = if request.overwrite {
        None
    } else {
        existing.as_ref()
    };
    let merged = gather::gather(base, &job.run_dir, &Quantity::LENNARD_JONES)
        .map_err(|e| WorkflowError::new(key, Stage::Gather, e))?;
    for dropped in &merged.dropped {
        reporter.report(Progress::Message(format!(
            "Dropped sample {} from {:?}: missing {:?}",
            dropped.position, dropped.source, dropped.missing
        )));
    }
    reporter.report(Progress::PhaseFinish);

    let version = merged
        .version
        .clone()
        .or_else(|| existing.as_ref().map(|r| r.provenance.version.clone()))
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
    let report = RunReport {
        plan,
        statuses,
        new_samples: merged.new_samples(),
        dropped: merged.dropped.clone(),
        failed_workers: merged.failed_workers.clone(),
    };

    // === Phase 5: Aggregate ===
    let aggregate = match aggregate::aggregate(merged)
        .map_err(|e| WorkflowError::new(key, Stage::Aggregate, e))?
    {
        Aggregation::Updated(aggregate) => aggregate,
        Aggregation::NoUpdate => {
            warn!("No samples available; the cached record is left unchanged.");
            return Ok(LjOutcome::NoUpdate { report });
        }
    };

    // === Phase 6: Commit ===
    reporter.report(Progress::PhaseStart {
        name: "Committing",
    });
    let provenance = Provenance::new(PROGRAM_NAME, version, request.potential.clone());
    let outcome = commit::commit(
        services.store,
        key,
        &aggregate,
        &provenance,
        expected_revision,
    )
    .map_err(|e| WorkflowError::new(key, Stage::Commit, e))?;
    reporter.report(Progress::PhaseFinish);

    if report.new_samples < assessment.additional_needed {
        warn!(
            requested = request.total_needed,
            stored = aggregate.sample_count,
            "Fewer samples than requested were produced; a later run will top up the rest."
        );
    }
    info!(
        sample_count = aggregate.sample_count,
        revision = outcome.revision(),
        "Workflow complete."
    );

    Ok(LjOutcome::Updated {
        commit: outcome,
        sample_count: aggregate.sample_count,
        values: aggregate.values,
        report,
    })
}

fn check_run_dir(job: &LjJob, store: &dyn CacheStore) -> Result<(), WorkflowError> {
    let Some(location) = store.location(&job.key) else {
        return Ok(());
    };
    if fanout::paths_overlap(&job.run_dir, &location) {
        return Err(WorkflowError::new(
            &job.key,
            Stage::Plan,
            ConfigError::Invalid {
                parameter: "run_dir",
                reason: format!(
                    "{} overlaps the cache directory {}",
                    job.run_dir.display(),
                    location.display()
                ),
            },
        ));
    }
    Ok(())
}
