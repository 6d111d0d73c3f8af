use super::fanout::JobDir;
use super::progress::{Progress, ProgressReporter};
use crate::core::io::onedmin;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Standard error of a worker process is captured here, next to its outputs.
pub const RUN_LOG_FILE: &str = "run.log";

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Executable '{path}' does not exist", path = path.display())]
    MissingExecutable { path: PathBuf },
    #[error("Cannot determine working directory: {0}")]
    WorkingDirectory(#[source] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Succeeded,
    /// The process exited unsuccessfully (`exit_code` is `None` when killed by a signal).
    Failed { exit_code: Option<i32> },
    /// The process could not be started or its files could not be opened.
    NotStarted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatus {
    pub index: usize,
    pub outcome: WorkerOutcome,
    pub elapsed: Duration,
}

impl WorkerStatus {
    pub fn succeeded(&self) -> bool {
        self.outcome == WorkerOutcome::Succeeded
    }
}

/// Runs prepared job directories to completion.
///
/// Implementations return only after every job has finished, one status per job in
/// input order. A failing job is reported in its status and never aborts the others.
pub trait ExecutionService {
    fn execute(
        &self,
        jobs: &[JobDir],
        reporter: &ProgressReporter,
    ) -> Result<Vec<WorkerStatus>, ExecutionError>;
}

/// Runs each job as a local child process inside its job directory.
///
/// The process reads `input.dat` on standard input and writes `lj.out` on standard
/// output. With the `parallel` feature the jobs share the rayon thread pool.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    program: PathBuf,
}

impl LocalExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    // Bare names are left for PATH lookup; relative paths are anchored to the current
    // directory since each child runs inside its own job directory.
    fn resolve_program(&self) -> Result<PathBuf, ExecutionError> {
        if self.program.components().count() <= 1 && self.program.is_relative() {
            return Ok(self.program.clone());
        }
        let resolved = if self.program.is_relative() {
            std::env::current_dir()
                .map_err(ExecutionError::WorkingDirectory)?
                .join(&self.program)
        } else {
            self.program.clone()
        };
        if !resolved.is_file() {
            return Err(ExecutionError::MissingExecutable { path: resolved });
        }
        Ok(resolved)
    }

    fn run_job(&self, program: &Path, job: &JobDir) -> WorkerStatus {
        let start = Instant::now();
        let outcome = match self.spawn_and_wait(program, &job.path) {
            Ok(status) if status.success() => WorkerOutcome::Succeeded,
            Ok(status) => {
                warn!(
                    "Job {} exited with {:?}; see {:?}",
                    job.index,
                    status.code(),
                    job.path.join(RUN_LOG_FILE)
                );
                WorkerOutcome::Failed {
                    exit_code: status.code(),
                }
            }
            Err(e) => {
                warn!("Job {} could not be started: {}", job.index, e);
                WorkerOutcome::NotStarted {
                    reason: e.to_string(),
                }
            }
        };
        let elapsed = start.elapsed();
        debug!("Job {} finished after {:.1}s", job.index, elapsed.as_secs_f64());
        WorkerStatus {
            index: job.index,
            outcome,
            elapsed,
        }
    }

    fn spawn_and_wait(&self, program: &Path, dir: &Path) -> io::Result<std::process::ExitStatus> {
        let stdin = File::open(dir.join(onedmin::INPUT_FILE))?;
        let stdout = File::create(dir.join(onedmin::OUTPUT_FILE))?;
        let stderr = File::create(dir.join(RUN_LOG_FILE))?;
        Command::new(program)
            .current_dir(dir)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
    }
}

impl ExecutionService for LocalExecutor {
    #[instrument(skip_all, name = "local_execution", fields(jobs = jobs.len()))]
    fn execute(
        &self,
        jobs: &[JobDir],
        reporter: &ProgressReporter,
    ) -> Result<Vec<WorkerStatus>, ExecutionError> {
        let program = self.resolve_program()?;
        info!("Running {} job(s) with {:?}", jobs.len(), &program);

        reporter.report(Progress::JobsStart {
            total_jobs: jobs.len() as u64,
        });

        #[cfg(not(feature = "parallel"))]
        let iterator = jobs.iter();

        #[cfg(feature = "parallel")]
        let iterator = jobs.par_iter();

        let statuses: Vec<WorkerStatus> = iterator
            .map(|job| {
                let status = self.run_job(&program, job);
                reporter.report(Progress::JobFinished {
                    index: status.index,
                    succeeded: status.succeeded(),
                });
                status
            })
            .collect();

        reporter.report(Progress::JobsFinish);

        let failed = statuses.iter().filter(|s| !s.succeeded()).count();
        if failed > 0 {
            warn!(failed, total = statuses.len(), "Some jobs did not succeed.");
        } else {
            info!("All {} job(s) completed.", statuses.len());
        }
        Ok(statuses)
    }
}
