use super::config::{ConfigError, WorkRequest};
use super::error::EngineError;
use crate::core::io::onedmin::{self, OneDminInput};
use crate::core::io::traits::TextFormat;
use crate::core::io::xyz::XyzFile;
use crate::core::models::geometry::Geometry;
use crate::core::models::ids::TheoryLevel;
use crate::core::models::species::SpeciesPair;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

const JOB_DIR_PREFIX: &str = "job_";

/// Per-worker sample counts for one fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutPlan {
    pub per_worker: Vec<usize>,
    /// Samples lost to integer division; they are not redistributed.
    pub dropped_remainder: usize,
}

impl FanOutPlan {
    pub fn total_planned(&self) -> usize {
        self.per_worker.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_planned() == 0
    }
}

/// Splits `additional_needed` samples evenly across `worker_count` workers.
///
/// Every worker receives `additional_needed / worker_count` samples. The remainder is
/// dropped rather than spread over the first workers, so the plan may fall short of
/// `additional_needed`; the shortfall is reported in [`FanOutPlan::dropped_remainder`]
/// and picked up by the next invocation's need assessment.
pub fn plan(additional_needed: usize, worker_count: usize) -> Result<FanOutPlan, ConfigError> {
    if worker_count == 0 {
        return Err(ConfigError::Invalid {
            parameter: "worker_count",
            reason: "at least one worker is required".to_string(),
        });
    }
    if additional_needed == 0 {
        return Ok(FanOutPlan {
            per_worker: Vec::new(),
            dropped_remainder: 0,
        });
    }

    let per_job = additional_needed / worker_count;
    let dropped_remainder = additional_needed % worker_count;
    if dropped_remainder > 0 {
        warn!(
            additional_needed,
            worker_count,
            dropped_remainder,
            "Samples do not divide evenly across workers; the remainder is not scheduled."
        );
    }

    Ok(FanOutPlan {
        per_worker: vec![per_job; worker_count],
        dropped_remainder,
    })
}

/// One file of a worker's input payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadFile {
    pub name: &'static str,
    pub contents: String,
    pub executable: bool,
}

/// The complete, self-contained input of one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerPayload {
    pub index: usize,
    pub sample_count: usize,
    pub seed: u64,
    pub files: Vec<PayloadFile>,
}

impl WorkerPayload {
    pub fn file(&self, name: &str) -> Option<&PayloadFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// A job directory written to disk, ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDir {
    pub index: usize,
    pub path: PathBuf,
}

/// Random source for per-worker seeds; deterministic when `seed` is given.
pub fn seed_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Builds the isolated input payload of every worker with a non-zero share of the plan.
///
/// Each payload carries its own copy of both geometries and its own random seed, so
/// workers share no state and may run in any order.
#[instrument(skip_all, name = "build_payloads", fields(workers = plan.per_worker.len()))]
pub fn build_payloads(
    plan: &FanOutPlan,
    pair: &SpeciesPair,
    theory: &TheoryLevel,
    request: &WorkRequest,
    target_geometry: &Geometry,
    bath_geometry: &Geometry,
    rng: &mut impl Rng,
) -> Result<Vec<WorkerPayload>, EngineError> {
    let target_xyz = render_geometry(target_geometry, onedmin::TARGET_FILE)?;
    let bath_xyz = render_geometry(bath_geometry, onedmin::BATH_FILE)?;
    let template = onedmin::elstruct_template(pair, theory);
    let launcher = onedmin::energy_launcher(&request.energy_command);

    let idle = plan.per_worker.iter().filter(|&&n| n == 0).count();
    if idle > 0 {
        warn!(idle, "Workers with no samples assigned are not scheduled.");
    }

    let payloads = plan
        .per_worker
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(index, &sample_count)| {
            let seed = u64::from(rng.gen_range(1..=u32::MAX / 2));
            let input = OneDminInput {
                seed,
                sample_count,
                smin: request.bounds.min,
                smax: request.bounds.max,
            };
            WorkerPayload {
                index,
                sample_count,
                seed,
                files: vec![
                    PayloadFile {
                        name: onedmin::TARGET_FILE,
                        contents: target_xyz.clone(),
                        executable: false,
                    },
                    PayloadFile {
                        name: onedmin::BATH_FILE,
                        contents: bath_xyz.clone(),
                        executable: false,
                    },
                    PayloadFile {
                        name: onedmin::ELSTRUCT_TEMPLATE_FILE,
                        contents: template.clone(),
                        executable: false,
                    },
                    PayloadFile {
                        name: onedmin::ENERGY_LAUNCHER_FILE,
                        contents: launcher.clone(),
                        executable: true,
                    },
                    PayloadFile {
                        name: onedmin::INPUT_FILE,
                        contents: input.render(),
                        executable: false,
                    },
                ],
            }
        })
        .collect::<Vec<_>>();

    debug!("Built {} worker payload(s).", payloads.len());
    Ok(payloads)
}

/// Whether one of the two directories is, or lies inside, the other.
///
/// Both paths are compared as given and, where they exist, after resolving symlinks.
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    let nested = |x: &Path, y: &Path| x.starts_with(y) || y.starts_with(x);
    let absolute = |p: &Path| std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf());
    if nested(absolute(a).as_path(), absolute(b).as_path()) {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => nested(a.as_path(), b.as_path()),
        _ => false,
    }
}

/// Writes every payload into its own `job_NNN` directory below `run_dir`.
///
/// Any previous content of `run_dir` is removed first so that outputs of an earlier
/// invocation can never be gathered twice.
pub fn write_payloads(
    run_dir: &Path,
    payloads: &[WorkerPayload],
) -> Result<Vec<JobDir>, EngineError> {
    if run_dir.exists() {
        info!("Clearing previous run directory {:?}", run_dir);
        fs::remove_dir_all(run_dir).map_err(|e| io_error(run_dir, e))?;
    }
    fs::create_dir_all(run_dir).map_err(|e| io_error(run_dir, e))?;

    let mut jobs = Vec::with_capacity(payloads.len());
    for payload in payloads {
        let job_path = run_dir.join(job_dir_name(payload.index));
        fs::create_dir_all(&job_path).map_err(|e| io_error(&job_path, e))?;
        for file in &payload.files {
            let file_path = job_path.join(file.name);
            fs::write(&file_path, &file.contents).map_err(|e| io_error(&file_path, e))?;
            if file.executable {
                mark_executable(&file_path)?;
            }
        }
        debug!(
            "Wrote job {} ({} samples) to {:?}",
            payload.index, payload.sample_count, &job_path
        );
        jobs.push(JobDir {
            index: payload.index,
            path: job_path,
        });
    }
    Ok(jobs)
}

pub fn job_dir_name(index: usize) -> String {
    format!("{}{:03}", JOB_DIR_PREFIX, index)
}

pub fn parse_job_index(dir_name: &str) -> Option<usize> {
    dir_name.strip_prefix(JOB_DIR_PREFIX)?.parse().ok()
}

fn render_geometry(geometry: &Geometry, name: &str) -> Result<String, EngineError> {
    XyzFile::render(geometry).map_err(|e| EngineError::WorkerGeometry {
        path: PathBuf::from(name),
        source: e,
    })
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<(), EngineError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| io_error(path, e))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<(), EngineError> {
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::geometry::GeometryAtom;
    use crate::core::models::species::SpeciesInfo;
    use crate::engine::config::WorkRequestBuilder;
    use nalgebra::Point3;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn request(seed: u64) -> WorkRequest {
        WorkRequestBuilder::new()
            .total_needed(10)
            .worker_count(3)
            .bounds(2.5, 7.0)
            .energy_command("fake-energy")
            .seed(Some(seed))
            .build()
            .unwrap()
    }

    fn atom(symbol: &str) -> Geometry {
        Geometry::new(vec![GeometryAtom::new(symbol, Point3::origin())])
    }

    fn payloads_for(plan: &FanOutPlan, seed: u64) -> Vec<WorkerPayload> {
        let req = request(seed);
        let pair = SpeciesPair::new(
            SpeciesInfo::neutral_singlet("CH4"),
            SpeciesInfo::neutral_singlet("Ar"),
        );
        build_payloads(
            plan,
            &pair,
            &TheoryLevel::new("mp2", "cc-pvdz"),
            &req,
            &atom("C"),
            &atom("Ar"),
            &mut seed_rng(req.seed),
        )
        .unwrap()
    }

    #[test]
    fn even_split_has_no_remainder() {
        let p = plan(6, 3).unwrap();
        assert_eq!(p.per_worker, vec![2, 2, 2]);
        assert_eq!(p.dropped_remainder, 0);
        assert_eq!(p.total_planned(), 6);
    }

    #[test]
    fn remainder_is_dropped_not_redistributed() {
        for additional in 0..40 {
            for workers in 1..9 {
                let p = plan(additional, workers).unwrap();
                let expected = if additional == 0 {
                    0
                } else {
                    (additional / workers) * workers
                };
                assert_eq!(p.total_planned(), expected);
                assert!(p.total_planned() <= additional);
                assert_eq!(p.total_planned() + p.dropped_remainder, additional);
            }
        }
        assert_eq!(plan(7, 3).unwrap().per_worker, vec![2, 2, 2]);
    }

    #[test]
    fn zero_workers_is_a_configuration_error() {
        assert!(matches!(
            plan(5, 0),
            Err(ConfigError::Invalid {
                parameter: "worker_count",
                ..
            })
        ));
    }

    #[test]
    fn nothing_needed_yields_empty_plan() {
        let p = plan(0, 4).unwrap();
        assert!(p.per_worker.is_empty());
        assert!(p.is_empty());
        assert!(payloads_for(&p, 1).is_empty());
    }

    #[test]
    fn fewer_samples_than_workers_schedules_nobody() {
        let p = plan(2, 3).unwrap();
        assert_eq!(p.per_worker, vec![0, 0, 0]);
        assert!(p.is_empty());
        assert!(payloads_for(&p, 1).is_empty());
    }

    #[test]
    fn payloads_are_complete_and_independently_seeded() {
        let p = plan(6, 3).unwrap();
        let payloads = payloads_for(&p, 42);
        assert_eq!(payloads.len(), 3);

        for (idx, payload) in payloads.iter().enumerate() {
            assert_eq!(payload.index, idx);
            assert_eq!(payload.sample_count, 2);
            let input = payload.file(onedmin::INPUT_FILE).unwrap();
            assert!(input.contents.contains("NSAMPS        2\n"));
            assert!(input.contents.contains("SMIN          2.5\n"));
            assert!(input.contents.contains(&format!("RANSEED       {}\n", payload.seed)));
            assert!(payload.file(onedmin::ENERGY_LAUNCHER_FILE).unwrap().executable);
            assert!(payload.file(onedmin::TARGET_FILE).is_some());
            assert!(payload.file(onedmin::BATH_FILE).is_some());
            assert!(payload.file(onedmin::ELSTRUCT_TEMPLATE_FILE).is_some());
        }
        let seeds: BTreeSet<u64> = payloads.iter().map(|p| p.seed).collect();
        assert_eq!(seeds.len(), 3);
    }

    #[test]
    fn fixed_seed_reproduces_payloads() {
        let p = plan(9, 3).unwrap();
        assert_eq!(payloads_for(&p, 7), payloads_for(&p, 7));
    }

    #[test]
    fn write_payloads_replaces_stale_run_directory() {
        let dir = tempdir().unwrap();
        let run_dir = dir.path().join("run");
        fs::create_dir_all(run_dir.join("job_009")).unwrap();
        fs::write(run_dir.join("job_009").join("lj.out"), "stale").unwrap();

        let payloads = payloads_for(&plan(4, 2).unwrap(), 3);
        let jobs = write_payloads(&run_dir, &payloads).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].path, run_dir.join("job_001"));
        assert!(!run_dir.join("job_009").exists());
        assert!(jobs[0].path.join(onedmin::INPUT_FILE).is_file());
        assert!(jobs[0].path.join(onedmin::TARGET_FILE).is_file());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(jobs[0].path.join(onedmin::ENERGY_LAUNCHER_FILE))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn job_dir_names_round_trip() {
        assert_eq!(job_dir_name(7), "job_007");
        assert_eq!(parse_job_index("job_007"), Some(7));
        assert_eq!(parse_job_index("job_1234"), Some(1234));
        assert_eq!(parse_job_index("run.log"), None);
        assert_eq!(parse_job_index("job_x"), None);
    }

    #[test]
    fn overlapping_directories_are_detected() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("save/CH4/Ar/hf_sto-3g");
        fs::create_dir_all(&store).unwrap();

        assert!(paths_overlap(&store, &store));
        assert!(paths_overlap(&store.join("job_000"), &store));
        assert!(paths_overlap(&dir.path().join("save"), &store));
        assert!(!paths_overlap(&dir.path().join("run/CH4/Ar/hf_sto-3g"), &store));
        assert!(!paths_overlap(&dir.path().join("save2"), &dir.path().join("save")));
    }
}
