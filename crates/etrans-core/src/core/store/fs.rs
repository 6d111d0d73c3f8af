use super::{CacheStore, StoreError, WriteDecision, WriteOutcome, decide_write};
use crate::core::io::traits::TextFormat;
use crate::core::io::xyz::{TrajectoryFile, XyzFrame};
use crate::core::models::ids::ComputationKey;
use crate::core::models::record::{CacheRecord, Provenance};
use crate::core::models::sample::{Quantity, QuantityValues, Sample};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LOCK_FILE: &str = ".lock";
const CURRENT_FILE: &str = "CURRENT";
const INFO_FILE: &str = "info.toml";
const PARAMS_FILE: &str = "lj.toml";
const TRAJECTORY_FILE: &str = "traj.xyz";
const GENERATION_PREFIX: &str = "gen-";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct InfoFile {
    sample_count: usize,
    revision: u64,
    program: String,
    version: String,
    potential: String,
}

/// Filesystem-backed store.
///
/// Each key owns one directory below the root. A record is written in full into a
/// fresh generation directory and becomes visible only when the `CURRENT` pointer is
/// atomically renamed onto it, so readers observe either the old or the new record,
/// never a mix. Writers hold an exclusive lock on the key's `.lock` file and readers a
/// shared one, so a generation is never pruned while it is being read.
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn key_dir(&self, key: &ComputationKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    fn read_published(&self, key_dir: &Path) -> Result<Option<CacheRecord>, StoreError> {
        let current_path = key_dir.join(CURRENT_FILE);
        let generation = match fs::read_to_string(&current_path) {
            Ok(content) => content.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&current_path, e)),
        };
        if !generation.starts_with(GENERATION_PREFIX) || generation.contains(['/', '\\']) {
            return Err(StoreError::Corrupt {
                path: current_path,
                reason: format!("invalid generation name '{}'", generation),
            });
        }
        read_generation(&key_dir.join(generation)).map(Some)
    }
}

impl CacheStore for FsCacheStore {
    fn read(&self, key: &ComputationKey) -> Result<Option<CacheRecord>, StoreError> {
        let key_dir = self.key_dir(key);
        debug!("Reading cache record for {} from {:?}", key, &key_dir);

        let lock_path = key_dir.join(LOCK_FILE);
        let lock_file = match File::open(&lock_path) {
            Ok(file) => file,
            // No writer has locked this key yet, so no generation can be pruned.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return self.read_published(&key_dir);
            }
            Err(e) => return Err(io_error(&lock_path, e)),
        };
        lock_file
            .lock_shared()
            .map_err(|e| io_error(&lock_path, e))?;

        let result = self.read_published(&key_dir);

        if let Err(e) = FileExt::unlock(&lock_file) {
            warn!("Failed to release lock {:?}: {}", &lock_path, e);
        }
        result
    }

    fn write(
        &self,
        key: &ComputationKey,
        record: &CacheRecord,
        expected_revision: Option<u64>,
    ) -> Result<WriteOutcome, StoreError> {
        let key_dir = self.key_dir(key);
        fs::create_dir_all(&key_dir).map_err(|e| io_error(&key_dir, e))?;

        let lock_path = key_dir.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| io_error(&lock_path, e))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| io_error(&lock_path, e))?;

        let result = self.publish_locked(key, &key_dir, record, expected_revision);

        if let Err(e) = FileExt::unlock(&lock_file) {
            warn!("Failed to release lock {:?}: {}", &lock_path, e);
        }
        result
    }

    fn location(&self, key: &ComputationKey) -> Option<PathBuf> {
        Some(self.key_dir(key))
    }
}

impl FsCacheStore {
    fn publish_locked(
        &self,
        key: &ComputationKey,
        key_dir: &Path,
        record: &CacheRecord,
        expected_revision: Option<u64>,
    ) -> Result<WriteOutcome, StoreError> {
        let current = self.read_published(key_dir)?;
        let revision = match decide_write(key, current.as_ref(), record, expected_revision)? {
            WriteDecision::Skip { revision } => {
                debug!("Record for {} unchanged at revision {}", key, revision);
                return Ok(WriteOutcome::Unchanged { revision });
            }
            WriteDecision::Publish { revision } => revision,
        };

        let generation = format!("{}{:06}", GENERATION_PREFIX, revision);
        let gen_dir = key_dir.join(&generation);
        if gen_dir.exists() {
            // Leftover of an interrupted write that never reached CURRENT.
            fs::remove_dir_all(&gen_dir).map_err(|e| io_error(&gen_dir, e))?;
        }
        fs::create_dir_all(&gen_dir).map_err(|e| io_error(&gen_dir, e))?;
        write_generation(&gen_dir, record, revision)?;

        let staged_pointer = key_dir.join(format!("{}.tmp", CURRENT_FILE));
        write_synced(&staged_pointer, generation.as_bytes())?;
        let current_path = key_dir.join(CURRENT_FILE);
        fs::rename(&staged_pointer, &current_path).map_err(|e| io_error(&current_path, e))?;
        debug!("Published {} for {} at {:?}", &generation, key, key_dir);

        prune_generations(key_dir, &generation);
        Ok(WriteOutcome::Written { revision })
    }
}

fn write_generation(dir: &Path, record: &CacheRecord, revision: u64) -> Result<(), StoreError> {
    let info = InfoFile {
        sample_count: record.sample_count,
        revision,
        program: record.provenance.program.clone(),
        version: record.provenance.version.clone(),
        potential: record.provenance.potential.clone(),
    };
    let info_path = dir.join(INFO_FILE);
    let info_toml = toml::to_string(&info).map_err(|e| StoreError::TomlSer {
        path: info_path.clone(),
        source: e,
    })?;
    write_synced(&info_path, info_toml.as_bytes())?;

    let params: BTreeMap<String, f64> = record
        .aggregated_values
        .iter()
        .map(|(q, v)| (q.label().to_ascii_lowercase(), *v))
        .collect();
    let params_path = dir.join(PARAMS_FILE);
    let params_toml = toml::to_string(&params).map_err(|e| StoreError::TomlSer {
        path: params_path.clone(),
        source: e,
    })?;
    write_synced(&params_path, params_toml.as_bytes())?;

    let frames: Vec<XyzFrame> = record
        .ensemble
        .iter()
        .map(|sample| XyzFrame::new(frame_comment(&sample.values), sample.geometry.clone()))
        .collect();
    let traj_path = dir.join(TRAJECTORY_FILE);
    let traj = TrajectoryFile::render(&frames).map_err(|e| StoreError::Trajectory {
        path: traj_path.clone(),
        source: e,
    })?;
    write_synced(&traj_path, traj.as_bytes())
}

fn read_generation(dir: &Path) -> Result<CacheRecord, StoreError> {
    let info_path = dir.join(INFO_FILE);
    let info_content = fs::read_to_string(&info_path).map_err(|e| io_error(&info_path, e))?;
    let info: InfoFile = toml::from_str(&info_content).map_err(|e| StoreError::TomlDe {
        path: info_path.clone(),
        source: e,
    })?;

    let params_path = dir.join(PARAMS_FILE);
    let params_content = fs::read_to_string(&params_path).map_err(|e| io_error(&params_path, e))?;
    let params: BTreeMap<String, f64> =
        toml::from_str(&params_content).map_err(|e| StoreError::TomlDe {
            path: params_path.clone(),
            source: e,
        })?;
    let mut aggregated_values = BTreeMap::new();
    for (name, value) in params {
        let quantity = name.parse::<Quantity>().map_err(|e| StoreError::Corrupt {
            path: params_path.clone(),
            reason: e.to_string(),
        })?;
        aggregated_values.insert(quantity, value);
    }

    let traj_path = dir.join(TRAJECTORY_FILE);
    let frames = TrajectoryFile::read_from_path(&traj_path).map_err(|e| StoreError::Trajectory {
        path: traj_path.clone(),
        source: e,
    })?;
    let ensemble = frames
        .into_iter()
        .map(|frame| {
            let values = parse_frame_comment(&frame.comment).map_err(|reason| StoreError::Corrupt {
                path: traj_path.clone(),
                reason,
            })?;
            Ok(Sample::new(frame.geometry, values))
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    Ok(CacheRecord {
        sample_count: info.sample_count,
        aggregated_values,
        ensemble,
        provenance: Provenance {
            program: info.program,
            version: info.version,
            potential: info.potential,
        },
        revision: info.revision,
    })
}

/// Trajectory frame comment, e.g. `Epsilon: 120.4   Sigma: 3.51`.
fn frame_comment(values: &QuantityValues) -> String {
    values
        .iter()
        .map(|(q, v)| format!("{}: {}", q.label(), v))
        .collect::<Vec<_>>()
        .join("   ")
}

fn parse_frame_comment(comment: &str) -> Result<QuantityValues, String> {
    let mut values = QuantityValues::new();
    let mut tokens = comment.split_whitespace();
    while let Some(token) = tokens.next() {
        let Some(label) = token.strip_suffix(':') else {
            return Err(format!("unexpected token '{}' in frame comment", token));
        };
        let quantity = label.parse::<Quantity>().map_err(|e| e.to_string())?;
        let raw = tokens
            .next()
            .ok_or_else(|| format!("missing value for {}", quantity))?;
        let value: f64 = raw
            .parse()
            .map_err(|_| format!("invalid value '{}' for {}", raw, quantity))?;
        values.insert(quantity, value);
    }
    Ok(values)
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = File::create(path).map_err(|e| io_error(path, e))?;
    file.write_all(bytes).map_err(|e| io_error(path, e))?;
    file.sync_all().map_err(|e| io_error(path, e))
}

fn prune_generations(key_dir: &Path, keep: &str) {
    let entries = match fs::read_dir(key_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list {:?} for pruning: {}", key_dir, e);
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(GENERATION_PREFIX) && name != keep {
            if let Err(e) = fs::remove_dir_all(entry.path()) {
                warn!("Failed to prune stale generation {:?}: {}", entry.path(), e);
            }
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::geometry::{Geometry, GeometryAtom};
    use crate::core::models::ids::TheoryLevel;
    use nalgebra::Point3;
    use tempfile::tempdir;

    fn key() -> ComputationKey {
        ComputationKey::new(
            "C2H6".into(),
            "Ar".into(),
            TheoryLevel::new("b2plypd3", "cc-pvtz"),
        )
    }

    fn sample(eps: f64, sig: f64, x: f64) -> Sample {
        Sample::new(
            Geometry::new(vec![
                GeometryAtom::new("C", Point3::new(0.0, 0.0, 0.0)),
                GeometryAtom::new("Ar", Point3::new(x, 0.1, -0.2)),
            ]),
            QuantityValues::from([(Quantity::Epsilon, eps), (Quantity::Sigma, sig)]),
        )
    }

    fn record(samples: Vec<Sample>) -> CacheRecord {
        let n = samples.len() as f64;
        let mean = |q: Quantity| samples.iter().map(|s| s.values[&q]).sum::<f64>() / n;
        CacheRecord {
            sample_count: samples.len(),
            aggregated_values: BTreeMap::from([
                (Quantity::Epsilon, mean(Quantity::Epsilon)),
                (Quantity::Sigma, mean(Quantity::Sigma)),
            ]),
            ensemble: samples,
            provenance: Provenance::new("OneDMin", "1.2.0", "lj-12-6"),
            revision: 0,
        }
    }

    #[test]
    fn missing_record_reads_as_none() {
        let dir = tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        assert!(store.read(&key()).unwrap().is_none());
    }

    #[test]
    fn written_record_reads_back_with_assigned_revision() {
        let dir = tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        let rec = record(vec![sample(120.4, 3.51, 4.2), sample(1.0 / 3.0, 3.7, 5.123456789)]);

        let outcome = store.write(&key(), &rec, None).unwrap();
        assert_eq!(outcome, WriteOutcome::Written { revision: 1 });

        let back = store.read(&key()).unwrap().unwrap();
        assert_eq!(back.revision, 1);
        assert!(back.same_content(&rec));

        let key_dir = store.key_dir(&key());
        assert_eq!(
            fs::read_to_string(key_dir.join(CURRENT_FILE)).unwrap(),
            "gen-000001"
        );
        let traj = fs::read_to_string(key_dir.join("gen-000001").join(TRAJECTORY_FILE)).unwrap();
        assert!(traj.contains("Epsilon: 120.4   Sigma: 3.51"));
    }

    #[test]
    fn second_generation_replaces_and_prunes_first() {
        let dir = tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        store
            .write(&key(), &record(vec![sample(1.0, 2.0, 3.0)]), None)
            .unwrap();
        let outcome = store
            .write(
                &key(),
                &record(vec![sample(1.0, 2.0, 3.0), sample(3.0, 4.0, 5.0)]),
                Some(1),
            )
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Written { revision: 2 });

        let key_dir = store.key_dir(&key());
        assert!(!key_dir.join("gen-000001").exists());
        assert!(key_dir.join("gen-000002").exists());
        let back = store.read(&key()).unwrap().unwrap();
        assert_eq!(back.sample_count, 2);
        assert_eq!(back.aggregated(Quantity::Epsilon), Some(2.0));
    }

    #[test]
    fn pruning_waits_for_readers_of_the_old_generation() {
        let dir = tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        store
            .write(&key(), &record(vec![sample(1.0, 2.0, 3.0)]), None)
            .unwrap();
        let key_dir = store.key_dir(&key());

        let reader_lock = File::open(key_dir.join(LOCK_FILE)).unwrap();
        reader_lock.lock_shared().unwrap();

        let writer_store = store.clone();
        let writer = std::thread::spawn(move || {
            writer_store
                .write(
                    &key(),
                    &record(vec![sample(1.0, 2.0, 3.0), sample(3.0, 4.0, 5.0)]),
                    Some(1),
                )
                .unwrap()
        });
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert!(key_dir.join("gen-000001").join(INFO_FILE).exists());
        assert_eq!(read_generation(&key_dir.join("gen-000001")).unwrap().sample_count, 1);

        FileExt::unlock(&reader_lock).unwrap();
        assert_eq!(writer.join().unwrap(), WriteOutcome::Written { revision: 2 });
        assert!(!key_dir.join("gen-000001").exists());
        assert_eq!(store.read(&key()).unwrap().unwrap().sample_count, 2);
    }

    #[test]
    fn identical_rewrite_is_unchanged_and_keeps_files() {
        let dir = tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        let rec = record(vec![sample(5.0, 6.0, 7.0)]);
        store.write(&key(), &rec, None).unwrap();
        let again = store.write(&key(), &rec, None).unwrap();
        assert_eq!(again, WriteOutcome::Unchanged { revision: 1 });
        assert_eq!(store.read(&key()).unwrap().unwrap().revision, 1);
    }

    #[test]
    fn conflicting_write_leaves_published_record_untouched() {
        let dir = tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        store
            .write(&key(), &record(vec![sample(1.0, 1.0, 1.0)]), None)
            .unwrap();

        let err = store
            .write(&key(), &record(vec![sample(9.0, 9.0, 9.0)]), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { found: Some(1), .. }));

        let back = store.read(&key()).unwrap().unwrap();
        assert_eq!(back.aggregated(Quantity::Epsilon), Some(1.0));
    }

    #[test]
    fn unpublished_generation_is_invisible() {
        let dir = tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        let key_dir = store.key_dir(&key());
        fs::create_dir_all(key_dir.join("gen-000001")).unwrap();
        fs::write(key_dir.join("gen-000001").join(INFO_FILE), "garbage").unwrap();
        assert!(store.read(&key()).unwrap().is_none());

        store
            .write(&key(), &record(vec![sample(2.0, 3.0, 4.0)]), None)
            .unwrap();
        assert_eq!(store.read(&key()).unwrap().unwrap().sample_count, 1);
    }

    #[test]
    fn keys_with_similar_theory_names_do_not_share_records() {
        let dir = tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        let with_parens = ComputationKey::new(
            "CH4".into(),
            "Ar".into(),
            TheoryLevel::new("ccsd(t)", "cc-pvdz"),
        );
        let with_underscores = ComputationKey::new(
            "CH4".into(),
            "Ar".into(),
            TheoryLevel::new("ccsd_t_", "cc-pvdz"),
        );
        store
            .write(&with_parens, &record(vec![sample(1.0, 2.0, 3.0)]), None)
            .unwrap();

        assert!(store.read(&with_underscores).unwrap().is_none());
        assert_ne!(store.key_dir(&with_parens), store.key_dir(&with_underscores));
    }

    #[test]
    fn pointer_outside_generation_namespace_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        let key_dir = store.key_dir(&key());
        fs::create_dir_all(&key_dir).unwrap();
        fs::write(key_dir.join(CURRENT_FILE), "../elsewhere").unwrap();
        assert!(matches!(
            store.read(&key()).unwrap_err(),
            StoreError::Corrupt { .. }
        ));
    }

    #[test]
    fn frame_comment_round_trips_and_rejects_garbage() {
        let values = QuantityValues::from([(Quantity::Epsilon, 0.1 + 0.2), (Quantity::Sigma, 3.0)]);
        let comment = frame_comment(&values);
        assert_eq!(parse_frame_comment(&comment).unwrap(), values);
        assert!(parse_frame_comment("Epsilon 1.0").is_err());
        assert!(parse_frame_comment("Epsilon:").is_err());
        assert!(parse_frame_comment("Epsilon: x").is_err());
        assert!(parse_frame_comment("").unwrap().is_empty());
    }
}
