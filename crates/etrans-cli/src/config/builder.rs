use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{AppConfig, ShowConfig};
use crate::cli::{KeyArgs, LjArgs, ShowArgs};
use crate::error::{CliError, Result};
use etrans::core::models::ids::{ComputationKey, SpeciesId, TheoryLevel};
use etrans::core::models::species::{SpeciesInfo, SpeciesPair};
use etrans::engine::config::WorkRequestBuilder;
use etrans::engine::fanout::paths_overlap;
use etrans::workflows::lennard_jones::LjJob;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub fn build_config(args: &LjArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = load_file(args.config.as_deref())?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let theory = resolve_theory(&args.key, &file_config, &defaults);
    let pair = SpeciesPair::new(
        species_info(&args.key.target, &file_config),
        species_info(&args.key.bath, &file_config),
    );

    let sampling = file_config.sampling.take().unwrap_or_default();
    let theory_file = file_config.theory.take().unwrap_or_default();
    let paths = file_config.paths.take().unwrap_or_default();

    let request = WorkRequestBuilder::new()
        .total_needed(args.nsamp.or(sampling.nsamp).unwrap_or(defaults.nsamp))
        .worker_count(args.njobs.or(sampling.njobs).unwrap_or(defaults.njobs))
        .bounds(
            args.smin.or(sampling.smin).unwrap_or(defaults.smin),
            args.smax.or(sampling.smax).unwrap_or(defaults.smax),
        )
        .overwrite(args.overwrite)
        .potential(sampling.potential.unwrap_or(defaults.potential))
        .energy_command(theory_file.energy_command.unwrap_or(defaults.energy_command))
        .seed(args.seed.or(sampling.seed))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let save_prefix = pick(&args.save_prefix, paths.save_prefix, defaults.save_prefix);
    let run_prefix = pick(&args.run_prefix, paths.run_prefix, defaults.run_prefix);
    let geometry_dir = pick(&args.geometry_dir, paths.geometry_dir, defaults.geometry_dir);
    let executable = pick(&args.executable, paths.executable, defaults.executable);
    if paths_overlap(&save_prefix, &run_prefix) {
        return Err(CliError::Config(format!(
            "run prefix '{}' overlaps save prefix '{}'",
            run_prefix.display(),
            save_prefix.display()
        )));
    }

    let key = ComputationKey::new(pair.target.id.clone(), pair.bath.id.clone(), theory.clone());
    let run_dir = run_prefix.join(key.relative_path());

    Ok(AppConfig {
        job: LjJob::new(pair, theory, request, run_dir),
        save_prefix,
        geometry_dir,
        executable,
    })
}

pub fn build_show_config(args: &ShowArgs) -> Result<ShowConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = load_file(args.config.as_deref())?;

    let theory = resolve_theory(&args.key, &file_config, &defaults);
    let key = ComputationKey::new(
        SpeciesId::new(args.key.target.as_str()),
        SpeciesId::new(args.key.bath.as_str()),
        theory,
    );
    let file_save_prefix = file_config.paths.and_then(|p| p.save_prefix);

    Ok(ShowConfig {
        key,
        save_prefix: pick(&args.save_prefix, file_save_prefix, defaults.save_prefix),
        csv: args.csv.clone(),
    })
}

fn load_file(path: Option<&Path>) -> Result<FileConfig> {
    match path {
        Some(path) => FileConfig::from_file(path),
        None => Ok(FileConfig::default()),
    }
}

fn pick(cli: &Option<PathBuf>, file: Option<PathBuf>, default: PathBuf) -> PathBuf {
    cli.clone().or(file).unwrap_or(default)
}

fn resolve_theory(key: &KeyArgs, file: &FileConfig, defaults: &DefaultsConfig) -> TheoryLevel {
    let theory = file.theory.as_ref();
    let method = key
        .method
        .clone()
        .or_else(|| theory.and_then(|t| t.method.clone()))
        .unwrap_or_else(|| defaults.method.clone());
    let basis = key
        .basis
        .clone()
        .or_else(|| theory.and_then(|t| t.basis.clone()))
        .unwrap_or_else(|| defaults.basis.clone());
    TheoryLevel::new(method, basis)
}

fn species_info(name: &str, file: &FileConfig) -> SpeciesInfo {
    match file.species.get(name) {
        Some(entry) => SpeciesInfo::new(name, entry.charge, entry.multiplicity),
        None => SpeciesInfo::neutral_singlet(name),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) = kv_pair.split_once('=').ok_or_else(|| {
            CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            ))
        })?;
        let (key, value) = (key.trim(), value.trim());

        match key {
            "sampling.nsamp" => {
                config.sampling.get_or_insert_with(Default::default).nsamp =
                    Some(parse_value(key, value, "integer")?);
            }
            "sampling.njobs" => {
                config.sampling.get_or_insert_with(Default::default).njobs =
                    Some(parse_value(key, value, "integer")?);
            }
            "sampling.smin" => {
                config.sampling.get_or_insert_with(Default::default).smin =
                    Some(parse_value(key, value, "float")?);
            }
            "sampling.smax" => {
                config.sampling.get_or_insert_with(Default::default).smax =
                    Some(parse_value(key, value, "float")?);
            }
            "sampling.seed" => {
                config.sampling.get_or_insert_with(Default::default).seed =
                    Some(parse_value(key, value, "integer")?);
            }
            "sampling.potential" => {
                config.sampling.get_or_insert_with(Default::default).potential =
                    Some(value.to_string());
            }
            "theory.method" => {
                config.theory.get_or_insert_with(Default::default).method = Some(value.to_string());
            }
            "theory.basis" => {
                config.theory.get_or_insert_with(Default::default).basis = Some(value.to_string());
            }
            "theory.energy-command" => {
                config.theory.get_or_insert_with(Default::default).energy_command =
                    Some(value.to_string());
            }
            "paths.save-prefix" => {
                config.paths.get_or_insert_with(Default::default).save_prefix =
                    Some(PathBuf::from(value));
            }
            "paths.run-prefix" => {
                config.paths.get_or_insert_with(Default::default).run_prefix =
                    Some(PathBuf::from(value));
            }
            "paths.geometry-dir" => {
                config.paths.get_or_insert_with(Default::default).geometry_dir =
                    Some(PathBuf::from(value));
            }
            "paths.executable" => {
                config.paths.get_or_insert_with(Default::default).executable =
                    Some(PathBuf::from(value));
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const CONFIG: &str = r#"
        [sampling]
        nsamp = 30
        njobs = 5
        smin = 2.5

        [theory]
        method = "ccsd-t"
        basis = "cc-pvtz"

        [paths]
        save-prefix = "/data/save"
        run-prefix = "/scratch/run"

        [species.CH3]
        multiplicity = 2
    "#;

    fn write_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("etrans.toml");
        fs::write(&path, CONFIG).unwrap();
        path
    }

    fn lj_args(extra: &[&str]) -> LjArgs {
        let mut argv = vec!["etrans", "lj", "-t", "CH3", "-b", "Ar"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Lj(args) => args,
            other => panic!("expected lj, got {:?}", other),
        }
    }

    #[test]
    fn defaults_apply_without_config_file() {
        let config = build_config(&lj_args(&[])).unwrap();
        let defaults = DefaultsConfig::default();

        assert_eq!(config.request().total_needed, defaults.nsamp);
        assert_eq!(config.request().worker_count, defaults.njobs);
        assert_eq!(config.request().bounds.min, defaults.smin);
        assert_eq!(config.key().theory, TheoryLevel::new("mp2", "cc-pvdz"));
        assert_eq!(config.pair().target.multiplicity, 1);
        assert_eq!(config.executable, PathBuf::from("onedmin-dd-molpro.x"));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir);
        let config = build_config(&lj_args(&["-c", path.to_str().unwrap()])).unwrap();

        assert_eq!(config.request().total_needed, 30);
        assert_eq!(config.request().worker_count, 5);
        assert_eq!(config.request().bounds.min, 2.5);
        assert_eq!(config.request().bounds.max, 6.0);
        assert_eq!(config.key().theory, TheoryLevel::new("ccsd-t", "cc-pvtz"));
        assert_eq!(config.pair().target.multiplicity, 2);
        assert_eq!(config.pair().multiplicity(), 2);
        assert_eq!(config.save_prefix, PathBuf::from("/data/save"));
        assert_eq!(
            config.job.run_dir,
            PathBuf::from("/scratch/run/CH3/Ar/ccsd-t_cc-pvtz")
        );
    }

    #[test]
    fn cli_args_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir);
        let config = build_config(&lj_args(&[
            "-c",
            path.to_str().unwrap(),
            "--nsamp",
            "50",
            "--method",
            "hf",
            "--save-prefix",
            "/elsewhere",
            "--overwrite",
        ]))
        .unwrap();

        assert_eq!(config.request().total_needed, 50);
        assert_eq!(config.request().worker_count, 5);
        assert!(config.request().overwrite);
        assert_eq!(config.key().theory, TheoryLevel::new("hf", "cc-pvtz"));
        assert_eq!(config.save_prefix, PathBuf::from("/elsewhere"));
    }

    #[test]
    fn set_values_override_file_but_not_cli() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir);
        let config = build_config(&lj_args(&[
            "-c",
            path.to_str().unwrap(),
            "-S",
            "sampling.njobs=2",
            "-S",
            "sampling.nsamp=8",
            "-S",
            "theory.basis=aug-cc-pvdz",
            "--nsamp",
            "12",
        ]))
        .unwrap();

        assert_eq!(config.request().worker_count, 2);
        assert_eq!(config.request().total_needed, 12);
        assert_eq!(config.key().theory.basis, "aug-cc-pvdz");
    }

    #[test]
    fn invalid_set_values_are_rejected() {
        for bad in ["sampling.njobs", "sampling.njobs=two", "sampling.unknown=1"] {
            let result = build_config(&lj_args(&["-S", bad]));
            assert!(matches!(result, Err(CliError::Config(_))), "{}", bad);
        }
    }

    #[test]
    fn invalid_request_is_a_config_error() {
        let result = build_config(&lj_args(&["--njobs", "0"]));
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("worker_count")));

        let result = build_config(&lj_args(&["--smin", "5", "--smax", "3"]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn overlapping_save_and_run_prefixes_are_rejected() {
        let dir = tempdir().unwrap();
        let save = dir.path().join("cache");
        let save = save.to_str().unwrap();
        let nested = dir.path().join("cache/scratch");
        for run in [save, nested.to_str().unwrap()] {
            let result = build_config(&lj_args(&["--save-prefix", save, "--run-prefix", run]));
            assert!(
                matches!(result, Err(CliError::Config(ref msg)) if msg.contains("overlaps")),
                "{}",
                run
            );
        }

        let run = dir.path().join("run");
        let run = run.to_str().unwrap();
        let result = build_config(&lj_args(&["--save-prefix", save, "--run-prefix", run]));
        assert!(result.is_ok());
    }

    #[test]
    fn show_config_uses_file_theory_and_prefix() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir);
        let args = match Cli::parse_from([
            "etrans",
            "show",
            "-t",
            "CH3",
            "-b",
            "Ar",
            "-c",
            path.to_str().unwrap(),
        ])
        .command
        {
            Commands::Show(args) => args,
            other => panic!("expected show, got {:?}", other),
        };

        let config = build_show_config(&args).unwrap();
        assert_eq!(config.key.to_string(), "CH3+Ar@ccsd-t/cc-pvtz");
        assert_eq!(config.save_prefix, PathBuf::from("/data/save"));
        assert!(config.csv.is_none());
    }
}
