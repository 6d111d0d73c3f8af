use crate::cli::ShowArgs;
use crate::commands::lj::print_values;
use crate::config::builder::build_show_config;
use crate::error::{CliError, Result};
use etrans::core::io::table::write_ensemble_csv;
use etrans::core::models::sample::{Quantity, Sample};
use etrans::core::store::CacheStore;
use etrans::core::store::fs::FsCacheStore;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub async fn run(args: ShowArgs) -> Result<()> {
    let config = build_show_config(&args)?;
    let store = FsCacheStore::new(&config.save_prefix);

    let Some(record) = store.read(&config.key)? else {
        println!(
            "No cached record for {} under {}",
            config.key,
            store.key_dir(&config.key).display()
        );
        return Ok(());
    };

    println!("Key:        {}", config.key);
    println!("Revision:   {}", record.revision);
    println!("Samples:    {}", record.sample_count);
    println!(
        "Program:    {} {} ({})",
        record.provenance.program, record.provenance.version, record.provenance.potential
    );
    print_values(&record.aggregated_values);
    if !record.is_count_consistent() {
        println!(
            "Warning: record lists {} samples but stores {}; the next run will recompute it.",
            record.sample_count,
            record.ensemble.len()
        );
    }

    if let Some(path) = &config.csv {
        info!("Exporting ensemble to {:?}", path);
        let file = File::create(path).map_err(|e| CliError::FileWriting {
            path: path.clone(),
            source: e.into(),
        })?;
        export_csv(BufWriter::new(file), path, &record.ensemble)?;
        println!("✓ Ensemble written to {}", path.display());
    }
    Ok(())
}

fn export_csv(writer: impl Write, path: &Path, ensemble: &[Sample]) -> Result<()> {
    write_ensemble_csv(writer, ensemble, &Quantity::LENNARD_JONES).map_err(|e| {
        CliError::FileWriting {
            path: path.to_path_buf(),
            source: e.into(),
        }
    })
}
