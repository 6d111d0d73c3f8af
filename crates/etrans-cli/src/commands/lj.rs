use crate::cli::LjArgs;
use crate::config::builder::build_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use etrans::core::store::fs::FsCacheStore;
use etrans::engine::commit::CommitOutcome;
use etrans::engine::execution::LocalExecutor;
use etrans::engine::progress::ProgressReporter;
use etrans::engine::provider::XyzDirectoryProvider;
use etrans::workflows::lennard_jones::{self, LjOutcome, LjServices};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub async fn run(args: LjArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_config(&args)?;
    let key = config.key().clone();

    let store = FsCacheStore::new(&config.save_prefix);
    let provider = XyzDirectoryProvider::new(&config.geometry_dir);
    let executor = LocalExecutor::new(&config.executable);
    let services = LjServices {
        store: &store,
        provider: &provider,
        executor: &executor,
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Sampling Lennard-Jones parameters for {} ({} samples requested, {} job(s))...",
        key,
        config.request().total_needed,
        config.request().worker_count
    );
    info!(
        "Charge {} and multiplicity {} for the combined system.",
        config.pair().charge(),
        config.pair().multiplicity()
    );

    let outcome =
        tokio::task::block_in_place(|| lennard_jones::run(&config.job, &services, &reporter))?;

    match outcome {
        LjOutcome::Cached { record } => {
            println!(
                "✓ Cache already holds {} sample(s); nothing to run.",
                record.sample_count
            );
            print_values(&record.aggregated_values);
        }
        LjOutcome::NoUpdate { report } => {
            warn!("Run produced no usable samples; cache left unchanged.");
            println!(
                "Warning: no usable samples were produced ({} of {} job(s) left no output). The cache was not changed.",
                report.failed_workers.len(),
                report.plan.per_worker.iter().filter(|&&n| n > 0).count()
            );
        }
        LjOutcome::Updated {
            commit,
            sample_count,
            values,
            report,
        } => {
            let failed = progress_handler.failed_jobs();
            if !failed.is_empty() {
                println!("  {} job(s) exited unsuccessfully: {:?}", failed.len(), failed);
            }
            if !report.dropped.is_empty() {
                println!("  {} incomplete sample(s) dropped.", report.dropped.len());
            }
            match commit {
                CommitOutcome::Written { revision } => println!(
                    "✓ Stored {} sample(s) ({} new) as revision {} under {}",
                    sample_count,
                    report.new_samples,
                    revision,
                    store.key_dir(&key).display()
                ),
                CommitOutcome::Unchanged { revision } => println!(
                    "✓ Cache already up to date at revision {} ({} sample(s)).",
                    revision, sample_count
                ),
            }
            print_values(&values);
            if sample_count < config.request().total_needed {
                println!(
                    "Note: {} of {} requested samples are cached; run again to top up.",
                    sample_count,
                    config.request().total_needed
                );
            }
        }
    }

    Ok(())
}

pub(crate) fn print_values<K: std::fmt::Display>(values: &BTreeMap<K, f64>) {
    for (quantity, value) in values {
        println!("  {:<8} = {:.6}", quantity.to_string(), value);
    }
}
