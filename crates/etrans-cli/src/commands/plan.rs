use crate::cli::LjArgs;
use crate::config::builder::build_config;
use crate::error::Result;
use etrans::core::store::fs::FsCacheStore;
use etrans::engine::need::NeedReason;
use etrans::workflows::lennard_jones;
use tracing::info;

pub async fn run(args: LjArgs) -> Result<()> {
    let config = build_config(&args)?;
    let store = FsCacheStore::new(&config.save_prefix);

    info!("Previewing run for {}", config.key());
    let preview = lennard_jones::preview(&config.job, &store)?;

    println!("Key:        {}", config.key());
    println!("Cache:      {}", store.key_dir(config.key()).display());
    match preview.cached_samples {
        Some(n) => println!("Cached:     {} sample(s)", n),
        None => println!("Cached:     none"),
    }
    println!("Requested:  {}", config.request().total_needed);

    let reason = match preview.assessment.reason {
        NeedReason::Missing => "no cached record",
        NeedReason::Overwrite => "overwrite requested",
        NeedReason::Insufficient { .. } => "cache holds too few samples",
        NeedReason::Satisfied { .. } => "cache already satisfies the request",
    };
    println!(
        "Needed:     {} ({})",
        preview.assessment.additional_needed, reason
    );

    if let Some(plan) = preview.plan {
        println!(
            "Jobs:       {:?} ({} planned)",
            plan.per_worker,
            plan.total_planned()
        );
        if plan.dropped_remainder > 0 {
            println!(
                "Warning: {} sample(s) do not divide evenly across {} job(s) and will not be scheduled.",
                plan.dropped_remainder,
                plan.per_worker.len()
            );
        }
        println!("Run dir:    {}", config.job.run_dir.display());
    }
    Ok(())
}
