//! `build` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, bail};
use futures::future::join_all;
use varpack_core::{Builder, CommandBuilder, Config, module_dir, stage_output};
use varpack_schema::{ModuleId, Variant};

/// Build every module for each variant and stage the output.
///
/// Modules are built in chunks of `parallel` blocking tasks. A failure stops
/// the run once its chunk has finished.
///
/// # Errors
///
/// Returns an error naming every module that failed in the chunk.
pub async fn build(
    config: &Config,
    modules: &[ModuleId],
    variants: &[Variant],
    parallel: usize,
    verbose: bool,
) -> Result<()> {
    let start_time = Instant::now();
    let parallel = parallel.max(1);
    println!(
        "  targets: {}",
        variants
            .iter()
            .map(Variant::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut built = 0;
    for &variant in variants {
        let builder = Arc::new(
            CommandBuilder::new(
                config.build.command.clone(),
                config.build.output_dir.clone(),
                variant,
                config.build.log_dir.clone(),
            )
            .verbose(verbose),
        );

        for chunk in modules.chunks(parallel) {
            let tasks: Vec<_> = chunk
                .iter()
                .map(|module| {
                    let builder = Arc::clone(&builder);
                    let module = module.clone();
                    let source = module_dir(&config.modules_root, &module);
                    let artifacts_dir = config.artifacts_dir.clone();

                    tokio::task::spawn_blocking(move || -> Result<PathBuf> {
                        println!("  processing {module} ({variant})");
                        let lib_dir = builder.build(&module, &source)?;
                        stage_output(&artifacts_dir, variant, &module, &lib_dir)
                    })
                })
                .collect();

            let results = join_all(tasks).await;

            let mut failed = Vec::new();
            for (module, result) in chunk.iter().zip(results) {
                match result {
                    Ok(Ok(dest)) => {
                        built += 1;
                        println!("    staged {module} -> {}", dest.display());
                    }
                    Ok(Err(e)) => {
                        eprintln!("    error: {module}: {e:#}");
                        failed.push(module.to_string());
                    }
                    Err(e) => {
                        eprintln!("    error: {module}: build task panicked: {e}");
                        failed.push(module.to_string());
                    }
                }
            }
            if !failed.is_empty() {
                bail!("Build failed for {variant}: {}", failed.join(", "));
            }
        }
    }

    println!();
    println!(
        "  {built} built in {:.1}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
