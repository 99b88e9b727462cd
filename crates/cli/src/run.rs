//! Wires a validated configuration into a coordinator run

use crate::config::RunConfig;
use crate::liveness::PidProbe;
use crate::sink::FastxSink;
use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use scat_core::FastxSessionFactory;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use watcher::{
    Coordinator, CoordinatorOptions, NativeSource, RunSummary, TracingDiagnostics, WatchOptions,
};

/// Watch `roots` until a shutdown trigger fires
///
/// `interrupts` delivers the user interrupt; the run stops on its first
/// value. Blocks the calling thread for the whole run.
pub fn execute(roots: Vec<PathBuf>, config: RunConfig, interrupts: Receiver<()>) -> Result<RunSummary> {
    let sources = roots
        .into_iter()
        .map(|root| {
            let source = NativeSource::new()
                .with_context(|| format!("Failed to start change notifications for {}", root.display()))?;
            Ok((root, source))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut sink = FastxSink::open(&config.out_file, config.out_format)
        .with_context(|| format!("Failed to open output {}", config.out_file))?;

    let options = CoordinatorOptions {
        time_limit: config.time_limit,
        ..CoordinatorOptions::default()
    };
    let mut coordinator = Coordinator::launch(
        sources,
        Arc::new(FastxSessionFactory::new(config.parse)),
        WatchOptions::new(config.filter, config.policy),
        Arc::new(TracingDiagnostics),
        options,
    )?
    .with_interrupts(interrupts);

    if let Some(pid) = config.wait_pid {
        info!("Running until process with PID {} exits.", pid);
        coordinator = coordinator.with_probe(Box::new(PidProbe::new(pid)));
    }
    if let Some(limit) = config.time_limit {
        info!("Stopping after {} without new records.", humantime::format_duration(limit));
    }

    Ok(coordinator.run(&mut sink)?)
}
