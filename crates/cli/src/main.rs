//! seqwatch CLI - scat command

use anyhow::Result;
use clap::Parser;
use cli_lib::{ScatArgs, ScatConfig};
use tracing::{info, warn, Level};
use watcher::usable_roots;

/// Exit status after a forced second interrupt (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ScatArgs::parse();
    init_tracing(&args);

    let roots = usable_roots(args.roots.iter().cloned());
    if roots.is_empty() {
        eprintln!("No directories given to watch! Exiting.");
        std::process::exit(1);
    }

    let config = ScatConfig::from_args(&args)?.validate()?;

    // Interrupts reach the blocking coordinator through a channel
    let (interrupt_tx, interrupt_rx) = crossbeam_channel::bounded(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        let _ = interrupt_tx.send(());
        // A second interrupt does not wait for the watchers to wind down
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted again, exiting without a clean shutdown");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    let summary =
        tokio::task::spawn_blocking(move || cli_lib::execute(roots, config, interrupt_rx)).await??;
    info!(records = summary.records, reason = ?summary.stop, "Exiting.");
    Ok(())
}

/// Log to stderr; stdout may carry records
fn init_tracing(args: &ScatArgs) {
    let level = if args.quiet {
        Level::WARN
    } else {
        match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
