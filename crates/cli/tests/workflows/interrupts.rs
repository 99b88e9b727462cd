//! Ctrl-C handling of a running `scat`

use crate::common::fastq_records;
use crate::scat;
use anyhow::Result;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_interrupt_stops_run_cleanly() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data");
    fs::create_dir(&data)?;
    fs::write(data.join("a.fastq"), fastq_records("a", 3))?;

    let run = scat!(temp_dir.path(), "data")
        .timeout(Duration::from_secs(20))
        .spawn()?;
    assert!(run.wait_for_stdout("@a2\n"));
    run.interrupt()?;

    let result = run.wait()?;
    assert!(result.success(), "stderr: {}", result.stderr);
    assert!(result.contains_stderr("Interrupt received"));
    assert_eq!(result.stdout, fastq_records("a", 3));
    Ok(())
}

#[test]
fn test_second_interrupt_exits_during_stalled_shutdown() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data");
    fs::create_dir(&data)?;
    // Far more output than a pipe buffers, so writing stdout stalls
    fs::write(data.join("a.fastq"), fastq_records("a", 40_000))?;

    let run = scat!(temp_dir.path(), "data")
        .timeout(Duration::from_secs(20))
        .hold_stdout()
        .spawn()?;
    assert!(run.wait_for_stderr("Watching file"));
    std::thread::sleep(Duration::from_secs(1));

    run.interrupt()?;
    std::thread::sleep(Duration::from_millis(300));
    run.interrupt()?;

    let result = run.wait()?;
    assert!(!result.timed_out, "stderr: {}", result.stderr);
    assert_eq!(result.exit_code, 130);
    assert!(result.contains_stderr("Interrupted again"));
    Ok(())
}
