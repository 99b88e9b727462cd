//! Runs where files change while `scat` is watching
//!
//! Roots are given relative to the working directory, as on a command
//! line, while change notifications arrive with absolute paths.

use crate::common::fastq_records;
use crate::scat;
use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn append(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

#[test]
fn test_growth_after_startup_streamed_once() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data");
    fs::create_dir(&data)?;
    let file = data.join("a.fastq");
    fs::write(&file, fastq_records("a", 2))?;

    let run = scat!(temp_dir.path(), "-T", "2s", "-d", "0", "-D", "50ms", "data")
        .timeout(Duration::from_secs(30))
        .spawn()?;
    assert!(run.wait_for_stdout("@a1\n"));

    append(&file, &fastq_records("b", 2))?;
    assert!(run.wait_for_stdout("@b1\n"));

    let result = run.wait()?;
    assert!(result.success(), "stderr: {}", result.stderr);
    assert_eq!(result.stdout, fastq_records("a", 2) + &fastq_records("b", 2));
    Ok(())
}

#[test]
fn test_files_in_new_subdirectories_registered_once() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::create_dir(temp_dir.path().join("data"))?;

    let run = scat!(temp_dir.path(), "-T", "2s", "-d", "0", "-D", "50ms", "data")
        .timeout(Duration::from_secs(30))
        .spawn()?;
    assert!(run.wait_for_stderr("Watcher launched on root"));

    // Registered from its create notification
    fs::write(temp_dir.path().join("data/a.fastq"), fastq_records("a", 2))?;
    assert!(run.wait_for_stdout("@a1\n"));

    // A new directory re-walks the whole root, a.fastq included
    fs::create_dir(temp_dir.path().join("data/sub"))?;
    fs::write(temp_dir.path().join("data/sub/b.fastq"), fastq_records("b", 2))?;
    assert!(run.wait_for_stdout("@b1\n"));

    let result = run.wait()?;
    assert!(result.success(), "stderr: {}", result.stderr);
    assert_eq!(result.stdout, fastq_records("a", 2) + &fastq_records("b", 2));
    assert_eq!(result.stderr.matches("Watching file:").count(), 2);
    assert_eq!(result.stderr.matches("Watching directory:").count(), 1);
    Ok(())
}

#[test]
fn test_truncated_file_is_dropped() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data");
    fs::create_dir(&data)?;
    let file = data.join("a.fastq");
    fs::write(&file, fastq_records("a", 20))?;

    let run = scat!(temp_dir.path(), "-T", "2s", "-D", "50ms", "data")
        .timeout(Duration::from_secs(30))
        .spawn()?;
    assert!(run.wait_for_stdout("@a19\n"));
    std::thread::sleep(Duration::from_millis(200));

    fs::write(&file, fastq_records("t", 1))?;
    assert!(run.wait_for_stderr("Stopped watching truncated file"));

    let result = run.wait()?;
    assert!(result.success(), "stderr: {}", result.stderr);
    assert_eq!(result.stdout, fastq_records("a", 20));
    Ok(())
}

#[test]
fn test_removed_file_is_dropped() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data");
    fs::create_dir(&data)?;
    fs::write(data.join("a.fastq"), fastq_records("a", 1))?;
    fs::write(data.join("b.fastq"), fastq_records("b", 1))?;

    let run = scat!(temp_dir.path(), "-T", "2s", "-d", "0", "-D", "50ms", "data")
        .timeout(Duration::from_secs(30))
        .spawn()?;
    assert!(run.wait_for_stdout("@a0\n"));
    assert!(run.wait_for_stdout("@b0\n"));

    fs::remove_file(data.join("a.fastq"))?;
    assert!(run.wait_for_stderr("Removed file:"));
    append(&data.join("b.fastq"), &fastq_records("c", 1))?;
    assert!(run.wait_for_stdout("@c0\n"));

    let result = run.wait()?;
    assert!(result.success(), "stderr: {}", result.stderr);
    Ok(())
}

#[test]
fn test_removing_root_ends_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data");
    fs::create_dir(&data)?;
    fs::write(data.join("a.fastq"), fastq_records("a", 2))?;

    // No pid and no time limit: only the root going away ends this run
    let run = scat!(temp_dir.path(), "data")
        .timeout(Duration::from_secs(20))
        .spawn()?;
    assert!(run.wait_for_stdout("@a1\n"));

    fs::remove_dir_all(&data)?;

    let result = run.wait()?;
    assert!(!result.timed_out, "stderr: {}", result.stderr);
    assert!(result.success(), "stderr: {}", result.stderr);
    assert!(result.contains_stderr("Watch root disappeared"));
    assert_eq!(result.stdout, fastq_records("a", 2));
    Ok(())
}
