//! End-to-end streaming runs

use crate::common::fastq_records;
use crate::scat;
use anyhow::Result;
use std::fs;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

/// PID of a process that has already exited and been reaped
fn dead_pid() -> Result<String> {
    let mut child = Command::new("true").spawn()?;
    let pid = child.id();
    child.wait()?;
    Ok(pid.to_string())
}

#[test]
fn test_existing_records_streamed_until_process_exits() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data");
    fs::create_dir_all(data.join("run1"))?;
    fs::write(data.join("run1/a.fastq"), fastq_records("a", 3))?;
    fs::write(data.join("notes.txt"), "not a read file\n")?;

    let pid = dead_pid()?;
    let result = scat!(temp_dir.path(), "-p", pid.as_str(), "data")
        .timeout(Duration::from_secs(20))
        .assert_success()?;

    assert_eq!(result.stdout, fastq_records("a", 3));
    assert!(result.duration >= Duration::from_secs(1));
    Ok(())
}

#[test]
fn test_output_file_and_fasta_conversion() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data");
    fs::create_dir(&data)?;
    fs::write(data.join("a.fq"), fastq_records("r", 2))?;

    let pid = dead_pid()?;
    scat!(temp_dir.path(), "-p", pid.as_str(), "-O", "fasta", "-o", "out.fa", "data", "-")
        .timeout(Duration::from_secs(20))
        .assert_success()?;

    let out = fs::read_to_string(temp_dir.path().join("out.fa"))?;
    assert_eq!(out, ">r0\nACGTACGT\n>r1\nACGTACGT\n");
    Ok(())
}

#[test]
fn test_time_limit_ends_idle_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::create_dir(temp_dir.path().join("data"))?;

    let result = scat!(temp_dir.path(), "-T", "300ms", "data")
        .timeout(Duration::from_secs(10))
        .assert_success()?;
    assert!(result.stdout.is_empty());
    Ok(())
}

#[test]
fn test_pattern_limits_tracked_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data = temp_dir.path().join("data");
    fs::create_dir_all(data.join("pass"))?;
    fs::create_dir_all(data.join("fail"))?;
    fs::write(data.join("pass/a.fastq"), fastq_records("pass", 1))?;
    fs::write(data.join("fail/b.fastq"), fastq_records("fail", 1))?;

    let pid = dead_pid()?;
    let result = scat!(temp_dir.path(), "-p", pid.as_str(), "-r", "pass/.*\\.fastq$", "data")
        .timeout(Duration::from_secs(20))
        .assert_success()?;

    assert_eq!(result.stdout, fastq_records("pass", 1));
    Ok(())
}
