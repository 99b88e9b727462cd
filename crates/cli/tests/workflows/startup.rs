//! Startup validation: roots, flags and config file

use crate::common::ScatCommand;
use crate::scat;
use anyhow::Result;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_placeholder_root_only_exits_with_status_one() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = scat!(temp_dir.path(), "-").assert_failure()?;
    assert_eq!(result.exit_code, 1);
    assert!(result.contains_stderr("No directories given to watch! Exiting."));
    assert!(result.stdout.is_empty());
    Ok(())
}

#[test]
fn test_no_roots_exits_with_status_one() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = ScatCommand::new(temp_dir.path()).assert_failure()?;
    assert_eq!(result.exit_code, 1);
    assert!(result.contains_stderr("No directories given to watch!"));
    Ok(())
}

#[test]
fn test_malformed_pattern_is_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = scat!(temp_dir.path(), "-r", "(", ".").assert_failure()?;
    assert!(result.contains_stderr("invalid regular expression"));
    Ok(())
}

#[test]
fn test_malformed_drop_time_is_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = scat!(temp_dir.path(), "-D", "soon", ".").assert_failure()?;
    assert!(result.contains_stderr("invalid drop time"));
    Ok(())
}

#[test]
fn test_out_of_range_numbers_are_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = scat!(temp_dir.path(), "-d", "18014398509481984", ".").assert_failure()?;
    assert!(result.contains_stderr("too large"));

    let result = scat!(temp_dir.path(), "-p", "4294967297", ".").assert_failure()?;
    assert!(result.contains_stderr("out of range"));
    Ok(())
}

#[test]
fn test_fasta_to_fastq_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = scat!(temp_dir.path(), "-I", "fasta", "-O", "fastq", ".").assert_failure()?;
    assert!(result.contains_stderr("cannot write FASTQ output from FASTA input"));
    Ok(())
}

#[test]
fn test_unknown_config_key_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::write(temp_dir.path().join("scat.toml"), "[watch]\nthreshold = 3\n")?;

    let result = scat!(temp_dir.path(), "-c", "scat.toml", ".").assert_failure()?;
    assert!(result.contains_stderr("invalid config file"));
    Ok(())
}

#[test]
fn test_missing_root_is_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = scat!(temp_dir.path(), "-T", "5s", "does-not-exist").assert_failure()?;
    assert!(result.contains_stderr("does-not-exist"));
    Ok(())
}
