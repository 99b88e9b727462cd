//! Command-line flags, config file, and their validated merge
//!
//! Every setting resolves as: explicit flag, then the `[watch]` table of
//! the config file, then the built-in default.

use clap::{ArgAction, Parser};
use scat_core::{ParseOptions, RecordFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use watcher::{GrowthPolicy, NameFilter};

pub const DEFAULT_OUT_FILE: &str = "-";
pub const DEFAULT_PATTERN: &str = watcher::pattern::DEFAULT_PATTERN;
pub const DEFAULT_FORMAT: &str = "fastq";
pub const DEFAULT_QUAL_BASE: i64 = 33;
pub const DEFAULT_DELTA_KIB: i64 = 5;
pub const DEFAULT_DROP_TIME: &str = "500ms";

/// scat - stream FASTA/FASTQ records from files growing under watched directories
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "scat")]
#[command(author, version, about, long_about = None)]
pub struct ScatArgs {
    /// Directories to watch ("-" is ignored)
    #[arg(value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// Output file ("-" for stdout, ".gz" suffix for gzip)
    #[arg(short = 'o', long)]
    pub out_file: Option<String>,

    /// Regular expression matched against the full path of candidate files
    #[arg(short = 'r', long)]
    pub regexp: Option<String>,

    /// Input format (fasta or fastq)
    #[arg(short = 'I', long)]
    pub in_format: Option<String>,

    /// Output format (fasta or fastq)
    #[arg(short = 'O', long)]
    pub out_format: Option<String>,

    /// ASCII base of quality scores
    #[arg(short = 'b', long)]
    pub qual_ascii_base: Option<i64>,

    /// Allow gap characters in sequences
    #[arg(short = 'A', long)]
    pub allow_gaps: bool,

    /// Minimum growth in KiB before a file is re-read
    #[arg(short = 'd', long, allow_negative_numbers = true)]
    pub delta: Option<i64>,

    /// Minimum time between re-reads of one file (e.g. 500ms, 2s)
    #[arg(short = 'D', long)]
    pub drop_time: Option<String>,

    /// Stop once the process with this PID exits (negative disables)
    #[arg(short = 'p', long, allow_negative_numbers = true)]
    pub wait_pid: Option<i64>,

    /// Stop after this long without new records (e.g. 10m)
    #[arg(short = 'T', long)]
    pub time_limit: Option<String>,

    /// TOML config file with a [watch] table
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Contents of a config file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub watch: WatchSection,
}

/// The `[watch]` table
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchSection {
    pub out_file: Option<String>,
    pub regexp: Option<String>,
    pub in_format: Option<String>,
    pub out_format: Option<String>,
    pub qual_ascii_base: Option<i64>,
    pub allow_gaps: Option<bool>,
    pub delta: Option<i64>,
    pub drop_time: Option<String>,
    pub wait_pid: Option<i64>,
    pub time_limit: Option<String>,
}

/// Config file problems
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl FileConfig {
    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Settings after merging flags, config file and defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScatConfig {
    pub out_file: String,
    pub regexp: String,
    pub in_format: String,
    pub out_format: String,
    pub qual_ascii_base: i64,
    pub allow_gaps: bool,
    pub delta: i64,
    pub drop_time: String,
    pub wait_pid: i64,
    pub time_limit: Option<String>,
}

/// Settings that failed validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid regular expression {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid {key} {value:?}: {source}")]
    Duration {
        key: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("invalid {key}: {reason}")]
    Format { key: &'static str, reason: String },

    #[error("quality ASCII base must be between 33 and 126, got {0}")]
    QualityBase(i64),

    #[error("delta must not be negative, got {0}")]
    NegativeDelta(i64),

    #[error("delta of {0} KiB is too large")]
    DeltaTooLarge(i64),

    #[error("process id {0} is out of range")]
    PidOutOfRange(i64),

    #[error("cannot write FASTQ output from FASTA input")]
    FastaToFastq,
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub out_file: String,
    pub filter: NameFilter,
    pub parse: ParseOptions,
    pub out_format: RecordFormat,
    pub policy: GrowthPolicy,
    /// `None` when no process gates shutdown
    pub wait_pid: Option<i32>,
    pub time_limit: Option<Duration>,
}

impl ScatConfig {
    /// Merge flags over a config file over the defaults
    pub fn merge(args: &ScatArgs, file: FileConfig) -> Self {
        let w = file.watch;
        Self {
            out_file: args
                .out_file
                .clone()
                .or(w.out_file)
                .unwrap_or_else(|| DEFAULT_OUT_FILE.to_string()),
            regexp: args
                .regexp
                .clone()
                .or(w.regexp)
                .unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
            in_format: args
                .in_format
                .clone()
                .or(w.in_format)
                .unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            out_format: args
                .out_format
                .clone()
                .or(w.out_format)
                .unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            qual_ascii_base: args
                .qual_ascii_base
                .or(w.qual_ascii_base)
                .unwrap_or(DEFAULT_QUAL_BASE),
            // A switch can only turn gaps on
            allow_gaps: args.allow_gaps || w.allow_gaps.unwrap_or(false),
            delta: args.delta.or(w.delta).unwrap_or(DEFAULT_DELTA_KIB),
            drop_time: args
                .drop_time
                .clone()
                .or(w.drop_time)
                .unwrap_or_else(|| DEFAULT_DROP_TIME.to_string()),
            wait_pid: args.wait_pid.or(w.wait_pid).unwrap_or(-1),
            time_limit: args.time_limit.clone().or(w.time_limit),
        }
    }

    /// Resolve flags, loading the config file they name
    pub fn from_args(args: &ScatArgs) -> Result<Self, ConfigFileError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(args, file))
    }

    /// Check every setting and convert it to its typed form
    pub fn validate(&self) -> Result<RunConfig, ConfigError> {
        let filter = NameFilter::new(&self.regexp).map_err(|source| ConfigError::Pattern {
            pattern: self.regexp.clone(),
            source,
        })?;

        let in_format = parse_format("input format", &self.in_format)?;
        let out_format = parse_format("output format", &self.out_format)?;
        if in_format == RecordFormat::Fasta && out_format == RecordFormat::Fastq {
            return Err(ConfigError::FastaToFastq);
        }

        if !(33..=126).contains(&self.qual_ascii_base) {
            return Err(ConfigError::QualityBase(self.qual_ascii_base));
        }
        if self.delta < 0 {
            return Err(ConfigError::NegativeDelta(self.delta));
        }

        let min_growth = u64::try_from(self.delta)
            .ok()
            .and_then(|kib| kib.checked_mul(1024))
            .ok_or(ConfigError::DeltaTooLarge(self.delta))?;
        let wait_pid = match self.wait_pid {
            pid if pid < 0 => None,
            pid => Some(i32::try_from(pid).map_err(|_| ConfigError::PidOutOfRange(pid))?),
        };

        let cooldown = parse_duration("drop time", &self.drop_time)?;
        let time_limit = self
            .time_limit
            .as_deref()
            .map(|value| parse_duration("time limit", value))
            .transpose()?;

        Ok(RunConfig {
            out_file: self.out_file.clone(),
            filter,
            parse: ParseOptions {
                format: in_format,
                qual_base: self.qual_ascii_base as u8,
                allow_gaps: self.allow_gaps,
            },
            out_format,
            policy: GrowthPolicy::new(min_growth, cooldown),
            wait_pid,
            time_limit,
        })
    }
}

fn parse_format(key: &'static str, value: &str) -> Result<RecordFormat, ConfigError> {
    value
        .parse()
        .map_err(|reason| ConfigError::Format { key, reason })
}

fn parse_duration(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|source| ConfigError::Duration {
        key,
        value: value.to_string(),
        source,
    })
}
