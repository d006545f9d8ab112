use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OUTPUT: &str = "dabimasFactor.json";
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_DELAY_SECS: f64 = 0.3;
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_PROGRESS: usize = 100;

/// Everything one build run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output: PathBuf,
    /// Sparse row NDJSON, for checking against the legacy sheet.
    pub all_output: Option<PathBuf>,
    pub urls_file: Option<PathBuf>,
    /// 0 = no limit.
    pub limit: usize,
    pub workers: usize,
    /// Pause after each successful fetch, inside the worker.
    pub delay: Duration,
    pub timeout: Duration,
    pub retries: u32,
    /// Log every N written entries; 0 = never.
    pub progress: usize,
    pub fail_on_error: bool,
    /// Stallion icons excluded below max rarity.
    pub skip_icons: HashSet<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            output: PathBuf::from(DEFAULT_OUTPUT),
            all_output: None,
            urls_file: None,
            limit: 0,
            workers: DEFAULT_WORKERS,
            delay: secs(DEFAULT_DELAY_SECS, Duration::ZERO),
            timeout: secs(DEFAULT_TIMEOUT_SECS, Duration::from_secs(30)),
            retries: DEFAULT_RETRIES,
            progress: DEFAULT_PROGRESS,
            fail_on_error: false,
            skip_icons: HashSet::new(),
        }
    }
}

impl RunOptions {
    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }

    /// Subjects fetched between two ordered flushes.
    pub fn batch_size(&self) -> usize {
        self.workers() * 2
    }

    pub fn exit_code(&self, errors: usize) -> u8 {
        if self.fail_on_error && errors > 0 {
            1
        } else {
            0
        }
    }
}

/// Seconds from the command line; negative, NaN or overflowing values fall back.
pub fn secs(value: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(fallback)
}
