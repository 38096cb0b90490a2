use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub input_path: PathBuf,
    pub input_column: String,
    pub output_dir: PathBuf,
    pub max_workers: usize,
    /// Upper bound on one creator's pipeline. `0` disables the bound.
    pub task_timeout_secs: u64,
    /// Wall-clock budget for the whole run. `0` disables the deadline.
    pub run_deadline_secs: u64,
    pub webdriver_url: String,
    pub page_load_timeout_secs: u64,
    pub user_agent: String,
    pub headless: bool,
    pub fetch_max_retries: u32,
    pub fetch_retry_backoff_ms: u64,
}

impl AppConfig {
    #[must_use]
    pub fn task_timeout(&self) -> Option<Duration> {
        (self.task_timeout_secs > 0).then(|| Duration::from_secs(self.task_timeout_secs))
    }

    #[must_use]
    pub fn run_deadline(&self) -> Option<Duration> {
        (self.run_deadline_secs > 0).then(|| Duration::from_secs(self.run_deadline_secs))
    }
}
