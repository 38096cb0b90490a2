use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Read `.env` (if any) and then the process environment.
///
/// # Errors
///
/// Returns `ConfigError` when a variable is set to an unusable value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Same as [`load_app_config`] but without touching `.env`.
///
/// # Errors
///
/// Returns `ConfigError` when a variable is set to an unusable value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.into(),
    }
}

/// Env lookup with per-variable defaults and typed parsing.
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    fn text(&self, var: &str, default: &str) -> String {
        (self.lookup)(var).unwrap_or_else(|_| default.to_string())
    }

    fn number<T>(&self, var: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.text(var, default);
        raw.trim()
            .parse::<T>()
            .map_err(|e| invalid(var, format!("\"{raw}\": {e}")))
    }

    fn flag(&self, var: &str, default: &str) -> Result<bool, ConfigError> {
        match self.text(var, default).trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        }
    }
}

/// Assemble an [`AppConfig`] from `lookup`, falling back to defaults for
/// unset variables. Tests pass a `HashMap` lookup instead of the real
/// environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let vars = Vars { lookup };

    let env = parse_environment(&vars.text("REELRANK_ENV", "development"))?;
    let log_level = vars.text("REELRANK_LOG_LEVEL", "info");

    let input_path = PathBuf::from(vars.text("REELRANK_INPUT_PATH", "./creators.xlsx"));
    let input_column = vars.text("REELRANK_INPUT_COLUMN", "link").trim().to_string();
    if input_column.is_empty() {
        return Err(invalid("REELRANK_INPUT_COLUMN", "column name must be non-empty"));
    }
    let output_dir = PathBuf::from(vars.text("REELRANK_OUTPUT_DIR", "./reports"));

    let max_workers: usize = vars.number("REELRANK_MAX_WORKERS", "4")?;
    if max_workers == 0 {
        return Err(invalid("REELRANK_MAX_WORKERS", "must be at least 1"));
    }

    let page_load_timeout_secs = vars.number("REELRANK_PAGE_LOAD_TIMEOUT_SECS", "10")?;
    let task_timeout_secs = vars.number("REELRANK_TASK_TIMEOUT_SECS", "120")?;
    let run_deadline_secs = vars.number("REELRANK_RUN_DEADLINE_SECS", "0")?;
    let fetch_max_retries = vars.number("REELRANK_FETCH_MAX_RETRIES", "2")?;
    let fetch_retry_backoff_ms = vars.number("REELRANK_FETCH_RETRY_BACKOFF_MS", "500")?;

    let webdriver_url = vars.text("REELRANK_WEBDRIVER_URL", "http://localhost:9515");
    let user_agent = vars.text("REELRANK_USER_AGENT", DEFAULT_USER_AGENT);
    let headless = vars.flag("REELRANK_HEADLESS", "true")?;

    Ok(AppConfig {
        env,
        log_level,
        input_path,
        input_column,
        output_dir,
        max_workers,
        task_timeout_secs,
        run_deadline_secs,
        webdriver_url,
        page_load_timeout_secs,
        user_agent,
        headless,
        fetch_max_retries,
        fetch_retry_backoff_ms,
    })
}

fn parse_environment(raw: &str) -> Result<Environment, ConfigError> {
    match raw.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(invalid(
            "REELRANK_ENV",
            format!("unknown environment \"{other}\""),
        )),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
