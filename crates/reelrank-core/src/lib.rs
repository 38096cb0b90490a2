pub mod app_config;
pub mod config;
pub mod ranking;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use ranking::{parse_like_count, rank_most_liked, RankError};
pub use types::{CreatorRef, Field, VideoDetail, VideoMetrics, VideoSummary, UNAVAILABLE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
