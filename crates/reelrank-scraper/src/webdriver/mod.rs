//! Minimal W3C WebDriver client over HTTP.
//!
//! Talks to an already-running driver (chromedriver, geckodriver, or a
//! Selenium grid) through its JSON wire protocol. Only the commands the
//! page fetcher needs are implemented.

mod session;
mod wire;

use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use reelrank_core::AppConfig;

use crate::error::ScraperError;
use crate::retry::RetryPolicy;

pub use session::{ElementRef, Session};

/// Extra headroom on top of the page-load budget before the HTTP request
/// itself is abandoned.
const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 30;

/// Browser and driver settings for one run.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub webdriver_url: String,
    pub user_agent: String,
    pub headless: bool,
    /// Applied both as the page-load timeout and as the implicit wait for
    /// element lookups.
    pub page_load_timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl DriverSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            user_agent: config.user_agent.clone(),
            headless: config.headless,
            page_load_timeout_secs: config.page_load_timeout_secs,
            max_retries: config.fetch_max_retries,
            backoff_base_ms: config.fetch_retry_backoff_ms,
        }
    }

    /// `POST /session` payload requesting a Chrome session.
    #[must_use]
    pub fn capabilities(&self) -> Value {
        let mut args = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-extensions".to_string(),
            "--disable-notifications".to_string(),
            "--blink-settings=imagesEnabled=false".to_string(),
            format!("--user-agent={}", self.user_agent),
        ];
        if self.headless {
            args.insert(0, "--headless=new".to_string());
        }

        let wait_ms = self.page_load_timeout_secs.saturating_mul(1_000);
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "acceptInsecureCerts": true,
                    "timeouts": {
                        "implicit": wait_ms,
                        "pageLoad": wait_ms,
                    },
                    "goog:chromeOptions": {
                        "args": args,
                    },
                }
            }
        })
    }
}

/// HTTP handle on a WebDriver server. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl WebDriverClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `settings.webdriver_url` is not
    /// an absolute URL, or [`ScraperError::Http`] if the HTTP client cannot be
    /// built.
    pub fn new(settings: &DriverSettings) -> Result<Self, ScraperError> {
        let parsed =
            reqwest::Url::parse(&settings.webdriver_url).map_err(|e| ScraperError::InvalidUrl {
                url: settings.webdriver_url.clone(),
                reason: e.to_string(),
            })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(
                settings
                    .page_load_timeout_secs
                    .saturating_add(REQUEST_TIMEOUT_MARGIN_SECS),
            ))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_owned(),
            retry: RetryPolicy::new(settings.max_retries, settings.backoff_base_ms),
        })
    }

    /// Open a new browser session with the given capabilities payload.
    ///
    /// # Errors
    ///
    /// Propagates transport and driver errors after retries are exhausted.
    pub async fn new_session(&self, capabilities: &Value) -> Result<Session, ScraperError> {
        let created: wire::NewSession = self
            .retry
            .run(|| self.command(Method::POST, "/session", Some(capabilities)))
            .await?;

        tracing::debug!(session_id = %created.session_id, "webdriver session created");
        Ok(Session::new(self.clone(), created.session_id))
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send one command and unwrap the `{"value": ...}` envelope.
    pub(crate) async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ScraperError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_str::<wire::Envelope<wire::ErrorValue>>(&text) {
                return Err(ScraperError::WebDriver {
                    error: envelope.value.error,
                    message: envelope.value.message,
                });
            }
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        serde_json::from_str::<wire::Envelope<T>>(&text)
            .map(|envelope| envelope.value)
            .map_err(|e| ScraperError::Deserialize {
                context: format!("{method} {path}"),
                source: e,
            })
    }
}
