use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("webdriver error \"{error}\": {message}")]
    WebDriver { error: String, message: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ScraperError {
    /// `true` when the driver reported that a lookup matched nothing.
    #[must_use]
    pub fn is_missing_element(&self) -> bool {
        match self {
            ScraperError::ElementNotFound { .. } => true,
            ScraperError::WebDriver { error, .. } => {
                error == "no such element" || error == "stale element reference"
            }
            _ => false,
        }
    }
}
