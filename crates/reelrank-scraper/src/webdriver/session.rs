use reqwest::Method;
use serde_json::json;

use crate::error::ScraperError;

use super::wire;
use super::WebDriverClient;

/// Handle on a DOM element inside a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    id: String,
}

impl ElementRef {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl From<wire::RawElement> for ElementRef {
    fn from(raw: wire::RawElement) -> Self {
        Self { id: raw.id }
    }
}

/// One live browser session. Must be ended with [`Session::delete`].
#[derive(Debug)]
pub struct Session {
    client: WebDriverClient,
    id: String,
}

impl Session {
    pub(super) fn new(client: WebDriverClient, id: String) -> Self {
        Self { client, id }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Load `url` in the session's window and wait for the page load.
    ///
    /// # Errors
    ///
    /// [`ScraperError::InvalidUrl`] for non-absolute URLs; transport and
    /// driver errors after retries are exhausted otherwise.
    pub async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        reqwest::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        let path = format!("/session/{}/url", self.id);
        let body = json!({ "url": url });
        self.client
            .retry_policy()
            .run(|| self.client.command::<()>(Method::POST, &path, Some(&body)))
            .await
    }

    /// First element matching `xpath`, waiting up to the implicit timeout.
    ///
    /// # Errors
    ///
    /// [`ScraperError::ElementNotFound`] when nothing matches.
    pub async fn find_element(&self, xpath: &str) -> Result<ElementRef, ScraperError> {
        let path = format!("/session/{}/element", self.id);
        self.locate_one(&path, xpath).await
    }

    /// First descendant of `parent` matching a relative `xpath`.
    ///
    /// # Errors
    ///
    /// [`ScraperError::ElementNotFound`] when nothing matches.
    pub async fn find_child(
        &self,
        parent: &ElementRef,
        xpath: &str,
    ) -> Result<ElementRef, ScraperError> {
        let path = format!("/session/{}/element/{}/element", self.id, parent.id);
        self.locate_one(&path, xpath).await
    }

    /// Every descendant of `parent` matching a relative `xpath`.
    ///
    /// # Errors
    ///
    /// Transport and driver errors.
    pub async fn find_children(
        &self,
        parent: &ElementRef,
        xpath: &str,
    ) -> Result<Vec<ElementRef>, ScraperError> {
        let path = format!("/session/{}/element/{}/elements", self.id, parent.id);
        self.locate_all(&path, xpath).await
    }

    /// Rendered text of `element`.
    ///
    /// # Errors
    ///
    /// Transport and driver errors.
    pub async fn text(&self, element: &ElementRef) -> Result<String, ScraperError> {
        let path = format!("/session/{}/element/{}/text", self.id, element.id);
        self.client.command(Method::GET, &path, None).await
    }

    /// Attribute `name` of `element`, `None` when the attribute is absent.
    ///
    /// # Errors
    ///
    /// Transport and driver errors.
    pub async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        let path = format!(
            "/session/{}/element/{}/attribute/{name}",
            self.id, element.id
        );
        self.client.command(Method::GET, &path, None).await
    }

    /// # Errors
    ///
    /// Transport and driver errors.
    pub async fn click(&self, element: &ElementRef) -> Result<(), ScraperError> {
        let path = format!("/session/{}/element/{}/click", self.id, element.id);
        self.client
            .command::<()>(Method::POST, &path, Some(&json!({})))
            .await
    }

    /// End the session and close its browser window.
    ///
    /// # Errors
    ///
    /// Transport and driver errors. The session is unusable afterwards
    /// either way.
    pub async fn delete(self) -> Result<(), ScraperError> {
        let path = format!("/session/{}", self.id);
        self.client.command::<()>(Method::DELETE, &path, None).await
    }

    async fn locate_one(&self, path: &str, xpath: &str) -> Result<ElementRef, ScraperError> {
        let body = json!({ "using": "xpath", "value": xpath });
        self.client
            .command::<wire::RawElement>(Method::POST, path, Some(&body))
            .await
            .map(ElementRef::from)
            .map_err(|e| not_found_for(e, xpath))
    }

    async fn locate_all(&self, path: &str, xpath: &str) -> Result<Vec<ElementRef>, ScraperError> {
        let body = json!({ "using": "xpath", "value": xpath });
        let raw: Vec<wire::RawElement> = self
            .client
            .command(Method::POST, path, Some(&body))
            .await
            .map_err(|e| not_found_for(e, xpath))?;
        Ok(raw.into_iter().map(ElementRef::from).collect())
    }
}

/// Rewrite the driver's generic "no such element" into an error naming the
/// selector that missed.
fn not_found_for(err: ScraperError, xpath: &str) -> ScraperError {
    if err.is_missing_element() {
        ScraperError::ElementNotFound {
            selector: xpath.to_owned(),
        }
    } else {
        err
    }
}
