//! Page fetcher backed by a WebDriver browser session.
//!
//! Each [`WebDriverFetcher`] owns exactly one session. The default
//! [`Selectors`] target the platform's creator and video pages; they are
//! plain XPath strings so a layout change is a configuration edit.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use reelrank_core::{CreatorRef, Field, VideoMetrics, VideoSummary};

use crate::error::ScraperError;
use crate::fetcher::{Fetcher, FetcherFactory};
use crate::webdriver::{DriverSettings, ElementRef, Session, WebDriverClient};

static PUBLISH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}").expect("valid regex"));

/// Extract a `YYYY-MM-DD HH:MM` timestamp from the date element's text,
/// which usually carries a label such as `发布时间：`.
#[must_use]
pub fn extract_publish_date(text: &str) -> Option<String> {
    PUBLISH_DATE_RE
        .find(text)
        .map(|m| m.as_str().to_string())
}

/// XPath selectors for the creator listing and the video detail page.
///
/// `item_*` selectors are relative to one listing item; everything else is
/// absolute.
#[derive(Debug, Clone)]
pub struct Selectors {
    /// Close button of the login overlay. `None` skips the dismissal step.
    pub login_popup_close: Option<String>,
    pub post_list: String,
    pub post_item: String,
    pub item_title: String,
    pub item_likes: String,
    pub item_link: String,
    pub detail_likes: String,
    pub detail_comments: String,
    pub detail_shares: String,
    pub detail_title: String,
    pub detail_author: String,
    pub detail_publish_date: String,
}

impl Default for Selectors {
    fn default() -> Self {
        const DETAIL: &str = r#"//*[@id="douyin-right-container"]/div[2]/div/div"#;
        Self {
            login_popup_close: Some(
                r#"//div[contains(text(), "登录后免费畅享高清视频")]/following-sibling::div"#
                    .to_string(),
            ),
            post_list: r#"//div[@data-e2e="user-post-list"]//ul"#.to_string(),
            post_item: ".//li".to_string(),
            item_title: ".//a//p".to_string(),
            item_likes: ".//span".to_string(),
            item_link: ".//a".to_string(),
            detail_likes: format!("{DETAIL}/div[1]/div[3]/div/div[2]/div[1]/div[1]/span"),
            detail_comments: format!("{DETAIL}/div[1]/div[3]/div/div[2]/div[1]/div[2]/span"),
            detail_shares: format!("{DETAIL}/div[1]/div[3]/div/div[2]/div[1]/div[3]/span"),
            detail_title: format!("{DETAIL}/div[1]/div[3]/div/div[1]"),
            detail_author: format!(
                "{DETAIL}/div[2]/div/div[1]/div[2]/a/div/span/span/span/span/span/span"
            ),
            detail_publish_date: format!("{DETAIL}/div[1]/div[3]/div/div[2]/div[2]"),
        }
    }
}

/// Opens one browser session per acquired fetcher.
pub struct WebDriverFactory {
    client: WebDriverClient,
    capabilities: Value,
    selectors: Arc<Selectors>,
}

impl WebDriverFactory {
    /// # Errors
    ///
    /// Returns an error if the WebDriver client cannot be constructed.
    pub fn new(settings: &DriverSettings, selectors: Selectors) -> Result<Self, ScraperError> {
        Ok(Self {
            client: WebDriverClient::new(settings)?,
            capabilities: settings.capabilities(),
            selectors: Arc::new(selectors),
        })
    }
}

impl FetcherFactory for WebDriverFactory {
    type Fetcher = WebDriverFetcher;

    async fn acquire(&self) -> Result<WebDriverFetcher, ScraperError> {
        let session = self.client.new_session(&self.capabilities).await?;
        Ok(WebDriverFetcher {
            session,
            selectors: Arc::clone(&self.selectors),
        })
    }
}

/// A single browser session driving creator and video pages.
pub struct WebDriverFetcher {
    session: Session,
    selectors: Arc<Selectors>,
}

impl WebDriverFetcher {
    /// Best-effort dismissal of the login overlay; its absence is normal.
    async fn dismiss_login_popup(&self) {
        let Some(xpath) = self.selectors.login_popup_close.as_deref() else {
            return;
        };
        match self.session.find_element(xpath).await {
            Ok(button) => {
                if let Err(e) = self.session.click(&button).await {
                    tracing::debug!(error = %e, "login overlay close button not clickable");
                }
            }
            Err(e) if e.is_missing_element() => {
                tracing::debug!("no login overlay present");
            }
            Err(e) => {
                tracing::debug!(error = %e, "login overlay lookup failed");
            }
        }
    }

    /// Text of the first match for `xpath`, or `None` if absent.
    async fn optional_text(&self, xpath: &str) -> Result<Option<String>, ScraperError> {
        match self.session.find_element(xpath).await {
            Ok(element) => self.session.text(&element).await.map(Some),
            Err(e) if e.is_missing_element() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn optional_child(
        &self,
        parent: &ElementRef,
        xpath: &str,
    ) -> Result<Option<ElementRef>, ScraperError> {
        match self.session.find_child(parent, xpath).await {
            Ok(element) => Ok(Some(element)),
            Err(e) if e.is_missing_element() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read one listing tile. Tiles without a link are skipped.
    async fn read_item(&self, item: &ElementRef) -> Result<Option<VideoSummary>, ScraperError> {
        let selectors = &self.selectors;

        let link = match self.optional_child(item, &selectors.item_link).await? {
            Some(anchor) => self.session.attribute(&anchor, "href").await?,
            None => None,
        };
        let Some(link) = link.filter(|l| !l.trim().is_empty()) else {
            tracing::warn!("skipping listing item without a video link");
            return Ok(None);
        };

        let title = match self.optional_child(item, &selectors.item_title).await? {
            Some(element) => {
                let text = self.session.text(&element).await?;
                if text.trim().is_empty() {
                    self.session
                        .attribute(&element, "textContent")
                        .await?
                        .unwrap_or_default()
                } else {
                    text
                }
            }
            None => String::new(),
        };

        let like_count_raw = match self.optional_child(item, &selectors.item_likes).await? {
            Some(element) => Some(self.session.text(&element).await?.trim().to_string()),
            None => None,
        };

        Ok(Some(VideoSummary {
            title: title.trim().to_string(),
            like_count_raw,
            link: link.trim().to_string(),
        }))
    }
}

impl Fetcher for WebDriverFetcher {
    async fn creator_videos(
        &mut self,
        creator: &CreatorRef,
    ) -> Result<Vec<VideoSummary>, ScraperError> {
        self.session.navigate(creator.as_str()).await?;
        self.dismiss_login_popup().await;

        let list = self.session.find_element(&self.selectors.post_list).await?;
        let items = self
            .session
            .find_children(&list, &self.selectors.post_item)
            .await?;

        let mut videos = Vec::with_capacity(items.len());
        for item in &items {
            if let Some(video) = self.read_item(item).await? {
                tracing::debug!(creator = %creator, title = %video.title, "listing item read");
                videos.push(video);
            }
        }

        tracing::info!(
            creator = %creator,
            items = items.len(),
            videos = videos.len(),
            "creator listing read"
        );
        Ok(videos)
    }

    async fn video_detail(&mut self, link: &str) -> Result<VideoMetrics, ScraperError> {
        self.session.navigate(link).await?;

        let selectors = Arc::clone(&self.selectors);
        let like_count = Field::from(self.optional_text(&selectors.detail_likes).await?);
        let comment_count = Field::from(self.optional_text(&selectors.detail_comments).await?);
        let share_count = Field::from(self.optional_text(&selectors.detail_shares).await?);
        let title = Field::from(self.optional_text(&selectors.detail_title).await?);
        let author_name = Field::from(self.optional_text(&selectors.detail_author).await?);
        let publish_date = self
            .optional_text(&selectors.detail_publish_date)
            .await?
            .as_deref()
            .and_then(extract_publish_date);

        let metrics = VideoMetrics {
            link: link.to_string(),
            title,
            author_name,
            like_count,
            comment_count,
            share_count,
            publish_date,
        };

        if !metrics.like_count.is_available()
            && !metrics.comment_count.is_available()
            && !metrics.share_count.is_available()
        {
            tracing::warn!(link, "video page exposed no engagement counters");
        }

        Ok(metrics)
    }

    async fn close(self) {
        let session_id = self.session.id().to_owned();
        if let Err(e) = self.session.delete().await {
            tracing::warn!(session_id = %session_id, error = %e, "failed to end webdriver session");
        }
    }
}
