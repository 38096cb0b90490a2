pub mod error;
pub mod fetcher;
pub mod page;
pub mod retry;
pub mod webdriver;

pub use error::ScraperError;
pub use fetcher::{Fetcher, FetcherFactory};
pub use page::{extract_publish_date, Selectors, WebDriverFactory, WebDriverFetcher};
pub use webdriver::{DriverSettings, ElementRef, Session, WebDriverClient};
