//! HTTP client for the upstream timetable endpoint.
//!
//! The upstream keys responses by teacher display name plus a single date and
//! answers with up to 14 days of Russian-localized HTML. It rejects bare
//! default HTTP clients, so the request carries browser-like headers.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use tracing::warn;
use url::Url;

use super::error::ScheduleError;

/// Base URL for the timetable service.
const TIMETABLE_BASE_URL: &str = "https://kis.vgltu.ru/schedule";

/// Configuration for the timetable client.
#[derive(Debug, Clone)]
pub struct TimetableConfig {
    pub base_url: String,
    pub accept: String,
    pub accept_language: String,
    pub user_agent: String,
    /// Total per-request timeout
    pub timeout: Duration,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self {
            base_url: TIMETABLE_BASE_URL.to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".to_string(),
            accept_language: "ru-RU,ru;q=0.8,en-US;q=0.5,en;q=0.3".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// One fetched timetable page plus the request trace shown to clients.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub debug: String,
    pub html: String,
}

/// Translation from (teacher, date) to raw timetable HTML.
///
/// The period walker only depends on this trait, so tests drive it with a
/// canned-page stub instead of the network.
pub trait FetchTimetable: Send + Sync {
    fn fetch(
        &self,
        teacher: &str,
        date: &str,
    ) -> impl Future<Output = Result<FetchedPage, ScheduleError>> + Send;
}

/// Client for fetching schedule pages from the timetable service.
#[derive(Debug, Clone)]
pub struct ScheduleFetcher {
    client: Client,
    config: TimetableConfig,
}

impl ScheduleFetcher {
    /// Creates a fetcher with the default upstream configuration.
    pub fn new() -> Result<Self, ScheduleError> {
        Self::with_config(TimetableConfig::default())
    }

    /// Creates a fetcher with custom configuration.
    pub fn with_config(config: TimetableConfig) -> Result<Self, ScheduleError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScheduleError::Network {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    /// Builds the upstream request URL with escaped query parameters.
    fn request_url(&self, teacher: &str, date: &str) -> Result<Url, ScheduleError> {
        Url::parse_with_params(&self.config.base_url, &[("teacher", teacher), ("date", date)])
            .map_err(|e| ScheduleError::Network {
                message: format!("Failed to build request URL: {e}"),
            })
    }
}

impl FetchTimetable for ScheduleFetcher {
    async fn fetch(&self, teacher: &str, date: &str) -> Result<FetchedPage, ScheduleError> {
        let mut debug = String::new();
        let url = self.request_url(teacher, date)?;
        debug.push_str(&format!("Fetching URL: {url}\n"));

        let response = self
            .client
            .get(url)
            .header(ACCEPT, self.config.accept.as_str())
            .header(ACCEPT_LANGUAGE, self.config.accept_language.as_str())
            .header(USER_AGENT, self.config.user_agent.as_str())
            .send()
            .await?;

        // The upstream answers 200 even for bad input, with an HTML error
        // fragment as the body; the status line is recorded but not enforced.
        debug.push_str(&format!("Response status: {}\n", response.status()));

        let html = response.text().await?;
        debug.push_str(&format!("\nResponse length: {} bytes\n", html.len()));

        if html.is_empty() {
            warn!(teacher, date, "empty response received from timetable service");
            return Err(ScheduleError::EmptyResponse);
        }

        Ok(FetchedPage { debug, html })
    }
}
