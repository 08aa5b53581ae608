use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub max_requests_per_crawl: Option<usize>,

    #[serde(default)]
    pub max_requests_per_minute: Option<usize>,

    #[serde(default = "default_request_handler_timeout_secs")]
    pub request_handler_timeout_secs: u64,

    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    #[serde(default = "default_max_request_retries")]
    pub max_request_retries: usize,

    #[serde(default)]
    pub respect_robots_txt: bool,

    #[serde(default = "default_blocked_status_codes")]
    pub blocked_status_codes: Vec<u16>,

    #[serde(default = "default_on_handler_error")]
    pub on_handler_error: OnError,

    #[serde(default = "default_handle_sigint")]
    pub handle_sigint: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_concurrency: default_max_concurrency(),
            max_requests_per_crawl: None,
            max_requests_per_minute: None,
            request_handler_timeout_secs: default_request_handler_timeout_secs(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            max_request_retries: default_max_request_retries(),
            respect_robots_txt: false,
            blocked_status_codes: default_blocked_status_codes(),
            on_handler_error: default_on_handler_error(),
            handle_sigint: default_handle_sigint(),
        }
    }
}

impl CrawlerConfig {
    pub fn request_handler_timeout(&self) -> Duration {
        Duration::from_secs(self.request_handler_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

fn default_user_agent() -> String {
    String::from("starter-crawler")
}

fn default_max_concurrency() -> usize {
    200
}

fn default_request_handler_timeout_secs() -> u64 {
    60
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_max_request_retries() -> usize {
    3
}

fn default_blocked_status_codes() -> Vec<u16> {
    vec![401, 403, 429]
}

fn default_on_handler_error() -> OnError {
    OnError::SkipAndLog
}

fn default_handle_sigint() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}
