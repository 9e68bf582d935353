use std::time::Duration;

pub const KOKKAI_MEETING_URL: &str = "https://kokkai.ndl.go.jp/api/meeting";
/// The meeting endpoint refuses more than ten records per page.
pub const MAX_PAGE_SIZE: u32 = 10;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct KokkaiConfig {
    pub base_url: String,
    pub page_size: u32,
    /// Pause before every page request after the first.
    pub page_delay: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl KokkaiConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

impl Default for KokkaiConfig {
    fn default() -> Self {
        Self {
            base_url: KOKKAI_MEETING_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: shared::RetryPolicy::DEFAULT_MAX_RETRIES,
        }
    }
}
