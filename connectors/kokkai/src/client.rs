use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::KokkaiConfig;
use crate::models::{DateRange, MeetingRecord, MeetingResponse};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to meeting API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("meeting API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode meeting API response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Worth retrying: network trouble, throttling, or a server-side fault.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Decode(_) => false,
        }
    }
}

/// One page of meeting records, addressed by 1-based record offset.
#[async_trait]
pub trait MeetingSource: Send + Sync {
    async fn fetch_page(
        &self,
        range: &DateRange,
        start_record: u32,
        page_size: u32,
    ) -> Result<Vec<MeetingRecord>, FetchError>;
}

pub struct KokkaiClient {
    client: Client,
    base_url: String,
}

impl KokkaiClient {
    pub fn new(config: &KokkaiConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent("diet-topics/0.1 (kokkai connector)")
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl MeetingSource for KokkaiClient {
    async fn fetch_page(
        &self,
        range: &DateRange,
        start_record: u32,
        page_size: u32,
    ) -> Result<Vec<MeetingRecord>, FetchError> {
        let start_record = start_record.to_string();
        let page_size = page_size.to_string();
        let query = [
            ("recordPacking", "json"),
            ("maximumRecords", page_size.as_str()),
            ("startRecord", start_record.as_str()),
            ("from", range.from()),
            ("until", range.until()),
        ];

        debug!(
            "Requesting meeting records {} (startRecord={}, maximumRecords={})",
            range, start_record, page_size
        );

        let response = self.client.get(&self.base_url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let page: MeetingResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        debug!(
            "Meeting API returned {} records (total {:?})",
            page.meeting_record.len(),
            page.number_of_records
        );

        Ok(page.meeting_record)
    }
}
