use nonzero_ext::nonzero;
use shared::{RateLimiter, RetryPolicy};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::{FetchError, MeetingSource};
use crate::config::KokkaiConfig;
use crate::models::{DateRange, MeetingRecord};

/// Why pagination stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEnd {
    /// An empty page: the range has no more records.
    Exhausted,
    /// A page could not be retrieved even after retries. Records gathered
    /// before it are kept, but the range is probably incomplete.
    Failed { start_record: u32, reason: String },
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub records: Vec<MeetingRecord>,
    pub end: FetchEnd,
    pub pages: u32,
}

pub struct RecordFetcher<S> {
    source: S,
    page_size: u32,
    page_delay: Duration,
    rate_limiter: RateLimiter,
}

impl<S: MeetingSource> RecordFetcher<S> {
    pub fn new(source: S, config: &KokkaiConfig) -> Self {
        let policy = RetryPolicy::new(config.max_retries, Duration::from_secs(1));
        Self::with_policy(source, config, policy)
    }

    pub fn with_policy(source: S, config: &KokkaiConfig, policy: RetryPolicy) -> Self {
        Self {
            source,
            page_size: config.effective_page_size(),
            page_delay: config.page_delay,
            rate_limiter: RateLimiter::new(nonzero!(10u32), policy),
        }
    }

    pub async fn fetch_all(&self, range: &DateRange) -> FetchOutcome {
        let mut records = Vec::new();
        let mut start_record: u32 = 1;
        let mut pages = 0u32;

        info!("Fetching meeting records for {}", range);

        let end = loop {
            if pages > 0 && !self.page_delay.is_zero() {
                sleep(self.page_delay).await;
            }

            let result = self
                .rate_limiter
                .execute_with_retry_if(
                    || self.source.fetch_page(range, start_record, self.page_size),
                    FetchError::is_transient,
                )
                .await;
            pages += 1;

            let batch = match result {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(
                        "Failed to fetch page at startRecord={}, keeping {} records collected so far: {}",
                        start_record,
                        records.len(),
                        e
                    );
                    break FetchEnd::Failed {
                        start_record,
                        reason: e.to_string(),
                    };
                }
            };

            if batch.is_empty() {
                debug!("Empty page at startRecord={}, range exhausted", start_record);
                break FetchEnd::Exhausted;
            }

            debug!(
                "Received {} records at startRecord={}",
                batch.len(),
                start_record
            );
            start_record += batch.len() as u32;
            records.extend(batch);
        };

        info!(
            "Fetched {} meeting records for {} in {} page requests",
            records.len(),
            range,
            pages
        );

        FetchOutcome {
            records,
            end,
            pages,
        }
    }
}
