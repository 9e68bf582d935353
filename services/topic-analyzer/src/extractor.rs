use futures::stream::{self, StreamExt};
use shared::utils::preview;
use shared::{Chunk, RateLimiter};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm::{CompletionParams, LlmError, TextGenerator};
use crate::prompts;
use crate::report::TopicLog;

const TOPIC_DELIMITER: &str = ", ";

/// Topics extracted from one chunk, before any deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkTopics {
    pub index: usize,
    pub topics: Vec<String>,
    /// Set when every attempt failed and `topics` is an empty placeholder.
    pub failed: bool,
}

/// Split a model reply into topic labels.
///
/// The reply is expected to be a single `", "`-separated line whose tokens are
/// only trimmed. When it is not, a bulleted or numbered list, one topic per
/// line, is accepted as well, and finally the Japanese comma. Empty tokens are
/// dropped on every path.
pub fn parse_topics(response: &str) -> Vec<String> {
    let response = response.trim();
    if response.is_empty() {
        return Vec::new();
    }

    let topics = split_trimmed(response.split(TOPIC_DELIMITER));
    if topics.len() > 1 {
        return topics;
    }

    if response.contains('\n') {
        let lines: Vec<String> = response
            .lines()
            .map(clean_list_item)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        if lines.len() > 1 {
            return lines;
        }
    }

    if response.contains('、') {
        let parts = split_trimmed(response.split('、'));
        if parts.len() > 1 {
            return parts;
        }
    }

    topics
}

fn split_trimmed<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
    parts
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// One line of a list reply, without its marker and surrounding emphasis.
fn clean_list_item(line: &str) -> &str {
    strip_list_marker(line.trim())
        .trim_matches(|c: char| c == '*' || c == '"' || c == '「' || c == '」')
        .trim()
        .trim_end_matches(['。', '.', ','])
        .trim()
}

fn strip_list_marker(line: &str) -> &str {
    for bullet in ["- ", "* ", "• ", "・"] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }

    let digits: usize = line
        .chars()
        .take_while(|c| c.is_ascii_digit() || ('０'..='９').contains(c))
        .map(char::len_utf8)
        .sum();
    if digits == 0 {
        return line;
    }

    let rest = &line[digits..];
    // ASCII markers need a following space so "1.5兆円" keeps its number.
    for marker in [".", ")"] {
        if let Some(after) = rest.strip_prefix(marker) {
            if after.starts_with(char::is_whitespace) {
                return after.trim_start();
            }
        }
    }
    for marker in ["．", "）"] {
        if let Some(after) = rest.strip_prefix(marker) {
            return after.trim_start();
        }
    }

    line
}

pub struct TopicExtractor {
    generator: Arc<dyn TextGenerator>,
    rate_limiter: RateLimiter,
    concurrency: usize,
    log: Option<TopicLog>,
}

impl TopicExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, rate_limiter: RateLimiter) -> Self {
        Self {
            generator,
            rate_limiter,
            concurrency: 1,
            log: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn set_log(&mut self, log: Option<TopicLog>) {
        self.log = log;
    }

    pub fn log(&self) -> Option<&TopicLog> {
        self.log.as_ref()
    }

    async fn request_topics(&self, chunk: &Chunk, context_label: &str) -> Result<String, LlmError> {
        let prompt = prompts::topic_extraction(context_label, &chunk.text);
        self.rate_limiter
            .execute_with_retry_if(
                || {
                    self.generator.complete(
                        prompts::POLICY_ANALYST_PERSONA,
                        &prompt,
                        CompletionParams::TOPICS,
                    )
                },
                LlmError::is_transient,
            )
            .await
    }

    /// Extract topics from one chunk. Failures never propagate: once retries
    /// are spent the chunk gets an empty, flagged placeholder.
    pub async fn extract(&self, chunk: &Chunk, context_label: &str) -> ChunkTopics {
        match self.request_topics(chunk, context_label).await {
            Ok(response) => {
                let topics = parse_topics(&response);
                if topics.is_empty() {
                    warn!(
                        "No topics parsed for {} chunk {} from reply: {}",
                        context_label,
                        chunk.index,
                        preview(&response, 80)
                    );
                }
                debug!(
                    "{} chunk {}: {} topics",
                    context_label,
                    chunk.index,
                    topics.len()
                );
                ChunkTopics {
                    index: chunk.index,
                    topics,
                    failed: false,
                }
            }
            Err(e) => {
                warn!(
                    "Topic extraction failed for {} chunk {} ({} chars), continuing without it: {}",
                    context_label,
                    chunk.index,
                    chunk.char_len(),
                    e
                );
                ChunkTopics {
                    index: chunk.index,
                    topics: Vec::new(),
                    failed: true,
                }
            }
        }
    }

    /// Extract every chunk of one unit. Results come back in chunk order even
    /// when several requests are in flight.
    pub async fn extract_all(&self, chunks: &[Chunk], context_label: &str) -> Vec<ChunkTopics> {
        let mut results = Vec::with_capacity(chunks.len());
        let mut pending = stream::iter(chunks)
            .map(|chunk| self.extract(chunk, context_label))
            .buffered(self.concurrency);

        while let Some(result) = pending.next().await {
            if let Some(log) = &self.log {
                if let Err(e) = log.append(context_label, result.index, chunks.len(), &result.topics)
                {
                    warn!("Could not append to topic log: {}", e);
                }
            }
            results.push(result);
        }

        results
    }
}
