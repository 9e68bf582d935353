use shared::{ContentChunker, RateLimiter};
use std::sync::Arc;
use tracing::{debug, info};

use crate::llm::{CompletionParams, LlmError, TextGenerator};
use crate::prompts;

/// Upper bound on condensing rounds before the final request is sent anyway.
pub const MAX_REDUCE_ROUNDS: usize = 4;

/// Second-pass summarization of a monthly report.
///
/// Reports longer than `input_chars` are split, each part is condensed, and
/// the condensed parts are joined and checked again. Once the text fits, one
/// final request produces the topic list with summaries.
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    rate_limiter: RateLimiter,
    input_chars: usize,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, rate_limiter: RateLimiter, input_chars: usize) -> Self {
        Self {
            generator,
            rate_limiter,
            input_chars: input_chars.max(1),
        }
    }

    async fn complete(&self, prompt: String) -> Result<String, LlmError> {
        self.rate_limiter
            .execute_with_retry_if(
                || {
                    self.generator.complete(
                        prompts::POLICY_ANALYST_PERSONA,
                        &prompt,
                        CompletionParams::SUMMARY,
                    )
                },
                LlmError::is_transient,
            )
            .await
    }

    pub async fn summarize_month(
        &self,
        year: i32,
        month: u32,
        report: &str,
    ) -> Result<String, LlmError> {
        let mut text = report.to_string();
        let mut round = 0;

        while text.chars().count() > self.input_chars && round < MAX_REDUCE_ROUNDS {
            round += 1;
            let parts = ContentChunker::split(&text, self.input_chars);
            info!(
                "Monthly report for {}-{:02} exceeds {} chars, condensing {} parts (round {})",
                year,
                month,
                self.input_chars,
                parts.len(),
                round
            );

            let mut condensed = Vec::with_capacity(parts.len());
            for part in &parts {
                let prompt =
                    prompts::partial_summary(year, month, part.index + 1, parts.len(), &part.text);
                condensed.push(self.complete(prompt).await?);
            }
            text = condensed.join("\n\n");
            debug!("Round {} left {} chars", round, text.chars().count());
        }

        self.complete(prompts::monthly_summary(year, month, &text)).await
    }
}
