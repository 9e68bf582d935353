use indicatif::{ProgressBar, ProgressStyle};
use kokkai_connector::{
    DateRange, DateRangeError, FetchEnd, FetchError, KokkaiClient, MeetingSource, RecordFetcher,
    Transcripts, WHOLE_RANGE_KEY,
};
use shared::utils::generate_ulid;
use shared::{ContentChunker, RateLimiter, RetryPolicy};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::{info, info_span, warn, Instrument};

use crate::aggregator::{TopicFrequency, TopicSet};
use crate::config::{AnalyzerConfig, ConfigError};
use crate::extractor::{ChunkTopics, TopicExtractor};
use crate::llm::{LlmError, OpenAiClient, TextGenerator};
use crate::report::{ReportError, ReportWriter, TopicLog};
use crate::summarizer::Summarizer;
use crate::visualizer::TrendVisualizer;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid reporting period: {0}")]
    Period(#[from] DateRangeError),
    #[error("failed to create meeting API client: {0}")]
    MeetingClient(#[from] FetchError),
    #[error("failed to create text-generation client: {0}")]
    LlmClient(#[from] LlmError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("run did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

/// What to fetch and which reports to produce from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportingPeriod {
    /// One report per meeting day found in the range.
    Daily { range: DateRange },
    /// One report for the month, optionally followed by a summary pass.
    Monthly {
        year: i32,
        month: u32,
        summarize: bool,
    },
    /// Whole-year topic frequencies, a report, and a trend chart.
    Yearly { year: i32 },
}

impl ReportingPeriod {
    pub fn daily_for_month(year: i32, month: u32) -> Result<Self, DateRangeError> {
        Ok(Self::Daily {
            range: DateRange::month(year, month)?,
        })
    }

    pub fn date_range(&self) -> Result<DateRange, DateRangeError> {
        match self {
            Self::Daily { range } => Ok(range.clone()),
            Self::Monthly { year, month, .. } => DateRange::month(*year, *month),
            Self::Yearly { year } => Ok(DateRange::year(*year)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Daily { range } if range.from() == range.until() => range.from().to_string(),
            Self::Daily { range } => format!("{}〜{}", range.from(), range.until()),
            Self::Monthly { year, month, .. } => format!("{}年{}月", year, month),
            Self::Yearly { year } => format!("{}年", year),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub period: String,
    pub fetch_end: FetchEnd,
    pub records: usize,
    pub units: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
    /// Text-generation attempts made during the run, retries included.
    pub llm_requests: u64,
    pub reports: Vec<PathBuf>,
    /// Set when the monthly summary pass failed; the monthly report is kept.
    pub summary_error: Option<String>,
    pub top_topics: Vec<(String, u64)>,
}

impl RunSummary {
    fn new(run_id: String, period: String, fetch_end: FetchEnd, records: usize) -> Self {
        Self {
            run_id,
            period,
            fetch_end,
            records,
            units: 0,
            chunks: 0,
            failed_chunks: 0,
            llm_requests: 0,
            reports: Vec::new(),
            summary_error: None,
            top_topics: Vec::new(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.units > 0
    }

    /// False when retrieval stopped on a failed page.
    pub fn is_complete(&self) -> bool {
        self.fetch_end == FetchEnd::Exhausted
    }
}

/// Fetch, chunk, extract, aggregate, report. Holds its clients for the
/// lifetime of the process, so one instance can run several periods.
pub struct Pipeline<S> {
    fetcher: RecordFetcher<S>,
    extractor: TopicExtractor,
    summarizer: Summarizer,
    rate_limiter: RateLimiter,
    writer: ReportWriter,
    visualizer: TrendVisualizer,
    topic_log: TopicLog,
    topic_log_always: bool,
    chunk_max_chars: usize,
    run_deadline: Option<Duration>,
    show_chart: bool,
    show_progress: bool,
}

impl Pipeline<KokkaiClient> {
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, PipelineError> {
        let source = KokkaiClient::new(&config.kokkai)?;
        let generator: Arc<dyn TextGenerator> = Arc::new(OpenAiClient::new(&config.openai)?);
        Self::new(source, generator, config)
    }
}

impl<S: MeetingSource> Pipeline<S> {
    pub fn new(
        source: S,
        generator: Arc<dyn TextGenerator>,
        config: &AnalyzerConfig,
    ) -> Result<Self, PipelineError> {
        let fetch_policy = RetryPolicy::new(config.kokkai.max_retries, config.retry.base_delay);
        let fetcher = RecordFetcher::with_policy(source, &config.kokkai, fetch_policy);

        let rate_limiter = RateLimiter::new(config.llm_requests_per_second, config.retry);
        let extractor = TopicExtractor::new(Arc::clone(&generator), rate_limiter.clone())
            .with_concurrency(config.extract_concurrency);
        let summarizer =
            Summarizer::new(generator, rate_limiter.clone(), config.summary_input_chars);

        Ok(Self {
            fetcher,
            extractor,
            summarizer,
            rate_limiter,
            writer: ReportWriter::new(&config.output_dir)?,
            visualizer: TrendVisualizer::default(),
            topic_log: TopicLog::new(config.topic_log_path()),
            topic_log_always: config.topic_log,
            chunk_max_chars: config.chunk_max_chars,
            run_deadline: config.run_deadline,
            show_chart: false,
            show_progress: false,
        })
    }

    /// Print the yearly trend chart to stdout.
    pub fn with_chart(mut self, show_chart: bool) -> Self {
        self.show_chart = show_chart;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn run(&mut self, period: &ReportingPeriod) -> Result<RunSummary, PipelineError> {
        let run_id = generate_ulid();
        let span = info_span!("run", run_id = %run_id, period = %period.label());
        self.execute(run_id, period).instrument(span).await
    }

    async fn execute(
        &mut self,
        run_id: String,
        period: &ReportingPeriod,
    ) -> Result<RunSummary, PipelineError> {
        let deadline = Deadline::start(self.run_deadline);
        let requests_before = self.rate_limiter.request_count();

        let range = period.date_range()?;
        let outcome = within(deadline, self.fetcher.fetch_all(&range)).await?;

        if let FetchEnd::Failed {
            start_record,
            reason,
        } = &outcome.end
        {
            warn!(
                "Meeting records for {} are incomplete, retrieval stopped at record {}: {}",
                period.label(),
                start_record,
                reason
            );
        }

        let mut summary = RunSummary::new(
            run_id,
            period.label(),
            outcome.end.clone(),
            outcome.records.len(),
        );

        let transcripts = match period {
            ReportingPeriod::Yearly { .. } => {
                Transcripts::whole_range(&outcome.records, WHOLE_RANGE_KEY)
            }
            _ => Transcripts::by_date(&outcome.records),
        };

        if transcripts.is_empty() {
            warn!("{}のデータが見つかりませんでした。", period.label());
            return Ok(summary);
        }

        let log_chunks =
            self.topic_log_always || matches!(period, ReportingPeriod::Yearly { .. });
        let log = log_chunks.then(|| self.topic_log.clone());
        self.extractor.set_log(log);

        let (units, interruption) = self
            .extract_units(period, &transcripts, deadline, &mut summary)
            .await?;

        match period {
            ReportingPeriod::Daily { .. } => {
                info!(
                    "日ごとのトピック要約を {} 件の .md ファイルに出力しました。",
                    summary.reports.len()
                );
            }
            ReportingPeriod::Monthly {
                year,
                month,
                summarize,
            } => {
                let days: Vec<(String, TopicSet)> = units
                    .iter()
                    .map(|(date, results)| (date.clone(), topic_set(results)))
                    .collect();
                let path = self.writer.write_monthly(*year, *month, &days)?;
                summary.reports.push(path.clone());

                if *summarize && interruption.is_none() {
                    within(
                        deadline,
                        self.summarize_month(*year, *month, &path, &mut summary),
                    )
                    .await??;
                }
            }
            ReportingPeriod::Yearly { year } if interruption.is_none() => {
                let mut frequency = TopicFrequency::new();
                for (_, results) in &units {
                    for result in results {
                        frequency.record(&result.topics);
                    }
                }

                let top_n = crate::visualizer::DEFAULT_TOP_N;
                summary
                    .reports
                    .push(self.writer.write_yearly(*year, &frequency, top_n)?);
                summary.top_topics = self.visualizer.select(&frequency);

                if self.show_chart {
                    if let Err(e) = self.visualizer.show(*year, &frequency) {
                        warn!("Could not render trend chart: {}", e);
                    }
                }
            }
            ReportingPeriod::Yearly { .. } => {}
        }

        if let Some(log) = self.extractor.log() {
            summary.reports.push(log.path().to_path_buf());
        }
        summary.llm_requests = self.rate_limiter.request_count() - requests_before;

        if let Some(err) = interruption {
            warn!(
                "Stopped after {} of {} units, kept {} report files",
                summary.units,
                transcripts.len(),
                summary.reports.len()
            );
            return Err(err);
        }

        info!(
            "Run finished: {} units, {} chunks ({} failed), {} model requests, reports: {}",
            summary.units,
            summary.chunks,
            summary.failed_chunks,
            summary.llm_requests,
            summary
                .reports
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(summary)
    }

    /// Extract every unit in order. Daily reports are written as soon as their
    /// unit is done. When the deadline passes, the units finished so far are
    /// returned together with the error.
    async fn extract_units(
        &self,
        period: &ReportingPeriod,
        transcripts: &Transcripts,
        deadline: Option<Deadline>,
        summary: &mut RunSummary,
    ) -> Result<(Vec<(String, Vec<ChunkTopics>)>, Option<PipelineError>), PipelineError> {
        let progress = if self.show_progress {
            let bar = ProgressBar::new(transcripts.len() as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut units = Vec::with_capacity(transcripts.len());
        let mut interruption = None;
        for (key, blob) in transcripts.iter() {
            let label = match period {
                ReportingPeriod::Yearly { .. } => period.label(),
                _ => key.to_string(),
            };
            progress.set_message(label.clone());

            let chunks = ContentChunker::split(blob, self.chunk_max_chars);
            let extraction = self.extractor.extract_all(&chunks, &label);
            let results = match within(deadline, extraction).await {
                Ok(results) => results,
                Err(e) => {
                    warn!("Deadline reached while extracting {}", label);
                    interruption = Some(e);
                    break;
                }
            };

            summary.chunks += chunks.len();
            summary.failed_chunks += results.iter().filter(|r| r.failed).count();

            if let ReportingPeriod::Daily { .. } = period {
                let topics = topic_set(&results);
                let path = self.writer.write_daily(key, &topics)?;
                info!("{}: {} topics written to {}", label, topics.len(), path.display());
                summary.reports.push(path);
            } else {
                info!(
                    "Processed {}: {} chunks, {} topics",
                    label,
                    chunks.len(),
                    results.iter().map(|r| r.topics.len()).sum::<usize>()
                );
            }

            units.push((key.to_string(), results));
            progress.inc(1);
        }
        progress.finish_and_clear();

        summary.units = units.len();
        Ok((units, interruption))
    }

    async fn summarize_month(
        &self,
        year: i32,
        month: u32,
        report_path: &Path,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let report = self.writer.read(report_path)?;

        match self.summarizer.summarize_month(year, month, &report).await {
            Ok(text) => {
                let path = self.writer.write_summary(year, month, &text)?;
                summary.reports.push(path);
            }
            Err(e) => {
                warn!(
                    "Summary pass for {}年{}月 failed, keeping {}: {}",
                    year,
                    month,
                    report_path.display(),
                    e
                );
                summary.summary_error = Some(e.to_string());
            }
        }
        Ok(())
    }
}

fn topic_set(results: &[ChunkTopics]) -> TopicSet {
    TopicSet::from_lists(results.iter().map(|r| r.topics.as_slice()))
}

/// Wall-clock limit for one run, fixed when the run starts.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    fn start(limit: Option<Duration>) -> Option<Self> {
        limit.map(|limit| Self {
            at: Instant::now() + limit,
            limit,
        })
    }
}

async fn within<F: Future>(
    deadline: Option<Deadline>,
    future: F,
) -> Result<F::Output, PipelineError> {
    match deadline {
        Some(deadline) => timeout_at(deadline.at, future)
            .await
            .map_err(|_| PipelineError::DeadlineExceeded(deadline.limit)),
        None => Ok(future.await),
    }
}

/// Load configuration from `lookup` and run one period end to end. A missing
/// credential fails here, before any client is created.
pub async fn run_with_lookup<F>(
    lookup: F,
    period: &ReportingPeriod,
) -> Result<RunSummary, PipelineError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = AnalyzerConfig::from_lookup(lookup)?;
    let mut pipeline = Pipeline::from_config(&config)?;
    pipeline.run(period).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_period_ranges() {
        let daily = ReportingPeriod::daily_for_month(2024, 3).unwrap();
        let range = daily.date_range().unwrap();
        assert_eq!((range.from(), range.until()), ("2024-03-01", "2024-03-31"));

        let monthly = ReportingPeriod::Monthly {
            year: 2024,
            month: 13,
            summarize: false,
        };
        assert!(monthly.date_range().is_err());

        let yearly = ReportingPeriod::Yearly { year: 2023 };
        assert_eq!(yearly.date_range().unwrap().until(), "2023-12-31");
    }

    #[test]
    fn test_period_labels() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            ReportingPeriod::Daily {
                range: DateRange::day(day)
            }
            .label(),
            "2024-03-01"
        );
        assert_eq!(
            ReportingPeriod::daily_for_month(2024, 3).unwrap().label(),
            "2024-03-01〜2024-03-31"
        );
        assert_eq!(
            ReportingPeriod::Monthly {
                year: 2024,
                month: 3,
                summarize: true
            }
            .label(),
            "2024年3月"
        );
        assert_eq!(ReportingPeriod::Yearly { year: 2024 }.label(), "2024年");
    }

    #[test]
    fn test_topic_set_ignores_failed_placeholders() {
        let results = vec![
            ChunkTopics {
                index: 0,
                topics: vec!["a".to_string(), "b".to_string()],
                failed: false,
            },
            ChunkTopics {
                index: 1,
                topics: vec![],
                failed: true,
            },
            ChunkTopics {
                index: 2,
                topics: vec!["b".to_string()],
                failed: false,
            },
        ];

        assert_eq!(topic_set(&results).join(", "), "a, b");
    }
}
