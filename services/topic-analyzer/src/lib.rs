pub mod aggregator;
pub mod cli;
pub mod config;
pub mod extractor;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod summarizer;
pub mod visualizer;

pub use aggregator::{TopicFrequency, TopicSet};
pub use config::{AnalyzerConfig, ConfigError, OpenAiConfig};
pub use extractor::{parse_topics, ChunkTopics, TopicExtractor};
pub use llm::{CompletionParams, LlmError, OpenAiClient, TextGenerator};
pub use pipeline::{run_with_lookup, Pipeline, PipelineError, ReportingPeriod, RunSummary};
pub use report::{ReportError, ReportWriter, TopicLog};
pub use summarizer::Summarizer;
pub use visualizer::TrendVisualizer;
