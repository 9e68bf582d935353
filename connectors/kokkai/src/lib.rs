pub mod client;
pub mod config;
pub mod fetcher;
pub mod models;
pub mod transcript;

pub use client::{FetchError, KokkaiClient, MeetingSource};
pub use config::KokkaiConfig;
pub use fetcher::{FetchEnd, FetchOutcome, RecordFetcher};
pub use models::{DateRange, DateRangeError, MeetingRecord, SpeechRecord};
pub use transcript::{Transcripts, WHOLE_RANGE_KEY};
