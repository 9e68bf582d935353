pub mod content_chunker;
pub mod models;
pub mod rate_limiter;
pub mod telemetry;
pub mod utils;

pub use content_chunker::{ContentChunker, DEFAULT_MAX_CHUNK_CHARS};
pub use models::Chunk;
pub use rate_limiter::{RateLimiter, RetryPolicy};
