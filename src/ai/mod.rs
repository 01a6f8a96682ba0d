mod client;
mod pipeline;
pub mod prompts;

pub use client::{CompletionError, GeminiClient, RetryPolicy, TextCompletion};
pub use pipeline::{InsightEvent, InsightPipeline};
