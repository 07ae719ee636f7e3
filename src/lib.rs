//! One client facade over OpenAI-compatible and Gemini chat APIs.
//!
//! [`LLMClient`] wraps a single [`LLMProvider`] with a per-attempt deadline, retries
//! with exponential backoff, and request/response/error hooks. Task helpers such as
//! [`LLMClient::summarize`] and [`LLMClient::classify_sentiment`] are built on the same
//! call path.
//!
//! ```no_run
//! use kotoba_assist::{ClientConfig, LLMClient, SummarizeOptions};
//!
//! # async fn run() -> Result<(), kotoba_assist::LLMError> {
//! let client = LLMClient::new(ClientConfig::new("openai", "sk-..."))?;
//! client.on_error(|err| {
//!     eprintln!("attempt failed: {err}");
//!     Ok(())
//! });
//! let summary = client
//!     .summarize("Rust guarantees memory safety without a GC.", &SummarizeOptions::default())
//!     .await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod http;
pub mod prompts;
pub mod provider;
pub mod retry;
pub mod stream;
pub mod tasks;
pub mod timeout;
pub mod types;

pub use client::LLMClient;
pub use config::{ClientConfig, ProviderKind};
pub use error::{LLMError, NetworkErrorCode};
pub use prompts::{
    BulletOptions, KeywordOptions, RewriteOptions, SummarizeOptions, SummaryLength, Tone,
    TranslateOptions,
};
pub use provider::{ChatStream, DynProvider, LLMProvider};
pub use retry::RetryPolicy;
pub use tasks::{LanguageDetection, PromptOptions, Sentiment, SentimentResult};
pub use types::*;
