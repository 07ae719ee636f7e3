//! Task helpers layered on top of [`LLMClient::chat`].
//!
//! Each helper formats a prompt with [`crate::prompts`], sends it as a single user
//! message with the task's sampling overrides, and parses the reply.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::client::LLMClient;
use crate::error::LLMError;
use crate::prompts::{
    self, BulletOptions, KeywordOptions, RewriteOptions, SummarizeOptions, TranslateOptions,
};
use crate::types::{ChatOptions, Message};

const PRECISE_TEMPERATURE: f32 = 0.3;
const DETECTION_TEMPERATURE: f32 = 0.1;
const DETECTION_MAX_TOKENS: u32 = 10;

/// Options for [`LLMClient::prompt`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptOptions {
    /// Sent as a leading system message when present.
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Result of [`LLMClient::detect_language`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetection {
    /// Lower-cased answer, normally an ISO 639-1 code.
    pub language: String,
    /// Heuristic: 0.9 for a two-letter code, 0.7 otherwise.
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = LLMError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(LLMError::Validation {
                message: format!("unknown sentiment label `{other}`"),
            }),
        }
    }
}

/// Result of [`LLMClient::classify_sentiment`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    /// Confidence in `[0, 1]`.
    pub score: f64,
}

/// Splits a bulleted reply into items.
///
/// # Examples
///
/// ```
/// # use kotoba_assist::tasks::parse_bullets;
/// assert_eq!(parse_bullets("- First\n* Second\n\nThird"), vec!["First", "Second", "Third"]);
/// ```
pub fn parse_bullets(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.strip_prefix(['-', '*', '•'])
                .unwrap_or(line)
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn parse_keywords(reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_language(reply: &str) -> LanguageDetection {
    let language = reply.trim().to_lowercase();
    let confidence = if language.chars().count() == 2 {
        0.9
    } else {
        0.7
    };
    LanguageDetection {
        language,
        confidence,
    }
}

/// Parses `label|score`; anything unreadable becomes neutral with a score of 0.5.
///
/// # Examples
///
/// ```
/// # use kotoba_assist::tasks::{parse_sentiment, Sentiment};
/// let result = parse_sentiment("positive|0.95");
/// assert_eq!(result.sentiment, Sentiment::Positive);
/// assert_eq!(result.score, 0.95);
/// assert_eq!(parse_sentiment("maybe").sentiment, Sentiment::Neutral);
/// ```
pub fn parse_sentiment(reply: &str) -> SentimentResult {
    let mut parts = reply.split('|');
    let sentiment = parts
        .next()
        .and_then(|label| label.parse().ok())
        .unwrap_or_default();
    let score = parts
        .next()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|score| score.is_finite())
        .map_or(0.5, |score| score.clamp(0.0, 1.0));
    SentimentResult { sentiment, score }
}

impl LLMClient {
    pub async fn summarize(
        &self,
        text: &str,
        options: &SummarizeOptions,
    ) -> Result<String, LLMError> {
        self.complete(prompts::summarize(text, options), ChatOptions::default())
            .await
    }

    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
        options: &TranslateOptions,
    ) -> Result<String, LLMError> {
        self.complete(
            prompts::translate(text, target_language, options),
            ChatOptions::default(),
        )
        .await
    }

    /// Runs at a low temperature.
    pub async fn fix_grammar(&self, text: &str) -> Result<String, LLMError> {
        self.complete(
            prompts::fix_grammar(text),
            ChatOptions::default().with_temperature(PRECISE_TEMPERATURE),
        )
        .await
    }

    pub async fn rewrite(&self, text: &str, options: &RewriteOptions) -> Result<String, LLMError> {
        self.complete(prompts::rewrite(text, options), ChatOptions::default())
            .await
    }

    /// See [`parse_bullets`] for how the reply is split.
    pub async fn bullet_summary(
        &self,
        text: &str,
        options: &BulletOptions,
    ) -> Result<Vec<String>, LLMError> {
        let reply = self
            .complete(prompts::bullet_summary(text, options), ChatOptions::default())
            .await?;
        Ok(parse_bullets(&reply))
    }

    pub async fn extract_keywords(
        &self,
        text: &str,
        options: &KeywordOptions,
    ) -> Result<Vec<String>, LLMError> {
        let reply = self
            .complete(
                prompts::extract_keywords(text, options),
                ChatOptions::default().with_temperature(PRECISE_TEMPERATURE),
            )
            .await?;
        Ok(parse_keywords(&reply))
    }

    pub async fn detect_language(&self, text: &str) -> Result<LanguageDetection, LLMError> {
        let reply = self
            .complete(
                prompts::detect_language(text),
                ChatOptions::default()
                    .with_temperature(DETECTION_TEMPERATURE)
                    .with_max_tokens(DETECTION_MAX_TOKENS),
            )
            .await?;
        Ok(parse_language(&reply))
    }

    pub async fn classify_sentiment(&self, text: &str) -> Result<SentimentResult, LLMError> {
        let reply = self
            .complete(prompts::classify_sentiment(text), ChatOptions::default())
            .await?;
        Ok(parse_sentiment(&reply))
    }

    /// Sends free-form text, optionally preceded by a system message.
    ///
    /// The reply is returned as produced by the model, without trimming.
    pub async fn prompt(&self, text: &str, options: &PromptOptions) -> Result<String, LLMError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = options.system.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(text));
        let chat_options = ChatOptions {
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: None,
        };
        let request = self.build_request(messages, chat_options);
        Ok(self.execute(request).await?.content)
    }

    async fn complete(&self, prompt: String, options: ChatOptions) -> Result<String, LLMError> {
        let request = self.build_request(vec![Message::user(prompt)], options);
        let response = self.execute(request).await?;
        Ok(response.content.trim().to_string())
    }
}
