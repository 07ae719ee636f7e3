//! Prompt templates for the task helpers on [`crate::client::LLMClient`].
//!
//! Every function here is pure: it formats task inputs and options into the single
//! user message sent to the provider. Unrecognized option strings fall back to the
//! default variant, and numeric limits of zero are treated as absent.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Target length of a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    fn instruction(&self) -> &'static str {
        match self {
            Self::Short => "in one or two sentences",
            Self::Medium => "in a single concise paragraph",
            Self::Long => "in several detailed paragraphs",
        }
    }
}

impl From<&str> for SummaryLength {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "short" => Self::Short,
            "long" => Self::Long,
            _ => Self::Medium,
        }
    }
}

/// Voice used by [`rewrite`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    Casual,
    #[default]
    Professional,
    Friendly,
    Concise,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Formal => "formal",
            Self::Casual => "casual",
            Self::Professional => "professional",
            Self::Friendly => "friendly",
            Self::Concise => "concise",
        }
    }
}

impl From<&str> for Tone {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "formal" => Self::Formal,
            "casual" => Self::Casual,
            "friendly" => Self::Friendly,
            "concise" => Self::Concise,
            _ => Self::Professional,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeOptions {
    pub length: SummaryLength,
    pub max_words: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateOptions {
    /// Source language; detected by the model when absent.
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    pub tone: Tone,
    pub max_words: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletOptions {
    pub max_bullets: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordOptions {
    pub max_keywords: Option<u32>,
}

fn limit(value: Option<u32>) -> Option<u32> {
    value.filter(|n| *n > 0)
}

fn with_text(mut prompt: String, text: &str) -> String {
    prompt.push_str("\n\nText:\n");
    prompt.push_str(text);
    prompt
}

pub fn summarize(text: &str, options: &SummarizeOptions) -> String {
    let mut prompt = format!(
        "Summarize the following text {}.",
        options.length.instruction()
    );
    if let Some(words) = limit(options.max_words) {
        let _ = write!(prompt, " Use at most {words} words.");
    }
    prompt.push_str(" Return only the summary.");
    with_text(prompt, text)
}

pub fn translate(text: &str, target_language: &str, options: &TranslateOptions) -> String {
    let source = options
        .source_language
        .as_deref()
        .map(str::trim)
        .filter(|language| !language.is_empty());
    let prompt = match source {
        Some(source) => format!("Translate the following text from {source} to {target_language}."),
        None => format!("Translate the following text to {target_language}."),
    };
    with_text(
        prompt + " Preserve the original formatting and return only the translation.",
        text,
    )
}

pub fn fix_grammar(text: &str) -> String {
    with_text(
        "Correct the grammar and spelling of the following text without changing its meaning. \
         Return only the corrected text."
            .to_string(),
        text,
    )
}

pub fn rewrite(text: &str, options: &RewriteOptions) -> String {
    let mut prompt = format!(
        "Rewrite the following text in a {} tone.",
        options.tone.as_str()
    );
    if let Some(words) = limit(options.max_words) {
        let _ = write!(prompt, " Keep it under {words} words.");
    }
    prompt.push_str(" Return only the rewritten text.");
    with_text(prompt, text)
}

pub fn bullet_summary(text: &str, options: &BulletOptions) -> String {
    let mut prompt = String::from("Summarize the following text as a bulleted list");
    if let Some(bullets) = limit(options.max_bullets) {
        let _ = write!(prompt, " of at most {bullets} points");
    }
    prompt.push_str(". Put each point on its own line starting with \"- \".");
    with_text(prompt, text)
}

pub fn extract_keywords(text: &str, options: &KeywordOptions) -> String {
    let prompt = match limit(options.max_keywords) {
        Some(count) => format!("Extract up to {count} keywords from the following text."),
        None => "Extract the most important keywords from the following text.".to_string(),
    };
    with_text(
        prompt + " Respond with a single comma-separated list and nothing else.",
        text,
    )
}

pub fn detect_language(text: &str) -> String {
    with_text(
        "Identify the language of the following text. \
         Respond with only its ISO 639-1 code, for example en or ja."
            .to_string(),
        text,
    )
}

pub fn classify_sentiment(text: &str) -> String {
    with_text(
        "Classify the sentiment of the following text as positive, neutral or negative and \
         rate your confidence between 0 and 1. Respond only as label|score, for example \
         positive|0.87."
            .to_string(),
        text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_reflects_length_and_word_limit() {
        let prompt = summarize(
            "Rust is a language.",
            &SummarizeOptions {
                length: SummaryLength::Short,
                max_words: Some(20),
            },
        );
        assert!(prompt.contains("one or two sentences"));
        assert!(prompt.contains("at most 20 words"));
        assert!(prompt.ends_with("Text:\nRust is a language."));
    }

    #[test]
    fn zero_limits_are_omitted() {
        let prompt = summarize(
            "x",
            &SummarizeOptions {
                max_words: Some(0),
                ..Default::default()
            },
        );
        assert!(!prompt.contains("words."));

        let prompt = bullet_summary("x", &BulletOptions { max_bullets: Some(0) });
        assert!(!prompt.contains("at most"));
        let prompt = bullet_summary("x", &BulletOptions { max_bullets: Some(4) });
        assert!(prompt.contains("at most 4 points"));

        let prompt = extract_keywords("x", &KeywordOptions::default());
        assert!(prompt.starts_with("Extract the most important keywords"));
    }

    #[test]
    fn translate_mentions_source_only_when_given() {
        let plain = translate("Hallo", "English", &TranslateOptions::default());
        assert!(plain.starts_with("Translate the following text to English."));

        let sourced = translate(
            "Hallo",
            "English",
            &TranslateOptions {
                source_language: Some("German".into()),
            },
        );
        assert!(sourced.starts_with("Translate the following text from German to English."));
    }

    #[test]
    fn unknown_option_strings_fall_back_silently() {
        assert_eq!(SummaryLength::from("LONG"), SummaryLength::Long);
        assert_eq!(SummaryLength::from("huge"), SummaryLength::Medium);
        assert_eq!(Tone::from("Friendly"), Tone::Friendly);
        assert_eq!(Tone::from("sarcastic"), Tone::Professional);
        assert!(rewrite("x", &RewriteOptions::default()).contains("professional tone"));
    }

    #[test]
    fn options_deserialize_from_partial_json() {
        let options: RewriteOptions = serde_json::from_str(r#"{"tone":"casual"}"#).expect("options");
        assert_eq!(options.tone, Tone::Casual);
        assert_eq!(options.max_words, None);
    }
}
