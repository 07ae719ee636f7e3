use std::env;

use dotenvy::dotenv;
use futures_util::StreamExt;
use kotoba_assist::types::{ChatOptions, Message};
use kotoba_assist::{ClientConfig, LLMClient, SummarizeOptions};

/// Builds a client from `LLM_*` variables, or returns `None` when no key is configured.
fn client_from_env() -> Option<LLMClient> {
    let _ = dotenv();
    let config = ClientConfig::from_env();
    if config.api_key.is_empty() {
        eprintln!("skip live test: no API key in LLM_API_KEY or the provider variable");
        return None;
    }
    Some(LLMClient::new(config).expect("client should build from environment"))
}

#[tokio::test]
#[ignore = "requires a reachable provider and credentials"]
async fn live_chat_and_stream() {
    let Some(client) = client_from_env() else {
        return;
    };

    let messages = vec![
        Message::system("You are a helpful assistant."),
        Message::user("Introduce the Rust language in one sentence."),
    ];
    let response = client
        .chat(messages.clone(), ChatOptions::default().with_max_tokens(100))
        .await
        .expect("chat request should succeed");
    assert!(!response.content.trim().is_empty());
    assert_eq!(response.provider.as_deref(), Some(client.provider_name()));

    let mut stream = client
        .chat_stream(messages, ChatOptions::default())
        .await
        .expect("streaming chat should start");
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.expect("stream chunk should be valid");
        text.push_str(&chunk.content);
        if chunk.done {
            break;
        }
    }
    assert!(!text.is_empty(), "stream should yield text");
}

#[tokio::test]
#[ignore = "requires a reachable provider and credentials"]
async fn live_task_helpers() {
    let Some(client) = client_from_env() else {
        return;
    };
    if env::var("LLM_SKIP_TASKS").is_ok() {
        return;
    }

    let summary = client
        .summarize(
            "Rust is a systems programming language focused on safety, speed and concurrency. \
             It achieves memory safety without garbage collection.",
            &SummarizeOptions::default(),
        )
        .await
        .expect("summary");
    assert!(!summary.is_empty());

    let detected = client
        .detect_language("Bonjour tout le monde")
        .await
        .expect("language");
    assert_eq!(detected.language, "fr");

    let sentiment = client
        .classify_sentiment("I absolutely love this library!")
        .await
        .expect("sentiment");
    assert!((0.0..=1.0).contains(&sentiment.score));
}
