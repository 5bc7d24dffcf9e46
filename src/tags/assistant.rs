// src/tags/assistant.rs
// =============================================================================
// Suggests short classification tags for a skill.
//
// The assistant is best effort by contract: suggest_tags never fails. No key
// configured, the backend being down, or an answer we can't parse all end up
// as an empty list (plus a warning in the log). Imports must never break
// because tagging did.
// =============================================================================

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::provider::Provider;
use crate::config::LlmSettings;
use crate::error::{Result, SyncError};

// First JSON array in the completion text
static TAG_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*?\]").unwrap());

// What the assistant gets to look at
#[derive(Debug, Clone, Default)]
pub struct TagRequest {
    pub name: String,
    pub description: String,
    /// Start of the canonical document, already truncated
    pub content_preview: String,
    /// Tags already in use, offered so the assistant reuses them
    pub vocabulary: Vec<String>,
}

#[async_trait]
pub trait TagAssistant: Send + Sync {
    async fn suggest_tags(&self, request: &TagRequest) -> Vec<String>;
}

// Used when no backend is configured
pub struct DisabledTagAssistant;

#[async_trait]
impl TagAssistant for DisabledTagAssistant {
    async fn suggest_tags(&self, request: &TagRequest) -> Vec<String> {
        debug!(name = %request.name, "tag assistant not configured, skipping");
        Vec::new()
    }
}

pub struct LlmTagAssistant {
    http: Client,
    provider: Provider,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmTagAssistant {
    pub fn new(base_url: &str, api_key: &str, model: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let provider = Provider::detect(base_url);
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            provider,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            model: model
                .filter(|m| !m.is_empty())
                .unwrap_or(provider.default_model())
                .to_string(),
        })
    }

    async fn request_tags(&self, request: &TagRequest) -> Result<Vec<String>> {
        let prompt = build_prompt(request);
        let call = self
            .provider
            .build_request(&self.base_url, &self.api_key, &self.model, &prompt);

        let mut builder = self.http.post(&call.endpoint).json(&call.body);
        for (name, value) in &call.headers {
            builder = builder.header(*name, value);
        }
        if !call.query.is_empty() {
            builder = builder.query(&call.query);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::RemoteApi {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response.json().await?;
        Ok(parse_tags(&self.provider.extract_text(&body)))
    }
}

#[async_trait]
impl TagAssistant for LlmTagAssistant {
    async fn suggest_tags(&self, request: &TagRequest) -> Vec<String> {
        match self.request_tags(request).await {
            Ok(tags) => {
                if tags.is_empty() {
                    warn!(name = %request.name, "tag assistant returned no tags");
                }
                tags
            }
            Err(e) => {
                warn!(name = %request.name, error = %e, "tag generation failed");
                Vec::new()
            }
        }
    }
}

// Picks the assistant the settings allow for
pub fn tag_assistant_from(settings: &LlmSettings) -> Box<dyn TagAssistant> {
    if !settings.is_configured() {
        return Box::new(DisabledTagAssistant);
    }

    let built = LlmTagAssistant::new(
        settings.base_url.as_deref().unwrap_or_default(),
        settings.api_key.as_deref().unwrap_or_default(),
        settings.model.as_deref(),
        settings.timeout_secs,
    );
    match built {
        Ok(assistant) => Box::new(assistant),
        Err(e) => {
            warn!(error = %e, "could not build tag assistant, tagging disabled");
            Box::new(DisabledTagAssistant)
        }
    }
}

fn build_prompt(request: &TagRequest) -> String {
    let vocabulary = if request.vocabulary.is_empty() {
        "(none yet)".to_string()
    } else {
        request.vocabulary.join(", ")
    };
    let description = if request.description.is_empty() {
        "(no description)"
    } else {
        &request.description
    };

    format!(
        "You classify \"skills\": Markdown instruction packages that AI coding agents load \
         on demand.\n\n\
         Pick 3 to 6 short tags for the skill below. Cover what kind of task it helps with, \
         when it would be triggered, and any specific technology it targets. Avoid generic \
         tags such as \"coding\" or \"development\". Keep technology names as written \
         (React, GSAP). Prefer tags from the existing vocabulary when one fits.\n\n\
         Existing vocabulary: {vocabulary}\n\n\
         Name: {name}\n\
         Description: {description}\n\n\
         Content:\n```markdown\n{content}\n```\n\n\
         Answer with a JSON array of strings and nothing else, e.g. [\"Code Review\", \"React\"].",
        vocabulary = vocabulary,
        name = request.name,
        description = description,
        content = request.content_preview,
    )
}

// Reads the first JSON array of strings out of free text
fn parse_tags(text: &str) -> Vec<String> {
    let Some(found) = TAG_ARRAY.find(text) else {
        return Vec::new();
    };

    let raw: Vec<String> = serde_json::from_str(found.as_str()).unwrap_or_default();
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn request() -> TagRequest {
        TagRequest {
            name: "implementing-animations".to_string(),
            description: "Animations with GSAP".to_string(),
            content_preview: "# Animations".to_string(),
            vocabulary: vec!["React".to_string()],
        }
    }

    #[test]
    fn test_parse_tags_from_chatty_answer() {
        let text = "Sure! Here you go:\n[\"Animation\", \"GSAP\", \"GSAP\", \" \"]\nEnjoy.";
        assert_eq!(parse_tags(text), vec!["Animation", "GSAP"]);
    }

    #[test]
    fn test_parse_tags_garbage() {
        assert!(parse_tags("no array here").is_empty());
        assert!(parse_tags("[1, 2, 3]").is_empty());
    }

    #[test]
    fn test_prompt_mentions_vocabulary_and_content() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("Existing vocabulary: React"));
        assert!(prompt.contains("# Animations"));
        assert!(prompt.contains("implementing-animations"));
    }

    #[tokio::test]
    async fn test_disabled_assistant_is_empty() {
        assert!(DisabledTagAssistant.suggest_tags(&request()).await.is_empty());
    }

    #[tokio::test]
    async fn test_llm_assistant_round_trip() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-test")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"[\"Animation\",\"GSAP\"]"}]}"#)
            .create_async()
            .await;

        let assistant = LlmTagAssistant::new(&server.url(), "sk-test", None, 5).unwrap();
        let tags = assistant.suggest_tags(&request()).await;
        assert_eq!(tags, vec!["Animation", "GSAP"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_llm_failure_degrades_to_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(500)
            .with_body("overloaded")
            .create_async()
            .await;

        let assistant = LlmTagAssistant::new(&server.url(), "sk-test", None, 5).unwrap();
        assert!(assistant.suggest_tags(&request()).await.is_empty());
    }

    #[test]
    fn test_unconfigured_settings_give_disabled_assistant() {
        // Only checks that construction does not panic without a key
        let _assistant = tag_assistant_from(&LlmSettings::default());
    }
}
