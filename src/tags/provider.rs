// src/tags/provider.rs
// =============================================================================
// Request/response shapes of the text-completion backends we can ask for tags.
//
// Each backend is one row of a strategy table: how to build the HTTP request
// for a prompt, and where the generated text sits in the JSON answer. The
// assistant looks up the row once and never branches on the provider itself.
//
// Supported:
// - Anthropic messages API (also the fallback for unknown hosts)
// - OpenAI-compatible chat completions (OpenAI, OpenRouter)
// - Google Generative Language (Gemini)
// =============================================================================

use serde_json::{json, Value};

const MAX_TOKENS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Google,
}

// Everything needed to send one completion request
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub endpoint: String,
    pub headers: Vec<(&'static str, String)>,
    pub query: Vec<(&'static str, String)>,
    pub body: Value,
}

struct Strategy {
    provider: Provider,
    default_model: &'static str,
    build: fn(base_url: &str, api_key: &str, model: &str, prompt: &str) -> ProviderRequest,
    extract: fn(response: &Value) -> Option<String>,
}

const STRATEGIES: &[Strategy] = &[
    Strategy {
        provider: Provider::Anthropic,
        default_model: "claude-3-5-haiku-latest",
        build: build_anthropic,
        extract: extract_anthropic,
    },
    Strategy {
        provider: Provider::OpenAi,
        default_model: "gpt-4o-mini",
        build: build_openai,
        extract: extract_openai,
    },
    Strategy {
        provider: Provider::Google,
        default_model: "gemini-1.5-flash",
        build: build_google,
        extract: extract_google,
    },
];

impl Provider {
    // Guesses the backend from its base URL
    pub fn detect(base_url: &str) -> Self {
        let url = base_url.to_lowercase();
        if url.contains("anthropic") {
            Provider::Anthropic
        } else if url.contains("openai") || url.contains("openrouter") {
            Provider::OpenAi
        } else if url.contains("googleapis") || url.contains("generativelanguage") {
            Provider::Google
        } else {
            Provider::Anthropic
        }
    }

    fn strategy(self) -> &'static Strategy {
        STRATEGIES
            .iter()
            .find(|s| s.provider == self)
            .unwrap_or(&STRATEGIES[0])
    }

    pub fn default_model(self) -> &'static str {
        self.strategy().default_model
    }

    pub fn build_request(
        self,
        base_url: &str,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> ProviderRequest {
        (self.strategy().build)(base_url.trim_end_matches('/'), api_key, model, prompt)
    }

    // The generated text, or "" when the answer has an unexpected shape
    pub fn extract_text(self, response: &Value) -> String {
        (self.strategy().extract)(response).unwrap_or_default()
    }
}

fn build_anthropic(base_url: &str, api_key: &str, model: &str, prompt: &str) -> ProviderRequest {
    ProviderRequest {
        endpoint: format!("{}/v1/messages", base_url),
        headers: vec![
            ("x-api-key", api_key.to_string()),
            ("anthropic-version", "2023-06-01".to_string()),
        ],
        query: Vec::new(),
        body: json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        }),
    }
}

fn extract_anthropic(response: &Value) -> Option<String> {
    response["content"][0]["text"].as_str().map(str::to_string)
}

fn build_openai(base_url: &str, api_key: &str, model: &str, prompt: &str) -> ProviderRequest {
    ProviderRequest {
        endpoint: format!("{}/v1/chat/completions", base_url),
        headers: vec![("authorization", format!("Bearer {}", api_key))],
        query: Vec::new(),
        body: json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        }),
    }
}

fn extract_openai(response: &Value) -> Option<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
}

fn build_google(base_url: &str, api_key: &str, model: &str, prompt: &str) -> ProviderRequest {
    ProviderRequest {
        endpoint: format!("{}/v1beta/models/{}:generateContent", base_url, model),
        headers: Vec::new(),
        query: vec![("key", api_key.to_string())],
        body: json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": MAX_TOKENS },
        }),
    }
}

fn extract_google(response: &Value) -> Option<String> {
    response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::to_string)
}
