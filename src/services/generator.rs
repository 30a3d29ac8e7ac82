// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversation starter generator backed by the LLM proxy.
//!
//! The generator never fails from the caller's point of view. Any request,
//! status or parsing problem is logged and replaced by a fixed list of
//! generic starters, reported as [`GenerationOutcome::Fallback`].

use serde::Deserialize;
use std::time::Duration;

/// Upper bound on starters returned to the client.
pub const MAX_STARTERS: usize = 5;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Used when no proxy key is configured.
const UNCONFIGURED_STARTERS: [&str; 3] = [
    "How have you been lately?",
    "What's new in your life?",
    "Any exciting plans coming up?",
];

/// Used when the proxy call fails.
const FALLBACK_STARTERS: [&str; 3] = [
    "How have you been?",
    "What's been keeping you busy lately?",
    "I was thinking about our last conversation...",
];

/// Input for one generation.
#[derive(Debug, Clone, Copy)]
pub struct StarterRequest<'a> {
    pub name: &'a str,
    pub relation: &'a str,
    /// Recent interaction history, pre-formatted
    pub context: &'a str,
    /// Language tag, e.g. "en" or "ja"
    pub language: &'a str,
}

/// Starters plus whether they came from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated(Vec<String>),
    Fallback(Vec<String>),
}

impl GenerationOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, GenerationOutcome::Fallback(_))
    }

    pub fn into_starters(self) -> Vec<String> {
        match self {
            GenerationOutcome::Generated(s) | GenerationOutcome::Fallback(s) => s,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum GeneratorError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// LLM proxy client (OpenAI-compatible chat completions).
#[derive(Clone)]
pub struct StarterGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl StarterGenerator {
    pub fn new(base_url: String, api_key: String, model: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    /// Generate up to [`MAX_STARTERS`] conversation starters.
    pub async fn generate(&self, request: &StarterRequest<'_>) -> GenerationOutcome {
        if self.api_key.is_empty() {
            tracing::debug!("LLM proxy key not configured, using default starters");
            return GenerationOutcome::Fallback(to_strings(&UNCONFIGURED_STARTERS));
        }

        match self.request_starters(request).await {
            Ok(starters) => GenerationOutcome::Generated(starters),
            Err(e) => {
                tracing::warn!(error = %e, "Starter generation failed, using fallback");
                GenerationOutcome::Fallback(to_strings(&FALLBACK_STARTERS))
            }
        }
    }

    async fn request_starters(
        &self,
        request: &StarterRequest<'_>,
    ) -> Result<Vec<String>, GeneratorError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": build_prompt(request)}],
            "temperature": 0.8,
            "max_tokens": 500
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeneratorError::Status(response.status()));
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GeneratorError::Malformed("no choices".to_string()))?;

        parse_starters(&content)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Human-readable language name for the prompt. Unknown tags fall back to English.
pub fn language_name(tag: &str) -> &'static str {
    match tag {
        "zh" => "Chinese (Simplified)",
        "ja" => "Japanese",
        "de" => "German",
        "fr" => "French",
        "ko" => "Korean",
        "es" => "Spanish",
        _ => "English",
    }
}

fn build_prompt(request: &StarterRequest<'_>) -> String {
    format!(
        "You are helping someone with ADHD reconnect with their {relation} named {name}.\n\
         \n\
         Based on their previous interactions:\n\
         {context}\n\
         \n\
         Generate {count} natural, warm conversation starters that:\n\
         1. Reference previous topics if available\n\
         2. Are open-ended to encourage real connection\n\
         3. Feel genuine, not forced or awkward\n\
         4. Account for the time passed since last contact\n\
         \n\
         Respond in {language}.\n\
         \n\
         Format: Return ONLY a JSON array of {count} strings, no other text.\n\
         Example: [\"How did the project you mentioned go?\", \"I was thinking about you when...\", ...]",
        relation = request.relation,
        name = request.name,
        context = request.context,
        count = MAX_STARTERS,
        language = language_name(request.language),
    )
}

/// Extract starters from the model reply.
///
/// The first `[` through the last `]` is parsed as a JSON array of strings.
/// A reply without brackets is taken verbatim as a single starter.
fn parse_starters(content: &str) -> Result<Vec<String>, GeneratorError> {
    let content = content.trim();

    let array = match (content.find('['), content.rfind(']')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            if content.is_empty() {
                return Err(GeneratorError::Malformed("empty reply".to_string()));
            }
            return Ok(vec![content.to_string()]);
        }
    };

    let mut starters: Vec<String> =
        serde_json::from_str(array).map_err(|e| GeneratorError::Malformed(e.to_string()))?;
    starters.truncate(MAX_STARTERS);
    Ok(starters)
}
