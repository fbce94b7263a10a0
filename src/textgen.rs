use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Request/response boundary for commit-message generation. Failures
/// are non-fatal to callers: the UI falls back to a manually entered
/// message.
pub trait TextGen: Send + Sync {
    fn commit_message(&self, diff: &str, branch: &str) -> Result<String>;
}

const ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

pub struct GeminiTextGen {
    api_key: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<TextPart>,
}

#[derive(Serialize, Deserialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    parts: Vec<TextPart>,
}

impl GeminiTextGen {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::blocking::Client::new(),
        }
    }
}

fn build_prompt(diff: &str, branch: &str) -> String {
    format!(
        "Generate a short, professional conventional commit message for the \
         following git diff and branch name. Format: <type>(<scope>): <description>. \
         Output the message only, no markdown or explanations.\n\n\
         Branch: {branch}\n\nDiff:\n{diff}"
    )
}

impl TextGen for GeminiTextGen {
    fn commit_message(&self, diff: &str, branch: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![TextPart {
                    text: build_prompt(diff, branch),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 100,
            },
        };

        let response = self
            .client
            .post(format!("{ENDPOINT}?key={}", self.api_key))
            .json(&request)
            .send()
            .context("failed to reach the text-generation service")?;

        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow::anyhow!("text-generation service error: {body}"));
        }

        let parsed: GenerateResponse = response
            .json()
            .context("malformed text-generation response")?;
        parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .context("text-generation response contained no message")
    }
}
