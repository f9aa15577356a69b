//! Gemini Provider
//!
//! Implementation of the LlmProvider trait for Google's Generative Language
//! API (`generateContent`) with function calling.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ParameterSchema, ProviderConfig, StopReason, ToolCall, ToolCallMode, ToolDefinition,
    UsageStats,
};
use crate::http_client::{build_http_client, probe_timeout};
use crate::schema::normalize_tool;

/// Default Gemini API base
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(&config)?;
        Ok(Self { config, client })
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(GEMINI_API_BASE)
            .trim_end_matches('/')
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url(), self.config.model)
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolDefinition],
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let mut system_parts: Vec<String> = system.map(|s| vec![s.to_string()]).unwrap_or_default();
        let mut contents: Vec<serde_json::Value> = Vec::new();

        for msg in messages {
            if msg.role == MessageRole::System {
                let text = msg.text_content();
                if !text.is_empty() {
                    system_parts.push(text);
                }
                continue;
            }
            if let Some(content) = self.message_to_gemini(msg) {
                contents.push(content);
            }
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "temperature": request_options
                    .temperature_override
                    .unwrap_or(self.config.temperature),
                "maxOutputTokens": self.config.max_tokens,
            }
        });

        if !system_parts.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": system_parts.join("\n\n") }]
            });
        }

        if !tools.is_empty() && request_options.tool_call_mode != ToolCallMode::None {
            let declarations: Vec<serde_json::Value> =
                tools.iter().map(|t| self.tool_to_gemini(t)).collect();
            body["tools"] = serde_json::json!([{ "functionDeclarations": declarations }]);
            let mode = match request_options.tool_call_mode {
                ToolCallMode::Required => "ANY",
                _ => "AUTO",
            };
            body["toolConfig"] = serde_json::json!({
                "functionCallingConfig": { "mode": mode }
            });
        }

        body
    }

    /// Convert a Message to Gemini `Content`. Returns None for messages with
    /// no transmittable parts.
    fn message_to_gemini(&self, message: &Message) -> Option<serde_json::Value> {
        let role = match message.role {
            MessageRole::Assistant => "model",
            _ => "user",
        };

        let parts: Vec<serde_json::Value> = message
            .content
            .iter()
            .filter_map(|c| match c {
                MessageContent::Text { text } if !text.is_empty() => {
                    Some(serde_json::json!({ "text": text }))
                }
                MessageContent::Text { .. } => None,
                MessageContent::ToolUse { name, input, .. } => Some(serde_json::json!({
                    "functionCall": { "name": name, "args": input }
                })),
                MessageContent::ToolResult {
                    name,
                    content,
                    is_error,
                    ..
                } => {
                    // functionResponse.response must be an object
                    let parsed = serde_json::from_str::<serde_json::Value>(content)
                        .ok()
                        .filter(|v| v.is_object())
                        .unwrap_or_else(|| serde_json::json!({ "result": content }));
                    let response = if is_error.unwrap_or(false) {
                        serde_json::json!({ "error": parsed })
                    } else {
                        parsed
                    };
                    Some(serde_json::json!({
                        "functionResponse": { "name": name, "response": response }
                    }))
                }
            })
            .collect();

        if parts.is_empty() {
            return None;
        }
        Some(serde_json::json!({ "role": role, "parts": parts }))
    }

    /// Convert a ToolDefinition to a Gemini function declaration
    fn tool_to_gemini(&self, tool: &ToolDefinition) -> serde_json::Value {
        let tool = normalize_tool(tool);
        serde_json::json!({
            "name": tool.name,
            "description": tool.description,
            "parameters": schema_to_gemini(&tool.input_schema),
        })
    }

    /// Parse a response from the Gemini API
    fn parse_response(&self, response: &GeminiResponse) -> LlmResult<LlmResponse> {
        let candidate = response.candidates.as_ref().and_then(|c| c.first());

        if candidate.is_none() {
            if let Some(feedback) = &response.prompt_feedback {
                if let Some(reason) = &feedback.block_reason {
                    debug!(reason = %reason, "Gemini blocked the prompt");
                    return Ok(LlmResponse {
                        content: None,
                        tool_calls: Vec::new(),
                        stop_reason: StopReason::Safety,
                        usage: self.usage_from(response),
                        model: self.response_model(response),
                    });
                }
            }
            return Err(LlmError::ParseError {
                message: "response contained no candidates".to_string(),
            });
        }

        let mut texts: Vec<String> = Vec::new();
        let mut tool_calls = Vec::new();

        if let Some(parts) = candidate
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.as_ref())
        {
            for part in parts {
                if let Some(text) = &part.text {
                    texts.push(text.clone());
                }
                if let Some(call) = &part.function_call {
                    tool_calls.push(ToolCall {
                        id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                        name: call.name.clone(),
                        arguments: call
                            .args
                            .clone()
                            .unwrap_or_else(|| serde_json::json!({})),
                    });
                }
            }
        }

        let stop_reason = if !tool_calls.is_empty() {
            StopReason::ToolUse
        } else {
            candidate
                .and_then(|c| c.finish_reason.as_deref())
                .map(StopReason::from)
                .unwrap_or(StopReason::EndTurn)
        };

        let content = texts.join("");
        Ok(LlmResponse {
            content: if content.is_empty() { None } else { Some(content) },
            tool_calls,
            stop_reason,
            usage: self.usage_from(response),
            model: self.response_model(response),
        })
    }

    fn usage_from(&self, response: &GeminiResponse) -> UsageStats {
        response
            .usage_metadata
            .as_ref()
            .map(|u| UsageStats {
                input_tokens: u.prompt_token_count.unwrap_or(0),
                output_tokens: u.candidates_token_count.unwrap_or(0),
            })
            .unwrap_or_default()
    }

    fn response_model(&self, response: &GeminiResponse) -> String {
        response
            .model_version
            .clone()
            .unwrap_or_else(|| self.config.model.clone())
    }
}

/// Gemini expects OpenAPI-style upper-case type names.
fn schema_to_gemini(schema: &ParameterSchema) -> serde_json::Value {
    let mut out = serde_json::json!({ "type": schema.schema_type.to_uppercase() });
    if let Some(description) = &schema.description {
        out["description"] = serde_json::json!(description);
    }
    if let Some(values) = &schema.enum_values {
        out["enum"] = serde_json::json!(values);
    }
    if let Some(properties) = &schema.properties {
        let mut map = serde_json::Map::new();
        for (name, prop) in properties {
            map.insert(name.clone(), schema_to_gemini(prop));
        }
        out["properties"] = serde_json::Value::Object(map);
    }
    if let Some(required) = &schema.required {
        out["required"] = serde_json::json!(required);
    }
    if let Some(items) = &schema.items {
        out["items"] = schema_to_gemini(items);
    }
    out
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .resolved_api_key()
            .ok_or_else(|| missing_api_key_error("gemini"))?;

        let body = self.build_request_body(&messages, system.as_deref(), &tools, &request_options);
        debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending Gemini request"
        );

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body_text = response.text().await?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "gemini"));
        }

        let gemini_response: GeminiResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        self.parse_response(&gemini_response)
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self
            .config
            .resolved_api_key()
            .ok_or_else(|| missing_api_key_error("gemini"))?;

        let response = self
            .client
            .get(format!("{}/models/{}", self.base_url(), self.config.model))
            .header("x-goog-api-key", api_key)
            .timeout(probe_timeout(&self.config))
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 200 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body, "gemini"))
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Gemini API response format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    args: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
