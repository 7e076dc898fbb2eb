//! Wire types for the upstream responses and images APIs

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ===========================================
// Request types
// ===========================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    /// Parse a client-supplied effort, defaulting to medium for anything unknown.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => ReasoningEffort::Low,
            Some("high") => ReasoningEffort::High,
            _ => ReasoningEffort::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReasoningConfig {
    pub effort: ReasoningEffort,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextConfig {
    pub verbosity: String,
}

/// Request body for `POST /responses`.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextConfig>,
    pub input: ResponseInput,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseInput {
    Text(String),
    Messages(Vec<InputMessage>),
}

#[derive(Debug, Clone, Serialize)]
pub struct InputMessage {
    pub role: String,
    pub content: Vec<InputContent>,
}

impl InputMessage {
    pub fn user(content: Vec<InputContent>) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputContent {
    InputText { text: String },
    InputImage { image_url: String },
    InputFile { filename: String, file_data: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    WebSearch { search_context_size: String },
    CodeInterpreter { container: ContainerConfig },
    ImageGeneration(ImageGenerationTool),
}

impl Tool {
    pub fn web_search() -> Self {
        Tool::WebSearch {
            search_context_size: "high".to_string(),
        }
    }

    pub fn code_interpreter() -> Self {
        Tool::CodeInterpreter {
            container: ContainerConfig {
                container_type: "auto".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerConfig {
    #[serde(rename = "type")]
    pub container_type: String,
}

/// Options for the image generation tool. Unset fields use provider defaults.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageGenerationTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_images: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_fidelity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation: Option<String>,
}

impl ImageGenerationTool {
    /// High quality PNG output with progressive frames.
    pub fn high_fidelity(model: &str, partial_images: u8) -> Self {
        Self {
            model: Some(model.to_string()),
            size: Some("auto".to_string()),
            quality: Some("high".to_string()),
            background: Some("auto".to_string()),
            output_format: Some("png".to_string()),
            partial_images: Some(partial_images),
            input_fidelity: Some("high".to_string()),
            moderation: Some("auto".to_string()),
        }
    }
}

// ===========================================
// Stream event envelope
// ===========================================

/// Loose view over any streamed event.
///
/// Only the fields the relay reads are modelled; the final `response`
/// object is kept raw and parsed on demand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamEventEnvelope {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub delta: Option<serde_json::Value>,
    #[serde(default)]
    pub partial_image_b64: Option<String>,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl StreamEventEnvelope {
    pub fn delta_text(&self) -> Option<&str> {
        self.delta.as_ref().and_then(|d| d.as_str())
    }

    /// Best-effort human-readable error text.
    pub fn error_message(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        if let Some(error) = &self.error {
            if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
                return message.to_string();
            }
            if let Some(message) = error.as_str() {
                return message.to_string();
            }
        }
        if let Some(message) = self
            .response
            .as_ref()
            .and_then(|r| r.pointer("/error/message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
        "Unknown upstream error".to_string()
    }
}

// ===========================================
// Final response
// ===========================================
//
// Fields are read independently: a null or malformed value loses only
// itself, never the rest of the response.

/// Any value that fails to parse becomes `T::default()`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A list where null means empty and unparseable entries are skipped.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinalResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub incomplete_details: Option<IncompleteDetails>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub output: Vec<OutputItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncompleteDetails {
    #[serde(default, deserialize_with = "lenient")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        #[serde(default, deserialize_with = "lenient_list")]
        content: Vec<MessageContent>,
    },
    Reasoning {
        #[serde(default, deserialize_with = "lenient_list")]
        summary: Vec<SummaryPart>,
    },
    WebSearchCall {
        #[serde(default, deserialize_with = "lenient")]
        action: Option<WebSearchAction>,
    },
    ImageGenerationCall {
        #[serde(default, deserialize_with = "lenient")]
        result: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        revised_prompt: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    OutputText {
        #[serde(default, deserialize_with = "lenient_list")]
        annotations: Vec<Annotation>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    UrlCitation {
        #[serde(default, deserialize_with = "lenient")]
        url: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        title: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SummaryPart {
    SummaryText {
        #[serde(default, deserialize_with = "lenient")]
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebSearchAction {
    #[serde(default, deserialize_with = "lenient_list")]
    pub sources: Vec<WebSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebSource {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
}

// ===========================================
// Images API
// ===========================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagesResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub data: Vec<ImageData>,
}

impl ImagesResponse {
    pub fn first_image(&self) -> Option<&str> {
        self.data
            .first()
            .and_then(|d| d.b64_json.as_deref())
            .filter(|b64| !b64.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub revised_prompt: Option<String>,
}
