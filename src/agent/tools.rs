//! Tool definitions and implementations for the agent system.

use crate::config::ToolSettings;
use crate::error::{GaiaError, Result};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContentPart, ChatCompletionTool, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionObject, ImageDetail, ImageUrlArgs,
};
use base64::Engine;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Maximum web page body size (5MB).
const MAX_RESPONSE_BYTES: usize = 5 * 1024 * 1024;

/// Names of every tool the agent knows about.
pub const TOOL_NAMES: [&str; 4] = [
    "load_file_content",
    "webpage_reader",
    "text_from_image",
    "describe_image",
];

/// Available tools for the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// Read a local text, JSON, CSV or Excel file.
    LoadFileContent { file_path: String },

    /// Fetch a web page and return its visible text.
    WebpageReader { url: String },

    /// OCR an image.
    TextFromImage { image_path: String },

    /// Describe an image with a vision model.
    DescribeImage { image_path: String },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::LoadFileContent { .. } => "load_file_content",
            ToolCall::WebpageReader { .. } => "webpage_reader",
            ToolCall::TextFromImage { .. } => "text_from_image",
            ToolCall::DescribeImage { .. } => "describe_image",
        }
    }
}

/// Tool execution context.
///
/// Holds the sandbox allowlist plus the clients the tools need.
pub struct ToolContext {
    http: reqwest::Client,
    openai: async_openai::Client<async_openai::config::OpenAIConfig>,
    vision_model: String,
    ocr_command: String,
    enabled: Vec<String>,
    max_output_chars: usize,
}

impl ToolContext {
    /// Create a tool context, rejecting unknown tool names in the allowlist.
    pub fn new(
        settings: &ToolSettings,
        openai: async_openai::Client<async_openai::config::OpenAIConfig>,
    ) -> Result<Self> {
        if let Some(unknown) = settings
            .enabled
            .iter()
            .find(|name| !TOOL_NAMES.contains(&name.as_str()))
        {
            return Err(GaiaError::Config(format!(
                "Unknown tool '{}' in tools.enabled (available: {})",
                unknown,
                TOOL_NAMES.join(", ")
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; gaia-runner/0.1)")
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| GaiaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            openai,
            vision_model: settings.vision_model.clone(),
            ocr_command: settings.ocr_command.clone(),
            enabled: settings.enabled.clone(),
            max_output_chars: settings.max_output_chars,
        })
    }

    /// Whether the sandbox allows the named tool.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|n| n == name)
    }

    /// Tool definitions for the enabled tools.
    pub fn definitions(&self) -> Vec<ChatCompletionTool> {
        tool_definitions(&self.enabled)
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        let output = match tool {
            ToolCall::LoadFileContent { file_path } => load_file_content(Path::new(file_path)).await,
            ToolCall::WebpageReader { url } => self.execute_webpage_reader(url).await,
            ToolCall::TextFromImage { image_path } => {
                self.execute_text_from_image(Path::new(image_path)).await
            }
            ToolCall::DescribeImage { image_path } => {
                self.execute_describe_image(Path::new(image_path)).await
            }
        }?;

        Ok(truncate_chars(&output, self.max_output_chars))
    }

    #[instrument(skip(self))]
    async fn execute_webpage_reader(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| GaiaError::InvalidInput(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GaiaError::InvalidInput(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let response = self.http.get(parsed).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(GaiaError::Tool(format!(
                "Failed to fetch the webpage: {}",
                status.as_u16()
            )));
        }

        let body = read_capped_body(response, MAX_RESPONSE_BYTES).await?;
        Ok(extract_text_from_html(&body))
    }

    #[instrument(skip(self), fields(image_path = %image_path.display()))]
    async fn execute_text_from_image(&self, image_path: &Path) -> Result<String> {
        info!("Extracting text from image");
        ensure_file(image_path)?;

        let result = Command::new(&self.ocr_command)
            .arg(image_path)
            .arg("stdout")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GaiaError::ToolNotFound(self.ocr_command.clone()));
            }
            Err(e) => {
                return Err(GaiaError::Tool(format!("{} execution failed: {}", self.ocr_command, e)));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GaiaError::Tool(format!("{} failed: {}", self.ocr_command, stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    #[instrument(skip(self), fields(image_path = %image_path.display()))]
    async fn execute_describe_image(&self, image_path: &Path) -> Result<String> {
        ensure_file(image_path)?;
        let mime = image_mime_type(image_path)?;
        let bytes = tokio::fs::read(image_path).await?;
        let data_url = format!(
            "data:{};base64,{}",
            mime,
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );

        debug!("Describing {} byte image with {}", bytes.len(), self.vision_model);

        let text = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text("Describe the content of this image in detail. Transcribe any visible text.")
            .build()
            .map_err(|e| GaiaError::Tool(e.to_string()))?;
        let image = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(
                ImageUrlArgs::default()
                    .url(data_url)
                    .detail(ImageDetail::Auto)
                    .build()
                    .map_err(|e| GaiaError::Tool(e.to_string()))?,
            )
            .build()
            .map_err(|e| GaiaError::Tool(e.to_string()))?;

        let parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![text.into(), image.into()];
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(parts)
            .build()
            .map_err(|e| GaiaError::Tool(e.to_string()))?;

        let messages: Vec<ChatCompletionRequestMessage> = vec![message.into()];
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.vision_model)
            .messages(messages)
            .build()
            .map_err(|e| GaiaError::Tool(e.to_string()))?;

        let response = self
            .openai
            .chat()
            .create(request)
            .await
            .map_err(|e| GaiaError::OpenAI(format!("Vision API error: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GaiaError::Tool("Empty image description".to_string()))
    }
}

/// Read a response body, failing once it grows past `limit` bytes.
async fn read_capped_body(mut response: reqwest::Response, limit: usize) -> Result<String> {
    if let Some(length) = response.content_length() {
        if length > limit as u64 {
            return Err(GaiaError::Tool(format!(
                "Response too large ({} bytes, max {} bytes)",
                length, limit
            )));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(GaiaError::Tool(format!(
                "Response too large (over {} bytes)",
                limit
            )));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Read a local file. Text and JSON are returned verbatim, tables as
/// column-oriented JSON.
#[instrument(skip(path), fields(file_path = %path.display()))]
pub async fn load_file_content(path: &Path) -> Result<String> {
    info!("Loading file content");
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();

    match extension.as_str() {
        ".json" | ".txt" => Ok(tokio::fs::read_to_string(path).await?),
        ".csv" | ".xlsx" => {
            let is_csv = extension == ".csv";
            let owned = path.to_path_buf();
            let table = tokio::task::spawn_blocking(move || {
                if is_csv {
                    read_csv_columns(&owned)
                } else {
                    read_xlsx_columns(&owned)
                }
            })
            .await
            .map_err(|e| GaiaError::Tool(format!("File loader panicked: {}", e)))??;
            Ok(serde_json::to_string(&table)?)
        }
        _ => Err(GaiaError::UnsupportedFileType(extension.clone())),
    }
}

/// Column-oriented table: `{"column": {"0": value, "1": value}}`.
fn columns_to_json(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Value {
    let mut table = Map::new();
    for (col, header) in dedupe_headers(headers).into_iter().enumerate() {
        let mut column = Map::new();
        for (row_idx, row) in rows.iter().enumerate() {
            let value = row.get(col).cloned().unwrap_or(Value::Null);
            column.insert(row_idx.to_string(), value);
        }
        table.insert(header, Value::Object(column));
    }
    Value::Object(table)
}

/// Rename repeated headers to `name.1`, `name.2`, ... so no column is lost.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut result = Vec::with_capacity(headers.len());
    for header in headers {
        let mut name = header.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", header, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        result.push(name);
    }
    result
}

fn header_name(raw: &str, idx: usize) -> String {
    if raw.trim().is_empty() {
        format!("Unnamed: {}", idx)
    } else {
        raw.to_string()
    }
}

/// Interpret a CSV cell as a number where possible.
fn csv_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(raw.to_string())
}

fn read_csv_columns(path: &Path) -> Result<Value> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| GaiaError::Tool(format!("Failed to read CSV: {}", e)))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| GaiaError::Tool(format!("Failed to read CSV header: {}", e)))?
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(h, i))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| GaiaError::Tool(format!("Malformed CSV row: {}", e)))?;
        rows.push(record.iter().map(csv_value).collect());
    }

    Ok(columns_to_json(headers, rows))
}

fn read_xlsx_columns(path: &Path) -> Result<Value> {
    use calamine::{open_workbook_auto, Data, Reader};

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| GaiaError::Tool(format!("Failed to open workbook: {}", e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| GaiaError::Tool("Workbook has no sheets".to_string()))?
        .map_err(|e| GaiaError::Tool(format!("Failed to read sheet: {}", e)))?;

    let cell_value = |cell: &Data| match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    };

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(i, c)| header_name(&c.to_string(), i))
            .collect(),
        None => return Ok(Value::Object(Map::new())),
    };
    let body: Vec<Vec<Value>> = rows.map(|row| row.iter().map(cell_value).collect()).collect();

    Ok(columns_to_json(headers, body))
}

fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(GaiaError::InvalidInput(format!("File not found: {}", path.display())))
    }
}

fn image_mime_type(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => Err(GaiaError::UnsupportedFileType(format!(".{}", ext))),
    }
}

/// Strip markup from an HTML document, keeping the visible text.
pub fn extract_text_from_html(html: &str) -> String {
    static BLOCKS: OnceLock<Regex> = OnceLock::new();
    static TAGS: OnceLock<Regex> = OnceLock::new();

    let blocks = BLOCKS.get_or_init(|| {
        Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->|<noscript\b.*?</noscript\s*>")
            .expect("Invalid regex")
    });
    let tags = TAGS.get_or_init(|| {
        Regex::new(r"(?s)<[^>]*>").expect("Invalid regex")
    });

    let without_blocks = blocks.replace_all(html, " ");
    let without_tags = tags.replace_all(&without_blocks, " ");
    let collapsed = without_tags.split_whitespace().collect::<Vec<_>>().join(" ");

    html_decode(&collapsed)
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\n[... output truncated at {} characters]", &s[..idx], max_chars),
        None => s.to_string(),
    }
}

fn function_tool(name: &str, description: &str, parameters: Value) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: name.to_string(),
            description: Some(description.to_string()),
            parameters: Some(parameters),
            strict: None,
        },
    }
}

fn path_parameter(name: &str, description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            name: {
                "type": "string",
                "description": description
            }
        },
        "required": [name]
    })
}

/// Get OpenAI function/tool definitions for the enabled tools.
pub fn tool_definitions(enabled: &[String]) -> Vec<ChatCompletionTool> {
    let all = vec![
        function_tool(
            "load_file_content",
            "Load a local file and return its content as a string. \
            Supports .txt and .json (raw text) and .csv and .xlsx (table as JSON).",
            path_parameter("file_path", "The file path to read the content from."),
        ),
        function_tool(
            "webpage_reader",
            "Fetch a webpage and return its visible text content.",
            path_parameter("url", "The URL of the webpage to fetch."),
        ),
        function_tool(
            "text_from_image",
            "Extract text from an image using OCR (Optical Character Recognition).",
            path_parameter("image_path", "The file path to the image."),
        ),
        function_tool(
            "describe_image",
            "Describe the content of an image using a vision model.",
            path_parameter("image_path", "The file path to the image."),
        ),
    ];

    all.into_iter()
        .filter(|tool| enabled.iter().any(|n| *n == tool.function.name))
        .collect()
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: Value = serde_json::from_str(arguments)
        .map_err(|e| GaiaError::Agent(format!("Invalid tool arguments: {}", e)))?;

    let string_arg = |key: &str| {
        args[key]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| GaiaError::Agent(format!("Missing '{}' argument", key)))
    };

    match name {
        "load_file_content" => Ok(ToolCall::LoadFileContent {
            file_path: string_arg("file_path")?,
        }),
        "webpage_reader" => Ok(ToolCall::WebpageReader {
            url: string_arg("url")?,
        }),
        "text_from_image" => Ok(ToolCall::TextFromImage {
            image_path: string_arg("image_path")?,
        }),
        "describe_image" => Ok(ToolCall::DescribeImage {
            image_path: string_arg("image_path")?,
        }),
        _ => Err(GaiaError::Agent(format!("Unknown tool: {}", name))),
    }
}
