//! Agent runner with tool calling loop.

use super::tools::{parse_tool_call, ToolContext};
use super::AnswerAgent;
use crate::config::{Prompts, Settings};
use crate::error::{GaiaError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Agent that answers benchmark questions using the sandboxed tool set.
pub struct Agent {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    tools: ToolContext,
    prompts: Prompts,
    max_iterations: usize,
}

impl Agent {
    /// Create a new agent with the given tool context and model.
    pub fn new(
        client: async_openai::Client<async_openai::config::OpenAIConfig>,
        tools: ToolContext,
        model: &str,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
            tools,
            prompts: Prompts::default(),
            max_iterations: 15,
        }
    }

    /// Build the agent, its tool sandbox and prompts from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = create_client(&settings.agent)?;
        let tools = ToolContext::new(&settings.tools, client.clone())?;
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        Ok(Self::new(client, tools, &settings.agent.model)
            .with_prompts(prompts)
            .with_max_iterations(settings.agent.max_iterations))
    }

    /// Use custom prompt templates.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the prompt sent for a question.
    pub fn format_prompt(&self, question: &str, file_path: Option<&Path>) -> String {
        self.prompts.format_answer_prompt(question, file_path)
    }

    /// Run the agent with a user task.
    pub async fn run(&self, task: &str) -> Result<AgentResponse> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.answer.system.clone())
                .build()
                .map_err(|e| GaiaError::Agent(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(task.to_string())
                .build()
                .map_err(|e| GaiaError::Agent(e.to_string()))?
                .into(),
        ];

        let tool_definitions = self.tools.definitions();
        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(GaiaError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}", iterations);

            let mut request = CreateChatCompletionRequestArgs::default();
            request.model(&self.model).messages(messages.clone());
            if !tool_definitions.is_empty() {
                request.tools(tool_definitions.clone());
            }
            let request = request.build().map_err(|e| GaiaError::Agent(e.to_string()))?;

            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(|e| GaiaError::OpenAI(format!("Agent API error: {}", e)))?;

            let choice = response
                .choices
                .first()
                .ok_or_else(|| GaiaError::Agent("No response from model".to_string()))?;

            match choice.message.tool_calls {
                Some(ref tool_calls) if !tool_calls.is_empty() => {
                    let assistant_msg = ChatCompletionRequestAssistantMessageArgs::default()
                        .tool_calls(tool_calls.clone())
                        .build()
                        .map_err(|e| GaiaError::Agent(e.to_string()))?;
                    messages.push(assistant_msg.into());

                    for tool_call in tool_calls {
                        let record = self.execute_tool_call(tool_call).await;

                        let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(&tool_call.id)
                            .content(record.result.clone())
                            .build()
                            .map_err(|e| GaiaError::Agent(e.to_string()))?;
                        messages.push(tool_msg.into());

                        tool_calls_made.push(record);
                    }
                }
                _ => {
                    return build_response(&choice.message.content, tool_calls_made, iterations);
                }
            }
        }
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, tool_call: &ChatCompletionMessageToolCall) -> ToolCallRecord {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Agent calling tool: {} with args: {}", name, arguments);

        let result = if !self.tools.is_enabled(name) {
            warn!("Refused call to tool outside the sandbox: {}", name);
            format!("Tool error: '{}' is not available in this sandbox", name)
        } else {
            match parse_tool_call(name, arguments) {
                Ok(tool) => match self.tools.execute(&tool).await {
                    Ok(output) => output,
                    Err(e) => format!("Tool error: {}", e),
                },
                Err(e) => format!("Failed to parse tool call: {}", e),
            }
        };

        ToolCallRecord {
            name: name.clone(),
            arguments: arguments.clone(),
            result,
        }
    }
}

#[async_trait]
impl AnswerAgent for Agent {
    #[instrument(skip(self, question), fields(model = %self.model))]
    async fn answer(&self, question: &str, file_path: Option<&Path>) -> Result<String> {
        info!(
            "Agent received question (first 50 chars): {}...",
            question.chars().take(50).collect::<String>()
        );

        let prompt = self.format_prompt(question, file_path);
        let response = self.run(&prompt).await?;

        debug!(
            "Answered after {} iteration(s) and {} tool call(s)",
            response.iterations,
            response.tool_calls.len()
        );
        Ok(response.content)
    }
}

/// Build the final agent response. A reply without text is not an answer.
fn build_response(
    content: &Option<String>,
    tool_calls: Vec<ToolCallRecord>,
    iterations: usize,
) -> Result<AgentResponse> {
    let content = content.as_deref().map(str::trim).unwrap_or_default();
    if content.is_empty() {
        return Err(GaiaError::Agent(
            "Agent completed but produced no answer".to_string(),
        ));
    }

    Ok(AgentResponse {
        content: content.to_string(),
        tool_calls,
        iterations,
    })
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentSettings, ToolSettings};
    use mockito::Matcher;

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "webpage_reader".to_string(),
            arguments: r#"{"url": "https://example.com"}"#.to_string(),
            result: "Example Domain".to_string(),
        };
        assert_eq!(
            format!("{}", record),
            r#"webpage_reader({"url": "https://example.com"})"#
        );
    }

    #[test]
    fn test_build_response_trims_answer() {
        let response = build_response(&Some("  Paris\n".to_string()), Vec::new(), 2).unwrap();
        assert_eq!(response.content, "Paris");
        assert_eq!(response.iterations, 2);
    }

    #[test]
    fn test_build_response_rejects_missing_answer() {
        assert!(matches!(
            build_response(&None, Vec::new(), 1),
            Err(GaiaError::Agent(_))
        ));
        assert!(matches!(
            build_response(&Some(" \n ".to_string()), Vec::new(), 1),
            Err(GaiaError::Agent(_))
        ));
    }

    /// Agent pointed at a mock chat completions endpoint.
    fn mock_agent(server: &mockito::Server, enabled: &[&str]) -> Agent {
        let agent_settings = AgentSettings {
            api_base: Some(server.url()),
            ..Default::default()
        };
        let client = create_client(&agent_settings).unwrap();
        let tool_settings = ToolSettings {
            enabled: enabled.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let tools = ToolContext::new(&tool_settings, client.clone()).unwrap();
        Agent::new(client, tools, "gpt-4o-mini")
    }

    fn completion(message: serde_json::Value) -> String {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
        })
        .to_string()
    }

    fn tool_call_message(name: &str, arguments: &str) -> serde_json::Value {
        serde_json::json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": name, "arguments": arguments}
            }]
        })
    }

    #[tokio::test]
    async fn test_run_executes_tool_then_answers() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "The secret number is 42.").unwrap();
        let arguments = serde_json::json!({"file_path": notes.to_str().unwrap()}).to_string();

        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(tool_call_message("load_file_content", &arguments)))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""role":"tool""#.to_string()),
                Matcher::Regex("The secret number is 42.".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(serde_json::json!({"role": "assistant", "content": " 42 "})))
            .expect(1)
            .create_async()
            .await;

        let agent = mock_agent(&server, &["load_file_content"]);
        let response = agent.run("What is the secret number?").await.unwrap();

        assert_eq!(response.content, "42");
        assert_eq!(response.iterations, 2);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "load_file_content");
        assert_eq!(response.tool_calls[0].result, "The secret number is 42.");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_stops_at_iteration_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(tool_call_message(
                "load_file_content",
                r#"{"file_path": "/nonexistent/file.txt"}"#,
            )))
            .expect(3)
            .create_async()
            .await;

        let agent = mock_agent(&server, &["load_file_content"]).with_max_iterations(3);
        let err = agent.run("Loop forever").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Agent error: Agent exceeded maximum iterations (3)"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_answer_without_content_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(serde_json::json!({"role": "assistant", "content": null})))
            .create_async()
            .await;

        let agent = mock_agent(&server, &[]);
        let err = agent.answer("Who?", None).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Agent error: Agent completed but produced no answer"
        );
    }

    #[test]
    fn test_format_prompt_uses_template() {
        let client = async_openai::Client::new();
        let tools = ToolContext::new(&ToolSettings::default(), client.clone()).unwrap();
        let agent = Agent::new(client, tools, "gpt-4o-mini").with_max_iterations(0);

        let prompt = agent.format_prompt("Who?", Some(Path::new("/tmp/f.png")));
        assert!(prompt.starts_with("Question: Who?\n"));
        assert!(prompt.contains("/tmp/f.png"));
        assert_eq!(agent.max_iterations, 1);
        assert_eq!(agent.model(), "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_refuses_tool_outside_sandbox() {
        let client = async_openai::Client::new();
        let settings = ToolSettings {
            enabled: vec!["load_file_content".to_string()],
            ..Default::default()
        };
        let tools = ToolContext::new(&settings, client.clone()).unwrap();
        let agent = Agent::new(client, tools, "gpt-4o-mini");

        let call: ChatCompletionMessageToolCall = serde_json::from_value(serde_json::json!({
            "id": "call_1",
            "type": "function",
            "function": {"name": "webpage_reader", "arguments": "{\"url\": \"https://example.com\"}"}
        }))
        .unwrap();

        let record = agent.execute_tool_call(&call).await;
        assert!(record.result.contains("not available in this sandbox"));
    }
}
