//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the tutoring LLM. It implements the
//! `ChatModelService` and `ChatSession` ports from the `core` crate on top of
//! OpenAI-compatible chat completions.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use autocoach_core::ports::{
    ChatModelService, ChatSession, PortError, PortResult, TextFragmentStream,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatModelService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    chat_model: String,
    quiz_model: String,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, chat_model: String, quiz_model: String) -> Self {
        Self {
            client,
            chat_model,
            quiz_model,
        }
    }
}

//=========================================================================================
// `ChatModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatModelService for OpenAiChatAdapter {
    fn open_session(&self, system_instruction: &str) -> Box<dyn ChatSession> {
        Box::new(OpenAiChatSession::new(
            self.client.clone(),
            self.chat_model.clone(),
            system_instruction,
        ))
    }

    /// One-shot generation constrained to `json_schema` via the model's
    /// structured-output mode. Returns the raw reply text.
    async fn generate_structured(
        &self,
        prompt: &str,
        system_instruction: &str,
        json_schema: serde_json::Value,
    ) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_instruction)
                .build()
                .map_err(|e| PortError::Backend(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Backend(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.quiz_model)
            .messages(messages)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "structured_response".to_string(),
                    description: None,
                    schema: Some(json_schema),
                    strict: Some(true),
                },
            })
            .build()
            .map_err(|e| PortError::Backend(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Backend(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(PortError::MalformedResponse(
                    "Structured LLM response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(PortError::MalformedResponse(
                "Structured LLM returned no choices in its response.".to_string(),
            ))
        }
    }
}

//=========================================================================================
// The Session Handle
//=========================================================================================

/// One live conversational context. The chat completions API is stateless,
/// so the session keeps the running message list itself: every send carries
/// the system instruction plus all prior turns, and the completed assistant
/// reply is folded back in when its stream finishes.
pub struct OpenAiChatSession {
    client: Client<OpenAIConfig>,
    model: String,
    messages: Arc<Mutex<Vec<ChatCompletionRequestMessage>>>,
}

impl OpenAiChatSession {
    fn new(client: Client<OpenAIConfig>, model: String, system_instruction: &str) -> Self {
        // The builder only fails when content is missing, and it never is here.
        let system_message: ChatCompletionRequestMessage =
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_instruction)
                .build()
                .expect("system message with content set")
                .into();
        Self {
            client,
            model,
            messages: Arc::new(Mutex::new(vec![system_message])),
        }
    }
}

#[async_trait]
impl ChatSession for OpenAiChatSession {
    async fn send_message_stream(&self, text: &str) -> PortResult<TextFragmentStream> {
        let user_message: ChatCompletionRequestMessage =
            ChatCompletionRequestUserMessageArgs::default()
                .content(text)
                .build()
                .map_err(|e| PortError::Backend(e.to_string()))?
                .into();

        let request_messages = {
            let mut messages = self.messages.lock().await;
            messages.push(user_message);
            messages.clone()
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .build()
            .map_err(|e| PortError::Backend(e.to_string()))?;

        // The handshake happens here; XP accounting upstream keys off this
        // call succeeding, not off the stream running to completion.
        let mut backend_stream = match self.client.chat().create_stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                // The turn never started; keep the session context
                // consistent with the retracted transcript entry.
                self.messages.lock().await.pop();
                return Err(PortError::Backend(e.to_string()));
            }
        };

        let history = self.messages.clone();
        let fragments = async_stream::stream! {
            let mut full_reply = String::new();

            while let Some(result) = backend_stream.next().await {
                match result {
                    Ok(response) => {
                        for choice in &response.choices {
                            if let Some(fragment) = &choice.delta.content {
                                full_reply.push_str(fragment);
                                yield Ok(fragment.clone());
                            }
                        }
                    }
                    Err(e) => {
                        error!("Chat stream failed mid-response: {e}");
                        // Drop the user turn so the context matches the
                        // transcript after the caller retracts the message.
                        history.lock().await.pop();
                        yield Err(PortError::Backend(e.to_string()));
                        return;
                    }
                }
            }

            // Fold the completed reply into the session context. A reply
            // that errored out above is intentionally not recorded.
            match ChatCompletionRequestAssistantMessageArgs::default()
                .content(full_reply)
                .build()
            {
                Ok(assistant_message) => {
                    history.lock().await.push(assistant_message.into());
                }
                Err(e) => error!("Failed to record assistant reply: {e}"),
            }
            info!("Chat stream completed.");
        };

        Ok(Box::pin(fragments))
    }
}
