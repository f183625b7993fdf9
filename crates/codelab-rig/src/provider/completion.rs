//! OpenAI-compatible chat completion client.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource, retry};
use serde::{Deserialize, Serialize};

use super::AiService;
use crate::session::{Message, MessageRole};
use crate::{Error, Result};

/// Tracing target for completion calls.
const TRACING_TARGET: &str = "codelab_rig::provider::completion";

/// Stream of generated text fragments.
pub type CompletionStream = BoxStream<'static, Result<String>>;

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Completion provider for an OpenAI-compatible chat API.
///
/// This is a cheaply cloneable wrapper around an `Arc<CompletionService>`.
#[derive(Clone)]
pub struct CompletionProvider(Arc<CompletionService>);

pub(crate) enum CompletionService {
    OpenAiCompatible {
        http: Client,
        service: AiService,
        base_url: String,
        api_key: String,
        model_name: String,
        temperature: f32,
        timeout: Option<Duration>,
    },
    #[cfg(any(test, feature = "mock"))]
    Mock {
        reply: Option<String>,
        failure: Option<String>,
    },
}

impl CompletionProvider {
    /// Creates a provider for the given service.
    ///
    /// `timeout` bounds a whole blocking completion. Streams are bounded
    /// only by the read timeout of `http`.
    pub fn new(
        http: Client,
        service: AiService,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model_name: impl Into<String>,
        temperature: f32,
        timeout: Option<Duration>,
    ) -> Self {
        Self(Arc::new(CompletionService::OpenAiCompatible {
            http,
            service,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            temperature,
            timeout,
        }))
    }

    /// Creates a mock provider that answers with a summary of the prompt.
    #[cfg(any(test, feature = "mock"))]
    pub fn mock() -> Self {
        Self(Arc::new(CompletionService::Mock {
            reply: None,
            failure: None,
        }))
    }

    /// Creates a mock provider that always answers with `reply`.
    #[cfg(any(test, feature = "mock"))]
    pub fn mock_with_reply(reply: impl Into<String>) -> Self {
        Self(Arc::new(CompletionService::Mock {
            reply: Some(reply.into()),
            failure: None,
        }))
    }

    /// Creates a mock provider whose calls fail with `message`.
    #[cfg(any(test, feature = "mock"))]
    pub fn mock_failing(message: impl Into<String>) -> Self {
        Self(Arc::new(CompletionService::Mock {
            reply: None,
            failure: Some(message.into()),
        }))
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        match self.0.as_ref() {
            CompletionService::OpenAiCompatible { model_name, .. } => model_name,
            #[cfg(any(test, feature = "mock"))]
            CompletionService::Mock { .. } => "mock",
        }
    }

    /// Returns the provider name.
    pub fn provider_name(&self) -> &'static str {
        match self.0.as_ref() {
            CompletionService::OpenAiCompatible { service, .. } => service.id(),
            #[cfg(any(test, feature = "mock"))]
            CompletionService::Mock { .. } => "mock",
        }
    }

    /// Returns the timeout of a whole blocking completion, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.0.as_ref() {
            CompletionService::OpenAiCompatible { timeout, .. } => *timeout,
            #[cfg(any(test, feature = "mock"))]
            CompletionService::Mock { .. } => None,
        }
    }

    /// Sends the conversation and returns the generated text.
    pub async fn complete(&self, messages: &[Message]) -> Result<String> {
        match self.0.as_ref() {
            CompletionService::OpenAiCompatible {
                http,
                service,
                base_url,
                api_key,
                model_name,
                temperature,
                timeout,
            } => {
                let request = ChatCompletionRequest {
                    model: model_name,
                    messages: wire_messages(messages),
                    temperature: *temperature,
                    stream: false,
                };

                tracing::debug!(
                    target: TRACING_TARGET,
                    provider = %service.id(),
                    model = %model_name,
                    messages = %messages.len(),
                    "Sending chat completion request"
                );

                let mut builder = http
                    .post(format!("{base_url}/chat/completions"))
                    .bearer_auth(api_key)
                    .json(&request);
                if let Some(timeout) = timeout {
                    builder = builder.timeout(*timeout);
                }
                let response = builder
                    .send()
                    .await
                    .map_err(|e| Error::provider(service, e))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::provider(
                        service,
                        format!("{service} API error: {} - {body}", status.as_u16()),
                    ));
                }

                let body: ChatCompletionResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::provider(service, e))?;

                Ok(body
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .unwrap_or_default())
            }
            #[cfg(any(test, feature = "mock"))]
            CompletionService::Mock { reply, failure } => {
                if let Some(failure) = failure {
                    return Err(Error::provider("mock", failure));
                }
                Ok(mock_reply(reply.as_deref(), messages))
            }
        }
    }

    /// Sends the conversation and streams the generated text.
    ///
    /// The stream ends after the provider's `[DONE]` marker. A transport or
    /// protocol failure is yielded as the last item.
    pub async fn stream(&self, messages: &[Message]) -> Result<CompletionStream> {
        match self.0.as_ref() {
            CompletionService::OpenAiCompatible {
                http,
                service,
                base_url,
                api_key,
                model_name,
                temperature,
                ..
            } => {
                let request = ChatCompletionRequest {
                    model: model_name,
                    messages: wire_messages(messages),
                    temperature: *temperature,
                    stream: true,
                };
                let builder = http
                    .post(format!("{base_url}/chat/completions"))
                    .bearer_auth(api_key)
                    .json(&request);

                let mut source =
                    EventSource::new(builder).map_err(|e| Error::provider(service, e))?;
                source.set_retry_policy(Box::new(retry::Never));

                tracing::debug!(
                    target: TRACING_TARGET,
                    provider = %service.id(),
                    model = %model_name,
                    "Opened chat completion stream"
                );

                let service = *service;
                let stream = async_stream::stream! {
                    while let Some(event) = source.next().await {
                        match event {
                            Ok(Event::Open) => continue,
                            Ok(Event::Message(message)) => {
                                if message.data.trim() == "[DONE]" {
                                    break;
                                }
                                match serde_json::from_str::<ChatCompletionChunk>(&message.data) {
                                    Ok(chunk) => {
                                        let text: String = chunk
                                            .choices
                                            .into_iter()
                                            .filter_map(|choice| choice.delta.content)
                                            .collect();
                                        if !text.is_empty() {
                                            yield Ok(text);
                                        }
                                    }
                                    Err(err) => {
                                        tracing::warn!(
                                            target: TRACING_TARGET,
                                            provider = %service.id(),
                                            error = %err,
                                            "Skipping malformed stream chunk"
                                        );
                                    }
                                }
                            }
                            Err(reqwest_eventsource::Error::StreamEnded) => break,
                            Err(err) => {
                                yield Err(Error::provider(service, err));
                                break;
                            }
                        }
                    }
                    source.close();
                };

                Ok(stream.boxed())
            }
            #[cfg(any(test, feature = "mock"))]
            CompletionService::Mock { reply, failure } => {
                if let Some(failure) = failure {
                    let failure = failure.clone();
                    return Ok(futures::stream::once(async move {
                        Err(Error::provider("mock", failure))
                    })
                    .boxed());
                }
                let text = mock_reply(reply.as_deref(), messages);
                let chunks: Vec<Result<String>> = text
                    .split_inclusive(' ')
                    .map(|chunk| Ok(chunk.to_string()))
                    .collect();
                Ok(futures::stream::iter(chunks).boxed())
            }
        }
    }
}

fn wire_messages(messages: &[Message]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .map(|message| WireMessage {
            role: message.role(),
            content: message.content(),
        })
        .collect()
}

#[cfg(any(test, feature = "mock"))]
fn mock_reply(reply: Option<&str>, messages: &[Message]) -> String {
    if let Some(reply) = reply {
        return reply.to_string();
    }
    let last_user = messages
        .iter()
        .rev()
        .find(|m| m.role() == MessageRole::User)
        .map(Message::content)
        .unwrap_or_default();
    let preview: String = last_user.chars().take(80).collect();
    format!("Mock response to: {preview}")
}

impl std::fmt::Debug for CompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionProvider")
            .field("provider", &self.provider_name())
            .field("model", &self.model_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_serializes_roles() {
        let messages = [Message::system("be terse"), Message::user("hi")];
        let request = ChatCompletionRequest {
            model: "gpt-3.5-turbo",
            messages: wire_messages(&messages),
            temperature: 0.3,
            stream: false,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0], json!({ "role": "system", "content": "be terse" }));
        assert_eq!(value["messages"][1]["role"], json!("user"));
        assert!(value.get("stream").is_none());
    }

    #[test]
    fn chunk_without_content_is_empty() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert!(chunk.choices[0].delta.content.is_none());
    }

    #[tokio::test]
    async fn mock_complete_and_stream() {
        let provider = CompletionProvider::mock_with_reply("alpha beta gamma");
        assert_eq!(provider.complete(&[]).await.unwrap(), "alpha beta gamma");

        let chunks: Vec<String> = provider
            .stream(&[])
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, ["alpha ", "beta ", "gamma"]);
    }

    #[tokio::test]
    async fn mock_failure_is_a_provider_error() {
        let provider = CompletionProvider::mock_failing("quota exceeded");
        let err = provider.complete(&[Message::user("x")]).await.unwrap_err();
        assert!(err.is_service_error());

        let mut stream = provider.stream(&[]).await.unwrap();
        assert!(stream.next().await.unwrap().is_err());
    }
}
