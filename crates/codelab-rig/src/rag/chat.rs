//! Question answering over uploaded documents.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use codelab_vector::MetadataFilter;
use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tokio::sync::RwLock;

use super::RagConfig;
use super::indexer::EmbeddingStore;
use super::intent::{IntentDetection, IntentDetectionService, SearchIntent};
use super::segment::TextSegment;
use crate::Result;
use crate::analysis::ProviderChatService;
use crate::provider::{AiService, AiServiceManager};
use crate::session::{Message, MessageRole};

/// Tracing target for document chat.
const TRACING_TARGET: &str = "codelab_rig::rag::chat";

const BLANK_MESSAGE: &str = "Please provide a question to ask about your documents.";
const SUCCESS_MESSAGE: &str = "Response generated successfully";
const EMPTY_ANSWER: &str =
    "I apologize, but I couldn't generate a response. Please try rephrasing your question.";
const FAILED_ANSWER: &str =
    "I encountered an error while processing your request. Please try again.";

/// A turn of a document conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChatMessage {
    /// `user` or `assistant`.
    pub role: MessageRole,
    pub content: String,
    /// Creation time in epoch milliseconds.
    pub timestamp: String,
}

impl ChatMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Timestamp::now().as_millisecond().to_string(),
        }
    }
}

/// A question about the documents of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentChatRequest {
    /// The question.
    pub message: String,
    /// Session the documents were uploaded in.
    pub session_id: String,
    /// Chat service to answer with, `openai` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Client-side history; the server keeps its own transcript.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Vec<ChatMessage>>,
}

impl DocumentChatRequest {
    /// Creates a request for a session.
    pub fn new(message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    /// Selects the chat service.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

/// Answer to a [`DocumentChatRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChatResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Same as `answer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Retrieved segments rendered as `[type] class.name (Lines s-e)`.
    pub relevant_documents: Vec<String>,
    /// Identifiers of the documents the segments came from.
    pub sources: Vec<String>,
    /// Detected intent of the question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentDetection>,
    #[schemars(with = "String")]
    pub timestamp: Timestamp,
    pub conversation_history: Vec<ChatMessage>,
}

impl DocumentChatResponse {
    /// Creates a failed response.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            answer: None,
            response: None,
            session_id: None,
            relevant_documents: Vec::new(),
            sources: Vec::new(),
            intent: None,
            timestamp: Timestamp::now(),
            conversation_history: Vec::new(),
        }
    }
}

/// Answers questions with retrieved document segments.
///
/// Every session keeps an unbounded transcript of its questions and
/// answers; follow-up questions replay it to the model.
#[derive(Debug, Clone)]
pub struct DocumentChatService {
    manager: AiServiceManager,
    store: EmbeddingStore,
    intents: IntentDetectionService,
    top_k: usize,
    min_score: f32,
    histories: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
}

impl DocumentChatService {
    /// Creates the service.
    pub fn new(
        manager: AiServiceManager,
        store: EmbeddingStore,
        intents: IntentDetectionService,
        config: &RagConfig,
    ) -> Self {
        Self {
            manager,
            store,
            intents,
            top_k: config.chat_top_k,
            min_score: config.chat_min_score,
            histories: Arc::default(),
        }
    }

    /// Returns the intent detection service.
    pub fn intents(&self) -> &IntentDetectionService {
        &self.intents
    }

    /// Answers a question about the documents of the request's session.
    pub async fn chat(&self, request: &DocumentChatRequest) -> DocumentChatResponse {
        let question = request.message.trim();
        let session_id = request.session_id.as_str();
        if question.is_empty() {
            return DocumentChatResponse::failure(BLANK_MESSAGE);
        }

        tracing::info!(
            target: TRACING_TARGET,
            session_id = %session_id,
            service = ?request.service,
            message = %truncate(question, 50),
            "Processing chat request"
        );

        let user_message = ChatMessage::new(MessageRole::User, question);
        let mut context = self.conversation_history(session_id).await;
        context.push(user_message.clone());

        let intent = self.intents.detect(question).await;
        let segments = self.search(question, session_id, intent).await;
        tracing::info!(
            target: TRACING_TARGET,
            session_id = %session_id,
            intent = %intent,
            segments = %segments.len(),
            "Found relevant documents"
        );

        let service = resolve_service(request.service.as_deref());
        let system = system_prompt(&context, intent, &segments);
        let answer = self.generate(service, system, question).await;

        // The question and its answer are stored as one adjacent pair.
        let history = {
            let mut histories = self.histories.write().await;
            let history = histories.entry(session_id.to_owned()).or_default();
            history.push(user_message);
            history.push(ChatMessage::new(MessageRole::Assistant, &answer));
            history.clone()
        };

        tracing::info!(
            target: TRACING_TARGET,
            session_id = %session_id,
            response_len = %answer.len(),
            history = %history.len(),
            "Chat response generated"
        );

        let sources: BTreeSet<String> = segments
            .iter()
            .filter_map(|segment| segment.get("documentId").map(str::to_owned))
            .collect();

        DocumentChatResponse {
            success: true,
            message: SUCCESS_MESSAGE.to_owned(),
            answer: Some(answer.clone()),
            response: Some(answer),
            session_id: Some(session_id.to_owned()),
            relevant_documents: segments.iter().map(TextSegment::reference).collect(),
            sources: sources.into_iter().collect(),
            intent: Some(intent),
            timestamp: Timestamp::now(),
            conversation_history: history,
        }
    }

    /// Returns the transcript of a session.
    pub async fn conversation_history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.histories
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Forgets the transcript of a session. Returns true if one existed.
    pub async fn clear_conversation_history(&self, session_id: &str) -> bool {
        let removed = self.histories.write().await.remove(session_id).is_some();
        tracing::info!(
            target: TRACING_TARGET,
            session_id = %session_id,
            removed = %removed,
            "Cleared conversation history"
        );
        removed
    }

    /// Retrieves the session's segments closest to the question, narrowed to
    /// the segment type of the detected intent. Failures yield no segments.
    async fn search(
        &self,
        question: &str,
        session_id: &str,
        intent: IntentDetection,
    ) -> Vec<TextSegment> {
        let mut filter = MetadataFilter::new().eq("sessionId", session_id);
        if let Some(kind) = intent.intent.type_filter() {
            filter = filter.eq("type", kind);
        }
        tracing::debug!(target: TRACING_TARGET, filter = ?filter, "Using metadata filter");

        let result: Result<Vec<TextSegment>> = async {
            let embedding = self.store.embedder().embed(question).await?;
            let found = self
                .store
                .find_relevant(embedding, self.top_k, self.min_score, filter)
                .await?;
            for (rank, scored) in found.iter().enumerate() {
                tracing::debug!(
                    target: TRACING_TARGET,
                    rank = %(rank + 1),
                    score = %scored.score,
                    segment = %scored.segment.reference(),
                    "Relevant segment"
                );
            }
            Ok(found.into_iter().map(|scored| scored.segment).collect())
        }
        .await;

        result.unwrap_or_else(|err| {
            tracing::error!(
                target: TRACING_TARGET,
                error = %err,
                "Error searching relevant documents"
            );
            Vec::new()
        })
    }

    async fn generate(&self, service: AiService, system: String, question: &str) -> String {
        let messages = [Message::system(system), Message::user(question)];
        let result: Result<String> = async {
            let model = self.manager.model(service, None).await?;
            model.complete(&messages).await
        }
        .await;

        match result {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => EMPTY_ANSWER.to_owned(),
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    service = %service,
                    error = %err,
                    "Error generating AI response"
                );
                FAILED_ANSWER.to_owned()
            }
        }
    }
}

/// Maps a requested service name to a provider, defaulting to OpenAI.
///
/// Accepts provider ids (`groq`) and chat service names (`GroqAIChatService`).
fn resolve_service(name: Option<&str>) -> AiService {
    let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
        return AiService::OpenAi;
    };

    AiService::iter()
        .find(|service| {
            name.eq_ignore_ascii_case(service.id())
                || name.eq_ignore_ascii_case(ProviderChatService::name_for(*service))
        })
        .unwrap_or_else(|| {
            tracing::warn!(
                target: TRACING_TARGET,
                service = %name,
                "Unknown chat service requested, using OpenAI"
            );
            AiService::OpenAi
        })
}

/// Builds the system prompt from the transcript (ending with the current
/// question), the detected intent and the retrieved segments.
fn system_prompt(
    history: &[ChatMessage],
    intent: IntentDetection,
    segments: &[TextSegment],
) -> String {
    let first_request = history.len() <= 1;
    let mut prompt = String::new();

    if first_request {
        prompt.push_str(
            "You are a helpful AI assistant that helps developers understand Java code. \
             Use the following relevant code segments to answer the user's question. \
             If the information is not in the code, say so clearly. \
             Provide accurate, helpful responses based only on the code content.\n\n\
             IMPORTANT: Format your response in a clear, readable way. Use bullet points, \
             numbered lists, and proper spacing to make the information easy to read.\n\n",
        );
    } else {
        prompt.push_str(
            "You are a helpful AI assistant continuing a conversation about Java code. \
             Use the relevant code segments and conversation history to provide accurate, \
             helpful responses.\n\n",
        );
    }

    prompt.push_str(&format!(
        "Detected Intent: {} (confidence: {:.2}%)\n",
        intent.intent,
        intent.confidence * 100.0
    ));
    prompt.push_str(intent_guidance(intent.intent));

    if !segments.is_empty() {
        prompt.push_str("Relevant code segments found:\n");
        for (index, segment) in segments.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. [{}] {}.{} ({}, Package: {})\n",
                index + 1,
                segment.get_or("type", "unknown").to_uppercase(),
                segment.get_or("class", "N/A"),
                segment.get_or("name", "N/A"),
                segment.location("N/A"),
                segment.get_or("package", "N/A"),
            ));
            if let Some(modifiers) = segment.get("modifiers").filter(|m| !m.is_empty()) {
                prompt.push_str(&format!("   Modifiers: {modifiers}\n"));
            }
            if let Some(javadoc) = segment.get("javadoc").filter(|j| !j.is_empty()) {
                prompt.push_str(&format!("   Javadoc: {javadoc}\n"));
            }
            prompt.push_str(&format!("   Content:\n{}\n\n", segment.text));
        }
        prompt.push('\n');
    }

    if !first_request {
        prompt.push_str("Previous conversation context:\n");
        for message in &history[..history.len() - 1] {
            let label = match message.role {
                MessageRole::User => "User",
                MessageRole::Assistant => "Assistant",
                MessageRole::System => continue,
            };
            prompt.push_str(&format!("{label}: {}\n", message.content));
        }
        prompt.push('\n');
    }

    prompt
}

fn intent_guidance(intent: SearchIntent) -> &'static str {
    match intent {
        SearchIntent::Methods => {
            "The user is asking about METHODS. Focus on method names, signatures, parameters, \
             return types, and functionality. If listing methods, provide a clear, organized \
             list with method names and brief descriptions.\n\n"
        }
        SearchIntent::Classes => {
            "The user is asking about CLASSES. Focus on class names, inheritance, interfaces, \
             and overall structure. If listing classes, provide a clear, organized list with \
             class names and brief descriptions.\n\n"
        }
        SearchIntent::Fields => {
            "The user is asking about FIELDS/VARIABLES. Focus on field names, types, modifiers, \
             and purpose. If listing fields, provide a clear, organized list with field names, \
             types, and brief descriptions.\n\n"
        }
        SearchIntent::Constructors => {
            "The user is asking about CONSTRUCTORS. Focus on constructor names, parameters, and \
             initialization logic. If listing constructors, provide a clear, organized list with \
             parameter details.\n\n"
        }
        SearchIntent::Packages => {
            "The user is asking about PACKAGES. Focus on package structure and organization.\n\n"
        }
        SearchIntent::Imports => {
            "The user is asking about IMPORTS. Focus on imported classes and their purposes.\n\n"
        }
        SearchIntent::General => {
            "Provide a helpful response about the Java code. Use clear explanations and \
             examples when possible.\n\n"
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(end, _)| &text[..end])
}

#[cfg(test)]
mod tests {
    use codelab_vector::VectorStore;

    use super::*;
    use crate::embedding::EmbeddingProvider;
    use crate::provider::{CompletionProvider, ProviderConfig};

    fn service(provider: CompletionProvider) -> DocumentChatService {
        let config = ProviderConfig::default().with_openai_api_key("sk-test");
        let manager = AiServiceManager::new(config)
            .unwrap()
            .with_mock_provider(provider);
        let store = EmbeddingStore::new(VectorStore::memory(), EmbeddingProvider::mock(), "");
        let rag = RagConfig::default();
        let intents =
            IntentDetectionService::new(store.clone(), rag.intent_top_k, rag.intent_min_score);
        DocumentChatService::new(manager, store, intents, &rag)
    }

    async fn index(service: &DocumentChatService, session_id: &str) {
        let segment = TextSegment::new("[METHOD] Cart.size (Lines 6-8)\npublic int size()")
            .with("documentId", "doc-1")
            .with("sessionId", session_id)
            .with("type", "method")
            .with("name", "size")
            .with("class", "Cart")
            .with("startLine", 6)
            .with("endLine", 8);
        service.store.add_segments(&[segment]).await.unwrap();
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let service = service(CompletionProvider::mock());
        let response = service.chat(&DocumentChatRequest::new("   ", "s-1")).await;
        assert!(!response.success);
        assert_eq!(response.message, BLANK_MESSAGE);
        assert!(service.conversation_history("s-1").await.is_empty());
    }

    #[tokio::test]
    async fn answers_with_session_segments() {
        let service = service(CompletionProvider::mock_with_reply("It returns the count."));
        index(&service, "s-1").await;
        index(&service, "s-2").await;

        let response = service
            .chat(&DocumentChatRequest::new("What does size do?", "s-1"))
            .await;

        assert!(response.success);
        assert_eq!(response.message, SUCCESS_MESSAGE);
        assert_eq!(response.answer.as_deref(), Some("It returns the count."));
        assert_eq!(response.response, response.answer);
        assert_eq!(response.relevant_documents, ["[method] Cart.size (Lines 6-8)"]);
        assert_eq!(response.sources, ["doc-1"]);
        assert_eq!(response.conversation_history.len(), 2);
        assert_eq!(response.conversation_history[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn provider_failure_becomes_an_apology() {
        let service = service(CompletionProvider::mock_failing("boom"));
        let response = service.chat(&DocumentChatRequest::new("hello", "s-1")).await;
        assert!(response.success);
        assert_eq!(response.answer.as_deref(), Some(FAILED_ANSWER));
    }

    #[tokio::test]
    async fn empty_answer_is_replaced() {
        let service = service(CompletionProvider::mock_with_reply("  "));
        let response = service.chat(&DocumentChatRequest::new("hello", "s-1")).await;
        assert_eq!(response.answer.as_deref(), Some(EMPTY_ANSWER));
    }

    #[tokio::test]
    async fn missing_groq_key_is_reported_as_failure() {
        let service = service(CompletionProvider::mock());
        let request = DocumentChatRequest::new("hello", "s-1").with_service("GroqAIChatService");
        let response = service.chat(&request).await;
        assert_eq!(response.answer.as_deref(), Some(FAILED_ANSWER));
    }

    #[tokio::test]
    async fn history_can_be_cleared() {
        let service = service(CompletionProvider::mock());
        service.chat(&DocumentChatRequest::new("first", "s-1")).await;
        service.chat(&DocumentChatRequest::new("second", "s-1")).await;
        assert_eq!(service.conversation_history("s-1").await.len(), 4);

        assert!(service.clear_conversation_history("s-1").await);
        assert!(!service.clear_conversation_history("s-1").await);
        assert!(service.conversation_history("s-1").await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_questions_keep_pairs_together() {
        let service = service(CompletionProvider::mock());
        let first = DocumentChatRequest::new("first", "s-1");
        let second = DocumentChatRequest::new("second", "s-1");
        tokio::join!(service.chat(&first), service.chat(&second));

        let history = service.conversation_history("s-1").await;
        assert_eq!(history.len(), 4);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, MessageRole::User);
            assert_eq!(pair[1].role, MessageRole::Assistant);
        }
    }

    #[tokio::test]
    async fn answers_follow_previous_turns() {
        let service = service(CompletionProvider::mock());
        service.chat(&DocumentChatRequest::new("first", "s-1")).await;
        let response = service.chat(&DocumentChatRequest::new("second", "s-1")).await;

        assert_eq!(response.conversation_history.len(), 4);
        assert_eq!(response.conversation_history[2].content, "second");
    }

    #[test]
    fn resolves_service_names() {
        assert_eq!(resolve_service(None), AiService::OpenAi);
        assert_eq!(resolve_service(Some("groq")), AiService::Groq);
        assert_eq!(resolve_service(Some("GroqAIChatService")), AiService::Groq);
        assert_eq!(resolve_service(Some("unknown")), AiService::OpenAi);
    }

    #[test]
    fn follow_up_prompt_replays_history() {
        let history = vec![
            ChatMessage::new(MessageRole::User, "What is Cart?"),
            ChatMessage::new(MessageRole::Assistant, "A class."),
            ChatMessage::new(MessageRole::User, "And size?"),
        ];
        let detection = IntentDetection {
            intent: SearchIntent::Methods,
            confidence: 0.5,
        };
        let prompt = system_prompt(&history, detection, &[]);

        assert!(prompt.starts_with("You are a helpful AI assistant continuing a conversation"));
        assert!(prompt.contains("Detected Intent: METHODS (confidence: 50.00%)\n"));
        assert!(prompt.ends_with("Previous conversation context:\nUser: What is Cart?\nAssistant: A class.\n\n"));
    }

    #[test]
    fn first_prompt_lists_segments() {
        let history = vec![ChatMessage::new(MessageRole::User, "methods?")];
        let segment = TextSegment::new("public int size()")
            .with("type", "method")
            .with("class", "Cart")
            .with("name", "size")
            .with("startLine", 6)
            .with("endLine", 8)
            .with("package", "shop")
            .with("modifiers", "[public]");
        let prompt = system_prompt(&history, IntentDetection::general(), &[segment]);

        assert!(prompt.starts_with("You are a helpful AI assistant that helps developers"));
        assert!(prompt.contains(
            "1. [METHOD] Cart.size (Lines 6-8, Package: shop)\n   Modifiers: [public]\n   Content:\npublic int size()\n\n"
        ));
        assert!(!prompt.contains("Previous conversation context"));
    }

    #[test]
    fn pdf_segments_are_located_by_page() {
        let history = vec![ChatMessage::new(MessageRole::User, "summary?")];
        let segment = TextSegment::new("Chapter one")
            .with("type", "chunk")
            .with("class", "guide.pdf")
            .with("name", "chunk1")
            .with("page", 2)
            .with("startOffset", 0)
            .with("endOffset", 11);
        let prompt = system_prompt(&history, IntentDetection::general(), &[segment]);

        assert!(prompt.contains("1. [CHUNK] guide.pdf.chunk1 (Page 2, Chars 0-11, Package: N/A)\n"));
    }
}
