//! Question-answering pipeline
//!
//! One request flows through intent resolution, optional follow-up
//! rewriting, hybrid retrieval and final answer generation. Stages are
//! sequential within a request; requests are independent of each other.

use crate::conversation::{ConversationStore, FollowupResolver};
use crate::error::{Error, Result};
use crate::graph::Fact;
use crate::intent::{Intent, TopicResolver};
use crate::llm::{ChatModel, ChatRequest};
use crate::metrics::METRICS;
use crate::prompt::{PromptAssembler, ANSWER_SYSTEM_PROMPT};
use crate::retrieval::HybridRetriever;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Fixed answer when retrieval produces no evidence
pub const NOT_FOUND_ANSWER: &str =
    "I cannot find this information in the provided RBI documents.";

/// A fragment reference with a short text preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentPreview {
    pub id: String,
    pub preview: String,
}

/// Completed answer for one question
#[derive(Debug, Clone)]
pub struct PipelineAnswer {
    pub conversation_id: String,
    pub answer: String,
    pub chunks_used: Vec<FragmentPreview>,
    pub kg_facts: Vec<Fact>,
}

/// Generation settings carried by the pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub answer_max_tokens: u32,
    pub chitchat_temperature: f32,
    pub preview_chars: usize,
}

/// The hybrid retrieval and conversation pipeline
pub struct QueryPipeline {
    resolver: TopicResolver,
    followup: FollowupResolver,
    retriever: HybridRetriever,
    assembler: PromptAssembler,
    conversations: ConversationStore,
    chat: Arc<dyn ChatModel>,
    options: PipelineOptions,
}

impl QueryPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: TopicResolver,
        followup: FollowupResolver,
        retriever: HybridRetriever,
        assembler: PromptAssembler,
        conversations: ConversationStore,
        chat: Arc<dyn ChatModel>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            resolver,
            followup,
            retriever,
            assembler,
            conversations,
            chat,
            options,
        }
    }

    /// Answer one question within a conversation
    pub async fn ask(
        &self,
        question: &str,
        conversation_id: Option<String>,
        clear: bool,
    ) -> Result<PipelineAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::EmptyQuestion);
        }

        let conversation_id = conversation_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if clear {
            self.conversations.clear(&conversation_id);
        }

        let previous = self.conversations.get(&conversation_id);

        let intent = self.resolver.resolve(question).await;
        info!("Intent={} conversation={}", intent.as_str(), conversation_id);
        METRICS
            .questions_total
            .with_label_values(&[intent.as_str()])
            .inc();

        let topic = match intent {
            Intent::ChitChat => return self.chit_chat(conversation_id, question).await,
            Intent::RbiQuery { topic } => topic,
        };

        let question = if self.followup.is_followup(&previous, question).await {
            self.followup.rewrite(&previous, question).await
        } else {
            question.to_string()
        };

        let evidence = self.retriever.merge(&question, &topic).await;

        // No evidence is a meaningful outcome, not an error.
        if evidence.is_empty() {
            self.conversations.set(&conversation_id, NOT_FOUND_ANSWER);
            return Ok(PipelineAnswer {
                conversation_id,
                answer: NOT_FOUND_ANSWER.to_string(),
                chunks_used: Vec::new(),
                kg_facts: Vec::new(),
            });
        }

        let prompt =
            self.assembler
                .answer_prompt(&question, &evidence.fragments, &evidence.facts, &previous);

        // Final generation has no substitute: failure surfaces to the caller.
        let answer = self
            .chat
            .complete(ChatRequest {
                system: Some(ANSWER_SYSTEM_PROMPT.to_string()),
                user: prompt,
                temperature: 0.0,
                max_tokens: Some(self.options.answer_max_tokens),
                operation: "answer",
            })
            .await
            .map_err(|e| Error::LanguageModel(e.to_string()))?;

        self.conversations.set(&conversation_id, &answer);

        let chunks_used = evidence
            .fragments
            .iter()
            .map(|fragment| FragmentPreview {
                id: fragment.id.clone(),
                preview: preview_of(&fragment.text, self.options.preview_chars),
            })
            .collect();

        Ok(PipelineAnswer {
            conversation_id,
            answer,
            chunks_used,
            kg_facts: evidence.facts,
        })
    }

    async fn chit_chat(&self, conversation_id: String, question: &str) -> Result<PipelineAnswer> {
        let reply = self
            .chat
            .complete(ChatRequest {
                system: None,
                user: format!("You are friendly. Reply briefly to: {}", question),
                temperature: self.options.chitchat_temperature,
                max_tokens: Some(self.options.answer_max_tokens),
                operation: "chit_chat",
            })
            .await
            .map_err(|e| Error::LanguageModel(e.to_string()))?;

        self.conversations.set(&conversation_id, &reply);

        Ok(PipelineAnswer {
            conversation_id,
            answer: reply,
            chunks_used: Vec::new(),
            kg_facts: Vec::new(),
        })
    }
}

fn preview_of(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}
