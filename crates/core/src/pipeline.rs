use crate::llm::CompletionClient;
use crate::prompt::{build_context, build_messages};
use crate::store::VectorStore;
use crate::{Answer, AnswerResult, ConfigError, ConversationTurn, RetrievalOptions, StoreError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Returned in place of a generated answer when the completion call fails.
pub const FALLBACK_ANSWER: &str = "Sorry, I am unable to provide an answer at this time.";

/// Retrieve, build the prompt, generate. Retrieval errors propagate;
/// completion errors turn into [`Answer::Fallback`].
pub struct RagPipeline<C>
where
    C: CompletionClient,
{
    store: Arc<VectorStore>,
    client: C,
    options: RetrievalOptions,
}

impl<C> RagPipeline<C>
where
    C: CompletionClient,
{
    pub fn new(
        store: Arc<VectorStore>,
        client: C,
        options: RetrievalOptions,
    ) -> Result<Self, ConfigError> {
        if options.top_k == 0 {
            return Err(ConfigError::InvalidRetrieval(
                "top_k must be at least 1".to_string(),
            ));
        }
        if !options.similarity_threshold.is_finite() {
            return Err(ConfigError::InvalidRetrieval(
                "similarity threshold must be a finite number".to_string(),
            ));
        }

        Ok(Self {
            store,
            client,
            options,
        })
    }

    pub async fn answer(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<Answer, StoreError> {
        let started = Instant::now();
        info!(question, history = history.len(), "answering question");

        // a blank query has nothing to embed; answer without grounding
        let mut sources = if question.trim().is_empty() {
            Vec::new()
        } else {
            self.store
                .similarity_search(question, self.options.top_k)
                .await?
        };
        sources.retain(|source| source.score >= self.options.similarity_threshold);
        info!(sources = sources.len(), "retrieved relevant chunks");

        let context = build_context(&sources);
        let messages = build_messages(question, &context, history);

        match self.client.complete(&messages).await {
            Ok(answer) => Ok(Answer::Generated(AnswerResult {
                answer,
                sources,
                processing_time: started.elapsed(),
            })),
            Err(cause) => {
                warn!(error = %cause, "llm generation failed, answering with fallback");
                Ok(Answer::Fallback {
                    result: AnswerResult {
                        answer: FALLBACK_ANSWER.to_string(),
                        sources,
                        processing_time: started.elapsed(),
                    },
                    cause,
                })
            }
        }
    }
}
