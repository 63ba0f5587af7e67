use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GenerationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// A slice of one page's text, the unit that gets embedded and retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub page: u32,
    pub chunk_index: u32,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub file_id: String,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
    pub total_chunks: usize,
    pub status: DocumentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user: String,
    pub assistant: String,
}

#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
    pub processing_time: Duration,
}

/// Outcome of one pipeline run.
///
/// `Fallback` carries the canned answer together with the completion error
/// that caused it; callers that only care about the payload use
/// [`Answer::into_result`].
#[derive(Debug)]
pub enum Answer {
    Generated(AnswerResult),
    Fallback {
        result: AnswerResult,
        cause: GenerationError,
    },
}

impl Answer {
    pub fn result(&self) -> &AnswerResult {
        match self {
            Answer::Generated(result) => result,
            Answer::Fallback { result, .. } => result,
        }
    }

    pub fn into_result(self) -> AnswerResult {
        match self {
            Answer::Generated(result) => result,
            Answer::Fallback { result, .. } => result,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Answer::Fallback { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub similarity_threshold: f32,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.7,
        }
    }
}
