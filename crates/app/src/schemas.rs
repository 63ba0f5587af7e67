use finqa_core::{AnswerResult, ConversationTurn, RetrievedChunk, UploadedDocument};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub chat_history: Option<Vec<ConversationTurn>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<SourceResponse>,
    /// Seconds.
    pub processing_time: f64,
}

impl From<AnswerResult> for ChatResponse {
    fn from(result: AnswerResult) -> Self {
        Self {
            answer: result.answer,
            sources: result.sources.into_iter().map(SourceResponse::from).collect(),
            processing_time: result.processing_time.as_secs_f64(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceResponse {
    pub content: String,
    pub page: u32,
    pub score: f32,
    pub metadata: SourceMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: u32,
    pub page: u32,
    pub source: String,
}

impl From<RetrievedChunk> for SourceResponse {
    fn from(retrieved: RetrievedChunk) -> Self {
        let chunk = retrieved.chunk;
        Self {
            page: chunk.page,
            score: retrieved.score,
            metadata: SourceMetadata {
                chunk_id: chunk.id,
                document_id: chunk.document_id,
                chunk_index: chunk.chunk_index,
                page: chunk.page,
                source: format!("page_{}", chunk.page),
            },
            content: chunk.content,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
    pub total_chunks: usize,
    pub status: String,
}

impl From<UploadedDocument> for UploadResponse {
    fn from(document: UploadedDocument) -> Self {
        Self {
            file_id: document.file_id,
            filename: document.filename,
            total_chunks: document.total_chunks,
            status: "success".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentsResponse {
    pub documents: Vec<UploadedDocument>,
}
