pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod registry;
pub mod store;
pub mod stores;
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod testing;
pub mod traits;

pub use chunking::{chunk_pages, reassemble, split_text, ChunkingConfig};
pub use embeddings::{
    dimensions_for_model, CharacterNgramEmbedder, Embedder, OpenAiEmbedder,
    CHARACTER_NGRAM_MODEL, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{ConfigError, ExtractionError, GenerationError, IngestError, StoreError};
pub use extractor::{extract_page_texts, LopdfExtractor, PdfExtractor};
pub use ingest::{is_pdf_file_name, process_pdf, stored_file_name, DocumentIngestor};
pub use llm::{CompletionClient, CompletionOptions, OpenAiChatClient};
pub use models::{
    Answer, AnswerResult, Chunk, ConversationTurn, DocumentStatus, PageText, RetrievalOptions,
    RetrievedChunk, UploadedDocument,
};
pub use pipeline::{RagPipeline, FALLBACK_ANSWER};
pub use prompt::{build_context, build_messages, ChatMessage, Role, SYSTEM_INSTRUCTION};
pub use registry::DocumentRegistry;
pub use store::VectorStore;
pub use stores::{InMemoryIndex, QdrantStore};
pub use traits::VectorIndex;
