use crate::config::{Settings, VectorBackend};
use anyhow::Context;
use finqa_core::{
    CharacterNgramEmbedder, DocumentIngestor, DocumentRegistry, Embedder, InMemoryIndex,
    OpenAiChatClient, OpenAiEmbedder, QdrantStore, RagPipeline, VectorIndex, VectorStore,
    CHARACTER_NGRAM_MODEL, DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared handles for the request handlers. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    settings: Settings,
    store: Arc<VectorStore>,
    registry: Arc<DocumentRegistry>,
    ingestor: DocumentIngestor,
    pipeline: RagPipeline<OpenAiChatClient>,
}

impl AppState {
    /// Builds every component from the settings. Any misconfiguration or an
    /// unreachable vector database fails here, before the listener binds.
    pub async fn init(settings: Settings) -> anyhow::Result<Self> {
        let chunking = settings.chunking().context("invalid chunking settings")?;

        let embedder = build_embedder(&settings)?;
        let index = build_index(&settings, embedder.dimensions()).await?;
        let store = Arc::new(VectorStore::from_parts(index, embedder));

        // the listing must not outlive the vectors it describes
        let registry = Arc::new(match settings.vector_db_type {
            VectorBackend::Memory => DocumentRegistry::in_memory(),
            VectorBackend::Qdrant => DocumentRegistry::open(&settings.vector_db_path)
                .await
                .with_context(|| {
                    format!(
                        "failed to open document registry in {}",
                        settings.vector_db_path.display()
                    )
                })?,
        });

        tokio::fs::create_dir_all(&settings.pdf_upload_path)
            .await
            .with_context(|| {
                format!(
                    "failed to create upload directory {}",
                    settings.pdf_upload_path.display()
                )
            })?;

        let ingestor = DocumentIngestor::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            &settings.pdf_upload_path,
            chunking,
        )?;

        let client = OpenAiChatClient::new(
            &settings.openai_base_url,
            settings.openai_api_key.clone(),
            settings.completion(),
        )
        .context("failed to build completion client")?;
        let pipeline = RagPipeline::new(Arc::clone(&store), client, settings.retrieval())
            .context("invalid retrieval settings")?;

        info!(
            backend = ?settings.vector_db_type,
            embedding_model = %settings.embedding_model,
            llm_model = %settings.llm_model,
            dimensions = store.dimensions(),
            "rag system initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                store,
                registry,
                ingestor,
                pipeline,
            }),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn store(&self) -> &VectorStore {
        &self.inner.store
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.inner.registry
    }

    pub fn ingestor(&self) -> &DocumentIngestor {
        &self.inner.ingestor
    }

    pub fn pipeline(&self) -> &RagPipeline<OpenAiChatClient> {
        &self.inner.pipeline
    }

    pub async fn shutdown(&self) {
        let documents = self.inner.registry.len().await;
        match self.inner.store.count().await {
            Ok(chunks) => info!(documents, chunks, "shutting down rag system"),
            Err(error) => warn!(
                documents,
                %error,
                "shutting down rag system; chunk count unavailable"
            ),
        }
    }
}

fn build_embedder(settings: &Settings) -> anyhow::Result<Box<dyn Embedder>> {
    if settings.embedding_model == CHARACTER_NGRAM_MODEL {
        return Ok(Box::new(CharacterNgramEmbedder {
            dimensions: settings
                .embedding_dimensions
                .unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS),
        }));
    }

    let embedder = OpenAiEmbedder::new(
        &settings.openai_base_url,
        settings.openai_api_key.clone(),
        settings.embedding_model.clone(),
        settings.embedding_dimensions,
    )
    .context("failed to build embedding client")?
    .with_batch_size(settings.embedding_batch_size);
    Ok(Box::new(embedder))
}

async fn build_index(
    settings: &Settings,
    dimensions: usize,
) -> anyhow::Result<Box<dyn VectorIndex>> {
    match settings.vector_db_type {
        VectorBackend::Memory => Ok(Box::new(InMemoryIndex::new())),
        VectorBackend::Qdrant => {
            let store = QdrantStore::new(
                settings.qdrant_url.clone(),
                settings.qdrant_collection.clone(),
                dimensions,
            )?;
            store.ensure_collection().await.with_context(|| {
                format!(
                    "failed to prepare qdrant collection {} at {}",
                    settings.qdrant_collection, settings.qdrant_url
                )
            })?;
            Ok(Box::new(store))
        }
    }
}
