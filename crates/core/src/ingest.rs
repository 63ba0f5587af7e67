use crate::chunking::{chunk_pages, ChunkingConfig};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::registry::DocumentRegistry;
use crate::store::VectorStore;
use crate::{Chunk, DocumentStatus, IngestError, UploadedDocument};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub fn is_pdf_file_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// `{file_id}_{name}` with any directory part of the client-supplied name
/// removed.
pub fn stored_file_name(file_id: &Uuid, original: &str) -> String {
    let base = original
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or("upload.pdf");
    format!("{file_id}_{base}")
}

/// Extracts and chunks one PDF. Blocking; run it off the async workers.
pub fn process_pdf(
    extractor: &dyn PdfExtractor,
    path: &Path,
    document_id: &str,
    config: ChunkingConfig,
) -> Result<Vec<Chunk>, IngestError> {
    let pages = extractor.extract_pages(path)?;
    let chunks = chunk_pages(&pages, document_id, config)?;
    info!(
        path = %path.display(),
        pages = pages.len(),
        chunks = chunks.len(),
        "processed pdf"
    );
    Ok(chunks)
}

/// Upload flow: save the file, extract, chunk, embed and store, then record
/// the outcome in the registry.
pub struct DocumentIngestor {
    extractor: Arc<dyn PdfExtractor>,
    store: Arc<VectorStore>,
    registry: Arc<DocumentRegistry>,
    upload_dir: PathBuf,
    chunking: ChunkingConfig,
}

impl DocumentIngestor {
    pub fn new(
        store: Arc<VectorStore>,
        registry: Arc<DocumentRegistry>,
        upload_dir: impl Into<PathBuf>,
        chunking: ChunkingConfig,
    ) -> Result<Self, IngestError> {
        chunking.validate()?;
        Ok(Self {
            extractor: Arc::new(LopdfExtractor),
            store,
            registry,
            upload_dir: upload_dir.into(),
            chunking,
        })
    }

    pub fn with_extractor(mut self, extractor: impl PdfExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub async fn ingest_upload(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<UploadedDocument, IngestError> {
        if !is_pdf_file_name(filename) {
            return Err(IngestError::NotPdf(filename.to_string()));
        }

        let file_id = Uuid::new_v4();
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(stored_file_name(&file_id, filename));
        tokio::fs::write(&path, bytes).await?;
        info!(file_id = %file_id, path = %path.display(), bytes = bytes.len(), "stored upload");

        let outcome = self.index_file(path, file_id.to_string()).await;
        let (status, total_chunks) = match &outcome {
            Ok(total) => (DocumentStatus::Success, *total),
            Err(error) => {
                error!(file_id = %file_id, %error, "failed to process pdf");
                (DocumentStatus::Failed, 0)
            }
        };

        let document = UploadedDocument {
            file_id: file_id.to_string(),
            filename: filename.to_string(),
            upload_date: Utc::now(),
            total_chunks,
            status,
        };

        let recorded = self.registry.record(document.clone()).await;
        outcome?;
        recorded?;
        Ok(document)
    }

    async fn index_file(&self, path: PathBuf, document_id: String) -> Result<usize, IngestError> {
        let extractor = Arc::clone(&self.extractor);
        let config = self.chunking;
        let chunks = tokio::task::spawn_blocking(move || {
            process_pdf(extractor.as_ref(), &path, &document_id, config)
        })
        .await??;

        self.store.add_documents(&chunks).await?;
        Ok(chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::testing::write_text_pdf;
    use crate::models::PageText;
    use crate::store::tests::memory_store;
    use std::fs;
    use tempfile::tempdir;

    struct FixedPages(Vec<PageText>);

    impl PdfExtractor for FixedPages {
        fn extract_pages(&self, _path: &Path) -> Result<Vec<PageText>, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    fn ingestor(upload_dir: &Path) -> (DocumentIngestor, Arc<VectorStore>, Arc<DocumentRegistry>) {
        let store = Arc::new(memory_store());
        let registry = Arc::new(DocumentRegistry::in_memory());
        let ingestor = DocumentIngestor::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            upload_dir,
            ChunkingConfig::new(100, 20).unwrap(),
        )
        .unwrap();
        (ingestor, store, registry)
    }

    #[test]
    fn pdf_names_are_recognised() {
        assert!(is_pdf_file_name("annual-report.pdf"));
        assert!(is_pdf_file_name("ANNUAL.PDF"));
        assert!(!is_pdf_file_name("notes.txt"));
        assert!(!is_pdf_file_name("pdf"));
    }

    #[test]
    fn stored_names_drop_directories() {
        let id = Uuid::nil();
        assert_eq!(
            stored_file_name(&id, "../../etc/q1.pdf"),
            format!("{id}_q1.pdf")
        );
        assert_eq!(
            stored_file_name(&id, r"C:\reports\q2.pdf"),
            format!("{id}_q2.pdf")
        );
    }

    #[tokio::test]
    async fn non_pdf_is_rejected_before_any_io() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let uploads = dir.path().join("uploads");
        let (ingestor, store, registry) = ingestor(&uploads);

        let result = ingestor.ingest_upload("notes.txt", b"plain text").await;

        assert!(matches!(result, Err(IngestError::NotPdf(_))));
        assert!(!uploads.exists());
        assert_eq!(store.count().await?, 0);
        assert!(registry.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn pdf_upload_is_chunked_stored_and_recorded() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let source = dir.path().join("source.pdf");
        write_text_pdf(&source, &["Revenue grew strongly", "Net income was flat"])?;
        let bytes = fs::read(&source)?;
        let uploads = dir.path().join("uploads");
        let (ingestor, store, registry) = ingestor(&uploads);

        let document = ingestor.ingest_upload("q3.pdf", &bytes).await?;

        assert_eq!(document.status, DocumentStatus::Success);
        assert_eq!(document.filename, "q3.pdf");
        assert_eq!(document.total_chunks, store.count().await?);
        assert_eq!(document.total_chunks, 2);

        let saved = uploads.join(format!("{}_q3.pdf", document.file_id));
        assert!(saved.exists());

        let chunks = store.all_chunks().await?;
        assert!(chunks.iter().all(|chunk| chunk.document_id == document.file_id));
        assert_eq!(chunks.iter().map(|c| c.page).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(registry.list().await, vec![document]);
        Ok(())
    }

    #[tokio::test]
    async fn chunk_count_matches_chunks_created() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let pages = vec![
            PageText {
                number: 1,
                text: "Assets and liabilities. ".repeat(20),
            },
            PageText {
                number: 2,
                text: "Equity.".to_string(),
            },
        ];
        let (ingestor, store, _) = ingestor(dir.path());
        let ingestor = ingestor.with_extractor(FixedPages(pages));

        let document = ingestor.ingest_upload("fy.pdf", b"%PDF-1.4").await?;

        assert!(document.total_chunks > 2);
        assert_eq!(document.total_chunks, store.count().await?);
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_pdf_is_recorded_as_failed() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let (ingestor, store, registry) = ingestor(dir.path());

        let result = ingestor.ingest_upload("broken.pdf", b"%PDF-1.4\n%broken").await;

        assert!(matches!(result, Err(IngestError::Extraction(_))));
        assert_eq!(store.count().await?, 0);
        let listed = registry.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, DocumentStatus::Failed);
        assert_eq!(listed[0].total_chunks, 0);
        Ok(())
    }
}
