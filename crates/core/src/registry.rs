use crate::UploadedDocument;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const REGISTRY_FILE_NAME: &str = "documents.json";

/// Upload records in arrival order, optionally mirrored to a JSON file so the
/// listing survives restarts.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    path: Option<PathBuf>,
    documents: RwLock<Vec<UploadedDocument>>,
}

impl DocumentRegistry {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `{directory}/documents.json` if present. The directory is
    /// created when missing.
    pub async fn open(directory: &Path) -> io::Result<Self> {
        tokio::fs::create_dir_all(directory).await?;
        let path = directory.join(REGISTRY_FILE_NAME);

        let documents = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<UploadedDocument>>(&bytes)
                .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(error),
        };

        info!(path = %path.display(), documents = documents.len(), "opened document registry");
        Ok(Self {
            path: Some(path),
            documents: RwLock::new(documents),
        })
    }

    /// The in-memory listing only changes once the file write has succeeded.
    pub async fn record(&self, document: UploadedDocument) -> io::Result<()> {
        let mut documents = self.documents.write().await;

        if let Some(path) = &self.path {
            let mut updated = documents.clone();
            updated.push(document.clone());
            persist(path, &updated).await.map_err(|error| {
                warn!(path = %path.display(), %error, "failed to persist document registry");
                error
            })?;
        }

        documents.push(document);
        Ok(())
    }

    pub async fn list(&self) -> Vec<UploadedDocument> {
        self.documents.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

async fn persist(path: &Path, documents: &[UploadedDocument]) -> io::Result<()> {
    let bytes = serde_json::to_vec_pretty(documents)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
    let staging = path.with_extension("json.tmp");
    tokio::fs::write(&staging, bytes).await?;
    tokio::fs::rename(&staging, path).await
}
