use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid chunking config: {0}")]
    InvalidChunking(String),

    #[error("invalid retrieval config: {0}")]
    InvalidRetrieval(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("embedding with {provider} failed: {message}")]
    Embedding { provider: String, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store request failed: {0}")]
    Request(String),
}

impl StoreError {
    pub(crate) fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Embedding {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion api returned {status}: {details}")]
    Api { status: u16, details: String },

    #[error("completion response was malformed: {0}")]
    Malformed(String),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Failures of the upload flow, from the file name check to the store write.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file must be a PDF: {0}")]
    NotPdf(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
