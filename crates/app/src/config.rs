use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use finqa_core::{ChunkingConfig, CompletionOptions, ConfigError, RetrievalOptions};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VectorBackend {
    /// Qdrant over its HTTP API
    Qdrant,
    /// In-process index; vectors and the upload listing last only as long
    /// as the process
    Memory,
}

/// Every flag can also be given through the environment (or a `.env` file).
#[derive(Debug, Clone, Parser)]
#[command(name = "finqa-server", version, about = "Question answering over uploaded financial PDFs")]
pub struct Settings {
    /// API key for the embedding and completion service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Directory for the document registry (unused with the memory backend)
    #[arg(long, env = "VECTOR_DB_PATH", default_value = "./vector_store")]
    pub vector_db_path: PathBuf,

    #[arg(long, env = "VECTOR_DB_TYPE", value_enum, default_value_t = VectorBackend::Qdrant)]
    pub vector_db_type: VectorBackend,

    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    pub qdrant_url: String,

    #[arg(long, env = "QDRANT_COLLECTION", default_value = "rag_collection")]
    pub qdrant_collection: String,

    /// Where uploaded PDFs are kept, as `{uuid}_{filename}`
    #[arg(long, env = "PDF_UPLOAD_PATH", default_value = "./uploaded_pdfs")]
    pub pdf_upload_path: PathBuf,

    /// Embedding model; `char-ngram` embeds locally without the API
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "text-embedding-ada-002")]
    pub embedding_model: String,

    /// Override for models whose vector size is not known
    #[arg(long, env = "EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// Texts per embeddings API request
    #[arg(long, env = "EMBEDDING_BATCH_SIZE", default_value_t = 64)]
    pub embedding_batch_size: usize,

    #[arg(long, env = "LLM_MODEL", default_value = "gpt-3.5-turbo")]
    pub llm_model: String,

    #[arg(long, env = "LLM_TEMPERATURE", default_value_t = 0.1)]
    pub llm_temperature: f32,

    #[arg(long, env = "MAX_TOKENS", default_value_t = 1000)]
    pub max_tokens: u32,

    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 60)]
    pub llm_timeout_secs: u64,

    #[arg(long, env = "CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    #[arg(long, env = "CHUNK_OVERLAP", default_value_t = 200)]
    pub chunk_overlap: usize,

    #[arg(long, env = "RETRIEVAL_K", default_value_t = 5)]
    pub retrieval_k: usize,

    #[arg(long, env = "SIMILARITY_THRESHOLD", default_value_t = 0.7)]
    pub similarity_threshold: f32,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Log every request and response at debug level. Accepts
    /// true/false, 1/0, yes/no, on/off in any case.
    #[arg(
        long,
        env = "DEBUG",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub debug: bool,

    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000,http://127.0.0.1:3000"
    )]
    pub allowed_origins: Vec<String>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 50 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn chunking(&self) -> Result<ChunkingConfig, ConfigError> {
        ChunkingConfig::new(self.chunk_size, self.chunk_overlap)
    }

    pub fn retrieval(&self) -> RetrievalOptions {
        RetrievalOptions {
            top_k: self.retrieval_k,
            similarity_threshold: self.similarity_threshold,
        }
    }

    pub fn completion(&self) -> CompletionOptions {
        CompletionOptions {
            model: self.llm_model.clone(),
            temperature: self.llm_temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.llm_timeout_secs),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Filter directives for the subscriber when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> String {
        let level = self.log_level.to_lowercase();
        if self.debug {
            format!("{level},tower_http=debug")
        } else {
            level
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Settings {
        let mut argv = vec!["finqa-server", "--openai-api-key", "sk-test"];
        argv.extend_from_slice(args);
        Settings::try_parse_from(argv).expect("settings should parse")
    }

    #[test]
    fn api_key_is_required() {
        if std::env::var_os("OPENAI_API_KEY").is_none() {
            assert!(Settings::try_parse_from(["finqa-server"]).is_err());
        }
    }

    #[test]
    fn origins_are_comma_separated() {
        let settings = parse(&["--allowed-origins", "https://a.example,https://b.example"]);
        assert_eq!(
            settings.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn debug_adds_http_tracing() {
        let settings = parse(&["--debug", "true", "--log-level", "WARN"]);
        assert_eq!(settings.log_filter(), "warn,tower_http=debug");
    }

    #[test]
    fn debug_accepts_boolish_values() {
        for value in ["1", "True", "yes", "ON"] {
            assert!(parse(&["--debug", value]).debug, "{value} should enable debug");
        }
        for value in ["0", "False", "no"] {
            assert!(!parse(&["--debug", value]).debug, "{value} should disable debug");
        }
        assert!(Settings::try_parse_from([
            "finqa-server",
            "--openai-api-key",
            "sk-test",
            "--debug",
            "maybe"
        ])
        .is_err());
    }

    #[test]
    fn embedding_batch_size_defaults_to_64() {
        assert_eq!(parse(&[]).embedding_batch_size, 64);
        assert_eq!(
            parse(&["--embedding-batch-size", "16"]).embedding_batch_size,
            16
        );
    }

    #[test]
    fn overlap_not_below_chunk_size_fails_fast() {
        let settings = parse(&["--chunk-size", "200", "--chunk-overlap", "200"]);
        assert!(settings.chunking().is_err());
    }

    #[test]
    fn retrieval_and_completion_options_follow_flags() {
        let settings = parse(&[
            "--retrieval-k",
            "3",
            "--similarity-threshold",
            "0.5",
            "--llm-model",
            "gpt-4",
            "--max-tokens",
            "512",
        ]);
        assert_eq!(settings.retrieval().top_k, 3);
        assert_eq!(settings.retrieval().similarity_threshold, 0.5);
        assert_eq!(settings.completion().model, "gpt-4");
        assert_eq!(settings.completion().max_tokens, 512);
        assert_eq!(settings.vector_db_type, VectorBackend::Qdrant);
    }
}
