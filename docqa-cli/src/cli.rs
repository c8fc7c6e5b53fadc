//! Command-line definitions.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use docqa_rag::openai::{DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, OpenAIConfig};
use docqa_rag::{NormalizationFailurePolicy, RagConfig, SearchStrategy};
use docqa_telemetry::LogFormat;

/// Ask questions about your own documents.
///
/// `docqa ingest` builds a searchable index from extracted text files;
/// `docqa ask` and `docqa chat` answer questions using only that index.
#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version,
    about,
    after_help = "EXAMPLES:\n    \
                  docqa ingest --data data --index index\n    \
                  docqa ask \"why is the sky blue\" --index index --sources\n    \
                  docqa chat --index index --strategy diverse"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Log output format
    #[arg(long, default_value = "pretty", global = true)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chunk, embed and index every document under a directory
    Ingest(IngestArgs),
    /// Answer a single question
    Ask(AskArgs),
    /// Answer questions interactively until `exit`, `quit` or Ctrl-D
    Chat(ChatArgs),
}

/// Connection settings for the OpenAI-compatible API.
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// API key (falls back to OPENROUTER_API_KEY, then OPENAI_API_KEY)
    #[arg(long, env = "DOCQA_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// API root of the OpenAI-compatible service
    #[arg(long, env = "DOCQA_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Embedding model name
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL, global = true)]
    pub embedding_model: String,

    /// Request truncated embeddings of this size
    #[arg(long, global = true)]
    pub embedding_dimensions: Option<usize>,

    /// Chat model used for normalization and answers
    #[arg(long, default_value = DEFAULT_CHAT_MODEL, global = true)]
    pub chat_model: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60, global = true)]
    pub timeout_secs: u64,
}

impl ProviderArgs {
    /// Resolve the API connection, reading the environment for anything not given.
    pub fn openai_config(&self) -> docqa_rag::Result<OpenAIConfig> {
        let mut config = match &self.api_key {
            Some(key) => OpenAIConfig::new(key.clone()),
            None => OpenAIConfig::from_env()?,
        };
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        Ok(config.with_timeout(Duration::from_secs(self.timeout_secs)))
    }
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Directory holding the extracted text documents
    #[arg(long, default_value = "data")]
    pub data: PathBuf,

    /// Directory the index is written to
    #[arg(long, default_value = "index")]
    pub index: PathBuf,

    /// Characters per chunk
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = 300)]
    pub chunk_overlap: usize,

    /// File extensions to ingest, comma separated
    #[arg(long, value_delimiter = ',', default_value = "txt")]
    pub extensions: Vec<String>,

    /// Chunks per embedding request
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Embedding requests in flight at once
    #[arg(long, default_value_t = 4)]
    pub max_concurrent: usize,
}

impl IngestArgs {
    pub fn rag_config(&self) -> docqa_rag::Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .embedding_batch_size(self.batch_size)
            .max_concurrent_batches(self.max_concurrent)
            .build()
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    /// Nearest chunks by cosine similarity
    Similarity,
    /// Maximal marginal relevance over the nearest `--fetch-k`
    Diverse,
}

/// Retrieval and normalization settings shared by `ask` and `chat`.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Directory holding the index
    #[arg(long, default_value = "index")]
    pub index: PathBuf,

    /// Chunks handed to the answer model
    #[arg(long, default_value_t = 20)]
    pub top_k: usize,

    /// Retrieval strategy
    #[arg(long, value_enum, default_value_t = StrategyArg::Similarity)]
    pub strategy: StrategyArg,

    /// Candidates considered by the diverse strategy (default: twice --top-k)
    #[arg(long)]
    pub fetch_k: Option<usize>,

    /// Relevance weight of the diverse strategy, from 0 (diversity) to 1 (relevance)
    #[arg(long, default_value_t = 0.5)]
    pub mmr_lambda: f32,

    /// Keep retrieved chunks in score order instead of reading order
    #[arg(long)]
    pub no_restore_order: bool,

    /// Skip spelling correction of questions
    #[arg(long)]
    pub no_normalize: bool,

    /// Fail instead of using the raw question when correction fails
    #[arg(long, conflicts_with = "no_normalize")]
    pub strict_normalize: bool,

    /// Print the chunks each answer was grounded on
    #[arg(long)]
    pub sources: bool,
}

impl QueryArgs {
    pub fn rag_config(&self) -> docqa_rag::Result<RagConfig> {
        let strategy = match self.strategy {
            StrategyArg::Similarity => SearchStrategy::Similarity,
            StrategyArg::Diverse => SearchStrategy::Diverse {
                fetch_k: self.fetch_k.unwrap_or(self.top_k.saturating_mul(2)),
                lambda: self.mmr_lambda,
            },
        };
        let on_failure = if self.strict_normalize {
            NormalizationFailurePolicy::Propagate
        } else {
            NormalizationFailurePolicy::FallbackToRaw
        };

        RagConfig::builder()
            .top_k(self.top_k)
            .search_strategy(strategy)
            .restore_document_order(!self.no_restore_order)
            .normalize_queries(!self.no_normalize)
            .normalization_failure(on_failure)
            .build()
    }
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// The question
    pub question: String,

    #[command(flatten)]
    pub query: QueryArgs,

    /// Print the full answer record as JSON
    #[arg(long)]
    pub json: bool,

    /// Print how long each stage took
    #[arg(long)]
    pub timings: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    #[command(flatten)]
    pub query: QueryArgs,
}
