//! Subcommand handlers.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use docqa_rag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
use docqa_rag::{
    Answer, DocumentQa, EmbeddingProvider, IngestionPipeline, PlainTextExtractor, RagError, VectorIndex,
};
use docqa_telemetry::{QueryTraceStore, SpanRecord};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::cli::{AskArgs, ChatArgs, IngestArgs, ProviderArgs, QueryArgs};

fn embedder(provider: &ProviderArgs) -> Result<OpenAIEmbeddingProvider> {
    let mut embedder =
        OpenAIEmbeddingProvider::new(provider.openai_config()?)?.with_model(provider.embedding_model.clone());
    if let Some(dims) = provider.embedding_dimensions {
        embedder = embedder.with_dimensions(dims);
    }
    Ok(embedder)
}

/// `docqa ingest`: rebuild the index from scratch.
pub async fn ingest(args: &IngestArgs, provider: &ProviderArgs) -> Result<()> {
    let pipeline = IngestionPipeline::builder()
        .config(args.rag_config()?)
        .embedding_provider(Arc::new(embedder(provider)?))
        .build()?;

    let extensions: Vec<&str> = args.extensions.iter().map(String::as_str).collect();
    let index = pipeline
        .ingest_directory(&args.data, &PlainTextExtractor, &extensions)
        .await
        .with_context(|| format!("failed to ingest {}", args.data.display()))?;
    let path = index.persist(&args.index)?;

    println!("Indexed {} chunks into {}", index.len(), path.display());
    Ok(())
}

/// Load the index and wire the question-answering service.
pub fn build_service(query: &QueryArgs, provider: &ProviderArgs) -> Result<DocumentQa> {
    let embedder = embedder(provider)?;
    let index = VectorIndex::load(&query.index, embedder.dimensions())
        .with_context(|| format!("failed to load index from {}", query.index.display()))?;

    let built_with = &index.manifest().embedding_model;
    if built_with != embedder.model_name() {
        warn!(
            index_model = %built_with,
            query_model = embedder.model_name(),
            "index was built with a different embedding model"
        );
    }
    info!(entries = index.len(), build_id = %index.manifest().build_id, "loaded index");

    let llm = OpenAIChatModel::new(provider.openai_config()?)?.with_model(provider.chat_model.clone());
    let qa = DocumentQa::builder()
        .config(query.rag_config()?)
        .embedding_provider(Arc::new(embedder))
        .language_model(Arc::new(llm))
        .index(Arc::new(index))
        .build()?;
    Ok(qa)
}

/// `docqa ask`: answer one question.
pub async fn ask(args: &AskArgs, provider: &ProviderArgs, traces: &QueryTraceStore) -> Result<()> {
    let qa = build_service(&args.query, provider)?;
    let answer = qa.ask_detailed(&args.question).await?;
    let spans = traces.take(&answer.query_id.to_string());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        println!("{}", answer.text);
        if args.query.sources {
            print!("{}", render_sources(&answer));
        }
    }
    if args.timings {
        eprint!("{}", render_timings(&spans));
    }
    Ok(())
}

/// `docqa chat`: a read-answer loop. Failed questions are reported and the loop continues.
pub async fn chat(args: &ChatArgs, provider: &ProviderArgs, traces: &QueryTraceStore) -> Result<()> {
    let qa = build_service(&args.query, provider)?;
    let mut editor = DefaultEditor::new()?;
    println!("Ask a question about your documents (type 'exit' to quit).");

    loop {
        let line = match editor.readline("question> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }
        let _ = editor.add_history_entry(question);

        match qa.ask_detailed(question).await {
            Ok(answer) => {
                traces.take(&answer.query_id.to_string());
                println!("\n{}\n", answer.text);
                if args.query.sources {
                    println!("{}", render_sources(&answer));
                }
            }
            Err(e) => eprintln!("{}", describe_failure(&e)),
        }
    }
    Ok(())
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// A one-line message for a failed question, distinct from a not-found answer.
pub fn describe_failure(error: &RagError) -> String {
    let kind = if error.is_provider_failure() { "service unavailable" } else { "error" };
    format!("[{kind}] {error}")
}

/// List the chunks an answer was grounded on.
pub fn render_sources(answer: &Answer) -> String {
    if !answer.grounded {
        return "Sources: none\n".to_string();
    }
    let mut out = String::from("Sources:\n");
    for chunk in &answer.sources {
        let _ = match chunk.page {
            Some(page) => writeln!(out, "  - {} (page {page}, chunk {})", chunk.source_id, chunk.sequence),
            None => writeln!(out, "  - {} (chunk {})", chunk.source_id, chunk.sequence),
        };
    }
    out
}

/// One line per recorded stage, in completion order.
pub fn render_timings(spans: &[SpanRecord]) -> String {
    let mut out = String::from("Timings:\n");
    for span in spans {
        let _ = writeln!(out, "  {:<16} {:>9.1} ms", span.name, span.duration.as_secs_f64() * 1000.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use docqa_rag::Chunk;

    use super::*;

    fn answer(grounded: bool) -> Answer {
        Answer {
            query_id: Default::default(),
            text: "text".into(),
            normalized_query: "q".into(),
            sources: if grounded {
                vec![Chunk::new("a", "sky.txt", Some(2), 4), Chunk::new("b", "notes.txt", None, 0)]
            } else {
                Vec::new()
            },
            grounded,
        }
    }

    #[test]
    fn renders_sources_with_pages() {
        assert_eq!(
            render_sources(&answer(true)),
            "Sources:\n  - sky.txt (page 2, chunk 4)\n  - notes.txt (chunk 0)\n"
        );
        assert_eq!(render_sources(&answer(false)), "Sources: none\n");
    }

    #[test]
    fn renders_timings() {
        let spans = vec![SpanRecord {
            name: "docqa.retrieve".into(),
            query_id: "q".into(),
            duration: Duration::from_micros(12_340),
            attributes: Default::default(),
        }];
        assert!(render_timings(&spans).contains("docqa.retrieve"));
        assert!(render_timings(&spans).contains("12.3 ms"));
    }

    #[test]
    fn exit_words_are_case_insensitive() {
        assert!(is_exit("EXIT"));
        assert!(is_exit("quit"));
        assert!(!is_exit("exit now"));
    }

    #[test]
    fn provider_failures_are_labelled() {
        let failure = RagError::CompositionError("timeout".into());
        assert!(describe_failure(&failure).starts_with("[service unavailable]"));
        assert!(describe_failure(&RagError::EmptyIndexError).starts_with("[error]"));
    }
}
