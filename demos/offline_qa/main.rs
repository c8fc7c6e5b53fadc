//! # Offline question answering
//!
//! Ingests a few pages, persists and reloads the index, then answers
//! questions with both retrieval strategies.
//!
//! Uses `MockEmbeddingProvider` and a scripted `MockLlm` so it runs with
//! **zero API keys**.
//!
//! Run: `cargo run -p docqa-demos --example offline_qa`

use std::sync::Arc;

use docqa_rag::mock::{MockEmbeddingProvider, MockLlm};
use docqa_rag::{
    DocumentQa, EmbeddingProvider, IngestionPipeline, NOT_FOUND, PageText, RagConfig, SearchStrategy,
    VectorIndex,
};
use docqa_telemetry::{LogFormat, init_telemetry};

/// Answers with the first context sentence sharing a word with the question.
fn scripted_llm() -> Arc<MockLlm> {
    Arc::new(MockLlm::from_fn(|prompt| {
        if let Some(question) = section(prompt, "Question:\n", "\n\nCorrected question:") {
            return Ok(question.to_string());
        }
        let (Some(context), Some(question)) = (
            section(prompt, "Context:\n", "\n\nQuestion:"),
            section(prompt, "Question:\n", "\n\nAnswer"),
        ) else {
            return Ok(NOT_FOUND.to_string());
        };

        let words: Vec<String> =
            question.split_whitespace().filter(|w| w.len() > 3).map(|w| w.to_lowercase()).collect();
        let answer = context
            .split(". ")
            .find(|sentence| words.iter().any(|w| sentence.to_lowercase().contains(w.as_str())))
            .unwrap_or(NOT_FOUND);
        Ok(answer.to_string())
    }))
}

fn section<'a>(prompt: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = prompt.find(start)? + start.len();
    let to = prompt[from..].find(end)? + from;
    Some(prompt[from..to].trim())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(LogFormat::Pretty)?;

    // -- 1. Configure ingestion -------------------------------------------
    // Small chunks so each page yields several windows.
    let config = RagConfig::builder().chunk_size(120).chunk_overlap(30).top_k(3).build()?;
    let embedder = Arc::new(MockEmbeddingProvider::new(128));

    let pipeline = IngestionPipeline::builder()
        .config(config.clone())
        .embedding_provider(embedder.clone())
        .build()?;

    // -- 2. Ingest sample pages -------------------------------------------
    let pages = vec![
        PageText::new(
            "optics.txt",
            Some(1),
            "The sky is blue because of Rayleigh scattering. Short wavelengths scatter more \
             strongly than long ones. At sunset light travels through more air, so the sky turns red.",
        ),
        PageText::new(
            "biology.txt",
            Some(1),
            "Photosynthesis converts light into chemical energy. Chlorophyll absorbs red and blue \
             light and reflects green, which is why leaves look green.",
        ),
        PageText::new(
            "biology.txt",
            Some(2),
            "Osmosis moves water across a membrane toward the higher solute concentration.",
        ),
    ];
    let index = pipeline.ingest_pages(&pages).await?;
    println!("Indexed {} chunks", index.len());

    // -- 3. Persist and reload --------------------------------------------
    let dir = std::env::temp_dir().join("docqa-offline-demo");
    let path = index.persist(&dir)?;
    let index = Arc::new(VectorIndex::load(&path, embedder.dimensions())?);
    println!("Reloaded index {} from {}", index.manifest().build_id, path.display());

    // -- 4. Ask with each strategy ----------------------------------------
    let strategies = [
        ("similarity", SearchStrategy::Similarity),
        ("diverse", SearchStrategy::Diverse { fetch_k: 6, lambda: 0.5 }),
    ];
    let questions = ["why is the sky blue", "why do leaves look green", "what is quantum chromodynamics"];

    for (label, strategy) in strategies {
        let qa = DocumentQa::builder()
            .config(RagConfig { search_strategy: strategy, ..config.clone() })
            .embedding_provider(embedder.clone())
            .language_model(scripted_llm())
            .index(index.clone())
            .build()?;

        println!("\n== {label} ==");
        for question in questions {
            let answer = qa.ask_detailed(question).await?;
            println!("Q: {question}\nA: {}", answer.text);
            for chunk in &answer.sources {
                println!("   - {} p{} #{}", chunk.source_id, chunk.page.unwrap_or(0), chunk.sequence);
            }
        }
    }

    println!("\nDone.");
    Ok(())
}
