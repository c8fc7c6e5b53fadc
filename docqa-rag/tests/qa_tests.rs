//! End-to-end ingestion and question answering with in-process providers.

use std::fs;
use std::sync::Arc;

use docqa_rag::mock::{MockEmbeddingProvider, MockLlm};
use docqa_rag::{
    DocumentQa, EmbeddingProvider, IngestionPipeline, NOT_FOUND, NormalizationFailurePolicy, PageText,
    PlainTextExtractor, RagConfig, RagError, SearchStrategy, VectorIndex,
};

const SKY: &str = "The sky is blue because of Rayleigh scattering.";

/// Corrects the question when asked to normalize; answers from the context otherwise.
fn scripted_llm() -> Arc<MockLlm> {
    Arc::new(MockLlm::from_fn(|prompt| {
        if prompt.starts_with("Correct the spelling") {
            return Ok("Why is the sky blue?".to_string());
        }
        if prompt.contains("Rayleigh scattering") {
            Ok("The sky is blue because of Rayleigh scattering.".to_string())
        } else {
            Ok(NOT_FOUND.to_string())
        }
    }))
}

fn config() -> RagConfig {
    RagConfig::builder().chunk_size(1000).chunk_overlap(0).build().unwrap()
}

#[tokio::test]
async fn one_page_document_answers_from_its_only_chunk() {
    let embedder = Arc::new(MockEmbeddingProvider::new(64));
    let pipeline =
        IngestionPipeline::builder().config(config()).embedding_provider(embedder.clone()).build().unwrap();

    let index = pipeline.ingest_pages(&[PageText::new("sky.txt", Some(1), SKY)]).await.unwrap();
    assert_eq!(index.len(), 1);

    let llm = scripted_llm();
    let qa = DocumentQa::builder()
        .config(config())
        .embedding_provider(embedder)
        .language_model(llm.clone())
        .index(Arc::new(index))
        .build()
        .unwrap();

    let answer = qa.ask_detailed("why is the sky blue").await.unwrap();
    assert_eq!(answer.normalized_query, "Why is the sky blue?");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].text, SKY);
    assert!(answer.text.contains("Rayleigh scattering"));
    assert!(answer.grounded);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains(SKY));
    assert!(prompts[1].contains("Why is the sky blue?"));
}

#[tokio::test]
async fn directory_ingestion_persists_and_reloads() {
    let data = tempfile::tempdir().unwrap();
    fs::write(data.path().join("sky.txt"), SKY).unwrap();
    fs::write(data.path().join("grass.txt"), "Grass is green because of chlorophyll.\u{000C}Page two.").unwrap();
    fs::write(data.path().join("ignored.md"), "not ingested").unwrap();

    let embedder = Arc::new(MockEmbeddingProvider::new(64));
    let pipeline =
        IngestionPipeline::builder().config(config()).embedding_provider(embedder.clone()).build().unwrap();
    let index = pipeline.ingest_directory(data.path(), &PlainTextExtractor, &["txt"]).await.unwrap();
    assert_eq!(index.len(), 3);

    let out = tempfile::tempdir().unwrap();
    index.persist(out.path()).unwrap();
    let loaded = VectorIndex::load(out.path(), embedder.dimensions()).unwrap();
    assert_eq!(loaded.manifest().build_id, index.manifest().build_id);

    let qa = DocumentQa::builder()
        .config(config())
        .embedding_provider(embedder)
        .language_model(scripted_llm())
        .index(Arc::new(loaded))
        .build()
        .unwrap();
    assert!(qa.ask("why is the sky blue").await.unwrap().contains("Rayleigh scattering"));
}

#[tokio::test]
async fn empty_corpus_is_rejected_at_ingestion() {
    let data = tempfile::tempdir().unwrap();
    let pipeline = IngestionPipeline::builder()
        .embedding_provider(Arc::new(MockEmbeddingProvider::new(8)))
        .build()
        .unwrap();

    assert!(matches!(
        pipeline.ingest_directory(data.path(), &PlainTextExtractor, &["txt"]).await,
        Err(RagError::EmptyCorpusError)
    ));
}

#[tokio::test]
async fn embedding_failure_aborts_ingestion() {
    let config = RagConfig::builder().chunk_size(10).chunk_overlap(0).embedding_batch_size(1).build().unwrap();
    let pipeline = IngestionPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(MockEmbeddingProvider::new(8).failing_after(2)))
        .build()
        .unwrap();

    let pages = [PageText::new("long.txt", Some(1), "x".repeat(50))];
    assert!(matches!(
        pipeline.ingest_pages(&pages).await,
        Err(RagError::EmbeddingServiceError { .. })
    ));
}

#[tokio::test]
async fn provider_failure_is_distinguishable_from_not_found() {
    let embedder = Arc::new(MockEmbeddingProvider::new(32));
    let pipeline =
        IngestionPipeline::builder().config(config()).embedding_provider(embedder.clone()).build().unwrap();
    let index = Arc::new(pipeline.ingest_pages(&[PageText::new("sky.txt", Some(1), SKY)]).await.unwrap());

    let failing = DocumentQa::builder()
        .config(config())
        .embedding_provider(embedder.clone())
        .language_model(Arc::new(MockLlm::failing("upstream 503")))
        .index(index.clone())
        .build()
        .unwrap();
    let err = failing.ask("why is the sky blue").await.unwrap_err();
    assert!(matches!(err, RagError::CompositionError(_)));

    let strict = DocumentQa::builder()
        .config(
            RagConfig::builder()
                .normalization_failure(NormalizationFailurePolicy::Propagate)
                .build()
                .unwrap(),
        )
        .embedding_provider(embedder)
        .language_model(Arc::new(MockLlm::failing("upstream 503")))
        .index(index)
        .build()
        .unwrap();
    assert!(matches!(strict.ask("why is the sky blue").await, Err(RagError::NormalizationError(_))));
}

#[tokio::test]
async fn diverse_strategy_answers_too() {
    let embedder = Arc::new(MockEmbeddingProvider::new(64));
    let config = RagConfig::builder()
        .chunk_size(1000)
        .chunk_overlap(0)
        .top_k(2)
        .search_strategy(SearchStrategy::Diverse { fetch_k: 3, lambda: 0.5 })
        .build()
        .unwrap();
    let pipeline =
        IngestionPipeline::builder().config(config.clone()).embedding_provider(embedder.clone()).build().unwrap();
    let index = pipeline
        .ingest_pages(&[
            PageText::new("sky.txt", Some(1), SKY),
            PageText::new("sky.txt", Some(2), SKY),
            PageText::new("sea.txt", Some(1), "The sea reflects the sky."),
        ])
        .await
        .unwrap();

    let qa = DocumentQa::builder()
        .config(config)
        .embedding_provider(embedder)
        .language_model(scripted_llm())
        .index(Arc::new(index))
        .build()
        .unwrap();

    let answer = qa.ask_detailed("why is the sky blue").await.unwrap();
    assert_eq!(answer.sources.len(), 2);
    assert!(answer.sources.iter().any(|c| c.source_id == "sea.txt"));
}
