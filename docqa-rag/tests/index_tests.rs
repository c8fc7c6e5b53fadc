//! Property tests for vector index search and persistence.

use std::collections::HashSet;

use docqa_rag::{Chunk, EmbeddedChunk, RagError, VectorIndex};
use proptest::prelude::*;

const DIM: usize = 8;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-3 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

fn build(vectors: Vec<Vec<f32>>) -> VectorIndex {
    let entries = vectors
        .into_iter()
        .enumerate()
        .map(|(i, v)| EmbeddedChunk::new(Chunk::new(format!("chunk {i}"), "doc.txt", Some(1), i), v))
        .collect();
    VectorIndex::build(entries).unwrap()
}

mod prop_similarity_search {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn returns_min_k_n_distinct_results_in_descending_order(
            vectors in proptest::collection::vec(arb_normalized_embedding(DIM), 1..30),
            query in arb_normalized_embedding(DIM),
            k in 1usize..40,
        ) {
            let n = vectors.len();
            let index = build(vectors);
            let hits = index.similarity_search(&query, k).unwrap();

            prop_assert_eq!(hits.len(), k.min(n));
            for pair in hits.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
            let unique: HashSet<usize> = hits.iter().map(|h| h.chunk.sequence).collect();
            prop_assert_eq!(unique.len(), hits.len());
        }

        /// Querying with a stored vector ranks that entry first (or tied for first).
        #[test]
        fn stored_vector_ranks_first(
            vectors in proptest::collection::vec(arb_normalized_embedding(DIM), 1..30),
            pick in any::<prop::sample::Index>(),
        ) {
            let target = pick.index(vectors.len());
            let query = vectors[target].clone();
            let index = build(vectors);

            let hits = index.similarity_search(&query, index.len()).unwrap();
            let own = hits.iter().find(|h| h.chunk.sequence == target).unwrap();
            prop_assert!((own.score - 1.0).abs() < 1e-4);
            prop_assert!(hits[0].score - own.score < 1e-4);
        }
    }
}

mod prop_diverse_search {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn selects_distinct_entries_from_the_candidate_pool(
            vectors in proptest::collection::vec(arb_normalized_embedding(DIM), 1..30),
            query in arb_normalized_embedding(DIM),
            k in 1usize..10,
            extra in 0usize..10,
            lambda in 0.0f32..=1.0,
        ) {
            let n = vectors.len();
            let index = build(vectors);
            let fetch_k = k + extra;

            let pool: HashSet<usize> = index
                .similarity_search(&query, fetch_k)
                .unwrap()
                .iter()
                .map(|h| h.chunk.sequence)
                .collect();
            let hits = index.diverse_search(&query, k, fetch_k, lambda).unwrap();

            prop_assert_eq!(hits.len(), k.min(n));
            let chosen: HashSet<usize> = hits.iter().map(|h| h.chunk.sequence).collect();
            prop_assert_eq!(chosen.len(), hits.len());
            prop_assert!(chosen.is_subset(&pool));
        }
    }
}

mod prop_persistence {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        #[test]
        fn loaded_index_answers_identically(
            vectors in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let index = build(vectors);
            let temp = tempfile::tempdir().unwrap();
            index.persist(temp.path()).unwrap();
            let loaded = VectorIndex::load(temp.path(), DIM).unwrap();

            prop_assert_eq!(loaded.manifest(), index.manifest());
            prop_assert_eq!(loaded.len(), index.len());
            for (a, b) in loaded.iter().zip(index.iter()) {
                prop_assert_eq!(&a.chunk, &b.chunk);
                let loaded_bits: Vec<u32> = a.vector.iter().map(|x| x.to_bits()).collect();
                let stored_bits: Vec<u32> = b.vector.iter().map(|x| x.to_bits()).collect();
                prop_assert_eq!(loaded_bits, stored_bits);
            }
            prop_assert_eq!(
                loaded.similarity_search(&query, k).unwrap(),
                index.similarity_search(&query, k).unwrap()
            );
        }
    }
}

#[test]
fn building_from_nothing_is_an_empty_corpus() {
    assert!(matches!(VectorIndex::build(Vec::new()), Err(RagError::EmptyCorpusError)));
}

#[test]
fn persist_leaves_no_staging_file() {
    let temp = tempfile::tempdir().unwrap();
    let index = build(vec![vec![1.0; DIM]]);
    let written = index.persist(temp.path().join("nested")).unwrap();

    let names: Vec<_> = std::fs::read_dir(temp.path().join("nested"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["index.json".to_string()]);
    assert!(written.ends_with("index.json"));
}
