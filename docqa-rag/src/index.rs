//! Durable exact nearest-neighbour index over embedded chunks.
//!
//! [`VectorIndex`] keeps every [`EmbeddedChunk`] in insertion order; the
//! position of an entry is its identifier and never changes for the lifetime
//! of a persisted index. Similarity is cosine similarity (higher is better),
//! used both when ranking and when measuring redundancy for diverse search.
//!
//! The index is immutable once built. Share it behind an `Arc` for concurrent
//! readers; to change the corpus, build a new index and swap it in.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::validate_diverse;
use crate::document::{EmbeddedChunk, ScoredChunk};
use crate::error::{RagError, Result};

/// Name of the file written inside the index directory.
pub const INDEX_FILE_NAME: &str = "index.json";

/// Version of the on-disk layout written by [`VectorIndex::persist`].
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Self-describing header stored alongside the index entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    /// On-disk layout version.
    pub format_version: u32,
    /// Unique identifier of the ingestion run that built the index.
    pub build_id: Uuid,
    /// When the index was built.
    pub created_at: DateTime<Utc>,
    /// Embedding dimension `D` shared by every entry.
    pub dimensions: usize,
    /// Name of the embedding model that produced the vectors.
    pub embedding_model: String,
    /// Chunk size used during ingestion, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    /// Chunk overlap used during ingestion, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_overlap: Option<usize>,
    /// Number of entries in the index.
    pub entry_count: usize,
}

impl IndexManifest {
    fn new(dimensions: usize, entry_count: usize) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            build_id: Uuid::new_v4(),
            created_at: Utc::now(),
            dimensions,
            embedding_model: "unknown".to_string(),
            chunk_size: None,
            chunk_overlap: None,
            entry_count,
        }
    }
}

#[derive(Serialize)]
struct PersistedIndexRef<'a> {
    manifest: &'a IndexManifest,
    entries: &'a [EmbeddedChunk],
}

#[derive(Deserialize)]
struct PersistedIndex {
    manifest: IndexManifest,
    entries: Vec<EmbeddedChunk>,
}

/// An immutable, persistable vector index using cosine similarity.
///
/// # Example
///
/// ```rust
/// use docqa_rag::{Chunk, EmbeddedChunk, VectorIndex};
///
/// let index = VectorIndex::build(vec![
///     EmbeddedChunk::new(Chunk::new("red", "colors.txt", Some(1), 0), vec![1.0, 0.0]),
///     EmbeddedChunk::new(Chunk::new("blue", "colors.txt", Some(1), 1), vec![0.0, 1.0]),
/// ])
/// .unwrap();
///
/// let hits = index.similarity_search(&[0.1, 0.9], 1).unwrap();
/// assert_eq!(hits[0].chunk.text, "blue");
/// ```
#[derive(Debug, Clone)]
pub struct VectorIndex {
    manifest: IndexManifest,
    entries: Vec<EmbeddedChunk>,
    norms: Vec<f32>,
}

impl VectorIndex {
    /// Build an index from scratch.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpusError`] if `embedded_chunks` is empty.
    /// - [`RagError::DimensionMismatch`] if the vectors do not all share the
    ///   dimension of the first one, or that dimension is zero.
    pub fn build(embedded_chunks: Vec<EmbeddedChunk>) -> Result<Self> {
        let Some(first) = embedded_chunks.first() else {
            return Err(RagError::EmptyCorpusError);
        };
        let dimensions = first.vector.len();
        if dimensions == 0 {
            return Err(RagError::DimensionMismatch { expected: 1, actual: 0 });
        }
        check_dimensions(&embedded_chunks, dimensions)?;

        let manifest = IndexManifest::new(dimensions, embedded_chunks.len());
        let index = Self::from_parts(manifest, embedded_chunks);
        info!(
            build_id = %index.manifest.build_id,
            entries = index.len(),
            dimensions,
            "built vector index"
        );
        Ok(index)
    }

    /// Create an index with no entries.
    ///
    /// Every search on it fails with [`RagError::EmptyIndexError`].
    pub fn empty(dimensions: usize) -> Self {
        Self::from_parts(IndexManifest::new(dimensions, 0), Vec::new())
    }

    /// Record the embedding model name in the manifest.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.manifest.embedding_model = model.into();
        self
    }

    /// Record the chunking parameters in the manifest.
    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.manifest.chunk_size = Some(chunk_size);
        self.manifest.chunk_overlap = Some(chunk_overlap);
        self
    }

    fn from_parts(manifest: IndexManifest, entries: Vec<EmbeddedChunk>) -> Self {
        let norms = entries.iter().map(|e| l2_norm(&e.vector)).collect();
        Self { manifest, entries, norms }
    }

    /// The index manifest.
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// The embedding dimension `D`.
    pub fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its identifier.
    pub fn get(&self, id: usize) -> Option<&EmbeddedChunk> {
        self.entries.get(id)
    }

    /// Iterate over the entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EmbeddedChunk> {
        self.entries.iter()
    }

    /// Write the index to `dir/index.json`, creating `dir` if needed.
    ///
    /// The file is written to a temporary sibling and renamed into place, so a
    /// failed write never leaves a truncated index behind.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexPersistError`] on any I/O or encoding failure.
    pub fn persist(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let persist_err = |message: String| RagError::IndexPersistError {
            path: dir.to_path_buf(),
            message,
        };

        fs::create_dir_all(dir).map_err(|e| persist_err(format!("create directory: {e}")))?;
        let target = dir.join(INDEX_FILE_NAME);
        let staging = dir.join(format!("{INDEX_FILE_NAME}.tmp"));

        let file = File::create(&staging).map_err(|e| persist_err(format!("create file: {e}")))?;
        let mut writer = BufWriter::new(file);
        let persisted = PersistedIndexRef { manifest: &self.manifest, entries: &self.entries };
        serde_json::to_writer(&mut writer, &persisted)
            .map_err(|e| persist_err(format!("encode: {e}")))?;
        writer.flush().map_err(|e| persist_err(format!("flush: {e}")))?;
        drop(writer);
        fs::rename(&staging, &target).map_err(|e| persist_err(format!("rename: {e}")))?;

        info!(
            path = %target.display(),
            build_id = %self.manifest.build_id,
            entries = self.len(),
            "persisted vector index"
        );
        Ok(target)
    }

    /// Load an index written by [`persist`](Self::persist).
    ///
    /// `path` may be the index directory or the index file itself.
    /// `expected_dimensions` is the dimension of the embedding provider that
    /// will be used to query the index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexLoadError`] if the file is missing or
    /// unreadable, has an unknown format version, is internally inconsistent,
    /// or was built with a different embedding dimension.
    pub fn load(path: impl AsRef<Path>, expected_dimensions: usize) -> Result<Self> {
        let path = path.as_ref();
        let file_path = if path.is_dir() { path.join(INDEX_FILE_NAME) } else { path.to_path_buf() };
        let load_err =
            |message: String| RagError::IndexLoadError { path: file_path.clone(), message };

        if !file_path.is_file() {
            return Err(load_err("index file not found".to_string()));
        }
        let file = File::open(&file_path).map_err(|e| load_err(format!("open: {e}")))?;
        let persisted: PersistedIndex = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| load_err(format!("decode: {e}")))?;
        let PersistedIndex { manifest, entries } = persisted;

        if manifest.format_version != INDEX_FORMAT_VERSION {
            return Err(load_err(format!(
                "unsupported format version {} (expected {INDEX_FORMAT_VERSION})",
                manifest.format_version
            )));
        }
        if manifest.dimensions != expected_dimensions {
            return Err(load_err(format!(
                "index was built with dimension {} but the embedding provider produces {expected_dimensions}",
                manifest.dimensions
            )));
        }
        if manifest.entry_count != entries.len() {
            return Err(load_err(format!(
                "manifest lists {} entries but {} were stored",
                manifest.entry_count,
                entries.len()
            )));
        }
        if entries.is_empty() {
            return Err(load_err("index holds no entries".to_string()));
        }
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != manifest.dimensions) {
            return Err(load_err(format!(
                "entry from '{}' has dimension {} (expected {})",
                bad.chunk.source_id,
                bad.vector.len(),
                manifest.dimensions
            )));
        }

        let index = Self::from_parts(manifest, entries);
        info!(
            path = %file_path.display(),
            build_id = %index.manifest.build_id,
            entries = index.len(),
            "loaded vector index"
        );
        Ok(index)
    }

    /// Return the `k` entries most similar to `query`, by descending cosine
    /// similarity. Ties keep insertion order.
    ///
    /// Returns fewer than `k` results when the index is smaller than `k`.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigurationError`] if `k == 0`.
    /// - [`RagError::EmptyIndexError`] if the index has no entries.
    /// - [`RagError::DimensionMismatch`] if `query` has the wrong dimension.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(RagError::ConfigurationError("k must be greater than zero".to_string()));
        }
        self.check_query(query)?;

        let hits: Vec<ScoredChunk> = self
            .rank(query)
            .into_iter()
            .take(k)
            .map(|(id, score)| self.scored(id, score))
            .collect();
        debug!(k, returned = hits.len(), "similarity search");
        Ok(hits)
    }

    /// Select `k` entries out of the `fetch_k` nearest by maximal marginal
    /// relevance.
    ///
    /// Each step picks the candidate maximising
    /// `lambda * sim(query, c) - (1 - lambda) * max(sim(c, s) for s in selected)`,
    /// so `lambda = 1` reduces to plain similarity ranking and smaller values
    /// favour results unlike those already chosen. Ties go to the candidate
    /// nearer the query. Scores in the result are query similarities.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigurationError`] if `k == 0`, `fetch_k < k`, or
    ///   `lambda` is outside `[0, 1]`.
    /// - [`RagError::EmptyIndexError`] if the index has no entries.
    /// - [`RagError::DimensionMismatch`] if `query` has the wrong dimension.
    pub fn diverse_search(
        &self,
        query: &[f32],
        k: usize,
        fetch_k: usize,
        lambda: f32,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(RagError::ConfigurationError("k must be greater than zero".to_string()));
        }
        validate_diverse(k, fetch_k, lambda)?;
        self.check_query(query)?;

        let mut remaining: Vec<(usize, f32)> = self.rank(query).into_iter().take(fetch_k).collect();
        let mut selected: Vec<(usize, f32)> = Vec::with_capacity(k.min(remaining.len()));

        while selected.len() < k && !remaining.is_empty() {
            let mut best_pos = 0;
            let mut best_value = f32::NEG_INFINITY;
            for (pos, &(id, relevance)) in remaining.iter().enumerate() {
                let redundancy = selected
                    .iter()
                    .map(|&(chosen, _)| self.pair_similarity(id, chosen))
                    .fold(None, |acc: Option<f32>, sim| Some(acc.map_or(sim, |m| m.max(sim))))
                    .unwrap_or(0.0);
                let value = lambda * relevance - (1.0 - lambda) * redundancy;
                if value > best_value {
                    best_value = value;
                    best_pos = pos;
                }
            }
            selected.push(remaining.remove(best_pos));
        }

        debug!(k, fetch_k, lambda, returned = selected.len(), "diverse search");
        Ok(selected.into_iter().map(|(id, score)| self.scored(id, score)).collect())
    }

    fn check_query(&self, query: &[f32]) -> Result<()> {
        if self.entries.is_empty() {
            return Err(RagError::EmptyIndexError);
        }
        if query.len() != self.dimensions() {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions(),
                actual: query.len(),
            });
        }
        Ok(())
    }

    /// Every entry id with its query similarity, best first, stable on ties.
    fn rank(&self, query: &[f32]) -> Vec<(usize, f32)> {
        let query_norm = l2_norm(query);
        let mut ranked: Vec<(usize, f32)> = self
            .entries
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(id, (entry, &norm))| (id, cosine(query, query_norm, &entry.vector, norm)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    fn pair_similarity(&self, a: usize, b: usize) -> f32 {
        cosine(&self.entries[a].vector, self.norms[a], &self.entries[b].vector, self.norms[b])
    }

    fn scored(&self, id: usize, score: f32) -> ScoredChunk {
        ScoredChunk { chunk: self.entries[id].chunk.clone(), score }
    }
}

fn check_dimensions(entries: &[EmbeddedChunk], dimensions: usize) -> Result<()> {
    match entries.iter().find(|e| e.vector.len() != dimensions) {
        Some(bad) => {
            Err(RagError::DimensionMismatch { expected: dimensions, actual: bad.vector.len() })
        }
        None => Ok(()),
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity given precomputed norms.
///
/// Returns 0.0 if either vector has zero magnitude or the result is not a number.
fn cosine(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_nan() { 0.0 } else { similarity }
}
