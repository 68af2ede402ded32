//! BM25 scoring over per-field statistics
//!
//! For each query term t matched in field f:
//!
//! ```text
//! score += IDF(t) * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * dl/avgdl))
//! IDF(t) = ln((N - df + 0.5) / (df + 0.5) + 1)
//! ```
//!
//! where `N` is the number of documents in the index, `df` the number of
//! documents whose field `f` contains `t`, `dl` the token length of `f` in the
//! scored document and `avgdl` its average over documents having `f`.

use rustc_hash::FxHashMap;

// ============================================================================
// FieldStats
// ============================================================================

/// Corpus statistics of one text field
#[derive(Debug, Clone, Default)]
pub struct FieldStats {
    doc_count: usize,
    total_len: u64,
    doc_freqs: FxHashMap<String, usize>,
}

impl FieldStats {
    /// Account for one document's terms in this field
    pub fn add_document(&mut self, term_freqs: &FxHashMap<String, u32>, len: u32) {
        self.doc_count += 1;
        self.total_len += len as u64;
        for term in term_freqs.keys() {
            *self.doc_freqs.entry(term.clone()).or_insert(0) += 1;
        }
    }

    /// Number of documents with at least one token in this field
    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    /// Number of documents containing `term` in this field
    pub fn doc_freq(&self, term: &str) -> usize {
        self.doc_freqs.get(term).copied().unwrap_or(0)
    }

    /// Average token length, at least 1
    pub fn avg_len(&self) -> f32 {
        if self.doc_count == 0 {
            1.0
        } else {
            (self.total_len as f32 / self.doc_count as f32).max(1.0)
        }
    }

    /// Smoothed inverse document frequency
    pub fn idf(&self, term: &str, total_docs: usize) -> f32 {
        let df = self.doc_freq(term) as f32;
        let n = total_docs.max(self.doc_count) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }
}

// ============================================================================
// Bm25
// ============================================================================

/// BM25 parameters
#[derive(Debug, Clone, Copy)]
pub struct Bm25 {
    /// Term frequency saturation (default 1.2)
    pub k1: f32,
    /// Length normalization (default 0.75)
    pub b: f32,
}

impl Default for Bm25 {
    fn default() -> Self {
        Bm25 { k1: 1.2, b: 0.75 }
    }
}

impl Bm25 {
    /// Create a scorer with custom parameters
    pub fn new(k1: f32, b: f32) -> Self {
        Bm25 { k1, b }
    }

    /// Contribution of one term occurring `tf` times in a field of `doc_len` tokens
    pub fn term_score(&self, tf: u32, doc_len: u32, idf: f32, avg_len: f32) -> f32 {
        if tf == 0 {
            return 0.0;
        }
        let tf = tf as f32;
        let norm = 1.0 - self.b + self.b * doc_len as f32 / avg_len.max(1.0);
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm)
    }
}
