//! In-memory [`crate::data::TranscriptCache`] implementation.

use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, warn};

use crate::data::error::Error;
use crate::data::TranscriptCache as TranscriptCacheTrait;
use crate::model::Transcript;

/// Transcripts sorted by genomic start per chromosome; `overlapping` binary
/// searches for the first exon that could still reach `pos` before
/// linearly scanning the remaining overlap window.
///
/// Grounded on the `Arc<dyn Provider + Send + Sync>` sharing pattern: once
/// built, a cache is wrapped in `Arc` and cloned into each pipeline worker
/// closure without copying the underlying transcripts.
pub struct InMemoryCache {
    by_chrom: AHashMap<String, Vec<Arc<Transcript>>>,
    by_gene_name: AHashMap<String, Vec<Arc<Transcript>>>,
    by_id: AHashMap<String, Arc<Transcript>>,
}

fn normalize_chrom(chrom: &str) -> &str {
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

impl InMemoryCache {
    pub fn new(transcripts: Vec<Transcript>) -> Self {
        let mut by_chrom: AHashMap<String, Vec<Arc<Transcript>>> = AHashMap::default();
        let mut by_gene_name: AHashMap<String, Vec<Arc<Transcript>>> = AHashMap::default();
        let mut by_id: AHashMap<String, Arc<Transcript>> = AHashMap::default();

        for t in transcripts {
            if t.cds_sequence.is_empty() && t.is_protein_coding() {
                warn!("transcript {} has no CDS sequence loaded", t.id);
            }
            let arc = Arc::new(t);
            by_chrom
                .entry(normalize_chrom(&arc.chrom).to_string())
                .or_default()
                .push(arc.clone());
            by_gene_name
                .entry(arc.gene_name.clone())
                .or_default()
                .push(arc.clone());
            by_id.insert(arc.id.clone(), arc);
        }

        for bucket in by_chrom.values_mut() {
            bucket.sort_by_key(|t| t.start);
        }

        debug!(
            "loaded transcript cache: {} chromosomes, {} transcripts",
            by_chrom.len(),
            by_id.len()
        );

        Self {
            by_chrom,
            by_gene_name,
            by_id,
        }
    }

    /// As [`InMemoryCache::by_gene_name`], but fails instead of returning
    /// an empty result when the gene is unknown to this cache.
    pub fn require_gene(&self, gene_name: &str) -> Result<Vec<Arc<Transcript>>, Error> {
        match self.by_gene_name.get(gene_name) {
            Some(hits) if !hits.is_empty() => Ok(hits.clone()),
            _ => Err(Error::NoGeneFound(gene_name.to_string())),
        }
    }

    /// As [`InMemoryCache::by_transcript_id`], but fails instead of
    /// returning `None` when the transcript is unknown to this cache.
    pub fn require_transcript(&self, id: &str) -> Result<Arc<Transcript>, Error> {
        self.by_id
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NoTranscriptFound(id.to_string()))
    }
}

impl TranscriptCacheTrait for InMemoryCache {
    fn overlapping(&self, chrom: &str, pos: i64) -> Vec<Arc<Transcript>> {
        let chrom = normalize_chrom(chrom);
        match self.by_chrom.get(chrom) {
            Some(bucket) => {
                // Transcripts earlier than the partition point start strictly
                // before `pos` and could still overlap it (their end is
                // unknown at this point); a transcript cannot overlap `pos`
                // once its own start is past it, so that's where the
                // overlap window ends.
                let window_end = bucket.partition_point(|t| t.start <= pos);
                bucket[..window_end]
                    .iter()
                    .filter(|t| t.contains(pos))
                    .cloned()
                    .collect()
            }
            None => {
                debug!("no transcripts on chromosome {chrom}");
                Vec::new()
            }
        }
    }

    fn by_gene_name(&self, gene_name: &str) -> Vec<Arc<Transcript>> {
        self.by_gene_name.get(gene_name).cloned().unwrap_or_default()
    }

    fn by_transcript_id(&self, id: &str) -> Option<Arc<Transcript>> {
        self.by_id.get(id).cloned()
    }
}
