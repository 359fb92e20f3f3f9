//! Gene-model loading, variant I/O, and the output writer.
//!
//! `TranscriptCache`, `VariantReader` and `AnnotationWriter` are the
//! interfaces the rest of the crate is built against; `cdot` is the
//! reference gene-model loader and `cache`/`variant_io`/`writer` are the
//! reference implementations of those interfaces.

pub mod cache;
pub mod cdot;
pub mod error;
pub mod variant_io;
pub mod writer;

pub use error::Error;

use std::sync::Arc;

use crate::model::{Transcript, Variant};

/// Read-only lookup of transcripts overlapping a genomic position, plus
/// auxiliary lookup by gene name and by transcript id.
///
/// Implementations must be safe to share across worker threads via `Arc`.
pub trait TranscriptCache: Send + Sync {
    /// Transcripts whose span contains `(chrom, pos)`. `chrom` is assumed
    /// already normalized (no `chr` prefix).
    fn overlapping(&self, chrom: &str, pos: i64) -> Vec<Arc<Transcript>>;

    /// All transcripts of a gene, by gene symbol.
    fn by_gene_name(&self, gene_name: &str) -> Vec<Arc<Transcript>>;

    /// A single transcript by its identifier.
    fn by_transcript_id(&self, id: &str) -> Option<Arc<Transcript>>;
}

/// A pull-style source of already-split (no multi-allelic records)
/// variants.
pub trait VariantReader {
    /// Returns the next variant, or `None` at end of stream.
    fn next_variant(&mut self) -> Result<Option<Variant>, Error>;
}

/// Sink for annotated variants.
pub trait AnnotationWriter {
    fn write_header(&mut self) -> Result<(), Error>;
    fn write(&mut self, variant: &Variant, annotations: &[crate::annotate::Annotation]) -> Result<(), Error>;
    fn flush(&mut self) -> Result<(), Error>;
}

/// A plugged-in source of additional per-variant annotation, layered on
/// top of the core classifier output.
pub trait ExternalAnnotationSource: Send + Sync {
    /// Short machine-readable name, used to namespace attached fields.
    fn name(&self) -> &str;
    /// Version string of the backing data/source.
    fn version(&self) -> &str;
    /// Column name/description pairs this source contributes.
    fn columns(&self) -> Vec<(String, String)>;
    /// Attach extra key-value fields to `annotations`, namespaced under
    /// `{name()}.{field}`.
    fn annotate(&self, variant: &Variant, annotations: &mut [crate::annotate::Annotation]);
}
