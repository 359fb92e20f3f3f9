//! Genomic variant-effect prediction: classify a variant against a
//! transcript's exon/CDS structure into a Sequence Ontology consequence
//! term and render HGVS `c.`/`p.` strings.

pub mod annotate;
pub mod classify;
pub mod data;
pub mod hgvs;
pub mod model;
pub mod pipeline;
pub mod sequences;
