//! Per-variant orchestrator (normalizes the variant, queries the transcript
//! cache, classifies and formats against every overlapping transcript).

use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use crate::classify::{classify, Impact};
use crate::data::TranscriptCache;
use crate::hgvs::{format_c, format_p};
use crate::model::{Transcript, Variant};

/// Output record for one (variant, transcript) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub variant_id: String,
    pub allele: String,
    pub transcript_id: String,
    pub gene_id: String,
    pub gene_name: String,
    pub biotype: String,
    pub is_canonical: bool,
    pub consequence: String,
    pub impact: Impact,
    pub cds_pos: u64,
    pub protein_pos: u64,
    pub amino_acid_change: Option<String>,
    pub codon_change: Option<String>,
    pub hgvs_c: String,
    pub hgvs_p: String,
    pub exon_number: Option<String>,
    pub intron_number: Option<String>,
    /// Extra fields contributed by `ExternalAnnotationSource` implementations,
    /// keyed `{source}.{field}`.
    pub extra: IndexMap<String, String>,
}

fn strip_chr(chrom: &str) -> &str {
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

fn amino_acid_change(ref_aa: Option<u8>, alt_aa: Option<u8>) -> Option<String> {
    match (ref_aa, alt_aa) {
        (Some(r), Some(a)) => Some(format!("{}/{}", r as char, a as char)),
        (Some(r), None) => Some(format!("{}/-", r as char)),
        _ => None,
    }
}

/// Lowercases a codon triplet with the base at `mutated_pos` (0, 1 or 2)
/// left uppercase, e.g. `atG` for a third-position change.
fn codon_change(ref_codon: Option<[u8; 3]>, alt_codon: Option<[u8; 3]>) -> Option<String> {
    let (r, a) = (ref_codon?, alt_codon?);
    let mark = |codon: [u8; 3]| -> String {
        let mut s = String::with_capacity(3);
        for i in 0..3 {
            let c = codon[i] as char;
            if r[i] != a[i] {
                s.push(c.to_ascii_uppercase());
            } else {
                s.push(c.to_ascii_lowercase());
            }
        }
        s
    };
    Some(format!("{}/{}", mark(r), mark(a)))
}

fn annotate_one(variant: &Variant, transcript: &Arc<Transcript>) -> Annotation {
    let cr = classify(variant, transcript);
    let hgvs_c = format_c(variant, transcript, &cr);
    let hgvs_p = format_p(&cr);
    let exon_number = cr.exon_number.map(|(k, n)| format!("{k}/{n}"));
    let intron_number = cr.intron_number.map(|(k, n)| format!("{k}/{n}"));

    let mut consequence = cr.term.clone();
    if transcript.biotype == "nonsense_mediated_decay" {
        consequence.push_str(",NMD_transcript_variant");
    }

    Annotation {
        variant_id: variant.id(),
        allele: variant.alternative.clone(),
        transcript_id: transcript.id.clone(),
        gene_id: transcript.gene_id.clone(),
        gene_name: transcript.gene_name.clone(),
        biotype: transcript.biotype.clone(),
        is_canonical: transcript.is_canonical,
        impact: crate::classify::compound_impact(&consequence),
        consequence,
        cds_pos: cr.cds_pos,
        protein_pos: cr.protein_pos,
        amino_acid_change: amino_acid_change(cr.ref_aa, cr.alt_aa),
        codon_change: codon_change(cr.ref_codon, cr.alt_codon),
        hgvs_c,
        hgvs_p,
        exon_number,
        intron_number,
        extra: IndexMap::new(),
    }
}

fn intergenic_annotation(variant: &Variant) -> Annotation {
    Annotation {
        variant_id: variant.id(),
        allele: variant.alternative.clone(),
        transcript_id: String::new(),
        gene_id: String::new(),
        gene_name: String::new(),
        biotype: String::new(),
        is_canonical: false,
        consequence: "intergenic_variant".to_string(),
        impact: Impact::Modifier,
        cds_pos: 0,
        protein_pos: 0,
        amino_acid_change: None,
        codon_change: None,
        hgvs_c: String::new(),
        hgvs_p: String::new(),
        exon_number: None,
        intron_number: None,
        extra: IndexMap::new(),
    }
}

/// Annotates a single variant against every transcript overlapping its
/// position, falling back to a single intergenic annotation when none do.
pub fn annotate(
    variant: &Variant,
    cache: &dyn TranscriptCache,
    canonical_only: bool,
) -> Vec<Annotation> {
    let chrom = strip_chr(&variant.chrom);
    let overlapping = cache.overlapping(chrom, variant.pos);

    if overlapping.is_empty() {
        debug!("no transcripts overlap {}, emitting intergenic", variant.id());
        return vec![intergenic_annotation(variant)];
    }

    let filtered: Vec<&Arc<Transcript>> = if canonical_only {
        overlapping.iter().filter(|t| t.is_canonical).collect()
    } else {
        overlapping.iter().collect()
    };

    if filtered.is_empty() {
        return vec![intergenic_annotation(variant)];
    }

    filtered
        .into_iter()
        .map(|t| annotate_one(variant, t))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::cache::InMemoryCache;
    use crate::model::test_fixtures::*;
    use pretty_assertions::assert_eq;

    fn v(pos: i64, r: &str, a: &str) -> Variant {
        Variant {
            chrom: "1".into(),
            pos,
            reference: r.into(),
            alternative: a.into(),
        }
    }

    #[test]
    fn missense_variant_annotated_against_transcript() {
        let cache = InMemoryCache::new(vec![forward_transcript()]);
        let variant = v(108, "G", "C");
        let anns = annotate(&variant, &cache, false);
        assert_eq!(anns.len(), 1);
        assert_eq!(anns[0].transcript_id, "ENST_TEST_FWD");
        assert_eq!(anns[0].allele, "C");
    }

    #[test]
    fn no_overlap_yields_intergenic() {
        let cache = InMemoryCache::new(vec![forward_transcript()]);
        let variant = v(900, "A", "G");
        let anns = annotate(&variant, &cache, false);
        assert_eq!(anns.len(), 1);
        assert_eq!(anns[0].consequence, "intergenic_variant");
        assert_eq!(anns[0].impact, Impact::Modifier);
    }

    #[test]
    fn chr_prefix_normalized_before_lookup() {
        let cache = InMemoryCache::new(vec![forward_transcript()]);
        let mut variant = v(108, "G", "C");
        variant.chrom = "chr1".into();
        let anns = annotate(&variant, &cache, false);
        assert_eq!(anns[0].transcript_id, "ENST_TEST_FWD");
    }

    #[test]
    fn codon_change_marks_mutated_base() {
        let cc = codon_change(Some(*b"ATG"), Some(*b"ATA"));
        assert_eq!(cc, Some("atG/atA".to_string()));
    }
}
