//! Transcript model and strand-aware coordinate mapping between genomic,
//! transcript-relative, CDS and codon/protein positions.

use serde::{Deserialize, Serialize};

/// Strand of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn is_reverse(self) -> bool {
        matches!(self, Strand::Reverse)
    }
}

/// A single exon in genomic coordinates, 1-based inclusive.
///
/// `cds_start == cds_end == 0` marks a non-coding exon (entirely UTR, or
/// the transcript has no CDS at all).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exon {
    pub number: u32,
    pub start: i64,
    pub end: i64,
    pub cds_start: i64,
    pub cds_end: i64,
    pub frame: u8,
}

impl Exon {
    pub fn has_cds(&self) -> bool {
        self.cds_start != 0 || self.cds_end != 0
    }
}

/// One genomic variant locus, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub chrom: String,
    pub pos: i64,
    pub reference: String,
    pub alternative: String,
}

impl Variant {
    pub fn ref_len(&self) -> i64 {
        self.reference.len() as i64
    }

    pub fn alt_len(&self) -> i64 {
        self.alternative.len() as i64
    }

    pub fn is_snv(&self) -> bool {
        self.reference.len() == 1 && self.alternative.len() == 1
    }

    pub fn is_mnv(&self) -> bool {
        self.reference.len() > 1 && self.reference.len() == self.alternative.len()
    }

    pub fn is_insertion(&self) -> bool {
        self.alternative.len() > self.reference.len()
    }

    pub fn is_deletion(&self) -> bool {
        self.reference.len() > self.alternative.len()
    }

    pub fn is_indel(&self) -> bool {
        self.reference.len() != self.alternative.len()
    }

    /// Last genomic position covered by the reference allele.
    pub fn ref_end(&self) -> i64 {
        self.pos + self.ref_len() - 1
    }

    /// A stable display id, `{chrom}_{pos}_{ref}/{alt}`.
    pub fn id(&self) -> String {
        format!(
            "{}_{}_{}/{}",
            self.chrom, self.pos, self.reference, self.alternative
        )
    }
}

/// A transcript and its exon/CDS structure.
///
/// Invariants: exons are stored in genomic ascending order regardless of
/// strand; `cds_start <= cds_end` in genomic coordinates; `cds_sequence`'s
/// length is a multiple of 3 (including the stop codon) for a well-formed
/// coding transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub gene_id: String,
    pub gene_name: String,
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub biotype: String,
    pub is_canonical: bool,
    pub cds_start: i64,
    pub cds_end: i64,
    pub exons: Vec<Exon>,
    pub cds_sequence: Vec<u8>,
    pub utr3_sequence: Option<Vec<u8>>,
}

/// Classification of a splice site relative to transcript orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceSite {
    Donor,
    Acceptor,
}

impl Transcript {
    pub fn is_protein_coding(&self) -> bool {
        self.cds_start != 0 && self.cds_end != 0 && !self.cds_sequence.is_empty()
    }

    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.start && pos <= self.end
    }

    pub fn is_upstream(&self, pos: i64) -> bool {
        match self.strand {
            Strand::Forward => pos < self.start,
            Strand::Reverse => pos > self.end,
        }
    }

    pub fn is_downstream(&self, pos: i64) -> bool {
        match self.strand {
            Strand::Forward => pos > self.end,
            Strand::Reverse => pos < self.start,
        }
    }

    pub fn find_exon(&self, pos: i64) -> Option<&Exon> {
        self.exons.iter().find(|e| pos >= e.start && pos <= e.end)
    }

    /// Which intron (if any) contains `pos`, as `(ordinal, total_introns)`
    /// in transcript 5' -> 3' order.
    pub fn intron_containing(&self, pos: i64) -> Option<(u32, u32)> {
        let ordered: Vec<&Exon> = self.exons_in_transcript_order().collect();
        if ordered.len() < 2 {
            return None;
        }
        let total = (ordered.len() - 1) as u32;
        for (i, pair) in ordered.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            let (lo_exon, hi_exon) = if a.end < b.start { (a, b) } else { (b, a) };
            if pos > lo_exon.end && pos < hi_exon.start {
                return Some((i as u32 + 1, total));
            }
        }
        None
    }

    /// Exon iterator in transcript 5' -> 3' order.
    fn exons_in_transcript_order(&self) -> Box<dyn Iterator<Item = &Exon> + '_> {
        match self.strand {
            Strand::Forward => Box::new(self.exons.iter()),
            Strand::Reverse => Box::new(self.exons.iter().rev()),
        }
    }

    /// Maps a genomic position to its 1-based CDS position, or 0 if `pos`
    /// is not within a coding exon.
    pub fn genomic_to_cds(&self, pos: i64) -> u64 {
        let mut offset: i64 = 0;
        for exon in self.exons_in_transcript_order() {
            if !exon.has_cds() {
                continue;
            }
            if pos >= exon.cds_start && pos <= exon.cds_end {
                let local = match self.strand {
                    Strand::Forward => pos - exon.cds_start,
                    Strand::Reverse => exon.cds_end - pos,
                };
                return (offset + local + 1) as u64;
            }
            offset += exon.cds_end - exon.cds_start + 1;
        }
        0
    }

    /// Inverse of [`Transcript::genomic_to_cds`]: maps a 1-based CDS
    /// position back to its genomic position.
    pub fn cds_to_genomic(&self, cds_pos: u64) -> Option<i64> {
        if cds_pos == 0 {
            return None;
        }
        let mut offset: i64 = 0;
        let target = cds_pos as i64 - 1;
        for exon in self.exons_in_transcript_order() {
            if !exon.has_cds() {
                continue;
            }
            let len = exon.cds_end - exon.cds_start + 1;
            if target >= offset && target < offset + len {
                let local = target - offset;
                return Some(match self.strand {
                    Strand::Forward => exon.cds_start + local,
                    Strand::Reverse => exon.cds_end - local,
                });
            }
            offset += len;
        }
        None
    }

    /// Maps a genomic position to its 1-based transcript-relative position
    /// (over all exons, coding or not).
    pub fn genomic_to_transcript_pos(&self, pos: i64) -> Option<i64> {
        let mut offset: i64 = 0;
        for exon in self.exons_in_transcript_order() {
            if pos >= exon.start && pos <= exon.end {
                let local = match self.strand {
                    Strand::Forward => pos - exon.start,
                    Strand::Reverse => exon.end - pos,
                };
                return Some(offset + local + 1);
            }
            offset += exon.end - exon.start + 1;
        }
        None
    }

    /// Point classification of a single genomic position as a splice
    /// donor/acceptor site (the two intronic bases immediately flanking an
    /// exon boundary).
    pub fn splice_site_at(&self, pos: i64) -> Option<SpliceSite> {
        for exon in &self.exons {
            if pos == exon.end + 1 || pos == exon.end + 2 {
                return Some(match self.strand {
                    Strand::Forward => SpliceSite::Donor,
                    Strand::Reverse => SpliceSite::Acceptor,
                });
            }
            if pos == exon.start - 1 || pos == exon.start - 2 {
                return Some(match self.strand {
                    Strand::Forward => SpliceSite::Acceptor,
                    Strand::Reverse => SpliceSite::Donor,
                });
            }
        }
        None
    }

    /// SO:0001630 splice region: within 3bp on the exon side of a boundary,
    /// or 3-8bp on the intron side (excluding the donor/acceptor bases).
    pub fn splice_region_at(&self, pos: i64) -> bool {
        for exon in &self.exons {
            if pos <= exon.end && pos > exon.end - 3 {
                return true;
            }
            if pos >= exon.start && pos < exon.start + 3 {
                return true;
            }
            let after_end = pos - exon.end;
            if (3..=8).contains(&after_end) {
                return true;
            }
            let before_start = exon.start - pos;
            if (3..=8).contains(&before_start) {
                return true;
            }
        }
        false
    }

    /// First splice site hit by any position in an indel's reference span
    /// `[pos, pos + ref_len - 1]`.
    pub fn indel_splice_overlap(&self, pos: i64, ref_len: i64) -> Option<SpliceSite> {
        (pos..pos + ref_len.max(1)).find_map(|p| self.splice_site_at(p))
    }

    /// Whether any position in `[pos, pos + ref_len - 1]` is within a
    /// splice region.
    pub fn indel_splice_region_overlap(&self, pos: i64, ref_len: i64) -> bool {
        (pos..pos + ref_len.max(1)).any(|p| self.splice_region_at(p))
    }

    /// Genomic span of the start codon (first 3 CDS bases), as
    /// `(low, high)` regardless of strand.
    pub fn start_codon_span(&self) -> Option<(i64, i64)> {
        let g1 = self.cds_to_genomic(1)?;
        let g3 = self.cds_to_genomic(3)?;
        Some((g1.min(g3), g1.max(g3)))
    }

    /// Genomic span of the final 3 CDS bases (the stop codon).
    pub fn stop_codon_span(&self) -> Option<(i64, i64)> {
        let n = self.cds_sequence.len() as u64;
        if n < 3 {
            return None;
        }
        let g1 = self.cds_to_genomic(n - 2)?;
        let g3 = self.cds_to_genomic(n)?;
        Some((g1.min(g3), g1.max(g3)))
    }

    /// Finds the flanking exonic boundary base nearest an intronic
    /// position, and the signed distance to it.
    ///
    /// Returns `(boundary_genomic_pos, distance, sign_positive)`. A
    /// positive sign always means "downstream in transcript order", per
    /// HGVS intronic offset convention (`+` counts forward from the last
    /// base of the preceding exon, `-` counts backward from the first base
    /// of the following exon).
    pub fn nearest_exon_boundary(&self, pos: i64) -> Option<(i64, i64, bool)> {
        let is_reverse = self.strand.is_reverse();
        let mut best: Option<(i64, i64, bool)> = None;
        let mut consider = |boundary: i64, is_exon_end: bool| {
            let dist = (pos - boundary).abs();
            let sign_positive = is_exon_end ^ is_reverse;
            if best.map(|(_, d, _)| dist < d).unwrap_or(true) {
                best = Some((boundary, dist, sign_positive));
            }
        };
        for exon in &self.exons {
            if pos > exon.end {
                consider(exon.end, true);
            }
            if pos < exon.start {
                consider(exon.start, false);
            }
        }
        best
    }
}

/// `codon_number = (cds_pos-1)/3 + 1`, `pos_in_codon = (cds_pos-1) % 3`.
pub fn cds_to_codon(cds_pos: u64) -> (u64, u64) {
    (((cds_pos - 1) / 3) + 1, (cds_pos - 1) % 3)
}
