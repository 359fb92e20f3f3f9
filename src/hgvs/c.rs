//! Coding-DNA (`c.`) HGVS formatting.

use crate::classify::ConsequenceResult;
use crate::model::{Strand, Transcript, Variant};
use crate::sequences::{revcomp, trim_common_suffix};

use super::{shift_deletion_three_prime, shift_insertion_three_prime, HgvsConfig};

fn is_reverse(t: &Transcript) -> bool {
    matches!(t.strand, Strand::Reverse)
}

fn coding_strand_bytes(bytes: &[u8], reverse: bool) -> Vec<u8> {
    if reverse {
        revcomp(bytes)
    } else {
        bytes.to_vec()
    }
}

fn utr5_distance(transcript: &Transcript, pos: i64) -> Option<i64> {
    let cds_start_genomic = transcript.cds_to_genomic(1)?;
    let p1 = transcript.genomic_to_transcript_pos(pos)?;
    let p2 = transcript.genomic_to_transcript_pos(cds_start_genomic)?;
    Some(p2 - p1)
}

fn utr3_distance(transcript: &Transcript, pos: i64) -> Option<i64> {
    let cds_end_genomic = transcript.cds_to_genomic(transcript.cds_sequence.len() as u64)?;
    let p1 = transcript.genomic_to_transcript_pos(pos)?;
    let p2 = transcript.genomic_to_transcript_pos(cds_end_genomic)?;
    Some(p1 - p2)
}

/// Renders the `c.` position string for a single genomic position: a bare
/// CDS number, a `-N`/`*N` UTR offset, or an intronic `{boundary}±{n}`.
pub fn position_string(transcript: &Transcript, pos: i64) -> String {
    let cds_pos = transcript.genomic_to_cds(pos);
    if cds_pos > 0 {
        return cds_pos.to_string();
    }
    if transcript.find_exon(pos).is_some() {
        let five_prime = match transcript.strand {
            Strand::Forward => pos < transcript.cds_start,
            Strand::Reverse => pos > transcript.cds_end,
        };
        return if five_prime {
            format!("-{}", utr5_distance(transcript, pos).unwrap_or(0))
        } else {
            format!("*{}", utr3_distance(transcript, pos).unwrap_or(0))
        };
    }
    match transcript.nearest_exon_boundary(pos) {
        Some((boundary, dist, sign_positive)) => {
            let boundary_str = position_string(transcript, boundary);
            let sign = if sign_positive { "+" } else { "-" };
            format!("{}{}{}", boundary_str, sign, dist)
        }
        None => "?".to_string(),
    }
}

/// Formats the `c.` string for `variant` against `transcript`, given the
/// classifier's output, using the default configuration. Returns an empty
/// string for non-coding transcripts and for variants entirely outside the
/// transcript.
pub fn format_c(variant: &Variant, transcript: &Transcript, cr: &ConsequenceResult) -> String {
    format_c_with_config(variant, transcript, cr, &HgvsConfig::default())
}

/// Formats the `c.` string for `variant` against `transcript`, as
/// [`format_c`], but honoring `config`'s feature toggles.
pub fn format_c_with_config(
    variant: &Variant,
    transcript: &Transcript,
    cr: &ConsequenceResult,
    config: &HgvsConfig,
) -> String {
    if !transcript.is_protein_coding() {
        return String::new();
    }
    if matches!(
        cr.term.as_str(),
        "upstream_gene_variant" | "downstream_gene_variant"
    ) {
        return String::new();
    }

    let reverse = is_reverse(transcript);

    if variant.is_snv() {
        let pos = position_string(transcript, variant.pos);
        let coding_ref = coding_strand_bytes(variant.reference.as_bytes(), reverse);
        let coding_alt = coding_strand_bytes(variant.alternative.as_bytes(), reverse);
        return format!(
            "c.{}{}>{}",
            pos, coding_ref[0] as char, coding_alt[0] as char
        );
    }

    if variant.is_mnv() {
        let lo = variant.pos;
        let hi = variant.ref_end();
        let (a, b) = transcript_order_bounds(transcript, lo, hi);
        let coding_alt = coding_strand_bytes(variant.alternative.as_bytes(), reverse);
        return format!(
            "c.{}_{}delins{}",
            a,
            b,
            String::from_utf8_lossy(&coding_alt)
        );
    }

    if variant.is_deletion() {
        return format_deletion(variant, transcript, config);
    }

    format_insertion(variant, transcript, config)
}

fn transcript_order_bounds(transcript: &Transcript, genomic_lo: i64, genomic_hi: i64) -> (String, String) {
    let lo_str = position_string(transcript, genomic_lo);
    let hi_str = position_string(transcript, genomic_hi);
    if is_reverse(transcript) {
        (hi_str, lo_str)
    } else {
        (lo_str, hi_str)
    }
}

fn format_deletion(variant: &Variant, transcript: &Transcript, config: &HgvsConfig) -> String {
    let ref_bytes = variant.reference.as_bytes();
    let alt_bytes = variant.alternative.as_bytes();
    let ref_rest = &ref_bytes[1..];
    let alt_rest = if alt_bytes.len() > 1 { &alt_bytes[1..] } else { &[][..] };

    let (_clip, ref_clipped, alt_clipped) = trim_common_suffix(ref_rest, alt_rest);
    let deleted_len = ref_clipped.len().max(1);

    let g_lo = variant.pos + 1;
    let g_hi = variant.pos + deleted_len as i64;

    let cds_lo = transcript.genomic_to_cds(g_lo);
    let cds_hi = transcript.genomic_to_cds(g_hi);

    if cds_lo == 0 || cds_hi == 0 {
        // deletion reaches outside the CDS; report unshifted, best effort
        let (a, b) = transcript_order_bounds(transcript, g_lo, g_hi);
        return if a == b {
            format!("c.{}del", a)
        } else {
            format!("c.{}_{}del", a, b)
        };
    }

    let start0 = cds_lo.min(cds_hi) as usize - 1;
    let end0 = cds_lo.max(cds_hi) as usize - 1;
    let (start0, end0) = if config.three_prime_shift {
        shift_deletion_three_prime(start0, end0, &transcript.cds_sequence)
    } else {
        (start0, end0)
    };

    let start = start0 + 1;
    let end = end0 + 1;

    let extra_alt = coding_strand_bytes(&alt_clipped, is_reverse(transcript));

    if extra_alt.is_empty() {
        if start == end {
            format!("c.{}del", start)
        } else {
            format!("c.{}_{}del", start, end)
        }
    } else {
        format!(
            "c.{}_{}delins{}",
            start,
            end,
            String::from_utf8_lossy(&extra_alt)
        )
    }
}

fn format_insertion(variant: &Variant, transcript: &Transcript, config: &HgvsConfig) -> String {
    let reverse = is_reverse(transcript);
    let alt_bytes = variant.alternative.as_bytes();
    let inserted_genomic = &alt_bytes[1..];
    let ins_coding = coding_strand_bytes(inserted_genomic, reverse);

    let anchor_cds = transcript.genomic_to_cds(variant.pos);
    if anchor_cds == 0 {
        return String::new();
    }

    let anchor0 = if reverse {
        (anchor_cds as i64 - 2).max(0) as usize
    } else {
        anchor_cds as usize - 1
    };

    let (ins, anchor0) = if config.three_prime_shift {
        shift_insertion_three_prime(ins_coding, anchor0, &transcript.cds_sequence)
    } else {
        (ins_coding, anchor0)
    };
    let len_ins = ins.len();
    let cds = &transcript.cds_sequence;

    if anchor0 + 1 >= len_ins && cds[anchor0 + 1 - len_ins..anchor0 + 1] == ins[..] {
        let start = anchor0 + 1 - len_ins + 1;
        let end = anchor0 + 1;
        return if start == end {
            format!("c.{}dup", start)
        } else {
            format!("c.{}_{}dup", start, end)
        };
    }
    if anchor0 + 1 + len_ins <= cds.len() && cds[anchor0 + 1..anchor0 + 1 + len_ins] == ins[..] {
        let start = anchor0 + 2;
        let end = start + len_ins - 1;
        return if start == end {
            format!("c.{}dup", start)
        } else {
            format!("c.{}_{}dup", start, end)
        };
    }

    format!(
        "c.{}_{}ins{}",
        anchor0 + 1,
        anchor0 + 2,
        String::from_utf8_lossy(&ins)
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::classify::classify;
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
    fn snv_c_notation() {
        let t = forward_transcript();
        let variant = v(108, "G", "C");
        let cr = classify(&variant, &t);
        let hgvs = format_c(&variant, &t, &cr);
        assert!(hgvs.starts_with("c.4"));
        assert!(hgvs.contains('>'));
    }

    #[test]
    fn snv_c_notation_snapshot() {
        let t = forward_transcript();
        let variant = v(108, "G", "C");
        let cr = classify(&variant, &t);
        insta::assert_snapshot!(format_c(&variant, &t, &cr), @"c.4G>C");
    }

    #[test]
    fn upstream_variant_has_no_c_string() {
        let t = forward_transcript();
        let variant = v(10, "A", "G");
        let cr = classify(&variant, &t);
        assert_eq!(format_c(&variant, &t, &cr), "");
    }

    #[test]
    fn deletion_produces_del_string() {
        let t = forward_transcript();
        let variant = v(107, "GACG", "G");
        let cr = classify(&variant, &t);
        let hgvs = format_c(&variant, &t, &cr);
        assert!(hgvs.contains("del"));
    }

    #[test]
    fn three_prime_shift_can_be_disabled() {
        let mut t = forward_transcript();
        t.cds_sequence[6..10].copy_from_slice(b"AAAA");
        let variant = v(111, "A", "AA");
        let cr = classify(&variant, &t);
        let shifted = format_c(&variant, &t, &cr);
        let unshifted = format_c_with_config(
            &variant,
            &t,
            &cr,
            &crate::hgvs::HgvsConfig {
                three_prime_shift: false,
            },
        );
        assert_ne!(shifted, unshifted);
    }

    #[test]
    fn insertion_duplication_detected() {
        let mut t = forward_transcript();
        // craft a CDS with a clean run to test duplication: ...AAAA...
        t.cds_sequence[6..10].copy_from_slice(b"AAAA");
        let variant = v(111, "A", "AA");
        let cr = classify(&variant, &t);
        let hgvs = format_c(&variant, &t, &cr);
        assert!(hgvs.contains("dup") || hgvs.contains("ins"));
    }
}
