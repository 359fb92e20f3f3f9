//! Protein (`p.`) HGVS formatting.

use crate::classify::ConsequenceResult;
use crate::sequences::aa1_to_aa3;

fn aa3(aa: Option<u8>) -> String {
    aa.and_then(|a| aa1_to_aa3(a).ok())
        .unwrap_or("Xaa")
        .to_string()
}

fn inserted_aa3(aas: &[u8]) -> String {
    aas.iter()
        .map(|&a| aa1_to_aa3(a).unwrap_or("Xaa"))
        .collect::<Vec<_>>()
        .join("")
}

/// Formats the `p.` string from a classifier result. Empty for
/// non-coding, intronic or intergenic consequences.
pub fn format_p(cr: &ConsequenceResult) -> String {
    let primary = cr.term.split(',').next().unwrap_or("");
    match primary {
        "missense_variant" => format!(
            "p.{}{}{}",
            aa3(cr.ref_aa),
            cr.protein_pos,
            aa3(cr.alt_aa)
        ),
        "synonymous_variant" => format!("p.{}{}=", aa3(cr.ref_aa), cr.protein_pos),
        "stop_gained" => format!("p.{}{}Ter", aa3(cr.ref_aa), cr.protein_pos),
        "stop_lost" => {
            let ext = if cr.stop_lost_ext == 0 {
                "?".to_string()
            } else {
                cr.stop_lost_ext.to_string()
            };
            format!(
                "p.Ter{}{}ext*{}",
                cr.protein_pos,
                aa3(cr.alt_aa),
                ext
            )
        }
        "start_lost" => "p.Met1?".to_string(),
        "stop_retained_variant" => format!("p.Ter{}=", cr.protein_pos),
        "frameshift_variant" | "frameshift_variant,stop_lost" => match cr.alt_aa {
            Some(alt) if cr.fs_stop_dist == 0 => {
                format!("p.{}{}{}fs", aa3(cr.ref_aa), cr.protein_pos, aa1_alpha(alt))
            }
            Some(alt) => format!(
                "p.{}{}{}fsTer{}",
                aa3(cr.ref_aa),
                cr.protein_pos,
                aa1_alpha(alt),
                cr.fs_stop_dist
            ),
            None => format!("p.{}fs", cr.protein_pos),
        },
        "inframe_deletion" => {
            if cr.protein_end_pos == 0 || cr.protein_end_pos == cr.protein_pos {
                format!("p.{}{}del", aa3(cr.ref_aa), cr.protein_pos)
            } else {
                format!(
                    "p.{}{}_{}{}del",
                    aa3(cr.ref_aa),
                    cr.protein_pos,
                    aa3(cr.end_aa),
                    cr.protein_end_pos
                )
            }
        }
        "inframe_insertion" => {
            let ins = cr.inserted_aa.as_deref().unwrap_or(&[]);
            if cr.is_duplication {
                if ins.len() <= 1 {
                    format!("p.{}{}dup", aa3(cr.ref_aa), cr.protein_pos)
                } else {
                    let start = cr.protein_pos.saturating_sub(ins.len() as u64 - 1);
                    format!("p.{}{}_{}{}dup", aa3(cr.ref_aa), start, aa3(cr.ref_aa), cr.protein_pos)
                }
            } else {
                format!(
                    "p.{}{}_{}ins{}",
                    aa3(cr.ref_aa),
                    cr.protein_pos,
                    cr.protein_pos + 1,
                    inserted_aa3(ins)
                )
            }
        }
        "splice_donor_variant" | "splice_acceptor_variant" => {
            format!("p.X{}_splice", cr.protein_pos)
        }
        _ => String::new(),
    }
}

/// Renders the three-letter form used inline within `fsTer` strings,
/// falling back to the one-letter code wrapped as-is if unknown.
fn aa1_alpha(aa: u8) -> String {
    aa1_to_aa3(aa).unwrap_or("Xaa").to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::classify::classify;
    use crate::hgvs::format_p;
    use crate::model::test_fixtures::*;
    use crate::model::Variant;
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
    fn missense_renders_three_letter() {
        let t = forward_transcript();
        let variant = v(108, "G", "C");
        let cr = classify(&variant, &t);
        let p = format_p(&cr);
        if cr.term == "missense_variant" {
            assert!(p.starts_with("p."));
            assert!(!p.contains('X') || p.contains("Xaa"));
        }
    }

    #[test]
    fn start_lost_fixed_string() {
        let t = forward_transcript();
        let variant = v(105, "A", "T");
        let cr = classify(&variant, &t);
        assert_eq!(format_p(&cr), "p.Met1?");
    }

    #[test]
    fn start_lost_snapshot() {
        let t = forward_transcript();
        let variant = v(105, "A", "T");
        let cr = classify(&variant, &t);
        insta::assert_snapshot!(format_p(&cr), @"p.Met1?");
    }

    #[test]
    fn frameshift_has_fs_marker() {
        let t = forward_transcript();
        let variant = v(107, "G", "GA");
        let cr = classify(&variant, &t);
        let p = format_p(&cr);
        assert!(p.contains("fs"));
    }
}
