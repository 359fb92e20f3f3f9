//! Loading of `cdot`-shaped gene model JSON into [`crate::model::Transcript`].
//!
//! https://github.com/SACGF/cdot
//!
//! Only the fields this engine needs are modeled; the rest of a cdot
//! document is ignored by `serde`'s default field handling.

use std::io::Read as _;
use std::path::Path;

use bio::io::fasta;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::data::error::Error;
use crate::model::{Exon as ModelExon, Strand, Transcript};
use crate::sequences::revcomp;

/// Top-level container of a cdot document.
#[derive(Deserialize, Debug)]
pub struct Container {
    pub transcripts: IndexMap<String, CdotTranscript>,
    #[serde(default)]
    pub genes: IndexMap<String, CdotGene>,
}

#[derive(Deserialize, Debug)]
pub struct CdotGene {
    #[serde(default)]
    pub gene_symbol: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CdotTranscript {
    pub id: String,
    #[serde(default)]
    pub gene_version: String,
    #[serde(default)]
    pub gene_name: Option<String>,
    #[serde(default)]
    pub biotype: Option<Vec<String>>,
    #[serde(default)]
    pub tag: Option<String>,
    pub genome_builds: IndexMap<String, CdotAlignment>,
}

#[derive(Deserialize, Debug)]
pub struct CdotAlignment {
    pub contig: String,
    pub strand: CdotStrand,
    #[serde(default)]
    pub cds_start: Option<i64>,
    #[serde(default)]
    pub cds_end: Option<i64>,
    pub exons: Vec<CdotExon>,
}

#[derive(Deserialize, Debug)]
pub enum CdotStrand {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

/// `[alt_start_i, alt_end_i, alt_exon_id, alt_cds_start_i, alt_cds_end_i]`,
/// 0-based half-open on the reference, as emitted by cdot.
#[derive(Deserialize, Debug)]
pub struct CdotExon(pub i64, pub i64, pub i64, pub i64, pub i64);

/// Loads a gene model from `path`, transparently gzip-decompressing when
/// the file name ends in `.gz`. When `fasta_path` is given, a matching
/// `.fai`-indexed FASTA is used to splice `cds_sequence`/`utr3_sequence`
/// onto every coding transcript; without it, transcripts come back with no
/// sequence data and are treated as non-coding by [`Transcript::is_protein_coding`].
pub fn load_transcripts(
    path: &Path,
    genome_build: &str,
    fasta_path: Option<&Path>,
) -> Result<Vec<Transcript>, Error> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::GeneModelOpen(format!("{}: {e}", path.display())))?;
    let mut reader = std::io::BufReader::new(file);

    let mut text = String::new();
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        flate2::read::GzDecoder::new(reader)
            .read_to_string(&mut text)
            .map_err(|e| Error::GeneModelOpen(format!("{}: {e}", path.display())))?;
    } else {
        reader
            .read_to_string(&mut text)
            .map_err(|e| Error::GeneModelOpen(format!("{}: {e}", path.display())))?;
    }

    let mut transcripts = parse_transcripts(&text, genome_build)?;
    if let Some(fasta_path) = fasta_path {
        fetch_sequences(&mut transcripts, fasta_path)?;
    }
    Ok(transcripts)
}

/// Splices `cds_sequence` and `utr3_sequence` onto every coding transcript
/// in `transcripts` from an indexed reference FASTA.
///
/// For each transcript with a CDS, coding exon spans are fetched in
/// genomic-ascending order (the storage order the rest of this engine
/// assumes) and concatenated, then reverse-complemented once as a whole on
/// the reverse strand; this is equivalent to reverse-complementing each
/// exon and concatenating in transcript order, since reverse-complementing
/// a concatenation reverses both the byte order and the exon order. The
/// 3'UTR (biological, i.e. downstream of the stop codon) is built the same
/// way over the genomic range past the CDS end (forward strand) or before
/// the CDS start (reverse strand).
pub fn fetch_sequences(transcripts: &mut [Transcript], fasta_path: &Path) -> Result<(), Error> {
    let mut reader = fasta::IndexedReader::from_file(&fasta_path)
        .map_err(|e| Error::GeneModelOpen(format!("{}: {e}", fasta_path.display())))?;

    for t in transcripts.iter_mut() {
        if t.cds_start == 0 || t.cds_end == 0 {
            continue;
        }

        let mut cds = Vec::new();
        for e in &t.exons {
            if !e.has_cds() {
                continue;
            }
            cds.extend(fetch_subsequence(&mut reader, &t.chrom, e.cds_start, e.cds_end)?);
        }

        let utr3_range = if t.strand.is_reverse() {
            (t.start, t.cds_start - 1)
        } else {
            (t.cds_end + 1, t.end)
        };
        let mut utr3 = Vec::new();
        if utr3_range.0 <= utr3_range.1 {
            for e in &t.exons {
                if let Some((lo, hi)) = clip((e.start, e.end), utr3_range) {
                    utr3.extend(fetch_subsequence(&mut reader, &t.chrom, lo, hi)?);
                }
            }
        }

        if t.strand.is_reverse() {
            cds = revcomp(&cds);
            utr3 = revcomp(&utr3);
        }

        t.cds_sequence = cds;
        t.utr3_sequence = if utr3.is_empty() { None } else { Some(utr3) };
    }
    Ok(())
}

/// Intersection of two closed genomic ranges, or `None` if disjoint.
fn clip(span: (i64, i64), bounds: (i64, i64)) -> Option<(i64, i64)> {
    let lo = span.0.max(bounds.0);
    let hi = span.1.min(bounds.1);
    (lo <= hi).then_some((lo, hi))
}

/// Fetches `[start_1based, end_1based]` (inclusive) from `chrom`, trying
/// the opposite `chr`-prefix convention if the first lookup fails, since
/// gene models and reference FASTAs don't always agree on it.
fn fetch_subsequence(
    reader: &mut fasta::IndexedReader<std::fs::File>,
    chrom: &str,
    start_1based: i64,
    end_1based: i64,
) -> Result<Vec<u8>, Error> {
    let start0 = (start_1based - 1).max(0) as u64;
    let end0 = end_1based as u64;

    let alt_chrom = match chrom.strip_prefix("chr") {
        Some(stripped) => stripped.to_string(),
        None => format!("chr{chrom}"),
    };

    if reader.fetch(chrom, start0, end0).is_err() {
        reader
            .fetch(&alt_chrom, start0, end0)
            .map_err(|e| Error::GeneModelParse(format!("fetch {chrom}:{start_1based}-{end_1based}: {e}")))?;
    }

    let mut seq = Vec::new();
    reader
        .read(&mut seq)
        .map_err(|e| Error::GeneModelParse(format!("read {chrom}:{start_1based}-{end_1based}: {e}")))?;
    seq.make_ascii_uppercase();
    Ok(seq)
}

/// Parses an already-decompressed cdot JSON document.
pub fn parse_transcripts(json: &str, genome_build: &str) -> Result<Vec<Transcript>, Error> {
    let container: Container = serde_json::from_str(json)?;

    let mut out = Vec::with_capacity(container.transcripts.len());
    for (_, tx) in container.transcripts {
        let Some(alignment) = tx.genome_builds.get(genome_build) else {
            continue;
        };
        out.push(convert_transcript(&tx, alignment));
    }
    Ok(out)
}

fn convert_transcript(tx: &CdotTranscript, alignment: &CdotAlignment) -> Transcript {
    let strand = match alignment.strand {
        CdotStrand::Plus => Strand::Forward,
        CdotStrand::Minus => Strand::Reverse,
    };

    let mut exons: Vec<ModelExon> = alignment
        .exons
        .iter()
        .map(|e| {
            // cdot coordinates are 0-based half-open; this engine's model
            // is 1-based inclusive.
            let start = e.0 + 1;
            let end = e.1;
            let (cds_start, cds_end) = if e.3 >= 0 && e.4 >= 0 {
                (e.3 + 1, e.4)
            } else {
                (0, 0)
            };
            ModelExon {
                number: 0,
                start,
                end,
                cds_start,
                cds_end,
                frame: 0,
            }
        })
        .collect();
    exons.sort_by_key(|e| e.start);

    let numbering_order: Vec<usize> = match strand {
        Strand::Forward => (0..exons.len()).collect(),
        Strand::Reverse => (0..exons.len()).rev().collect(),
    };
    for (n, idx) in numbering_order.into_iter().enumerate() {
        exons[idx].number = n as u32 + 1;
    }

    let start = exons.iter().map(|e| e.start).min().unwrap_or(0);
    let end = exons.iter().map(|e| e.end).max().unwrap_or(0);

    let biotype = tx
        .biotype
        .as_ref()
        .and_then(|b| b.first())
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());

    let is_canonical = tx
        .tag
        .as_deref()
        .map(|t| {
            t.contains("Ensembl_canonical") || t.contains("MANE_Select") || t.contains("MANE Select")
        })
        .unwrap_or(false);

    let cds_start = alignment.cds_start.map(|c| c + 1).unwrap_or(0);
    let cds_end = alignment.cds_end.unwrap_or(0);

    Transcript {
        id: tx.id.clone(),
        gene_id: tx.gene_version.clone(),
        gene_name: tx.gene_name.clone().unwrap_or_default(),
        chrom: alignment.contig.clone(),
        start,
        end,
        strand,
        biotype,
        is_canonical,
        cds_start,
        cds_end,
        exons,
        // Sequence data is not part of the cdot document; `fetch_sequences`
        // fills it in from a reference FASTA after this struct is built,
        // if one was given to `load_transcripts`.
        cds_sequence: Vec::new(),
        utr3_sequence: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const SMALL_DOC: &str = r#"
    {
        "transcripts": {
            "NM_000001.1": {
                "id": "NM_000001.1",
                "gene_version": "GENE1",
                "gene_name": "TESTG",
                "biotype": ["protein_coding"],
                "tag": "MANE_Select",
                "genome_builds": {
                    "GRCh38": {
                        "contig": "1",
                        "strand": "+",
                        "cds_start": 104,
                        "cds_end": 311,
                        "exons": [
                            [99, 130, 1, 104, 130],
                            [199, 230, 2, 199, 230],
                            [299, 320, 3, 299, 311]
                        ]
                    }
                }
            }
        },
        "genes": {}
    }
    "#;

    #[test]
    fn parses_small_document() {
        let txs = parse_transcripts(SMALL_DOC, "GRCh38").unwrap();
        assert_eq!(txs.len(), 1);
        let t = &txs[0];
        assert_eq!(t.id, "NM_000001.1");
        assert_eq!(t.gene_name, "TESTG");
        assert_eq!(t.strand, Strand::Forward);
        assert_eq!(t.exons.len(), 3);
        assert_eq!(t.exons[0].number, 1);
        assert_eq!(t.exons[0].start, 100);
        assert!(t.is_canonical);
    }

    #[test]
    fn missing_build_is_skipped() {
        let txs = parse_transcripts(SMALL_DOC, "GRCh37").unwrap();
        assert!(txs.is_empty());
    }

    fn write_test_fasta() -> std::path::PathBuf {
        let dir = std::env::temp_dir();
        let fasta_path = dir.join("vareffect_cdot_fetch_sequences_test.fa");
        let sequence = "ACGT".repeat(10); // 40 bases, positions 1..=40
        std::fs::write(&fasta_path, format!(">1\n{sequence}\n")).unwrap();
        // header ">1\n" is 3 bytes; the 40-base sequence is on a single line.
        std::fs::write(
            format!("{}.fai", fasta_path.display()),
            "1\t40\t3\t40\t41\n",
        )
        .unwrap();
        fasta_path
    }

    fn single_exon_transcript() -> Transcript {
        Transcript {
            id: "NM_FETCH_TEST.1".into(),
            gene_id: "GENE1".into(),
            gene_name: "TESTG".into(),
            chrom: "1".into(),
            start: 1,
            end: 40,
            strand: Strand::Forward,
            biotype: "protein_coding".into(),
            is_canonical: true,
            cds_start: 5,
            cds_end: 16,
            exons: vec![ModelExon {
                number: 1,
                start: 1,
                end: 40,
                cds_start: 5,
                cds_end: 16,
                frame: 0,
            }],
            cds_sequence: Vec::new(),
            utr3_sequence: None,
        }
    }

    #[test]
    fn fetch_sequences_splices_cds_and_utr3_forward() {
        let fasta_path = write_test_fasta();
        let mut transcripts = vec![single_exon_transcript()];

        fetch_sequences(&mut transcripts, &fasta_path).unwrap();

        assert_eq!(transcripts[0].cds_sequence, b"ACGTACGTACGT");
        assert_eq!(
            transcripts[0].utr3_sequence.as_deref(),
            Some(&b"ACGTACGTACGTACGTACGTACGT"[..])
        );
    }

    #[test]
    fn fetch_sequences_reverse_complements_on_minus_strand() {
        let fasta_path = write_test_fasta();
        let mut t = single_exon_transcript();
        t.strand = Strand::Reverse;
        // mirror the forward fixture's CDS/UTR span so the comparison below
        // is a pure reverse-complement of the forward-strand result.
        t.cds_start = 5;
        t.cds_end = 16;
        let mut transcripts = vec![t];

        fetch_sequences(&mut transcripts, &fasta_path).unwrap();

        assert_eq!(transcripts[0].cds_sequence, revcomp(b"ACGTACGTACGT"));
        // 3'UTR on the reverse strand lies upstream of cds_start genomically.
        assert_eq!(
            transcripts[0].utr3_sequence.as_deref(),
            Some(&revcomp(b"ACGT")[..])
        );
    }
}
