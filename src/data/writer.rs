//! Tab-separated [`crate::data::AnnotationWriter`] implementation.

use std::io::Write;

use crate::annotate::Annotation;
use crate::data::error::Error;
use crate::data::AnnotationWriter as AnnotationWriterTrait;
use crate::model::Variant;

const COLUMNS: &[&str] = &[
    "variant_id",
    "allele",
    "gene_name",
    "gene_id",
    "transcript_id",
    "biotype",
    "canonical",
    "consequence",
    "impact",
    "cds_pos",
    "protein_pos",
    "amino_acid_change",
    "codon_change",
    "hgvs_c",
    "hgvs_p",
    "exon",
    "intron",
];

pub struct TsvWriter<W> {
    inner: W,
}

impl<W: Write> TsvWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    fn write_row(&mut self, fields: &[&str]) -> Result<(), Error> {
        writeln!(self.inner, "{}", fields.join("\t")).map_err(Error::Io)
    }
}

fn empty_or(s: &str) -> &str {
    if s.is_empty() {
        "."
    } else {
        s
    }
}

impl<W: Write> AnnotationWriterTrait for TsvWriter<W> {
    fn write_header(&mut self) -> Result<(), Error> {
        self.write_row(COLUMNS)
    }

    fn write(&mut self, _variant: &Variant, annotations: &[Annotation]) -> Result<(), Error> {
        for ann in annotations {
            let canonical = if ann.is_canonical { "1" } else { "0" };
            let impact = ann.impact.to_string();
            let cds_pos = ann.cds_pos.to_string();
            let protein_pos = ann.protein_pos.to_string();
            let aa_change = ann.amino_acid_change.as_deref().unwrap_or("");
            let codon_change = ann.codon_change.as_deref().unwrap_or("");
            let exon = ann.exon_number.as_deref().unwrap_or("");
            let intron = ann.intron_number.as_deref().unwrap_or("");

            self.write_row(&[
                &ann.variant_id,
                &ann.allele,
                empty_or(&ann.gene_name),
                empty_or(&ann.gene_id),
                empty_or(&ann.transcript_id),
                empty_or(&ann.biotype),
                canonical,
                &ann.consequence,
                &impact,
                &cds_pos,
                &protein_pos,
                empty_or(aa_change),
                empty_or(codon_change),
                empty_or(&ann.hgvs_c),
                empty_or(&ann.hgvs_p),
                empty_or(exon),
                empty_or(intron),
            ])?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.inner.flush().map_err(Error::Io)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::classify::Impact;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn sample_annotation() -> Annotation {
        Annotation {
            variant_id: "1_108_G/C".into(),
            allele: "C".into(),
            transcript_id: "ENST_TEST_FWD".into(),
            gene_id: "ENSG_TEST".into(),
            gene_name: "TESTG".into(),
            biotype: "protein_coding".into(),
            is_canonical: true,
            consequence: "missense_variant".into(),
            impact: Impact::Moderate,
            cds_pos: 4,
            protein_pos: 2,
            amino_acid_change: Some("D/H".into()),
            codon_change: Some("gaC/gaG".into()),
            hgvs_c: "c.4G>C".into(),
            hgvs_p: "p.Asp2His".into(),
            exon_number: Some("1/3".into()),
            intron_number: None,
            extra: IndexMap::new(),
        }
    }

    #[test]
    fn writes_header_and_row() {
        let mut buf = Vec::new();
        let mut w = TsvWriter::new(&mut buf);
        w.write_header().unwrap();
        let variant = Variant {
            chrom: "1".into(),
            pos: 108,
            reference: "G".into(),
            alternative: "C".into(),
        };
        w.write(&variant, &[sample_annotation()]).unwrap();
        w.flush().unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("variant_id\t"));
        assert!(lines[1].contains("missense_variant"));
        assert!(lines[1].contains("c.4G>C"));
    }

    #[test]
    fn missing_intron_renders_placeholder() {
        let mut buf = Vec::new();
        let mut w = TsvWriter::new(&mut buf);
        let variant = Variant {
            chrom: "1".into(),
            pos: 108,
            reference: "G".into(),
            alternative: "C".into(),
        };
        w.write(&variant, &[sample_annotation()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.trim_end().ends_with('.'));
    }
}
