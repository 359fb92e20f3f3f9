//! Minimal whitespace/tab-delimited variant reader.
//!
//! Deliberately not a VCF parser: each line is `chrom pos ref alt`,
//! whitespace-separated, one variant per line, blank lines and `#`-prefixed
//! comments skipped. Multi-allelic `alt` fields (comma-separated) are split
//! into one [`Variant`] per allele before reaching the core.

use std::io::BufRead;

use crate::data::error::Error;
use crate::data::VariantReader as VariantReaderTrait;
use crate::model::Variant;

pub struct VariantReader<R> {
    lines: std::io::Lines<R>,
    pending: std::collections::VecDeque<Variant>,
}

impl<R: BufRead> VariantReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            pending: std::collections::VecDeque::new(),
        }
    }
}

impl<R: BufRead> VariantReaderTrait for VariantReader<R> {
    fn next_variant(&mut self) -> Result<Option<Variant>, Error> {
        if let Some(v) = self.pending.pop_front() {
            return Ok(Some(v));
        }

        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            let line = line.map_err(Error::Io)?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            let [chrom, pos, reference, alternative] = fields[..] else {
                return Err(Error::MalformedVariant(line.to_string()));
            };
            let pos: i64 = pos
                .parse()
                .map_err(|_| Error::MalformedVariant(line.to_string()))?;

            for alt in alternative.split(',') {
                self.pending.push_back(Variant {
                    chrom: chrom.to_string(),
                    pos,
                    reference: reference.to_string(),
                    alternative: alt.to_string(),
                });
            }
            if let Some(v) = self.pending.pop_front() {
                return Ok(Some(v));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn reader(text: &str) -> VariantReader<Cursor<&[u8]>> {
        VariantReader::new(Cursor::new(text.as_bytes()))
    }

    #[test]
    fn reads_plain_records() {
        let mut r = reader("1\t100\tA\tG\n2 200 C T\n");
        let v1 = r.next_variant().unwrap().unwrap();
        assert_eq!(v1.chrom, "1");
        assert_eq!(v1.pos, 100);
        let v2 = r.next_variant().unwrap().unwrap();
        assert_eq!(v2.chrom, "2");
        assert!(r.next_variant().unwrap().is_none());
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let mut r = reader("# header\n\n1\t100\tA\tG\n");
        let v = r.next_variant().unwrap().unwrap();
        assert_eq!(v.pos, 100);
        assert!(r.next_variant().unwrap().is_none());
    }

    #[test]
    fn splits_multiallelic_records() {
        let mut r = reader("1\t100\tA\tG,T\n");
        let v1 = r.next_variant().unwrap().unwrap();
        assert_eq!(v1.alternative, "G");
        let v2 = r.next_variant().unwrap().unwrap();
        assert_eq!(v2.alternative, "T");
        assert!(r.next_variant().unwrap().is_none());
    }

    #[test]
    fn malformed_line_is_an_error() {
        let mut r = reader("1\t100\tA\n");
        assert!(r.next_variant().is_err());
    }
}
