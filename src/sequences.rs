//! DNA sequence primitives: complement, reverse complement, codon extraction
//! and translation, amino acid 1/3-letter conversion.

use thiserror::Error;

/// Error type for sequence operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid one-letter amino acid code: {0}")]
    InvalidOneLetterAminoAcid(char),
    #[error("invalid three-letter amino acid code: {0}")]
    InvalidThreeLetterAminoAcid(String),
    #[error("three-letter amino acid code must have length 3, got {0}")]
    InvalidThreeLetterAminoAcidLength(String),
    #[error("cannot translate sequence of length {0}, not a multiple of 3")]
    UntranslatableDnaLength(usize),
}

/// The standard nuclear genetic code, the only table this engine uses.
///
/// Indexed by a codon's 2-bit packing (base0<<4 | base1<<2 | base2, with
/// A=0,C=1,G=2,T=3). `X` for anything outside ACGT is handled separately in
/// [`translate_codon`]; this table only ever sees fully-resolved codons.
const CODON_TABLE: [u8; 64] = [
    b'K', b'N', b'K', b'N', b'T', b'T', b'T', b'T', b'R', b'S', b'R', b'S', b'I', b'I', b'M',
    b'I', b'Q', b'H', b'Q', b'H', b'P', b'P', b'P', b'P', b'R', b'R', b'R', b'R', b'L', b'L',
    b'L', b'L', b'E', b'D', b'E', b'D', b'A', b'A', b'A', b'A', b'G', b'G', b'G', b'G', b'V',
    b'V', b'V', b'V', b'*', b'Y', b'*', b'Y', b'S', b'S', b'S', b'S', b'*', b'C', b'W', b'C',
    b'L', b'F', b'L', b'F',
];

/// Packs an uppercase codon into its table index, or `None` if any base is
/// not one of A, C, G, T.
fn codon_index(codon: [u8; 3]) -> Option<usize> {
    let mut idx = 0usize;
    for b in codon {
        let two_bit = match b {
            b'A' => 0,
            b'C' => 1,
            b'G' => 2,
            b'T' => 3,
            _ => return None,
        };
        idx = (idx << 2) | two_bit;
    }
    Some(idx)
}

/// Translates a single codon (must be uppercase) to its one-letter amino
/// acid, `*` for a stop codon, or `X` if the codon contains anything other
/// than A, C, G, T.
pub fn translate_codon(codon: [u8; 3]) -> u8 {
    match codon_index(codon) {
        Some(idx) => CODON_TABLE[idx],
        None => b'X',
    }
}

/// Complements a single base, preserving case; anything that is not
/// A/C/G/T (in either case) maps to `N` of matching case.
pub fn complement_base(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        b if b.is_ascii_lowercase() => b'n',
        _ => b'N',
    }
}

/// Reverse-complements a byte slice, allocating the result vector.
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    bio::alphabets::dna::revcomp(seq)
}

/// Reverse-complements a `&str`, assuming ASCII content.
pub fn revcomp_str(seq: &str) -> String {
    String::from_utf8(revcomp(seq.as_bytes())).expect("revcomp of ASCII input is ASCII")
}

/// Extracts codon number `codon_number` (1-based) from a spliced CDS
/// sequence. Returns `None` if the codon falls outside the sequence.
pub fn codon_at(cds: &[u8], codon_number: usize) -> Option<[u8; 3]> {
    if codon_number == 0 {
        return None;
    }
    let start = (codon_number - 1) * 3;
    let end = start + 3;
    if end > cds.len() {
        return None;
    }
    let mut out = [0u8; 3];
    out.copy_from_slice(&cds[start..end]);
    Some(out)
}

/// Returns a copy of `codon` with the base at `pos_in_codon` (0, 1 or 2)
/// replaced by `new_base`.
pub fn mutate_codon(codon: [u8; 3], pos_in_codon: usize, new_base: u8) -> [u8; 3] {
    let mut out = codon;
    out[pos_in_codon] = new_base;
    out
}

/// Translates a full coding sequence (length must be a multiple of 3),
/// returning one amino acid character per codon, including the trailing
/// stop if present.
pub fn translate_cds(cds: &[u8]) -> Result<Vec<u8>, Error> {
    if cds.len() % 3 != 0 {
        return Err(Error::UntranslatableDnaLength(cds.len()));
    }
    Ok(cds
        .chunks_exact(3)
        .map(|c| translate_codon([c[0], c[1], c[2]]))
        .collect())
}

/// One-letter amino acid codes, indexed in parallel with [`AA3_CODES`].
const AA1_CODES: &[u8] = b"ARNDCQEGHILKMFPSTWYVX*";
const AA3_CODES: &[&str] = &[
    "Ala", "Arg", "Asn", "Asp", "Cys", "Gln", "Glu", "Gly", "His", "Ile", "Leu", "Lys", "Met",
    "Phe", "Pro", "Ser", "Thr", "Trp", "Tyr", "Val", "Xaa", "Ter",
];

/// Converts a one-letter amino acid code to its three-letter form.
pub fn aa1_to_aa3(aa1: u8) -> Result<&'static str, Error> {
    AA1_CODES
        .iter()
        .position(|&c| c == aa1)
        .map(|i| AA3_CODES[i])
        .ok_or(Error::InvalidOneLetterAminoAcid(aa1 as char))
}

/// Converts a three-letter amino acid code to its one-letter form.
pub fn aa3_to_aa1(aa3: &str) -> Result<u8, Error> {
    if aa3.len() != 3 {
        return Err(Error::InvalidThreeLetterAminoAcidLength(aa3.to_string()));
    }
    AA3_CODES
        .iter()
        .position(|&c| c.eq_ignore_ascii_case(aa3))
        .map(|i| AA1_CODES[i])
        .ok_or_else(|| Error::InvalidThreeLetterAminoAcid(aa3.to_string()))
}

/// Trims the common prefix of `reference` and `alternative`, returning the
/// number of bytes trimmed and the two remainders.
pub fn trim_common_prefix(reference: &[u8], alternative: &[u8]) -> (usize, Vec<u8>, Vec<u8>) {
    let trim = reference
        .iter()
        .zip(alternative.iter())
        .take_while(|(a, b)| a == b)
        .count();
    (trim, reference[trim..].to_vec(), alternative[trim..].to_vec())
}

/// Trims the common suffix of `reference` and `alternative`, returning the
/// number of bytes trimmed and the two remainders.
pub fn trim_common_suffix(reference: &[u8], alternative: &[u8]) -> (usize, Vec<u8>, Vec<u8>) {
    let mut trim = 0;
    while trim < reference.len()
        && trim < alternative.len()
        && reference[reference.len() - 1 - trim] == alternative[alternative.len() - 1 - trim]
    {
        trim += 1;
    }
    (
        trim,
        reference[..reference.len() - trim].to_vec(),
        alternative[..alternative.len() - trim].to_vec(),
    )
}
