//! Error type for the data layer (gene-model loading, variant I/O, output).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not open gene model file: {0}")]
    GeneModelOpen(String),
    #[error("could not parse gene model JSON: {0}")]
    GeneModelParse(String),
    #[error("no transcript found for {0}")]
    NoTranscriptFound(String),
    #[error("no gene found for {0}")]
    NoGeneFound(String),
    #[error("malformed variant record: {0}")]
    MalformedVariant(String),
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}
