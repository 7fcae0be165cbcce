use std::path::PathBuf;

use thiserror::Error;

use crate::engine::CodecError;
use crate::hash::Digest512;

/// Everything that can abort an import.
///
/// The pipeline is fail-fast: none of these are retried, and once the output
/// transcript has been created any error removes it again.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("size of the contribution is invalid: expected {expected} bytes, found {actual}")]
    MalformedResponse { expected: u64, actual: u64 },

    #[error("wrong contribution: it is not based on the previous hash (expected {expected:?}, declared {declared:?})")]
    ChainMismatch {
        expected: Digest512,
        declared: Digest512,
    },

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid point encoding: {0}")]
    Codec(#[from] CodecError),

    #[error("invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("transcript modulus does not belong to a supported curve")]
    UnsupportedCurve,

    #[error("transcript was not produced for the {expected} curve")]
    CurveMismatch { expected: &'static str },

    #[error("power {0} is outside the supported range")]
    InvalidPower(u32),

    #[error("the last contribution has no pending challenge hash to resolve")]
    NoPendingChallenge,

    #[error("output path {0} aliases one of the inputs")]
    OutputAliasesInput(PathBuf),
}

pub type Result<T> = std::result::Result<T, ImportError>;
