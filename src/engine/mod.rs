//! Point codecs for the curves a ceremony can run over.
//!
//! A ceremony moves every point through three byte forms:
//! - *compressed*: what contributors send in a response (x only plus flags),
//! - *montgomery*: the storage form inside a ptau transcript,
//! - *uncompressed*: the form the challenge hashes are computed over.
//!
//! The import pipeline only ever talks to a [`CurveEngine`], so a synthetic
//! engine can stand in for the arkworks-backed ones.

mod arkworks;
mod field;

use std::fmt::Debug;

use thiserror::Error;

pub use arkworks::{Bls12_381, Bn254, ShortWeierstrass};
pub use field::FieldCodec;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected {expected} bytes, found {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("coordinate is not a canonical field element")]
    NonCanonicalCoordinate,
    #[error("x coordinate has no matching y on the curve")]
    NotOnCurve,
    #[error("codec reports a zero byte point width")]
    ZeroWidth,
}

/// Encoding and decoding of one group's points.
pub trait GroupCodec: Sync {
    type Point: Clone + PartialEq + Debug + Send + Sync;

    /// Width of a compressed point in bytes.
    fn compressed_size(&self) -> usize;
    /// Width of an uncompressed (and of a montgomery) point in bytes.
    fn uncompressed_size(&self) -> usize;

    fn generator(&self) -> Self::Point;

    fn read_compressed(&self, bytes: &[u8]) -> Result<Self::Point, CodecError>;
    fn write_compressed(&self, point: &Self::Point, out: &mut [u8]);

    fn read_uncompressed(&self, bytes: &[u8]) -> Result<Self::Point, CodecError>;
    fn write_uncompressed(&self, point: &Self::Point, out: &mut [u8]);

    fn read_montgomery(&self, bytes: &[u8]) -> Result<Self::Point, CodecError>;
    fn write_montgomery(&self, point: &Self::Point, out: &mut [u8]);

    /// Converts a run of compressed points into their montgomery form.
    fn batch_compressed_to_montgomery(&self, compressed: &[u8]) -> Result<Vec<u8>, CodecError> {
        convert_records(
            compressed,
            self.compressed_size(),
            self.uncompressed_size(),
            |src, dst| {
                let point = self.read_compressed(src)?;
                self.write_montgomery(&point, dst);
                Ok(())
            },
        )
    }

    /// Converts a run of montgomery points into the uncompressed form used for hashing.
    fn batch_montgomery_to_uncompressed(&self, montgomery: &[u8]) -> Result<Vec<u8>, CodecError> {
        convert_records(
            montgomery,
            self.uncompressed_size(),
            self.uncompressed_size(),
            |src, dst| {
                let point = self.read_montgomery(src)?;
                self.write_uncompressed(&point, dst);
                Ok(())
            },
        )
    }
}

/// A pairing-friendly curve as seen by the ceremony: its two groups and the
/// base field modulus recorded in transcript headers.
pub trait CurveEngine: Clone + Debug + PartialEq + Send + Sync {
    type G1: GroupCodec;
    type G2: GroupCodec;

    fn name(&self) -> &'static str;
    /// Base field modulus, little-endian, `g1().compressed_size()` bytes long.
    fn modulus(&self) -> Vec<u8>;
    fn g1(&self) -> &Self::G1;
    fn g2(&self) -> &Self::G2;
}

pub type G1Point<E> = <<E as CurveEngine>::G1 as GroupCodec>::Point;
pub type G2Point<E> = <<E as CurveEngine>::G2 as GroupCodec>::Point;

/// Curves a transcript header can name without the caller supplying an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCurve {
    Bn254,
    Bls12_381,
}

impl BuiltinCurve {
    pub fn from_modulus(modulus: &[u8]) -> Option<Self> {
        if modulus == Bn254::default().modulus().as_slice() {
            Some(BuiltinCurve::Bn254)
        } else if modulus == Bls12_381::default().modulus().as_slice() {
            Some(BuiltinCurve::Bls12_381)
        } else {
            None
        }
    }
}

// Applies `convert` to every fixed-width record of `src`, writing into the
// matching record of the output. Records are independent, so with the
// `parallel` feature they are converted on the rayon pool.
fn convert_records<F>(
    src: &[u8],
    src_width: usize,
    dst_width: usize,
    convert: F,
) -> Result<Vec<u8>, CodecError>
where
    F: Fn(&[u8], &mut [u8]) -> Result<(), CodecError> + Send + Sync,
{
    if src_width == 0 || dst_width == 0 {
        return Err(CodecError::ZeroWidth);
    }
    if src.len() % src_width != 0 {
        return Err(CodecError::WrongLength {
            expected: (src.len() / src_width + 1) * src_width,
            actual: src.len(),
        });
    }
    let mut out = vec![0u8; src.len() / src_width * dst_width];

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        out.par_chunks_mut(dst_width)
            .zip(src.par_chunks(src_width))
            .try_for_each(|(record_out, record)| convert(record, record_out))?;
    }
    #[cfg(not(feature = "parallel"))]
    {
        for (record_out, record) in out.chunks_mut(dst_width).zip(src.chunks(src_width)) {
            convert(record, record_out)?;
        }
    }

    Ok(out)
}
