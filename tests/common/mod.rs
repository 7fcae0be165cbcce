#![allow(dead_code)]

use blake2::{Blake2b512, Digest};
use ptau_import::engine::{CodecError, CurveEngine, GroupCodec};
use ptau_import::parameters::{CeremonyParameters, Curve, PointGroup};
use ptau_import::Digest512;

pub const TOY_COMPRESSED: usize = 32;
pub const TOY_UNCOMPRESSED: usize = 64;

/// A point of the synthetic curve: any 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToyPoint(pub [u8; TOY_COMPRESSED]);

/// Compressed form is the raw bytes, uncompressed is `reversed || raw` and
/// montgomery is `raw ^ 0xA5 || raw`. Both long forms are validated on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToyCodec {
    generator: u8,
}

impl ToyCodec {
    fn split(&self, bytes: &[u8]) -> Result<([u8; 32], [u8; 32]), CodecError> {
        if bytes.len() != TOY_UNCOMPRESSED {
            return Err(CodecError::WrongLength {
                expected: TOY_UNCOMPRESSED,
                actual: bytes.len(),
            });
        }
        let mut head = [0u8; 32];
        let mut raw = [0u8; 32];
        head.copy_from_slice(&bytes[..32]);
        raw.copy_from_slice(&bytes[32..]);
        Ok((head, raw))
    }
}

impl GroupCodec for ToyCodec {
    type Point = ToyPoint;

    fn compressed_size(&self) -> usize {
        TOY_COMPRESSED
    }

    fn uncompressed_size(&self) -> usize {
        TOY_UNCOMPRESSED
    }

    fn generator(&self) -> ToyPoint {
        ToyPoint([self.generator; 32])
    }

    fn read_compressed(&self, bytes: &[u8]) -> Result<ToyPoint, CodecError> {
        let raw: [u8; 32] = bytes.try_into().map_err(|_| CodecError::WrongLength {
            expected: TOY_COMPRESSED,
            actual: bytes.len(),
        })?;
        Ok(ToyPoint(raw))
    }

    fn write_compressed(&self, point: &ToyPoint, out: &mut [u8]) {
        out.copy_from_slice(&point.0);
    }

    fn read_uncompressed(&self, bytes: &[u8]) -> Result<ToyPoint, CodecError> {
        let (head, raw) = self.split(bytes)?;
        if head != reversed(&raw) {
            return Err(CodecError::NotOnCurve);
        }
        Ok(ToyPoint(raw))
    }

    fn write_uncompressed(&self, point: &ToyPoint, out: &mut [u8]) {
        out.copy_from_slice(&uncompressed(point));
    }

    fn read_montgomery(&self, bytes: &[u8]) -> Result<ToyPoint, CodecError> {
        let (head, raw) = self.split(bytes)?;
        if head != masked(&raw) {
            return Err(CodecError::NonCanonicalCoordinate);
        }
        Ok(ToyPoint(raw))
    }

    fn write_montgomery(&self, point: &ToyPoint, out: &mut [u8]) {
        out[..32].copy_from_slice(&masked(&point.0));
        out[32..].copy_from_slice(&point.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToyEngine {
    g1: ToyCodec,
    g2: ToyCodec,
}

impl Default for ToyEngine {
    fn default() -> Self {
        ToyEngine {
            g1: ToyCodec { generator: 1 },
            g2: ToyCodec { generator: 2 },
        }
    }
}

impl CurveEngine for ToyEngine {
    type G1 = ToyCodec;
    type G2 = ToyCodec;

    fn name(&self) -> &'static str {
        "toy"
    }

    fn modulus(&self) -> Vec<u8> {
        vec![0xEE; 32]
    }

    fn g1(&self) -> &ToyCodec {
        &self.g1
    }

    fn g2(&self) -> &ToyCodec {
        &self.g2
    }
}

fn reversed(raw: &[u8; 32]) -> [u8; 32] {
    let mut out = *raw;
    out.reverse();
    out
}

fn masked(raw: &[u8; 32]) -> [u8; 32] {
    let mut out = *raw;
    out.iter_mut().for_each(|b| *b ^= 0xA5);
    out
}

pub fn uncompressed(point: &ToyPoint) -> [u8; TOY_UNCOMPRESSED] {
    let mut out = [0u8; TOY_UNCOMPRESSED];
    out[..32].copy_from_slice(&reversed(&point.0));
    out[32..].copy_from_slice(&point.0);
    out
}

/// The `index`th point a contributor identified by `seed` sends for `group`.
pub fn toy_point(seed: u8, group: PointGroup, index: u64) -> ToyPoint {
    let mut raw = [0x5A; 32];
    raw[0] = seed;
    raw[1] = group.index() as u8;
    raw[2..10].copy_from_slice(&index.to_le_bytes());
    ToyPoint(raw)
}

/// The nine key points, in key block order.
pub fn toy_key(seed: u8) -> Vec<ToyPoint> {
    (0..9u8)
        .map(|k| {
            let mut raw = [0xC3; 32];
            raw[0] = seed;
            raw[1] = k;
            ToyPoint(raw)
        })
        .collect()
}

/// A response of `power` declaring `previous`.
pub fn build_response(power: u32, previous: &Digest512, seed: u8) -> Vec<u8> {
    let params = CeremonyParameters::new(power).unwrap();
    let mut bytes = previous.as_bytes().to_vec();
    for group in PointGroup::ALL {
        for index in 0..params.element_count(group) {
            bytes.extend_from_slice(&toy_point(seed, group, index).0);
        }
    }
    for point in toy_key(seed) {
        bytes.extend_from_slice(&uncompressed(&point));
    }
    bytes
}

pub fn response_hash(response: &[u8]) -> Digest512 {
    Digest512::from_hasher(Blake2b512::new().chain_update(response))
}

/// The challenge a full import of a `build_response` output must report.
pub fn expected_next_challenge(power: u32, response: &[u8], seed: u8) -> Digest512 {
    let params = CeremonyParameters::new(power).unwrap();
    let mut hasher = Blake2b512::new();
    hasher.update(response_hash(response).as_bytes());
    for group in PointGroup::ALL {
        for index in 0..params.element_count(group) {
            hasher.update(uncompressed(&toy_point(seed, group, index)));
        }
    }
    Digest512::from_hasher(hasher)
}

/// The point each group contributes to the ledger.
pub fn singular_point(seed: u8, group: PointGroup) -> ToyPoint {
    let index = match group {
        PointGroup::TauG1 | PointGroup::TauG2 => 1,
        _ => 0,
    };
    toy_point(seed, group, index)
}

pub fn is_g2(group: PointGroup) -> bool {
    group.curve() == Curve::G2
}
