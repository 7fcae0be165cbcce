use std::fmt;

use blake2::{Blake2b512, Digest};
use itertools::Itertools;
use tracing::debug;

use crate::engine::{CurveEngine, GroupCodec};
use crate::parameters::{CeremonyParameters, Curve, PointGroup};

pub const DIGEST_BYTES: usize = 64;

/// A BLAKE2b-512 output, the unit of the ceremony hash chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest512(pub [u8; DIGEST_BYTES]);

impl Digest512 {
    pub fn from_hasher(hasher: Blake2b512) -> Self {
        let mut out = [0u8; DIGEST_BYTES];
        out.copy_from_slice(&hasher.finalize());
        Digest512(out)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_BYTES] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest512 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

// Four rows of four big-endian 32-bit words, the way ceremony tooling prints hashes.
impl fmt::Display for Digest512 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.0.chunks(16).map(|row| {
            let words = row.chunks(4).map(hex::encode).join(" ");
            format!("\t\t{}", words)
        });
        write!(f, "{}", rows.format("\n"))
    }
}

/// The challenge hash a contribution leaves for the next one.
///
/// Metadata-only imports cannot hash the points they never wrote, so their
/// challenge stays `Pending` until the next import supplies it. On disk a
/// pending challenge is the all-0xFF digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextChallenge {
    Pending,
    Computed(Digest512),
}

const PENDING_MARKER: [u8; DIGEST_BYTES] = [0xFF; DIGEST_BYTES];

impl NextChallenge {
    pub fn from_bytes(bytes: [u8; DIGEST_BYTES]) -> Self {
        if bytes == PENDING_MARKER {
            NextChallenge::Pending
        } else {
            NextChallenge::Computed(Digest512(bytes))
        }
    }

    pub fn to_bytes(&self) -> [u8; DIGEST_BYTES] {
        match self {
            NextChallenge::Pending => PENDING_MARKER,
            NextChallenge::Computed(digest) => digest.0,
        }
    }

    pub fn digest(&self) -> Option<&Digest512> {
        match self {
            NextChallenge::Pending => None,
            NextChallenge::Computed(digest) => Some(digest),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, NextChallenge::Pending)
    }
}

impl fmt::Display for NextChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextChallenge::Pending => f.write_str("\t\t<pending>"),
            NextChallenge::Computed(digest) => fmt::Display::fmt(digest, f),
        }
    }
}

// Number of repeated points hashed per update call.
const REPEAT_BLOCK: u64 = 1 << 14;

/// The challenge hash of a ceremony nobody has contributed to yet: every
/// point is the group generator.
pub fn first_challenge_hash<E: CurveEngine>(engine: &E, params: CeremonyParameters) -> Digest512 {
    debug!("Calculating First Challenge Hash");
    let g1 = uncompressed_generator(engine.g1());
    let g2 = uncompressed_generator(engine.g2());

    let mut hasher = Blake2b512::new();
    hasher.update(Blake2b512::digest(b""));
    for group in PointGroup::ALL {
        let record = match group.curve() {
            Curve::G1 => &g1,
            Curve::G2 => &g2,
        };
        hash_repeated(&mut hasher, record, params.element_count(group));
    }

    Digest512::from_hasher(hasher)
}

fn uncompressed_generator<G: GroupCodec>(codec: &G) -> Vec<u8> {
    let mut out = vec![0u8; codec.uncompressed_size()];
    codec.write_uncompressed(&codec.generator(), &mut out);
    out
}

fn hash_repeated(hasher: &mut Blake2b512, record: &[u8], count: u64) {
    let block = record.repeat(count.min(REPEAT_BLOCK) as usize);
    for _ in 0..count / REPEAT_BLOCK {
        hasher.update(&block);
    }
    for _ in 0..count % REPEAT_BLOCK {
        hasher.update(record);
    }
}
