use crate::engine::{CodecError, CurveEngine, G1Point, G2Point, GroupCodec};
use crate::parameters::PointSizes;

// One of the three proof-of-knowledge keys a contributor publishes
// (for tau, alpha and beta).
#[derive(Debug, Clone, PartialEq)]
pub struct KeyComponent<E: CurveEngine> {
    pub g1_s: G1Point<E>,
    pub g1_sx: G1Point<E>,
    pub g2_spx: G2Point<E>,
}

/// The contributor's public key as it trails a response file.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicKey<E: CurveEngine> {
    pub tau: KeyComponent<E>,
    pub alpha: KeyComponent<E>,
    pub beta: KeyComponent<E>,
}

/// Which byte form a key block is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    // response files
    Uncompressed,
    // transcript ledgers
    Montgomery,
}

impl<E: CurveEngine> PublicKey<E> {
    pub fn encoded_size(engine: &E) -> usize {
        PointSizes::of(engine).key_block() as usize
    }

    // Order: the six G1 points (s, sx for tau, alpha, beta), then the three G2 points.
    pub fn read(engine: &E, bytes: &[u8], encoding: KeyEncoding) -> Result<Self, CodecError> {
        if bytes.len() != Self::encoded_size(engine) {
            return Err(CodecError::WrongLength {
                expected: Self::encoded_size(engine),
                actual: bytes.len(),
            });
        }
        let mut cursor = KeyCursor {
            bytes,
            offset: 0,
            encoding,
        };

        let tau_g1 = (cursor.point(engine.g1())?, cursor.point(engine.g1())?);
        let alpha_g1 = (cursor.point(engine.g1())?, cursor.point(engine.g1())?);
        let beta_g1 = (cursor.point(engine.g1())?, cursor.point(engine.g1())?);

        Ok(PublicKey {
            tau: KeyComponent {
                g1_s: tau_g1.0,
                g1_sx: tau_g1.1,
                g2_spx: cursor.point(engine.g2())?,
            },
            alpha: KeyComponent {
                g1_s: alpha_g1.0,
                g1_sx: alpha_g1.1,
                g2_spx: cursor.point(engine.g2())?,
            },
            beta: KeyComponent {
                g1_s: beta_g1.0,
                g1_sx: beta_g1.1,
                g2_spx: cursor.point(engine.g2())?,
            },
        })
    }

    pub fn write(&self, engine: &E, encoding: KeyEncoding, out: &mut Vec<u8>) {
        for component in [&self.tau, &self.alpha, &self.beta] {
            put_point(engine.g1(), &component.g1_s, encoding, out);
            put_point(engine.g1(), &component.g1_sx, encoding, out);
        }
        for component in [&self.tau, &self.alpha, &self.beta] {
            put_point(engine.g2(), &component.g2_spx, encoding, out);
        }
    }
}

struct KeyCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    encoding: KeyEncoding,
}

impl<'a> KeyCursor<'a> {
    fn point<G: GroupCodec>(&mut self, codec: &G) -> Result<G::Point, CodecError> {
        let width = codec.uncompressed_size();
        let bytes = &self.bytes[self.offset..self.offset + width];
        self.offset += width;
        match self.encoding {
            KeyEncoding::Uncompressed => codec.read_uncompressed(bytes),
            KeyEncoding::Montgomery => codec.read_montgomery(bytes),
        }
    }
}

fn put_point<G: GroupCodec>(codec: &G, point: &G::Point, encoding: KeyEncoding, out: &mut Vec<u8>) {
    let start = out.len();
    out.resize(start + codec.uncompressed_size(), 0);
    match encoding {
        KeyEncoding::Uncompressed => codec.write_uncompressed(point, &mut out[start..]),
        KeyEncoding::Montgomery => codec.write_montgomery(point, &mut out[start..]),
    }
}
