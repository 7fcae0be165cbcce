use std::fmt;
use std::marker::PhantomData;

use ark_ec::short_weierstrass_jacobian::GroupAffine;
use ark_ec::SWModelParameters;
use ark_ff::{Field, FpParameters, SquareRootField};
use ark_std::{One, Zero};

use super::field::{write_limbs_le, FieldCodec};
use super::{CodecError, CurveEngine, GroupCodec};

const FLAG_NEGATIVE: u8 = 0x80;
const FLAG_INFINITY: u8 = 0x40;

/// Codec for a short Weierstrass group backed by arkworks affine points.
pub struct ShortWeierstrass<P>(PhantomData<fn() -> P>);

impl<P> ShortWeierstrass<P> {
    pub const fn new() -> Self {
        ShortWeierstrass(PhantomData)
    }
}

impl<P> Default for ShortWeierstrass<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for ShortWeierstrass<P> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<P> Copy for ShortWeierstrass<P> {}

impl<P> PartialEq for ShortWeierstrass<P> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<P> Eq for ShortWeierstrass<P> {}

impl<P> fmt::Debug for ShortWeierstrass<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShortWeierstrass")
    }
}

impl<P> ShortWeierstrass<P>
where
    P: SWModelParameters,
    P::BaseField: FieldCodec + SquareRootField,
{
    fn coordinate_size() -> usize {
        <P::BaseField as FieldCodec>::BYTES
    }

    fn check_len(bytes: &[u8], expected: usize) -> Result<(), CodecError> {
        if bytes.len() != expected {
            return Err(CodecError::WrongLength {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(())
    }

    fn infinity() -> GroupAffine<P> {
        GroupAffine::new(P::BaseField::zero(), P::BaseField::one(), true)
    }

    fn on_curve(x: P::BaseField, y: P::BaseField) -> Result<GroupAffine<P>, CodecError> {
        let point = GroupAffine::new(x, y, false);
        if point.is_on_curve() {
            Ok(point)
        } else {
            Err(CodecError::NotOnCurve)
        }
    }
}

impl<P> GroupCodec for ShortWeierstrass<P>
where
    P: SWModelParameters,
    P::BaseField: FieldCodec + SquareRootField,
{
    type Point = GroupAffine<P>;

    fn compressed_size(&self) -> usize {
        Self::coordinate_size()
    }

    fn uncompressed_size(&self) -> usize {
        2 * Self::coordinate_size()
    }

    fn generator(&self) -> Self::Point {
        let (x, y) = P::AFFINE_GENERATOR_COEFFS;
        GroupAffine::new(x, y, false)
    }

    fn read_compressed(&self, bytes: &[u8]) -> Result<Self::Point, CodecError> {
        Self::check_len(bytes, self.compressed_size())?;
        if bytes[0] & FLAG_INFINITY != 0 {
            return Ok(Self::infinity());
        }
        let greatest = bytes[0] & FLAG_NEGATIVE != 0;

        let mut x_bytes = bytes.to_vec();
        x_bytes[0] &= !FLAG_NEGATIVE;
        let x = P::BaseField::read_be(&x_bytes).ok_or(CodecError::NonCanonicalCoordinate)?;

        let y_squared = P::add_b(&(x.square() * x + P::mul_by_a(&x)));
        let y = y_squared.sqrt().ok_or(CodecError::NotOnCurve)?;
        let y = if greatest ^ y.is_negative() { -y } else { y };

        Ok(GroupAffine::new(x, y, false))
    }

    fn write_compressed(&self, point: &Self::Point, out: &mut [u8]) {
        out.fill(0);
        if point.infinity {
            out[0] = FLAG_INFINITY;
            return;
        }
        point.x.write_be(out);
        if point.y.is_negative() {
            out[0] |= FLAG_NEGATIVE;
        }
    }

    fn read_uncompressed(&self, bytes: &[u8]) -> Result<Self::Point, CodecError> {
        Self::check_len(bytes, self.uncompressed_size())?;
        if bytes[0] & FLAG_INFINITY != 0 {
            return Ok(Self::infinity());
        }
        let (x_bytes, y_bytes) = bytes.split_at(Self::coordinate_size());
        let x = P::BaseField::read_be(x_bytes).ok_or(CodecError::NonCanonicalCoordinate)?;
        let y = P::BaseField::read_be(y_bytes).ok_or(CodecError::NonCanonicalCoordinate)?;
        Self::on_curve(x, y)
    }

    fn write_uncompressed(&self, point: &Self::Point, out: &mut [u8]) {
        out.fill(0);
        if point.infinity {
            out[0] = FLAG_INFINITY;
            return;
        }
        let (x_out, y_out) = out.split_at_mut(Self::coordinate_size());
        point.x.write_be(x_out);
        point.y.write_be(y_out);
    }

    fn read_montgomery(&self, bytes: &[u8]) -> Result<Self::Point, CodecError> {
        Self::check_len(bytes, self.uncompressed_size())?;
        if bytes.iter().all(|b| *b == 0) {
            return Ok(Self::infinity());
        }
        let (x_bytes, y_bytes) = bytes.split_at(Self::coordinate_size());
        let x = P::BaseField::read_montgomery(x_bytes).ok_or(CodecError::NonCanonicalCoordinate)?;
        let y = P::BaseField::read_montgomery(y_bytes).ok_or(CodecError::NonCanonicalCoordinate)?;
        Self::on_curve(x, y)
    }

    fn write_montgomery(&self, point: &Self::Point, out: &mut [u8]) {
        out.fill(0);
        if point.infinity {
            return;
        }
        let (x_out, y_out) = out.split_at_mut(Self::coordinate_size());
        point.x.write_montgomery(x_out);
        point.y.write_montgomery(y_out);
    }
}

fn modulus_le<F: FpParameters>(bytes: usize) -> Vec<u8>
where
    F::BigInt: AsRef<[u64]>,
{
    let mut out = vec![0u8; bytes];
    write_limbs_le(F::MODULUS.as_ref(), &mut out);
    out
}

macro_rules! arkworks_engine {
    ($engine:ident, $krate:ident, $name:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $engine {
            g1: ShortWeierstrass<$krate::g1::Parameters>,
            g2: ShortWeierstrass<$krate::g2::Parameters>,
        }

        impl CurveEngine for $engine {
            type G1 = ShortWeierstrass<$krate::g1::Parameters>;
            type G2 = ShortWeierstrass<$krate::g2::Parameters>;

            fn name(&self) -> &'static str {
                $name
            }

            fn modulus(&self) -> Vec<u8> {
                modulus_le::<$krate::FqParameters>(self.g1.compressed_size())
            }

            fn g1(&self) -> &Self::G1 {
                &self.g1
            }

            fn g2(&self) -> &Self::G2 {
                &self.g2
            }
        }
    };
}

arkworks_engine!(Bn254, ark_bn254, "bn128", "The BN254 (alt_bn128) curve used by most ptau ceremonies.");
arkworks_engine!(Bls12_381, ark_bls12_381, "bls12381", "The BLS12-381 curve.");
