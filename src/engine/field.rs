use ark_ff::{
    BigInteger256, BigInteger384, Field, Fp256, Fp256Parameters, Fp2, Fp2Parameters, Fp384,
    Fp384Parameters, PrimeField, Zero,
};

/// Byte encodings of base field elements as ceremony files lay them out.
///
/// Big-endian forms hold the canonical integer, little-endian forms hold the
/// montgomery representation the transcript stores.
pub trait FieldCodec: Field {
    const BYTES: usize;

    fn write_be(&self, out: &mut [u8]);
    fn read_be(bytes: &[u8]) -> Option<Self>;
    fn write_montgomery(&self, out: &mut [u8]);
    fn read_montgomery(bytes: &[u8]) -> Option<Self>;
    /// Whether the element is in the upper half of the field.
    fn is_negative(&self) -> bool;
}

pub(crate) fn write_limbs_be(limbs: &[u64], out: &mut [u8]) {
    for (chunk, limb) in out.chunks_exact_mut(8).zip(limbs.iter().rev()) {
        chunk.copy_from_slice(&limb.to_be_bytes());
    }
}

pub(crate) fn write_limbs_le(limbs: &[u64], out: &mut [u8]) {
    for (chunk, limb) in out.chunks_exact_mut(8).zip(limbs.iter()) {
        chunk.copy_from_slice(&limb.to_le_bytes());
    }
}

fn read_limbs_be<const N: usize>(bytes: &[u8]) -> [u64; N] {
    let mut limbs = [0u64; N];
    for (limb, chunk) in limbs.iter_mut().rev().zip(bytes.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_be_bytes(word);
    }
    limbs
}

fn read_limbs_le<const N: usize>(bytes: &[u8]) -> [u64; N] {
    let mut limbs = [0u64; N];
    for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_le_bytes(word);
    }
    limbs
}

macro_rules! impl_prime_field_codec {
    ($field:ident, $params:ident, $bigint:ident, $limbs:expr) => {
        impl<P: $params> FieldCodec for $field<P> {
            const BYTES: usize = $limbs * 8;

            fn write_be(&self, out: &mut [u8]) {
                write_limbs_be(&self.into_repr().0, out)
            }

            fn read_be(bytes: &[u8]) -> Option<Self> {
                Self::from_repr($bigint(read_limbs_be::<$limbs>(bytes)))
            }

            fn write_montgomery(&self, out: &mut [u8]) {
                write_limbs_le(&(self.0).0, out)
            }

            fn read_montgomery(bytes: &[u8]) -> Option<Self> {
                let repr = $bigint(read_limbs_le::<$limbs>(bytes));
                if repr < P::MODULUS {
                    Some(Self::new(repr))
                } else {
                    None
                }
            }

            fn is_negative(&self) -> bool {
                self.into_repr() > P::MODULUS_MINUS_ONE_DIV_TWO
            }
        }
    };
}

impl_prime_field_codec!(Fp256, Fp256Parameters, BigInteger256, 4);
impl_prime_field_codec!(Fp384, Fp384Parameters, BigInteger384, 6);

// Quadratic extensions put c1 first in big-endian forms and c0 first in
// montgomery forms. The sign is taken from c1 unless it is zero.
impl<P: Fp2Parameters> FieldCodec for Fp2<P>
where
    P::Fp: FieldCodec,
{
    const BYTES: usize = 2 * <P::Fp as FieldCodec>::BYTES;

    fn write_be(&self, out: &mut [u8]) {
        let (high, low) = out.split_at_mut(<P::Fp as FieldCodec>::BYTES);
        self.c1.write_be(high);
        self.c0.write_be(low);
    }

    fn read_be(bytes: &[u8]) -> Option<Self> {
        let (high, low) = bytes.split_at(<P::Fp as FieldCodec>::BYTES);
        let c1 = P::Fp::read_be(high)?;
        let c0 = P::Fp::read_be(low)?;
        Some(Fp2::new(c0, c1))
    }

    fn write_montgomery(&self, out: &mut [u8]) {
        let (first, second) = out.split_at_mut(<P::Fp as FieldCodec>::BYTES);
        self.c0.write_montgomery(first);
        self.c1.write_montgomery(second);
    }

    fn read_montgomery(bytes: &[u8]) -> Option<Self> {
        let (first, second) = bytes.split_at(<P::Fp as FieldCodec>::BYTES);
        let c0 = P::Fp::read_montgomery(first)?;
        let c1 = P::Fp::read_montgomery(second)?;
        Some(Fp2::new(c0, c1))
    }

    fn is_negative(&self) -> bool {
        if self.c1.is_zero() {
            self.c0.is_negative()
        } else {
            self.c1.is_negative()
        }
    }
}
