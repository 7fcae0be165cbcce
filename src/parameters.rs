use crate::engine::{CurveEngine, GroupCodec};
use crate::error::{ImportError, Result};
use crate::hash::DIGEST_BYTES;

pub const MIN_POWER: u32 = 1;
pub const MAX_POWER: u32 = 28;

// The public key block of a response: 6 G1 points and 3 G2 points.
pub const KEY_G1_POINTS: u64 = 6;
pub const KEY_G2_POINTS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    G1,
    G2,
}

/// The five point groups every contribution carries, in stream order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointGroup {
    TauG1,
    TauG2,
    AlphaG1,
    BetaG1,
    BetaG2,
}

impl PointGroup {
    pub const ALL: [PointGroup; 5] = [
        PointGroup::TauG1,
        PointGroup::TauG2,
        PointGroup::AlphaG1,
        PointGroup::BetaG1,
        PointGroup::BetaG2,
    ];

    pub fn curve(self) -> Curve {
        match self {
            PointGroup::TauG2 | PointGroup::BetaG2 => Curve::G2,
            _ => Curve::G1,
        }
    }

    /// Section of the ptau file holding this group.
    pub fn section_id(self) -> u32 {
        self.index() as u32 + 2
    }

    pub fn index(self) -> usize {
        match self {
            PointGroup::TauG1 => 0,
            PointGroup::TauG2 => 1,
            PointGroup::AlphaG1 => 2,
            PointGroup::BetaG1 => 3,
            PointGroup::BetaG2 => 4,
        }
    }

    /// Indexes of the elements that are the contributor's own public points.
    pub fn singular_indexes(self) -> &'static [u64] {
        match self {
            PointGroup::TauG1 | PointGroup::TauG2 => &[1],
            _ => &[0],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PointGroup::TauG1 => "tauG1",
            PointGroup::TauG2 => "tauG2",
            PointGroup::AlphaG1 => "alphaTauG1",
            PointGroup::BetaG1 => "betaTauG1",
            PointGroup::BetaG2 => "betaG2",
        }
    }
}

/// Byte widths of a curve's point encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointSizes {
    pub compressed_g1: u64,
    pub compressed_g2: u64,
    pub uncompressed_g1: u64,
    pub uncompressed_g2: u64,
}

impl PointSizes {
    pub fn of<E: CurveEngine>(engine: &E) -> Self {
        PointSizes {
            compressed_g1: engine.g1().compressed_size() as u64,
            compressed_g2: engine.g2().compressed_size() as u64,
            uncompressed_g1: engine.g1().uncompressed_size() as u64,
            uncompressed_g2: engine.g2().uncompressed_size() as u64,
        }
    }

    pub fn compressed(&self, curve: Curve) -> u64 {
        match curve {
            Curve::G1 => self.compressed_g1,
            Curve::G2 => self.compressed_g2,
        }
    }

    pub fn key_block(&self) -> u64 {
        KEY_G1_POINTS * self.uncompressed_g1 + KEY_G2_POINTS * self.uncompressed_g2
    }
}

/// The size of a ceremony. It supports circuits of up to `2^power` constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CeremonyParameters {
    power: u32,
}

impl CeremonyParameters {
    pub fn new(power: u32) -> Result<Self> {
        if !(MIN_POWER..=MAX_POWER).contains(&power) {
            return Err(ImportError::InvalidPower(power));
        }
        Ok(CeremonyParameters { power })
    }

    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn domain_size(&self) -> u64 {
        1u64 << self.power
    }

    pub fn element_count(&self, group: PointGroup) -> u64 {
        match group {
            PointGroup::TauG1 => self.domain_size() * 2 - 1,
            PointGroup::BetaG2 => 1,
            _ => self.domain_size(),
        }
    }

    /// Exact byte length of a response: the previous hash, the compressed
    /// groups and the uncompressed key block.
    pub fn response_size(&self, sizes: &PointSizes) -> u64 {
        let points: u64 = PointGroup::ALL
            .iter()
            .map(|group| self.element_count(*group) * sizes.compressed(group.curve()))
            .sum();
        DIGEST_BYTES as u64 + points + sizes.key_block()
    }

    pub fn validate_response_size(&self, actual: u64, sizes: &PointSizes) -> Result<()> {
        let expected = self.response_size(sizes);
        if actual != expected {
            return Err(ImportError::MalformedResponse { expected, actual });
        }
        Ok(())
    }
}
