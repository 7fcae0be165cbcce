use crate::engine::{CurveEngine, G1Point, G2Point};
use crate::error::{ImportError, Result};
use crate::hash::{Digest512, NextChallenge, DIGEST_BYTES};
use crate::keypair::PublicKey;

pub const PARTIAL_HASH_BYTES: usize = 216;

/// The hasher-state field of a ledger entry.
///
/// Ledgers reserve 216 bytes for the response hasher state taken just before
/// the key block. Entries imported here only know the BLAKE2b-512 digest of
/// that prefix, which cannot resume hashing. On disk it takes the first 64
/// bytes and the rest is zero; a field with that shape reads back as
/// `PrefixDigest`. Anything else is carried through untouched.
#[derive(Clone, PartialEq, Eq)]
pub enum PartialHash {
    Carried([u8; PARTIAL_HASH_BYTES]),
    PrefixDigest(Digest512),
}

impl PartialHash {
    pub fn from_prefix_digest(digest: Digest512) -> Self {
        PartialHash::PrefixDigest(digest)
    }

    pub fn from_bytes(bytes: [u8; PARTIAL_HASH_BYTES]) -> Self {
        if bytes[DIGEST_BYTES..].iter().all(|b| *b == 0) {
            let mut digest = [0u8; DIGEST_BYTES];
            digest.copy_from_slice(&bytes[..DIGEST_BYTES]);
            PartialHash::PrefixDigest(Digest512(digest))
        } else {
            PartialHash::Carried(bytes)
        }
    }

    pub fn to_bytes(&self) -> [u8; PARTIAL_HASH_BYTES] {
        match self {
            PartialHash::Carried(bytes) => *bytes,
            PartialHash::PrefixDigest(digest) => {
                let mut bytes = [0u8; PARTIAL_HASH_BYTES];
                bytes[..DIGEST_BYTES].copy_from_slice(digest.as_bytes());
                bytes
            }
        }
    }

    /// The prefix digest, when this entry does not carry a resumable state.
    pub fn prefix_digest(&self) -> Option<&Digest512> {
        match self {
            PartialHash::Carried(_) => None,
            PartialHash::PrefixDigest(digest) => Some(digest),
        }
    }
}

impl std::fmt::Debug for PartialHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartialHash::Carried(bytes) => write!(f, "Carried(0x{}..)", hex::encode(&bytes[..8])),
            PartialHash::PrefixDigest(digest) => write!(f, "PrefixDigest({:?})", digest),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributionKind {
    /// A participant's response, the only kind this crate creates.
    Response,
    /// A random beacon applied by the coordinator.
    Beacon {
        num_iterations_exp: u8,
        beacon_hash: Vec<u8>,
    },
}

impl ContributionKind {
    pub fn type_id(&self) -> u32 {
        match self {
            ContributionKind::Response => 0,
            ContributionKind::Beacon { .. } => 1,
        }
    }
}

/// One entry of the ceremony ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution<E: CurveEngine> {
    pub name: Option<String>,
    pub tau_g1: G1Point<E>,
    pub tau_g2: G2Point<E>,
    pub alpha_g1: G1Point<E>,
    pub beta_g1: G1Point<E>,
    pub beta_g2: G2Point<E>,
    pub key: PublicKey<E>,
    pub partial_hash: PartialHash,
    pub next_challenge: NextChallenge,
    pub kind: ContributionKind,
}

/// The ordered list of contributions recorded in a transcript.
///
/// Entries are append-only, with one exception: the challenge of the last
/// entry may be resolved once if it is still pending, see
/// [`Ledger::resolve_pending_challenge`].
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger<E: CurveEngine> {
    contributions: Vec<Contribution<E>>,
}

impl<E: CurveEngine> Default for Ledger<E> {
    fn default() -> Self {
        Ledger {
            contributions: Vec::new(),
        }
    }
}

impl<E: CurveEngine> Ledger<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_contributions(contributions: Vec<Contribution<E>>) -> Self {
        Ledger { contributions }
    }

    pub fn push(&mut self, contribution: Contribution<E>) {
        self.contributions.push(contribution)
    }

    pub fn last(&self) -> Option<&Contribution<E>> {
        self.contributions.last()
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Contribution<E>> {
        self.contributions.iter()
    }

    pub fn contributions(&self) -> &[Contribution<E>] {
        &self.contributions
    }

    /// Fills in the challenge of the last contribution with the previous hash
    /// declared by the response that builds on it.
    ///
    /// Precondition: the ledger is non-empty and its last challenge is
    /// pending. Otherwise nothing changes and `NoPendingChallenge` is returned.
    pub fn resolve_pending_challenge(&mut self, provided: Digest512) -> Result<()> {
        match self.contributions.last_mut() {
            Some(last) if last.next_challenge.is_pending() => {
                last.next_challenge = NextChallenge::Computed(provided);
                Ok(())
            }
            _ => Err(ImportError::NoPendingChallenge),
        }
    }
}

impl<'a, E: CurveEngine> IntoIterator for &'a Ledger<E> {
    type Item = &'a Contribution<E>;
    type IntoIter = std::slice::Iter<'a, Contribution<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
