//! Checks that a response builds on the transcript it is imported into.

use tracing::warn;

use crate::contribution::Ledger;
use crate::engine::CurveEngine;
use crate::error::{ImportError, Result};
use crate::hash::{Digest512, NextChallenge};

/// Whether the previous hash declared by a response is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPolicy {
    Verify,
    /// No-origin imports have nothing to check against.
    Skip,
}

/// How the link between the ledger and a response was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainCheck {
    /// The declared hash equals the expected challenge.
    Verified,
    /// The last contribution had a pending challenge; the declared hash was
    /// taken as its value.
    Backfilled,
    /// Nothing was compared. The resulting transcript does not prove it
    /// continues any earlier ceremony state.
    Skipped,
}

/// Verifies the declared previous hash of a response against the ledger.
///
/// The expected value is the challenge left by the last contribution, or
/// `first_challenge()` when the ledger is empty. A pending challenge is
/// resolved with the declared hash rather than compared.
pub fn verify_chain_link<E, F>(
    ledger: &mut Ledger<E>,
    policy: ChainPolicy,
    declared: &Digest512,
    first_challenge: F,
) -> Result<ChainCheck>
where
    E: CurveEngine,
    F: FnOnce() -> Digest512,
{
    if policy == ChainPolicy::Skip {
        warn!("importing without an origin transcript, the hash chain is not verified");
        return Ok(ChainCheck::Skipped);
    }

    let expected = match ledger.last().map(|last| last.next_challenge) {
        None => first_challenge(),
        Some(NextChallenge::Pending) => {
            warn!("last contribution has no challenge hash, taking it from the response");
            ledger.resolve_pending_challenge(*declared)?;
            return Ok(ChainCheck::Backfilled);
        }
        Some(NextChallenge::Computed(digest)) => digest,
    };

    if expected != *declared {
        return Err(ImportError::ChainMismatch {
            expected,
            declared: *declared,
        });
    }
    Ok(ChainCheck::Verified)
}
