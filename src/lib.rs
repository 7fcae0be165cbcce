//! Import of Powers of Tau responses into ptau transcripts.
//!
//! A response is checked against the hash chain of the transcript it builds
//! on, streamed into a new transcript in bounded chunks, and recorded as a new
//! ledger entry together with the challenge hash the next contributor must
//! declare.

pub mod accumulator;
pub mod binfile;
pub mod ceremony;
pub mod config;
pub mod contribution;
pub mod engine;
pub mod error;
pub mod hash;
pub mod import;
pub mod keypair;
pub mod parameters;
pub mod serialisation;
pub mod transcript;

pub use accumulator::new_accumulator;
pub use ceremony::{ChainCheck, ChainPolicy};
pub use config::ImportOptions;
pub use error::{ImportError, Result};
pub use hash::{Digest512, NextChallenge};
pub use import::{import_response, import_response_no_origin, import_response_with, ImportOutcome};
