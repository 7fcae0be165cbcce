use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::binfile::{BinFileReader, BinFileWriter};
use crate::contribution::{Contribution, ContributionKind, Ledger, PartialHash, PARTIAL_HASH_BYTES};
use crate::engine::{CurveEngine, GroupCodec};
use crate::error::{ImportError, Result};
use crate::hash::{NextChallenge, DIGEST_BYTES};
use crate::keypair::{KeyEncoding, PublicKey};

pub const CONTRIBUTIONS_SECTION: u32 = 7;

// Parameter tags of a ledger entry, written in increasing order.
const PARAM_NAME: u8 = 1;
const PARAM_ITERATIONS_EXP: u8 = 2;
const PARAM_BEACON_HASH: u8 = 3;

const MAX_NAME_CHARS: usize = 64;

/// Writes the full ledger as the contributions section.
pub fn write_contributions<E: CurveEngine>(
    writer: &mut BinFileWriter,
    engine: &E,
    ledger: &Ledger<E>,
) -> Result<()> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(ledger.len() as u32).to_le_bytes());
    for contribution in ledger {
        encode_contribution(engine, contribution, &mut bytes);
    }

    writer.start_section(CONTRIBUTIONS_SECTION)?;
    writer.write_all(&bytes)?;
    writer.end_section()
}

pub fn read_contributions<E: CurveEngine>(reader: &mut BinFileReader, engine: &E) -> Result<Ledger<E>> {
    let section = reader.start_read_section(CONTRIBUTIONS_SECTION)?;
    let bytes = reader.read_vec(section.size as usize)?;
    reader.end_read_section(section)?;

    decode_ledger(engine, &bytes)
}

fn decode_ledger<E: CurveEngine>(engine: &E, bytes: &[u8]) -> Result<Ledger<E>> {
    let mut cursor = std::io::Cursor::new(bytes);
    let count = read_u32(&mut cursor)?;

    let mut contributions = Vec::new();
    for _ in 0..count {
        contributions.push(decode_contribution(engine, &mut cursor)?);
    }
    if cursor.position() != bytes.len() as u64 {
        return Err(invalid("trailing bytes after the last contribution"));
    }

    Ok(Ledger::from_contributions(contributions))
}

fn encode_contribution<E: CurveEngine>(engine: &E, contribution: &Contribution<E>, bytes: &mut Vec<u8>) {
    put_point(engine.g1(), &contribution.tau_g1, bytes);
    put_point(engine.g2(), &contribution.tau_g2, bytes);
    put_point(engine.g1(), &contribution.alpha_g1, bytes);
    put_point(engine.g1(), &contribution.beta_g1, bytes);
    put_point(engine.g2(), &contribution.beta_g2, bytes);
    contribution.key.write(engine, KeyEncoding::Montgomery, bytes);
    bytes.extend_from_slice(&contribution.partial_hash.to_bytes());
    bytes.extend_from_slice(&contribution.next_challenge.to_bytes());
    bytes.extend_from_slice(&contribution.kind.type_id().to_le_bytes());

    let mut params = Vec::new();
    if let Some(name) = &contribution.name {
        let name = truncate_name(name);
        params.push(PARAM_NAME);
        params.push(name.len() as u8);
        params.extend_from_slice(name.as_bytes());
    }
    if let ContributionKind::Beacon {
        num_iterations_exp,
        beacon_hash,
    } = &contribution.kind
    {
        params.push(PARAM_ITERATIONS_EXP);
        params.push(*num_iterations_exp);
        params.push(PARAM_BEACON_HASH);
        params.push(beacon_hash.len() as u8);
        params.extend_from_slice(beacon_hash);
    }
    bytes.extend_from_slice(&(params.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&params);
}

fn decode_contribution<E: CurveEngine>(
    engine: &E,
    cursor: &mut std::io::Cursor<&[u8]>,
) -> Result<Contribution<E>> {
    let tau_g1 = get_point(engine.g1(), cursor)?;
    let tau_g2 = get_point(engine.g2(), cursor)?;
    let alpha_g1 = get_point(engine.g1(), cursor)?;
    let beta_g1 = get_point(engine.g1(), cursor)?;
    let beta_g2 = get_point(engine.g2(), cursor)?;

    let key_bytes = read_bytes(cursor, PublicKey::encoded_size(engine))?;
    let key = PublicKey::read(engine, &key_bytes, KeyEncoding::Montgomery)?;

    let mut partial_hash = [0u8; PARTIAL_HASH_BYTES];
    cursor.read_exact(&mut partial_hash)?;
    let mut next_challenge = [0u8; DIGEST_BYTES];
    cursor.read_exact(&mut next_challenge)?;
    let type_id = read_u32(cursor)?;

    let params_len = read_u32(cursor)? as usize;
    let params = read_bytes(cursor, params_len)?;
    let mut params = params.as_slice();

    let mut name = None;
    let mut num_iterations_exp = None;
    let mut beacon_hash = None;
    let mut last_tag = 0u8;
    while let Some((&tag, rest)) = params.split_first() {
        if tag <= last_tag {
            return Err(invalid("parameters in the contribution must be sorted"));
        }
        last_tag = tag;
        match tag {
            PARAM_NAME => {
                let (value, rest) = length_prefixed(rest)?;
                let value = String::from_utf8(value.to_vec())
                    .map_err(|_| invalid("contribution name is not utf-8"))?;
                name = Some(value);
                params = rest;
            }
            PARAM_ITERATIONS_EXP => {
                let (&exp, rest) = rest
                    .split_first()
                    .ok_or_else(|| invalid("truncated iteration exponent"))?;
                num_iterations_exp = Some(exp);
                params = rest;
            }
            PARAM_BEACON_HASH => {
                let (value, rest) = length_prefixed(rest)?;
                beacon_hash = Some(value.to_vec());
                params = rest;
            }
            other => return Err(invalid(&format!("parameter {} not recognized", other))),
        }
    }

    let kind = match type_id {
        0 => ContributionKind::Response,
        1 => ContributionKind::Beacon {
            num_iterations_exp: num_iterations_exp
                .ok_or_else(|| invalid("beacon contribution without iteration exponent"))?,
            beacon_hash: beacon_hash
                .ok_or_else(|| invalid("beacon contribution without beacon hash"))?,
        },
        other => return Err(invalid(&format!("unknown contribution type {}", other))),
    };

    Ok(Contribution {
        name,
        tau_g1,
        tau_g2,
        alpha_g1,
        beta_g1,
        beta_g2,
        key,
        partial_hash: PartialHash::from_bytes(partial_hash),
        next_challenge: NextChallenge::from_bytes(next_challenge),
        kind,
    })
}

// At most 64 characters, and short enough for its one-byte length prefix.
pub(crate) fn truncate_name(name: &str) -> &str {
    let mut end = name
        .char_indices()
        .nth(MAX_NAME_CHARS)
        .map_or(name.len(), |(index, _)| index);
    while end > u8::MAX as usize {
        end -= 1;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
    }
    &name[..end]
}

fn put_point<G: GroupCodec>(codec: &G, point: &G::Point, bytes: &mut Vec<u8>) {
    let start = bytes.len();
    bytes.resize(start + codec.uncompressed_size(), 0);
    codec.write_montgomery(point, &mut bytes[start..]);
}

fn get_point<G: GroupCodec>(codec: &G, cursor: &mut std::io::Cursor<&[u8]>) -> Result<G::Point> {
    let bytes = read_bytes(cursor, codec.uncompressed_size())?;
    Ok(codec.read_montgomery(&bytes)?)
}

fn read_bytes(cursor: &mut std::io::Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    cursor
        .read_exact(&mut bytes)
        .map_err(|_| invalid("truncated contribution"))?;
    Ok(bytes)
}

fn read_u32(cursor: &mut std::io::Cursor<&[u8]>) -> Result<u32> {
    let mut bytes = [0u8; 4];
    cursor
        .read_exact(&mut bytes)
        .map_err(|_| invalid("truncated contribution"))?;
    Ok(u32::from_le_bytes(bytes))
}

fn length_prefixed(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    let (&len, rest) = bytes
        .split_first()
        .ok_or_else(|| invalid("truncated parameter"))?;
    if rest.len() < len as usize {
        return Err(invalid("truncated parameter"));
    }
    Ok(rest.split_at(len as usize))
}

fn invalid(reason: &str) -> ImportError {
    ImportError::InvalidTranscript(reason.to_string())
}

/// Hex summary of a ledger entry, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionJson {
    pub name: Option<String>,
    pub kind: String,
    pub tau_g1: String,
    pub tau_g2: String,
    pub alpha_g1: String,
    pub beta_g1: String,
    pub beta_g2: String,
    /// `None` while the challenge is pending.
    pub next_challenge: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerJson {
    pub curve: String,
    pub contributions: Vec<ContributionJson>,
}

impl LedgerJson {
    pub fn new<E: CurveEngine>(engine: &E, ledger: &Ledger<E>) -> Self {
        LedgerJson {
            curve: engine.name().to_string(),
            contributions: ledger
                .iter()
                .map(|contribution| ContributionJson::new(engine, contribution))
                .collect(),
        }
    }
}

impl ContributionJson {
    pub fn new<E: CurveEngine>(engine: &E, contribution: &Contribution<E>) -> Self {
        ContributionJson {
            name: contribution.name.clone(),
            kind: match contribution.kind {
                ContributionKind::Response => "response".to_string(),
                ContributionKind::Beacon { .. } => "beacon".to_string(),
            },
            tau_g1: point_hex(engine.g1(), &contribution.tau_g1),
            tau_g2: point_hex(engine.g2(), &contribution.tau_g2),
            alpha_g1: point_hex(engine.g1(), &contribution.alpha_g1),
            beta_g1: point_hex(engine.g1(), &contribution.beta_g1),
            beta_g2: point_hex(engine.g2(), &contribution.beta_g2),
            next_challenge: contribution
                .next_challenge
                .digest()
                .map(|digest| format!("0x{}", digest.to_hex())),
        }
    }
}

fn point_hex<G: GroupCodec>(codec: &G, point: &G::Point) -> String {
    let mut bytes = vec![0u8; codec.uncompressed_size()];
    codec.write_uncompressed(point, &mut bytes);
    format!("0x{}", hex::encode(bytes))
}
