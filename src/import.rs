//! Importing a contributor's response into a ptau transcript.
//!
//! A response is consumed as a single forward stream: the previous hash, the
//! five compressed point groups and the uncompressed key block. Every byte
//! goes through the response hasher exactly once, in file order. Points are
//! held in memory one chunk at a time, with chunks sized from
//! [`ImportOptions::chunk_budget`].

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use blake2::{Blake2b512, Digest};
use tracing::{debug, info, warn};

use crate::binfile::BinFileWriter;
use crate::ceremony::{verify_chain_link, ChainCheck, ChainPolicy};
use crate::config::ImportOptions;
use crate::contribution::{Contribution, ContributionKind, Ledger, PartialHash};
use crate::engine::{BuiltinCurve, Bls12_381, Bn254, CodecError, CurveEngine, GroupCodec};
use crate::error::{ImportError, Result};
use crate::hash::{first_challenge_hash, Digest512, NextChallenge, DIGEST_BYTES};
use crate::keypair::{KeyEncoding, PublicKey};
use crate::parameters::{CeremonyParameters, Curve, PointGroup, PointSizes};
use crate::serialisation::{truncate_name, write_contributions, LedgerJson};
use crate::transcript::{
    peek_header, write_header, PtauHeader, Transcript, FULL_SECTIONS, METADATA_SECTIONS, PTAU_TAG,
    PTAU_VERSION,
};

/// What an import produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    /// The challenge the next contributor must build on. `Pending` after a
    /// metadata-only import.
    pub next_challenge: NextChallenge,
    /// BLAKE2b-512 of the whole response file.
    pub response_hash: Digest512,
    pub chain: ChainCheck,
    /// The ledger as written to the new transcript.
    pub contributions: LedgerJson,
}

/// Imports `response` on top of the transcript at `existing`, writing the
/// result to `new`. The curve is taken from the transcript header.
pub fn import_response(
    existing: &Path,
    response: &Path,
    new: &Path,
    options: &ImportOptions,
) -> Result<ImportOutcome> {
    let header = peek_header(existing)?;
    match BuiltinCurve::from_modulus(&header.modulus).ok_or(ImportError::UnsupportedCurve)? {
        BuiltinCurve::Bn254 => import_response_with(&Bn254::default(), existing, response, new, options),
        BuiltinCurve::Bls12_381 => {
            import_response_with(&Bls12_381::default(), existing, response, new, options)
        }
    }
}

/// Like [`import_response`], for a caller-supplied curve engine.
pub fn import_response_with<E: CurveEngine>(
    engine: &E,
    existing: &Path,
    response: &Path,
    new: &Path,
    options: &ImportOptions,
) -> Result<ImportOutcome> {
    ensure_distinct(new, &[existing, response])?;

    let transcript = Transcript::open(engine, existing)?;
    let header = transcript.header().clone();
    let ledger = transcript.into_ledger();

    run_import(engine, header, ledger, ChainPolicy::Verify, response, new, options)
}

/// Imports a response with no transcript to build on.
///
/// The declared previous hash is not checked against anything, so the new
/// transcript proves nothing about what came before the response. Its ledger
/// holds exactly the imported contribution and the outcome reports
/// [`ChainCheck::Skipped`].
pub fn import_response_no_origin<E: CurveEngine>(
    engine: &E,
    power: u32,
    response: &Path,
    new: &Path,
    options: &ImportOptions,
) -> Result<ImportOutcome> {
    ensure_distinct(new, &[response])?;
    CeremonyParameters::new(power)?;

    let header = PtauHeader::new(engine, power);
    run_import(engine, header, Ledger::new(), ChainPolicy::Skip, response, new, options)
}

fn run_import<E: CurveEngine>(
    engine: &E,
    header: PtauHeader,
    mut ledger: Ledger<E>,
    policy: ChainPolicy,
    response_path: &Path,
    new_path: &Path,
    options: &ImportOptions,
) -> Result<ImportOutcome> {
    let params = CeremonyParameters::new(header.power)?;

    let file = File::open(response_path)?;
    params.validate_response_size(file.metadata()?.len(), &PointSizes::of(engine))?;
    let mut response = BufReader::new(file);

    let mut previous = [0u8; DIGEST_BYTES];
    response.read_exact(&mut previous)?;
    let mut response_hasher = Blake2b512::new();
    response_hasher.update(previous);

    let chain = verify_chain_link(&mut ledger, policy, &Digest512(previous), || {
        first_challenge_hash(engine, params)
    })?;

    let n_sections = if options.materialize_points {
        FULL_SECTIONS
    } else {
        METADATA_SECTIONS
    };
    let output = BinFileWriter::create(new_path, PTAU_TAG, PTAU_VERSION, n_sections)?;

    let session = ImportSession {
        engine,
        params,
        response,
        output,
        response_hasher,
        section_starts: [None; 5],
        materialize: options.materialize_points,
        chunk_budget: options.chunk_budget,
    };
    let name = options.name.as_deref().map(|name| truncate_name(name).to_string());

    match session.run(&header, ledger, name) {
        Ok((ledger, response_hash, next_challenge)) => Ok(ImportOutcome {
            next_challenge,
            response_hash,
            chain,
            contributions: LedgerJson::new(engine, &ledger),
        }),
        Err(err) => {
            if let Err(cleanup) = std::fs::remove_file(new_path) {
                warn!(
                    "could not remove partial transcript {}: {}",
                    new_path.display(),
                    cleanup
                );
            }
            Err(err)
        }
    }
}

// State of one import once the output transcript exists.
struct ImportSession<'a, E: CurveEngine> {
    engine: &'a E,
    params: CeremonyParameters,
    response: BufReader<File>,
    output: BinFileWriter,
    response_hasher: Blake2b512,
    // where each point section starts in the output, indexed by group
    section_starts: [Option<u64>; 5],
    materialize: bool,
    chunk_budget: usize,
}

impl<'a, E: CurveEngine> ImportSession<'a, E> {
    fn run(
        mut self,
        header: &PtauHeader,
        mut ledger: Ledger<E>,
        name: Option<String>,
    ) -> Result<(Ledger<E>, Digest512, NextChallenge)> {
        let engine = self.engine;
        write_header(&mut self.output, header)?;

        let tau_g1 = self.stream_section(engine.g1(), PointGroup::TauG1)?;
        let tau_g2 = self.stream_section(engine.g2(), PointGroup::TauG2)?;
        let alpha_g1 = self.stream_section(engine.g1(), PointGroup::AlphaG1)?;
        let beta_g1 = self.stream_section(engine.g1(), PointGroup::BetaG1)?;
        let beta_g2 = self.stream_section(engine.g2(), PointGroup::BetaG2)?;

        let (partial_hash, key) = self.read_key_block()?;
        let response_hash = Digest512::from_hasher(self.response_hasher.clone());
        info!("Contribution Response Hash imported: \n{}", response_hash);

        let next_challenge = if self.materialize {
            let digest = self.next_challenge_hash(&response_hash)?;
            info!("Next Challenge Hash: \n{}", digest);
            NextChallenge::Computed(digest)
        } else {
            NextChallenge::Pending
        };

        ledger.push(Contribution {
            name,
            tau_g1,
            tau_g2,
            alpha_g1,
            beta_g1,
            beta_g2,
            key,
            partial_hash,
            next_challenge,
            kind: ContributionKind::Response,
        });
        write_contributions(&mut self.output, engine, &ledger)?;
        self.output.close()?;

        Ok((ledger, response_hash, next_challenge))
    }

    fn stream_section<G: GroupCodec>(&mut self, codec: &G, group: PointGroup) -> Result<G::Point> {
        let count = self.params.element_count(group);
        let sink: Option<&mut dyn Write> = if self.materialize {
            self.output.start_section(group.section_id())?;
            self.section_starts[group.index()] = Some(self.output.position());
            Some(&mut self.output)
        } else {
            None
        };

        let mut singular = stream_points(
            codec,
            group.name(),
            count,
            group.singular_indexes(),
            &mut self.response,
            &mut self.response_hasher,
            sink,
            self.chunk_budget,
        )?;

        if self.materialize {
            self.output.end_section()?;
        }
        singular.pop().ok_or_else(|| {
            ImportError::InvalidTranscript(format!("{} has no contributed point", group.name()))
        })
    }

    // Returns the hasher state in front of the key block along with the key.
    fn read_key_block(&mut self) -> Result<(PartialHash, PublicKey<E>)> {
        let partial_hash =
            PartialHash::from_prefix_digest(Digest512::from_hasher(self.response_hasher.clone()));

        let mut bytes = vec![0u8; PublicKey::encoded_size(self.engine)];
        self.response.read_exact(&mut bytes)?;
        self.response_hasher.update(&bytes);

        let key = PublicKey::read(self.engine, &bytes, KeyEncoding::Uncompressed)?;
        Ok((partial_hash, key))
    }

    // Hashes the response hash followed by every written section in its
    // uncompressed form. The write cursor is restored afterwards.
    fn next_challenge_hash(&mut self, response_hash: &Digest512) -> Result<Digest512> {
        let engine = self.engine;
        let resume = self.output.position();

        let mut hasher = Blake2b512::new();
        hasher.update(response_hash.as_bytes());
        for group in PointGroup::ALL {
            match group.curve() {
                Curve::G1 => self.hash_section(engine.g1(), group, &mut hasher)?,
                Curve::G2 => self.hash_section(engine.g2(), group, &mut hasher)?,
            }
        }

        self.output.seek(resume)?;
        Ok(Digest512::from_hasher(hasher))
    }

    fn hash_section<G: GroupCodec>(
        &mut self,
        codec: &G,
        group: PointGroup,
        hasher: &mut Blake2b512,
    ) -> Result<()> {
        let start = self.section_starts[group.index()].ok_or_else(|| {
            ImportError::InvalidTranscript(format!("{} section was not written", group.name()))
        })?;
        self.output.seek(start)?;

        let count = self.params.element_count(group);
        let width = codec.uncompressed_size();
        let per_chunk = points_per_chunk(self.chunk_budget, width)?;
        let mut buf = Vec::new();
        let mut done = 0u64;
        while done < count {
            let len = per_chunk.min(count - done);
            debug!("Hashing {}: {}/{}", group.name(), done, count);
            buf.resize(len as usize * width, 0);
            self.output.read_exact(&mut buf)?;
            hasher.update(codec.batch_montgomery_to_uncompressed(&buf)?);
            done += len;
        }
        Ok(())
    }
}

/// Streams `count` compressed points from `source`, hashing the raw bytes.
///
/// With a `sink`, the points are converted to their montgomery form and
/// written there. The points at `singular` indexes are decoded and returned in
/// the order given.
#[allow(clippy::too_many_arguments)]
pub fn stream_points<G: GroupCodec, R: Read>(
    codec: &G,
    label: &str,
    count: u64,
    singular: &[u64],
    source: &mut R,
    hasher: &mut Blake2b512,
    mut sink: Option<&mut dyn Write>,
    chunk_budget: usize,
) -> Result<Vec<G::Point>> {
    let compressed = codec.compressed_size();
    let canonical = codec.uncompressed_size();
    if compressed == 0 || canonical == 0 {
        return Err(CodecError::ZeroWidth.into());
    }
    let width = if sink.is_some() { canonical } else { compressed };
    let per_chunk = points_per_chunk(chunk_budget, width)?;

    let mut found: Vec<Option<G::Point>> = vec![None; singular.len()];
    let mut buf = Vec::new();
    let mut start = 0u64;
    while start < count {
        let len = per_chunk.min(count - start);
        debug!("Importing {}: {}/{}", label, start, count);

        buf.resize(len as usize * compressed, 0);
        source.read_exact(&mut buf)?;
        hasher.update(&buf);

        let converted = match sink.as_deref_mut() {
            Some(out) => {
                let converted = codec.batch_compressed_to_montgomery(&buf)?;
                out.write_all(&converted)?;
                Some(converted)
            }
            None => None,
        };

        for (slot, &index) in found.iter_mut().zip(singular) {
            if !chunk_contains(start, len, index) {
                continue;
            }
            let offset = (index - start) as usize;
            let point = match &converted {
                Some(converted) => {
                    codec.read_montgomery(&converted[offset * canonical..(offset + 1) * canonical])?
                }
                None => codec.read_compressed(&buf[offset * compressed..(offset + 1) * compressed])?,
            };
            *slot = Some(point);
        }
        start += len;
    }

    found
        .into_iter()
        .zip(singular)
        .map(|(point, index)| {
            point.ok_or_else(|| {
                ImportError::InvalidTranscript(format!("{} has no element {}", label, index))
            })
        })
        .collect()
}

fn points_per_chunk(chunk_budget: usize, width: usize) -> std::result::Result<u64, CodecError> {
    if width == 0 {
        return Err(CodecError::ZeroWidth);
    }
    Ok(std::cmp::max(1, chunk_budget / width) as u64)
}

// Half-open: a chunk covers `start..start + len`.
fn chunk_contains(start: u64, len: u64, index: u64) -> bool {
    index >= start && index < start + len
}

// The output must not overwrite either input.
fn ensure_distinct(new: &Path, inputs: &[&Path]) -> Result<()> {
    let target = resolve(new)?;
    for input in inputs {
        if resolve(input)? == target {
            return Err(ImportError::OutputAliasesInput(new.to_path_buf()));
        }
    }
    Ok(())
}

fn resolve(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.canonicalize()?);
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.canonicalize()?,
        _ => std::env::current_dir()?,
    };
    Ok(match path.file_name() {
        Some(file_name) => parent.join(file_name),
        None => parent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{Fr, G1Projective};
    use ark_ec::ProjectiveCurve;
    use ark_ff::PrimeField;

    fn g1_points(count: u64) -> Vec<ark_bn254::G1Affine> {
        (1..=count)
            .map(|k| {
                G1Projective::prime_subgroup_generator()
                    .mul(Fr::from(k).into_repr())
                    .into_affine()
            })
            .collect()
    }

    fn compressed(points: &[ark_bn254::G1Affine]) -> Vec<u8> {
        let engine = Bn254::default();
        let mut out = vec![0u8; points.len() * 32];
        for (point, record) in points.iter().zip(out.chunks_mut(32)) {
            engine.g1().write_compressed(point, record);
        }
        out
    }

    fn stream(
        bytes: &[u8],
        count: u64,
        singular: &[u64],
        materialize: bool,
        budget: usize,
    ) -> (Vec<ark_bn254::G1Affine>, Digest512, Vec<u8>) {
        let engine = Bn254::default();
        let mut hasher = Blake2b512::new();
        let mut sink = Vec::new();
        let found = stream_points(
            engine.g1(),
            "tauG1",
            count,
            singular,
            &mut &bytes[..],
            &mut hasher,
            if materialize { Some(&mut sink as &mut dyn Write) } else { None },
            budget,
        )
        .unwrap();
        (found, Digest512::from_hasher(hasher), sink)
    }

    #[test]
    fn half_open_containment() {
        assert!(chunk_contains(0, 1, 0));
        assert!(!chunk_contains(0, 1, 1));
        assert!(chunk_contains(4, 4, 7));
        assert!(!chunk_contains(4, 4, 8));
        assert!(!chunk_contains(4, 4, 3));
    }

    #[test]
    fn chunk_size_never_drops_to_zero() {
        assert_eq!(points_per_chunk(0, 64), Ok(1));
        assert_eq!(points_per_chunk(63, 64), Ok(1));
        assert_eq!(points_per_chunk(1 << 24, 64), Ok(1 << 18));
        assert_eq!(points_per_chunk(1 << 24, 0), Err(CodecError::ZeroWidth));
    }

    #[test]
    fn singular_points_at_chunk_boundaries() {
        let points = g1_points(7);
        let bytes = compressed(&points);
        let first_and_last = [0, 6];
        let reference = Digest512::from_hasher(Blake2b512::new().chain_update(&bytes));

        // one, two and three points per materialized chunk, and a single chunk
        for budget in [64, 128, 192, 1 << 20] {
            let (found, digest, sink) = stream(&bytes, 7, &first_and_last, true, budget);
            assert_eq!(found, vec![points[0], points[6]]);
            assert_eq!(digest, reference);
            assert_eq!(sink.len(), 7 * 64);
        }

        // 2 and 3 fall into different chunks with one and three points per chunk
        for budget in [64, 128, 192] {
            let (found, _, _) = stream(&bytes, 7, &[2, 3], false, budget / 2);
            assert_eq!(found, vec![points[2], points[3]]);
        }
    }

    #[test]
    fn sink_receives_montgomery_points() {
        let engine = Bn254::default();
        let points = g1_points(5);
        let (_, _, sink) = stream(&compressed(&points), 5, &[1], true, 100);

        for (point, record) in points.iter().zip(sink.chunks(64)) {
            assert_eq!(&engine.g1().read_montgomery(record).unwrap(), point);
        }
    }

    // Reports no width at all.
    struct EmptyCodec;

    impl GroupCodec for EmptyCodec {
        type Point = ();

        fn compressed_size(&self) -> usize {
            0
        }
        fn uncompressed_size(&self) -> usize {
            0
        }
        fn generator(&self) -> Self::Point {}
        fn read_compressed(&self, _: &[u8]) -> std::result::Result<(), CodecError> {
            Ok(())
        }
        fn write_compressed(&self, _: &(), _: &mut [u8]) {}
        fn read_uncompressed(&self, _: &[u8]) -> std::result::Result<(), CodecError> {
            Ok(())
        }
        fn write_uncompressed(&self, _: &(), _: &mut [u8]) {}
        fn read_montgomery(&self, _: &[u8]) -> std::result::Result<(), CodecError> {
            Ok(())
        }
        fn write_montgomery(&self, _: &(), _: &mut [u8]) {}
    }

    #[test]
    fn zero_width_codecs_are_rejected() {
        let mut hasher = Blake2b512::new();
        let mut sink = Vec::new();
        for materialize in [false, true] {
            let result = stream_points(
                &EmptyCodec,
                "tauG1",
                4,
                &[1],
                &mut &[][..],
                &mut hasher,
                if materialize { Some(&mut sink as &mut dyn Write) } else { None },
                1 << 20,
            );
            assert!(matches!(result, Err(ImportError::Codec(CodecError::ZeroWidth))));
        }
    }

    #[test]
    fn short_sources_fail() {
        let engine = Bn254::default();
        let bytes = compressed(&g1_points(3));
        let mut hasher = Blake2b512::new();
        let result = stream_points(
            engine.g1(),
            "tauG1",
            4,
            &[1],
            &mut &bytes[..],
            &mut hasher,
            None,
            1 << 20,
        );
        assert!(matches!(result, Err(ImportError::Io(_))));
    }

    #[test]
    fn relative_output_paths_are_resolved() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.ptau");
        std::fs::write(&input, b"ptau").unwrap();

        let aliased = dir.path().join(".").join("in.ptau");
        assert!(matches!(
            ensure_distinct(&aliased, &[&input]),
            Err(ImportError::OutputAliasesInput(_))
        ));
        assert!(ensure_distinct(&dir.path().join("out.ptau"), &[&input]).is_ok());
    }
}
