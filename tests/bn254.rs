use ark_ec::{AffineCurve, ProjectiveCurve};
use blake2::{Blake2b512, Digest};
use ptau_import::engine::{Bls12_381, Bn254, CurveEngine, G1Point, G2Point, GroupCodec};
use ptau_import::parameters::{CeremonyParameters, Curve, PointGroup};
use ptau_import::transcript::Transcript;
use ptau_import::{
    import_response, new_accumulator, ChainCheck, Digest512, ImportError, ImportOptions,
    NextChallenge,
};
use tempfile::TempDir;

// Scalar of the `index`th point of `group`.
fn scalar(group: PointGroup, index: u64) -> u64 {
    1 + 100 * group.index() as u64 + index
}

fn put<G: GroupCodec>(codec: &G, point: &G::Point, compressed: bool, out: &mut Vec<u8>) {
    let start = out.len();
    if compressed {
        out.resize(start + codec.compressed_size(), 0);
        codec.write_compressed(point, &mut out[start..]);
    } else {
        out.resize(start + codec.uncompressed_size(), 0);
        codec.write_uncompressed(point, &mut out[start..]);
    }
}

// Returns the response and the uncompressed points the next challenge covers.
fn build_response<E: CurveEngine>(
    engine: &E,
    power: u32,
    previous: &Digest512,
    g1: impl Fn(u64) -> G1Point<E>,
    g2: impl Fn(u64) -> G2Point<E>,
) -> (Vec<u8>, Vec<u8>) {
    let params = CeremonyParameters::new(power).unwrap();
    let mut response = previous.as_bytes().to_vec();
    let mut hashable = Vec::new();

    for group in PointGroup::ALL {
        for index in 0..params.element_count(group) {
            let k = scalar(group, index);
            match group.curve() {
                Curve::G1 => {
                    put(engine.g1(), &g1(k), true, &mut response);
                    put(engine.g1(), &g1(k), false, &mut hashable);
                }
                Curve::G2 => {
                    put(engine.g2(), &g2(k), true, &mut response);
                    put(engine.g2(), &g2(k), false, &mut hashable);
                }
            }
        }
    }
    for k in 1..=6 {
        put(engine.g1(), &g1(1000 + k), false, &mut response);
    }
    for k in 1..=3 {
        put(engine.g2(), &g2(2000 + k), false, &mut response);
    }
    (response, hashable)
}

fn expected_challenge(response: &[u8], hashable: &[u8]) -> Digest512 {
    let response_hash = Digest512::from_hasher(Blake2b512::new().chain_update(response));
    Digest512::from_hasher(
        Blake2b512::new()
            .chain_update(response_hash.as_bytes())
            .chain_update(hashable),
    )
}

fn bn254_g1(k: u64) -> ark_bn254::G1Affine {
    ark_bn254::G1Affine::prime_subgroup_generator()
        .mul(k)
        .into_affine()
}

fn bn254_g2(k: u64) -> ark_bn254::G2Affine {
    ark_bn254::G2Affine::prime_subgroup_generator()
        .mul(k)
        .into_affine()
}

#[test]
fn bn254_response_is_imported_by_header_curve() {
    let dir = TempDir::new().unwrap();
    let engine = Bn254::default();
    let origin = dir.path().join("pot_0000.ptau");
    let first = new_accumulator(&engine, 2, &origin).unwrap();

    let (response, hashable) = build_response(&engine, 2, &first, bn254_g1, bn254_g2);
    let response_path = dir.path().join("response_0001");
    std::fs::write(&response_path, &response).unwrap();
    let new = dir.path().join("pot_0001.ptau");

    let outcome = import_response(&origin, &response_path, &new, &ImportOptions::default()).unwrap();
    assert_eq!(outcome.chain, ChainCheck::Verified);
    assert_eq!(outcome.contributions.curve, "bn128");
    assert_eq!(
        outcome.next_challenge,
        NextChallenge::Computed(expected_challenge(&response, &hashable))
    );

    let mut transcript = Transcript::open(&engine, &new).unwrap();
    let tau_g1 = transcript.g1_points(PointGroup::TauG1).unwrap();
    let expected: Vec<_> = (0..7).map(|i| bn254_g1(scalar(PointGroup::TauG1, i))).collect();
    assert_eq!(tau_g1, expected);
    let beta_g2 = transcript.g2_points(PointGroup::BetaG2).unwrap();
    assert_eq!(beta_g2, vec![bn254_g2(scalar(PointGroup::BetaG2, 0))]);

    let contribution = transcript.ledger().last().unwrap();
    assert_eq!(contribution.tau_g1, bn254_g1(scalar(PointGroup::TauG1, 1)));
    assert_eq!(contribution.tau_g2, bn254_g2(scalar(PointGroup::TauG2, 1)));
    assert_eq!(contribution.alpha_g1, bn254_g1(scalar(PointGroup::AlphaG1, 0)));
    assert_eq!(contribution.key.alpha.g1_s, bn254_g1(1003));
    assert_eq!(contribution.key.beta.g2_spx, bn254_g2(2003));
}

#[test]
fn bls12_381_response_is_imported_by_header_curve() {
    let dir = TempDir::new().unwrap();
    let engine = Bls12_381::default();
    let origin = dir.path().join("pot_0000.ptau");
    let first = new_accumulator(&engine, 1, &origin).unwrap();

    let g1 = |k: u64| {
        ark_bls12_381::G1Affine::prime_subgroup_generator()
            .mul(k)
            .into_affine()
    };
    let g2 = |k: u64| {
        ark_bls12_381::G2Affine::prime_subgroup_generator()
            .mul(k)
            .into_affine()
    };
    let (response, hashable) = build_response(&engine, 1, &first, g1, g2);
    let response_path = dir.path().join("response_0001");
    std::fs::write(&response_path, &response).unwrap();
    let new = dir.path().join("pot_0001.ptau");

    let outcome = import_response(&origin, &response_path, &new, &ImportOptions::default()).unwrap();
    assert_eq!(outcome.contributions.curve, "bls12381");
    assert_eq!(
        outcome.next_challenge,
        NextChallenge::Computed(expected_challenge(&response, &hashable))
    );

    let transcript = Transcript::open(&engine, &new).unwrap();
    assert_eq!(
        transcript.ledger().last().unwrap().beta_g2,
        g2(scalar(PointGroup::BetaG2, 0))
    );
}

#[test]
fn non_canonical_points_abort_the_import() {
    let dir = TempDir::new().unwrap();
    let engine = Bn254::default();
    let origin = dir.path().join("pot_0000.ptau");
    let first = new_accumulator(&engine, 1, &origin).unwrap();

    let (mut response, _) = build_response(&engine, 1, &first, bn254_g1, bn254_g2);
    // x of the first tauG1 point, above the modulus
    response[64..96].copy_from_slice(&[0x3F; 32]);
    let response_path = dir.path().join("response_0001");
    std::fs::write(&response_path, &response).unwrap();
    let new = dir.path().join("pot_0001.ptau");

    for options in [ImportOptions::default(), ImportOptions::default().metadata_only()] {
        let result = import_response(&origin, &response_path, &new, &options);
        if options.materialize_points {
            assert!(matches!(result, Err(ImportError::Codec(_))));
        } else {
            // only the contributed points are decoded without materializing
            assert!(result.is_ok());
            std::fs::remove_file(&new).unwrap();
        }
    }
    assert!(!new.exists());
}
