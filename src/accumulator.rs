use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::binfile::BinFileWriter;
use crate::contribution::Ledger;
use crate::engine::{CurveEngine, GroupCodec};
use crate::error::Result;
use crate::hash::{first_challenge_hash, Digest512};
use crate::parameters::{CeremonyParameters, Curve, PointGroup};
use crate::serialisation::write_contributions;
use crate::transcript::{write_header, PtauHeader, FULL_SECTIONS, PTAU_TAG, PTAU_VERSION};

// Generators written per call.
const GENERATOR_BLOCK: u64 = 1 << 14;

// Creates the transcript a ceremony starts from: every point is the group
// generator and nobody has contributed yet.
//
// Returns the challenge hash the first response must declare.
pub fn new_accumulator<E: CurveEngine>(engine: &E, power: u32, path: &Path) -> Result<Digest512> {
    let params = CeremonyParameters::new(power)?;
    let g1 = montgomery_generator(engine.g1());
    let g2 = montgomery_generator(engine.g2());

    let mut writer = BinFileWriter::create(path, PTAU_TAG, PTAU_VERSION, FULL_SECTIONS)?;
    write_header(&mut writer, &PtauHeader::new(engine, power))?;

    for group in PointGroup::ALL {
        let record = match group.curve() {
            Curve::G1 => &g1,
            Curve::G2 => &g2,
        };
        debug!("Writing {}", group.name());
        writer.start_section(group.section_id())?;
        write_repeated(&mut writer, record, params.element_count(group))?;
        writer.end_section()?;
    }

    write_contributions(&mut writer, engine, &Ledger::new())?;
    writer.close()?;

    let challenge = first_challenge_hash(engine, params);
    info!("First Contribution Hash: \n{}", challenge);
    Ok(challenge)
}

fn montgomery_generator<G: GroupCodec>(codec: &G) -> Vec<u8> {
    let mut out = vec![0u8; codec.uncompressed_size()];
    codec.write_montgomery(&codec.generator(), &mut out);
    out
}

fn write_repeated(writer: &mut BinFileWriter, record: &[u8], count: u64) -> Result<()> {
    let block = record.repeat(count.min(GENERATOR_BLOCK) as usize);
    for _ in 0..count / GENERATOR_BLOCK {
        writer.write_all(&block)?;
    }
    for _ in 0..count % GENERATOR_BLOCK {
        writer.write_all(record)?;
    }
    Ok(())
}
