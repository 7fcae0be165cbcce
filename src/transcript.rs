//! Reading and writing ptau transcripts.

use std::path::Path;

use crate::binfile::{BinFileReader, BinFileWriter};
use crate::contribution::Ledger;
use crate::engine::{CurveEngine, G1Point, G2Point, GroupCodec};
use crate::error::{ImportError, Result};
use crate::parameters::{CeremonyParameters, Curve, PointGroup};
use crate::serialisation::read_contributions;

pub const PTAU_TAG: &[u8; 4] = b"ptau";
pub const PTAU_VERSION: u32 = 1;
pub const HEADER_SECTION: u32 = 1;

// header, five point groups, ledger
pub const FULL_SECTIONS: u32 = 7;
// header, ledger
pub const METADATA_SECTIONS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtauHeader {
    /// Byte width of a base field element.
    pub n8: u32,
    /// Base field modulus, little-endian.
    pub modulus: Vec<u8>,
    pub power: u32,
    pub ceremony_power: u32,
}

impl PtauHeader {
    pub fn new<E: CurveEngine>(engine: &E, power: u32) -> Self {
        let modulus = engine.modulus();
        PtauHeader {
            n8: modulus.len() as u32,
            modulus,
            power,
            ceremony_power: power,
        }
    }

    pub fn ensure_curve<E: CurveEngine>(&self, engine: &E) -> Result<()> {
        if self.modulus != engine.modulus() {
            return Err(ImportError::CurveMismatch {
                expected: engine.name(),
            });
        }
        Ok(())
    }
}

pub fn write_header(writer: &mut BinFileWriter, header: &PtauHeader) -> Result<()> {
    use std::io::Write;

    writer.start_section(HEADER_SECTION)?;
    writer.write_u32(header.n8)?;
    writer.write_all(&header.modulus)?;
    writer.write_u32(header.power)?;
    writer.write_u32(header.ceremony_power)?;
    writer.end_section()
}

pub fn read_header(reader: &mut BinFileReader) -> Result<PtauHeader> {
    let section = reader.start_read_section(HEADER_SECTION)?;
    let n8 = reader.read_u32()?;
    if n8 as u64 + 12 != section.size {
        return Err(ImportError::InvalidTranscript(format!(
            "header of {} bytes cannot hold a {} byte modulus",
            section.size, n8
        )));
    }
    let modulus = reader.read_vec(n8 as usize)?;
    let power = reader.read_u32()?;
    let ceremony_power = reader.read_u32()?;
    reader.end_read_section(section)?;

    Ok(PtauHeader {
        n8,
        modulus,
        power,
        ceremony_power,
    })
}

/// Reads only the header of the transcript at `path`.
pub fn peek_header(path: &Path) -> Result<PtauHeader> {
    let mut reader = BinFileReader::open(path, PTAU_TAG, PTAU_VERSION)?;
    read_header(&mut reader)
}

/// An opened ptau transcript.
///
/// Opening checks the header against the engine and parses the ledger. Point
/// sections are only read on request.
pub struct Transcript<E: CurveEngine> {
    engine: E,
    reader: BinFileReader,
    header: PtauHeader,
    parameters: CeremonyParameters,
    ledger: Ledger<E>,
}

impl<E: CurveEngine> Transcript<E> {
    pub fn open(engine: &E, path: &Path) -> Result<Self> {
        let mut reader = BinFileReader::open(path, PTAU_TAG, PTAU_VERSION)?;
        let header = read_header(&mut reader)?;
        header.ensure_curve(engine)?;
        let parameters = CeremonyParameters::new(header.power)?;
        let ledger = read_contributions(&mut reader, engine)?;

        let transcript = Transcript {
            engine: engine.clone(),
            reader,
            header,
            parameters,
            ledger,
        };
        transcript.check_point_sections()?;
        Ok(transcript)
    }

    pub fn header(&self) -> &PtauHeader {
        &self.header
    }

    pub fn parameters(&self) -> CeremonyParameters {
        self.parameters
    }

    pub fn ledger(&self) -> &Ledger<E> {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger<E> {
        self.ledger
    }

    /// True when the transcript carries all five point sections.
    pub fn is_materialized(&self) -> bool {
        PointGroup::ALL
            .iter()
            .all(|group| self.reader.has_section(group.section_id()))
    }

    /// Raw canonical bytes of one point section.
    pub fn read_section_bytes(&mut self, group: PointGroup) -> Result<Vec<u8>> {
        let section = self.reader.start_read_section(group.section_id())?;
        let bytes = self.reader.read_vec(section.size as usize)?;
        self.reader.end_read_section(section)?;
        Ok(bytes)
    }

    pub fn g1_points(&mut self, group: PointGroup) -> Result<Vec<G1Point<E>>> {
        if group.curve() != Curve::G1 {
            return Err(ImportError::InvalidTranscript(format!(
                "{} is not a G1 section",
                group.name()
            )));
        }
        let bytes = self.read_section_bytes(group)?;
        decode_points(self.engine.g1(), &bytes)
    }

    pub fn g2_points(&mut self, group: PointGroup) -> Result<Vec<G2Point<E>>> {
        if group.curve() != Curve::G2 {
            return Err(ImportError::InvalidTranscript(format!(
                "{} is not a G2 section",
                group.name()
            )));
        }
        let bytes = self.read_section_bytes(group)?;
        decode_points(self.engine.g2(), &bytes)
    }

    // Either every point section is present with its exact size, or none is.
    fn check_point_sections(&self) -> Result<()> {
        let present = PointGroup::ALL
            .iter()
            .filter(|group| self.reader.has_section(group.section_id()))
            .count();
        if present == 0 {
            return Ok(());
        }
        if present != PointGroup::ALL.len() {
            return Err(ImportError::InvalidTranscript(
                "transcript carries only some of the point sections".to_string(),
            ));
        }

        for group in PointGroup::ALL {
            let width = match group.curve() {
                Curve::G1 => self.engine.g1().uncompressed_size(),
                Curve::G2 => self.engine.g2().uncompressed_size(),
            } as u64;
            let expected = self.parameters.element_count(group) * width;
            let section = self.reader.section(group.section_id())?;
            if section.size != expected {
                return Err(ImportError::InvalidTranscript(format!(
                    "{} section holds {} bytes, expected {}",
                    group.name(),
                    section.size,
                    expected
                )));
            }
        }
        Ok(())
    }
}

fn decode_points<G: GroupCodec>(codec: &G, bytes: &[u8]) -> Result<Vec<G::Point>> {
    bytes
        .chunks(codec.uncompressed_size())
        .map(|record| codec.read_montgomery(record).map_err(ImportError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Bls12_381, Bn254};
    use crate::serialisation::write_contributions;
    use tempfile::TempDir;

    fn write_metadata_only(path: &Path, header: &PtauHeader) {
        let engine = Bn254::default();
        let mut writer = BinFileWriter::create(path, PTAU_TAG, PTAU_VERSION, METADATA_SECTIONS).unwrap();
        write_header(&mut writer, header).unwrap();
        write_contributions(&mut writer, &engine, &Ledger::new()).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn metadata_only_transcripts_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.ptau");
        let engine = Bn254::default();
        let header = PtauHeader::new(&engine, 4);
        write_metadata_only(&path, &header);

        let transcript = Transcript::open(&engine, &path).unwrap();
        assert_eq!(transcript.header(), &header);
        assert_eq!(transcript.header().n8, 32);
        assert_eq!(transcript.parameters().power(), 4);
        assert!(!transcript.is_materialized());
        assert!(transcript.ledger().is_empty());

        assert_eq!(peek_header(&path).unwrap(), header);
    }

    #[test]
    fn other_curves_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bn.ptau");
        write_metadata_only(&path, &PtauHeader::new(&Bn254::default(), 2));

        assert!(matches!(
            Transcript::open(&Bls12_381::default(), &path),
            Err(ImportError::CurveMismatch { expected: "bls12381" })
        ));
    }

    #[test]
    fn out_of_range_powers_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.ptau");
        let engine = Bn254::default();
        write_metadata_only(&path, &PtauHeader::new(&engine, 40));

        assert!(matches!(
            Transcript::open(&engine, &path),
            Err(ImportError::InvalidPower(40))
        ));
    }
}
