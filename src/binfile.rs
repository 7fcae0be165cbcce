//! Sectioned binary container used by ptau transcripts.
//!
//! Layout: a 4-byte type tag, a `u32` version and a `u32` section count,
//! followed by sections of `{ id: u32, size: u64, bytes }`. All integers are
//! little-endian.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionInfo {
    pub offset: u64,
    pub size: u64,
}

/// Writes a container front to back. Sections are opened and closed one at a
/// time; closing patches the size field in place.
pub struct BinFileWriter {
    file: BufWriter<File>,
    pos: u64,
    // position of the open section's size field
    open_section: Option<u64>,
    declared_sections: u32,
    written_sections: u32,
}

impl BinFileWriter {
    pub fn create(path: &Path, tag: &[u8; 4], version: u32, n_sections: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BinFileWriter {
            file: BufWriter::new(file),
            pos: 0,
            open_section: None,
            declared_sections: n_sections,
            written_sections: 0,
        };
        writer.write_all(tag)?;
        writer.write_u32(version)?;
        writer.write_u32(n_sections)?;
        Ok(writer)
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn start_section(&mut self, id: u32) -> Result<()> {
        if self.open_section.is_some() {
            return Err(ImportError::InvalidTranscript(format!(
                "section {} started while another one is open",
                id
            )));
        }
        self.write_u32(id)?;
        self.open_section = Some(self.pos);
        self.write_u64(0)?;
        Ok(())
    }

    pub fn end_section(&mut self) -> Result<()> {
        let size_at = self.open_section.take().ok_or_else(|| {
            ImportError::InvalidTranscript("no section is open".to_string())
        })?;
        let size = self.pos - size_at - 8;
        let resume = self.pos;
        self.seek(size_at)?;
        self.write_u64(size)?;
        self.seek(resume)?;
        self.written_sections += 1;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    /// Reads back bytes that were already written, starting at the cursor.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        // seeking drains the write buffer, so the file holds everything written so far
        self.file.seek(SeekFrom::Start(self.pos))?;
        self.file.get_mut().read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Flushes the container. Fails if a section is still open or fewer
    /// sections were written than declared in the file header.
    pub fn close(mut self) -> Result<()> {
        if self.open_section.is_some() {
            return Err(ImportError::InvalidTranscript(
                "closing with an open section".to_string(),
            ));
        }
        if self.written_sections != self.declared_sections {
            return Err(ImportError::InvalidTranscript(format!(
                "declared {} sections but wrote {}",
                self.declared_sections, self.written_sections
            )));
        }
        self.file.flush()?;
        Ok(())
    }
}

impl Write for BinFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.file.write(buf)?;
        self.pos += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Random access reader over a container, with the section table loaded on open.
pub struct BinFileReader {
    file: BufReader<File>,
    pos: u64,
    version: u32,
    sections: BTreeMap<u32, Vec<SectionInfo>>,
}

impl BinFileReader {
    pub fn open(path: &Path, tag: &[u8; 4], max_version: u32) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let mut reader = BinFileReader {
            file: BufReader::new(file),
            pos: 0,
            version: 0,
            sections: BTreeMap::new(),
        };

        let mut found = [0u8; 4];
        reader.read_exact(&mut found)?;
        if &found != tag {
            return Err(ImportError::InvalidTranscript(format!(
                "{}: invalid file type",
                path.display()
            )));
        }
        reader.version = reader.read_u32()?;
        if reader.version > max_version {
            return Err(ImportError::InvalidTranscript(format!(
                "{}: version {} is not supported",
                path.display(),
                reader.version
            )));
        }

        let n_sections = reader.read_u32()?;
        for _ in 0..n_sections {
            let id = reader.read_u32()?;
            let size = reader.read_u64()?;
            let offset = reader.pos;
            let end = offset.checked_add(size).filter(|end| *end <= len).ok_or_else(|| {
                ImportError::InvalidTranscript(format!(
                    "{}: section {} runs past the end of the file",
                    path.display(),
                    id
                ))
            })?;
            reader
                .sections
                .entry(id)
                .or_default()
                .push(SectionInfo { offset, size });
            reader.seek(end)?;
        }

        Ok(reader)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn has_section(&self, id: u32) -> bool {
        self.sections.contains_key(&id)
    }

    pub fn section(&self, id: u32) -> Result<SectionInfo> {
        match self.sections.get(&id).map(Vec::as_slice) {
            Some([info]) => Ok(*info),
            Some(_) => Err(ImportError::InvalidTranscript(format!(
                "section {} appears more than once",
                id
            ))),
            None => Err(ImportError::InvalidTranscript(format!(
                "missing section {}",
                id
            ))),
        }
    }

    /// Positions the cursor at the start of a section that must appear exactly once.
    pub fn start_read_section(&mut self, id: u32) -> Result<SectionInfo> {
        let info = self.section(id)?;
        self.seek(info.offset)?;
        Ok(info)
    }

    /// Checks that a section was consumed exactly.
    pub fn end_read_section(&self, info: SectionInfo) -> Result<()> {
        if self.pos != info.offset + info.size {
            return Err(ImportError::InvalidTranscript(
                "invalid section size".to_string(),
            ));
        }
        Ok(())
    }

    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.file.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}
