/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT

Notes: The index file (.shx) carries the same 100-byte header as the .shp
followed by one BigEndian (offset, length) pair per record, both in 16-bit
words.
*/
use super::header::{ShapefileHeader, HEADER_SIZE};
use crate::error::{Result, ShapefileError};
use crate::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::io::prelude::*;

/// Locates one record in the .shp stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Byte offset of the record's 8-byte header.
    pub offset: u64,
    /// Content length in 16-bit words, excluding the record header.
    pub length: i32,
}

pub struct ShxReader<R: Read + Seek> {
    bor: ByteOrderReader<R>,
    pub header: ShapefileHeader,
    entries: Option<Vec<IndexEntry>>,
}

impl<R: Read + Seek> ShxReader<R> {
    pub fn new(reader: R) -> Result<ShxReader<R>> {
        let mut bor = ByteOrderReader::new(reader, Endianness::BigEndian)?;
        let header = ShapefileHeader::read(&mut bor)?;
        Ok(ShxReader {
            bor,
            header,
            entries: None,
        })
    }

    /// The number of records, as declared by the header's file length.
    pub fn num_entries(&self) -> usize {
        self.header.file_length_bytes().saturating_sub(HEADER_SIZE) / 8
    }

    /// Reads the whole table on first use and keeps it for later lookups.
    pub fn entries(&mut self) -> Result<&[IndexEntry]> {
        if self.entries.is_none() {
            let n = self.num_entries();
            self.bor.set_byte_order(Endianness::BigEndian);
            self.bor.seek(HEADER_SIZE)?;
            let mut entries = Vec::with_capacity(n.min(self.bor.len() / 8));
            for _ in 0..n {
                let offset = self.bor.read_i32()?;
                let length = self.bor.read_i32()?;
                if offset < 0 || length < 0 {
                    return Err(ShapefileError::structural(format!(
                        "negative index entry ({}, {}) for record {}",
                        offset,
                        length,
                        entries.len()
                    )));
                }
                entries.push(IndexEntry {
                    offset: 2 * offset as u64,
                    length,
                });
            }
            self.entries = Some(entries);
        }
        Ok(self.entries.as_deref().unwrap_or(&[]))
    }

    pub fn entry(&mut self, index: usize) -> Result<IndexEntry> {
        let entries = self.entries()?;
        entries
            .get(index)
            .copied()
            .ok_or(ShapefileError::OutOfRange {
                index: index as i64,
                len: entries.len(),
            })
    }
}

/// Writes a complete .shx stream. `header` supplies the dataset fields;
/// the file length is derived from the number of entries.
pub fn write_shx<W: Write + Seek>(
    bow: &mut ByteOrderWriter<W>,
    header: &ShapefileHeader,
    entries: &[IndexEntry],
) -> Result<()> {
    let header = ShapefileHeader {
        file_length: ((HEADER_SIZE + 8 * entries.len()) / 2) as i32,
        ..header.clone()
    };
    header.write(bow)?;
    bow.set_byte_order(Endianness::BigEndian);
    for entry in entries {
        bow.write_i32((entry.offset / 2) as i32)?;
        bow.write_i32(entry.length)?;
    }
    Ok(())
}
