/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT
*/
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::prelude::*;
use std::io::{Result, SeekFrom};

/// A positioned reader that can switch byte order between fields.
///
/// The Shapefile formats mix big- and little-endian fields within a single
/// header, so the byte order is a property of the reader that callers flip
/// as they walk a structure rather than a type parameter.
pub struct ByteOrderReader<R: Read + Seek> {
    is_le: bool,
    reader: R,
    pos: usize,
    len: usize,
}

impl<R: Read + Seek> ByteOrderReader<R> {
    pub fn new(reader: R, byte_order: Endianness) -> Result<ByteOrderReader<R>> {
        let mut bor = ByteOrderReader {
            reader,
            is_le: byte_order == Endianness::LittleEndian,
            pos: 0usize,
            len: 0, // don't know the length yet
        };
        bor.refresh_len()?;
        Ok(bor)
    }

    pub fn set_byte_order(&mut self, byte_order: Endianness) {
        self.is_le = byte_order == Endianness::LittleEndian;
    }

    pub fn seek(&mut self, position: usize) -> Result<()> {
        self.pos = position;
        self.reader.seek(SeekFrom::Start(self.pos as u64))?;
        Ok(())
    }

    pub fn inc_pos(&mut self, skip: usize) -> Result<()> {
        self.seek(self.pos + skip)
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Re-measures the underlying stream, leaving the cursor where it was.
    pub fn refresh_len(&mut self) -> Result<usize> {
        self.len = self.reader.seek(SeekFrom::End(0))? as usize;
        self.reader.seek(SeekFrom::Start(self.pos as u64))?;
        Ok(self.len)
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; length];
        self.reader.read_exact(&mut bytes)?;
        self.pos += length;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let val = self.reader.read_u8()?;
        self.pos += 1;
        Ok(val)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let val = if self.is_le {
            self.reader.read_u16::<LittleEndian>()?
        } else {
            self.reader.read_u16::<BigEndian>()?
        };
        self.pos += 2;
        Ok(val)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let val = if self.is_le {
            self.reader.read_u32::<LittleEndian>()?
        } else {
            self.reader.read_u32::<BigEndian>()?
        };
        self.pos += 4;
        Ok(val)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let val = if self.is_le {
            self.reader.read_i32::<LittleEndian>()?
        } else {
            self.reader.read_i32::<BigEndian>()?
        };
        self.pos += 4;
        Ok(val)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let val = if self.is_le {
            self.reader.read_f64::<LittleEndian>()?
        } else {
            self.reader.read_f64::<BigEndian>()?
        };
        self.pos += 8;
        Ok(val)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Endianness {
    LittleEndian,
    BigEndian,
}

impl Default for Endianness {
    fn default() -> Endianness {
        Endianness::LittleEndian
    }
}
