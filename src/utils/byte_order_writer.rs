/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT
*/
use super::byte_order_reader::Endianness;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::io::prelude::*;
use std::io::{Error, SeekFrom};

/// A byte-order aware writer over a seekable sink.
///
/// Seeking is required for back-patching record lengths after the
/// content has been laid out.
pub struct ByteOrderWriter<W: Write + Seek> {
    is_le: bool,
    writer: W,
    pos: u64,
}

impl<W: Write + Seek> ByteOrderWriter<W> {
    pub fn new(writer: W, byte_order: Endianness) -> ByteOrderWriter<W> {
        ByteOrderWriter::<W> {
            writer,
            is_le: byte_order == Endianness::LittleEndian,
            pos: 0,
        }
    }

    pub fn set_byte_order(&mut self, byte_order: Endianness) {
        self.is_le = byte_order == Endianness::LittleEndian;
    }

    /// Current offset of the write cursor, relative to where the writer started.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn seek(&mut self, position: u64) -> Result<(), Error> {
        self.writer.seek(SeekFrom::Start(position))?;
        self.pos = position;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), Error> {
        if self.is_le {
            self.writer.write_i32::<LittleEndian>(value)?;
        } else {
            self.writer.write_i32::<BigEndian>(value)?;
        }
        self.pos += 4;
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), Error> {
        if self.is_le {
            self.writer.write_f64::<LittleEndian>(value)?;
        } else {
            self.writer.write_f64::<BigEndian>(value)?;
        }
        self.pos += 8;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
