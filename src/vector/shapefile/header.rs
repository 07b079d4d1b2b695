/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT
*/
use super::geometry::ShapeType;
use crate::error::{Result, ShapefileError};
use crate::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::fmt;
use std::io::prelude::*;

pub const FILE_CODE: i32 = 9994;
pub const VERSION: i32 = 1000;
pub const HEADER_SIZE: usize = 100;

/// The 100-byte header shared by the .shp and .shx files.
///
/// The two files differ only in what `file_length` counts.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ShapefileHeader {
    pub file_code: i32,        // BigEndian; value is 9994
    pub file_length: i32,      // BigEndian; in 16-bit words
    pub version: i32,          // LittleEndian
    pub shape_type: ShapeType, // LittleEndian
    pub x_min: f64,            // LittleEndian
    pub y_min: f64,            // LittleEndian
    pub x_max: f64,            // LittleEndian
    pub y_max: f64,            // LittleEndian
    pub z_min: f64,            // LittleEndian; 0f64 if shapeType not z
    pub z_max: f64,            // LittleEndian; 0f64 if shapeType not z
    pub m_min: f64,            // LittleEndian; 0f64 if shapeType not measured
    pub m_max: f64,            // LittleEndian; 0f64 if shapeType not measured
}

impl ShapefileHeader {
    pub fn read<R: Read + Seek>(bor: &mut ByteOrderReader<R>) -> Result<ShapefileHeader> {
        if bor.len() < HEADER_SIZE {
            return Err(ShapefileError::structural(format!(
                "file is {} bytes, shorter than the {}-byte header",
                bor.len(),
                HEADER_SIZE
            )));
        }
        // The format mixes byte orders: the first seven words are BigEndian,
        // the rest of the header is LittleEndian.
        bor.set_byte_order(Endianness::BigEndian);
        bor.seek(0)?;
        let file_code = bor.read_i32()?;
        if file_code != FILE_CODE {
            return Err(ShapefileError::structural(format!(
                "bad file code {} (expected {})",
                file_code, FILE_CODE
            )));
        }
        bor.seek(24)?;
        let file_length = bor.read_i32()?;

        bor.set_byte_order(Endianness::LittleEndian);
        let version = bor.read_i32()?;
        if version != VERSION {
            return Err(ShapefileError::structural(format!(
                "unsupported version {} (expected {})",
                version, VERSION
            )));
        }
        let shape_type = ShapeType::from_int(bor.read_i32()?)?;

        Ok(ShapefileHeader {
            file_code,
            file_length,
            version,
            shape_type,
            x_min: bor.read_f64()?,
            y_min: bor.read_f64()?,
            x_max: bor.read_f64()?,
            y_max: bor.read_f64()?,
            z_min: bor.read_f64()?,
            z_max: bor.read_f64()?,
            m_min: bor.read_f64()?,
            m_max: bor.read_f64()?,
        })
    }

    pub fn write<W: Write + Seek>(&self, bow: &mut ByteOrderWriter<W>) -> Result<()> {
        bow.set_byte_order(Endianness::BigEndian);
        bow.write_i32(FILE_CODE)?;
        // unused header bytes
        for _ in 0..5 {
            bow.write_i32(0i32)?;
        }
        bow.write_i32(self.file_length)?;

        bow.set_byte_order(Endianness::LittleEndian);
        bow.write_i32(VERSION)?;
        bow.write_i32(self.shape_type.to_int())?;
        bow.write_f64(self.x_min)?;
        bow.write_f64(self.y_min)?;
        bow.write_f64(self.x_max)?;
        bow.write_f64(self.y_max)?;
        bow.write_f64(self.z_min)?;
        bow.write_f64(self.z_max)?;
        bow.write_f64(self.m_min)?;
        bow.write_f64(self.m_max)?;
        Ok(())
    }

    /// The declared file length in bytes.
    pub fn file_length_bytes(&self) -> usize {
        self.file_length.max(0) as usize * 2
    }

    /// Whether per-record M blocks should be read for this dataset.
    ///
    /// This is a dataset-level heuristic: the blocks are skipped whenever
    /// either end of the header's measure range is exactly 0.0.
    pub fn has_measure_blocks(&self) -> bool {
        self.m_min != 0f64 && self.m_max != 0f64
    }

    pub fn bbox(&self) -> [f64; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }

    pub fn elevation(&self) -> [f64; 2] {
        [self.z_min, self.z_max]
    }

    pub fn measure(&self) -> [f64; 2] {
        [self.m_min, self.m_max]
    }
}

impl fmt::Display for ShapefileHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "file_code: {}
file_length: {}
version: {}
shape_type: {}
x_min: {}
x_max: {}
y_min: {}
y_max: {}
z_min: {}
z_max: {}
m_min: {}
m_max: {}",
            self.file_code,
            self.file_length,
            self.version,
            self.shape_type,
            self.x_min,
            self.x_max,
            self.y_min,
            self.y_max,
            self.z_min,
            self.z_max,
            self.m_min,
            self.m_max
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_byte_layout() {
        let header = ShapefileHeader {
            file_code: FILE_CODE,
            file_length: 64,
            version: VERSION,
            shape_type: ShapeType::PolygonM,
            x_min: -1.0,
            y_min: -2.0,
            x_max: 3.0,
            y_max: 4.0,
            z_min: 0.0,
            z_max: 0.0,
            m_min: 1.5,
            m_max: 9.5,
        };
        let mut bow = ByteOrderWriter::new(Cursor::new(Vec::new()), Endianness::BigEndian);
        header.write(&mut bow).unwrap();
        let bytes = bow.into_inner().into_inner();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], &9994i32.to_be_bytes());
        assert_eq!(&bytes[24..28], &64i32.to_be_bytes());
        assert_eq!(&bytes[28..32], &1000i32.to_le_bytes());
        assert_eq!(&bytes[32..36], &25i32.to_le_bytes());
        assert_eq!(&bytes[36..44], &(-1.0f64).to_le_bytes());

        let mut bor = ByteOrderReader::new(Cursor::new(bytes), Endianness::BigEndian).unwrap();
        let read = ShapefileHeader::read(&mut bor).unwrap();
        assert_eq!(read, header);
        assert_eq!(read.file_length_bytes(), 128);
        assert!(read.has_measure_blocks());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[3] = 1;
        let mut bor = ByteOrderReader::new(Cursor::new(bytes), Endianness::BigEndian).unwrap();
        match ShapefileHeader::read(&mut bor) {
            Err(ShapefileError::Structural(_)) => {}
            other => panic!("expected a structural error, got {:?}", other),
        }
    }

    #[test]
    fn test_measure_heuristic() {
        let mut header = ShapefileHeader {
            m_min: 0.0,
            m_max: 5.0,
            ..Default::default()
        };
        assert!(!header.has_measure_blocks());
        header.m_min = -1.0;
        assert!(header.has_measure_blocks());
        header.m_max = 0.0;
        assert!(!header.has_measure_blocks());
    }
}
