/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT

Notes: Reading and writing the geometry stream (.shp). Record headers are
BigEndian, record content is LittleEndian.
*/
use super::geometry::*;
use super::header::{ShapefileHeader, HEADER_SIZE};
use super::shx::IndexEntry;
use crate::error::{Result, ShapefileError};
use crate::structures::{BoundingBox, Point2D};
use crate::utils::{ByteOrderReader, ByteOrderWriter, Endianness};
use std::io::prelude::*;
use tracing::warn;

/// Random-access and sequential decoder for a .shp stream.
pub struct ShpReader<R: Read + Seek> {
    bor: ByteOrderReader<R>,
    pub header: ShapefileHeader,
}

impl<R: Read + Seek> ShpReader<R> {
    pub fn new(reader: R) -> Result<ShpReader<R>> {
        let mut bor = ByteOrderReader::new(reader, Endianness::BigEndian)?;
        let header = ShapefileHeader::read(&mut bor)?;
        Ok(ShpReader { bor, header })
    }

    /// Decodes the record whose 8-byte header starts at `offset`.
    pub fn read_shape_at(&mut self, offset: usize) -> Result<ShapefileGeometry> {
        self.bor.seek(offset)?;
        self.read_record()
    }

    /// Returns a forward iterator over every record in the stream.
    ///
    /// The end of the stream is measured now rather than taken from the
    /// header, whose file length is sometimes wrong in the wild.
    pub fn shapes(&mut self) -> Result<ShapeIter<'_, R>> {
        let end = self.bor.refresh_len()?;
        if end != self.header.file_length_bytes() {
            warn!(
                "shp header declares {} bytes but the stream holds {}",
                self.header.file_length_bytes(),
                end
            );
        }
        self.bor.seek(HEADER_SIZE)?;
        Ok(ShapeIter {
            reader: self,
            end,
            failed: false,
        })
    }

    fn read_count(&mut self, what: &str) -> Result<usize> {
        let n = self.bor.read_i32()?;
        if n < 0 {
            return Err(ShapefileError::structural(format!(
                "negative {} count {} at byte {}",
                what,
                n,
                self.bor.pos() - 4
            )));
        }
        Ok(n as usize)
    }

    fn read_record(&mut self) -> Result<ShapefileGeometry> {
        self.bor.set_byte_order(Endianness::BigEndian);
        let _record_number = self.bor.read_i32()?;
        let content_length = self.bor.read_i32()?;
        if content_length < 0 {
            return Err(ShapefileError::structural(format!(
                "negative content length at byte {}",
                self.bor.pos() - 4
            )));
        }
        // The declared length, not the bytes consumed, decides where the next record starts.
        let next = self.bor.pos() + 2 * content_length as usize;

        self.bor.set_byte_order(Endianness::LittleEndian);
        let shape_type = ShapeType::from_int(self.bor.read_i32()?)?;
        let layout = shape_type.layout();
        let mut sfg = ShapefileGeometry::new(shape_type);

        if layout.bbox {
            sfg.bounding_box = Some(BoundingBox {
                min_x: self.bor.read_f64()?,
                min_y: self.bor.read_f64()?,
                max_x: self.bor.read_f64()?,
                max_y: self.bor.read_f64()?,
            });
        }
        let num_parts = if layout.parts {
            self.read_count("part")?
        } else {
            0
        };
        let num_points = if layout.points {
            self.read_count("point")?
        } else {
            0
        };

        let parts_at = self.bor.pos();
        for _ in 0..num_parts {
            sfg.parts.push(self.bor.read_i32()?);
        }
        check_part_offsets(&sfg.parts, num_points).map_err(|msg| {
            ShapefileError::structural(format!("{} at byte {}", msg, parts_at))
        })?;
        if layout.part_types {
            for _ in 0..num_parts {
                sfg.part_types.push(PatchType::from_int(self.bor.read_i32()?));
            }
        }
        for _ in 0..num_points {
            sfg.points.push(Point2D {
                x: self.bor.read_f64()?,
                y: self.bor.read_f64()?,
            });
        }

        if layout.z_block {
            self.bor.inc_pos(16)?; // z range
            let mut z = Vec::new();
            for _ in 0..num_points {
                z.push(self.bor.read_f64()?);
            }
            sfg.z_array = Some(z);
        }

        if layout.m_block && self.header.has_measure_blocks() {
            self.bor.inc_pos(16)?; // m range
            let mut m = Vec::new();
            for _ in 0..num_points {
                m.push(measure_from_raw(self.bor.read_f64()?));
            }
            sfg.m_array = Some(m);
        }

        if layout.single_point {
            sfg.points.push(Point2D {
                x: self.bor.read_f64()?,
                y: self.bor.read_f64()?,
            });
        }
        if layout.single_z {
            sfg.z_array = Some(vec![self.bor.read_f64()?]);
        }
        if layout.single_m {
            sfg.m_array = Some(vec![measure_from_raw(self.bor.read_f64()?)]);
        }

        self.bor.seek(next)?;
        Ok(sfg)
    }
}

/// Part offsets must index into the point list in non-decreasing order.
fn check_part_offsets(parts: &[i32], num_points: usize) -> std::result::Result<(), String> {
    let mut prev = 0;
    for &p in parts {
        if p < prev || p as usize > num_points {
            return Err(format!(
                "invalid part offsets {:?} for {} points",
                parts, num_points
            ));
        }
        prev = p;
    }
    Ok(())
}

/// Lazy, forward-only iterator over the records of a .shp stream.
pub struct ShapeIter<'a, R: Read + Seek> {
    reader: &'a mut ShpReader<R>,
    end: usize,
    failed: bool,
}

impl<'a, R: Read + Seek> Iterator for ShapeIter<'a, R> {
    type Item = Result<ShapefileGeometry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.bor.pos() >= self.end {
            return None;
        }
        let ret = self.reader.read_record();
        if ret.is_err() {
            self.failed = true;
        }
        Some(ret)
    }
}

/// Total size in bytes of a .shp file holding `shapes`, computed from the
/// record layouts without serializing anything.
pub fn shp_file_length(shapes: &[ShapefileGeometry]) -> usize {
    shapes
        .iter()
        .fold(HEADER_SIZE, |size, sfg| size + 8 + sfg.get_length())
}

/// Writes the header and every record, returning the index entries.
///
/// Each record is written with a zero content length, which is patched in
/// place once the content has been laid out.
pub fn write_shp<W: Write + Seek>(
    bow: &mut ByteOrderWriter<W>,
    header: &ShapefileHeader,
    shapes: &[ShapefileGeometry],
) -> Result<Vec<IndexEntry>> {
    header.write(bow)?;
    let mut entries = Vec::with_capacity(shapes.len());
    for (i, sfg) in shapes.iter().enumerate() {
        entries.push(write_record(bow, i as i32 + 1, sfg)?);
    }
    Ok(entries)
}

fn write_record<W: Write + Seek>(
    bow: &mut ByteOrderWriter<W>,
    record_number: i32,
    sfg: &ShapefileGeometry,
) -> Result<IndexEntry> {
    let offset = bow.pos();

    bow.set_byte_order(Endianness::BigEndian);
    bow.write_i32(record_number)?;
    bow.write_i32(0i32)?; // content length placeholder
    let start = bow.pos();

    bow.set_byte_order(Endianness::LittleEndian);
    bow.write_i32(sfg.shape_type.to_int())?;
    let layout = sfg.shape_type.layout();
    let num_points = sfg.num_points();

    if layout.bbox {
        let bb = sfg
            .get_bounding_box()
            .map_or([0f64; 4], |bb| bb.to_array());
        for v in bb {
            bow.write_f64(v)?;
        }
    }
    if layout.parts {
        bow.write_i32(sfg.num_parts() as i32)?;
    }
    if layout.points {
        bow.write_i32(num_points as i32)?;
    }
    if layout.parts {
        for part in &sfg.parts {
            bow.write_i32(*part)?;
        }
    }
    if layout.part_types {
        for i in 0..sfg.num_parts() {
            let pt = sfg.part_types.get(i).copied().unwrap_or(PatchType::Ring);
            bow.write_i32(pt.to_int())?;
        }
    }
    if layout.points {
        for pt in &sfg.points {
            bow.write_f64(pt.x)?;
            bow.write_f64(pt.y)?;
        }
    }
    if layout.z_block {
        let (z_min, z_max) = sfg.z_range().unwrap_or((0f64, 0f64));
        bow.write_f64(z_min)?;
        bow.write_f64(z_max)?;
        for i in 0..num_points {
            bow.write_f64(z_value(sfg, i))?;
        }
    }
    if layout.m_block {
        let (m_min, m_max) = sfg.m_range().unwrap_or((0f64, 0f64));
        bow.write_f64(m_min)?;
        bow.write_f64(m_max)?;
        for i in 0..num_points {
            bow.write_f64(m_value(sfg, i))?;
        }
    }
    if layout.single_point {
        let pt = sfg.points.first().copied().unwrap_or_default();
        bow.write_f64(pt.x)?;
        bow.write_f64(pt.y)?;
    }
    if layout.single_z {
        bow.write_f64(z_value(sfg, 0))?;
    }
    if layout.single_m {
        bow.write_f64(m_value(sfg, 0))?;
    }

    let finish = bow.pos();
    let length = ((finish - start) / 2) as i32;
    debug_assert_eq!(2 * length as usize, sfg.get_length());

    // patch the content length, four bytes before the content
    bow.set_byte_order(Endianness::BigEndian);
    bow.seek(start - 4)?;
    bow.write_i32(length)?;
    bow.seek(finish)?;

    Ok(IndexEntry { offset, length })
}

fn z_value(sfg: &ShapefileGeometry, i: usize) -> f64 {
    sfg.z_array
        .as_ref()
        .and_then(|z| z.get(i).copied())
        .unwrap_or(0f64)
}

fn m_value(sfg: &ShapefileGeometry, i: usize) -> f64 {
    measure_to_raw(sfg.m_array.as_ref().and_then(|m| m.get(i).copied()).flatten())
}
