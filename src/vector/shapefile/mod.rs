/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT

Notes: The logic behind working with the ESRI Shapefile format. A dataset is
three files sharing a base name: the geometry (.shp), its positional index
(.shx) and the attribute table (.dbf).
*/
pub mod attributes;
pub mod geometry;
pub mod header;
pub mod shp;
pub mod shx;

pub use self::attributes::{
    AttributeField, AttributeHeader, DateData, FieldData, FieldDataType, RecordIter,
};
pub use self::geometry::{PatchType, ShapeType, ShapefileGeometry};
pub use self::header::ShapefileHeader;
pub use self::shp::ShapeIter;
pub use self::shx::IndexEntry;

use self::attributes::{encode_dbf, normalize_field_name, DbfReader};
use self::header::{FILE_CODE, HEADER_SIZE, VERSION};
use self::shp::{shp_file_length, write_shp, ShpReader};
use self::shx::{write_shx, ShxReader};
use crate::configs::Configs;
use crate::error::{Result, ShapefileError};
use crate::structures::{BoundingBox, Point2D};
use crate::utils::{ByteOrderWriter, Endianness};
use std::fs;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DATASET_EXTENSIONS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

/// The base name shared by a dataset's files. Only a dataset extension is
/// stripped, so `roads.v2` and `roads.v2.shp` both name `roads.v2`.
fn dataset_base(file_name: &Path) -> PathBuf {
    match file_name.extension().and_then(|e| e.to_str()) {
        Some(ext)
            if DATASET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known)) =>
        {
            file_name.with_extension("")
        }
        _ => file_name.to_path_buf(),
    }
}

/// Appends `.extension` to `base` without touching any dots already in it.
fn part_path(base: &Path, extension: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn open_part(base: &Path, extension: &str) -> Result<BufReader<File>> {
    let path = part_path(base, extension);
    match File::open(&path) {
        Ok(f) => Ok(BufReader::new(f)),
        Err(source) => Err(ShapefileError::MissingFile { path, source }),
    }
}

/// Read access to an existing dataset.
///
/// Headers and the field descriptors are parsed when the dataset is opened;
/// shapes and records are decoded on demand.
pub struct ShapefileReader<R: Read + Seek = BufReader<File>> {
    pub file_name: Option<PathBuf>,
    shp: Option<ShpReader<R>>,
    shx: Option<ShxReader<R>>,
    dbf: Option<DbfReader<R>>,
    projection: Option<String>,
    scanned_count: Option<usize>,
}

impl ShapefileReader<BufReader<File>> {
    /// Opens the dataset at `file_name`, with or without a .shp/.shx/.dbf
    /// extension. The .shp, .shx and .dbf files must all exist. A .prj file
    /// is optional.
    pub fn open<P: AsRef<Path>>(file_name: P) -> Result<ShapefileReader<BufReader<File>>> {
        let base = dataset_base(file_name.as_ref());
        debug!("opening shapefile {}", base.display());
        let shp = open_part(&base, "shp")?;
        let shx = open_part(&base, "shx")?;
        let dbf = open_part(&base, "dbf")?;
        let mut sf = ShapefileReader::from_readers(Some(shp), Some(shx), Some(dbf))?;
        sf.projection = fs::read_to_string(part_path(&base, "prj")).ok();
        debug!(
            "opened {} shapefile with {} attribute records",
            sf.shape_type(),
            sf.dbf.as_ref().map_or(0, |dbf| dbf.num_records())
        );
        sf.file_name = Some(base);
        Ok(sf)
    }
}

impl<R: Read + Seek> ShapefileReader<R> {
    /// Wraps caller-owned handles. Each is optional, but at least one of the
    /// geometry and attribute streams must be given.
    pub fn from_readers(
        shp: Option<R>,
        shx: Option<R>,
        dbf: Option<R>,
    ) -> Result<ShapefileReader<R>> {
        if shp.is_none() && dbf.is_none() {
            return Err(ShapefileError::NoFile("shp or dbf"));
        }
        if shp.is_some() && shx.is_none() {
            warn!("no shx index supplied; random shape access will scan the shp stream");
        }
        Ok(ShapefileReader {
            file_name: None,
            shp: shp.map(ShpReader::new).transpose()?,
            shx: shx.map(ShxReader::new).transpose()?,
            dbf: dbf.map(DbfReader::new).transpose()?,
            projection: None,
            scanned_count: None,
        })
    }

    pub fn header(&self) -> Option<&ShapefileHeader> {
        self.shp
            .as_ref()
            .map(|shp| &shp.header)
            .or_else(|| self.shx.as_ref().map(|shx| &shx.header))
    }

    pub fn shape_type(&self) -> ShapeType {
        self.header().map_or(ShapeType::Null, |h| h.shape_type)
    }

    pub fn bbox(&self) -> Option<[f64; 4]> {
        self.header().map(|h| h.bbox())
    }

    pub fn elevation(&self) -> Option<[f64; 2]> {
        self.header().map(|h| h.elevation())
    }

    pub fn measure(&self) -> Option<[f64; 2]> {
        self.header().map(|h| h.measure())
    }

    pub fn projection(&self) -> Option<&str> {
        self.projection.as_deref()
    }

    pub fn dbf_header(&self) -> Option<&AttributeHeader> {
        self.dbf.as_ref().map(|dbf| &dbf.header)
    }

    /// The attribute schema, without the deletion flag.
    pub fn fields(&self) -> &[AttributeField] {
        self.dbf.as_ref().map_or(&[][..], |dbf| dbf.fields.as_slice())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields().iter().map(|f| f.name.clone()).collect()
    }

    /// The number of records, taken from the attribute table when present,
    /// then from the index, and only as a last resort by scanning the
    /// geometry stream.
    pub fn num_records(&mut self) -> Result<usize> {
        if let Some(dbf) = &self.dbf {
            return Ok(dbf.num_records());
        }
        if let Some(shx) = &self.shx {
            return Ok(shx.num_entries());
        }
        if let Some(n) = self.scanned_count {
            return Ok(n);
        }
        let shp = self.shp.as_mut().ok_or(ShapefileError::NoFile("shp"))?;
        let mut n = 0usize;
        for sfg in shp.shapes()? {
            sfg?;
            n += 1;
        }
        self.scanned_count = Some(n);
        Ok(n)
    }

    /// Maps a possibly negative index onto `0..num_records`.
    fn restrict_index(&mut self, index: i64) -> Result<usize> {
        let len = self.num_records()?;
        let i = if index < 0 { index + len as i64 } else { index };
        if i < 0 || i >= len as i64 {
            return Err(ShapefileError::OutOfRange { index, len });
        }
        Ok(i as usize)
    }

    /// Reads one shape. Negative indices count back from the last shape.
    pub fn shape(&mut self, index: i64) -> Result<ShapefileGeometry> {
        let i = self.restrict_index(index)?;
        let shp = self.shp.as_mut().ok_or(ShapefileError::NoFile("shp"))?;
        match self.shx.as_mut() {
            Some(shx) => {
                let entry = shx.entry(i)?;
                shp.read_shape_at(entry.offset as usize)
            }
            None => shp.shapes()?.nth(i).unwrap_or_else(|| {
                Err(ShapefileError::structural(format!(
                    "shp stream ends before shape {}",
                    i
                )))
            }),
        }
    }

    /// Iterates over every shape in file order.
    pub fn shapes(&mut self) -> Result<ShapeIter<'_, R>> {
        self.shp
            .as_mut()
            .ok_or(ShapefileError::NoFile("shp"))?
            .shapes()
    }

    /// Reads one attribute row, `None` if the row is marked deleted.
    pub fn record(&mut self, index: i64) -> Result<Option<Vec<FieldData>>> {
        let i = self.restrict_index(index)?;
        self.dbf
            .as_mut()
            .ok_or(ShapefileError::NoFile("dbf"))?
            .record(i)
    }

    /// Iterates over the active attribute rows; deleted rows are skipped.
    pub fn records(&mut self) -> Result<RecordIter<'_, R>> {
        Ok(self
            .dbf
            .as_mut()
            .ok_or(ShapefileError::NoFile("dbf"))?
            .records())
    }

    /// The index table, read on first use.
    pub fn index_entries(&mut self) -> Result<&[IndexEntry]> {
        self.shx
            .as_mut()
            .ok_or(ShapefileError::NoFile("shx"))?
            .entries()
    }
}

/// An in-memory dataset that is materialized to disk by `save`.
///
/// Shapes and attribute records accumulate independently; with
/// `auto_balance` set, the shorter list is padded when the dataset is saved.
#[derive(Debug, Clone)]
pub struct ShapefileWriter {
    pub shape_type: ShapeType,
    pub projection: String,
    pub configs: Configs,
    shapes: Vec<ShapefileGeometry>,
    fields: Vec<AttributeField>,
    records: Vec<Vec<FieldData>>,
    deleted: Vec<bool>,
}

impl ShapefileWriter {
    pub fn new(shape_type: ShapeType) -> ShapefileWriter {
        ShapefileWriter::with_configs(shape_type, Configs::default())
    }

    pub fn with_configs(shape_type: ShapeType, configs: Configs) -> ShapefileWriter {
        ShapefileWriter {
            shape_type,
            projection: String::new(),
            configs,
            shapes: vec![],
            fields: vec![],
            records: vec![],
            deleted: vec![],
        }
    }

    /// Starts a new dataset with the projection, and optionally the field
    /// schema, of an existing one.
    pub fn initialize_using<R: Read + Seek>(
        other: &ShapefileReader<R>,
        shape_type: ShapeType,
        copy_fields: bool,
    ) -> ShapefileWriter {
        let mut sf = ShapefileWriter::new(shape_type);
        sf.projection = other.projection().unwrap_or_default().to_string();
        if copy_fields {
            sf.fields = other.fields().to_vec();
        }
        sf
    }

    pub fn add_field(&mut self, field: AttributeField) {
        self.fields.push(AttributeField {
            name: normalize_field_name(&field.name),
            ..field
        });
    }

    /// Adds a Character field of the configured default width.
    pub fn add_field_default(&mut self, name: &str) {
        let width = self.configs.default_field_width;
        self.add_field(AttributeField::new(name, FieldDataType::Character, width, 0));
    }

    pub fn fields(&self) -> &[AttributeField] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn num_shapes(&self) -> usize {
        self.shapes.len()
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Appends a shape. Null shapes fit any dataset; other shapes must match
    /// the dataset's type, which a Null dataset adopts from its first shape.
    pub fn add_shape(&mut self, geometry: ShapefileGeometry) -> Result<()> {
        if geometry.shape_type != ShapeType::Null {
            if self.shape_type == ShapeType::Null {
                self.shape_type = geometry.shape_type;
            } else if geometry.shape_type != self.shape_type {
                return Err(ShapefileError::ShapeTypeMismatch {
                    expected: self.shape_type,
                    found: geometry.shape_type,
                });
            }
        }
        geometry.validate()?;
        self.shapes.push(geometry);
        Ok(())
    }

    pub fn null(&mut self) {
        self.shapes.push(ShapefileGeometry::null());
    }

    /// Appends a single-point shape. Z and M are kept only when the dataset
    /// type carries them.
    pub fn point(&mut self, x: f64, y: f64, z: f64, m: Option<f64>) -> Result<()> {
        let base = self.shape_type.base_shape_type();
        if base != ShapeType::Point && base != ShapeType::MultiPoint {
            return Err(ShapefileError::ShapeTypeMismatch {
                expected: self.shape_type,
                found: ShapeType::Point,
            });
        }
        let layout = self.shape_type.layout();
        let mut sfg = ShapefileGeometry::new(self.shape_type);
        let p = Point2D::new(x, y);
        if layout.has_z() {
            sfg.add_pointz(p, z, m);
        } else if layout.has_m() {
            sfg.add_pointm(p, m);
        } else {
            sfg.add_point(p);
        }
        self.add_shape(sfg)
    }

    /// Appends a multi-part line.
    pub fn line(&mut self, parts: &[Vec<Point2D>]) -> Result<()> {
        if self.shape_type.base_shape_type() != ShapeType::PolyLine {
            return Err(ShapefileError::ShapeTypeMismatch {
                expected: self.shape_type,
                found: ShapeType::PolyLine,
            });
        }
        self.add_parts(parts, &[], false)
    }

    /// Appends a polygon or multipatch. Rings are closed if their last vertex
    /// differs from their first; multipatch triangle strips and fans are not.
    pub fn poly(&mut self, parts: &[Vec<Point2D>], part_types: &[PatchType]) -> Result<()> {
        let base = self.shape_type.base_shape_type();
        if base != ShapeType::Polygon && base != ShapeType::MultiPatch {
            return Err(ShapefileError::ShapeTypeMismatch {
                expected: self.shape_type,
                found: ShapeType::Polygon,
            });
        }
        self.add_parts(parts, part_types, true)
    }

    fn add_parts(
        &mut self,
        parts: &[Vec<Point2D>],
        part_types: &[PatchType],
        close_rings: bool,
    ) -> Result<()> {
        let layout = self.shape_type.layout();
        let mut sfg = ShapefileGeometry::new(self.shape_type);
        for (i, part) in parts.iter().enumerate() {
            let part_type = part_types.get(i).copied();
            let is_ring = !matches!(
                part_type,
                Some(PatchType::TriangleStrip | PatchType::TriangleFan)
            );
            let mut points = part.clone();
            if close_rings && is_ring && points.len() > 1 && points.first() != points.last() {
                points.push(points[0]);
            }
            let n = points.len();
            if layout.has_z() {
                sfg.add_partz(&points, &vec![0f64; n], &vec![None; n])?;
            } else if layout.has_m() {
                sfg.add_partm(&points, &vec![None; n])?;
            } else {
                sfg.add_part(&points);
            }
            if layout.part_types {
                sfg.part_types.push(part_type.unwrap_or(PatchType::Ring));
            }
        }
        self.add_shape(sfg)
    }

    /// Appends an attribute row. Missing trailing values become `Null` and
    /// values beyond the field count are dropped.
    pub fn add_record(&mut self, mut values: Vec<FieldData>) {
        values.resize(self.fields.len(), FieldData::Null);
        self.records.push(values);
        self.deleted.push(false);
    }

    /// Appends an attribute row from (field name, value) pairs.
    pub fn add_record_by_name(&mut self, values: &[(&str, FieldData)]) -> Result<()> {
        let mut rec = vec![FieldData::Null; self.fields.len()];
        for (name, value) in values {
            let name = normalize_field_name(name);
            match self.fields.iter().position(|f| f.name == name) {
                Some(j) => rec[j] = value.clone(),
                None => {
                    return Err(ShapefileError::Encoding {
                        record: self.records.len(),
                        field: name,
                        message: "no field of that name".to_string(),
                    })
                }
            }
        }
        self.add_record(rec);
        Ok(())
    }

    /// Flags an attribute row as deleted; it is written but skipped by readers.
    pub fn mark_deleted(&mut self, index: usize) -> Result<()> {
        let len = self.deleted.len();
        match self.deleted.get_mut(index) {
            Some(d) => {
                *d = true;
                Ok(())
            }
            None => Err(ShapefileError::OutOfRange {
                index: index as i64,
                len,
            }),
        }
    }

    /// Pads the shorter of the shape and record lists so both have the same length.
    pub fn balance(&mut self) {
        while self.shapes.len() < self.records.len() {
            self.null();
        }
        while self.records.len() < self.shapes.len() {
            self.add_record(vec![]);
        }
    }

    pub fn shape(&self, index: usize) -> Option<&ShapefileGeometry> {
        self.shapes.get(index)
    }

    pub fn shapes(&self) -> &[ShapefileGeometry] {
        &self.shapes
    }

    pub fn record(&self, index: usize) -> Option<&[FieldData]> {
        self.records.get(index).map(|r| r.as_slice())
    }

    pub fn records(&self) -> &[Vec<FieldData>] {
        &self.records
    }

    /// Dataset x/y extent as `[min_x, min_y, max_x, max_y]`, zeros if empty.
    pub fn bbox(&self) -> [f64; 4] {
        self.shapes
            .iter()
            .filter_map(|s| s.get_bounding_box())
            .fold(None, |acc: Option<BoundingBox>, bb| match acc {
                None => Some(bb),
                Some(mut a) => {
                    a.expand_to(&bb);
                    Some(a)
                }
            })
            .map_or([0f64; 4], |bb| bb.to_array())
    }

    pub fn zbox(&self) -> [f64; 2] {
        extent(self.shapes.iter().filter_map(|s| s.z_range()))
    }

    /// Measure extent over values that carry data; `[0, 0]` if there are none.
    pub fn mbox(&self) -> [f64; 2] {
        extent(self.shapes.iter().filter_map(|s| s.m_range()))
    }

    fn dataset_header(&self, file_length: usize) -> Result<ShapefileHeader> {
        let file_length = length_in_words(file_length)?;
        let bb = self.bbox();
        let zb = self.zbox();
        let mb = self.mbox();
        Ok(ShapefileHeader {
            file_code: FILE_CODE,
            file_length,
            version: VERSION,
            shape_type: self.shape_type,
            x_min: bb[0],
            y_min: bb[1],
            x_max: bb[2],
            y_max: bb[3],
            z_min: zb[0],
            z_max: zb[1],
            m_min: mb[0],
            m_max: mb[1],
        })
    }

    /// Index entries derived from the record sizes alone.
    fn index_entries(&self) -> Vec<IndexEntry> {
        let mut offset = HEADER_SIZE as u64;
        self.shapes
            .iter()
            .map(|sfg| {
                let length = sfg.get_length();
                let entry = IndexEntry {
                    offset,
                    length: (length / 2) as i32,
                };
                offset += 8 + length as u64;
                entry
            })
            .collect()
    }

    /// Balances or checks the shape and record counts, validates every
    /// shape and builds the header, all before anything is written.
    fn prepare(&mut self) -> Result<ShapefileHeader> {
        if self.configs.auto_balance {
            self.balance();
        } else if self.shapes.len() != self.records.len() {
            return Err(ShapefileError::Unbalanced {
                shapes: self.shapes.len(),
                records: self.records.len(),
            });
        }
        for sfg in &self.shapes {
            sfg.validate()?;
        }
        self.dataset_header(shp_file_length(&self.shapes))
    }

    fn encode_dbf(&self) -> Result<Vec<u8>> {
        encode_dbf(
            self.configs.dbf_version,
            &self.fields,
            &self.records,
            &self.deleted,
        )
    }

    fn write_shp_stream<W: Write + Seek>(
        &self,
        header: &ShapefileHeader,
        shp: &mut W,
    ) -> Result<Vec<IndexEntry>> {
        let mut bow = ByteOrderWriter::new(shp, Endianness::BigEndian);
        let entries = write_shp(&mut bow, header, &self.shapes)?;
        bow.flush()?;
        Ok(entries)
    }

    fn write_shx_stream<W: Write + Seek>(
        &self,
        header: &ShapefileHeader,
        shx: &mut W,
        entries: &[IndexEntry],
    ) -> Result<()> {
        let mut bow = ByteOrderWriter::new(shx, Endianness::BigEndian);
        write_shx(&mut bow, header, entries)?;
        bow.flush()?;
        Ok(())
    }

    fn log_save(&self, target: &str) {
        debug!(
            "saved {} {} shapes to {}",
            self.shapes.len(),
            self.shape_type,
            target
        );
        if self.configs.verbose_mode {
            info!(
                "{}: {} shapes, {} records, {} fields, bbox {:?}",
                target,
                self.shapes.len(),
                self.records.len(),
                self.fields.len(),
                self.bbox()
            );
        }
    }

    /// Writes the .shp, .shx and .dbf files (and a .prj when a projection is
    /// set) under the base name of `file_name`.
    ///
    /// Every attribute row is encoded before any file is created, so an
    /// encoding error leaves nothing on disk.
    pub fn save<P: AsRef<Path>>(&mut self, file_name: P) -> Result<()> {
        let base = dataset_base(file_name.as_ref());
        let header = self.prepare()?;
        let dbf = self.encode_dbf()?;

        let mut shp = BufWriter::new(File::create(part_path(&base, "shp"))?);
        let mut shx = BufWriter::new(File::create(part_path(&base, "shx"))?);
        let entries = self.write_shp_stream(&header, &mut shp)?;
        self.write_shx_stream(&header, &mut shx, &entries)?;
        fs::write(part_path(&base, "dbf"), dbf)?;
        if !self.projection.is_empty() {
            fs::write(part_path(&base, "prj"), self.projection.as_bytes())?;
        }

        self.log_save(&base.display().to_string());
        Ok(())
    }

    /// Saves into caller-owned handles, each positioned at its start. The
    /// geometry records are back-patched in place.
    pub fn save_to<S, X, D>(&mut self, shp: &mut S, shx: &mut X, dbf: &mut D) -> Result<()>
    where
        S: Write + Seek,
        X: Write + Seek,
        D: Write,
    {
        let header = self.prepare()?;
        let dbf_bytes = self.encode_dbf()?;
        let entries = self.write_shp_stream(&header, shp)?;
        self.write_shx_stream(&header, shx, &entries)?;
        dbf.write_all(&dbf_bytes)?;
        dbf.flush()?;
        self.log_save("caller-supplied handles");
        Ok(())
    }

    /// Saves into sinks that cannot seek. Each file is built in memory and
    /// then written out whole.
    pub fn save_to_streams<S, X, D>(&mut self, shp: &mut S, shx: &mut X, dbf: &mut D) -> Result<()>
    where
        S: Write,
        X: Write,
        D: Write,
    {
        let mut shp_buf = Cursor::new(Vec::new());
        let mut shx_buf = Cursor::new(Vec::new());
        let mut dbf_buf = Vec::new();
        self.save_to(&mut shp_buf, &mut shx_buf, &mut dbf_buf)?;
        shp.write_all(shp_buf.get_ref())?;
        shp.flush()?;
        shx.write_all(shx_buf.get_ref())?;
        shx.flush()?;
        dbf.write_all(&dbf_buf)?;
        dbf.flush()?;
        Ok(())
    }

    pub fn save_shp<P: AsRef<Path>>(&mut self, file_name: P) -> Result<()> {
        let header = self.prepare()?;
        let base = dataset_base(file_name.as_ref());
        let mut shp = BufWriter::new(File::create(part_path(&base, "shp"))?);
        self.write_shp_stream(&header, &mut shp)?;
        Ok(())
    }

    pub fn save_shx<P: AsRef<Path>>(&mut self, file_name: P) -> Result<()> {
        let header = self.prepare()?;
        let base = dataset_base(file_name.as_ref());
        let mut shx = BufWriter::new(File::create(part_path(&base, "shx"))?);
        self.write_shx_stream(&header, &mut shx, &self.index_entries())
    }

    pub fn save_dbf<P: AsRef<Path>>(&mut self, file_name: P) -> Result<()> {
        self.prepare()?;
        let dbf = self.encode_dbf()?;
        fs::write(part_path(&dataset_base(file_name.as_ref()), "dbf"), dbf)?;
        Ok(())
    }
}

/// A byte length as the 16-bit word count stored in the header.
fn length_in_words(bytes: usize) -> Result<i32> {
    i32::try_from(bytes / 2).map_err(|_| {
        ShapefileError::structural(format!(
            "{} bytes of geometry exceed the format's size limit",
            bytes
        ))
    })
}

fn extent<I: Iterator<Item = (f64, f64)>>(ranges: I) -> [f64; 2] {
    ranges
        .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)))
        .map_or([0f64; 2], |(lo, hi)| [lo, hi])
}

#[cfg(test)]
mod test {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Point2D> {
        // clockwise
        vec![
            Point2D::new(x, y),
            Point2D::new(x, y + size),
            Point2D::new(x + size, y + size),
            Point2D::new(x + size, y),
        ]
    }

    #[test]
    fn test_point_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("test");

        let mut w = ShapefileWriter::new(ShapeType::Point);
        w.add_field(AttributeField::new("NAME", FieldDataType::Character, 10, 0));
        w.point(1.0, 2.0, 0.0, None).unwrap();
        w.add_record(vec![FieldData::from("A")]);
        w.save(&base).unwrap();

        let mut sf = ShapefileReader::open(&base).unwrap();
        assert_eq!(sf.shape_type(), ShapeType::Point);
        let shape = sf.shape(0).unwrap();
        assert_eq!(shape.points, vec![Point2D::new(1.0, 2.0)]);
        assert_eq!(sf.record(0).unwrap(), Some(vec![FieldData::Text("A".to_string())]));
        assert_eq!(sf.field_names(), vec!["NAME".to_string()]);
        assert_eq!(sf.bbox(), Some([1.0, 2.0, 1.0, 2.0]));
        assert_eq!(sf.projection(), None);
    }

    #[test]
    fn test_auto_balance() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("balanced");

        let mut w = ShapefileWriter::new(ShapeType::Point);
        w.add_field(AttributeField::new("ID", FieldDataType::Number, 4, 0));
        for i in 0..3 {
            w.point(i as f64, i as f64, 0.0, None).unwrap();
        }
        w.add_record(vec![FieldData::Int(7)]);
        w.save(&base).unwrap();
        assert_eq!(w.num_shapes(), 3);
        assert_eq!(w.num_records(), 3);

        let mut sf = ShapefileReader::open(&base).unwrap();
        assert_eq!(sf.num_records().unwrap(), 3);
        assert_eq!(sf.index_entries().unwrap().len(), 3);
        assert_eq!(sf.shapes().unwrap().count(), 3);
        let recs: Vec<Vec<FieldData>> = sf.records().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0], vec![FieldData::Int(7)]);
        assert!(recs[2][0].is_null());

        // more records than shapes pads with null shapes
        let mut w = ShapefileWriter::new(ShapeType::Point);
        w.add_field(AttributeField::new("ID", FieldDataType::Number, 4, 0));
        w.add_record(vec![FieldData::Int(1)]);
        w.add_record(vec![FieldData::Int(2)]);
        w.balance();
        assert_eq!(w.num_shapes(), 2);
        assert_eq!(w.shape(1).unwrap().shape_type, ShapeType::Null);
    }

    #[test]
    fn test_unbalanced_without_auto_balance() {
        let dir = tempfile::tempdir().unwrap();
        let configs = Configs {
            auto_balance: false,
            ..Configs::default()
        };
        let mut w = ShapefileWriter::with_configs(ShapeType::Point, configs);
        w.point(0.0, 0.0, 0.0, None).unwrap();
        match w.save(dir.path().join("x")) {
            Err(ShapefileError::Unbalanced { shapes, records }) => {
                assert_eq!((shapes, records), (1, 0));
            }
            other => panic!("expected an unbalanced error, got {:?}", other),
        }
    }

    #[test]
    fn test_index_offsets_match_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("lines");

        let mut w = ShapefileWriter::new(ShapeType::PolyLineM);
        w.line(&[vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)]]).unwrap();
        w.null();
        w.line(&[
            vec![Point2D::new(2.0, 2.0), Point2D::new(3.0, 3.0), Point2D::new(4.0, 2.0)],
            vec![Point2D::new(5.0, 5.0), Point2D::new(6.0, 6.0)],
        ])
        .unwrap();
        w.save(&base).unwrap();

        let shp = fs::read(base.with_extension("shp")).unwrap();
        let shx = fs::read(base.with_extension("shx")).unwrap();
        assert_eq!(shx.len(), 100 + 3 * 8);
        assert_eq!(
            i32::from_be_bytes(shp[24..28].try_into().unwrap()) as usize * 2,
            shp.len()
        );
        for i in 0..3 {
            let e = 100 + i * 8;
            let offset = i32::from_be_bytes(shx[e..e + 4].try_into().unwrap()) as usize * 2;
            let length = i32::from_be_bytes(shx[e + 4..e + 8].try_into().unwrap());
            assert_eq!(
                i32::from_be_bytes(shp[offset..offset + 4].try_into().unwrap()),
                i as i32 + 1
            );
            assert_eq!(i32::from_be_bytes(shp[offset + 4..offset + 8].try_into().unwrap()), length);
            assert_eq!(length as usize * 2, w.shape(i).unwrap().get_length());
        }

        // the analytic index agrees with the recorded one
        let other = dir.path().join("lines_index_only");
        w.save_shx(&other).unwrap();
        assert_eq!(fs::read(other.with_extension("shx")).unwrap(), shx);
    }

    #[test]
    fn test_negative_and_out_of_range_indices() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("bounds");
        let mut w = ShapefileWriter::new(ShapeType::Point);
        for i in 0..3 {
            w.point(i as f64, 0.0, 0.0, None).unwrap();
        }
        w.save(&base).unwrap();

        let mut sf = ShapefileReader::open(&base).unwrap();
        assert_eq!(sf.shape(-1).unwrap().points[0].x, 2.0);
        assert_eq!(sf.shape(-3).unwrap().points[0].x, 0.0);
        assert!(matches!(
            sf.shape(3),
            Err(ShapefileError::OutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            sf.shape(-4),
            Err(ShapefileError::OutOfRange { index: -4, len: 3 })
        ));
        assert!(matches!(sf.record(5), Err(ShapefileError::OutOfRange { .. })));
    }

    #[test]
    fn test_deleted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("deleted");
        let mut w = ShapefileWriter::new(ShapeType::Point);
        w.add_field(AttributeField::new("NAME", FieldDataType::Character, 5, 0));
        for name in ["a", "b", "c"] {
            w.point(0.0, 0.0, 0.0, None).unwrap();
            w.add_record(vec![FieldData::from(name)]);
        }
        w.mark_deleted(1).unwrap();
        assert!(w.mark_deleted(3).is_err());
        w.save(&base).unwrap();

        let mut sf = ShapefileReader::open(&base).unwrap();
        assert_eq!(sf.num_records().unwrap(), 3);
        assert_eq!(sf.record(1).unwrap(), None);
        let names: Vec<FieldData> = sf
            .records()
            .unwrap()
            .map(|r| r.unwrap()[0].clone())
            .collect();
        assert_eq!(names, vec![FieldData::from("a"), FieldData::from("c")]);
        assert_eq!(sf.record(2).unwrap(), Some(vec![FieldData::from("c")]));
    }

    #[test]
    fn test_round_trip_all_types() {
        let dir = tempfile::tempdir().unwrap();
        let types = [
            ShapeType::Point,
            ShapeType::PointZ,
            ShapeType::PointM,
            ShapeType::MultiPoint,
            ShapeType::MultiPointZ,
            ShapeType::MultiPointM,
            ShapeType::PolyLine,
            ShapeType::PolyLineZ,
            ShapeType::PolyLineM,
            ShapeType::Polygon,
            ShapeType::PolygonZ,
            ShapeType::PolygonM,
            ShapeType::MultiPatch,
        ];
        let pts = [
            Point2D::new(1.5, -2.25),
            Point2D::new(3.0, 4.0),
            Point2D::new(-7.125, 0.5),
            Point2D::new(1.5, -2.25),
        ];
        for shape_type in types {
            let layout = shape_type.layout();
            let mut sfg = ShapefileGeometry::new(shape_type);
            let n = if layout.single_point { 1 } else { pts.len() };
            let z: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
            let m: Vec<Option<f64>> = (0..n).map(|i| Some(1.0 + i as f64)).collect();
            if layout.parts {
                if layout.has_z() {
                    sfg.add_partz(&pts[..n], &z, &m).unwrap();
                } else if layout.has_m() {
                    sfg.add_partm(&pts[..n], &m).unwrap();
                } else {
                    sfg.add_part(&pts[..n]);
                }
                if layout.part_types {
                    sfg.part_types.push(PatchType::OuterRing);
                }
            } else {
                for i in 0..n {
                    if layout.has_z() {
                        sfg.add_pointz(pts[i], z[i], m[i]);
                    } else if layout.has_m() {
                        sfg.add_pointm(pts[i], m[i]);
                    } else {
                        sfg.add_point(pts[i]);
                    }
                }
            }

            let base = dir.path().join(format!("type_{}", shape_type.to_int()));
            let mut w = ShapefileWriter::new(shape_type);
            w.add_shape(sfg.clone()).unwrap();
            w.save(&base).unwrap();

            let mut sf = ShapefileReader::open(&base).unwrap();
            let read = sf.shape(0).unwrap();
            assert_eq!(read.shape_type, shape_type);
            assert_eq!(read.points, sfg.points, "{}", shape_type);
            assert_eq!(read.parts, sfg.parts, "{}", shape_type);
            assert_eq!(read.z_array, sfg.z_array, "{}", shape_type);
            assert_eq!(read.m_array, sfg.m_array, "{}", shape_type);
            assert_eq!(read.part_types, sfg.part_types, "{}", shape_type);
        }
    }

    #[test]
    fn test_scan_without_index() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("noindex");
        let mut w = ShapefileWriter::new(ShapeType::Polygon);
        w.add_field(AttributeField::new("ID", FieldDataType::Number, 3, 0));
        w.poly(&[square(0.0, 0.0, 10.0), square(20.0, 0.0, 5.0)], &[]).unwrap();
        w.add_record(vec![FieldData::Int(1)]);
        w.poly(&[square(5.0, 5.0, 1.0)], &[]).unwrap();
        w.add_record(vec![FieldData::Int(2)]);
        w.save(&base).unwrap();

        let mut indexed = ShapefileReader::open(&base).unwrap();
        let shp = BufReader::new(File::open(base.with_extension("shp")).unwrap());
        let dbf = BufReader::new(File::open(base.with_extension("dbf")).unwrap());
        let mut scanned = ShapefileReader::from_readers(Some(shp), None, Some(dbf)).unwrap();
        for i in [0i64, 1, -1] {
            assert_eq!(scanned.shape(i).unwrap(), indexed.shape(i).unwrap());
        }
        // rings were closed on the way in
        assert_eq!(indexed.shape(1).unwrap().points.len(), 5);

        let shp = BufReader::new(File::open(base.with_extension("shp")).unwrap());
        let mut geometry_only = ShapefileReader::from_readers(Some(shp), None, None).unwrap();
        assert_eq!(geometry_only.num_records().unwrap(), 2);
        assert!(matches!(geometry_only.record(0), Err(ShapefileError::NoFile(_))));
    }

    #[test]
    fn test_encoding_error_aborts_save() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("bad");
        let mut w = ShapefileWriter::new(ShapeType::Point);
        w.add_field(AttributeField::new("COUNT", FieldDataType::Number, 4, 0));
        w.point(0.0, 0.0, 0.0, None).unwrap();
        w.add_record(vec![FieldData::from(12)]);
        w.point(1.0, 1.0, 0.0, None).unwrap();
        w.add_record(vec![FieldData::from("many")]);
        match w.save(&base) {
            Err(ShapefileError::Encoding { record, field, .. }) => {
                assert_eq!(record, 1);
                assert_eq!(field, "COUNT");
            }
            other => panic!("expected an encoding error, got {:?}", other),
        }
        assert!(!base.with_extension("shp").exists());
        assert!(!base.with_extension("dbf").exists());
    }

    #[test]
    fn test_missing_measures_skip_m_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nodata");
        let mut w = ShapefileWriter::new(ShapeType::PolyLineM);
        w.line(&[vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)]]).unwrap();
        w.save(&base).unwrap();
        assert_eq!(w.mbox(), [0.0, 0.0]);

        let mut sf = ShapefileReader::open(&base).unwrap();
        assert_eq!(sf.measure(), Some([0.0, 0.0]));
        let read = sf.shape(0).unwrap();
        assert_eq!(read.m_array, None);
        assert_eq!(read.points.len(), 2);
    }

    #[test]
    fn test_shape_type_mismatch() {
        let mut w = ShapefileWriter::new(ShapeType::Polygon);
        assert!(matches!(
            w.point(0.0, 0.0, 0.0, None),
            Err(ShapefileError::ShapeTypeMismatch { .. })
        ));
        let mut sfg = ShapefileGeometry::new(ShapeType::PolyLine);
        sfg.add_part(&[Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0)]);
        assert!(w.add_shape(sfg).is_err());
        w.null();
        assert_eq!(w.num_shapes(), 1);
    }

    #[test]
    fn test_projection_and_schema_copy() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("projected");
        let mut w = ShapefileWriter::new(ShapeType::MultiPoint);
        w.projection = "GEOGCS[\"WGS 84\"]".to_string();
        w.add_field_default("site name");
        w.add_field(AttributeField::new("ELEV", FieldDataType::Number, 8, 1));
        w.point(3.0, 4.0, 0.0, None).unwrap();
        w.add_record_by_name(&[("ELEV", FieldData::Real(12.34))]).unwrap();
        assert!(w.add_record_by_name(&[("NOPE", FieldData::Null)]).is_err());
        w.save(&base).unwrap();

        let mut sf = ShapefileReader::open(base.with_extension("shp")).unwrap();
        assert_eq!(sf.projection(), Some("GEOGCS[\"WGS 84\"]"));
        assert_eq!(sf.field_names(), vec!["site_name".to_string(), "ELEV".to_string()]);
        assert_eq!(sf.fields()[0].field_length, 50);
        let rec = sf.record(0).unwrap().unwrap();
        assert!(rec[0].is_null());
        assert_eq!(rec[1], FieldData::Real(12.3));

        let copy = ShapefileWriter::initialize_using(&sf, ShapeType::Point, true);
        assert_eq!(copy.fields(), sf.fields());
        assert_eq!(copy.projection, "GEOGCS[\"WGS 84\"]");
        assert_eq!(copy.num_shapes(), 0);
    }

    #[test]
    fn test_save_to_streams() {
        let mut w = ShapefileWriter::new(ShapeType::PointZ);
        w.add_field(AttributeField::new("OK", FieldDataType::Logical, 1, 0));
        w.point(1.0, 2.0, 3.0, Some(4.0)).unwrap();
        w.add_record(vec![FieldData::from(true)]);
        let (mut shp, mut shx, mut dbf) = (vec![], vec![], vec![]);
        w.save_to_streams(&mut shp, &mut shx, &mut dbf).unwrap();

        let mut sf = ShapefileReader::from_readers(
            Some(Cursor::new(shp)),
            Some(Cursor::new(shx)),
            Some(Cursor::new(dbf)),
        )
        .unwrap();
        assert_eq!(sf.elevation(), Some([3.0, 3.0]));
        let read = sf.shape(0).unwrap();
        assert_eq!(read.z_array, Some(vec![3.0]));
        assert_eq!(read.m_array, Some(vec![Some(4.0)]));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        match ShapefileReader::open(dir.path().join("absent")) {
            Err(ShapefileError::MissingFile { path, .. }) => {
                assert_eq!(path.extension().unwrap(), "shp");
            }
            other => panic!("expected a missing file error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_dotted_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut roads = ShapefileWriter::new(ShapeType::Point);
        roads.point(1.0, 1.0, 0.0, None).unwrap();
        roads.save(dir.path().join("roads")).unwrap();

        let mut first = ShapefileWriter::new(ShapeType::Point);
        first.point(2.0, 2.0, 0.0, None).unwrap();
        first.save(dir.path().join("roads.v2")).unwrap();
        for ext in ["shp", "shx", "dbf"] {
            assert!(dir.path().join(format!("roads.v2.{}", ext)).exists());
        }

        let mut second = ShapefileWriter::new(ShapeType::Point);
        second.point(3.0, 3.0, 0.0, None).unwrap();
        second.point(4.0, 4.0, 0.0, None).unwrap();
        second.save(dir.path().join("roads.v2.shp")).unwrap();

        let mut sf = ShapefileReader::open(dir.path().join("roads.v2.shp")).unwrap();
        assert_eq!(sf.num_records().unwrap(), 2);
        assert_eq!(sf.shape(0).unwrap().points, vec![Point2D::new(3.0, 3.0)]);
        assert_eq!(sf.file_name, Some(dir.path().join("roads.v2")));

        let mut untouched = ShapefileReader::open(dir.path().join("roads.SHP")).unwrap();
        assert_eq!(untouched.num_records().unwrap(), 1);
        assert_eq!(untouched.shape(0).unwrap().points, vec![Point2D::new(1.0, 1.0)]);

        assert_eq!(dataset_base(Path::new("a.b.dbf")), PathBuf::from("a.b"));
        assert_eq!(dataset_base(Path::new("a.b")), PathBuf::from("a.b"));
        assert_eq!(part_path(Path::new("a.b"), "shx"), PathBuf::from("a.b.shx"));
    }

    #[test]
    fn test_size_limit_checked_before_writing() {
        assert_eq!(length_in_words(200).unwrap(), 100);
        assert!(matches!(
            length_in_words(usize::MAX),
            Err(ShapefileError::Structural(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("limits");
        let mut w = ShapefileWriter::new(ShapeType::Point);
        w.point(1.0, 2.0, 0.0, None).unwrap();
        let header = w.prepare().unwrap();
        assert_eq!(header.file_length, 64);
        assert!(!part_path(&base, "shp").exists());
    }
}
