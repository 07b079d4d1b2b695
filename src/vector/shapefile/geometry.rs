/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT
*/
use crate::algorithms::signed_ring_area;
use crate::error::{Result, ShapefileError};
use crate::structures::{BoundingBox, Point2D};
use std::f64;
use std::fmt;

/// Measures at or below this value are "no data" in the Shapefile format.
pub const NO_DATA_THRESHOLD: f64 = -10e38;

/// The raw value written for a missing measure.
pub const NO_DATA_MEASURE: f64 = -1.0e39;

/// Maps a raw measure read from disk onto an optional value.
pub fn measure_from_raw(value: f64) -> Option<f64> {
    if value > NO_DATA_THRESHOLD {
        Some(value)
    } else {
        None
    }
}

/// Maps an optional measure onto the raw value written to disk.
pub fn measure_to_raw(value: Option<f64>) -> f64 {
    value.unwrap_or(NO_DATA_MEASURE)
}

/// The optional fields present in a geometry record of a given `ShapeType`.
///
/// Every field, in file order, is listed here; a record's bytes are a
/// function of its layout and its part/point counts only.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub bbox: bool,
    pub parts: bool,
    pub points: bool,
    pub part_types: bool,
    pub z_block: bool,
    pub m_block: bool,
    pub single_point: bool,
    pub single_z: bool,
    pub single_m: bool,
}

const NULL_LAYOUT: RecordLayout = RecordLayout {
    bbox: false,
    parts: false,
    points: false,
    part_types: false,
    z_block: false,
    m_block: false,
    single_point: false,
    single_z: false,
    single_m: false,
};

const POINT_LAYOUT: RecordLayout = RecordLayout {
    single_point: true,
    ..NULL_LAYOUT
};

const POINT_M_LAYOUT: RecordLayout = RecordLayout {
    single_m: true,
    ..POINT_LAYOUT
};

const POINT_Z_LAYOUT: RecordLayout = RecordLayout {
    single_z: true,
    ..POINT_M_LAYOUT
};

const MULTIPOINT_LAYOUT: RecordLayout = RecordLayout {
    bbox: true,
    points: true,
    ..NULL_LAYOUT
};

const MULTIPOINT_M_LAYOUT: RecordLayout = RecordLayout {
    m_block: true,
    ..MULTIPOINT_LAYOUT
};

const MULTIPOINT_Z_LAYOUT: RecordLayout = RecordLayout {
    z_block: true,
    ..MULTIPOINT_M_LAYOUT
};

const POLY_LAYOUT: RecordLayout = RecordLayout {
    parts: true,
    ..MULTIPOINT_LAYOUT
};

const POLY_M_LAYOUT: RecordLayout = RecordLayout {
    m_block: true,
    ..POLY_LAYOUT
};

const POLY_Z_LAYOUT: RecordLayout = RecordLayout {
    z_block: true,
    ..POLY_M_LAYOUT
};

const MULTIPATCH_LAYOUT: RecordLayout = RecordLayout {
    part_types: true,
    ..POLY_Z_LAYOUT
};

impl RecordLayout {
    /// Content length in bytes, excluding the 8-byte record header.
    ///
    /// `with_m_block` lets readers drop the M block when the dataset-level
    /// measure range says it is absent; writers always pass `self.m_block`.
    pub fn content_length(&self, num_parts: usize, num_points: usize, with_m_block: bool) -> usize {
        let mut len = 4; // shape type
        if self.bbox {
            len += 32;
        }
        if self.parts {
            len += 4 + 4 * num_parts;
        }
        if self.points {
            len += 4 + 16 * num_points;
        }
        if self.part_types {
            len += 4 * num_parts;
        }
        if self.z_block {
            len += 16 + 8 * num_points;
        }
        if self.m_block && with_m_block {
            len += 16 + 8 * num_points;
        }
        if self.single_point {
            len += 16;
        }
        if self.single_z {
            len += 8;
        }
        if self.single_m {
            len += 8;
        }
        len
    }

    pub fn has_z(&self) -> bool {
        self.z_block || self.single_z
    }

    pub fn has_m(&self) -> bool {
        self.m_block || self.single_m
    }
}

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Null = 0,
    Point = 1,
    PolyLine = 3,
    Polygon = 5,
    MultiPoint = 8,
    PointZ = 11,
    PolyLineZ = 13,
    PolygonZ = 15,
    MultiPointZ = 18,
    PointM = 21,
    PolyLineM = 23,
    PolygonM = 25,
    MultiPointM = 28,
    MultiPatch = 31,
}

impl ShapeType {
    pub fn from_int(value: i32) -> Result<ShapeType> {
        match value {
            0 => Ok(ShapeType::Null),
            1 => Ok(ShapeType::Point),
            3 => Ok(ShapeType::PolyLine),
            5 => Ok(ShapeType::Polygon),
            8 => Ok(ShapeType::MultiPoint),
            11 => Ok(ShapeType::PointZ),
            13 => Ok(ShapeType::PolyLineZ),
            15 => Ok(ShapeType::PolygonZ),
            18 => Ok(ShapeType::MultiPointZ),
            21 => Ok(ShapeType::PointM),
            23 => Ok(ShapeType::PolyLineM),
            25 => Ok(ShapeType::PolygonM),
            28 => Ok(ShapeType::MultiPointM),
            31 => Ok(ShapeType::MultiPatch),
            _ => Err(ShapefileError::structural(format!(
                "unrecognized shape type code {}",
                value
            ))),
        }
    }

    pub fn to_int(&self) -> i32 {
        *self as i32
    }

    /// The field table for this shape type.
    pub fn layout(&self) -> RecordLayout {
        match self {
            ShapeType::Null => NULL_LAYOUT,
            ShapeType::Point => POINT_LAYOUT,
            ShapeType::PointM => POINT_M_LAYOUT,
            ShapeType::PointZ => POINT_Z_LAYOUT,
            ShapeType::MultiPoint => MULTIPOINT_LAYOUT,
            ShapeType::MultiPointM => MULTIPOINT_M_LAYOUT,
            ShapeType::MultiPointZ => MULTIPOINT_Z_LAYOUT,
            ShapeType::PolyLine | ShapeType::Polygon => POLY_LAYOUT,
            ShapeType::PolyLineM | ShapeType::PolygonM => POLY_M_LAYOUT,
            ShapeType::PolyLineZ | ShapeType::PolygonZ => POLY_Z_LAYOUT,
            ShapeType::MultiPatch => MULTIPATCH_LAYOUT,
        }
    }

    pub fn base_shape_type(&self) -> ShapeType {
        match self {
            ShapeType::Null => ShapeType::Null,
            ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => ShapeType::Point,
            ShapeType::PolyLine | ShapeType::PolyLineZ | ShapeType::PolyLineM => {
                ShapeType::PolyLine
            }
            ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => ShapeType::Polygon,
            ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
                ShapeType::MultiPoint
            }
            ShapeType::MultiPatch => ShapeType::MultiPatch,
        }
    }
}

impl Default for ShapeType {
    fn default() -> ShapeType {
        ShapeType::Null
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let printable = match *self {
            ShapeType::Null => "Null",
            ShapeType::Point => "Point",
            ShapeType::PolyLine => "PolyLine",
            ShapeType::Polygon => "Polygon",
            ShapeType::MultiPoint => "MultiPoint",
            ShapeType::PointZ => "PointZ",
            ShapeType::PolyLineZ => "PolyLineZ",
            ShapeType::PolygonZ => "PolygonZ",
            ShapeType::MultiPointZ => "MultiPointZ",
            ShapeType::PointM => "PointM",
            ShapeType::PolyLineM => "PolyLineM",
            ShapeType::PolygonM => "PolygonM",
            ShapeType::MultiPointM => "MultiPointM",
            ShapeType::MultiPatch => "MultiPatch",
        };
        write!(f, "{}", printable)
    }
}

/// Per-part surface type of a MultiPatch record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatchType {
    TriangleStrip,
    TriangleFan,
    OuterRing,
    InnerRing,
    FirstRing,
    Ring,
    /// A code outside the published table, kept so it survives a rewrite.
    Other(i32),
}

impl PatchType {
    pub fn from_int(value: i32) -> PatchType {
        match value {
            0 => PatchType::TriangleStrip,
            1 => PatchType::TriangleFan,
            2 => PatchType::OuterRing,
            3 => PatchType::InnerRing,
            4 => PatchType::FirstRing,
            5 => PatchType::Ring,
            v => PatchType::Other(v),
        }
    }

    pub fn to_int(&self) -> i32 {
        match self {
            PatchType::TriangleStrip => 0,
            PatchType::TriangleFan => 1,
            PatchType::OuterRing => 2,
            PatchType::InnerRing => 3,
            PatchType::FirstRing => 4,
            PatchType::Ring => 5,
            PatchType::Other(v) => *v,
        }
    }
}

/// One shape: its type tag, vertices, and optional elevation/measure channels.
///
/// `parts` holds the index of the first vertex of each part. `z_array` and
/// `m_array`, when present, run parallel to `points`; a `None` measure is
/// the format's "no data" value.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapefileGeometry {
    pub shape_type: ShapeType,
    pub bounding_box: Option<BoundingBox>,
    pub parts: Vec<i32>,
    pub part_types: Vec<PatchType>,
    pub points: Vec<Point2D>,
    pub z_array: Option<Vec<f64>>,
    pub m_array: Option<Vec<Option<f64>>>,
}

impl ShapefileGeometry {
    /// ShapefileGeometry constructor method.
    pub fn new(shape_type: ShapeType) -> ShapefileGeometry {
        ShapefileGeometry {
            shape_type,
            ..Default::default()
        }
    }

    pub fn null() -> ShapefileGeometry {
        ShapefileGeometry::new(ShapeType::Null)
    }

    pub fn num_parts(&self) -> usize {
        self.parts.len()
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Adds a single Point2D to the ShapefileGeometry's points array.
    pub fn add_point(&mut self, p: Point2D) {
        self.points.push(p);
        self.update_bounding_box(&p);
    }

    /// Adds a single Point2D and measure to the ShapefileGeometry.
    pub fn add_pointm(&mut self, p: Point2D, m: Option<f64>) {
        self.m_array.get_or_insert_with(Vec::new).push(m);
        self.add_point(p);
    }

    /// Adds a single Point2D, z-value, and measure to the ShapefileGeometry.
    pub fn add_pointz(&mut self, p: Point2D, z: f64, m: Option<f64>) {
        self.z_array.get_or_insert_with(Vec::new).push(z);
        self.add_pointm(p, m);
    }

    /// Adds a part of Point2Ds to the ShapefileGeometry.
    pub fn add_part(&mut self, points: &[Point2D]) {
        self.parts.push(self.points.len() as i32);
        for p in points {
            self.add_point(*p);
        }
    }

    /// Adds a part of Point2Ds and measures to the ShapefileGeometry.
    pub fn add_partm(&mut self, points: &[Point2D], measures: &[Option<f64>]) -> Result<()> {
        if points.len() != measures.len() {
            return Err(ShapefileError::structural(
                "points and measures arrays must be of equal length",
            ));
        }
        self.parts.push(self.points.len() as i32);
        for (p, m) in points.iter().zip(measures) {
            self.add_pointm(*p, *m);
        }
        Ok(())
    }

    /// Adds a part of Point2Ds, z-values, and measures to the ShapefileGeometry.
    pub fn add_partz(
        &mut self,
        points: &[Point2D],
        z_values: &[f64],
        measures: &[Option<f64>],
    ) -> Result<()> {
        if points.len() != z_values.len() || points.len() != measures.len() {
            return Err(ShapefileError::structural(
                "points, z, and measures arrays must be of equal length",
            ));
        }
        self.parts.push(self.points.len() as i32);
        for i in 0..points.len() {
            self.add_pointz(points[i], z_values[i], measures[i]);
        }
        Ok(())
    }

    /// Adds a MultiPatch part with its surface type.
    pub fn add_patch(
        &mut self,
        patch_type: PatchType,
        points: &[Point2D],
        z_values: &[f64],
        measures: &[Option<f64>],
    ) -> Result<()> {
        self.add_partz(points, z_values, measures)?;
        self.part_types.push(patch_type);
        Ok(())
    }

    fn update_bounding_box(&mut self, p: &Point2D) {
        match self.bounding_box.as_mut() {
            Some(bb) => bb.expand_to_point(p),
            None => self.bounding_box = Some(BoundingBox::new(p.x, p.x, p.y, p.y)),
        }
    }

    /// The x/y extent of the vertices, recomputed from the points.
    pub fn get_bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }

    /// Minimum and maximum elevation, or `None` without z data.
    pub fn z_range(&self) -> Option<(f64, f64)> {
        let z = self.z_array.as_ref()?;
        range(z.iter().copied())
    }

    /// Minimum and maximum of the measures that carry data.
    pub fn m_range(&self) -> Option<(f64, f64)> {
        let m = self.m_array.as_ref()?;
        range(m.iter().filter_map(|v| *v))
    }

    /// Returns the length of the record content in bytes, excluding the 8-byte record header.
    pub fn get_length(&self) -> usize {
        self.shape_type
            .layout()
            .content_length(self.num_parts(), self.num_points(), true)
    }

    /// The vertex range of a part; the final part runs to the end of the points.
    /// Offsets outside the point list are clamped, so the range is always in bounds.
    pub fn part_range(&self, part_num: usize) -> std::ops::Range<usize> {
        let n = self.points.len();
        let clamp = |offset: i32| (offset.max(0) as usize).min(n);
        let start = clamp(self.parts[part_num]);
        let end = match self.parts.get(part_num + 1) {
            Some(&next) => clamp(next).max(start),
            None => n,
        };
        start..end
    }

    /// The vertices of a part.
    pub fn part_points(&self, part_num: usize) -> &[Point2D] {
        &self.points[self.part_range(part_num)]
    }

    /// Checks whether or not a part in a polygon is a hole, i.e. wound
    /// counter-clockwise (non-negative signed area).
    pub fn is_hole(&self, part_num: usize) -> bool {
        if self.shape_type.base_shape_type() != ShapeType::Polygon || part_num >= self.num_parts()
        {
            return false;
        }
        signed_ring_area(self.part_points(part_num)) >= 0f64
    }

    /// Checks the structural invariants required before the record can be written.
    pub fn validate(&self) -> Result<()> {
        let layout = self.shape_type.layout();
        let n = self.points.len();
        if layout.single_point && n != 1 {
            return Err(ShapefileError::structural(format!(
                "a {} record must contain exactly one point, found {}",
                self.shape_type, n
            )));
        }
        if layout.parts {
            let mut prev: Option<i32> = None;
            for (i, &p) in self.parts.iter().enumerate() {
                let bad_start = i == 0 && p != 0;
                let not_increasing = prev.map_or(false, |q| p <= q);
                if bad_start || not_increasing || p < 0 || p as usize >= n.max(1) {
                    return Err(ShapefileError::structural(format!(
                        "invalid part offsets {:?} for {} points",
                        self.parts, n
                    )));
                }
                prev = Some(p);
            }
        }
        if layout.part_types && !self.part_types.is_empty() && self.part_types.len() != self.parts.len() {
            return Err(ShapefileError::structural(
                "a MultiPatch record needs one part type per part",
            ));
        }
        if let Some(z) = &self.z_array {
            if z.len() != n {
                return Err(ShapefileError::structural("z array length differs from point count"));
            }
        }
        if let Some(m) = &self.m_array {
            if m.len() != n {
                return Err(ShapefileError::structural("m array length differs from point count"));
            }
        }
        Ok(())
    }
}

fn range<I: Iterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

impl Default for ShapefileGeometry {
    fn default() -> ShapefileGeometry {
        ShapefileGeometry {
            shape_type: ShapeType::Null,
            bounding_box: None,
            parts: vec![],
            part_types: vec![],
            points: vec![],
            z_array: None,
            m_array: None,
        }
    }
}

impl fmt::Display for ShapefileGeometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "shape_type: {}
bounding_box: {:?}
num_parts: {}
num_points: {}
parts: {:?}
points: {:?}
z_array: {:?}
m_array: {:?}",
            self.shape_type,
            self.bounding_box.map(|bb| bb.to_array()),
            self.num_parts(),
            self.num_points(),
            self.parts,
            self.points,
            self.z_array,
            self.m_array
        )
    }
}
