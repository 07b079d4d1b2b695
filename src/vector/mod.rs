/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT
*/

pub mod geo_interface;
pub mod shapefile;

// exports identifiers from sub-modules in the current module namespace
pub use self::geo_interface::{classify_rings, GeoGeometry, Position};
pub use self::shapefile::attributes::{AttributeField, DateData, FieldData, FieldDataType};
pub use self::shapefile::geometry::{PatchType, ShapeType, ShapefileGeometry};
pub use self::shapefile::{ShapefileHeader, ShapefileReader, ShapefileWriter};
pub use crate::structures::Point2D;
