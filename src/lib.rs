/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT
*/

//! Reading and writing ESRI Shapefile datasets: the geometry stream (.shp),
//! its positional index (.shx) and the dBase attribute table (.dbf).

pub mod algorithms;
pub mod configs;
pub mod error;
pub mod structures;
pub mod utils;
pub mod vector;

pub use crate::configs::Configs;
pub use crate::error::{Result, ShapefileError};
pub use crate::vector::{ShapefileReader, ShapefileWriter};
