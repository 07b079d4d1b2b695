/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT
*/
use crate::vector::ShapeType;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing a Shapefile dataset.
#[derive(Debug, Error)]
pub enum ShapefileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// One of the constituent files (.shp, .shx, .dbf) could not be opened.
    #[error("unable to open {}", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dataset was opened without a stream that the operation needs.
    #[error("no {0} file is available for this dataset")]
    NoFile(&'static str),

    /// The bytes on disk do not follow the format (bad magic, unknown codes, corrupt descriptors).
    #[error("malformed shapefile: {0}")]
    Structural(String),

    #[error("shape or record index {index} out of range for {len} records")]
    OutOfRange { index: i64, len: usize },

    /// A value could not be packed into its declared attribute field.
    #[error("cannot encode record {record}, field '{field}': {message}")]
    Encoding {
        record: usize,
        field: String,
        message: String,
    },

    #[error("attempt to add a {found} shape to a {expected} dataset")]
    ShapeTypeMismatch { expected: ShapeType, found: ShapeType },

    #[error("dataset is unbalanced: {shapes} shapes but {records} attribute records")]
    Unbalanced { shapes: usize, records: usize },
}

pub type Result<T> = std::result::Result<T, ShapefileError>;

impl ShapefileError {
    pub(crate) fn structural<S: Into<String>>(msg: S) -> ShapefileError {
        ShapefileError::Structural(msg.into())
    }
}
