// private sub-module defined in other files
mod poly_area;

// exports identifiers from private sub-modules in the current module namespace
pub use self::poly_area::{polygon_area, signed_ring_area};
