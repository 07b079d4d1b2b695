/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT
*/

use crate::structures::Point2D;

/// Calculates the signed area of a ring using the shoelace formula.
///
/// The sum runs over the closed cycle of vertices, so a ring may or may not
/// repeat its first vertex at the end. A value >= 0 indicates a
/// counter-clockwise ring; a negative value indicates a clockwise ring.
/// Degenerate rings (fewer than three vertices) have zero area.
pub fn signed_ring_area(vertices: &[Point2D]) -> f64 {
    let num_vertices = vertices.len();
    if num_vertices < 3 {
        return 0f64;
    }

    let mut area = 0f64;
    for i in 0..num_vertices {
        let j = (i + 1) % num_vertices;
        area += vertices[i].x * vertices[j].y - vertices[j].x * vertices[i].y;
    }

    area / 2.0f64
}

/// Calculates the area of a polygon defined by a series of vertices.
pub fn polygon_area(vertices: &[Point2D]) -> f64 {
    signed_ring_area(vertices).abs()
}
