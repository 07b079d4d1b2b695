/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT

Notes: Projects shapefile geometries into the nested-coordinate geometry
model used by GeoJSON.
*/
use crate::algorithms::signed_ring_area;
use crate::error::Result;
use crate::structures::Point2D;
use crate::vector::shapefile::{ShapeType, ShapefileGeometry};
use serde::{Deserialize, Serialize};

/// An `[x, y]` coordinate.
pub type Position = Vec<f64>;

/// A geometry in GeoJSON form. Serializes as `{"type": ..., "coordinates": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeoGeometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl GeoGeometry {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn positions(points: &[Point2D]) -> Vec<Position> {
    points.iter().map(|p| p.to_position()).collect()
}

/// Groups rings into polygons by winding. A ring with negative signed area
/// starts a new polygon; any other ring is a hole in the current polygon.
/// The first ring always starts a polygon.
pub fn classify_rings<'a>(rings: &[&'a [Point2D]]) -> Vec<Vec<&'a [Point2D]>> {
    let mut polys: Vec<Vec<&[Point2D]>> = vec![];
    for ring in rings {
        match polys.last_mut() {
            Some(poly) if signed_ring_area(ring) >= 0f64 => poly.push(*ring),
            _ => polys.push(vec![*ring]),
        }
    }
    polys
}

impl ShapefileGeometry {
    fn parts_as_slices(&self) -> Vec<&[Point2D]> {
        if self.parts.is_empty() {
            return vec![&self.points[..]];
        }
        (0..self.num_parts()).map(|i| self.part_points(i)).collect()
    }

    /// Projects the shape into GeoJSON form using x/y only. Null and
    /// MultiPatch shapes, and shapes without points, have no projection.
    pub fn to_geo_geometry(&self) -> Option<GeoGeometry> {
        if self.points.is_empty() {
            return None;
        }
        match self.shape_type.base_shape_type() {
            ShapeType::Point => Some(GeoGeometry::Point(self.points[0].to_position())),
            ShapeType::MultiPoint => Some(GeoGeometry::MultiPoint(positions(&self.points))),
            ShapeType::PolyLine => {
                if self.num_parts() <= 1 {
                    Some(GeoGeometry::LineString(positions(&self.points)))
                } else {
                    Some(GeoGeometry::MultiLineString(
                        self.parts_as_slices().into_iter().map(positions).collect(),
                    ))
                }
            }
            ShapeType::Polygon => {
                let mut polys: Vec<Vec<Vec<Position>>> = classify_rings(&self.parts_as_slices())
                    .into_iter()
                    .map(|poly| poly.into_iter().map(positions).collect())
                    .collect();
                if polys.len() == 1 {
                    polys.pop().map(GeoGeometry::Polygon)
                } else {
                    Some(GeoGeometry::MultiPolygon(polys))
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ring(coords: &[(f64, f64)]) -> Vec<Point2D> {
        coords.iter().map(|&c| Point2D::from(c)).collect()
    }

    fn cw_square(x: f64, y: f64, s: f64) -> Vec<Point2D> {
        ring(&[(x, y), (x, y + s), (x + s, y + s), (x + s, y), (x, y)])
    }

    fn ccw_square(x: f64, y: f64, s: f64) -> Vec<Point2D> {
        let mut r = cw_square(x, y, s);
        r.reverse();
        r
    }

    #[test]
    fn test_exterior_with_hole() {
        let mut sfg = ShapefileGeometry::new(ShapeType::Polygon);
        sfg.add_part(&cw_square(0.0, 0.0, 10.0));
        sfg.add_part(&ccw_square(2.0, 2.0, 2.0));
        match sfg.to_geo_geometry() {
            Some(GeoGeometry::Polygon(rings)) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[1][0], vec![2.0, 2.0]);
            }
            other => panic!("expected a polygon, got {:?}", other),
        }
        assert!(sfg.is_hole(1));
        assert!(!sfg.is_hole(0));
    }

    #[test]
    fn test_two_exteriors() {
        let mut sfg = ShapefileGeometry::new(ShapeType::PolygonZ);
        let a = cw_square(0.0, 0.0, 1.0);
        let b = cw_square(5.0, 5.0, 1.0);
        sfg.add_partz(&a, &[0.0; 5], &[None; 5]).unwrap();
        sfg.add_partz(&b, &[0.0; 5], &[None; 5]).unwrap();
        match sfg.to_geo_geometry() {
            Some(GeoGeometry::MultiPolygon(polys)) => {
                assert_eq!(polys.len(), 2);
                assert_eq!(polys[0].len(), 1);
                assert_eq!(polys[1].len(), 1);
                assert_eq!(polys[1][0][0], vec![5.0, 5.0]);
            }
            other => panic!("expected a multipolygon, got {:?}", other),
        }
    }

    #[test]
    fn test_first_ring_always_exterior() {
        let a = ccw_square(0.0, 0.0, 1.0);
        let b = ccw_square(0.2, 0.2, 0.1);
        let polys = classify_rings(&[&a[..], &b[..]]);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].len(), 2);
    }

    #[test]
    fn test_lines_and_points() {
        let mut line = ShapefileGeometry::new(ShapeType::PolyLine);
        line.add_part(&ring(&[(0.0, 0.0), (1.0, 1.0)]));
        assert_eq!(
            line.to_geo_geometry(),
            Some(GeoGeometry::LineString(vec![vec![0.0, 0.0], vec![1.0, 1.0]]))
        );
        line.add_part(&ring(&[(2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]));
        match line.to_geo_geometry() {
            Some(GeoGeometry::MultiLineString(lines)) => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[1].len(), 3);
            }
            other => panic!("expected a multilinestring, got {:?}", other),
        }

        let mut pt = ShapefileGeometry::new(ShapeType::PointM);
        pt.add_pointm(Point2D::new(1.0, 2.0), None);
        assert_eq!(pt.to_geo_geometry(), Some(GeoGeometry::Point(vec![1.0, 2.0])));
        assert_eq!(ShapefileGeometry::null().to_geo_geometry(), None);
    }

    #[test]
    fn test_json() {
        let g = GeoGeometry::Point(vec![1.5, 2.0]);
        assert_eq!(g.to_json().unwrap(), r#"{"type":"Point","coordinates":[1.5,2.0]}"#);
        let back: GeoGeometry = serde_json::from_str(&g.to_json().unwrap()).unwrap();
        assert_eq!(back, g);
    }
}
