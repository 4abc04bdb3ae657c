// Copyright 2023 Viktor Reusch
//
// This file is part of gpx_kml_geojson.
//
// gpx_kml_geojson is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// gpx_kml_geojson is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with gpx_kml_geojson. If not, see <https://www.gnu.org/licenses/>.

//! Extraction of geometries from KML placemarks.

use geojson::{Geometry, Value};
use roxmltree::Node;

use crate::dom::{all_by_tag, first_by_tag, parse_float, text};

/// Containers that are unwrapped instead of scanned.
const CONTAINERS: &[&str] = &["MultiGeometry", "MultiTrack", "gx:MultiTrack"];
/// Atomic geometry types in the order they are collected.
const GEOMETRY_TYPES: &[&str] = &["Polygon", "LineString", "Point", "Track", "gx:Track"];

/// All geometries found below a placemark.
#[derive(Debug, Default)]
pub struct Resolved {
    pub geometries: Vec<Geometry>,
    /// Timestamps of every track that has any.
    pub coord_times: Vec<Vec<String>>,
}

/// Collect the geometries below `node`.
///
/// A multi-geometry container below `node` takes precedence over everything
/// else: only the first one is looked at, recursively. Otherwise, geometries
/// are collected grouped by type in [`GEOMETRY_TYPES`] order.
pub fn resolve(node: Node) -> Resolved {
    for container in CONTAINERS {
        if let Some(inner) = first_by_tag(node, container) {
            return resolve(inner);
        }
    }

    let mut resolved = Resolved::default();
    for geometry_type in GEOMETRY_TYPES {
        for element in all_by_tag(node, geometry_type) {
            let value = match *geometry_type {
                "Polygon" => Value::Polygon(
                    all_by_tag(element, "LinearRing").map(coordinates).collect(),
                ),
                "LineString" => Value::LineString(coordinates(element)),
                "Point" => Value::Point(parse_tuple(&text(first_by_tag(element, "coordinates")))),
                _ => {
                    let track = read_track(element);
                    if !track.times.is_empty() {
                        resolved.coord_times.push(track.times);
                    }
                    Value::LineString(track.coordinates)
                }
            };
            resolved.geometries.push(Geometry::new(value));
        }
    }
    resolved
}

/// Parse the `coordinates` child of `node` as a list of tuples.
fn coordinates(node: Node) -> Vec<Vec<f64>> {
    parse_tuples(&text(first_by_tag(node, "coordinates")))
}

/// Parse a single `lon,lat[,alt]` tuple; whitespace is insignificant.
///
/// Non-numeric components become `NaN`.
fn parse_tuple(s: &str) -> Vec<f64> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    compact.split(',').map(parse_float).collect()
}

/// Parse whitespace separated tuples.
///
/// Blank text still yields a single tuple of `NaN`.
fn parse_tuples(s: &str) -> Vec<Vec<f64>> {
    let s = s.trim();
    if s.is_empty() {
        return vec![parse_tuple(s)];
    }
    s.split_whitespace().map(parse_tuple).collect()
}

/// Coordinates and timestamps of a `Track` or `gx:Track`.
struct Track {
    coordinates: Vec<Vec<f64>>,
    times: Vec<String>,
}

fn read_track(node: Node) -> Track {
    let mut coords: Vec<_> = all_by_tag(node, "coord").collect();
    if coords.is_empty() {
        coords = all_by_tag(node, "gx:coord").collect();
    }

    Track {
        coordinates: coords
            .into_iter()
            .map(|c| text(Some(c)).split(' ').map(parse_float).collect())
            .collect(),
        times: all_by_tag(node, "when").map(|w| text(Some(w))).collect(),
    }
}
