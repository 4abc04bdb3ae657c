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

//! Translation of [GPX](https://www.topografix.com/gpx.asp) documents.
//!
//! Tracks, routes, and waypoints each become one feature, in that order.
//! Tracks and routes with fewer than two points are dropped.

use geojson::{Feature, Geometry, JsonObject, JsonValue, Value};
use roxmltree::{Descendants, Document, Node};
use serde_json::json;
use tracing::debug;

use crate::dom::{
    all_by_tag, attr, child_text, first_by_tag, has_tag, parse_float, parse_number,
    qualified_name, text,
};
use crate::feature::{collection, feature, single_or_nested};

/// Namespace of the Garmin GPX extensions copied into feature properties.
const GARMIN_NS: &str = "http://www.garmin.com/xmlschemas/GpxExtensions/v3";
/// Children copied verbatim into the properties of every feature.
const TEXT_PROPERTIES: &[&str] = &["name", "cmt", "desc", "type", "time", "keywords"];
/// Pixels per millimeter at 96 DPI.
const PX_PER_MM: f64 = 96.0 / 25.4;

/// A numeric per-point value, collected into a per-line array property.
struct PointAttribute {
    /// Tag name inside a point's `extensions`.
    name: &'static str,
    /// Property name of the collected array.
    plural: &'static str,
}

const ATTRIBUTE_COUNT: usize = 5;

/// Per-point attributes in the order their properties are emitted.
const POINT_ATTRIBUTES: [PointAttribute; ATTRIBUTE_COUNT] = [
    PointAttribute { name: "speed", plural: "speeds" },
    PointAttribute { name: "course", plural: "courses" },
    PointAttribute { name: "hAcc", plural: "hAccs" },
    PointAttribute { name: "vAcc", plural: "vAccs" },
    PointAttribute { name: "heartRate", plural: "heartRates" },
];
/// Index of the heart rate in [`POINT_ATTRIBUTES`]; it is read from `hr`.
const HEART_RATE: usize = 4;

/// Values of all [`POINT_ATTRIBUTES`] for a single entity.
type AttributeValues<T> = [T; ATTRIBUTE_COUNT];

/// Translate a complete GPX document into a feature collection.
pub fn translate_gpx(doc: &Document) -> geojson::FeatureCollection {
    collection(gpx_features(doc))
}

/// Lazily translate a GPX document.
///
/// Every call starts a fresh walk over `doc`.
pub fn gpx_features<'a, 'input>(doc: &'a Document<'input>) -> GpxFeatures<'a, 'input> {
    let root = doc.root();
    GpxFeatures {
        root,
        kind: Some(Kind::Track),
        nodes: root.descendants(),
    }
}

/// Iterator over the features of a GPX document, created by [`gpx_features`].
pub struct GpxFeatures<'a, 'input> {
    root: Node<'a, 'input>,
    /// Category currently searched for, `None` once all are exhausted.
    kind: Option<Kind>,
    nodes: Descendants<'a, 'input>,
}

impl Iterator for GpxFeatures<'_, '_> {
    type Item = Feature;

    fn next(&mut self) -> Option<Feature> {
        loop {
            let kind = self.kind?;
            match self.nodes.find(|n| has_tag(*n, kind.tag())) {
                Some(node) => {
                    if let Some(feature) = kind.translate(node) {
                        return Some(feature);
                    }
                }
                None => {
                    self.kind = kind.next();
                    self.nodes = self.root.descendants();
                }
            }
        }
    }
}

/// Top-level GPX entities, in output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Track,
    Route,
    Waypoint,
}

impl Kind {
    fn tag(self) -> &'static str {
        match self {
            Kind::Track => "trk",
            Kind::Route => "rte",
            Kind::Waypoint => "wpt",
        }
    }

    fn next(self) -> Option<Kind> {
        match self {
            Kind::Track => Some(Kind::Route),
            Kind::Route => Some(Kind::Waypoint),
            Kind::Waypoint => None,
        }
    }

    fn translate(self, node: Node) -> Option<Feature> {
        match self {
            Kind::Track => convert_track(node),
            Kind::Route => convert_route(node),
            Kind::Waypoint => Some(convert_waypoint(node)),
        }
    }
}

/// Data read from a single `trkpt`, `rtept`, or `wpt`.
#[derive(Debug, PartialEq)]
struct PointData {
    /// `[lon, lat]` plus the elevation if it is numeric.
    coordinates: Vec<f64>,
    time: Option<String>,
    attributes: AttributeValues<Option<f64>>,
}

/// Read the coordinates and per-point values of `node`.
fn read_point(node: Node) -> PointData {
    let mut coordinates = vec![
        parse_float(attr(node, "lon").unwrap_or_default()),
        parse_float(attr(node, "lat").unwrap_or_default()),
    ];
    if let Some(ele) = child_text(node, "ele").and_then(|e| parse_number(&e)) {
        coordinates.push(ele);
    }

    let mut attributes: AttributeValues<Option<f64>> = [None; ATTRIBUTE_COUNT];
    attributes[HEART_RATE] = child_text(node, "gpxtpx:hr")
        .or_else(|| child_text(node, "hr"))
        .and_then(|hr| parse_number(&hr));

    if let Some(extensions) = first_by_tag(node, "extensions") {
        for (i, attribute) in POINT_ATTRIBUTES.iter().enumerate() {
            if i == HEART_RATE {
                continue;
            }
            attributes[i] = child_text(extensions, attribute.name).and_then(|v| parse_number(&v));
        }
    }

    PointData {
        coordinates,
        time: child_text(node, "time"),
        attributes,
    }
}

/// A line of at least two points with its per-point data.
#[derive(Debug, Default, PartialEq)]
struct Line {
    coordinates: Vec<Vec<f64>>,
    times: Vec<String>,
    /// For every attribute occurring on any point, one value per point.
    attributes: AttributeValues<Option<Vec<Option<f64>>>>,
}

impl Line {
    /// Collect all `point_tag` elements below `node` into a line.
    ///
    /// Returns `None` for fewer than two points.
    fn read(node: Node, point_tag: &'static str) -> Option<Line> {
        let points: Vec<_> = all_by_tag(node, point_tag).collect();
        if points.len() < 2 {
            return None;
        }

        let mut line = Line::default();
        for (i, point) in points.into_iter().enumerate() {
            let point = read_point(point);
            line.coordinates.push(point.coordinates);
            line.times.extend(point.time);

            for (values, value) in line.attributes.iter_mut().zip(point.attributes) {
                // Zero counts as missing.
                let value = value.filter(|v| *v != 0.0);
                if value.is_some() || values.is_some() {
                    values.get_or_insert_with(|| vec![None; i]).push(value);
                }
            }
        }

        Some(line)
    }

    /// Per-point values of attribute `i`, `null` padded if it never occurs.
    fn attribute_or_nulls(&self, i: usize) -> JsonValue {
        match &self.attributes[i] {
            Some(values) => json!(values),
            None => json!(vec![JsonValue::Null; self.coordinates.len()]),
        }
    }
}

/// Convert a GPX `trk` with its segments.
///
/// A single valid segment becomes a _LineString_, several become a
/// _MultiLineString_. Without a valid segment there is no feature.
fn convert_track(node: Node) -> Option<Feature> {
    let segments: Vec<Option<Line>> = all_by_tag(node, "trkseg")
        .map(|segment| Line::read(segment, "trkpt"))
        .collect();
    let lines: Vec<&Line> = segments.iter().flatten().collect();
    if lines.is_empty() {
        debug!(segments = segments.len(), "skipping track without valid segment");
        return None;
    }

    let mut properties = read_properties(node);
    push_line_style(node, &mut properties);

    let times: Vec<JsonValue> = lines
        .iter()
        .filter(|line| !line.times.is_empty())
        .map(|line| json!(line.times))
        .collect();
    if !times.is_empty() {
        // Nesting follows the number of lines, not the lines having times.
        let times = if lines.len() == 1 {
            single_or_nested(times)
        } else {
            JsonValue::Array(times)
        };
        properties.insert("coordTimes".to_string(), times);
    }

    for (i, attribute) in POINT_ATTRIBUTES.iter().enumerate() {
        if !segments.iter().flatten().any(|line| line.attributes[i].is_some()) {
            continue;
        }

        let value = if let [line] = lines.as_slice() {
            line.attribute_or_nulls(i)
        } else {
            // Invalid segments contribute an empty array to stay aligned
            // with the segment list.
            JsonValue::Array(
                segments
                    .iter()
                    .map(|segment| match segment {
                        Some(line) => line.attribute_or_nulls(i),
                        None => json!([]),
                    })
                    .collect(),
            )
        };
        properties.insert(attribute.plural.to_string(), value);
    }

    let value = match lines.as_slice() {
        [line] => Value::LineString(line.coordinates.clone()),
        _ => Value::MultiLineString(lines.iter().map(|l| l.coordinates.clone()).collect()),
    };

    Some(feature(Some(Geometry::new(value)), properties, None))
}

/// Convert a GPX `rte` to a _LineString_.
fn convert_route(node: Node) -> Option<Feature> {
    let Some(line) = Line::read(node, "rtept") else {
        debug!("skipping route with less than two points");
        return None;
    };

    let mut properties = read_properties(node);
    push_line_style(node, &mut properties);

    let geometry = Geometry::new(Value::LineString(line.coordinates));
    Some(feature(Some(geometry), properties, None))
}

/// Convert a GPX `wpt` to a _Point_.
fn convert_waypoint(node: Node) -> Feature {
    let mut properties = read_properties(node);
    if let Some(sym) = child_text(node, "sym") {
        properties.insert("sym".to_string(), json!(sym));
    }

    let geometry = Geometry::new(Value::Point(read_point(node).coordinates));
    feature(Some(geometry), properties, None)
}

/// Read the properties shared by tracks, routes, and waypoints.
fn read_properties(node: Node) -> JsonObject {
    let mut properties = JsonObject::new();
    for tag in TEXT_PROPERTIES {
        if let Some(value) = child_text(node, tag) {
            properties.insert(tag.to_string(), json!(value));
        }
    }

    // Only extensions of `node` itself, not those of its points.
    for extension in node.descendants().filter(|n| {
        n.is_element()
            && n.tag_name().namespace() == Some(GARMIN_NS)
            && n.parent().and_then(|p| p.parent()) == Some(node)
    }) {
        let key = qualified_name(extension).replacen(':', "_", 1);
        properties.insert(key, json!(text(Some(extension))));
    }

    let links: Vec<JsonValue> = all_by_tag(node, "link").map(read_link).collect();
    if !links.is_empty() {
        properties.insert("links".to_string(), JsonValue::Array(links));
    }

    properties
}

/// Convert a `link` to an object with `href` and optional `text` and `type`.
fn read_link(link: Node) -> JsonValue {
    let mut object = JsonObject::new();
    object.insert("href".to_string(), json!(attr(link, "href")));
    for tag in ["text", "type"] {
        if let Some(value) = child_text(link, tag) {
            object.insert(tag.to_string(), json!(value));
        }
    }
    JsonValue::Object(object)
}

/// Insert the line style from `extensions/line` below `node`, if any.
///
/// Widths are given in millimeters and converted to pixels.
fn push_line_style(node: Node, properties: &mut JsonObject) {
    let Some(line) = first_by_tag(node, "extensions").and_then(|e| first_by_tag(e, "line")) else {
        return;
    };

    let color = child_text(line, "color").unwrap_or_default();
    if !color.is_empty() {
        properties.insert("stroke".to_string(), json!(color));
    }
    if let Some(opacity) = child_text(line, "opacity").and_then(|o| parse_number(&o)) {
        properties.insert("stroke-opacity".to_string(), json!(opacity));
    }
    if let Some(width) = child_text(line, "width").and_then(|w| parse_number(&w)) {
        properties.insert("stroke-width".to_string(), json!(width * PX_PER_MM));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Document {
        Document::parse(source).unwrap()
    }

    #[test]
    fn reads_point_values() {
        let doc = parse(
            r#"<gpx xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
            <trkpt lon="1.5" lat="2.5"><ele>x</ele><time>T</time>
                <extensions><speed>3</speed><course>n/a</course><heartRate>9</heartRate>
                <gpxtpx:hr>120</gpxtpx:hr></extensions>
            </trkpt></gpx>"#,
        );
        let point = read_point(first_by_tag(doc.root(), "trkpt").unwrap());

        assert_eq!(point.coordinates, vec![1.5, 2.5]);
        assert_eq!(point.time.as_deref(), Some("T"));
        assert_eq!(point.attributes, [Some(3.0), None, None, None, Some(120.0)]);
    }

    #[test]
    fn pads_attributes_before_first_occurrence() {
        let doc = parse(
            r#"<trkseg>
            <trkpt lon="0" lat="0"/>
            <trkpt lon="1" lat="1"/>
            <trkpt lon="2" lat="2"><extensions><speed>4.5</speed></extensions></trkpt>
            <trkpt lon="3" lat="3"/>
            </trkseg>"#,
        );
        let line = Line::read(doc.root_element(), "trkpt").unwrap();

        assert_eq!(line.coordinates.len(), 4);
        assert_eq!(line.attributes[0], Some(vec![None, None, Some(4.5), None]));
        assert!(line.attributes[1].is_none());
    }

    #[test]
    fn zero_values_count_as_missing() {
        let doc = parse(
            r#"<trkseg>
            <trkpt lon="0" lat="0"><extensions><speed>0</speed><course>0</course></extensions></trkpt>
            <trkpt lon="1" lat="1"><extensions><speed>2</speed><course>0</course></extensions></trkpt>
            </trkseg>"#,
        );
        let line = Line::read(doc.root_element(), "trkpt").unwrap();

        assert_eq!(line.attributes[0], Some(vec![None, Some(2.0)]));
        assert_eq!(line.attributes[1], None);
    }

    #[test]
    fn rejects_single_point_lines() {
        let doc = parse(r#"<trkseg><trkpt lon="0" lat="0"/></trkseg>"#);

        assert_eq!(Line::read(doc.root_element(), "trkpt"), None);
    }

    #[test]
    fn converts_line_width_to_pixels() {
        let doc = parse(
            r#"<trk><extensions><line><color>ff0000</color><opacity>0.5</opacity>
            <width>1</width></line></extensions></trk>"#,
        );
        let mut properties = JsonObject::new();
        push_line_style(doc.root_element(), &mut properties);

        assert_eq!(
            JsonValue::Object(properties),
            json!({"stroke": "ff0000", "stroke-opacity": 0.5, "stroke-width": 96.0 / 25.4})
        );
    }
}
