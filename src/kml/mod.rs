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

//! Translation of [KML](https://developers.google.com/kml) documents.
//!
//! Every `Placemark` becomes exactly one feature, even without geometry.

mod geometry;
mod style;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use roxmltree::{Descendants, Document, Node};
use serde_json::json;

use crate::dom::{all_by_tag, attr, child_text, first_by_tag, has_tag, text};
use crate::feature::{collection, feature, single_or_nested};

pub use self::geometry::{resolve as resolve_geometry, Resolved};
pub use self::style::{content_hash, StyleIndex, StyleRef};
use self::style::StyleElements;

/// Translate a complete KML document into a feature collection.
pub fn translate_kml(doc: &Document) -> FeatureCollection {
    collection(kml_features(doc))
}

/// Lazily translate a KML document.
///
/// The styles of `doc` are indexed right away, placemarks are converted on
/// demand.
pub fn kml_features<'a, 'input>(doc: &'a Document<'input>) -> KmlFeatures<'a, 'input> {
    KmlFeatures {
        styles: StyleIndex::new(doc.root()),
        nodes: doc.root().descendants(),
    }
}

/// Iterator over the features of a KML document, created by [`kml_features`].
pub struct KmlFeatures<'a, 'input> {
    styles: StyleIndex<'a, 'input>,
    nodes: Descendants<'a, 'input>,
}

impl Iterator for KmlFeatures<'_, '_> {
    type Item = Feature;

    fn next(&mut self) -> Option<Feature> {
        let placemark = self.nodes.find(|n| has_tag(*n, "Placemark"))?;
        Some(convert_placemark(placemark, &self.styles))
    }
}

/// Convert a single `Placemark` using the document's `styles`.
pub fn convert_placemark<'a, 'input>(
    node: Node<'a, 'input>,
    styles: &StyleIndex<'a, 'input>,
) -> Feature {
    let resolved = resolve_geometry(node);
    let mut properties = JsonObject::new();

    for tag in ["name", "address"] {
        push_text(&mut properties, node, tag);
    }

    let mut style_elements = StyleElements::find(node);
    if let Some(url) = child_text(node, "styleUrl").filter(|u| !u.is_empty()) {
        let url = if url.starts_with('#') {
            url
        } else {
            format!("#{url}")
        };
        let shared = styles.resolve(&url);

        properties.insert("styleUrl".to_string(), json!(url));
        if let Some(hash) = shared.hash {
            properties.insert("styleHash".to_string(), json!(hash));
        }
        if let Some(map) = shared.map {
            properties.insert("styleMapHash".to_string(), map.into());
        }
        if let Some(style) = shared.style {
            style_elements = style_elements.or(StyleElements::find(style));
        }
    }

    push_text(&mut properties, node, "description");
    if let Some(span) = first_by_tag(node, "TimeSpan") {
        properties.insert(
            "timespan".to_string(),
            json!({
                "begin": text(first_by_tag(span, "begin")),
                "end": text(first_by_tag(span, "end")),
            }),
        );
    }
    if let Some(stamp) = first_by_tag(node, "TimeStamp") {
        properties.insert(
            "timestamp".to_string(),
            json!(text(first_by_tag(stamp, "when"))),
        );
    }

    style_elements.push_properties(&mut properties);
    if let Some(data) = first_by_tag(node, "ExtendedData") {
        push_extended_data(&mut properties, data);
    }

    if let Some(visibility) = first_by_tag(node, "visibility") {
        properties.insert("visibility".to_string(), json!(text(Some(visibility))));
    }
    if !resolved.coord_times.is_empty() {
        let times = resolved.coord_times.into_iter().map(|t| json!(t)).collect();
        properties.insert("coordTimes".to_string(), single_or_nested(times));
    }

    let mut geometries = resolved.geometries;
    let geometry = match geometries.len() {
        0 => None,
        1 => geometries.pop(),
        _ => Some(Geometry::new(Value::GeometryCollection(geometries))),
    };
    let id = attr(node, "id").filter(|id| !id.is_empty()).map(str::to_string);

    feature(geometry, properties, id)
}

/// Insert the text of child `tag` if it is non-empty.
fn push_text(properties: &mut JsonObject, node: Node, tag: &str) {
    if let Some(value) = child_text(node, tag).filter(|v| !v.is_empty()) {
        properties.insert(tag.to_string(), json!(value));
    }
}

/// Copy `Data` and then `SimpleData` entries of `ExtendedData`.
///
/// `SimpleData` overrides `Data` of the same name. Entries without a name
/// are skipped.
fn push_extended_data(properties: &mut JsonObject, data: Node) {
    for entry in all_by_tag(data, "Data") {
        if let Some(name) = attr(entry, "name") {
            properties.insert(name.to_string(), json!(text(first_by_tag(entry, "value"))));
        }
    }
    for entry in all_by_tag(data, "SimpleData") {
        if let Some(name) = attr(entry, "name") {
            properties.insert(name.to_string(), json!(text(Some(entry))));
        }
    }
}
