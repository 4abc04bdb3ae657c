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

//! Assembly of translated data into [`geojson`] features.

use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

/// Build a feature from its parts.
///
/// The properties object is always present, even when empty.
pub fn feature(geometry: Option<Geometry>, properties: JsonObject, id: Option<String>) -> Feature {
    Feature {
        bbox: None,
        geometry,
        id: id.map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Collect all `features` into a single collection.
pub fn collection(features: impl Iterator<Item = Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: features.collect(),
        foreign_members: None,
    }
}

/// Unwrap a list holding exactly one entry, keep longer or empty lists as is.
///
/// Per-line data like `coordTimes` is stored flat for a single line and
/// nested for multiple lines.
pub fn single_or_nested(mut values: Vec<JsonValue>) -> JsonValue {
    if values.len() == 1 {
        values.swap_remove(0)
    } else {
        JsonValue::Array(values)
    }
}
