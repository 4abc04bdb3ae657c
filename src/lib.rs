// Copyright 2021, 2022, 2023 Viktor Reusch
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

//! Library for converting [GPX](https://www.topografix.com/gpx.asp) and
//! [KML](https://developers.google.com/kml) to [GeoJSON](https://geojson.org).
//!
//! GPX tracks, routes, and waypoints as well as KML placemarks become GeoJSON
//! features. Additional data like timestamps, extension values, and KML
//! styles are kept as feature properties.
//!
//! The translators work on an already parsed [`roxmltree::Document`]. Use
//! [`translate_gpx`] and [`translate_kml`] to get a complete
//! [`FeatureCollection`], or [`gpx_features`] and [`kml_features`] to convert
//! one feature at a time. See [`convert`] for converting XML text directly.

use std::fmt;
use std::str::FromStr;

use geojson::FeatureCollection;
use roxmltree::{Document, ParsingOptions};
use thiserror::Error;
use tracing::trace;

pub mod dom;
mod feature;
pub mod gpx;
pub mod kml;

pub use gpx::{gpx_features, translate_gpx, GpxFeatures};
pub use kml::{kml_features, translate_kml, KmlFeatures};
pub use roxmltree;

/// Error returned from the [`convert`] function.
#[derive(Error, Debug)]
pub enum Error {
    /// The source is no well-formed XML.
    #[error("reading XML failed: {0}")]
    Xml(#[from] roxmltree::Error),
    /// The root element is neither `gpx` nor `kml`.
    #[error("unknown format with root element `{0}`")]
    UnknownFormat(String),
}

/// Supported source formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Gpx,
    Kml,
}

impl Format {
    /// Determine the format of `doc` from its root element.
    pub fn detect(doc: &Document) -> Result<Format, Error> {
        let root = doc.root_element().tag_name().name();
        root.parse()
            .map_err(|_| Error::UnknownFormat(root.to_string()))
    }

    /// Translate `doc` as this format.
    pub fn translate(self, doc: &Document) -> FeatureCollection {
        match self {
            Format::Gpx => translate_gpx(doc),
            Format::Kml => translate_kml(doc),
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("gpx") {
            Ok(Format::Gpx)
        } else if s.eq_ignore_ascii_case("kml") {
            Ok(Format::Kml)
        } else {
            Err(Error::UnknownFormat(s.to_string()))
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Gpx => "gpx",
            Format::Kml => "kml",
        })
    }
}

/// Parse XML `source` and convert it to GeoJSON.
///
/// The `format` is detected from the root element if it is not given.
/// Translating never fails: missing or malformed data is left out.
///
/// # Example
/// ```
/// # use gpx_kml_geojson::convert;
/// #
/// let source = r#"
/// <?xml version="1.0" encoding="UTF-8"?>
/// <gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1">
///     <wpt lat="48.858222" lon="2.2945"><name>Eiffel Tower</name></wpt>
/// </gpx>
/// "#;
///
/// let collection = convert(source.trim(), None).expect("conversion failed");
///
/// let feature = &collection.features[0];
/// let properties = feature.properties.as_ref().unwrap();
/// assert_eq!(properties["name"], "Eiffel Tower");
/// assert_eq!(
///     feature.geometry.as_ref().unwrap().value,
///     geojson::Value::Point(vec![2.2945, 48.858222])
/// );
/// ```
pub fn convert(source: &str, format: Option<Format>) -> Result<FeatureCollection, Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(source, options)?;

    let format = match format {
        Some(format) => format,
        None => Format::detect(&doc)?,
    };
    let collection = format.translate(&doc);
    trace!(%format, features = collection.features.len(), "converted document");

    Ok(collection)
}
