// Copyright 2022, 2023 Viktor Reusch
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

//! This is a WASM wrapper for `gpx_kml_geojson`.

use gpx_kml_geojson::Format;
use wasm_bindgen::{prelude::wasm_bindgen, JsError};

/// This wraps `gpx_kml_geojson::convert` for interfacing with JS.
///
/// `format` is either `"gpx"`, `"kml"`, or `undefined` for detection. The
/// result is serialized GeoJSON.
#[wasm_bindgen]
pub fn convert(source: &str, format: Option<String>) -> Result<String, JsError> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let format = format.map(|f| f.parse::<Format>()).transpose()?;
    let collection = gpx_kml_geojson::convert(source, format)?;
    Ok(serde_json::to_string(&collection)?)
}
