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

//! Translation of complete GPX documents.

use gpx_kml_geojson::{gpx_features, roxmltree::Document, translate_gpx};
use serde_json::{json, Value};

fn translate(source: &str) -> Value {
    let doc = Document::parse(source).expect("invalid test XML");
    serde_json::to_value(translate_gpx(&doc)).expect("serialization failed")
}

const MIXED: &str = r#"<gpx xmlns="http://www.topografix.com/GPX/1/1"
    xmlns:gpxx="http://www.garmin.com/xmlschemas/GpxExtensions/v3">
    <wpt lat="1" lon="2"><ele>3.5</ele><name>Spring</name><sym>Water</sym></wpt>
    <rte>
        <name>Route</name>
        <rtept lat="0" lon="0"><time>2021-01-01T00:00:00Z</time></rtept>
        <rtept lat="1" lon="1"><time>2021-01-01T00:01:00Z</time></rtept>
    </rte>
    <trk>
        <name>Track</name>
        <link href="https://example.com"><text>Example</text></link>
        <extensions><gpxx:DisplayColor>Red</gpxx:DisplayColor></extensions>
        <trkseg>
            <trkpt lat="10" lon="20"><ele>100</ele></trkpt>
            <trkpt lat="11" lon="21"><ele>abc</ele></trkpt>
            <trkpt lat="12" lon="22"/>
        </trkseg>
    </trk>
    <rte><rtept lat="5" lon="5"/></rte>
</gpx>"#;

#[test]
fn emits_tracks_then_routes_then_waypoints() {
    let collection = translate(MIXED);
    let features = collection["features"].as_array().unwrap();

    assert_eq!(collection["type"], "FeatureCollection");
    assert_eq!(features.len(), 3);
    assert_eq!(features[0]["properties"]["name"], "Track");
    assert_eq!(features[1]["properties"]["name"], "Route");
    assert_eq!(features[2]["properties"]["name"], "Spring");
}

#[test]
fn converts_track_geometry_and_properties() {
    let collection = translate(MIXED);
    let track = &collection["features"][0];

    assert_eq!(
        track["geometry"],
        json!({"type": "LineString", "coordinates": [[20.0, 10.0, 100.0], [21.0, 11.0], [22.0, 12.0]]})
    );
    assert_eq!(
        track["properties"],
        json!({
            "name": "Track",
            "gpxx_DisplayColor": "Red",
            "links": [{"href": "https://example.com", "text": "Example"}]
        })
    );
}

#[test]
fn converts_routes_and_waypoints() {
    let collection = translate(MIXED);
    let route = &collection["features"][1];
    let waypoint = &collection["features"][2];

    assert_eq!(route["geometry"]["type"], "LineString");
    assert!(route["properties"].get("coordTimes").is_none());
    assert_eq!(
        waypoint["geometry"],
        json!({"type": "Point", "coordinates": [2.0, 1.0, 3.5]})
    );
    assert_eq!(waypoint["properties"], json!({"name": "Spring", "sym": "Water"}));
}

#[test]
fn multiple_segments_form_a_multi_line_string() {
    let collection = translate(
        r#"<gpx><trk>
        <trkseg>
            <trkpt lat="0" lon="0"><time>a</time></trkpt>
            <trkpt lat="0" lon="1"><time>b</time></trkpt>
        </trkseg>
        <trkseg><trkpt lat="9" lon="9"/></trkseg>
        <trkseg>
            <trkpt lat="1" lon="0"><time>c</time><extensions><speed>2</speed></extensions></trkpt>
            <trkpt lat="1" lon="1"><time>d</time></trkpt>
            <trkpt lat="1" lon="2"><time>e</time><extensions><speed>3</speed></extensions></trkpt>
        </trkseg>
        </trk></gpx>"#,
    );
    let track = &collection["features"][0];

    assert_eq!(track["geometry"]["type"], "MultiLineString");
    assert_eq!(track["geometry"]["coordinates"].as_array().unwrap().len(), 2);
    assert_eq!(
        track["properties"]["coordTimes"],
        json!([["a", "b"], ["c", "d", "e"]])
    );
    assert_eq!(
        track["properties"]["speeds"],
        json!([[null, null], [], [2.0, null, 3.0]])
    );
}

#[test]
fn times_of_one_segment_stay_nested_in_multi_line_tracks() {
    let collection = translate(
        r#"<gpx><trk>
        <trkseg>
            <trkpt lat="0" lon="0"><time>A</time></trkpt>
            <trkpt lat="0" lon="1"><time>B</time></trkpt>
        </trkseg>
        <trkseg><trkpt lat="1" lon="0"/><trkpt lat="1" lon="1"/></trkseg>
        </trk></gpx>"#,
    );
    let track = &collection["features"][0];

    assert_eq!(track["geometry"]["type"], "MultiLineString");
    assert_eq!(track["properties"]["coordTimes"], json!([["A", "B"]]));
}

#[test]
fn zero_speeds_become_null() {
    let collection = translate(
        r#"<gpx>
        <trk><trkseg>
            <trkpt lat="0" lon="0"><extensions><speed>0</speed></extensions></trkpt>
            <trkpt lat="0" lon="1"><extensions><speed>2</speed></extensions></trkpt>
        </trkseg></trk>
        <rte>
            <rtept lat="0" lon="0"><extensions><speed>0</speed></extensions></rtept>
            <rtept lat="0" lon="1"><extensions><speed>2</speed></extensions></rtept>
        </rte>
        </gpx>"#,
    );

    assert_eq!(
        collection["features"][0]["properties"]["speeds"],
        json!([null, 2.0])
    );
    assert_eq!(collection["features"][1]["properties"], json!({}));
}

#[test]
fn pads_speeds_before_first_occurrence() {
    let collection = translate(
        r#"<gpx><trk><trkseg>
        <trkpt lat="0" lon="0"/>
        <trkpt lat="0" lon="1"/>
        <trkpt lat="0" lon="2"><extensions><speed>1.5</speed></extensions></trkpt>
        <trkpt lat="0" lon="3"><extensions><speed>2.5</speed></extensions></trkpt>
        </trkseg></trk></gpx>"#,
    );
    let properties = &collection["features"][0]["properties"];

    assert_eq!(properties["speeds"], json!([null, null, 1.5, 2.5]));
    assert!(properties.get("courses").is_none());
}

#[test]
fn drops_tracks_without_valid_segment() {
    let collection = translate(
        r#"<gpx><trk><name>short</name><trkseg><trkpt lat="0" lon="0"/></trkseg></trk>
        <trk><name>empty</name></trk></gpx>"#,
    );

    assert_eq!(collection["features"], json!([]));
}

#[test]
fn nested_extensions_are_not_feature_properties() {
    let collection = translate(
        r#"<gpx xmlns:gpxx="http://www.garmin.com/xmlschemas/GpxExtensions/v3"><rte>
        <rtept lat="0" lon="0"><extensions><gpxx:Subclass>x</gpxx:Subclass></extensions></rtept>
        <rtept lat="1" lon="1"/>
        </rte></gpx>"#,
    );

    assert_eq!(collection["features"][0]["properties"], json!({}));
}

#[test]
fn translating_twice_gives_equal_results() {
    let doc = Document::parse(MIXED).unwrap();

    let first: Vec<_> = gpx_features(&doc).collect();
    let second: Vec<_> = gpx_features(&doc).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}
