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

//! Shared KML styles and their conversion to feature properties.
//!
//! Styles are identified by a hash over their content. A placemark referring
//! to a style gets that hash as `styleHash`, so features sharing a style can
//! be grouped without comparing style properties.

use std::collections::HashMap;

use geojson::{JsonObject, JsonValue};
use roxmltree::Node;
use serde_json::json;
use tracing::trace;

use crate::dom::{
    all_by_tag, attr, child_text, first_by_tag, parse_float, parse_number, qualified_attr_name,
    qualified_name,
};

/// Document-wide lookup tables for `Style` and `StyleMap` elements.
pub struct StyleIndex<'a, 'input> {
    /// Maps `#id` of styles and style maps to their content hash.
    hashes: HashMap<String, String>,
    /// Maps content hashes to the last style with that hash.
    styles: HashMap<String, Node<'a, 'input>>,
    /// Maps `#id` of style maps to their `key -> styleUrl` pairs.
    maps: HashMap<String, JsonObject>,
}

/// The shared style a placemark refers to.
#[derive(Debug, Default)]
pub struct StyleRef<'a, 'input> {
    /// Content hash of the effective style.
    pub hash: Option<String>,
    /// Pairs of the referenced style map, if the reference is a style map.
    pub map: Option<JsonObject>,
    /// The effective style element.
    pub style: Option<Node<'a, 'input>>,
}

impl<'a, 'input> StyleIndex<'a, 'input> {
    /// Index all styles and style maps below `root`.
    pub fn new(root: Node<'a, 'input>) -> Self {
        let mut hashes = HashMap::new();
        let mut styles = HashMap::new();
        let mut maps = HashMap::new();

        for style in all_by_tag(root, "Style") {
            let hash = content_hash(style);
            if let Some(id) = attr(style, "id") {
                hashes.insert(format!("#{id}"), hash.clone());
            }
            styles.insert(hash, style);
        }

        for style_map in all_by_tag(root, "StyleMap") {
            let Some(id) = attr(style_map, "id") else {
                continue;
            };

            let pairs = all_by_tag(style_map, "Pair")
                .map(|pair| {
                    let key = child_text(pair, "key").unwrap_or_default();
                    let url = child_text(pair, "styleUrl").unwrap_or_default();
                    (key, JsonValue::String(url))
                })
                .collect();
            hashes.insert(format!("#{id}"), content_hash(style_map));
            maps.insert(format!("#{id}"), pairs);
        }

        trace!(styles = styles.len(), style_maps = maps.len(), "indexed styles");
        Self {
            hashes,
            styles,
            maps,
        }
    }

    /// Look up the style referenced by `url`, which must start with `#`.
    ///
    /// Style maps are followed through their `normal` entry. Unknown
    /// references resolve to nothing.
    pub fn resolve(&self, url: &str) -> StyleRef<'a, 'input> {
        let map = self.maps.get(url).cloned();
        let hash = match &map {
            Some(pairs) => pairs
                .get("normal")
                .and_then(JsonValue::as_str)
                .and_then(|normal| self.hashes.get(normal)),
            None => self.hashes.get(url),
        }
        .cloned();
        let style = hash.as_ref().and_then(|h| self.styles.get(h)).copied();

        StyleRef { hash, map, style }
    }
}

/// Hash the content of `node` as a short hexadecimal string.
///
/// This is a weak 32 bit hash: different styles might collide.
pub fn content_hash(node: Node) -> String {
    let mut content = String::new();
    serialize(node, &mut content);
    format_hash(hash_str(&content))
}

/// Write tag names, attributes, and trimmed text of `node` to `out`.
fn serialize(node: Node, out: &mut String) {
    if node.is_element() {
        out.push_str(&qualified_name(node));
        for attribute in node.attributes() {
            out.push_str(&qualified_attr_name(node, &attribute));
            out.push_str(attribute.value());
        }
        for child in node.children() {
            serialize(child, out);
        }
    } else if node.is_text() {
        // CDATA is merged into text nodes, so it is trimmed as well.
        out.push_str(node.text().unwrap_or_default().trim());
    }
}

/// 31-multiplier rolling hash over UTF-16 code units.
fn hash_str(s: &str) -> i32 {
    s.encode_utf16().fold(0i32, |h, c| {
        (h << 5).wrapping_sub(h).wrapping_add(i32::from(c))
    })
}

/// Format `hash` in hexadecimal with a sign instead of two's complement.
fn format_hash(hash: i32) -> String {
    if hash < 0 {
        format!("-{:x}", hash.unsigned_abs())
    } else {
        format!("{hash:x}")
    }
}

/// The four style kinds a placemark can use.
#[derive(Debug, Default, Clone, Copy)]
pub struct StyleElements<'a, 'input> {
    pub icon: Option<Node<'a, 'input>>,
    pub label: Option<Node<'a, 'input>>,
    pub line: Option<Node<'a, 'input>>,
    pub poly: Option<Node<'a, 'input>>,
}

impl<'a, 'input> StyleElements<'a, 'input> {
    /// Find the style elements below `node`.
    pub fn find(node: Node<'a, 'input>) -> Self {
        Self {
            icon: first_by_tag(node, "IconStyle"),
            label: first_by_tag(node, "LabelStyle"),
            line: first_by_tag(node, "LineStyle"),
            poly: first_by_tag(node, "PolyStyle"),
        }
    }

    /// Fill in the kinds missing from `self` with those of `fallback`.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            icon: self.icon.or(fallback.icon),
            label: self.label.or(fallback.label),
            line: self.line.or(fallback.line),
            poly: self.poly.or(fallback.poly),
        }
    }

    /// Convert all present style elements to properties.
    pub fn push_properties(&self, properties: &mut JsonObject) {
        if let Some(icon) = self.icon {
            push_color(properties, icon, "icon");
            push_number(properties, icon, "scale", "icon-scale");
            push_number(properties, icon, "heading", "icon-heading");

            if let Some(hotspot) = first_by_tag(icon, "hotSpot") {
                let left = parse_float(attr(hotspot, "x").unwrap_or_default());
                let top = parse_float(attr(hotspot, "y").unwrap_or_default());
                if !left.is_nan() && !top.is_nan() {
                    properties.insert("icon-offset".to_string(), json!([left, top]));
                }
            }
            let href = first_by_tag(icon, "Icon").and_then(|i| child_text(i, "href"));
            if let Some(href) = href.filter(|h| !h.is_empty()) {
                properties.insert("icon".to_string(), json!(href));
            }
        }

        if let Some(label) = self.label {
            push_color(properties, label, "label");
            push_number(properties, label, "scale", "label-scale");
        }

        if let Some(line) = self.line {
            push_color(properties, line, "stroke");
            push_number(properties, line, "width", "stroke-width");
        }

        if let Some(poly) = self.poly {
            push_color(properties, poly, "fill");
            push_flag(properties, poly, "fill", "fill-opacity");
            push_flag(properties, poly, "outline", "stroke-opacity");
        }
    }
}

/// Convert the KML `color` of `node` to a color and an opacity property.
///
/// KML colors are `aabbggrr`. Six and three digit colors are taken as is.
fn push_color(properties: &mut JsonObject, node: Node, prefix: &str) {
    let color = child_text(node, "color").unwrap_or_default();
    let color = color.strip_prefix('#').unwrap_or(&color);
    let key = match prefix {
        "stroke" | "fill" => prefix.to_string(),
        _ => format!("{prefix}-color"),
    };

    let digits: Vec<char> = color.chars().collect();
    match digits.len() {
        3 | 6 => {
            properties.insert(key, json!(color));
        }
        8 => {
            let pair = |i: usize| digits[i..i + 2].iter().collect::<String>();
            let alpha = parse_hex(&pair(0));
            properties.insert(format!("{prefix}-opacity"), json!(alpha / 255.0));
            properties.insert(key, json!(format!("#{}{}{}", pair(6), pair(4), pair(2))));
        }
        _ => {}
    }
}

/// Parse the leading hexadecimal digits of `s`, `NaN` if there are none.
fn parse_hex(s: &str) -> f64 {
    let end = s.find(|c: char| !c.is_ascii_hexdigit()).unwrap_or(s.len());
    u32::from_str_radix(&s[..end], 16).map_or(f64::NAN, f64::from)
}

/// Insert the number in child `source` of `node` as `target`.
fn push_number(properties: &mut JsonObject, node: Node, source: &str, target: &str) {
    if let Some(value) = child_text(node, source).and_then(|v| parse_number(&v)) {
        properties.insert(target.to_string(), json!(value));
    }
}

/// Set opacity `target` from the boolean child `source` of `node`.
///
/// Enabling keeps an already set nonzero opacity.
fn push_flag(properties: &mut JsonObject, node: Node, source: &str, target: &str) {
    let flag = child_text(node, source).unwrap_or_default();
    if flag.is_empty() {
        return;
    }

    let opacity = if flag == "1" {
        properties
            .get(target)
            .and_then(JsonValue::as_f64)
            .filter(|o| *o != 0.0)
            .unwrap_or(1.0)
    } else {
        0.0
    };
    properties.insert(target.to_string(), json!(opacity));
}
