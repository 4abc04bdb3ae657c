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

//! Navigation helpers over a [`roxmltree`] document.
//!
//! Both translators only ever ask four questions of the tree: the first
//! element with some tag, all elements with some tag, an attribute, and the
//! text below a node. Absence is never an error here; callers decide what a
//! missing element means.

use roxmltree::{Attribute, Node};

/// Iterate over all descendant elements of `node` named `tag`.
///
/// `node` itself is never part of the result. Tags may be qualified with a
/// namespace prefix (`gx:Track`). A prefixed tag only matches elements using
/// that prefix and an unprefixed tag only matches elements without one.
pub fn all_by_tag<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.descendants().skip(1).filter(move |n| has_tag(*n, tag))
}

/// Return the first descendant element of `node` named `tag` in document
/// order.
pub fn first_by_tag<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> Option<Node<'a, 'input>> {
    all_by_tag(node, tag).next()
}

/// Read the attribute `name` of `node`.
pub fn attr<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
}

/// Concatenated text of all text nodes below `node`.
///
/// Returns an empty string for `None`.
pub fn text(node: Option<Node>) -> String {
    match node {
        Some(node) if node.is_text() => node.text().unwrap_or_default().to_string(),
        Some(node) => node
            .descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect(),
        None => String::new(),
    }
}

/// Text of the first descendant named `tag`, if such an element exists.
pub fn child_text(node: Node, tag: &str) -> Option<String> {
    node.descendants()
        .skip(1)
        .find(|n| has_tag(*n, tag))
        .map(|n| text(Some(n)))
}

/// Check whether `node` is an element named `tag`.
pub fn has_tag(node: Node, tag: &str) -> bool {
    if !node.is_element() {
        return false;
    }

    let name = node.tag_name().name();
    match tag.split_once(':') {
        Some((prefix, local)) => name == local && element_prefix(node) == Some(prefix),
        None => name == tag && element_prefix(node).is_none(),
    }
}

/// The tag name of `node` as written in the source, like `gpxx:DisplayColor`.
pub fn qualified_name(node: Node) -> String {
    qualify(element_prefix(node), node.tag_name().name())
}

/// The attribute name of `attribute` on `node` as written in the source.
pub fn qualified_attr_name(node: Node, attribute: &Attribute) -> String {
    let prefix = attribute.namespace().and_then(|uri| node.lookup_prefix(uri));
    qualify(prefix, attribute.name())
}

fn qualify(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

fn element_prefix<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.tag_name()
        .namespace()
        .and_then(|uri| node.lookup_prefix(uri))
}

/// Parse the longest numeric prefix of `s`, ignoring leading whitespace.
///
/// Produces [`f64::NAN`] when `s` does not start with a number. Trailing
/// garbage is ignored, so `"12.5km"` yields `12.5`.
pub fn parse_float(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if frac_digits > 0 || int_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

/// Like [`parse_float`] but yields `None` instead of `NaN`.
pub fn parse_number(s: &str) -> Option<f64> {
    Some(parse_float(s)).filter(|v| !v.is_nan())
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
