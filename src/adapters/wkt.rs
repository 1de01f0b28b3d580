//! Well-known text to GeoJSON geometry.
//!
//! Supports the six simple feature types, with an optional `Z`, `M` or `ZM`
//! tag, `EMPTY` geometries and an EWKT `SRID=...;` prefix (ignored).

use crate::domain::model::Geometry;
use crate::domain::ports::GeometryParser;
use crate::utils::error::GeometryParseError;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct WktParser;

impl GeometryParser for WktParser {
    fn parse(&self, wkt: &str) -> Result<Geometry, GeometryParseError> {
        parse_wkt(wkt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl Kind {
    fn from_tag(tag: &str) -> Option<Self> {
        let upper = tag.to_ascii_uppercase();
        let base = ["ZM", "Z", "M"]
            .iter()
            .find_map(|suffix| {
                upper
                    .strip_suffix(suffix)
                    .filter(|base| Self::from_name(base).is_some())
            })
            .unwrap_or(&upper);
        Self::from_name(base)
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "POINT" => Some(Self::Point),
            "LINESTRING" => Some(Self::LineString),
            "POLYGON" => Some(Self::Polygon),
            "MULTIPOINT" => Some(Self::MultiPoint),
            "MULTILINESTRING" => Some(Self::MultiLineString),
            "MULTIPOLYGON" => Some(Self::MultiPolygon),
            _ => None,
        }
    }

    fn geojson_type(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
        }
    }
}

/// Parenthesised WKT content: either a coordinate or a list of nodes.
#[derive(Debug)]
enum Node {
    Coord(Vec<f64>),
    List(Vec<Node>),
}

pub fn parse_wkt(wkt: &str) -> Result<Geometry, GeometryParseError> {
    let fail = |message: &str| GeometryParseError::new(wkt, message);

    let text = wkt.trim();
    let text = match text.split_once(';') {
        Some((srid, rest)) if srid.trim().to_ascii_uppercase().starts_with("SRID=") => rest.trim(),
        _ => text,
    };
    if text.is_empty() {
        return Err(fail("empty input"));
    }

    let body_start = text.find(|c: char| c == '(' || c.is_whitespace()).unwrap_or(text.len());
    let (tag, rest) = text.split_at(body_start);
    let mut rest = rest.trim_start();

    // `POINT Z (...)` style dimension tag separated by whitespace.
    let mut tag = tag.to_string();
    for dim in ["ZM", "Z", "M"] {
        if let Some(after) = strip_prefix_ignore_case(rest, dim) {
            if after.trim_start().starts_with('(') || after.trim().eq_ignore_ascii_case("EMPTY") {
                tag.push_str(dim);
                rest = after.trim_start();
                break;
            }
        }
    }

    let kind = Kind::from_tag(&tag).ok_or_else(|| fail("unsupported geometry type"))?;

    if rest.eq_ignore_ascii_case("EMPTY") {
        return Ok(Geometry {
            geometry_type: kind.geojson_type().to_string(),
            coordinates: Value::Array(Vec::new()),
        });
    }

    let mut cursor = Cursor {
        chars: rest.char_indices().peekable(),
        text: rest,
        depth: 0,
    };
    let node = cursor.list().map_err(|message| fail(message.as_str()))?;
    cursor.skip_whitespace();
    if cursor.chars.peek().is_some() {
        return Err(fail("unexpected trailing characters"));
    }

    let coordinates = match kind {
        Kind::Point => match node {
            Node::List(mut items) if items.len() == 1 => coord(items.remove(0)),
            _ => Err("a point has exactly one coordinate".to_string()),
        },
        Kind::LineString => coords(node),
        Kind::Polygon => rings(node),
        Kind::MultiPoint => multi_point(node),
        Kind::MultiLineString => rings(node),
        Kind::MultiPolygon => match node {
            Node::List(polygons) => polygons
                .into_iter()
                .map(rings)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Node::Coord(_) => Err("expected a list of polygons".to_string()),
        },
    }
    .map_err(|message| fail(message.as_str()))?;

    Ok(Geometry {
        geometry_type: kind.geojson_type().to_string(),
        coordinates,
    })
}

fn strip_prefix_ignore_case<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn coord(node: Node) -> Result<Value, String> {
    match node {
        Node::Coord(values) => Ok(Value::Array(values.into_iter().map(Value::from).collect())),
        Node::List(_) => Err("expected a coordinate".to_string()),
    }
}

fn coords(node: Node) -> Result<Value, String> {
    match node {
        Node::List(items) => items
            .into_iter()
            .map(coord)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Node::Coord(_) => Err("expected a list of coordinates".to_string()),
    }
}

fn rings(node: Node) -> Result<Value, String> {
    match node {
        Node::List(items) => items
            .into_iter()
            .map(coords)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Node::Coord(_) => Err("expected a list of coordinate lists".to_string()),
    }
}

// Both `MULTIPOINT(1 2, 3 4)` and `MULTIPOINT((1 2), (3 4))` are in use.
fn multi_point(node: Node) -> Result<Value, String> {
    match node {
        Node::List(items) => items
            .into_iter()
            .map(|item| match item {
                Node::List(mut inner) if inner.len() == 1 => coord(inner.remove(0)),
                other => coord(other),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Node::Coord(_) => Err("expected a list of points".to_string()),
    }
}

/// MULTIPOLYGON nests three levels deep; anything past this is rejected
/// before it can exhaust the stack.
const MAX_NESTING: usize = 8;

struct Cursor<'t> {
    chars: std::iter::Peekable<std::str::CharIndices<'t>>,
    text: &'t str,
    depth: usize,
}

impl Cursor<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        self.skip_whitespace();
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            Some((i, c)) => Err(format!("expected '{}' at {}, found '{}'", expected, i, c)),
            None => Err(format!("expected '{}', found end of input", expected)),
        }
    }

    fn list(&mut self) -> Result<Node, String> {
        self.expect('(')?;
        if self.depth == MAX_NESTING {
            return Err(format!("more than {} nested parentheses", MAX_NESTING));
        }

        self.depth += 1;
        let node = self.list_items();
        self.depth -= 1;
        node
    }

    fn list_items(&mut self) -> Result<Node, String> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            let item = match self.chars.peek().map(|&(_, c)| c) {
                Some('(') => self.list()?,
                Some(_) => self.coordinate()?,
                None => return Err("unclosed parenthesis".to_string()),
            };
            items.push(item);

            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, ')')) => return Ok(Node::List(items)),
                Some((i, c)) => return Err(format!("unexpected '{}' at {}", c, i)),
                None => return Err("unclosed parenthesis".to_string()),
            }
        }
    }

    fn coordinate(&mut self) -> Result<Node, String> {
        let mut values = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(&(start, _)) = self.chars.peek() else {
                break;
            };
            let mut end = start;
            while let Some((i, c)) = self
                .chars
                .next_if(|(_, c)| !c.is_whitespace() && *c != ',' && *c != ')' && *c != '(')
            {
                end = i + c.len_utf8();
            }
            if end == start {
                break;
            }
            let token = &self.text[start..end];
            let value = token
                .parse::<f64>()
                .map_err(|_| format!("invalid number '{}'", token))?;
            if !value.is_finite() {
                return Err(format!("invalid number '{}'", token));
            }
            values.push(value);
        }

        match values.len() {
            2..=4 => Ok(Node::Coord(values)),
            n => Err(format!("a coordinate has 2 to 4 values, found {}", n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(wkt: &str) -> (String, Value) {
        let geometry = WktParser.parse(wkt).unwrap();
        (geometry.geometry_type, geometry.coordinates)
    }

    #[test]
    fn test_point() {
        assert_eq!(parsed("POINT(3.87 43.61)"), ("Point".to_string(), json!([3.87, 43.61])));
        assert_eq!(parsed("point ( -1 2.5 )"), ("Point".to_string(), json!([-1.0, 2.5])));
        assert_eq!(parsed("POINT Z (1 2 3)"), ("Point".to_string(), json!([1.0, 2.0, 3.0])));
        assert_eq!(parsed("POINTZ(1 2 3)"), ("Point".to_string(), json!([1.0, 2.0, 3.0])));
        assert_eq!(parsed("SRID=4326;POINT(1 2)"), ("Point".to_string(), json!([1.0, 2.0])));
    }

    #[test]
    fn test_linestring_and_polygon() {
        assert_eq!(
            parsed("LINESTRING(0 0, 1 1, 2 0)"),
            ("LineString".to_string(), json!([[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]))
        );
        assert_eq!(
            parsed("POLYGON((0 0, 4 0, 4 4, 0 0), (1 1, 2 1, 2 2, 1 1))"),
            (
                "Polygon".to_string(),
                json!([
                    [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 0.0]],
                    [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]]
                ])
            )
        );
    }

    #[test]
    fn test_multi_geometries() {
        assert_eq!(
            parsed("MULTIPOINT(1 2, 3 4)"),
            ("MultiPoint".to_string(), json!([[1.0, 2.0], [3.0, 4.0]]))
        );
        assert_eq!(
            parsed("MULTIPOINT((1 2), (3 4))"),
            ("MultiPoint".to_string(), json!([[1.0, 2.0], [3.0, 4.0]]))
        );
        assert_eq!(
            parsed("MULTILINESTRING((0 0, 1 1), (2 2, 3 3))"),
            (
                "MultiLineString".to_string(),
                json!([[[0.0, 0.0], [1.0, 1.0]], [[2.0, 2.0], [3.0, 3.0]]])
            )
        );
        assert_eq!(
            parsed("MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5)))"),
            (
                "MultiPolygon".to_string(),
                json!([
                    [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                    [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]]
                ])
            )
        );
    }

    #[test]
    fn test_empty_geometry() {
        assert_eq!(parsed("POLYGON EMPTY"), ("Polygon".to_string(), json!([])));
    }

    #[test]
    fn test_deeply_nested_input_is_rejected() {
        let wkt = format!("POLYGON{}", "(".repeat(200_000));
        let err = WktParser.parse(&wkt).unwrap_err();
        assert!(err.message.contains("nested"), "{}", err.message);

        let closed = format!("MULTIPOLYGON{}0 0{}", "(".repeat(9), ")".repeat(9));
        assert!(WktParser.parse(&closed).is_err());
    }

    #[test]
    fn test_invalid_wkt() {
        for wkt in [
            "",
            "POINT(",
            "POINT(1)",
            "POINT(1 2, 3 4)",
            "POINT(a b)",
            "CIRCLE(1 2)",
            "LINESTRING(0 0, 1 1",
            "POLYGON(0 0, 1 1)",
            "POINT(1 2) trailing",
        ] {
            let err = WktParser.parse(wkt).unwrap_err();
            assert_eq!(err.input, wkt);
        }
    }
}
