//! Schema-path addressing into a configuration tree.
//!
//! A schema path such as `/inverters/0/arrays/1` names a node of a
//! [`System`]. `/` is the root. A literal empty string, or an empty segment
//! list, is not a path at all and is rejected with [`IndexError::EmptyPath`].

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::params::{
    InverterParameters, ModuleParameters, PVWattsLosses, ParameterSet, TemperatureParameters,
    TrackingParameters,
};
use crate::tree::{Inverter, PVArray, System};

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Invalid System Index: Empty")]
    EmptyPath,

    #[error("Invalid System Index: {path} (no node at '{segment}')")]
    InvalidPath { path: String, segment: String },
}

/// Borrowed view of one node in a configuration tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    System(&'a System),
    Inverters(&'a [Inverter]),
    Inverter(&'a Inverter),
    Arrays(&'a [PVArray]),
    Array(&'a PVArray),
    InverterParameters(&'a InverterParameters),
    Losses(&'a PVWattsLosses),
    ModuleParameters(&'a ModuleParameters),
    TemperatureParameters(&'a TemperatureParameters),
    Tracking(&'a TrackingParameters),
    Text(&'a str),
    Number(&'a f64),
    Integer(&'a u32),
    Bool(&'a bool),
}

/// Scalar leaves that can be addressed by a path.
pub trait AsNode {
    fn as_node(&self) -> Node<'_>;
}

impl AsNode for f64 {
    fn as_node(&self) -> Node<'_> {
        Node::Number(self)
    }
}

impl AsNode for bool {
    fn as_node(&self) -> Node<'_> {
        Node::Bool(self)
    }
}

impl AsNode for u32 {
    fn as_node(&self) -> Node<'_> {
        Node::Integer(self)
    }
}

impl AsNode for String {
    fn as_node(&self) -> Node<'_> {
        Node::Text(self)
    }
}

/// Indexes a slice with a canonical decimal segment (`"1"`, never `"01"`).
pub(crate) fn element<'a, T>(items: &'a [T], segment: &str) -> Option<&'a T> {
    let index: usize = segment.parse().ok()?;
    if index.to_string() != segment {
        return None;
    }
    items.get(index)
}

impl<'a> Node<'a> {
    fn child(self, segment: &str) -> Option<Node<'a>> {
        match self {
            Node::System(system) => match segment {
                "name" => Some(system.name.as_node()),
                "latitude" => Some(system.latitude.as_node()),
                "longitude" => Some(system.longitude.as_node()),
                "elevation" => Some(system.elevation.as_node()),
                "inverters" => Some(Node::Inverters(&system.inverters)),
                _ => None,
            },
            Node::Inverters(inverters) => element(inverters, segment).map(Node::Inverter),
            Node::Inverter(inverter) => match segment {
                "name" => Some(inverter.name.as_node()),
                "make_model" => Some(inverter.make_model.as_node()),
                "inverter_parameters" => {
                    Some(Node::InverterParameters(&inverter.inverter_parameters))
                }
                "losses" => inverter.losses.as_ref().map(Node::Losses),
                "arrays" => Some(Node::Arrays(&inverter.arrays)),
                _ => None,
            },
            Node::Arrays(arrays) => element(arrays, segment).map(Node::Array),
            Node::Array(array) => match segment {
                "name" => Some(array.name.as_node()),
                "make_model" => Some(array.make_model.as_node()),
                "module_parameters" => Some(Node::ModuleParameters(&array.module_parameters)),
                "temperature_model_parameters" => Some(Node::TemperatureParameters(
                    &array.temperature_model_parameters,
                )),
                "tracking" => Some(Node::Tracking(&array.tracking)),
                "albedo" => Some(array.albedo.as_node()),
                "modules_per_string" => Some(array.modules_per_string.as_node()),
                "strings" => Some(array.strings.as_node()),
                _ => None,
            },
            Node::InverterParameters(params) => params.field(segment),
            Node::Losses(losses) => losses.field(segment),
            Node::ModuleParameters(params) => params.field(segment),
            Node::TemperatureParameters(params) => params.field(segment),
            Node::Tracking(params) => params.field(segment),
            Node::Text(_) | Node::Number(_) | Node::Integer(_) | Node::Bool(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::System(_) => "system",
            Node::Inverters(_) => "inverters",
            Node::Inverter(_) => "inverter",
            Node::Arrays(_) => "arrays",
            Node::Array(_) => "array",
            Node::InverterParameters(_) => "inverter_parameters",
            Node::Losses(_) => "losses",
            Node::ModuleParameters(_) => "module_parameters",
            Node::TemperatureParameters(_) => "temperature_model_parameters",
            Node::Tracking(_) => "tracking",
            Node::Text(_) => "text",
            Node::Number(_) => "number",
            Node::Integer(_) => "integer",
            Node::Bool(_) => "bool",
        }
    }

    /// Serializes the addressed node in its wire form.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        match *self {
            Node::System(v) => serde_json::to_value(v),
            Node::Inverters(v) => serde_json::to_value(v),
            Node::Inverter(v) => serde_json::to_value(v),
            Node::Arrays(v) => serde_json::to_value(v),
            Node::Array(v) => serde_json::to_value(v),
            Node::InverterParameters(v) => serde_json::to_value(v),
            Node::Losses(v) => serde_json::to_value(v),
            Node::ModuleParameters(v) => serde_json::to_value(v),
            Node::TemperatureParameters(v) => serde_json::to_value(v),
            Node::Tracking(v) => serde_json::to_value(v),
            Node::Text(v) => serde_json::to_value(v),
            Node::Number(v) => serde_json::to_value(v),
            Node::Integer(v) => serde_json::to_value(v),
            Node::Bool(v) => serde_json::to_value(v),
        }
    }
}

/// Normalized schema path. Zero segments denotes the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SchemaPath {
    segments: Vec<String>,
}

impl SchemaPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn inverter(inverter: usize) -> Self {
        Self::root().child("inverters").child(inverter)
    }

    pub fn array(inverter: usize, array: usize) -> Self {
        Self::inverter(inverter).child("arrays").child(array)
    }

    pub fn child(mut self, segment: impl ToString) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parses the slash form.
    ///
    /// `""` is rejected as empty. One leading `/` is stripped; `/` alone is
    /// the root. Empty segments elsewhere (`//`, trailing `/`) are invalid.
    pub fn parse(path: &str) -> IndexResult<Self> {
        if path.is_empty() {
            return Err(IndexError::EmptyPath);
        }
        let rest = path.strip_prefix('/').unwrap_or(path);
        if rest.is_empty() {
            return Ok(Self::root());
        }
        Self::from_parts(path, rest.split('/'))
    }

    /// Builds a path from segments. An empty list is rejected; a single
    /// leading `""` is dropped so that `[""]` is the root.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> IndexResult<Self> {
        let Some((first, tail)) = segments.split_first() else {
            return Err(IndexError::EmptyPath);
        };
        let parts: Vec<&str> = segments.iter().map(|s| s.as_ref()).collect();
        let display = parts.join("/");
        if first.as_ref().is_empty() {
            Self::from_parts(&display, tail.iter().map(|s| s.as_ref()))
        } else {
            Self::from_parts(&display, parts.into_iter())
        }
    }

    fn from_parts<'s>(display: &str, parts: impl Iterator<Item = &'s str>) -> IndexResult<Self> {
        let mut segments = Vec::new();
        for part in parts {
            if part.is_empty() {
                return Err(IndexError::InvalidPath {
                    path: display.to_string(),
                    segment: String::new(),
                });
            }
            segments.push(part.to_string());
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for SchemaPath {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Anything that can name a schema path: the slash form or a segment list.
pub trait IntoSchemaPath {
    fn into_schema_path(self) -> IndexResult<SchemaPath>;
}

impl IntoSchemaPath for SchemaPath {
    fn into_schema_path(self) -> IndexResult<SchemaPath> {
        Ok(self)
    }
}

impl IntoSchemaPath for &SchemaPath {
    fn into_schema_path(self) -> IndexResult<SchemaPath> {
        Ok(self.clone())
    }
}

impl IntoSchemaPath for &str {
    fn into_schema_path(self) -> IndexResult<SchemaPath> {
        SchemaPath::parse(self)
    }
}

impl IntoSchemaPath for &String {
    fn into_schema_path(self) -> IndexResult<SchemaPath> {
        SchemaPath::parse(self)
    }
}

impl<S: AsRef<str>> IntoSchemaPath for &[S] {
    fn into_schema_path(self) -> IndexResult<SchemaPath> {
        SchemaPath::from_segments(self)
    }
}

impl<S: AsRef<str>, const N: usize> IntoSchemaPath for &[S; N] {
    fn into_schema_path(self) -> IndexResult<SchemaPath> {
        SchemaPath::from_segments(self.as_slice())
    }
}

impl<S: AsRef<str>> IntoSchemaPath for &Vec<S> {
    fn into_schema_path(self) -> IndexResult<SchemaPath> {
        SchemaPath::from_segments(self.as_slice())
    }
}

/// Walks `system` along `path`, one segment at a time.
///
/// The returned node borrows the live tree. Any segment that does not name
/// a child, including a segment applied to a scalar, is an
/// [`IndexError::InvalidPath`].
pub fn resolve<P: IntoSchemaPath>(system: &System, path: P) -> IndexResult<Node<'_>> {
    let path = path.into_schema_path()?;
    let mut node = Node::System(system);
    for segment in path.segments() {
        node = node
            .child(segment)
            .ok_or_else(|| IndexError::InvalidPath {
                path: path.to_string(),
                segment: segment.clone(),
            })?;
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> System {
        let inverter = |name: &str| Inverter {
            name: name.to_string(),
            arrays: vec![PVArray::default(), PVArray::default()],
            ..Inverter::default()
        };
        System {
            name: "Test System".to_string(),
            inverters: vec![inverter("Inverter 1"), inverter("Inverter 2")],
            ..System::default()
        }
    }

    #[test]
    fn parse_forms() {
        assert_eq!(SchemaPath::parse("/").unwrap(), SchemaPath::root());
        assert_eq!(
            SchemaPath::parse("/inverters/0/arrays/1").unwrap(),
            SchemaPath::array(0, 1)
        );
        assert_eq!(
            SchemaPath::parse("inverters/1").unwrap(),
            SchemaPath::inverter(1)
        );
        assert_eq!(SchemaPath::parse(""), Err(IndexError::EmptyPath));
        assert!(matches!(
            SchemaPath::parse("/inverters//0"),
            Err(IndexError::InvalidPath { .. })
        ));
        assert!(matches!(
            SchemaPath::parse("/inverters/"),
            Err(IndexError::InvalidPath { .. })
        ));
    }

    #[test]
    fn segment_forms() {
        let empty: [&str; 0] = [];
        assert_eq!(SchemaPath::from_segments(&empty), Err(IndexError::EmptyPath));
        assert_eq!(SchemaPath::from_segments(&[""]).unwrap(), SchemaPath::root());
        assert_eq!(
            SchemaPath::from_segments(&["", "inverters", "0"]).unwrap(),
            SchemaPath::inverter(0)
        );
    }

    #[test]
    fn display_round_trips() {
        for text in ["/", "/inverters/0", "/inverters/3/arrays/2/tracking/tilt"] {
            assert_eq!(SchemaPath::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn resolves_root_and_nested_nodes() {
        let system = two_by_two();
        assert!(matches!(resolve(&system, "/"), Ok(Node::System(s)) if std::ptr::eq(s, &system)));

        let Node::Array(array) = resolve(&system, "/inverters/1/arrays/0").unwrap() else {
            panic!("expected an array");
        };
        assert!(std::ptr::eq(array, &system.inverters[1].arrays[0]));

        let Node::Inverter(inverter) = resolve(&system, &["inverters", "1"]).unwrap() else {
            panic!("expected an inverter");
        };
        assert_eq!(inverter.name, "Inverter 2");
    }

    #[test]
    fn resolves_scalars() {
        let system = two_by_two();
        assert_eq!(
            resolve(&system, "/inverters/0/name").unwrap(),
            Node::Text("Inverter 1")
        );
        assert!(matches!(
            resolve(&system, "/inverters/0/arrays/1/tracking/azimuth"),
            Ok(Node::Number(v)) if *v == 180.0
        ));
        assert!(matches!(
            resolve(&system, "/inverters/0/inverter_parameters/Pnt"),
            Ok(Node::Number(v)) if *v == 0.075
        ));
    }

    #[test]
    fn rejects_empty_and_invalid_paths() {
        let system = two_by_two();
        assert_eq!(resolve(&system, ""), Err(IndexError::EmptyPath));
        let none: &[&str] = &[];
        assert_eq!(resolve(&system, none), Err(IndexError::EmptyPath));
        assert_eq!(
            resolve(&system, "/inverters/99/arrays/0"),
            Err(IndexError::InvalidPath {
                path: "/inverters/99/arrays/0".to_string(),
                segment: "99".to_string(),
            })
        );
        assert!(resolve(&system, "/inverters/01").is_err());
        assert!(resolve(&system, "/name/length").is_err());
        assert!(resolve(&system, "/inverters/0/losses").is_err());
        assert!(resolve(&system, "/pony").is_err());
    }
}
