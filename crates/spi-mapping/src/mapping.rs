//! Column mappings from source columns to canonical fields.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use spi_core::{canonical_units, unit_options};
use tracing::debug;

use crate::{MappingError, MappingResult};

/// Where a canonical field is read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnLocator {
    /// Header name, for headered input.
    Header(String),
    /// Zero-based position, for headerless input.
    Index { header_index: usize },
}

impl ColumnLocator {
    pub fn header(name: impl Into<String>) -> Self {
        ColumnLocator::Header(name.into())
    }

    pub fn index(header_index: usize) -> Self {
        ColumnLocator::Index { header_index }
    }
}

impl fmt::Display for ColumnLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnLocator::Header(name) => write!(f, "'{name}'"),
            ColumnLocator::Index { header_index } => write!(f, "column {header_index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSource {
    pub csv_header: ColumnLocator,
    /// Units of the source column; `None` means already canonical.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl FieldSource {
    pub fn new(csv_header: ColumnLocator) -> Self {
        Self {
            csv_header,
            units: None,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

/// Accepts the full form or a bare locator (`"t"` / `{"header_index": 0}`).
impl<'de> Deserialize<'de> for FieldSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Full {
                csv_header: ColumnLocator,
                #[serde(default)]
                units: Option<String>,
            },
            Bare(ColumnLocator),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Full { csv_header, units } => FieldSource { csv_header, units },
            Wire::Bare(csv_header) => FieldSource::new(csv_header),
        })
    }
}

/// Canonical field name to source, in insertion order.
///
/// Output columns follow this order, so it survives serialization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    fields: Vec<(String, FieldSource)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `field`. A replaced field keeps its position.
    pub fn insert(&mut self, field: impl Into<String>, source: FieldSource) -> Option<FieldSource> {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => Some(std::mem::replace(slot, source)),
            None => {
                self.fields.push((field, source));
                None
            }
        }
    }

    pub fn with(mut self, field: impl Into<String>, source: FieldSource) -> Self {
        self.insert(field, source);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldSource> {
        let at = self.fields.iter().position(|(name, _)| name == field)?;
        Some(self.fields.remove(at).1)
    }

    pub fn get(&self, field: &str) -> Option<&FieldSource> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, source)| source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSource)> {
        self.fields.iter().map(|(name, source)| (name.as_str(), source))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, source) in &self.fields {
            map.serialize_entry(field, source)?;
        }
        map.end()
    }
}

struct MappingVisitor;

impl<'de> Visitor<'de> for MappingVisitor {
    type Value = Mapping;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of canonical field names to column sources")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Mapping, A::Error> {
        let mut mapping = Mapping::new();
        while let Some((field, source)) = access.next_entry::<String, FieldSource>()? {
            mapping.insert(field, source);
        }
        Ok(mapping)
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MappingVisitor)
    }
}

/// Builds a [`Mapping`] for a fixed list of required fields.
///
/// The built mapping lists fields in required order, whatever the order of
/// assignment.
#[derive(Debug, Clone)]
pub struct MappingBuilder {
    required: Vec<String>,
    assigned: Mapping,
}

impl MappingBuilder {
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            assigned: Mapping::new(),
        }
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Assigns a source column to `field`.
    ///
    /// Declared units must be one of the field's unit options or its
    /// canonical unit.
    pub fn assign(
        &mut self,
        field: &str,
        column: ColumnLocator,
        units: Option<&str>,
    ) -> MappingResult<()> {
        if !self.required.iter().any(|f| f == field) {
            return Err(MappingError::UnknownField {
                field: field.to_string(),
            });
        }
        if let Some(units) = units {
            let canonical = canonical_units(field) == Some(units);
            if !canonical && !unit_options(field).contains(&units) {
                return Err(MappingError::UnsupportedUnits {
                    field: field.to_string(),
                    units: units.to_string(),
                });
            }
        }
        debug!(field, %column, ?units, "assigned column");
        let mut source = FieldSource::new(column);
        source.units = units.map(str::to_string);
        self.assigned.insert(field, source);
        Ok(())
    }

    pub fn unassign(&mut self, field: &str) -> Option<FieldSource> {
        self.assigned.remove(field)
    }

    pub fn source(&self, field: &str) -> Option<&FieldSource> {
        self.assigned.get(field)
    }

    /// Required fields with no column yet, in required order.
    pub fn missing(&self) -> Vec<&str> {
        self.required
            .iter()
            .map(String::as_str)
            .filter(|field| self.assigned.get(field).is_none())
            .collect()
    }

    /// Columns already taken by some field.
    pub fn used_headers(&self) -> Vec<&ColumnLocator> {
        self.assigned.iter().map(|(_, source)| &source.csv_header).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn build(&self) -> MappingResult<Mapping> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(MappingError::Incomplete {
                missing: missing.join(", "),
            });
        }
        let mut mapping = Mapping::new();
        for field in &self.required {
            if let Some(source) = self.assigned.get(field) {
                mapping.insert(field.clone(), source.clone());
            }
        }
        Ok(mapping)
    }
}
