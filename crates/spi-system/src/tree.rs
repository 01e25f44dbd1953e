//! Configuration tree: system, inverters, arrays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::fields::{Fields, deserialize_object};
use crate::params::{
    InverterParameters, ModuleParameters, PVWattsLosses, ParameterSet, TemperatureParameters,
    TrackingParameters,
};
use crate::path::{IndexResult, IntoSchemaPath, Node, SchemaPath, resolve};
use crate::{SystemError, SystemResult};

/// Rebuilds each element of a child list. Elements that are not objects
/// are built from defaults.
fn rebuild_children<T: Default>(
    items: Option<&Vec<Value>>,
    what: &'static str,
    build: impl Fn(Fields<'_>) -> T,
) -> Vec<T> {
    items
        .map(|items| {
            items
                .iter()
                .map(|item| match Fields::of(item) {
                    Some(fields) => build(fields),
                    None => {
                        warn!(what, "non-object child entry, using defaults");
                        T::default()
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A group of identical strings of modules feeding one inverter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PVArray {
    pub name: String,
    pub make_model: String,
    pub module_parameters: ModuleParameters,
    pub temperature_model_parameters: TemperatureParameters,
    pub tracking: TrackingParameters,
    pub albedo: f64,
    pub modules_per_string: u32,
    pub strings: u32,
}

impl Default for PVArray {
    fn default() -> Self {
        Self {
            name: "New Array".to_string(),
            make_model: "ABC 123".to_string(),
            module_parameters: ModuleParameters::default(),
            temperature_model_parameters: TemperatureParameters::default(),
            tracking: TrackingParameters::default(),
            albedo: 0.2,
            modules_per_string: 1,
            strings: 1,
        }
    }
}

impl PVArray {
    pub fn from_fields(fields: Fields<'_>) -> Self {
        let defaults = Self::default();
        Self {
            name: fields.text("name").unwrap_or(defaults.name),
            make_model: fields.text("make_model").unwrap_or(defaults.make_model),
            module_parameters: ModuleParameters::infer(fields.value("module_parameters")),
            temperature_model_parameters: TemperatureParameters::infer(
                fields.value("temperature_model_parameters"),
            ),
            tracking: TrackingParameters::infer(fields.value("tracking")),
            albedo: fields.get("albedo").unwrap_or(defaults.albedo),
            modules_per_string: fields
                .get("modules_per_string")
                .unwrap_or(defaults.modules_per_string),
            strings: fields.get("strings").unwrap_or(defaults.strings),
        }
    }

    pub fn from_value(value: &Value) -> SystemResult<Self> {
        Fields::of(value)
            .map(Self::from_fields)
            .ok_or(SystemError::NotAnObject { what: "array" })
    }

    pub fn module_count(&self) -> u64 {
        u64::from(self.modules_per_string) * u64::from(self.strings)
    }
}

impl<'de> Deserialize<'de> for PVArray {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_object(deserializer, "array", Self::from_fields)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inverter {
    pub name: String,
    pub make_model: String,
    pub inverter_parameters: InverterParameters,
    /// Only carried by PVWatts inverters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub losses: Option<PVWattsLosses>,
    /// Electrical grouping order; never reordered implicitly.
    pub arrays: Vec<PVArray>,
}

impl Default for Inverter {
    fn default() -> Self {
        Self {
            name: "New Inverter".to_string(),
            make_model: "ABC 520".to_string(),
            inverter_parameters: InverterParameters::default(),
            losses: None,
            arrays: Vec::new(),
        }
    }
}

impl Inverter {
    pub fn from_fields(fields: Fields<'_>) -> Self {
        let defaults = Self::default();
        let losses = fields.value("losses");
        let inverter_parameters =
            InverterParameters::infer(fields.value("inverter_parameters"), losses.is_some());
        let losses = if inverter_parameters.is_pvwatts() {
            losses.map(PVWattsLosses::from_value)
        } else {
            if losses.is_some() {
                warn!(name = ?fields.text("name"), "dropping losses from non-pvwatts inverter");
            }
            None
        };
        Self {
            name: fields.text("name").unwrap_or(defaults.name),
            make_model: fields.text("make_model").unwrap_or(defaults.make_model),
            inverter_parameters,
            losses,
            arrays: rebuild_children(fields.list("arrays"), "array", PVArray::from_fields),
        }
    }

    pub fn from_value(value: &Value) -> SystemResult<Self> {
        Fields::of(value)
            .map(Self::from_fields)
            .ok_or(SystemError::NotAnObject { what: "inverter" })
    }
}

impl<'de> Deserialize<'de> for Inverter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_object(deserializer, "inverter", Self::from_fields)
    }
}

/// Position of an array inside its owning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayRef {
    pub inverter: usize,
    pub array: usize,
}

impl ArrayRef {
    pub fn schema_path(&self) -> SchemaPath {
        SchemaPath::array(self.inverter, self.array)
    }
}

/// Root of the configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct System {
    pub name: String,
    /// Degrees north, [-90, 90].
    pub latitude: f64,
    /// Degrees east, [-180, 180].
    pub longitude: f64,
    /// Meters; may be negative.
    pub elevation: f64,
    pub inverters: Vec<Inverter>,
}

impl Default for System {
    fn default() -> Self {
        Self {
            name: "New System".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            elevation: 0.0,
            inverters: Vec::new(),
        }
    }
}

impl System {
    pub fn from_fields(fields: Fields<'_>) -> Self {
        let defaults = Self::default();
        Self {
            name: fields.text("name").unwrap_or(defaults.name),
            latitude: fields.get("latitude").unwrap_or(defaults.latitude),
            longitude: fields.get("longitude").unwrap_or(defaults.longitude),
            elevation: fields.get("elevation").unwrap_or(defaults.elevation),
            inverters: rebuild_children(
                fields.list("inverters"),
                "inverter",
                Inverter::from_fields,
            ),
        }
    }

    /// Reconstructs a typed tree from untagged JSON, inferring every
    /// parameter-set variant. Unknown fields are dropped.
    pub fn from_value(value: &Value) -> SystemResult<Self> {
        Fields::of(value)
            .map(Self::from_fields)
            .ok_or(SystemError::NotAnObject { what: "system" })
    }

    pub fn resolve<P: IntoSchemaPath>(&self, path: P) -> IndexResult<Node<'_>> {
        resolve(self, path)
    }

    pub fn array(&self, at: ArrayRef) -> Option<&PVArray> {
        self.inverters.get(at.inverter)?.arrays.get(at.array)
    }

    pub fn array_mut(&mut self, at: ArrayRef) -> Option<&mut PVArray> {
        self.inverters.get_mut(at.inverter)?.arrays.get_mut(at.array)
    }

    /// Every array with its position, in electrical order.
    pub fn arrays(&self) -> impl Iterator<Item = (ArrayRef, &PVArray)> {
        self.inverters
            .iter()
            .enumerate()
            .flat_map(|(inverter, inv)| {
                inv.arrays
                    .iter()
                    .enumerate()
                    .map(move |(array, arr)| (ArrayRef { inverter, array }, arr))
            })
    }
}

impl<'de> Deserialize<'de> for System {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_object(deserializer, "system", Self::from_fields)
    }
}

fn system_object_type() -> String {
    "system".to_string()
}

/// Persisted, identity-bearing form of a [`System`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSystem {
    pub object_id: Uuid,
    #[serde(default = "system_object_type")]
    pub object_type: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub definition: System,
}
