//! Canonical data columns understood by the compute backend.

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalVariable {
    pub name: &'static str,
    pub units: &'static str,
    pub display_name: &'static str,
}

const fn var(
    name: &'static str,
    units: &'static str,
    display_name: &'static str,
) -> CanonicalVariable {
    CanonicalVariable {
        name,
        units,
        display_name,
    }
}

pub const VARIABLES: &[CanonicalVariable] = &[
    var("time", "Timestamp", "Timestamp"),
    var("ghi", "W/m^2", "Global Horizontal Irradiance"),
    var("dhi", "W/m^2", "Diffuse Horizontal Irradiance"),
    var("dni", "W/m^2", "Direct Normal Irradiance"),
    var("poa_global", "W/m^2", "Plane of Array Global Irradiance"),
    var("poa_diffuse", "W/m^2", "Plane of Array Diffuse Irradiance"),
    var("poa_direct", "W/m^2", "Plane of Array Direct Irradiance"),
    var("effective_irradiance", "W/m^2", "Effective Irradiance"),
    var("cell_temperature", "C", "Cell Temperature"),
    var("module_temperature", "C", "Module Temperature"),
    var("temp_air", "C", "Air Temperature"),
    var("wind_speed", "m/s", "Wind Speed"),
    var("performance", "W", "Performance (AC power)"),
    var("daytime_flag", "Flag", "Daytime Flag"),
    var("total_energy", "Wh", "Total Energy"),
    var(
        "plane_of_array_insolation",
        "W/m^2",
        "Plane of Array Insolation",
    ),
    var("effective_insolation", "W/m^2", "Effective Insolation"),
    var(
        "average_daytime_cell_temperature",
        "C",
        "Average Daytime Cell Temperature",
    ),
    var("month", "Month", "Month"),
];

pub fn lookup(name: &str) -> Option<&'static CanonicalVariable> {
    VARIABLES.iter().find(|v| v.name == name)
}

/// Units the backend expects for `name`.
pub fn canonical_units(name: &str) -> Option<&'static str> {
    let found = lookup(name).map(|v| v.units);
    if found.is_none() {
        warn!(variable = name, "no canonical units for variable");
    }
    found
}

pub fn display_name(name: &str) -> Option<&'static str> {
    lookup(name).map(|v| v.display_name)
}
