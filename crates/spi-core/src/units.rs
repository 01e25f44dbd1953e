// spi-core/src/units.rs

use tracing::debug;
use uom::si::area::square_meter;
use uom::si::energy::{gigawatt_hour, kilowatt_hour, megawatt_hour, watt_hour};
use uom::si::f64::{Area, Energy, HeatFluxDensity, Power};
use uom::si::heat_flux_density::watt_per_square_meter;
use uom::si::power::{gigawatt, kilowatt, megawatt, watt};

use crate::variables::canonical_units;
use crate::{CoreError, CoreResult};

const POWER_UNITS: &[&str] = &["W", "kW", "MW", "GW"];
const ENERGY_UNITS: &[&str] = &["Wh", "kWh", "MWh", "GWh"];
const INSOLATION_UNITS: &[&str] = &["W/m^2", "kW/m^2", "MW/m^2", "GW/m^2"];

const PER_AREA_SUFFIX: &str = "/m^2";

/// A closed set of linearly related units.
///
/// The first unit of each family is its base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitFamily {
    Power,
    Energy,
    Insolation,
}

impl UnitFamily {
    pub const ALL: [UnitFamily; 3] = [Self::Power, Self::Energy, Self::Insolation];

    pub fn units(self) -> &'static [&'static str] {
        match self {
            Self::Power => POWER_UNITS,
            Self::Energy => ENERGY_UNITS,
            Self::Insolation => INSOLATION_UNITS,
        }
    }

    pub fn base_unit(self) -> &'static str {
        self.units()[0]
    }

    pub fn of(unit: &str) -> Option<UnitFamily> {
        Self::ALL
            .into_iter()
            .find(|family| family.units().contains(&unit))
    }
}

fn watts(unit: &str) -> Option<Power> {
    let power = match unit {
        "W" => Power::new::<watt>(1.0),
        "kW" => Power::new::<kilowatt>(1.0),
        "MW" => Power::new::<megawatt>(1.0),
        "GW" => Power::new::<gigawatt>(1.0),
        _ => return None,
    };
    Some(power)
}

fn watt_hours(unit: &str) -> Option<Energy> {
    let energy = match unit {
        "Wh" => Energy::new::<watt_hour>(1.0),
        "kWh" => Energy::new::<kilowatt_hour>(1.0),
        "MWh" => Energy::new::<megawatt_hour>(1.0),
        "GWh" => Energy::new::<gigawatt_hour>(1.0),
        _ => return None,
    };
    Some(energy)
}

fn watts_per_square_meter(unit: &str) -> Option<HeatFluxDensity> {
    let power = watts(unit.strip_suffix(PER_AREA_SUFFIX)?)?;
    let flux: HeatFluxDensity = power / Area::new::<square_meter>(1.0);
    Some(flux)
}

/// Size of one `unit` expressed in its family's base unit.
pub fn base_factor(unit: &str) -> CoreResult<f64> {
    let unknown = || CoreError::UnknownUnit {
        unit: unit.to_string(),
    };
    match UnitFamily::of(unit).ok_or_else(unknown)? {
        UnitFamily::Power => watts(unit).map(|p| p.get::<watt>()),
        UnitFamily::Energy => watt_hours(unit).map(|e| e.get::<watt_hour>()),
        UnitFamily::Insolation => {
            watts_per_square_meter(unit).map(|q| q.get::<watt_per_square_meter>())
        }
    }
    .ok_or_else(unknown)
}

/// Pure scalar conversion between two units of one family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converter {
    factor: f64,
}

impl Converter {
    pub fn factor(&self) -> f64 {
        self.factor
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.factor
    }
}

/// Looks up the conversion from `from` to `to`.
///
/// `None` means no conversion applies: the units are equal, unknown, or
/// belong to different families. Cross-family conversion is never attempted.
pub fn convert(from: &str, to: &str) -> Option<Converter> {
    if from == to {
        return None;
    }
    let family = UnitFamily::of(from)?;
    if UnitFamily::of(to) != Some(family) {
        return None;
    }
    let factor = base_factor(from).ok()? / base_factor(to).ok()?;
    debug!(from, to, factor, "resolved unit converter");
    Some(Converter { factor })
}

/// Unit strings a user may pick for `variable`, in family order.
///
/// Empty when the variable is unknown or its canonical unit does not belong
/// to a convertible family.
pub fn unit_options(variable: &str) -> &'static [&'static str] {
    canonical_units(variable)
        .and_then(UnitFamily::of)
        .map(UnitFamily::units)
        .unwrap_or(&[])
}
