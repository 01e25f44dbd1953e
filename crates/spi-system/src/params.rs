//! Model-specific parameter sets and the closed variant unions over them.
//!
//! Each set is a flat record of numeric (occasionally boolean) fields with
//! physically motivated defaults. Unions are tagged in Rust and untagged on
//! the wire; the tag is inferred once, from field presence, when a payload
//! is deserialized.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::fields::{Fields, deserialize_object};
use crate::path::{AsNode, Node, element};

/// Common behaviour of every parameter set.
pub trait ParameterSet: Sized + Default {
    /// Keys that must be present (and not null) for a payload to be
    /// recognised as this set.
    const REQUIRED: &'static [&'static str];

    fn from_fields(fields: Fields<'_>) -> Self;

    /// Looks up a field by its wire name.
    fn field(&self, key: &str) -> Option<Node<'_>>;

    /// Shape test used to discriminate between sibling sets. Field values
    /// are not type checked.
    fn is_instance(value: &Value) -> bool {
        Fields::of(value).is_some_and(|fields| fields.has_all(Self::REQUIRED))
    }

    /// Builds the set from a partial payload, filling gaps with defaults.
    fn from_value(value: &Value) -> Self {
        Fields::of(value).map_or_else(Self::default, Self::from_fields)
    }
}

/// Defines a parameter set: struct, defaults, presence test, field lookup
/// and a deserializer that never fails on missing or ill-typed fields.
macro_rules! parameter_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            required {
                $(
                    $(#[$rdoc:meta])*
                    $rfield:ident ($rkey:literal): $rty:ty = $rdefault:expr
                ),* $(,)?
            }
            optional {
                $(
                    $(#[$odoc:meta])*
                    $ofield:ident ($okey:literal): $oty:ty = $odefault:expr
                ),* $(,)?
            }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize)]
        pub struct $name {
            $( $(#[$rdoc])* #[serde(rename = $rkey)] pub $rfield: $rty, )*
            $( $(#[$odoc])* #[serde(rename = $okey)] pub $ofield: $oty, )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $( $rfield: $rdefault, )*
                    $( $ofield: $odefault, )*
                }
            }
        }

        impl ParameterSet for $name {
            const REQUIRED: &'static [&'static str] = &[$( $rkey ),*];

            fn from_fields(fields: Fields<'_>) -> Self {
                let defaults = Self::default();
                Self {
                    $( $rfield: fields.get($rkey).unwrap_or(defaults.$rfield), )*
                    $( $ofield: fields.get($okey).unwrap_or(defaults.$ofield), )*
                }
            }

            fn field(&self, key: &str) -> Option<Node<'_>> {
                match key {
                    $( $rkey => Some(self.$rfield.as_node()), )*
                    $( $okey => Some(self.$ofield.as_node()), )*
                    _ => None,
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserialize_object(deserializer, stringify!($name), Self::from_fields)
            }
        }
    };
}

parameter_set! {
    /// Single diode parameters for a PVsyst-like module model.
    pub struct PVsystModuleParameters {
        required {
            /// Short-circuit current temperature coefficient, A/C.
            alpha_sc("alpha_sc"): f64 = 0.0,
            /// Diode ideality factor.
            gamma_ref("gamma_ref"): f64 = 0.0,
            /// Temperature coefficient of the ideality factor, 1/K.
            mu_gamma("mu_gamma"): f64 = 0.0,
            i_l_ref("I_L_ref"): f64 = 0.0,
            i_o_ref("I_o_ref"): f64 = 0.0,
            r_sh_ref("R_sh_ref"): f64 = 0.0,
            r_sh_0("R_sh_0"): f64 = 0.0,
            r_s("R_s"): f64 = 0.0,
            cells_in_series("cells_in_series"): f64 = 0.0,
        }
        optional {
            /// Exponent of the shunt resistance equation.
            r_sh_exp("R_sh_exp"): f64 = 5.5,
            /// Bandgap at reference temperature, eV (crystalline silicon).
            eg_ref("EgRef"): f64 = 1.121,
        }
    }
}

parameter_set! {
    /// Parameters for a PVWatts-like module model.
    pub struct PVWattsModuleParameters {
        required {
            /// Power at 1000 W/m^2 and reference cell temperature.
            pdc0("pdc0"): f64 = 0.0,
            /// Temperature coefficient, 1/C.
            gamma_pdc("gamma_pdc"): f64 = 0.0,
        }
        optional {}
    }
}

parameter_set! {
    /// CEC single diode module parameters.
    pub struct CECModuleParameters {
        required {
            alpha_sc("alpha_sc"): f64 = 0.0,
            a_ref("a_ref"): f64 = 0.0,
            i_l_ref("I_L_ref"): f64 = 0.0,
            i_o_ref("I_o_ref"): f64 = 0.0,
            r_sh_ref("R_sh_ref"): f64 = 0.0,
            r_s("R_s"): f64 = 0.0,
            cells_in_series("cells_in_series"): f64 = 0.0,
            adjust("Adjust"): f64 = 0.0,
        }
        optional {
            eg_ref("EgRef"): f64 = 1.121,
            d_eg_d_t("dEgdT"): f64 = -0.0002677,
        }
    }
}

parameter_set! {
    /// PVsyst cell temperature model.
    pub struct PVsystTemperatureParameters {
        required {
            /// Combined heat loss factor, W/m^2/C.
            u_c("u_c"): f64 = 29.0,
            /// Wind influenced heat loss factor, (W/m^2)/(C m/s).
            u_v("u_v"): f64 = 0.0,
        }
        optional {
            eta_m("eta_m"): f64 = 0.1,
            alpha_absorption("alpha_absorption"): f64 = 0.9,
        }
    }
}

parameter_set! {
    /// Sandia Array Performance Model cell temperature parameters.
    pub struct SAPMTemperatureParameters {
        required {
            a("a"): f64 = 0.0,
            b("b"): f64 = 0.0,
            delta_t("deltaT"): f64 = 0.0,
        }
        optional {}
    }
}

parameter_set! {
    /// Fixed mount orientation, degrees.
    pub struct FixedTracking {
        required {
            tilt("tilt"): f64 = 0.0,
            azimuth("azimuth"): f64 = 180.0,
        }
        optional {}
    }
}

parameter_set! {
    /// Single axis tracker geometry.
    pub struct SingleAxisTracking {
        required {
            axis_tilt("axis_tilt"): f64 = 0.0,
            axis_azimuth("axis_azimuth"): f64 = 0.0,
            /// Ground coverage ratio.
            gcr("gcr"): f64 = 2.0 / 7.0,
        }
        optional {
            backtracking("backtracking"): bool = true,
        }
    }
}

parameter_set! {
    /// Sandia grid-connected inverter model coefficients.
    pub struct SandiaInverterParameters {
        required {
            /// AC power rating, W.
            paco("Paco"): f64 = 0.0,
            /// DC power rating, W.
            pdco("Pdco"): f64 = 0.0,
            /// DC voltage at which the AC rating is reached, V.
            vdco("Vdco"): f64 = 0.0,
            /// DC power needed to start inversion, W.
            pso("Pso"): f64 = 0.0,
            c0("C0"): f64 = 0.0,
            c1("C1"): f64 = 0.0,
            c2("C2"): f64 = 0.0,
            c3("C3"): f64 = 0.0,
        }
        optional {
            /// Night tare, W.
            pnt("Pnt"): f64 = 0.075,
        }
    }
}

parameter_set! {
    /// PVWatts inverter model parameters.
    pub struct PVWattsInverterParameters {
        required {
            /// DC input limit, W.
            pdc0("pdc0"): f64 = 0.0,
        }
        optional {
            pdc("pdc"): f64 = 0.0,
            eta_inv_nom("eta_inv_nom"): f64 = 0.96,
            eta_inv_ref("eta_inv_ref"): f64 = 0.9637,
        }
    }
}

parameter_set! {
    /// PVWatts system loss percentages.
    pub struct PVWattsLosses {
        required {
            soiling("soiling"): f64 = 2.0,
            shading("shading"): f64 = 3.0,
            snow("snow"): f64 = 0.0,
            mismatch("mismatch"): f64 = 2.0,
            wiring("wiring"): f64 = 2.0,
            connections("connections"): f64 = 0.5,
            lid("lid"): f64 = 1.5,
            nameplate_rating("nameplate_rating"): f64 = 1.0,
            age("age"): f64 = 0.0,
            availability("availability"): f64 = 3.0,
        }
        optional {}
    }
}

/// Deserializes a union by capturing the raw value and running `infer` once.
fn deserialize_inferred<'de, D, T>(
    deserializer: D,
    infer: impl FnOnce(Option<&Value>) -> T,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(infer(Some(&value).filter(|v| !v.is_null())))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModuleParameters {
    Cec(CECModuleParameters),
    PVsyst(PVsystModuleParameters),
    PVWatts(PVWattsModuleParameters),
}

impl Default for ModuleParameters {
    fn default() -> Self {
        Self::PVsyst(PVsystModuleParameters::default())
    }
}

impl ModuleParameters {
    /// Tries CEC, PVsyst and PVWatts in that order. An absent payload yields
    /// the PVsyst default; an unrecognised one is read as PVWatts.
    pub fn infer(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        let inferred = if CECModuleParameters::is_instance(value) {
            Self::Cec(CECModuleParameters::from_value(value))
        } else if PVsystModuleParameters::is_instance(value) {
            Self::PVsyst(PVsystModuleParameters::from_value(value))
        } else if PVWattsModuleParameters::is_instance(value) {
            Self::PVWatts(PVWattsModuleParameters::from_value(value))
        } else {
            warn!("module parameters match no known model, reading as pvwatts");
            Self::PVWatts(PVWattsModuleParameters::from_value(value))
        };
        debug!(model = inferred.model(), "inferred module parameters");
        inferred
    }

    pub fn model(&self) -> &'static str {
        match self {
            Self::Cec(_) => "cec",
            Self::PVsyst(_) => "pvsyst",
            Self::PVWatts(_) => "pvwatts",
        }
    }

    pub fn field(&self, key: &str) -> Option<Node<'_>> {
        match self {
            Self::Cec(p) => p.field(key),
            Self::PVsyst(p) => p.field(key),
            Self::PVWatts(p) => p.field(key),
        }
    }
}

impl<'de> Deserialize<'de> for ModuleParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_inferred(deserializer, Self::infer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TemperatureParameters {
    Sapm(SAPMTemperatureParameters),
    PVsyst(PVsystTemperatureParameters),
    /// Unparsed legacy coefficients.
    Raw(Vec<f64>),
}

impl Default for TemperatureParameters {
    fn default() -> Self {
        Self::PVsyst(PVsystTemperatureParameters::default())
    }
}

impl TemperatureParameters {
    /// Tries SAPM, PVsyst, then a plain numeric sequence. Anything else
    /// falls back to the PVsyst default.
    pub fn infer(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        if SAPMTemperatureParameters::is_instance(value) {
            return Self::Sapm(SAPMTemperatureParameters::from_value(value));
        }
        if PVsystTemperatureParameters::is_instance(value) {
            return Self::PVsyst(PVsystTemperatureParameters::from_value(value));
        }
        if let Some(items) = value.as_array() {
            let numbers: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
            if let Some(numbers) = numbers {
                return Self::Raw(numbers);
            }
        }
        warn!("temperature parameters match no known model, using pvsyst defaults");
        Self::default()
    }

    pub fn model(&self) -> &'static str {
        match self {
            Self::Sapm(_) => "sapm",
            Self::PVsyst(_) => "pvsyst",
            Self::Raw(_) => "raw",
        }
    }

    pub fn field(&self, key: &str) -> Option<Node<'_>> {
        match self {
            Self::Sapm(p) => p.field(key),
            Self::PVsyst(p) => p.field(key),
            Self::Raw(values) => element(values, key).map(AsNode::as_node),
        }
    }
}

impl<'de> Deserialize<'de> for TemperatureParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_inferred(deserializer, Self::infer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrackingParameters {
    SingleAxis(SingleAxisTracking),
    Fixed(FixedTracking),
}

impl Default for TrackingParameters {
    fn default() -> Self {
        Self::Fixed(FixedTracking::default())
    }
}

impl TrackingParameters {
    pub fn infer(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        if SingleAxisTracking::is_instance(value) {
            Self::SingleAxis(SingleAxisTracking::from_value(value))
        } else if FixedTracking::is_instance(value) {
            Self::Fixed(FixedTracking::from_value(value))
        } else {
            warn!("tracking parameters match no known mount, using fixed defaults");
            Self::default()
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            Self::SingleAxis(_) => "single_axis",
            Self::Fixed(_) => "fixed",
        }
    }

    pub fn field(&self, key: &str) -> Option<Node<'_>> {
        match self {
            Self::SingleAxis(p) => p.field(key),
            Self::Fixed(p) => p.field(key),
        }
    }
}

impl<'de> Deserialize<'de> for TrackingParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_inferred(deserializer, Self::infer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InverterParameters {
    Sandia(SandiaInverterParameters),
    PVWatts(PVWattsInverterParameters),
}

impl Default for InverterParameters {
    fn default() -> Self {
        Self::Sandia(SandiaInverterParameters::default())
    }
}

impl InverterParameters {
    /// Tries Sandia then PVWatts. When neither matches, a sibling `losses`
    /// block marks the inverter as PVWatts; otherwise Sandia is assumed.
    pub fn infer(value: Option<&Value>, has_losses: bool) -> Self {
        let empty = Value::Null;
        let payload = value.unwrap_or(&empty);
        if SandiaInverterParameters::is_instance(payload) {
            return Self::Sandia(SandiaInverterParameters::from_value(payload));
        }
        if PVWattsInverterParameters::is_instance(payload) {
            return Self::PVWatts(PVWattsInverterParameters::from_value(payload));
        }
        if value.is_some() {
            warn!(has_losses, "inverter parameters match no known model");
        }
        if has_losses {
            Self::PVWatts(PVWattsInverterParameters::from_value(payload))
        } else {
            Self::Sandia(SandiaInverterParameters::from_value(payload))
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            Self::Sandia(_) => "sandia",
            Self::PVWatts(_) => "pvwatts",
        }
    }

    pub fn is_pvwatts(&self) -> bool {
        matches!(self, Self::PVWatts(_))
    }

    pub fn field(&self, key: &str) -> Option<Node<'_>> {
        match self {
            Self::Sandia(p) => p.field(key),
            Self::PVWatts(p) => p.field(key),
        }
    }
}

impl<'de> Deserialize<'de> for InverterParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_inferred(deserializer, |value| Self::infer(value, false))
    }
}
