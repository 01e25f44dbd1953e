//! System validation logic.

use spi_core::ensure_finite;

use crate::params::{
    InverterParameters, ModuleParameters, PVWattsLosses, TemperatureParameters,
    TrackingParameters,
};
use crate::path::SchemaPath;
use crate::tree::{Inverter, PVArray, System};

pub const MAX_NAME_LEN: usize = 128;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {path} = {value} ({reason})")]
    InvalidValue {
        path: String,
        value: String,
        reason: String,
    },

    #[error("Invalid name at {path}: {reason}")]
    InvalidName { path: String, reason: String },
}

impl ValidationError {
    pub fn path(&self) -> &str {
        match self {
            Self::InvalidValue { path, .. } | Self::InvalidName { path, .. } => path,
        }
    }
}

/// Stops at the first problem found.
pub fn validate_system(system: &System) -> Result<(), ValidationError> {
    match validation_errors(system).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Every problem found, in tree order, each tagged with its schema path.
pub fn validation_errors(system: &System) -> Vec<ValidationError> {
    let mut checker = Checker::default();
    checker.system(system);
    checker.errors
}

#[derive(Default)]
struct Checker {
    errors: Vec<ValidationError>,
}

impl Checker {
    fn system(&mut self, system: &System) {
        let root = SchemaPath::root();
        self.name(&root.clone().child("name"), &system.name);
        self.range(&root.clone().child("latitude"), system.latitude, -90.0, 90.0);
        self.range(&root.clone().child("longitude"), system.longitude, -180.0, 180.0);
        self.at_least(&root.clone().child("elevation"), system.elevation, -300.0);
        for (i, inverter) in system.inverters.iter().enumerate() {
            self.inverter(&SchemaPath::inverter(i), i, inverter);
        }
    }

    fn inverter(&mut self, path: &SchemaPath, index: usize, inverter: &Inverter) {
        self.name(&path.clone().child("name"), &inverter.name);
        self.inverter_parameters(
            &path.clone().child("inverter_parameters"),
            &inverter.inverter_parameters,
        );
        if let Some(losses) = &inverter.losses {
            self.losses(&path.clone().child("losses"), losses);
        }
        for (j, array) in inverter.arrays.iter().enumerate() {
            self.array(&SchemaPath::array(index, j), array);
        }
    }

    fn array(&mut self, path: &SchemaPath, array: &PVArray) {
        self.name(&path.clone().child("name"), &array.name);
        self.at_least(&path.clone().child("albedo"), array.albedo, 0.0);
        self.count(&path.clone().child("modules_per_string"), array.modules_per_string);
        self.count(&path.clone().child("strings"), array.strings);
        self.module_parameters(&path.clone().child("module_parameters"), &array.module_parameters);
        self.temperature_parameters(
            &path.clone().child("temperature_model_parameters"),
            &array.temperature_model_parameters,
        );
        self.tracking(&path.clone().child("tracking"), &array.tracking);
    }

    fn inverter_parameters(&mut self, path: &SchemaPath, params: &InverterParameters) {
        match params {
            InverterParameters::Sandia(p) => {
                let values = [
                    ("Paco", p.paco),
                    ("Pdco", p.pdco),
                    ("Vdco", p.vdco),
                    ("Pso", p.pso),
                    ("C0", p.c0),
                    ("C1", p.c1),
                    ("C2", p.c2),
                    ("C3", p.c3),
                    ("Pnt", p.pnt),
                ];
                self.all_finite(path, &values);
            }
            InverterParameters::PVWatts(p) => {
                self.all_finite(path, &[("pdc", p.pdc)]);
                self.at_least(&path.clone().child("pdc0"), p.pdc0, 0.0);
                self.range(&path.clone().child("eta_inv_nom"), p.eta_inv_nom, 0.0, 1.0);
                self.range(&path.clone().child("eta_inv_ref"), p.eta_inv_ref, 0.0, 1.0);
            }
        }
    }

    fn losses(&mut self, path: &SchemaPath, losses: &PVWattsLosses) {
        let values = [
            ("soiling", losses.soiling),
            ("shading", losses.shading),
            ("snow", losses.snow),
            ("mismatch", losses.mismatch),
            ("wiring", losses.wiring),
            ("connections", losses.connections),
            ("lid", losses.lid),
            ("nameplate_rating", losses.nameplate_rating),
            ("age", losses.age),
            ("availability", losses.availability),
        ];
        for (key, value) in values {
            self.range(&path.clone().child(key), value, 0.0, 100.0);
        }
    }

    fn module_parameters(&mut self, path: &SchemaPath, params: &ModuleParameters) {
        match params {
            ModuleParameters::Cec(p) => self.all_finite(
                path,
                &[
                    ("alpha_sc", p.alpha_sc),
                    ("a_ref", p.a_ref),
                    ("I_L_ref", p.i_l_ref),
                    ("I_o_ref", p.i_o_ref),
                    ("R_sh_ref", p.r_sh_ref),
                    ("R_s", p.r_s),
                    ("cells_in_series", p.cells_in_series),
                    ("Adjust", p.adjust),
                    ("EgRef", p.eg_ref),
                    ("dEgdT", p.d_eg_d_t),
                ],
            ),
            ModuleParameters::PVsyst(p) => self.all_finite(
                path,
                &[
                    ("alpha_sc", p.alpha_sc),
                    ("gamma_ref", p.gamma_ref),
                    ("mu_gamma", p.mu_gamma),
                    ("I_L_ref", p.i_l_ref),
                    ("I_o_ref", p.i_o_ref),
                    ("R_sh_ref", p.r_sh_ref),
                    ("R_sh_0", p.r_sh_0),
                    ("R_s", p.r_s),
                    ("cells_in_series", p.cells_in_series),
                    ("R_sh_exp", p.r_sh_exp),
                    ("EgRef", p.eg_ref),
                ],
            ),
            ModuleParameters::PVWatts(p) => {
                self.all_finite(path, &[("gamma_pdc", p.gamma_pdc)]);
                self.at_least(&path.clone().child("pdc0"), p.pdc0, 0.0);
            }
        }
    }

    fn temperature_parameters(&mut self, path: &SchemaPath, params: &TemperatureParameters) {
        match params {
            TemperatureParameters::Sapm(p) => {
                self.all_finite(path, &[("a", p.a), ("b", p.b), ("deltaT", p.delta_t)]);
            }
            TemperatureParameters::PVsyst(p) => {
                self.at_least(&path.clone().child("u_c"), p.u_c, 0.0);
                self.at_least(&path.clone().child("u_v"), p.u_v, 0.0);
                self.range(&path.clone().child("eta_m"), p.eta_m, 0.0, 1.0);
                self.range(&path.clone().child("alpha_absorption"), p.alpha_absorption, 0.0, 1.0);
            }
            TemperatureParameters::Raw(values) => {
                for (i, value) in values.iter().enumerate() {
                    self.finite(&path.clone().child(i), *value);
                }
            }
        }
    }

    fn tracking(&mut self, path: &SchemaPath, tracking: &TrackingParameters) {
        match tracking {
            TrackingParameters::Fixed(t) => {
                self.range(&path.clone().child("tilt"), t.tilt, 0.0, 180.0);
                self.azimuth(&path.clone().child("azimuth"), t.azimuth);
            }
            TrackingParameters::SingleAxis(t) => {
                self.range(&path.clone().child("axis_tilt"), t.axis_tilt, 0.0, 90.0);
                self.azimuth(&path.clone().child("axis_azimuth"), t.axis_azimuth);
                self.at_least(&path.clone().child("gcr"), t.gcr, 0.0);
            }
        }
    }

    fn name(&mut self, path: &SchemaPath, name: &str) {
        if let Err(reason) = check_name(name) {
            self.errors.push(ValidationError::InvalidName {
                path: path.to_string(),
                reason: reason.to_string(),
            });
        }
    }

    fn invalid(&mut self, path: &SchemaPath, value: impl ToString, reason: String) {
        self.errors.push(ValidationError::InvalidValue {
            path: path.to_string(),
            value: value.to_string(),
            reason,
        });
    }

    /// Records a non-finite value; returns whether the value was finite.
    fn finite(&mut self, path: &SchemaPath, value: f64) -> bool {
        match ensure_finite(value, &path.to_string()) {
            Ok(_) => true,
            Err(err) => {
                self.invalid(path, value, err.to_string());
                false
            }
        }
    }

    fn all_finite(&mut self, path: &SchemaPath, values: &[(&str, f64)]) {
        for (key, value) in values {
            self.finite(&path.clone().child(key), *value);
        }
    }

    fn range(&mut self, path: &SchemaPath, value: f64, min: f64, max: f64) {
        if self.finite(path, value) && !(min..=max).contains(&value) {
            self.invalid(path, value, format!("must be between {min} and {max}"));
        }
    }

    fn at_least(&mut self, path: &SchemaPath, value: f64, min: f64) {
        if self.finite(path, value) && value < min {
            self.invalid(path, value, format!("must be >= {min}"));
        }
    }

    fn azimuth(&mut self, path: &SchemaPath, value: f64) {
        if self.finite(path, value) && !(0.0..360.0).contains(&value) {
            self.invalid(path, value, "must be in [0, 360)".to_string());
        }
    }

    fn count(&mut self, path: &SchemaPath, value: u32) {
        if value < 1 {
            self.invalid(path, value, "must be >= 1".to_string());
        }
    }
}

/// User supplied names: at most 128 characters of letters, digits, spaces
/// and `_ ' , - ( )`, with at least one letter or digit.
pub fn check_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("must not be empty");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err("must be at most 128 characters");
    }
    let allowed = |c: char| {
        c.is_alphanumeric() || matches!(c, '_' | ' ' | '\'' | ',' | '-' | '(' | ')')
    };
    if !name.chars().all(allowed) {
        return Err("contains characters outside letters, digits, spaces and _',-()");
    }
    if !name.chars().any(char::is_alphanumeric) {
        return Err("must contain a letter or digit");
    }
    Ok(())
}
