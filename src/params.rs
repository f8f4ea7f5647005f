//! Pass parameter schemas and argument maps.
//!
//! Every pass declares an ordered list of [`ParamSpec`]s. The schema is
//! descriptive (a host UI can build sliders and color pickers from it), and it
//! supplies the default for any key missing from the [`PassArgs`] handed to
//! `setup`.
//!
//! Arguments are usually loaded from JSON:
//!
//! ```
//! use lensfx::PassArgs;
//!
//! let args = PassArgs::from_json(r#"{ "eyeDistance": 0.2, "leftColor": [1, 0, 0] }"#).unwrap();
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PassError;

/// A parameter value as it appears in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Float(f32),
    Vec3([f32; 3]),
}

/// The declared type of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Float,
    Vec3,
    Bool,
}

/// How a host UI should present a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlHint {
    Slider,
    Color,
    Checkbox,
}

/// One entry of a pass's parameter schema.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub ty: ParamType,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub default: ParamValue,
    pub control: ControlHint,
}

impl ParamSpec {
    pub const fn float(key: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            key,
            ty: ParamType::Float,
            min: Some(min),
            max: Some(max),
            default: ParamValue::Float(default),
            control: ControlHint::Slider,
        }
    }

    pub const fn color(key: &'static str, default: [f32; 3]) -> Self {
        Self {
            key,
            ty: ParamType::Vec3,
            min: None,
            max: None,
            default: ParamValue::Vec3(default),
            control: ControlHint::Color,
        }
    }

    pub const fn toggle(key: &'static str, default: bool) -> Self {
        Self {
            key,
            ty: ParamType::Bool,
            min: None,
            max: None,
            default: ParamValue::Bool(default),
            control: ControlHint::Checkbox,
        }
    }
}

/// Configuration handed to a pass's `setup`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassArgs {
    values: HashMap<String, ParamValue>,
}

impl PassArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(source: &str) -> Result<Self, PassError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.values.get(key).copied()
    }

    /// Resolves a float parameter, falling back to the schema default.
    ///
    /// Values outside the schema's `[min, max]` are rejected with
    /// [`PassError::InvalidConfig`].
    pub fn float(&self, spec: &ParamSpec) -> Result<f32, PassError> {
        let value = match self.get(spec.key).unwrap_or(spec.default) {
            ParamValue::Float(value) if value.is_finite() => value,
            ParamValue::Float(_) => return Err(PassError::invalid(spec.key, "value is not finite")),
            _ => return Err(type_error(spec, "float")),
        };
        let min = spec.min.unwrap_or(f32::NEG_INFINITY);
        let max = spec.max.unwrap_or(f32::INFINITY);
        if value < min || value > max {
            return Err(PassError::invalid(
                spec.key,
                format!("{value} is outside {min}..={max}"),
            ));
        }
        Ok(value)
    }

    /// Resolves a vec3 parameter, falling back to the schema default.
    pub fn vec3(&self, spec: &ParamSpec) -> Result<[f32; 3], PassError> {
        match self.get(spec.key).unwrap_or(spec.default) {
            ParamValue::Vec3(value) => Ok(value),
            _ => Err(type_error(spec, "vec3")),
        }
    }

    /// Resolves a boolean parameter, falling back to the schema default.
    pub fn flag(&self, spec: &ParamSpec) -> Result<bool, PassError> {
        match self.get(spec.key).unwrap_or(spec.default) {
            ParamValue::Bool(value) => Ok(value),
            _ => Err(type_error(spec, "bool")),
        }
    }
}

fn type_error(spec: &ParamSpec, expected: &'static str) -> PassError {
    PassError::ParamType {
        key: spec.key.to_string(),
        expected,
    }
}
