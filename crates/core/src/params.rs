//! Typed strategy parameters with a versionable schema
//!
//! Every strategy publishes a schema describing its tunable parameters
//! (display name, type, range, step, default). Updates arrive as a map of
//! `ParamValue`s and are validated against the schema before any mutation:
//! unknown keys, kind mismatches and out-of-range values are rejected and
//! the prior parameters retained.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Parameter type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Int,
    Float,
    Bool,
}

/// A typed parameter value supplied by the configuration surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Float(Decimal),
    Bool(bool),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Bool(_) => ParamKind::Bool,
        }
    }

    /// Numeric view for range checks; bools have no numeric value
    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ParamValue::Int(v) => Some(Decimal::from(*v)),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<Decimal> {
        match self {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Description of a single tunable parameter, consumed by the config UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub display_name: String,
    pub kind: ParamKind,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
    pub default: ParamValue,
    pub description: String,
}

impl ParamSpec {
    pub fn int(
        display_name: &str,
        default: i64,
        min: i64,
        max: i64,
        step: i64,
        description: &str,
    ) -> Self {
        Self {
            display_name: display_name.to_string(),
            kind: ParamKind::Int,
            min: Decimal::from(min),
            max: Decimal::from(max),
            step: Decimal::from(step),
            default: ParamValue::Int(default),
            description: description.to_string(),
        }
    }

    pub fn float(
        display_name: &str,
        default: Decimal,
        min: Decimal,
        max: Decimal,
        step: Decimal,
        description: &str,
    ) -> Self {
        Self {
            display_name: display_name.to_string(),
            kind: ParamKind::Float,
            min,
            max,
            step,
            default: ParamValue::Float(default),
            description: description.to_string(),
        }
    }
}

/// Ordered parameter schema: key -> spec
pub type ParamSchema = BTreeMap<String, ParamSpec>;

/// Parameter validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    UnknownKey(String),

    #[error("parameter '{key}' expects {expected:?}, got {got:?}")]
    KindMismatch {
        key: String,
        expected: ParamKind,
        got: ParamKind,
    },

    #[error("parameter '{key}' value {value} outside [{min}, {max}]")]
    OutOfRange {
        key: String,
        value: Decimal,
        min: Decimal,
        max: Decimal,
    },
}

/// Validate a full update map against a schema. All entries must pass before
/// any of them may be applied.
pub fn validate_params(
    schema: &ParamSchema,
    updates: &BTreeMap<String, ParamValue>,
) -> Result<(), ParamError> {
    for (key, value) in updates {
        let spec = schema
            .get(key)
            .ok_or_else(|| ParamError::UnknownKey(key.clone()))?;

        if value.kind() != spec.kind {
            return Err(ParamError::KindMismatch {
                key: key.clone(),
                expected: spec.kind,
                got: value.kind(),
            });
        }

        if let Some(numeric) = value.as_decimal()
            && (numeric < spec.min || numeric > spec.max)
        {
            return Err(ParamError::OutOfRange {
                key: key.clone(),
                value: numeric,
                min: spec.min,
                max: spec.max,
            });
        }
    }
    Ok(())
}
