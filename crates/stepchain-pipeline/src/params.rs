//! Parameter schemas and per-step parameter storage.
//!
//! Every operation in the [catalog](crate::catalog) declares a static
//! schema of [`ParamSpec`]s. A [`StepParams`] holds one validated value
//! per schema entry, so an operation never sees an out-of-range or
//! wrong-typed value.
//!
//! # Validation
//!
//! User input never produces an error here. Numbers are clamped to the
//! declared range (and bumped to the nearest odd/even value where the
//! schema asks for it), and anything that cannot be interpreted falls
//! back to the declared default. Only an unknown parameter *name* is
//! rejected, since that indicates a controller bug rather than bad input.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::Image;

/// Constraint applied to integer parameters after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntRule {
    /// Any integer in range.
    Any,
    /// Forced odd (kernel sizes).
    Odd,
    /// Forced even (tile/block sizes).
    Even,
}

/// Type, range, and default of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Integer in `[min, max]`.
    Int {
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
        /// Value used when input is missing or unusable.
        default: i64,
        /// Parity constraint.
        rule: IntRule,
    },
    /// Finite float in `[min, max]`.
    Float {
        /// Smallest accepted value.
        min: f64,
        /// Largest accepted value.
        max: f64,
        /// Value used when input is missing or unusable.
        default: f64,
    },
    /// Boolean switch.
    Flag {
        /// Value used when input is missing or unusable.
        default: bool,
    },
    /// One of a fixed set of names.
    Choice {
        /// Accepted names, in display order.
        options: &'static [&'static str],
        /// Value used when input is missing or unusable.
        default: &'static str,
    },
}

/// A named entry in an operation's parameter schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Parameter name as used by controllers (`snake_case`).
    pub name: &'static str,
    /// Type, range, and default.
    pub kind: ParamKind,
}

impl ParamSpec {
    /// Integer parameter with no parity constraint.
    #[must_use]
    pub const fn int(name: &'static str, min: i64, max: i64, default: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Int {
                min,
                max,
                default,
                rule: IntRule::Any,
            },
        }
    }

    /// Integer parameter forced odd.
    #[must_use]
    pub const fn odd(name: &'static str, min: i64, max: i64, default: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Int {
                min,
                max,
                default,
                rule: IntRule::Odd,
            },
        }
    }

    /// Integer parameter forced even.
    #[must_use]
    pub const fn even(name: &'static str, min: i64, max: i64, default: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Int {
                min,
                max,
                default,
                rule: IntRule::Even,
            },
        }
    }

    /// Float parameter.
    #[must_use]
    pub const fn float(name: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name,
            kind: ParamKind::Float { min, max, default },
        }
    }

    /// Boolean parameter.
    #[must_use]
    pub const fn flag(name: &'static str, default: bool) -> Self {
        Self {
            name,
            kind: ParamKind::Flag { default },
        }
    }

    /// Enumerated parameter.
    #[must_use]
    pub const fn choice(
        name: &'static str,
        options: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Choice { options, default },
        }
    }
}

/// A parameter value as supplied by a controller or stored in a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean value.
    Flag(bool),
    /// Enumerated value, by name.
    Choice(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Flag(v) => write!(f, "{v}"),
            Self::Choice(v) => f.write_str(v),
        }
    }
}

impl ParamKind {
    /// The declared default as a [`ParamValue`].
    #[must_use]
    pub fn default_value(&self) -> ParamValue {
        match *self {
            Self::Int { default, .. } => ParamValue::Int(default),
            Self::Float { default, .. } => ParamValue::Float(default),
            Self::Flag { default } => ParamValue::Flag(default),
            Self::Choice { default, .. } => ParamValue::Choice(default.to_owned()),
        }
    }

    /// Coerce `value` into this kind: clamp numbers, apply parity rules,
    /// and fall back to the default for anything unusable.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn validate(&self, value: ParamValue) -> ParamValue {
        match (*self, value) {
            (Self::Int { min, max, rule, .. }, ParamValue::Int(v)) => {
                ParamValue::Int(apply_rule(v.clamp(min, max), min, max, rule))
            }
            (Self::Int { min, max, rule, .. }, ParamValue::Float(v)) if v.is_finite() => {
                let v = v.round().clamp(min as f64, max as f64) as i64;
                ParamValue::Int(apply_rule(v, min, max, rule))
            }
            (Self::Float { min, max, .. }, ParamValue::Float(v)) if v.is_finite() => {
                ParamValue::Float(v.clamp(min, max))
            }
            (Self::Float { min, max, .. }, ParamValue::Int(v)) => {
                ParamValue::Float((v as f64).clamp(min, max))
            }
            (Self::Flag { .. }, ParamValue::Flag(v)) => ParamValue::Flag(v),
            (Self::Choice { options, default }, ParamValue::Choice(v)) => {
                let wanted = v.trim();
                let canonical = options
                    .iter()
                    .find(|o| o.eq_ignore_ascii_case(wanted))
                    .copied()
                    .unwrap_or(default);
                ParamValue::Choice(canonical.to_owned())
            }
            (kind, _) => kind.default_value(),
        }
    }

    /// Parse raw user text into this kind, then [`validate`](Self::validate).
    ///
    /// Text that does not parse yields the default.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn parse(&self, raw: &str) -> ParamValue {
        let raw = raw.trim();
        let parsed = match *self {
            Self::Int { .. } => raw
                .parse::<i64>()
                .map(ParamValue::Int)
                .or_else(|_| raw.parse::<f64>().map(ParamValue::Float))
                .ok(),
            Self::Float { .. } => raw.parse::<f64>().map(ParamValue::Float).ok(),
            Self::Flag { .. } => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(ParamValue::Flag(true)),
                "false" | "0" | "no" | "off" => Some(ParamValue::Flag(false)),
                _ => None,
            },
            Self::Choice { .. } => Some(ParamValue::Choice(raw.to_owned())),
        };
        parsed.map_or_else(|| self.default_value(), |v| self.validate(v))
    }
}

/// Nudge a clamped integer onto the parity `rule` without leaving
/// `[min, max]`.
const fn apply_rule(v: i64, min: i64, max: i64, rule: IntRule) -> i64 {
    let wants_odd = match rule {
        IntRule::Any => return v,
        IntRule::Odd => true,
        IntRule::Even => false,
    };
    if (v.rem_euclid(2) == 1) == wants_odd {
        v
    } else if v < max {
        v + 1
    } else if v > min {
        v - 1
    } else {
        v
    }
}

/// Validated parameter values for one step.
///
/// Holds exactly one value per entry of the operation's schema, plus an
/// optional second image for operations that combine two images.
#[derive(Debug, Clone)]
pub struct StepParams {
    specs: &'static [ParamSpec],
    values: Vec<ParamValue>,
    second: Option<Arc<Image>>,
}

impl StepParams {
    /// All parameters at their declared defaults, no second image.
    #[must_use]
    pub fn defaults(specs: &'static [ParamSpec]) -> Self {
        Self {
            specs,
            values: specs.iter().map(|s| s.kind.default_value()).collect(),
            second: None,
        }
    }

    /// The schema these values follow.
    #[must_use]
    pub const fn specs(&self) -> &'static [ParamSpec] {
        self.specs
    }

    /// Look up a value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.index(name).map(|i| &self.values[i])
    }

    /// Iterate `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> {
        self.specs.iter().map(|s| s.name).zip(self.values.iter())
    }

    /// Store `value` after validating it against the schema.
    ///
    /// Returns the value actually stored, or `None` if `name` is not in
    /// the schema.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Option<&ParamValue> {
        let i = self.index(name)?;
        self.values[i] = self.specs[i].kind.validate(value);
        Some(&self.values[i])
    }

    /// Parse and store raw user text.
    ///
    /// Returns the value actually stored, or `None` if `name` is not in
    /// the schema.
    pub fn set_str(&mut self, name: &str, raw: &str) -> Option<&ParamValue> {
        let i = self.index(name)?;
        self.values[i] = self.specs[i].kind.parse(raw);
        Some(&self.values[i])
    }

    /// Integer value of `name`, or `0` if it is not an integer parameter.
    #[must_use]
    pub fn int(&self, name: &str) -> i64 {
        match self.get(name) {
            Some(ParamValue::Int(v)) => *v,
            _ => 0,
        }
    }

    /// Integer value of `name` as `u32`, saturating at the type bounds.
    #[must_use]
    pub fn uint(&self, name: &str) -> u32 {
        u32::try_from(self.int(name).max(0)).unwrap_or(u32::MAX)
    }

    /// Float value of `name`, or `0.0` if it is not a float parameter.
    #[must_use]
    pub fn float(&self, name: &str) -> f64 {
        match self.get(name) {
            Some(ParamValue::Float(v)) => *v,
            _ => 0.0,
        }
    }

    /// Boolean value of `name`, or `false` if it is not a flag.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(ParamValue::Flag(true)))
    }

    /// Choice value of `name`, or `""` if it is not a choice parameter.
    #[must_use]
    pub fn choice(&self, name: &str) -> &str {
        match self.get(name) {
            Some(ParamValue::Choice(v)) => v,
            _ => "",
        }
    }

    /// The second image for combining operations, if one is set.
    #[must_use]
    pub fn second_image(&self) -> Option<&Image> {
        self.second.as_deref()
    }

    /// Replace the second image.
    pub fn set_second_image(&mut self, image: Option<Arc<Image>>) {
        self.second = image;
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|s| s.name == name)
    }
}
