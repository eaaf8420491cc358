use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version written into every [`ParameterSnapshot`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Stable key of a parameter, also used as its key in state snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterId(String);

impl ParameterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParameterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-facing description of one parameter. Labels are static text.
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    pub id: ParameterId,
    pub name: &'static str,
    pub kind: ParameterKind,
    pub unit: Option<&'static str>,
    pub description: Option<&'static str>,
}

impl ParameterDefinition {
    pub fn new(id: &str, name: &'static str, kind: ParameterKind) -> Self {
        Self {
            id: ParameterId::new(id),
            name,
            kind,
            unit: None,
            description: None,
        }
    }

    pub fn with_unit(self, unit: &'static str) -> Self {
        Self {
            unit: Some(unit),
            ..self
        }
    }

    pub fn with_description(self, description: &'static str) -> Self {
        Self {
            description: Some(description),
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub enum ParameterKind {
    Continuous(ContinuousParameterOptions),
    Toggle { default: bool },
    Choice { options: Vec<String>, default: usize },
}

impl ParameterKind {
    pub fn choice<S: Into<String>>(options: impl IntoIterator<Item = S>, default: usize) -> Self {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        assert!(default < options.len(), "default choice outside options");
        Self::Choice { options, default }
    }

    pub fn default_value(&self) -> ParameterValue {
        match self {
            ParameterKind::Continuous(opts) => ParameterValue::Continuous(opts.default),
            ParameterKind::Toggle { default } => ParameterValue::Toggle(*default),
            ParameterKind::Choice { default, .. } => ParameterValue::Choice(*default),
        }
    }

    /// Checks the value type and brings it into range.
    ///
    /// Continuous values are clamped rather than rejected; a non-finite
    /// continuous value falls back to the default. Choice indices outside
    /// the option list and mismatched types are errors.
    pub fn coerce(
        &self,
        id: &ParameterId,
        value: ParameterValue,
    ) -> Result<ParameterValue, PluginParameterError> {
        match (self, value) {
            (ParameterKind::Continuous(opts), ParameterValue::Continuous(v)) => {
                Ok(ParameterValue::Continuous(opts.clamp(v)))
            }
            (ParameterKind::Toggle { .. }, value @ ParameterValue::Toggle(_)) => Ok(value),
            (ParameterKind::Choice { options, .. }, ParameterValue::Choice(idx)) => {
                if idx >= options.len() {
                    Err(PluginParameterError::InvalidChoice {
                        id: id.clone(),
                        index: idx,
                        count: options.len(),
                    })
                } else {
                    Ok(ParameterValue::Choice(idx))
                }
            }
            (_, value) => Err(PluginParameterError::WrongType {
                id: id.clone(),
                expected: self.type_name(),
                actual: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ParameterKind::Continuous(_) => "continuous",
            ParameterKind::Toggle { .. } => "toggle",
            ParameterKind::Choice { .. } => "choice",
        }
    }
}

/// Range and display hints for a continuous parameter. `skew` below 1
/// gives more of a control's travel to the low end of the range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuousParameterOptions {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub step: Option<f32>,
    pub skew: Option<f32>,
}

impl ContinuousParameterOptions {
    pub fn new(range: std::ops::RangeInclusive<f32>, default: f32) -> Self {
        let min = *range.start();
        let max = *range.end();
        assert!(min <= max, "parameter min must be <= max");
        assert!(default >= min && default <= max, "default outside range");
        Self {
            min,
            max,
            default,
            step: None,
            skew: None,
        }
    }

    pub fn with_step(mut self, step: f32) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_skew(mut self, skew: f32) -> Self {
        self.skew = Some(skew);
        self
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.default
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ParameterValue {
    Continuous(f32),
    Toggle(bool),
    Choice(usize),
}

impl ParameterValue {
    pub fn as_continuous(&self) -> Option<f32> {
        match self {
            ParameterValue::Continuous(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_toggle(&self) -> Option<bool> {
        match self {
            ParameterValue::Toggle(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<usize> {
        match self {
            ParameterValue::Choice(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Continuous(_) => "continuous",
            ParameterValue::Toggle(_) => "toggle",
            ParameterValue::Choice(_) => "choice",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterLayout {
    parameters: Vec<ParameterDefinition>,
}

impl ParameterLayout {
    pub fn new(parameters: Vec<ParameterDefinition>) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    pub fn find(&self, id: &ParameterId) -> Option<&ParameterDefinition> {
        self.parameters
            .iter()
            .find(|definition| &definition.id == id)
    }
}

/// Serializable copy of every parameter value, keyed by parameter id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub version: u32,
    pub values: BTreeMap<String, ParameterValue>,
}

#[derive(Debug, Clone)]
pub struct ParameterSet {
    layout: ParameterLayout,
    values: HashMap<ParameterId, ParameterValue>,
}

impl ParameterSet {
    pub fn new(layout: ParameterLayout) -> Self {
        let mut values = HashMap::new();
        for parameter in layout.parameters() {
            values.insert(parameter.id.clone(), parameter.kind.default_value());
        }
        Self { layout, values }
    }

    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    pub fn get(&self, id: &ParameterId) -> Option<&ParameterValue> {
        self.values.get(id)
    }

    /// Stores `value` after coercing it into the parameter's range and
    /// returns what was actually stored.
    pub fn set(
        &mut self,
        id: &ParameterId,
        value: ParameterValue,
    ) -> Result<ParameterValue, PluginParameterError> {
        let definition = self
            .layout
            .find(id)
            .ok_or_else(|| PluginParameterError::UnknownParameter(id.clone()))?;
        let value = definition.kind.coerce(id, value)?;
        self.values.insert(id.clone(), value);
        Ok(value)
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            version: SNAPSHOT_VERSION,
            values: self
                .values
                .iter()
                .map(|(id, value)| (id.as_str().to_owned(), *value))
                .collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PluginParameterError {
    #[error("unknown parameter `{0}`")]
    UnknownParameter(ParameterId),
    #[error("parameter `{id}` expected {expected} value but received {actual}")]
    WrongType {
        id: ParameterId,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("parameter `{id}` received choice index {index} outside of 0..{count}")]
    InvalidChoice {
        id: ParameterId,
        index: usize,
        count: usize,
    },
    #[error("state snapshot version {0} is not supported")]
    UnsupportedStateVersion(u32),
    #[error("invalid state payload: {0}")]
    InvalidState(#[from] serde_json::Error),
}
