//! User-facing option sets.
//!
//! Every operation owns an [`OptionSet`] created with all recognized option
//! names present but unset. "Unset" is an explicit state, distinct from a
//! name that was never entered: an unset option is skipped at normalization
//! time, while an unknown name that was assigned surfaces as a diagnostic.

use crate::error::{SpmError, SpmResult};
use crate::value::JobValue;

/// A single option value as supplied by the caller, before coercion.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Strs(Vec<String>),
    /// Nested mapping, only meaningful for the `flags` escape hatch.
    Map(Vec<(String, OptionValue)>),
}

impl OptionValue {
    /// Element count for list values; `None` for scalars and maps.
    pub fn list_len(&self) -> Option<usize> {
        match self {
            Self::Ints(v) => Some(v.len()),
            Self::Floats(v) => Some(v.len()),
            Self::Strs(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Parse a loosely-typed JSON value (e.g. from a CLI option file).
    ///
    /// Arrays must be homogeneous; integers stay integers so that list
    /// options like `wrap` survive untouched.
    pub fn from_json(v: &serde_json::Value) -> SpmResult<Self> {
        use serde_json::Value;
        match v {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::String(s) => Ok(Self::Str(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(SpmError::validation(format!("unrepresentable number {n}")))
                }
            }
            Value::Array(items) => {
                if items.iter().all(|i| i.as_i64().is_some()) {
                    Ok(Self::Ints(items.iter().filter_map(|i| i.as_i64()).collect()))
                } else if items.iter().all(|i| i.as_f64().is_some()) {
                    Ok(Self::Floats(items.iter().filter_map(|i| i.as_f64()).collect()))
                } else if items.iter().all(|i| i.is_string()) {
                    Ok(Self::Strs(
                        items
                            .iter()
                            .filter_map(|i| i.as_str().map(str::to_string))
                            .collect(),
                    ))
                } else {
                    Err(SpmError::validation(
                        "option lists must be all-numeric or all-string",
                    ))
                }
            }
            Value::Object(map) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (k, v) in map {
                    pairs.push((k.clone(), Self::from_json(v)?));
                }
                Ok(Self::Map(pairs))
            }
            Value::Null => Err(SpmError::validation("null is not a valid option value")),
        }
    }

    /// Uncoerced conversion into a job node.
    pub fn to_job_value(&self) -> JobValue {
        match self {
            Self::Bool(b) => JobValue::Bool(*b),
            Self::Int(i) => JobValue::Int(*i),
            Self::Float(f) => JobValue::Float(*f),
            Self::Str(s) => JobValue::Str(s.clone()),
            Self::Ints(v) => JobValue::Items(v.iter().map(|i| JobValue::Int(*i)).collect()),
            Self::Floats(v) => JobValue::Items(v.iter().map(|f| JobValue::Float(*f)).collect()),
            Self::Strs(v) => {
                JobValue::Items(v.iter().map(|s| JobValue::Str(s.clone())).collect())
            }
            Self::Map(pairs) => JobValue::Fields(
                pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_job_value()))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<i64>> for OptionValue {
    fn from(v: Vec<i64>) -> Self {
        Self::Ints(v)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(v: Vec<String>) -> Self {
        Self::Strs(v)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(v: Vec<&str>) -> Self {
        Self::Strs(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<f64>> for OptionValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Floats(v)
    }
}

#[derive(Clone, Debug, PartialEq)]
enum OptionState {
    Unset,
    Set(OptionValue),
}

/// Insertion-ordered option mapping with an explicit unset sentinel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionSet {
    entries: Vec<(String, OptionState)>,
}

impl OptionSet {
    /// An option set with every given name present and unset.
    pub fn with_names(names: &[&str]) -> Self {
        Self {
            entries: names
                .iter()
                .map(|n| (n.to_string(), OptionState::Unset))
                .collect(),
        }
    }

    /// Assign a value. Unknown names are appended; they surface as
    /// diagnostics when the set is normalized.
    pub fn set(&mut self, name: &str, value: impl Into<OptionValue>) {
        let value = OptionState::Set(value.into());
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, state)) => *state = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Return an option to the unset state.
    pub fn unset(&mut self, name: &str) {
        if let Some((_, state)) = self.entries.iter_mut().find(|(n, _)| n == name) {
            *state = OptionState::Unset;
        }
    }

    /// The assigned value, or `None` when unset or unknown.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.iter().find_map(|(n, state)| match state {
            OptionState::Set(v) if n == name => Some(v),
            _ => None,
        })
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Assigned options only, in insertion order.
    pub fn iter_set(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().filter_map(|(n, state)| match state {
            OptionState::Set(v) => Some((n.as_str(), v)),
            OptionState::Unset => None,
        })
    }

    /// Assign every entry of a JSON object.
    pub fn set_from_json(&mut self, obj: &serde_json::Map<String, serde_json::Value>) -> SpmResult<()> {
        for (name, value) in obj {
            self.set(name, OptionValue::from_json(value)?);
        }
        Ok(())
    }
}
