//! Declarative option schemas and the generic normalization engine.
//!
//! Each operation declares a static table of [`OptionRule`] records; one
//! routine interprets every table. Per-operation variance lives entirely in
//! the tables, never in code.

use crate::error::{SpmError, SpmResult};
use crate::options::{OptionSet, OptionValue};
use crate::value::{JobValue, insert_field};

/// The `flags` option bypasses the rule table: its mapping is merged
/// wholesale into the normalized fragment.
pub const FLAGS_OPTION: &str = "flags";

#[derive(Clone, Copy, Debug)]
pub enum Coerce {
    /// Pass the value through unchanged.
    Keep,
    /// Force numeric values (and numeric lists) to floating point.
    Float,
    /// Force numeric values to integers.
    Int,
    /// Engine booleans are 0/1 integers.
    BoolAsInt,
}

#[derive(Clone, Copy, Debug)]
pub enum Target {
    /// Place under a named sub-group, renamed to the engine's field name.
    Group(&'static str, &'static str),
    /// Place at the top level of the fragment.
    Field(&'static str),
    /// Recognized but consumed by the assembler; never a job field.
    Consumed,
}

#[derive(Clone, Copy, Debug)]
pub struct OptionRule {
    pub option: &'static str,
    pub target: Target,
    pub coerce: Coerce,
    pub len: Option<usize>,
}

impl OptionRule {
    pub const fn group(option: &'static str, group: &'static str, key: &'static str, coerce: Coerce) -> Self {
        Self { option, target: Target::Group(group, key), coerce, len: None }
    }

    pub const fn group_list(
        option: &'static str,
        group: &'static str,
        key: &'static str,
        coerce: Coerce,
        len: usize,
    ) -> Self {
        Self { option, target: Target::Group(group, key), coerce, len: Some(len) }
    }

    pub const fn field(option: &'static str, key: &'static str, coerce: Coerce) -> Self {
        Self { option, target: Target::Field(key), coerce, len: None }
    }

    pub const fn field_list(option: &'static str, key: &'static str, coerce: Coerce, len: usize) -> Self {
        Self { option, target: Target::Field(key), coerce, len: Some(len) }
    }

    pub const fn consumed(option: &'static str) -> Self {
        Self { option, target: Target::Consumed, coerce: Coerce::Keep, len: None }
    }
}

/// One operation's schema: engine addressing plus the rule table.
#[derive(Clone, Copy, Debug)]
pub struct OperationSchema {
    pub family: &'static str,
    pub name: &'static str,
    /// Instance sub-groups the rules may target, in instance order. Groups
    /// appear in the fragment even when no option lands in them.
    pub groups: &'static [&'static str],
    pub rules: &'static [OptionRule],
}

impl OperationSchema {
    /// All option names this schema accepts without a diagnostic.
    pub fn recognized_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.rules.iter().map(|r| r.option).collect();
        names.push(FLAGS_OPTION);
        names
    }
}

/// A non-fatal "unsupported option" diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsupportedOption {
    pub option: String,
}

impl std::fmt::Display for UnsupportedOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "option '{}' not supported", self.option)
    }
}

/// The normalized fragment for one operation, plus collected diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedOptions {
    /// Declared groups first (in declared order), then top-level fields.
    pub entries: Vec<(String, JobValue)>,
    pub diagnostics: Vec<UnsupportedOption>,
}

impl NormalizedOptions {
    pub fn group(&self, name: &str) -> Option<&JobValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub(crate) fn group_entries_mut(&mut self, name: &str) -> Option<&mut Vec<(String, JobValue)>> {
        self.entries.iter_mut().find_map(|(k, v)| match v {
            JobValue::Fields(entries) if k == name => Some(entries),
            _ => None,
        })
    }
}

/// Interpret `schema` over the assigned options.
///
/// Unset options are skipped. Unrecognized names are collected as
/// diagnostics and logged, never fatal. A declared length constraint that
/// fails aborts normalization with a validation error. `flags` is merged
/// last so its contents win deterministically.
#[tracing::instrument(skip_all, fields(op = schema.name))]
pub fn normalize(schema: &OperationSchema, options: &OptionSet) -> SpmResult<NormalizedOptions> {
    let mut entries: Vec<(String, JobValue)> = schema
        .groups
        .iter()
        .map(|g| (g.to_string(), JobValue::Fields(Vec::new())))
        .collect();
    let mut diagnostics = Vec::new();

    for (name, value) in options.iter_set() {
        if name == FLAGS_OPTION {
            continue;
        }
        let Some(rule) = schema.rules.iter().find(|r| r.option == name) else {
            let diag = UnsupportedOption { option: name.to_string() };
            tracing::warn!(option = name, "{diag}");
            diagnostics.push(diag);
            continue;
        };

        if let Some(expected) = rule.len
            && value.list_len() != Some(expected)
        {
            return Err(SpmError::validation(format!(
                "{name} must have exactly {expected} elements"
            )));
        }

        let coerced = coerce(value, rule.coerce);
        match rule.target {
            Target::Consumed => {}
            Target::Group(group, key) => {
                match entries.iter_mut().find(|(k, _)| k == group) {
                    Some((_, JobValue::Fields(group_entries))) => {
                        insert_field(group_entries, key, coerced);
                    }
                    // Schemas list every group they target; tolerate a
                    // missing one by creating it at the end of the fragment.
                    _ => entries.push((
                        group.to_string(),
                        JobValue::Fields(vec![(key.to_string(), coerced)]),
                    )),
                }
            }
            Target::Field(key) => insert_field(&mut entries, key, coerced),
        }
    }

    if let Some(flags) = options.get(FLAGS_OPTION) {
        let OptionValue::Map(pairs) = flags else {
            return Err(SpmError::validation("flags must be a mapping"));
        };
        for (key, value) in pairs {
            insert_field(&mut entries, key.clone(), value.to_job_value());
        }
    }

    Ok(NormalizedOptions { entries, diagnostics })
}

fn coerce(value: &OptionValue, how: Coerce) -> JobValue {
    match how {
        Coerce::Keep => value.to_job_value(),
        Coerce::Float => match value {
            OptionValue::Int(i) => JobValue::Float(*i as f64),
            OptionValue::Ints(v) => JobValue::Items(v.iter().map(|i| JobValue::Float(*i as f64)).collect()),
            other => other.to_job_value(),
        },
        Coerce::Int => match value {
            OptionValue::Float(f) => JobValue::Int(*f as i64),
            OptionValue::Bool(b) => JobValue::Int(i64::from(*b)),
            OptionValue::Floats(v) => JobValue::Items(v.iter().map(|f| JobValue::Int(*f as i64)).collect()),
            other => other.to_job_value(),
        },
        Coerce::BoolAsInt => match value {
            OptionValue::Bool(b) => JobValue::Int(i64::from(*b)),
            other => other.to_job_value(),
        },
    }
}
