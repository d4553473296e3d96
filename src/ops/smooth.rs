//! 3-D Gaussian smoothing (`spatial.smooth`).
//!
//! Smooth has no estimate/write variant level; its instance is flat, with
//! engine defaults for the kernel and output data type.

use std::path::Path;

use crate::{
    engine::{Outcome, ScriptRunner},
    error::SpmResult,
    ops::{CompiledJob, DispatchMode, predicted_outputs, scan_data},
    options::OptionSet,
    schema::{self, Coerce, OperationSchema, OptionRule},
    value::{JobValue, insert_field},
    volume::VolumeSource,
};

pub const SCHEMA: OperationSchema = OperationSchema {
    family: "spatial",
    name: "smooth",
    groups: &[],
    rules: &[
        OptionRule::consumed("infile"),
        OptionRule::field_list("fwhm", "fwhm", Coerce::Float, 3),
        OptionRule::field("data_type", "dtype", Coerce::Int),
    ],
};

/// Smoothed outputs get this prefix.
pub const OUTPUT_PREFIX: &str = "s";

#[derive(Clone, Debug)]
pub struct Smooth {
    pub options: OptionSet,
}

impl Smooth {
    pub fn new() -> Self {
        Self {
            options: OptionSet::with_names(&SCHEMA.recognized_names()),
        }
    }

    pub fn compile(&self, source: &dyn VolumeSource) -> SpmResult<CompiledJob> {
        let norm = schema::normalize(&SCHEMA, &self.options)?;
        let data = scan_data(source, &self.options)?;

        let mut fields = vec![
            ("data".to_string(), data),
            ("fwhm".to_string(), JobValue::Items(Vec::new())),
            ("dtype".to_string(), JobValue::Int(0)),
        ];
        for (key, value) in norm.entries {
            insert_field(&mut fields, key, value);
        }
        let instance = JobValue::Fields(fields);

        Ok(CompiledJob {
            family: SCHEMA.family,
            name: SCHEMA.name,
            instance,
            diagnostics: norm.diagnostics,
        })
    }

    pub fn run(
        &self,
        source: &dyn VolumeSource,
        runner: &dyn ScriptRunner,
        cwd: &Path,
        mode: DispatchMode,
    ) -> SpmResult<Outcome> {
        let job = self.compile(source)?;
        let run = job.dispatch(runner, cwd, mode)?;
        Ok(Outcome::from_run(
            run,
            predicted_outputs(&self.options, OUTPUT_PREFIX),
        ))
    }
}

impl Default for Smooth {
    fn default() -> Self {
        Self::new()
    }
}
