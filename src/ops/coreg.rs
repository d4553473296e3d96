//! Between-modality rigid-body alignment (`spatial.coreg`).

use std::path::Path;

use crate::{
    engine::{Outcome, ScriptRunner},
    error::SpmResult,
    ops::{CompiledJob, DispatchMode, predicted_outputs, require_str, scan_data, variant},
    options::OptionSet,
    schema::{self, Coerce, OperationSchema, OptionRule},
    value::JobValue,
    volume::VolumeSource,
};

pub const SCHEMA: OperationSchema = OperationSchema {
    family: "spatial",
    name: "coreg",
    groups: &["eoptions", "roptions"],
    rules: &[
        OptionRule::consumed("target"),
        OptionRule::consumed("source"),
        OptionRule::consumed("infile"),
        OptionRule::consumed("write"),
        OptionRule::group("cost_function", "eoptions", "cost_fun", Coerce::Keep),
        OptionRule::group("separation", "eoptions", "sep", Coerce::Float),
        OptionRule::group_list("tolerance", "eoptions", "tol", Coerce::Float, 12),
        OptionRule::group("fwhm", "eoptions", "fwhm", Coerce::Float),
        OptionRule::group("write_interp", "roptions", "interp", Coerce::Keep),
        OptionRule::group_list("write_wrap", "roptions", "wrap", Coerce::Keep, 3),
        OptionRule::group("write_mask", "roptions", "mask", Coerce::BoolAsInt),
    ],
};

/// Resliced outputs get this prefix.
pub const OUTPUT_PREFIX: &str = "r";

/// Coregistration of a source image to a reference target, optionally
/// carrying other images along with the estimated transform.
#[derive(Clone, Debug)]
pub struct Coregister {
    pub options: OptionSet,
}

impl Coregister {
    pub fn new() -> Self {
        Self {
            options: OptionSet::with_names(&SCHEMA.recognized_names()),
        }
    }

    pub fn compile(&self, source: &dyn VolumeSource) -> SpmResult<CompiledJob> {
        let jobtype = variant(&self.options, "estimate", "estwrite");
        let target_img = require_str(&self.options, "target")?;
        let source_img = require_str(&self.options, "source")?;
        let norm = schema::normalize(&SCHEMA, &self.options)?;

        // Estimation alone needs no companion images.
        let other = if self.options.is_set("infile") {
            scan_data(source, &self.options)?
        } else {
            JobValue::Files(Vec::new())
        };

        let mut fields = vec![
            ("ref".to_string(), JobValue::Str(target_img)),
            ("source".to_string(), JobValue::Str(source_img)),
            ("other".to_string(), other),
        ];
        fields.extend(norm.entries);
        let instance = JobValue::Fields(vec![(jobtype.to_string(), JobValue::Fields(fields))]);

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

impl Default for Coregister {
    fn default() -> Self {
        Self::new()
    }
}
