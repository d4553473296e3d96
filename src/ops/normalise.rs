//! Non-linear warping to a template (`spatial.normalise`).
//!
//! The estimate-only variant keyword is `est`, not `estimate`: the engine
//! names this one differently from the other spatial operations.

use std::path::Path;

use crate::{
    engine::{Outcome, ScriptRunner},
    error::SpmResult,
    ops::{CompiledJob, DispatchMode, predicted_outputs, require_str, scan_data, variant},
    options::OptionSet,
    schema::{self, Coerce, OperationSchema, OptionRule},
    value::{JobValue, insert_field},
    volume::VolumeSource,
};

pub const SCHEMA: OperationSchema = OperationSchema {
    family: "spatial",
    name: "normalise",
    groups: &["subj", "eoptions", "roptions"],
    rules: &[
        OptionRule::consumed("infile"),
        OptionRule::consumed("write"),
        OptionRule::group("template", "eoptions", "template", Coerce::Keep),
        OptionRule::group("source", "subj", "source", Coerce::Keep),
        OptionRule::group("source_weight", "subj", "wtsrc", Coerce::Keep),
        OptionRule::group("template_weight", "eoptions", "weight", Coerce::Keep),
        OptionRule::group("source_image_smoothing", "eoptions", "smosrc", Coerce::Float),
        OptionRule::group("template_image_smoothing", "eoptions", "smoref", Coerce::Float),
        OptionRule::group("affine_regularization_type", "eoptions", "regtype", Coerce::Keep),
        OptionRule::group("dct_period_cutoff", "eoptions", "cutoff", Coerce::Float),
        OptionRule::group("nonlinear_iterations", "eoptions", "nits", Coerce::Int),
        OptionRule::group("nonlinear_regularization", "eoptions", "reg", Coerce::Float),
        OptionRule::group("write_preserve", "roptions", "preserve", Coerce::Int),
        OptionRule::group_list("write_bounding_box", "roptions", "bb", Coerce::Float, 6),
        OptionRule::group_list("write_voxel_sizes", "roptions", "vox", Coerce::Float, 3),
        OptionRule::group("write_interp", "roptions", "interp", Coerce::Keep),
        OptionRule::group_list("write_wrap", "roptions", "wrap", Coerce::Keep, 3),
    ],
};

/// Warped outputs get this prefix.
pub const OUTPUT_PREFIX: &str = "w";

/// Warp a source image to a template, optionally resampling other images
/// through the estimated deformation.
#[derive(Clone, Debug)]
pub struct Normalise {
    pub options: OptionSet,
}

impl Normalise {
    pub fn new() -> Self {
        Self {
            options: OptionSet::with_names(&SCHEMA.recognized_names()),
        }
    }

    pub fn compile(&self, source: &dyn VolumeSource) -> SpmResult<CompiledJob> {
        let jobtype = variant(&self.options, "est", "estwrite");
        require_str(&self.options, "template")?;
        require_str(&self.options, "source")?;
        let mut norm = schema::normalize(&SCHEMA, &self.options)?;

        if self.options.is_set("infile") {
            let data = scan_data(source, &self.options)?;
            if let Some(subj) = norm.group_entries_mut("subj") {
                insert_field(subj, "resample", data);
            }
        }

        let instance =
            JobValue::Fields(vec![(jobtype.to_string(), JobValue::Fields(norm.entries))]);

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

impl Default for Normalise {
    fn default() -> Self {
        Self::new()
    }
}
