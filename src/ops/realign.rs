//! Within-modality rigid-body alignment (`spatial.realign`).

use std::path::Path;

use crate::{
    engine::{Outcome, ScriptRunner},
    error::SpmResult,
    ops::{CompiledJob, DispatchMode, predicted_outputs, scan_data, variant},
    options::OptionSet,
    schema::{self, Coerce, OperationSchema, OptionRule},
    value::JobValue,
    volume::VolumeSource,
};

pub const SCHEMA: OperationSchema = OperationSchema {
    family: "spatial",
    name: "realign",
    groups: &["eoptions", "roptions"],
    rules: &[
        OptionRule::consumed("infile"),
        OptionRule::consumed("write"),
        OptionRule::group("quality", "eoptions", "quality", Coerce::Float),
        OptionRule::group("fwhm", "eoptions", "fwhm", Coerce::Float),
        OptionRule::group("separation", "eoptions", "sep", Coerce::Float),
        OptionRule::group("register_to_mean", "eoptions", "rtm", Coerce::BoolAsInt),
        OptionRule::group("weight_img", "eoptions", "weight", Coerce::Keep),
        OptionRule::group("interp", "eoptions", "interp", Coerce::Float),
        OptionRule::group_list("wrap", "eoptions", "wrap", Coerce::Keep, 3),
        OptionRule::group_list("write_which", "roptions", "which", Coerce::Keep, 2),
        OptionRule::group("write_interp", "roptions", "interp", Coerce::Keep),
        OptionRule::group_list("write_wrap", "roptions", "wrap", Coerce::Keep, 3),
        OptionRule::group("write_mask", "roptions", "mask", Coerce::BoolAsInt),
    ],
};

/// Resliced outputs get this prefix.
pub const OUTPUT_PREFIX: &str = "r";

/// Realignment job over one or more sessions of frames.
#[derive(Clone, Debug)]
pub struct Realign {
    pub options: OptionSet,
}

impl Realign {
    pub fn new() -> Self {
        Self {
            options: OptionSet::with_names(&SCHEMA.recognized_names()),
        }
    }

    /// Normalize the options and assemble the job instance.
    pub fn compile(&self, source: &dyn VolumeSource) -> SpmResult<CompiledJob> {
        let jobtype = variant(&self.options, "estimate", "estwrite");
        let norm = schema::normalize(&SCHEMA, &self.options)?;
        let data = scan_data(source, &self.options)?;

        let mut fields = vec![("data".to_string(), data)];
        fields.extend(norm.entries);
        let instance = JobValue::Fields(vec![(jobtype.to_string(), JobValue::Fields(fields))]);

        Ok(CompiledJob {
            family: SCHEMA.family,
            name: SCHEMA.name,
            instance,
            diagnostics: norm.diagnostics,
        })
    }

    /// Compile, dispatch, and collect the outcome.
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

impl Default for Realign {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::AnyVolume;

    fn with_input() -> Realign {
        let mut op = Realign::new();
        op.options.set("infile", "bold.nii");
        op
    }

    #[test]
    fn options_map_to_estimation_fields() {
        let mut op = with_input();
        op.options.set("fwhm", 5.0);
        op.options.set("separation", 4.0);
        op.options.set("wrap", vec![0i64, 0, 1]);

        let job = op.compile(&AnyVolume(vec![64, 64, 30])).unwrap();
        let inner = job.instance.field("estwrite").unwrap();
        let eoptions = inner.field("eoptions").unwrap();
        assert_eq!(eoptions.field("fwhm"), Some(&JobValue::Float(5.0)));
        assert_eq!(eoptions.field("sep"), Some(&JobValue::Float(4.0)));
        assert_eq!(
            eoptions.field("wrap"),
            Some(&JobValue::Items(vec![
                JobValue::Int(0),
                JobValue::Int(0),
                JobValue::Int(1),
            ]))
        );
        assert_eq!(inner.field("roptions"), Some(&JobValue::Fields(vec![])));
    }

    #[test]
    fn write_false_selects_estimate_only() {
        let mut op = with_input();
        op.options.set("write", false);
        let job = op.compile(&AnyVolume(vec![64, 64, 30])).unwrap();
        assert!(job.instance.field("estimate").is_some());
        assert!(job.instance.field("estwrite").is_none());
    }

    #[test]
    fn short_wrap_fails_compilation() {
        let mut op = with_input();
        op.options.set("wrap", vec![0i64, 1]);
        let err = op.compile(&AnyVolume(vec![64, 64, 30])).unwrap_err();
        assert!(err.to_string().contains("wrap"));
    }

    #[test]
    fn single_frame_volume_contributes_one_scan() {
        let op = with_input();
        let job = op.compile(&AnyVolume(vec![64, 64, 30])).unwrap();
        let data = job.instance.field("estwrite").unwrap().field("data").unwrap();
        assert_eq!(data, &JobValue::Files(vec!["bold.nii,1".to_string()]));
    }
}
