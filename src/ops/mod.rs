//! Supported engine operations.
//!
//! Each operation owns an [`OptionSet`] created over its schema's
//! recognized names and compiles into a [`CompiledJob`]. Per-operation
//! variance is schema-only; assembly and dispatch share the code here.

pub mod coreg;
pub mod normalise;
pub mod realign;
pub mod smooth;

use std::path::{Path, PathBuf};

use crate::{
    engine::{self, RunOutput, ScriptRunner},
    error::{SpmError, SpmResult},
    frames::{frame_refs, frame_refs_many, session_value, sessions_value},
    options::{OptionSet, OptionValue},
    schema::UnsupportedOption,
    script,
    value::JobValue,
    volume::VolumeSource,
};

/// How a compiled job reaches the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Serialize to an m-file and feed it to the interpreter.
    #[default]
    Script,
    /// Persist the structured jobs document and run the bootstrap loader.
    Document,
}

/// A fully assembled job, ready for dispatch. Write-once: compiled fresh for
/// every run and never mutated.
#[derive(Clone, Debug)]
pub struct CompiledJob {
    pub family: &'static str,
    pub name: &'static str,
    pub instance: JobValue,
    /// Non-fatal "unsupported option" notes from normalization.
    pub diagnostics: Vec<UnsupportedOption>,
}

impl CompiledJob {
    pub fn to_mfile(&self) -> String {
        script::mfile(self.family, self.name, &self.instance)
    }

    pub fn to_jobs_document(&self) -> JobValue {
        script::jobs_document(self.family, self.name, self.instance.clone())
    }

    pub fn script_name(&self) -> String {
        format!("spm_{}_job", self.name)
    }

    pub fn dispatch(
        &self,
        runner: &dyn ScriptRunner,
        cwd: &Path,
        mode: DispatchMode,
    ) -> SpmResult<RunOutput> {
        match mode {
            DispatchMode::Script => runner.run_script(&self.to_mfile(), cwd, &self.script_name()),
            DispatchMode::Document => {
                engine::run_jobs_document(runner, cwd, &self.to_jobs_document())
            }
        }
    }
}

/// Estimate-only vs estimate-and-apply keyword. An unset `write` counts as
/// true: reslicing is the default.
pub(crate) fn variant(
    options: &OptionSet,
    estimate: &'static str,
    estwrite: &'static str,
) -> &'static str {
    match options.get("write") {
        Some(OptionValue::Bool(false)) => estimate,
        _ => estwrite,
    }
}

/// Frame references for the `infile` option: a flat file list for a single
/// input, an ordered group of per-session lists for several.
pub(crate) fn scan_data(source: &dyn VolumeSource, options: &OptionSet) -> SpmResult<JobValue> {
    match options.get("infile") {
        Some(OptionValue::Str(p)) => Ok(session_value(frame_refs(source, Path::new(p))?)),
        Some(OptionValue::Strs(ps)) => Ok(sessions_value(frame_refs_many(source, ps)?)),
        Some(_) => Err(SpmError::validation(
            "infile must be a filename or a list of filenames",
        )),
        None => Err(SpmError::validation("infile is required")),
    }
}

/// The raw `infile` paths, for output-filename prediction.
pub(crate) fn input_files(options: &OptionSet) -> Vec<String> {
    match options.get("infile") {
        Some(OptionValue::Str(p)) => vec![p.clone()],
        Some(OptionValue::Strs(ps)) => ps.clone(),
        _ => Vec::new(),
    }
}

/// Predicted outputs: every input with the operation's prefix inserted.
pub(crate) fn predicted_outputs(options: &OptionSet, prefix: &str) -> Vec<PathBuf> {
    crate::paths::prefixed(&input_files(options), prefix)
}

pub(crate) fn require_str(options: &OptionSet, name: &str) -> SpmResult<String> {
    match options.get(name) {
        Some(OptionValue::Str(s)) => Ok(s.clone()),
        Some(_) => Err(SpmError::validation(format!("{name} must be a filename"))),
        None => Err(SpmError::validation(format!("{name} is required"))),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::AnyVolume;
    use super::*;

    #[test]
    fn write_flag_selects_the_structural_variant() {
        let mut opts = OptionSet::with_names(&["write"]);
        assert_eq!(variant(&opts, "estimate", "estwrite"), "estwrite");
        opts.set("write", true);
        assert_eq!(variant(&opts, "estimate", "estwrite"), "estwrite");
        opts.set("write", false);
        assert_eq!(variant(&opts, "estimate", "estwrite"), "estimate");
    }

    #[test]
    fn single_input_scans_flat_and_lists_scan_per_session() {
        let source = AnyVolume(vec![64, 64, 30, 2]);
        let mut opts = OptionSet::with_names(&["infile"]);

        opts.set("infile", "bold.nii");
        assert_eq!(
            scan_data(&source, &opts).unwrap(),
            JobValue::Files(vec!["bold.nii,1".to_string(), "bold.nii,2".to_string()])
        );

        opts.set(
            "infile",
            OptionValue::Strs(vec!["s1.nii".to_string(), "s2.nii".to_string()]),
        );
        let grouped = scan_data(&source, &opts).unwrap();
        assert!(matches!(grouped, JobValue::Items(ref v) if v.len() == 2));
    }

    #[test]
    fn missing_infile_is_a_validation_error() {
        let source = AnyVolume(vec![1, 1, 1]);
        let opts = OptionSet::with_names(&["infile"]);
        assert!(matches!(
            scan_data(&source, &opts),
            Err(SpmError::Validation(_))
        ));
    }

    #[test]
    fn dispatch_modes_choose_their_scripts() {
        let job = CompiledJob {
            family: "spatial",
            name: "smooth",
            instance: JobValue::Fields(vec![]),
            diagnostics: vec![],
        };
        let runner = super::testing::CaptureRunner::default();
        let dir = tempfile::tempdir().unwrap();

        job.dispatch(&runner, dir.path(), DispatchMode::Script).unwrap();
        job.dispatch(&runner, dir.path(), DispatchMode::Document).unwrap();

        let scripts = runner.scripts.borrow();
        assert_eq!(scripts[0].0, "spm_smooth_job");
        assert!(scripts[0].1.starts_with("% generated by spmbatch"));
        assert_eq!(scripts[1].0, "spm_jobs_boot");
        assert!(dir.path().join(script::JOBS_FILE).exists());
    }

    #[test]
    fn predicted_outputs_prefix_every_input() {
        let mut opts = OptionSet::with_names(&["infile"]);
        opts.set(
            "infile",
            OptionValue::Strs(vec!["a.nii".to_string(), "d/b.nii".to_string()]),
        );
        assert_eq!(
            predicted_outputs(&opts, "r"),
            vec![PathBuf::from("ra.nii"), PathBuf::from("d/rb.nii")]
        );
    }
}
