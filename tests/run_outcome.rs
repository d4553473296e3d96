#![cfg(unix)]

use std::path::{Path, PathBuf};

use spmbatch::{
    DispatchMode, EngineConfig, MatlabRunner, Smooth, SpmResult, VolumeSource, script,
};

struct ThreeD;

impl VolumeSource for ThreeD {
    fn shape(&self, _path: &Path) -> SpmResult<Vec<u64>> {
        Ok(vec![64, 64, 30])
    }
}

/// `cat` stands in for the engine: it echoes the script it is fed and exits
/// cleanly, which exercises the whole dispatch path without MATLAB.
fn cat_runner() -> MatlabRunner {
    MatlabRunner::new(EngineConfig {
        matlab_cmd: "cat".to_string(),
        startup_args: vec![],
        engine_root: None,
    })
    .unwrap()
}

#[test]
fn script_mode_run_captures_output_and_predicts_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut op = Smooth::new();
    op.options.set("infile", "sub/bold.nii");
    op.options.set("fwhm", vec![8.0f64, 8.0, 8.0]);

    let outcome = op
        .run(&ThreeD, &cat_runner(), dir.path(), DispatchMode::Script)
        .unwrap();

    assert_eq!(outcome.exit_code, 0);
    assert!(outcome.stdout.contains("jobs{1}.spatial{1}.smooth{1}.data"));
    assert!(outcome.stdout.ends_with("spm_jobman('run',jobs);"));
    assert_eq!(outcome.outputs, vec![PathBuf::from("sub/sbold.nii")]);

    // The artifact survives in the working directory.
    assert!(dir.path().join("spm_smooth_job.m").exists());
}

#[test]
fn document_mode_run_persists_the_jobs_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut op = Smooth::new();
    op.options.set("infile", "bold.nii");

    let outcome = op
        .run(&ThreeD, &cat_runner(), dir.path(), DispatchMode::Document)
        .unwrap();

    // The engine saw the bootstrap loader, not the job itself.
    assert_eq!(outcome.stdout, script::bootstrap_script());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(script::JOBS_FILE)).unwrap())
            .unwrap();
    let instance = &json["jobs"][0]["spatial"][0]["smooth"][0];
    assert_eq!(instance["dtype"].as_i64(), Some(0));
    assert_eq!(instance["data"][0].as_str(), Some("bold.nii,1"));
}

#[test]
fn failing_engine_surfaces_as_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut op = Smooth::new();
    op.options.set("infile", "bold.nii");

    let runner = MatlabRunner::new(EngineConfig {
        matlab_cmd: "false".to_string(),
        startup_args: vec![],
        engine_root: None,
    })
    .unwrap();

    let err = op
        .run(&ThreeD, &runner, dir.path(), DispatchMode::Script)
        .unwrap_err();
    assert!(matches!(err, spmbatch::SpmError::Dispatch(_)));
}
