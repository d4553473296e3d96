//! Engine configuration and dispatch.
//!
//! All engine state lives in an explicit [`EngineConfig`], constructed once
//! at startup and passed by reference. Dispatch is synchronous and blocking;
//! the engine process may run for minutes and no timeout is imposed. Job
//! artifacts (`<script_name>.m`, the jobs document) land in the run's
//! working directory, so concurrent runs need separate directories.

use std::{
    io::Write as _,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    error::{SpmError, SpmResult},
    script::{self, JOBS_FILE},
    value::JobValue,
};

/// Filename the root-discovery probe writes into its working directory.
const ROOT_MARKER: &str = "spm_root.txt";

/// Process-wide engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Interpreter executable.
    pub matlab_cmd: String,
    /// Interpreter arguments placed before the script.
    pub startup_args: Vec<String>,
    /// Engine install directory, when known.
    pub engine_root: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matlab_cmd: "matlab".to_string(),
            startup_args: vec!["-nodesktop".to_string(), "-nosplash".to_string()],
            engine_root: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> SpmResult<()> {
        if self.matlab_cmd.trim().is_empty() {
            return Err(SpmError::validation("engine command must be non-empty"));
        }
        Ok(())
    }

    /// Ask the engine where it is installed and record the answer.
    ///
    /// Runs a short probe script that writes the engine root to a marker
    /// file in `cwd`. Intended to run once at startup.
    pub fn discover_root(&mut self, runner: &dyn ScriptRunner, cwd: &Path) -> SpmResult<&Path> {
        let probe = format!(
            "fid = fopen('{ROOT_MARKER}', 'wt');\nfprintf(fid, '%s', spm('dir'));\nfclose(fid);"
        );
        runner.run_script(&probe, cwd, "spm_root_probe")?;
        let root = std::fs::read_to_string(cwd.join(ROOT_MARKER))
            .with_context(|| "failed to read engine root marker")?;
        let root = root.trim();
        if root.is_empty() {
            return Err(SpmError::dispatch("engine did not report an install directory"));
        }
        self.engine_root = Some(PathBuf::from(root));
        Ok(self.engine_root.as_deref().unwrap_or_else(|| Path::new("")))
    }
}

/// Output captured from one engine invocation.
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// Resolved command line, for logs and error reports.
    pub command: String,
    pub exit_code: i32,
}

/// Seam to the interpreter process.
pub trait ScriptRunner {
    /// Persist `script` as `<script_name>.m` under `cwd`, run it to
    /// completion, and capture output. Launch failure and abnormal exit are
    /// both dispatch errors, never silent.
    fn run_script(&self, script: &str, cwd: &Path, script_name: &str) -> SpmResult<RunOutput>;
}

/// Runs scripts through a MATLAB process, blocking until it exits.
///
/// The script is fed on stdin so the session ends at EOF; the `.m` file in
/// the working directory is the persisted artifact of the run.
#[derive(Clone, Debug)]
pub struct MatlabRunner {
    cfg: EngineConfig,
}

impl MatlabRunner {
    pub fn new(cfg: EngineConfig) -> SpmResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }
}

impl ScriptRunner for MatlabRunner {
    fn run_script(&self, script: &str, cwd: &Path, script_name: &str) -> SpmResult<RunOutput> {
        let script_path = cwd.join(format!("{script_name}.m"));
        std::fs::write(&script_path, script)
            .with_context(|| format!("failed to write script '{}'", script_path.display()))?;

        let command = format!(
            "{} {}",
            self.cfg.matlab_cmd,
            self.cfg.startup_args.join(" ")
        );
        tracing::debug!(%command, cwd = %cwd.display(), "dispatching engine script");

        let mut child = Command::new(&self.cfg.matlab_cmd)
            .args(&self.cfg.startup_args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SpmError::dispatch(format!(
                    "failed to launch '{}' (is it installed and on PATH?): {e}",
                    self.cfg.matlab_cmd
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SpmError::dispatch("failed to open engine stdin (unexpected)"))?;
        stdin
            .write_all(script.as_bytes())
            .map_err(|e| SpmError::dispatch(format!("failed to feed script to engine: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .map_err(|e| SpmError::dispatch(format!("failed to wait for engine: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(SpmError::dispatch(format!(
                "engine exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(RunOutput {
            stdout,
            stderr,
            command,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Dispatch one job in structured-document mode: persist the jobs document
/// to [`JOBS_FILE`] in `cwd`, then run the two-line bootstrap loader.
pub fn run_jobs_document(
    runner: &dyn ScriptRunner,
    cwd: &Path,
    doc: &JobValue,
) -> SpmResult<RunOutput> {
    let json = serde_json::to_string_pretty(doc).map_err(|e| SpmError::serde(e.to_string()))?;
    let path = cwd.join(JOBS_FILE);
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write jobs document '{}'", path.display()))?;
    runner.run_script(&script::bootstrap_script(), cwd, "spm_jobs_boot")
}

/// Result of one dispatched run.
#[derive(Clone, Debug)]
pub struct Outcome {
    pub stdout: String,
    pub stderr: String,
    pub command: String,
    pub exit_code: i32,
    /// Output files the operation is expected to produce.
    pub outputs: Vec<PathBuf>,
}

impl Outcome {
    pub(crate) fn from_run(run: RunOutput, outputs: Vec<PathBuf>) -> Self {
        Self {
            stdout: run.stdout,
            stderr: run.stderr,
            command: run.command,
            exit_code: run.exit_code,
            outputs,
        }
    }
}
