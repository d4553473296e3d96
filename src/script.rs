//! Job script generation.
//!
//! The engine consumes jobs in two forms: an m-file of `prefix = value;`
//! assignments built up recursively from a [`JobValue`] tree, or a structured
//! jobs document loaded by a short bootstrap script. Both address the job as
//! `jobs{1}.<family>{1}.<name>{1}`.

use crate::value::JobValue;

/// Fixed filename for the structured jobs document (written into the run's
/// working directory).
pub const JOBS_FILE: &str = "spm_jobs.json";

/// Serialize a job node into engine assignment syntax under `prefix`.
///
/// Deterministic and purely structural: ordered groups index from 1, keyed
/// groups emit in insertion order, file lists become brace-delimited cell
/// arrays, scalars use their default textual form.
pub fn serialize(prefix: &str, value: &JobValue) -> String {
    let mut out = String::new();
    write_value(&mut out, prefix, value);
    out
}

fn write_value(out: &mut String, prefix: &str, value: &JobValue) {
    match value {
        JobValue::Items(items) => {
            for (i, item) in items.iter().enumerate() {
                write_value(out, &format!("{prefix}({})", i + 1), item);
            }
        }
        JobValue::Fields(entries) => {
            for (key, item) in entries {
                write_value(out, &format!("{prefix}.{key}"), item);
            }
        }
        JobValue::Files(files) => {
            out.push_str(&format!("{prefix} = {{...\n"));
            for f in files {
                out.push_str(&format!("'{f}';...\n"));
            }
            out.push_str("};\n");
        }
        JobValue::Str(s) => out.push_str(&format!("{prefix} = '{s}';\n")),
        JobValue::Bool(b) => out.push_str(&format!("{prefix} = {b};\n")),
        JobValue::Int(i) => out.push_str(&format!("{prefix} = {i};\n")),
        JobValue::Float(f) => out.push_str(&format!("{prefix} = {f};\n")),
    }
}

/// Root assignment prefix for one job instance.
pub fn root_prefix(family: &str, name: &str) -> String {
    format!("jobs{{1}}.{family}{{1}}.{name}{{1}}")
}

/// Build the complete m-file for one job instance: defaults preamble, the
/// serialized assignments, and the job-runner trailer.
pub fn mfile(family: &str, name: &str, instance: &JobValue) -> String {
    let mut script = String::from("% generated by spmbatch\n");
    script.push_str("spm_defaults;\n\n");
    script.push_str(&serialize(&root_prefix(family, name), instance));
    script.push_str("spm_jobman('run',jobs);");
    script
}

/// Wrap one job instance in the engine's nested document shape:
/// `{"jobs": [{family: [{name: [instance]}]}]}`.
pub fn jobs_document(family: &str, name: &str, instance: JobValue) -> JobValue {
    let named = JobValue::Fields(vec![(name.to_string(), JobValue::Items(vec![instance]))]);
    let family_group = JobValue::Fields(vec![(family.to_string(), JobValue::Items(vec![named]))]);
    JobValue::Fields(vec![(
        "jobs".to_string(),
        JobValue::Items(vec![family_group]),
    )])
}

/// Two-line loader that reads [`JOBS_FILE`] and hands it to the job runner.
pub fn bootstrap_script() -> String {
    format!("jobs = jsondecode(fileread('{JOBS_FILE}'));\nspm_jobman('run', jobs.jobs);")
}
