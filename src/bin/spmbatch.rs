use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use spmbatch::{
    CompiledJob, DispatchMode, EngineConfig, MatlabRunner, NiftiHeaderSource, OptionSet,
    ops::{coreg, normalise, realign, smooth},
    paths,
};

#[derive(Parser, Debug)]
#[command(name = "spmbatch", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Realign session frames within a modality.
    Realign(RealignArgs),
    /// Coregister a source image to a reference target.
    Coreg(CoregArgs),
    /// Warp a source image to a template.
    Normalise(NormaliseArgs),
    /// Smooth volumes with a 3-D Gaussian kernel.
    Smooth(SmoothArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Operation options as a JSON object.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Working directory for job artifacts.
    #[arg(long, default_value = ".")]
    cwd: PathBuf,

    /// Print the generated job instead of running it.
    #[arg(long)]
    emit: bool,

    /// Dispatch via the structured jobs document instead of an m-file.
    #[arg(long)]
    document: bool,

    /// Engine interpreter executable.
    #[arg(long, default_value = "matlab")]
    matlab: String,
}

#[derive(Args, Debug)]
struct RealignArgs {
    /// Input volume(s), one per session.
    #[arg(long = "in", required = true, num_args = 1..)]
    inputs: Vec<String>,

    /// Estimate motion only; do not reslice.
    #[arg(long)]
    estimate_only: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CoregArgs {
    /// Reference image to register to.
    #[arg(long)]
    target: String,

    /// Image registered to the reference.
    #[arg(long)]
    source: String,

    /// Other volume(s) carried along with the estimated transform.
    #[arg(long = "in", num_args = 1..)]
    inputs: Vec<String>,

    /// Estimate the transform only; do not reslice.
    #[arg(long)]
    estimate_only: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct NormaliseArgs {
    /// Template image to warp to.
    #[arg(long)]
    template: String,

    /// Image the warp is estimated from.
    #[arg(long)]
    source: String,

    /// Volume(s) resampled through the estimated warp.
    #[arg(long = "in", num_args = 1..)]
    inputs: Vec<String>,

    /// Estimate the warp only; do not write resampled images.
    #[arg(long)]
    estimate_only: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct SmoothArgs {
    /// Input volume(s).
    #[arg(long = "in", required = true, num_args = 1..)]
    inputs: Vec<String>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Realign(args) => cmd_realign(args),
        Command::Coreg(args) => cmd_coreg(args),
        Command::Normalise(args) => cmd_normalise(args),
        Command::Smooth(args) => cmd_smooth(args),
    }
}

fn cmd_realign(args: RealignArgs) -> anyhow::Result<()> {
    let mut op = spmbatch::Realign::new();
    load_opts(&mut op.options, args.common.opts.as_deref())?;
    set_inputs(&mut op.options, &args.inputs);
    if args.estimate_only {
        op.options.set("write", false);
    }
    let job = op.compile(&NiftiHeaderSource)?;
    finish(&job, &args.common, &args.inputs, realign::OUTPUT_PREFIX)
}

fn cmd_coreg(args: CoregArgs) -> anyhow::Result<()> {
    let mut op = spmbatch::Coregister::new();
    load_opts(&mut op.options, args.common.opts.as_deref())?;
    op.options.set("target", args.target.as_str());
    op.options.set("source", args.source.as_str());
    if !args.inputs.is_empty() {
        set_inputs(&mut op.options, &args.inputs);
    }
    if args.estimate_only {
        op.options.set("write", false);
    }
    let job = op.compile(&NiftiHeaderSource)?;
    finish(&job, &args.common, &args.inputs, coreg::OUTPUT_PREFIX)
}

fn cmd_normalise(args: NormaliseArgs) -> anyhow::Result<()> {
    let mut op = spmbatch::Normalise::new();
    load_opts(&mut op.options, args.common.opts.as_deref())?;
    op.options.set("template", args.template.as_str());
    op.options.set("source", args.source.as_str());
    if !args.inputs.is_empty() {
        set_inputs(&mut op.options, &args.inputs);
    }
    if args.estimate_only {
        op.options.set("write", false);
    }
    let job = op.compile(&NiftiHeaderSource)?;
    finish(&job, &args.common, &args.inputs, normalise::OUTPUT_PREFIX)
}

fn cmd_smooth(args: SmoothArgs) -> anyhow::Result<()> {
    let mut op = spmbatch::Smooth::new();
    load_opts(&mut op.options, args.common.opts.as_deref())?;
    set_inputs(&mut op.options, &args.inputs);
    let job = op.compile(&NiftiHeaderSource)?;
    finish(&job, &args.common, &args.inputs, smooth::OUTPUT_PREFIX)
}

fn load_opts(options: &mut OptionSet, path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file =
        File::open(path).with_context(|| format!("open options '{}'", path.display()))?;
    let json: serde_json::Value =
        serde_json::from_reader(BufReader::new(file)).with_context(|| "parse options JSON")?;
    let obj = json
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("options file must hold a JSON object"))?;
    options.set_from_json(obj)?;
    Ok(())
}

/// A single input stays a flat session; several inputs become one session
/// each.
fn set_inputs(options: &mut OptionSet, inputs: &[String]) {
    match inputs {
        [one] => options.set("infile", one.as_str()),
        many => options.set("infile", many.to_vec()),
    }
}

fn finish(
    job: &CompiledJob,
    common: &CommonArgs,
    inputs: &[String],
    output_prefix: &str,
) -> anyhow::Result<()> {
    for diag in &job.diagnostics {
        eprintln!("warning: {diag}");
    }

    if common.emit {
        if common.document {
            println!("{}", serde_json::to_string_pretty(&job.to_jobs_document())?);
        } else {
            println!("{}", job.to_mfile());
        }
        return Ok(());
    }

    let runner = MatlabRunner::new(EngineConfig {
        matlab_cmd: common.matlab.clone(),
        ..EngineConfig::default()
    })?;
    let mode = if common.document {
        DispatchMode::Document
    } else {
        DispatchMode::Script
    };
    let run = job.dispatch(&runner, &common.cwd, mode)?;

    if !run.stdout.is_empty() {
        print!("{}", run.stdout);
    }
    if !run.stderr.is_empty() {
        eprint!("{}", run.stderr);
    }
    for out in paths::prefixed(inputs, output_prefix) {
        println!("expected output: {}", out.display());
    }
    Ok(())
}
