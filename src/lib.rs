//! Typed SPM batch job compiler and dispatcher.
//!
//! The flow is one-directional: an [`OptionSet`] is normalized against a
//! per-operation schema, assembled into a [`JobValue`] tree, serialized to a
//! MATLAB m-file (or a structured jobs document), and handed to the engine
//! through a [`ScriptRunner`]. Runs are synchronous and blocking; callers
//! wanting parallel runs use separate working directories.
#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod frames;
pub mod ops;
pub mod options;
pub mod paths;
pub mod schema;
pub mod script;
pub mod value;
pub mod volume;

pub use engine::{EngineConfig, MatlabRunner, Outcome, RunOutput, ScriptRunner};
pub use error::{SpmError, SpmResult};
pub use frames::FrameRef;
pub use ops::{
    CompiledJob, DispatchMode, coreg::Coregister, normalise::Normalise, realign::Realign,
    smooth::Smooth,
};
pub use options::{OptionSet, OptionValue};
pub use schema::{NormalizedOptions, OperationSchema, OptionRule, UnsupportedOption};
pub use value::JobValue;
pub use volume::{NiftiHeaderSource, VolumeSource};
