pub mod acquisition;
pub mod clock;
pub mod config;
mod error;
pub mod freshness;
pub mod parser;
mod processor;
pub mod resolver;
pub mod sanitize;
pub mod server;
pub mod tracing;
pub mod types;
pub mod yt;

pub use error::Error;
pub use processor::{builder::AudioPipelineBuilder, AudioPipeline};
pub use types::{
    AcquisitionAttempt, AttemptOutcome, Completion, LocalArtifact, MediaLocator, Published,
    RunResult, SkipReason, StrategyKind, VideoDescriptor,
};
