//! # Brigade collector
//!
//! Turns the state of a Brigade installation into Prometheus samples.
//!
//! Every scrape runs one cycle on the [`Orchestrator`]: the enabled
//! [`Subcollector`]s run concurrently, write their samples into a shared
//! [`SampleStream`] and are cut off once the collect timeout passes. Each cycle
//! ends with a duration and a success sample per subcollector.

#[macro_use]
extern crate tracing;

mod build;
mod collector;
mod exposition;
mod job;
mod orchestrator;
mod project;
mod sample;
mod sink;
#[cfg(test)]
mod testing;

pub use build::BuildCollector;
pub use collector::{
    Subcollector,
    SubcollectorKind,
};
pub use exposition::{
    encode_text,
    TEXT_CONTENT_TYPE,
};
pub use job::JobCollector;
pub use orchestrator::{
    CycleOutcome,
    ExporterConfig,
    Orchestrator,
    DEFAULT_COLLECT_TIMEOUT,
};
pub use project::ProjectCollector;
pub use sample::{
    fq_name,
    Desc,
    MetricError,
    Sample,
    NAMESPACE,
};
pub use sink::{
    SampleSender,
    SampleSink,
    SampleStream,
    SendError,
    WorkingWindow,
};
