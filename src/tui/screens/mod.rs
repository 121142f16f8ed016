//! Screen rendering.

mod pipeline;

pub use pipeline::PipelineScreen;
