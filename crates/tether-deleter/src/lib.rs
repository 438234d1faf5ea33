//! Deferred, batched soft deletion.
//!
//! Delete calls hand their requests to per-call channels. The requests are
//! merged into one stream, buffered, and committed to a [`Tombstoner`] in
//! batches: on reaching a size threshold, on a timer, or when the stream
//! ends.
//!
//! [`Tombstoner`]: tether_core::Tombstoner

pub mod config;
pub mod coordinator;
mod fan_in;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use config::PipelineConfig;
pub use coordinator::{CommitErrorPolicy, FlushReason};
pub use fan_in::intake;
pub use pipeline::{process, DeletionPipeline, ShutdownMode};
