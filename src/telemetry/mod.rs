//! Heart-rate telemetry.
//!
//! Samples are decoded from heart-rate measurement notifications, stored in
//! a [`SampleBuffer`] and checked against the running mean by the
//! [`TelemetryEngine`].

mod buffer;
mod engine;

pub use buffer::*;
pub use engine::*;
