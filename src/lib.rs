//! A staged integer pipeline that filters a live stream of values, keeps
//! the survivors in a bounded eviction buffer, and flushes that buffer to
//! an observer on a fixed interval.
//!
//! # Architecture
//!
//! - One OS thread per stage, linked by zero-capacity crossbeam channels
//!   (each hand-off blocks until the next stage is ready)
//! - Non-negative filter, then nonzero-multiple-of-three filter, then a
//!   buffering stage writing into a mutex-guarded [`RingBuffer`]
//! - A flusher thread that drains the buffer on every tick and hands
//!   non-empty snapshots to a [`FlushObserver`]
//! - A broadcast-once [`CancellationSignal`] observed by every worker
//!
//! # Example
//!
//! ```no_run
//! use ring_pipeline::PipelineBuilder;
//! use std::time::Duration;
//!
//! let running = PipelineBuilder::new()
//!     .buffer_capacity(5)
//!     .flush_interval(Duration::from_secs(10))
//!     .build()?
//!     .start(|batch: &[i64]| println!("result data: {batch:?}"))?;
//!
//! for value in [3, -3, 6, 9, 12, 15] {
//!     running.submit(value)?;
//! }
//!
//! running.wait()?;
//! # Ok::<(), ring_pipeline::PipelineError>(())
//! ```

pub mod buffer;
pub mod cancel;
pub mod console;
pub mod error;
pub mod flusher;
pub mod metrics;
pub mod pipeline;
pub mod stage;

// Re-exports for convenience
pub use buffer::RingBuffer;
pub use cancel::{CancelListener, CancellationSignal};
pub use error::{PipelineError, Result};
pub use flusher::{FlushObserver, PeriodicFlusher};
pub use metrics::{FlusherMetrics, MetricsSnapshot, StageMetrics};
pub use pipeline::{
    Pipeline, PipelineBuilder, PipelineConfig, RunningPipeline, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_FLUSH_INTERVAL,
};
pub use stage::{
    is_non_negative, is_nonzero_multiple_of_three, BufferingStage, FilterStage, Stage,
    StageExit, StageOutput, StageRunner,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
