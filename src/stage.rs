use crate::buffer::RingBuffer;
use crate::cancel::CancelListener;
use crate::metrics::StageMetrics;
use crossbeam::channel::{Receiver, Sender};
use crossbeam::select;
use tracing::{debug, trace, warn};

/// What a stage did with one input value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutput {
    /// Hand this value to the next stage
    Forward(i64),
    /// The value was rejected and goes nowhere
    Filtered,
    /// The value was consumed by the stage itself (terminal stages)
    Stored,
}

/// Trait for a processing stage in the pipeline
pub trait Stage: Send + 'static {
    /// Process a single input value
    fn process(&mut self, value: i64) -> StageOutput;

    /// Get a human-readable name for this stage
    fn name(&self) -> &str {
        "stage"
    }
}

/// Why a stage loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExit {
    /// The cancellation signal was observed
    Cancelled,
    /// Every upstream sender is gone
    InputClosed,
    /// The downstream stage is gone
    OutputClosed,
}

/// Runs a stage by receiving from its input channel, processing, and
/// handing results to its output channel until cancelled
pub struct StageRunner {
    input: Receiver<i64>,
    output: Option<Sender<i64>>,
    cancel: CancelListener,
    metrics: StageMetrics,
}

impl StageRunner {
    /// Create a runner for an intermediate stage
    pub fn new(input: Receiver<i64>, output: Sender<i64>, cancel: CancelListener) -> Self {
        Self {
            input,
            output: Some(output),
            cancel,
            metrics: StageMetrics::new(),
        }
    }

    /// Create a runner for a terminal stage with no downstream
    pub fn terminal(input: Receiver<i64>, cancel: CancelListener) -> Self {
        Self {
            input,
            output: None,
            cancel,
            metrics: StageMetrics::new(),
        }
    }

    /// Report into an existing metrics collector instead of a private one
    pub fn with_metrics(mut self, metrics: StageMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get a reference to the metrics
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Run the stage.
    /// This method blocks until cancellation is observed or a neighbour disconnects.
    pub fn run(&mut self, mut stage: Box<dyn Stage>) -> StageExit {
        debug!(stage = stage.name(), "stage started");
        let exit = self.run_loop(stage.as_mut());
        debug!(stage = stage.name(), ?exit, "stage stopped");
        exit
    }

    fn run_loop(&mut self, stage: &mut dyn Stage) -> StageExit {
        loop {
            if self.cancel.is_cancelled() {
                return StageExit::Cancelled;
            }

            let value = select! {
                recv(self.cancel.channel()) -> _ => return StageExit::Cancelled,
                recv(self.input) -> msg => match msg {
                    Ok(value) => value,
                    Err(_) => return StageExit::InputClosed,
                },
            };
            self.metrics.record_received();

            match stage.process(value) {
                StageOutput::Forward(out) => {
                    let Some(output) = &self.output else {
                        warn!(
                            stage = stage.name(),
                            value = out,
                            "terminal stage forwarded a value"
                        );
                        self.metrics.record_dropped();
                        continue;
                    };
                    select! {
                        send(output, out) -> res => match res {
                            Ok(()) => self.metrics.record_forwarded(),
                            Err(_) => return StageExit::OutputClosed,
                        },
                        recv(self.cancel.channel()) -> _ => return StageExit::Cancelled,
                    }
                }
                StageOutput::Filtered => {
                    trace!(stage = stage.name(), value, "value filtered");
                    self.metrics.record_dropped();
                }
                StageOutput::Stored => self.metrics.record_forwarded(),
            }
        }
    }
}

/// Keeps values that are zero or positive
pub fn is_non_negative(value: i64) -> bool {
    value >= 0
}

/// Keeps multiples of three, except zero
pub fn is_nonzero_multiple_of_three(value: i64) -> bool {
    value != 0 && value % 3 == 0
}

/// A filtering stage that passes through values matching a predicate
#[derive(Debug)]
pub struct FilterStage<F>
where
    F: Fn(i64) -> bool + Send + 'static,
{
    name: String,
    predicate: F,
}

impl<F> FilterStage<F>
where
    F: Fn(i64) -> bool + Send + 'static,
{
    /// Create a new filter stage
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl FilterStage<fn(i64) -> bool> {
    /// Filter that drops negative values
    pub fn non_negative() -> Self {
        Self::new("non_negative", is_non_negative)
    }

    /// Filter that drops zero and values not divisible by three
    pub fn multiple_of_three() -> Self {
        Self::new("multiple_of_three", is_nonzero_multiple_of_three)
    }
}

impl<F> Stage for FilterStage<F>
where
    F: Fn(i64) -> bool + Send + 'static,
{
    fn process(&mut self, value: i64) -> StageOutput {
        if (self.predicate)(value) {
            StageOutput::Forward(value)
        } else {
            StageOutput::Filtered
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Terminal stage that stores every value in a ring buffer
#[derive(Debug, Clone)]
pub struct BufferingStage {
    buffer: RingBuffer<i64>,
}

impl BufferingStage {
    pub fn new(buffer: RingBuffer<i64>) -> Self {
        Self { buffer }
    }
}

impl Stage for BufferingStage {
    fn process(&mut self, value: i64) -> StageOutput {
        if let Some(evicted) = self.buffer.push(value) {
            trace!(evicted, value, "buffer full, evicted oldest value");
        }
        StageOutput::Stored
    }

    fn name(&self) -> &str {
        "buffering"
    }
}
