use crate::buffer::RingBuffer;
use crate::cancel::{CancelListener, CancellationSignal};
use crate::error::{PipelineError, Result};
use crate::flusher::{FlushObserver, PeriodicFlusher};
use crate::metrics::{FlusherMetrics, StageMetrics};
use crate::stage::{BufferingStage, FilterStage, Stage, StageRunner};
use crossbeam::channel::{self, Sender, TrySendError};
use crossbeam::select;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Default number of values the buffer holds before evicting
pub const DEFAULT_BUFFER_CAPACITY: usize = 5;

/// Default time between buffer flushes
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

const STAGE_NAMES: [&str; 3] = ["non_negative", "multiple_of_three", "buffering"];

/// Fixed configuration of a pipeline, chosen at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub buffer_capacity: usize,
    pub flush_interval: Duration,
}

impl PipelineConfig {
    /// Check the configuration without building anything
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(PipelineError::InvalidCapacity(self.buffer_capacity));
        }
        if self.flush_interval.is_zero() {
            return Err(PipelineError::InvalidInterval(self.flush_interval));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// Builder for constructing pipelines
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how many values the buffer keeps before evicting the oldest
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Set the time between buffer flushes
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// Validate the configuration and allocate the shared buffer and signal
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;

        Ok(Pipeline {
            config: self.config,
            buffer: RingBuffer::new(self.config.buffer_capacity)?,
            cancel: CancellationSignal::new(),
            metrics: STAGE_NAMES.iter().map(|_| StageMetrics::new()).collect(),
            flusher_metrics: FlusherMetrics::new(),
        })
    }
}

/// A configured pipeline that has not been started yet
pub struct Pipeline {
    config: PipelineConfig,
    buffer: RingBuffer<i64>,
    cancel: CancellationSignal,
    metrics: Vec<StageMetrics>,
    flusher_metrics: FlusherMetrics,
}

impl Pipeline {
    /// Shorthand for [`PipelineBuilder::new`]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Wire the stages together and spawn one thread per stage plus the flusher.
    ///
    /// Chain: input -> non-negative filter -> multiple-of-three filter ->
    /// buffering stage -> ring buffer, drained by the flusher into `observer`.
    pub fn start<O>(self, observer: O) -> Result<RunningPipeline>
    where
        O: FlushObserver,
    {
        let (input, first_rx) = channel::bounded(0);
        let (first_tx, second_rx) = channel::bounded(0);
        let (second_tx, buffer_rx) = channel::bounded(0);

        let listener = self.cancel.listener();
        let buffer = self.buffer.clone();
        let mut running = RunningPipeline {
            input,
            listener: listener.clone(),
            cancel: self.cancel,
            buffer: self.buffer,
            metrics: self.metrics,
            flusher_metrics: self.flusher_metrics,
            handles: Vec::new(),
        };

        // Dropping `running` on a spawn error cancels the workers spawned so far
        running.spawn_stage(
            STAGE_NAMES[0],
            StageRunner::new(first_rx, first_tx, listener.clone()),
            Box::new(FilterStage::non_negative()),
        )?;
        running.spawn_stage(
            STAGE_NAMES[1],
            StageRunner::new(second_rx, second_tx, listener.clone()),
            Box::new(FilterStage::multiple_of_three()),
        )?;
        running.spawn_stage(
            STAGE_NAMES[2],
            StageRunner::terminal(buffer_rx, listener.clone()),
            Box::new(BufferingStage::new(buffer.clone())),
        )?;

        let mut flusher = PeriodicFlusher::new(
            buffer,
            self.config.flush_interval,
            Box::new(observer),
            listener,
        )
        .with_metrics(running.flusher_metrics.clone());
        let handle = spawn_worker("flusher", move || flusher.run())?;
        running.handles.push(("flusher".to_string(), handle));

        info!(
            buffer_capacity = self.config.buffer_capacity,
            flush_interval = ?self.config.flush_interval,
            "pipeline started"
        );
        Ok(running)
    }
}

fn spawn_worker<F>(name: &str, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(format!("pipeline-{name}"))
        .spawn(f)
        .map_err(|e| PipelineError::ThreadError(format!("failed to spawn {name}: {e}")))
}

/// A running pipeline: the entry point for values and the shutdown control.
///
/// Dropping it signals cancellation without waiting for the workers.
pub struct RunningPipeline {
    input: Sender<i64>,
    listener: CancelListener,
    cancel: CancellationSignal,
    buffer: RingBuffer<i64>,
    metrics: Vec<StageMetrics>,
    flusher_metrics: FlusherMetrics,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl RunningPipeline {
    fn spawn_stage(
        &mut self,
        name: &'static str,
        runner: StageRunner,
        stage: Box<dyn Stage>,
    ) -> Result<()> {
        let idx = self.handles.len();
        let mut runner = runner.with_metrics(self.metrics[idx].clone());
        let handle = spawn_worker(name, move || {
            runner.run(stage);
        })?;
        self.handles.push((name.to_string(), handle));
        Ok(())
    }

    /// Hand a value to the first stage, blocking until it is accepted.
    ///
    /// Fails with [`PipelineError::ShutDown`] once the pipeline is cancelled,
    /// including when cancellation arrives while the call is blocked.
    pub fn submit(&self, value: i64) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::ShutDown);
        }

        select! {
            send(self.input, value) -> res => res.map_err(|_| PipelineError::Disconnected),
            recv(self.listener.channel()) -> _ => Err(PipelineError::ShutDown),
        }
    }

    /// Hand a value to the first stage only if it is ready right now
    pub fn try_submit(&self, value: i64) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::ShutDown);
        }

        self.input.try_send(value).map_err(|e| match e {
            TrySendError::Full(_) => PipelineError::Full,
            TrySendError::Disconnected(_) => PipelineError::Disconnected,
        })
    }

    /// Hand a value to the first stage, giving up after `timeout`
    pub fn submit_timeout(&self, value: i64, timeout: Duration) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::ShutDown);
        }

        select! {
            send(self.input, value) -> res => res.map_err(|_| PipelineError::Disconnected),
            recv(self.listener.channel()) -> _ => Err(PipelineError::ShutDown),
            default(timeout) => Err(PipelineError::Timeout(timeout)),
        }
    }

    /// Signal every worker to stop. Does not wait for them.
    ///
    /// Returns `true` for the call that signaled; later calls are no-ops
    /// and return `false`.
    pub fn shutdown(&self) -> bool {
        let signaled = self.cancel.cancel();
        if signaled {
            info!("pipeline shutting down");
        }
        signaled
    }

    /// Check whether shutdown has been signaled
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Check whether every worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(|(_, handle)| handle.is_finished())
    }

    /// Get a clone of the cancellation signal, e.g. for a signal handler
    pub fn cancellation_signal(&self) -> CancellationSignal {
        self.cancel.clone()
    }

    /// Get a handle to the shared buffer
    pub fn buffer(&self) -> &RingBuffer<i64> {
        &self.buffer
    }

    /// Get metrics for a stage, in chain order
    pub fn stage_metrics(&self, index: usize) -> Option<&StageMetrics> {
        self.metrics.get(index)
    }

    pub fn flusher_metrics(&self) -> &FlusherMetrics {
        &self.flusher_metrics
    }

    /// Get a summary of all metrics
    pub fn metrics_summary(&self) -> String {
        let mut summary = String::from("Pipeline Metrics Summary:\n");
        for (name, metrics) in STAGE_NAMES.iter().zip(&self.metrics) {
            summary.push_str(&format!("  {}: {}\n", name, metrics.snapshot().format()));
        }
        summary.push_str(&format!("  flusher: {}\n", self.flusher_metrics.format()));
        summary.push_str(&format!(
            "  buffer: {} held, {} evicted\n",
            self.buffer.len(),
            self.buffer.evicted_count()
        ));
        summary
    }

    /// Signal shutdown and wait for every worker thread to exit
    pub fn wait(self) -> Result<()> {
        self.shutdown();
        self.join()
    }

    /// Wait for every worker thread to exit, without signaling shutdown.
    ///
    /// Blocks until cancellation is signaled through some clone of
    /// [`cancellation_signal`](Self::cancellation_signal).
    pub fn join(mut self) -> Result<()> {
        for (name, handle) in std::mem::take(&mut self.handles) {
            handle
                .join()
                .map_err(|_| PipelineError::ThreadError(format!("{name} panicked")))?;
            debug!(worker = %name, "worker joined");
        }
        Ok(())
    }
}

impl Drop for RunningPipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.buffer_capacity, 5);
        assert_eq!(config.flush_interval, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_builder() {
        let pipeline = PipelineBuilder::new()
            .buffer_capacity(3)
            .flush_interval(Duration::from_millis(50))
            .build()
            .unwrap();
        assert_eq!(pipeline.config().buffer_capacity, 3);
    }

    #[test]
    fn test_zero_capacity_error() {
        let result = PipelineBuilder::new().buffer_capacity(0).build();
        assert!(matches!(result, Err(PipelineError::InvalidCapacity(0))));
    }

    #[test]
    fn test_zero_interval_error() {
        let result = PipelineBuilder::new().flush_interval(Duration::ZERO).build();
        assert!(matches!(result, Err(PipelineError::InvalidInterval(_))));
    }

    /// A running pipeline with no workers, whose entry channel is never read
    fn unattended(input: Sender<i64>) -> RunningPipeline {
        let cancel = CancellationSignal::new();
        RunningPipeline {
            input,
            listener: cancel.listener(),
            cancel,
            buffer: RingBuffer::new(1).unwrap(),
            metrics: Vec::new(),
            flusher_metrics: FlusherMetrics::new(),
            handles: Vec::new(),
        }
    }

    #[test]
    fn test_try_submit_full_without_ready_receiver() {
        let (input, _rx) = channel::bounded(0);
        let running = unattended(input);
        assert!(matches!(running.try_submit(3), Err(PipelineError::Full)));
    }

    #[test]
    fn test_try_submit_accepted_by_waiting_receiver() {
        let (input, rx) = channel::bounded(0);
        let running = unattended(input);
        let receiver = thread::spawn(move || rx.recv_timeout(Duration::from_secs(5)));

        // The receiver thread may not be parked yet
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut result = running.try_submit(6);
        while matches!(result, Err(PipelineError::Full)) && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
            result = running.try_submit(6);
        }

        assert!(result.is_ok());
        assert_eq!(receiver.join().unwrap().unwrap(), 6);
    }

    #[test]
    fn test_submit_timeout_expires() {
        let (input, _rx) = channel::bounded(0);
        let running = unattended(input);
        let timeout = Duration::from_millis(20);
        assert!(matches!(
            running.submit_timeout(3, timeout),
            Err(PipelineError::Timeout(t)) if t == timeout
        ));
    }

    #[test]
    fn test_submit_disconnected_when_first_stage_gone() {
        let (input, rx) = channel::bounded(0);
        drop(rx);
        let running = unattended(input);
        assert!(matches!(running.submit(3), Err(PipelineError::Disconnected)));
        assert!(matches!(running.try_submit(3), Err(PipelineError::Disconnected)));
    }

    #[test]
    fn test_join_after_external_cancel() {
        let running = Pipeline::builder().build().unwrap().start(|_: &[i64]| {}).unwrap();
        running.cancellation_signal().cancel();
        assert!(running.is_shut_down());
        running.join().unwrap();
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let running = Pipeline::builder().build().unwrap().start(|_: &[i64]| {}).unwrap();
        assert!(running.shutdown());
        assert!(matches!(running.submit(3), Err(PipelineError::ShutDown)));
        assert!(matches!(running.try_submit(3), Err(PipelineError::ShutDown)));
        assert!(matches!(
            running.submit_timeout(3, Duration::from_millis(10)),
            Err(PipelineError::ShutDown)
        ));
        running.wait().unwrap();
    }
}
