use crate::buffer::RingBuffer;
use crate::cancel::CancelListener;
use crate::metrics::FlusherMetrics;
use crossbeam::channel;
use crossbeam::select;
use std::time::Duration;
use tracing::{debug, trace};

/// Receives every non-empty snapshot drained from the buffer
pub trait FlushObserver: Send + 'static {
    fn on_flush(&mut self, batch: &[i64]);
}

impl<F> FlushObserver for F
where
    F: FnMut(&[i64]) + Send + 'static,
{
    fn on_flush(&mut self, batch: &[i64]) {
        (self)(batch)
    }
}

/// Timer-driven task that drains the buffer and hands snapshots to an observer.
///
/// Runs until cancelled. Values still buffered at cancellation are not flushed.
pub struct PeriodicFlusher {
    buffer: RingBuffer<i64>,
    interval: Duration,
    observer: Box<dyn FlushObserver>,
    cancel: CancelListener,
    metrics: FlusherMetrics,
}

impl PeriodicFlusher {
    pub fn new(
        buffer: RingBuffer<i64>,
        interval: Duration,
        observer: Box<dyn FlushObserver>,
        cancel: CancelListener,
    ) -> Self {
        Self {
            buffer,
            interval,
            observer,
            cancel,
            metrics: FlusherMetrics::new(),
        }
    }

    /// Report into an existing metrics collector instead of a private one
    pub fn with_metrics(mut self, metrics: FlusherMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &FlusherMetrics {
        &self.metrics
    }

    /// Run the flush loop, blocking until cancellation is observed
    pub fn run(&mut self) {
        debug!(interval = ?self.interval, "flusher started");
        let ticker = channel::tick(self.interval);

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            select! {
                recv(self.cancel.channel()) -> _ => break,
                recv(ticker) -> _ => {}
            }
            self.flush();
        }

        debug!(left_in_buffer = self.buffer.len(), "flusher stopped");
    }

    fn flush(&mut self) {
        self.metrics.record_tick();
        let snapshot = self.buffer.drain();
        if snapshot.is_empty() {
            trace!("nothing to flush");
            return;
        }

        debug!(values = snapshot.len(), "flushing buffer");
        self.metrics.record_flush(snapshot.len());
        self.observer.on_flush(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationSignal;
    use std::thread;

    fn spawn_flusher(
        buffer: RingBuffer<i64>,
        interval: Duration,
        signal: &CancellationSignal,
    ) -> (
        thread::JoinHandle<()>,
        channel::Receiver<Vec<i64>>,
        FlusherMetrics,
    ) {
        let (tx, rx) = channel::unbounded();
        let observer = move |batch: &[i64]| {
            let _ = tx.send(batch.to_vec());
        };
        let mut flusher =
            PeriodicFlusher::new(buffer, interval, Box::new(observer), signal.listener());
        let metrics = flusher.metrics().clone();
        (thread::spawn(move || flusher.run()), rx, metrics)
    }

    #[test]
    fn test_flushes_buffered_values() {
        let signal = CancellationSignal::new();
        let buffer = RingBuffer::new(5).unwrap();
        for v in [3, 6, 9] {
            buffer.push(v);
        }

        let (handle, rx, metrics) =
            spawn_flusher(buffer.clone(), Duration::from_millis(20), &signal);
        let batch = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(batch, vec![3, 6, 9]);
        assert!(buffer.is_empty());

        signal.cancel();
        handle.join().unwrap();
        assert_eq!(metrics.total_flushes(), 1);
        assert_eq!(metrics.total_values_flushed(), 3);
    }

    #[test]
    fn test_no_flush_when_empty() {
        let signal = CancellationSignal::new();
        let buffer = RingBuffer::new(5).unwrap();

        let (handle, rx, metrics) = spawn_flusher(buffer, Duration::from_millis(10), &signal);
        thread::sleep(Duration::from_millis(100));
        signal.cancel();
        handle.join().unwrap();

        assert!(rx.try_recv().is_err());
        assert!(metrics.total_ticks() > 0);
        assert_eq!(metrics.total_flushes(), 0);
    }

    #[test]
    fn test_no_final_flush_on_cancel() {
        let signal = CancellationSignal::new();
        let buffer = RingBuffer::new(5).unwrap();
        buffer.push(42);

        let (handle, rx, _metrics) =
            spawn_flusher(buffer.clone(), Duration::from_secs(3600), &signal);
        signal.cancel();
        handle.join().unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(buffer.drain(), vec![42]);
    }
}
