// src/streaming/pipeline.rs
//
// Real-time monitoring pipeline: a capture thread pushes copied chunks
// into a bounded queue; a worker thread accumulates them into analysis
// windows, runs detection, and dispatches events. The two threads share
// only the queue, an atomic stop flag, and an overrun counter; all
// signal-processing state lives on the worker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{error, info, warn};

use super::device::{CaptureSource, CaptureSpec, ChunkSink};
use super::dispatch::{CallbackDispatcher, EventCallback};
use crate::config::MonitorConfig;
use crate::core::{Band, EventDetector, SpectralEvent};
use crate::error::{Error, Result};

/// How long the worker waits on the queue before re-checking the stop flag.
const POP_TIMEOUT: Duration = Duration::from_millis(250);
/// Bound on joining each pipeline thread at shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);
/// Bound on the capture source reporting its open outcome.
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Stopping,
}

/// Counts reported when a monitoring run stops.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorSummary {
    pub infrasound_events: usize,
    pub ultrasound_events: usize,
    pub total_events: usize,
    pub overruns: usize,
    pub callback_failures: usize,
}

/// Capture-side half of the bounded chunk queue.
///
/// Overflow policy is drop-oldest with a recorded overrun: the hardware
/// callback must never block, so when the queue is full the oldest chunk
/// is popped to make room for the newest one.
pub(crate) struct ChunkQueue {
    tx: Sender<Vec<f64>>,
    drain: Receiver<Vec<f64>>,
    overruns: Arc<AtomicUsize>,
}

impl ChunkQueue {
    pub(crate) fn new(capacity: usize, overruns: Arc<AtomicUsize>) -> (Self, Receiver<Vec<f64>>) {
        let (tx, rx) = bounded(capacity);
        let queue = Self {
            tx,
            drain: rx.clone(),
            overruns,
        };
        (queue, rx)
    }

    pub(crate) fn push(&self, chunk: Vec<f64>) {
        match self.tx.try_send(chunk) {
            Ok(()) => {}
            Err(TrySendError::Full(chunk)) => {
                let _ = self.drain.try_recv();
                self.overruns.fetch_add(1, Ordering::Relaxed);
                warn!("capture queue full, dropped oldest chunk");
                let _ = self.tx.try_send(chunk);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

struct WorkerOutcome {
    events: Vec<SpectralEvent>,
    callback_failures: usize,
    callbacks: Vec<EventCallback>,
}

/// Real-time monitoring pipeline with an `Idle -> Running -> Stopping ->
/// Idle` lifecycle. Owns the emitted-event list (grows monotonically,
/// cleared only via `clear_events`) and the registered callbacks.
pub struct MonitorPipeline {
    config: MonitorConfig,
    state: PipelineState,
    callbacks: Vec<EventCallback>,
    events: Vec<SpectralEvent>,
    stop: Arc<AtomicBool>,
    overruns: Arc<AtomicUsize>,
    capture_handle: Option<JoinHandle<()>>,
    worker_handle: Option<JoinHandle<WorkerOutcome>>,
    timer_handle: Option<JoinHandle<()>>,
    last_callback_failures: usize,
}

impl MonitorPipeline {
    /// Validate the configuration and create an idle pipeline.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: PipelineState::Idle,
            callbacks: Vec::new(),
            events: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
            overruns: Arc::new(AtomicUsize::new(0)),
            capture_handle: None,
            worker_handle: None,
            timer_handle: None,
            last_callback_failures: 0,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Register a consumer callback. Callbacks registered while a run is
    /// active take effect at the next `start`.
    pub fn register_callback(&mut self, callback: EventCallback) {
        self.callbacks.push(callback);
    }

    /// Events emitted so far, across runs, until cleared explicitly.
    pub fn detected_events(&self) -> &[SpectralEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
        info!("cleared detected events");
    }

    /// Overruns recorded by the current or most recent run.
    pub fn overruns(&self) -> usize {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Start capturing from `source`. Fails with `Error::Device` (state
    /// stays `Idle`) if the device cannot be opened. An optional
    /// `duration` schedules an automatic stop; a caller-initiated `stop`
    /// preempts it. Starting while already running is a warned no-op.
    pub fn start(
        &mut self,
        mut source: Box<dyn CaptureSource>,
        duration: Option<Duration>,
    ) -> Result<()> {
        if self.state != PipelineState::Idle {
            warn!("monitoring already active, ignoring start");
            return Ok(());
        }

        self.stop.store(false, Ordering::SeqCst);
        self.overruns.store(0, Ordering::Relaxed);

        let (queue, rx) = ChunkQueue::new(self.config.queue_capacity, self.overruns.clone());
        let sink: ChunkSink = Box::new(move |chunk| queue.push(chunk));

        let spec = CaptureSpec {
            sample_rate: self.config.detection.sample_rate,
            channels: self.config.channels,
            chunk_size: self.config.chunk_size,
        };

        // The capture thread owns the device; it reports its open outcome
        // over this handshake so a device failure surfaces here, with the
        // pipeline still idle.
        let (ready_tx, ready_rx) = bounded(1);
        let stop = self.stop.clone();
        let capture_handle = thread::Builder::new()
            .name("capture".into())
            .spawn(move || source.capture(&spec, sink, stop, ready_tx))
            .map_err(|e| Error::Device(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = capture_handle.join();
                return Err(e);
            }
            Err(_) => {
                self.stop.store(true, Ordering::SeqCst);
                let _ = capture_handle.join();
                return Err(Error::Device("capture source never reported ready".into()));
            }
        }
        self.capture_handle = Some(capture_handle);

        let detection = self.config.detection.clone();
        let window_len = self.config.window_len();
        let stop = self.stop.clone();
        let callbacks = std::mem::take(&mut self.callbacks);
        let worker_handle = thread::Builder::new()
            .name("detect-worker".into())
            .spawn(move || worker_loop(rx, detection, window_len, callbacks, stop))
            .map_err(|e| Error::Device(format!("failed to spawn worker thread: {e}")))?;
        self.worker_handle = Some(worker_handle);

        if let Some(duration) = duration {
            let stop = self.stop.clone();
            let timer_handle = thread::Builder::new()
                .name("stop-timer".into())
                .spawn(move || {
                    let deadline = Instant::now() + duration;
                    while Instant::now() < deadline {
                        if stop.load(Ordering::SeqCst) {
                            return;
                        }
                        thread::sleep(Duration::from_millis(10));
                    }
                    info!("scheduled duration elapsed, stopping capture");
                    stop.store(true, Ordering::SeqCst);
                })
                .map_err(|e| Error::Device(format!("failed to spawn timer thread: {e}")))?;
            self.timer_handle = Some(timer_handle);
        }

        info!(
            "monitoring started: {} Hz, window {} samples, queue capacity {}",
            self.config.detection.sample_rate, window_len, self.config.queue_capacity
        );
        self.state = PipelineState::Running;
        Ok(())
    }

    /// Signal both threads to exit, join them within a bound, and return
    /// the per-band summary. A no-op when already idle.
    pub fn stop(&mut self) -> Result<MonitorSummary> {
        if self.state == PipelineState::Idle {
            return Ok(self.summary());
        }

        self.state = PipelineState::Stopping;
        self.stop.store(true, Ordering::SeqCst);

        let mut join_error = None;

        if let Some(handle) = self.worker_handle.take() {
            match join_with_timeout(handle, JOIN_TIMEOUT, "worker") {
                Ok(Some(outcome)) => {
                    self.events.extend(outcome.events);
                    self.last_callback_failures = outcome.callback_failures;
                    self.callbacks = outcome.callbacks;
                }
                Ok(None) => error!("worker thread panicked, its events are lost"),
                Err(e) => join_error = Some(e),
            }
        }

        if let Some(handle) = self.capture_handle.take() {
            match join_with_timeout(handle, JOIN_TIMEOUT, "capture") {
                Ok(_) => {}
                Err(e) => join_error = join_error.or(Some(e)),
            }
        }

        if let Some(handle) = self.timer_handle.take() {
            let _ = handle.join();
        }

        // Resources are best-effort released even when a join timed out
        self.state = PipelineState::Idle;

        if let Some(e) = join_error {
            return Err(e);
        }

        let summary = self.summary();
        info!(
            "monitoring stopped: {} event(s) ({} infrasound, {} ultrasound), {} overrun(s)",
            summary.total_events,
            summary.infrasound_events,
            summary.ultrasound_events,
            summary.overruns
        );
        Ok(summary)
    }

    /// Start, monitor for `duration`, stop. Blocking convenience wrapper.
    pub fn run_for(
        &mut self,
        source: Box<dyn CaptureSource>,
        duration: Duration,
    ) -> Result<MonitorSummary> {
        self.start(source, Some(duration))?;
        thread::sleep(duration);
        self.stop()
    }

    fn summary(&self) -> MonitorSummary {
        let infrasound = self
            .events
            .iter()
            .filter(|e| e.band == Band::Infrasound)
            .count();
        MonitorSummary {
            infrasound_events: infrasound,
            ultrasound_events: self.events.len() - infrasound,
            total_events: self.events.len(),
            overruns: self.overruns(),
            callback_failures: self.last_callback_failures,
        }
    }
}

impl Drop for MonitorPipeline {
    fn drop(&mut self) {
        if self.state != PipelineState::Idle {
            let _ = self.stop();
        }
    }
}

/// Worker loop: accumulate chunks into non-overlapping analysis windows,
/// detect, timestamp, dispatch. Detection runs to completion on a private
/// window before any state is touched, so a concurrent stop simply takes
/// effect at the next loop iteration.
fn worker_loop(
    rx: Receiver<Vec<f64>>,
    detection: crate::config::DetectionConfig,
    window_len: usize,
    callbacks: Vec<EventCallback>,
    stop: Arc<AtomicBool>,
) -> WorkerOutcome {
    let mut dispatcher = CallbackDispatcher::new(callbacks);
    let mut events: Vec<SpectralEvent> = Vec::new();

    // The config was validated when the pipeline was built
    let mut detector = match EventDetector::new(detection) {
        Ok(d) => d,
        Err(e) => {
            error!("worker could not build detector: {e}");
            return WorkerOutcome {
                events,
                callback_failures: 0,
                callbacks: dispatcher.into_callbacks(),
            };
        }
    };

    let mut accumulated: Vec<f64> = Vec::with_capacity(window_len * 2);

    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        match rx.recv_timeout(POP_TIMEOUT) {
            Ok(chunk) => {
                accumulated.extend_from_slice(&chunk);
                while accumulated.len() >= window_len {
                    let window: Vec<f64> = accumulated.drain(..window_len).collect();
                    for mut event in detector.detect(&window, "live") {
                        event.timestamp = Some(Utc::now());
                        dispatcher.dispatch(&event);
                        events.push(event);
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let callback_failures = dispatcher.failures();
    WorkerOutcome {
        events,
        callback_failures,
        callbacks: dispatcher.into_callbacks(),
    }
}

/// Join a thread within `timeout`. `Ok(None)` means the thread panicked;
/// exceeding the bound means the thread is unresponsive and is reported
/// as a shutdown timeout rather than silently ignored.
fn join_with_timeout<T>(
    handle: JoinHandle<T>,
    timeout: Duration,
    thread: &'static str,
) -> Result<Option<T>> {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return Err(Error::ShutdownTimeout { thread, timeout });
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    match handle.join() {
        Ok(value) => Ok(Some(value)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_drops_oldest_and_counts_overruns() {
        let overruns = Arc::new(AtomicUsize::new(0));
        let capacity = 8;
        let (queue, rx) = ChunkQueue::new(capacity, overruns.clone());

        for i in 0..(capacity + 5) {
            queue.push(vec![i as f64]);
        }

        assert_eq!(overruns.load(Ordering::Relaxed), 5);

        // The newest `capacity` chunks survive, in order
        let retained: Vec<f64> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|chunk| chunk[0])
            .collect();
        let expected: Vec<f64> = (5..capacity + 5).map(|i| i as f64).collect();
        assert_eq!(retained, expected);
    }

    #[test]
    fn push_into_queue_with_room_records_nothing() {
        let overruns = Arc::new(AtomicUsize::new(0));
        let (queue, rx) = ChunkQueue::new(4, overruns.clone());
        queue.push(vec![1.0]);
        queue.push(vec![2.0]);
        assert_eq!(overruns.load(Ordering::Relaxed), 0);
        assert_eq!(rx.len(), 2);
    }

    #[test]
    fn stop_when_idle_is_a_noop() {
        let mut pipeline = MonitorPipeline::new(MonitorConfig::default()).unwrap();
        let summary = pipeline.stop().unwrap();
        assert_eq!(summary.total_events, 0);
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn invalid_monitor_config_rejected() {
        let mut config = MonitorConfig::default();
        config.queue_capacity = 0;
        assert!(MonitorPipeline::new(config).is_err());
    }
}
