//! Tick-driven frame loop: capture, detect, analyze, aggregate, notify.
//!
//! The scheduler is cooperative. Each tick does at most one of: resolve
//! the in-flight detection, or capture and submit a new frame. Frames are
//! handled strictly in arrival order and a frame is never analyzed twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::face_candidate::FaceCandidate;
use crate::detection::domain::face_detector::BackendKind;
use crate::detection::domain::multi_strategy_detector::MultiStrategyDetector;
use crate::eye_contact::domain::eye_contact_settings::EyeContactSettings;
use crate::shared::detected_face::{DetectedFace, FrameDetectionResult};
use crate::shared::frame::Frame;
use crate::shared::session_config::{ConfigError, ExecutorMode, SessionConfig};
use crate::statistics::domain::statistics_aggregator::{RollingStats, StatisticsAggregator};
use crate::video::domain::video_source::VideoSource;

use super::analyze_frame_use_case::AnalyzeFrameUseCase;
use super::detection_executor::{DetectionExecutor, DetectionPoll};
use super::infrastructure::inline_detection_executor::InlineDetectionExecutor;
use super::infrastructure::threaded_detection_executor::ThreadedDetectionExecutor;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::ticker::Ticker;

#[derive(Error, Debug)]
pub enum StartError {
    #[error("session is disabled")]
    Disabled,
    #[error("no video source available")]
    NoVideoSource,
    #[error("no face detection backend could be initialized")]
    NoDetectorBackend,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Output hooks. Each is optional; all run on the scheduling thread.
#[derive(Default)]
pub struct SessionCallbacks {
    /// Every analyzed frame that contains at least one face.
    pub on_faces_detected: Option<Box<dyn FnMut(Vec<DetectedFace>) + Send>>,
    /// Only when the aggregate eye-contact flag flips. Starts from `false`.
    pub on_eye_contact_change: Option<Box<dyn FnMut(bool) + Send>>,
    /// Every analyzed frame, with the frame it was computed from.
    pub on_frame_analyzed: Option<Box<dyn FnMut(&Frame, &FrameDetectionResult) + Send>>,
}

/// Shared session switches, safe to flip from any thread.
///
/// While disabled, ticks do nothing and any result that completes is
/// discarded. Cancelling ends [`FrameScheduler::run`].
#[derive(Clone, Debug)]
pub struct SessionHandle {
    enabled: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new(true)
    }
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Minimum interval since the last submission has not elapsed.
    Throttled,
    /// A detection is still in flight.
    Busy,
    /// Source not ready, no new frame, or capture failed.
    NotReady,
    /// A frame went to the executor and is still being detected.
    Submitted,
    /// A frame was analyzed and its result applied.
    Processed { frame_index: usize },
    /// A result arrived after a reset or disable and was dropped.
    Discarded,
    Disabled,
    /// The finite source has nothing left.
    Exhausted,
    Stopped,
}

/// Counters over the scheduler's lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: usize,
    pub processed: usize,
    pub throttled: usize,
    pub busy: usize,
    pub not_ready: usize,
    pub discarded: usize,
    pub timed_out: usize,
    pub disabled: usize,
}

struct PendingFrame {
    frame: Arc<Frame>,
    generation: u64,
    /// Wall clock at submit, for detection latency.
    submitted: Instant,
}

pub struct FrameScheduler {
    source: Option<Box<dyn VideoSource>>,
    executor: Box<dyn DetectionExecutor>,
    analyzer: AnalyzeFrameUseCase,
    aggregator: StatisticsAggregator,
    callbacks: SessionCallbacks,
    handle: SessionHandle,
    logger: Box<dyn PipelineLogger>,
    interval: Duration,
    last_submit: Option<Instant>,
    last_frame_index: Option<usize>,
    pending: Option<PendingFrame>,
    generation: u64,
    eye_contact: bool,
    summary: RunSummary,
    stopped: bool,
}

impl FrameScheduler {
    /// Starts a session. Fails when the session is disabled, there is no
    /// source, or no detector tier loads.
    pub fn start(
        config: &SessionConfig,
        source: Option<Box<dyn VideoSource>>,
        mut detector: MultiStrategyDetector,
        callbacks: SessionCallbacks,
        handle: SessionHandle,
    ) -> Result<Self, StartError> {
        config.validate()?;
        if !handle.is_enabled() {
            return Err(StartError::Disabled);
        }
        if source.is_none() {
            return Err(StartError::NoVideoSource);
        }
        if !detector.initialize() {
            return Err(StartError::NoDetectorBackend);
        }

        let executor: Box<dyn DetectionExecutor> = match config.executor {
            ExecutorMode::Inline => Box::new(InlineDetectionExecutor::new(detector)),
            ExecutorMode::Threaded => Box::new(ThreadedDetectionExecutor::new(
                detector,
                config.detect_timeout(),
            )),
        };
        Self::start_with_executor(config, source, executor, callbacks, handle)
    }

    /// Starts a session over an already-built executor, whose detector must
    /// be initialized.
    pub fn start_with_executor(
        config: &SessionConfig,
        source: Option<Box<dyn VideoSource>>,
        executor: Box<dyn DetectionExecutor>,
        callbacks: SessionCallbacks,
        handle: SessionHandle,
    ) -> Result<Self, StartError> {
        config.validate()?;
        if !handle.is_enabled() {
            return Err(StartError::Disabled);
        }
        let source = source.ok_or(StartError::NoVideoSource)?;
        let backend = executor.backend().ok_or(StartError::NoDetectorBackend)?;

        let (w, h) = source.dimensions();
        log::info!(
            "Session started: {w}x{h} source, {backend}, {:?} executor, {} ms interval",
            config.executor,
            config.process_interval_ms
        );

        Ok(Self {
            source: Some(source),
            executor,
            analyzer: AnalyzeFrameUseCase::new(
                config.eye_contact_settings(),
                config.max_detected_faces,
            ),
            aggregator: StatisticsAggregator::new(config.history_capacity),
            callbacks,
            handle,
            logger: Box::new(NullPipelineLogger),
            interval: config.process_interval(),
            last_submit: None,
            last_frame_index: None,
            pending: None,
            generation: 0,
            eye_contact: false,
            summary: RunSummary::default(),
            stopped: false,
        })
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn stats(&self) -> &RollingStats {
        self.aggregator.stats()
    }

    pub fn aggregator(&self) -> &StatisticsAggregator {
        &self.aggregator
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn eye_contact(&self) -> bool {
        self.eye_contact
    }

    pub fn active_backend(&self) -> Option<BackendKind> {
        self.executor.backend()
    }

    pub fn is_running(&self) -> bool {
        !self.stopped
    }

    pub fn update_settings(&mut self, settings: EyeContactSettings) {
        self.analyzer.update_settings(settings);
    }

    /// Applies thresholds, pacing and face limits from `config`. A changed
    /// history capacity starts a fresh window. Executor mode and timeout
    /// are fixed at start.
    pub fn apply_config(&mut self, config: &SessionConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.analyzer.update_settings(config.eye_contact_settings());
        self.analyzer.set_max_faces(config.max_detected_faces);
        self.interval = config.process_interval();
        if config.history_capacity != self.aggregator.capacity() {
            self.aggregator = StatisticsAggregator::new(config.history_capacity);
        }
        Ok(())
    }

    /// Clears statistics and starts a fresh sub-session: a detection
    /// already in flight is discarded when it lands, and eye contact must
    /// be re-established to fire `on_eye_contact_change(true)` again.
    pub fn reset_statistics(&mut self) {
        self.aggregator.reset();
        self.generation += 1;
        self.eye_contact = false;
    }

    /// Handles one scheduling signal.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        self.summary.ticks += 1;
        let outcome = self.tick_inner(now);
        match outcome {
            TickOutcome::Throttled => self.summary.throttled += 1,
            TickOutcome::Busy => self.summary.busy += 1,
            TickOutcome::NotReady => self.summary.not_ready += 1,
            TickOutcome::Processed { .. } => self.summary.processed += 1,
            TickOutcome::Disabled => self.summary.disabled += 1,
            _ => {}
        }
        outcome
    }

    fn tick_inner(&mut self, now: Instant) -> TickOutcome {
        if self.stopped {
            return TickOutcome::Stopped;
        }
        if self.handle.is_cancelled() {
            self.stop();
            return TickOutcome::Stopped;
        }
        if !self.handle.is_enabled() {
            self.abandon_pending();
            return TickOutcome::Disabled;
        }

        if let Some(outcome) = self.resolve_pending(now) {
            return outcome;
        }

        if let Some(last) = self.last_submit {
            if now.saturating_duration_since(last) < self.interval {
                return TickOutcome::Throttled;
            }
        }

        let frame = match self.capture(now) {
            Ok(frame) => frame,
            Err(outcome) => return outcome,
        };

        let index = frame.index();
        let frame = Arc::new(frame);
        let submitted = Instant::now();
        match self.executor.submit(frame.clone(), now) {
            Ok(()) => {}
            Err(DetectionError::Busy) => return TickOutcome::Busy,
            Err(e) => {
                log::warn!("Could not submit frame {index}: {e}");
                return TickOutcome::NotReady;
            }
        }
        self.last_submit = Some(now);
        self.last_frame_index = Some(index);
        self.pending = Some(PendingFrame {
            frame,
            generation: self.generation,
            submitted,
        });

        // Synchronous executors have already finished.
        match self.resolve_pending(now) {
            None | Some(TickOutcome::Busy) => TickOutcome::Submitted,
            Some(outcome) => outcome,
        }
    }

    fn capture(&mut self, now: Instant) -> Result<Frame, TickOutcome> {
        let Some(source) = self.source.as_mut() else {
            return Err(TickOutcome::Stopped);
        };
        if !source.is_ready() {
            return Err(TickOutcome::NotReady);
        }
        match source.capture(now) {
            Ok(Some(frame)) if Some(frame.index()) == self.last_frame_index => {
                Err(TickOutcome::NotReady)
            }
            Ok(Some(frame)) => Ok(frame),
            Ok(None) if source.is_exhausted() => Err(TickOutcome::Exhausted),
            Ok(None) => Err(TickOutcome::NotReady),
            Err(e) => {
                log::warn!("Frame capture failed: {e}");
                Err(TickOutcome::NotReady)
            }
        }
    }

    /// `None` when nothing is in flight.
    fn resolve_pending(&mut self, now: Instant) -> Option<TickOutcome> {
        self.pending.as_ref()?;

        let candidates = match self.executor.poll(now) {
            DetectionPoll::Pending => return Some(TickOutcome::Busy),
            DetectionPoll::Idle => {
                self.pending = None;
                return None;
            }
            DetectionPoll::Ready(candidates) => candidates,
            DetectionPoll::TimedOut => {
                self.summary.timed_out += 1;
                Vec::new()
            }
            DetectionPoll::Failed(e) => {
                log::warn!("Detection failed: {e}");
                Vec::new()
            }
        };

        let pending = self.pending.take()?;
        self.logger
            .timing("detect", pending.submitted.elapsed().as_secs_f64() * 1000.0);
        Some(self.apply(pending, candidates))
    }

    fn apply(&mut self, pending: PendingFrame, candidates: Vec<FaceCandidate>) -> TickOutcome {
        if pending.generation != self.generation || !self.handle.is_enabled() {
            log::debug!("Discarding result for frame {}", pending.frame.index());
            self.summary.discarded += 1;
            return TickOutcome::Discarded;
        }

        let frame = &pending.frame;
        let started = Instant::now();
        let result = self
            .analyzer
            .execute(candidates, frame.index(), frame.width(), frame.height());
        self.aggregator.ingest(&result);
        self.logger
            .timing("analyze", started.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("faces", result.faces.len() as f64);

        let stats = self.aggregator.stats();
        self.logger.progress(
            stats.total_frames_processed as usize,
            stats.eye_contact_percentage,
        );

        if !result.faces.is_empty() {
            if let Some(cb) = self.callbacks.on_faces_detected.as_mut() {
                cb(result.faces.clone());
            }
        }
        if result.eye_contact_detected != self.eye_contact {
            self.eye_contact = result.eye_contact_detected;
            log::debug!("Eye contact changed to {}", self.eye_contact);
            self.logger.eye_contact_changed(
                self.aggregator.stats().total_frames_processed as usize,
                self.eye_contact,
            );
            if let Some(cb) = self.callbacks.on_eye_contact_change.as_mut() {
                cb(self.eye_contact);
            }
        }
        if let Some(cb) = self.callbacks.on_frame_analyzed.as_mut() {
            cb(frame.as_ref(), &result);
        }

        TickOutcome::Processed {
            frame_index: result.frame_index,
        }
    }

    fn abandon_pending(&mut self) {
        if self.pending.take().is_some() {
            self.executor.cancel();
            self.summary.discarded += 1;
        }
    }

    /// Ticks until the source is exhausted, the session is cancelled, or
    /// `stop` is called, then stops.
    pub fn run(&mut self, ticker: &mut dyn Ticker) -> RunSummary {
        while !self.stopped {
            let now = ticker.next_tick();
            if matches!(self.tick(now), TickOutcome::Exhausted | TickOutcome::Stopped) {
                break;
            }
        }
        self.stop();
        self.summary.clone()
    }

    /// Cancels any in-flight detection, releases the detector and closes
    /// the source. Idempotent.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.abandon_pending();
        self.executor.shutdown();
        if let Some(mut source) = self.source.take() {
            source.close();
        }

        let s = &self.summary;
        log::info!(
            "Session stopped: {} processed, {} throttled, {} busy, {} not ready, {} discarded",
            s.processed,
            s.throttled,
            s.busy,
            s.not_ready,
            s.discarded
        );
        self.logger.summary();
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
