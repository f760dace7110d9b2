use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};

use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::face_candidate::FaceCandidate;
use crate::detection::domain::face_detector::BackendKind;
use crate::detection::domain::multi_strategy_detector::MultiStrategyDetector;
use crate::pipeline::detection_executor::{DetectionExecutor, DetectionPoll};
use crate::shared::frame::Frame;

/// One queued job plus the one being worked on.
const JOB_CHANNEL_CAPACITY: usize = 1;

/// Enough for every result the worker can produce between two polls.
const RESULT_CHANNEL_CAPACITY: usize = 4;

/// Upper bound on how long shutdown waits for a busy worker.
const MAX_SHUTDOWN_WAIT: Duration = Duration::from_secs(2);

struct Job {
    seq: u64,
    frame: Arc<Frame>,
}

struct JobResult {
    seq: u64,
    candidates: Vec<FaceCandidate>,
}

/// Runs detection on a dedicated worker thread that owns the detector.
///
/// Layout: `scheduler → job channel → worker → result channel → scheduler`
///
/// Results are tagged with a sequence number. A detection unresolved
/// after `timeout` is reported as timed out, and its result is dropped
/// whenever it eventually arrives. Shutdown waits for the worker at most
/// `min(timeout, MAX_SHUTDOWN_WAIT)`; a worker stuck inside a backend is
/// detached and releases its detector whenever the backend returns.
pub struct ThreadedDetectionExecutor {
    job_tx: Option<Sender<Job>>,
    result_rx: Receiver<JobResult>,
    worker: Option<Worker>,
    cancelled: Arc<AtomicBool>,
    timeout: Duration,
    next_seq: u64,
    pending: Option<(u64, Instant)>,
    backend: Option<BackendKind>,
}

/// The worker thread hands its detector back on `done` when it exits.
struct Worker {
    handle: JoinHandle<()>,
    done: Receiver<MultiStrategyDetector>,
}

impl ThreadedDetectionExecutor {
    pub fn new(detector: MultiStrategyDetector, timeout: Duration) -> Self {
        let backend = detector.active_backend();
        let cancelled = Arc::new(AtomicBool::new(false));
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(JOB_CHANNEL_CAPACITY);
        let (result_tx, result_rx) =
            crossbeam_channel::bounded::<JobResult>(RESULT_CHANNEL_CAPACITY);

        let worker = spawn_worker(detector, job_rx, result_tx, cancelled.clone());

        Self {
            job_tx: Some(job_tx),
            result_rx,
            worker: Some(worker),
            cancelled,
            timeout,
            next_seq: 0,
            pending: None,
            backend,
        }
    }

    /// Drops every result that does not belong to `current`. Returns the
    /// matching result if it has arrived.
    fn drain(
        &mut self,
        current: Option<u64>,
    ) -> Result<Option<Vec<FaceCandidate>>, DetectionError> {
        loop {
            match self.result_rx.try_recv() {
                Ok(result) if Some(result.seq) == current => return Ok(Some(result.candidates)),
                Ok(stale) => log::debug!("Discarding late detection result #{}", stale.seq),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(DetectionError::WorkerDisconnected),
            }
        }
    }
}

fn spawn_worker(
    mut detector: MultiStrategyDetector,
    job_rx: Receiver<Job>,
    result_tx: Sender<JobResult>,
    cancelled: Arc<AtomicBool>,
) -> Worker {
    let (done_tx, done) = crossbeam_channel::bounded::<MultiStrategyDetector>(1);
    let handle = std::thread::spawn(move || {
        for job in job_rx {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let candidates = detector.detect(&job.frame);
            if result_tx
                .send(JobResult {
                    seq: job.seq,
                    candidates,
                })
                .is_err()
            {
                break;
            }
        }
        // Nobody waiting: shutdown gave up on us, so release here.
        if let Err(crossbeam_channel::SendError(mut detector)) = done_tx.send(detector) {
            detector.release();
        }
    });
    Worker { handle, done }
}

impl DetectionExecutor for ThreadedDetectionExecutor {
    fn submit(&mut self, frame: Arc<Frame>, now: Instant) -> Result<(), DetectionError> {
        if self.pending.is_some() {
            return Err(DetectionError::Busy);
        }
        let job_tx = self.job_tx.as_ref().ok_or(DetectionError::NotInitialized)?;

        let seq = self.next_seq;
        match job_tx.try_send(Job { seq, frame }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(DetectionError::Busy),
            Err(TrySendError::Disconnected(_)) => return Err(DetectionError::WorkerDisconnected),
        }
        self.next_seq += 1;
        self.pending = Some((seq, now));
        Ok(())
    }

    fn poll(&mut self, now: Instant) -> DetectionPoll {
        let current = self.pending.map(|(seq, _)| seq);
        let arrived = self.drain(current);

        let Some((seq, submitted_at)) = self.pending else {
            return DetectionPoll::Idle;
        };

        match arrived {
            Ok(Some(candidates)) => {
                self.pending = None;
                DetectionPoll::Ready(candidates)
            }
            Err(e) => {
                self.pending = None;
                DetectionPoll::Failed(e)
            }
            Ok(None) => {
                let waited = now.saturating_duration_since(submitted_at);
                if waited >= self.timeout {
                    log::warn!(
                        "Detection #{seq} unresolved after {} ms, treating as no faces",
                        waited.as_millis()
                    );
                    self.pending = None;
                    DetectionPoll::TimedOut
                } else {
                    DetectionPoll::Pending
                }
            }
        }
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    fn shutdown(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
        self.pending = None;
        self.job_tx = None;

        let Some(worker) = self.worker.take() else {
            return;
        };
        // Unblock a worker waiting to deliver a result.
        while self.result_rx.try_recv().is_ok() {}

        let wait = self.timeout.min(MAX_SHUTDOWN_WAIT);
        match worker.done.recv_timeout(wait) {
            Ok(mut detector) => {
                detector.release();
                if worker.handle.join().is_err() {
                    log::warn!("Detection worker panicked during shutdown");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Detection worker still busy after {} ms, detaching it",
                    wait.as_millis()
                );
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Detection worker panicked during shutdown");
                let _ = worker.handle.join();
            }
        }
    }

    fn backend(&self) -> Option<BackendKind> {
        self.backend
    }
}

impl Drop for ThreadedDetectionExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::{BackendProvider, FaceDetector};
    use crate::shared::bounding_box::BoundingBox;

    // ── Gated stub: each detection waits for one token ──

    struct GatedDetector {
        gate: Receiver<()>,
    }

    impl FaceDetector for GatedDetector {
        fn detect(
            &mut self,
            frame: &Frame,
        ) -> Result<Vec<FaceCandidate>, Box<dyn std::error::Error>> {
            self.gate.recv()?;
            Ok(vec![FaceCandidate::new(
                BoundingBox::new(frame.index() as f64, 0.0, 10.0, 10.0),
                0.9,
            )])
        }
    }

    struct GatedProvider {
        gate: Receiver<()>,
    }

    impl BackendProvider for GatedProvider {
        fn kind(&self) -> BackendKind {
            BackendKind::Native
        }

        fn load(&self) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
            Ok(Box::new(GatedDetector {
                gate: self.gate.clone(),
            }))
        }
    }

    fn gated_executor(timeout: Duration) -> (Sender<()>, ThreadedDetectionExecutor) {
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
        let mut detector =
            MultiStrategyDetector::new(vec![Box::new(GatedProvider { gate: gate_rx })]);
        assert!(detector.initialize());
        (gate_tx, ThreadedDetectionExecutor::new(detector, timeout))
    }

    fn frame(index: usize) -> Arc<Frame> {
        Arc::new(Frame::filled(16, 16, [0, 0, 0], index))
    }

    /// Polls until the answer is no longer `Pending`, on a frozen clock.
    fn wait_for(ex: &mut ThreadedDetectionExecutor, now: Instant) -> DetectionPoll {
        for _ in 0..500 {
            match ex.poll(now) {
                DetectionPoll::Pending => std::thread::sleep(Duration::from_millis(2)),
                other => return other,
            }
        }
        panic!("worker never answered");
    }

    /// Waits until the worker has taken the queued job off the channel.
    fn wait_until_picked_up(ex: &ThreadedDetectionExecutor) {
        for _ in 0..500 {
            if ex.job_tx.as_ref().is_some_and(|tx| tx.is_empty()) {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("worker never picked up the job");
    }

    #[test]
    fn test_result_arrives_after_gate_opens() {
        let (gate, mut ex) = gated_executor(Duration::from_secs(60));
        let t0 = Instant::now();
        ex.submit(frame(3), t0).unwrap();
        assert!(matches!(ex.poll(t0), DetectionPoll::Pending));
        assert!(ex.is_busy());

        gate.send(()).unwrap();
        let DetectionPoll::Ready(candidates) = wait_for(&mut ex, t0) else {
            panic!("expected ready");
        };
        assert_eq!(candidates[0].bounding_box.x, 3.0);
        assert!(!ex.is_busy());
    }

    #[test]
    fn test_submit_while_pending_is_busy() {
        let (gate, mut ex) = gated_executor(Duration::from_secs(60));
        let t0 = Instant::now();
        ex.submit(frame(0), t0).unwrap();
        assert!(matches!(ex.submit(frame(1), t0), Err(DetectionError::Busy)));
        drop(gate);
    }

    #[test]
    fn test_timeout_then_late_result_is_discarded() {
        let (gate, mut ex) = gated_executor(Duration::from_millis(1000));
        let t0 = Instant::now();
        ex.submit(frame(0), t0).unwrap();
        wait_until_picked_up(&ex);

        assert!(matches!(
            ex.poll(t0 + Duration::from_millis(999)),
            DetectionPoll::Pending
        ));
        assert!(matches!(
            ex.poll(t0 + Duration::from_millis(1000)),
            DetectionPoll::TimedOut
        ));
        assert!(!ex.is_busy());

        // Next frame queues behind the stuck one; its own result must win.
        let t1 = t0 + Duration::from_millis(1100);
        ex.submit(frame(7), t1).unwrap();
        gate.send(()).unwrap();
        gate.send(()).unwrap();

        let DetectionPoll::Ready(candidates) = wait_for(&mut ex, t1) else {
            panic!("expected ready");
        };
        assert_eq!(candidates[0].bounding_box.x, 7.0);
    }

    #[test]
    fn test_cancelled_result_is_never_reported() {
        let (gate, mut ex) = gated_executor(Duration::from_secs(60));
        let t0 = Instant::now();
        ex.submit(frame(0), t0).unwrap();
        assert!(ex.cancel());
        gate.send(()).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(matches!(ex.poll(t0), DetectionPoll::Idle));
    }

    #[test]
    fn test_shutdown_does_not_wait_on_hung_backend() {
        let (gate, mut ex) = gated_executor(Duration::from_millis(50));
        let t0 = Instant::now();
        ex.submit(frame(0), t0).unwrap();
        wait_until_picked_up(&ex);
        assert!(matches!(
            ex.poll(t0 + Duration::from_millis(50)),
            DetectionPoll::TimedOut
        ));

        // The gate stays closed: the worker never returns from detect.
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        std::thread::spawn(move || {
            ex.shutdown();
            drop(ex);
            let _ = done_tx.send(());
        });
        assert!(
            done_rx.recv_timeout(Duration::from_secs(2)).is_ok(),
            "shutdown blocked on a stuck detection"
        );
        drop(gate);
    }

    #[test]
    fn test_shutdown_joins_worker_and_is_idempotent() {
        let (gate, mut ex) = gated_executor(Duration::from_secs(60));
        assert_eq!(ex.backend(), Some(BackendKind::Native));
        ex.submit(frame(0), Instant::now()).unwrap();
        gate.send(()).unwrap();
        ex.shutdown();
        ex.shutdown();
        assert!(matches!(
            ex.submit(frame(1), Instant::now()),
            Err(DetectionError::NotInitialized)
        ));
    }
}
