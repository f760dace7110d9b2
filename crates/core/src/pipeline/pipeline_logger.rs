use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for scheduler events.
///
/// Keeps reporting out of the frame loop so a CLI, a UI or a test can each
/// watch a session without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Another frame was analyzed. `processed` is the lifetime count.
    fn progress(&mut self, processed: usize, eye_contact_percentage: f64);

    /// The session-level eye-contact state flipped after `processed` frames.
    fn eye_contact_changed(&mut self, processed: usize, eye_contact: bool);

    /// Wall time of one stage ("detect", "analyze") for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time value such as faces per frame.
    fn metric(&mut self, name: &str, value: f64);

    /// Emit an end-of-session report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. The scheduler default.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _processed: usize, _eye_contact_percentage: f64) {}
    fn eye_contact_changed(&mut self, _processed: usize, _eye_contact: bool) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
}

/// Collects per-stage latency, per-frame metrics and eye-contact streaks,
/// and logs a session report on stop.
///
/// Progress lines go out every `throttle_frames` analyzed frames.
pub struct SessionReportLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, Vec<f64>>,
    metrics: BTreeMap<String, Vec<f64>>,
    start_time: Instant,
    processed: usize,
    last_percentage: f64,
    gains: usize,
    losses: usize,
    contact_since: Option<usize>,
    longest_streak: usize,
}

impl SessionReportLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            processed: 0,
            last_percentage: 0.0,
            gains: 0,
            losses: 0,
            contact_since: None,
            longest_streak: 0,
        }
    }

    /// Longest run of frames with eye contact, including one still open.
    pub fn longest_streak(&self) -> usize {
        let open = self
            .contact_since
            .map_or(0, |since| self.processed.saturating_sub(since));
        self.longest_streak.max(open)
    }

    pub fn transitions(&self) -> (usize, usize) {
        (self.gains, self.losses)
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    /// The report text, or `None` before the first analyzed frame.
    pub fn report(&self) -> Option<String> {
        if self.processed == 0 {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![
            format!(
                "Session report ({} frames analyzed, {elapsed:.1}s):",
                self.processed
            ),
            format!(
                "  eye contact: {:.1}% recent, {} gained / {} lost, longest streak {} frames",
                self.last_percentage,
                self.gains,
                self.losses,
                self.longest_streak()
            ),
        ];

        for (stage, durations) in &self.timings {
            if durations.is_empty() {
                continue;
            }
            let avg = mean(durations);
            let p95 = percentile(durations, 0.95);
            lines.push(format!("  {stage:10}: avg {avg:6.2}ms  p95 {p95:6.2}ms"));
        }

        for (name, values) in &self.metrics {
            if values.is_empty() {
                continue;
            }
            let max = values.iter().copied().fold(f64::MIN, f64::max);
            lines.push(format!("  {name}: avg {:.1}, max {max:.0}", mean(values)));
        }

        if elapsed > 0.0 {
            let fps = self.processed as f64 / elapsed;
            lines.push(format!("  analysis rate: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }
}

impl Default for SessionReportLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for SessionReportLogger {
    fn progress(&mut self, processed: usize, eye_contact_percentage: f64) {
        self.processed = processed;
        self.last_percentage = eye_contact_percentage;
        if processed % self.throttle_frames == 0 {
            log::info!("Analyzed {processed} frames, eye contact {eye_contact_percentage:.1}%");
        }
    }

    fn eye_contact_changed(&mut self, processed: usize, eye_contact: bool) {
        if eye_contact {
            self.gains += 1;
            self.contact_since = Some(processed.saturating_sub(1));
        } else {
            self.losses += 1;
            if let Some(since) = self.contact_since.take() {
                let streak = processed.saturating_sub(1).saturating_sub(since);
                self.longest_streak = self.longest_streak.max(streak);
            }
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn summary(&self) {
        if let Some(text) = self.report() {
            log::info!("\n\n{text}");
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Nearest-rank percentile of a non-empty slice.
fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Replays a per-frame eye-contact sequence the way the scheduler
    /// reports it: progress first, then an edge when the state flips.
    fn replay(logger: &mut SessionReportLogger, frames: &[bool]) {
        let mut state = false;
        for (i, &contact) in frames.iter().enumerate() {
            logger.progress(i + 1, 0.0);
            if contact != state {
                state = contact;
                logger.eye_contact_changed(i + 1, contact);
            }
        }
    }

    // ── NullPipelineLogger ──

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 50.0);
        logger.eye_contact_changed(1, true);
        logger.timing("detect", 5.0);
        logger.metric("faces", 3.0);
        logger.summary();
    }

    // ── Eye-contact streaks ──

    #[test]
    fn test_streaks_and_transitions() {
        let mut logger = SessionReportLogger::new(10);
        replay(
            &mut logger,
            &[false, true, true, true, false, true, true, false],
        );
        assert_eq!(logger.transitions(), (2, 2));
        assert_eq!(logger.longest_streak(), 3);
    }

    #[test]
    fn test_open_streak_counts_to_latest_frame() {
        let mut logger = SessionReportLogger::new(10);
        replay(&mut logger, &[true, false, true, true, true, true]);
        assert_eq!(logger.transitions(), (2, 1));
        assert_eq!(logger.longest_streak(), 4);
    }

    #[test]
    fn test_no_contact_has_no_streak() {
        let mut logger = SessionReportLogger::new(10);
        replay(&mut logger, &[false; 5]);
        assert_eq!(logger.transitions(), (0, 0));
        assert_eq!(logger.longest_streak(), 0);
    }

    // ── Timings and metrics ──

    #[test]
    fn test_timing_records_values_per_stage() {
        let mut logger = SessionReportLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("analyze", 5.0);

        assert_eq!(logger.timings_for("detect").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("analyze").unwrap(), &[5.0]);
        assert!(logger.timings_for("missing").is_none());
    }

    #[test]
    fn test_percentile_uses_nearest_rank() {
        let values: Vec<f64> = (1..=10).rev().map(f64::from).collect();
        assert_relative_eq!(percentile(&values, 0.5), 5.0);
        assert_relative_eq!(percentile(&values, 1.0), 10.0);
        assert_relative_eq!(percentile(&[7.0], 0.95), 7.0);
        assert_relative_eq!(percentile(&[3.0, 1.0, 2.0], 0.0), 1.0);
    }

    // ── Report ──

    #[test]
    fn test_empty_report_returns_none() {
        let logger = SessionReportLogger::new(10);
        assert!(logger.report().is_none());
    }

    #[test]
    fn test_report_lists_eye_contact_stages_and_metrics() {
        let mut logger = SessionReportLogger::new(10);
        replay(&mut logger, &[true, true, false]);
        logger.progress(3, 66.7);
        logger.timing("detect", 12.0);
        logger.metric("faces", 1.0);
        logger.metric("faces", 2.0);

        let report = logger.report().unwrap();
        assert!(report.contains("Session report (3 frames analyzed"));
        assert!(report.contains("66.7% recent, 1 gained / 1 lost, longest streak 2 frames"));
        assert!(report.contains("detect"));
        assert!(report.contains("faces: avg 1.5, max 2"));
    }

    #[test]
    fn test_default_throttle() {
        let logger = SessionReportLogger::default();
        assert_eq!(logger.throttle_frames, 30);
    }
}
