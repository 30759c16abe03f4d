use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for recognition-run events.
///
/// Use cases report what happens; the caller decides whether that ends up
/// in the log, a progress bar, or nowhere.
pub trait PipelineLogger: Send {
    /// `total` is 0 when the frame count is not known up front.
    fn progress(&mut self, current: usize, total: usize);

    /// Wall time of one stage for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point sample such as faces per frame or queue depth.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Forwards events to the `log` facade and aggregates stage timings and
/// metrics for an end-of-run summary.
///
/// Progress lines are emitted every `every_frames` frames.
pub struct LogPipelineLogger {
    every_frames: usize,
    timings: BTreeMap<String, Stat>,
    metrics: BTreeMap<String, Stat>,
    started: Instant,
    frames_seen: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Stat {
    count: usize,
    sum: f64,
    max: f64,
}

impl Stat {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = self.max.max(value);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

impl LogPipelineLogger {
    pub fn new(every_frames: usize) -> Self {
        Self {
            every_frames: every_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            frames_seen: 0,
        }
    }

    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Recognized {} frames in {elapsed:.1}s",
            self.frames_seen
        )];
        for (stage, s) in &self.timings {
            lines.push(format!(
                "  {stage:10} avg {:6.1}ms  max {:6.1}ms",
                s.mean(),
                s.max
            ));
        }
        for (name, s) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}, max {:.0}", s.mean(), s.max));
        }
        if self.frames_seen > 0 && elapsed > 0.0 {
            lines.push(format!("  {:.1} fps", self.frames_seen as f64 / elapsed));
        }
        Some(lines.join("\n"))
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(25)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = self.frames_seen.max(current);
        let at_end = total > 0 && current == total;
        if current % self.every_frames == 0 || at_end {
            if total > 0 {
                log::info!("Frame {current}/{total}");
            } else {
                log::info!("Frame {current}");
            }
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings.entry(stage.to_string()).or_default().add(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().add(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("detect", 5.0);
        logger.metric("faces", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timings_are_averaged_per_stage() {
        let mut logger = LogPipelineLogger::new(10);
        logger.timing("analyze", 20.0);
        logger.timing("analyze", 40.0);
        logger.timing("track", 1.0);

        assert_relative_eq!(logger.timings["analyze"].mean(), 30.0);
        assert_relative_eq!(logger.timings["analyze"].max, 40.0);
        assert_relative_eq!(logger.timings["track"].mean(), 1.0);
        assert!(!logger.timings.contains_key("missing"));
        assert!(logger.summary_string().unwrap().contains("avg   30.0ms"));
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = LogPipelineLogger::new(10);
        logger.progress(4, 4);
        logger.timing("analyze", 12.0);
        logger.metric("faces", 2.0);
        logger.metric("faces", 3.0);

        let text = logger.summary_string().unwrap();

        assert!(text.contains("Recognized 4 frames"));
        assert!(text.contains("analyze"));
        assert!(text.contains("faces: avg 2.5, max 3"));
    }

    #[test]
    fn test_empty_summary_is_none() {
        assert!(LogPipelineLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_progress_without_total_counts_frames() {
        let mut logger = LogPipelineLogger::new(2);
        for i in 1..=5 {
            logger.progress(i, 0);
        }
        assert_eq!(logger.frames_seen, 5);
    }
}
