use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::frame_analyzer::FrameAnalyzer;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::recognition_state::RecognitionState;
use crate::pipeline::recognize_frame_use_case::{identify, stabilize, FrameResult, IdentifiedFace};
use crate::recognition::domain::gallery_matcher::GalleryMatcher;
use crate::shared::frame::Frame;
use crate::video::domain::frame_reader::{FrameReadError, FrameReader};

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Per-frame output of the analysis thread.
struct Analyzed {
    index: usize,
    faces: Result<Vec<IdentifiedFace>, SendError>,
    analyze_ms: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub failed_frames: usize,
}

/// Recognizes a frame sequence with decode and analysis on their own
/// threads.
///
/// Layout: `reader → analyze [detect/align/embed/match] → caller [track]`
///
/// There is a single analysis thread, so frames arrive at the caller in
/// read order and tracker updates happen strictly in frame order on one
/// thread. A frame that fails to decode or analyze is logged and skipped.
pub struct ThreadedFramePipeline {
    analyzer: FrameAnalyzer,
    matcher: GalleryMatcher,
    state: Arc<RecognitionState>,
    known_only: bool,
    channel_capacity: usize,
}

impl ThreadedFramePipeline {
    pub fn new(
        analyzer: FrameAnalyzer,
        matcher: GalleryMatcher,
        state: Arc<RecognitionState>,
        known_only: bool,
    ) -> Self {
        Self {
            analyzer,
            matcher,
            state,
            known_only,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Process every frame of `reader`, handing each result to `sink` in
    /// frame order.
    pub fn run(
        self,
        reader: Box<dyn FrameReader>,
        total_frames: usize,
        logger: &mut dyn PipelineLogger,
        sink: &mut dyn FnMut(FrameResult) -> Result<(), Box<dyn std::error::Error>>,
    ) -> Result<RunSummary, Box<dyn std::error::Error>> {
        let cap = self.channel_capacity;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(cap);
        let (analyzed_tx, analyzed_rx) = crossbeam_channel::bounded(cap);

        let reader_handle = spawn_reader(reader, frame_tx);
        let analyze_handle = spawn_analyzer(
            self.analyzer,
            self.matcher,
            Arc::clone(&self.state),
            frame_rx,
            analyzed_tx,
        );

        let outcome = run_tracking_loop(
            analyzed_rx,
            &self.state,
            self.known_only,
            total_frames,
            logger,
            sink,
        );

        join_threads(reader_handle, analyze_handle, outcome)
    }
}

fn spawn_reader(
    mut reader: Box<dyn FrameReader>,
    frame_tx: Sender<(usize, Result<Frame, FrameReadError>)>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for (index, frame) in reader.frames().enumerate() {
            if frame_tx.send((index, frame)).is_err() {
                break;
            }
        }
    })
}

fn spawn_analyzer(
    mut analyzer: FrameAnalyzer,
    matcher: GalleryMatcher,
    state: Arc<RecognitionState>,
    frame_rx: Receiver<(usize, Result<Frame, FrameReadError>)>,
    analyzed_tx: Sender<Analyzed>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for (index, frame) in frame_rx {
            let started = Instant::now();
            let faces = frame
                .map_err(SendError::from)
                .and_then(|frame| {
                    let records = analyzer
                        .analyze(&frame)
                        .map_err(|e| -> SendError { e.to_string().into() })?;
                    let gallery = state.gallery_snapshot()?;
                    Ok(identify(&records, &matcher, &gallery))
                });
            let message = Analyzed {
                index,
                faces,
                analyze_ms: started.elapsed().as_secs_f64() * 1000.0,
            };
            if analyzed_tx.send(message).is_err() {
                break;
            }
        }
    })
}

/// Caller-thread loop: the only place the tracker is updated.
fn run_tracking_loop(
    analyzed_rx: Receiver<Analyzed>,
    state: &RecognitionState,
    known_only: bool,
    total_frames: usize,
    logger: &mut dyn PipelineLogger,
    sink: &mut dyn FnMut(FrameResult) -> Result<(), Box<dyn std::error::Error>>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let mut summary = RunSummary::default();
    let mut last_index: Option<usize> = None;

    for analyzed in analyzed_rx {
        debug_assert!(
            last_index.map_or(true, |last| analyzed.index > last),
            "frames must reach the tracker in order"
        );
        last_index = Some(analyzed.index);
        summary.frames += 1;
        logger.timing("analyze", analyzed.analyze_ms);

        match analyzed.faces {
            Ok(faces) => {
                logger.metric("faces", faces.len() as f64);
                let started = Instant::now();
                let result = stabilize(state, analyzed.index, faces, known_only)?;
                logger.timing("track", started.elapsed().as_secs_f64() * 1000.0);
                sink(result)?;
            }
            Err(e) => {
                log::error!("frame {}: {e}", analyzed.index);
                summary.failed_frames += 1;
            }
        }
        logger.progress(summary.frames, total_frames);
    }

    Ok(summary)
}

/// Joins both worker threads and keeps the first error.
///
/// When the caller loop fails early its receiver is already dropped, so the
/// workers see a closed channel and exit.
fn join_threads(
    reader_handle: JoinHandle<()>,
    analyze_handle: JoinHandle<()>,
    outcome: Result<RunSummary, Box<dyn std::error::Error>>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let analyze_panicked = analyze_handle.join().is_err();
    let reader_panicked = reader_handle.join().is_err();

    let summary = outcome?;
    if analyze_panicked {
        return Err("Analysis thread panicked".into());
    }
    if reader_panicked {
        return Err("Reader thread panicked".into());
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::frame_analyzer::test_support::*;
    use crate::pipeline::pipeline_logger::{LogPipelineLogger, NullPipelineLogger};
    use crate::recognition::domain::embedding::Embedding;
    use crate::recognition::domain::gallery::Gallery;
    use crate::shared::constants::UNKNOWN_LABEL;
    use crate::tracking::domain::identity_tracker::TrackerConfig;

    /// Yields the given frames, with `None` standing for a decode failure.
    struct StubReader {
        frames: Vec<Option<Frame>>,
    }

    impl FrameReader for StubReader {
        fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, FrameReadError>> + Send + '_> {
            Box::new(self.frames.drain(..).map(|f| {
                f.ok_or_else(|| FrameReadError::List {
                    path: "broken.png".into(),
                    source: std::io::Error::other("unreadable"),
                })
            }))
        }
    }

    fn red_gallery() -> Gallery {
        let mut g = Gallery::new();
        g.enroll("red", Embedding::normalize(vec![1.0, 0.0, 0.0]).unwrap())
            .unwrap();
        g
    }

    fn pipeline(state: &Arc<RecognitionState>, known_only: bool) -> ThreadedFramePipeline {
        let detector = ScriptedDetector::new(vec![vec![
            detection_at(20.0, 40.0, 112.0),
            detection_at(250.0, 40.0, 112.0),
        ]]);
        ThreadedFramePipeline::new(
            analyzer(Box::new(detector), false),
            GalleryMatcher::new(0.45, 5),
            Arc::clone(state),
            known_only,
        )
        .with_channel_capacity(2)
    }

    #[test]
    fn test_results_arrive_in_order_with_stable_tracks() {
        let state = Arc::new(RecognitionState::new(red_gallery(), TrackerConfig::default()));
        let frames: Vec<Option<Frame>> = (0..10).map(|i| Some(two_tone_frame(i))).collect();
        let mut results = Vec::new();

        let summary = pipeline(&state, false)
            .run(
                Box::new(StubReader { frames }),
                10,
                &mut NullPipelineLogger,
                &mut |r| {
                    results.push(r);
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(summary, RunSummary { frames: 10, failed_frames: 0 });
        let indices: Vec<usize> = results.iter().map(|r| r.frame).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
        assert!(results.iter().all(|r| r.faces[0].track_id == 0 && r.faces[1].track_id == 1));
        assert_eq!(results[9].faces[0].label, "red");
        assert_eq!(results[9].faces[1].label, UNKNOWN_LABEL);
    }

    #[test]
    fn test_decode_failure_skips_frame_only() {
        let state = Arc::new(RecognitionState::new(red_gallery(), TrackerConfig::default()));
        let frames = vec![Some(two_tone_frame(0)), None, Some(two_tone_frame(2))];
        let mut indices = Vec::new();

        let summary = pipeline(&state, true)
            .run(
                Box::new(StubReader { frames }),
                3,
                &mut LogPipelineLogger::new(1),
                &mut |r| {
                    assert!(r.faces.iter().all(|f| f.label == "red"));
                    indices.push(r.frame);
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(summary.failed_frames, 1);
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_sink_error_stops_run() {
        let state = Arc::new(RecognitionState::new(red_gallery(), TrackerConfig::default()));
        let frames: Vec<Option<Frame>> = (0..50).map(|i| Some(two_tone_frame(i))).collect();
        let mut seen = 0;

        let result = pipeline(&state, false).run(
            Box::new(StubReader { frames }),
            50,
            &mut NullPipelineLogger,
            &mut |_| {
                seen += 1;
                Err("output closed".into())
            },
        );

        assert!(result.is_err());
        assert_eq!(seen, 1);
    }
}
