//! Per-frame processing loop
//!
//! capture -> landmark detection -> gesture tracking -> OSC output.
//! Everything runs on the calling thread; the loop only checks the shutdown
//! channel between frames.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use crate::camera::{CameraFrame, FrameSource};
use crate::config::GestureConfig;
use crate::error::Result;
use crate::gesture::{FrameOutput, GestureTracker};
use crate::landmarks::Detections;
use crate::ml::LandmarkDetector;
use crate::osc::OutputSink;
use crate::telemetry::{FrameProfiler, PipelineCounters};

/// How often frame statistics are logged
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested
    Shutdown,
    /// The frame source failed
    CaptureEnded,
}

pub struct Pipeline<S, D, O> {
    source: S,
    detector: D,
    sink: O,
    tracker: GestureTracker,
    shutdown: Option<Receiver<()>>,
    profiler: FrameProfiler,
    counters: PipelineCounters,
    last_report: Instant,
}

impl<S, D, O> Pipeline<S, D, O>
where
    S: FrameSource,
    D: LandmarkDetector,
    O: OutputSink,
{
    pub fn new(source: S, detector: D, sink: O, gesture: GestureConfig) -> Self {
        Self {
            source,
            detector,
            sink,
            tracker: GestureTracker::new(gesture),
            shutdown: None,
            profiler: FrameProfiler::new(),
            counters: PipelineCounters::default(),
            last_report: Instant::now(),
        }
    }

    /// Stop the loop when a message arrives (or the sender is dropped)
    pub fn with_shutdown(mut self, shutdown: Receiver<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        match &self.shutdown {
            Some(rx) => !matches!(rx.try_recv(), Err(TryRecvError::Empty)),
            None => false,
        }
    }

    /// Run until shutdown or until the frame source fails
    pub fn run(&mut self) -> Result<StopReason> {
        log::info!("Pipeline running");

        let reason = loop {
            if self.shutdown_requested() {
                log::info!("Shutdown requested");
                break StopReason::Shutdown;
            }

            let frame = match self.source.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("Frame capture failed, stopping: {}", e);
                    break StopReason::CaptureEnded;
                }
            };

            self.step(&frame)?;
            self.maybe_report();
        };

        log::info!(
            "Pipeline stopped after {} frames ({} triggers)",
            self.counters.frames,
            self.counters.triggers
        );
        Ok(reason)
    }

    /// Process a single frame
    pub fn step(&mut self, frame: &CameraFrame) -> Result<FrameOutput> {
        let detections = match self.detector.detect(frame) {
            Ok(d) => d,
            Err(e) => {
                self.counters.inference_errors += 1;
                log::warn!("Inference error on frame {}: {}", frame.frame_number, e);
                Detections::none(frame.frame_number)
            }
        };

        let output = self.tracker.update(&detections);
        self.sink.send(&output)?;

        self.count(&detections, &output);
        // Capture to send, so decode and mirroring count too
        self.profiler.record(frame.timestamp, frame.timestamp.elapsed());

        log::trace!(
            "frame {}: x={:.3} y={:.3} active={} trigger={}",
            frame.frame_number,
            output.x,
            output.y,
            output.gesture_active,
            output.trigger
        );
        if output.trigger {
            log::info!("Gesture triggered at ({:.3}, {:.3})", output.x, output.y);
        }

        Ok(output)
    }

    fn count(&mut self, detections: &Detections, output: &FrameOutput) {
        let c = &mut self.counters;
        c.frames += 1;
        c.hand_frames += detections.hand.is_some() as u64;
        c.face_frames += detections.face.is_some() as u64;
        c.active_frames += output.gesture_active as u64;
        c.triggers += output.trigger as u64;
    }

    fn maybe_report(&mut self) {
        if self.last_report.elapsed() < REPORT_INTERVAL {
            return;
        }
        self.last_report = Instant::now();

        let stats = self.profiler.stats();
        let c = &self.counters;
        log::debug!(
            "{:.1} fps, latency min {:.1}ms p50 {:.1}ms avg {:.1}ms p95 {:.1}ms max {:.1}ms",
            self.profiler.fps(),
            stats.min_ms,
            stats.p50_ms,
            stats.avg_ms,
            stats.p95_ms,
            stats.max_ms
        );
        log::debug!(
            "hand {}/{} face {}/{} active {}/{} frames, {} triggers, {} inference errors",
            c.hand_frames,
            c.frames,
            c.face_frames,
            c.frames,
            c.active_frames,
            c.frames,
            c.triggers,
            c.inference_errors
        );
    }

    pub fn counters(&self) -> PipelineCounters {
        self.counters
    }

    pub fn tracker(&self) -> &GestureTracker {
        &self.tracker
    }

    pub fn sink(&self) -> &O {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::error::GestureError;
    use crate::landmarks::{face, hand, FaceLandmarks, HandLandmarks, Landmark, FACE_LANDMARK_COUNT};

    /// Yields `count` blank frames, then fails like a disconnected camera
    struct MockSource {
        remaining: u64,
        next: u64,
    }

    impl MockSource {
        fn new(count: u64) -> Self {
            Self { remaining: count, next: 0 }
        }
    }

    impl FrameSource for MockSource {
        fn next_frame(&mut self) -> Result<CameraFrame> {
            if self.remaining == 0 {
                return Err(GestureError::Camera("end of stream".to_string()));
            }
            self.remaining -= 1;
            self.next += 1;
            Ok(CameraFrame::blank(4, 4, self.next - 1))
        }
    }

    /// Replays scripted results; empty script means nothing detected
    struct MockDetector {
        script: VecDeque<Result<Detections>>,
    }

    impl MockDetector {
        fn empty() -> Self {
            Self { script: VecDeque::new() }
        }
    }

    impl LandmarkDetector for MockDetector {
        fn detect(&mut self, frame: &CameraFrame) -> Result<Detections> {
            self.script
                .pop_front()
                .unwrap_or_else(|| Ok(Detections::none(frame.frame_number)))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<FrameOutput>,
    }

    impl OutputSink for RecordingSink {
        fn send(&mut self, output: &FrameOutput) -> Result<()> {
            self.sent.push(*output);
            Ok(())
        }
    }

    fn gesture_frame() -> Detections {
        let mut hand_points = HandLandmarks::default();
        hand_points.points[hand::INDEX_TIP] = Landmark::new(0.7, 0.3);
        hand_points.points[hand::THUMB_TIP] = Landmark::new(0.7, 0.31);

        let mut mesh = vec![Landmark::default(); FACE_LANDMARK_COUNT];
        mesh[face::UPPER_INNER_LIP] = Landmark::new(0.5, 0.10);
        mesh[face::LOWER_INNER_LIP] = Landmark::new(0.5, 0.13);

        Detections {
            hand: Some(hand_points),
            face: Some(FaceLandmarks::new(mesh)),
            frame_number: 0,
        }
    }

    #[test]
    fn test_no_detections_outputs_center() {
        let mut pipeline = Pipeline::new(
            MockSource::new(10),
            MockDetector::empty(),
            RecordingSink::default(),
            GestureConfig::default(),
        );

        assert_eq!(pipeline.run().unwrap(), StopReason::CaptureEnded);

        let sent = &pipeline.sink().sent;
        assert_eq!(sent.len(), 10);
        for out in sent {
            assert_eq!(
                *out,
                FrameOutput {
                    x: 0.5,
                    y: 0.5,
                    gesture_active: false,
                    trigger: false,
                }
            );
        }
        assert_eq!(pipeline.counters().frames, 10);
    }

    #[test]
    fn test_trigger_pulses() {
        let script = [true, true, false, true]
            .iter()
            .map(|&on| Ok(if on { gesture_frame() } else { Detections::none(0) }))
            .collect();
        let mut pipeline = Pipeline::new(
            MockSource::new(4),
            MockDetector { script },
            RecordingSink::default(),
            GestureConfig::default(),
        );

        pipeline.run().unwrap();

        let triggers: Vec<bool> = pipeline.sink().sent.iter().map(|o| o.trigger).collect();
        let active: Vec<bool> = pipeline.sink().sent.iter().map(|o| o.gesture_active).collect();
        assert_eq!(active, vec![true, true, false, true]);
        assert_eq!(triggers, vec![true, false, false, true]);
        assert_eq!(pipeline.counters().triggers, 2);
        assert_eq!(pipeline.counters().active_frames, 3);
        assert_eq!(pipeline.counters().frames, 4);
    }

    #[test]
    fn test_inference_error_is_not_fatal() {
        let script = VecDeque::from(vec![
            Err(GestureError::Inference("boom".to_string())),
            Ok(gesture_frame()),
        ]);
        let mut pipeline = Pipeline::new(
            MockSource::new(3),
            MockDetector { script },
            RecordingSink::default(),
            GestureConfig::default(),
        );

        assert_eq!(pipeline.run().unwrap(), StopReason::CaptureEnded);
        assert_eq!(pipeline.sink().sent.len(), 3);
        assert!(!pipeline.sink().sent[0].gesture_active);
        assert!(pipeline.sink().sent[1].trigger);
        assert_eq!(pipeline.counters().inference_errors, 1);
    }

    #[test]
    fn test_shutdown_stops_before_capture() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.send(()).unwrap();
        let mut pipeline = Pipeline::new(
            MockSource::new(100),
            MockDetector::empty(),
            RecordingSink::default(),
            GestureConfig::default(),
        )
        .with_shutdown(rx);

        assert_eq!(pipeline.run().unwrap(), StopReason::Shutdown);
        assert!(pipeline.sink().sent.is_empty());
    }

    #[test]
    fn test_cursor_follows_hand() {
        let mut pipeline = Pipeline::new(
            MockSource::new(0),
            MockDetector {
                script: VecDeque::from(vec![Ok(gesture_frame())]),
            },
            RecordingSink::default(),
            GestureConfig::default(),
        );

        let out = pipeline.step(&CameraFrame::blank(4, 4, 0)).unwrap();
        assert!((out.x - (0.5 * 0.8 + 0.7 * 0.2)).abs() < 1e-6);
        assert!((out.y - (0.5 * 0.8 + 0.3 * 0.2)).abs() < 1e-6);
        assert_eq!(pipeline.tracker().cursor(), (out.x, out.y));
    }
}
