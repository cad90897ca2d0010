// src/pipeline.rs - Detect, classify and annotate a single frame
use std::borrow::Cow;

use image::RgbImage;
use tracing::trace;

use crate::gesture::{classify, ActionMap, GestureLabel};
use crate::overlay::{LabelStyle, OverlayRenderer};
use crate::tracking::{LandmarkSource, PixelOrder};
use crate::video::Frame;

pub struct FramePipeline<S, R> {
    source: S,
    renderer: R,
    actions: &'static ActionMap,
    label_style: LabelStyle,
}

impl<S: LandmarkSource, R: OverlayRenderer> FramePipeline<S, R> {
    pub fn new(source: S, renderer: R) -> Self {
        Self {
            source,
            renderer,
            actions: ActionMap::global(),
            label_style: LabelStyle::default(),
        }
    }

    #[cfg(test)]
    pub fn with_actions(mut self, actions: &'static ActionMap) -> Self {
        self.actions = actions;
        self
    }

    /// Annotates `frame` in place and returns the gesture of every hand found,
    /// in detection order.
    ///
    /// A frame without hands is left untouched. Each hand gets its skeleton
    /// drawn, and hands whose gesture maps to an action also get the action
    /// text at the fixed label position, so with several hands the later
    /// labels are drawn over the earlier ones.
    pub fn process(&mut self, frame: &mut Frame) -> Result<Vec<GestureLabel>, S::Error> {
        let hands = {
            let input = detector_input(frame, self.source.input_order());
            self.source.detect(&input)?
        };

        let mut gestures = Vec::with_capacity(hands.len());
        for landmarks in &hands {
            self.renderer.draw_skeleton(frame, landmarks);

            let hand = landmarks.to_pixel_hand(frame.width(), frame.height());
            let gesture = classify(&hand);
            let action = self.actions.lookup(gesture);
            trace!("hand classified as {} ({:?})", gesture.as_str(), action);

            if let Some(text) = action {
                self.renderer.draw_text(frame, text, &self.label_style);
            }
            gestures.push(gesture);
        }

        Ok(gestures)
    }
}

/// Reorders channels for the detector, borrowing when nothing changes.
fn detector_input(frame: &Frame, order: PixelOrder) -> Cow<'_, RgbImage> {
    match order {
        PixelOrder::Rgb => Cow::Borrowed(frame),
        PixelOrder::Bgr => {
            let mut swapped = frame.clone();
            for px in swapped.pixels_mut() {
                px.0.swap(0, 2);
            }
            Cow::Owned(swapped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::SkeletonRenderer;
    use crate::tracking::landmarks::{INDEX_FINGER_MCP, PINKY_TIP, THUMB_IP, THUMB_TIP};
    use crate::tracking::{HandError, HandLandmarks, LANDMARK_COUNT};
    use nalgebra::Vector3;
    use std::collections::VecDeque;

    // power of two, so pixel -> fraction -> pixel is exact
    const SIZE: u32 = 1024;

    #[derive(Default)]
    struct FakeSource {
        order: Option<PixelOrder>,
        results: VecDeque<Result<Vec<HandLandmarks>, HandError>>,
        seen: Vec<image::Rgb<u8>>,
    }

    impl FakeSource {
        fn returning(hands: Vec<HandLandmarks>) -> Self {
            Self {
                results: VecDeque::from([Ok(hands)]),
                ..Self::default()
            }
        }
    }

    impl LandmarkSource for FakeSource {
        type Error = HandError;

        fn input_order(&self) -> PixelOrder {
            self.order.unwrap_or(PixelOrder::Rgb)
        }

        fn detect(&mut self, image: &RgbImage) -> Result<Vec<HandLandmarks>, HandError> {
            self.seen.push(*image.get_pixel(0, 0));
            self.results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Debug, PartialEq)]
    enum Op {
        Skeleton,
        Text(String, (i32, i32)),
    }

    #[derive(Default)]
    struct RecordingRenderer {
        ops: Vec<Op>,
    }

    impl OverlayRenderer for RecordingRenderer {
        fn draw_skeleton(&mut self, _frame: &mut Frame, _hand: &HandLandmarks) {
            self.ops.push(Op::Skeleton);
        }

        fn draw_text(&mut self, _frame: &mut Frame, text: &str, style: &LabelStyle) {
            self.ops.push(Op::Text(text.to_string(), (style.origin.x, style.origin.y)));
        }
    }

    fn hand_from_pixels(points: [(i32, i32); LANDMARK_COUNT]) -> HandLandmarks {
        let size = f64::from(SIZE);
        HandLandmarks::new(
            points.map(|(x, y)| Vector3::new(f64::from(x) / size, f64::from(y) / size, 0.0)),
        )
    }

    fn thumb_hand(tip_y: i32, ip_y: i32) -> HandLandmarks {
        let mut points = [(300, 600); LANDMARK_COUNT];
        points[THUMB_IP] = (100, ip_y);
        points[THUMB_TIP] = (100, tip_y);
        hand_from_pixels(points)
    }

    fn fist_hand() -> HandLandmarks {
        let mut points = [(300, 600); LANDMARK_COUNT];
        points[THUMB_IP] = (100, 400);
        points[THUMB_TIP] = (100, 400);
        for (i, idx) in (INDEX_FINGER_MCP..=PINKY_TIP).enumerate() {
            points[idx] = (200, 10 * (i as i32 + 1));
        }
        hand_from_pixels(points)
    }

    fn run(hands: Vec<HandLandmarks>) -> (Vec<GestureLabel>, Vec<Op>) {
        let mut pipeline = FramePipeline::new(FakeSource::returning(hands), RecordingRenderer::default());
        let mut frame = Frame::new(SIZE, SIZE);
        let gestures = pipeline.process(&mut frame).unwrap();
        (gestures, pipeline.renderer.ops)
    }

    fn text(s: &str) -> Op {
        Op::Text(s.to_string(), (10, 50))
    }

    #[test]
    fn thumbs_up_shows_volume_up() {
        let (gestures, ops) = run(vec![thumb_hand(150, 200)]);
        assert_eq!(gestures, [GestureLabel::ThumbsUp]);
        assert_eq!(ops, [Op::Skeleton, text("Action: Volume Up")]);
    }

    #[test]
    fn thumbs_down_shows_volume_down() {
        let (gestures, ops) = run(vec![thumb_hand(200, 150)]);
        assert_eq!(gestures, [GestureLabel::ThumbsDown]);
        assert_eq!(ops, [Op::Skeleton, text("Action: Volume Down")]);
    }

    #[test]
    fn fist_shows_pause_play() {
        let (gestures, ops) = run(vec![fist_hand()]);
        assert_eq!(gestures, [GestureLabel::Fist]);
        assert_eq!(ops, [Op::Skeleton, text("Action: Pause/Play")]);
    }

    #[test]
    fn unknown_gesture_draws_only_the_skeleton() {
        let (gestures, ops) = run(vec![thumb_hand(400, 400)]);
        assert_eq!(gestures, [GestureLabel::Unknown]);
        assert_eq!(ops, [Op::Skeleton]);
    }

    #[test]
    fn every_hand_is_annotated_in_order() {
        let (gestures, ops) = run(vec![thumb_hand(150, 200), fist_hand()]);
        assert_eq!(gestures, [GestureLabel::ThumbsUp, GestureLabel::Fist]);
        assert_eq!(
            ops,
            [
                Op::Skeleton,
                text("Action: Volume Up"),
                Op::Skeleton,
                text("Action: Pause/Play"),
            ]
        );
    }

    #[test]
    fn custom_action_table_is_used() {
        static ONLY_FIST: once_cell::sync::Lazy<ActionMap> =
            once_cell::sync::Lazy::new(|| ActionMap::from_entries([(GestureLabel::Fist, "stop")]));

        let mut pipeline = FramePipeline::new(
            FakeSource::returning(vec![thumb_hand(150, 200), fist_hand()]),
            RecordingRenderer::default(),
        )
        .with_actions(&ONLY_FIST);
        let mut frame = Frame::new(SIZE, SIZE);
        pipeline.process(&mut frame).unwrap();

        assert_eq!(
            pipeline.renderer.ops,
            [Op::Skeleton, Op::Skeleton, text("stop")]
        );
    }

    #[test]
    fn no_hands_leaves_frame_untouched() {
        let mut frame = Frame::from_fn(64, 48, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let original = frame.clone();

        let mut pipeline = FramePipeline::new(FakeSource::default(), SkeletonRenderer::default());
        let gestures = pipeline.process(&mut frame).unwrap();

        assert!(gestures.is_empty());
        assert_eq!(frame, original);
    }

    #[test]
    fn detected_hand_changes_pixels() {
        let mut frame = Frame::new(SIZE, SIZE);
        let original = frame.clone();

        let mut pipeline =
            FramePipeline::new(FakeSource::returning(vec![fist_hand()]), SkeletonRenderer::default());
        pipeline.process(&mut frame).unwrap();

        assert_ne!(frame, original);
        assert!(frame.pixels().any(|px| *px == image::Rgb([0, 255, 0])));
    }

    #[test]
    fn bgr_detectors_get_swapped_channels() {
        let source = FakeSource {
            order: Some(PixelOrder::Bgr),
            ..FakeSource::default()
        };
        let mut frame = Frame::from_pixel(4, 4, image::Rgb([1, 2, 3]));

        let mut pipeline = FramePipeline::new(source, RecordingRenderer::default());
        pipeline.process(&mut frame).unwrap();

        assert_eq!(pipeline.source.seen, [image::Rgb([3, 2, 1])]);
        assert_eq!(*frame.get_pixel(0, 0), image::Rgb([1, 2, 3]));
    }

    #[test]
    fn rgb_detectors_see_the_frame_as_is() {
        let mut frame = Frame::from_pixel(4, 4, image::Rgb([1, 2, 3]));
        let mut pipeline = FramePipeline::new(FakeSource::default(), RecordingRenderer::default());
        pipeline.process(&mut frame).unwrap();
        assert_eq!(pipeline.source.seen, [image::Rgb([1, 2, 3])]);
    }

    #[test]
    fn detection_errors_propagate() {
        let source = FakeSource {
            results: VecDeque::from([Err(HandError::LandmarkCount {
                expected: 21,
                found: 3,
            })]),
            ..FakeSource::default()
        };
        let mut frame = Frame::new(8, 8);

        let mut pipeline = FramePipeline::new(source, RecordingRenderer::default());
        let err = pipeline.process(&mut frame).unwrap_err();

        assert_eq!(err, HandError::LandmarkCount { expected: 21, found: 3 });
        assert!(pipeline.renderer.ops.is_empty());
    }
}
