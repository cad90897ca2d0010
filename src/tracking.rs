// src/tracking.rs - Hand landmark data model and the detector seam
use std::ops::Index;

use image::RgbImage;
use nalgebra::Vector3;
use thiserror::Error;

/// Number of landmarks reported for every detected hand.
pub const LANDMARK_COUNT: usize = 21;

/// MediaPipe hand landmark indices.
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// Bones of the hand skeleton, as pairs of landmark indices.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = {
    use landmarks::*;
    [
        // Palm
        (WRIST, THUMB_CMC),
        (THUMB_CMC, INDEX_FINGER_MCP),
        (INDEX_FINGER_MCP, MIDDLE_FINGER_MCP),
        (MIDDLE_FINGER_MCP, RING_FINGER_MCP),
        (RING_FINGER_MCP, PINKY_MCP),
        (PINKY_MCP, WRIST),
        // Thumb
        (THUMB_CMC, THUMB_MCP),
        (THUMB_MCP, THUMB_IP),
        (THUMB_IP, THUMB_TIP),
        // Index
        (INDEX_FINGER_MCP, INDEX_FINGER_PIP),
        (INDEX_FINGER_PIP, INDEX_FINGER_DIP),
        (INDEX_FINGER_DIP, INDEX_FINGER_TIP),
        // Middle
        (MIDDLE_FINGER_MCP, MIDDLE_FINGER_PIP),
        (MIDDLE_FINGER_PIP, MIDDLE_FINGER_DIP),
        (MIDDLE_FINGER_DIP, MIDDLE_FINGER_TIP),
        // Ring
        (RING_FINGER_MCP, RING_FINGER_PIP),
        (RING_FINGER_PIP, RING_FINGER_DIP),
        (RING_FINGER_DIP, RING_FINGER_TIP),
        // Pinky
        (PINKY_MCP, PINKY_PIP),
        (PINKY_PIP, PINKY_DIP),
        (PINKY_DIP, PINKY_TIP),
    ]
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandError {
    #[error("expected {expected} hand landmarks, got {found}")]
    LandmarkCount { expected: usize, found: usize },
}

fn check_count(found: usize) -> Result<(), HandError> {
    if found == LANDMARK_COUNT {
        Ok(())
    } else {
        Err(HandError::LandmarkCount {
            expected: LANDMARK_COUNT,
            found,
        })
    }
}

/// A joint position in frame pixels. `y` grows downwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LandmarkPoint {
    pub x: i32,
    pub y: i32,
}

impl LandmarkPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The 21 landmarks of one hand in pixel space, indexed by [`landmarks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hand {
    points: [LandmarkPoint; LANDMARK_COUNT],
}

impl Hand {
    pub fn new(points: [LandmarkPoint; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[LandmarkPoint; LANDMARK_COUNT] {
        &self.points
    }
}

impl Index<usize> for Hand {
    type Output = LandmarkPoint;

    fn index(&self, index: usize) -> &LandmarkPoint {
        &self.points[index]
    }
}

impl TryFrom<Vec<LandmarkPoint>> for Hand {
    type Error = HandError;

    fn try_from(points: Vec<LandmarkPoint>) -> Result<Self, HandError> {
        check_count(points.len())?;
        let mut out = [LandmarkPoint::default(); LANDMARK_COUNT];
        out.copy_from_slice(&points);
        Ok(Self::new(out))
    }
}

/// Landmarks as reported by the detector: `x` and `y` are fractions of the
/// frame width and height, `z` is relative depth.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Vector3<f64>; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Vector3<f64>; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Vector3<f64>; LANDMARK_COUNT] {
        &self.points
    }

    /// Scales every landmark to a `width` x `height` frame, truncating toward zero.
    pub fn to_pixel_hand(&self, width: u32, height: u32) -> Hand {
        let (w, h) = (f64::from(width), f64::from(height));
        Hand::new(
            self.points()
                .map(|lm| LandmarkPoint::new((lm.x * w) as i32, (lm.y * h) as i32)),
        )
    }
}

impl TryFrom<Vec<Vector3<f64>>> for HandLandmarks {
    type Error = HandError;

    fn try_from(points: Vec<Vector3<f64>>) -> Result<Self, HandError> {
        check_count(points.len())?;
        let mut out = [Vector3::zeros(); LANDMARK_COUNT];
        out.copy_from_slice(&points);
        Ok(Self::new(out))
    }
}

/// Channel order a detector expects its input image in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOrder {
    Rgb,
    Bgr,
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
    pub max_num_hands: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.7,
            max_num_hands: 2,
        }
    }
}

/// Finds hands in an image.
pub trait LandmarkSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Channel order `detect` expects.
    fn input_order(&self) -> PixelOrder {
        PixelOrder::Rgb
    }

    /// Returns every hand found in `image`, possibly none.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<HandLandmarks>, Self::Error>;
}
