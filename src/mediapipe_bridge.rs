// src/mediapipe_bridge.rs - MediaPipe Hands running in a helper process
//
// Wire protocol, one exchange per frame:
//   -> width: u32 LE, height: u32 LE, channels: u32 LE, then width*height*channels RGB bytes
//   <- one JSON line: {"hands": [{"landmarks": [{"x": .., "y": .., "z": ..}, ...]}], "error": null}
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use image::RgbImage;
use nalgebra::Vector3;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::tracking::{DetectorConfig, HandError, HandLandmarks, LandmarkSource};

const READY: &str = "READY";

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to start hand landmark helper `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("hand landmark helper did not signal ready, got {0:?}")]
    Handshake(String),
    #[error("hand landmark helper exited")]
    Closed,
    #[error("I/O error talking to hand landmark helper")]
    Io(#[from] io::Error),
    #[error("malformed response from hand landmark helper")]
    Json(#[from] serde_json::Error),
    #[error("hand landmark helper reported: {0}")]
    Helper(String),
    #[error("hand landmark helper returned a malformed hand")]
    Landmarks(#[from] HandError),
}

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f64,
    y: f64,
    #[serde(default)]
    z: f64,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// How to launch the helper.
#[derive(Debug, Clone)]
pub struct HelperCommand {
    pub program: String,
    pub script: PathBuf,
}

impl Default for HelperCommand {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script: PathBuf::from(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/scripts/hand_landmarks.py"
            )),
        }
    }
}

pub struct MediaPipeWrapper {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl MediaPipeWrapper {
    pub fn new(config: &DetectorConfig) -> Result<Self, BridgeError> {
        Self::spawn(&HelperCommand::default(), config)
    }

    /// Starts the helper and blocks until it has loaded its model.
    pub fn spawn(command: &HelperCommand, config: &DetectorConfig) -> Result<Self, BridgeError> {
        info!(
            "starting MediaPipe hands (detection >= {}, tracking >= {}, max {} hands)",
            config.min_detection_confidence,
            config.min_tracking_confidence,
            config.max_num_hands
        );

        let mut process = Command::new(&command.program)
            .arg(&command.script)
            .arg("--min-detection-confidence")
            .arg(config.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence")
            .arg(config.min_tracking_confidence.to_string())
            .arg("--max-num-hands")
            .arg(config.max_num_hands.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let (stdin, stdout) = match (process.stdin.take(), process.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = process.kill();
                return Err(BridgeError::Closed);
            }
        };
        let mut bridge = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
        };

        let ready = bridge.read_line()?;
        if ready.trim() != READY {
            return Err(BridgeError::Handshake(ready));
        }

        info!("MediaPipe hands ready");
        Ok(bridge)
    }

    fn read_line(&mut self) -> Result<String, BridgeError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(BridgeError::Closed);
        }
        Ok(line)
    }
}

impl LandmarkSource for MediaPipeWrapper {
    type Error = BridgeError;

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<HandLandmarks>, BridgeError> {
        write_request(&mut self.stdin, image)?;
        let response = self.read_line()?;
        let hands = parse_response(&response)?;
        if !hands.is_empty() {
            debug!("MediaPipe found {} hand(s)", hands.len());
        }
        Ok(hands)
    }
}

impl Drop for MediaPipeWrapper {
    fn drop(&mut self) {
        if let Err(e) = self.process.kill() {
            debug!("hand landmark helper already stopped: {}", e);
        }
        if let Err(e) = self.process.wait() {
            warn!("failed to reap hand landmark helper: {}", e);
        }
    }
}

fn write_request<W: Write>(out: &mut W, image: &RgbImage) -> io::Result<()> {
    out.write_all(&image.width().to_le_bytes())?;
    out.write_all(&image.height().to_le_bytes())?;
    out.write_all(&3u32.to_le_bytes())?;
    out.write_all(image.as_raw())?;
    out.flush()
}

fn parse_response(line: &str) -> Result<Vec<HandLandmarks>, BridgeError> {
    let result: DetectionJson = serde_json::from_str(line.trim())?;

    if let Some(error) = result.error {
        return Err(BridgeError::Helper(error));
    }

    result
        .hands
        .into_iter()
        .map(|hand| {
            let points: Vec<_> = hand
                .landmarks
                .into_iter()
                .map(|lm| Vector3::new(lm.x, lm.y, lm.z))
                .collect();
            HandLandmarks::try_from(points).map_err(BridgeError::from)
        })
        .collect()
}
