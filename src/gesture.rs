// src/gesture.rs - Per-frame gesture classification and the action table
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::tracking::landmarks::{INDEX_FINGER_MCP, PINKY_TIP, THUMB_IP, THUMB_TIP};
use crate::tracking::Hand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    ThumbsUp,
    ThumbsDown,
    Fist,
    Unknown,
}

impl GestureLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThumbsUp => "thumbs_up",
            Self::ThumbsDown => "thumbs_down",
            Self::Fist => "fist",
            Self::Unknown => "unknown",
        }
    }
}

/// Classifies a single hand pose.
///
/// The rules are checked in order and the first match wins:
///
/// 1. thumb tip above the thumb IP joint: [`GestureLabel::ThumbsUp`]
/// 2. thumb tip below the thumb IP joint: [`GestureLabel::ThumbsDown`]
/// 3. thumb level and every finger joint from the index MCP to the pinky tip
///    strictly below the one before it: [`GestureLabel::Fist`]
///
/// Anything else is [`GestureLabel::Unknown`]. A level thumb is the only way
/// to reach the fist check, so a curled hand with a lowered thumb still
/// reports `ThumbsDown`.
pub fn classify(hand: &Hand) -> GestureLabel {
    let tip = hand[THUMB_TIP].y;
    let ip = hand[THUMB_IP].y;

    if tip < ip {
        GestureLabel::ThumbsUp
    } else if tip > ip {
        GestureLabel::ThumbsDown
    } else if fingers_descending(hand) {
        GestureLabel::Fist
    } else {
        GestureLabel::Unknown
    }
}

fn fingers_descending(hand: &Hand) -> bool {
    hand.points()[INDEX_FINGER_MCP..=PINKY_TIP]
        .windows(2)
        .all(|pair| pair[1].y > pair[0].y)
}

/// Display strings for the gestures that trigger an action.
#[derive(Debug, Clone)]
pub struct ActionMap {
    actions: HashMap<GestureLabel, &'static str>,
}

static ACTIONS: Lazy<ActionMap> = Lazy::new(ActionMap::standard);

impl ActionMap {
    pub fn from_entries(entries: impl IntoIterator<Item = (GestureLabel, &'static str)>) -> Self {
        Self {
            actions: entries.into_iter().collect(),
        }
    }

    /// Volume and playback controls. `Unknown` has no action.
    pub fn standard() -> Self {
        Self::from_entries([
            (GestureLabel::ThumbsUp, "Action: Volume Up"),
            (GestureLabel::ThumbsDown, "Action: Volume Down"),
            (GestureLabel::Fist, "Action: Pause/Play"),
        ])
    }

    /// The process-wide table, built on first use.
    pub fn global() -> &'static ActionMap {
        &ACTIONS
    }

    pub fn lookup(&self, label: GestureLabel) -> Option<&'static str> {
        self.actions.get(&label).copied()
    }
}
