//! Gesture Input and Recording
//!
//! Pointer gestures are reduced to a tap or a four-way swipe before they
//! reach the movement controller. Screen coordinates are integer pixels with
//! +Y pointing up the screen, so classification never touches floats.
//!
//! Inputs are recorded sparsely (only ticks that carried one) so a session
//! can be replayed from its seed.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::state::Direction;

// =============================================================================
// GESTURES
// =============================================================================

/// Pointer position in screen pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// Horizontal pixel
    pub x: i32,
    /// Vertical pixel (+Y is up)
    pub y: i32,
}

impl ScreenPoint {
    /// Create a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A completed press-and-release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gesture {
    /// Where the pointer went down
    pub start: ScreenPoint,
    /// Where it came up
    pub end: ScreenPoint,
}

impl Gesture {
    /// Create a gesture from its end points.
    pub const fn new(start: ScreenPoint, end: ScreenPoint) -> Self {
        Self { start, end }
    }

    /// Press and release at the same point.
    pub const fn tap() -> Self {
        Self::swipe(0, 0)
    }

    /// Drag from the origin by (`dx`, `dy`) pixels.
    pub const fn swipe(dx: i32, dy: i32) -> Self {
        Self::new(ScreenPoint::new(0, 0), ScreenPoint::new(dx, dy))
    }

    /// Displacement in pixels.
    pub fn delta(&self) -> (i64, i64) {
        (
            self.end.x as i64 - self.start.x as i64,
            self.end.y as i64 - self.start.y as i64,
        )
    }
}

/// What a gesture means to the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureIntent {
    /// Short press: step forward without turning
    Tap,
    /// Drag along the dominant axis
    Swipe(Direction),
}

/// Classify a gesture.
///
/// Anything shorter than `tap_threshold_px` is a tap. Otherwise the larger
/// axis wins; a perfect diagonal counts as vertical.
pub fn classify_gesture(gesture: &Gesture, tap_threshold_px: u32) -> GestureIntent {
    let (dx, dy) = gesture.delta();
    let threshold = tap_threshold_px as i64;

    let distance_sq = dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy));
    if distance_sq < threshold.saturating_mul(threshold) {
        return GestureIntent::Tap;
    }

    let direction = if dx.abs() > dy.abs() {
        if dx > 0 { Direction::Right } else { Direction::Left }
    } else if dy > 0 {
        Direction::Up
    } else {
        Direction::Down
    };

    GestureIntent::Swipe(direction)
}

/// Builds gestures from raw pointer down/up events.
#[derive(Clone, Debug, Default)]
pub struct PointerTracker {
    pressed_at: Option<ScreenPoint>,
}

impl PointerTracker {
    /// Create an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer went down.
    pub fn pointer_down(&mut self, point: ScreenPoint) {
        self.pressed_at = Some(point);
    }

    /// Pointer came up. Returns the finished gesture, if a press was open.
    pub fn pointer_up(&mut self, point: ScreenPoint) -> Option<Gesture> {
        self.pressed_at
            .take()
            .map(|start| Gesture::new(start, point))
    }

    /// Drop an open press (e.g. the pointer was cancelled).
    pub fn cancel(&mut self) {
        self.pressed_at = None;
    }
}

// =============================================================================
// RECORDING
// =============================================================================

/// One recordable player action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerInput {
    /// A gesture delivered on this tick
    Gesture(Gesture),
    /// A restart request issued before this tick
    Restart,
}

/// Input tagged with the tick it applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedInput {
    /// Tick number
    pub tick: u32,
    /// The action
    pub input: PlayerInput,
}

/// Errors encoding or decoding a recording.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// bincode failure
    #[error("recording codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Entries are not in tick order
    #[error("recording out of order at tick {0}")]
    OutOfOrder(u32),
}

/// Sparse input log for one session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecording {
    /// Seed the session was created with
    pub seed: u64,

    /// Last tick the session ran
    pub end_tick: u32,

    entries: Vec<RecordedInput>,
}

impl InputRecording {
    /// Start an empty recording.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            end_tick: 0,
            entries: Vec::with_capacity(256),
        }
    }

    /// Append an input. Ticks must not decrease.
    pub fn record(&mut self, tick: u32, input: PlayerInput) {
        self.end_tick = self.end_tick.max(tick);
        self.entries.push(RecordedInput { tick, input });
    }

    /// Inputs recorded for exactly `tick`, in recording order.
    pub fn inputs_at(&self, tick: u32) -> &[RecordedInput] {
        let start = self.entries.partition_point(|e| e.tick < tick);
        let end = self.entries.partition_point(|e| e.tick <= tick);
        &self.entries[start..end]
    }

    /// All entries.
    pub fn entries(&self) -> &[RecordedInput] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark the final tick.
    pub fn finalize(&mut self, end_tick: u32) {
        self.end_tick = end_tick;
    }

    /// Serialize with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordingError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize with bincode and check tick ordering.
    pub fn from_bytes(data: &[u8]) -> Result<Self, RecordingError> {
        let recording: Self = bincode::deserialize(data)?;
        if let Some(bad) = recording
            .entries
            .windows(2)
            .find(|pair| pair[1].tick < pair[0].tick)
        {
            return Err(RecordingError::OutOfOrder(bad[1].tick));
        }
        Ok(recording)
    }
}

// =============================================================================
// TESTS
// =============================================================================
