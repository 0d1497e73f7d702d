//! Player Movement Controller
//!
//! Turns classified gestures into facing changes and discrete one-cell
//! steps. A swipe that disagrees with the current facing only turns the
//! player; the same swipe again commits the step. Taps step forward without
//! touching the facing.
//!
//! Steps are interpolated over a fixed number of ticks. While a step is in
//! flight every new gesture is dropped.

use tracing::debug;

use crate::core::fixed::{Fixed, POSITION_LIMIT, tick_fraction};
use crate::core::vec2::FixedVec2;
use crate::game::input::{Gesture, GestureIntent, classify_gesture};
use crate::game::probe::SpatialProbe;
use crate::game::state::{Direction, EntityId};
use crate::game::world::World;

/// Movement tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovementConfig {
    /// Distance of one step
    pub step: Fixed,
    /// Ticks a step takes to complete
    pub move_ticks: u32,
    /// Gestures shorter than this (pixels) are taps
    pub tap_threshold_px: u32,
}

/// An in-flight step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepTween {
    /// Start position
    pub from: FixedVec2,
    /// Destination
    pub to: FixedVec2,
    /// Ticks advanced so far
    pub elapsed: u32,
    /// Total ticks
    pub duration: u32,
}

impl StepTween {
    /// Position after `elapsed` ticks.
    pub fn position(&self) -> FixedVec2 {
        self.from.lerp(self.to, tick_fraction(self.elapsed, self.duration))
    }

    /// Has the tween reached its destination?
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Controller phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovementPhase {
    /// Accepting gestures
    Idle,
    /// Mid-step
    Moving(StepTween),
}

/// What a gesture did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// A step is in flight; the gesture was dropped
    Busy,
    /// Facing changed, no movement
    Turned(Direction),
    /// A step began
    Stepped {
        /// Direction of travel
        direction: Direction,
        /// Destination cell
        to: FixedVec2,
    },
    /// The probe refused the step
    Blocked(Direction),
    /// The controlled entity no longer exists
    Detached,
}

/// Gesture-driven grid mover for one entity.
#[derive(Clone, Debug)]
pub struct PlayerMovementController {
    entity: EntityId,
    facing: Direction,
    phase: MovementPhase,
    config: MovementConfig,
    probe: SpatialProbe,
}

impl PlayerMovementController {
    /// Create a controller for `entity`, facing up.
    pub fn new(entity: EntityId, config: MovementConfig, probe: SpatialProbe) -> Self {
        Self {
            entity,
            facing: Direction::Up,
            phase: MovementPhase::Idle,
            config,
            probe,
        }
    }

    /// Controlled entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Current facing.
    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// Current phase.
    pub fn phase(&self) -> MovementPhase {
        self.phase
    }

    /// True while a step is in flight.
    pub fn is_moving(&self) -> bool {
        matches!(self.phase, MovementPhase::Moving(_))
    }

    /// React to a completed gesture.
    pub fn handle_gesture(&mut self, gesture: &Gesture, world: &World) -> MoveOutcome {
        if self.is_moving() {
            return MoveOutcome::Busy;
        }

        match classify_gesture(gesture, self.config.tap_threshold_px) {
            GestureIntent::Tap => self.try_step(Direction::Up, world),
            GestureIntent::Swipe(direction) if direction == self.facing => {
                self.try_step(direction, world)
            }
            GestureIntent::Swipe(direction) => {
                self.facing = direction;
                debug!(?direction, "Player turned");
                MoveOutcome::Turned(direction)
            }
        }
    }

    /// Probe and, if clear, start a step in `direction`.
    fn try_step(&mut self, direction: Direction, world: &World) -> MoveOutcome {
        let Some(entity) = world.get(self.entity) else {
            return MoveOutcome::Detached;
        };

        let from = entity.position;
        let Some(to) = from
            .checked_add(direction.unit().scale(self.config.step))
            .filter(|to| to.within(POSITION_LIMIT))
        else {
            debug!(?direction, %from, "Step leaves the playfield");
            return MoveOutcome::Blocked(direction);
        };

        if !self.probe.can_move_to(world, self.entity, from, to) {
            debug!(?direction, %to, "Step blocked");
            return MoveOutcome::Blocked(direction);
        }

        self.phase = MovementPhase::Moving(StepTween {
            from,
            to,
            elapsed: 0,
            duration: self.config.move_ticks,
        });

        MoveOutcome::Stepped { direction, to }
    }

    /// Advance an in-flight step by one tick and write the position back.
    ///
    /// Returns the destination on the tick the step lands.
    pub fn advance(&mut self, world: &mut World) -> Option<FixedVec2> {
        let MovementPhase::Moving(mut tween) = self.phase else {
            return None;
        };

        tween.elapsed += 1;
        world.set_position(self.entity, tween.position());

        if tween.is_finished() {
            self.phase = MovementPhase::Idle;
            Some(tween.to)
        } else {
            self.phase = MovementPhase::Moving(tween);
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
