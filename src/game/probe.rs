//! Spatial Probe
//!
//! Decides whether a single-cell step is allowed, and tracks which colliders
//! the player has started touching.

use std::collections::BTreeSet;

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;
use crate::game::state::{EntityId, EntityKind};
use crate::game::world::{ColliderHit, SpatialQuery, World};

/// Probe tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Radius of the overlap check at the destination
    pub radius: Fixed,
    /// Tag that always blocks. `None` disables tag matching.
    pub obstacle_tag: Option<EntityKind>,
    /// Bit mask of layers that always block
    pub obstacle_layers: u32,
}

/// Outcome of classifying one hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// Does not stop the step
    Clear,
    /// Stops the step
    Blocked,
}

/// Movement validator.
#[derive(Clone, Debug)]
pub struct SpatialProbe {
    config: ProbeConfig,
}

impl SpatialProbe {
    /// Create a probe.
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Probe settings.
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Classify a collider.
    ///
    /// The obstacle tag and layer mask are checked before the vehicle rule,
    /// so a vehicle placed on a blocking layer still blocks.
    pub fn classify(&self, hit: &ColliderHit) -> ProbeVerdict {
        if self.config.obstacle_tag == Some(hit.kind) {
            return ProbeVerdict::Blocked;
        }
        if hit.layer < 32 && self.config.obstacle_layers & (1u32 << hit.layer) != 0 {
            return ProbeVerdict::Blocked;
        }
        ProbeVerdict::Clear
    }

    /// Can `mover` step from `from` to `to`?
    ///
    /// Runs both the destination overlap and the path ray cast, skipping the
    /// mover's own collider. A step is refused if either query reports a
    /// blocking collider.
    pub fn can_move_to<Q: SpatialQuery>(
        &self,
        query: &Q,
        mover: EntityId,
        from: FixedVec2,
        to: FixedVec2,
    ) -> bool {
        let overlap = query.overlap(to, self.config.radius, Some(mover));

        let path = to - from;
        let ray = query.raycast(from, path.normalize(), path.length(), Some(mover));

        let blocked = overlap
            .iter()
            .chain(ray.iter())
            .any(|hit| self.classify(hit) == ProbeVerdict::Blocked);

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(?from, ?to, ?overlap, ?ray, blocked, "Step probe");

        !blocked
    }
}

// =============================================================================
// CONTACTS
// =============================================================================

/// Turns per-tick overlap sets into trigger-enter notifications.
#[derive(Clone, Debug, Default)]
pub struct ContactTracker {
    touching: BTreeSet<EntityId>,
}

impl ContactTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Colliders `subject` touches now but did not touch last tick.
    pub fn entered(&mut self, world: &World, subject: EntityId) -> Vec<ColliderHit> {
        let current = world.touching(subject);
        let entered = current
            .iter()
            .filter(|hit| !self.touching.contains(&hit.entity))
            .copied()
            .collect();

        self.touching = current.iter().map(|hit| hit.entity).collect();
        entered
    }

    /// Forget all contacts.
    pub fn clear(&mut self) {
        self.touching.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
