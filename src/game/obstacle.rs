//! Moving Obstacles
//!
//! Cars, trains and logs translate along their lane at constant speed and
//! remove themselves once they drift too far from the corridor.

use tracing::debug;

use crate::core::fixed::{Fixed, TICK_DURATION, fixed_abs, fixed_mul};
use crate::game::state::EntityId;
use crate::game::world::World;

/// Advance every moving entity by one tick.
///
/// Returns the entities that crossed `destroy_distance` and were removed.
/// Static entities (zero velocity) and the player are never touched.
pub fn advance_obstacles(world: &mut World, destroy_distance: Fixed) -> Vec<EntityId> {
    let mut expired = Vec::new();

    for entity in world.iter_mut() {
        if entity.velocity_x == 0 {
            continue;
        }

        entity.position.x = entity
            .position
            .x
            .wrapping_add(fixed_mul(entity.velocity_x, TICK_DURATION));

        if fixed_abs(entity.position.x) > destroy_distance {
            expired.push(entity.id);
        }
    }

    for id in &expired {
        world.destroy(*id);
    }

    if !expired.is_empty() {
        debug!(count = expired.len(), "Obstacles left the corridor");
    }

    expired
}
